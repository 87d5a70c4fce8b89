// ============================================================================
// reframe-core/src/processing/encode_job.rs
// ============================================================================
//
// ENCODE JOB: Structured Parameters for One Scene Encode
//
// An `EncodeJob` is built per scene from the filter pipeline, the run
// configuration and the video budget, handed to the Transcoder, and dropped.
// `to_args` is the only place that knows ffmpeg's option spelling.
//
// Every job is single-threaded; parallelism comes from running several scene
// jobs at once.

// ---- Standard library imports ----
use std::path::PathBuf;

// ---- Internal crate imports ----
use crate::config::{CoreConfig, Preset, VideoCodec};
use crate::error::{CoreError, CoreResult};
use crate::media::FrameRate;
use crate::processing::budget::BitrateBudget;
use crate::processing::filter_graph::FilterPipeline;
use crate::processing::scenes::{Scene, ms_to_timestamp};

/// Constant rate factor for the x264/x265 paths.
pub const SCENE_CRF: u8 = 16;

/// `maxrate` sits this far under the video budget.
pub const MAXRATE_HEADROOM: i64 = 50_000;

/// The AV1 average-bitrate target sits this far under the video budget.
pub const AV1_TARGET_HEADROOM: i64 = 250_000;

/// Smallest video budget the codec's rate settings stay positive with.
#[must_use]
pub fn min_video_budget(codec: VideoCodec) -> i64 {
    match codec {
        VideoCodec::Av1 => AV1_TARGET_HEADROOM.max(MAXRATE_HEADROOM) + 1,
        VideoCodec::Avc | VideoCodec::Hevc => MAXRATE_HEADROOM + 1,
    }
}

/// Fails when the cap leaves too little video budget to encode with.
pub fn check_video_budget(config: &CoreConfig, budget: &BitrateBudget) -> CoreResult<()> {
    let codec = config.video_codec();
    let needed = min_video_budget(codec);
    if budget.video < needed {
        return Err(CoreError::Config(format!(
            "Bitrate cap {} leaves {} b/s for video after {} b/s of audio; {} needs at least {needed} b/s",
            config.bitrate_cap,
            budget.video,
            budget.audio,
            codec.encoder()
        )));
    }
    Ok(())
}

/// How far before a scene's start the input seek lands, in milliseconds.
pub const SEEK_BIAS_MS: u64 = 3_000;

const AV1_NOISE_LEVEL: u32 = 50;
const AV1_LAG_IN_FRAMES: u32 = 25;
const AV1_QMIN: u32 = 23;
const AV1_QMAX: u32 = 63;
const CODEC_LEVEL: &str = "4.0";
const X265_LEVEL_IDC: u32 = 40;

/// The portion of the source one job encodes.
///
/// The transcoder input-seeks to a point `SEEK_BIAS_MS` early (fast, lands on
/// a keyframe at or before it) and then decodes forward to the exact start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekRange {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl SeekRange {
    #[must_use]
    pub fn input_seek_ms(&self) -> u64 {
        self.start_ms.saturating_sub(SEEK_BIAS_MS)
    }

    #[must_use]
    pub fn output_seek_ms(&self) -> u64 {
        self.start_ms - self.input_seek_ms()
    }

    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Quality and rate-control settings, one shape per encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum RateControl {
    X264 {
        crf: u8,
        preset: Preset,
        profile: &'static str,
        gop: u32,
    },
    X265 {
        crf: u8,
        preset: Preset,
        profile: &'static str,
        gop: u32,
    },
    Aom {
        cpu_used: u8,
        target_bitrate: i64,
        gop: u32,
    },
}

impl RateControl {
    /// Derives the settings for the configured codec and video budget.
    #[must_use]
    pub fn for_config(config: &CoreConfig, budget: &BitrateBudget) -> Self {
        let gop = config.gop;
        match config.video_codec() {
            VideoCodec::Avc => RateControl::X264 {
                crf: SCENE_CRF,
                preset: config.preset,
                profile: config.video_profile(),
                gop,
            },
            VideoCodec::Hevc => RateControl::X265 {
                crf: SCENE_CRF,
                preset: config.preset,
                profile: config.video_profile(),
                gop,
            },
            VideoCodec::Av1 => RateControl::Aom {
                cpu_used: 7 - 3 * config.preset.group(),
                target_bitrate: budget.video - AV1_TARGET_HEADROOM,
                gop,
            },
        }
    }

    #[must_use]
    pub fn codec(&self) -> VideoCodec {
        match self {
            RateControl::X264 { .. } => VideoCodec::Avc,
            RateControl::X265 { .. } => VideoCodec::Hevc,
            RateControl::Aom { .. } => VideoCodec::Av1,
        }
    }

    fn push_args(&self, args: &mut Vec<String>) {
        match self {
            RateControl::Aom { cpu_used, target_bitrate, gop } => {
                push(args, "-lag-in-frames", AV1_LAG_IN_FRAMES);
                push(args, "-auto-alt-ref", 1);
                push(args, "-qmin", AV1_QMIN);
                push(args, "-qmax", AV1_QMAX);
                push(args, "-cpu-used", cpu_used);
                push(args, "-g", gop);
                push(args, "-b:v", target_bitrate);
            }
            RateControl::X264 { crf, preset, profile, gop } => {
                push(args, "-crf", crf);
                push(args, "-preset", preset);
                push(args, "-profile:v", profile);
                push(args, "-level:v", CODEC_LEVEL);
                push(args, "-g", gop);
            }
            RateControl::X265 { crf, preset, profile, gop } => {
                push(args, "-crf", crf);
                push(args, "-preset", preset);
                push(args, "-profile:v", profile);
                push(args, "-x265-params", format!("level-idc={X265_LEVEL_IDC}:keyint={gop}"));
            }
        }
    }
}

fn push(args: &mut Vec<String>, flag: &str, value: impl ToString) {
    args.push(flag.to_string());
    args.push(value.to_string());
}

/// Everything the transcoder needs to encode one scene.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub seek: SeekRange,
    pub filters: FilterPipeline,
    pub rate_control: RateControl,
    pub max_rate: i64,
    pub buffer_size: i64,
    pub frame_rate: FrameRate,
}

impl EncodeJob {
    /// Builds the job for `scene` of `input`. The job writes to the scene's
    /// staging path.
    #[must_use]
    pub fn for_scene(
        scene: &Scene,
        input: PathBuf,
        filters: FilterPipeline,
        frame_rate: FrameRate,
        config: &CoreConfig,
        budget: &BitrateBudget,
    ) -> Self {
        let max_rate = budget.video - MAXRATE_HEADROOM;
        Self {
            input,
            output: scene.staging.clone(),
            seek: SeekRange {
                start_ms: scene.start_ms,
                end_ms: scene.end_ms,
            },
            filters,
            rate_control: RateControl::for_config(config, budget),
            max_rate,
            buffer_size: 2 * max_rate,
            frame_rate,
        }
    }

    /// Serializes the job to ffmpeg arguments (without the program name).
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        let input_seek = self.seek.input_seek_ms();
        if input_seek > 0 {
            push(&mut args, "-ss", ms_to_timestamp(input_seek));
        }
        push(&mut args, "-i", self.input.display());
        let output_seek = self.seek.output_seek_ms();
        if output_seek > 0 {
            push(&mut args, "-ss", ms_to_timestamp(output_seek));
        }
        push(&mut args, "-t", ms_to_timestamp(self.seek.duration_ms()));
        push(&mut args, "-map", "0:v:0");

        // Grain synthesis must precede the filters
        if matches!(self.rate_control, RateControl::Aom { .. }) {
            push(&mut args, "-denoise-noise-level", AV1_NOISE_LEVEL);
        }
        if !self.filters.is_empty() {
            push(&mut args, "-vf", &self.filters);
        }

        push(&mut args, "-vsync", 1);
        push(&mut args, "-threads", 1);
        push(&mut args, "-vcodec", self.rate_control.codec().encoder());
        push(&mut args, "-r", self.frame_rate);
        self.rate_control.push_args(&mut args);
        push(&mut args, "-maxrate", self.max_rate);
        push(&mut args, "-bufsize", self.buffer_size);

        push(&mut args, "-map", "0:a?");
        push(&mut args, "-c:a", "copy");
        push(&mut args, "-movflags", "+faststart");
        push(&mut args, "-f", "mp4");
        args.push("-y".to_string());
        args.push(self.output.display().to_string());
        args
    }
}
