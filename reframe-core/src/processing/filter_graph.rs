// ============================================================================
// reframe-core/src/processing/filter_graph.rs
// ============================================================================
//
// FILTER GRAPH: Ordered Video Filter Pipeline for One Encode
//
// `build_filter_graph` is a pure function of a resolved video descriptor, the
// run configuration and the force-720p flag. Stages always appear in this
// order, and a stage that does not apply is left out entirely:
//
//   deinterlace -> crop -> denoise/bit depth -> colorspace -> super-resolution
//   -> target scale -> 8-bit downconvert -> post-scale cleanup
//
// Stages are typed values; only `Display` knows ffmpeg's filter syntax.

// ---- Standard library imports ----
use std::fmt;
use std::path::PathBuf;

// ---- Internal crate imports ----
use crate::config::{CoreConfig, ScalingAlgorithm};
use crate::media::ResolvedVideo;
use crate::processing::budget::{MAX_HEIGHT, MAX_WIDTH, NARROW_MIN_HEIGHT, WIDE_DAR, WIDE_MIN_WIDTH};

/// Pixel format every pipeline normalizes to unless 8-bit output is forced.
pub const TEN_BIT_FORMAT: &str = "yuv420p10le";

/// 8-bit planar format; also what the strong denoiser requires as input.
pub const EIGHT_BIT_FORMAT: &str = "yuv420p";

/// Below these the frame benefits from upscaling (frames wider than 16:9).
const WIDE_UPSCALE_MIN_WIDTH: u32 = WIDE_MIN_WIDTH;
const WIDE_UPSCALE_MIN_HEIGHT: u32 = 500;

/// Below these the frame benefits from upscaling (16:9 and narrower).
const NARROW_UPSCALE_MIN_WIDTH: u32 = 900;
const NARROW_UPSCALE_MIN_HEIGHT: u32 = NARROW_MIN_HEIGHT;

/// Heights above these mark HD and SD sources when primaries are untagged.
const HD_HEIGHT: u32 = 720;
const SD_HEIGHT: u32 = 480;

/// Size of one axis in a `scale` stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleSize {
    Unchanged,
    Doubled,
    Pixels(u32),
}

impl ScaleSize {
    fn render(self, input: &str) -> String {
        match self {
            ScaleSize::Unchanged => input.to_string(),
            ScaleSize::Doubled => format!("{input}*2"),
            ScaleSize::Pixels(px) => px.to_string(),
        }
    }
}

/// Direction of a 90-degree `transpose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    Clockwise,
    CounterClockwise,
}

/// One stage of the video filter pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterStage {
    Deinterlace,
    /// Centered crop to `width` x `height`.
    Crop { width: u32, height: u32 },
    PixelFormat(&'static str),
    FastDenoise,
    StrongDenoise,
    /// Remap to BT.709 from the given source standard.
    Colorspace { source: String },
    Scale {
        width: ScaleSize,
        height: ScaleSize,
        algorithm: ScalingAlgorithm,
    },
    /// Neural-network upscale along the vertical axis.
    NeuralUpscale { weights: PathBuf },
    Transpose(Transpose),
    CleanupDenoise,
    Sharpen,
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStage::Deinterlace => f.write_str("bwdif"),
            FilterStage::Crop { width, height } => write!(f, "crop={width}:{height}"),
            FilterStage::PixelFormat(format) => write!(f, "format={format}"),
            FilterStage::FastDenoise => f.write_str("hqdn3d=2:2:15:15"),
            FilterStage::StrongDenoise => f.write_str("nlmeans='1.0:7:5:3:3'"),
            FilterStage::Colorspace { source } => {
                write!(f, "colorspace=bt709:iall={source}:fast=1")
            }
            FilterStage::Scale { width, height, algorithm } => write!(
                f,
                "scale=w={}:h={}:flags=print_info+{}+full_chroma_inp+full_chroma_int",
                width.render("iw"),
                height.render("ih"),
                algorithm.name()
            ),
            FilterStage::NeuralUpscale { weights } => write!(
                f,
                "nnedi=weights={}:nsize='s16x6':nns='n64':pscrn='new':field='af'",
                weights.display()
            ),
            FilterStage::Transpose(Transpose::Clockwise) => f.write_str("transpose=1"),
            FilterStage::Transpose(Transpose::CounterClockwise) => f.write_str("transpose=2"),
            FilterStage::CleanupDenoise => f.write_str("hqdn3d=1:1:9:9"),
            FilterStage::Sharpen => f.write_str("unsharp=5:5:0.8:3:3:0.4"),
        }
    }
}

/// An ordered filter pipeline; displays as a comma-joined `-vf` value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPipeline {
    stages: Vec<FilterStage>,
    scaled: bool,
}

impl FilterPipeline {
    #[must_use]
    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// True when any stage changed the frame size.
    #[must_use]
    pub fn was_scaled(&self) -> bool {
        self.scaled
    }

    fn push(&mut self, stage: FilterStage) {
        if matches!(stage, FilterStage::Scale { .. }) {
            self.scaled = true;
        }
        self.stages.push(stage);
    }
}

impl fmt::Display for FilterPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}

/// Which axes of the cropped frame fall under the quality floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UpscaleNeed {
    width: bool,
    height: bool,
}

fn upscale_need(width: u32, height: u32, display_aspect_ratio: f64) -> UpscaleNeed {
    if display_aspect_ratio > WIDE_DAR {
        UpscaleNeed {
            width: width < WIDE_UPSCALE_MIN_WIDTH,
            height: height < WIDE_UPSCALE_MIN_HEIGHT,
        }
    } else {
        UpscaleNeed {
            width: width < NARROW_UPSCALE_MIN_WIDTH,
            height: height < NARROW_UPSCALE_MIN_HEIGHT,
        }
    }
}

/// Source standard for the colorspace remap, `None` when already BT.709.
fn colorspace_source(video: &ResolvedVideo) -> Option<String> {
    match video.color_primaries.as_str() {
        "unknown" => {
            let inferred = if video.height > HD_HEIGHT {
                "bt2020"
            } else if video.height > SD_HEIGHT {
                "bt709"
            } else if video.frame_rate.is_pal_family() {
                "bt601-6-625"
            } else {
                "bt601-6-525"
            };
            Some(inferred.to_string())
        }
        "bt709" => None,
        known => Some(known.to_string()),
    }
}

/// Target size for one axis of the final scale.
fn target_axis(cropped: u32, needs_upscale: bool, floor: u32, cap: u32) -> ScaleSize {
    if cropped > cap {
        ScaleSize::Pixels(cap)
    } else if needs_upscale {
        ScaleSize::Pixels(cropped.saturating_mul(2).clamp(floor, cap))
    } else {
        ScaleSize::Pixels(cropped)
    }
}

/// Builds the filter pipeline for one encode of `video`.
///
/// `force_720p` adds the target-resolution scale that fits the output inside
/// 1280x720 (doubling undersized axes on the way).
#[must_use]
pub fn build_filter_graph(
    video: &ResolvedVideo,
    config: &CoreConfig,
    force_720p: bool,
) -> FilterPipeline {
    let preset = config.preset;
    let mut pipeline = FilterPipeline::default();

    if config.decomb() && !preset.is_fastest() && video.interlaced {
        pipeline.push(FilterStage::Deinterlace);
    }

    let crop = video.crop;
    if !crop.is_full_frame(video.width, video.height) {
        pipeline.push(FilterStage::Crop {
            width: crop.width,
            height: crop.height,
        });
    }

    if preset.is_fastest() || !config.denoise() {
        if video.pixel_format != TEN_BIT_FORMAT {
            pipeline.push(FilterStage::PixelFormat(TEN_BIT_FORMAT));
        }
    } else if preset.group() == 0 {
        pipeline.push(FilterStage::FastDenoise);
        if video.pixel_format != TEN_BIT_FORMAT {
            pipeline.push(FilterStage::PixelFormat(TEN_BIT_FORMAT));
        }
    } else {
        if video.pixel_format != EIGHT_BIT_FORMAT {
            pipeline.push(FilterStage::PixelFormat(EIGHT_BIT_FORMAT));
        }
        pipeline.push(FilterStage::StrongDenoise);
        pipeline.push(FilterStage::PixelFormat(TEN_BIT_FORMAT));
    }

    if let Some(source) = colorspace_source(video) {
        pipeline.push(FilterStage::Colorspace { source });
    }

    let need = upscale_need(crop.width, crop.height, video.display_aspect_ratio);
    if preset.group() != 0 && config.super_resolution() {
        let upscale = FilterStage::NeuralUpscale {
            weights: config.nnedi_weights.clone(),
        };
        let spline = |width, height| FilterStage::Scale {
            width,
            height,
            algorithm: ScalingAlgorithm::Spline,
        };
        match (need.width, need.height) {
            (true, true) => {
                pipeline.push(spline(ScaleSize::Doubled, ScaleSize::Doubled));
                pipeline.push(upscale.clone());
                pipeline.push(FilterStage::Transpose(Transpose::Clockwise));
                pipeline.push(upscale);
                pipeline.push(FilterStage::Transpose(Transpose::CounterClockwise));
            }
            (true, false) => {
                pipeline.push(spline(ScaleSize::Doubled, ScaleSize::Unchanged));
                pipeline.push(FilterStage::Transpose(Transpose::Clockwise));
                pipeline.push(upscale);
                pipeline.push(FilterStage::Transpose(Transpose::CounterClockwise));
            }
            (false, true) => {
                pipeline.push(spline(ScaleSize::Unchanged, ScaleSize::Doubled));
                pipeline.push(upscale);
            }
            (false, false) => {}
        }
    }

    let oversized = crop.width > MAX_WIDTH || crop.height > MAX_HEIGHT;
    if force_720p && (need.width || need.height || oversized) {
        pipeline.push(FilterStage::Scale {
            width: target_axis(crop.width, need.width, WIDE_MIN_WIDTH, MAX_WIDTH),
            height: target_axis(crop.height, need.height, NARROW_MIN_HEIGHT, MAX_HEIGHT),
            algorithm: preset.scaling_algorithm(),
        });
    }

    if config.force_8bit {
        pipeline.push(FilterStage::PixelFormat(EIGHT_BIT_FORMAT));
    }

    if pipeline.was_scaled() && !preset.is_fastest() {
        pipeline.push(FilterStage::CleanupDenoise);
        pipeline.push(FilterStage::Sharpen);
    }

    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;
    use crate::media::{CropRectangle, FrameRate};

    fn hd_video() -> ResolvedVideo {
        ResolvedVideo {
            width: 1920,
            height: 1080,
            pixel_format: "yuv420p".to_string(),
            color_primaries: "bt709".to_string(),
            bitrate: 8_000_000,
            display_aspect_ratio: 16.0 / 9.0,
            duration_ms: 5_400_000,
            frame_rate: FrameRate::FILM_NTSC,
            interlaced: false,
            crop: CropRectangle::full_frame(1920, 1080),
        }
    }

    fn sd_video() -> ResolvedVideo {
        ResolvedVideo {
            width: 720,
            height: 480,
            pixel_format: "yuv420p".to_string(),
            color_primaries: "unknown".to_string(),
            bitrate: 4_000_000,
            display_aspect_ratio: 4.0 / 3.0,
            duration_ms: 2_700_000,
            frame_rate: FrameRate::NTSC,
            interlaced: true,
            crop: CropRectangle::full_frame(720, 480),
        }
    }

    fn config(preset: Preset) -> CoreConfig {
        CoreConfig { preset, ..CoreConfig::default() }
    }

    #[test]
    fn test_hd_source_scales_down_to_720p() {
        let pipeline = build_filter_graph(&hd_video(), &config(Preset::Slow), true);
        assert_eq!(
            pipeline.to_string(),
            "nlmeans='1.0:7:5:3:3',format=yuv420p10le,\
             scale=w=1280:h=720:flags=print_info+spline+full_chroma_inp+full_chroma_int,\
             hqdn3d=1:1:9:9,unsharp=5:5:0.8:3:3:0.4"
        );
        assert!(pipeline.was_scaled());
    }

    #[test]
    fn test_without_force_720p_hd_source_is_not_scaled() {
        let pipeline = build_filter_graph(&hd_video(), &config(Preset::Slow), false);
        assert!(!pipeline.was_scaled());
        assert_eq!(pipeline.to_string(), "nlmeans='1.0:7:5:3:3',format=yuv420p10le");
    }

    #[test]
    fn test_interlaced_sd_source_full_pipeline() {
        let config = CoreConfig {
            nnedi_weights: PathBuf::from("w.bin"),
            ..config(Preset::Slower)
        };
        let stages = build_filter_graph(&sd_video(), &config, true).stages().to_vec();
        let nnedi = FilterStage::NeuralUpscale { weights: PathBuf::from("w.bin") };
        assert_eq!(
            stages,
            vec![
                FilterStage::Deinterlace,
                FilterStage::StrongDenoise,
                FilterStage::PixelFormat(TEN_BIT_FORMAT),
                FilterStage::Colorspace { source: "bt601-6-525".to_string() },
                FilterStage::Scale {
                    width: ScaleSize::Doubled,
                    height: ScaleSize::Doubled,
                    algorithm: ScalingAlgorithm::Spline,
                },
                nnedi.clone(),
                FilterStage::Transpose(Transpose::Clockwise),
                nnedi,
                FilterStage::Transpose(Transpose::CounterClockwise),
                FilterStage::Scale {
                    width: ScaleSize::Pixels(1280),
                    height: ScaleSize::Pixels(720),
                    algorithm: ScalingAlgorithm::Spline,
                },
                FilterStage::CleanupDenoise,
                FilterStage::Sharpen,
            ]
        );
    }

    #[test]
    fn test_fastest_preset_skips_deinterlace_and_cleanup() {
        let pipeline = build_filter_graph(&sd_video(), &config(Preset::Ultrafast), true);
        let rendered = pipeline.to_string();
        assert!(!rendered.contains("bwdif"));
        assert!(!rendered.contains("nnedi"));
        assert!(!rendered.contains("unsharp"));
        assert!(rendered.starts_with("format=yuv420p10le,colorspace=bt709:iall=bt601-6-525:fast=1"));
        assert!(rendered.contains("flags=print_info+bicubic+"));
        assert!(pipeline.was_scaled());
    }

    #[test]
    fn test_group_zero_uses_fast_denoiser() {
        let mut video = hd_video();
        video.pixel_format = TEN_BIT_FORMAT.to_string();
        let pipeline = build_filter_graph(&video, &config(Preset::Veryfast), false);
        assert_eq!(pipeline.stages(), &[FilterStage::FastDenoise]);
    }

    #[test]
    fn test_denoise_disabled_only_normalizes_bit_depth() {
        let config = CoreConfig { skip_denoise: true, ..config(Preset::Slow) };
        let pipeline = build_filter_graph(&hd_video(), &config, false);
        assert_eq!(pipeline.stages(), &[FilterStage::PixelFormat(TEN_BIT_FORMAT)]);
    }

    #[test]
    fn test_letterboxed_source_crops_and_keeps_width() {
        let mut video = hd_video();
        video.crop = CropRectangle { width: 1920, height: 800 };
        video.display_aspect_ratio = 2.4;
        let pipeline = build_filter_graph(&video, &config(Preset::Slow), true);
        let rendered = pipeline.to_string();
        assert!(rendered.starts_with("crop=1920:800,"));
        assert!(rendered.contains("scale=w=1280:h=720:"));
    }

    #[test]
    fn test_colorspace_inference() {
        let mut video = sd_video();
        video.frame_rate = FrameRate::PAL;
        video.height = 576;
        video.crop = CropRectangle::full_frame(720, 576);
        let stages = build_filter_graph(&video, &config(Preset::Slow), false);
        assert!(stages.stages().contains(&FilterStage::Colorspace { source: "bt709".to_string() }));

        video.height = 480;
        let stages = build_filter_graph(&video, &config(Preset::Slow), false);
        assert!(stages.stages().contains(&FilterStage::Colorspace { source: "bt601-6-625".to_string() }));

        video.color_primaries = "bt470bg".to_string();
        let stages = build_filter_graph(&video, &config(Preset::Slow), false);
        assert!(stages.stages().contains(&FilterStage::Colorspace { source: "bt470bg".to_string() }));
    }

    #[test]
    fn test_single_axis_upscale() {
        // Wide frame with enough height: width only
        let mut video = hd_video();
        video.width = 960;
        video.height = 540;
        video.display_aspect_ratio = 1.85;
        video.crop = CropRectangle { width: 960, height: 520 };
        let rendered = build_filter_graph(&video, &config(Preset::Slow), true).to_string();
        assert!(rendered.contains("scale=w=iw*2:h=ih:flags=print_info+spline"));
        assert!(rendered.contains("transpose=1,nnedi="));
        assert!(rendered.contains("scale=w=1280:h=520:"));

        // Narrow frame with enough width: height only
        let mut video = hd_video();
        video.width = 1000;
        video.height = 540;
        video.display_aspect_ratio = 1.333;
        video.crop = CropRectangle::full_frame(1000, 540);
        let rendered = build_filter_graph(&video, &config(Preset::Slow), true).to_string();
        assert!(rendered.contains("scale=w=iw:h=ih*2:"));
        assert!(!rendered.contains("transpose"));
        assert!(rendered.contains("scale=w=1000:h=720:"));
    }

    #[test]
    fn test_target_axis_floors_and_caps() {
        assert_eq!(target_axis(1920, false, 1180, 1280), ScaleSize::Pixels(1280));
        assert_eq!(target_axis(500, true, 1180, 1280), ScaleSize::Pixels(1180));
        assert_eq!(target_axis(600, true, 1180, 1280), ScaleSize::Pixels(1200));
        assert_eq!(target_axis(700, true, 1180, 1280), ScaleSize::Pixels(1280));
        assert_eq!(target_axis(1000, false, 1180, 1280), ScaleSize::Pixels(1000));
        assert_eq!(target_axis(300, true, 620, 720), ScaleSize::Pixels(620));
        assert_eq!(target_axis(340, true, 620, 720), ScaleSize::Pixels(680));
    }

    #[test]
    fn test_force_8bit_downconverts_before_cleanup() {
        let config = CoreConfig { force_8bit: true, ..config(Preset::Slow) };
        let stages = build_filter_graph(&hd_video(), &config, true).stages().to_vec();
        let n = stages.len();
        assert_eq!(stages[n - 3], FilterStage::PixelFormat(EIGHT_BIT_FORMAT));
        assert_eq!(stages[n - 1], FilterStage::Sharpen);
    }
}
