// ============================================================================
// reframe-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: ffmpeg-sidecar Backed Transcoder and Analysis Passes
//
// Every ffmpeg invocation goes through `run_ffmpeg`: spawn, drain the event
// stream, wait. Log lines are handed back so the analysis passes (cropdetect,
// idet, scene scoring) can parse what the filters print. A non-zero exit
// becomes `CommandFailed` carrying the last error lines.

// ---- Standard library imports ----
use std::path::Path;
use std::process::{Command, ExitStatus};

// ---- External crate imports ----
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use log::{debug, trace};

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use crate::external::{TranscodeJob, Transcoder};
use crate::media::normalize::parse_idet_summary;
use crate::media::{IdetCounts, SceneCut};

/// Error lines kept for the failure message.
const ERROR_TAIL: usize = 8;

/// Spawns ffmpeg with `args`, drains its events and waits for it.
///
/// Returns every log line on success.
pub fn run_ffmpeg(args: &[String], label: &str) -> CoreResult<Vec<String>> {
    let mut cmd = FfmpegCommand::new();
    cmd.arg("-hide_banner");
    cmd.args(args);
    debug!("Running ffmpeg ({label}): {}", args.join(" "));

    let mut child = cmd
        .spawn()
        .map_err(|e| command_start_error(format!("ffmpeg ({label})"), e))?;

    let iterator = child.iter().map_err(|e| {
        command_failed_error(format!("ffmpeg ({label})"), ExitStatus::default(), e.to_string())
    })?;

    let mut lines = Vec::new();
    let mut errors = Vec::new();
    for event in iterator {
        match event {
            FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, line) | FfmpegEvent::Error(line) => {
                trace!("ffmpeg ({label}) error: {line}");
                errors.push(line.clone());
                lines.push(line);
            }
            FfmpegEvent::Log(_, line) => lines.push(line),
            _ => {}
        }
    }

    let status = child
        .wait()
        .map_err(|e| command_start_error(format!("ffmpeg ({label})"), e))?;
    if !status.success() {
        let tail = errors.len().saturating_sub(ERROR_TAIL);
        return Err(command_failed_error(
            format!("ffmpeg ({label})"),
            status,
            errors[tail..].join("\n"),
        ));
    }
    Ok(lines)
}

// ============================================================================
// TRANSCODER
// ============================================================================

/// Runs [`TranscodeJob`]s through ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct SidecarTranscoder;

impl SidecarTranscoder {
    pub fn new() -> Self {
        Self
    }
}

impl Transcoder for SidecarTranscoder {
    fn transcode(&self, job: &TranscodeJob) -> CoreResult<()> {
        run_ffmpeg(&job.to_args(), job.step()).map_err(|e| CoreError::TranscodeFailed {
            step: job.step().to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    fn capabilities(&self) -> CoreResult<String> {
        let output = Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map_err(|e| command_start_error("ffmpeg -version", e))?;
        if !output.status.success() {
            return Err(command_failed_error(
                "ffmpeg -version",
                output.status,
                String::from_utf8_lossy(&output.stderr),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ============================================================================
// ANALYSIS PASSES
// ============================================================================

/// Crop detection over every 1000th frame of the first 1000 seconds.
pub fn crop_detection(input: &Path) -> CoreResult<Option<String>> {
    let args = vec![
        "-t".to_string(),
        "1000".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-vf".to_string(),
        r"select=not(mod(n\,1000)),cropdetect=36:1:0".to_string(),
        "-an".to_string(),
        "-f".to_string(),
        "null".to_string(),
        "-".to_string(),
    ];
    let lines = run_ffmpeg(&args, "cropdetect")?;
    Ok(parse_last_crop(&lines))
}

/// Interlace detection over the whole stream.
pub fn interlace_detection(input: &Path) -> CoreResult<IdetCounts> {
    let args = vec![
        "-i".to_string(),
        input.display().to_string(),
        "-vf".to_string(),
        "idet".to_string(),
        "-an".to_string(),
        "-f".to_string(),
        "null".to_string(),
        "-".to_string(),
    ];
    let lines = run_ffmpeg(&args, "idet")?;
    lines
        .iter()
        .rev()
        .find_map(|line| parse_idet_summary(line))
        .ok_or_else(|| CoreError::ProbeParse(format!("no idet summary for {}", input.display())))
}

/// Frames whose scene score exceeds `threshold`.
pub fn scene_detection(input: &Path, threshold: f64) -> CoreResult<Vec<SceneCut>> {
    let args = vec![
        "-i".to_string(),
        input.display().to_string(),
        "-vf".to_string(),
        format!(r"select=gt(scene\,{threshold}),metadata=print"),
        "-an".to_string(),
        "-f".to_string(),
        "null".to_string(),
        "-".to_string(),
    ];
    let lines = run_ffmpeg(&args, "scene detection")?;
    Ok(parse_scene_metadata(&lines))
}

/// `w:h:x:y`, all unsigned integers.
fn is_valid_crop_format(crop: &str) -> bool {
    let parts: Vec<&str> = crop.split(':').collect();
    parts.len() == 4 && parts.iter().all(|part| part.parse::<u32>().is_ok())
}

/// The last well-formed `crop=` value printed by cropdetect.
fn parse_last_crop(lines: &[String]) -> Option<String> {
    lines.iter().rev().find_map(|line| {
        let value = line.split("crop=").nth(1)?.split_whitespace().next()?;
        is_valid_crop_format(value).then(|| format!("crop={value}"))
    })
}

/// Pairs each `pts_time:` line from `metadata=print` with the scene score
/// that follows it.
fn parse_scene_metadata(lines: &[String]) -> Vec<SceneCut> {
    let mut cuts = Vec::new();
    let mut pending_time = None;
    for line in lines {
        if let Some(rest) = line.split("pts_time:").nth(1) {
            pending_time = rest.split_whitespace().next().and_then(|t| t.parse::<f64>().ok());
        } else if let Some(rest) = line.split("lavfi.scene_score=").nth(1) {
            let score = rest.trim().parse::<f64>().ok();
            if let (Some(time), Some(score)) = (pending_time.take(), score) {
                cuts.push(SceneCut { time, score });
            }
        }
    }
    cuts
}
