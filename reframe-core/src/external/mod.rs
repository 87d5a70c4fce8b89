// ============================================================================
// reframe-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: The Prober and Transcoder Seams and Their ffmpeg Backends
//
// The core never spawns a process directly. It asks a `Prober` about streams
// and hands structured `TranscodeJob`s to a `Transcoder`. Production code
// plugs in the ffprobe-crate prober and the ffmpeg-sidecar transcoder from
// this module; tests plug in deterministic fakes.
//
// KEY COMPONENTS:
// - Transcoder: runs one job synchronously, success or failure
// - TranscodeJob: the job shapes the core issues, with their argument lists
// - CrateFfprobeExecutor / SidecarTranscoder: the real backends
// - check_dependency: verifies a tool can be started

// ---- Standard library imports ----
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};
use crate::processing::audio::AudioEncodeJob;
use crate::processing::encode_job::EncodeJob;

// ============================================================================
// SUBMODULES
// ============================================================================

/// ffmpeg-sidecar backed Transcoder and analysis passes
pub mod ffmpeg_executor;

/// ffprobe-crate backed Prober
pub mod ffprobe_executor;

pub use ffmpeg_executor::SidecarTranscoder;
pub use ffprobe_executor::CrateFfprobeExecutor;

// ============================================================================
// TRANSCODER INTERFACE
// ============================================================================

/// One unit of transcoder work.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscodeJob {
    /// Encode one scene of a staged original.
    SceneEncode(EncodeJob),
    /// Stream-copy the files named in a concat list into one output.
    Concat { list_file: PathBuf, output: PathBuf },
    /// Stream-copy the first audio track into its own file.
    AudioExtract { input: PathBuf, output: PathBuf },
    /// Re-encode audio against a copied video stream.
    AudioEncode(AudioEncodeJob),
}

impl TranscodeJob {
    /// Short name used in logs and errors.
    #[must_use]
    pub fn step(&self) -> &'static str {
        match self {
            TranscodeJob::SceneEncode(_) => "scene encode",
            TranscodeJob::Concat { .. } => "concat",
            TranscodeJob::AudioExtract { .. } => "audio extract",
            TranscodeJob::AudioEncode(_) => "audio encode",
        }
    }

    /// The file the job produces.
    #[must_use]
    pub fn output(&self) -> &Path {
        match self {
            TranscodeJob::SceneEncode(job) => &job.output,
            TranscodeJob::Concat { output, .. } | TranscodeJob::AudioExtract { output, .. } => {
                output
            }
            TranscodeJob::AudioEncode(job) => &job.output,
        }
    }

    /// ffmpeg arguments for the job, without the program name.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        match self {
            TranscodeJob::SceneEncode(job) => job.to_args(),
            TranscodeJob::AudioEncode(job) => job.to_args(),
            TranscodeJob::Concat { list_file, output } => vec![
                "-f".into(),
                "concat".into(),
                "-safe".into(),
                "0".into(),
                "-i".into(),
                list_file.display().to_string(),
                "-c".into(),
                "copy".into(),
                "-y".into(),
                output.display().to_string(),
            ],
            TranscodeJob::AudioExtract { input, output } => vec![
                "-i".into(),
                input.display().to_string(),
                "-vn".into(),
                "-map".into(),
                "0:a:0".into(),
                "-c:a".into(),
                "copy".into(),
                "-y".into(),
                output.display().to_string(),
            ],
        }
    }
}

/// Runs transcoder jobs.
///
/// `transcode` blocks until the job finishes. On `Err` the job's output must
/// be assumed missing or partial. Implementations are shared across scene
/// workers, hence `Sync`.
pub trait Transcoder: Send + Sync {
    fn transcode(&self, job: &TranscodeJob) -> CoreResult<()>;

    /// The transcoder's build/capability listing (e.g. `ffmpeg -version`).
    fn capabilities(&self) -> CoreResult<String>;
}

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Checks that `cmd_name` can be started with `-version`.
///
/// # Returns
///
/// * `Ok(())` - The command ran
/// * `Err(CoreError::DependencyNotFound)` - Not on `PATH`
/// * `Err(CoreError::CommandStart)` - Found but could not be started
pub fn check_dependency(cmd_name: &str) -> CoreResult<()> {
    let result = Command::new(cmd_name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {cmd_name}");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{cmd_name}' not found.");
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{cmd_name}': {e}");
            Err(CoreError::CommandStart(cmd_name.to_string(), e))
        }
    }
}
