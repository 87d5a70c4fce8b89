// ============================================================================
// reframe-core/src/processing/scheduler.rs
// ============================================================================
//
// SCENE SCHEDULER: Bounded Parallel Scene Encodes
//
// Scene encodes run on a dedicated rayon pool of `cores` threads. Each worker
// owns a disjoint pair of paths (`.tmp.ptN` while encoding, `.ptN` when
// finished), so no locking is needed. A scene whose `.ptN` already exists is
// skipped, which is what makes an interrupted run resumable.
//
// The pool always drains: a failed scene does not cancel its siblings, and
// the batch result is only reported once every scene has settled.

// ---- Standard library imports ----
use std::fs;
use std::time::Instant;

// ---- External crate imports ----
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, error, info};
use rayon::prelude::*;

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};
use crate::external::{TranscodeJob, Transcoder};
use crate::processing::encode_job::EncodeJob;
use crate::processing::scenes::Scene;

/// How one scene settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneStatus {
    /// Output was already on disk.
    Skipped,
    Encoded,
    Failed,
}

/// Per-scene outcome of a batch, in scene order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub statuses: Vec<SceneStatus>,
}

impl BatchReport {
    fn count(&self, status: SceneStatus) -> usize {
        self.statuses.iter().filter(|s| **s == status).count()
    }

    #[must_use]
    pub fn encoded(&self) -> usize {
        self.count(SceneStatus::Encoded)
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(SceneStatus::Skipped)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(SceneStatus::Failed)
    }
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
    let style = ProgressStyle::with_template("  Scenes: {pos}/{len} [{bar:30}] {elapsed_precise} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##.");
    pb.set_style(style);
    pb
}

/// Encodes one scene unless its output already exists.
fn run_scene<F>(scene: &Scene, transcoder: &dyn Transcoder, build_job: &F) -> CoreResult<SceneStatus>
where
    F: Fn(&Scene) -> EncodeJob,
{
    if scene.is_complete() {
        debug!("Scene {} already encoded, skipping", scene.index);
        return Ok(SceneStatus::Skipped);
    }

    let job = build_job(scene);
    let started = Instant::now();
    transcoder.transcode(&TranscodeJob::SceneEncode(job))?;
    fs::rename(&scene.staging, &scene.output)?;
    debug!(
        "Scene {} encoded in {:.1}s",
        scene.index,
        started.elapsed().as_secs_f64()
    );
    Ok(SceneStatus::Encoded)
}

/// Runs every scene encode on a pool of `cores` workers and waits for all of
/// them.
///
/// # Arguments
///
/// * `scenes` - Scenes in index order
/// * `cores` - Maximum concurrent encodes (at least 1 is used)
/// * `transcoder` - Runs each scene job
/// * `build_job` - Produces the encode job for a scene
///
/// # Returns
///
/// * `Ok(BatchReport)` - Every scene is on disk
/// * `Err(CoreError::SceneBatchFailed)` - At least one scene failed; finished
///   scenes were kept
pub fn run_scenes<F>(
    scenes: &[Scene],
    cores: usize,
    transcoder: &dyn Transcoder,
    build_job: F,
) -> CoreResult<BatchReport>
where
    F: Fn(&Scene) -> EncodeJob + Sync,
{
    let workers = cores.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("reframe-scene-{i}"))
        .build()
        .map_err(|e| CoreError::Config(format!("Failed to build scene worker pool: {e}")))?;

    info!("Encoding {} scenes on {workers} workers", scenes.len());
    let pb = progress_bar(scenes.len());

    let statuses: Vec<SceneStatus> = pool.install(|| {
        scenes
            .par_iter()
            .map(|scene| {
                let status = match run_scene(scene, transcoder, &build_job) {
                    Ok(status) => status,
                    Err(e) => {
                        error!("Scene {} failed: {e}", scene.index);
                        SceneStatus::Failed
                    }
                };
                pb.inc(1);
                status
            })
            .collect()
    });
    pb.finish_and_clear();

    let report = BatchReport { statuses };
    info!(
        "Scenes: {} encoded, {} resumed, {} failed",
        report.encoded(),
        report.skipped(),
        report.failed()
    );

    if report.failed() > 0 {
        return Err(CoreError::SceneBatchFailed {
            failed: report.failed(),
            total: scenes.len(),
        });
    }
    Ok(report)
}
