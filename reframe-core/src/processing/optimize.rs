// ============================================================================
// reframe-core/src/processing/optimize.rs
// ============================================================================
//
// OPTIMIZER: Asset-Level Orchestration
//
// Runs one asset through the delivery pipeline:
//
//   verdict -> (dry run stops here) -> video re-encode -> audio backup
//   -> audio re-encode -> cleanup
//
// The video re-encode works on a copy of the live file in the per-asset cache
// directory, splits it into scenes, encodes them in parallel, joins them
// losslessly, and swaps the result in. The cache directory survives a failed
// run so the next run resumes from the finished scenes.

// ---- Standard library imports ----
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ---- External crate imports ----
use log::{debug, info, warn};
use once_cell::sync::OnceCell;

// ---- Internal crate imports ----
use crate::config::{AudioCodec, CoreConfig};
use crate::error::CoreResult;
use crate::external::{TranscodeJob, Transcoder};
use crate::media::{MediaAsset, Prober, VideoDescriptor};
use crate::processing::audio::{backup_audio, optimize_audio};
use crate::processing::budget::{self, BitrateBudget, StreamFacts, max_audio_bitrate};
use crate::processing::encode_job::{EncodeJob, check_video_budget};
use crate::processing::filter_graph::build_filter_graph;
use crate::processing::scenes::{Scene, scenes_for};
use crate::processing::scheduler::run_scenes;
use crate::processing::swap::{VIDEO_BACKUP_SUFFIX, atomic_replace, backup_path, cleanup};

/// Name of the staged copy of the live file inside the asset cache.
pub const STAGED_ORIGINAL_STEM: &str = "original";

/// Name of the joined encode inside the asset cache.
pub const JOINED_OUTPUT_FILE: &str = "optimized.mp4";

/// What `Optimizer::optimize` did to an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do.
    AlreadyOptimized,
    /// Work was needed but only announced.
    DryRun,
    Optimized { video: bool, audio: bool },
}

/// Drives assets through the pipeline with one configuration and one pair of
/// tool backends.
pub struct Optimizer<'a> {
    config: &'a CoreConfig,
    prober: Arc<dyn Prober>,
    transcoder: &'a dyn Transcoder,
    audio_codec: OnceCell<AudioCodec>,
}

impl<'a> Optimizer<'a> {
    pub fn new(config: &'a CoreConfig, prober: Arc<dyn Prober>, transcoder: &'a dyn Transcoder) -> Self {
        Self {
            config,
            prober,
            transcoder,
            audio_codec: OnceCell::new(),
        }
    }

    /// Audio encoder, chosen from the transcoder's capabilities on first use.
    pub fn audio_codec(&self) -> AudioCodec {
        *self.audio_codec.get_or_init(|| {
            let codec = match self.transcoder.capabilities() {
                Ok(listing) => AudioCodec::from_capabilities(&listing),
                Err(e) => {
                    warn!("Could not read transcoder capabilities ({e}), using aac");
                    AudioCodec::Aac
                }
            };
            debug!("Audio codec: {}", codec.encoder());
            codec
        })
    }

    /// Optimizes one asset.
    ///
    /// # Errors
    ///
    /// Any step failure aborts the asset with the live file untouched, except
    /// `CoreError::RollbackFailed`, which callers must treat as fatal.
    pub fn optimize(&self, asset: &mut MediaAsset) -> CoreResult<Outcome> {
        let facts = StreamFacts::from_asset(asset)?;
        let cap = self.config.bitrate_cap;

        if budget::optimized(&facts, cap) {
            info!("{} is already optimized", asset.name());
            return Ok(Outcome::AlreadyOptimized);
        }

        let video_needed = !budget::optimized_video(&facts, cap);
        let audio_needed = asset.audio().has_stream() && !budget::optimized_audio(&facts);
        info!(
            "Optimizing {} (video: {}, audio: {})",
            asset.name(),
            if video_needed { "re-encode" } else { "keep" },
            if audio_needed { "re-encode" } else { "keep" }
        );
        if self.config.dry_run {
            info!("Dry run, leaving {} untouched", asset.name());
            return Ok(Outcome::DryRun);
        }

        if video_needed {
            self.optimize_video(asset, facts.channels)?;
        }

        let mut audio_done = false;
        if asset.audio().has_stream() {
            backup_audio(asset, self.transcoder)?;
            // Re-read: the video swap may have changed the live file
            let facts = StreamFacts::from_asset(asset)?;
            if !budget::optimized_audio(&facts) {
                optimize_audio(
                    asset,
                    self.transcoder,
                    self.audio_codec(),
                    max_audio_bitrate(facts.channels),
                )?;
                audio_done = true;
            }
        } else {
            debug!("{} has no audio stream", asset.name());
        }

        if self.config.skip_cleanup {
            info!("Keeping backups of {}", asset.name());
        } else {
            let removed = cleanup(asset.dir())?;
            debug!("Removed {removed} backup entries from {}", asset.dir().display());
        }

        Ok(Outcome::Optimized {
            video: video_needed,
            audio: audio_done,
        })
    }

    /// Scene-parallel re-encode of the asset's video, swapped in at
    /// `<dir>/<name>.mp4`.
    fn optimize_video(&self, asset: &mut MediaAsset, channels: u32) -> CoreResult<()> {
        let budget = BitrateBudget::new(self.config.bitrate_cap, channels);
        check_video_budget(self.config, &budget)?;

        let cache = asset.cache_dir(&self.config.cache_dir);
        fs::create_dir_all(&cache)?;

        let staged = stage_original(asset, &cache)?;
        let source = VideoDescriptor::new(&staged, Arc::clone(&self.prober)).resolve(self.config)?;
        let filters = build_filter_graph(&source, self.config, true);
        info!(
            "Video plan for {}: {}x{} @ {} fps, budget {}, filters [{}]",
            asset.name(),
            source.width,
            source.height,
            source.frame_rate,
            crate::utils::format_bitrate(budget.video),
            filters
        );

        let scenes = scenes_for(
            self.prober.as_ref(),
            &staged,
            &cache,
            source.duration_ms,
            self.config.cores,
        )?;
        run_scenes(&scenes, self.config.cores, self.transcoder, |scene| {
            EncodeJob::for_scene(
                scene,
                staged.clone(),
                filters.clone(),
                source.frame_rate,
                self.config,
                &budget,
            )
        })?;

        let joined = cache.join(JOINED_OUTPUT_FILE);
        join_scenes(&scenes, &joined, self.transcoder)?;

        let target = asset.target_path();
        info!("Swapping optimized video into {}", target.display());
        atomic_replace(asset.path(), &joined, &target, VIDEO_BACKUP_SUFFIX)?;
        asset.repoint(target);

        if let Err(e) = fs::remove_dir_all(&cache) {
            warn!("Could not remove cache {}: {e}", cache.display());
        }
        Ok(())
    }
}

/// Copies the live file into the cache once. Later runs reuse the copy.
fn stage_original(asset: &MediaAsset, cache: &Path) -> CoreResult<PathBuf> {
    let staged = cache.join(format!("{STAGED_ORIGINAL_STEM}.{}", asset.extension()));
    if staged.exists() {
        debug!("Reusing staged original {}", staged.display());
        return Ok(staged);
    }

    info!("Staging {} into {}", asset.path().display(), cache.display());
    let partial = backup_path(&staged, ".partial");
    fs::copy(asset.path(), &partial)?;
    fs::rename(&partial, &staged)?;
    Ok(staged)
}

/// One `file '...'` line per scene, in index order.
fn concat_list(scenes: &[Scene]) -> String {
    scenes
        .iter()
        .map(|scene| {
            let path = scene.output.display().to_string().replace('\'', r"'\''");
            format!("file '{path}'\n")
        })
        .collect()
}

/// Stream-copies the finished scenes into `output`.
fn join_scenes(scenes: &[Scene], output: &Path, transcoder: &dyn Transcoder) -> CoreResult<()> {
    let list_dir = tempfile::tempdir()?;
    let list_file = list_dir.path().join("scenes.txt");
    let mut file = fs::File::create(&list_file)?;
    file.write_all(concat_list(scenes).as_bytes())?;
    file.sync_all()?;

    info!("Joining {} scenes into {}", scenes.len(), output.display());
    transcoder.transcode(&TranscodeJob::Concat {
        list_file,
        output: output.to_path_buf(),
    })
}
