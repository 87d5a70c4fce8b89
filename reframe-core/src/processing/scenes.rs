// ============================================================================
// reframe-core/src/processing/scenes.rs
// ============================================================================
//
// SCENES: Cut Detection Cache and Greedy Segmentation
//
// Scene cuts are detected once per asset and cached as JSON next to the
// staged original. Segmentation walks the cuts in order and keeps only those
// more than `min_gap` past the last accepted boundary, then closes the list
// with the stream's duration. Scene `i` covers `[boundary[i-1], boundary[i]]`
// with an implicit first boundary at zero.
//
// Finished scene encodes are only valid for the boundaries they were cut
// with. The boundaries are recorded next to the cut cache, and a run that
// plans different boundaries (another core count, a re-detected cache)
// discards every existing `.ptN` before encoding.

// ---- Standard library imports ----
use std::fs;
use std::path::{Path, PathBuf};

// ---- External crate imports ----
use log::{debug, info, warn};

// ---- Internal crate imports ----
use crate::error::CoreResult;
use crate::media::{Prober, SCENE_CUT_THRESHOLD, SceneCut};

/// Name of the cut cache inside an asset's cache directory.
pub const SCENE_CACHE_FILE: &str = "scenes.json";

/// Name of the recorded scene boundaries inside an asset's cache directory.
pub const SCENE_PLAN_FILE: &str = "plan.json";

/// Upper bound on the gap between accepted boundaries, in milliseconds.
pub const MAX_SCENE_GAP_MS: u64 = 300_000;

/// One independently encodable segment of the staged original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    pub index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Finished encode; its existence marks the scene as done.
    pub output: PathBuf,
    /// Where the encoder writes before the finished file is renamed to `output`.
    pub staging: PathBuf,
}

impl Scene {
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.output.exists()
    }

    /// Start as a decimal-seconds timestamp.
    #[must_use]
    pub fn start_timestamp(&self) -> String {
        ms_to_timestamp(self.start_ms)
    }

    #[must_use]
    pub fn end_timestamp(&self) -> String {
        ms_to_timestamp(self.end_ms)
    }
}

/// `1234567` ms -> `"1234.567"`.
#[must_use]
pub fn ms_to_timestamp(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

fn suffixed(source: &Path, suffix: &str) -> PathBuf {
    let mut name = source.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// `<source>.pt<index>`.
#[must_use]
pub fn scene_output_path(source: &Path, index: usize) -> PathBuf {
    suffixed(source, &format!(".pt{index}"))
}

/// `<source>.tmp.pt<index>`.
#[must_use]
pub fn scene_staging_path(source: &Path, index: usize) -> PathBuf {
    suffixed(source, &format!(".tmp.pt{index}"))
}

/// Minimum spacing between accepted boundaries for this duration and pool size.
#[must_use]
pub fn min_scene_gap_ms(duration_ms: u64, cores: usize) -> u64 {
    let cores = cores.max(1) as u64;
    MAX_SCENE_GAP_MS.min(duration_ms / cores)
}

/// Greedily merges detected cuts into scene end boundaries.
///
/// The result is strictly increasing and always ends with `duration_ms`. Cuts
/// at or past the end of the stream are ignored.
#[must_use]
pub fn segment_boundaries(cut_times_ms: &[u64], duration_ms: u64, min_gap_ms: u64) -> Vec<u64> {
    let mut boundaries = Vec::new();
    let mut previous = 0;
    for &time in cut_times_ms {
        if time >= duration_ms {
            continue;
        }
        if time > previous && time - previous > min_gap_ms {
            boundaries.push(time);
            previous = time;
        }
    }
    boundaries.push(duration_ms);
    boundaries
}

/// Turns end boundaries into scenes over `source`.
#[must_use]
pub fn plan_scenes(source: &Path, boundaries: &[u64]) -> Vec<Scene> {
    let mut start_ms = 0;
    boundaries
        .iter()
        .enumerate()
        .map(|(index, &end_ms)| {
            let scene = Scene {
                index,
                start_ms,
                end_ms,
                output: scene_output_path(source, index),
                staging: scene_staging_path(source, index),
            };
            start_ms = end_ms;
            scene
        })
        .collect()
}

fn read_cached_cuts(cache_file: &Path) -> CoreResult<Vec<SceneCut>> {
    let text = fs::read_to_string(cache_file)?;
    Ok(serde_json::from_str(&text)?)
}

/// Returns the cached cuts for `source`, running detection and writing the
/// cache when there is none. An unreadable cache is detected again.
pub fn load_or_detect_cuts(
    prober: &dyn Prober,
    source: &Path,
    cache_file: &Path,
) -> CoreResult<Vec<SceneCut>> {
    if cache_file.exists() {
        match read_cached_cuts(cache_file) {
            Ok(cuts) => {
                debug!("Loaded {} cached scene cuts from {}", cuts.len(), cache_file.display());
                return Ok(cuts);
            }
            Err(e) => warn!("Ignoring unreadable scene cache {}: {e}", cache_file.display()),
        }
    }

    info!("Detecting scenes in {}", source.display());
    let cuts = prober.detect_scene_cuts(source, SCENE_CUT_THRESHOLD)?;
    fs::write(cache_file, serde_json::to_string_pretty(&cuts)?)?;
    debug!("Cached {} scene cuts to {}", cuts.len(), cache_file.display());
    Ok(cuts)
}

/// Removes every finished or staged scene encode of `source`.
fn remove_scene_outputs(source: &Path) -> CoreResult<usize> {
    let (Some(dir), Some(name)) = (source.parent(), source.file_name().and_then(|n| n.to_str())) else {
        return Ok(0);
    };
    let finished = format!("{name}.pt");
    let staging = format!("{name}.tmp.pt");

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let index = file_name
            .strip_prefix(&finished)
            .or_else(|| file_name.strip_prefix(&staging));
        if index.is_some_and(|i| !i.is_empty() && i.bytes().all(|b| b.is_ascii_digit())) {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Keeps finished scene encodes only when `plan_file` records the same
/// boundaries, then records `boundaries`. Returns how many encodes were
/// discarded.
pub fn reconcile_plan(source: &Path, plan_file: &Path, boundaries: &[u64]) -> CoreResult<usize> {
    let previous: Option<Vec<u64>> = fs::read_to_string(plan_file)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok());
    if previous.as_deref() == Some(boundaries) {
        return Ok(0);
    }

    let removed = remove_scene_outputs(source)?;
    if removed > 0 {
        warn!(
            "Scene plan for {} changed; discarded {removed} earlier scene encodes",
            source.display()
        );
    }
    fs::write(plan_file, serde_json::to_string(boundaries)?)?;
    Ok(removed)
}

/// Detects (or loads) cuts and segments `source` into scenes.
pub fn scenes_for(
    prober: &dyn Prober,
    source: &Path,
    cache_dir: &Path,
    duration_ms: u64,
    cores: usize,
) -> CoreResult<Vec<Scene>> {
    let cuts = load_or_detect_cuts(prober, source, &cache_dir.join(SCENE_CACHE_FILE))?;
    let times: Vec<u64> = cuts
        .iter()
        .filter(|cut| cut.time.is_finite() && cut.time >= 0.0)
        .map(|cut| (cut.time * 1000.0).round() as u64)
        .collect();

    let min_gap = min_scene_gap_ms(duration_ms, cores);
    let boundaries = segment_boundaries(&times, duration_ms, min_gap);
    reconcile_plan(source, &cache_dir.join(SCENE_PLAN_FILE), &boundaries)?;
    let scenes = plan_scenes(source, &boundaries);

    for scene in &scenes {
        debug!(
            "scene {} {} -> {}",
            scene.index,
            scene.start_timestamp(),
            scene.end_timestamp()
        );
    }
    info!(
        "{} scenes (min gap {}s) from {} detected cuts",
        scenes.len(),
        ms_to_timestamp(min_gap),
        cuts.len()
    );
    Ok(scenes)
}
