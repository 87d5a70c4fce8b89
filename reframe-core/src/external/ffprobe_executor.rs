//! ffprobe integration: the production [`Prober`].
//!
//! Attributes come from the `ffprobe` crate's JSON model; the three analysis
//! passes are ffmpeg filter runs (see [`super::ffmpeg_executor`]).
//!
//! One ffprobe run answers every attribute of a file. Results are kept per
//! path and reused while the file's size and modification time are unchanged,
//! so a swapped-in file is probed again.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use ffprobe::{FfProbe, FfProbeError, ffprobe};

use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use crate::external::ffmpeg_executor;
use crate::media::{IdetCounts, Prober, SceneCut, StreamAttribute};

/// Identity of a file's contents as far as the cache is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

impl FileStamp {
    fn of(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok()?;
        Some(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

/// Per-path results, invalidated when the file changes on disk.
#[derive(Debug)]
struct ProbeCache<T> {
    entries: Mutex<HashMap<PathBuf, (FileStamp, Arc<T>)>>,
}

impl<T> Default for ProbeCache<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> ProbeCache<T> {
    /// Returns the cached value for `path`, or runs `load` and caches its
    /// result. Errors are not cached; nor is anything for a file whose
    /// metadata cannot be read.
    fn get_or_load<F>(&self, path: &Path, load: F) -> CoreResult<Arc<T>>
    where
        F: FnOnce() -> CoreResult<T>,
    {
        let stamp = FileStamp::of(path);
        if let Some(stamp) = stamp {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            if let Some((cached, value)) = entries.get(path) {
                if *cached == stamp {
                    return Ok(Arc::clone(value));
                }
            }
        }

        let value = Arc::new(load()?);
        if let Some(stamp) = stamp {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.insert(path.to_path_buf(), (stamp, Arc::clone(&value)));
        }
        Ok(value)
    }
}

#[derive(Debug, Default)]
pub struct CrateFfprobeExecutor {
    cache: ProbeCache<FfProbe>,
}

impl CrateFfprobeExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Picks `attribute` out of a probe result. Missing values are empty strings.
fn extract(metadata: &FfProbe, attribute: StreamAttribute) -> String {
    if attribute == StreamAttribute::Duration {
        return metadata.format.duration.clone().unwrap_or_default();
    }

    let codec_type = if attribute.is_audio() { "audio" } else { "video" };
    let Some(stream) = metadata
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some(codec_type))
    else {
        return String::new();
    };

    let value = match attribute {
        StreamAttribute::Width => stream.width.map(|w| w.to_string()),
        StreamAttribute::Height => stream.height.map(|h| h.to_string()),
        StreamAttribute::PixelFormat => stream.pix_fmt.clone(),
        StreamAttribute::ColorPrimaries => stream.color_primaries.clone(),
        StreamAttribute::VideoBitrate | StreamAttribute::AudioBitrate => stream.bit_rate.clone(),
        StreamAttribute::DisplayAspectRatio => stream.display_aspect_ratio.clone(),
        StreamAttribute::SampleAspectRatio => stream.sample_aspect_ratio.clone(),
        StreamAttribute::RealFrameRate => Some(stream.r_frame_rate.clone()),
        StreamAttribute::AverageFrameRate => Some(stream.avg_frame_rate.clone()),
        StreamAttribute::AudioChannels => stream.channels.map(|c| c.to_string()),
        StreamAttribute::Duration => None,
    };
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

impl Prober for CrateFfprobeExecutor {
    fn probe(&self, path: &Path, attribute: StreamAttribute) -> CoreResult<String> {
        log::trace!("Probing {attribute} of {}", path.display());
        let metadata = self.cache.get_or_load(path, || {
            log::debug!("Running ffprobe on {}", path.display());
            ffprobe(path).map_err(|err| map_ffprobe_error(err, path, attribute))
        })?;
        Ok(extract(&metadata, attribute))
    }

    fn detect_crop(&self, path: &Path) -> CoreResult<Option<String>> {
        ffmpeg_executor::crop_detection(path)
    }

    fn detect_interlace(&self, path: &Path) -> CoreResult<IdetCounts> {
        ffmpeg_executor::interlace_detection(path)
    }

    fn detect_scene_cuts(&self, path: &Path, threshold: f64) -> CoreResult<Vec<SceneCut>> {
        ffmpeg_executor::scene_detection(path, threshold)
    }
}

fn map_ffprobe_error(err: FfProbeError, path: &Path, attribute: StreamAttribute) -> CoreError {
    let context = format!("ffprobe ({attribute})");
    match err {
        FfProbeError::Io(io_err) => command_start_error(context, io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(context, output.status, stderr)
        }
        other => CoreError::ProbeFailed {
            path: path.to_path_buf(),
            attribute: attribute.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_probe_cache_reuses_until_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Movie.mp4");
        fs::write(&path, b"first").unwrap();

        let cache = ProbeCache::default();
        let loads = Cell::new(0);
        let load = || {
            loads.set(loads.get() + 1);
            Ok(loads.get())
        };

        assert_eq!(*cache.get_or_load(&path, load).unwrap(), 1);
        assert_eq!(*cache.get_or_load(&path, load).unwrap(), 1);
        assert_eq!(loads.get(), 1);

        // A swap replaces the file with different contents
        fs::write(&path, b"replaced with a longer file").unwrap();
        assert_eq!(*cache.get_or_load(&path, load).unwrap(), 2);
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn test_probe_cache_does_not_keep_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Movie.mkv");
        fs::write(&path, b"data").unwrap();
        let cache: ProbeCache<u32> = ProbeCache::default();

        let failed = cache.get_or_load(&path, || Err(CoreError::Config("boom".to_string())));
        assert!(failed.is_err());
        assert_eq!(*cache.get_or_load(&path, || Ok(7)).unwrap(), 7);

        // Missing files are never cached
        let missing = dir.path().join("missing.mkv");
        assert_eq!(*cache.get_or_load(&missing, || Ok(1)).unwrap(), 1);
        assert_eq!(*cache.get_or_load(&missing, || Ok(2)).unwrap(), 2);
    }
}
