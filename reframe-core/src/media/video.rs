// ============================================================================
// reframe-core/src/media/video.rs
// ============================================================================
//
// VIDEO DESCRIPTOR: Lazily Probed, Memoized Video Stream Attributes
//
// Each field is fetched from the Prober on first access and cached for the
// lifetime of the descriptor. A failed probe is not cached, so a later access
// retries. The descriptor is never invalidated in place; `MediaAsset::repoint`
// replaces it wholesale.
//
// The expensive analysis passes (crop detection, interlace detection) only
// run when something asks for them.

// ---- Standard library imports ----
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ---- External crate imports ----
use log::{debug, warn};
use once_cell::sync::OnceCell;

// ---- Internal crate imports ----
use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::media::normalize::{self, CropRectangle, FrameRate, UNKNOWN_BITRATE};
use crate::media::probe::{Prober, StreamAttribute};

/// Memoized view of a file's first video stream.
pub struct VideoDescriptor {
    path: PathBuf,
    prober: Arc<dyn Prober>,
    width: OnceCell<u32>,
    height: OnceCell<u32>,
    pixel_format: OnceCell<String>,
    color_primaries: OnceCell<String>,
    bitrate: OnceCell<i64>,
    display_aspect_ratio: OnceCell<f64>,
    sample_aspect_ratio: OnceCell<f64>,
    duration_ms: OnceCell<u64>,
    frame_rate: OnceCell<FrameRate>,
    interlaced: OnceCell<bool>,
    crop: OnceCell<CropRectangle>,
}

impl std::fmt::Debug for VideoDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoDescriptor")
            .field("path", &self.path)
            .field("width", &self.width.get())
            .field("height", &self.height.get())
            .field("bitrate", &self.bitrate.get())
            .field("frame_rate", &self.frame_rate.get())
            .finish_non_exhaustive()
    }
}

/// Every attribute the filter graph and encode jobs need, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVideo {
    pub width: u32,
    pub height: u32,
    pub pixel_format: String,
    pub color_primaries: String,
    pub bitrate: i64,
    pub display_aspect_ratio: f64,
    pub duration_ms: u64,
    pub frame_rate: FrameRate,
    pub interlaced: bool,
    pub crop: CropRectangle,
}

impl VideoDescriptor {
    pub fn new(path: impl Into<PathBuf>, prober: Arc<dyn Prober>) -> Self {
        Self {
            path: path.into(),
            prober,
            width: OnceCell::new(),
            height: OnceCell::new(),
            pixel_format: OnceCell::new(),
            color_primaries: OnceCell::new(),
            bitrate: OnceCell::new(),
            display_aspect_ratio: OnceCell::new(),
            sample_aspect_ratio: OnceCell::new(),
            duration_ms: OnceCell::new(),
            frame_rate: OnceCell::new(),
            interlaced: OnceCell::new(),
            crop: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn raw(&self, attribute: StreamAttribute) -> CoreResult<String> {
        self.prober.probe(&self.path, attribute)
    }

    /// Raw text, with a probe failure logged and read as "not present".
    fn raw_or_empty(&self, attribute: StreamAttribute) -> String {
        self.raw(attribute).unwrap_or_else(|e| {
            warn!("Probe of {attribute} failed for {}: {e}", self.path.display());
            String::new()
        })
    }

    pub fn width(&self) -> CoreResult<u32> {
        self.width
            .get_or_try_init(|| normalize::parse_dimension(&self.raw(StreamAttribute::Width)?))
            .copied()
    }

    pub fn height(&self) -> CoreResult<u32> {
        self.height
            .get_or_try_init(|| normalize::parse_dimension(&self.raw(StreamAttribute::Height)?))
            .copied()
    }

    /// Pixel format name; empty when the stream does not report one.
    pub fn pixel_format(&self) -> &str {
        self.pixel_format
            .get_or_init(|| self.raw_or_empty(StreamAttribute::PixelFormat))
    }

    /// Color primaries, with every "no tag" spelling folded into `unknown`.
    pub fn color_primaries(&self) -> &str {
        self.color_primaries.get_or_init(|| {
            normalize::normalize_primaries(&self.raw_or_empty(StreamAttribute::ColorPrimaries))
        })
    }

    /// Stream bitrate in bits per second, or [`UNKNOWN_BITRATE`].
    pub fn bitrate(&self) -> i64 {
        *self.bitrate.get_or_init(|| match self.raw(StreamAttribute::VideoBitrate) {
            Ok(raw) => normalize::parse_bitrate(&raw),
            Err(e) => {
                warn!("Video bitrate unavailable for {}: {e}", self.path.display());
                UNKNOWN_BITRATE
            }
        })
    }

    pub fn display_aspect_ratio(&self) -> CoreResult<f64> {
        self.display_aspect_ratio
            .get_or_try_init(|| normalize::parse_ratio(&self.raw(StreamAttribute::DisplayAspectRatio)?))
            .copied()
    }

    pub fn sample_aspect_ratio(&self) -> CoreResult<f64> {
        self.sample_aspect_ratio
            .get_or_try_init(|| normalize::parse_ratio(&self.raw(StreamAttribute::SampleAspectRatio)?))
            .copied()
    }

    pub fn duration_ms(&self) -> CoreResult<u64> {
        self.duration_ms
            .get_or_try_init(|| normalize::parse_duration_ms(&self.raw(StreamAttribute::Duration)?))
            .copied()
    }

    /// Duration in decimal seconds.
    pub fn duration_secs(&self) -> CoreResult<f64> {
        Ok(self.duration_ms()? as f64 / 1000.0)
    }

    /// Snapped frame rate. The average rate is only probed when the base rate
    /// cannot be snapped on its own.
    pub fn frame_rate(&self) -> FrameRate {
        *self.frame_rate.get_or_init(|| {
            let real = self.raw_or_empty(StreamAttribute::RealFrameRate);
            let rate = normalize::snap_frame_rate(&real, || {
                self.raw_or_empty(StreamAttribute::AverageFrameRate)
            });
            debug!("Frame rate {real} snapped to {rate}");
            rate
        })
    }

    /// Runs the interlace-detection pass on first use.
    pub fn interlaced(&self) -> CoreResult<bool> {
        self.interlaced
            .get_or_try_init(|| -> CoreResult<bool> {
                let counts = self.prober.detect_interlace(&self.path)?;
                debug!(
                    "idet: tff={} bff={} progressive={}",
                    counts.top_field_first, counts.bottom_field_first, counts.progressive
                );
                Ok(normalize::is_interlaced(&counts))
            })
            .copied()
    }

    /// Runs the crop-detection pass on first use.
    pub fn crop(&self) -> CoreResult<CropRectangle> {
        let (width, height) = (self.width()?, self.height()?);
        self.crop
            .get_or_try_init(|| -> CoreResult<CropRectangle> {
                let detected = self.prober.detect_crop(&self.path)?;
                Ok(normalize::normalize_crop(detected.as_deref(), width, height))
            })
            .copied()
    }

    /// Forces every attribute the encode path needs.
    ///
    /// Analysis passes for features the configuration turns off are skipped:
    /// the stream reads as progressive when decombing cannot apply, and the
    /// crop is the full frame when cropping is disabled.
    pub fn resolve(&self, config: &CoreConfig) -> CoreResult<ResolvedVideo> {
        let width = self.width()?;
        let height = self.height()?;

        let interlaced = if config.decomb() && !config.preset.is_fastest() {
            self.interlaced()?
        } else {
            false
        };

        let crop = if config.crop() {
            self.crop()?
        } else {
            CropRectangle::full_frame(width, height)
        };

        Ok(ResolvedVideo {
            width,
            height,
            pixel_format: self.pixel_format().to_string(),
            color_primaries: self.color_primaries().to_string(),
            bitrate: self.bitrate(),
            display_aspect_ratio: self.display_aspect_ratio()?,
            duration_ms: self.duration_ms()?,
            frame_rate: self.frame_rate(),
            interlaced,
            crop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::media::probe::{IdetCounts, SceneCut};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers from a table and counts every call.
    #[derive(Default)]
    struct CountingProber {
        values: HashMap<StreamAttribute, String>,
        calls: Mutex<Vec<StreamAttribute>>,
        crop_passes: Mutex<usize>,
    }

    impl Prober for CountingProber {
        fn probe(&self, _path: &Path, attribute: StreamAttribute) -> CoreResult<String> {
            self.calls.lock().unwrap().push(attribute);
            Ok(self.values.get(&attribute).cloned().unwrap_or_default())
        }

        fn detect_crop(&self, _path: &Path) -> CoreResult<Option<String>> {
            *self.crop_passes.lock().unwrap() += 1;
            Ok(Some("crop=1920:800:0:140".to_string()))
        }

        fn detect_interlace(&self, _path: &Path) -> CoreResult<IdetCounts> {
            Ok(IdetCounts { top_field_first: 10, bottom_field_first: 0, progressive: 5, undetermined: 0 })
        }

        fn detect_scene_cuts(&self, _path: &Path, _threshold: f64) -> CoreResult<Vec<SceneCut>> {
            Ok(Vec::new())
        }
    }

    fn prober() -> Arc<CountingProber> {
        let values = [
            (StreamAttribute::Width, "1920"),
            (StreamAttribute::Height, "1080"),
            (StreamAttribute::PixelFormat, "yuv420p"),
            (StreamAttribute::VideoBitrate, "N/A"),
            (StreamAttribute::DisplayAspectRatio, "16:9"),
            (StreamAttribute::Duration, "120.5"),
            (StreamAttribute::RealFrameRate, "24000/1001"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect();
        Arc::new(CountingProber { values, ..Default::default() })
    }

    #[test]
    fn test_fields_are_memoized() {
        let prober = prober();
        let video = VideoDescriptor::new("/media/a/a.mkv", prober.clone());

        assert_eq!(video.width().unwrap(), 1920);
        assert_eq!(video.width().unwrap(), 1920);
        assert_eq!(video.frame_rate(), FrameRate::FILM_NTSC);
        assert_eq!(video.frame_rate(), FrameRate::FILM_NTSC);

        let calls = prober.calls.lock().unwrap();
        assert_eq!(calls.iter().filter(|a| **a == StreamAttribute::Width).count(), 1);
        // Snappable base rate never touches the average rate
        assert!(!calls.contains(&StreamAttribute::AverageFrameRate));
    }

    #[test]
    fn test_sentinels_for_missing_values() {
        let video = VideoDescriptor::new("/media/a/a.mkv", prober());
        assert_eq!(video.bitrate(), UNKNOWN_BITRATE);
        assert_eq!(video.color_primaries(), "unknown");
        assert!(matches!(video.sample_aspect_ratio(), Err(CoreError::ProbeParse(_))));
    }

    #[test]
    fn test_resolve_honors_config() {
        let prober = prober();
        let video = VideoDescriptor::new("/media/a/a.mkv", prober.clone());

        let config = CoreConfig { skip_crop: true, ..CoreConfig::default() };
        let resolved = video.resolve(&config).unwrap();
        assert_eq!(resolved.crop, CropRectangle::full_frame(1920, 1080));
        assert!(resolved.interlaced);
        assert_eq!(*prober.crop_passes.lock().unwrap(), 0);

        let resolved = video.resolve(&CoreConfig::default()).unwrap();
        assert_eq!(resolved.crop, CropRectangle { width: 1920, height: 800 });
        assert_eq!(resolved.duration_ms, 120_500);
        video.crop().unwrap();
        assert_eq!(*prober.crop_passes.lock().unwrap(), 1);
    }
}
