// reframe-core/tests/common/mod.rs
//
// Deterministic stand-ins for the external tools, shared by the integration
// tests. Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use reframe_core::config::{CoreConfig, CoreConfigBuilder};
use reframe_core::error::{CoreError, CoreResult};
use reframe_core::external::{TranscodeJob, Transcoder};
use reframe_core::media::{IdetCounts, MediaAsset, Prober, SceneCut, StreamAttribute};

/// Answers every path from one attribute table.
pub struct FakeProber {
    attributes: HashMap<StreamAttribute, String>,
    crop: Option<String>,
    idet: IdetCounts,
    cuts: Vec<SceneCut>,
    pub scene_detections: AtomicUsize,
}

impl FakeProber {
    /// A 1080p, 23.976 fps, 1550 s title with a 4 Mb/s video stream and
    /// 96 kb/s stereo audio.
    pub fn hd_title() -> Self {
        let attributes = [
            (StreamAttribute::Width, "1920"),
            (StreamAttribute::Height, "1080"),
            (StreamAttribute::PixelFormat, "yuv420p"),
            (StreamAttribute::ColorPrimaries, "bt709"),
            (StreamAttribute::VideoBitrate, "4000000"),
            (StreamAttribute::DisplayAspectRatio, "16:9"),
            (StreamAttribute::SampleAspectRatio, "1:1"),
            (StreamAttribute::Duration, "1550.000000"),
            (StreamAttribute::RealFrameRate, "24000/1001"),
            (StreamAttribute::AverageFrameRate, "24000/1001"),
            (StreamAttribute::AudioChannels, "2"),
            (StreamAttribute::AudioBitrate, "96000"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect();

        Self {
            attributes,
            crop: None,
            idet: IdetCounts {
                progressive: 1000,
                ..Default::default()
            },
            cuts: [310.0, 620.0, 930.0, 1240.0]
                .into_iter()
                .map(|time| SceneCut { time, score: 0.9 })
                .collect(),
            scene_detections: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, attribute: StreamAttribute, value: &str) -> Self {
        self.attributes.insert(attribute, value.to_string());
        self
    }
}

impl Prober for FakeProber {
    fn probe(&self, _path: &Path, attribute: StreamAttribute) -> CoreResult<String> {
        Ok(self.attributes.get(&attribute).cloned().unwrap_or_default())
    }

    fn detect_crop(&self, _path: &Path) -> CoreResult<Option<String>> {
        Ok(self.crop.clone())
    }

    fn detect_interlace(&self, _path: &Path) -> CoreResult<IdetCounts> {
        Ok(self.idet)
    }

    fn detect_scene_cuts(&self, _path: &Path, _threshold: f64) -> CoreResult<Vec<SceneCut>> {
        self.scene_detections.fetch_add(1, Ordering::SeqCst);
        Ok(self.cuts.clone())
    }
}

/// Records every job and writes a small file at its output path.
#[derive(Default)]
pub struct FakeTranscoder {
    pub jobs: Mutex<Vec<TranscodeJob>>,
    /// Fail every job with this step name.
    pub fail_step: Option<&'static str>,
    /// Fail the scene encode that starts at this offset.
    pub fail_scene_start_ms: Option<u64>,
    pub capabilities: String,
}

impl FakeTranscoder {
    pub fn failing_step(step: &'static str) -> Self {
        Self {
            fail_step: Some(step),
            ..Default::default()
        }
    }

    pub fn failing_scene(start_ms: u64) -> Self {
        Self {
            fail_scene_start_ms: Some(start_ms),
            ..Default::default()
        }
    }

    pub fn with_opus() -> Self {
        Self {
            capabilities: "configuration: --enable-gpl --enable-libopus --enable-libx265".into(),
            ..Default::default()
        }
    }

    pub fn steps(&self) -> Vec<&'static str> {
        self.jobs.lock().unwrap().iter().map(TranscodeJob::step).collect()
    }

    /// Start offsets of every scene encode, in the order they ran.
    pub fn scene_starts(&self) -> Vec<u64> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter_map(|job| match job {
                TranscodeJob::SceneEncode(job) => Some(job.seek.start_ms),
                _ => None,
            })
            .collect()
    }
}

impl Transcoder for FakeTranscoder {
    fn transcode(&self, job: &TranscodeJob) -> CoreResult<()> {
        self.jobs.lock().unwrap().push(job.clone());

        let scene_failure = matches!(
            (job, self.fail_scene_start_ms),
            (TranscodeJob::SceneEncode(j), Some(start)) if j.seek.start_ms == start
        );
        if self.fail_step == Some(job.step()) || scene_failure {
            return Err(CoreError::TranscodeFailed {
                step: job.step().to_string(),
                message: "simulated failure".to_string(),
            });
        }

        fs::write(job.output(), format!("{} output", job.step()))?;
        Ok(())
    }

    fn capabilities(&self) -> CoreResult<String> {
        Ok(self.capabilities.clone())
    }
}

/// A library root with one title directory holding `<title>.<ext>`.
pub struct Library {
    pub root: tempfile::TempDir,
    pub cache: tempfile::TempDir,
}

impl Library {
    pub fn with_title(title: &str, ext: &str, content: &[u8]) -> Self {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(title);
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join(format!("{title}.{ext}")), content).unwrap();
        Self {
            root,
            cache: tempfile::tempdir().unwrap(),
        }
    }

    pub fn title_dir(&self, title: &str) -> PathBuf {
        self.root.path().join(title)
    }

    pub fn asset(&self, title: &str, ext: &str, prober: Arc<dyn Prober>) -> MediaAsset {
        MediaAsset::new(title, self.title_dir(title).join(format!("{title}.{ext}")), prober)
    }

    pub fn config(&self) -> CoreConfigBuilder {
        CoreConfigBuilder::new()
            .cores(1)
            .cache_dir(self.cache.path().to_path_buf())
    }

    pub fn build_config(&self) -> CoreConfig {
        self.config().build().unwrap()
    }
}
