// ============================================================================
// reframe-core/src/media/asset.rs
// ============================================================================
//
// MEDIA ASSET: One Title Directory and Its Live Video File
//
// An asset is `<dir>/<name>.<ext>`. After a successful swap the live file may
// change (e.g. `movie.mkv` becomes `movie.mp4`); `repoint` records that and
// replaces both descriptors, which is the only way cached probe values are
// ever dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::media::audio::AudioDescriptor;
use crate::media::probe::Prober;
use crate::media::video::VideoDescriptor;

/// Extracted first audio track, kept in the asset directory.
pub const AUDIO_BACKUP_FILE: &str = "original_audio.mka";

/// Directory of pre-split originals awaiting cleanup.
pub const BACKUP_DIR: &str = "orig";

/// Container every optimized asset ends up in.
pub const OUTPUT_EXTENSION: &str = "mp4";

pub struct MediaAsset {
    name: String,
    dir: PathBuf,
    path: PathBuf,
    prober: Arc<dyn Prober>,
    video: VideoDescriptor,
    audio: AudioDescriptor,
}

impl std::fmt::Debug for MediaAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaAsset")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("video", &self.video)
            .field("audio", &self.audio)
            .finish_non_exhaustive()
    }
}

impl MediaAsset {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, prober: Arc<dyn Prober>) -> Self {
        let path = path.into();
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            name: name.into(),
            video: VideoDescriptor::new(&path, Arc::clone(&prober)),
            audio: AudioDescriptor::new(&path, Arc::clone(&prober)),
            dir,
            path,
            prober,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The live file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extension of the live file, without the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or(OUTPUT_EXTENSION)
    }

    #[must_use]
    pub fn video(&self) -> &VideoDescriptor {
        &self.video
    }

    #[must_use]
    pub fn audio(&self) -> &AudioDescriptor {
        &self.audio
    }

    #[must_use]
    pub fn prober(&self) -> &Arc<dyn Prober> {
        &self.prober
    }

    /// Where the optimized file lands: `<dir>/<name>.mp4`.
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        self.dir.join(format!("{}.{OUTPUT_EXTENSION}", self.name))
    }

    #[must_use]
    pub fn audio_backup_path(&self) -> PathBuf {
        self.dir.join(AUDIO_BACKUP_FILE)
    }

    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.dir.join(BACKUP_DIR)
    }

    /// Per-asset cache directory under `cache_root`.
    #[must_use]
    pub fn cache_dir(&self, cache_root: &Path) -> PathBuf {
        cache_root.join(&self.name)
    }

    /// Points the asset at a new live file and drops every memoized value.
    pub fn repoint(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        log::debug!("Repointing {} to {}", self.name, path.display());
        self.video = VideoDescriptor::new(&path, Arc::clone(&self.prober));
        self.audio = AudioDescriptor::new(&path, Arc::clone(&self.prober));
        self.path = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreResult;
    use crate::media::probe::{IdetCounts, SceneCut, StreamAttribute};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct WidthByPath(AtomicUsize);

    impl Prober for WidthByPath {
        fn probe(&self, path: &Path, _attribute: StreamAttribute) -> CoreResult<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(if path.extension().is_some_and(|e| e == "mp4") { "1280" } else { "1920" }.to_string())
        }
        fn detect_crop(&self, _path: &Path) -> CoreResult<Option<String>> {
            Ok(None)
        }
        fn detect_interlace(&self, _path: &Path) -> CoreResult<IdetCounts> {
            Ok(IdetCounts::default())
        }
        fn detect_scene_cuts(&self, _path: &Path, _threshold: f64) -> CoreResult<Vec<SceneCut>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_paths() {
        let asset = MediaAsset::new("Movie", "/media/Movie/Movie.mkv", Arc::new(WidthByPath(AtomicUsize::new(0))));
        assert_eq!(asset.dir(), Path::new("/media/Movie"));
        assert_eq!(asset.extension(), "mkv");
        assert_eq!(asset.target_path(), PathBuf::from("/media/Movie/Movie.mp4"));
        assert_eq!(asset.audio_backup_path(), PathBuf::from("/media/Movie/original_audio.mka"));
        assert_eq!(asset.cache_dir(Path::new("/cache")), PathBuf::from("/cache/Movie"));
    }

    #[test]
    fn test_repoint_invalidates_descriptors() {
        let prober = Arc::new(WidthByPath(AtomicUsize::new(0)));
        let mut asset = MediaAsset::new("Movie", "/media/Movie/Movie.mkv", prober.clone());

        assert_eq!(asset.video().width().unwrap(), 1920);
        assert_eq!(asset.video().width().unwrap(), 1920);
        assert_eq!(prober.0.load(Ordering::SeqCst), 1);

        let target = asset.target_path();
        asset.repoint(target);
        assert_eq!(asset.path(), Path::new("/media/Movie/Movie.mp4"));
        assert_eq!(asset.video().width().unwrap(), 1280);
        assert_eq!(prober.0.load(Ordering::SeqCst), 2);
    }
}
