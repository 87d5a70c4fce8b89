//! Memoized view of a file's first audio stream.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;
use once_cell::sync::OnceCell;

use crate::media::normalize::{self, UNKNOWN_BITRATE};
use crate::media::probe::{Prober, StreamAttribute};

pub struct AudioDescriptor {
    path: PathBuf,
    prober: Arc<dyn Prober>,
    channels: OnceCell<u32>,
    bitrate: OnceCell<i64>,
}

impl std::fmt::Debug for AudioDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDescriptor")
            .field("path", &self.path)
            .field("channels", &self.channels.get())
            .field("bitrate", &self.bitrate.get())
            .finish_non_exhaustive()
    }
}

impl AudioDescriptor {
    pub fn new(path: impl Into<PathBuf>, prober: Arc<dyn Prober>) -> Self {
        Self {
            path: path.into(),
            prober,
            channels: OnceCell::new(),
            bitrate: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Channel count; zero when the file has no audio stream.
    pub fn channels(&self) -> u32 {
        *self.channels.get_or_init(|| {
            match self.prober.probe(&self.path, StreamAttribute::AudioChannels) {
                Ok(raw) => normalize::parse_channels(&raw),
                Err(e) => {
                    warn!("Audio channels unavailable for {}: {e}", self.path.display());
                    0
                }
            }
        })
    }

    /// Stream bitrate in bits per second, or [`UNKNOWN_BITRATE`].
    pub fn bitrate(&self) -> i64 {
        *self.bitrate.get_or_init(|| {
            match self.prober.probe(&self.path, StreamAttribute::AudioBitrate) {
                Ok(raw) => normalize::parse_bitrate(&raw),
                Err(e) => {
                    warn!("Audio bitrate unavailable for {}: {e}", self.path.display());
                    UNKNOWN_BITRATE
                }
            }
        })
    }

    #[must_use]
    pub fn has_stream(&self) -> bool {
        self.channels() > 0
    }
}
