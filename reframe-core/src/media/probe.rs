//! The stream-probing seam.
//!
//! A [`Prober`] answers one question at a time about a media file: a single
//! attribute as raw text, or the summary of one analysis pass. It does no
//! interpretation. Turning raw text into canonical values (sentinels, snapped
//! frame rates, crop rectangles) is the job of [`crate::media::normalize`].

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// A single probe-able attribute of the first video or audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamAttribute {
    Width,
    Height,
    PixelFormat,
    ColorPrimaries,
    VideoBitrate,
    DisplayAspectRatio,
    SampleAspectRatio,
    /// Container duration in decimal seconds.
    Duration,
    /// `r_frame_rate`, the stream's base rate as `num/den`.
    RealFrameRate,
    /// `avg_frame_rate`, total frames over total duration as `num/den`.
    AverageFrameRate,
    AudioChannels,
    AudioBitrate,
}

impl StreamAttribute {
    /// The ffprobe entry name for this attribute.
    #[must_use]
    pub fn entry(self) -> &'static str {
        match self {
            StreamAttribute::Width => "width",
            StreamAttribute::Height => "height",
            StreamAttribute::PixelFormat => "pix_fmt",
            StreamAttribute::ColorPrimaries => "color_primaries",
            StreamAttribute::VideoBitrate | StreamAttribute::AudioBitrate => "bit_rate",
            StreamAttribute::DisplayAspectRatio => "display_aspect_ratio",
            StreamAttribute::SampleAspectRatio => "sample_aspect_ratio",
            StreamAttribute::Duration => "duration",
            StreamAttribute::RealFrameRate => "r_frame_rate",
            StreamAttribute::AverageFrameRate => "avg_frame_rate",
            StreamAttribute::AudioChannels => "channels",
        }
    }

    #[must_use]
    pub fn is_audio(self) -> bool {
        matches!(self, StreamAttribute::AudioChannels | StreamAttribute::AudioBitrate)
    }
}

impl fmt::Display for StreamAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stream = if self.is_audio() { "a:0" } else { "v:0" };
        write!(f, "{stream} {}", self.entry())
    }
}

/// Frame counts from an interlace-detection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdetCounts {
    pub top_field_first: u64,
    pub bottom_field_first: u64,
    pub progressive: u64,
    pub undetermined: u64,
}

/// A frame whose change intensity crossed the scene threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneCut {
    /// Presentation time in seconds.
    pub time: f64,
    /// Scene change score in `[0, 1]`.
    pub score: f64,
}

/// Scene score a frame must exceed to count as a cut.
pub const SCENE_CUT_THRESHOLD: f64 = 0.5;

/// Answers questions about a media file.
///
/// Implementations return trimmed raw text for attributes; an attribute the
/// file does not carry comes back as an empty string, not an error. `Err` is
/// reserved for the tool itself failing.
pub trait Prober: Send + Sync {
    /// Returns one attribute as raw text (e.g. `"1920"`, `"16:9"`, `"24000/1001"`, `"N/A"`).
    fn probe(&self, path: &Path, attribute: StreamAttribute) -> CoreResult<String>;

    /// Runs a crop-detection pass; returns the last reported `crop=w:h:x:y`, if any.
    fn detect_crop(&self, path: &Path) -> CoreResult<Option<String>>;

    /// Runs an interlace-detection pass over the stream.
    fn detect_interlace(&self, path: &Path) -> CoreResult<IdetCounts>;

    /// Lists frames whose scene score exceeds `threshold`, in presentation order.
    fn detect_scene_cuts(&self, path: &Path, threshold: f64) -> CoreResult<Vec<SceneCut>>;
}
