//! Media assets and their stream descriptors.
//!
//! Raw probe text comes in through [`probe::Prober`], is normalized by the
//! pure functions in [`normalize`], and is memoized per file by
//! [`VideoDescriptor`] and [`AudioDescriptor`].

pub mod asset;
pub mod audio;
pub mod normalize;
pub mod probe;
pub mod video;

pub use asset::MediaAsset;
pub use audio::AudioDescriptor;
pub use normalize::{CropRectangle, FrameRate, UNKNOWN_BITRATE};
pub use probe::{IdetCounts, Prober, SCENE_CUT_THRESHOLD, SceneCut, StreamAttribute};
pub use video::{ResolvedVideo, VideoDescriptor};
