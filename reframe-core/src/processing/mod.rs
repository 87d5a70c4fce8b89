//! Core optimization logic and orchestration.
//!
//! Leaf modules (`budget`, `filter_graph`, `scenes`, `encode_job`, `swap`)
//! are pure or touch only their own files; `scheduler`, `audio` and
//! `optimize` drive the transcoder.

/// Bitrate budget and the "already optimized" verdicts
pub mod budget;

/// Adaptive filter pipeline construction
pub mod filter_graph;

/// Scene-cut caching and segmentation
pub mod scenes;

/// Per-scene encode job specification
pub mod encode_job;

/// Bounded parallel scene encodes
pub mod scheduler;

/// Audio backup and re-encode
pub mod audio;

/// Backup, replace and rollback
pub mod swap;

/// Asset-level pipeline
pub mod optimize;

pub use budget::{BitrateBudget, StreamFacts, max_audio_bitrate, optimized, optimized_audio, optimized_video};
pub use filter_graph::{FilterPipeline, FilterStage, build_filter_graph};
pub use optimize::{Optimizer, Outcome};
pub use scenes::Scene;
pub use scheduler::{BatchReport, SceneStatus, run_scenes};
pub use swap::{atomic_replace, cleanup};
