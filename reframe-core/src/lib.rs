//! Core library for optimizing a video library to a delivery profile.
//!
//! Each title directory is probed, judged against a bitrate cap and a 720p
//! envelope, and re-encoded only when it falls outside them. Video re-encodes
//! are split into scenes and run in parallel; every replacement of a live
//! file goes through a backup-and-rollback swap.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use reframe_core::{CoreConfigBuilder, CrateFfprobeExecutor, Optimizer, SidecarTranscoder};
//!
//! let config = CoreConfigBuilder::new().preset("medium").build().unwrap();
//! let prober = Arc::new(CrateFfprobeExecutor::new());
//! let transcoder = SidecarTranscoder::new();
//!
//! let mut assets = reframe_core::find_media_assets(Path::new("/library"), config.title_filter.as_ref(), prober.clone()).unwrap();
//! let optimizer = Optimizer::new(&config, prober, &transcoder);
//! for asset in &mut assets {
//!     optimizer.optimize(asset).unwrap();
//! }
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod external;
pub mod logging;
pub mod media;
pub mod processing;
pub mod utils;

// Re-exports for public API
pub use config::{CoreConfig, CoreConfigBuilder, Preset};
pub use discovery::find_media_assets;
pub use error::{CoreError, CoreResult};
pub use external::{CrateFfprobeExecutor, SidecarTranscoder, TranscodeJob, Transcoder, check_dependency};
pub use logging::init_logging;
pub use media::{MediaAsset, Prober, StreamAttribute};
pub use processing::{Optimizer, Outcome};
pub use utils::{format_bitrate, format_duration};
