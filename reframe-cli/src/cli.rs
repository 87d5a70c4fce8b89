// reframe-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Reframe: delivery-profile video optimizer",
    long_about = "Re-encodes a library of title directories to a bitrate cap and a 720p envelope \
                  using ffmpeg via the reframe-core library."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug-level logging.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Optimizes every title under a library directory
    Optimize(OptimizeArgs),
    /// Prints probed attributes and verdicts without changing anything
    Info(InfoArgs),
}

#[derive(Args, Debug, Clone)]
pub struct OptimizeArgs {
    /// Library root: one subdirectory per title, each holding <title>.mp4/.mkv/.webm
    #[arg(short, long, required = true, value_name = "DIR")]
    pub path: PathBuf,

    /// Global bitrate cap in bits per second (video + audio)
    #[arg(long, value_name = "BPS", env = "REFRAME_BITRATE")]
    pub bitrate: Option<i64>,

    /// Only optimize titles whose directory name matches this regex
    #[arg(short, long, value_name = "REGEX", default_value = ".*")]
    pub filter: String,

    /// Concurrent scene encodes (default: all cores but one)
    #[arg(long, value_name = "N")]
    pub cores: Option<usize>,

    /// Maximum keyframe interval in frames
    #[arg(long, value_name = "FRAMES")]
    pub gop: Option<u32>,

    /// Encode 8-bit output instead of 10-bit
    #[arg(long)]
    pub force_8bit: bool,

    /// Encode with libx264 instead of libx265
    #[arg(long, conflicts_with = "force_av1")]
    pub force_avc: bool,

    /// Encode with libaom-av1 instead of libx265
    #[arg(long)]
    pub force_av1: bool,

    /// Log what would be optimized without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Keep .orig backups and the orig/ directory after success
    #[arg(long)]
    pub skip_cleanup: bool,

    #[arg(long)]
    pub skip_crop: bool,

    #[arg(long)]
    pub skip_decomb: bool,

    #[arg(long)]
    pub skip_denoise: bool,

    #[arg(long)]
    pub skip_super_resolution: bool,

    /// Encoder preset (ultrafast, superfast, veryfast, faster, fast, medium, slow, slower, veryslow, placebo)
    #[arg(long, value_name = "NAME", default_value = "slow")]
    pub preset: String,

    /// Cache root for staged originals and scene encodes (default: ~/.reframe)
    #[arg(long, value_name = "DIR", env = "REFRAME_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory for a timestamped log file
    #[arg(short, long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    /// Library root to inspect
    #[arg(short, long, required = true, value_name = "DIR")]
    pub path: PathBuf,

    /// Bitrate cap the verdicts are computed against
    #[arg(long, value_name = "BPS", env = "REFRAME_BITRATE")]
    pub bitrate: Option<i64>,

    /// Only report titles whose directory name matches this regex
    #[arg(short, long, value_name = "REGEX", default_value = ".*")]
    pub filter: String,
}
