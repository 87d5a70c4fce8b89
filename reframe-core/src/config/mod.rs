//! Configuration structures and constants for the reframe-core library.
//!
//! A `CoreConfig` is built once (usually by the CLI through
//! [`CoreConfigBuilder`]) and passed by reference into every component. Nothing
//! in the core reads configuration from global state.

mod builder;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use regex::Regex;

use crate::error::{CoreError, CoreResult};

pub use builder::CoreConfigBuilder;

// Default constants

/// Default global bitrate cap in bits per second (video + audio).
pub const DEFAULT_BITRATE_CAP: i64 = 2_000_000;

/// Default maximum number of frames between keyframes.
pub const DEFAULT_GOP: u32 = 250;

/// Default encoder preset name.
pub const DEFAULT_PRESET: Preset = Preset::Slow;

/// Default weights file handed to the nnedi super-resolution filter.
pub const DEFAULT_NNEDI_WEIGHTS: &str = "nnedi3_weights.bin";

/// Default title filter; matches every title.
pub const DEFAULT_TITLE_FILTER: &str = ".*";

/// Name of the per-user cache directory created under `$HOME`.
pub const DEFAULT_CACHE_DIR_NAME: &str = ".reframe";

/// Returns the default worker count: total cores minus one, never below one.
#[must_use]
pub fn default_core_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// Returns the default cache root, `$HOME/.reframe`, or a directory under the
/// system temp dir when `$HOME` is not set.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .filter(|home| !home.as_os_str().is_empty())
        .map(|home| home.join(DEFAULT_CACHE_DIR_NAME))
        .unwrap_or_else(|| std::env::temp_dir().join("reframe"))
}

// ============================================================================
// PRESETS
// ============================================================================

/// Named encoder preset, shared by x264 and x265.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
    Placebo,
}

impl Preset {
    /// All presets, fastest first.
    pub const ALL: [Preset; 10] = [
        Preset::Ultrafast,
        Preset::Superfast,
        Preset::Veryfast,
        Preset::Faster,
        Preset::Fast,
        Preset::Medium,
        Preset::Slow,
        Preset::Slower,
        Preset::Veryslow,
        Preset::Placebo,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Slower => "slower",
            Preset::Veryslow => "veryslow",
            Preset::Placebo => "placebo",
        }
    }

    /// Quality tier: 0 for the fast presets, 1 for fast..slow, 2 for slower and up.
    #[must_use]
    pub fn group(self) -> u8 {
        match self {
            Preset::Ultrafast | Preset::Superfast | Preset::Veryfast | Preset::Faster => 0,
            Preset::Fast | Preset::Medium | Preset::Slow => 1,
            Preset::Slower | Preset::Veryslow | Preset::Placebo => 2,
        }
    }

    /// Only `ultrafast` skips deinterlacing and post-scale cleanup.
    #[must_use]
    pub fn is_fastest(self) -> bool {
        self == Preset::Ultrafast
    }

    /// Scaler used by the target-resolution scale stage.
    #[must_use]
    pub fn scaling_algorithm(self) -> ScalingAlgorithm {
        if self.group() == 0 {
            ScalingAlgorithm::Bicubic
        } else {
            ScalingAlgorithm::Spline
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Preset::ALL.iter().map(|p| p.name()).collect();
                CoreError::Config(format!(
                    "Unrecognized preset '{s}'; valid presets are: {}",
                    valid.join(" ")
                ))
            })
    }
}

/// Software scaler selection for ffmpeg's `scale` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingAlgorithm {
    Bicubic,
    Spline,
}

impl ScalingAlgorithm {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ScalingAlgorithm::Bicubic => "bicubic",
            ScalingAlgorithm::Spline => "spline",
        }
    }
}

// ============================================================================
// CODECS
// ============================================================================

/// Output video codec, chosen from the force flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    Hevc,
    Avc,
    Av1,
}

impl VideoCodec {
    #[must_use]
    pub fn encoder(self) -> &'static str {
        match self {
            VideoCodec::Hevc => "libx265",
            VideoCodec::Avc => "libx264",
            VideoCodec::Av1 => "libaom-av1",
        }
    }
}

/// Audio encoder used when re-encoding audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Opus,
    Aac,
}

impl AudioCodec {
    #[must_use]
    pub fn encoder(self) -> &'static str {
        match self {
            AudioCodec::Opus => "libopus",
            AudioCodec::Aac => "aac",
        }
    }

    /// Picks libopus when the transcoder build advertises it.
    #[must_use]
    pub fn from_capabilities(listing: &str) -> Self {
        if listing.contains("--enable-libopus") {
            AudioCodec::Opus
        } else {
            AudioCodec::Aac
        }
    }
}

// ============================================================================
// CORE CONFIGURATION
// ============================================================================

/// Resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Global bitrate cap (video + audio) in bits per second
    pub bitrate_cap: i64,

    /// Number of scene encodes allowed to run at once
    pub cores: usize,

    /// Maximum frames between keyframes
    pub gop: u32,

    pub force_8bit: bool,
    pub force_avc: bool,
    pub force_av1: bool,

    /// Log what would be optimized, change nothing
    pub dry_run: bool,

    /// Keep `.orig` backups and the `orig/` directory after success
    pub skip_cleanup: bool,

    pub skip_crop: bool,
    pub skip_decomb: bool,
    pub skip_denoise: bool,
    pub skip_super_resolution: bool,

    pub preset: Preset,

    /// Root of the per-asset cache (staged originals, scene cuts, scene outputs)
    pub cache_dir: PathBuf,

    /// Weights file for the nnedi filter
    pub nnedi_weights: PathBuf,

    /// Only titles this pattern matches are discovered. `None` keeps every title.
    pub title_filter: Option<Regex>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            bitrate_cap: DEFAULT_BITRATE_CAP,
            cores: default_core_count(),
            gop: DEFAULT_GOP,
            force_8bit: false,
            force_avc: false,
            force_av1: false,
            dry_run: false,
            skip_cleanup: false,
            skip_crop: false,
            skip_decomb: false,
            skip_denoise: false,
            skip_super_resolution: false,
            preset: DEFAULT_PRESET,
            cache_dir: default_cache_dir(),
            nnedi_weights: PathBuf::from(DEFAULT_NNEDI_WEIGHTS),
            title_filter: None,
        }
    }
}

impl CoreConfig {
    /// Checks the combination of values before any processing begins.
    pub fn validate(&self) -> CoreResult<()> {
        if self.bitrate_cap <= 0 {
            return Err(CoreError::Config(format!(
                "Bitrate cap must be positive, got {}",
                self.bitrate_cap
            )));
        }
        if self.cores == 0 {
            return Err(CoreError::Config("Core count must be at least 1".to_string()));
        }
        if self.gop == 0 {
            return Err(CoreError::Config("GOP must be at least 1 frame".to_string()));
        }
        if self.force_avc && self.force_av1 {
            return Err(CoreError::Config(
                "forceAvc and forceAv1 cannot both be set".to_string(),
            ));
        }
        Ok(())
    }

    /// Compiles a title filter pattern.
    pub fn parse_title_filter(pattern: &str) -> CoreResult<Regex> {
        Regex::new(pattern)
            .map_err(|e| CoreError::Config(format!("Invalid title filter '{pattern}': {e}")))
    }

    #[must_use]
    pub fn video_codec(&self) -> VideoCodec {
        if self.force_avc {
            VideoCodec::Avc
        } else if self.force_av1 {
            VideoCodec::Av1
        } else {
            VideoCodec::Hevc
        }
    }

    /// Encoder profile for the x264/x265 paths.
    #[must_use]
    pub fn video_profile(&self) -> &'static str {
        if self.force_8bit {
            "main"
        } else if self.force_avc {
            "high10"
        } else {
            "main10"
        }
    }

    #[must_use]
    pub fn decomb(&self) -> bool {
        !self.skip_decomb
    }

    #[must_use]
    pub fn denoise(&self) -> bool {
        !self.skip_denoise
    }

    #[must_use]
    pub fn crop(&self) -> bool {
        !self.skip_crop
    }

    #[must_use]
    pub fn super_resolution(&self) -> bool {
        !self.skip_super_resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_groups() {
        let groups: Vec<u8> = Preset::ALL.iter().map(|p| p.group()).collect();
        assert_eq!(groups, vec![0, 0, 0, 0, 1, 1, 1, 2, 2, 2]);
        assert!(Preset::Ultrafast.is_fastest());
        assert!(!Preset::Superfast.is_fastest());
        assert_eq!(Preset::Faster.scaling_algorithm(), ScalingAlgorithm::Bicubic);
        assert_eq!(Preset::Fast.scaling_algorithm(), ScalingAlgorithm::Spline);
    }

    #[test]
    fn test_preset_parsing() {
        for preset in Preset::ALL {
            assert_eq!(preset.name().parse::<Preset>().unwrap(), preset);
        }
        match "turbo".parse::<Preset>() {
            Err(CoreError::Config(msg)) => assert!(msg.contains("turbo")),
            other => panic!("Unexpected result: {other:?}"),
        }
        assert!("Slow".parse::<Preset>().is_err());
    }

    #[test]
    fn test_codec_and_profile_selection() {
        let mut config = CoreConfig::default();
        assert_eq!(config.video_codec(), VideoCodec::Hevc);
        assert_eq!(config.video_profile(), "main10");

        config.force_avc = true;
        assert_eq!(config.video_codec().encoder(), "libx264");
        assert_eq!(config.video_profile(), "high10");

        config.force_8bit = true;
        assert_eq!(config.video_profile(), "main");
    }

    #[test]
    fn test_validate_rejects_conflicts() {
        let mut config = CoreConfig::default();
        assert!(config.validate().is_ok());

        config.force_avc = true;
        config.force_av1 = true;
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let config = CoreConfig { cores: 0, ..CoreConfig::default() };
        assert!(config.validate().is_err());

        let config = CoreConfig { bitrate_cap: 0, ..CoreConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_audio_codec_from_capabilities() {
        let listing = "ffmpeg version 6.1 configuration: --enable-gpl --enable-libopus --enable-libx265";
        assert_eq!(AudioCodec::from_capabilities(listing), AudioCodec::Opus);
        assert_eq!(AudioCodec::from_capabilities("configuration: --enable-gpl"), AudioCodec::Aac);
    }

    #[test]
    fn test_title_filter_parsing() {
        let filter = CoreConfig::parse_title_filter("^The ").unwrap();
        assert!(filter.is_match("The Thing"));
        assert!(!filter.is_match("Alien"));

        match CoreConfig::parse_title_filter("(unclosed") {
            Err(CoreError::Config(msg)) => assert!(msg.contains("(unclosed")),
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_default_core_count_floor() {
        assert!(default_core_count() >= 1);
    }
}
