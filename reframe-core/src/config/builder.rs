// ============================================================================
// reframe-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// Fluent construction of a CoreConfig from loosely typed inputs (the CLI
// hands over the preset as a string and the core count as "0 means auto").
// `build()` resolves those inputs and validates the result, so a bad preset
// name fails here before any asset is touched.

// ---- Standard library imports ----
use std::path::PathBuf;

// ---- Internal crate imports ----
use super::{CoreConfig, default_core_count};
use crate::error::CoreResult;

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use reframe_core::config::CoreConfigBuilder;
///
/// let config = CoreConfigBuilder::new()
///     .bitrate_cap(2_500_000)
///     .preset("slower")
///     .cores(4)
///     .dry_run(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.preset.group(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
    preset_name: Option<String>,
    title_filter: Option<String>,
    cores: Option<usize>,
}

impl Default for CoreConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreConfigBuilder {
    /// Creates a new builder holding the default configuration.
    pub fn new() -> Self {
        Self {
            config: CoreConfig::default(),
            preset_name: None,
            title_filter: None,
            cores: None,
        }
    }

    /// Sets the global bitrate cap in bits per second.
    pub fn bitrate_cap(mut self, bitrate: i64) -> Self {
        self.config.bitrate_cap = bitrate;
        self
    }

    /// Sets the worker count. Zero selects the default (total cores minus one).
    pub fn cores(mut self, cores: usize) -> Self {
        self.cores = Some(cores);
        self
    }

    /// Sets the maximum keyframe interval.
    pub fn gop(mut self, gop: u32) -> Self {
        self.config.gop = gop;
        self
    }

    pub fn force_8bit(mut self, enable: bool) -> Self {
        self.config.force_8bit = enable;
        self
    }

    pub fn force_avc(mut self, enable: bool) -> Self {
        self.config.force_avc = enable;
        self
    }

    pub fn force_av1(mut self, enable: bool) -> Self {
        self.config.force_av1 = enable;
        self
    }

    pub fn dry_run(mut self, enable: bool) -> Self {
        self.config.dry_run = enable;
        self
    }

    pub fn skip_cleanup(mut self, skip: bool) -> Self {
        self.config.skip_cleanup = skip;
        self
    }

    pub fn skip_crop(mut self, skip: bool) -> Self {
        self.config.skip_crop = skip;
        self
    }

    pub fn skip_decomb(mut self, skip: bool) -> Self {
        self.config.skip_decomb = skip;
        self
    }

    pub fn skip_denoise(mut self, skip: bool) -> Self {
        self.config.skip_denoise = skip;
        self
    }

    pub fn skip_super_resolution(mut self, skip: bool) -> Self {
        self.config.skip_super_resolution = skip;
        self
    }

    /// Sets the preset by name; parsed in `build()`.
    pub fn preset(mut self, name: &str) -> Self {
        self.preset_name = Some(name.to_string());
        self
    }

    /// Sets the cache root for staged originals and scene outputs.
    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.config.cache_dir = dir;
        self
    }

    /// Sets the weights file used by the nnedi filter.
    pub fn nnedi_weights(mut self, path: PathBuf) -> Self {
        self.config.nnedi_weights = path;
        self
    }

    /// Sets the title filter regex; parsed in `build()`.
    pub fn title_filter(mut self, pattern: &str) -> Self {
        self.title_filter = Some(pattern.to_string());
        self
    }

    /// Resolves the preset, title filter and core count and validates the result.
    pub fn build(self) -> CoreResult<CoreConfig> {
        let mut config = self.config;

        if let Some(name) = self.preset_name {
            config.preset = name.parse()?;
        }

        if let Some(pattern) = self.title_filter {
            config.title_filter = Some(CoreConfig::parse_title_filter(&pattern)?);
        }

        config.cores = match self.cores {
            Some(0) | None => default_core_count(),
            Some(n) => n,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;
    use crate::error::CoreError;

    #[test]
    fn test_build_defaults() {
        let config = CoreConfigBuilder::new().build().unwrap();
        assert_eq!(config.bitrate_cap, crate::config::DEFAULT_BITRATE_CAP);
        assert_eq!(config.preset, Preset::Slow);
        assert_eq!(config.gop, 250);
        assert!(config.cores >= 1);
    }

    #[test]
    fn test_zero_cores_means_auto() {
        let config = CoreConfigBuilder::new().cores(0).build().unwrap();
        assert_eq!(config.cores, default_core_count());

        let config = CoreConfigBuilder::new().cores(3).build().unwrap();
        assert_eq!(config.cores, 3);
    }

    #[test]
    fn test_unknown_preset_fails_fast() {
        let result = CoreConfigBuilder::new().preset("lightning").build();
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_title_filter() {
        let config = CoreConfigBuilder::new().build().unwrap();
        assert!(config.title_filter.is_none());

        let config = CoreConfigBuilder::new().title_filter("Alien").build().unwrap();
        assert!(config.title_filter.unwrap().is_match("Aliens"));

        let result = CoreConfigBuilder::new().title_filter("[a-").build();
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_conflicting_codecs_rejected() {
        let result = CoreConfigBuilder::new().force_avc(true).force_av1(true).build();
        assert!(result.is_err());
    }
}
