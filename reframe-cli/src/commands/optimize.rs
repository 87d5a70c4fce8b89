//! Implementation of the 'optimize' subcommand.
//!
//! Resolves the flags into a `CoreConfig`, discovers the library's assets and
//! hands each one to the core `Optimizer`. A failed asset is reported and
//! skipped; a fatal rollback failure stops the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info};
use reframe_core::external::check_dependency;
use reframe_core::{
    CoreConfig, CoreConfigBuilder, CoreError, CrateFfprobeExecutor, MediaAsset, Optimizer, Outcome,
    Prober, SidecarTranscoder, Transcoder, format_bitrate, format_duration,
};

use crate::cli::OptimizeArgs;
use crate::error::CliResult;
use crate::output::{print_error, print_heading, print_info, print_section, print_success, print_warning};

/// Counts for the end-of-run summary.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub optimized: Vec<String>,
    pub already_optimized: Vec<String>,
    pub dry_run: Vec<String>,
    /// Asset name and error message.
    pub failed: Vec<(String, String)>,
    pub elapsed: Duration,
}

/// Creates and validates the CoreConfig from CLI arguments.
pub fn build_config(args: &OptimizeArgs) -> CliResult<CoreConfig> {
    let mut builder = CoreConfigBuilder::new()
        .preset(&args.preset)
        .title_filter(&args.filter)
        .force_8bit(args.force_8bit)
        .force_avc(args.force_avc)
        .force_av1(args.force_av1)
        .dry_run(args.dry_run)
        .skip_cleanup(args.skip_cleanup)
        .skip_crop(args.skip_crop)
        .skip_decomb(args.skip_decomb)
        .skip_denoise(args.skip_denoise)
        .skip_super_resolution(args.skip_super_resolution);

    if let Some(bitrate) = args.bitrate {
        builder = builder.bitrate_cap(bitrate);
    }
    if let Some(cores) = args.cores {
        builder = builder.cores(cores);
    }
    if let Some(gop) = args.gop {
        builder = builder.gop(gop);
    }
    if let Some(dir) = &args.cache_dir {
        builder = builder.cache_dir(dir.clone());
    }
    builder.build()
}

/// Canonical library root; it must be a readable directory.
pub fn resolve_library(path: &Path) -> CliResult<PathBuf> {
    let root = path.canonicalize().map_err(|e| {
        CoreError::PathError(format!("Invalid library path '{}': {e}", path.display()))
    })?;
    if !root.is_dir() {
        return Err(CoreError::PathError(format!(
            "Library path '{}' is not a directory",
            root.display()
        )));
    }
    Ok(root)
}

fn print_parameters(config: &CoreConfig, root: &Path) {
    print_section("Parameters");
    print_info("Library", root.display());
    print_info("Bitrate cap", format_bitrate(config.bitrate_cap));
    if let Some(filter) = &config.title_filter {
        print_info("Title filter", filter.as_str());
    }
    print_info("Video encoder", config.video_codec().encoder());
    print_info("Profile", config.video_profile());
    print_info("Preset", config.preset);
    print_info("Scene workers", config.cores);
    print_info("GOP", config.gop);
    print_info("Crop", config.crop());
    print_info("Decomb", config.decomb());
    print_info("Denoise", config.denoise());
    print_info("Super resolution", config.super_resolution());
    print_info("Cache", config.cache_dir.display());
    if config.dry_run {
        print_warning("Dry run: nothing will be changed");
    }
}

/// Runs every asset in order.
///
/// # Returns
///
/// * `Ok(RunSummary)` - Every asset was attempted
/// * `Err(e)` where `e.is_fatal()` - A rollback failed; later assets were not touched
pub fn optimize_assets(
    config: &CoreConfig,
    assets: &mut [MediaAsset],
    prober: Arc<dyn Prober>,
    transcoder: &dyn Transcoder,
) -> CliResult<RunSummary> {
    let started = Instant::now();
    let optimizer = Optimizer::new(config, prober, transcoder);
    let mut summary = RunSummary::default();

    for asset in assets.iter_mut() {
        print_section(asset.name());
        let name = asset.name().to_string();
        match optimizer.optimize(asset) {
            Ok(Outcome::AlreadyOptimized) => {
                print_success("Already optimized");
                summary.already_optimized.push(name);
            }
            Ok(Outcome::DryRun) => {
                print_warning("Needs optimization (dry run)");
                summary.dry_run.push(name);
            }
            Ok(Outcome::Optimized { video, audio }) => {
                print_success(&format!(
                    "Optimized (video {}, audio {})",
                    if video { "re-encoded" } else { "kept" },
                    if audio { "re-encoded" } else { "kept" }
                ));
                summary.optimized.push(name);
            }
            Err(e) if e.is_fatal() => {
                error!("{name}: {e}");
                print_error(&format!("{name}: {e}"));
                return Err(e);
            }
            Err(e) => {
                error!("{name}: {e}");
                print_error(&format!("{name}: {e}"));
                summary.failed.push((name, e.to_string()));
            }
        }
    }

    summary.elapsed = started.elapsed();
    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    print_heading("Summary");
    print_info("Optimized", summary.optimized.len());
    print_info("Already optimized", summary.already_optimized.len());
    if !summary.dry_run.is_empty() {
        print_info("Would optimize", summary.dry_run.join(", "));
    }
    print_info("Failed", summary.failed.len());
    for (name, message) in &summary.failed {
        print_error(&format!("{name}: {message}"));
    }
    print_info("Elapsed", format_duration(summary.elapsed.as_secs_f64()));
}

/// Entry point for `reframe optimize`.
pub fn run_optimize(args: OptimizeArgs) -> CliResult<()> {
    let config = build_config(&args)?;
    let root = resolve_library(&args.path)?;

    print_heading("Reframe Optimize");
    print_parameters(&config, &root);

    let prober: Arc<dyn Prober> = Arc::new(CrateFfprobeExecutor::new());
    let mut assets = match reframe_core::find_media_assets(
        &root,
        config.title_filter.as_ref(),
        Arc::clone(&prober),
    ) {
        Ok(assets) => assets,
        Err(CoreError::NoAssetsFound) => {
            print_warning(&format!("No media assets found under {}", root.display()));
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    info!("Found {} assets", assets.len());

    if !config.dry_run {
        check_dependency("ffmpeg")?;
        check_dependency("ffprobe")?;
        info!("External dependency check passed.");
    }

    let transcoder = SidecarTranscoder::new();
    let summary = optimize_assets(&config, &mut assets, prober, &transcoder)?;
    print_summary(&summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn args(extra: &[&str]) -> OptimizeArgs {
        let mut argv = vec!["reframe", "optimize", "--path", "/lib"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Optimize(args) => args,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_build_config_from_flags() {
        let config = build_config(&args(&[
            "--bitrate",
            "1500000",
            "--cores",
            "2",
            "--gop",
            "96",
            "--preset",
            "medium",
            "--force-av1",
            "--skip-crop",
            "--dry-run",
            "--filter",
            "^Alien",
        ]))
        .unwrap();

        assert_eq!(config.bitrate_cap, 1_500_000);
        assert_eq!(config.cores, 2);
        assert_eq!(config.gop, 96);
        assert_eq!(config.preset.name(), "medium");
        assert_eq!(config.video_codec().encoder(), "libaom-av1");
        assert!(!config.crop());
        assert!(config.dry_run);
        let filter = config.title_filter.unwrap();
        assert!(filter.is_match("Aliens"));
        assert!(!filter.is_match("Heat"));
    }

    #[test]
    fn test_invalid_preset_is_config_error() {
        let err = build_config(&args(&["--preset", "turbo"])).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let err = build_config(&args(&["--filter", "(Alien"])).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_resolve_library_rejects_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Movie.mkv");
        std::fs::write(&file, b"x").unwrap();

        assert!(resolve_library(dir.path()).is_ok());
        assert!(matches!(resolve_library(&file), Err(CoreError::PathError(_))));
        assert!(resolve_library(&dir.path().join("missing")).is_err());
    }
}
