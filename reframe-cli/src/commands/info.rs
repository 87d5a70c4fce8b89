//! Implementation of the 'info' subcommand.
//!
//! Prints every asset's normalized descriptors and the budget verdicts.
//! Nothing is written and no analysis pass (crop, idet, scene detection) runs.

use std::sync::Arc;

use reframe_core::config::{CoreConfig, DEFAULT_BITRATE_CAP};
use reframe_core::processing::budget::{self, StreamFacts, max_audio_bitrate};
use reframe_core::{CoreError, CrateFfprobeExecutor, MediaAsset, Prober, format_bitrate, format_duration};

use crate::cli::InfoArgs;
use crate::commands::optimize::resolve_library;
use crate::error::CliResult;
use crate::output::{print_error, print_heading, print_info, print_section, print_warning, yes_no};

/// Prints one asset. Probe failures are reported in place.
pub fn print_asset(asset: &MediaAsset, bitrate_cap: i64) {
    print_section(asset.name());
    print_info("File", asset.path().display());

    let facts = match StreamFacts::from_asset(asset) {
        Ok(facts) => facts,
        Err(e) => {
            print_error(&format!("Could not probe {}: {e}", asset.name()));
            return;
        }
    };

    let video = asset.video();
    print_info("Resolution", format!("{}x{}", facts.width, facts.height));
    print_info("Aspect ratio", format!("{:.3}", facts.display_aspect_ratio));
    print_info("Pixel format", video.pixel_format());
    print_info("Color primaries", video.color_primaries());
    print_info("Frame rate", video.frame_rate());
    if let Ok(secs) = video.duration_secs() {
        print_info("Duration", format_duration(secs));
    }
    print_info("Video bitrate", format_bitrate(facts.video_bitrate));

    if asset.audio().has_stream() {
        print_info("Audio channels", facts.channels);
        print_info("Audio bitrate", format_bitrate(facts.audio_bitrate));
        print_info("Audio ceiling", format_bitrate(max_audio_bitrate(facts.channels)));
    } else {
        print_info("Audio", "none");
    }

    print_info("Video optimized", yes_no(budget::optimized_video(&facts, bitrate_cap)));
    print_info("Audio optimized", yes_no(budget::optimized_audio(&facts)));
    print_info("Optimized", yes_no(budget::optimized(&facts, bitrate_cap)));
}

/// Entry point for `reframe info`.
pub fn run_info(args: InfoArgs) -> CliResult<()> {
    let bitrate_cap = args.bitrate.unwrap_or(DEFAULT_BITRATE_CAP);
    if bitrate_cap <= 0 {
        return Err(CoreError::Config(format!(
            "Bitrate cap must be positive, got {bitrate_cap}"
        )));
    }
    let filter = CoreConfig::parse_title_filter(&args.filter)?;
    let root = resolve_library(&args.path)?;

    print_heading("Reframe Info");
    print_info("Library", root.display());
    print_info("Bitrate cap", format_bitrate(bitrate_cap));

    let prober: Arc<dyn Prober> = Arc::new(CrateFfprobeExecutor::new());
    let assets = match reframe_core::find_media_assets(&root, Some(&filter), prober) {
        Ok(assets) => assets,
        Err(CoreError::NoAssetsFound) => {
            print_warning(&format!("No media assets found under {}", root.display()));
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    for asset in &assets {
        print_asset(asset, bitrate_cap);
    }
    Ok(())
}
