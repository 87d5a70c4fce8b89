// ============================================================================
// reframe-core/src/processing/budget.rs
// ============================================================================
//
// BITRATE BUDGET: Audio/Video Ceilings and the "Already Optimized" Verdict
//
// The budget is derived from the global cap and the channel count every time
// it is needed; nothing here is stored independently of those two inputs.
// Unknown bitrates (the -1 sentinel) always fail the lower-bound checks, so an
// asset that cannot be verified is treated as not optimized.

use crate::error::CoreResult;
use crate::media::MediaAsset;

/// Audio ceiling for a single channel, in bits per second.
pub const BASE_AUDIO_BITRATE: i64 = 90_000;

/// Added to the audio ceiling for every channel after the first.
pub const PER_CHANNEL_AUDIO_BITRATE: i64 = 12_000;

/// Audio below this is treated as unset or broken.
pub const MIN_AUDIO_BITRATE: i64 = 10_000;

/// Video below this is treated as unset or broken.
pub const MIN_VIDEO_BITRATE: i64 = 500_000;

pub const MAX_WIDTH: u32 = 1280;
pub const MAX_HEIGHT: u32 = 720;

/// Aspect ratio above which a frame counts as wider than 16:9.
pub const WIDE_DAR: f64 = 1.777;
/// Aspect ratio below which a frame counts as narrower than 16:9.
pub const NARROW_DAR: f64 = 1.778;

/// Minimum width for frames wider than 16:9.
pub const WIDE_MIN_WIDTH: u32 = 1180;
/// Minimum height for frames narrower than 16:9.
pub const NARROW_MIN_HEIGHT: u32 = 620;

/// Audio ceiling for `channels` channels. A channel count below one is
/// treated as one.
#[must_use]
pub fn max_audio_bitrate(channels: u32) -> i64 {
    let extra = i64::from(channels.max(1)) - 1;
    BASE_AUDIO_BITRATE + extra * PER_CHANNEL_AUDIO_BITRATE
}

/// Audio and video ceilings for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitrateBudget {
    pub audio: i64,
    pub video: i64,
}

impl BitrateBudget {
    #[must_use]
    pub fn new(bitrate_cap: i64, channels: u32) -> Self {
        let audio = max_audio_bitrate(channels);
        Self {
            audio,
            video: bitrate_cap - audio,
        }
    }
}

/// The measurements the verdicts are computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamFacts {
    pub video_bitrate: i64,
    pub audio_bitrate: i64,
    pub channels: u32,
    pub width: u32,
    pub height: u32,
    pub display_aspect_ratio: f64,
}

impl StreamFacts {
    /// Reads the facts off an asset's descriptors.
    pub fn from_asset(asset: &MediaAsset) -> CoreResult<Self> {
        let video = asset.video();
        Ok(Self {
            video_bitrate: video.bitrate(),
            audio_bitrate: asset.audio().bitrate(),
            channels: asset.audio().channels(),
            width: video.width()?,
            height: video.height()?,
            display_aspect_ratio: video.display_aspect_ratio()?,
        })
    }
}

#[must_use]
pub fn optimized_audio(facts: &StreamFacts) -> bool {
    let ceiling = max_audio_bitrate(facts.channels);
    facts.audio_bitrate >= MIN_AUDIO_BITRATE && facts.audio_bitrate <= ceiling
}

#[must_use]
pub fn optimized_video(facts: &StreamFacts, bitrate_cap: i64) -> bool {
    if facts.video_bitrate < MIN_VIDEO_BITRATE {
        return false;
    }
    if facts.video_bitrate + facts.audio_bitrate > bitrate_cap {
        return false;
    }
    if facts.width > MAX_WIDTH || facts.height > MAX_HEIGHT {
        return false;
    }
    if facts.display_aspect_ratio > WIDE_DAR && facts.width < WIDE_MIN_WIDTH {
        return false;
    }
    if facts.display_aspect_ratio < NARROW_DAR && facts.height < NARROW_MIN_HEIGHT {
        return false;
    }
    true
}

/// Asset-level gate: a `true` here means the pipeline does nothing.
#[must_use]
pub fn optimized(facts: &StreamFacts, bitrate_cap: i64) -> bool {
    optimized_video(facts, bitrate_cap)
        && facts.video_bitrate + facts.audio_bitrate < bitrate_cap
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: i64 = 2_000_000;

    fn facts() -> StreamFacts {
        StreamFacts {
            video_bitrate: 1_800_000,
            audio_bitrate: 96_000,
            channels: 2,
            width: 1280,
            height: 720,
            display_aspect_ratio: 1.778,
        }
    }

    #[test]
    fn test_max_audio_bitrate() {
        assert_eq!(max_audio_bitrate(1), 90_000);
        assert_eq!(max_audio_bitrate(2), 102_000);
        assert_eq!(max_audio_bitrate(6), 150_000);
        assert_eq!(max_audio_bitrate(0), 90_000);
        for c in 1..16 {
            assert!(max_audio_bitrate(c + 1) > max_audio_bitrate(c));
        }
    }

    #[test]
    fn test_budget_split() {
        let budget = BitrateBudget::new(CAP, 6);
        assert_eq!(budget.audio, 150_000);
        assert_eq!(budget.video, 1_850_000);
    }

    #[test]
    fn test_already_optimized_asset() {
        let facts = facts();
        assert!(optimized_video(&facts, CAP));
        assert!(optimized_audio(&facts));
        assert!(optimized(&facts, CAP));
    }

    #[test]
    fn test_audio_verdicts() {
        let mut facts = facts();
        facts.audio_bitrate = -1;
        assert!(!optimized_audio(&facts));
        facts.audio_bitrate = 9_999;
        assert!(!optimized_audio(&facts));
        facts.audio_bitrate = 102_001;
        assert!(!optimized_audio(&facts));
        facts.audio_bitrate = 102_000;
        assert!(optimized_audio(&facts));
    }

    #[test]
    fn test_video_verdicts() {
        let base = facts();
        let unknown = StreamFacts { video_bitrate: -1, ..base };
        assert!(!optimized_video(&unknown, CAP));

        let too_big = StreamFacts { width: 1920, height: 1080, ..base };
        assert!(!optimized_video(&too_big, CAP));

        // Wider than 16:9 needs width
        let wide = StreamFacts { width: 1100, height: 460, display_aspect_ratio: 2.39, ..base };
        assert!(!optimized_video(&wide, CAP));
        let wide = StreamFacts { width: 1180, ..wide };
        assert!(optimized_video(&wide, CAP));

        // Narrower than 16:9 needs height
        let narrow = StreamFacts { width: 960, height: 600, display_aspect_ratio: 1.333, ..base };
        assert!(!optimized_video(&narrow, CAP));
        let narrow = StreamFacts { height: 620, ..narrow };
        assert!(optimized_video(&narrow, CAP));

        // Inside the 1.777..1.778 band neither floor applies
        let band = StreamFacts { width: 640, height: 360, display_aspect_ratio: 1.7775, ..base };
        assert!(optimized_video(&band, CAP));
    }

    #[test]
    fn test_asset_gate_short_circuits_on_video() {
        let facts = StreamFacts { video_bitrate: 400_000, audio_bitrate: 96_000, ..facts() };
        assert!(optimized_audio(&facts));
        assert!(!optimized(&facts, CAP));

        // Exactly at the cap is video-optimized but not asset-optimized
        let at_cap = StreamFacts { video_bitrate: 1_904_000, ..facts };
        assert!(optimized_video(&at_cap, CAP));
        assert!(!optimized(&at_cap, CAP));
    }
}
