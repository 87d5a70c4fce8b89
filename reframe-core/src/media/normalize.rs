//! Attribute normalization: raw probe text to canonical values.
//!
//! Every function here is pure. The descriptors in [`crate::media::video`] and
//! [`crate::media::audio`] call them on the raw strings a [`Prober`] returns
//! and memoize the result.
//!
//! [`Prober`]: crate::media::probe::Prober

use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::media::probe::IdetCounts;

/// Bitrate sentinel for "unknown or unspecified".
pub const UNKNOWN_BITRATE: i64 = -1;

/// Crop heights strictly between these bounds snap down to the lower one.
const CROP_SNAP_FLOOR: u32 = 360;
const CROP_SNAP_CEILING: u32 = 376;

// ============================================================================
// FRAME RATE
// ============================================================================

/// An exact frame rate, `num/den`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub const FILM: FrameRate = FrameRate { num: 24, den: 1 };
    pub const PAL: FrameRate = FrameRate { num: 25, den: 1 };
    pub const NTSC_INTEGER: FrameRate = FrameRate { num: 30, den: 1 };
    pub const FILM_NTSC: FrameRate = FrameRate { num: 24000, den: 1001 };
    pub const NTSC: FrameRate = FrameRate { num: 30000, den: 1001 };

    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// True for 25 and 50 fps, the 625-line broadcast family.
    #[must_use]
    pub fn is_pal_family(self) -> bool {
        self.den != 0 && self.num % self.den == 0 && matches!(self.num / self.den, 25 | 50)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Parses `num/den` into its two integers.
fn parse_rational(raw: &str) -> Option<(u64, u64)> {
    let (num, den) = raw.trim().split_once('/')?;
    Some((num.trim().parse().ok()?, den.trim().parse().ok()?))
}

/// The decimal-rate ladder. `None` above 62 fps.
fn snap_by_range(fps: f64) -> Option<FrameRate> {
    if fps < 24.3 {
        Some(FrameRate::FILM_NTSC)
    } else if fps < 26.0 {
        Some(FrameRate::PAL)
    } else if fps < 46.0 {
        Some(FrameRate::NTSC)
    } else if fps < 49.0 {
        Some(FrameRate::FILM_NTSC)
    } else if fps < 51.0 {
        Some(FrameRate::PAL)
    } else if fps < 62.0 {
        Some(FrameRate::NTSC)
    } else {
        None
    }
}

/// Snaps a stream's average rate (`avg_frame_rate`). Always yields a
/// broadcast rate; unreadable input lands on 30000/1001.
#[must_use]
pub fn snap_average_frame_rate(raw: &str) -> FrameRate {
    parse_rational(raw)
        .filter(|&(_, den)| den != 0)
        .and_then(|(num, den)| snap_by_range(num as f64 / den as f64))
        .unwrap_or(FrameRate::NTSC)
}

/// Snaps a stream's base rate (`r_frame_rate`) to a broadcast-standard rate.
///
/// Exact integer rates of 24/48, 25/50 and 30/60 map to 24/1, 25/1 and 30/1.
/// Anything else goes through the decimal ladder; a missing, zero-denominator
/// or above-62 fps base rate defers to the average rate, which `average` is
/// only called to fetch in that case.
pub fn snap_frame_rate<F>(real: &str, average: F) -> FrameRate
where
    F: FnOnce() -> String,
{
    let Some((num, den)) = parse_rational(real).filter(|&(_, den)| den != 0) else {
        return snap_average_frame_rate(&average());
    };

    if num % den == 0 {
        match num / den {
            24 | 48 => return FrameRate::FILM,
            25 | 50 => return FrameRate::PAL,
            30 | 60 => return FrameRate::NTSC_INTEGER,
            _ => {}
        }
    }

    snap_by_range(num as f64 / den as f64).unwrap_or_else(|| snap_average_frame_rate(&average()))
}

// ============================================================================
// SCALARS
// ============================================================================

/// Parses a bitrate; empty, `N/A` or garbage becomes [`UNKNOWN_BITRATE`].
#[must_use]
pub fn parse_bitrate(raw: &str) -> i64 {
    let raw = raw.trim();
    if raw.is_empty() || raw == "N/A" {
        return UNKNOWN_BITRATE;
    }
    raw.parse::<i64>().unwrap_or_else(|_| {
        log::warn!("Unreadable bitrate '{raw}', treating as unknown");
        UNKNOWN_BITRATE
    })
}

/// Parses a `w:h` style ratio (DAR/SAR). Zero or malformed ratios are errors.
pub fn parse_ratio(raw: &str) -> CoreResult<f64> {
    let malformed = || CoreError::ProbeParse(format!("aspect ratio '{raw}'"));
    let (left, right) = raw.trim().split_once(':').ok_or_else(malformed)?;
    let left: f64 = left.trim().parse().map_err(|_| malformed())?;
    let right: f64 = right.trim().parse().map_err(|_| malformed())?;
    if left <= 0.0 || right <= 0.0 || !left.is_finite() || !right.is_finite() {
        return Err(malformed());
    }
    Ok(left / right)
}

/// Parses a pixel dimension.
pub fn parse_dimension(raw: &str) -> CoreResult<u32> {
    raw.trim()
        .parse()
        .map_err(|_| CoreError::ProbeParse(format!("dimension '{raw}'")))
}

/// Parses a duration in decimal seconds into whole milliseconds.
pub fn parse_duration_ms(raw: &str) -> CoreResult<u64> {
    let seconds: f64 = raw
        .trim()
        .parse()
        .map_err(|_| CoreError::ProbeParse(format!("duration '{raw}'")))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(CoreError::ProbeParse(format!("duration '{raw}'")));
    }
    Ok((seconds * 1000.0) as u64)
}

/// Parses a channel count; a missing audio stream reads as zero channels.
#[must_use]
pub fn parse_channels(raw: &str) -> u32 {
    raw.trim().parse().unwrap_or(0)
}

/// Empty, `N/A` and `unknown` all mean the stream carries no primaries tag.
#[must_use]
pub fn normalize_primaries(raw: &str) -> String {
    match raw.trim() {
        "" | "N/A" | "unknown" | "unspecified" => "unknown".to_string(),
        known => known.to_string(),
    }
}

// ============================================================================
// CROP
// ============================================================================

/// The region left after removing letterbox bars. Centered on the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRectangle {
    pub width: u32,
    pub height: u32,
}

impl CropRectangle {
    #[must_use]
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_full_frame(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}

/// Turns a detected `crop=w:h:x:y` into a rectangle within the source frame.
///
/// No detection, or an unreadable one, yields the full frame. Heights in
/// (360, 376) snap down to 360.
#[must_use]
pub fn normalize_crop(detected: Option<&str>, width: u32, height: u32) -> CropRectangle {
    let parsed = detected.and_then(|raw| {
        let values = raw.trim().strip_prefix("crop=").unwrap_or(raw.trim());
        let mut parts = values.split(':');
        let w: u32 = parts.next()?.trim().parse().ok()?;
        let h: u32 = parts.next()?.trim().parse().ok()?;
        Some((w, h))
    });

    let Some((crop_width, crop_height)) = parsed else {
        return CropRectangle::full_frame(width, height);
    };

    let mut crop_height = crop_height.min(height);
    if crop_height > CROP_SNAP_FLOOR && crop_height < CROP_SNAP_CEILING {
        crop_height = CROP_SNAP_FLOOR;
    }

    CropRectangle {
        width: crop_width.min(width),
        height: crop_height,
    }
}

// ============================================================================
// INTERLACE
// ============================================================================

/// Parses the idet multi-frame summary line, e.g.
/// `Multi frame detection: TFF:  12 BFF:   0 Progressive:  9001 Undetermined:  30`.
#[must_use]
pub fn parse_idet_summary(line: &str) -> Option<IdetCounts> {
    let summary = line.split("Multi frame detection:").nth(1)?;
    let field = |label: &str| -> Option<u64> {
        let rest = summary.split(label).nth(1)?;
        rest.split_whitespace().next()?.parse().ok()
    };
    Some(IdetCounts {
        top_field_first: field("TFF:")?,
        bottom_field_first: field("BFF:")?,
        progressive: field("Progressive:")?,
        undetermined: field("Undetermined:").unwrap_or(0),
    })
}

/// Interlaced unless progressive frames strictly outnumber field-ordered ones.
#[must_use]
pub fn is_interlaced(counts: &IdetCounts) -> bool {
    counts.progressive <= counts.top_field_first + counts.bottom_field_first
}
