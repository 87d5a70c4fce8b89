// ============================================================================
// reframe-core/src/processing/audio.rs
// ============================================================================
//
// AUDIO: Track Backup and Re-encode
//
// The first audio track is extracted once into `original_audio.mka` in the
// asset directory. Re-encodes always read from that backup, never from an
// already re-encoded stream, so repeated runs do not compound quality loss.
// Staging happens in a hidden temp directory inside the asset directory so the
// final swap is a same-filesystem rename.

// ---- Standard library imports ----
use std::path::PathBuf;

// ---- External crate imports ----
use log::{debug, info};

// ---- Internal crate imports ----
use crate::config::AudioCodec;
use crate::error::CoreResult;
use crate::external::{TranscodeJob, Transcoder};
use crate::media::MediaAsset;
use crate::processing::swap::{AUDIO_BACKUP_SUFFIX, atomic_replace, move_file};

/// Resampling filter that keeps audio in sync after the re-encode.
pub const AUDIO_RESAMPLE_FILTER: &str = "aresample=async=1:min_hard_comp=0.100000:first_pts=0";

/// Re-encode of an asset's audio against its copied video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioEncodeJob {
    pub video_source: PathBuf,
    pub audio_source: PathBuf,
    pub output: PathBuf,
    pub codec: AudioCodec,
    pub bitrate: i64,
    pub channels: u32,
}

impl AudioEncodeJob {
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::with_capacity(24);
        args.extend(["-i".into(), self.video_source.display().to_string()]);
        args.extend(["-i".into(), self.audio_source.display().to_string()]);
        args.extend(["-map", "0:v", "-c:v", "copy", "-map", "1:a:0"].map(String::from));
        args.extend(["-c:a", self.codec.encoder(), "-filter:a", AUDIO_RESAMPLE_FILTER].map(String::from));
        args.extend(["-ab".into(), self.bitrate.to_string()]);
        args.extend(["-ac".into(), self.channels.to_string()]);
        args.extend(["-movflags", "+faststart", "-f", "mp4", "-y"].map(String::from));
        args.push(self.output.display().to_string());
        args
    }
}

fn staging_dir(asset: &MediaAsset) -> CoreResult<tempfile::TempDir> {
    Ok(tempfile::Builder::new()
        .prefix(".reframe-")
        .tempdir_in(asset.dir())?)
}

/// Extracts the first audio track to the asset's backup file, unless it is
/// already there.
pub fn backup_audio(asset: &MediaAsset, transcoder: &dyn Transcoder) -> CoreResult<()> {
    let backup = asset.audio_backup_path();
    if backup.exists() {
        debug!("Audio backup already present at {}", backup.display());
        return Ok(());
    }

    info!("Backing up audio of {}", asset.name());
    let staging = staging_dir(asset)?;
    let staged = staging.path().join("backup.mka");
    transcoder.transcode(&TranscodeJob::AudioExtract {
        input: asset.path().to_path_buf(),
        output: staged.clone(),
    })?;
    move_file(&staged, &backup)?;
    Ok(())
}

/// Re-encodes the asset's audio from its backup and swaps the result in at
/// `<dir>/<name>.mp4`. The asset is repointed on success.
pub fn optimize_audio(
    asset: &mut MediaAsset,
    transcoder: &dyn Transcoder,
    codec: AudioCodec,
    bitrate: i64,
) -> CoreResult<()> {
    let channels = asset.audio().channels();
    info!(
        "Optimizing audio of {}: {} {} ch @ {}",
        asset.name(),
        codec.encoder(),
        channels,
        crate::utils::format_bitrate(bitrate)
    );

    let staging = staging_dir(asset)?;
    let job = AudioEncodeJob {
        video_source: asset.path().to_path_buf(),
        audio_source: asset.audio_backup_path(),
        output: staging.path().join("optimized.mp4"),
        codec,
        bitrate,
        channels,
    };
    transcoder.transcode(&TranscodeJob::AudioEncode(job.clone()))?;

    let target = asset.target_path();
    atomic_replace(asset.path(), &job.output, &target, AUDIO_BACKUP_SUFFIX)?;
    asset.repoint(target);
    Ok(())
}
