// ============================================================================
// reframe-core/src/processing/swap.rs
// ============================================================================
//
// ATOMIC SWAP: Backup, Replace, Roll Back
//
// Every destructive step finishes here. The new artifact is already complete
// at a staging path; the swap then
//
//   1. renames the live file to `<live><suffix>` (the commit point),
//   2. moves the staged file to the target path,
//   3. on failure of (2), renames the backup back to the live path.
//
// If (3) also fails there is no file at the expected path and the error is
// `RollbackFailed`, which callers treat as fatal. Backups stay on disk until
// `cleanup` removes them.

// ---- Standard library imports ----
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

// ---- External crate imports ----
use log::{debug, error, info, warn};

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};
use crate::media::asset::BACKUP_DIR;

/// Backup suffix for the pre-encode video.
pub const VIDEO_BACKUP_SUFFIX: &str = ".orig";

/// Backup suffix for the file replaced by an audio re-encode.
pub const AUDIO_BACKUP_SUFFIX: &str = ".audio.orig";

/// `<path><suffix>`.
#[must_use]
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Moves a file, falling back to copy-then-rename across filesystems.
///
/// The copy lands on a `.partial` sibling first so `to` only ever appears
/// complete.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("Cross-device move of {}, copying", from.display());
            let partial = backup_path(to, ".partial");
            copy_into_place(from, &partial, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// Copies `from` to `partial` and renames it to `to`. A failed step removes
/// `partial`.
fn copy_into_place(from: &Path, partial: &Path, to: &Path) -> io::Result<()> {
    let result = fs::copy(from, partial).and_then(|_| fs::rename(partial, to));
    if result.is_err() && partial.exists() {
        if let Err(e) = fs::remove_file(partial) {
            warn!("Could not remove partial copy {}: {e}", partial.display());
        }
    }
    result
}

/// Replaces `live` with `staged`, leaving the new file at `target`.
///
/// `target` may equal `live`. Returns the backup path on success.
pub fn atomic_replace(live: &Path, staged: &Path, target: &Path, suffix: &str) -> CoreResult<PathBuf> {
    replace_with(live, staged, target, suffix, move_file)
}

fn replace_with<F>(
    live: &Path,
    staged: &Path,
    target: &Path,
    suffix: &str,
    mover: F,
) -> CoreResult<PathBuf>
where
    F: Fn(&Path, &Path) -> io::Result<()>,
{
    let backup = backup_path(live, suffix);
    info!("Replacing {} (backup {})", live.display(), backup.display());

    // Nothing has changed if this fails
    fs::rename(live, &backup)?;

    let source = match mover(staged, target) {
        Ok(()) => {
            debug!("Moved {} to {}", staged.display(), target.display());
            return Ok(backup);
        }
        Err(source) => source,
    };

    warn!(
        "Could not move {} to {}: {source}; restoring original",
        staged.display(),
        target.display()
    );
    match mover(&backup, live) {
        Ok(()) => Err(CoreError::SwapFailed {
            staged: staged.to_path_buf(),
            source,
        }),
        Err(rollback) => {
            error!(
                "Rollback failed, {} is missing (backup at {}): {rollback}",
                live.display(),
                backup.display()
            );
            Err(CoreError::RollbackFailed {
                original: live.to_path_buf(),
                backup,
                staged: staged.to_path_buf(),
                source: rollback,
            })
        }
    }
}

/// Removes `*.orig` backups and the `orig/` directory from `dir`.
///
/// Returns the number of entries removed.
pub fn cleanup(dir: &Path) -> CoreResult<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_backup = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(VIDEO_BACKUP_SUFFIX));
        if is_backup && path.is_file() {
            debug!("Removing backup {}", path.display());
            fs::remove_file(&path)?;
            removed += 1;
        }
    }

    let backup_dir = dir.join(BACKUP_DIR);
    if backup_dir.is_dir() {
        debug!("Removing backup directory {}", backup_dir.display());
        fs::remove_dir_all(&backup_dir)?;
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_swap_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("Movie.mkv");
        let staged = dir.path().join("staged.mp4");
        let target = dir.path().join("Movie.mp4");
        fs::write(&live, b"original").unwrap();
        fs::write(&staged, b"optimized").unwrap();

        let backup = atomic_replace(&live, &staged, &target, VIDEO_BACKUP_SUFFIX).unwrap();

        assert_eq!(backup, dir.path().join("Movie.mkv.orig"));
        assert_eq!(fs::read(&backup).unwrap(), b"original");
        assert_eq!(fs::read(&target).unwrap(), b"optimized");
        assert!(!live.exists());
        assert!(!staged.exists());
    }

    #[test]
    fn test_failed_copy_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("joined.mp4");
        fs::write(&from, b"optimized").unwrap();
        // A non-empty directory at the target makes the final rename fail
        let to = dir.path().join("Movie.mp4");
        fs::create_dir(&to).unwrap();
        fs::write(to.join("occupied"), b"x").unwrap();
        let partial = backup_path(&to, ".partial");

        assert!(copy_into_place(&from, &partial, &to).is_err());

        assert!(!partial.exists());
        assert_eq!(fs::read(&from).unwrap(), b"optimized");
    }

    #[test]
    fn test_failed_move_restores_original() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("Movie.mp4");
        fs::write(&live, b"original bytes").unwrap();
        let missing = dir.path().join("never-staged.mp4");

        let err = atomic_replace(&live, &missing, &live, AUDIO_BACKUP_SUFFIX).unwrap_err();

        assert!(matches!(err, CoreError::SwapFailed { .. }));
        assert!(!err.is_fatal());
        assert_eq!(fs::read(&live).unwrap(), b"original bytes");
        assert!(!backup_path(&live, AUDIO_BACKUP_SUFFIX).exists());
    }

    #[test]
    fn test_failed_rollback_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("Movie.mp4");
        let staged = dir.path().join("staged.mp4");
        fs::write(&live, b"original").unwrap();
        fs::write(&staged, b"optimized").unwrap();

        let err = replace_with(&live, &staged, &live, VIDEO_BACKUP_SUFFIX, |_, _| {
            Err(io::Error::other("disk gone"))
        })
        .unwrap_err();

        assert!(err.is_fatal());
        match err {
            CoreError::RollbackFailed { original, backup, .. } => {
                assert_eq!(original, live);
                assert!(backup.exists());
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_live_file_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("staged.mp4");
        fs::write(&staged, b"optimized").unwrap();

        let result = atomic_replace(&dir.path().join("gone.mkv"), &staged, &dir.path().join("x.mp4"), ".orig");
        assert!(matches!(result, Err(CoreError::Io(_))));
        assert!(staged.exists());
    }

    #[test]
    fn test_cleanup_removes_backups_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Movie.mkv.orig"), b"a").unwrap();
        fs::write(dir.path().join("Movie.mp4.audio.orig"), b"b").unwrap();
        fs::write(dir.path().join("Movie.mp4"), b"c").unwrap();
        fs::write(dir.path().join("original_audio.mka"), b"d").unwrap();
        fs::create_dir(dir.path().join("orig")).unwrap();
        fs::write(dir.path().join("orig").join("part1.mkv"), b"e").unwrap();

        assert_eq!(cleanup(dir.path()).unwrap(), 3);
        assert!(dir.path().join("Movie.mp4").exists());
        assert!(dir.path().join("original_audio.mka").exists());
        assert!(!dir.path().join("orig").exists());
    }
}
