//! Asset discovery.
//!
//! A library root holds one directory per title. A directory `<title>` is an
//! asset when it contains `<title>.mp4`, `<title>.mkv` or `<title>.webm`;
//! the first of those that exists is the live file. An optional regex keeps
//! only the titles it matches.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;

use crate::error::{CoreError, CoreResult};
use crate::media::{MediaAsset, Prober};

/// Container extensions in the order they are tried.
pub const MEDIA_EXTENSIONS: [&str; 3] = ["mp4", "mkv", "webm"];

/// Live file of the title directory `dir`, if it has one.
#[must_use]
pub fn live_file(dir: &Path, title: &str) -> Option<PathBuf> {
    MEDIA_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{title}.{ext}")))
        .find(|path| path.is_file())
}

/// Finds every asset directly under `root` whose title `filter` matches,
/// sorted by name.
///
/// # Returns
///
/// * `Ok(Vec<MediaAsset>)` - At least one asset
/// * `Err(CoreError::Io)` - `root` could not be read
/// * `Err(CoreError::NoAssetsFound)` - No matching subdirectory holds a live file
pub fn find_media_assets(
    root: &Path,
    filter: Option<&Regex>,
    prober: Arc<dyn Prober>,
) -> CoreResult<Vec<MediaAsset>> {
    let mut found: Vec<(String, PathBuf)> = std::fs::read_dir(root)?
        .filter_map(|entry| {
            let dir = entry.ok()?.path();
            if !dir.is_dir() {
                return None;
            }
            let title = dir.file_name()?.to_str()?.to_string();
            if filter.is_some_and(|re| !re.is_match(&title)) {
                log::debug!("Skipping {title}: does not match the title filter");
                return None;
            }
            let path = live_file(&dir, &title)?;
            Some((title, path))
        })
        .collect();

    if found.is_empty() {
        return Err(CoreError::NoAssetsFound);
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    log::debug!("Discovered {} assets under {}", found.len(), root.display());

    Ok(found
        .into_iter()
        .map(|(title, path)| MediaAsset::new(title, path, Arc::clone(&prober)))
        .collect())
}
