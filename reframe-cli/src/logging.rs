// ============================================================================
// reframe-cli/src/logging.rs
// ============================================================================
//
// LOGGING UTILITIES: Log Level and Log File Naming
//
// The logger itself is reframe-core's log4rs setup; this module only decides
// the level and where the optional file goes.

use std::path::{Path, PathBuf};

use log::LevelFilter;

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `<log_dir>/reframe_<timestamp>.log`
#[must_use]
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("reframe_{}.log", get_timestamp()))
}

#[must_use]
pub fn level_for(verbose: bool) -> LevelFilter {
    if verbose { LevelFilter::Debug } else { LevelFilter::Info }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name() {
        let path = log_file_path(Path::new("/var/log/reframe"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("reframe_"));
        assert!(name.ends_with(".log"));
        // reframe_YYYYMMDD_HHMMSS.log
        assert_eq!(name.len(), "reframe_".len() + 15 + ".log".len());
    }

    #[test]
    fn test_level() {
        assert_eq!(level_for(true), LevelFilter::Debug);
        assert_eq!(level_for(false), LevelFilter::Info);
    }
}
