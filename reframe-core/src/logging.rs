// ============================================================================
// reframe-core/src/logging.rs
// ============================================================================
//
// LOGGING: log4rs Setup
//
// Console output is the bare message on stderr so stdout stays free for the
// CLI's own output. The optional file log carries timestamps and levels.

use std::path::Path;

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::error::{CoreError, CoreResult};

/// Console pattern: the message only.
pub const CONSOLE_PATTERN: &str = "{m}{n}";

/// File pattern: timestamp, level, message.
pub const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}";

/// Builds the log4rs configuration without installing it.
pub fn build_config(level: LevelFilter, log_file: Option<&Path>) -> CoreResult<Config> {
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();

    let mut builder = Config::builder().appender(Appender::builder().build("console", Box::new(console)));
    let mut root = Root::builder().appender("console");

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
            .build(path)
            .map_err(|e| CoreError::Logging(format!("cannot open {}: {e}", path.display())))?;
        builder = builder.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    builder
        .build(root.build(level))
        .map_err(|e| CoreError::Logging(e.to_string()))
}

/// Installs the global logger.
///
/// # Arguments
///
/// * `level` - Maximum level for every appender
/// * `log_file` - Optional file that receives a timestamped copy of the log
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> CoreResult<()> {
    let config = build_config(level, log_file)?;
    log4rs::init_config(config).map_err(|e| CoreError::Logging(e.to_string()))?;
    log::debug!("Logging initialized at {level}");
    Ok(())
}
