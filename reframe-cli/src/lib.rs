// reframe-cli/src/lib.rs
//
// Library portion of the Reframe CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, InfoArgs, OptimizeArgs};
pub use commands::info::run_info;
pub use commands::optimize::run_optimize;
