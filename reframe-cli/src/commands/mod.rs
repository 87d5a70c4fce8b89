//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// The `optimize` command: runs every discovered asset through the pipeline.
pub mod optimize;

/// The `info` command: read-only report of descriptors and verdicts.
pub mod info;
