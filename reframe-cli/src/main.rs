// reframe-cli/src/main.rs
//
// Entry point for the `reframe` binary: parse arguments, install logging,
// dispatch the subcommand, and map failures to an exit status.

use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use reframe_cli::error::exit_code;
use reframe_cli::logging::{level_for, log_file_path};
use reframe_cli::{Cli, Commands, run_info, run_optimize};

fn main() {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Optimize(args) => args.log_dir.as_deref().map(log_file_path),
        Commands::Info(_) => None,
    };
    if let Err(e) = reframe_core::init_logging(level_for(cli.verbose), log_file.as_deref()) {
        eprintln!("{} {e}", "Error:".red().bold());
        process::exit(1);
    }
    if let Some(path) = &log_file {
        log::info!("Log file: {}", path.display());
    }

    let result = match cli.command {
        Commands::Optimize(args) => run_optimize(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(e) = result {
        eprintln!("{} {e}", "Error:".red().bold());
        process::exit(exit_code(&e));
    }
}
