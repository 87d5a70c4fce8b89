// reframe-cli/src/output.rs
//
// Console presentation for the CLI's own output (stdout). Log records go
// through log4rs to stderr and the optional log file instead.

use std::fmt::Display;

use owo_colors::OwoColorize;

/// Print a heading with colored styling and clear separation
pub fn print_heading(text: &str) {
    let line = "=".repeat(50);
    println!("\n{}", line.bright_blue());
    println!("{}", format!(" {text} ").bold());
    println!("{}\n", line.bright_blue());
}

/// Print a section heading (smaller than main heading)
pub fn print_section(text: &str) {
    println!("\n{}", format!("-- {text} --").bold());
}

/// Print an info line with label and value, with the label colored
pub fn print_info<T: Display>(label: &str, value: T) {
    println!("  {:<22} {}", format!("{label}:").bright_cyan(), value);
}

pub fn print_success(message: &str) {
    println!("{} {message}", "[OK]".green());
}

pub fn print_warning(message: &str) {
    println!("{} {message}", "[WARN]".yellow());
}

/// Errors go to stderr so they survive stdout redirection.
pub fn print_error(message: &str) {
    eprintln!("{} {message}", "[ERROR]".red().bold());
}

/// `yes`/`no` for verdict columns.
#[must_use]
pub fn yes_no(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".yellow().to_string()
    }
}
