//! Styled terminal output utilities.
//!
//! stdout carries only generated SQL, so every status message goes to stderr.

use owo_colors::OwoColorize;

/// Print generated SQL to stdout, followed by a newline. Prints nothing for
/// an empty script.
pub fn sql(script: &str) {
    if !script.is_empty() {
        println!("{}", script);
    }
}

/// Print a success message
pub fn success(text: &str) {
    eprintln!("{} {}", "✔".green().bold(), text.green());
}

/// Print an info message
pub fn info(text: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), text);
}

/// Print a warning message
pub fn warn(text: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), text.yellow());
}

/// Print an error message
pub fn error(text: &str) {
    eprintln!("{} {}", "✖".red().bold(), text.red());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    eprintln!("  {}: {}", key.dimmed(), value);
}
