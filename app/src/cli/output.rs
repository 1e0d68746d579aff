use crate::cli::Format;
use serde::Serialize;

/// Unified output adapter for CLI commands
pub fn emit<T: Serialize>(fmt: Format, human: impl FnOnce() -> String, json: &T) {
    match fmt {
        Format::Human => println!("{}", human()),
        Format::Json => println!(
            "{}",
            serde_json::to_string_pretty(json).unwrap_or_else(|_| "{}".into())
        ),
    }
}

/// Horizontal rule used around human-readable sections.
pub fn banner(title: &str) -> String {
    let rule = "=".repeat(60);
    format!("{rule}\n{title}\n{rule}")
}
