//! Unified output formatting utilities for consistent CLI presentation.
//!
//! This module provides the formatting functions the `status` command uses,
//! ensuring consistent colors, spacing, and message structure.
//!
//! # Color Scheme
//! - **Modified**: Yellow
//! - **Added**: Green
//! - **Deleted**: Red
//! - **Type changed**: Magenta
//! - **Untracked**: Cyan
//! - **Unmerged**: Red bold

use crate::core::status_code::SlotStatus;
use colored::*;

/// Formats and prints an error message with consistent styling
///
/// # Format
/// ```text
///
/// ✕ Error: <message>
///
/// ```
pub fn print_error(message: &str) {
    println!("\n{} {}\n", "✕ Error:".red(), message.white());
}

/// Formats and prints an informational message with consistent styling
pub fn print_info(message: &str) {
    println!("\n{}\n", message.white());
}

/// Formats and prints a section header
///
/// # Format
/// ```text
/// ➤ <header>:
/// ```
pub fn print_section_header(header: &str) {
    println!("{} {}:", "➤".white(), header.white());
}

/// Color function for one status slot
pub fn slot_color_style(status: SlotStatus) -> Box<dyn Fn(&str) -> ColoredString> {
    match status {
        SlotStatus::Unmodified => Box::new(|text: &str| text.normal()),
        SlotStatus::Modified => Box::new(|text: &str| text.yellow()),
        SlotStatus::Added => Box::new(|text: &str| text.green()),
        SlotStatus::Deleted => Box::new(|text: &str| text.red()),
        SlotStatus::TypeChanged => Box::new(|text: &str| text.magenta()),
        SlotStatus::Untracked => Box::new(|text: &str| text.cyan()),
        SlotStatus::Unmerged => Box::new(|text: &str| text.red().bold()),
    }
}

/// One listing line: `   (<description>) <path>`, colored by `status`
pub fn format_status_line(status: SlotStatus, description: &str, path: &str) -> String {
    let color_fn = slot_color_style(status);
    format!(
        "   {}{}{} {}",
        "(".bright_black(),
        color_fn(description),
        ")".bright_black(),
        color_fn(path)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_error_does_not_panic() {
        print_error("Test error message");
    }

    #[test]
    fn test_print_section_header_does_not_panic() {
        print_section_header("Staged");
    }

    #[test]
    fn test_status_line_contains_path_and_description() {
        colored::control::set_override(false);
        let line = format_status_line(SlotStatus::Modified, "Modified, not staged", "src/lib.rs");
        assert_eq!(line, "   (Modified, not staged) src/lib.rs");
    }
}
