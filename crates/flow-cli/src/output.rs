//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table, or a warning when there are none
pub fn print_table<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        print_warning(empty_message);
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn format_optional(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "-".to_string(),
    }
}

/// Format a 0-1 ratio as percentage
pub fn format_percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

pub fn format_currency(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// Date part of an RFC 3339 timestamp
pub fn format_date(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

/// Color component, task or alert status
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "operational" | "active" | "completed" => status.green().to_string(),
        "demand" | "scheduled" | "in_progress" | "maintenance" => status.yellow().to_string(),
        "damaged" | "offline" | "leak" => status.red().to_string(),
        "unreported" => status.dimmed().to_string(),
        _ => status.to_string(),
    }
}

/// Color a priority, severity or risk level
pub fn color_level(level: &str) -> String {
    match level.to_lowercase().as_str() {
        "low" => level.green().to_string(),
        "medium" => level.yellow().to_string(),
        "high" => level.red().to_string(),
        "critical" => level.red().bold().to_string(),
        _ => level.to_string(),
    }
}

/// Color confidence based on value
pub fn color_confidence(confidence: f64) -> String {
    let formatted = format_percent(confidence);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= 0.6 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_percent(0.855), "86%");
        assert_eq!(format_currency(1234.5), "$1234.50");
        assert_eq!(format_optional(None, " bar"), "-");
        assert_eq!(format_optional(Some(2.14), " bar"), "2.1 bar");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2025-06-01T12:00:00Z"), "2025-06-01");
        assert_eq!(format_date("not a date"), "not a date");
    }
}
