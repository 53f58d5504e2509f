//! Output formatting for CLI

use serde::Serialize;

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// A row that knows its own text rendering
pub trait TextRow {
    fn text(&self) -> String;
}

/// Format rows based on selected format
pub fn format_output<T: Serialize + TextRow>(rows: &[T], format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => {
            serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Text => rows
            .iter()
            .map(TextRow::text)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
