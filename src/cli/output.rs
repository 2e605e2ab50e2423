//! Output formatting for CLI commands

use serde::Serialize;

/// Format output as pretty JSON or a single human-readable line
pub fn format_output<T: Serialize + std::fmt::Display>(data: &T, json: bool) -> String {
    if json {
        serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
    } else {
        data.to_string()
    }
}
