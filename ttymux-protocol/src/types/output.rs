//! Output records written to a terminal

use serde::{Deserialize, Serialize};

use super::JsonValue;

/// One immutable record written to a terminal
///
/// Records fan out to every connected viewer and are kept in the terminal's
/// bounded history for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutputRecord {
    /// Plain or ANSI-styled text
    Text { text: String },
    /// Tabular data, one inner vector per row
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Encoded image bytes
    Image {
        mime: String,
        data: Vec<u8>,
        alt: Option<String>,
    },
    /// Link to another UI surface (chart, table view, ...)
    UiLink { label: String, target: String },
    /// Application-defined record
    Custom(JsonValue),
}

impl OutputRecord {
    /// Create a text record
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a table record
    pub fn table(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self::Table { columns, rows }
    }

    /// Create a UI link record
    pub fn ui_link(label: impl Into<String>, target: impl Into<String>) -> Self {
        Self::UiLink {
            label: label.into(),
            target: target.into(),
        }
    }

    /// Short name of the record kind, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Table { .. } => "table",
            Self::Image { .. } => "image",
            Self::UiLink { .. } => "ui_link",
            Self::Custom(_) => "custom",
        }
    }
}
