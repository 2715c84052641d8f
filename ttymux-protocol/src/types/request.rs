//! Structured input requests and their answers

use serde::{Deserialize, Serialize};

use super::JsonValue;

/// One choice offered by a select request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Value returned when the option is chosen
    pub value: String,
    /// Display label (viewers fall back to `value`)
    pub label: Option<String>,
}

impl SelectOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Input request issued by the backend and answered by one viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReadRequest {
    /// Free text line
    Text {
        title: Option<String>,
        max_len: Option<u32>,
    },
    /// Yes/no question
    Confirm {
        title: String,
        content: Option<String>,
    },
    /// Pick between `min` and `max` of the given options
    Select {
        options: Vec<SelectOption>,
        title: String,
        min: Option<u32>,
        max: Option<u32>,
    },
    /// One or more file uploads
    File {
        title: Option<String>,
        mime: Option<String>,
        max_size: Option<u64>,
        max_number: Option<u32>,
        min_number: Option<u32>,
    },
    /// Application-defined request
    Custom(JsonValue),
}

impl ReadRequest {
    /// Text request with only a title
    pub fn text(title: impl Into<String>) -> Self {
        Self::Text {
            title: Some(title.into()),
            max_len: None,
        }
    }

    /// Confirmation request with only a title
    pub fn confirm(title: impl Into<String>) -> Self {
        Self::Confirm {
            title: title.into(),
            content: None,
        }
    }

    /// Single-choice select request
    pub fn select_one(title: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self::Select {
            options,
            title: title.into(),
            min: Some(1),
            max: Some(1),
        }
    }

    /// Short name of the request kind, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Confirm { .. } => "confirm",
            Self::Select { .. } => "select",
            Self::File { .. } => "file",
            Self::Custom(_) => "custom",
        }
    }
}

/// Uploaded file content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBlob {
    pub name: String,
    pub mime: Option<String>,
    pub data: Vec<u8>,
}

/// Answer to a [`ReadRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReadResponse {
    Text(String),
    Confirm(bool),
    /// Values of the selected options
    Select(Vec<String>),
    File(Vec<FileBlob>),
    Custom(JsonValue),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_constructor() {
        assert_eq!(
            ReadRequest::confirm("Proceed?"),
            ReadRequest::Confirm {
                title: "Proceed?".into(),
                content: None
            }
        );
    }

    #[test]
    fn test_select_one_bounds() {
        let request = ReadRequest::select_one(
            "Color",
            vec![SelectOption::new("r").with_label("Red"), SelectOption::new("g")],
        );
        match request {
            ReadRequest::Select {
                options, min, max, ..
            } => {
                assert_eq!(options.len(), 2);
                assert_eq!(options[0].label.as_deref(), Some("Red"));
                assert_eq!(options[1].label, None);
                assert_eq!((min, max), (Some(1), Some(1)));
            }
            other => panic!("Expected Select, got {:?}", other),
        }
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ReadRequest::text("Name").kind(), "text");
        assert_eq!(ReadRequest::confirm("Ok?").kind(), "confirm");
        assert_eq!(
            ReadRequest::File {
                title: None,
                mime: Some("text/csv".into()),
                max_size: Some(1024),
                max_number: Some(2),
                min_number: None,
            }
            .kind(),
            "file"
        );
    }
}
