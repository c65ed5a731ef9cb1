//! Shared data structures for the labelling session
//!
//! These structs represent the data model that flows between
//! the persisted CSV table, the session engine and the UI layer.

use serde::{Deserialize, Serialize};

/// Column names of the persisted table, in order
pub const CSV_HEADER: [&str; 3] = ["timestamp", "image_path", "label"];

/// Timestamp format for assignments (ISO-8601, second precision, local time)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Absolute, canonicalized image path used as the key everywhere
pub type ImagePath = String;

/// One entry of the label taxonomy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Label text as it appears in the labels file (trimmed)
    pub name: String,
    /// Position in the labels file; defines button and count order
    pub index: usize,
}

/// The label currently recorded for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// When the label was (re)affirmed, e.g. "2024-01-01T12:00:00"
    pub timestamp: String,
    /// Label text; may be a legacy label no longer in the taxonomy
    pub label: String,
}

/// One row of the persisted table
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PersistedRow {
    pub timestamp: String,
    pub image_path: String,
    pub label: String,
}

impl PersistedRow {
    /// True if this row is literally the header line repeated
    pub fn is_header(&self) -> bool {
        self.timestamp == CSV_HEADER[0]
            && self.image_path == CSV_HEADER[1]
            && self.label == CSV_HEADER[2]
    }
}

/// What a label request did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelOutcome {
    /// Path or label not part of the session; nothing changed
    Ignored,
    /// Same label chosen again; only the timestamp moved
    Refreshed,
    /// New label recorded, replacing `previous` if there was one
    Changed { previous: Option<String> },
}
