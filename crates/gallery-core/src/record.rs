//! Media records and the ordered store they live in.

use serde::{Deserialize, Serialize};

/// Columns every usable row must carry, in the order they are reported.
pub const REQUIRED_FIELDS: [&str; 3] = ["id", "url", "title"];

/// One media item as described by a row of the data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    /// Thumbnail image URL or path.
    pub thumb: Option<String>,
    /// Human-formatted size, e.g. "12.5 MB".
    pub size_formatted: Option<String>,
    /// Human-formatted upload recency, e.g. "3 days ago".
    pub how_long_ago: Option<String>,
}

impl MediaRecord {
    /// Build a record from a parsed row. Returns `None` when any required
    /// field is absent or empty; empty optional cells become `None`.
    pub fn from_row(row: &crate::tabular::Row) -> Option<Self> {
        let cell = |name: &str| row.get(name).filter(|v| !v.is_empty()).cloned();
        Some(Self {
            id: cell("id")?,
            url: cell("url")?,
            title: cell("title")?,
            thumb: cell("thumb"),
            size_formatted: cell("size_formatted"),
            how_long_ago: cell("how_long_ago"),
        })
    }

    /// Value of a string column by name (used by the sort controller).
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(self.id.as_str()),
            "url" => Some(self.url.as_str()),
            "title" => Some(self.title.as_str()),
            "thumb" => self.thumb.as_deref(),
            "size_formatted" => self.size_formatted.as_deref(),
            "how_long_ago" => self.how_long_ago.as_deref(),
            _ => None,
        }
    }
}

/// In-memory ordered sequence of records, rebuilt on every successful load.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<MediaRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly loaded set of records.
    pub fn replace(&mut self, records: Vec<MediaRecord>) {
        self.records = records;
    }

    pub fn records(&self) -> &[MediaRecord] {
        &self.records
    }

    /// Mutable access for whole-sequence reordering.
    pub(crate) fn records_mut(&mut self) -> &mut Vec<MediaRecord> {
        &mut self.records
    }

    pub fn get(&self, idx: usize) -> Option<&MediaRecord> {
        self.records.get(idx)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
