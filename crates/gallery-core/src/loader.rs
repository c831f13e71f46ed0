//! Loader: fetch the data file, parse it, validate the schema and keep the
//! usable rows.
//!
//! Every failure maps to one user-facing message (`LoadError`'s `Display`).
//! Row-level parse problems are not failures: they come back as a warning
//! alongside the records that survived.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::record::{MediaRecord, REQUIRED_FIELDS};
use crate::tabular;

#[derive(Debug, Error)]
pub enum LoadError {
    /// Transport failure: non-success response, network error, unreadable file.
    #[error("Error loading CSV file: {0}")]
    Fetch(String),
    /// Nothing parsed at all.
    #[error("CSV file is empty or invalid.")]
    Empty,
    #[error("Missing required columns in CSV: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("No valid data found in CSV. Ensure each row has id, url, and title.")]
    NoValidRows,
}

/// A successful load.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub records: Vec<MediaRecord>,
    /// `Error parsing CSV: …` when some rows had problems.
    pub warning: Option<String>,
    /// Rows dropped for lacking id, url or title.
    pub dropped: usize,
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Fetch raw bytes from `location`: one attempt, no retry. Decoding is left
/// to the parser so bad rows can be reported individually.
pub async fn fetch_source(location: &str) -> Result<Vec<u8>, LoadError> {
    if is_remote(location) {
        debug!("loader: GET {}", location);
        let resp = reqwest::get(location)
            .await
            .map_err(|e| LoadError::Fetch(e.to_string()))?;
        if !resp.status().is_success() {
            warn!("loader: {} answered {}", location, resp.status());
            return Err(LoadError::Fetch(format!("Failed to load {}", location)));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| LoadError::Fetch(e.to_string()))?;
        Ok(bytes.to_vec())
    } else {
        debug!("loader: reading {}", location);
        match tokio::fs::read(location).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                warn!("loader: cannot read {}: {}", location, e);
                Err(LoadError::Fetch(format!("Failed to load {}", location)))
            }
        }
    }
}

/// Parse, validate and filter `raw` into records.
pub fn build_records(raw: impl AsRef<[u8]>) -> Result<LoadOutcome, LoadError> {
    let parsed = tabular::parse(raw);

    let warning = if parsed.errors.is_empty() {
        None
    } else {
        for e in &parsed.errors {
            warn!("loader: parse error at line {:?}: {}", e.line, e.message);
        }
        let joined = parsed
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        Some(format!("Error parsing CSV: {}", joined))
    };

    if parsed.data.is_empty() {
        return Err(LoadError::Empty);
    }

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|f| !parsed.has_field(f))
        .map(|f| f.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let total = parsed.data.len();
    let records: Vec<MediaRecord> = parsed.data.iter().filter_map(MediaRecord::from_row).collect();
    if records.is_empty() {
        return Err(LoadError::NoValidRows);
    }

    let dropped = total - records.len();
    if dropped > 0 {
        info!("loader: dropped {} row(s) without id/url/title", dropped);
    }

    Ok(LoadOutcome {
        records,
        warning,
        dropped,
    })
}

/// Fetch and build in one step.
pub async fn load(location: &str) -> Result<LoadOutcome, LoadError> {
    let raw = fetch_source(location).await?;
    let outcome = build_records(&raw)?;
    info!(
        "loader: {} record(s) from {}",
        outcome.records.len(),
        location
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_missing_required_values_dropped() {
        let out = build_records("id,url,title\n1,a.mp4,A\n2,,B\n").unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].id, "1");
        assert_eq!(out.dropped, 1);
        assert!(out.warning.is_none());
    }

    #[test]
    fn test_missing_columns_named_in_order() {
        let err = build_records("url,name\na.mp4,A\n").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumns(ref c) if c == &["id", "title"]));
        assert_eq!(err.to_string(), "Missing required columns in CSV: id, title");
    }

    #[test]
    fn test_header_only_is_empty() {
        let err = build_records("id,url,title\n").unwrap_err();
        assert!(matches!(err, LoadError::Empty));
        assert_eq!(err.to_string(), "CSV file is empty or invalid.");
    }

    #[test]
    fn test_no_valid_rows() {
        let err = build_records("id,url,title\n1,,A\n,b.mp4,B\n").unwrap_err();
        assert!(matches!(err, LoadError::NoValidRows));
    }

    #[test]
    fn test_parse_errors_become_warning_but_load_continues() {
        let out = build_records("id,url,title\n1,a.mp4,A\n2,b.mp4\n3,c.mp4,C,x\n").unwrap();
        assert_eq!(out.records.len(), 2);
        let w = out.warning.unwrap();
        assert!(w.starts_with("Error parsing CSV: Too few fields"));
        assert!(w.contains("; Too many fields"));
    }

    #[test]
    fn test_optional_columns_carried() {
        let out = build_records(
            "id,url,title,thumb,size_formatted,how_long_ago\n7,v.mp4,V,t.jpg,1.5 GB,2 days ago\n",
        )
        .unwrap();
        let r = &out.records[0];
        assert_eq!(r.thumb.as_deref(), Some("t.jpg"));
        assert_eq!(r.size_formatted.as_deref(), Some("1.5 GB"));
        assert_eq!(r.how_long_ago.as_deref(), Some("2 days ago"));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_fetch_error() {
        let err = load("/definitely/not/here/data.csv").await.unwrap_err();
        assert!(matches!(err, LoadError::Fetch(_)));
        assert_eq!(
            err.to_string(),
            "Error loading CSV file: Failed to load /definitely/not/here/data.csv"
        );
    }

    #[tokio::test]
    async fn test_local_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "id,url,title\n1,a.mp4,A\n").unwrap();
        let out = load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(out.records.len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_row_becomes_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, b"id,url,title\n1,a.mp4,\xff\xfeBad\n2,b.mp4,Ok\n").unwrap();
        let out = load(path.to_str().unwrap()).await.unwrap();
        let titles: Vec<&str> = out.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Ok"]);
        let w = out.warning.unwrap();
        assert!(w.starts_with("Error parsing CSV: Invalid UTF-8 in row"));
    }
}
