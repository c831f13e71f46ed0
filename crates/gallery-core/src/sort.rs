//! Sort controller: reorders the record store by a chosen column.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::record::{MediaRecord, RecordStore};

/// The fixed set of sortable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Title,
    SizeFormatted,
    HowLongAgo,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [Self::Title, Self::SizeFormatted, Self::HowLongAgo];

    /// Column name the key sorts on.
    pub fn field(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::SizeFormatted => "size_formatted",
            Self::HowLongAgo => "how_long_ago",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::SizeFormatted => "size",
            Self::HowLongAgo => "uploaded",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.label() == label || k.field() == label)
    }

    pub fn next(self) -> Self {
        match self {
            Self::Title => Self::SizeFormatted,
            Self::SizeFormatted => Self::HowLongAgo,
            Self::HowLongAgo => Self::Title,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Title => Self::HowLongAgo,
            Self::SizeFormatted => Self::Title,
            Self::HowLongAgo => Self::SizeFormatted,
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, Self::SizeFormatted)
    }
}

/// Leading floating-point prefix of `s`, like JavaScript's `parseFloat`:
/// `"12.5 MB"` → 12.5, `"abc"` → None.
pub fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    // Optional exponent, only taken when it has digits.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

fn size_value(record: &MediaRecord) -> f64 {
    record
        .size_formatted
        .as_deref()
        .and_then(parse_leading_float)
        .unwrap_or(0.0)
}

/// Reorder `records` in place by `key`.
///
/// Size sorts descending by parsed value (unparseable = 0). Text columns sort
/// ascending over the records that have a value; records without one stay in
/// the slots they occupied. Both are stable.
pub fn sort_records(records: &mut Vec<MediaRecord>, key: SortKey) {
    if key.is_numeric() {
        records.sort_by(|a, b| size_value(b).total_cmp(&size_value(a)));
        return;
    }

    let field = key.field();
    let slots: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.field(field).is_some())
        .map(|(i, _)| i)
        .collect();
    let mut defined: Vec<MediaRecord> = slots.iter().map(|&i| records[i].clone()).collect();
    defined.sort_by(|a, b| compare_text(a.field(field), b.field(field)));
    for (slot, record) in slots.into_iter().zip(defined) {
        records[slot] = record;
    }
}

fn compare_text(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

impl RecordStore {
    /// Sort controller entry point.
    pub fn sort_by_key(&mut self, key: SortKey) {
        sort_records(self.records_mut(), key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, title: &str, size: Option<&str>, ago: Option<&str>) -> MediaRecord {
        MediaRecord {
            id: id.into(),
            url: format!("{}.mp4", id),
            title: title.into(),
            thumb: None,
            size_formatted: size.map(Into::into),
            how_long_ago: ago.map(Into::into),
        }
    }

    fn ids(records: &[MediaRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_parse_leading_float() {
        assert_eq!(parse_leading_float("12.5 MB"), Some(12.5));
        assert_eq!(parse_leading_float("  3"), Some(3.0));
        assert_eq!(parse_leading_float(".5GB"), Some(0.5));
        assert_eq!(parse_leading_float("-2e3x"), Some(-2000.0));
        assert_eq!(parse_leading_float("1e"), Some(1.0));
        assert_eq!(parse_leading_float("7."), Some(7.0));
        assert_eq!(parse_leading_float("MB 12"), None);
        assert_eq!(parse_leading_float("."), None);
        assert_eq!(parse_leading_float(""), None);
    }

    #[test]
    fn test_size_descending_unparseable_last() {
        let mut v = vec![
            rec("a", "A", Some("10 MB"), None),
            rec("b", "B", Some("n/a"), None),
            rec("c", "C", Some("700 KB"), None),
            rec("d", "D", None, None),
            rec("e", "E", Some("1.5 GB"), None),
        ];
        sort_records(&mut v, SortKey::SizeFormatted);
        assert_eq!(ids(&v), vec!["c", "a", "e", "b", "d"]);
        let values: Vec<f64> = v.iter().map(size_value).collect();
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_title_ascending_and_stable() {
        let mut v = vec![
            rec("1", "b", None, None),
            rec("2", "a", None, None),
            rec("3", "b", None, None),
            rec("4", "a", None, None),
        ];
        sort_records(&mut v, SortKey::Title);
        assert_eq!(ids(&v), vec!["2", "4", "1", "3"]);
    }

    #[test]
    fn test_absent_values_keep_their_slots() {
        let mut v = vec![
            rec("1", "t", None, Some("z")),
            rec("2", "t", None, None),
            rec("3", "t", None, Some("a")),
            rec("4", "t", None, None),
            rec("5", "t", None, Some("m")),
        ];
        sort_records(&mut v, SortKey::HowLongAgo);
        assert_eq!(ids(&v), vec!["3", "2", "5", "4", "1"]);
        let defined: Vec<&str> = v.iter().filter_map(|r| r.how_long_ago.as_deref()).collect();
        assert!(defined.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_sort_key_cycle_and_labels() {
        let mut k = SortKey::Title;
        for _ in 0..SortKey::ALL.len() {
            assert_eq!(k.next().prev(), k);
            k = k.next();
        }
        assert_eq!(k, SortKey::Title);
        assert_eq!(SortKey::from_label("size"), Some(SortKey::SizeFormatted));
        assert_eq!(SortKey::from_label("how_long_ago"), Some(SortKey::HowLongAgo));
        assert_eq!(SortKey::from_label("bogus"), None);
    }
}
