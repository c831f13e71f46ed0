//! Renderer: projects the record store and viewed set into card views.
//!
//! `project` is a pure function of its inputs: the terminal front end calls
//! it whenever anything changed and draws whatever comes back.

use std::collections::HashSet;

use crate::record::RecordStore;
use crate::viewed::ViewedSet;

pub const VIEWED_BADGE: &str = "Viewed";
pub const UNKNOWN: &str = "Unknown";
pub const EMPTY_MESSAGE: &str = "No media data to display.";
pub const MARK_VIEWED: &str = "Mark as Viewed";
pub const MARK_UNVIEWED: &str = "Mark as Unviewed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    /// Position in the record store.
    pub index: usize,
    pub id: String,
    /// Thumbnail to show; the placeholder when none is usable.
    pub thumb: String,
    pub thumb_is_placeholder: bool,
    pub viewed: bool,
    pub title: String,
    pub size: String,
    pub uploaded: String,
    pub toggle_label: &'static str,
}

impl CardView {
    pub fn badge(&self) -> Option<&'static str> {
        self.viewed.then_some(VIEWED_BADGE)
    }

    pub fn size_line(&self) -> String {
        format!("Size: {}", self.size)
    }

    pub fn uploaded_line(&self) -> String {
        format!("Uploaded: {}", self.uploaded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridView {
    pub cards: Vec<CardView>,
    /// Informational text shown instead of an empty grid.
    pub message: Option<String>,
}

/// Thumbnails known to be unusable (probe failed) plus the fallback image.
#[derive(Debug, Clone, Copy)]
pub struct ThumbContext<'a> {
    pub broken: &'a HashSet<String>,
    pub placeholder: &'a str,
}

pub fn project(store: &RecordStore, viewed: &ViewedSet, thumbs: ThumbContext<'_>) -> GridView {
    if store.is_empty() {
        return GridView {
            cards: Vec::new(),
            message: Some(EMPTY_MESSAGE.to_string()),
        };
    }

    let cards = store
        .records()
        .iter()
        .enumerate()
        .map(|(index, r)| {
            let usable_thumb = r.thumb.as_deref().filter(|t| !thumbs.broken.contains(*t));
            let is_viewed = viewed.contains(&r.id);
            CardView {
                index,
                id: r.id.clone(),
                thumb: usable_thumb.unwrap_or(thumbs.placeholder).to_string(),
                thumb_is_placeholder: usable_thumb.is_none(),
                viewed: is_viewed,
                title: r.title.clone(),
                size: r.size_formatted.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                uploaded: r.how_long_ago.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                toggle_label: if is_viewed { MARK_UNVIEWED } else { MARK_VIEWED },
            }
        })
        .collect();

    GridView {
        cards,
        message: None,
    }
}
