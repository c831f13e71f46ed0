//! AppState: shared read-only data passed to all components during render/event.
//!
//! Components read this for gallery state, but never mutate it.
//! The App event-loop is the only thing that writes to AppState.

use gallery_core::gallery::Gallery;
use gallery_core::record::MediaRecord;
use gallery_core::render::{CardView, GridView};

use crate::widgets::status_bar::InputMode;

pub struct AppState {
    pub gallery: Gallery,
    /// Last projection of the gallery; refreshed by `rerender` after every
    /// state change so drawing never recomputes it.
    pub grid: GridView,
    /// Viewed records in the store, counted alongside `grid`.
    pub viewed: usize,
    /// Data file location as configured (path or URL).
    pub source: String,
    /// A fetch is in flight.
    pub loading: bool,
}

impl AppState {
    pub fn new(gallery: Gallery, source: impl Into<String>) -> Self {
        let grid = gallery.view();
        let viewed = gallery.viewed_count();
        Self {
            gallery,
            grid,
            viewed,
            source: source.into(),
            loading: false,
        }
    }

    pub fn rerender(&mut self) {
        self.grid = self.gallery.view();
        self.viewed = self.gallery.viewed_count();
    }

    pub fn card(&self, idx: usize) -> Option<&CardView> {
        self.grid.cards.get(idx)
    }

    pub fn record(&self, idx: usize) -> Option<&MediaRecord> {
        self.gallery.record(idx)
    }

    pub fn input_mode(&self) -> InputMode {
        if self.gallery.player().is_closed() {
            InputMode::Grid
        } else {
            InputMode::Player
        }
    }
}
