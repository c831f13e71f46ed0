//! Gallery: the one application-state object.
//!
//! Owns the record store, the viewed tracker and the player, and exposes the
//! operations the front end may perform. Front ends read through `view()`
//! and never mutate the parts directly.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::loader::{LoadError, LoadOutcome};
use crate::player::{Player, PlayerCommand, PlayerEvent};
use crate::record::{MediaRecord, RecordStore};
use crate::render::{self, GridView, ThumbContext};
use crate::sort::SortKey;
use crate::storage::{KeyValueStore, StorageError};
use crate::viewed::ViewedTracker;

pub struct Gallery {
    store: RecordStore,
    viewed: ViewedTracker,
    player: Player,
    /// `None` until a sort has been chosen (or restored).
    sort_key: Option<SortKey>,
    broken_thumbs: HashSet<String>,
    placeholder: String,
    /// Loader error shown in the banner; cleared by the next successful load.
    error_message: Option<String>,
}

impl Gallery {
    pub fn new(storage: Box<dyn KeyValueStore>, placeholder: impl Into<String>) -> Self {
        Self {
            store: RecordStore::new(),
            viewed: ViewedTracker::restore(storage),
            player: Player::new(),
            sort_key: None,
            broken_thumbs: HashSet::new(),
            placeholder: placeholder.into(),
            error_message: None,
        }
    }

    // ── Read side ────────────────────────────────────────────────────────────

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn record(&self, idx: usize) -> Option<&MediaRecord> {
        self.store.get(idx)
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn viewed(&self) -> &ViewedTracker {
        &self.viewed
    }

    pub fn is_viewed(&self, id: &str) -> bool {
        self.viewed.is_viewed(id)
    }

    pub fn sort_key(&self) -> Option<SortKey> {
        self.sort_key
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn viewed_count(&self) -> usize {
        self.store
            .records()
            .iter()
            .filter(|r| self.viewed.is_viewed(&r.id))
            .count()
    }

    /// Thumbnails that still need an availability check.
    pub fn thumbs_to_probe(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.store
            .records()
            .iter()
            .filter_map(|r| r.thumb.clone())
            .filter(|t| !self.broken_thumbs.contains(t) && seen.insert(t.clone()))
            .collect()
    }

    /// Renderer output for the current state.
    pub fn view(&self) -> GridView {
        render::project(
            &self.store,
            self.viewed.set(),
            ThumbContext {
                broken: &self.broken_thumbs,
                placeholder: &self.placeholder,
            },
        )
    }

    // ── Loader ───────────────────────────────────────────────────────────────

    /// Apply a load result. Success replaces the store wholesale (and re-applies
    /// a chosen sort); failure leaves the store as it was.
    /// Returns the parse warning, if any, for the caller to surface.
    pub fn apply_load(&mut self, result: Result<LoadOutcome, LoadError>) -> Option<String> {
        match result {
            Ok(outcome) => {
                info!("gallery: loaded {} record(s)", outcome.records.len());
                self.store.replace(outcome.records);
                if let Some(key) = self.sort_key {
                    self.store.sort_by_key(key);
                }
                self.error_message = outcome.warning.clone();
                outcome.warning
            }
            Err(e) => {
                warn!("gallery: load failed: {}", e);
                self.error_message = Some(e.to_string());
                None
            }
        }
    }

    // ── Viewed-state tracker ─────────────────────────────────────────────────

    pub fn toggle_viewed(&mut self, id: &str) -> Result<bool, StorageError> {
        self.viewed.toggle(id)
    }

    // ── Sort controller ──────────────────────────────────────────────────────

    pub fn sort(&mut self, key: SortKey) {
        debug!("gallery: sort by {}", key.field());
        self.sort_key = Some(key);
        self.store.sort_by_key(key);
    }

    // ── Thumbnails ───────────────────────────────────────────────────────────

    /// Record that `thumb` could not be loaded; its cards show the placeholder.
    pub fn mark_thumb_broken(&mut self, thumb: &str) {
        if self.broken_thumbs.insert(thumb.to_string()) {
            debug!("gallery: thumbnail unavailable: {}", thumb);
        }
    }

    // ── Player ───────────────────────────────────────────────────────────────

    pub fn open(&mut self, idx: usize) -> Vec<PlayerCommand> {
        let Some(record) = self.store.get(idx).cloned() else {
            return Vec::new();
        };
        let commands = self.player.open(&record);
        self.settle(commands)
    }

    pub fn close_player(&mut self) -> Vec<PlayerCommand> {
        let commands = self.player.close();
        self.settle(commands)
    }

    pub fn handle_player_event(&mut self, event: PlayerEvent) -> Vec<PlayerCommand> {
        let commands = self.player.handle(event);
        self.settle(commands)
    }

    /// Carry out the commands that concern gallery state and hand the rest
    /// (media and notification work) back to the caller.
    fn settle(&mut self, commands: Vec<PlayerCommand>) -> Vec<PlayerCommand> {
        let mut out = Vec::with_capacity(commands.len());
        for command in commands {
            match command {
                PlayerCommand::AutoMarkViewed(id) => {
                    if self.viewed.is_viewed(&id) {
                        continue;
                    }
                    if let Err(e) = self.viewed.toggle(&id) {
                        out.push(PlayerCommand::Notify(format!(
                            "Could not save viewed state: {}",
                            e
                        )));
                    }
                }
                other => out.push(other),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::build_records;
    use crate::player::PlayerPhase;
    use crate::storage::MemoryStore;

    const CSV: &str = "id,url,title,thumb,size_formatted\n\
                       1,a.mp4,Beta,a.jpg,5 MB\n\
                       2,b.mp4,Alpha,,50 MB\n\
                       3,c.mp4,Gamma,a.jpg,\n";

    fn loaded() -> Gallery {
        let mut g = Gallery::new(Box::new(MemoryStore::new()), "placeholder.png");
        assert!(g.apply_load(build_records(CSV)).is_none());
        g
    }

    #[test]
    fn test_failed_reload_keeps_previous_store() {
        let mut g = loaded();
        g.apply_load(build_records("url,title\nx,y\n"));
        assert_eq!(g.store().len(), 3);
        assert_eq!(g.error_message(), Some("Missing required columns in CSV: id"));

        g.apply_load(build_records(CSV));
        assert_eq!(g.error_message(), None);
    }

    #[test]
    fn test_failed_first_load_leaves_store_empty() {
        let mut g = Gallery::new(Box::new(MemoryStore::new()), "p");
        g.apply_load(build_records("id,url,title\n,,\n"));
        assert!(g.store().is_empty());
        assert_eq!(g.view().message.as_deref(), Some(render::EMPTY_MESSAGE));
    }

    #[test]
    fn test_toggle_reflected_in_view() {
        let mut g = loaded();
        assert!(g.toggle_viewed("2").unwrap());
        let view = g.view();
        assert!(view.cards[1].viewed);
        assert_eq!(view.cards[1].toggle_label, render::MARK_UNVIEWED);
        assert_eq!(g.viewed_count(), 1);
    }

    #[test]
    fn test_sort_is_reapplied_after_reload() {
        let mut g = loaded();
        g.sort(SortKey::Title);
        let titles: Vec<_> = g.store().records().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);

        g.apply_load(build_records(CSV));
        assert_eq!(g.store().records()[0].title, "Alpha");

        g.sort(SortKey::SizeFormatted);
        let ids: Vec<_> = g.store().records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
    }

    #[test]
    fn test_auto_mark_viewed_once_on_start() {
        let mut g = loaded();
        let cmds = g.open(0);
        let gen = g.player().generation();
        assert!(matches!(cmds[0], PlayerCommand::Load { .. }));

        g.handle_player_event(PlayerEvent::DataReady { generation: gen });
        let cmds = g.handle_player_event(PlayerEvent::PlaybackStarted { generation: gen });
        assert!(cmds.is_empty());
        assert!(g.is_viewed("1"));
        assert_eq!(g.viewed().stored_value().as_deref(), Some("[\"1\"]"));

        g.handle_player_event(PlayerEvent::PlaybackStarted { generation: gen });
        assert!(g.is_viewed("1"));
    }

    #[test]
    fn test_auto_mark_leaves_viewed_items_alone() {
        let mut g = loaded();
        g.toggle_viewed("1").unwrap();
        g.open(0);
        let gen = g.player().generation();
        g.handle_player_event(PlayerEvent::DataReady { generation: gen });
        g.handle_player_event(PlayerEvent::PlaybackStarted { generation: gen });
        assert!(g.is_viewed("1"));
    }

    #[test]
    fn test_close_then_stale_failure_is_silent() {
        let mut g = loaded();
        g.open(1);
        let gen = g.player().generation();
        assert_eq!(g.close_player(), vec![PlayerCommand::Stop]);
        assert!(g.close_player().is_empty());
        let cmds = g.handle_player_event(PlayerEvent::LoadFailed { generation: gen, reason: "x".into() });
        assert!(cmds.is_empty());
        assert_eq!(g.player().phase(), PlayerPhase::Closed);
    }

    #[test]
    fn test_open_out_of_range_is_noop() {
        let mut g = loaded();
        assert!(g.open(99).is_empty());
        assert!(g.player().is_closed());
    }

    #[test]
    fn test_broken_thumbs_and_probe_list() {
        let mut g = loaded();
        assert_eq!(g.thumbs_to_probe(), vec!["a.jpg".to_string()]);
        g.mark_thumb_broken("a.jpg");
        assert!(g.thumbs_to_probe().is_empty());
        assert!(g.view().cards.iter().all(|c| c.thumb == "placeholder.png"));
    }
}
