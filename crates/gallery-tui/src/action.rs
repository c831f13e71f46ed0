//! Action enum: all user-initiated intents.

use gallery_core::sort::SortKey;

/// Unique identifier for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    MediaGrid,
    PlayerOverlay,
    HelpOverlay,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Player ───────────────────────────────────────────────────────────────
    Open(usize), // card index in the store
    ClosePlayer,

    // ── Viewed state ─────────────────────────────────────────────────────────
    ToggleViewed(String), // record id

    // ── Sorting ──────────────────────────────────────────────────────────────
    Sort(SortKey),
    CycleSort,
    CycleSortReverse,

    // ── Data ─────────────────────────────────────────────────────────────────
    Reload,

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleHelp,
    ToggleKeys,
    CopyToClipboard(String), // text to copy

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}
