//! Domain core of the media gallery: records, loading, viewed-state
//! persistence, sorting, card projection and the player state machine.
//!
//! Nothing in here touches the terminal; `gallery-tui` drives it.

pub mod config;
pub mod gallery;
pub mod loader;
pub mod platform;
pub mod player;
pub mod record;
pub mod render;
pub mod sort;
pub mod storage;
pub mod tabular;
pub mod viewed;
