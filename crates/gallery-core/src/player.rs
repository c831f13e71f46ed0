//! Player: lifecycle of the single playback overlay.
//!
//! ```text
//!   Closed ──open──▶ Opening ──DataReady──▶ Playing ──close──▶ Closed
//!                       │                      │
//!                       └─LoadFailed──▶ Closed ◀─PlaybackFailed─┘
//! ```
//!
//! The player never talks to a media backend itself. `open`, `close` and
//! `handle` return `PlayerCommand`s for the caller to execute, and the
//! backend's callbacks come back in as `PlayerEvent`s.
//!
//! Each `open()` and `close()` starts a new generation. Commands carry the
//! generation they were issued under and every event must echo it back;
//! events from any other generation are dropped. Closing therefore detaches
//! all callbacks of the media it tears down, including the failure callback
//! that clearing a source tends to trigger.

use tracing::{debug, info, warn};

use crate::record::MediaRecord;

pub const LOAD_FAILED_MESSAGE: &str =
    "Failed to load video. Please check the URL or try another video.";
pub const PLAY_FAILED_MESSAGE: &str =
    "Failed to play video. Please check the video format or try another.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerPhase {
    #[default]
    Closed,
    /// Source assigned, waiting for data.
    Opening,
    /// Overlay visible, playback requested or running.
    Playing,
}

/// What is currently loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowShowing {
    pub id: String,
    pub url: String,
    pub title: String,
}

/// Work for the media backend (or the surrounding app).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Assign `url` as the playback source and start loading it, paused.
    Load { generation: u64, url: String },
    /// Start playback of the loaded source.
    Play { generation: u64 },
    /// Pause, clear the source and discard anything buffered.
    Stop,
    /// Show `message` to the user.
    Notify(String),
    /// Playback of `id` started; mark it viewed unless it already is.
    AutoMarkViewed(String),
}

/// Callbacks from the media backend, tagged with the generation of the
/// command that caused them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    LoadFailed { generation: u64, reason: String },
    DataReady { generation: u64 },
    PlaybackStarted { generation: u64 },
    PlaybackFailed { generation: u64, reason: String },
}

impl PlayerEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::LoadFailed { generation, .. }
            | Self::DataReady { generation }
            | Self::PlaybackStarted { generation }
            | Self::PlaybackFailed { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Default)]
pub struct Player {
    phase: PlayerPhase,
    generation: u64,
    current: Option<NowShowing>,
    started: bool,
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current(&self) -> Option<&NowShowing> {
        self.current.as_ref()
    }

    /// Title shown in the overlay header; empty when closed.
    pub fn title(&self) -> &str {
        self.current.as_ref().map(|c| c.title.as_str()).unwrap_or("")
    }

    /// The overlay is revealed once data is ready.
    pub fn overlay_visible(&self) -> bool {
        self.phase == PlayerPhase::Playing
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_closed(&self) -> bool {
        self.phase == PlayerPhase::Closed
    }

    /// Start loading `record`, replacing whatever was open.
    pub fn open(&mut self, record: &MediaRecord) -> Vec<PlayerCommand> {
        self.generation += 1;
        self.phase = PlayerPhase::Opening;
        self.started = false;
        self.current = Some(NowShowing {
            id: record.id.clone(),
            url: record.url.clone(),
            title: record.title.clone(),
        });
        info!(
            "player: open gen={} id={} url={}",
            self.generation, record.id, record.url
        );
        vec![PlayerCommand::Load {
            generation: self.generation,
            url: record.url.clone(),
        }]
    }

    /// Tear down from any state. A no-op when already closed.
    pub fn close(&mut self) -> Vec<PlayerCommand> {
        if self.phase == PlayerPhase::Closed && self.current.is_none() {
            return Vec::new();
        }
        self.generation += 1;
        debug!("player: close, now gen={}", self.generation);
        self.phase = PlayerPhase::Closed;
        self.started = false;
        self.current = None;
        vec![PlayerCommand::Stop]
    }

    /// Feed a backend callback through the state machine.
    pub fn handle(&mut self, event: PlayerEvent) -> Vec<PlayerCommand> {
        if event.generation() != self.generation || self.current.is_none() {
            debug!(
                "player: ignoring stale {:?} (current gen={})",
                event, self.generation
            );
            return Vec::new();
        }

        match (self.phase, event) {
            (PlayerPhase::Opening, PlayerEvent::DataReady { generation }) => {
                self.phase = PlayerPhase::Playing;
                vec![PlayerCommand::Play { generation }]
            }
            (PlayerPhase::Opening | PlayerPhase::Playing, PlayerEvent::LoadFailed { reason, .. })
                if !self.started =>
            {
                warn!("player: load failed for {}: {}", self.url(), reason);
                self.fail(LOAD_FAILED_MESSAGE)
            }
            (PlayerPhase::Playing, PlayerEvent::PlaybackFailed { reason, .. }) => {
                warn!("player: playback failed for {}: {}", self.url(), reason);
                self.fail(PLAY_FAILED_MESSAGE)
            }
            (PlayerPhase::Playing, PlayerEvent::PlaybackStarted { .. }) if !self.started => {
                self.started = true;
                let id = self
                    .current
                    .as_ref()
                    .map(|c| c.id.clone())
                    .unwrap_or_default();
                info!("player: playback started id={}", id);
                vec![PlayerCommand::AutoMarkViewed(id)]
            }
            (phase, event) => {
                debug!("player: {:?} has no effect in {:?}", event, phase);
                Vec::new()
            }
        }
    }

    fn url(&self) -> &str {
        self.current.as_ref().map(|c| c.url.as_str()).unwrap_or("")
    }

    fn fail(&mut self, message: &str) -> Vec<PlayerCommand> {
        let mut commands = vec![PlayerCommand::Notify(message.to_string())];
        commands.extend(self.close());
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> MediaRecord {
        MediaRecord {
            id: id.into(),
            url: format!("https://cdn.example/{}.mp4", id),
            title: format!("Clip {}", id),
            thumb: None,
            size_formatted: None,
            how_long_ago: None,
        }
    }

    fn has_notify(cmds: &[PlayerCommand]) -> bool {
        cmds.iter().any(|c| matches!(c, PlayerCommand::Notify(_)))
    }

    #[test]
    fn test_happy_path() {
        let mut p = Player::new();
        let cmds = p.open(&record("1"));
        let gen = p.generation();
        assert_eq!(
            cmds,
            vec![PlayerCommand::Load { generation: gen, url: "https://cdn.example/1.mp4".into() }]
        );
        assert_eq!(p.phase(), PlayerPhase::Opening);
        assert_eq!(p.title(), "Clip 1");
        assert!(!p.overlay_visible());

        let cmds = p.handle(PlayerEvent::DataReady { generation: gen });
        assert_eq!(cmds, vec![PlayerCommand::Play { generation: gen }]);
        assert!(p.overlay_visible());

        let cmds = p.handle(PlayerEvent::PlaybackStarted { generation: gen });
        assert_eq!(cmds, vec![PlayerCommand::AutoMarkViewed("1".into())]);
        assert!(p.is_started());

        // A second start notification must not mark again.
        assert!(p.handle(PlayerEvent::PlaybackStarted { generation: gen }).is_empty());
    }

    #[test]
    fn test_load_failure_notifies_and_closes() {
        let mut p = Player::new();
        p.open(&record("1"));
        let gen = p.generation();
        let cmds = p.handle(PlayerEvent::LoadFailed { generation: gen, reason: "404".into() });
        assert_eq!(
            cmds,
            vec![PlayerCommand::Notify(LOAD_FAILED_MESSAGE.into()), PlayerCommand::Stop]
        );
        assert!(p.is_closed());
        assert_eq!(p.title(), "");
    }

    #[test]
    fn test_play_failure_notifies_and_closes() {
        let mut p = Player::new();
        p.open(&record("1"));
        let gen = p.generation();
        p.handle(PlayerEvent::DataReady { generation: gen });
        let cmds = p.handle(PlayerEvent::PlaybackFailed { generation: gen, reason: "codec".into() });
        assert_eq!(cmds[0], PlayerCommand::Notify(PLAY_FAILED_MESSAGE.into()));
        assert!(p.is_closed());
    }

    #[test]
    fn test_failure_after_start_is_not_a_load_failure() {
        let mut p = Player::new();
        p.open(&record("1"));
        let gen = p.generation();
        p.handle(PlayerEvent::DataReady { generation: gen });
        p.handle(PlayerEvent::PlaybackStarted { generation: gen });
        assert!(p.handle(PlayerEvent::LoadFailed { generation: gen, reason: "eof".into() }).is_empty());
        assert!(p.overlay_visible());
    }

    #[test]
    fn test_close_is_idempotent_and_silent() {
        let mut p = Player::new();
        assert!(p.close().is_empty());

        p.open(&record("1"));
        let gen = p.generation();
        let first = p.close();
        assert_eq!(first, vec![PlayerCommand::Stop]);
        let after_first = (p.phase(), p.generation(), p.title().to_string());

        assert!(p.close().is_empty());
        assert_eq!((p.phase(), p.generation(), p.title().to_string()), after_first);

        // The teardown's own failure callback is stale and ignored.
        let cmds = p.handle(PlayerEvent::LoadFailed { generation: gen, reason: "aborted".into() });
        assert!(!has_notify(&cmds));
        assert!(cmds.is_empty());
    }

    #[test]
    fn test_reopen_ignores_previous_generation() {
        let mut p = Player::new();
        p.open(&record("1"));
        let old = p.generation();
        p.open(&record("2"));
        let new = p.generation();
        assert_ne!(old, new);

        assert!(p.handle(PlayerEvent::DataReady { generation: old }).is_empty());
        assert!(p.handle(PlayerEvent::LoadFailed { generation: old, reason: "x".into() }).is_empty());
        assert_eq!(p.phase(), PlayerPhase::Opening);
        assert_eq!(p.current().unwrap().id, "2");

        assert_eq!(
            p.handle(PlayerEvent::DataReady { generation: new }),
            vec![PlayerCommand::Play { generation: new }]
        );
    }

    #[test]
    fn test_events_while_closed_are_ignored() {
        let mut p = Player::new();
        assert!(p.handle(PlayerEvent::DataReady { generation: 0 }).is_empty());
        assert!(p.is_closed());
    }
}
