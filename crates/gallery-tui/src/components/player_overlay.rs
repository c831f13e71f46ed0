//! PlayerOverlay: modal panel over the grid while a video is showing.
//!
//! The frame itself plays in mpv's window; the overlay carries the title,
//! the source and the close affordances. A click on the dimmed backdrop
//! closes the player, a click on the panel does not.

use ratatui::crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::{centered_rect, fit, hit};
use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_muted, style_secondary, C_BACKDROP, C_PANEL_BORDER_FOCUSED, C_PLAYER_BG, C_PRIMARY, C_VIEWED},
};

pub struct PlayerOverlay {
    /// Where the panel was last drawn; empty while hidden.
    panel: Rect,
}

impl PlayerOverlay {
    pub fn new() -> Self {
        Self { panel: Rect::default() }
    }
}

impl Default for PlayerOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for PlayerOverlay {
    fn id(&self) -> ComponentId {
        ComponentId::PlayerOverlay
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if state.gallery.player().is_closed() {
            return vec![];
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => vec![Action::ClosePlayer],
            KeyCode::Char('?') => vec![Action::ToggleHelp],
            KeyCode::Char('y') => state
                .gallery
                .player()
                .current()
                .map(|c| vec![Action::CopyToClipboard(c.url.clone())])
                .unwrap_or_default(),
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, state: &AppState) -> Vec<Action> {
        if !state.gallery.player().overlay_visible() {
            return vec![];
        }
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let on_backdrop = hit(area, event.column, event.row)
                    && !hit(self.panel, event.column, event.row);
                if on_backdrop {
                    vec![Action::ClosePlayer]
                } else {
                    vec![]
                }
            }
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        let player = state.gallery.player();
        if !player.overlay_visible() {
            self.panel = Rect::default();
            return;
        }

        frame.render_widget(Block::default().style(Style::default().bg(C_BACKDROP)), area);

        let panel = centered_rect(70, 9, area);
        self.panel = panel;
        let w = panel.width.saturating_sub(4) as usize;

        let url = player.current().map(|c| c.url.as_str()).unwrap_or("");
        let status = if player.is_started() {
            Span::styled("▶ playing in the mpv window", Style::default().fg(C_VIEWED))
        } else {
            Span::styled("… starting playback", style_secondary())
        };

        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                format!(" {}", fit(player.title(), w)),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(format!(" {}", fit(url, w)), style_secondary())),
            Line::from(""),
            Line::from(vec![Span::raw(" "), status]),
            Line::from(""),
            Line::from(Span::styled(
                " esc close · click outside to close · y copy url",
                style_muted(),
            )),
        ];

        frame.render_widget(Clear, panel);
        frame.render_widget(
            Paragraph::new(lines)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(C_PANEL_BORDER_FOCUSED))
                        .title(Span::styled(" now playing ", Style::default().fg(C_PRIMARY)))
                        .title_top(Line::from(Span::styled(" × ", Style::default().fg(C_PRIMARY))).right_aligned())
                        .style(Style::default().bg(C_PLAYER_BG)),
                )
                .wrap(Wrap { trim: false }),
            panel,
        );
    }
}
