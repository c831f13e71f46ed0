//! MediaGrid component: the card grid with keyboard and mouse selection.
//!
//! Each card is a fixed-height bordered box:
//!
//! ```text
//!   ┌──────────────────────────────┐
//!   │▣ https://cdn.example/1.jpg   │  thumbnail (or placeholder)
//!   │✓ Viewed                      │  badge, only when viewed
//!   │First clip                    │  title
//!   │Size: 1.2 GB                  │
//!   │Uploaded: 2 days ago          │
//!   │[ Mark as Viewed ]            │  toggle button
//!   └──────────────────────────────┘
//! ```
//!
//! A click on the toggle row only flips the viewed state; a click anywhere
//! else on the card opens the player.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use gallery_core::render::CardView;
use gallery_core::sort::SortKey;

use super::{fit, hit};
use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{
        style_button, style_default, style_focused_border, style_muted, style_secondary,
        style_selected_focused, style_unfocused_border, style_viewed, C_BADGE_PENDING, C_THUMB,
        C_VIEWED,
    },
    widgets::pane_chrome::{pane_chrome, Badge},
};

pub const CARD_WIDTH: u16 = 34;
pub const CARD_HEIGHT: u16 = 8;
/// Row of the toggle button inside a card, counted from the card's top border.
const TOGGLE_ROW: u16 = 6;

/// Screen regions of one drawn card, kept for mouse hit-testing.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CardHit {
    index: usize,
    card: Rect,
    toggle: Rect,
}

pub struct MediaGrid {
    pub selected: usize,
    /// First visible card row.
    scroll_row: usize,
    columns: usize,
    visible_rows: usize,
    hits: Vec<CardHit>,
    /// Record to keep selected once the store has been reordered or reloaded.
    follow: Option<String>,
}

impl MediaGrid {
    pub fn new() -> Self {
        Self {
            selected: 0,
            scroll_row: 0,
            columns: 1,
            visible_rows: 1,
            hits: Vec::new(),
            follow: None,
        }
    }

    pub fn selected_card<'a>(&self, state: &'a AppState) -> Option<&'a CardView> {
        state.card(self.selected)
    }

    pub fn selected_id(&self, state: &AppState) -> Option<String> {
        self.selected_card(state).map(|c| c.id.clone())
    }

    /// Select `id` on the next draw, wherever it ends up in the store.
    pub fn follow_id(&mut self, id: Option<String>) {
        self.follow = id;
    }

    fn resolve_follow(&mut self, state: &AppState) {
        if let Some(id) = self.follow.take() {
            if let Some(pos) = state.gallery.store().position(&id) {
                self.selected = pos;
            }
        }
    }

    fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    fn move_by(&mut self, delta: isize, len: usize) {
        if len == 0 {
            return;
        }
        let next = self.selected as isize + delta;
        self.selected = next.clamp(0, len as isize - 1) as usize;
    }

    fn scroll_into_view(&mut self) {
        let row = self.selected / self.columns.max(1);
        if row < self.scroll_row {
            self.scroll_row = row;
        } else if row >= self.scroll_row + self.visible_rows {
            self.scroll_row = row + 1 - self.visible_rows;
        }
    }

    fn card_at(&self, col: u16, row: u16) -> Option<&CardHit> {
        self.hits.iter().find(|h| hit(h.card, col, row))
    }
}

impl Default for MediaGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `inner` into card slots: (columns, visible rows, card width).
fn grid_geometry(inner: Rect) -> (usize, usize, u16) {
    let columns = (inner.width / CARD_WIDTH).max(1) as usize;
    let rows = (inner.height / CARD_HEIGHT).max(1) as usize;
    let width = (inner.width / columns as u16).max(1);
    (columns, rows, width)
}

impl Component for MediaGrid {
    fn id(&self) -> ComponentId {
        ComponentId::MediaGrid
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        let len = state.grid.cards.len();
        let cols = self.columns.max(1) as isize;
        let page = cols * self.visible_rows.max(1) as isize;
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.move_by(-1, len),
            KeyCode::Right | KeyCode::Char('l') => self.move_by(1, len),
            KeyCode::Up | KeyCode::Char('k') => self.move_by(-cols, len),
            KeyCode::Down | KeyCode::Char('j') => self.move_by(cols, len),
            KeyCode::PageUp => self.move_by(-page, len),
            KeyCode::PageDown => self.move_by(page, len),
            KeyCode::Home | KeyCode::Char('g') => self.selected = 0,
            KeyCode::End | KeyCode::Char('G') => self.selected = len.saturating_sub(1),
            KeyCode::Enter => {
                if self.selected < len {
                    return vec![Action::Open(self.selected)];
                }
            }
            KeyCode::Char('v') => {
                if let Some(id) = self.selected_id(state) {
                    return vec![Action::ToggleViewed(id)];
                }
            }
            KeyCode::Char('y') => {
                if let Some(r) = state.record(self.selected) {
                    return vec![Action::CopyToClipboard(r.url.clone())];
                }
            }
            KeyCode::Char('s') if key.modifiers == KeyModifiers::NONE => return vec![Action::CycleSort],
            KeyCode::Char('S') => return vec![Action::CycleSortReverse],
            KeyCode::Char('t') => return vec![Action::Sort(SortKey::Title)],
            KeyCode::Char('z') => return vec![Action::Sort(SortKey::SizeFormatted)],
            KeyCode::Char('u') => return vec![Action::Sort(SortKey::HowLongAgo)],
            KeyCode::Char('r') => return vec![Action::Reload],
            _ => {}
        }
        self.scroll_into_view();
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, state: &AppState) -> Vec<Action> {
        let len = state.grid.cards.len();
        match event.kind {
            MouseEventKind::ScrollDown => {
                self.move_by(self.columns as isize, len);
                self.scroll_into_view();
            }
            MouseEventKind::ScrollUp => {
                self.move_by(-(self.columns as isize), len);
                self.scroll_into_view();
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(h) = self.card_at(event.column, event.row).copied() else {
                    return vec![];
                };
                self.selected = h.index;
                if hit(h.toggle, event.column, event.row) {
                    if let Some(card) = state.card(h.index) {
                        return vec![Action::ToggleViewed(card.id.clone())];
                    }
                    return vec![];
                }
                return vec![Action::Open(h.index)];
            }
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        match action {
            Action::Sort(_) | Action::CycleSort | Action::CycleSortReverse | Action::Reload => {
                if self.follow.is_none() {
                    self.follow = self.selected_id(state);
                }
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let viewed = state.viewed;
        let badge_text = if state.loading {
            "loading".to_string()
        } else {
            format!("{} viewed", viewed)
        };
        let badge = Badge {
            text: &badge_text,
            color: if state.loading { C_BADGE_PENDING } else { C_VIEWED },
        };
        let block = pane_chrome("media", focused, Some(badge));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.hits.clear();

        if let Some(message) = &state.grid.message {
            let y = inner.y + inner.height / 2;
            let line_area = Rect { y, height: 1u16.min(inner.height), ..inner };
            frame.render_widget(
                Paragraph::new(Span::styled(message.as_str(), style_secondary()))
                    .alignment(Alignment::Center),
                line_area,
            );
            return;
        }

        let cards = &state.grid.cards;
        self.resolve_follow(state);
        self.clamp(cards.len());
        let (columns, visible_rows, card_width) = grid_geometry(inner);
        self.columns = columns;
        self.visible_rows = visible_rows;
        self.scroll_into_view();

        let first = self.scroll_row * columns;
        let last = (first + columns * visible_rows).min(cards.len());
        for (slot, card) in cards[first.min(last)..last].iter().enumerate() {
            let col = (slot % columns) as u16;
            let row = (slot / columns) as u16;
            let rect = Rect {
                x: inner.x + col * card_width,
                y: inner.y + row * CARD_HEIGHT,
                width: card_width,
                height: CARD_HEIGHT.min(inner.height.saturating_sub(row * CARD_HEIGHT)),
            };
            let selected = card.index == self.selected;
            draw_card(frame, rect, card, selected, focused);
            self.hits.push(CardHit {
                index: card.index,
                card: rect,
                toggle: Rect {
                    x: rect.x + 1,
                    y: rect.y + TOGGLE_ROW,
                    width: rect.width.saturating_sub(2),
                    height: 1,
                },
            });
        }
    }
}

fn draw_card(frame: &mut Frame, area: Rect, card: &CardView, selected: bool, focused: bool) {
    let border = if selected && focused {
        style_focused_border()
    } else {
        style_unfocused_border()
    };
    let block = Block::default().borders(Borders::ALL).border_style(border);
    let inner = block.inner(area);
    let w = inner.width as usize;

    let thumb = if card.thumb_is_placeholder {
        Line::from(Span::styled(fit(&format!("▢ {}", card.thumb), w), style_muted()))
    } else {
        Line::from(Span::styled(
            fit(&format!("▣ {}", card.thumb), w),
            Style::default().fg(C_THUMB),
        ))
    };
    let badge = match card.badge() {
        Some(b) => Line::from(Span::styled(format!("✓ {}", b), style_viewed())),
        None => Line::from(""),
    };
    let title_style = if selected {
        style_selected_focused()
    } else {
        style_default().add_modifier(Modifier::BOLD)
    };

    let lines = vec![
        thumb,
        badge,
        Line::from(Span::styled(fit(&card.title, w), title_style)),
        Line::from(Span::styled(fit(&card.size_line(), w), style_secondary())),
        Line::from(Span::styled(fit(&card.uploaded_line(), w), style_secondary())),
        Line::from(Span::styled(
            fit(&format!("[ {} ]", card.toggle_label), w),
            style_button(),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}
