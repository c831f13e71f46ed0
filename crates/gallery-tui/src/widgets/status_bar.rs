//! Status bar: header line, error banner and the keybindings footer.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::theme::{C_ACCENT, C_ERROR, C_MODE_GRID, C_MODE_PLAYER, C_MUTED, C_PRIMARY, C_SECONDARY};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Grid,
    Player,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Grid => "GALLERY",
            Self::Player => "PLAYER",
        }
    }

    pub fn color(self) -> ratatui::style::Color {
        match self {
            Self::Grid => C_MODE_GRID,
            Self::Player => C_MODE_PLAYER,
        }
    }

    fn keys(self) -> &'static str {
        match self {
            Self::Grid => {
                " ←↓↑→/hjkl select  Enter play  v mark viewed  s/S sort  r reload  y copy url  K keys  ? help  q quit"
            }
            Self::Player => " Esc/q close  click outside to close  ? help",
        }
    }
}

/// Counts shown on the right of the header.
pub struct HeaderInfo<'a> {
    pub source: &'a str,
    pub total: usize,
    pub viewed: usize,
    pub sort: Option<&'a str>,
    pub loading: bool,
}

/// Draw the one-row header: app name, data source and counts.
pub fn draw_header(frame: &mut Frame, area: Rect, info: &HeaderInfo<'_>) {
    let mut spans = vec![
        Span::styled(
            " media gallery ",
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(info.source, Style::default().fg(C_SECONDARY)),
        Span::raw("  "),
    ];
    if info.loading {
        spans.push(Span::styled("loading…", Style::default().fg(C_MUTED)));
    } else {
        spans.push(Span::styled(
            format!("{} items · {} viewed", info.total, info.viewed),
            Style::default().fg(C_PRIMARY),
        ));
    }
    if let Some(sort) = info.sort {
        spans.push(Span::styled(
            format!(" · sort: {}", sort),
            Style::default().fg(C_SECONDARY),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Height the error banner needs for `message` at `width`, at most 3 rows.
pub fn banner_height(message: Option<&str>, width: u16) -> u16 {
    match message {
        None => 0,
        Some(m) => {
            let w = width.saturating_sub(2).max(1) as usize;
            let chars = unicode_width::UnicodeWidthStr::width(m) + 2;
            (chars.div_ceil(w) as u16).clamp(1, 3)
        }
    }
}

/// Draw a loader error above the grid.
pub fn draw_error_banner(frame: &mut Frame, area: Rect, message: &str) {
    let line = Line::from(vec![
        Span::styled(" ✗ ", Style::default().fg(C_ERROR).add_modifier(Modifier::BOLD)),
        Span::styled(message, Style::default().fg(C_ERROR)),
    ]);
    frame.render_widget(Paragraph::new(line).wrap(Wrap { trim: true }), area);
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default().fg(mode.color()).add_modifier(Modifier::BOLD),
        ),
        Span::styled(mode.keys(), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_height() {
        assert_eq!(banner_height(None, 80), 0);
        assert_eq!(banner_height(Some("short"), 80), 1);
        assert_eq!(banner_height(Some(&"x".repeat(200)), 42), 3);
    }
}
