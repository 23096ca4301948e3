//! Session sidebar widget: lists an agent's conversations with relative timestamps.

use chat::ChatSnapshot;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::app::SidebarState;
use super::theme::THEME;

/// Fixed sidebar width in terminal columns.
const SIDEBAR_WIDTH: u16 = 32;

/// Rows drawn per session entry: title, timestamp, divider.
const ROWS_PER_ENTRY: u16 = 3;

/// Returns the fixed sidebar width in columns.
pub fn sidebar_width() -> u16 {
    SIDEBAR_WIDTH
}

/// Renders the session sidebar with active/hover highlighting and relative timestamps.
pub fn render(snapshot: &ChatSnapshot, state: &SidebarState, frame: &mut Frame<'_>, area: Rect) {
    let focus_hint = if state.focused {
        Span::styled(" ◉", Style::default().fg(THEME.sidebar_active_indicator))
    } else {
        Span::styled(" [Tab]", Style::default().fg(THEME.fg_muted))
    };
    let header = Line::from(vec![
        Span::styled(
            " Sessions ",
            Style::default()
                .fg(THEME.sidebar_active_indicator)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("({})", snapshot.sessions.len()),
            Style::default().fg(THEME.fg_muted),
        ),
        focus_hint,
    ]);

    let border_style = if state.focused {
        Style::default().fg(THEME.sidebar_active_indicator)
    } else {
        Style::default().fg(THEME.sidebar_border)
    };
    let block = Block::default()
        .borders(Borders::LEFT | Borders::TOP | Borders::BOTTOM)
        .border_style(border_style)
        .title(header);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if snapshot.sessions.is_empty() {
        let empty_msg = Paragraph::new(Line::from(Span::styled(
            " No conversations yet",
            Style::default().fg(THEME.fg_muted),
        )));
        frame.render_widget(empty_msg, inner);
        return;
    }

    let mut lines: Vec<Line<'_>> = Vec::new();
    let max_name_width = inner.width.saturating_sub(2) as usize;
    let last = snapshot.sessions.len() - 1;

    for (idx, session) in snapshot.sessions.iter().enumerate() {
        let is_active = snapshot.selected_session.as_ref() == Some(&session.id);
        let is_hovered = Some(idx) == state.hover;

        let indicator = if is_active {
            Span::styled("▌", Style::default().fg(THEME.sidebar_active_indicator))
        } else if is_hovered {
            Span::styled(
                "▌",
                Style::default().fg(if state.focused {
                    THEME.sidebar_active_indicator
                } else {
                    THEME.sidebar_hover
                }),
            )
        } else {
            Span::raw(" ")
        };

        let name = truncate_str(&session.title, max_name_width.saturating_sub(2));
        let name_style = if is_active {
            Style::default().fg(THEME.fg).add_modifier(Modifier::BOLD)
        } else if is_hovered {
            Style::default().fg(THEME.fg)
        } else {
            Style::default().fg(THEME.sidebar_text)
        };

        lines.push(Line::from(vec![
            indicator,
            Span::styled(format!(" {name}"), name_style),
        ]));

        let mut meta = vec![
            Span::raw("  "),
            Span::styled(
                format_relative_time(&session.created_at),
                Style::default().fg(THEME.sidebar_time),
            ),
        ];
        if session.is_local() {
            meta.push(Span::styled(
                " · unsaved",
                Style::default().fg(THEME.sidebar_local),
            ));
        }
        lines.push(Line::from(meta));

        if idx < last {
            lines.push(Line::from(Span::styled(
                "─".repeat(max_name_width),
                Style::default().fg(THEME.sidebar_border),
            )));
        }
    }

    let content_height = lines.len() as u16;
    let max_scroll = content_height.saturating_sub(inner.height);
    let scroll = hover_scroll(state.hover, inner.height).min(max_scroll);

    let list = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    frame.render_widget(list, inner);
}

/// Smallest scroll offset that keeps the hovered entry on screen.
fn hover_scroll(hover: Option<usize>, visible_height: u16) -> u16 {
    let Some(idx) = hover else {
        return 0;
    };
    let entry_bottom = (idx as u16)
        .saturating_mul(ROWS_PER_ENTRY)
        .saturating_add(2);
    entry_bottom.saturating_sub(visible_height)
}

/// Truncates a string to `max_len` characters, appending `…` if shortened.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    let first_line = s.lines().next().unwrap_or(s);
    if first_line.chars().count() <= max_len {
        first_line.to_string()
    } else {
        let truncated: String = first_line.chars().take(max_len.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}

/// Formats a UTC timestamp as a human-readable relative time (e.g. "5m ago").
pub fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let now = chrono::Utc::now();
    let diff = now.signed_duration_since(*dt);

    if diff.num_seconds() < 60 {
        "just now".to_string()
    } else if diff.num_minutes() < 60 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_hours() < 24 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 7 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%b %d").to_string()
    }
}
