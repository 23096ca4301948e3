//! Chat history widget: renders the active transcript.

use chat::ChatSnapshot;
use proto::Origin;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use super::theme::THEME;

/// Renders the transcript and returns the scroll offset actually applied.
pub fn render(snapshot: &ChatSnapshot, scroll: u16, frame: &mut Frame<'_>, area: Rect) -> u16 {
    let agent_prefix = format!("{}: ", snapshot.agent_name);
    let indent = " ".repeat(agent_prefix.width());
    let mut lines: Vec<Line<'_>> = Vec::new();

    for msg in &snapshot.messages {
        lines.push(Line::from(""));
        let (label, label_color, pad) = match msg.origin {
            Origin::User => ("You: ", THEME.user_label, "     "),
            Origin::Agent => (agent_prefix.as_str(), THEME.agent_label, indent.as_str()),
        };
        let mut first = true;
        for line in msg.content.lines() {
            if first {
                lines.push(Line::from(vec![
                    Span::styled(
                        label.to_string(),
                        Style::default()
                            .fg(label_color)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(line.to_string()),
                ]));
                first = false;
            } else {
                lines.push(Line::from(Span::raw(format!("{pad}{line}"))));
            }
        }
        if first {
            lines.push(Line::from(Span::styled(
                label.to_string(),
                Style::default()
                    .fg(label_color)
                    .add_modifier(Modifier::BOLD),
            )));
        }
    }

    // Inner width (area minus 1-cell border on each side).
    let inner_width = area.width.saturating_sub(2);
    let content_height = wrapped_height(&lines, inner_width);
    let visible_height = area.height.saturating_sub(2);
    let max_scroll = content_height.saturating_sub(visible_height);
    let scroll = scroll.min(max_scroll);

    let history = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(THEME.fg_muted)),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    frame.render_widget(history, area);
    scroll
}

/// Rows the lines occupy once wrapped to `width` columns.
fn wrapped_height(lines: &[Line<'_>], width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let rows: usize = lines
        .iter()
        .map(|line| line.width().div_ceil(width as usize).max(1))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto::{AgentId, ChatMessage};
    use ratatui::{Terminal, backend::TestBackend};

    fn snapshot(messages: Vec<ChatMessage>) -> ChatSnapshot {
        ChatSnapshot {
            agent_id: AgentId::from("axel"),
            agent_name: "Axel".into(),
            messages,
            sessions: Vec::new(),
            selected_session: None,
            is_loading_session_detail: false,
            is_sending_message: false,
            supports_sessions: false,
        }
    }

    fn draw(snapshot: &ChatSnapshot, scroll: u16, height: u16) -> (String, u16) {
        let backend = TestBackend::new(40, height);
        let mut terminal = Terminal::new(backend).expect("terminal");
        let mut applied = 0;
        terminal
            .draw(|frame| applied = render(snapshot, scroll, frame, frame.area()))
            .expect("draw");
        let screen = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        (screen, applied)
    }

    #[test]
    fn wrapped_height_counts_wrapped_and_empty_lines() {
        let lines = vec![Line::from(""), Line::from("a".repeat(25))];
        assert_eq!(wrapped_height(&lines, 10), 4);
        assert_eq!(wrapped_height(&lines, 0), 0);
    }

    #[test]
    fn render_labels_messages_by_origin() {
        let snap = snapshot(vec![
            ChatMessage::agent("Hello! How can I help you today?"),
            ChatMessage::user("Budget for May"),
        ]);
        let (screen, _) = draw(&snap, 0, 12);
        assert!(screen.contains("Axel: Hello!"));
        assert!(screen.contains("You: Budget for May"));
    }

    #[test]
    fn render_clamps_scroll_to_content() {
        let messages = (0..20).map(|i| ChatMessage::user(format!("m{i}"))).collect();
        let (screen, applied) = draw(&snapshot(messages), u16::MAX, 10);
        // 40 rows of content, 8 visible
        assert_eq!(applied, 32);
        assert!(screen.contains("m19"));

        let (_, applied) = draw(&snapshot(vec![ChatMessage::user("hi")]), u16::MAX, 10);
        assert_eq!(applied, 0);
    }
}
