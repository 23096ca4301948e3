//! Agents menu widget: centered logo above the list of agents.

use chat::MenuScreen;
use proto::Agent;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::theme::THEME;

const LOGO: &str = concat!(
    "     _                        _       \n",
    "__ _(_) __ _  __ _  ___ _ __ | |_ ___ \n",
    "\\ \\/ / |/ _` |/ _` |/ _ \\ '_ \\| __/ __|\n",
    " >  <| | (_| | (_| |  __/ | | | |_\\__ \\\n",
    "/_/\\_\\_|\\__,_|\\__, |\\___|_| |_|\\__|___/\n",
    "              |___/                    "
);

/// Renders the menu in whichever state it is in.
pub fn render(menu: &MenuScreen, cursor: usize, frame: &mut Frame<'_>, area: Rect) {
    let rows = Layout::vertical([Constraint::Length(7), Constraint::Min(0)])
        .flex(Flex::Center)
        .split(area);

    let logo_area = Layout::horizontal([Constraint::Length(40)])
        .flex(Flex::Center)
        .split(rows[0]);
    frame.render_widget(
        Paragraph::new(Text::styled(
            LOGO,
            Style::default().fg(THEME.logo).add_modifier(Modifier::BOLD),
        )),
        logo_area[0],
    );

    let list_area = Layout::horizontal([Constraint::Max(72)])
        .flex(Flex::Center)
        .split(rows[1])[0];

    let body = match menu {
        MenuScreen::Loading => Text::from(Line::from(Span::styled(
            "Loading agents...",
            Style::default().fg(THEME.fg_dim),
        )))
        .alignment(Alignment::Center),
        MenuScreen::Error(message) => Text::from(vec![
            Line::from(Span::styled(
                message.as_str(),
                Style::default().fg(THEME.error),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press r to try again",
                Style::default().fg(THEME.fg_muted),
            )),
        ])
        .alignment(Alignment::Center),
        MenuScreen::Ready(agents) if agents.is_empty() => Text::from(Line::from(Span::styled(
            "No agents available",
            Style::default().fg(THEME.warning),
        )))
        .alignment(Alignment::Center),
        MenuScreen::Ready(agents) => agent_lines(agents, cursor),
    };

    let panel = Paragraph::new(body).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(THEME.border))
            .title(" Agents "),
    );
    frame.render_widget(panel, list_area);
}

fn agent_lines(agents: &[Agent], cursor: usize) -> Text<'_> {
    let mut lines = Vec::with_capacity(agents.len() * 2);
    for (idx, agent) in agents.iter().enumerate() {
        let selected = idx == cursor;
        let marker = if selected {
            Span::styled("▶ ", Style::default().fg(THEME.menu_selected_marker))
        } else {
            Span::raw("  ")
        };
        let name_style = if selected {
            Style::default().fg(THEME.fg).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(THEME.fg_dim)
        };
        lines.push(Line::from(vec![
            marker,
            Span::styled(agent.name.as_str(), name_style),
        ]));
        lines.push(Line::from(Span::styled(
            format!("  {}", agent.description),
            Style::default().fg(THEME.menu_description),
        )));
    }
    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};

    fn draw(menu: &MenuScreen, cursor: usize) -> String {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal
            .draw(|frame| render(menu, cursor, frame, frame.area()))
            .expect("draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn ready_menu_marks_cursor_row() {
        let agents = vec![
            Agent::new("pixel", "Pixel", "Design helper"),
            Agent::new("axel", "Axel", "Finance"),
        ];
        let screen = draw(&MenuScreen::Ready(agents), 1);
        assert!(screen.contains("▶ Axel"));
        assert!(screen.contains("  Pixel"));
        assert!(screen.contains("Design helper"));
    }

    #[test]
    fn loading_empty_and_error_states_render_messages() {
        assert!(draw(&MenuScreen::Loading, 0).contains("Loading agents..."));
        assert!(draw(&MenuScreen::Ready(Vec::new()), 0).contains("No agents available"));
        let screen = draw(&MenuScreen::Error("No internet connection".into()), 0);
        assert!(screen.contains("No internet connection"));
        assert!(screen.contains("Press r to try again"));
    }
}
