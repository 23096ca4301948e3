//! TUI application state, rendering, and input handling.

use chat::{ChatScreen, ChatSnapshot, Intent, MenuScreen};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use proto::Agent;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::theme::THEME;
use super::{chat as chat_view, menu as menu_view, sidebar};

/// Spinner animation frames (Braille pattern).
const SPINNER: &[char] = &['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];

// ─── Data types ──────────────────────────────────────────────

/// Which top-level screen is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Chat,
}

/// Session sidebar interaction state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SidebarState {
    /// Keyboard focus is on the sidebar instead of the input box.
    pub focused: bool,
    /// Highlighted session index.
    pub hover: Option<usize>,
}

/// Work the event loop has to perform after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    None,
    OpenAgent(Agent),
    RetryAgents,
    /// Tear the chat screen down and return to the menu.
    CloseChat,
    Dispatch(Intent),
    Quit,
}

// ─── TuiApp ──────────────────────────────────────────────────

/// Full state for the TUI.
pub struct TuiApp {
    pub screen: Screen,
    /// Latest agents menu state.
    pub menu: MenuScreen,
    pub menu_cursor: usize,
    /// Latest chat screen state.
    pub chat: ChatScreen,
    /// Current text typed in the input box (not yet submitted).
    pub input: String,
    /// Cursor position within `input` (byte offset).
    pub cursor_pos: usize,
    /// Vertical scroll offset for the history panel.
    pub history_scroll: u16,
    pub sidebar: SidebarState,
    /// Spinner animation tick counter.
    pub spinner_tick: u8,
    /// The chat was opened from the command line; leaving it quits.
    pub standalone_chat: bool,
    /// Whether the user requested exit.
    pub should_quit: bool,
}

impl Default for TuiApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiApp {
    /// Starts on the agents menu.
    pub fn new() -> Self {
        Self {
            screen: Screen::Menu,
            menu: MenuScreen::Loading,
            menu_cursor: 0,
            chat: ChatScreen::Loading,
            input: String::new(),
            cursor_pos: 0,
            history_scroll: 0,
            sidebar: SidebarState::default(),
            spinner_tick: 0,
            standalone_chat: false,
            should_quit: false,
        }
    }

    /// Starts directly on a chat screen.
    pub fn standalone_chat() -> Self {
        let mut app = Self::new();
        app.open_chat();
        app.standalone_chat = true;
        app
    }

    // ── State mutations ──────────────────────────────────────

    pub fn set_menu(&mut self, menu: MenuScreen) {
        if let MenuScreen::Ready(agents) = &menu {
            self.menu_cursor = self.menu_cursor.min(agents.len().saturating_sub(1));
        }
        self.menu = menu;
    }

    /// Replaces the chat state, following the transcript when it changes.
    pub fn set_chat(&mut self, chat: ChatScreen) {
        let before = self.chat.snapshot().map(|s| s.messages.len());
        let after = chat.snapshot().map(|s| s.messages.len());
        if before != after {
            self.scroll_to_bottom();
        }
        if let Some(snapshot) = chat.snapshot() {
            self.sidebar.hover = match self.sidebar.hover {
                Some(_) if snapshot.sessions.is_empty() => None,
                Some(idx) => Some(idx.min(snapshot.sessions.len() - 1)),
                None => None,
            };
        }
        self.chat = chat;
    }

    pub fn open_chat(&mut self) {
        self.screen = Screen::Chat;
        self.chat = ChatScreen::Loading;
        self.input.clear();
        self.cursor_pos = 0;
        self.history_scroll = 0;
        self.sidebar = SidebarState::default();
    }

    pub fn close_chat(&mut self) {
        self.screen = Screen::Menu;
        self.chat = ChatScreen::Loading;
        self.sidebar = SidebarState::default();
    }

    /// `true` while any request of the chat screen is outstanding.
    pub fn is_busy(&self) -> bool {
        match self.screen {
            Screen::Menu => self.menu == MenuScreen::Loading,
            Screen::Chat => match &self.chat {
                ChatScreen::Loading => true,
                ChatScreen::Error(_) => false,
                ChatScreen::Ready(s) => s.is_sending_message || s.is_loading_session_detail,
            },
        }
    }

    /// Take the current input and reset it.
    pub fn take_input(&mut self) -> String {
        self.cursor_pos = 0;
        std::mem::take(&mut self.input)
    }

    /// Ensure scroll is at the bottom; rendering clamps it.
    pub fn scroll_to_bottom(&mut self) {
        self.history_scroll = u16::MAX;
    }

    // ── Input handling ───────────────────────────────────────

    /// Handle a keyboard event.
    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return AppAction::Quit;
        }
        match self.screen {
            Screen::Menu => self.handle_menu_key(key),
            Screen::Chat => self.handle_chat_key(key),
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_quit = true;
                AppAction::Quit
            }
            KeyCode::Char('r') => AppAction::RetryAgents,
            KeyCode::Up => {
                self.menu_cursor = self.menu_cursor.saturating_sub(1);
                AppAction::None
            }
            KeyCode::Down => {
                if let MenuScreen::Ready(agents) = &self.menu
                    && self.menu_cursor + 1 < agents.len()
                {
                    self.menu_cursor += 1;
                }
                AppAction::None
            }
            KeyCode::Enter => match &self.menu {
                MenuScreen::Ready(agents) => match agents.get(self.menu_cursor) {
                    Some(agent) => AppAction::OpenAgent(agent.clone()),
                    None => AppAction::None,
                },
                MenuScreen::Error(_) => AppAction::RetryAgents,
                MenuScreen::Loading => AppAction::None,
            },
            _ => AppAction::None,
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) -> AppAction {
        let snapshot = match &self.chat {
            ChatScreen::Ready(snapshot) => snapshot,
            ChatScreen::Error(_) if key.code == KeyCode::Char('r') => {
                return AppAction::Dispatch(Intent::Start);
            }
            _ => {
                return if key.code == KeyCode::Esc {
                    self.leave_chat()
                } else {
                    AppAction::None
                };
            }
        };

        if self.sidebar.focused {
            return self.handle_sidebar_key(key);
        }

        match key.code {
            KeyCode::Esc => self.leave_chat(),
            KeyCode::Tab => {
                if snapshot.supports_sessions {
                    let selected = snapshot
                        .selected_session
                        .as_ref()
                        .and_then(|id| snapshot.sessions.iter().position(|s| &s.id == id));
                    self.sidebar.focused = true;
                    self.sidebar.hover = selected.or(if snapshot.sessions.is_empty() {
                        None
                    } else {
                        Some(0)
                    });
                }
                AppAction::None
            }
            KeyCode::Enter => {
                if self.input.trim().is_empty() {
                    return AppAction::None;
                }
                let text = self.take_input();
                self.scroll_to_bottom();
                AppAction::Dispatch(Intent::SendMessage(text))
            }
            _ => {
                self.edit_input(key);
                AppAction::None
            }
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) -> AppAction {
        let ChatScreen::Ready(snapshot) = &self.chat else {
            return AppAction::None;
        };
        let count = snapshot.sessions.len();

        match key.code {
            KeyCode::Tab | KeyCode::Esc => {
                self.sidebar.focused = false;
                AppAction::None
            }
            KeyCode::Up => {
                self.sidebar.hover = self.sidebar.hover.map(|idx| idx.saturating_sub(1));
                AppAction::None
            }
            KeyCode::Down => {
                if count > 0 {
                    self.sidebar.hover = Some(match self.sidebar.hover {
                        Some(idx) => (idx + 1).min(count - 1),
                        None => 0,
                    });
                }
                AppAction::None
            }
            KeyCode::Enter => {
                let Some(session) = self.sidebar.hover.and_then(|idx| snapshot.sessions.get(idx))
                else {
                    return AppAction::None;
                };
                let intent = Intent::SelectSession(Some(session.clone()));
                self.sidebar.focused = false;
                self.scroll_to_bottom();
                AppAction::Dispatch(intent)
            }
            KeyCode::Char('n') => {
                self.sidebar.focused = false;
                self.sidebar.hover = None;
                AppAction::Dispatch(Intent::SelectSession(None))
            }
            _ => AppAction::None,
        }
    }

    fn leave_chat(&mut self) -> AppAction {
        if self.standalone_chat {
            self.should_quit = true;
            AppAction::Quit
        } else {
            AppAction::CloseChat
        }
    }

    fn edit_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => {
                self.input.insert(self.cursor_pos, c);
                self.cursor_pos += c.len_utf8();
            }
            KeyCode::Backspace => {
                if self.cursor_pos > 0 {
                    // Find the previous character boundary
                    let prev = self.input[..self.cursor_pos]
                        .char_indices()
                        .last()
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    self.input.drain(prev..self.cursor_pos);
                    self.cursor_pos = prev;
                }
            }
            KeyCode::Left => {
                self.cursor_pos = self.input[..self.cursor_pos]
                    .char_indices()
                    .last()
                    .map(|(i, _)| i)
                    .unwrap_or(0);
            }
            KeyCode::Right => {
                if self.cursor_pos < self.input.len() {
                    self.cursor_pos = self.input[self.cursor_pos..]
                        .char_indices()
                        .nth(1)
                        .map(|(i, _)| self.cursor_pos + i)
                        .unwrap_or(self.input.len());
                }
            }
            KeyCode::Up => {
                self.history_scroll = self.history_scroll.saturating_sub(1);
            }
            KeyCode::Down => {
                self.history_scroll = self.history_scroll.saturating_add(1);
            }
            KeyCode::PageUp => {
                self.history_scroll = self.history_scroll.saturating_sub(10);
            }
            KeyCode::PageDown => {
                self.history_scroll = self.history_scroll.saturating_add(10);
            }
            _ => {}
        }
    }

    // ── Rendering ────────────────────────────────────────────

    /// Render the entire TUI into the given frame.
    pub fn render(&mut self, frame: &mut Frame<'_>) {
        // Layout: title(1) | body(fill) | status(1) | input(3)
        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

        self.render_title(frame, chunks[0]);
        self.render_status(frame, chunks[2]);

        match self.screen {
            Screen::Menu => {
                let body = chunks[1].union(chunks[3]);
                menu_view::render(&self.menu, self.menu_cursor, frame, body);
            }
            Screen::Chat => self.render_chat(frame, chunks[1], chunks[3]),
        }
    }

    fn render_chat(&mut self, frame: &mut Frame<'_>, body: Rect, input: Rect) {
        let snapshot = match &self.chat {
            ChatScreen::Ready(snapshot) => snapshot,
            ChatScreen::Loading => {
                render_notice(frame, body.union(input), "Loading…", THEME.fg_dim);
                return;
            }
            ChatScreen::Error(message) => {
                render_notice(frame, body.union(input), message, THEME.error);
                return;
            }
        };

        let (history_area, sidebar_area) = if snapshot.supports_sessions {
            let cols = Layout::horizontal([
                Constraint::Min(0),
                Constraint::Length(sidebar::sidebar_width()),
            ])
            .split(body);
            (cols[0], Some(cols[1]))
        } else {
            (body, None)
        };

        self.history_scroll =
            chat_view::render(snapshot, self.history_scroll, frame, history_area);
        if let Some(area) = sidebar_area {
            sidebar::render(snapshot, &self.sidebar, frame, area);
        }
        render_input(
            frame,
            input,
            &self.input,
            self.cursor_pos,
            !self.sidebar.focused,
        );
    }

    fn render_title(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut spans = vec![Span::styled(
            " xiagents ",
            Style::default()
                .fg(THEME.accent)
                .add_modifier(Modifier::BOLD),
        )];
        if let Screen::Chat = self.screen
            && let Some(snapshot) = self.chat.snapshot()
        {
            spans.push(Span::styled(
                format!(" {} ", snapshot.agent_name),
                Style::default().fg(THEME.agent_label),
            ));
            spans.push(Span::styled(
                format!(" {} ", conversation_label(snapshot)),
                Style::default().fg(THEME.fg_muted),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let spinner = SPINNER[(self.spinner_tick as usize) % SPINNER.len()];
        let busy = |label: &str| {
            Line::from(Span::styled(
                format!(" {spinner} {label}"),
                Style::default().fg(THEME.spinner),
            ))
        };
        let hint = |text: &str| {
            Line::from(Span::styled(
                format!(" {text}"),
                Style::default().fg(THEME.status_hint),
            ))
        };

        let line = match (self.screen, &self.chat) {
            (Screen::Menu, _) if self.menu == MenuScreen::Loading => busy("Loading agents..."),
            (Screen::Menu, _) => hint("↑↓:choose  Enter:open  r:reload  q:quit"),
            (Screen::Chat, ChatScreen::Loading) => busy("Starting..."),
            (Screen::Chat, ChatScreen::Error(_)) => hint("r:retry  Esc:back"),
            (Screen::Chat, ChatScreen::Ready(s)) if s.is_loading_session_detail => {
                busy("Loading conversation...")
            }
            (Screen::Chat, ChatScreen::Ready(s)) if s.is_sending_message => busy("Waiting for reply..."),
            (Screen::Chat, ChatScreen::Ready(_)) if self.sidebar.focused => {
                hint("↑↓:choose  Enter:open  n:new conversation  Tab:back")
            }
            (Screen::Chat, ChatScreen::Ready(s)) if s.supports_sessions => {
                hint("Enter:send  ↑↓:scroll  Tab:sessions  Esc:back")
            }
            (Screen::Chat, ChatScreen::Ready(_)) => hint("Enter:send  ↑↓:scroll  Esc:back"),
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn conversation_label(snapshot: &ChatSnapshot) -> String {
    match snapshot.selected() {
        Some(session) => session.title.clone(),
        None if snapshot.selected_session.is_some() => "session".to_string(),
        None => "new conversation".to_string(),
    }
}

fn render_notice(frame: &mut Frame<'_>, area: Rect, text: &str, color: ratatui::style::Color) {
    let notice = Paragraph::new(Line::from(Span::styled(text, Style::default().fg(color))))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(THEME.border)),
        );
    frame.render_widget(notice, area);
}

fn render_input(frame: &mut Frame<'_>, area: Rect, text: &str, cursor_pos: usize, focused: bool) {
    let border_color = if focused {
        THEME.border_active
    } else {
        THEME.border
    };
    let (display_text, input_style) = if text.is_empty() {
        ("Type a message...", Style::default().fg(THEME.fg_muted))
    } else {
        (text, Style::default().fg(THEME.fg))
    };

    let input = Paragraph::new(Span::styled(display_text, input_style)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(" Message "),
    );
    frame.render_widget(input, area);

    if focused {
        let cursor_col = text[..cursor_pos].chars().count() as u16;
        frame.set_cursor_position((area.x + 1 + cursor_col, area.y + 1));
    }
}
