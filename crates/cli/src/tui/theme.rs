//! Centralized TUI theme built on ratatui's Tailwind CSS palette.

use ratatui::style::Color;
use ratatui::style::palette::tailwind;

/// The application theme: all visual tokens in one place.
pub struct Theme {
    // ── Base ──
    pub fg: Color,
    pub fg_dim: Color,
    pub fg_muted: Color,
    pub border: Color,
    /// Border color for the focused widget.
    pub border_active: Color,

    // ── Semantic ──
    pub accent: Color,
    pub warning: Color,
    pub error: Color,

    // ── Chat roles ──
    pub user_label: Color,
    pub agent_label: Color,
    /// Spinner shown while a request is outstanding.
    pub spinner: Color,
    pub status_hint: Color,

    // ── Sidebar ──
    pub sidebar_border: Color,
    pub sidebar_active_indicator: Color,
    pub sidebar_hover: Color,
    pub sidebar_text: Color,
    pub sidebar_time: Color,
    /// Marker for sessions not yet listed by the backend.
    pub sidebar_local: Color,

    // ── Agents menu ──
    pub logo: Color,
    pub menu_selected_marker: Color,
    pub menu_description: Color,
}

impl Theme {
    /// The default dark theme using Tailwind palette.
    pub const fn default_dark() -> Self {
        Self {
            fg: tailwind::SLATE.c100,
            fg_dim: tailwind::SLATE.c400,
            fg_muted: tailwind::SLATE.c500,
            border: tailwind::SLATE.c700,
            border_active: tailwind::EMERALD.c500,

            accent: tailwind::EMERALD.c500,
            warning: tailwind::AMBER.c500,
            error: tailwind::RED.c500,

            user_label: tailwind::CYAN.c400,
            agent_label: tailwind::EMERALD.c400,
            spinner: tailwind::AMBER.c400,
            status_hint: tailwind::SLATE.c500,

            sidebar_border: tailwind::SLATE.c700,
            sidebar_active_indicator: tailwind::CYAN.c400,
            sidebar_hover: tailwind::SLATE.c600,
            sidebar_text: tailwind::SLATE.c300,
            sidebar_time: tailwind::SLATE.c500,
            sidebar_local: tailwind::AMBER.c400,

            logo: tailwind::EMERALD.c400,
            menu_selected_marker: tailwind::EMERALD.c400,
            menu_description: tailwind::SLATE.c400,
        }
    }
}

/// Global theme instance.
pub const THEME: Theme = Theme::default_dark();
