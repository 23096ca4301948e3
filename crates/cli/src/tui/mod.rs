pub mod app;
pub mod chat;
pub mod event;
pub mod menu;
pub mod sidebar;
pub mod theme;

pub use event::run_tui;
