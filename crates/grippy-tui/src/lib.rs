// Terminal UI implementation using ratatui

pub mod app;
pub mod runner;
pub mod ui;

pub use app::{App, AuthForm, FormField, InputMode, SearchReply};
pub use runner::run_tui;
