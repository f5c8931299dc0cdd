//! Terminal rendering components.
//!
//! This module hosts the concrete terminal UI implementation along with the frame snapshot
//! structures and styling utilities.

pub mod renderer;
pub mod state;
pub mod terminal;
pub mod theme;

pub use renderer::UIRenderer;
pub use state::{RowView, StatusLine, ViewSnapshot};
pub use terminal::TerminalUI;
pub use theme::ColorTheme;

#[cfg(test)]
pub use renderer::tests::MockUIRenderer;
