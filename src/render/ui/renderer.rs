//! UI renderer trait
//!
//! The view worker is the only caller of a `UIRenderer`, so the terminal has exactly one
//! writer.

use crate::error::Result;
use crate::render::ui::state::ViewSnapshot;

/// Core trait for drawing frames and managing the terminal's lifecycle
pub trait UIRenderer: Send {
    /// Draw one complete frame from `snapshot` and flush it
    fn render(&mut self, snapshot: &ViewSnapshot) -> Result<()>;

    /// Enter raw mode and the alternate screen
    ///
    /// Called once, before any worker starts; a failure here is a terminal setup error.
    fn initialize(&mut self) -> Result<()>;

    /// Restore the terminal; must be safe to call more than once
    fn cleanup(&mut self) -> Result<()>;

    /// Current terminal dimensions as `(width, height)`
    fn get_terminal_size(&self) -> Result<(u16, u16)>;
}

/// Rows left for results once the prompt and status lines are drawn.
pub fn list_height(terminal_height: u16) -> usize {
    usize::from(terminal_height.saturating_sub(2)).max(1)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Mock renderer recording every frame it is asked to draw.
    #[derive(Clone)]
    pub struct MockUIRenderer {
        pub frames: Arc<Mutex<Vec<ViewSnapshot>>>,
        pub terminal_size: (u16, u16),
        pub is_initialized: bool,
    }

    impl Default for MockUIRenderer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockUIRenderer {
        pub fn new() -> Self {
            Self {
                frames: Arc::new(Mutex::new(Vec::new())),
                terminal_size: (80, 24),
                is_initialized: false,
            }
        }

        pub fn render_count(&self) -> usize {
            self.frames.lock().len()
        }
    }

    impl UIRenderer for MockUIRenderer {
        fn render(&mut self, snapshot: &ViewSnapshot) -> Result<()> {
            self.frames.lock().push(snapshot.clone());
            Ok(())
        }

        fn initialize(&mut self) -> Result<()> {
            self.is_initialized = true;
            Ok(())
        }

        fn cleanup(&mut self) -> Result<()> {
            self.is_initialized = false;
            Ok(())
        }

        fn get_terminal_size(&self) -> Result<(u16, u16)> {
            Ok(self.terminal_size)
        }
    }

    #[test]
    fn test_mock_renderer_basic() {
        let mut renderer = MockUIRenderer::new();
        assert!(!renderer.is_initialized);
        renderer.initialize().unwrap();
        assert!(renderer.is_initialized);

        renderer.render(&ViewSnapshot::default()).unwrap();
        assert_eq!(renderer.render_count(), 1);
        assert_eq!(renderer.get_terminal_size().unwrap(), (80, 24));

        renderer.cleanup().unwrap();
        assert!(!renderer.is_initialized);
    }

    #[test]
    fn test_list_height_leaves_room_for_prompt_and_status() {
        assert_eq!(list_height(24), 22);
        assert_eq!(list_height(2), 1);
        assert_eq!(list_height(0), 1);
    }
}
