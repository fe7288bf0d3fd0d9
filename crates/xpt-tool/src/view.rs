//! View binding
//!
//! The controller renders into a [`ResultView`]: either the result grid or
//! the error message, never both.

use tokio::sync::watch;

use crate::format::ResultRow;

/// Output surface of the tool
///
/// Implementations are called while the controller holds its state lock,
/// so they must not call back into the controller.
pub trait ResultView: Send + Sync {
    /// Show the result grid with `rows`, hiding any error
    fn show_rows(&self, rows: Vec<ResultRow>);

    /// Show `message` in place of the result grid
    fn show_error(&self, message: String);
}

/// What the view currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Display {
    /// Nothing rendered yet
    #[default]
    Empty,
    /// Result grid
    Rows(Vec<ResultRow>),
    /// Error message
    Error(String),
}

impl Display {
    /// Rows if the grid is shown
    #[must_use]
    pub fn rows(&self) -> Option<&[ResultRow]> {
        match self {
            Self::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Message if the error is shown
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// [`ResultView`] that publishes on a watch channel
///
/// UI code subscribes and redraws on every change.
#[derive(Debug)]
pub struct WatchView {
    sender: watch::Sender<Display>,
}

impl Default for WatchView {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchView {
    /// Create new view showing [`Display::Empty`]
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Display::Empty);
        Self { sender }
    }

    /// Subscribe to display changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Display> {
        self.sender.subscribe()
    }

    /// Snapshot of the current display
    #[must_use]
    pub fn current(&self) -> Display {
        self.sender.borrow().clone()
    }
}

impl ResultView for WatchView {
    fn show_rows(&self, rows: Vec<ResultRow>) {
        self.sender.send_replace(Display::Rows(rows));
    }

    fn show_error(&self, message: String) {
        self.sender.send_replace(Display::Error(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_replaces_rows() {
        let view = WatchView::new();
        assert_eq!(view.current(), Display::Empty);

        view.show_rows(vec![ResultRow::new("a")]);
        assert_eq!(view.current().rows().map(<[ResultRow]>::len), Some(1));

        view.show_error("bad".to_string());
        assert_eq!(view.current().rows(), None);
        assert_eq!(view.current().error(), Some("bad"));
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let view = WatchView::new();
        let mut rx = view.subscribe();
        view.show_rows(vec![ResultRow::new("x")]);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Display::Rows(vec![ResultRow::new("x")]));
    }
}
