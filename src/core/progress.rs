//! Progress reporting for project runs using indicatif.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

fn file_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// A thread-safe file counter backed by a progress bar.
///
/// The bar is hidden when stderr is not a terminal, so the counter still
/// works in pipes and tests.
#[derive(Clone)]
pub struct ProgressTracker {
    bar: ProgressBar,
    counter: Arc<AtomicUsize>,
}

impl ProgressTracker {
    /// Create a tracker that draws only when stderr is a TTY.
    pub fn for_files(total: usize) -> Self {
        if is_tty() {
            Self::new(total, "Analyzing")
        } else {
            Self::hidden(total)
        }
    }

    /// Create a visible tracker with the given total count.
    pub fn new(total: usize, message: &str) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(file_style());
        bar.set_message(message.to_string());

        Self {
            bar,
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a hidden tracker.
    pub fn hidden(total: usize) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total as u64);

        Self {
            bar,
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Record one processed file, returning the new count.
    pub fn inc(&self) -> usize {
        self.bar.inc(1);
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Finish and clear the progress bar.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }

    /// Get the current count.
    pub fn count(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}

/// Check if stderr is a TTY (for deciding whether to show progress bars).
pub fn is_tty() -> bool {
    use std::io::IsTerminal;
    std::io::stderr().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_tracker_inc_returns_count() {
        let tracker = ProgressTracker::hidden(10);
        assert_eq!(tracker.inc(), 1);
        assert_eq!(tracker.inc(), 2);
        assert_eq!(tracker.count(), 2);
    }

    #[test]
    fn test_progress_tracker_clones_share_counter() {
        let tracker = ProgressTracker::hidden(10);
        let clone = tracker.clone();
        clone.inc();
        assert_eq!(tracker.count(), 1);
    }

    #[test]
    fn test_visible_tracker_finish() {
        let tracker = ProgressTracker::new(4, "Testing");
        tracker.inc();
        tracker.finish_and_clear();
        assert_eq!(tracker.count(), 1);
    }
}
