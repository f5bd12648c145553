//! Short-lived notifications drawn in the bottom panel.

use chrono::{DateTime, Local};
use fruit_core::Notification;
use fruit_core::session::Level;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub(super) const TOAST_TTL: Duration = Duration::from_secs(5);
const MAX_TOASTS: usize = 4;

pub(super) struct Toast {
    pub note: Notification,
    pub at: DateTime<Local>,
    shown: Instant,
}

impl Toast {
    pub fn is_error(&self) -> bool {
        self.note.level == Level::Error
    }
}

#[derive(Default)]
pub(super) struct Toasts {
    items: VecDeque<Toast>,
}

impl Toasts {
    pub fn push(&mut self, note: Notification) {
        self.push_at(note, Instant::now());
    }

    fn push_at(&mut self, note: Notification, shown: Instant) {
        self.items.push_back(Toast {
            note,
            at: Local::now(),
            shown,
        });
        while self.items.len() > MAX_TOASTS {
            self.items.pop_front();
        }
    }

    /// Drop expired toasts and return the ones still visible.
    pub fn visible(&mut self, now: Instant) -> impl Iterator<Item = &Toast> {
        self.items
            .retain(|t| now.saturating_duration_since(t.shown) < TOAST_TTL);
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn note(message: &str) -> Notification {
        Notification {
            level: Level::Error,
            message: message.to_string(),
            detail: None,
        }
    }

    #[rstest]
    #[case(Duration::from_secs(1), 1)]
    #[case(TOAST_TTL, 0)]
    fn toasts_expire(#[case] elapsed: Duration, #[case] left: usize) {
        let mut toasts = Toasts::default();
        let start = Instant::now();
        toasts.push_at(note("boom"), start);
        assert_eq!(toasts.visible(start + elapsed).count(), left);
    }

    #[test]
    fn oldest_toasts_are_dropped_first() {
        let mut toasts = Toasts::default();
        let now = Instant::now();
        for i in 0..6 {
            toasts.push_at(note(&format!("n{i}")), now);
        }
        let shown: Vec<_> = toasts.visible(now).map(|t| t.note.message.clone()).collect();
        assert_eq!(shown, vec!["n2", "n3", "n4", "n5"]);
        assert!(toasts.visible(now).all(Toast::is_error));
    }
}
