//! Mutable render state owned by the preview controller.

use serde::Serialize;

use crate::document::PageNumber;

/// What the controller is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    #[default]
    Idle,
    LoadingDocument,
    RenderingInitialBatch,
    Scrolling,
    Navigating,
}

/// Generation of the page flow. Bumped every time the flow is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Epoch(u64);

impl Epoch {
    pub const ZERO: Self = Self(0);

    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Single-slot mutual exclusion for render passes.
///
/// A second acquire while held fails and the caller drops its request;
/// nothing is queued. Recurring triggers (scroll, resize) retry naturally.
#[derive(Debug, Default)]
pub struct BusyGuard {
    held: bool,
}

impl BusyGuard {
    /// Take the slot. Returns `false` when it is already held.
    pub const fn try_acquire(&mut self) -> bool {
        if self.held {
            return false;
        }
        self.held = true;
        true
    }

    pub const fn release(&mut self) {
        self.held = false;
    }

    pub const fn is_busy(&self) -> bool {
        self.held
    }
}

/// Render bookkeeping for the open document.
#[derive(Debug, Default)]
pub struct RenderState {
    pub status: RenderStatus,
    /// Last page number consumed by a pass; the next page to render is `cursor + 1`.
    pub cursor: PageNumber,
    pub total: PageNumber,
    pub epoch: Epoch,
    pub busy: BusyGuard,
}

impl RenderState {
    pub const fn has_more_pages(&self) -> bool {
        self.cursor < self.total
    }

    pub const fn next_page(&self) -> Option<PageNumber> {
        if self.has_more_pages() {
            Some(self.cursor + 1)
        } else {
            None
        }
    }

    /// Forget the document but keep the epoch moving forward.
    pub const fn reset(&mut self) {
        self.status = RenderStatus::Idle;
        self.cursor = 0;
        self.total = 0;
        self.busy.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_guard_is_single_slot() {
        let mut guard = BusyGuard::default();
        assert!(guard.try_acquire());
        assert!(!guard.try_acquire());
        assert!(guard.is_busy());
        guard.release();
        assert!(!guard.is_busy());
        assert!(guard.try_acquire());
    }

    #[test]
    fn test_epoch_advances() {
        let e = Epoch::default();
        assert_eq!(e.get(), 0);
        assert_eq!(e.next().next().get(), 2);
        assert!(e.next() > e);
    }

    #[test]
    fn test_next_page_follows_cursor() {
        let mut state = RenderState {
            total: 3,
            ..RenderState::default()
        };
        assert_eq!(state.next_page(), Some(1));
        state.cursor = 3;
        assert_eq!(state.next_page(), None);
        assert!(!state.has_more_pages());
    }

    #[test]
    fn test_reset_releases_busy_and_keeps_epoch() {
        let mut state = RenderState {
            total: 5,
            cursor: 2,
            epoch: Epoch::default().next(),
            ..RenderState::default()
        };
        assert!(state.busy.try_acquire());
        state.reset();
        assert!(!state.busy.is_busy());
        assert_eq!(state.total, 0);
        assert_eq!(state.epoch.get(), 1);
    }
}
