//! Visibility tracking for rendered pages.
//!
//! The tracker plays the role of an intersection observer over the page flow:
//! pages are observed as they are appended, and every scroll, resize or append
//! produces a round of [`IntersectionEntry`] updates.

use std::collections::BTreeSet;

use super::flow::PageFlow;
use super::state::Epoch;
use crate::document::PageNumber;

/// One intersection update for an observed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntersectionEntry {
    pub page: PageNumber,
    pub intersecting: bool,
}

/// Observes appended pages and derives the current-page indicator.
#[derive(Debug, Clone)]
pub struct VisibilityTracker {
    epoch: Epoch,
    observed: BTreeSet<PageNumber>,
    visible: BTreeSet<PageNumber>,
    indicator: Option<PageNumber>,
    connected: bool,
}

impl VisibilityTracker {
    /// A fresh, connected tracker for the flow epoch `epoch`.
    pub const fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            observed: BTreeSet::new(),
            visible: BTreeSet::new(),
            indicator: None,
            connected: true,
        }
    }

    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn observe(&mut self, page: PageNumber) {
        if self.connected {
            self.observed.insert(page);
        }
    }

    pub fn is_observing(&self, page: PageNumber) -> bool {
        self.observed.contains(&page)
    }

    /// Stop observing everything. Later updates are ignored.
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.observed.clear();
        self.visible.clear();
    }

    /// Apply a round of updates. Returns `true` when the indicator changed.
    pub fn apply(&mut self, entries: &[IntersectionEntry]) -> bool {
        if !self.connected {
            return false;
        }
        for entry in entries {
            if !self.observed.contains(&entry.page) {
                continue;
            }
            if entry.intersecting {
                self.visible.insert(entry.page);
            } else {
                self.visible.remove(&entry.page);
            }
        }
        // Furthest page reached wins, not the topmost one.
        let Some(&max) = self.visible.last() else {
            return false;
        };
        let changed = self.indicator != Some(max);
        self.indicator = Some(max);
        changed
    }

    /// Compute intersections for every observed page against `flow` and apply them.
    pub fn refresh(&mut self, flow: &PageFlow) -> bool {
        if !self.connected {
            return false;
        }
        let entries: Vec<IntersectionEntry> = flow
            .pages()
            .iter()
            .filter(|record| self.observed.contains(&record.number()))
            .map(|record| IntersectionEntry {
                page: record.number(),
                intersecting: flow.intersects(record),
            })
            .collect();
        self.apply(&entries)
    }

    pub const fn visible(&self) -> &BTreeSet<PageNumber> {
        &self.visible
    }

    pub fn visible_pages(&self) -> Vec<PageNumber> {
        self.visible.iter().copied().collect()
    }

    /// The current-page indicator: the largest visible page number.
    ///
    /// Keeps its last value while no page is visible.
    pub const fn current_page(&self) -> Option<PageNumber> {
        self.indicator
    }
}
