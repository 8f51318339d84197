use alloc::vec::Vec;
use hashbrown::HashSet;

use crate::*;

/// Cells currently materialized.
pub type VisibleSet = HashSet<CellAddress>;

/// Result of comparing the visible set against a new viewport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewportDiff {
    /// Cells leaving view, sorted.
    pub to_remove: Vec<CellAddress>,
    /// Cells entering view, sorted.
    pub to_add: Vec<CellAddress>,
    pub next_visible: VisibleSet,
}

impl ViewportDiff {
    pub fn is_unchanged(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }
}

/// Computes which cells enter and leave view. Cells present in both sets are
/// not mentioned at all.
pub fn diff(previous: &VisibleSet, range: CellRange) -> ViewportDiff {
    let next_visible: VisibleSet = range.iter().collect();

    let mut to_remove: Vec<_> = previous.difference(&next_visible).copied().collect();
    let mut to_add: Vec<_> = next_visible.difference(previous).copied().collect();
    to_remove.sort_unstable();
    to_add.sort_unstable();

    ViewportDiff {
        to_remove,
        to_add,
        next_visible,
    }
}

/// Owns the visible set between diffs.
#[derive(Clone, Debug, Default)]
pub struct Viewport {
    visible: VisibleSet,
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible(&self) -> &VisibleSet {
        &self.visible
    }

    pub fn is_visible(&self, addr: CellAddress) -> bool {
        self.visible.contains(&addr)
    }

    /// Diffs against `range` and adopts the new visible set. Callers must
    /// dematerialize `to_remove` before materializing `to_add`.
    pub fn apply(&mut self, range: CellRange) -> ViewportDiff {
        let diff = diff(&self.visible, range);
        self.visible.clone_from(&diff.next_visible);
        log::trace!(
            "viewport: -{} +{} ({} visible)",
            diff.to_remove.len(),
            diff.to_add.len(),
            self.visible.len()
        );
        diff
    }

    /// Empties the visible set, returning every cell that was in it, sorted.
    pub fn clear(&mut self) -> Vec<CellAddress> {
        let mut removed: Vec<_> = self.visible.drain().collect();
        removed.sort_unstable();
        removed
    }
}
