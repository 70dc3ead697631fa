//! Highlighted entries of the displayed folder

use crate::store::EntryId;

/// Multi-selection plus the anchor used for range selection
#[derive(Clone, Debug, Default)]
pub struct Selection {
    ids: Vec<EntryId>,
    anchor: Option<EntryId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[EntryId] {
        &self.ids
    }

    pub fn anchor(&self) -> Option<EntryId> {
        self.anchor
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.ids.contains(&id)
    }

    /// Replace the selection with a single entry and anchor on it
    pub fn highlight(&mut self, id: EntryId) {
        self.ids.clear();
        self.ids.push(id);
        self.anchor = Some(id);
    }

    /// Replace the selection with `ids`, anchoring on the first one
    pub fn set(&mut self, ids: Vec<EntryId>) {
        self.anchor = ids.first().copied().or(self.anchor);
        self.ids = ids;
    }

    pub fn toggle(&mut self, id: EntryId) {
        if self.contains(id) {
            self.ids.retain(|&i| i != id);
        } else {
            self.ids.push(id);
        }
    }

    /// Select the run of `listing` between the anchor and `id`, both included
    pub fn toggle_range(&mut self, id: EntryId, listing: &[EntryId]) {
        let anchor_pos = self
            .anchor
            .and_then(|anchor| listing.iter().position(|&e| e == anchor));
        let target_pos = listing.iter().position(|&e| e == id);

        match (anchor_pos, target_pos) {
            (Some(a), Some(t)) => {
                let (start, end) = if a <= t { (a, t) } else { (t, a) };
                self.ids = listing[start..=end].to_vec();
            }
            _ => self.highlight(id),
        }
    }

    pub fn highlight_all(&mut self, listing: &[EntryId]) {
        self.ids = listing.to_vec();
    }

    /// Empty the selection, keeping the anchor
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Empty the selection and forget the anchor
    pub fn reset(&mut self) {
        self.ids.clear();
        self.anchor = None;
    }

    /// Drop ids that are no longer part of the listing
    pub fn retain_listed(&mut self, listing: &[EntryId]) {
        self.ids.retain(|id| listing.contains(id));
    }

    /// Move a single highlight `delta` rows away from the anchor
    pub fn step(&mut self, listing: &[EntryId], delta: isize) {
        if listing.is_empty() {
            return;
        }
        let last = listing.len() as isize - 1;
        let current = self
            .anchor
            .and_then(|anchor| listing.iter().position(|&e| e == anchor))
            .map(|pos| pos as isize);
        let target = match current {
            Some(pos) => (pos + delta).clamp(0, last),
            None if delta < 0 => last,
            None => 0,
        };
        self.highlight(listing[target as usize]);
    }

    pub fn first(&mut self, listing: &[EntryId]) {
        if let Some(&id) = listing.first() {
            self.highlight(id);
        }
    }

    pub fn last(&mut self, listing: &[EntryId]) {
        if let Some(&id) = listing.last() {
            self.highlight(id);
        }
    }

    /// Entry to highlight once `removed` are gone from `listing`.
    ///
    /// Starts at the highest listing index among removed entries, scans forward
    /// for a survivor, then backward from the same index.
    pub fn next_after_delete(listing: &[EntryId], removed: &[EntryId]) -> Option<EntryId> {
        let start = listing.iter().rposition(|id| removed.contains(id))?;
        let survivor = |id: &&EntryId| !removed.contains(id);

        listing[start..]
            .iter()
            .find(survivor)
            .or_else(|| listing[..start].iter().rev().find(survivor))
            .copied()
    }
}
