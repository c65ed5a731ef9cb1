use std::collections::HashMap;

use super::taxonomy::Taxonomy;

/// Running per-label tally of labelled images.
///
/// Only taxonomy labels have a slot. Updates are O(1); the tally is never
/// recomputed from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelCounts {
    counts: HashMap<String, usize>,
}

impl LabelCounts {
    /// Zero slot for every taxonomy label (duplicates collapse to one slot)
    pub fn new(taxonomy: &Taxonomy) -> Self {
        let counts = taxonomy
            .labels()
            .iter()
            .map(|label| (label.name.clone(), 0))
            .collect();
        LabelCounts { counts }
    }

    pub fn is_tracked(&self, label: &str) -> bool {
        self.counts.contains_key(label)
    }

    pub fn get(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Returns false if the label has no slot
    pub fn increment(&mut self, label: &str) -> bool {
        match self.counts.get_mut(label) {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    /// Floored at zero. Returns false if the label has no slot
    pub fn decrement(&mut self, label: &str) -> bool {
        match self.counts.get_mut(label) {
            Some(count) => {
                *count = count.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}
