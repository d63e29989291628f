use super::HeuristicValue;
use crate::common::{OperatorId, StateId};

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CacheEntry {
    pub(crate) value: HeuristicValue,
    pub(crate) preferred: Vec<OperatorId>,
    dirty: bool,
}

/// Memoised evaluation results per state. An entry marked dirty is kept but
/// no longer served until the state is evaluated again.
#[derive(Debug, Clone, Default)]
pub(crate) struct HeuristicCache {
    entries: HashMap<StateId, CacheEntry>,
}

impl HeuristicCache {
    pub(crate) fn lookup(&self, state: StateId) -> Option<&CacheEntry> {
        self.entries.get(&state).filter(|entry| !entry.dirty)
    }

    pub(crate) fn store(&mut self, state: StateId, value: HeuristicValue, preferred: Vec<OperatorId>) {
        self.entries.insert(
            state,
            CacheEntry {
                value,
                preferred,
                dirty: false,
            },
        );
    }

    pub(crate) fn mark_dirty(&mut self, state: StateId) {
        if let Some(entry) = self.entries.get_mut(&state) {
            entry.dirty = true;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirty_entries_are_not_served() {
        let mut cache = HeuristicCache::default();
        cache.store(StateId(3), HeuristicValue::Estimate(5), vec![OperatorId(1)]);
        assert_eq!(
            cache.lookup(StateId(3)).map(|entry| entry.value),
            Some(HeuristicValue::Estimate(5))
        );

        cache.mark_dirty(StateId(3));
        assert!(cache.lookup(StateId(3)).is_none());
        assert_eq!(cache.len(), 1);

        cache.store(StateId(3), HeuristicValue::DeadEnd, vec![]);
        assert_eq!(
            cache.lookup(StateId(3)).map(|entry| entry.value),
            Some(HeuristicValue::DeadEnd)
        );

        // Unknown states are silently ignored.
        cache.mark_dirty(StateId(9));
        assert!(cache.lookup(StateId(9)).is_none());
    }
}
