//! Transient markers that carry a logical expiry time instead of a timer.

use std::collections::{BTreeMap, BTreeSet};

use cf_core::TsMs;

#[derive(Debug, Clone)]
pub struct ExpiringSet<K: Ord + Clone> {
    deadlines: BTreeMap<K, TsMs>,
}

impl<K: Ord + Clone> Default for ExpiringSet<K> {
    fn default() -> Self {
        Self {
            deadlines: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> ExpiringSet<K> {
    /// Inserts or refreshes a marker. Returns whether the key was new.
    pub fn insert(&mut self, key: K, expires_at_ms: TsMs) -> bool {
        self.deadlines.insert(key, expires_at_ms).is_none()
    }

    pub fn expires_at(&self, key: &K) -> Option<TsMs> {
        self.deadlines.get(key).copied()
    }

    /// Removes and returns every marker due at or before `now_ms`.
    pub fn expire(&mut self, now_ms: TsMs) -> Vec<K> {
        let due: Vec<K> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now_ms)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &due {
            self.deadlines.remove(key);
        }
        due
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K) -> bool,
    {
        self.deadlines.retain(|key, _| keep(key));
    }

    pub fn next_deadline(&self) -> Option<TsMs> {
        self.deadlines.values().min().copied()
    }

    pub fn keys(&self) -> BTreeSet<K> {
        self.deadlines.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}
