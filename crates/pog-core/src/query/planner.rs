//! Layout cache: memoized shelf layouts per `(planogram, side)`.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::models::{PlanogramMetadata, ShelfRow};
use crate::query::guards::DEFAULT_LAYOUT_CACHE_SIZE;
use crate::query::layout::build_layout_impl;

type LayoutKey = (String, i64);

struct CacheState {
    fingerprint: String,
    entries: IndexMap<LayoutKey, Arc<[ShelfRow]>>,
    hits: u64,
    misses: u64,
}

/// Bounded LRU over derived layouts. Entries are tied to one dataset
/// fingerprint; a different fingerprint clears the cache.
pub struct LayoutCache {
    max_entries: usize,
    state: Mutex<CacheState>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutCacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new(DEFAULT_LAYOUT_CACHE_SIZE)
    }
}

impl LayoutCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            state: Mutex::new(CacheState {
                fingerprint: String::new(),
                entries: IndexMap::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    pub fn get_or_build(
        &self,
        fingerprint: &str,
        planogram: &PlanogramMetadata,
        side: i64,
    ) -> Arc<[ShelfRow]> {
        let key = (planogram.id.clone(), side);
        let mut state = self.state.lock();

        if state.fingerprint != fingerprint {
            if !state.entries.is_empty() {
                debug!(old = %state.fingerprint, new = %fingerprint, "dataset changed, clearing layout cache");
            }
            state.entries.clear();
            state.fingerprint = fingerprint.to_string();
        }

        if let Some(index) = state.entries.get_index_of(&key) {
            // Move to end for LRU.
            let last = state.entries.len() - 1;
            state.entries.move_index(index, last);
            state.hits += 1;
            return Arc::clone(&state.entries[last]);
        }

        state.misses += 1;
        let layout: Arc<[ShelfRow]> = build_layout_impl(planogram, side).into();
        state.entries.insert(key, Arc::clone(&layout));
        while state.entries.len() > self.max_entries {
            state.entries.shift_remove_index(0);
        }
        layout
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    pub fn stats(&self) -> LayoutCacheStats {
        let state = self.state.lock();
        LayoutCacheStats {
            entries: state.entries.len(),
            max_entries: self.max_entries,
            hits: state.hits,
            misses: state.misses,
        }
    }
}
