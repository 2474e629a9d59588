use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::domain::unit::RentalUnit;
use crate::ports::cache::UnitCache;

const FALLBACK_CAPACITY: NonZeroUsize = NonZeroUsize::new(100).unwrap();

struct CacheEntry {
    unit: RentalUnit,
    expires_at: Instant,
}

/// In-process LRU of unit records keyed by unit id.
pub struct MemoryUnitCache {
    inner: RwLock<LruCache<String, CacheEntry>>,
}

impl MemoryUnitCache {
    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries).unwrap_or_else(|| {
            tracing::warn!("Cache max_entries was 0, defaulting to 100");
            FALLBACK_CAPACITY
        });
        Self {
            inner: RwLock::new(LruCache::new(cap)),
        }
    }
}

impl UnitCache for MemoryUnitCache {
    fn get(&self, unit_id: &str) -> Option<RentalUnit> {
        let mut cache = self.inner.write().map_or_else(
            |_| {
                tracing::error!(unit_id, "Unit cache lock poisoned on get, returning miss");
                None
            },
            Some,
        )?;
        let entry = cache.get(unit_id)?;
        if Instant::now() > entry.expires_at {
            cache.pop(unit_id);
            return None;
        }
        Some(entry.unit.clone())
    }

    fn set(&self, unit: &RentalUnit, ttl: Duration) {
        if let Ok(mut cache) = self.inner.write() {
            cache.put(
                unit.id.clone(),
                CacheEntry {
                    unit: unit.clone(),
                    expires_at: Instant::now() + ttl,
                },
            );
        } else {
            tracing::error!(unit_id = %unit.id, "Unit cache lock poisoned on set, skipping write");
        }
    }
}
