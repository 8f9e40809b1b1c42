//! Compiled expression cache
//!
//! Keyed by the original expression text. Each key owns a `OnceCell`, so
//! concurrent requests for the same text compile it at most once while
//! requests for other texts proceed independently.

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::compiler::CompiledExpression;
use crate::error::{CompileError, Result};

type Cell = Arc<OnceCell<Arc<CompiledExpression>>>;

struct Slot {
    cell: Cell,
    access_count: u64,
}

/// Cache of compiled expressions
pub struct ExpressionCache {
    slots: Mutex<HashMap<String, Slot>>,
    capacity: usize,
    lock_timeout: Duration,
    compilations: AtomicU64,
    hits: AtomicU64,
    evictions: AtomicU64,
}

impl ExpressionCache {
    /// Create a cache holding at most `capacity` expressions (0 = unbounded)
    pub fn new(capacity: usize, lock_timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            capacity,
            lock_timeout,
            compilations: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Slot>>> {
        self.slots.try_lock_for(self.lock_timeout).ok_or_else(|| {
            log::warn!("expression cache lock timed out after {:?}", self.lock_timeout);
            CompileError::Contention {
                waited: self.lock_timeout,
            }
        })
    }

    /// Returns the cached expression for `text`, running `compile` if no
    /// caller has produced it yet. Failures are not cached.
    pub fn get_or_compile<F>(&self, text: &str, compile: F) -> Result<Arc<CompiledExpression>>
    where
        F: FnOnce() -> Result<CompiledExpression>,
    {
        let cell = {
            let mut slots = self.lock()?;
            if !slots.contains_key(text) && self.capacity > 0 && slots.len() >= self.capacity {
                self.evict_least_used(&mut slots);
            }
            let slot = slots.entry(text.to_string()).or_insert_with(|| Slot {
                cell: Arc::new(OnceCell::new()),
                access_count: 0,
            });
            slot.access_count += 1;
            slot.cell.clone()
        };

        if let Some(hit) = cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("cache hit for {text:?}");
            return Ok(hit.clone());
        }

        let mut ran = false;
        let result = cell.get_or_try_init(|| {
            ran = true;
            self.compilations.fetch_add(1, Ordering::Relaxed);
            compile().map(Arc::new)
        });
        match result {
            Ok(compiled) => {
                if !ran {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                }
                Ok(compiled.clone())
            }
            Err(e) => {
                self.discard_failed(text, &cell);
                Err(e)
            }
        }
    }

    fn discard_failed(&self, text: &str, cell: &Cell) {
        // Best effort: an uninitialised slot left behind is retried next time
        if let Some(mut slots) = self.slots.try_lock_for(self.lock_timeout) {
            let stale = slots
                .get(text)
                .is_some_and(|s| Arc::ptr_eq(&s.cell, cell) && s.cell.get().is_none());
            if stale {
                slots.remove(text);
            }
        }
    }

    /// Evict the least used compiled entry
    fn evict_least_used(&self, slots: &mut HashMap<String, Slot>) {
        let victim = slots
            .iter()
            .filter(|(_, s)| s.cell.get().is_some())
            .min_by_key(|(_, s)| s.access_count)
            .map(|(k, _)| k.clone());
        if let Some(key) = victim {
            log::debug!("evicting cached expression {key:?}");
            slots.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn contains(&self, text: &str) -> Result<bool> {
        Ok(self
            .lock()?
            .get(text)
            .is_some_and(|s| s.cell.get().is_some()))
    }

    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let size = self
            .lock()?
            .values()
            .filter(|s| s.cell.get().is_some())
            .count();
        Ok(CacheStats {
            compilations: self.compilations.load(Ordering::Relaxed),
            cache_hits: self.hits.load(Ordering::Relaxed),
            size,
            capacity: self.capacity,
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Pipeline runs, successful or not
    pub compilations: u64,
    pub cache_hits: u64,
    pub size: usize,
    pub capacity: usize,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.compilations + self.cache_hits;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }
}
