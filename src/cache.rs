//! Result cache for repeated suggest calls.
//!
//! Entries are tagged with the generation of their configuration at the
//! time the query started. Every write to a configuration bumps its
//! generation, so results computed against an older index are never served.
//! When full, the least recently used entry is evicted.

use crate::facets::FacetHash;
use crate::types::Suggestion;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  pub config: String,
  pub query: String,
  pub facets: Option<FacetHash>,
  pub limit: usize,
  pub exact_only: bool,
}

struct CacheEntry {
  generation: u64,
  results: Arc<Vec<Suggestion>>,
  last_used: AtomicU64,
}

pub struct SuggestCache {
  entries: DashMap<CacheKey, CacheEntry>,
  generations: DashMap<String, u64>,
  capacity: usize,
  clock: AtomicU64,
}

impl SuggestCache {
  pub fn new(capacity: usize) -> Self {
    Self {
      entries: DashMap::new(),
      generations: DashMap::new(),
      capacity: capacity.max(1),
      clock: AtomicU64::new(0),
    }
  }

  /// Current generation of a configuration.
  pub fn generation(&self, config: &str) -> u64 {
    self.generations.get(config).map(|g| *g).unwrap_or(0)
  }

  pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<Suggestion>>> {
    let current = self.generation(&key.config);
    let hit = self.entries.get(key)?;
    if hit.generation != current {
      return None;
    }
    hit.last_used.store(self.tick(), Ordering::Relaxed);
    Some(hit.results.clone())
  }

  /// Stores results computed while the configuration was at `generation`.
  pub fn insert(&self, key: CacheKey, generation: u64, results: Arc<Vec<Suggestion>>) {
    if generation != self.generation(&key.config) {
      return;
    }
    if !self.entries.contains_key(&key) {
      while self.entries.len() >= self.capacity {
        if !self.evict_oldest() {
          break;
        }
      }
    }
    let entry = CacheEntry {
      generation,
      results,
      last_used: AtomicU64::new(self.tick()),
    };
    self.entries.insert(key, entry);
  }

  /// Drops everything cached for a configuration.
  pub fn invalidate(&self, config: &str) {
    *self.generations.entry(config.to_string()).or_insert(0) += 1;
    self.entries.retain(|key, _| key.config != config);
  }

  fn tick(&self) -> u64 {
    self.clock.fetch_add(1, Ordering::Relaxed)
  }

  /// Removes the least recently used entry. False when there was none.
  fn evict_oldest(&self) -> bool {
    let oldest = self
      .entries
      .iter()
      .min_by_key(|entry| entry.value().last_used.load(Ordering::Relaxed))
      .map(|entry| entry.key().clone());
    match oldest {
      Some(key) => self.entries.remove(&key).is_some(),
      None => false,
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
