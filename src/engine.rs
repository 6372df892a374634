//! The orchestrator that ties the registry, the index and the match engine
//! together.

use crate::cache::{CacheKey, SuggestCache};
use crate::error::{AutocompleteError, Result};
use crate::facets::{check_facets, hash_facets};
use crate::index::adapter::KvStore;
use crate::index::memory::InMemStore;
use crate::index::store::IndexStore;
use crate::matcher::{MatchEngine, ProviderQuery};
use crate::normalize::Normalizer;
use crate::provider::{ProviderHandle, ProviderPlan, RecordHandle};
use crate::registry::Registry;
use crate::settings::Settings;
use crate::types::{IndexEntry, Payload, SuggestOptions, Suggestion};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

struct RegisteredProvider {
  handle: Arc<dyn ProviderHandle>,
  plan: ProviderPlan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryKind {
  Prefix,
  Exact,
}

/// Serves every registered autocompleter configuration.
///
/// Each configuration moves through two states. It starts **unbuilt**, where
/// `suggest` returns nothing. [`store_all`](Self::store_all) makes it
/// **built**, incremental [`store`](Self::store) and [`remove`](Self::remove)
/// keep it built, and [`remove_all`](Self::remove_all) returns it to unbuilt.
///
/// Builds of one configuration are serialized. Queries never wait on them:
/// a rebuild swaps the whole namespace in one batch, so readers see either
/// the old index or the new one.
///
/// # Examples
///
/// ```
/// use autocompleter::prelude::*;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// struct Metric;
///
/// impl Provider for Metric {
///   type Record = String;
///
///   fn provider_name(&self) -> &str {
///     "metric"
///   }
///
///   fn get_term(&self, label: &String) -> Option<String> {
///     Some(label.clone())
///   }
///
///   fn get_data(&self, label: &String) -> Payload {
///     json!({"type": "metric", "display_name": label})
///       .as_object()
///       .cloned()
///       .unwrap_or_default()
///   }
/// }
///
/// let metrics = DictBacked::new(
///   Metric,
///   [
///     ("pe".to_string(), "Price to Earnings".to_string()),
///     ("ps".to_string(), "Price to Sales".to_string()),
///   ],
/// );
/// let registry = Registry::builder()
///   .register("metric", Arc::new(metrics))
///   .build()
///   .unwrap();
/// let engine = AutocompleteEngine::builder().registry(registry).build();
///
/// engine.store_all("metric").unwrap();
/// let results = engine
///   .suggest("metric", "price to e", &SuggestOptions::default())
///   .unwrap();
/// assert_eq!(results[0].item_id, "pe");
/// ```
pub struct AutocompleteEngine {
  registry: Registry,
  providers: HashMap<String, Vec<RegisteredProvider>>,
  index: IndexStore,
  matcher: MatchEngine,
  /// Cleans queries into cache keys. Provider normalizers only remove more.
  query_key: Normalizer,
  cache: Option<SuggestCache>,
  build_locks: DashMap<String, Arc<Mutex<()>>>,
  settings: Settings,
}

impl AutocompleteEngine {
  pub fn builder() -> AutocompleteEngineBuilder {
    AutocompleteEngineBuilder::new()
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  /// A handle bound to one configuration.
  pub fn autocompleter<'a>(&'a self, name: &'a str) -> Autocompleter<'a> {
    Autocompleter { engine: self, name }
  }

  /// Rebuilds the whole index of a configuration from its providers.
  ///
  /// Running it twice leaves the same index as running it once. Returns
  /// the number of items indexed; an unknown configuration indexes nothing.
  pub fn store_all(&self, name: &str) -> Result<usize> {
    let Some(providers) = self.providers.get(name) else {
      debug!(config = name, "store_all on unknown autocompleter");
      return Ok(0);
    };

    let lock = self.build_lock(name);
    let _guard = lock.lock();
    info!(config = name, providers = providers.len(), "building index");

    #[cfg(feature = "parallel")]
    let collected: Result<Vec<(String, Vec<IndexEntry>)>> = providers
      .par_iter()
      .map(|p| {
        let entries = p.handle.collect_entries(&p.plan)?;
        Ok::<_, AutocompleteError>((p.plan.name.clone(), entries))
      })
      .collect();

    #[cfg(not(feature = "parallel"))]
    let collected: Result<Vec<(String, Vec<IndexEntry>)>> = providers
      .iter()
      .map(|p| {
        let entries = p.handle.collect_entries(&p.plan)?;
        Ok::<_, AutocompleteError>((p.plan.name.clone(), entries))
      })
      .collect();

    let written = self.index.replace_all(name, &collected?)?;
    self.invalidate(name);
    info!(config = name, items = written, "index built");
    Ok(written)
  }

  /// Deletes everything indexed for a configuration.
  pub fn remove_all(&self, name: &str) -> Result<()> {
    if !self.providers.contains_key(name) {
      debug!(config = name, "remove_all on unknown autocompleter");
      return Ok(());
    }

    let lock = self.build_lock(name);
    let _guard = lock.lock();
    self.index.clear(name)?;
    self.invalidate(name);
    info!(config = name, "index removed");
    Ok(())
  }

  /// Indexes or re-indexes one record.
  ///
  /// A record the provider excludes is removed from the index instead.
  /// Returns whether the record is now indexed.
  pub fn store<H: RecordHandle>(&self, name: &str, handle: &H, record: &H::Record) -> Result<bool> {
    let registered = self.registered(name, handle.provider_name())?;
    let lock = self.build_lock(name);
    let _guard = lock.lock();

    let indexed = match handle.entry_for(&registered.plan, record) {
      Some(entry) => {
        self.index.store(name, &registered.plan.name, &entry)?;
        true
      }
      None => {
        let item_id = handle.item_id(record);
        self.index.remove(name, &registered.plan.name, &item_id)?;
        false
      }
    };
    self.invalidate(name);
    debug!(config = name, provider = %registered.plan.name, indexed, "stored item");
    Ok(indexed)
  }

  /// Removes one item. Returns false when it was not indexed.
  pub fn remove(&self, name: &str, provider: &str, item_id: &str) -> Result<bool> {
    let registered = self.registered(name, provider)?;
    let lock = self.build_lock(name);
    let _guard = lock.lock();

    let removed = self.index.remove(name, &registered.plan.name, item_id)?;
    if removed {
      self.invalidate(name);
    }
    Ok(removed)
  }

  /// Ranked suggestions for a raw query.
  ///
  /// An unknown or unbuilt configuration yields an empty list. A facet
  /// group without sub-facets is rejected with `InvalidFacets`.
  pub fn suggest(&self, name: &str, query: &str, options: &SuggestOptions) -> Result<Vec<Suggestion>> {
    self.run(name, query, options, QueryKind::Prefix)
  }

  /// Only the items having a term equal to the normalized query.
  pub fn exact_suggest(&self, name: &str, query: &str, options: &SuggestOptions) -> Result<Vec<Suggestion>> {
    self.run(name, query, options, QueryKind::Exact)
  }

  /// The stored payload of one item, if it is indexed.
  pub fn get_provider_result(&self, name: &str, provider: &str, item_id: &str) -> Result<Option<Payload>> {
    let known = self
      .providers
      .get(name)
      .is_some_and(|providers| providers.iter().any(|p| p.plan.name == provider));
    if !known {
      return Ok(None);
    }
    let entry = self.index.get_entry(name, provider, item_id)?;
    Ok(entry.map(|entry| entry.payload))
  }

  pub fn is_built(&self, name: &str) -> Result<bool> {
    if !self.providers.contains_key(name) {
      return Ok(false);
    }
    self.index.is_built(name)
  }

  fn run(&self, name: &str, query: &str, options: &SuggestOptions, kind: QueryKind) -> Result<Vec<Suggestion>> {
    if let Some(groups) = &options.facets {
      check_facets(groups)?;
    }
    let Some(providers) = self.providers.get(name) else {
      debug!(config = name, "suggest on unknown autocompleter");
      return Ok(Vec::new());
    };
    let limit = options.limit.unwrap_or(self.settings.max_results);
    if limit == 0 {
      return Ok(Vec::new());
    }
    let facets = options.facets.as_deref().filter(|groups| !groups.is_empty());

    let key = self.cache.as_ref().map(|_| CacheKey {
      config: name.to_string(),
      query: self.query_key.normalize(query),
      facets: facets.map(hash_facets),
      limit,
      exact_only: kind == QueryKind::Exact,
    });
    if let (Some(cache), Some(key)) = (&self.cache, &key) {
      if let Some(hit) = cache.get(key) {
        debug!(config = name, query = %key.query, "suggest cache hit");
        return Ok(hit.as_ref().clone());
      }
    }
    let generation = self.cache.as_ref().map_or(0, |cache| cache.generation(name));

    let per_provider = providers
      .iter()
      .map(|registered| {
        let provider_query = ProviderQuery {
          config: name,
          plan: &registered.plan,
          raw_query: query,
          facets,
          limit,
        };
        match kind {
          QueryKind::Prefix => self.matcher.match_provider(&self.index, &provider_query),
          QueryKind::Exact => self.matcher.exact_provider(&self.index, &provider_query),
        }
      })
      .collect::<Result<Vec<_>>>()?;
    let results = self.matcher.merge(per_provider, limit);

    if let (Some(cache), Some(key)) = (&self.cache, key) {
      cache.insert(key, generation, Arc::new(results.clone()));
    }
    Ok(results)
  }

  fn registered(&self, name: &str, provider: &str) -> Result<&RegisteredProvider> {
    self
      .providers
      .get(name)
      .and_then(|providers| providers.iter().find(|p| p.plan.name == provider))
      .ok_or_else(|| AutocompleteError::ProviderNotRegistered {
        name: name.to_string(),
        provider: provider.to_string(),
      })
  }

  fn build_lock(&self, name: &str) -> Arc<Mutex<()>> {
    self.build_locks.entry(name.to_string()).or_default().clone()
  }

  fn invalidate(&self, name: &str) {
    if let Some(cache) = &self.cache {
      cache.invalidate(name);
    }
  }
}

/// Builder for [`AutocompleteEngine`].
pub struct AutocompleteEngineBuilder {
  registry: Registry,
  store: Option<Arc<dyn KvStore>>,
  settings: Settings,
}

impl AutocompleteEngineBuilder {
  pub fn new() -> Self {
    Self {
      registry: Registry::default(),
      store: None,
      settings: Settings::default(),
    }
  }

  pub fn registry(mut self, registry: Registry) -> Self {
    self.registry = registry;
    self
  }

  /// Storage backend. Defaults to a fresh [`InMemStore`].
  pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
    self.store = Some(store);
    self
  }

  pub fn settings(mut self, settings: Settings) -> Self {
    self.settings = settings;
    self
  }

  pub fn build(self) -> AutocompleteEngine {
    let settings = self.settings;
    let providers = self
      .registry
      .names()
      .map(|name| {
        let compiled = self
          .registry
          .providers(name)
          .unwrap_or_default()
          .iter()
          .map(|handle| RegisteredProvider {
            plan: ProviderPlan::compile(handle.as_ref(), &settings),
            handle: handle.clone(),
          })
          .collect();
        (name.to_string(), compiled)
      })
      .collect();

    let store = self.store.unwrap_or_else(|| Arc::new(InMemStore::new()));
    AutocompleteEngine {
      providers,
      index: IndexStore::new(store, settings.max_prefix_length),
      matcher: MatchEngine::new(&settings),
      query_key: Normalizer::new(&settings.join_chars, &[] as &[&str]),
      cache: settings
        .cache_enabled
        .then(|| SuggestCache::new(settings.cache_capacity)),
      build_locks: DashMap::new(),
      registry: self.registry,
      settings,
    }
  }
}

impl Default for AutocompleteEngineBuilder {
  fn default() -> Self {
    Self::new()
  }
}

/// An [`AutocompleteEngine`] bound to one configuration name.
#[derive(Clone, Copy)]
pub struct Autocompleter<'a> {
  engine: &'a AutocompleteEngine,
  name: &'a str,
}

impl<'a> Autocompleter<'a> {
  pub fn name(&self) -> &'a str {
    self.name
  }

  pub fn store_all(&self) -> Result<usize> {
    self.engine.store_all(self.name)
  }

  pub fn remove_all(&self) -> Result<()> {
    self.engine.remove_all(self.name)
  }

  pub fn store<H: RecordHandle>(&self, handle: &H, record: &H::Record) -> Result<bool> {
    self.engine.store(self.name, handle, record)
  }

  pub fn remove(&self, provider: &str, item_id: &str) -> Result<bool> {
    self.engine.remove(self.name, provider, item_id)
  }

  pub fn suggest(&self, query: &str, options: &SuggestOptions) -> Result<Vec<Suggestion>> {
    self.engine.suggest(self.name, query, options)
  }

  pub fn exact_suggest(&self, query: &str, options: &SuggestOptions) -> Result<Vec<Suggestion>> {
    self.engine.exact_suggest(self.name, query, options)
  }

  pub fn get_provider_result(&self, provider: &str, item_id: &str) -> Result<Option<Payload>> {
    self.engine.get_provider_result(self.name, provider, item_id)
  }

  pub fn is_built(&self) -> Result<bool> {
    self.engine.is_built(self.name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::provider::{DictBacked, Provider};
  use serde_json::json;

  struct Word;

  impl Provider for Word {
    type Record = (String, f64);

    fn provider_name(&self) -> &str {
      "word"
    }

    fn get_term(&self, record: &(String, f64)) -> Option<String> {
      Some(record.0.clone())
    }

    fn get_score(&self, record: &(String, f64)) -> f64 {
      record.1
    }

    fn include_item(&self, record: &(String, f64)) -> bool {
      record.1 >= 0.0
    }

    fn get_data(&self, record: &(String, f64)) -> Payload {
      json!({"type": "word", "display_name": record.0})
        .as_object()
        .cloned()
        .unwrap_or_default()
    }
  }

  fn words() -> Arc<DictBacked<Word>> {
    Arc::new(DictBacked::new(
      Word,
      [
        ("apple".to_string(), ("Apple".to_string(), 3.0)),
        ("apricot".to_string(), ("Apricot".to_string(), 5.0)),
        ("banana".to_string(), ("Banana".to_string(), 1.0)),
      ],
    ))
  }

  fn engine(handle: Arc<DictBacked<Word>>) -> AutocompleteEngine {
    let registry = Registry::builder().register("words", handle).build().unwrap();
    AutocompleteEngine::builder().registry(registry).build()
  }

  fn ids(results: Vec<Suggestion>) -> Vec<String> {
    results.into_iter().map(|s| s.item_id).collect()
  }

  #[test]
  fn test_lifecycle() {
    let engine = engine(words());
    let words = engine.autocompleter("words");
    let options = SuggestOptions::default();

    assert!(!words.is_built().unwrap());
    assert!(words.suggest("ap", &options).unwrap().is_empty());

    assert_eq!(words.store_all().unwrap(), 3);
    assert!(words.is_built().unwrap());
    assert_eq!(ids(words.suggest("ap", &options).unwrap()), vec!["apricot", "apple"]);

    words.remove_all().unwrap();
    assert!(!words.is_built().unwrap());
    assert!(words.suggest("ap", &options).unwrap().is_empty());
  }

  #[test]
  fn test_incremental_writes_invalidate_cache() {
    let handle = words();
    let engine = engine(handle.clone());
    let options = SuggestOptions::default();
    engine.store_all("words").unwrap();
    assert_eq!(ids(engine.suggest("words", "ap", &options).unwrap()), vec!["apricot", "apple"]);

    let record = ("apple".to_string(), ("Apple".to_string(), 9.0));
    assert!(engine.store("words", &*handle, &record).unwrap());
    assert_eq!(ids(engine.suggest("words", "ap", &options).unwrap()), vec!["apple", "apricot"]);

    let hidden = ("apple".to_string(), ("Apple".to_string(), -1.0));
    assert!(!engine.store("words", &*handle, &hidden).unwrap());
    assert_eq!(ids(engine.suggest("words", "ap", &options).unwrap()), vec!["apricot"]);

    assert!(engine.remove("words", "word", "apricot").unwrap());
    assert!(engine.suggest("words", "ap", &options).unwrap().is_empty());
  }

  #[test]
  fn test_unknown_names() {
    let engine = engine(words());
    assert!(engine.suggest("nope", "ap", &SuggestOptions::default()).unwrap().is_empty());
    assert_eq!(engine.store_all("nope").unwrap(), 0);
    assert!(matches!(
      engine.remove("words", "nope", "apple"),
      Err(AutocompleteError::ProviderNotRegistered { .. })
    ));
    assert!(engine.get_provider_result("words", "nope", "apple").unwrap().is_none());
  }

  #[test]
  fn test_limit_and_provider_result() {
    let engine = engine(words());
    engine.store_all("words").unwrap();

    let one = engine
      .suggest("words", "ap", &SuggestOptions::default().limit(1))
      .unwrap();
    assert_eq!(ids(one), vec!["apricot"]);
    assert!(engine
      .suggest("words", "ap", &SuggestOptions::default().limit(0))
      .unwrap()
      .is_empty());

    let payload = engine.get_provider_result("words", "word", "banana").unwrap().unwrap();
    assert_eq!(payload["display_name"], "Banana");
  }
}
