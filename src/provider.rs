//! Providers turn a data source into index entries.
//!
//! A [`Provider`] describes how one kind of record is indexed: its terms,
//! score, identifier, payload, facet fields and phrase aliases. Where the
//! records come from is a separate concern, handled by one of two wrappers:
//!
//! - [`ModelBacked`] pages through an externally owned [`RecordSource`].
//! - [`DictBacked`] iterates a fixed in-memory mapping.
//!
//! Both wrappers implement [`ProviderHandle`], the object-safe interface the
//! registry stores and the engine builds from.

use crate::alias::{AliasTable, PhraseAliases};
use crate::error::Result;
use crate::facets::scalar_string;
use crate::normalize::{normalize_rounding, Normalizer};
use crate::settings::{ProviderSettings, Settings};
use crate::types::{IndexEntry, ItemId, Payload};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// The capability set describing how records of one kind are indexed.
///
/// Only [`provider_name`](Provider::provider_name) and
/// [`get_data`](Provider::get_data) plus one of `get_term` / `get_terms`
/// need implementing; everything else has a default.
///
/// # Examples
///
/// ```
/// use autocompleter::prelude::*;
/// use serde_json::json;
///
/// struct Metric {
///   label: String,
/// }
///
/// struct MetricProvider;
///
/// impl Provider for MetricProvider {
///   type Record = Metric;
///
///   fn provider_name(&self) -> &str {
///     "metric"
///   }
///
///   fn get_term(&self, record: &Metric) -> Option<String> {
///     Some(record.label.clone())
///   }
///
///   fn get_data(&self, record: &Metric) -> Payload {
///     json!({"type": "metric", "display_name": record.label})
///       .as_object()
///       .cloned()
///       .unwrap_or_default()
///   }
/// }
/// ```
pub trait Provider: Send + Sync {
  type Record;

  /// Unique name of the provider within a configuration. Also used as the
  /// provider's storage namespace.
  fn provider_name(&self) -> &str;

  fn get_term(&self, _record: &Self::Record) -> Option<String> {
    None
  }

  /// Raw terms the record is found by. A record with no terms is skipped.
  fn get_terms(&self, record: &Self::Record) -> Vec<String> {
    self.get_term(record).into_iter().collect()
  }

  /// Ranking score, higher first. Rounded half away from zero when indexed.
  fn get_score(&self, _record: &Self::Record) -> f64 {
    1.0
  }

  /// Records returning false are left out of the index.
  fn include_item(&self, _record: &Self::Record) -> bool {
    true
  }

  /// Overrides the record's natural identifier.
  fn get_item_id(&self, _record: &Self::Record) -> Option<ItemId> {
    None
  }

  /// Payload handed back to callers.
  fn get_data(&self, record: &Self::Record) -> Payload;

  /// Payload fields usable as facets.
  fn get_facets(&self) -> Vec<String> {
    Vec::new()
  }

  fn get_phrase_aliases(&self) -> AliasTable {
    AliasTable::new()
  }

  fn get_one_way_phrase_aliases(&self) -> AliasTable {
    AliasTable::new()
  }

  fn settings(&self) -> ProviderSettings {
    ProviderSettings::default()
  }
}

/// Records that carry their own identifier, such as database rows.
pub trait Identified {
  fn natural_id(&self) -> ItemId;
}

/// Paginated access to externally owned records.
pub trait RecordSource<R>: Send + Sync {
  /// Returns up to `limit` records starting at `offset`. A page shorter
  /// than `limit` ends the iteration.
  fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<R>>;
}

impl<R: Clone + Send + Sync> RecordSource<R> for Vec<R> {
  fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<R>> {
    Ok(self.iter().skip(offset).take(limit).cloned().collect())
  }
}

/// Everything the engine derives from a provider once, at construction.
#[derive(Debug, Clone)]
pub struct ProviderPlan {
  pub name: String,
  pub normalizer: Normalizer,
  pub aliases: PhraseAliases,
  pub facets: Vec<String>,
  pub settings: ProviderSettings,
  pub max_alias_expansions: usize,
}

impl ProviderPlan {
  pub fn compile(handle: &dyn ProviderHandle, settings: &Settings) -> Self {
    let provider_settings = handle.settings();
    let normalizer = Normalizer::new(&settings.join_chars, &settings.replaced_phrases)
      .with_replaced_phrases(&provider_settings.replaced_phrases);
    let aliases = PhraseAliases::compile(
      &handle.phrase_aliases(),
      &handle.one_way_phrase_aliases(),
      &normalizer,
    );

    Self {
      name: handle.provider_name().to_string(),
      normalizer,
      aliases,
      facets: handle.facets(),
      settings: provider_settings,
      max_alias_expansions: settings.max_alias_expansions,
    }
  }

  /// Normalized, de-duplicated spellings of the given raw terms, including
  /// bidirectional alias and join-character variations.
  pub fn index_terms(&self, raw_terms: &[String]) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for raw in raw_terms {
      let term = self.normalizer.normalize(raw);
      if term.is_empty() {
        continue;
      }
      for aliased in self.aliases.expand_term(&term, self.max_alias_expansions) {
        for variant in self.normalizer.variations(&aliased) {
          if !terms.contains(&variant) {
            terms.push(variant);
          }
        }
      }
    }
    terms
  }
}

/// Builds the index entry for one record, or `None` when it is excluded.
pub fn build_entry<P: Provider>(
  provider: &P,
  plan: &ProviderPlan,
  record: &P::Record,
  natural_id: impl FnOnce() -> ItemId,
) -> Option<IndexEntry> {
  if !provider.include_item(record) {
    return None;
  }

  let item_id = provider.get_item_id(record).unwrap_or_else(natural_id);
  let terms = plan.index_terms(&provider.get_terms(record));
  if terms.is_empty() {
    warn!(provider = %plan.name, item_id = %item_id, "skipping item without terms");
    return None;
  }

  let raw_score = provider.get_score(record);
  let score = match normalize_rounding(raw_score) {
    Ok(score) => score,
    Err(err) => {
      warn!(provider = %plan.name, item_id = %item_id, error = %err, "skipping item with invalid score");
      return None;
    }
  };

  let payload = provider.get_data(record);
  let facets = plan
    .facets
    .iter()
    .filter_map(|field| {
      let value = payload.get(field).and_then(scalar_string)?;
      Some((field.clone(), value))
    })
    .collect();

  Some(IndexEntry {
    item_id,
    score,
    payload,
    terms,
    facets,
  })
}

/// Object-safe view of a registered provider.
pub trait ProviderHandle: Send + Sync {
  fn provider_name(&self) -> &str;
  fn facets(&self) -> Vec<String>;
  fn phrase_aliases(&self) -> AliasTable;
  fn one_way_phrase_aliases(&self) -> AliasTable;
  fn settings(&self) -> ProviderSettings;

  /// Iterates the whole source and returns one entry per included record.
  /// Later duplicates of an item id replace earlier ones.
  fn collect_entries(&self, plan: &ProviderPlan) -> Result<Vec<IndexEntry>>;
}

/// A provider handle that can also index a single record on demand.
pub trait RecordHandle: ProviderHandle {
  type Record;

  /// Identifier the record is (or would be) indexed under.
  fn item_id(&self, record: &Self::Record) -> ItemId;

  fn entry_for(&self, plan: &ProviderPlan, record: &Self::Record) -> Option<IndexEntry>;
}

/// Provider over records fetched page by page from a [`RecordSource`].
pub struct ModelBacked<P: Provider> {
  provider: P,
  source: Arc<dyn RecordSource<P::Record>>,
  page_size: usize,
}

impl<P> ModelBacked<P>
where
  P: Provider,
  P::Record: Identified,
{
  pub fn new(provider: P, source: Arc<dyn RecordSource<P::Record>>) -> Self {
    Self {
      provider,
      source,
      page_size: 500,
    }
  }

  pub fn page_size(mut self, page_size: usize) -> Self {
    self.page_size = page_size.max(1);
    self
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }
}

impl<P> ProviderHandle for ModelBacked<P>
where
  P: Provider,
  P::Record: Identified,
{
  fn provider_name(&self) -> &str {
    self.provider.provider_name()
  }

  fn facets(&self) -> Vec<String> {
    self.provider.get_facets()
  }

  fn phrase_aliases(&self) -> AliasTable {
    self.provider.get_phrase_aliases()
  }

  fn one_way_phrase_aliases(&self) -> AliasTable {
    self.provider.get_one_way_phrase_aliases()
  }

  fn settings(&self) -> ProviderSettings {
    self.provider.settings()
  }

  fn collect_entries(&self, plan: &ProviderPlan) -> Result<Vec<IndexEntry>> {
    let mut entries = Vec::new();
    let mut offset = 0;
    loop {
      let page = self.source.fetch_page(offset, self.page_size)?;
      debug!(provider = %plan.name, offset, fetched = page.len(), "fetched record page");
      entries.extend(page.iter().filter_map(|record| self.entry_for(plan, record)));
      if page.len() < self.page_size {
        break;
      }
      offset += page.len();
    }
    Ok(dedupe(&plan.name, entries))
  }
}

impl<P> RecordHandle for ModelBacked<P>
where
  P: Provider,
  P::Record: Identified,
{
  type Record = P::Record;

  fn item_id(&self, record: &P::Record) -> ItemId {
    self
      .provider
      .get_item_id(record)
      .unwrap_or_else(|| record.natural_id())
  }

  fn entry_for(&self, plan: &ProviderPlan, record: &P::Record) -> Option<IndexEntry> {
    build_entry(&self.provider, plan, record, || record.natural_id())
  }
}

type DictIterator<R> = Arc<dyn Fn() -> Vec<(ItemId, R)> + Send + Sync>;

/// Provider over a fixed in-memory mapping. The mapping key is each
/// record's natural identifier.
pub struct DictBacked<P: Provider> {
  provider: P,
  entries: BTreeMap<ItemId, P::Record>,
  iterator: Option<DictIterator<P::Record>>,
}

impl<P> DictBacked<P>
where
  P: Provider,
  P::Record: Send + Sync,
{
  pub fn new(provider: P, entries: impl IntoIterator<Item = (ItemId, P::Record)>) -> Self {
    Self {
      provider,
      entries: entries.into_iter().collect(),
      iterator: None,
    }
  }

  /// Replaces the mapping as the iteration source.
  pub fn with_iterator(
    mut self,
    iterator: impl Fn() -> Vec<(ItemId, P::Record)> + Send + Sync + 'static,
  ) -> Self {
    self.iterator = Some(Arc::new(iterator));
    self
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }
}

impl<P> ProviderHandle for DictBacked<P>
where
  P: Provider,
  P::Record: Send + Sync,
{
  fn provider_name(&self) -> &str {
    self.provider.provider_name()
  }

  fn facets(&self) -> Vec<String> {
    self.provider.get_facets()
  }

  fn phrase_aliases(&self) -> AliasTable {
    self.provider.get_phrase_aliases()
  }

  fn one_way_phrase_aliases(&self) -> AliasTable {
    self.provider.get_one_way_phrase_aliases()
  }

  fn settings(&self) -> ProviderSettings {
    self.provider.settings()
  }

  fn collect_entries(&self, plan: &ProviderPlan) -> Result<Vec<IndexEntry>> {
    let entries = match &self.iterator {
      Some(iterator) => iterator()
        .iter()
        .filter_map(|record| self.entry_for(plan, record))
        .collect(),
      None => self
        .entries
        .iter()
        .filter_map(|(id, value)| build_entry(&self.provider, plan, value, || id.clone()))
        .collect(),
    };
    Ok(dedupe(&plan.name, entries))
  }
}

impl<P> RecordHandle for DictBacked<P>
where
  P: Provider,
  P::Record: Send + Sync,
{
  /// A mapping entry: natural identifier and value.
  type Record = (ItemId, P::Record);

  fn item_id(&self, record: &Self::Record) -> ItemId {
    let (id, value) = record;
    self.provider.get_item_id(value).unwrap_or_else(|| id.clone())
  }

  fn entry_for(&self, plan: &ProviderPlan, record: &Self::Record) -> Option<IndexEntry> {
    let (id, value) = record;
    build_entry(&self.provider, plan, value, || id.clone())
  }
}

fn dedupe(provider: &str, entries: Vec<IndexEntry>) -> Vec<IndexEntry> {
  let mut position: HashMap<ItemId, usize> = HashMap::with_capacity(entries.len());
  let mut unique: Vec<IndexEntry> = Vec::with_capacity(entries.len());
  for entry in entries {
    match position.get(&entry.item_id) {
      Some(&i) => {
        warn!(provider, item_id = %entry.item_id, "duplicate item id, keeping the later record");
        unique[i] = entry;
      }
      None => {
        position.insert(entry.item_id.clone(), unique.len());
        unique.push(entry);
      }
    }
  }
  unique
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[derive(Clone)]
  struct Row {
    id: u32,
    name: String,
    score: f64,
    hidden: bool,
  }

  impl Identified for Row {
    fn natural_id(&self) -> ItemId {
      self.id.to_string()
    }
  }

  struct RowProvider;

  impl Provider for RowProvider {
    type Record = Row;

    fn provider_name(&self) -> &str {
      "row"
    }

    fn get_term(&self, record: &Row) -> Option<String> {
      Some(record.name.clone())
    }

    fn get_score(&self, record: &Row) -> f64 {
      record.score
    }

    fn include_item(&self, record: &Row) -> bool {
      !record.hidden
    }

    fn get_data(&self, record: &Row) -> Payload {
      json!({"type": "row", "id": record.id, "display_name": record.name, "sector": "Energy"})
        .as_object()
        .cloned()
        .unwrap_or_default()
    }

    fn get_facets(&self) -> Vec<String> {
      vec!["sector".to_string()]
    }

    fn get_phrase_aliases(&self) -> AliasTable {
      AliasTable::new().alias("United States", "US")
    }
  }

  fn row(id: u32, name: &str, score: f64, hidden: bool) -> Row {
    Row {
      id,
      name: name.to_string(),
      score,
      hidden,
    }
  }

  fn model(rows: Vec<Row>) -> ModelBacked<RowProvider> {
    ModelBacked::new(RowProvider, Arc::new(rows)).page_size(2)
  }

  #[test]
  fn test_collects_across_pages() {
    let handle = model(vec![
      row(1, "Apple", 3.0, false),
      row(2, "Microsoft", 2.0, false),
      row(3, "Hidden Co", 1.0, true),
      row(4, "Oracle", 1.4, false),
    ]);
    let plan = ProviderPlan::compile(&handle, &Settings::default());
    let entries = handle.collect_entries(&plan).unwrap();

    let ids: Vec<_> = entries.iter().map(|e| e.item_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "4"]);
    assert_eq!(entries[2].score, 1);
    assert_eq!(entries[0].facets.get("sector").map(String::as_str), Some("Energy"));
  }

  #[test]
  fn test_skips_empty_terms_and_bad_scores() {
    let handle = model(vec![row(1, "[]", 1.0, false), row(2, "Valid", f64::NAN, false)]);
    let plan = ProviderPlan::compile(&handle, &Settings::default());
    assert!(handle.collect_entries(&plan).unwrap().is_empty());
  }

  #[test]
  fn test_index_terms_include_alias_and_join_variants() {
    let handle = model(Vec::new());
    let plan = ProviderPlan::compile(&handle, &Settings::default());
    let terms = plan.index_terms(&["US Real-Time GDP".to_string()]);
    assert_eq!(terms[0], "us real-time gdp");
    assert!(terms.contains(&"united states real-time gdp".to_string()));
    assert!(terms.contains(&"us realtime gdp".to_string()));
    assert!(terms.contains(&"united states real time gdp".to_string()));
  }

  struct LabelProvider;

  impl Provider for LabelProvider {
    type Record = String;

    fn provider_name(&self) -> &str {
      "label"
    }

    fn get_term(&self, record: &String) -> Option<String> {
      Some(record.clone())
    }

    fn get_data(&self, record: &String) -> Payload {
      json!({"display_name": record}).as_object().cloned().unwrap_or_default()
    }
  }

  #[test]
  fn test_dict_backed_uses_keys_and_iterator_override() {
    let handle = DictBacked::new(
      LabelProvider,
      [("pe".to_string(), "Price to Earnings".to_string())],
    );
    let plan = ProviderPlan::compile(&handle, &Settings::default());
    let entries = handle.collect_entries(&plan).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].item_id, "pe");

    let handle = handle.with_iterator(|| {
      vec![
        ("a".to_string(), "Alpha".to_string()),
        ("a".to_string(), "Alpha Prime".to_string()),
      ]
    });
    let entries = handle.collect_entries(&plan).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].terms[0], "alpha prime");
  }
}
