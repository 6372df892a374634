//! Core data types for the autocompleter.

use crate::facets::FacetGroup;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Type alias for item identifiers.
///
/// Identifiers are unique within one provider's indexed set.
pub type ItemId = String;

/// The free-form data returned to callers for one item.
///
/// Providers are expected to include at least `type`, `id`, `score` and
/// `display_name`.
pub type Payload = Map<String, Value>;

/// Ranking score after rounding. Higher ranks first.
pub type Score = i64;

/// The indexed unit for one source object under one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
  pub item_id: ItemId,
  pub score: Score,
  pub payload: Payload,
  /// Normalized spellings of every term, including join and alias variants.
  pub terms: Vec<String>,
  /// Values of the provider's declared facet fields, taken from the payload.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub facets: BTreeMap<String, String>,
}

/// One ranked result of a `suggest` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
  /// Name of the provider that produced the item.
  pub provider: String,
  pub item_id: ItemId,
  pub score: Score,
  /// True when the query equals one of the item's terms.
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub exact: bool,
  pub payload: Payload,
}

impl Suggestion {
  pub fn into_payload(self) -> Payload {
    self.payload
  }
}

/// Options for a single `suggest` call.
#[derive(Debug, Clone, Default)]
pub struct SuggestOptions {
  /// Maximum number of results. `None` uses the engine's `max_results`.
  pub limit: Option<usize>,
  /// Facet filter narrowing the results.
  pub facets: Option<Vec<FacetGroup>>,
}

impl SuggestOptions {
  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn facets(mut self, facets: Vec<FacetGroup>) -> Self {
    self.facets = Some(facets);
    self
  }
}
