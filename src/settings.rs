//! Configuration surface.
//!
//! [`Settings`] is loaded once and handed to the engine at construction.
//! It is never mutated afterwards: a test that needs another matching mode
//! builds a second engine.

use crate::error::Result;
use crate::normalize::DEFAULT_JOIN_CHARS;
use serde::{Deserialize, Serialize};

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
  /// When true, query tokens may match an indexed term's words in any order.
  #[serde(default)]
  pub match_out_of_order: bool,
  /// Result count used when a query does not pass its own limit.
  #[serde(default = "default_max_results")]
  pub max_results: usize,
  /// List items whose term equals the query ahead of prefix matches.
  #[serde(default)]
  pub move_exact_matches_to_top: bool,
  /// Characters kept inside terms and expanded into variations at index time.
  #[serde(default = "default_join_chars")]
  pub join_chars: Vec<String>,
  /// Phrases removed from every term and query.
  #[serde(default)]
  pub replaced_phrases: Vec<String>,
  /// Longest prefix, in characters, materialized in the index. Longer
  /// queries scan this prefix and verify the rest against stored terms.
  #[serde(default = "default_max_prefix_length")]
  pub max_prefix_length: usize,
  /// Upper bound on alias variants produced for one term or query.
  #[serde(default = "default_max_alias_expansions")]
  pub max_alias_expansions: usize,
  #[serde(default = "default_true")]
  pub cache_enabled: bool,
  /// Number of cached result lists kept before the cache is flushed.
  #[serde(default = "default_cache_capacity")]
  pub cache_capacity: usize,
}

fn default_max_results() -> usize {
  10
}

fn default_join_chars() -> Vec<String> {
  DEFAULT_JOIN_CHARS.iter().map(|c| c.to_string()).collect()
}

fn default_max_prefix_length() -> usize {
  20
}

fn default_max_alias_expansions() -> usize {
  16
}

fn default_true() -> bool {
  true
}

fn default_cache_capacity() -> usize {
  1024
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      match_out_of_order: false,
      max_results: default_max_results(),
      move_exact_matches_to_top: false,
      join_chars: default_join_chars(),
      replaced_phrases: Vec::new(),
      max_prefix_length: default_max_prefix_length(),
      max_alias_expansions: default_max_alias_expansions(),
      cache_enabled: true,
      cache_capacity: default_cache_capacity(),
    }
  }
}

impl Settings {
  /// Loads settings from a JSON document. Missing keys take their defaults.
  pub fn from_json(json: &str) -> Result<Self> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn match_out_of_order(mut self, enabled: bool) -> Self {
    self.match_out_of_order = enabled;
    self
  }

  pub fn max_results(mut self, max_results: usize) -> Self {
    self.max_results = max_results;
    self
  }

  pub fn move_exact_matches_to_top(mut self, enabled: bool) -> Self {
    self.move_exact_matches_to_top = enabled;
    self
  }

  pub fn replaced_phrases(mut self, phrases: Vec<String>) -> Self {
    self.replaced_phrases = phrases;
    self
  }

  pub fn max_prefix_length(mut self, length: usize) -> Self {
    self.max_prefix_length = length.max(1);
    self
  }

  pub fn cache_enabled(mut self, enabled: bool) -> Self {
    self.cache_enabled = enabled;
    self
  }
}

/// Per-provider overrides. Unset fields fall back to [`Settings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
  /// Most results this provider may contribute to one merged result.
  #[serde(default)]
  pub max_results: Option<usize>,
  /// Queries shorter than this many characters skip the provider.
  #[serde(default)]
  pub min_letters: Option<usize>,
  /// Phrases removed from this provider's terms and queries, on top of the
  /// engine-wide list.
  #[serde(default)]
  pub replaced_phrases: Vec<String>,
}

impl ProviderSettings {
  pub fn max_results(mut self, max_results: usize) -> Self {
    self.max_results = Some(max_results);
    self
  }

  pub fn min_letters(mut self, min_letters: usize) -> Self {
    self.min_letters = Some(min_letters);
    self
  }
}
