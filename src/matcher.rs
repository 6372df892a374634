//! The match engine.
//!
//! A query is normalized with the provider's normalizer, expanded into its
//! one-way alias variants, and each variant is answered from the index.
//! Bidirectional aliases were already applied when the terms were stored.
//!
//! 1. **In order** (default): the normalized variant must be a prefix of a
//!    term, starting at any word boundary of that term. Every word except the
//!    last must therefore match a whole word, in order; the last may be
//!    partial.
//! 2. **Out of order**: every token of the variant must be a prefix of some
//!    word of the same term, in any order.
//!
//! Candidates are read from the posting list of the variant (in order) or of
//! its longest token (out of order), which the index already yields best
//! score first. Each candidate is then verified against its stored terms and
//! the facet filter, and scanning stops once a variant has produced enough
//! matches. Variants are OR-ed together, providers are merged by score.

use crate::error::Result;
use crate::facets::{facets_match, FacetGroup};
use crate::index::store::{IndexStore, Postings};
use crate::normalize::word_suffixes;
use crate::provider::ProviderPlan;
use crate::settings::Settings;
use crate::types::{IndexEntry, Suggestion};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// Token matching semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
  InOrder,
  OutOfOrder,
}

/// Executes queries against the postings of one provider at a time.
#[derive(Debug, Clone)]
pub struct MatchEngine {
  mode: MatchMode,
  move_exact_matches_to_top: bool,
}

/// What a single provider is asked for.
pub struct ProviderQuery<'a> {
  pub config: &'a str,
  pub plan: &'a ProviderPlan,
  pub raw_query: &'a str,
  pub facets: Option<&'a [FacetGroup]>,
  pub limit: usize,
}

impl MatchEngine {
  pub fn new(settings: &Settings) -> Self {
    Self {
      mode: if settings.match_out_of_order {
        MatchMode::OutOfOrder
      } else {
        MatchMode::InOrder
      },
      move_exact_matches_to_top: settings.move_exact_matches_to_top,
    }
  }

  pub fn mode(&self) -> MatchMode {
    self.mode
  }

  /// Returns up to `limit` suggestions from one provider, best first.
  pub fn match_provider(&self, store: &IndexStore, query: &ProviderQuery<'_>) -> Result<Vec<Suggestion>> {
    let Some((variants, limit)) = self.prepare(query) else {
      return Ok(Vec::new());
    };
    let facets = self.effective_facets(query);

    let mut exact: Vec<Suggestion> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    if self.move_exact_matches_to_top {
      exact = self.collect_exact(store, query, &variants, facets, limit, &mut seen)?;
    }

    let mut prefixed: Vec<Suggestion> = Vec::new();
    for variant in &variants {
      let tokens: Vec<&str> = variant.split(' ').collect();
      let postings = match self.mode {
        MatchMode::InOrder => store.prefix_postings(query.config, &query.plan.name, variant),
        MatchMode::OutOfOrder => {
          let driver = tokens
            .iter()
            .copied()
            .max_by_key(|token| token.len())
            .unwrap_or(variant.as_str());
          store.prefix_postings(query.config, &query.plan.name, driver)
        }
      };

      let mut matched = 0;
      for posting in postings {
        if matched >= limit {
          break;
        }
        let posting = posting?;
        if exact.iter().any(|s| s.item_id == posting.item_id) {
          matched += 1;
          continue;
        }
        let Some(entry) = store.get_entry(query.config, &query.plan.name, &posting.item_id)? else {
          continue;
        };
        if !self.term_matches(&entry, variant, &tokens) || !passes(&entry, facets) {
          continue;
        }
        matched += 1;
        if seen.insert(entry.item_id.clone()) {
          let is_exact = entry.terms.iter().any(|term| term == variant);
          prefixed.push(into_suggestion(&query.plan.name, entry, is_exact));
        }
      }
    }

    prefixed.sort_by(by_score);
    exact.extend(prefixed);
    exact.truncate(limit);
    debug!(
      provider = %query.plan.name,
      variants = variants.len(),
      results = exact.len(),
      "matched provider"
    );
    Ok(exact)
  }

  /// Returns up to `limit` items whose term equals the query, best first.
  pub fn exact_provider(&self, store: &IndexStore, query: &ProviderQuery<'_>) -> Result<Vec<Suggestion>> {
    let Some((variants, limit)) = self.prepare(query) else {
      return Ok(Vec::new());
    };
    let facets = self.effective_facets(query);
    let mut seen = HashSet::new();
    self.collect_exact(store, query, &variants, facets, limit, &mut seen)
  }

  /// Merges per-provider lists, given in registration order, into one
  /// ranked list of at most `limit` suggestions.
  pub fn merge(&self, per_provider: Vec<Vec<Suggestion>>, limit: usize) -> Vec<Suggestion> {
    let mut merged: Vec<Suggestion> = per_provider.into_iter().flatten().collect();
    let move_exact = self.move_exact_matches_to_top;
    // Stable: equal scores keep provider registration order.
    merged.sort_by(|a, b| {
      let exact = if move_exact {
        b.exact.cmp(&a.exact)
      } else {
        Ordering::Equal
      };
      exact.then_with(|| b.score.cmp(&a.score))
    });
    merged.truncate(limit);
    merged
  }

  /// Normalized one-way alias variants and the provider's effective limit, or
  /// `None` when the provider has nothing to say about this query.
  fn prepare(&self, query: &ProviderQuery<'_>) -> Option<(Vec<String>, usize)> {
    let plan = query.plan;
    let normalized = plan.normalizer.normalize(query.raw_query);
    if normalized.is_empty() {
      return None;
    }
    if let Some(min_letters) = plan.settings.min_letters {
      if normalized.chars().count() < min_letters {
        return None;
      }
    }

    let limit = plan
      .settings
      .max_results
      .map_or(query.limit, |max| max.min(query.limit));
    if limit == 0 {
      return None;
    }
    Some((plan.aliases.expand_query(&normalized, plan.max_alias_expansions), limit))
  }

  /// Facet filters only narrow providers that declare facet fields.
  fn effective_facets<'a>(&self, query: &ProviderQuery<'a>) -> Option<&'a [FacetGroup]> {
    query
      .facets
      .filter(|groups| !groups.is_empty() && !query.plan.facets.is_empty())
  }

  fn collect_exact(
    &self,
    store: &IndexStore,
    query: &ProviderQuery<'_>,
    variants: &[String],
    facets: Option<&[FacetGroup]>,
    limit: usize,
    seen: &mut HashSet<String>,
  ) -> Result<Vec<Suggestion>> {
    let mut found = Vec::new();
    for variant in variants {
      let postings: Postings<'_> = store.exact_postings(query.config, &query.plan.name, variant);
      let mut matched = 0;
      for posting in postings {
        if matched >= limit {
          break;
        }
        let posting = posting?;
        let Some(entry) = store.get_entry(query.config, &query.plan.name, &posting.item_id)? else {
          continue;
        };
        if !passes(&entry, facets) {
          continue;
        }
        matched += 1;
        if seen.insert(entry.item_id.clone()) {
          found.push(into_suggestion(&query.plan.name, entry, true));
        }
      }
    }
    found.sort_by(by_score);
    found.truncate(limit);
    Ok(found)
  }

  fn term_matches(&self, entry: &IndexEntry, variant: &str, tokens: &[&str]) -> bool {
    match self.mode {
      MatchMode::InOrder => entry
        .terms
        .iter()
        .any(|term| word_suffixes(term).any(|tail| tail.starts_with(variant))),
      MatchMode::OutOfOrder => entry.terms.iter().any(|term| {
        tokens
          .iter()
          .all(|token| term.split(' ').any(|word| word.starts_with(token)))
      }),
    }
  }
}

fn passes(entry: &IndexEntry, facets: Option<&[FacetGroup]>) -> bool {
  facets.map_or(true, |groups| facets_match(groups, &entry.facets))
}

fn by_score(a: &Suggestion, b: &Suggestion) -> Ordering {
  b.score.cmp(&a.score).then_with(|| a.item_id.cmp(&b.item_id))
}

fn into_suggestion(provider: &str, entry: IndexEntry, exact: bool) -> Suggestion {
  Suggestion {
    provider: provider.to_string(),
    item_id: entry.item_id,
    score: entry.score,
    exact,
    payload: entry.payload,
  }
}
