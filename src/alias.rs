//! Phrase aliases.
//!
//! Providers declare two kinds of alias tables:
//!
//! - **Bidirectional** aliases make every phrase of a group substitutable for
//!   every other one. They are applied to indexed terms only: a term is
//!   stored under every spelling, so a query in any spelling finds it
//!   without being rewritten.
//! - **One-way** aliases let a query for one phrase also match content that
//!   contains another, never the reverse. They are applied to queries only.
//!
//! Keeping the two sides apart means a substitution is never applied on top
//! of another one, so groups that share a phrase ("California" and "Canada"
//! both abbreviated "CA") stay separate.
//!
//! Both tables are written with raw phrases and compiled into a
//! [`PhraseAliases`] with the provider's [`Normalizer`], so substitution works
//! on normalized, whitespace-delimited text.

use crate::normalize::Normalizer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One phrase, or a list of phrases, an alias key stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasTarget {
  One(String),
  Many(Vec<String>),
}

impl AliasTarget {
  fn phrases(&self) -> &[String] {
    match self {
      AliasTarget::One(phrase) => std::slice::from_ref(phrase),
      AliasTarget::Many(phrases) => phrases,
    }
  }
}

impl From<&str> for AliasTarget {
  fn from(phrase: &str) -> Self {
    AliasTarget::One(phrase.to_string())
  }
}

impl From<String> for AliasTarget {
  fn from(phrase: String) -> Self {
    AliasTarget::One(phrase)
  }
}

impl From<Vec<&str>> for AliasTarget {
  fn from(phrases: Vec<&str>) -> Self {
    AliasTarget::Many(phrases.into_iter().map(str::to_string).collect())
  }
}

impl<const N: usize> From<[&str; N]> for AliasTarget {
  fn from(phrases: [&str; N]) -> Self {
    AliasTarget::Many(phrases.iter().map(|p| p.to_string()).collect())
  }
}

/// A raw alias table as a provider declares it.
///
/// Deserializes from a JSON object such as
/// `{"United States": ["US", "USA"], "Gross Domestic Product": "GDP"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable(BTreeMap<String, AliasTarget>);

impl AliasTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds an alias entry, replacing any previous entry for `phrase`.
  pub fn alias(mut self, phrase: impl Into<String>, target: impl Into<AliasTarget>) -> Self {
    self.0.insert(phrase.into(), target.into());
    self
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &AliasTarget)> {
    self.0.iter()
  }
}

/// Compiled alias tables over normalized phrases.
#[derive(Debug, Clone, Default)]
pub struct PhraseAliases {
  /// Phrase to the phrases it may be swapped with, in both directions.
  bidirectional: BTreeMap<String, Vec<String>>,
  /// One-way entries, used for queries.
  query: BTreeMap<String, Vec<String>>,
}

impl PhraseAliases {
  /// Normalizes and compiles the two raw tables.
  ///
  /// A bidirectional key and its targets form one group in which every
  /// member aliases every other member. Phrases that normalize to nothing
  /// are dropped.
  pub fn compile(bidirectional: &AliasTable, one_way: &AliasTable, normalizer: &Normalizer) -> Self {
    let mut two_way: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, target) in bidirectional.iter() {
      let mut group: Vec<String> = Vec::new();
      for phrase in std::iter::once(key).chain(target.phrases()) {
        let phrase = normalizer.normalize(phrase);
        if !phrase.is_empty() && !group.contains(&phrase) {
          group.push(phrase);
        }
      }
      for member in &group {
        let subs = two_way.entry(member.clone()).or_default();
        for other in group.iter().filter(|other| *other != member) {
          push_unique(subs, other);
        }
      }
    }
    two_way.retain(|_, subs| !subs.is_empty());

    let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, target) in one_way.iter() {
      let key = normalizer.normalize(key);
      if key.is_empty() {
        continue;
      }
      for phrase in target.phrases() {
        let phrase = normalizer.normalize(phrase);
        if !phrase.is_empty() && phrase != key {
          push_unique(query.entry(key.clone()).or_default(), &phrase);
        }
      }
    }

    Self {
      bidirectional: two_way,
      query,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.bidirectional.is_empty() && self.query.is_empty()
  }

  /// Spellings under which an indexed term is stored. The term comes first.
  pub fn expand_term(&self, term: &str, max_variants: usize) -> Vec<String> {
    expand(&self.bidirectional, term, max_variants)
  }

  /// Query variants to try. The query itself comes first.
  pub fn expand_query(&self, query: &str, max_variants: usize) -> Vec<String> {
    expand(&self.query, query, max_variants)
  }
}

/// Substitutes every aliased phrase found in `text`, independently, and
/// returns the distinct results capped at `max_variants`.
///
/// Only phrases present in the original text are substituted, so an alias
/// that was just introduced is never swapped back.
fn expand(table: &BTreeMap<String, Vec<String>>, text: &str, max_variants: usize) -> Vec<String> {
  let mut variants = vec![text.to_string()];
  let max_variants = max_variants.max(1);
  if table.is_empty() || text.is_empty() {
    return variants;
  }

  let padded = format!(" {text} ");
  for (phrase, subs) in table {
    let needle = format!(" {phrase} ");
    if !padded.contains(&needle) {
      continue;
    }

    let existing = variants.len();
    for i in 0..existing {
      let current = format!(" {} ", variants[i]);
      if !current.contains(&needle) {
        continue;
      }
      for sub in subs {
        if variants.len() >= max_variants {
          return variants;
        }
        let replaced = current.replace(&needle, &format!(" {sub} "));
        let replaced = replaced.trim().to_string();
        if !variants.contains(&replaced) {
          variants.push(replaced);
        }
      }
    }
  }
  variants
}

fn push_unique(list: &mut Vec<String>, value: &str) {
  if !list.iter().any(|v| v == value) {
    list.push(value.to_string());
  }
}
