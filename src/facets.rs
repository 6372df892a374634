//! Facet filter trees.
//!
//! A facet filter is a list of groups. Each group combines its sub-facets
//! with `and` or `or`, and the groups themselves are combined with an
//! implicit `and`. Trees usually arrive as JSON from an outer layer, so
//! [`parse_facets`] works on `serde_json::Value` and reports why a tree was
//! rejected.

use crate::error::{AutocompleteError, Result};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// How a group combines its sub-facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetKind {
  And,
  Or,
}

/// A single `key == value` condition on a payload field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facet {
  pub key: String,
  pub value: String,
}

impl Facet {
  pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      value: value.into(),
    }
  }
}

/// A group of sub-facets joined by one combinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetGroup {
  #[serde(rename = "type")]
  pub kind: FacetKind,
  pub facets: Vec<Facet>,
}

impl FacetGroup {
  pub fn and(facets: Vec<Facet>) -> Self {
    Self {
      kind: FacetKind::And,
      facets,
    }
  }

  pub fn or(facets: Vec<Facet>) -> Self {
    Self {
      kind: FacetKind::Or,
      facets,
    }
  }

  /// Tests the group against an item's facet values.
  pub fn matches(&self, values: &BTreeMap<String, String>) -> bool {
    let hit = |facet: &Facet| values.get(&facet.key) == Some(&facet.value);
    match self.kind {
      FacetKind::And => self.facets.iter().all(hit),
      FacetKind::Or => self.facets.iter().any(hit),
    }
  }
}

/// True when every group matches.
pub fn facets_match(groups: &[FacetGroup], values: &BTreeMap<String, String>) -> bool {
  groups.iter().all(|group| group.matches(values))
}

/// Parses a JSON facet tree.
///
/// Every group needs a `type` of `"and"` or `"or"` and a non-empty `facets`
/// list, and every sub-facet needs both `key` and `value`. Scalar values
/// (strings, numbers, booleans) are accepted and compared as strings.
pub fn parse_facets(tree: &Value) -> Result<Vec<FacetGroup>> {
  let groups = tree
    .as_array()
    .ok_or_else(|| invalid("facets must be a list of groups"))?;

  groups
    .iter()
    .enumerate()
    .map(|(i, group)| {
      let group = group
        .as_object()
        .ok_or_else(|| invalid(format!("group {i} is not an object")))?;

      let kind = match group.get("type").and_then(Value::as_str) {
        Some("and") => FacetKind::And,
        Some("or") => FacetKind::Or,
        Some(other) => return Err(invalid(format!("group {i} has unknown type `{other}`"))),
        None => return Err(invalid(format!("group {i} has no type"))),
      };

      let subs = group
        .get("facets")
        .and_then(Value::as_array)
        .filter(|subs| !subs.is_empty())
        .ok_or_else(|| invalid(format!("group {i} has no sub-facets")))?;

      let facets = subs
        .iter()
        .enumerate()
        .map(|(j, sub)| {
          let key = sub.get("key").and_then(scalar_string);
          let value = sub.get("value").and_then(scalar_string);
          match (key, value) {
            (Some(key), Some(value)) => Ok(Facet { key, value }),
            (None, _) => Err(invalid(format!("sub-facet {j} of group {i} has no key"))),
            (_, None) => Err(invalid(format!("sub-facet {j} of group {i} has no value"))),
          }
        })
        .collect::<Result<Vec<_>>>()?;

      Ok(FacetGroup { kind, facets })
    })
    .collect()
}

/// Checks a tree built in code against the rules [`parse_facets`] enforces.
pub fn check_facets(groups: &[FacetGroup]) -> Result<()> {
  for (i, group) in groups.iter().enumerate() {
    if group.facets.is_empty() {
      return Err(invalid(format!("group {i} has no sub-facets")));
    }
  }
  Ok(())
}

/// Validation rule used by request handlers before a tree reaches matching.
pub fn validate_facets(tree: &Value) -> bool {
  parse_facets(tree).is_ok()
}

/// Stable cache key for a facet tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacetHash(String);

impl FacetHash {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for FacetHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Hashes a facet tree.
///
/// Group order and each group's combinator are significant. Within a group
/// the sub-facets are treated as a set, so their order does not matter.
pub fn hash_facets(groups: &[FacetGroup]) -> FacetHash {
  let canonical: Vec<(FacetKind, BTreeSet<(&str, &str)>)> = groups
    .iter()
    .map(|group| {
      let subs = group
        .facets
        .iter()
        .map(|facet| (facet.key.as_str(), facet.value.as_str()))
        .collect();
      (group.kind, subs)
    })
    .collect();

  let mut hasher = Sha256::new();
  for (kind, subs) in &canonical {
    hasher.update(match kind {
      FacetKind::And => b"and",
      FacetKind::Or => b"or\0",
    });
    hasher.update((subs.len() as u64).to_be_bytes());
    for (key, value) in subs {
      hasher.update((key.len() as u64).to_be_bytes());
      hasher.update(key.as_bytes());
      hasher.update((value.len() as u64).to_be_bytes());
      hasher.update(value.as_bytes());
    }
  }
  FacetHash(hex::encode(hasher.finalize()))
}

pub(crate) fn scalar_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn invalid(reason: impl Into<String>) -> AutocompleteError {
  AutocompleteError::InvalidFacets(reason.into())
}
