//! Term normalization.
//!
//! Every string that enters the index, and every query that reads from it,
//! goes through the same [`Normalizer`] so that the two sides compare equal.
//! A normalized term is lowercase, free of punctuation other than the
//! configured join characters, and uses single spaces between words.

use crate::error::{AutocompleteError, Result};
use serde_json::Value;
use std::borrow::Cow;
use unicode_segmentation::UnicodeSegmentation;

/// Join characters kept by [`get_normalized_term`].
pub const DEFAULT_JOIN_CHARS: &[&str] = &["-", "/"];

/// Normalizes raw text into comparable terms.
#[derive(Debug, Clone)]
pub struct Normalizer {
  join_chars: Vec<char>,
  replaced_phrases: Vec<String>,
}

impl Default for Normalizer {
  fn default() -> Self {
    Self::new(DEFAULT_JOIN_CHARS, &[] as &[&str])
  }
}

impl Normalizer {
  /// Creates a normalizer.
  ///
  /// Only the first character of each join entry is used. Replaced phrases
  /// are lowercased and blank ones are ignored.
  pub fn new<J: AsRef<str>, P: AsRef<str>>(join_chars: &[J], replaced_phrases: &[P]) -> Self {
    Self {
      join_chars: join_chars
        .iter()
        .filter_map(|j| j.as_ref().chars().next())
        .collect(),
      replaced_phrases: replaced_phrases
        .iter()
        .map(|p| p.as_ref().to_lowercase())
        .filter(|p| !p.trim().is_empty())
        .collect(),
    }
  }

  /// Returns a copy of this normalizer that additionally removes `phrases`.
  pub fn with_replaced_phrases<P: AsRef<str>>(&self, phrases: &[P]) -> Self {
    let mut next = self.clone();
    for phrase in phrases {
      let phrase = phrase.as_ref().to_lowercase();
      if !phrase.trim().is_empty() && !next.replaced_phrases.contains(&phrase) {
        next.replaced_phrases.push(phrase);
      }
    }
    next
  }

  /// Normalizes text or UTF-8 bytes.
  ///
  /// Invalid UTF-8 sequences are replaced with U+FFFD, which the punctuation
  /// pass then drops.
  pub fn normalize(&self, raw: impl AsRef<[u8]>) -> String {
    let text: Cow<'_, str> = String::from_utf8_lossy(raw.as_ref());
    let lowered = text.to_lowercase().replace('&', " and ");

    let mut cleaned = String::with_capacity(lowered.len());
    for grapheme in lowered.graphemes(true) {
      let Some(first) = grapheme.chars().next() else {
        continue;
      };
      if first.is_whitespace() {
        cleaned.push(' ');
      } else if first.is_alphanumeric() || self.join_chars.contains(&first) {
        cleaned.push_str(grapheme);
      }
    }

    // Removing a phrase can expose another one, so run to a fixpoint.
    let mut term = collapse_whitespace(&cleaned);
    loop {
      let mut next = term.clone();
      for phrase in &self.replaced_phrases {
        while next.contains(phrase.as_str()) {
          next = next.replace(phrase.as_str(), "");
        }
      }
      let next = collapse_whitespace(&next);
      if next == term {
        return term;
      }
      term = next;
    }
  }

  /// Returns the indexable spellings of an already normalized term.
  ///
  /// The term itself always comes first. When it contains join characters
  /// it is also returned with them removed and with them turned into spaces.
  pub fn variations(&self, term: &str) -> Vec<String> {
    let mut out = vec![term.to_string()];
    if !term.chars().any(|c| self.join_chars.contains(&c)) {
      return out;
    }

    let joined: String = term.chars().filter(|c| !self.join_chars.contains(c)).collect();
    let spaced: String = term
      .chars()
      .map(|c| if self.join_chars.contains(&c) { ' ' } else { c })
      .collect();

    for variant in [collapse_whitespace(&joined), collapse_whitespace(&spaced)] {
      if !variant.is_empty() && !out.contains(&variant) {
        out.push(variant);
      }
    }
    out
  }
}

/// Normalizes `raw` with the default join characters.
///
/// # Examples
///
/// ```
/// use autocompleter::normalize::get_normalized_term;
///
/// assert_eq!(get_normalized_term(b"US GDP", &[] as &[&str]), "us gdp");
/// assert_eq!(get_normalized_term("Non Percent Change", &["non"]), "percent change");
/// ```
pub fn get_normalized_term<P: AsRef<str>>(raw: impl AsRef<[u8]>, replaced_chars: &[P]) -> String {
  Normalizer::new(DEFAULT_JOIN_CHARS, replaced_chars).normalize(raw)
}

/// Rounds to the nearest integer, with halves rounded away from zero.
///
/// Accepts anything convertible into a JSON value so that absent values
/// (`None`, `null`) and non-numeric values are rejected instead of coerced.
pub fn normalize_rounding(value: impl Into<Value>) -> Result<i64> {
  let value = value.into();
  if let Some(n) = value.as_i64() {
    return Ok(n);
  }

  let x = value
    .as_f64()
    .ok_or_else(|| AutocompleteError::InvalidNumber(value.to_string()))?;
  let rounded = x.round();
  if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
    return Err(AutocompleteError::InvalidNumber(value.to_string()));
  }
  Ok(rounded as i64)
}

/// Returns every word-aligned tail of a normalized term, longest first.
///
/// `"consumer price index"` yields the whole term, `"price index"` and
/// `"index"`.
pub fn word_suffixes(term: &str) -> impl Iterator<Item = &str> {
  std::iter::once(0)
    .chain(term.match_indices(' ').map(|(i, _)| i + 1))
    .map(move |start| &term[start..])
    .filter(|tail| !tail.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}
