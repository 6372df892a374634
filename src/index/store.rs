//! The autocomplete index laid out over a [`KvStore`].
//!
//! Keys are grouped by configuration, then by provider, so builds for
//! different configurations never touch each other's keys:
//!
//! ```text
//! {config}␟␟built                                  marker written by a full build
//! {config}␟{provider}␟i␟{item_id}                   JSON-encoded IndexEntry
//! {config}␟{provider}␟p␟{prefix}␟{rank}␟{item_id}   prefix posting
//! {config}␟{provider}␟x␟{term}␟{rank}␟{item_id}     exact-term posting
//! ```
//!
//! `rank` is a fixed-width encoding of the score that sorts in descending
//! score order, so a prefix scan yields postings best first, with ties in
//! ascending item id order.

use crate::error::{AutocompleteError, Result};
use crate::index::adapter::{KvStore, WriteBatch};
use crate::normalize::word_suffixes;
use crate::types::{IndexEntry, ItemId, Score};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

/// Separator between key segments. Normalized text never contains it.
pub const KEY_SEPARATOR: char = '\u{1f}';

const SCAN_PAGE: usize = 64;
const RANK_WIDTH: usize = 16;

/// One posting read back from the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub item_id: ItemId,
    pub score: Score,
}

/// Index Store over a shared key-value backend.
#[derive(Clone)]
pub struct IndexStore {
    kv: Arc<dyn KvStore>,
    max_prefix_length: usize,
}

impl IndexStore {
    pub fn new(kv: Arc<dyn KvStore>, max_prefix_length: usize) -> Self {
        Self {
            kv,
            max_prefix_length: max_prefix_length.max(1),
        }
    }

    pub fn max_prefix_length(&self) -> usize {
        self.max_prefix_length
    }

    /// Inserts an entry, replacing whatever was indexed under its id.
    pub fn store(&self, config: &str, provider: &str, entry: &IndexEntry) -> Result<()> {
        let mut batch = WriteBatch::new();
        if let Some(old) = self.get_entry(config, provider, &entry.item_id)? {
            for key in self.posting_keys(config, provider, &old) {
                batch.delete(key);
            }
        }
        self.put_entry(&mut batch, config, provider, entry)?;
        self.kv.write(batch)
    }

    /// Removes one item. Returns false when it was not indexed.
    pub fn remove(&self, config: &str, provider: &str, item_id: &str) -> Result<bool> {
        let Some(old) = self.get_entry(config, provider, item_id)? else {
            return Ok(false);
        };

        let mut batch = WriteBatch::new();
        for key in self.posting_keys(config, provider, &old) {
            batch.delete(key);
        }
        batch.delete(item_key(config, provider, item_id));
        self.kv.write(batch)?;
        Ok(true)
    }

    /// Replaces the whole index of a configuration in one batch.
    ///
    /// Readers see either the previous index or the new one, never an empty
    /// or half-written namespace. Returns the number of entries written.
    pub fn replace_all(&self, config: &str, providers: &[(String, Vec<IndexEntry>)]) -> Result<usize> {
        let mut batch = WriteBatch::new();
        batch.clear_prefix(config_prefix(config));

        let mut written = 0;
        for (provider, entries) in providers {
            for entry in entries {
                self.put_entry(&mut batch, config, provider, entry)?;
                written += 1;
            }
        }
        batch.put(built_key(config), Vec::new());

        self.kv.write(batch)?;
        Ok(written)
    }

    /// Deletes everything indexed for a configuration.
    pub fn clear(&self, config: &str) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.clear_prefix(config_prefix(config));
        self.kv.write(batch)
    }

    pub fn is_built(&self, config: &str) -> Result<bool> {
        Ok(self.kv.get(&built_key(config))?.is_some())
    }

    pub fn get_entry(&self, config: &str, provider: &str, item_id: &str) -> Result<Option<IndexEntry>> {
        let key = item_key(config, provider, item_id);
        match self.kv.get(&key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| AutocompleteError::CorruptRecord { key, source }),
            None => Ok(None),
        }
    }

    /// Postings of every item with a term word-suffix starting with `prefix`.
    ///
    /// Prefixes longer than the indexed maximum are truncated, so callers
    /// must verify candidates against the stored terms in that case.
    pub fn prefix_postings(&self, config: &str, provider: &str, prefix: &str) -> Postings<'_> {
        let prefix: String = prefix.chars().take(self.max_prefix_length).collect();
        Postings::new(self.kv.as_ref(), posting_prefix(config, provider, 'p', prefix.trim_end()))
    }

    /// Postings of every item with a term exactly equal to `term`.
    pub fn exact_postings(&self, config: &str, provider: &str, term: &str) -> Postings<'_> {
        Postings::new(self.kv.as_ref(), posting_prefix(config, provider, 'x', term))
    }

    fn put_entry(&self, batch: &mut WriteBatch, config: &str, provider: &str, entry: &IndexEntry) -> Result<()> {
        let key = item_key(config, provider, &entry.item_id);
        let value = serde_json::to_vec(entry)
            .map_err(|source| AutocompleteError::CorruptRecord { key: key.clone(), source })?;
        batch.put(key, value);
        for posting in self.posting_keys(config, provider, entry) {
            batch.put(posting, Vec::new());
        }
        Ok(())
    }

    fn posting_keys(&self, config: &str, provider: &str, entry: &IndexEntry) -> BTreeSet<String> {
        let suffix = format!("{}{KEY_SEPARATOR}{}", rank(entry.score), entry.item_id);
        let mut keys = BTreeSet::new();

        for term in &entry.terms {
            keys.insert(posting_prefix(config, provider, 'x', term) + &suffix);
            for tail in word_suffixes(term) {
                for (idx, ch) in tail.char_indices().take(self.max_prefix_length) {
                    if ch == ' ' {
                        continue;
                    }
                    let prefix = &tail[..idx + ch.len_utf8()];
                    keys.insert(posting_prefix(config, provider, 'p', prefix) + &suffix);
                }
            }
        }
        keys
    }
}

/// Lazily pages through the postings under one key prefix.
pub struct Postings<'a> {
    kv: &'a dyn KvStore,
    prefix: String,
    after: Option<String>,
    buffer: VecDeque<Posting>,
    exhausted: bool,
}

impl<'a> Postings<'a> {
    fn new(kv: &'a dyn KvStore, prefix: String) -> Self {
        Self {
            kv,
            prefix,
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fill(&mut self) -> Result<()> {
        let page = self
            .kv
            .scan_prefix(&self.prefix, self.after.as_deref(), SCAN_PAGE)?;
        if page.len() < SCAN_PAGE {
            self.exhausted = true;
        }
        if let Some((last, _)) = page.last() {
            self.after = Some(last.clone());
        }
        for (key, _) in page {
            if let Some(posting) = parse_posting(&key[self.prefix.len()..]) {
                self.buffer.push_back(posting);
            }
        }
        Ok(())
    }
}

impl Iterator for Postings<'_> {
    type Item = Result<Posting>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.buffer.is_empty() {
            if self.exhausted {
                return None;
            }
            if let Err(err) = self.fill() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

fn config_prefix(config: &str) -> String {
    format!("{config}{KEY_SEPARATOR}")
}

fn built_key(config: &str) -> String {
    format!("{config}{KEY_SEPARATOR}{KEY_SEPARATOR}built")
}

fn item_key(config: &str, provider: &str, item_id: &str) -> String {
    format!("{config}{sep}{provider}{sep}i{sep}{item_id}", sep = KEY_SEPARATOR)
}

/// Everything up to and including the separator before the rank.
fn posting_prefix(config: &str, provider: &str, kind: char, text: &str) -> String {
    format!("{config}{sep}{provider}{sep}{kind}{sep}{text}{sep}", sep = KEY_SEPARATOR)
}

/// Maps a score onto a hex string whose ascending order is descending score.
fn rank(score: Score) -> String {
    let ordered = (score as u64) ^ (1 << 63);
    format!("{:0width$x}", u64::MAX - ordered, width = RANK_WIDTH)
}

fn parse_posting(rest: &str) -> Option<Posting> {
    let (rank_hex, item_id) = rest.split_once(KEY_SEPARATOR)?;
    if rank_hex.len() != RANK_WIDTH {
        return None;
    }
    let ordered = u64::MAX - u64::from_str_radix(rank_hex, 16).ok()?;
    Some(Posting {
        item_id: item_id.to_string(),
        score: (ordered ^ (1 << 63)) as i64,
    })
}
