//! In-memory cache of raw explanation responses.
//!
//! Entries are keyed by the exact request payload and remember which
//! document lines they were resolved for, so an edit can prune just the
//! entries that mention the edited lines. The cache is an LRU bounded by
//! entry count; it lives as long as the session that owns it.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::language::TargetLanguage;

/// Default number of cached responses.
pub const DEFAULT_CAPACITY: usize = 512;

#[derive(Debug, Clone)]
struct CacheEntry {
    raw: String,
    lines: BTreeSet<usize>,
}

/// Response cache keyed by request payload.
pub struct ExplanationCache {
    entries: LruCache<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl ExplanationCache {
    /// Create a cache holding at most `capacity` responses (0 is treated as 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Key for a batch request.
    pub fn batch_key(texts: &[&str], language: TargetLanguage) -> String {
        format!("batch:{}:{}", language.as_str(), texts.join("\n"))
    }

    /// Key for a single-unit request.
    pub fn single_key(text: &str, language: TargetLanguage) -> String {
        format!("single:{}:{}", language.as_str(), text)
    }

    /// Look up a raw response, marking it recently used.
    pub fn get(&mut self, key: &str) -> Option<String> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits += 1;
                Some(entry.raw.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a raw response resolved for `lines`.
    ///
    /// Storing under an existing key keeps the union of both line sets.
    pub fn put(&mut self, key: String, raw: String, lines: impl IntoIterator<Item = usize>) {
        let mut entry = CacheEntry {
            raw,
            lines: lines.into_iter().collect(),
        };
        if let Some(previous) = self.entries.pop(&key) {
            entry.lines.extend(previous.lines);
        }
        self.entries.put(key, entry);
    }

    /// Record that an entry was also used for `lines`.
    pub fn note_lines(&mut self, key: &str, lines: impl IntoIterator<Item = usize>) {
        if let Some(entry) = self.entries.peek_mut(key) {
            entry.lines.extend(lines);
        }
    }

    /// Drop every entry resolved for any of `edited` lines.
    ///
    /// Returns the number of entries removed.
    pub fn prune_lines(&mut self, edited: &BTreeSet<usize>) -> usize {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.lines.is_disjoint(edited))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            self.entries.pop(key);
        }
        stale.len()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since the cache was created.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

impl Default for ExplanationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
