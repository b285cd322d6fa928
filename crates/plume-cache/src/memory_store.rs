//! In-process cache store with per-entry TTL.
//!
//! Used for local development without Redis and as the store behind the
//! cache-aside tests. Expired entries are dropped lazily on access.

use super::CacheStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use plume_core::PlumeResult;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Expiry used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory [`CacheStore`].
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCacheStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// Returns true if there are no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `key` holds a live entry.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> PlumeResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it unless it was replaced in the meantime
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> PlumeResult<()> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_string(),
            expires_at: now.checked_add(ttl).unwrap_or(now + FAR_FUTURE),
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> PlumeResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .write()
            .remove(key)
            .is_some_and(|entry| !entry.is_expired(now)))
    }

    async fn keys_matching(&self, pattern: &str) -> PlumeResult<Vec<String>> {
        let now = Instant::now();
        let pattern: Vec<char> = pattern.chars().collect();
        let mut keys: Vec<String> = self
            .entries
            .read()
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .filter(|(key, _)| glob_match(&pattern, &key.chars().collect::<Vec<_>>()))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }

    async fn pipeline_delete(&self, keys: &[String]) -> PlumeResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let deleted = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|entry| !entry.is_expired(now))
            .count();
        Ok(deleted as u64)
    }
}

/// Redis-style glob matching: `*`, `?`, `[abc]`, `[a-z]`, `[^a]` and `\` escapes.
fn glob_match(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Backtrack point for the most recent `*`
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() {
            match pattern[p] {
                '*' => {
                    star = Some((p, t));
                    p += 1;
                    continue;
                }
                '?' => {
                    p += 1;
                    t += 1;
                    continue;
                }
                '[' => match match_class(pattern, p, text[t]) {
                    Some((true, next)) => {
                        p = next;
                        t += 1;
                        continue;
                    }
                    Some((false, _)) => {}
                    // Unterminated class: `[` is a literal
                    None => {
                        if text[t] == '[' {
                            p += 1;
                            t += 1;
                            continue;
                        }
                    }
                },
                '\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == text[t] {
                        p += 2;
                        t += 1;
                        continue;
                    }
                }
                c => {
                    if c == text[t] {
                        p += 1;
                        t += 1;
                        continue;
                    }
                }
            }
        }

        match star {
            Some((star_p, star_t)) => {
                p = star_p + 1;
                t = star_t + 1;
                star = Some((star_p, star_t + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Matches `c` against the class starting at `pattern[start] == '['`.
///
/// Returns whether it matched and the index just past the closing `]`, or
/// `None` if the class is unterminated.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negated = matches!(pattern.get(i), Some('^') | Some('!'));
    if negated {
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    while i < pattern.len() {
        let current = pattern[i];
        if current == ']' && !first {
            return Some((matched != negated, i + 1));
        }
        first = false;

        let literal = if current == '\\' && i + 1 < pattern.len() {
            i += 1;
            pattern[i]
        } else {
            current
        };

        if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' {
            let (lo, hi) = (literal, pattern[i + 2]);
            let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
            if (lo..=hi).contains(&c) {
                matched = true;
            }
            i += 3;
        } else {
            if literal == c {
                matched = true;
            }
            i += 1;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, text: &str) -> bool {
        glob_match(
            &pattern.chars().collect::<Vec<_>>(),
            &text.chars().collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_glob_star() {
        assert!(matches("usage:*", "usage:42"));
        assert!(matches("usage:*", "usage:"));
        assert!(matches("*:profile", "plume:cache:account:profile"));
        assert!(matches("a*b*c", "axxbyyc"));
        assert!(!matches("usage:*", "analytics:42"));
        assert!(!matches("usage:*", "xusage:42"));
    }

    #[test]
    fn test_glob_question_and_literal() {
        assert!(matches("user:?", "user:7"));
        assert!(!matches("user:?", "user:77"));
        assert!(matches("exact", "exact"));
        assert!(!matches("exact", "exactly"));
    }

    #[test]
    fn test_glob_classes() {
        assert!(matches("h[ae]llo", "hello"));
        assert!(matches("h[ae]llo", "hallo"));
        assert!(!matches("h[ae]llo", "hillo"));
        assert!(matches("h[a-c]llo", "hbllo"));
        assert!(matches("h[^e]llo", "hallo"));
        assert!(!matches("h[^e]llo", "hello"));
    }

    #[test]
    fn test_glob_unterminated_class_is_literal() {
        assert!(matches("tag:[v1", "tag:[v1"));
        assert!(!matches("tag:[v1", "tag:v1"));
        assert!(matches("*[x", "abc[x"));
    }

    #[test]
    fn test_glob_escape() {
        assert!(matches("literal\\*", "literal*"));
        assert!(!matches("literal\\*", "literally"));
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryCacheStore::new();
        store.set("k", "v", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = MemoryCacheStore::new();
        store.set("short", "1", Duration::from_secs(5)).await.unwrap();
        store.set("long", "2", Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.get("long").await.unwrap(), Some("2".to_string()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.keys_matching("*").await.unwrap(), vec!["long".to_string()]);
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let store = MemoryCacheStore::new();
        store.set("k", "v", Duration::from_secs(u64::MAX)).await.unwrap();
        store.set("m", "w", Duration::MAX).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert!(store.contains("m"));
    }

    #[tokio::test]
    async fn test_keys_matching_and_pipeline_delete() {
        let store = MemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        store.set("usage:1", "a", ttl).await.unwrap();
        store.set("usage:2", "b", ttl).await.unwrap();
        store.set("analytics:1", "c", ttl).await.unwrap();

        let keys = store.keys_matching("usage:*").await.unwrap();
        assert_eq!(keys, vec!["usage:1".to_string(), "usage:2".to_string()]);

        let deleted = store.pipeline_delete(&keys).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(store.contains("analytics:1"));
        assert!(!store.contains("usage:1"));
    }
}
