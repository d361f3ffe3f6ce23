//! In-process TTL caches for source adapter lookups.
//!
//! Every network-backed adapter fronts its calls with one of these caches
//! so repeated lookups for the same track within the TTL window never hit
//! the wire. Entries expire lazily: a stale entry is dropped on read, and
//! each insert sweeps whatever has expired since the last insert.

use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

lazy_static! {
    /// Parenthetical content, e.g. "(Remastered 2011)".
    static ref PARENTHETICAL: Regex = Regex::new(r"\s*\([^)]*\)").unwrap();
    /// Anything that is not a lowercase letter, digit or space.
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9 ]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Normalize one side of a lookup key: transliterate to ASCII, lowercase,
/// drop parenthetical content and punctuation, collapse whitespace.
pub fn normalize_term(text: &str) -> String {
    let folded = any_ascii::any_ascii(text).to_lowercase();
    let no_parens = PARENTHETICAL.replace_all(&folded, "");
    let plain = NON_ALNUM.replace_all(&no_parens, "");
    WHITESPACE.replace_all(plain.trim(), " ").into_owned()
}

/// Cache key for a `(title, artist)` lookup. Two spellings of the same
/// track ("Beyoncé" vs "Beyonce", "Song (Live)" vs "Song") share a key.
pub fn lookup_key(title: &str, artist: &str) -> String {
    format!("{}::{}", normalize_term(artist), normalize_term(title))
}

/// SHA-256 fingerprint over the given parts, hex encoded. Used to key
/// cached LLM classifications by content rather than by track identity.
pub fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A TTL-bounded key-value store, safe for concurrent get/put from any
/// task. The lock is never held across an await point.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Fetch a live entry, dropping it if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert a value with the cache's TTL, sweeping expired entries.
    pub fn put(&self, key: String, value: V) {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term("  Hello,   World!  "), "hello world");
        assert_eq!(normalize_term("Song (Live at Wembley)"), "song");
        assert_eq!(normalize_term("Beyoncé"), "beyonce");
        assert_eq!(normalize_term("AC/DC"), "acdc");
    }

    #[test]
    fn test_lookup_key_spelling_variants_collide() {
        assert_eq!(
            lookup_key("Halo (Remastered)", "Beyoncé"),
            lookup_key("Halo", "beyonce")
        );
    }

    #[test]
    fn test_fingerprint_is_stable_and_distinct() {
        let a = fingerprint(&["some lyrics", "0.4"]);
        let b = fingerprint(&["some lyrics", "0.4"]);
        let c = fingerprint(&["other lyrics", "0.4"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_cache_round_trip() {
        let cache = TtlCache::new(Duration::from_secs(60));
        assert!(cache.get("k").is_none());
        cache.put("k".to_string(), 42u64);
        assert_eq!(cache.get("k"), Some(42));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_expiry() {
        let cache = TtlCache::new(Duration::from_millis(0));
        cache.put("k".to_string(), 1u8);
        assert!(cache.get("k").is_none());
        // A later put sweeps the dead entry out entirely.
        cache.put("other".to_string(), 2u8);
        assert_eq!(cache.len(), 1);
    }
}
