//! Path-keyed, time-bounded cache of directory listings.
//!
//! `invalidate` compares keys as path components rather than raw string
//! prefixes, so `invalidate("/foo")` does not also evict `/foobar`. The
//! reference this is modeled on used a literal `strncmp` prefix test and
//! documented the resulting over-invalidation as a known wart; this
//! implementation closes it instead of reproducing it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::parser::Entry;

struct DirCacheEntry {
    entries: Vec<Entry>,
    inserted_at: Instant,
}

pub struct DirCache {
    timeout: Duration,
    entries: HashMap<String, DirCacheEntry>,
}

impl DirCache {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            entries: HashMap::new(),
        }
    }

    /// Returns the cached listing if present and unexpired; otherwise
    /// removes the stale entry (if any) and returns `None`.
    pub fn get(&mut self, path: &str) -> Option<Vec<Entry>> {
        let expired = match self.entries.get(path) {
            Some(e) => e.inserted_at.elapsed() > self.timeout,
            None => return None,
        };
        if expired {
            self.entries.remove(path);
            return None;
        }
        self.entries.get(path).map(|e| e.entries.clone())
    }

    pub fn put(&mut self, path: &str, entries: Vec<Entry>) {
        self.entries.remove(path);
        self.entries.insert(
            path.to_string(),
            DirCacheEntry { entries, inserted_at: Instant::now() },
        );
    }

    /// Removes every entry whose key is `prefix` or has `prefix`'s path
    /// components as a leading sub-sequence of its own.
    pub fn invalidate(&mut self, prefix: &str) {
        let prefix_components = components(prefix);
        self.entries
            .retain(|key, _| !is_component_prefix(&prefix_components, &components(key)));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

fn is_component_prefix(prefix: &[&str], full: &[&str]) -> bool {
    prefix.len() <= full.len() && prefix.iter().zip(full.iter()).all(|(a, b)| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn entry(name: &str) -> Entry {
        use crate::parser::EntryKind;
        Entry { name: name.to_string(), kind: EntryKind::File, size: 0, mtime: 0, mode: 0o644 }
    }

    #[test]
    fn ttl_expires_and_removes() {
        let mut cache = DirCache::new(0);
        cache.put("/a", vec![entry("x")]);
        sleep(Duration::from_millis(5));
        assert!(cache.get("/a").is_none());
        assert!(cache.get("/a").is_none());
    }

    #[test]
    fn ttl_hits_within_window() {
        let mut cache = DirCache::new(300);
        cache.put("/a", vec![entry("x")]);
        assert_eq!(cache.get("/a").unwrap().len(), 1);
    }

    #[test]
    fn invalidate_is_component_prefix_not_string_prefix() {
        let mut cache = DirCache::new(300);
        cache.put("/a", vec![]);
        cache.put("/a/b", vec![]);
        cache.put("/ab", vec![]);
        cache.invalidate("/a");
        assert!(cache.get("/a").is_none());
        assert!(cache.get("/a/b").is_none());
        assert!(cache.get("/ab").is_some());
    }

    #[test]
    fn invalidate_root_clears_everything() {
        let mut cache = DirCache::new(300);
        cache.put("/a", vec![]);
        cache.put("/b/c", vec![]);
        cache.invalidate("/");
        assert!(cache.get("/a").is_none());
        assert!(cache.get("/b/c").is_none());
    }
}
