//! Output hash cache for hash-gated writes.
//!
//! Remembers a digest of the last content written for each slug so a
//! rebuild only touches files whose rendered output actually changed.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

/// SHA-256 of `data` as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// slug -> digest of the last successfully written output.
#[derive(Debug, Default)]
pub struct HashCache {
    hashes: HashMap<String, String>,
}

impl HashCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The digest of `content` if it differs from what was last written for `slug`.
    pub fn check(&self, slug: &str, content: &str) -> Option<String> {
        let hash = sha256_hex(content.as_bytes());
        match self.hashes.get(slug) {
            Some(previous) if *previous == hash => None,
            _ => Some(hash),
        }
    }

    /// Record a successful write.
    pub fn record(&mut self, slug: &str, hash: String) {
        self.hashes.insert(slug.to_string(), hash);
    }

    pub fn forget(&mut self, slug: &str) {
        self.hashes.remove(slug);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_unchanged_content_is_skipped() {
        let mut cache = HashCache::new();
        let hash = cache.check("a.html", "<p>a</p>").unwrap();
        cache.record("a.html", hash);

        assert_eq!(cache.check("a.html", "<p>a</p>"), None);
        assert!(cache.check("a.html", "<p>b</p>").is_some());
        assert!(cache.check("b.html", "<p>a</p>").is_some());
    }

    #[test]
    fn test_forget() {
        let mut cache = HashCache::new();
        let hash = cache.check("a.html", "x").unwrap();
        cache.record("a.html", hash);
        assert_eq!(cache.check("a.html", "x"), None);
        cache.forget("a.html");
        assert!(cache.check("a.html", "x").is_some());
    }
}
