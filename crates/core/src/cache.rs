//! Session caches.
//!
//! Two lookups recur across a session: the title record a publication
//! belongs to, and the cover URL found for an identifier. Both are
//! kept in mutex-guarded maps shared between worker threads, and both
//! survive across sessions through a JSON dump.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDump {
    title_ids: HashMap<String, String>,
    cover_urls: HashMap<String, String>,
}

/// Shared caches for one lookup session.
#[derive(Debug, Default)]
pub struct Caches {
    /// Publication id to title id.
    title_ids: Mutex<HashMap<String, String>>,
    /// `"{kind}:{value}"` identifier key to cover URL.
    cover_urls: Mutex<HashMap<String, String>>,
}

impl Caches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_title_id(&self, publication_id: &str) -> Option<String> {
        self.title_ids.lock().ok()?.get(publication_id).cloned()
    }

    pub fn remember_title_id(&self, publication_id: &str, title_id: &str) {
        if let Ok(mut map) = self.title_ids.lock() {
            map.insert(publication_id.to_string(), title_id.to_string());
        }
    }

    pub fn cached_cover_url(&self, identifier: &str) -> Option<String> {
        self.cover_urls.lock().ok()?.get(identifier).cloned()
    }

    pub fn remember_cover_url(&self, identifier: &str, url: &str) {
        if let Ok(mut map) = self.cover_urls.lock() {
            map.insert(identifier.to_string(), url.to_string());
        }
    }

    /// Serializes both maps to JSON.
    pub fn dump(&self) -> Result<String> {
        let dump = CacheDump {
            title_ids: self.title_ids.lock().map(|m| m.clone()).unwrap_or_default(),
            cover_urls: self.cover_urls.lock().map(|m| m.clone()).unwrap_or_default(),
        };
        Ok(serde_json::to_string(&dump)?)
    }

    /// Restores caches from a JSON dump produced by [`Caches::dump`].
    pub fn load(json: &str) -> Result<Self> {
        let dump: CacheDump = serde_json::from_str(json)?;
        Ok(Self {
            title_ids: Mutex::new(dump.title_ids),
            cover_urls: Mutex::new(dump.cover_urls),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_id_round_trip() {
        let caches = Caches::new();
        assert_eq!(caches.cached_title_id("675613"), None);
        caches.remember_title_id("675613", "1058");
        assert_eq!(caches.cached_title_id("675613"), Some("1058".to_string()));
    }

    #[test]
    fn test_dump_and_load() {
        let caches = Caches::new();
        caches.remember_title_id("675613", "1058");
        caches.remember_cover_url("isbn:9780330020429", "https://images.example.net/c.jpg");

        let restored = Caches::load(&caches.dump().unwrap()).unwrap();
        assert_eq!(restored.cached_title_id("675613"), Some("1058".to_string()));
        assert_eq!(
            restored.cached_cover_url("isbn:9780330020429"),
            Some("https://images.example.net/c.jpg".to_string())
        );
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        assert!(Caches::load("not json").is_err());
    }
}
