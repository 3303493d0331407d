use std::time::Duration;

use dashmap::DashMap;

use crate::common::types::MediaId;
use crate::resolver::StreamInfo;

/// Short-TTL memoization of resolved stream URLs. Entries expire lazily:
/// a `get` on an expired entry behaves as a miss and drops the entry.
pub struct ResolutionCache {
    entries: DashMap<MediaId, StreamInfo>,
    ttl: Duration,
}

impl ResolutionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, media_id: &MediaId) -> Option<StreamInfo> {
        let fresh = {
            let entry = self.entries.get(media_id)?;
            if entry.resolved_at.elapsed() <= self.ttl {
                Some(entry.value().clone())
            } else {
                None
            }
        };

        if fresh.is_none() {
            self.entries.remove(media_id);
        }
        fresh
    }

    pub fn put(&self, media_id: &MediaId, info: StreamInfo) {
        self.entries.insert(media_id.clone(), info);
    }

    pub fn invalidate(&self, media_id: &MediaId) {
        self.entries.remove(media_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn info(url: &str) -> StreamInfo {
        StreamInfo {
            url: url.to_string(),
            ext: "webm".to_string(),
            bitrate: Some(160000),
            duration: None,
            title: None,
            strategy: "test".to_string(),
            resolved_at: Instant::now(),
        }
    }

    #[test]
    fn fresh_entry_hits() {
        let cache = ResolutionCache::new(Duration::from_secs(300));
        let id = MediaId::from("abc");

        cache.put(&id, info("https://cdn/a"));
        assert_eq!(cache.get(&id).unwrap().url, "https://cdn/a");
    }

    #[test]
    fn expired_entry_misses_and_is_removed() {
        let cache = ResolutionCache::new(Duration::ZERO);
        let id = MediaId::from("abc");

        cache.put(&id, info("https://cdn/a"));
        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get(&id).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = ResolutionCache::new(Duration::from_secs(300));
        let id = MediaId::from("abc");

        cache.put(&id, info("https://cdn/a"));
        cache.invalidate(&id);
        assert!(cache.get(&id).is_none());
    }

    #[test]
    fn put_replaces_previous_resolution() {
        let cache = ResolutionCache::new(Duration::from_secs(300));
        let id = MediaId::from("abc");

        cache.put(&id, info("https://cdn/a"));
        cache.put(&id, info("https://cdn/b"));
        assert_eq!(cache.get(&id).unwrap().url, "https://cdn/b");
        assert_eq!(cache.len(), 1);
    }
}
