//! Persistent transcript cache.
//!
//! Entries live under a single root key of a [`KeyValueStore`] as a map of
//! `video_id -> { timestamp, data }`. Entries older than the TTL are treated
//! as absent and dropped on read; the map is capped at a fixed number of
//! entries, evicting the oldest by timestamp.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Result, TranscriptError};
use crate::transcript::TranscriptData;

pub const CACHE_KEY: &str = "youtube_transcripts_cache";

/// Persistent key-value collaborator backing the cache.
pub trait KeyValueStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>>;
    fn save(&self, key: &str, value: Value) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// In-process store. Contents are lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        let values = self
            .values
            .lock()
            .map_err(|_| TranscriptError::Storage("Memory store lock poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| TranscriptError::Storage("Memory store lock poisoned".into()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| TranscriptError::Storage("Memory store lock poisoned".into()))?;
        values.remove(key);
        Ok(())
    }
}

/// Store backed by one JSON object on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<serde_json::Map<String, Value>> {
        if !self.path.exists() {
            return Ok(serde_json::Map::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                warn!("{} does not contain a JSON object, starting over", self.path.display());
                Ok(serde_json::Map::new())
            }
            Err(e) => {
                warn!("Discarding unreadable store {}: {e}", self.path.display());
                Ok(serde_json::Map::new())
            }
        }
    }

    fn write_all(&self, map: serde_json::Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&Value::Object(map))?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn save(&self, key: &str, value: Value) -> Result<()> {
        let mut map = self.read_all()?;
        map.insert(key.to_string(), value);
        self.write_all(map)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut map = self.read_all()?;
        if map.remove(key).is_some() {
            self.write_all(map)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Epoch milliseconds at insertion.
    pub timestamp: i64,
    pub data: TranscriptData,
}

impl CacheEntry {
    pub fn is_expired(&self, ttl: Duration, now_ms: i64) -> bool {
        now_ms - self.timestamp > ttl.as_millis() as i64
    }
}

type EntryMap = HashMap<String, CacheEntry>;

pub struct TranscriptCache {
    store: Box<dyn KeyValueStore>,
    ttl: Duration,
    capacity: usize,
}

impl TranscriptCache {
    pub fn new(store: Box<dyn KeyValueStore>, ttl: Duration, capacity: usize) -> Self {
        Self {
            store,
            ttl,
            capacity,
        }
    }

    pub fn get(&self, video_id: &str) -> Result<Option<TranscriptData>> {
        self.get_at(video_id, now_millis())
    }

    pub fn get_at(&self, video_id: &str, now_ms: i64) -> Result<Option<TranscriptData>> {
        let mut entries = self.entries()?;
        let Some(entry) = entries.get(video_id) else {
            return Ok(None);
        };

        if entry.is_expired(self.ttl, now_ms) {
            debug!("Cache entry for {video_id} expired");
            entries.remove(video_id);
            self.persist(&entries)?;
            return Ok(None);
        }

        Ok(Some(entry.data.clone()))
    }

    pub fn put(&self, video_id: &str, data: &TranscriptData) -> Result<()> {
        self.put_at(video_id, data, now_millis())
    }

    pub fn put_at(&self, video_id: &str, data: &TranscriptData, now_ms: i64) -> Result<()> {
        let mut entries = self.entries()?;
        entries.insert(
            video_id.to_string(),
            CacheEntry {
                timestamp: now_ms,
                data: data.clone(),
            },
        );

        if entries.len() > self.capacity {
            let mut by_age: Vec<(String, i64)> = entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.timestamp))
                .collect();
            by_age.sort_by_key(|(_, timestamp)| *timestamp);

            let excess = entries.len() - self.capacity;
            for (key, _) in by_age.into_iter().take(excess) {
                debug!("Evicting cached transcript for {key}");
                entries.remove(&key);
            }
        }

        self.persist(&entries)
    }

    pub fn remove(&self, video_id: &str) -> Result<()> {
        let mut entries = self.entries()?;
        if entries.remove(video_id).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.store.delete(CACHE_KEY)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    fn entries(&self) -> Result<EntryMap> {
        match self.store.load(CACHE_KEY)? {
            Some(value) => match serde_json::from_value(value) {
                Ok(entries) => Ok(entries),
                Err(e) => {
                    warn!("Discarding unreadable transcript cache: {e}");
                    Ok(EntryMap::new())
                }
            },
            None => Ok(EntryMap::new()),
        }
    }

    fn persist(&self, entries: &EntryMap) -> Result<()> {
        self.store.save(CACHE_KEY, serde_json::to_value(entries)?)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Segment;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn transcript(video_id: &str) -> TranscriptData {
        TranscriptData::new(
            video_id,
            vec![Segment {
                start: 0.0,
                duration: 2.0,
                text: format!("hello from {video_id}"),
            }],
        )
    }

    fn memory_cache(capacity: usize) -> TranscriptCache {
        TranscriptCache::new(Box::new(MemoryStore::new()), DAY, capacity)
    }

    #[test]
    fn entry_survives_until_ttl() {
        let cache = memory_cache(50);
        let written_at = 1_700_000_000_000;
        cache.put_at("abc", &transcript("abc"), written_at).unwrap();

        let ttl_ms = DAY.as_millis() as i64;
        let hit = cache.get_at("abc", written_at + ttl_ms - 1).unwrap();
        assert_eq!(hit, Some(transcript("abc")));

        assert_eq!(cache.get_at("abc", written_at + ttl_ms + 1).unwrap(), None);
        assert_eq!(cache.len().unwrap(), 0, "expired entry is deleted on read");
    }

    #[test]
    fn inserting_past_capacity_evicts_only_the_oldest() {
        let cache = memory_cache(50);
        let base = 1_000_000;
        for i in 0..50 {
            let id = format!("video{i}");
            cache.put_at(&id, &transcript(&id), base + i as i64).unwrap();
        }

        cache.put_at("video50", &transcript("video50"), base + 50).unwrap();

        assert_eq!(cache.len().unwrap(), 50);
        assert_eq!(cache.get_at("video0", base + 60).unwrap(), None);
        assert!(cache.get_at("video1", base + 60).unwrap().is_some());
        assert!(cache.get_at("video50", base + 60).unwrap().is_some());
    }

    #[test]
    fn remove_and_clear() {
        let cache = memory_cache(50);
        cache.put_at("a", &transcript("a"), 10).unwrap();
        cache.put_at("b", &transcript("b"), 20).unwrap();

        cache.remove("a").unwrap();
        assert_eq!(cache.get_at("a", 30).unwrap(), None);
        assert_eq!(cache.len().unwrap(), 1);

        cache.clear().unwrap();
        assert_eq!(cache.len().unwrap(), 0);
    }

    #[test]
    fn rewriting_refreshes_timestamp() {
        let cache = memory_cache(2);
        cache.put_at("a", &transcript("a"), 10).unwrap();
        cache.put_at("b", &transcript("b"), 20).unwrap();
        cache.put_at("a", &transcript("a"), 30).unwrap();
        cache.put_at("c", &transcript("c"), 40).unwrap();

        assert_eq!(cache.get_at("b", 50).unwrap(), None);
        assert!(cache.get_at("a", 50).unwrap().is_some());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let cache = TranscriptCache::new(Box::new(JsonFileStore::new(&path)), DAY, 50);
        cache.put("xyz", &transcript("xyz")).unwrap();

        let reopened = TranscriptCache::new(Box::new(JsonFileStore::new(&path)), DAY, 50);
        assert_eq!(reopened.get("xyz").unwrap(), Some(transcript("xyz")));

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw[CACHE_KEY]["xyz"]["timestamp"].is_i64());
        assert_eq!(raw[CACHE_KEY]["xyz"]["data"]["videoId"], "xyz");
    }

    #[test]
    fn truncated_cache_file_recovers_on_next_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, r#"{"youtube_transcripts_cache": {trunc"#).unwrap();

        let cache = TranscriptCache::new(Box::new(JsonFileStore::new(&path)), DAY, 50);
        assert_eq!(cache.get("abc").unwrap(), None);
        assert_eq!(cache.len().unwrap(), 0);

        cache.put("abc", &transcript("abc")).unwrap();
        assert_eq!(cache.get("abc").unwrap(), Some(transcript("abc")));
        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw[CACHE_KEY]["abc"].is_object());

        fs::write(&path, "not json").unwrap();
        cache.clear().unwrap();
        assert_eq!(cache.len().unwrap(), 0);
    }

    #[test]
    fn corrupt_cache_is_treated_as_empty() {
        let store = MemoryStore::new();
        store.save(CACHE_KEY, Value::String("garbage".into())).unwrap();
        let cache = TranscriptCache::new(Box::new(store), DAY, 50);

        assert_eq!(cache.get("anything").unwrap(), None);
        cache.put("fresh", &transcript("fresh")).unwrap();
        assert_eq!(cache.len().unwrap(), 1);
    }
}
