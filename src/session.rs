//! Per-session state with bounded size and TTL eviction.
//!
//! Injected into the HTTP layer as a collaborator; there is no process-wide
//! session map.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

struct Entry<T> {
    value: T,
    touched: Instant,
}

/// A bounded map from session id to state.
///
/// Entries expire `ttl` after their last write. When full, expired entries
/// are dropped first, then the least recently written one.
pub struct SessionStore<T> {
    entries: Mutex<HashMap<String, Entry<T>>>,
    capacity: usize,
    ttl: Duration,
}

impl<T: Clone> SessionStore<T> {
    /// Creates a store holding at most `capacity` sessions for `ttl` each.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Returns a copy of the session's state if present and not expired.
    pub fn get(&self, session_id: &str) -> Option<T> {
        let mut entries = self.entries.lock();
        let expired = entries
            .get(session_id)
            .is_some_and(|e| e.touched.elapsed() >= self.ttl);
        if expired {
            entries.remove(session_id);
            return None;
        }
        entries.get(session_id).map(|e| e.value.clone())
    }

    /// Replaces the session's state.
    pub fn insert(&self, session_id: impl Into<String>, value: T) {
        let session_id = session_id.into();
        let mut entries = self.entries.lock();
        if !entries.contains_key(&session_id) {
            self.make_room(&mut entries);
        }
        entries.insert(
            session_id,
            Entry {
                value,
                touched: Instant::now(),
            },
        );
    }

    /// Applies `f` to the session's state, starting from `T::default()` for
    /// new or expired sessions.
    pub fn update(&self, session_id: impl Into<String>, f: impl FnOnce(&mut T))
    where
        T: Default,
    {
        let session_id = session_id.into();
        let mut entries = self.entries.lock();

        let live = entries
            .get(&session_id)
            .is_some_and(|e| e.touched.elapsed() < self.ttl);
        if !live {
            entries.remove(&session_id);
            self.make_room(&mut entries);
        }

        let entry = entries.entry(session_id).or_insert_with(|| Entry {
            value: T::default(),
            touched: Instant::now(),
        });
        f(&mut entry.value);
        entry.touched = Instant::now();
    }

    /// Removes a session.
    pub fn remove(&self, session_id: &str) -> Option<T> {
        self.entries.lock().remove(session_id).map(|e| e.value)
    }

    /// Drops every expired session, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.touched.elapsed() < self.ttl);
        before - entries.len()
    }

    /// Number of stored sessions, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no sessions are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn make_room(&self, entries: &mut HashMap<String, Entry<T>>) {
        if entries.len() < self.capacity {
            return;
        }
        entries.retain(|_, e| e.touched.elapsed() < self.ttl);
        while entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.touched)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    tracing::debug!(session_id = %key, "evicting least recent session");
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let store = SessionStore::new(10, Duration::from_secs(60));
        store.insert("a", 1u32);
        assert_eq!(store.get("a"), Some(1));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(store.get("a"), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_least_recent() {
        let store = SessionStore::new(2, Duration::from_secs(600));
        store.insert("a", 1u32);
        tokio::time::advance(Duration::from_secs(1)).await;
        store.insert("b", 2);
        tokio::time::advance(Duration::from_secs(1)).await;
        store.insert("c", 3);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), Some(2));
        assert_eq!(store.get("c"), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_refreshes_and_resets_expired() {
        let store: SessionStore<Vec<u32>> = SessionStore::new(4, Duration::from_secs(10));
        store.update("s", |v| v.push(1));
        tokio::time::advance(Duration::from_secs(5)).await;
        store.update("s", |v| v.push(2));
        assert_eq!(store.get("s"), Some(vec![1, 2]));

        tokio::time::advance(Duration::from_secs(11)).await;
        store.update("s", |v| v.push(3));
        assert_eq!(store.get("s"), Some(vec![3]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = SessionStore::new(4, Duration::from_secs(10));
        store.insert("a", ());
        tokio::time::advance(Duration::from_secs(6)).await;
        store.insert("b", ());
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.remove("b").is_some());
    }
}
