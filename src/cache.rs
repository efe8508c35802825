use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Concurrent key/value store whose entries expire a fixed time after insert.
///
/// Expiry is checked lazily on read; nothing runs in the background.
#[derive(Debug)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    ttl: Duration,
    entries: DashMap<K, (V, Instant)>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let expired = {
            let entry = self.entries.get(key)?;
            let (value, inserted) = entry.value();
            if inserted.elapsed() < self.ttl {
                return Some(value.clone());
            }
            true
        };
        if expired {
            self.entries
                .remove_if(key, |_, (_, inserted)| inserted.elapsed() >= self.ttl);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, (value, Instant::now()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
