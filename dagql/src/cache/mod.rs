//! Single-flight memoization keyed by call identity.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use tokio::sync::broadcast;

type WaitMap<K, V, E> = Arc<DashMap<K, broadcast::Sender<Result<V, E>>>>;

/// A concurrent map from keys to computed values in which at most one
/// computation per key is in flight.
///
/// Callers arriving while a key is being computed wait for that computation
/// and share its outcome. Successful values are stored; errors are shared
/// with the callers already waiting and then forgotten, so the next caller
/// computes again.
#[derive(Clone)]
pub struct CacheMap<K, V, E> {
    wait_map: WaitMap<K, V, E>,
    storage: Arc<DashMap<K, V>>,
}

enum Entry<V, E> {
    Value(V),
    Receiver(broadcast::Receiver<Result<V, E>>),
    First(broadcast::Sender<Result<V, E>>),
}

impl<K, V, E> CacheMap<K, V, E>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        CacheMap {
            wait_map: Arc::new(DashMap::new()),
            storage: Arc::new(DashMap::new()),
        }
    }

    /// Returns the stored value for `key`, or computes it with `compute`.
    ///
    /// If the caller computing a key is dropped before finishing, one of the
    /// waiting callers takes over the computation.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        loop {
            match self.entry(&key) {
                Entry::Value(value) => return Ok(value),
                Entry::Receiver(mut receiver) => match receiver.recv().await {
                    Ok(result) => return result,
                    // the computing caller went away without a result
                    Err(_) => continue,
                },
                Entry::First(sender) => {
                    let flight = Flight {
                        wait_map: self.wait_map.clone(),
                        key: key.clone(),
                        sender,
                    };
                    let result = compute().await;
                    if let Ok(value) = &result {
                        self.storage.insert(key.clone(), value.clone());
                    }
                    flight.finish(result.clone());
                    return result;
                }
            }
        }
    }

    fn entry(&self, key: &K) -> Entry<V, E> {
        if let Some(value) = self.storage.get(key) {
            return Entry::Value(value.clone());
        }
        match self.wait_map.entry(key.clone()) {
            MapEntry::Occupied(waiting) => Entry::Receiver(waiting.get().subscribe()),
            MapEntry::Vacant(vacant) => {
                // a computation may have finished between the two lookups
                if let Some(value) = self.storage.get(key) {
                    return Entry::Value(value.clone());
                }
                let (sender, _receiver) = broadcast::channel(1);
                vacant.insert(sender.clone());
                Entry::First(sender)
            }
        }
    }

    /// The stored value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        self.storage.get(key).map(|value| value.clone())
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// The number of keys currently being computed.
    pub fn in_flight(&self) -> usize {
        self.wait_map.len()
    }
}

impl<K, V, E> Default for CacheMap<K, V, E>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the in-flight marker for a key when the computation ends, whether
/// it finished or was dropped.
struct Flight<K: Eq + Hash, V, E> {
    wait_map: WaitMap<K, V, E>,
    key: K,
    sender: broadcast::Sender<Result<V, E>>,
}

impl<K: Eq + Hash, V, E> Flight<K, V, E> {
    fn finish(self, result: Result<V, E>) {
        self.remove();
        let _ = self.sender.send(result);
    }

    fn remove(&self) {
        self.wait_map
            .remove_if(&self.key, |_, sender| sender.same_channel(&self.sender));
    }
}

impl<K: Eq + Hash, V, E> Drop for Flight<K, V, E> {
    fn drop(&mut self) {
        self.remove();
    }
}
