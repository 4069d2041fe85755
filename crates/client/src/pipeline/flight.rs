//! Per-key request coalescing.
//!
//! At most one computation runs per key. Callers that arrive while it is in
//! flight await the same shared result instead of starting their own.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

/// The shared computation ended without producing a value (panic or runtime shutdown).
#[derive(Debug, Clone, thiserror::Error)]
#[error("in-flight computation aborted: {0}")]
pub struct FlightAborted(String);

type FlightFuture<V> = Shared<BoxFuture<'static, Result<V, FlightAborted>>>;

struct Flight<V> {
    id: u64,
    future: FlightFuture<V>,
}

type Registry<K, V> = Arc<Mutex<HashMap<K, Flight<V>>>>;

/// Registry of in-flight computations keyed by `K`.
///
/// The computation runs on its own task, so a waiter that is dropped never
/// cancels it for the others. The entry is removed as soon as the computation
/// finishes; later callers start a fresh flight.
pub struct SingleFlight<K, V> {
    flights: Registry<K, V>,
    next_id: AtomicU64,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self { flights: Arc::new(Mutex::new(HashMap::new())), next_id: AtomicU64::new(0) }
    }
}

impl<K, V> std::fmt::Debug for SingleFlight<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight").field("in_flight", &self.in_flight()).finish()
    }
}

impl<K, V> SingleFlight<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of computations currently running.
    pub fn in_flight(&self) -> usize {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Join the flight for `key`, starting it with `make` if none is running.
    ///
    /// `make` is only called by the caller that starts the flight.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> Result<V, FlightAborted>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let future = {
            let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
            match flights.get(&key) {
                Some(flight) => flight.future.clone(),
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let future = spawn_flight(Arc::clone(&self.flights), key.clone(), id, make());
                    flights.insert(key, Flight { id, future: future.clone() });
                    future
                }
            }
        };

        future.await
    }
}

/// Removes a finished flight from the registry, including when the work panicked.
struct Landing<K: Eq + Hash, V> {
    registry: Registry<K, V>,
    key: Option<K>,
    id: u64,
}

impl<K: Eq + Hash, V> Drop for Landing<K, V> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else { return };
        let mut flights = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        // A newer flight may already own the key.
        if flights.get(&key).is_some_and(|f| f.id == self.id) {
            flights.remove(&key);
        }
    }
}

fn spawn_flight<K, V, Fut>(registry: Registry<K, V>, key: K, id: u64, work: Fut) -> FlightFuture<V>
where
    K: Eq + Hash + Send + 'static,
    V: Clone + Send + Sync + 'static,
    Fut: Future<Output = V> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let _landing = Landing { registry, key: Some(key), id };
        work.await
    });

    async move { handle.await.map_err(|e| FlightAborted(e.to_string())) }
        .boxed()
        .shared()
}
