// crates/hiex-client/src/flight.rs
// ============================================================================
// Module: Single-Flight Registry
// Description: Keyed coalescing of concurrent fetches for one cache key.
// Purpose: Guarantee at most one in-flight fetch per key at a time.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! Concurrent first-access requests for the same cache key collapse into a
//! single fetch. The first caller for a key becomes the leader and runs the
//! fetch; every caller arriving while it is in flight subscribes to the
//! leader's result instead of issuing its own call. The leader removes its
//! entry before publishing, so later callers start a fresh flight.
//!
//! Leaders must be awaited to completion; callers in this crate never drop
//! a flight future mid-poll.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::future::Future;

use tokio::sync::Mutex;
use tokio::sync::broadcast;

// ============================================================================
// SECTION: Flight Group
// ============================================================================

/// The role a caller holds for one flight.
enum FlightRole<V, E> {
    /// This caller runs the fetch and publishes the result.
    Leader,
    /// This caller awaits the leader's published result.
    Waiter(broadcast::Receiver<Result<V, E>>),
}

/// Keyed in-flight-request registry coalescing concurrent fetches.
pub struct FlightGroup<V, E> {
    /// Publishers for fetches currently in flight, keyed by cache key.
    inflight: Mutex<BTreeMap<String, broadcast::Sender<Result<V, E>>>>,
}

impl<V, E> FlightGroup<V, E>
where
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates an empty flight group.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inflight: Mutex::const_new(BTreeMap::new()),
        }
    }

    /// Runs the fetch for the key, coalescing with any in-flight fetch.
    ///
    /// # Errors
    ///
    /// Returns the fetch error, either from this caller's own fetch or from
    /// the in-flight leader it joined.
    pub async fn run<F, Fut>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let role = {
            let mut inflight = self.inflight.lock().await;
            match inflight.get(key) {
                Some(sender) => FlightRole::Waiter(sender.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    inflight.insert(key.to_string(), sender);
                    FlightRole::Leader
                }
            }
        };

        match role {
            FlightRole::Leader => {
                let result = fetch().await;
                let sender = {
                    let mut inflight = self.inflight.lock().await;
                    inflight.remove(key)
                };
                if let Some(sender) = sender {
                    // No waiters is fine; the send result is irrelevant.
                    let _ = sender.send(result.clone());
                }
                result
            }
            FlightRole::Waiter(mut receiver) => match receiver.recv().await {
                Ok(result) => result,
                // The leader vanished without publishing; fetch directly.
                Err(_) => fetch().await,
            },
        }
    }
}

impl<V, E> Default for FlightGroup<V, E>
where
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
