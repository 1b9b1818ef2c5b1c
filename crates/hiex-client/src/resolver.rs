// crates/hiex-client/src/resolver.rs
// ============================================================================
// Module: Cached Key Resolver
// Description: TTL cache plus single-flight coalescing over the key registry.
// Purpose: Bound registry traffic while keeping resolved keys fresh.
// Dependencies: hiex-core, hiex-jwe, tokio, tracing
// ============================================================================

//! ## Overview
//! Resolved recipient keys are cached for a configured time-to-live, and
//! concurrent first-access lookups for the same participant collapse into a
//! single registry fetch. A lookup failure never evicts or poisons a cached
//! key; the caller sees the error and the next attempt fetches again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use tokio::sync::RwLock;

use hiex_core::ParticipantCode;
use hiex_jwe::RecipientKey;

use crate::flight::FlightGroup;
use crate::registry::KeyRegistry;
use crate::registry::RegistryError;

// ============================================================================
// SECTION: Cache Entry
// ============================================================================

/// One cached key with its expiry deadline.
#[derive(Clone)]
struct CacheEntry {
    /// The resolved encryption key.
    key: RecipientKey,
    /// Instant after which the entry is stale.
    expires_at: Instant,
}

impl CacheEntry {
    /// Whether the entry is still usable.
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

// ============================================================================
// SECTION: Key Resolver
// ============================================================================

/// TTL-cached, coalescing front over a [`KeyRegistry`].
pub struct KeyResolver {
    /// Backing registry.
    registry: Arc<dyn KeyRegistry>,
    /// Cache lifetime for resolved keys.
    ttl: Duration,
    /// Resolved keys by participant code.
    cache: RwLock<BTreeMap<String, CacheEntry>>,
    /// In-flight lookup coalescing.
    flight: FlightGroup<RecipientKey, RegistryError>,
}

impl KeyResolver {
    /// Creates a resolver over the given registry with the given cache TTL.
    #[must_use]
    pub fn new(registry: Arc<dyn KeyRegistry>, ttl: Duration) -> Self {
        Self {
            registry,
            ttl,
            cache: RwLock::new(BTreeMap::new()),
            flight: FlightGroup::new(),
        }
    }

    /// Returns the cached key for the code when present and fresh.
    async fn cached(&self, code: &str) -> Option<RecipientKey> {
        let cache = self.cache.read().await;
        cache
            .get(code)
            .filter(|entry| entry.is_fresh())
            .map(|entry| entry.key.clone())
    }

    /// Resolves the recipient's encryption key, serving from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] when the key is absent from the cache and
    /// the registry lookup fails.
    pub async fn resolve(
        &self,
        recipient: &ParticipantCode,
    ) -> Result<RecipientKey, RegistryError> {
        let code = recipient.as_str().to_string();

        if let Some(key) = self.cached(&code).await {
            return Ok(key);
        }

        self.flight
            .run(&code, || async {
                // A concurrent flight may have refreshed the entry while this
                // caller waited for leadership.
                if let Some(key) = self.cached(&code).await {
                    return Ok(key);
                }

                let key = self.registry.lookup_encryption_key(recipient).await?;
                tracing::debug!(participant = %code, "cached recipient encryption key");
                self.cache.write().await.insert(
                    code.clone(),
                    CacheEntry {
                        key: key.clone(),
                        expires_at: Instant::now() + self.ttl,
                    },
                );
                Ok(key)
            })
            .await
    }

    /// Drops any cached key for the participant.
    pub async fn invalidate(&self, recipient: &ParticipantCode) {
        self.cache.write().await.remove(recipient.as_str());
    }
}
