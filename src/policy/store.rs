//! Fail-closed policy cache over a pluggable provider
//!
//! `get_policy` never fails: provider errors, panics and garbage documents all
//! collapse to the empty policy, and that empty result is cached for the TTL
//! so a flapping backing store is not hammered on every call.
//!
//! `peek` is the hot-path read for per-tick loops. It never awaits and only
//! sees what an earlier `get_policy`/`warm` left in the cache.

use crate::core::clock::Clock;
use crate::core::error::{RegionError, Result};
use crate::core::types::{PolicyKey, TimestampMs};
use crate::policy::normalize::normalize_policy;
use crate::policy::provider::{PolicyProvider, RuntimeMode, StaticPolicyProvider};
use crate::policy::types::RegionPolicy;
use ahash::AHashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;

/// Per-call overrides for `get_policy`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyFetchOptions {
    /// Skip the cache and go to the provider
    pub bypass_cache: bool,
    /// Freshness window for this lookup (store default when `None`)
    pub ttl_ms: Option<u64>,
}

impl PolicyFetchOptions {
    pub fn bypass() -> Self {
        Self {
            bypass_cache: true,
            ttl_ms: None,
        }
    }

    pub fn with_ttl(ttl_ms: u64) -> Self {
        Self {
            bypass_cache: false,
            ttl_ms: Some(ttl_ms),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    policy: RegionPolicy,
    loaded_at_ms: TimestampMs,
}

impl CacheEntry {
    fn is_fresh(&self, now: TimestampMs, ttl_ms: u64) -> bool {
        now.saturating_sub(self.loaded_at_ms) < ttl_ms
    }
}

type InflightCell = Arc<OnceCell<RegionPolicy>>;

pub struct PolicyStore {
    runtime: RuntimeMode,
    default_ttl_ms: u64,
    clock: Arc<dyn Clock>,
    provider: Mutex<Option<Arc<dyn PolicyProvider>>>,
    cache: Mutex<AHashMap<PolicyKey, CacheEntry>>,
    inflight: Mutex<AHashMap<PolicyKey, InflightCell>>,
    /// Bumped on every provider swap; loads started under an older
    /// generation are not written back to the cache.
    generation: AtomicU64,
}

impl PolicyStore {
    pub fn new(runtime: RuntimeMode, default_ttl_ms: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            runtime,
            default_ttl_ms,
            clock,
            provider: Mutex::new(None),
            cache: Mutex::new(AHashMap::new()),
            inflight: Mutex::new(AHashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn runtime(&self) -> RuntimeMode {
        self.runtime
    }

    pub fn default_ttl_ms(&self) -> u64 {
        self.default_ttl_ms
    }

    /// Name of the active provider, if any
    pub fn provider_name(&self) -> Option<String> {
        lock(&self.provider).as_ref().map(|p| p.name().to_string())
    }

    /// Fetch-or-cache lookup. Never fails.
    ///
    /// Runs on any executor. Provider panics are only contained when polled
    /// inside a tokio runtime.
    pub async fn get_policy(
        &self,
        shard_id: &str,
        region_id: &str,
        opts: PolicyFetchOptions,
    ) -> RegionPolicy {
        let key = PolicyKey::new(shard_id, region_id);
        let ttl_ms = opts.ttl_ms.unwrap_or(self.default_ttl_ms);

        if !opts.bypass_cache {
            let now = self.clock.now_ms();
            if let Some(entry) = lock(&self.cache).get(&key) {
                if entry.is_fresh(now, ttl_ms) {
                    tracing::trace!(key = %key, "Policy cache hit");
                    return entry.policy.clone();
                }
            }
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let cell = lock(&self.inflight)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let policy = cell.get_or_init(|| self.load(&key)).await.clone();

        if self.generation.load(Ordering::SeqCst) == generation {
            lock(&self.cache).insert(
                key.clone(),
                CacheEntry {
                    policy: policy.clone(),
                    loaded_at_ms: self.clock.now_ms(),
                },
            );
        }

        let mut inflight = lock(&self.inflight);
        if inflight.get(&key).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
            inflight.remove(&key);
        }
        drop(inflight);

        policy
    }

    /// Cache-only lookup for code that must not await.
    ///
    /// Returns the empty policy when the region was never loaded or its entry
    /// is older than the store TTL.
    pub fn peek(&self, shard_id: &str, region_id: &str) -> RegionPolicy {
        let key = PolicyKey::new(shard_id, region_id);
        let now = self.clock.now_ms();
        lock(&self.cache)
            .get(&key)
            .filter(|entry| entry.is_fresh(now, self.default_ttl_ms))
            .map(|entry| entry.policy.clone())
            .unwrap_or_default()
    }

    /// Load several regions of one shard into the cache
    pub async fn warm(&self, shard_id: &str, region_ids: &[&str]) {
        for region_id in region_ids {
            self.get_policy(shard_id, region_id, PolicyFetchOptions::default())
                .await;
        }
    }

    /// Swap the active provider and clear the cache.
    ///
    /// A test-only provider is refused in a production runtime; that is the
    /// one loud failure in the engine, and it leaves the store untouched.
    pub fn set_provider(&self, provider: Option<Arc<dyn PolicyProvider>>) -> Result<()> {
        if let Some(p) = &provider {
            self.guard_test_only(p.name(), p.is_test_only())?;
        }
        tracing::info!(
            provider = provider.as_ref().map(|p| p.name()).unwrap_or("none"),
            "Installing policy provider"
        );
        *lock(&self.provider) = provider;
        self.clear_cache();
        Ok(())
    }

    /// Seed the store with in-memory documents (or drop the seed with `None`).
    ///
    /// Refused outright in a production runtime.
    pub fn set_test_overrides(&self, overrides: Option<AHashMap<PolicyKey, Value>>) -> Result<()> {
        self.guard_test_only("static", true)?;
        let provider = overrides.map(|docs| {
            Arc::new(StaticPolicyProvider::from_documents(docs)) as Arc<dyn PolicyProvider>
        });
        *lock(&self.provider) = provider;
        self.clear_cache();
        Ok(())
    }

    /// Drop one region from the cache
    pub fn invalidate(&self, shard_id: &str, region_id: &str) {
        lock(&self.cache).remove(&PolicyKey::new(shard_id, region_id));
    }

    /// Drop every cached entry and detach in-flight loads from the cache
    pub fn clear_cache(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        lock(&self.inflight).clear();
        lock(&self.cache).clear();
    }

    pub fn cached_len(&self) -> usize {
        lock(&self.cache).len()
    }

    fn guard_test_only(&self, provider: &str, test_only: bool) -> Result<()> {
        if test_only && self.runtime == RuntimeMode::Production {
            tracing::error!(provider, "Refusing test-only policy provider in production runtime");
            return Err(RegionError::TestProviderInProduction {
                provider: provider.to_string(),
            });
        }
        Ok(())
    }

    async fn load(&self, key: &PolicyKey) -> RegionPolicy {
        let provider = lock(&self.provider).clone();
        let Some(provider) = provider else {
            return RegionPolicy::empty();
        };

        let name = provider.name().to_string();
        let shard_id = key.shard_id.clone();
        let region_id = key.region_id.clone();
        // Inside a tokio runtime the fetch runs as its own task so a panicking
        // provider is contained. Other executors await it inline.
        let fetched = match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle
                    .spawn(async move { provider.fetch(&shard_id, &region_id).await })
                    .await
            }
            Err(_) => Ok(provider.fetch(&shard_id, &region_id).await),
        };

        match fetched {
            Ok(Ok(raw)) => {
                if !raw.is_null() && !raw.is_object() {
                    tracing::warn!(provider = %name, key = %key, "Policy document is not an object; ignoring");
                }
                normalize_policy(&raw)
            }
            Ok(Err(err)) => {
                tracing::warn!(provider = %name, key = %key, error = %err, "Policy fetch failed; using empty policy");
                RegionPolicy::empty()
            }
            Err(join_err) => {
                tracing::warn!(provider = %name, key = %key, error = %join_err, "Policy provider aborted; using empty policy");
                RegionPolicy::empty()
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
