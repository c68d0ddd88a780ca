//! Policy providers: where raw policy documents come from
//!
//! The store never decides which provider to use. The composition root
//! installs one explicitly: [`super::http::HttpPolicyProvider`] in production,
//! [`StaticPolicyProvider`] in tests and local tooling.

use crate::core::error::{ProviderError, RegionError};
use crate::core::types::PolicyKey;
use crate::policy::types::RegionPolicy;
use ahash::AHashMap;
use async_trait::async_trait;
use serde_json::Value;

/// Which kind of host the store runs in. Chosen by the composition root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    #[default]
    Production,
    Test,
}

/// Source of raw policy documents.
///
/// `fetch` returns the document as stored; `Value::Null` means "no row".
/// Documents are untrusted and normalized by the caller.
#[async_trait]
pub trait PolicyProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Providers that only make sense inside tests. The store refuses them in
    /// a production runtime.
    fn is_test_only(&self) -> bool {
        false
    }

    async fn fetch(&self, shard_id: &str, region_id: &str) -> Result<Value, ProviderError>;
}

/// In-memory provider seeded with documents
#[derive(Debug, Clone, Default)]
pub struct StaticPolicyProvider {
    docs: AHashMap<PolicyKey, Value>,
}

impl StaticPolicyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from raw documents keyed by `PolicyKey`
    pub fn from_documents(docs: AHashMap<PolicyKey, Value>) -> Self {
        let docs = docs
            .into_iter()
            .map(|(key, doc)| (PolicyKey::new(&key.shard_id, &key.region_id), doc))
            .collect();
        Self { docs }
    }

    /// Parse a JSON object of `{"shard::region": {...policy...}}`.
    ///
    /// Entries with keys that do not parse are skipped.
    pub fn from_json_str(content: &str) -> Result<Self, RegionError> {
        let root: serde_json::Map<String, Value> = serde_json::from_str(content)?;
        let mut provider = Self::new();
        for (raw_key, doc) in root {
            match PolicyKey::parse(&raw_key) {
                Some(key) => {
                    provider.docs.insert(key, doc);
                }
                None => tracing::warn!(key = %raw_key, "Skipping policy seed with malformed key"),
            }
        }
        Ok(provider)
    }

    pub fn with_document(mut self, shard_id: &str, region_id: &str, doc: Value) -> Self {
        self.insert(shard_id, region_id, doc);
        self
    }

    pub fn with_policy(self, shard_id: &str, region_id: &str, policy: &RegionPolicy) -> Self {
        self.with_document(shard_id, region_id, policy.to_value())
    }

    pub fn insert(&mut self, shard_id: &str, region_id: &str, doc: Value) {
        self.docs.insert(PolicyKey::new(shard_id, region_id), doc);
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[async_trait]
impl PolicyProvider for StaticPolicyProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn is_test_only(&self) -> bool {
        true
    }

    async fn fetch(&self, shard_id: &str, region_id: &str) -> Result<Value, ProviderError> {
        Ok(self
            .docs
            .get(&PolicyKey::new(shard_id, region_id))
            .cloned()
            .unwrap_or(Value::Null))
    }
}
