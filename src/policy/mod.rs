//! Region policy: normalization, providers, the fail-closed cache, and the
//! projections consumers gate on.

pub mod http;
pub mod normalize;
pub mod projections;
pub mod provider;
pub mod store;
pub mod types;

pub use http::HttpPolicyProvider;
pub use normalize::normalize_policy;
pub use provider::{PolicyProvider, RuntimeMode, StaticPolicyProvider};
pub use store::{PolicyFetchOptions, PolicyStore};
pub use types::{NpcAggroMode, NpcPursuitProfile, PvpMode, RegionEventKind, RegionPolicy};
