pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use error::{ConfigError, ProviderError, RegionError, Result};
pub use types::{normalize_region_id, PolicyKey, TimestampMs};
