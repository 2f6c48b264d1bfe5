//! Constants for estate storage
//!
//! Defaults and environment variable names for the snapshot cache.

// ============================================================================
// SNAPSHOT CACHE
// ============================================================================

/// Cache key under which the full Property collection is stored
pub const DEFAULT_SNAPSHOT_KEY: &str = "all_properties";

/// Snapshot time-to-live in seconds (1 hour)
pub const DEFAULT_SNAPSHOT_TTL_SECS: u64 = 3600;

/// Concurrent misses are not coalesced unless enabled
pub const DEFAULT_SINGLE_FLIGHT: bool = false;

/// Decimal places kept on hit/miss ratios
pub const RATIO_DECIMAL_PLACES: i32 = 4;

// ============================================================================
// REDIS
// ============================================================================

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

// ============================================================================
// ENVIRONMENT VARIABLES
// ============================================================================

pub const ENV_SNAPSHOT_KEY: &str = "ESTATE_CACHE_SNAPSHOT_KEY";
pub const ENV_SNAPSHOT_TTL_SECS: &str = "ESTATE_CACHE_SNAPSHOT_TTL_SECS";
pub const ENV_SINGLE_FLIGHT: &str = "ESTATE_CACHE_SINGLE_FLIGHT";
pub const ENV_REDIS_URL: &str = "ESTATE_REDIS_URL";
