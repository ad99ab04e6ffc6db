/// Constants shared across crates

/// Number of days covered by one availability cache window.
pub const DEFAULT_CACHE_HORIZON_DAYS: u32 = 30;

/// Seconds between scheduled availability cache rebuilds (one day).
pub const DEFAULT_CACHE_REFRESH_SECS: u64 = 60 * 60 * 24;

/// TTL applied to joined-session state as a safety net against missed
/// leave events (one hour).
pub const DEFAULT_JOINED_TTL_SECS: u64 = 60 * 60;

/// Key prefix for availability cache entries in the shared store.
pub const AVAILABILITY_KEY_PREFIX: &str = "availability";

/// Key prefix for session membership state in the shared store.
pub const SESSION_KEY_PREFIX: &str = "session";
