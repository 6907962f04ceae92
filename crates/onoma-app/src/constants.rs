//! Cross-cutting application constants.

/// Default Gemini model used for filename inference.
pub const DEFAULT_NAMING_MODEL: &str = "gemini-2.0-flash";

/// Maximum number of records submitted to the naming service in one call.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Idle interval between orchestration cycles, in seconds.
pub const DEFAULT_COOLDOWN_SECS: u64 = 2;

/// How many times a transient naming failure is retried before giving up.
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Base wait between naming retries; retry `n` waits `n * base`.
pub const DEFAULT_RETRY_BASE_SECS: u64 = 3;

/// Naming requests allowed per second by the shared rate limiter.
pub const DEFAULT_ORACLE_RPS: u32 = 2;

/// Token substituted when a sanitized label has no usable characters.
pub const FALLBACK_LABEL: &str = "Unknown";

/// Separator between the english, chinese, and domain parts of a final name.
pub const LABEL_SEPARATOR: &str = "--";
