//! Shared constants.

/// Prefix under which failed uploads are parked on the local backend.
pub const FALLBACK_PREFIX: &str = "fallback";

/// Prefix for disposable health-check probe objects.
pub const HEALTH_PROBE_PREFIX: &str = "healthcheck";

/// Content type reported when nothing better is known.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// AES-256 key length in bytes.
pub const ENCRYPTION_KEY_LEN: usize = 32;

/// Nonce (IV) length for AES-256-GCM.
pub const IV_LEN: usize = 12;
