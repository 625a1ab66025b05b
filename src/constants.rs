//! Cross-cutting, shared constants.

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Maximum tokens fed to a model forward pass (BERT-family position limit).
pub const DEFAULT_MAX_SEQ_LEN: usize = 512;

/// Output dimension of the stub encoder.
pub const STUB_EMBEDDING_DIM: usize = 384;

/// Backing identifier that selects the deterministic stub engine.
pub const STUB_MODEL_PATH: &str = "stub";

/// Capacity of the bounded log channel (lines).
pub const DEFAULT_LOG_BUFFERED_LINES: usize = 128_000;

/// Largest request body accepted (and buffered for failure logging).
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024 * 1024;

/// CORS preflight cache lifetime.
pub const CORS_MAX_AGE_SECS: u64 = 600;

/// Environment variable that overrides the device of every domain.
pub const ENV_DEVICE_OVERRIDE: &str = "DEVICE";
