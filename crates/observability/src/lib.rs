//! Tracing/logging setup shared by stockroom binaries.

/// Initialize process-wide logging with the default (JSON) format.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(LogFormat::default());
}

/// Initialize process-wide logging with an explicit output format.
pub fn init_with(format: LogFormat) {
    tracing::init(format);
}

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use self::tracing::{LogFormat, UnknownLogFormat};
