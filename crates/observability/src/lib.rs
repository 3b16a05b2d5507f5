//! Tracing and logging setup shared by binaries.

pub mod subscriber;

pub use subscriber::LogFormat;

/// Initialize process-wide tracing from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    subscriber::init(LogFormat::from_env());
}
