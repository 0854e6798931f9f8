//! Process-wide logging setup for the FabLab services.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Install the global subscriber using `LOG_FORMAT` and `RUST_LOG`.
///
/// Later calls leave the first subscriber in place.
pub fn init() {
    crate::tracing::init();
}
