//! Process-wide logging setup shared by the marketplace binaries.

/// Tracing subscriber configuration.
pub mod tracing;

/// Install the global subscriber.
///
/// Repeated calls are no-ops.
pub fn init() {
    tracing::init();
}
