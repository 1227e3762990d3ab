//! Logging infrastructure: console output, rotating audit log, spinner.

mod logger;
pub mod rotation;
pub mod spinner;
mod subscriber;
mod types;
mod utils;

pub use logger::Logger;
pub use rotation::{LogFile, RotatingFile};
pub use spinner::Spinner;
pub use subscriber::init_subscriber;
pub use types::{Log, VolumeEntry, VolumeStatus};

/// Create a Logger backed by an isolated per-thread tracing subscriber
/// with a [`subscriber::FileLayer`] writing into a temporary directory, so
/// that tracing events emitted by logger methods reach a log file during
/// tests.
///
/// Returns a [`tracing::dispatcher::DefaultGuard`] that must be kept alive
/// for the duration of the test; dropping it restores the previous
/// thread-local dispatcher.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let spec = LogFile::new(tmp.path().join("test.log"));
    let file_layer = subscriber::FileLayer::new(&spec).expect("failed to create file layer");
    let log = Logger::new(Some(spec.path));
    let subscriber =
        tracing_subscriber::registry().with(file_layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (log, tmp, guard)
}
