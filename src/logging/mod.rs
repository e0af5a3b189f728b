//! Console and file logging.
//!
//! [`Logger`] turns messages into `tracing` events and keeps task outcomes
//! for the summary. The `report` functions render reconciled entries and
//! rollback steps into lines for it.

mod logger;
mod report;
mod subscriber;
mod types;
mod utils;

pub use logger::Logger;
pub use report::{entry_line, log_entry, print_link_report, print_rollback_report};
pub use subscriber::init_subscriber;
pub use types::{Log, TaskEntry, TaskStatus, TaskTally};

/// Guards `XDG_CACHE_HOME` while a test points it at a temp directory.
#[cfg(test)]
pub(crate) static TEST_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// A [`Logger`] whose events go to a log file in a fresh temp cache.
///
/// The file layer is installed as the thread-local default, so it only
/// sees events from the calling test. Keep the guard alive for the whole
/// test.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};

    let cache = tempfile::tempdir().expect("temp cache dir");
    let (log, file_layer) = {
        let _env = TEST_ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // SAFETY: every test that touches XDG_CACHE_HOME holds TEST_ENV_MUTEX,
        // and the variable is removed again before the lock is dropped.
        #[allow(unsafe_code)]
        unsafe {
            std::env::set_var("XDG_CACHE_HOME", cache.path());
        }
        let file_layer = subscriber::FileLayer::new("test").expect("file layer");
        let log = Logger::new("test");
        // SAFETY: as above.
        #[allow(unsafe_code)]
        unsafe {
            std::env::remove_var("XDG_CACHE_HOME");
        }
        (log, file_layer)
    };
    let dispatch = tracing::Dispatch::new(
        tracing_subscriber::registry().with(file_layer.with_filter(LevelFilter::DEBUG)),
    );
    let guard = tracing::dispatcher::set_default(&dispatch);
    (log, cache, guard)
}
