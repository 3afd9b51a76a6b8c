//! Test utilities for terra-cli
//!
//! Helpers shared by unit tests and the integration suite:
//! - [`MockRunner`]: a [`ShellRunner`](crate::shell::ShellRunner) that records
//!   commands and fakes their filesystem side-effects
//! - chart and fleet fixtures
//! - once-only test logging and per-test log capture
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use terra_cli::test_utils::{MockRunner, fake_helm_fetch};
//!
//! let runner = Arc::new(MockRunner::with_handler(fake_helm_fetch));
//! // inject `runner` into a resolver, then inspect runner.command_lines()
//! ```

pub mod fixtures;
pub mod mock_runner;

pub use fixtures::{FleetFixture, fake_helm_fetch, fake_helmfile_template, write_chart};
pub use mock_runner::MockRunner;

use std::io::Write;
use std::sync::{Arc, Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=resolver=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Log lines captured by [`capture_logs`].
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Everything logged so far.
    pub fn contents(&self) -> String {
        self.buffer.lock().map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Capture `level` and above on the current thread until the guard drops.
///
/// Pair with the default current-thread `#[tokio::test]` runtime so tasks
/// stay on the capturing thread.
pub fn capture_logs(level: Level) -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.to_string()))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_target(true)
        .finish();
    (capture, tracing::subscriber::set_default(subscriber))
}
