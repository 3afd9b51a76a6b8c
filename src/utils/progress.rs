//! Progress reporting for render runs.
//!
//! Progress bars are hidden when `TERRA_NO_PROGRESS` is set, when the caller
//! asks for it (`--no-progress`, `--quiet`, `--stdout`), or when stderr is
//! not a terminal.

use std::io::IsTerminal;

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};

use crate::constants::TERRA_NO_PROGRESS_ENV;

fn is_progress_disabled() -> bool {
    std::env::var_os(TERRA_NO_PROGRESS_ENV).is_some() || !std::io::stderr().is_terminal()
}

/// A progress bar counting finished render jobs.
///
/// Cloning shares the underlying bar, so workers can each hold a handle.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a progress bar for `len` units of work.
    pub fn new(len: u64) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(len);
            bar.set_style(default_style());
            bar
        };
        Self {
            inner: bar,
        }
    }

    /// Creates a bar that never draws.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Creates a visible bar unless `hidden` is set or progress is disabled globally.
    pub fn for_jobs(len: u64, hidden: bool) -> Self {
        if hidden {
            Self::hidden()
        } else {
            Self::new(len)
        }
    }

    /// Sets the message shown next to the bar.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Advances the bar.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Current position.
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Prints a line above the bar without corrupting it.
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.inner.is_hidden() {
            eprintln!("{}", msg.as_ref());
        } else {
            self.inner.println(msg.as_ref());
        }
    }

    /// Finishes and removes the bar from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}
