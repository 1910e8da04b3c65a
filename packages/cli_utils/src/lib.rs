#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the ParkenDD tools.
//!
//! [`init_logger`] sets up `indicatif-log-bridge` so that `log::info!` and
//! friends are suspended while spinners redraw, and [`SpinnerActivity`]
//! shows a spinner whenever the client has requests in flight.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use parkendd_client::ActivityIndicator;

pub use indicatif::MultiProgress;

/// An [`ActivityIndicator`] that shows an `indicatif` spinner while the
/// network is busy.
pub struct SpinnerActivity {
    multi: MultiProgress,
    message: String,
    bar: Mutex<Option<ProgressBar>>,
}

impl std::fmt::Debug for SpinnerActivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinnerActivity")
            .field("message", &self.message)
            .field("visible", &self.is_visible())
            .finish_non_exhaustive()
    }
}

impl SpinnerActivity {
    #[must_use]
    pub fn new(multi: &MultiProgress, message: &str) -> Self {
        Self {
            multi: multi.clone(),
            message: message.to_string(),
            bar: Mutex::new(None),
        }
    }

    /// Whether the spinner is currently shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn show(&self) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(self.message.clone());
        bar
    }
}

impl ActivityIndicator for SpinnerActivity {
    fn set_busy(&self, busy: bool) {
        let mut bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if busy {
            if bar.is_none() {
                *bar = Some(self.show());
            }
        } else if let Some(spinner) = bar.take() {
            spinner.finish_and_clear();
            self.multi.remove(&spinner);
        }
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while spinners redraw.
///
/// Returns the [`MultiProgress`] that all spinners must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Already set, e.g. in tests

    log::set_max_level(level);

    multi
}
