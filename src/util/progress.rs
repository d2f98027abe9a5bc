//! Spinners for long-running recipe steps.

use std::io::{stderr, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// A spinner shown while a blocking step runs. Hidden when stderr is not a
/// terminal so logs stay clean in CI.
pub struct Step {
    bar: ProgressBar,
}

impl Step {
    pub fn start(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::info!("{}", message);

        let bar = if stderr().is_terminal() {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(message);

        Step { bar }
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for Step {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
