//! Progress bar for batch runs.

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};

/// Per-item progress; hidden when disabled or stderr is not a terminal.
pub(crate) struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    pub(crate) fn new(enabled: bool, total: usize) -> Self {
        if !enabled || !std::io::stderr().is_terminal() {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX));
        bar.set_style(
            ProgressStyle::with_template("[{pos}/{len}] {bar:30.cyan/blue} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    /// Shows the file currently being processed.
    pub(crate) fn start_item(&self, pdf_name: &str) {
        self.bar.set_message(pdf_name.to_string());
    }

    /// Advances regardless of the item's outcome.
    pub(crate) fn finish_item(&self) {
        self.bar.inc(1);
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> u64 {
        self.bar.position()
    }
}
