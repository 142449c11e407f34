//! Progress reporting for a run
//!
//! The engine talks to a [`ProgressObserver`]; the CLI plugs in
//! [`TerminalProgress`], which draws a `Done N%` line on standard error.
//! On a terminal the line is an indicatif bar; otherwise each update is
//! written as `\rDone N%` and the run ends with a newline.

use csmap_common::time::format_rfc822;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;

/// Redraws per second for the terminal progress line
const PROGRESS_REFRESH_HZ: u8 = 10;

/// Receives run lifecycle events from the planner.
///
/// Called from worker tasks; implementations must be cheap and must not block.
pub trait ProgressObserver: Send + Sync {
    /// The probe returned `total_records`, split into `jobs` pages
    fn on_plan(&self, _total_records: u64, _jobs: u64) {}

    /// Overall completion moved to `percent`
    fn on_progress(&self, percent: u8);

    /// Every worker has finished
    fn on_finish(&self) {}
}

/// Observer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(&self, _percent: u8) {}
}

/// How the percentage line reaches standard error
enum ProgressLine {
    /// Rate-limited indicatif bar, for terminals
    Bar(ProgressBar),
    /// Carriage-return updates, for redirected or piped stderr
    Plain,
}

/// Run header plus a percentage line on standard error
pub struct TerminalProgress {
    from: i64,
    to: i64,
    line: ProgressLine,
}

impl TerminalProgress {
    /// Bar on a terminal, plain lines otherwise
    pub fn new(from: i64, to: i64) -> Self {
        if std::io::stderr().is_terminal() {
            Self::with_bar(from, to)
        } else {
            Self::plain(from, to)
        }
    }

    pub fn with_bar(from: i64, to: i64) -> Self {
        let bar = ProgressBar::with_draw_target(
            Some(100),
            ProgressDrawTarget::stderr_with_hz(PROGRESS_REFRESH_HZ),
        );
        bar.set_style(
            ProgressStyle::with_template("Done {pos}%").unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self {
            from,
            to,
            line: ProgressLine::Bar(bar),
        }
    }

    pub fn plain(from: i64, to: i64) -> Self {
        Self {
            from,
            to,
            line: ProgressLine::Plain,
        }
    }
}

impl ProgressObserver for TerminalProgress {
    fn on_plan(&self, total_records: u64, _jobs: u64) {
        eprintln!(
            "Analyzing {} records between\n  {} and\n  {}",
            total_records,
            display_time(self.from),
            display_time(self.to)
        );
    }

    fn on_progress(&self, percent: u8) {
        match &self.line {
            ProgressLine::Bar(bar) => bar.set_position(u64::from(percent)),
            ProgressLine::Plain => eprint!("\rDone {}%", percent),
        }
    }

    fn on_finish(&self) {
        match &self.line {
            ProgressLine::Bar(bar) => bar.finish(),
            ProgressLine::Plain => eprintln!(),
        }
    }
}

/// RFC 822 rendering, falling back to the raw millisecond value
fn display_time(ms: i64) -> String {
    format_rfc822(ms).unwrap_or_else(|_| ms.to_string())
}
