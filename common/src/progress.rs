use std::io::IsTerminal;

use indicatif::ProgressBar;
use indicatif::ProgressDrawTarget;
use indicatif::ProgressStyle;

/// Redraws are capped at this rate; updates in between only mutate state.
const MAX_REFRESH_HZ: u8 = 1;

/// Rate-limited status line for long-running fleet operations.
///
/// Draws to stderr at most once per second and stays silent when stderr is
/// not an interactive terminal or when quiet output was requested. Dropping
/// the reporter finalizes the bar, so an error unwind cannot leave a stale
/// redraw ticker behind.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    pub fn new(label: &str, total: u64, quiet: bool) -> Self {
        let bar = if quiet || !std::io::stderr().is_terminal() {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::with_draw_target(
                Some(total),
                ProgressDrawTarget::stderr_with_hz(MAX_REFRESH_HZ),
            );
            bar.set_style(
                ProgressStyle::with_template("{prefix}: {pos}/{len} {wide_msg} {elapsed}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar.set_prefix(label.to_string());
            bar
        };
        Self { bar }
    }

    /// Replace the status message and advance the counter by `inc` items.
    pub fn update(&self, message: &str, inc: u64) {
        self.bar.set_message(message.to_string());
        if inc > 0 {
            self.bar.inc(inc);
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_progress_renders_nothing() {
        let progress = Progress::new("Deleting", 3, true);
        assert!(progress.bar.is_hidden());
        progress.update("some/path.git", 1);
        progress.finish();
    }

    #[test]
    fn update_without_increment_keeps_position() {
        let progress = Progress::new("Repacking", 2, true);
        progress.update("proj | gc", 0);
        assert_eq!(progress.bar.position(), 0);
        progress.update("proj", 1);
        assert_eq!(progress.bar.position(), 1);
    }
}
