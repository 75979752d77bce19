//! Build timing and progress output.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

const RIGHT_ARROW: &str = "\u{27A1}\u{FE0F}";

/// A simple timer for measuring stage durations.
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    /// Start a new timer with the given stage name.
    pub fn start(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Finish the timer, logging the elapsed time.
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        tracing::debug!(stage = %self.name, secs = elapsed.as_secs_f64(), "stage finished");
        elapsed
    }
}

/// Seconds rounded down to one decimal place, as shown to the user.
pub fn format_seconds(elapsed: Duration) -> String {
    let tenths = elapsed.as_millis() / 100;
    format!("{}.{}", tenths / 10, tenths % 10)
}

/// Print a pipeline step for the user.
pub fn step(message: &str) {
    if has_emoji_terminal() {
        print!("{RIGHT_ARROW}  ");
    }
    println!("{message}");
}

// Only a few terminals render colour emoji out of the box.
fn has_emoji_terminal() -> bool {
    static EMOJI: OnceLock<bool> = OnceLock::new();
    *EMOJI.get_or_init(|| {
        std::env::var_os("NATIVEJAR_FORCE_EMOJI").is_some()
            || matches!(
                std::env::var("TERM_PROGRAM").as_deref(),
                Ok("Apple_Terminal") | Ok("iTerm.app")
            )
    })
}
