//! Progress indicator for analyzer runs.
//!
//! Drawn on stderr so that stdout stays clean for the report.

use std::io::{self, Write};
use std::time::{Duration, Instant};

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Simple progress bar for terminal output
pub struct ProgressBar {
    total: u64,
    current: u64,
    start_time: Instant,
    last_update: Option<Instant>,
    message: String,
}

impl ProgressBar {
    pub fn new(total: u64, message: String) -> Self {
        Self {
            total,
            current: 0,
            start_time: Instant::now(),
            last_update: None,
            message,
        }
    }

    pub fn set_message(&mut self, message: String) {
        self.message = message;
        self.redraw();
    }

    pub fn update(&mut self, current: u64) {
        self.current = current.min(self.total);
        self.redraw();
    }

    /// Draw the final state and end the line
    pub fn finish(&mut self) {
        self.display();
        let _ = writeln!(io::stderr());
    }

    pub fn percentage(&self) -> u64 {
        if self.total > 0 {
            (self.current * 100) / self.total
        } else {
            100
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        // Throttled to avoid flickering
        if self
            .last_update
            .map_or(true, |last| now.duration_since(last) > REDRAW_INTERVAL)
        {
            self.display();
            self.last_update = Some(now);
        }
    }

    fn display(&self) {
        let mut stderr = io::stderr().lock();
        let _ = write!(
            stderr,
            "\r\x1b[2K{} [{}/{}] {}% ({:.1}s)",
            self.message,
            self.current,
            self.total,
            self.percentage(),
            self.start_time.elapsed().as_secs_f64()
        );
        let _ = stderr.flush();
    }
}
