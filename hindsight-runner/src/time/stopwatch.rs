// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stopwatch for timing program calls and whole runs.
//!
//! A stopwatch records a wall-clock start time (`DateTime<Local>`, for display) along with an
//! `Instant` (monotonic, for measuring). Elapsed time is always measured on the monotonic clock.

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

pub(crate) fn stopwatch() -> StopwatchStart {
    StopwatchStart::new()
}

/// The start state of a stopwatch.
#[derive(Clone, Debug)]
pub(crate) struct StopwatchStart {
    start_time: DateTime<Local>,
    instant: Instant,
}

impl StopwatchStart {
    fn new() -> Self {
        Self {
            start_time: Local::now(),
            instant: Instant::now(),
        }
    }

    pub(crate) fn snapshot(&self) -> StopwatchSnapshot {
        StopwatchSnapshot {
            start_time: self.start_time,
            duration: self.instant.elapsed(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StopwatchSnapshot {
    pub(crate) start_time: DateTime<Local>,
    pub(crate) duration: Duration,
}

impl StopwatchSnapshot {
    pub(crate) fn end_time(&self) -> DateTime<Local> {
        self.start_time + self.duration
    }

    /// Elapsed time in fractional milliseconds, the unit results are timed in.
    pub(crate) fn millis(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_measures_elapsed_time() {
        let start = stopwatch();
        std::thread::sleep(Duration::from_millis(20));
        let end = start.snapshot();

        assert!(end.duration >= Duration::from_millis(20));
        assert!(end.millis() >= 20.0, "millis: {}", end.millis());
        assert!(end.end_time() >= end.start_time);
    }
}
