//! Source of "today" for cutoff computation.
//!
//! The job compares order dates against the current calendar date, so the
//! clock is a seam: [`SystemClock`] in production, [`FixedClock`] in tests and
//! reproducible reruns.

use chrono::{Local, NaiveDate};

/// Provides the current calendar date.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Reads the local system date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always returns the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
