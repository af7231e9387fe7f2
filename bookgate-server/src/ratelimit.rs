//! Process-wide search rate limiting

use std::convert::Infallible;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Minimum interval between searches, shared by every session.
///
/// Holds a single `last_search` timestamp behind a mutex. The check and the
/// update happen in one critical section, so two concurrent callers can never
/// both be admitted inside the same interval.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_search: Mutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_search: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Admit a search now, or return how long the caller must wait.
    pub fn check_and_record(&self) -> Result<(), Duration> {
        self.check_and_record_at(Instant::now())
    }

    /// Admit a search at `now`, recording it as the last accepted search.
    ///
    /// Returns `Err(remaining)` without recording when `now` falls inside the
    /// interval of the previously accepted search.
    pub fn check_and_record_at(&self, now: Instant) -> Result<(), Duration> {
        self.admit_at(now, || Ok::<(), Infallible>(())).map(|_| ())
    }

    /// Admit a search now and run `send` inside the same critical section.
    ///
    /// The search only counts against the interval when `send` succeeds, so a
    /// failed send leaves the window open for the next caller.
    pub fn admit<T, E>(&self, send: impl FnOnce() -> Result<T, E>) -> Result<Result<T, E>, Duration> {
        self.admit_at(Instant::now(), send)
    }

    pub fn admit_at<T, E>(
        &self,
        now: Instant,
        send: impl FnOnce() -> Result<T, E>,
    ) -> Result<Result<T, E>, Duration> {
        let mut last_search = self
            .last_search
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(last) = *last_search
            && let Some(remaining) = self.remaining(last, now)
        {
            return Err(remaining);
        }

        let result = send();
        if result.is_ok() {
            *last_search = Some(now);
        }
        Ok(result)
    }

    /// Time left in the interval that started at `last`, if any
    fn remaining(&self, last: Instant, now: Instant) -> Option<Duration> {
        match last.checked_add(self.interval) {
            Some(next_available) if now < next_available => Some(next_available - now),
            Some(_) => None,
            // Past the end of representable time, so never available again
            None => Some(self.interval.saturating_sub(now.saturating_duration_since(last))),
        }
    }
}

/// Whole seconds to report to the client, never zero for a pending wait
pub fn seconds_remaining(remaining: Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}
