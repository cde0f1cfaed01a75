//! Bounded retry with backoff for a cold routing backend.
//!
//! A scaled-to-zero backend refuses connections until its replica is up.
//! Rather than scattering sleep loops through the matrix provider, the wait
//! lives in one combinator with an explicit deadline.

use std::time::{Duration, Instant};

use tracing::warn;

/// Backoff schedule for cold-start retries.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// First wait after a failed attempt.
    pub initial_interval: Duration,
    /// Interval cap; the wait doubles until it reaches this.
    pub max_interval: Duration,
    /// Total time allowed across all attempts. Past this, the last error is
    /// returned to the caller.
    pub ceiling: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(8),
            ceiling: Duration::from_secs(60),
        }
    }
}

/// Runs `op`, retrying while the deadline allows. Between attempts the
/// liveness `probe` is consulted with growing intervals; a truthy probe cuts
/// the wait short so a freshly warm backend is queried immediately.
pub fn retry_with_backoff<T, E, P, Op>(
    policy: &BackoffPolicy,
    mut probe: P,
    mut op: Op,
) -> Result<T, E>
where
    E: std::fmt::Display,
    P: FnMut() -> bool,
    Op: FnMut() -> Result<T, E>,
{
    let deadline = Instant::now() + policy.ceiling;
    let mut interval = policy.initial_interval.max(Duration::from_millis(1));
    let mut attempt = 1u32;

    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(err);
                }
                warn!(attempt, error = %err, "backend attempt failed, backing off");

                // Wait for the backend to report alive, or for the deadline.
                loop {
                    let remaining = match deadline.checked_duration_since(Instant::now()) {
                        Some(remaining) if !remaining.is_zero() => remaining,
                        _ => return Err(err),
                    };
                    std::thread::sleep(interval.min(remaining));
                    interval = (interval * 2).min(policy.max_interval.max(Duration::from_millis(1)));
                    if probe() {
                        break;
                    }
                    if Instant::now() >= deadline {
                        return Err(err);
                    }
                }
                attempt += 1;
            }
        }
    }
}
