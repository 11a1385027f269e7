//! Bounded waiting for an external state transition
//!
//! Login completion and page recovery both wait for the browser to reach some
//! state, give up after a budget, and bail out early on an explicit fault
//! signal. [`poll_until`] is that loop; callers supply the probe that inspects
//! the session on each tick.

use std::future::Future;
use std::time::Duration;

/// Smallest logical step counted per tick, so a zero interval still terminates
const MIN_STEP: Duration = Duration::from_millis(1);

/// What a single probe observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The awaited state was reached
    Ready,
    /// An explicit failure marker was seen; stop waiting
    Fault,
    /// Nothing conclusive yet
    Pending,
}

/// How a poll ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready,
    Fault,
    TimedOut,
}

/// Timing of a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before the first probe
    pub initial_delay: Duration,
    /// Logical time budget, counted in intervals
    pub timeout: Duration,
    /// Wait after every inconclusive probe
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            timeout,
            interval,
        }
    }

    /// Wait once, then probe once
    pub fn once_after(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            timeout: Duration::ZERO,
            interval: Duration::ZERO,
        }
    }

    /// Number of probes this policy performs when every probe is pending
    pub fn max_probes(&self) -> u64 {
        let step = self.interval.max(MIN_STEP).as_nanos();
        let ticks = self.timeout.as_nanos().div_ceil(step);
        ticks.max(1) as u64
    }
}

/// Probes until the probe reports `Ready` or `Fault`, or the budget runs out
///
/// The probe receives the logical time elapsed so far (intervals already
/// waited). Each inconclusive probe is followed by a sleep of one interval;
/// the loop times out once the elapsed time reaches the budget, so a probe
/// always runs at least once.
pub async fn poll_until<F, Fut>(policy: PollPolicy, mut probe: F) -> PollOutcome
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = Probe>,
{
    if !policy.initial_delay.is_zero() {
        tokio::time::sleep(policy.initial_delay).await;
    }

    let step = policy.interval.max(MIN_STEP);
    let mut elapsed = Duration::ZERO;

    loop {
        match probe(elapsed).await {
            Probe::Ready => return PollOutcome::Ready,
            Probe::Fault => return PollOutcome::Fault,
            Probe::Pending => {}
        }

        if !policy.interval.is_zero() {
            tokio::time::sleep(policy.interval).await;
        }
        elapsed += step;

        if elapsed >= policy.timeout {
            return PollOutcome::TimedOut;
        }
    }
}
