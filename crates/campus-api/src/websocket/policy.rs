// ── Reconnection policy ──
//
// Two deployments exist: an always-on client that retries forever with a
// fixed delay, and a short-lived client that gives up after a ceiling.
// Both are the same struct with a different `max_retries`.

use std::time::Duration;

/// Delay strategy between reconnection attempts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Same delay before every attempt.
    #[default]
    Fixed,
    /// `delay * 2^(attempt-1)`, capped at `max_delay`, with +-25% jitter.
    Exponential { max_delay: Duration },
}

/// Reconnection configuration for the notification socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Base delay between an unexpected close and the next attempt. Default: 3s.
    pub delay: Duration,

    /// Maximum reconnection attempts before entering terminal failure.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,

    /// How `delay` evolves across attempts.
    pub backoff: Backoff,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self::always_on()
    }
}

impl ReconnectConfig {
    /// Unbounded retry with a fixed 3s delay.
    pub fn always_on() -> Self {
        Self {
            delay: Duration::from_secs(3),
            max_retries: None,
            backoff: Backoff::Fixed,
        }
    }

    /// Give up after `max_retries` failed reconnection attempts.
    pub fn bounded(max_retries: u32) -> Self {
        Self {
            max_retries: Some(max_retries),
            ..Self::always_on()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Whether reconnection attempt number `attempt` (1-based) may be scheduled.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_retries.is_none_or(|max| attempt <= max)
    }

    /// Delay before reconnection attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay } => {
                calculate_backoff(attempt.saturating_sub(1), self.delay, *max_delay)
            }
        }
    }
}

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^exponent, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from many clients.
fn calculate_backoff(exponent: u32, initial: Duration, max: Duration) -> Duration {
    let base = initial.as_secs_f64() * 2.0_f64.powi(i32::try_from(exponent).unwrap_or(i32::MAX));
    let capped = base.min(max.as_secs_f64());

    // Deterministic jitter seeded from the exponent.
    let jitter_factor = 1.0 + 0.25 * (f64::from(exponent) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    // Saturate instead of panicking when a huge cap overflows `Duration`.
    Duration::try_from_secs_f64(with_jitter).unwrap_or(Duration::MAX)
}
