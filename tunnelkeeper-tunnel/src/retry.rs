//! Retry policy for the failover pipeline.

use std::collections::HashMap;
use std::time::Duration;

/// Default attempts per provider before moving on.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default wait between two attempts on the same provider.
pub const DEFAULT_INTER_ATTEMPT_DELAY: Duration = Duration::from_secs(10);

/// Default wait before restarting a cycle after every provider failed.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

/// How hard to try each provider, and how long to rest after a failed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per provider when the provider does not set its own bound.
    pub max_attempts: u32,
    /// Delay between two attempts on the same provider.
    pub inter_attempt_delay: Duration,
    /// Delay before a new cycle after all providers failed.
    pub cooldown: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt bound and default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            inter_attempt_delay: DEFAULT_INTER_ATTEMPT_DELAY,
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    /// Sets the inter-attempt delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.inter_attempt_delay = delay;
        self
    }

    /// Sets the cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Resolves the attempt bound for a provider, honouring its override.
    pub fn attempts_for(&self, provider_override: Option<u32>) -> u32 {
        provider_override.unwrap_or(self.max_attempts).max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

// ============================================================================
// Cycle State
// ============================================================================

/// Attempt counters for the current failover cycle.
///
/// Reset at the start of every cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleState {
    attempts: HashMap<String, u32>,
    cycle: u64,
}

impl CycleState {
    /// Creates empty counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new cycle: clears every counter and bumps the cycle number.
    pub fn reset(&mut self) {
        self.attempts.clear();
        self.cycle += 1;
    }

    /// Counts one more attempt for `provider`, returning its one-based index.
    pub fn record_attempt(&mut self, provider: &str) -> u32 {
        let count = self.attempts.entry(provider.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Attempts made on `provider` this cycle.
    pub fn attempts(&self, provider: &str) -> u32 {
        self.attempts.get(provider).copied().unwrap_or(0)
    }

    /// Total attempts this cycle.
    pub fn total_attempts(&self) -> u32 {
        self.attempts.values().sum()
    }

    /// Number of cycles started.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }
}
