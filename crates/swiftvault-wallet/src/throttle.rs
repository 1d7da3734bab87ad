//! Failed-PIN throttling with exponential lockout.
//!
//! The throttle lives inside the persisted vault record, so the count
//! and any active lockout survive a restart. All arithmetic is on whole
//! seconds and saturates instead of overflowing.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use swiftvault_types::config::WalletConfig;
use swiftvault_types::{Result, SwiftvaultError};

// ---------------------------------------------------------------------------
// ThrottlePolicy
// ---------------------------------------------------------------------------

/// Attempt limit and lockout bounds, taken from [`WalletConfig`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ThrottlePolicy {
    /// Consecutive failures before lockouts start.
    pub max_attempts: u32,
    /// Lockout applied at exactly `max_attempts` failures.
    pub base_secs: u64,
    /// Upper bound on a single lockout.
    pub max_secs: u64,
}

impl From<&WalletConfig> for ThrottlePolicy {
    fn from(config: &WalletConfig) -> Self {
        Self {
            max_attempts: config.max_pin_attempts,
            base_secs: config.lockout_base_secs,
            max_secs: config.lockout_max_secs,
        }
    }
}

impl ThrottlePolicy {
    /// Lockout earned by the `failures`-th consecutive failure:
    /// `base × 2^(failures − max_attempts)`, capped at `max_secs`.
    /// `None` while under the limit.
    pub fn cooldown_secs(&self, failures: u32) -> Option<u64> {
        let over = failures.checked_sub(self.max_attempts)?;
        let factor = 1u64.checked_shl(over).unwrap_or(u64::MAX);
        Some(self.base_secs.saturating_mul(factor).min(self.max_secs))
    }
}

// ---------------------------------------------------------------------------
// PinThrottle
// ---------------------------------------------------------------------------

/// Persisted failure counter for one vault entry.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinThrottle {
    consecutive_failures: u32,
    locked_until: Option<DateTime<Utc>>,
}

impl PinThrottle {
    /// Consecutive failed attempts since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Whole seconds until another attempt is allowed, rounded up.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        let until = self.locked_until?;
        if until <= now {
            return None;
        }
        let millis = (until - now).num_milliseconds().max(0) as u64;
        Some(millis.div_ceil(1000).max(1))
    }

    /// Gate run before any key derivation.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::LockedOut`] while a lockout is active.
    pub fn check(&self, now: DateTime<Utc>) -> Result<()> {
        match self.remaining_secs(now) {
            Some(retry_after_secs) => Err(SwiftvaultError::LockedOut { retry_after_secs }),
            None => Ok(()),
        }
    }

    /// Counts a failure and arms the lockout if the limit is reached.
    /// Returns the lockout length applied, if any.
    pub fn record_failure(&mut self, policy: &ThrottlePolicy, now: DateTime<Utc>) -> Option<u64> {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let secs = policy.cooldown_secs(self.consecutive_failures)?;
        let secs_i64 = i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
        let until = now
            .checked_add_signed(Duration::seconds(secs_i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.locked_until = Some(until);
        Some(secs)
    }

    /// Clears the counter after a correct PIN. Returns whether anything
    /// changed, so callers can skip a redundant write.
    pub fn record_success(&mut self) -> bool {
        let changed = self.consecutive_failures != 0 || self.locked_until.is_some();
        self.consecutive_failures = 0;
        self.locked_until = None;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ThrottlePolicy {
        ThrottlePolicy {
            max_attempts: 5,
            base_secs: 30,
            max_secs: 3600,
        }
    }

    #[test]
    fn cooldown_doubles_then_caps() {
        let p = policy();
        assert_eq!(p.cooldown_secs(4), None);
        assert_eq!(p.cooldown_secs(5), Some(30));
        assert_eq!(p.cooldown_secs(6), Some(60));
        assert_eq!(p.cooldown_secs(7), Some(120));
        assert_eq!(p.cooldown_secs(12), Some(3600));
        assert_eq!(p.cooldown_secs(u32::MAX), Some(3600));
    }

    #[test]
    fn lockout_starts_at_limit_and_expires() {
        let p = policy();
        let t0 = Utc::now();
        let mut throttle = PinThrottle::default();

        for _ in 0..4 {
            assert_eq!(throttle.record_failure(&p, t0), None);
            assert!(throttle.check(t0).is_ok());
        }
        assert_eq!(throttle.record_failure(&p, t0), Some(30));
        assert!(matches!(
            throttle.check(t0 + Duration::seconds(10)),
            Err(SwiftvaultError::LockedOut { retry_after_secs: 20 })
        ));
        assert!(throttle.check(t0 + Duration::seconds(30)).is_ok());
    }

    #[test]
    fn success_resets_counter() {
        let mut throttle = PinThrottle::default();
        assert!(!throttle.record_success());
        throttle.record_failure(&policy(), Utc::now());
        assert!(throttle.record_success());
        assert_eq!(throttle, PinThrottle::default());
    }
}
