//! Per-uplink circuit breaker.
//!
//! The two mutable fields (`failed_requests`, `last_request_time`) are the
//! only shared mutable state on an uplink client. Favour a plain `Mutex`
//! over atomics: transitions must emit a log line ordered with the state
//! change, which a pair of independent atomics cannot guarantee under
//! concurrent updates.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::UplinkError;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

struct HealthState {
    failed_requests: u32,
    last_request_time: Option<i64>,
}

/// Circuit breaker tracking consecutive failures for one uplink.
pub struct HealthTracker {
    max_fails: u32,
    fail_timeout_ms: i64,
    upname: String,
    state: Mutex<HealthState>,
}

impl HealthTracker {
    /// Creates a tracker. `max_fails` must be `>= 1`; the constructor
    /// enforces this by clamping to 1 and letting the caller validate
    /// separately if it wants to reject the config outright.
    pub fn new(max_fails: u32, fail_timeout_ms: u64, upname: impl Into<String>) -> Self {
        Self {
            max_fails: max_fails.max(1),
            fail_timeout_ms: fail_timeout_ms as i64,
            upname: upname.into(),
            state: Mutex::new(HealthState {
                failed_requests: 0,
                last_request_time: None,
            }),
        }
    }

    /// Offline iff `failed_requests >= max_fails` and the last request
    /// happened less than `fail_timeout` ago.
    pub fn is_offline(&self) -> bool {
        let state = self.state.lock().unwrap();
        self.is_offline_locked(&state)
    }

    fn is_offline_locked(&self, state: &HealthState) -> bool {
        if state.failed_requests < self.max_fails {
            return false;
        }
        match state.last_request_time {
            Some(t) => (now_ms() - t).abs() < self.fail_timeout_ms,
            None => false,
        }
    }

    /// Preflight check: fails fast with [`UplinkError::UplinkOffline`]
    /// without touching the network, per the offline contract.
    pub fn preflight(&self) -> Result<(), UplinkError> {
        if self.is_offline() {
            return Err(UplinkError::UplinkOffline);
        }
        Ok(())
    }

    /// Marks that a request attempt was issued (updates `last_request_time`
    /// unconditionally).
    pub fn mark_attempt(&self) {
        let mut state = self.state.lock().unwrap();
        state.last_request_time = Some(now_ms());
    }

    /// Records the outcome of one attempt. `retry_index` is `Some(n)` when
    /// this attempt is the `n`-th retry (0-based) and the eventual outcome
    /// is not yet known; `None` marks the final outcome of the request.
    pub fn record_retry_attempt(&self, retry_index: u32) {
        let mut state = self.state.lock().unwrap();
        state.failed_requests = retry_index;
        if state.failed_requests >= self.max_fails {
            tracing::warn!(upname = %self.upname, failed_requests = state.failed_requests, "uplink offline");
        }
    }

    /// Records a successful (2xx) response. Resets the counter to zero and,
    /// if the uplink was previously offline (failed_requests >= max_fails),
    /// logs the back-online transition. The log fires only when coming out
    /// of the offline state, not after every isolated failure.
    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap();
        if state.failed_requests >= self.max_fails {
            tracing::warn!(upname = %self.upname, "uplink back online");
        }
        state.failed_requests = 0;
    }

    /// Records a final failure outcome (no further retries will happen).
    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap();
        let was_offline = state.failed_requests >= self.max_fails;
        state.failed_requests = state.failed_requests.saturating_add(1);
        if !was_offline && state.failed_requests >= self.max_fails {
            tracing::warn!(upname = %self.upname, failed_requests = state.failed_requests, "uplink offline");
        }
    }

    #[cfg(test)]
    pub fn failed_requests(&self) -> u32 {
        self.state.lock().unwrap().failed_requests
    }

    #[cfg(test)]
    pub fn force_last_request_time_ms_ago(&self, ms_ago: i64) {
        let mut state = self.state.lock().unwrap();
        state.last_request_time = Some(now_ms() - ms_ago);
    }
}

#[cfg(test)]
#[path = "health_test.rs"]
mod health_test;
