use super::*;

#[test]
fn starts_online() {
    let h = HealthTracker::new(2, 60_000, "test");
    assert!(!h.is_offline());
    assert!(h.preflight().is_ok());
}

#[test]
fn trips_after_max_fails_consecutive_failures() {
    let h = HealthTracker::new(2, 60_000, "test");
    h.mark_attempt();
    h.record_failure();
    assert!(!h.is_offline());

    h.mark_attempt();
    h.record_failure();
    assert!(h.is_offline());

    assert!(matches!(h.preflight(), Err(UplinkError::UplinkOffline)));
}

#[test]
fn half_open_success_resets_counter() {
    let h = HealthTracker::new(2, 60_000, "test");
    h.mark_attempt();
    h.record_failure();
    h.mark_attempt();
    h.record_failure();
    assert!(h.is_offline());

    // simulate fail_timeout elapsing
    h.force_last_request_time_ms_ago(61_000);
    assert!(!h.is_offline());

    h.mark_attempt();
    h.record_success();
    assert_eq!(h.failed_requests(), 0);
    assert!(!h.is_offline());
}

#[test]
fn half_open_failure_keeps_it_offline_with_refreshed_timestamp() {
    let h = HealthTracker::new(2, 60_000, "test");
    h.mark_attempt();
    h.record_failure();
    h.mark_attempt();
    h.record_failure();
    h.force_last_request_time_ms_ago(61_000);
    assert!(!h.is_offline());

    h.mark_attempt();
    h.record_failure();
    assert!(h.failed_requests() >= 2);
    assert!(h.is_offline());
}

#[test]
fn success_below_max_fails_does_not_log_back_online_but_still_resets() {
    let h = HealthTracker::new(3, 60_000, "test");
    h.mark_attempt();
    h.record_failure();
    assert_eq!(h.failed_requests(), 1);

    h.mark_attempt();
    h.record_success();
    assert_eq!(h.failed_requests(), 0);
}

#[test]
fn retry_attempts_update_counter_even_before_final_outcome() {
    let h = HealthTracker::new(3, 60_000, "test");
    h.record_retry_attempt(1);
    assert_eq!(h.failed_requests(), 1);
    h.record_retry_attempt(2);
    assert_eq!(h.failed_requests(), 2);

    // eventual success still resets
    h.record_success();
    assert_eq!(h.failed_requests(), 0);
}

#[test]
fn max_fails_is_clamped_to_at_least_one() {
    let h = HealthTracker::new(0, 60_000, "test");
    h.mark_attempt();
    h.record_failure();
    assert!(h.is_offline());
}
