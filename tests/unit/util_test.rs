//! Tests for utility functions and priority tiers

use agent_task_core::core::Priority;
use agent_task_core::util::{init_tracing, now_ms};

#[test]
fn test_priority_ordering() {
    assert!(Priority::Critical < Priority::High);
    assert!(Priority::High < Priority::Normal);
    assert!(Priority::Normal < Priority::Low);
    assert!(Priority::Low < Priority::Background);
    assert_eq!(Priority::default(), Priority::Normal);
}

#[test]
fn test_priority_boost_clamps() {
    assert_eq!(Priority::Background.boosted(), Priority::Low);
    assert_eq!(Priority::High.boosted(), Priority::Critical);
    assert_eq!(Priority::Critical.boosted(), Priority::Critical);
    assert_eq!(Priority::Low.as_u8(), 3);
}

#[test]
fn test_now_ms_is_monotonic_enough() {
    let first = now_ms();
    let second = now_ms();
    assert!(first > 0);
    assert!(second >= first);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialized");
}
