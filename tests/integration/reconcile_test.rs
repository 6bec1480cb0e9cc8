//! Hold reconciliation against the engine's own writes.

use chrono::{Duration, Utc};

use coursebook_core::config::worker::WorkerConfig;
use coursebook_core::ErrorKind;
use coursebook_service::RetryPolicy;
use coursebook_worker::HoldReconciler;

use crate::helpers::{TestEnv, ctx};

fn reconciler(env: &TestEnv, grace_seconds: u64) -> HoldReconciler {
    let config = WorkerConfig {
        orphan_grace_seconds: grace_seconds,
        ..WorkerConfig::default()
    };
    HoldReconciler::new(&env.stores, &config, RetryPolicy::immediate(5))
}

#[tokio::test]
async fn test_engine_writes_leave_no_drift() {
    let env = TestEnv::new();
    let course = env.publish(3).await;
    for _ in 0..3 {
        let id = env.booking(course).await.id.to_string();
        env.service.reserve_booking(&ctx(), &id).await.unwrap();
    }
    let id = env.booking(course).await.id.to_string();
    env.service.expire_booking(&ctx(), &id).await.unwrap();

    let report = reconciler(&env, 0).sweep().await.unwrap();
    assert_eq!(report.courses_checked, 1);
    assert_eq!(report.drifting, 0);
}

#[tokio::test]
async fn test_orphaned_hold_is_reclaimed_after_grace() {
    let env = TestEnv::new();
    let course = env.publish(1).await;
    let booking = env.booking(course).await;

    // A reserve that crashed between its ledger write and its record write.
    let entry = env.ledger(course).await;
    env.stores
        .ledger
        .conditional_adjust(course, 1, entry.version)
        .await
        .unwrap();
    let err = env
        .service
        .reserve_booking(&ctx(), &booking.id.to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::CapacityExhausted);

    let reconciler = reconciler(&env, 120);
    let start = Utc::now();
    assert_eq!(reconciler.sweep_at(start).await.unwrap().reclaimed, 0);
    let report = reconciler
        .sweep_at(start + Duration::seconds(121))
        .await
        .unwrap();
    assert_eq!(report.reclaimed, 1);

    let reserved = env
        .service
        .reserve_booking(&ctx(), &booking.id.to_string())
        .await
        .unwrap();
    assert!(reserved.holds_seat());
}

#[tokio::test]
async fn test_drift_that_resolves_within_grace_is_left_alone() {
    let env = TestEnv::new();
    let course = env.publish(2).await;
    let booking = env.booking(course).await;

    // Ledger written, record write still in flight.
    let entry = env.ledger(course).await;
    env.stores
        .ledger
        .conditional_adjust(course, 1, entry.version)
        .await
        .unwrap();

    let reconciler = reconciler(&env, 60);
    let start = Utc::now();
    reconciler.sweep_at(start).await.unwrap();
    assert_eq!(reconciler.pending(), 1);

    // The record catches up.
    env.stores
        .bookings
        .conditional_update(booking.id, booking.version, &|b| {
            b.transition(coursebook_entity::booking::Transition::Reserve, Utc::now())
        })
        .await
        .unwrap();

    let report = reconciler
        .sweep_at(start + Duration::seconds(61))
        .await
        .unwrap();
    assert_eq!(report.drifting, 0);
    assert_eq!(reconciler.pending(), 0);
    assert_eq!(env.ledger(course).await.reserved, 1);
}
