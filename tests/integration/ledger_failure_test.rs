//! Ledger contention, lost records and failed compensations surface as
//! distinct error kinds.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use coursebook_core::ErrorKind;
use coursebook_entity::booking::BookingStatus;

use crate::helpers::{FlakyLedger, TestEnv, VanishingBookings, ctx};

#[tokio::test]
async fn test_contended_ledger_is_retry_exhausted_not_full() {
    let base = TestEnv::new();
    let flaky = Arc::new(FlakyLedger::new(Arc::clone(&base.stores.ledger)));
    let env = base.with_ledger(Arc::clone(&flaky) as _);

    let course = env.publish(3).await;
    let booking = env.booking(course).await;

    flaky.fail_acquires(true);
    let err = env
        .service
        .reserve_booking(&ctx(), &booking.id.to_string())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::ReservationRetryExhausted);
    assert!(err.kind.is_retryable());
    assert_eq!(flaky.acquire_attempts.load(Ordering::SeqCst), 3);

    let current = env.reload(&booking).await;
    assert_eq!(current.status, BookingStatus::Created);
    assert_eq!(current.version, booking.version);
    assert_eq!(env.ledger(course).await.reserved, 0);

    flaky.fail_acquires(false);
    let reserved = env
        .service
        .reserve_booking(&ctx(), &booking.id.to_string())
        .await
        .unwrap();
    assert_eq!(reserved.status, BookingStatus::Reserved);
}

#[tokio::test]
async fn test_vanished_record_is_storage_inconsistency() {
    let base = TestEnv::new();
    let bookings = Arc::new(VanishingBookings::new(Arc::clone(&base.stores.bookings)));
    let env = base.with_bookings(bookings);

    let course = env.publish(2).await;
    let booking = env.booking(course).await;

    let err = env
        .service
        .reserve_booking(&ctx(), &booking.id.to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StorageInconsistency);
    // The seat taken for the lost record was handed back.
    assert_eq!(env.ledger(course).await.reserved, 0);
}

#[tokio::test]
async fn test_failed_reserve_compensation_is_storage_inconsistency() {
    let base = TestEnv::new();
    let flaky = Arc::new(FlakyLedger::new(Arc::clone(&base.stores.ledger)));
    let bookings = Arc::new(VanishingBookings::new(Arc::clone(&base.stores.bookings)));
    let env = base
        .with_ledger(Arc::clone(&flaky) as _)
        .with_bookings(bookings);

    let course = env.publish(2).await;
    let booking = env.booking(course).await;

    flaky.fail_releases(true);
    let err = env
        .service
        .reserve_booking(&ctx(), &booking.id.to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StorageInconsistency);
    assert_eq!(flaky.release_attempts.load(Ordering::SeqCst), 3);
    // The orphaned hold is left for the reconciler.
    assert_eq!(env.ledger(course).await.reserved, 1);
}

#[tokio::test]
async fn test_release_from_empty_ledger_is_storage_inconsistency() {
    let env = TestEnv::new();
    let course = env.publish(1).await;
    let booking = env.booking(course).await;
    let reserved = env
        .service
        .reserve_booking(&ctx(), &booking.id.to_string())
        .await
        .unwrap();

    // The hold disappears behind the engine's back.
    let entry = env.ledger(course).await;
    env.stores
        .ledger
        .conditional_adjust(course, -1, entry.version)
        .await
        .unwrap();

    let err = env
        .service
        .expire_booking(&ctx(), &booking.id.to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StorageInconsistency);

    let current = env.reload(&booking).await;
    assert_eq!(current.status, BookingStatus::Reserved);
    assert_eq!(current.version, reserved.version);
    assert_eq!(env.ledger(course).await.reserved, 0);
}
