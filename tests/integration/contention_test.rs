//! Concurrent reservations against a single course.

use std::sync::Arc;

use futures::future::join_all;

use coursebook_core::ErrorKind;
use coursebook_entity::booking::BookingStatus;

use crate::helpers::{GatedLedger, TestEnv, ctx};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_reservations_never_exceed_capacity() {
    let env = Arc::new(TestEnv::patient());
    let capacity = 5;
    let course = env.publish(capacity).await;

    let mut bookings = Vec::new();
    for _ in 0..40 {
        bookings.push(env.booking(course).await);
    }

    let handles = bookings.iter().map(|booking| {
        let env = Arc::clone(&env);
        let id = booking.id.to_string();
        tokio::spawn(async move { env.service.reserve_booking(&ctx(), &id).await })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task completes"))
        .collect();

    let reserved = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(reserved, capacity as usize);
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(result.kind, ErrorKind::CapacityExhausted);
    }

    let entry = env.ledger(course).await;
    assert_eq!(entry.reserved, capacity);
    assert_eq!(
        env.stores.bookings.count_reserved(course).await.unwrap(),
        i64::from(capacity)
    );

    for booking in &bookings {
        let current = env.reload(booking).await;
        assert!(matches!(
            current.status,
            BookingStatus::Created | BookingStatus::Reserved
        ));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_seat_goes_to_exactly_one_caller() {
    let env = Arc::new(TestEnv::patient());
    let course = env.publish(1).await;
    let first = env.booking(course).await.id.to_string();
    let second = env.booking(course).await.id.to_string();

    let a = {
        let env = Arc::clone(&env);
        tokio::spawn(async move { env.service.reserve_booking(&ctx(), &first).await })
    };
    let b = {
        let env = Arc::clone(&env);
        tokio::spawn(async move { env.service.reserve_booking(&ctx(), &second).await })
    };
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    let outcomes = [a, b];
    let winners: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    let losers: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().err()).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].status, BookingStatus::Reserved);
    assert_eq!(losers.len(), 1);
    assert_eq!(losers[0].kind, ErrorKind::CapacityExhausted);
    assert_eq!(env.ledger(course).await.reserved, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_reserve_and_expire_keep_ledger_in_bounds() {
    let env = Arc::new(TestEnv::patient());
    let capacity = 3;
    let course = env.publish(capacity).await;

    let mut bookings = Vec::new();
    for _ in 0..20 {
        bookings.push(env.booking(course).await.id.to_string());
    }

    let handles = bookings.iter().enumerate().map(|(i, id)| {
        let env = Arc::clone(&env);
        let id = id.clone();
        tokio::spawn(async move {
            let _ = env.service.reserve_booking(&ctx(), &id).await;
            if i % 2 == 0 {
                let _ = env.service.expire_booking(&ctx(), &id).await;
            }
        })
    });
    for joined in join_all(handles).await {
        joined.expect("task completes");
    }

    let entry = env.ledger(course).await;
    assert!(entry.reserved >= 0 && entry.reserved <= capacity);
    assert_eq!(
        i64::from(entry.reserved),
        env.stores.bookings.count_reserved(course).await.unwrap()
    );
}

#[tokio::test]
async fn test_duplicate_expire_reports_failed_compensation() {
    let base = TestEnv::new();
    let gated = Arc::new(GatedLedger::new(Arc::clone(&base.stores.ledger)));
    let env = Arc::new(base.with_ledger(Arc::clone(&gated) as _));

    let course = env.publish(2).await;
    let a = env.booking(course).await;
    let b = env.booking(course).await;
    for booking in [&a, &b] {
        env.service
            .reserve_booking(&ctx(), &booking.id.to_string())
            .await
            .unwrap();
    }

    // Both expires read `Reserved` and release a seat before either writes the record.
    let expires: Vec<_> = (0..2)
        .map(|_| {
            let env = Arc::clone(&env);
            let id = a.id.to_string();
            tokio::spawn(async move { env.service.expire_booking(&ctx(), &id).await })
        })
        .collect();
    gated.wait_parked(2).await;
    assert_eq!(env.ledger(course).await.reserved, 0);

    // The doubly released seat is taken before the losing expire can put it back.
    for _ in 0..2 {
        let booking = env.booking(course).await;
        env.service
            .reserve_booking(&ctx(), &booking.id.to_string())
            .await
            .unwrap();
    }
    gated.open();

    let outcomes: Vec<_> = join_all(expires)
        .await
        .into_iter()
        .map(|joined| joined.expect("task completes"))
        .collect();
    let expired: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    let failed: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().err()).collect();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].status, BookingStatus::Expired);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].kind, ErrorKind::StorageInconsistency);
    assert!(!failed[0].kind.is_retryable());

    assert_eq!(env.ledger(course).await.reserved, 2);
    assert_eq!(env.reload(&b).await.status, BookingStatus::Reserved);
}
