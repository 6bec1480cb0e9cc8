//! Booking lifecycle through the engine.

use chrono::Utc;

use coursebook_core::ErrorKind;
use coursebook_entity::booking::{Booking, BookingStatus, Transition};
use coursebook_service::ListBookingsQuery;

use crate::helpers::{TestEnv, ctx};

/// Drive a fresh booking into `status` using the engine where it can.
async fn booking_in(env: &TestEnv, status: BookingStatus) -> Booking {
    let course = env.publish(10).await;
    let booking = env.booking(course).await;
    let id = booking.id.to_string();
    match status {
        BookingStatus::Created => booking,
        BookingStatus::Reserved => env.service.reserve_booking(&ctx(), &id).await.unwrap(),
        BookingStatus::Expired => env.service.expire_booking(&ctx(), &id).await.unwrap(),
        BookingStatus::Completed => {
            let reserved = env.service.reserve_booking(&ctx(), &id).await.unwrap();
            env.stores
                .bookings
                .conditional_update(reserved.id, reserved.version, &|b| {
                    b.transition(Transition::Complete, Utc::now())
                })
                .await
                .unwrap()
        }
    }
}

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let env = TestEnv::new();
    let course = env.publish(2).await;
    let created = env
        .service
        .create_booking(&ctx(), &course.to_string(), 99.5)
        .await
        .unwrap();

    let fetched = env
        .service
        .get_booking(&ctx(), &created.id.to_string())
        .await
        .unwrap();
    assert_eq!(fetched.course_id, course);
    assert_eq!(fetched.price, 99.5);
    assert_eq!(fetched.status, BookingStatus::Created);
    assert_eq!(fetched.version, 1);
}

#[tokio::test]
async fn test_create_rejects_malformed_and_unknown_courses() {
    let env = TestEnv::new();
    let err = env
        .service
        .create_booking(&ctx(), "not-a-course", 10.0)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);

    let err = env
        .service
        .create_booking(&ctx(), &uuid::Uuid::now_v7().to_string(), 10.0)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_get_unknown_booking_is_not_found() {
    let env = TestEnv::new();
    let err = env
        .service
        .get_booking(&ctx(), &uuid::Uuid::now_v7().to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_expire_twice_is_idempotent() {
    let env = TestEnv::new();
    let course = env.publish(1).await;
    let booking = env.booking(course).await;
    let id = booking.id.to_string();

    env.service.reserve_booking(&ctx(), &id).await.unwrap();
    let expired = env.service.expire_booking(&ctx(), &id).await.unwrap();
    assert_eq!(expired.status, BookingStatus::Expired);
    assert!(expired.expired_at.is_some());

    let ledger_after_first = env.ledger(course).await;
    assert_eq!(ledger_after_first.reserved, 0);

    let err = env.service.expire_booking(&ctx(), &id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AlreadyExpired);
    assert_eq!(env.ledger(course).await, ledger_after_first);
    assert_eq!(env.reload(&booking).await.version, expired.version);
}

#[tokio::test]
async fn test_expire_of_created_booking_touches_no_ledger() {
    let env = TestEnv::new();
    let course = env.publish(1).await;
    let booking = env.booking(course).await;
    let before = env.ledger(course).await;

    let expired = env
        .service
        .expire_booking(&ctx(), &booking.id.to_string())
        .await
        .unwrap();
    assert_eq!(expired.status, BookingStatus::Expired);
    assert_eq!(env.ledger(course).await, before);
}

#[tokio::test]
async fn test_expired_seat_can_be_reserved_again() {
    let env = TestEnv::new();
    let course = env.publish(1).await;
    let first = env.booking(course).await.id.to_string();
    let second = env.booking(course).await.id.to_string();

    env.service.reserve_booking(&ctx(), &first).await.unwrap();
    let err = env.service.reserve_booking(&ctx(), &second).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::CapacityExhausted);

    env.service.expire_booking(&ctx(), &first).await.unwrap();
    let reserved = env.service.reserve_booking(&ctx(), &second).await.unwrap();
    assert_eq!(reserved.status, BookingStatus::Reserved);
}

#[tokio::test]
async fn test_every_forbidden_pair_fails_loudly() {
    let env = TestEnv::new();

    for status in BookingStatus::ALL {
        // Reserve is only allowed from Created.
        let booking = booking_in(&env, status).await;
        let result = env
            .service
            .reserve_booking(&ctx(), &booking.id.to_string())
            .await;
        match status {
            BookingStatus::Created => assert!(result.is_ok()),
            BookingStatus::Reserved => {
                assert_eq!(result.unwrap_err().kind, ErrorKind::InvalidStateTransition)
            }
            BookingStatus::Expired => {
                assert_eq!(result.unwrap_err().kind, ErrorKind::AlreadyExpired)
            }
            BookingStatus::Completed => {
                assert_eq!(result.unwrap_err().kind, ErrorKind::AlreadyCompleted)
            }
        }

        // Expire is allowed from Created and Reserved.
        let booking = booking_in(&env, status).await;
        let before = env.reload(&booking).await;
        let result = env
            .service
            .expire_booking(&ctx(), &booking.id.to_string())
            .await;
        match status {
            BookingStatus::Created | BookingStatus::Reserved => {
                assert_eq!(result.unwrap().status, BookingStatus::Expired)
            }
            BookingStatus::Expired => {
                assert_eq!(result.unwrap_err().kind, ErrorKind::AlreadyExpired);
                assert_eq!(env.reload(&booking).await, before);
            }
            BookingStatus::Completed => {
                assert_eq!(result.unwrap_err().kind, ErrorKind::AlreadyCompleted);
                assert_eq!(env.reload(&booking).await, before);
            }
        }
    }
}

#[tokio::test]
async fn test_listing_pages_in_creation_order() {
    let env = TestEnv::new();
    let course = env.publish(10).await;
    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(env.booking(course).await.id);
    }

    let mut query = ListBookingsQuery {
        course: Some(course.to_string()),
        page_size: Some(2),
        ..ListBookingsQuery::default()
    };
    let mut seen = Vec::new();
    loop {
        let page = env.service.list_bookings(&ctx(), &query).await.unwrap();
        assert!(page.items.len() <= 2);
        seen.extend(page.items.iter().map(|b| b.id));
        match page.next_page_token {
            Some(token) => {
                // Bookings created after the first page are not part of this listing.
                env.booking(course).await;
                query.page_token = Some(token);
            }
            None => break,
        }
    }
    assert_eq!(seen, ids);
}

#[tokio::test]
async fn test_listing_filters_by_status() {
    let env = TestEnv::new();
    let course = env.publish(10).await;
    let kept = env.booking(course).await;
    let reserved = env.booking(course).await;
    env.service
        .reserve_booking(&ctx(), &reserved.id.to_string())
        .await
        .unwrap();

    let page = env
        .service
        .list_bookings(
            &ctx(),
            &ListBookingsQuery {
                status: Some("created".to_string()),
                ..ListBookingsQuery::default()
            },
        )
        .await
        .unwrap();
    let ids: Vec<_> = page.items.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![kept.id]);
    assert!(page.next_page_token.is_none());
}

#[tokio::test]
async fn test_malformed_page_token_is_invalid_argument() {
    let env = TestEnv::new();
    let err = env
        .service
        .list_bookings(
            &ctx(),
            &ListBookingsQuery {
                page_token: Some("%%%".to_string()),
                ..ListBookingsQuery::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
}
