//! Booking service: the reservation engine.
//!
//! Reserving and expiring are two single-entity writes, ledger first and
//! booking record second, with no transaction spanning them. When the
//! second write loses a race, the first is compensated. A compensation
//! that fails is reported as `StorageInconsistency` and leaves ledger
//! drift behind for the hold reconciler.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{Instrument, error, info, info_span, warn};

use coursebook_core::config::reservation::ReservationConfig;
use coursebook_core::error::{AppError, ErrorKind};
use coursebook_core::result::AppResult;
use coursebook_core::types::{BookingId, CourseId, Page, PageRequest};
use coursebook_database::store::{BookingFilter, BookingStore, CapacityLedger, CourseCatalog, StoreError, Stores};
use coursebook_entity::booking::{Booking, BookingStatus, NewBooking, Transition};
use coursebook_entity::course::CapacityEntry;

use crate::context::RequestContext;
use crate::retry::{RetryError, RetryPolicy, retry_conditional};

/// Raw listing parameters as received from the transport.
#[derive(Debug, Clone, Default)]
pub struct ListBookingsQuery {
    /// Course id to filter by.
    pub course: Option<String>,
    /// Status to filter by.
    pub status: Option<String>,
    /// Continuation token from a previous page.
    pub page_token: Option<String>,
    /// Requested page size.
    pub page_size: Option<u32>,
}

/// Orchestrates the booking lifecycle against the ledger and booking store.
#[derive(Debug, Clone)]
pub struct BookingService {
    ledger: Arc<dyn CapacityLedger>,
    bookings: Arc<dyn BookingStore>,
    catalog: Arc<dyn CourseCatalog>,
    reserve_policy: RetryPolicy,
    release_policy: RetryPolicy,
    record_policy: RetryPolicy,
}

impl BookingService {
    /// Creates a new booking service.
    pub fn new(stores: &Stores, config: &ReservationConfig) -> Self {
        Self {
            ledger: Arc::clone(&stores.ledger),
            bookings: Arc::clone(&stores.bookings),
            catalog: Arc::clone(&stores.catalog),
            reserve_policy: RetryPolicy::from(&config.reserve),
            release_policy: RetryPolicy::from(&config.release),
            record_policy: RetryPolicy::from(&config.record),
        }
    }

    /// Replace the retry policies.
    pub fn with_policies(mut self, reserve: RetryPolicy, release: RetryPolicy, record: RetryPolicy) -> Self {
        self.reserve_policy = reserve;
        self.release_policy = release;
        self.record_policy = record;
        self
    }

    /// Create a booking in `Created` for an existing course.
    pub async fn create_booking(&self, ctx: &RequestContext, course: &str, price: f64) -> AppResult<Booking> {
        let span = info_span!("create_booking", request_id = %ctx.request_id, trace_id = ctx.trace_id(), course = course);
        async move {
            let course_id = CourseId::parse(course)?;
            if self.catalog.get_course(course_id).await?.is_none() {
                return Err(AppError::invalid_argument(format!("course {course_id} not found")));
            }
            let new = NewBooking { course_id, price };
            new.validate()?;

            let booking = self.bookings.insert(Booking::create(new)).await?;
            info!(booking_id = %booking.id, %course_id, price, "Booking created");
            Ok(booking)
        }
        .instrument(span)
        .await
    }

    /// Read one booking.
    pub async fn get_booking(&self, ctx: &RequestContext, booking_id: &str) -> AppResult<Booking> {
        let span = info_span!("get_booking", request_id = %ctx.request_id, trace_id = ctx.trace_id(), booking_id = booking_id);
        async move { self.load(BookingId::parse(booking_id)?).await }
            .instrument(span)
            .await
    }

    /// List bookings in creation order.
    pub async fn list_bookings(&self, ctx: &RequestContext, query: &ListBookingsQuery) -> AppResult<Page<Booking>> {
        let span = info_span!("list_bookings", request_id = %ctx.request_id, trace_id = ctx.trace_id());
        async move {
            let filter = BookingFilter {
                course_id: non_empty(&query.course).map(CourseId::parse).transpose()?,
                status: non_empty(&query.status)
                    .map(str::parse::<BookingStatus>)
                    .transpose()?,
            };
            let page = PageRequest::from_token(query.page_token.as_deref(), query.page_size)?;
            let result = self.bookings.list(&filter, &page).await?;
            info!(count = result.items.len(), more = result.next_page_token.is_some(), "Bookings listed");
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Take a seat for a `Created` booking and move it to `Reserved`.
    pub async fn reserve_booking(&self, ctx: &RequestContext, booking_id: &str) -> AppResult<Booking> {
        let span = info_span!("reserve_booking", request_id = %ctx.request_id, trace_id = ctx.trace_id(), booking_id = booking_id);
        async move {
            let id = BookingId::parse(booking_id)?;
            let booking = self.load(id).await?;
            booking.status.apply(Transition::Reserve)?;

            let entry = self.acquire_hold(booking.course_id).await?;
            info!(course_id = %booking.course_id, reserved = entry.reserved, capacity = entry.capacity, "Seat held");

            let now = Utc::now();
            match self
                .advance(id, BookingStatus::Created, Transition::Reserve, now, AppError::reservation_retry_exhausted)
                .await
            {
                Ok(reserved) => {
                    info!(%id, version = reserved.version, price = reserved.price, "Booking reserved");
                    Ok(reserved)
                }
                Err(e) => {
                    warn!(%id, error = %e, "Booking moved on after its seat was held; releasing");
                    match self.release_hold(booking.course_id).await {
                        Ok(_) => Err(e),
                        Err(undo) => Err(compensation_failed(id, booking.course_id, &e, &undo)),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Move a booking to `Expired`, releasing its seat if it holds one.
    ///
    /// A seat is released before the record changes. If the release cannot
    /// be made durable the booking stays `Reserved` with its version intact.
    pub async fn expire_booking(&self, ctx: &RequestContext, booking_id: &str) -> AppResult<Booking> {
        let span = info_span!("expire_booking", request_id = %ctx.request_id, trace_id = ctx.trace_id(), booking_id = booking_id);
        async move {
            let id = BookingId::parse(booking_id)?;
            let booking = self.load(id).await?;
            booking.status.apply(Transition::Expire)?;

            let now = Utc::now();
            let expired = if booking.holds_seat() {
                self.expire_reserved(booking, now).await?
            } else {
                match self
                    .advance(id, BookingStatus::Created, Transition::Expire, now, AppError::release_retry_exhausted)
                    .await
                {
                    Ok(expired) => expired,
                    Err(e) if e.kind == ErrorKind::InvalidStateTransition => {
                        // A concurrent reserve won; the seat must be released now.
                        let current = self.load(id).await?;
                        if !current.holds_seat() {
                            return Err(e);
                        }
                        self.expire_reserved(current, now).await?
                    }
                    Err(e) => return Err(e),
                }
            };

            info!(%id, version = expired.version, course_id = %expired.course_id, "Booking expired");
            Ok(expired)
        }
        .instrument(span)
        .await
    }

    async fn expire_reserved(&self, booking: Booking, now: DateTime<Utc>) -> AppResult<Booking> {
        self.release_hold(booking.course_id).await?;

        match self
            .advance(booking.id, BookingStatus::Reserved, Transition::Expire, now, AppError::release_retry_exhausted)
            .await
        {
            Ok(expired) => Ok(expired),
            Err(e) => {
                warn!(booking_id = %booking.id, error = %e, "Booking moved on after its seat was released; re-acquiring");
                match self.acquire_hold(booking.course_id).await {
                    Ok(_) => Err(e),
                    Err(undo) => Err(compensation_failed(booking.id, booking.course_id, &e, &undo)),
                }
            }
        }
    }

    async fn load(&self, id: BookingId) -> AppResult<Booking> {
        self.bookings
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("booking {id} not found")))
    }

    /// Increment the course ledger by one seat.
    async fn acquire_hold(&self, course_id: CourseId) -> AppResult<CapacityEntry> {
        let ledger = &self.ledger;
        retry_conditional(&self.reserve_policy, move |_| async move {
            let entry = ledger.get(course_id).await?.ok_or(StoreError::Vanished)?;
            ledger.conditional_adjust(course_id, 1, entry.version).await
        })
        .await
        .map_err(|e| match e {
            RetryError::Exhausted { attempts, .. } => {
                warn!(%course_id, attempts, "Reservation retries exhausted");
                AppError::reservation_retry_exhausted()
            }
            RetryError::Aborted(StoreError::CapacityViolation { capacity, .. }) => {
                AppError::capacity_exhausted(format!("course {course_id} is full ({capacity} seats)"))
            }
            RetryError::Aborted(other) => other.into(),
        })
    }

    /// Decrement the course ledger by one seat.
    async fn release_hold(&self, course_id: CourseId) -> AppResult<CapacityEntry> {
        let ledger = &self.ledger;
        retry_conditional(&self.release_policy, move |_| async move {
            let entry = ledger.get(course_id).await?.ok_or(StoreError::Vanished)?;
            ledger.conditional_adjust(course_id, -1, entry.version).await
        })
        .await
        .map_err(|e| match e {
            RetryError::Exhausted { attempts, .. } => {
                warn!(%course_id, attempts, "Release retries exhausted");
                AppError::release_retry_exhausted()
            }
            // Releasing from an empty ledger means a hold was lost somewhere.
            RetryError::Aborted(StoreError::CapacityViolation { reserved, .. }) => {
                AppError::storage_inconsistency(format!(
                    "course {course_id} ledger has {reserved} seats held, cannot release"
                ))
            }
            RetryError::Aborted(other) => other.into(),
        })
    }

    /// Apply `transition` to the record, provided it is still in `from`.
    async fn advance(
        &self,
        id: BookingId,
        from: BookingStatus,
        transition: Transition,
        now: DateTime<Utc>,
        exhausted: fn() -> AppError,
    ) -> AppResult<Booking> {
        let bookings = &self.bookings;
        let mutate = move |b: &mut Booking| {
            if b.status != from {
                return Err(moved_on(b.status, transition));
            }
            b.transition(transition, now)
        };
        let mutate = &mutate;

        retry_conditional(&self.record_policy, move |_| async move {
            let current = bookings.get(id).await?.ok_or(StoreError::Vanished)?;
            bookings.conditional_update(id, current.version, mutate).await
        })
        .await
        .map_err(|e| match e {
            RetryError::Exhausted { attempts, .. } => {
                warn!(%id, attempts, "Booking record retries exhausted");
                exhausted()
            }
            RetryError::Aborted(other) => other.into(),
        })
    }
}

/// Error for a record found in a state other than the one the engine acted on.
fn moved_on(current: BookingStatus, transition: Transition) -> AppError {
    match current.apply(transition) {
        Err(e) => e,
        Ok(_) => AppError::invalid_state(format!("booking changed concurrently, now {current}")),
    }
}

/// A compensating ledger write failed after the record step did. The ledger
/// no longer matches the records, so the caller must not see a clean
/// state error.
fn compensation_failed(id: BookingId, course_id: CourseId, cause: &AppError, undo: &AppError) -> AppError {
    error!(booking_id = %id, %course_id, cause = %cause, error = %undo, "Compensating ledger write failed");
    AppError::storage_inconsistency(format!(
        "booking {id}: {cause}; compensating ledger write on course {course_id} failed: {undo}"
    ))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
