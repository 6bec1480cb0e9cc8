//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::watch;
use tower::ServiceExt;

use coursebook_api::{AppState, build_app};
use coursebook_cache::CacheManager;
use coursebook_core::config::AppConfig;
use coursebook_core::config::reservation::ReservationConfig;
use coursebook_core::result::AppResult;
use coursebook_core::types::{BookingId, CourseId, Page, PageRequest};
use coursebook_database::memory::memory_stores;
use coursebook_database::store::BookingMutation;
use coursebook_database::{BookingFilter, BookingStore, CapacityLedger, StoreError, Stores};
use coursebook_entity::booking::Booking;
use coursebook_entity::course::{CapacityEntry, NewCourse};
use coursebook_service::{BookingService, RequestContext, RetryPolicy};

/// Engine wired to in-memory backends.
pub struct TestEnv {
    pub stores: Stores,
    pub service: BookingService,
}

impl TestEnv {
    /// Default retry budgets.
    pub fn new() -> Self {
        let stores = memory_stores();
        let service = BookingService::new(&stores, &ReservationConfig::default());
        Self { stores, service }
    }

    /// Budgets large enough that contention never exhausts them.
    pub fn patient() -> Self {
        let env = Self::new();
        let service = env.service.with_policies(
            RetryPolicy::immediate(10_000),
            RetryPolicy::immediate(10_000),
            RetryPolicy::immediate(10_000),
        );
        Self { service, ..env }
    }

    /// Swap the ledger the engine writes to, keeping the other stores.
    pub fn with_ledger(self, ledger: Arc<dyn CapacityLedger>) -> Self {
        Self::rewire(Stores { ledger, ..self.stores })
    }

    /// Swap the booking store the engine writes to, keeping the other stores.
    pub fn with_bookings(self, bookings: Arc<dyn BookingStore>) -> Self {
        Self::rewire(Stores { bookings, ..self.stores })
    }

    fn rewire(stores: Stores) -> Self {
        let service = BookingService::new(&stores, &ReservationConfig::default()).with_policies(
            RetryPolicy::immediate(3),
            RetryPolicy::immediate(3),
            RetryPolicy::immediate(3),
        );
        Self { stores, service }
    }

    pub async fn publish(&self, capacity: i32) -> CourseId {
        self.stores
            .catalog
            .publish_course(NewCourse {
                name: format!("Course with {capacity} seats"),
                description: None,
                capacity,
                price: 100.0,
            })
            .await
            .expect("publish course")
            .id
    }

    pub async fn booking(&self, course: CourseId) -> Booking {
        self.service
            .create_booking(&ctx(), &course.to_string(), 100.0)
            .await
            .expect("create booking")
    }

    pub async fn ledger(&self, course: CourseId) -> CapacityEntry {
        self.stores
            .ledger
            .get(course)
            .await
            .expect("ledger read")
            .expect("ledger entry")
    }

    pub async fn reload(&self, booking: &Booking) -> Booking {
        self.stores
            .bookings
            .get(booking.id)
            .await
            .expect("booking read")
            .expect("booking exists")
    }
}

pub fn ctx() -> RequestContext {
    RequestContext::new("integration-test", None)
}

/// Ledger wrapper that can be told to lose every acquire or release race.
#[derive(Debug)]
pub struct FlakyLedger {
    inner: Arc<dyn CapacityLedger>,
    fail_acquires: AtomicBool,
    fail_releases: AtomicBool,
    pub acquire_attempts: AtomicU32,
    pub release_attempts: AtomicU32,
}

impl FlakyLedger {
    pub fn new(inner: Arc<dyn CapacityLedger>) -> Self {
        Self {
            inner,
            fail_acquires: AtomicBool::new(false),
            fail_releases: AtomicBool::new(false),
            acquire_attempts: AtomicU32::new(0),
            release_attempts: AtomicU32::new(0),
        }
    }

    pub fn fail_acquires(&self, fail: bool) {
        self.fail_acquires.store(fail, Ordering::SeqCst);
    }

    pub fn fail_releases(&self, fail: bool) {
        self.fail_releases.store(fail, Ordering::SeqCst);
    }
}

fn lost_race(expected_version: i64) -> StoreError {
    StoreError::VersionConflict {
        expected: expected_version,
        actual: expected_version + 1,
    }
}

#[async_trait]
impl CapacityLedger for FlakyLedger {
    async fn get(&self, course_id: CourseId) -> AppResult<Option<CapacityEntry>> {
        self.inner.get(course_id).await
    }

    async fn conditional_adjust(
        &self,
        course_id: CourseId,
        delta: i32,
        expected_version: i64,
    ) -> Result<CapacityEntry, StoreError> {
        let (attempts, failing) = if delta < 0 {
            (&self.release_attempts, &self.fail_releases)
        } else {
            (&self.acquire_attempts, &self.fail_acquires)
        };
        attempts.fetch_add(1, Ordering::SeqCst);
        if failing.load(Ordering::SeqCst) {
            return Err(lost_race(expected_version));
        }
        self.inner
            .conditional_adjust(course_id, delta, expected_version)
            .await
    }

    async fn entries(&self) -> AppResult<Vec<CapacityEntry>> {
        self.inner.entries().await
    }
}

/// Ledger wrapper that applies releases but parks the caller afterwards
/// until the gate opens.
#[derive(Debug)]
pub struct GatedLedger {
    inner: Arc<dyn CapacityLedger>,
    gate: watch::Sender<bool>,
    pub parked: AtomicU32,
}

impl GatedLedger {
    pub fn new(inner: Arc<dyn CapacityLedger>) -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            inner,
            gate,
            parked: AtomicU32::new(0),
        }
    }

    /// Wait until `count` releases are parked at the gate.
    pub async fn wait_parked(&self, count: u32) {
        while self.parked.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }

    pub fn open(&self) {
        self.gate.send_replace(true);
    }
}

#[async_trait]
impl CapacityLedger for GatedLedger {
    async fn get(&self, course_id: CourseId) -> AppResult<Option<CapacityEntry>> {
        self.inner.get(course_id).await
    }

    async fn conditional_adjust(
        &self,
        course_id: CourseId,
        delta: i32,
        expected_version: i64,
    ) -> Result<CapacityEntry, StoreError> {
        let entry = self
            .inner
            .conditional_adjust(course_id, delta, expected_version)
            .await?;
        if delta < 0 {
            let mut open = self.gate.subscribe();
            self.parked.fetch_add(1, Ordering::SeqCst);
            let _ = open.wait_for(|open| *open).await;
        }
        Ok(entry)
    }

    async fn entries(&self) -> AppResult<Vec<CapacityEntry>> {
        self.inner.entries().await
    }
}

/// Booking store wrapper whose records disappear at the conditional write.
#[derive(Debug)]
pub struct VanishingBookings {
    inner: Arc<dyn BookingStore>,
}

impl VanishingBookings {
    pub fn new(inner: Arc<dyn BookingStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl BookingStore for VanishingBookings {
    async fn insert(&self, booking: Booking) -> AppResult<Booking> {
        self.inner.insert(booking).await
    }

    async fn get(&self, id: BookingId) -> AppResult<Option<Booking>> {
        self.inner.get(id).await
    }

    async fn conditional_update(
        &self,
        _id: BookingId,
        _expected_version: i64,
        _mutate: BookingMutation<'_>,
    ) -> Result<Booking, StoreError> {
        Err(StoreError::Vanished)
    }

    async fn list(&self, filter: &BookingFilter, page: &PageRequest) -> AppResult<Page<Booking>> {
        self.inner.list(filter, page).await
    }

    async fn count_reserved(&self, course_id: CourseId) -> AppResult<i64> {
        self.inner.count_reserved(course_id).await
    }

    async fn clear(&self) -> AppResult<u64> {
        self.inner.clear().await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}

/// The HTTP app over in-memory backends.
pub struct TestApp {
    pub router: Router,
}

/// Status and decoded JSON body.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::new(
            Arc::new(AppConfig::default()),
            memory_stores(),
            Arc::new(CacheManager::in_memory()),
        );
        Self {
            router: build_app(state),
        }
    }

    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(json) => builder.body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        TestResponse { status, body }
    }

    /// Publish a course and return its id.
    pub async fn publish(&self, capacity: i32) -> String {
        let response = self
            .request(
                "POST",
                "/api/course/v1/courses",
                Some(serde_json::json!({
                    "name": "Distributed Systems",
                    "capacity": capacity,
                    "price": 250.0,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["id"].as_str().expect("course id").to_string()
    }

    /// Create a booking and return its id.
    pub async fn book(&self, course: &str) -> String {
        let response = self
            .request(
                "POST",
                "/api/course/v1/bookings",
                Some(serde_json::json!({ "course": course, "price": 250.0 })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["id"].as_str().expect("booking id").to_string()
    }
}
