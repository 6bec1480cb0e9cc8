//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use coursebook_cache::CacheManager;
use coursebook_core::config::AppConfig;
use coursebook_database::Stores;
use coursebook_service::{BookingService, CatalogService};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Storage backends, for readiness checks
    pub stores: Stores,
    /// Cache manager (Redis or in-memory)
    pub cache: Arc<CacheManager>,
    /// Booking lifecycle service
    pub booking_service: Arc<BookingService>,
    /// Course catalog service
    pub catalog_service: Arc<CatalogService>,
}

impl AppState {
    /// Build the services over the given backends.
    pub fn new(config: Arc<AppConfig>, stores: Stores, cache: Arc<CacheManager>) -> Self {
        let booking_service = Arc::new(BookingService::new(&stores, &config.reservation));
        let catalog_service = Arc::new(CatalogService::new(&stores));
        Self {
            config,
            stores,
            cache,
            booking_service,
            catalog_service,
        }
    }

    /// Replace the booking service, keeping everything else.
    pub fn with_booking_service(mut self, service: BookingService) -> Self {
        self.booking_service = Arc::new(service);
        self
    }
}
