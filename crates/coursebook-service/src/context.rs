//! Request-scoped context passed from the transport into every service call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifiers that travel with one request into logs and spans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Request identifier, taken from `x-request-id` or generated.
    pub request_id: String,
    /// Distributed trace identifier, when the caller supplied one.
    pub trace_id: Option<String>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a context for an inbound request.
    pub fn new(request_id: impl Into<String>, trace_id: Option<String>) -> Self {
        Self {
            request_id: request_id.into(),
            trace_id,
            request_time: Utc::now(),
        }
    }

    /// Creates a context for work the service starts on its own.
    pub fn system(origin: &str) -> Self {
        Self::new(format!("{origin}-{}", Uuid::now_v7()), None)
    }

    /// Trace id for span fields; empty when absent.
    pub fn trace_id(&self) -> &str {
        self.trace_id.as_deref().unwrap_or_default()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(Uuid::now_v7().to_string(), None)
    }
}
