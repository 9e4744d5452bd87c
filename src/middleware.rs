//! Per-request trace id.
//!
//! The middleware generates the id, hands it to handlers as an explicit
//! `Extension<TraceId>`, wraps the request in a span carrying it and echoes it
//! back in the `x-trace-id` response header.

use crate::errors::HandlerPanic;
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::fmt;
use tracing::Instrument;
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "x-trace-id";

const TRACE_ID_LEN: usize = 12;

/// Correlation id shared by the logs and the error envelope of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceId(String);

impl TraceId {
    /// 12 hex chars taken from a random v4 UUID.
    pub fn generate() -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(TRACE_ID_LEN);
        Self(id)
    }

    /// Placeholder used when the id could not be recovered.
    pub fn unknown() -> Self {
        Self("n/a".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TraceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Assigns a [`TraceId`] to every request.
///
/// Also renders the error envelope for responses tagged by
/// [`crate::errors::panic_response`], which run without access to the id.
pub async fn assign_trace_id(mut request: Request, next: Next) -> Response {
    let trace_id = TraceId::generate();
    let span = tracing::info_span!(
        "request",
        trace_id = %trace_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    request.extensions_mut().insert(trace_id.clone());

    let mut response = next.run(request).instrument(span.clone()).await;

    if let Some(panic) = response.extensions_mut().remove::<HandlerPanic>() {
        response = span.in_scope(|| panic.into_api_error(&trace_id).into_response());
    }

    match HeaderValue::from_str(trace_id.as_str()) {
        Ok(value) => {
            response.headers_mut().insert(TRACE_ID_HEADER, value);
        }
        Err(e) => tracing::warn!("Trace id '{}' is not a valid header value: {}", trace_id, e),
    }

    response
}
