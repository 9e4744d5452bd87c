use crate::dataset::DatasetError;
use crate::middleware::TraceId;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use utoipa::ToSchema;

/// Message returned to clients for every 5xx; the real cause stays in the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "Erro interno";

/// One entry of the `details` array of a validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldIssue {
    /// Location of the offending value, e.g. `["body", "receita_anual"]`.
    pub loc: Vec<String>,
    /// Human readable description.
    pub msg: String,
    /// Machine readable category (`missing`, `conflict`, `value_error`, ...).
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldIssue {
    pub fn body_field(field: &str, msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc: vec!["body".to_string(), field.to_string()],
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }
}

/// Application-specific error types.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Request could not be turned into a scorable record.
    Validation {
        message: String,
        details: Vec<FieldIssue>,
    },
    /// The identifying name does not resolve in the dataset.
    NotFound(String),
    /// Route-level HTTP failure (unknown route, payload too large, ...).
    Http { status: StatusCode, message: String },
    /// Internal server error.
    Internal(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    pub fn validation(message: impl Into<String>, details: Vec<FieldIssue>) -> Self {
        AppError::Validation {
            message: message.into(),
            details,
        }
    }

    /// Neither `empresa` nor `cnpj` was supplied.
    pub fn missing_identifier() -> Self {
        let msg = "informe 'empresa' ou 'cnpj'";
        Self::validation(
            "Campo de identificação ausente: informe 'empresa' ou 'cnpj'.",
            vec![
                FieldIssue::body_field("empresa", msg, "missing"),
                FieldIssue::body_field("cnpj", msg, "missing"),
            ],
        )
    }

    /// Required fields still absent after dataset lookup and defaults.
    ///
    /// Each entry lists the alternative request fields that would satisfy it.
    pub fn missing_fields(required: &[&[&str]]) -> Self {
        let labels: Vec<String> = required.iter().map(|alts| alts.join(" ou ")).collect();
        let details = required
            .iter()
            .zip(&labels)
            .flat_map(|(alternatives, label)| {
                alternatives.iter().map(move |field| {
                    FieldIssue::body_field(field, format!("campo obrigatório: {}", label), "missing")
                })
            })
            .collect();

        Self::validation(format!("Campos faltantes: {}", labels.join(", ")), details)
    }

    /// Alternate spellings of the same concept carry different values.
    pub fn conflicting_fields(fields: &[&str], reason: &str) -> Self {
        let details = fields
            .iter()
            .map(|field| FieldIssue::body_field(field, reason, "conflict"))
            .collect();

        Self::validation(
            format!("Campos conflitantes ({}): {}", fields.join(", "), reason),
            details,
        )
    }

    pub fn invalid_field(field: &str, reason: &str) -> Self {
        Self::validation(
            format!("Campo inválido '{}': {}", field, reason),
            vec![FieldIssue::body_field(field, reason, "value_error")],
        )
    }

    /// Error code exposed in the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Http { .. } => "http_error",
            AppError::Internal(_) => "internal_error",
            AppError::WithContext { source, .. } => source.code(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Http { status, .. } => *status,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::WithContext { source, .. } => source.status(),
        }
    }

    /// Message safe to show to the client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation { message, .. } => message.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Http { message, .. } => message.clone(),
            AppError::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            AppError::WithContext { source, .. } => source.public_message(),
        }
    }

    fn details(&self) -> Vec<FieldIssue> {
        match self {
            AppError::Validation { details, .. } => details.clone(),
            AppError::WithContext { source, .. } => source.details(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation { message, .. } => write!(f, "Validation error: {}", message),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Http { status, message } => write!(f, "HTTP {}: {}", status, message),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl From<JsonRejection> for AppError {
    /// Converts a body extraction failure into a validation error.
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::Http {
                status: StatusCode::PAYLOAD_TOO_LARGE,
                message: "Corpo da requisição excede o tamanho máximo permitido".to_string(),
            };
        }

        let kind = match &rejection {
            JsonRejection::JsonDataError(_) => "type_error",
            JsonRejection::JsonSyntaxError(_) => "json_invalid",
            JsonRejection::MissingJsonContentType(_) => "content_type",
            _ => "body_error",
        };
        let detail = rejection.body_text();

        AppError::validation(
            format!("Erros de validação: {}", detail),
            vec![FieldIssue {
                loc: vec!["body".to_string()],
                msg: detail,
                kind: kind.to_string(),
            }],
        )
    }
}

/// Response envelope for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// One of `validation_error`, `not_found`, `http_error`, `internal_error`.
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldIssue>,
    pub trace_id: String,
}

/// An [`AppError`] bound to the trace id of the request that produced it.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub error: AppError,
    pub trace_id: TraceId,
}

impl ApiError {
    pub fn new(error: AppError, trace_id: &TraceId) -> Self {
        Self {
            error,
            trace_id: trace_id.clone(),
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                code: self.error.code().to_string(),
                message: self.error.public_message(),
                details: self.error.details(),
                trace_id: self.trace_id.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    /// Converts the error into an HTTP response.
    ///
    /// 5xx errors are logged with their full context chain; the client only
    /// ever sees the generic message.
    fn into_response(self) -> Response {
        let status = self.error.status();

        if status.is_server_error() {
            tracing::error!(
                trace_id = %self.trace_id,
                "{} {}: {}",
                status.as_u16(),
                self.error.code(),
                self.error
            );
        } else {
            tracing::warn!(
                trace_id = %self.trace_id,
                "{} {}: {}",
                status.as_u16(),
                self.error.code(),
                self.error.public_message()
            );
        }

        (status, Json(self.envelope())).into_response()
    }
}

/// Panic message carried by the 500 produced by [`panic_response`].
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerPanic(pub String);

impl HandlerPanic {
    /// Renders the envelope once the request's trace id is known.
    pub fn into_api_error(self, trace_id: &TraceId) -> ApiError {
        ApiError::new(
            AppError::Internal(format!("handler panicked: {}", self.0)),
            trace_id,
        )
    }
}

/// Turns a caught panic into a bare 500 tagged with [`HandlerPanic`].
///
/// The panic unwinds past the handler, so the trace id middleware renders the
/// envelope from the tag.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    response.extensions_mut().insert(HandlerPanic(detail));
    response
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Dataset failures are always internal: the client cannot fix them.
impl<T> ResultExt<T> for Result<T, DatasetError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::Internal(e.to_string())),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::Internal(e.to_string())),
            context: f(),
        })
    }
}

/// Attaches the request trace id to an error on its way out of a handler.
pub trait Traced<T> {
    fn traced(self, trace_id: &TraceId) -> Result<T, ApiError>;
}

impl<T, E> Traced<T> for Result<T, E>
where
    E: Into<AppError>,
{
    fn traced(self, trace_id: &TraceId) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::new(e.into(), trace_id))
    }
}
