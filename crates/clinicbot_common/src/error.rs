use thiserror::Error;

/// The base error type for the dashboard backend.
///
/// Every crate keeps its own error enum and converts into this one at the
/// HTTP boundary via `From<SpecificError> for DashboardError`.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// Error occurred during an HTTP request
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Missing, invalid or expired credentials
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Authenticated, but not allowed to see the dashboard
    #[error("Forbidden: {0}")]
    ForbiddenError(String),

    /// Error occurred during validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error returned by the remote data backend
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Error occurred during external service call
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    #[error("Conflict: {0}")]
    ConflictError(String),

    #[error("Not found: {0}")]
    NotFoundError(String),

    /// A runtime-disabled feature was requested
    #[error("Service unavailable: {0}")]
    UnavailableError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for DashboardError {
    fn status_code(&self) -> u16 {
        match self {
            DashboardError::HttpError(_) => 500,
            DashboardError::ParseError(_) => 400,
            DashboardError::ConfigError(_) => 500,
            DashboardError::AuthError(_) => 401,
            DashboardError::ForbiddenError(_) => 403,
            DashboardError::ValidationError(_) => 400,
            DashboardError::DatabaseError(_) => 502,
            DashboardError::ExternalServiceError { .. } => 502,
            DashboardError::ConflictError(_) => 409,
            DashboardError::NotFoundError(_) => 404,
            DashboardError::UnavailableError(_) => 503,
            DashboardError::InternalError(_) => 500,
        }
    }
}

// Common error conversions
impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(err: std::io::Error) -> Self {
        DashboardError::InternalError(err.to_string())
    }
}
