//! Error types for the database client

use clinicbot_common::DashboardError;
use thiserror::Error;

/// Errors that can occur when talking to the remote data backend
#[derive(Debug, Error)]
pub enum DbError {
    /// Transport failure reaching the REST gateway
    #[error("Request to data backend failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success status
    #[error("Data backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected shape
    #[error("Failed to decode data backend response: {0}")]
    Decode(String),

    /// A patch or lookup matched no row
    #[error("No row in {table} matched {filter}")]
    NotFound { table: String, filter: String },

    /// Error with the database configuration
    #[error("Database configuration error: {0}")]
    ConfigError(String),

    /// Error from SQLx (migrations)
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// A migration script failed; its transaction was rolled back
    #[error("Migration {name} failed: {message}")]
    Migration { name: String, message: String },
}

impl From<DbError> for DashboardError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => DashboardError::NotFoundError(err.to_string()),
            DbError::ConfigError(msg) => DashboardError::ConfigError(msg),
            // 401/403 here means the backend keys are wrong, not that the
            // dashboard session expired
            DbError::Decode(msg) => DashboardError::ParseError(msg),
            other => DashboardError::DatabaseError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinicbot_common::HttpStatusCode;

    #[test]
    fn test_dashboard_error_mapping() {
        let not_found: DashboardError = DbError::NotFound {
            table: "workflow_control".to_string(),
            filter: "id=eq.7".to_string(),
        }
        .into();
        assert_eq!(not_found.status_code(), 404);

        for status in [401, 403] {
            let rejected: DashboardError = DbError::Status {
                status,
                message: "Invalid API key".to_string(),
            }
            .into();
            assert!(matches!(rejected, DashboardError::DatabaseError(_)));
            assert_eq!(rejected.status_code(), 502);
        }

        let failed: DashboardError = DbError::Status {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert!(matches!(failed, DashboardError::DatabaseError(_)));
    }
}
