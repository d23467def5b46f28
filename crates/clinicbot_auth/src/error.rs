use clinicbot_common::DashboardError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No session token")]
    MissingToken,
    #[error("Session is invalid or expired")]
    InvalidSession,
    #[error("Role {0:?} may not use the dashboard")]
    Forbidden(Option<String>),
    #[error("Auth service unreachable: {0}")]
    Upstream(String),
    #[error("Auth configuration error: {0}")]
    Config(String),
}

impl From<AuthError> for DashboardError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidSession => {
                DashboardError::AuthError(err.to_string())
            }
            AuthError::Forbidden(_) => DashboardError::ForbiddenError(err.to_string()),
            AuthError::Upstream(msg) => DashboardError::ExternalServiceError {
                service_name: "Auth".to_string(),
                message: msg,
            },
            AuthError::Config(msg) => DashboardError::ConfigError(msg),
        }
    }
}
