//! Route gating for the dashboard API.
//!
//! `session_gate` requires a backend session (bearer token or the
//! `sb-access-token` cookie); `permission_gate` additionally checks the
//! user's role, but only when `auth.enforce_dashboard_permission` is set.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod session;

pub use error::AuthError;
pub use middleware::{permission_gate, session_gate, AuthState};
pub use session::{AuthUser, RemoteSessionVerifier, SessionVerifier, SESSION_COOKIE};
