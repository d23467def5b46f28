// --- File: crates/clinicbot_common/src/lib.rs ---

pub mod error; // Error taxonomy shared by every crate
pub mod features; // Runtime feature switches
pub mod handlers; // Health check
pub mod http; // HTTP utilities
pub mod logging; // Logging bootstrap
pub mod routes; // Common routes
pub mod services; // Service abstractions

// Re-export the routes function to be used by the main backend service
pub use routes::routes;

// Re-export error types and utilities for easier access
pub use error::{DashboardError, HttpStatusCode};

// Re-export HTTP utilities for easier access
pub use http::client::HTTP_CLIENT;

pub use logging::{init, init_with_config, init_with_level};

pub use features::{is_dashboard_enabled, is_gcal_enabled};
