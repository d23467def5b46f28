//! Data access for the clinic dashboard
//!
//! Day-to-day reads and writes go through the remote backend's REST gateway
//! (`DbClient`, `RestDashboardRepository`). The destructive schema scripts in
//! `migrations` talk to Postgres directly and are only run by the
//! `clinicbot-migrate` binary.

pub mod client;
pub mod error;
pub mod migrations;
pub mod models;
pub mod repositories;
pub mod repository;

pub use client::DbClient;
pub use error::DbError;
pub use repositories::RestDashboardRepository;
pub use repository::DashboardRepository;
