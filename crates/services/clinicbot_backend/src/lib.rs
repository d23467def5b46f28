pub mod app;
#[cfg(feature = "openapi")]
pub mod doc;

pub use app::{build_app, compose, StartupError};
