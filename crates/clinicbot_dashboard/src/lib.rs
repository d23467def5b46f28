// --- File: crates/clinicbot_dashboard/src/lib.rs ---
pub mod doc;
pub mod handlers;
pub mod logic;
pub mod poller;
pub mod routes;
