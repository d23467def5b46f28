// --- File: crates/clinicbot_gcal/src/lib.rs ---
pub mod auth;
pub mod blocks;
#[cfg(test)]
mod blocks_test;
pub mod doc;
pub mod handlers;
pub mod logic;
pub mod reconcile;
pub mod routes;
pub mod service;
pub mod slots;
#[cfg(test)]
mod slots_proptest;
#[cfg(test)]
mod test_support;
pub mod token_store;
