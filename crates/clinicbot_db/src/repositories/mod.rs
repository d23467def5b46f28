//! Repository implementations
//!
//! This module contains the implementations of `DashboardRepository`.

pub mod rest;

pub use rest::RestDashboardRepository;
