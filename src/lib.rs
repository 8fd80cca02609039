//! Roomba bridge firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod oi;
pub mod ota;
pub mod report;
pub mod safety;
pub mod scheduler;
pub mod state;

pub mod pins;

// The ESP-IDF implementations are guarded by cfg attributes inside; on
// the host these modules build their simulation backends.
pub mod adapters;
pub mod drivers;
