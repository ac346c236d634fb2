//! Storekeep API library.
//!
//! The binary in `main.rs` only wires configuration, telemetry and the
//! listener; everything else lives here so it can be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;
