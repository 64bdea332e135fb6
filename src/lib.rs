//! walletwatch — wallet balance monitoring service.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod extract;
pub mod browser;
pub mod platforms;
pub mod monitor;
pub mod cache;
pub mod api;
