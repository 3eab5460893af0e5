//! Dashboard and API client for the Dark Watch website-change monitoring service.
//!
//! The monitoring itself (polling, diffing, AI analysis) runs in the backend;
//! this crate authenticates against it, drives job lifecycles, and renders
//! the detected changes.

pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;
