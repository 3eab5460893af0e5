pub mod api;
pub mod config;
pub mod job;
pub mod result;
pub mod user;
pub mod wire;
