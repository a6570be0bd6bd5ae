//! HTTP API endpoints.

pub mod health;
pub mod notify;
