//! HTTP API.

pub mod auth;
pub mod health;
