//! HTTP request handlers for the web API.

pub mod export;
pub mod health;
