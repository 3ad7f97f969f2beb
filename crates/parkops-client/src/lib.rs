//! REST client for the parkops mission backend.

pub mod auth;
pub mod client;
pub mod gateway;

pub use auth::{AuthApi, AuthError};
pub use client::ApiClient;
pub use gateway::HttpGateway;
