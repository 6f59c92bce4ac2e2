//! REST API client module for the case-management backend.
//!
//! Provides the `ApiClient` for login and authenticated data access, and
//! the `ApiError` taxonomy every call resolves to.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
