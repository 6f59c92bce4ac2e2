//! casebook - a terminal client for drop-in center case management.
//!
//! The library half of the crate: session handling (`auth`), the API
//! client (`api`), wire models, configuration, and the application state
//! the binary drives.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;
pub mod ui;
pub mod utils;
