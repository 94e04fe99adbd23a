//! HTTP front end for the `user_login` session service.
//!
//! The binary in `main.rs` wires configuration, the database-backed user
//! directory and the optional integrations into the router built by
//! [`api::create_router`].

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
