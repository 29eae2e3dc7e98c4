//! AAA Service Library
//!
//! Authentication and authorization core for a multi-tenant controller:
//! establishes who is calling, attaches that identity to the current unit
//! of work, and lets an operator hot-swap the request filter chain without
//! restarting the server.
//!
//! # Modules
//!
//! - `app` - Component assembly from configuration
//! - `config` - Service configuration
//! - `context` - Request-scoped identity propagation
//! - `credentials` - Password credential authenticators and claim cache
//! - `crypto` - Password hashing, secrets-at-rest encryption, SSH key codec
//! - `errors` - Error types
//! - `filters` - Hot-swappable request filter pipeline
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP middleware
//! - `observability` - Log hashing and metrics
//! - `routes` - Axum router
//! - `token_store` - Bearer token storage
//! - `validators` - Header-to-identity token validators

pub mod app;
pub mod config;
pub mod context;
pub mod credentials;
pub mod crypto;
pub mod errors;
pub mod filters;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod token_store;
pub mod validators;
