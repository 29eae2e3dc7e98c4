//! Common utilities and types shared across AAA components.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for the immutable identity model (claims, authentications, credentials)
pub mod identity;

/// Module for common configuration
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;
