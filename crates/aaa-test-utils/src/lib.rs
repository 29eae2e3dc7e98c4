//! # AAA Test Utilities
//!
//! Shared test utilities for the AAA service.
//!
//! This crate provides:
//! - Fixed identities and builders for claims and authentications
//! - SSH public keys, PEM private keys and key generators for codec tests
//! - Instrumented filters and terminals for pipeline tests
//! - Server test harness (`TestAaaServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aaa_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestAaaServer::spawn_with_auth().await?;
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/restconf", server.url()))
//!         .header("Authorization", admin_basic_header())
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod filter_fixtures;
pub mod identity_fixtures;
pub mod key_fixtures;
pub mod server_harness;

// Re-export commonly used items
pub use filter_fixtures::*;
pub use identity_fixtures::*;
pub use key_fixtures::*;
pub use server_harness::*;
