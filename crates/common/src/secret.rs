//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Every password,
//! bearer token and encryption passphrase handled by the AAA core is held in
//! one of these types.
//!
//! `SecretBox<T>` and `SecretString` implement `Debug` with redaction, so any
//! struct deriving `Debug` that contains a secret is safe to log with `{:?}`
//! or through `tracing`. Secrets are zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct BasicLogin {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let login = BasicLogin {
//!     username: "admin".to_string(),
//!     password: SecretString::from("admin"),
//! };
//!
//! // Debug output shows the username and a redaction marker
//! let rendered = format!("{login:?}");
//! assert!(rendered.contains("admin"));
//! assert!(rendered.contains("REDACTED"));
//!
//! // Access is always explicit
//! assert_eq!(login.password.expose_secret(), "admin");
//! ```
//!
//! # Usage Guidelines
//!
//! Use `SecretString` for:
//! - User passwords (`PasswordCredentials`)
//! - Bearer tokens
//! - The encryption service passphrase
//!
//! Use `SecretBox<T>` for:
//! - Derived key material (e.g. `SecretBox<Vec<u8>>` for an AES key)

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
