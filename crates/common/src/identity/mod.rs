//! Immutable identity model shared by every AAA component.
//!
//! A [`Claim`] is a validated identity fact (who, in which domain, with which
//! roles). An [`Authentication`] is a claim plus an expiration and is the
//! value attached to a request once it has been authenticated.
//! [`PasswordCredentials`] is the raw input handed to credential
//! authenticators; it is never persisted.
//!
//! Values are only produced by builders, which validate at `build()` time.
//! To "modify" a value, seed a new builder from the old one:
//!
//! ```rust
//! use common::identity::{AuthenticationBuilder, ClaimBuilder};
//!
//! let claim = ClaimBuilder::new()
//!     .with_user_id("1234")
//!     .with_user("admin")
//!     .with_domain("sdn")
//!     .add_role("admin")
//!     .build()?;
//!
//! let auth = AuthenticationBuilder::new(claim).with_expiration(0).build()?;
//!
//! // Same identity, bounded lifetime
//! let expiring = AuthenticationBuilder::from(&auth)
//!     .with_expiration(1_700_000_000)
//!     .build()?;
//! assert_eq!(expiring.claim(), auth.claim());
//! # Ok::<(), common::error::IdentityError>(())
//! ```

mod authentication;
mod claim;
mod credentials;

pub use authentication::{Authentication, AuthenticationBuilder};
pub use claim::{Claim, ClaimBuilder};
pub use credentials::PasswordCredentials;
