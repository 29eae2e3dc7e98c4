//! Fixed identities for deterministic tests.

use aaa_service::validators::headers::basic_header;
use common::identity::{Authentication, AuthenticationBuilder, Claim, ClaimBuilder};

// Bootstrap admin configured by the server harness
pub const TEST_ADMIN_USER: &str = "admin";
pub const TEST_ADMIN_PASSWORD: &str = "admin-test-password";
pub const TEST_DOMAIN: &str = "sdn";

// Ordinary users for identity tests
pub const TEST_USER_ALICE: &str = "alice";
pub const TEST_USER_BOB: &str = "bob";

/// Claim for `user` in [`TEST_DOMAIN`] with the given roles.
///
/// The user id follows the credential store's `<user>@<domain>` form.
pub fn test_claim(user: &str, roles: &[&str]) -> Claim {
    ClaimBuilder::new()
        .with_user(user)
        .with_user_id(format!("{user}@{TEST_DOMAIN}"))
        .with_domain(TEST_DOMAIN)
        .add_roles(roles)
        .build()
        .expect("test claim should be valid")
}

/// Non-expiring authentication wrapping [`test_claim`].
pub fn test_authentication(user: &str, roles: &[&str]) -> Authentication {
    AuthenticationBuilder::new(test_claim(user, roles))
        .build()
        .expect("test authentication should be valid")
}

/// `Authorization` value for the harness admin.
pub fn admin_basic_header() -> String {
    basic_header(TEST_ADMIN_USER, TEST_ADMIN_PASSWORD, TEST_DOMAIN)
}
