//! Authorization header helpers.

use base64::{engine::general_purpose, Engine as _};

/// Domain used when a credential does not name one
pub const DEFAULT_DOMAIN: &str = "sdn";

pub const BASIC_PREFIX: &str = "Basic ";
pub const BEARER_PREFIX: &str = "Bearer ";

/// Whether an `Authorization` value carries Basic or Bearer credentials.
///
/// The scheme is matched case-insensitively.
#[must_use]
pub fn is_login_attempt(authorization: &str) -> bool {
    let scheme = authorization
        .split_whitespace()
        .next()
        .unwrap_or_default();
    scheme.eq_ignore_ascii_case("basic") || scheme.eq_ignore_ascii_case("bearer")
}

/// Build a Basic `Authorization` value carrying `user:password:domain`.
#[must_use]
pub fn basic_header(user: &str, password: &str, domain: &str) -> String {
    let raw = format!("{user}:{password}:{domain}");
    format!("{BASIC_PREFIX}{}", general_purpose::STANDARD.encode(raw))
}

/// Split `user@domain` into its parts.
///
/// Without an `@` the whole value is the user and the domain is
/// [`DEFAULT_DOMAIN`]. Only the first `@` separates.
#[must_use]
pub fn split_qualified_user(qualified: &str) -> (&str, &str) {
    match qualified.split_once('@') {
        Some((user, domain)) => (user, domain),
        None => (qualified, DEFAULT_DOMAIN),
    }
}

/// Split a decoded Basic payload on `:`, dropping trailing empty fields.
///
/// `"admin:admin:"` yields two fields and `"::"` yields none.
pub(crate) fn split_credential_fields(decoded: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = decoded.split(':').collect();
    while fields.last().is_some_and(|field| field.is_empty()) {
        fields.pop();
    }
    fields
}
