//! Token store: caches authentications under opaque bearer tokens.

use crate::config::DEFAULT_TOKEN_TTL_SECONDS;
use crate::errors::AaaError;
use crate::observability::hash_for_correlation;
use chrono::Utc;
use common::identity::{Authentication, AuthenticationBuilder, Claim};
use common::secret::{ExposeSecret, SecretString};
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use moka::Expiry;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Default number of tokens kept in memory
pub const DEFAULT_MAX_CACHED_TOKENS: usize = 10_000;

/// Storage for issued tokens.
pub trait TokenStore: Send + Sync {
    fn put(&self, token: &str, auth: Authentication);

    /// Live authentication for `token`; expired entries are never returned.
    fn get(&self, token: &str) -> Option<Authentication>;

    /// Remove a token. Returns whether it was present.
    fn delete(&self, token: &str) -> bool;

    /// Lifetime given to newly issued tokens, in seconds
    fn token_expiration(&self) -> i64;
}

#[derive(Debug, Clone)]
struct StoredToken {
    auth: Authentication,
    stored_at: i64,
    expires_at: i64,
}

impl StoredToken {
    fn remaining(&self) -> Duration {
        let seconds = self.expires_at.saturating_sub(self.stored_at);
        Duration::from_secs(u64::try_from(seconds).unwrap_or(0))
    }
}

/// Expires each token at its own deadline rather than a cache-wide TTL.
struct TokenExpiry;

impl Expiry<String, StoredToken> for TokenExpiry {
    fn expire_after_create(
        &self,
        _token: &String,
        stored: &StoredToken,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(stored.remaining())
    }

    fn expire_after_update(
        &self,
        _token: &String,
        stored: &StoredToken,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(stored.remaining())
    }
}

/// Token store held in process memory.
///
/// An entry expires at the earlier of its insertion time plus
/// `seconds_to_live` and the authentication's own expiration. When full,
/// the least recently used token is evicted.
pub struct InMemoryTokenStore {
    seconds_to_live: i64,
    tokens: Cache<String, StoredToken>,
}

impl fmt::Debug for InMemoryTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTokenStore")
            .field("seconds_to_live", &self.seconds_to_live)
            .field("tokens", &self.tokens.entry_count())
            .finish()
    }
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_TTL_SECONDS, DEFAULT_MAX_CACHED_TOKENS)
    }
}

impl InMemoryTokenStore {
    #[must_use]
    pub fn new(seconds_to_live: i64, max_tokens: usize) -> Self {
        let tokens = Cache::builder()
            .max_capacity(u64::try_from(max_tokens.max(1)).unwrap_or(u64::MAX))
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(TokenExpiry)
            .eviction_listener(|token: Arc<String>, _, cause| {
                if cause == RemovalCause::Size {
                    debug!(target: "aaa.tokens", token = %hash_for_correlation(&token), "Evicting least recently used token");
                }
            })
            .build();

        Self {
            seconds_to_live,
            tokens,
        }
    }

    /// Insert as of `now` (Unix seconds).
    pub fn put_at(&self, token: &str, auth: Authentication, now: i64) {
        let ttl_deadline = now.saturating_add(self.seconds_to_live);
        let expires_at = match auth.expiration() {
            0 => ttl_deadline,
            exp => exp.min(ttl_deadline),
        };

        self.tokens.insert(
            token.to_string(),
            StoredToken {
                auth,
                stored_at: now,
                expires_at,
            },
        );
    }

    /// Look up as of `now` (Unix seconds), dropping the entry if expired.
    pub fn get_at(&self, token: &str, now: i64) -> Option<Authentication> {
        let stored = self.tokens.get(token)?;
        if stored.expires_at <= now {
            self.tokens.invalidate(token);
            return None;
        }
        Some(stored.auth)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.run_pending_tasks();
        usize::try_from(self.tokens.entry_count()).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenStore for InMemoryTokenStore {
    fn put(&self, token: &str, auth: Authentication) {
        self.put_at(token, auth, Utc::now().timestamp());
    }

    fn get(&self, token: &str) -> Option<Authentication> {
        self.get_at(token, Utc::now().timestamp())
    }

    fn delete(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    fn token_expiration(&self) -> i64 {
        self.seconds_to_live
    }
}

/// A freshly minted bearer token and the authentication stored under it.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: SecretString,
    pub authentication: Authentication,
}

/// Mint a random token for `claim`, valid for the store's token lifetime.
#[instrument(skip_all)]
pub fn issue_token(store: &dyn TokenStore, claim: Claim) -> Result<IssuedToken, AaaError> {
    let expiration = Utc::now()
        .timestamp()
        .saturating_add(store.token_expiration());
    let authentication = AuthenticationBuilder::new(claim)
        .with_expiration(expiration)
        .build()?;

    let token = SecretString::from(Uuid::new_v4().to_string());
    store.put(token.expose_secret(), authentication.clone());

    debug!(
        target: "aaa.tokens",
        token = %hash_for_correlation(token.expose_secret()),
        expiration,
        "Token issued"
    );

    Ok(IssuedToken {
        token,
        authentication,
    })
}
