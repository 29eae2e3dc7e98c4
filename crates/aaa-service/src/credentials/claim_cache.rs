use super::CredentialAuth;
use crate::errors::AaaError;
use common::identity::{Claim, PasswordCredentials};
use common::secret::ExposeSecret;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default lifetime of a cached claim
pub const DEFAULT_CLAIM_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default number of cached claims
pub const DEFAULT_CLAIM_CACHE_CAPACITY: usize = 10_000;

/// Raw passwords are never kept; the key holds their SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    username: String,
    domain: String,
    password_digest: Vec<u8>,
}

impl CacheKey {
    fn new(credentials: &PasswordCredentials) -> Self {
        let digest = Sha256::digest(credentials.password().expose_secret().as_bytes());
        Self {
            username: credentials.username().to_string(),
            domain: credentials.domain().to_string(),
            password_digest: digest.to_vec(),
        }
    }
}

fn build_cache(ttl: Duration, capacity: usize) -> Cache<CacheKey, Claim> {
    Cache::builder()
        .max_capacity(u64::try_from(capacity).unwrap_or(u64::MAX))
        .time_to_live(ttl)
        .eviction_policy(EvictionPolicy::lru())
        .build()
}

/// Claim cache in front of another [`CredentialAuth`].
///
/// Successful authentications are cached for `ttl`; failures are never
/// cached. When full, the least recently used entry is evicted. Callers
/// that change a user's password or roles must call
/// [`invalidate_user`](Self::invalidate_user) (or [`clear`](Self::clear)).
pub struct CachedCredentialAuth {
    inner: Arc<dyn CredentialAuth>,
    ttl: Duration,
    capacity: usize,
    claims: Cache<CacheKey, Claim>,
}

impl CachedCredentialAuth {
    #[must_use]
    pub fn new(inner: Arc<dyn CredentialAuth>) -> Self {
        Self {
            inner,
            ttl: DEFAULT_CLAIM_CACHE_TTL,
            capacity: DEFAULT_CLAIM_CACHE_CAPACITY,
            claims: build_cache(DEFAULT_CLAIM_CACHE_TTL, DEFAULT_CLAIM_CACHE_CAPACITY),
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self.claims = build_cache(self.ttl, self.capacity);
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self.claims = build_cache(self.ttl, self.capacity);
        self
    }

    /// Drop every cached claim for `username` in `domain`.
    pub fn invalidate_user(&self, username: &str, domain: &str) {
        let stale: Vec<Arc<CacheKey>> = self
            .claims
            .iter()
            .filter(|(key, _)| key.username == username && key.domain == domain)
            .map(|(key, _)| key)
            .collect();
        for key in stale {
            self.claims.invalidate(key.as_ref());
        }
    }

    pub fn clear(&self) {
        self.claims.invalidate_all();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.run_pending_tasks();
        usize::try_from(self.claims.entry_count()).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialAuth for CachedCredentialAuth {
    #[instrument(skip_all)]
    fn authenticate(&self, credentials: &PasswordCredentials) -> Result<Claim, AaaError> {
        let key = CacheKey::new(credentials);

        if let Some(claim) = self.claims.get(&key) {
            debug!(target: "aaa.credentials", "Claim cache hit");
            return Ok(claim);
        }

        let claim = self.inner.authenticate(credentials)?;
        self.claims.insert(key, claim.clone());
        Ok(claim)
    }
}
