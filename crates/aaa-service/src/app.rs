//! Service assembly: builds every AAA component from a [`Config`] and wires
//! them together explicitly.

use crate::config::{load_properties, Config};
use crate::context::AuthContext;
use crate::credentials::{CachedCredentialAuth, CredentialAuth, InMemoryCredentialStore};
use crate::crypto::encryption::DEFAULT_PASSWORD_LENGTH;
use crate::crypto::{EncryptionConfig, EncryptionService};
use crate::errors::AaaError;
use crate::filters::{
    AuthenticationFilter, AuthenticationLogFilter, Filter, FilterChainConfig, FilterPipeline,
    FilterRegistry, CUSTOM_FILTER_LIST_KEY,
};
use crate::handlers::WhoAmI;
use crate::observability::hash_for_correlation;
use crate::token_store::{InMemoryTokenStore, DEFAULT_MAX_CACHED_TOKENS};
use crate::validators::headers::split_qualified_user;
use crate::validators::{BearerTokenAuth, HttpBasicAuth, TokenAuthenticators};
use common::secret::ExposeSecret;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Filter chain used when no filter configuration file is set
pub const DEFAULT_FILTER_LIST: &str = "auth-log,authentication";

/// Roles granted to the bootstrap admin user
pub const ADMIN_ROLES: [&str; 2] = ["admin", "user"];

/// All long-lived AAA components for one service instance.
pub struct AaaCore {
    pub config: Config,
    pub context: Arc<AuthContext>,
    pub users: Arc<InMemoryCredentialStore>,
    pub credential_auth: Arc<CachedCredentialAuth>,
    pub token_store: Arc<InMemoryTokenStore>,
    pub validators: TokenAuthenticators,
    pub registry: FilterRegistry,
    pub pipeline: Arc<FilterPipeline>,
    pub encryption: Arc<EncryptionService>,
}

impl AaaCore {
    /// Build the components and install the initial filter chain.
    ///
    /// # Errors
    ///
    /// Fails when the bootstrap user cannot be created, the filter
    /// configuration cannot be read, or a filter fails to initialize.
    #[instrument(skip_all)]
    pub fn from_config(config: Config) -> Result<Self, AaaError> {
        let context = Arc::new(AuthContext::new());
        context.set_auth_enabled(config.auth_enabled);

        let users = Arc::new(InMemoryCredentialStore::new(config.bcrypt_cost));
        if let (Some(admin), Some(password)) = (&config.admin_user, &config.admin_password) {
            let (user, domain) = split_qualified_user(admin);
            users.add_user(user, password.expose_secret(), domain, ADMIN_ROLES)?;
            info!(target: "aaa.app", user = %hash_for_correlation(admin), "Bootstrap user created");
        }

        let credential_auth = Arc::new(CachedCredentialAuth::new(users.clone()));
        let token_store = Arc::new(InMemoryTokenStore::new(
            config.token_ttl_seconds,
            DEFAULT_MAX_CACHED_TOKENS,
        ));

        let validators = TokenAuthenticators::default()
            .with_validator(Arc::new(HttpBasicAuth::new(
                credential_auth.clone() as Arc<dyn CredentialAuth>
            )))
            .with_validator(Arc::new(BearerTokenAuth::new(token_store.clone())));

        let registry = default_registry(&context, &validators, &config.realm);

        let encryption_config = match (&config.encrypt_key, &config.encrypt_salt) {
            (Some(key), Some(salt)) => EncryptionConfig::new(key.clone(), salt.clone()),
            _ => {
                info!(target: "aaa.app", "No encryption key configured, generating one");
                EncryptionConfig::generated(DEFAULT_PASSWORD_LENGTH)?
            }
        }
        .with_iterations(config.encrypt_iterations);
        let encryption = Arc::new(EncryptionService::new(&encryption_config));

        let pipeline = Arc::new(FilterPipeline::new(WhoAmI::new(context.clone())));

        let core = Self {
            config,
            context,
            users,
            credential_auth,
            token_store,
            validators,
            registry,
            pipeline,
            encryption,
        };
        core.reload_filter_chain()?;
        Ok(core)
    }

    /// Filter chain properties: the configured file, or the default chain.
    ///
    /// # Errors
    ///
    /// Fails when the configured file cannot be read.
    pub fn filter_properties(&self) -> Result<HashMap<String, String>, AaaError> {
        match &self.config.filter_config_path {
            Some(path) => {
                load_properties(path).map_err(|e| AaaError::Configuration(e.to_string()))
            }
            None => Ok(HashMap::from([(
                CUSTOM_FILTER_LIST_KEY.to_string(),
                DEFAULT_FILTER_LIST.to_string(),
            )])),
        }
    }

    /// Re-read the filter configuration and hot-swap the pipeline.
    ///
    /// # Errors
    ///
    /// On failure the previous chain stays live.
    #[instrument(skip_all)]
    pub fn reload_filter_chain(&self) -> Result<(), AaaError> {
        let properties = self.filter_properties()?;
        let chain = FilterChainConfig::from_properties(&properties);
        self.pipeline.reconfigure(&chain, &self.registry)?;
        info!(target: "aaa.app", filters = ?self.pipeline.stage_names(), "Filter chain loaded");
        Ok(())
    }
}

/// Registry of the built-in filters.
#[must_use]
pub fn default_registry(
    context: &Arc<AuthContext>,
    validators: &TokenAuthenticators,
    realm: &str,
) -> FilterRegistry {
    let context = Arc::clone(context);
    let validators = validators.clone();
    let realm = realm.to_string();

    FilterRegistry::new()
        .with_factory("authentication", move || {
            Arc::new(
                AuthenticationFilter::new(Arc::clone(&context), validators.clone())
                    .with_realm(realm.clone()),
            ) as Arc<dyn Filter>
        })
        .with_factory("auth-log", || {
            Arc::new(AuthenticationLogFilter::new()) as Arc<dyn Filter>
        })
}
