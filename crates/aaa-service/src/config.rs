use base64::{engine::general_purpose, Engine as _};
use common::config::ObservabilityConfig;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default bcrypt cost factor for credential hashing
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Lowest bcrypt cost accepted from configuration
pub const MIN_BCRYPT_COST: u32 = 10;

/// Highest bcrypt cost accepted from configuration
pub const MAX_BCRYPT_COST: u32 = 14;

/// Default PBKDF2 iteration count for the encryption service
pub const DEFAULT_ENCRYPT_ITERATIONS: u32 = 32768;

/// Default token lifetime in seconds
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;

/// Default realm advertised in `WWW-Authenticate` challenges
pub const DEFAULT_REALM: &str = "opendaylight";

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8181";

/// Property key toggling authentication on an `AuthContext`
pub const AUTH_ENABLED_KEY: &str = "authEnabled";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub auth_enabled: bool,
    /// Properties file describing the custom filter chain, reloaded on SIGHUP
    pub filter_config_path: Option<PathBuf>,
    pub realm: String,
    /// Passphrase for the encryption service; `None` means generate one
    pub encrypt_key: Option<SecretString>,
    pub encrypt_salt: Option<Vec<u8>>,
    pub encrypt_iterations: u32,
    pub token_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub admin_user: Option<String>,
    pub admin_password: Option<SecretString>,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Invalid bcrypt cost: {0} (must be {MIN_BCRYPT_COST}-{MAX_BCRYPT_COST})")]
    InvalidBcryptCost(u32),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Invalid properties: {0}")]
    InvalidProperties(String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let auth_enabled = match vars.get("AAA_AUTH_ENABLED") {
            Some(value) => parse_bool("AAA_AUTH_ENABLED", value)?,
            None => false,
        };

        let filter_config_path = vars
            .get("AAA_FILTER_CONFIG")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let realm = vars
            .get("AAA_REALM")
            .filter(|r| !r.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_REALM.to_string());

        let encrypt_key = vars
            .get("AAA_ENCRYPT_KEY")
            .filter(|k| !k.is_empty())
            .map(|k| SecretString::from(k.clone()));

        let encrypt_salt = match vars.get("AAA_ENCRYPT_SALT").filter(|s| !s.is_empty()) {
            Some(salt) => Some(general_purpose::STANDARD.decode(salt)?),
            None => None,
        };

        if encrypt_key.is_some() != encrypt_salt.is_some() {
            let missing = if encrypt_key.is_some() {
                "AAA_ENCRYPT_SALT"
            } else {
                "AAA_ENCRYPT_KEY"
            };
            return Err(ConfigError::MissingEnvVar(missing.to_string()));
        }

        let encrypt_iterations =
            parse_number(vars, "AAA_ENCRYPT_ITERATIONS", DEFAULT_ENCRYPT_ITERATIONS)?;

        let token_ttl_seconds =
            parse_number(vars, "AAA_TOKEN_TTL_SECONDS", DEFAULT_TOKEN_TTL_SECONDS)?;
        if token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "AAA_TOKEN_TTL_SECONDS".to_string(),
                value: token_ttl_seconds.to_string(),
            });
        }

        let bcrypt_cost = parse_number(vars, "AAA_BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(ConfigError::InvalidBcryptCost(bcrypt_cost));
        }

        let admin_user = vars
            .get("AAA_ADMIN_USER")
            .filter(|u| !u.trim().is_empty())
            .cloned();
        let admin_password = vars
            .get("AAA_ADMIN_PASSWORD")
            .map(|p| SecretString::from(p.clone()));

        if admin_user.is_some() && admin_password.is_none() {
            return Err(ConfigError::MissingEnvVar("AAA_ADMIN_PASSWORD".to_string()));
        }

        Ok(Config {
            bind_address,
            auth_enabled,
            filter_config_path,
            realm,
            encrypt_key,
            encrypt_salt,
            encrypt_iterations,
            token_ttl_seconds,
            bcrypt_cost,
            admin_user,
            admin_password,
            observability: ObservabilityConfig::from_vars(vars),
        })
    }
}

/// Parse a `true`/`false` value, case-insensitively.
pub fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    if value.trim().eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.trim().eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

fn parse_number<T>(vars: &HashMap<String, String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match vars.get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
        }),
        None => Ok(default),
    }
}

/// Parse `key=value` / `key: value` properties text.
///
/// The text is read as INI through the `config` crate: `#` and `;` start
/// comments and later keys override earlier ones. Dotted keys come back
/// flattened to their original `a.b` form.
pub fn parse_properties(text: &str) -> Result<HashMap<String, String>, ConfigError> {
    let invalid = |e: ::config::ConfigError| ConfigError::InvalidProperties(e.to_string());

    let tree: HashMap<String, ::config::Value> = ::config::Config::builder()
        .add_source(::config::File::from_str(text, ::config::FileFormat::Ini))
        .build()
        .and_then(|config| config.try_deserialize())
        .map_err(invalid)?;

    let mut properties = HashMap::new();
    for (key, value) in tree {
        flatten_property(key, value, &mut properties).map_err(invalid)?;
    }
    Ok(properties)
}

fn flatten_property(
    key: String,
    value: ::config::Value,
    out: &mut HashMap<String, String>,
) -> Result<(), ::config::ConfigError> {
    match value.clone().into_table() {
        Ok(table) => {
            for (child, nested) in table {
                flatten_property(format!("{key}.{child}"), nested, out)?;
            }
        }
        Err(_) => {
            out.insert(key, value.into_string()?);
        }
    }
    Ok(())
}

/// Read and parse a properties file.
pub fn load_properties(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_properties(&text)
}
