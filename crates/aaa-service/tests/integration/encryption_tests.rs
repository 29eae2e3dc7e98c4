//! Encryption service as assembled from service configuration

use aaa_service::app::AaaCore;
use aaa_service::config::Config;
use aaa_service::crypto::ENCRYPTED_TAG;
use std::collections::HashMap;

fn core(extra: &[(&str, &str)]) -> Result<AaaCore, anyhow::Error> {
    let mut vars = HashMap::from([("AAA_BCRYPT_COST".to_string(), "10".to_string())]);
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    Ok(AaaCore::from_config(Config::from_vars(&vars)?)?)
}

#[test]
fn test_configured_key_matches_stored_values() -> Result<(), anyhow::Error> {
    let core = core(&[
        ("AAA_ENCRYPT_KEY", "V1S1ED4OMeEh"),
        ("AAA_ENCRYPT_SALT", "TdtWeHbch/7xP52/rp3Usw=="),
    ])?;

    // Value written by an earlier deployment with the same key and salt
    let stored = "Encrypted:HBfU1gKHExw89lMB3juq1g==";
    assert_eq!(core.encryption.encrypt("admin"), stored);
    assert_eq!(core.encryption.decrypt(stored), "admin");

    Ok(())
}

#[test]
fn test_generated_key_round_trips() -> Result<(), anyhow::Error> {
    let core = core(&[])?;
    assert!(core.encryption.is_enabled());

    let encrypted = core.encryption.encrypt("s3cret value");
    assert!(encrypted.starts_with(ENCRYPTED_TAG));
    assert_eq!(core.encryption.decrypt(&encrypted), "s3cret value");

    // Each instance generates its own key
    let other = self::core(&[])?;
    assert_ne!(other.encryption.decrypt(&encrypted), "s3cret value");

    Ok(())
}

#[test]
fn test_key_without_salt_rejected() {
    let vars = HashMap::from([("AAA_ENCRYPT_KEY".to_string(), "V1S1ED4OMeEh".to_string())]);
    assert!(Config::from_vars(&vars).is_err());
}
