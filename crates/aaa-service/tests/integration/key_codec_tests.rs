//! Key codecs against fixed and freshly generated keys

use aaa_service::crypto::{
    decode_private_key, decode_public_key, encode_public_key, load_private_key, SshPublicKey,
};
use aaa_service::errors::AaaError;
use aaa_test_utils::{
    blob_of, generate_dsa_key, generate_p256_key, generate_rsa_key, TEST_DSA_LINE,
    TEST_DSA_PEM_PUBLIC_LINE, TEST_DSA_PKCS8_PEM, TEST_ECDSA_LINE, TEST_PEM_PASSPHRASE,
    TEST_RSA_8192_LINE, TEST_RSA_ENCRYPTED_PEM, TEST_RSA_LINE, TEST_RSA_PEM_PUBLIC_LINE,
    TEST_RSA_PKCS1_PEM,
};
use rsa::traits::PublicKeyParts;

#[test]
fn test_fixture_lines_re_encode_exactly() {
    for line in [TEST_RSA_LINE, TEST_RSA_8192_LINE, TEST_DSA_LINE, TEST_ECDSA_LINE] {
        let key = decode_public_key(line).unwrap();
        assert_eq!(encode_public_key(&key), blob_of(line), "line: {line}");
        assert_eq!(key.to_openssh_line(Some("root@vm")), line);
    }
}

#[test]
fn test_dsa_fixture_parameters() {
    let SshPublicKey::Dsa(dsa) = decode_public_key(TEST_DSA_LINE).unwrap() else {
        panic!("expected a DSA key");
    };
    assert_eq!(dsa.components().p().bits(), 1024);
    assert_eq!(dsa.components().q().bits(), 160);
}

#[test]
fn test_ssh_keygen_8192_bit_rsa() {
    let SshPublicKey::Rsa(rsa) = decode_public_key(TEST_RSA_8192_LINE).unwrap() else {
        panic!("expected an RSA key");
    };
    assert_eq!(rsa.n().bits(), 8192);
}

#[test]
fn test_generated_keys_round_trip() {
    let keys = [generate_rsa_key(1024), generate_dsa_key(), generate_p256_key()];

    for key in keys {
        let encoded = encode_public_key(&key);
        let decoded = decode_public_key(&encoded).unwrap();
        assert_eq!(decoded, key);

        let line = key.to_openssh_line(Some("generated"));
        assert_eq!(decode_public_key(&line).unwrap(), key);
    }
}

#[test]
fn test_generated_keys_are_distinct() {
    assert_ne!(generate_p256_key(), generate_p256_key());
    assert_ne!(generate_dsa_key(), generate_dsa_key());
}

#[test]
fn test_type_mismatch_between_line_and_blob() {
    let forged = format!("ssh-rsa {}", blob_of(TEST_ECDSA_LINE));
    assert!(decode_public_key(&forged).is_err());
}

#[test]
fn test_pem_private_keys_match_their_public_lines() {
    let cases = [
        (TEST_RSA_PKCS1_PEM, None, TEST_RSA_PEM_PUBLIC_LINE),
        (
            TEST_RSA_ENCRYPTED_PEM,
            Some(TEST_PEM_PASSPHRASE),
            TEST_RSA_PEM_PUBLIC_LINE,
        ),
        (TEST_DSA_PKCS8_PEM, None, TEST_DSA_PEM_PUBLIC_LINE),
    ];

    for (pem, passphrase, public_line) in cases {
        let private = decode_private_key(pem, passphrase).unwrap();
        let expected = decode_public_key(public_line).unwrap();
        assert_eq!(private.key_type(), expected.key_type());
        assert_eq!(private.public_key(), expected);
    }
}

#[test]
fn test_encrypted_pem_needs_the_right_passphrase() {
    assert!(matches!(
        decode_private_key(TEST_RSA_ENCRYPTED_PEM, None),
        Err(AaaError::Decoding(_))
    ));
    assert!(matches!(
        decode_private_key(TEST_RSA_ENCRYPTED_PEM, Some("wrong")),
        Err(AaaError::Decoding(_))
    ));
}

#[test]
fn test_load_private_key_from_file() -> Result<(), anyhow::Error> {
    let path = std::env::temp_dir().join(format!("aaa-key-{}.pem", uuid::Uuid::new_v4()));
    std::fs::write(&path, TEST_RSA_ENCRYPTED_PEM)?;

    let loaded = load_private_key(&path, Some(TEST_PEM_PASSPHRASE));
    std::fs::remove_file(&path)?;

    assert_eq!(
        loaded?.public_key(),
        decode_public_key(TEST_RSA_PEM_PUBLIC_LINE)?
    );
    Ok(())
}
