//! MACs and digital signatures over a JWS signing input,
//! as defined in [`rfc7518, section 3`].
//!
//! The primitive is selected by the [`AlgorithmDescriptor`] and the
//! key has to fit it: symmetric keys for `HS*`, RSA keys for `RS*`/`PS*`.
//!
//! [`rfc7518, section 3`]: https://datatracker.ietf.org/doc/html/rfc7518#section-3

use aws_lc_rs::{
    hmac,
    rand::SystemRandom,
    signature::{self, RsaEncoding, RsaParameters, UnparsedPublicKey},
};

use super::{
    AlgorithmDescriptor, DigestAlgorithm, JoseError, JoseKey, PrimitiveFamily, SymmetricKey,
};

/// Sign `signing_input` with `key`.
///
/// `none` produces the empty signature.
pub fn sign(
    signing_input: &[u8],
    key: &JoseKey,
    descriptor: &AlgorithmDescriptor,
) -> Result<Vec<u8>, JoseError> {
    check_supported(descriptor, key)?;

    match descriptor.family() {
        PrimitiveFamily::Unsecured => Ok(Vec::new()),
        PrimitiveFamily::HmacSha2 => {
            let key = hmac_key(descriptor, key)?;
            Ok(hmac::sign(&key, signing_input).as_ref().to_vec())
        }
        _ => {
            let padding = rsa_padding(descriptor)?;
            let key_pair = key
                .rsa_private()
                .ok_or_else(|| {
                    JoseError::invalid_key_material(format!(
                        "{} signing requires an RSA private key, got {}",
                        descriptor.name(),
                        key.algorithm_name()
                    ))
                })?
                .signing_key();
            let mut signature = vec![0u8; key_pair.public_modulus_len()];
            key_pair
                .sign(padding, &SystemRandom::new(), signing_input, &mut signature)
                .map_err(|err| JoseError::invalid_key_material("RSA signing").with_source(err))?;
            Ok(signature)
        }
    }
}

/// Check `signature` over `signing_input` with `key`.
///
/// A signature that does not match is `Ok(false)`. Errors are reserved
/// for algorithms and keys that cannot be used at all.
pub fn verify(
    signature: &[u8],
    signing_input: &[u8],
    key: &JoseKey,
    descriptor: &AlgorithmDescriptor,
) -> Result<bool, JoseError> {
    check_supported(descriptor, key)?;

    let valid = match descriptor.family() {
        PrimitiveFamily::Unsecured => signature.is_empty(),
        PrimitiveFamily::HmacSha2 => {
            let key = hmac_key(descriptor, key)?;
            hmac::verify(&key, signing_input, signature).is_ok()
        }
        _ => {
            let parameters = rsa_parameters(descriptor)?;
            let public = key.rsa_public().ok_or_else(|| {
                JoseError::invalid_key_material(format!(
                    "{} verification requires an RSA key, got {}",
                    descriptor.name(),
                    key.algorithm_name()
                ))
            })?;
            UnparsedPublicKey::new(parameters, public.as_pkcs1_der())
                .verify(signing_input, signature)
                .is_ok()
        }
    };
    if !valid {
        tracing::debug!(alg = descriptor.name(), "signature did not verify");
    }
    Ok(valid)
}

fn check_supported(descriptor: &AlgorithmDescriptor, key: &JoseKey) -> Result<(), JoseError> {
    match descriptor.family() {
        PrimitiveFamily::Unsecured
        | PrimitiveFamily::HmacSha2
        | PrimitiveFamily::RsaPkcs1v15Signature
        | PrimitiveFamily::RsaPss => (),
        PrimitiveFamily::Ecdsa => {
            return Err(JoseError::unsupported_algorithm(format!(
                "{} is not implemented",
                descriptor.name()
            )));
        }
        _ => {
            return Err(JoseError::unsupported_algorithm(format!(
                "'{}' is not a signature algorithm",
                descriptor.name()
            )));
        }
    }
    if let JoseKey::EllipticCurve(key) = key {
        return Err(JoseError::unsupported_algorithm(format!(
            "signatures with {} keys are not implemented",
            key.curve()
        )));
    }
    Ok(())
}

fn hmac_key(descriptor: &AlgorithmDescriptor, key: &JoseKey) -> Result<hmac::Key, JoseError> {
    let key: &SymmetricKey = match key {
        JoseKey::Symmetric(key) if key.kind().allows_hmac() => key,
        _ => {
            return Err(JoseError::invalid_key_material(format!(
                "{} requires an HMAC key, got {}",
                descriptor.name(),
                key.algorithm_name()
            )));
        }
    };
    let (algorithm, min_len) = match descriptor.digest() {
        Some(DigestAlgorithm::Sha256) => (hmac::HMAC_SHA256, 32),
        Some(DigestAlgorithm::Sha384) => (hmac::HMAC_SHA384, 48),
        Some(DigestAlgorithm::Sha512) => (hmac::HMAC_SHA512, 64),
        Some(DigestAlgorithm::Sha1) | None => {
            return Err(JoseError::unsupported_algorithm(format!(
                "{} has no HMAC-SHA2 digest",
                descriptor.name()
            )));
        }
    };
    // rfc7518, section 3.2: the key must be at least as long as the hash output
    if key.len() < min_len {
        return Err(JoseError::invalid_key_material(format!(
            "{} requires a key of at least {min_len} bytes, got {}",
            descriptor.name(),
            key.len()
        )));
    }
    Ok(hmac::Key::new(algorithm, key.as_bytes()))
}

fn rsa_padding(descriptor: &AlgorithmDescriptor) -> Result<&'static dyn RsaEncoding, JoseError> {
    let pss = descriptor.family() == PrimitiveFamily::RsaPss;
    match (pss, descriptor.digest()) {
        (false, Some(DigestAlgorithm::Sha256)) => Ok(&signature::RSA_PKCS1_SHA256),
        (false, Some(DigestAlgorithm::Sha384)) => Ok(&signature::RSA_PKCS1_SHA384),
        (false, Some(DigestAlgorithm::Sha512)) => Ok(&signature::RSA_PKCS1_SHA512),
        (true, Some(DigestAlgorithm::Sha256)) => Ok(&signature::RSA_PSS_SHA256),
        (true, Some(DigestAlgorithm::Sha384)) => Ok(&signature::RSA_PSS_SHA384),
        (true, Some(DigestAlgorithm::Sha512)) => Ok(&signature::RSA_PSS_SHA512),
        _ => Err(JoseError::unsupported_algorithm(descriptor.name())),
    }
}

fn rsa_parameters(descriptor: &AlgorithmDescriptor) -> Result<&'static RsaParameters, JoseError> {
    let pss = descriptor.family() == PrimitiveFamily::RsaPss;
    match (pss, descriptor.digest()) {
        (false, Some(DigestAlgorithm::Sha256)) => Ok(&signature::RSA_PKCS1_2048_8192_SHA256),
        (false, Some(DigestAlgorithm::Sha384)) => Ok(&signature::RSA_PKCS1_2048_8192_SHA384),
        (false, Some(DigestAlgorithm::Sha512)) => Ok(&signature::RSA_PKCS1_2048_8192_SHA512),
        (true, Some(DigestAlgorithm::Sha256)) => Ok(&signature::RSA_PSS_2048_8192_SHA256),
        (true, Some(DigestAlgorithm::Sha384)) => Ok(&signature::RSA_PSS_2048_8192_SHA384),
        (true, Some(DigestAlgorithm::Sha512)) => Ok(&signature::RSA_PSS_2048_8192_SHA512),
        _ => Err(JoseError::unsupported_algorithm(descriptor.name())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::jose::{
        EcKey, JoseErrorKind, JwsAlgorithm, Registry, RsaPrivateKey, RsaPublicKey, SecretKeyKind,
        encoding,
    };

    fn rsa_key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| RsaPrivateKey::generate().unwrap())
    }

    fn private_key() -> JoseKey {
        RsaPrivateKey::from_pkcs8_der(rsa_key().as_pkcs8_der())
            .unwrap()
            .into()
    }

    fn public_key() -> JoseKey {
        RsaPublicKey::from_pkcs1_der(rsa_key().public_key().as_pkcs1_der())
            .unwrap()
            .into()
    }

    #[test]
    fn rfc7515_a1_hs256() {
        let signing_input = concat!(
            "eyJ0eXAiOiJKV1QiLA0KICJhbGciOiJIUzI1NiJ9",
            ".",
            "eyJpc3MiOiJqb2UiLA0KICJleHAiOjEzMDA4MTkzODAsDQogImh0dHA6Ly9leGFtcGxlLmNvbS9pc19yb290Ijp0cnVlfQ",
        );
        let key = JoseKey::from(
            SymmetricKey::from_base64url(
                SecretKeyKind::Hmac,
                "AyM1SysPpbyDfgZld3umj1qzKObwVMkoqQ-EstJQLr_T-1qS0gZH75aKtMN3Yj0iPS4hcgUuTwjAzZr1Z9CAow",
            )
            .unwrap(),
        );
        let descriptor = Registry::new().signature(&JwsAlgorithm::HS256);

        let signature = sign(signing_input.as_bytes(), &key, &descriptor).unwrap();
        assert_eq!(
            encoding::encode(&signature),
            "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"
        );
        assert!(verify(&signature, signing_input.as_bytes(), &key, &descriptor).unwrap());
    }

    #[test]
    fn altered_input_does_not_verify() {
        let registry = Registry::new();
        let hmac = JoseKey::from(SymmetricKey::shared(vec![9; 64]));
        let cases = [
            (JwsAlgorithm::HS256, &hmac, &hmac),
            (JwsAlgorithm::HS512, &hmac, &hmac),
            (JwsAlgorithm::RS256, &private_key(), &public_key()),
            (JwsAlgorithm::PS384, &private_key(), &private_key()),
        ];
        for (alg, signing_key, verifying_key) in cases {
            let descriptor = registry.signature(&alg);
            let input = b"eyJhbGciOiJub25lIn0.cGF5bG9hZA".to_vec();
            let signature = sign(&input, signing_key, &descriptor).unwrap();
            assert!(verify(&signature, &input, verifying_key, &descriptor).unwrap(), "{alg}");

            for i in 0..input.len() {
                let mut altered = input.clone();
                altered[i] ^= 0x01;
                assert!(!verify(&signature, &altered, verifying_key, &descriptor).unwrap(), "{alg} at {i}");
            }
            let mut altered = signature.clone();
            altered[0] ^= 0x80;
            assert!(!verify(&altered, &input, verifying_key, &descriptor).unwrap(), "{alg}");
        }
    }

    #[test]
    fn rsa_signature_has_modulus_length() {
        let descriptor = Registry::new().signature(&JwsAlgorithm::RS512);
        let signature = sign(b"input", &private_key(), &descriptor).unwrap();
        assert_eq!(signature.len(), 256);
        let err = sign(b"input", &public_key(), &descriptor).unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::InvalidKeyMaterial);
    }

    #[test]
    fn unsecured_signature_is_empty() {
        let descriptor = Registry::new().signature(&JwsAlgorithm::None);
        let key = JoseKey::from(SymmetricKey::hmac(vec![]));
        assert!(sign(b"input", &key, &descriptor).unwrap().is_empty());
        assert!(verify(&[], b"input", &key, &descriptor).unwrap());
        assert!(!verify(&[1], b"input", &key, &descriptor).unwrap());
    }

    #[test]
    fn hmac_key_checks() {
        let descriptor = Registry::new().signature(&JwsAlgorithm::HS384);
        for key in [
            JoseKey::from(SymmetricKey::hmac(vec![1; 47])),
            JoseKey::from(SymmetricKey::aes(vec![1; 48])),
            public_key(),
        ] {
            let err = sign(b"input", &key, &descriptor).unwrap_err();
            assert_eq!(err.kind(), JoseErrorKind::InvalidKeyMaterial);
        }
    }

    #[test]
    fn elliptic_curve_and_unknown_fail_fast() {
        let registry = Registry::new();
        let ec = JoseKey::from(EcKey::new("P-256", vec![1; 32]));
        for alg in [JwsAlgorithm::ES256, JwsAlgorithm::HS256] {
            let descriptor = registry.signature(&alg);
            let err = sign(b"input", &ec, &descriptor).unwrap_err();
            assert_eq!(err.kind(), JoseErrorKind::UnsupportedAlgorithm);
            let err = verify(&[0; 64], b"input", &ec, &descriptor).unwrap_err();
            assert_eq!(err.kind(), JoseErrorKind::UnsupportedAlgorithm);
        }

        let key = JoseKey::from(SymmetricKey::hmac(vec![1; 64]));
        for descriptor in [
            registry.signature(&JwsAlgorithm::ES512),
            registry.resolve_signature_algorithm(Some("HS1024")),
            registry.content_encryption(&crate::jose::ContentEncryptionAlgorithm::A128Gcm),
        ] {
            let err = sign(b"input", &key, &descriptor).unwrap_err();
            assert_eq!(err.kind(), JoseErrorKind::UnsupportedAlgorithm);
        }
    }
}
