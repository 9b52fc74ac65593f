//! Nested JWS in JWE, signed first and encrypted second, as described
//! in [`rfc7519, section 5.2`].
//!
//! The JWS travels as the JWE payload in compact form and the JWE
//! carries `cty: "JWT"` in its protected header.
//!
//! [`rfc7519, section 5.2`]: https://datatracker.ietf.org/doc/html/rfc7519#section-5.2

use super::{
    DecodedJws, Headers, JoseError, Jwe, JweBuilder, JweDecryptor, Jws, JwsBuilder, JwsCompact,
    Signer, Verifier,
};

/// `cty` value marking a JWE whose payload is a JWS.
pub const NESTED_CONTENT_TYPE: &str = "JWT";

impl JweBuilder<'_> {
    /// Use `jws` as payload and mark it as nested with `cty: "JWT"`.
    #[must_use]
    pub fn with_nested_jws(mut self, jws: &JwsCompact) -> Self {
        self.protected_headers_mut()
            .set_cty(NESTED_CONTENT_TYPE.to_owned());
        self.with_payload(jws.as_str())
    }

    /// Sign `payload` with `signer` and use the compact JWS as nested payload.
    pub fn try_with_signed_payload(
        self,
        payload: impl AsRef<[u8]>,
        signer: &impl Signer,
    ) -> Result<Self, JoseError> {
        let jws = JwsBuilder::new()
            .with_payload(payload)
            .build_compact(signer)?;
        Ok(self.with_nested_jws(&jws))
    }
}

impl JweDecryptor<'_> {
    /// Decrypt `jwe` and verify the JWS nested inside it.
    ///
    /// The JWE must declare `cty: "JWT"` (any case) in its protected or
    /// shared unprotected header. The nested JWS may be compact or use
    /// either JSON serialization.
    pub fn decrypt_nested(
        &self,
        jwe: &Jwe,
        verifier: &impl Verifier,
    ) -> Result<DecodedJws, JoseError> {
        let protected = jwe.protected_headers()?;
        if !is_nested(&protected) && !is_nested(jwe.unprotected_headers()) {
            return Err(JoseError::policy_violation(
                "JWE payload is not marked as nested JWS",
            ));
        }

        let payload = self.decrypt(jwe)?;
        let payload = std::str::from_utf8(&payload).map_err(|err| {
            JoseError::malformed_encoding("nested JWS is not UTF-8").with_source(err)
        })?;

        let jws = if payload.trim_start().starts_with('{') {
            Jws::from_json(payload)?
        } else {
            Jws::from(payload.parse::<JwsCompact>()?)
        };
        tracing::trace!(signatures = jws.signature_count(), "verify nested jws");
        jws.decode(verifier)
    }
}

fn is_nested(headers: &Headers) -> bool {
    headers
        .cty()
        .is_some_and(|cty| cty.eq_ignore_ascii_case(NESTED_CONTENT_TYPE))
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::jose::{
        JoseErrorKind, JoseKey, JwsAlgorithm, JwsSigner, JwsVerifier, KeyManagementAlgorithm,
        RsaPrivateKey, RsaPublicKey, SecretKeyKind, SymmetricKey,
    };

    fn rsa_key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| RsaPrivateKey::generate().unwrap())
    }

    fn rsa_public() -> JoseKey {
        RsaPublicKey::from_spki_der(rsa_key().public_key().as_spki_der())
            .unwrap()
            .into()
    }

    fn rsa_private() -> JoseKey {
        RsaPrivateKey::from_pkcs8_der(rsa_key().as_pkcs8_der())
            .unwrap()
            .into()
    }

    fn hmac_key() -> JoseKey {
        SymmetricKey::generate(SecretKeyKind::Hmac, 32).unwrap().into()
    }

    #[test]
    fn sign_then_encrypt_round_trip() {
        let signing = hmac_key();
        let recipient_public = rsa_public();
        let recipient_private = rsa_private();

        let compact = JweBuilder::new()
            .try_with_signed_payload(
                r#"{"iss":"joe"}"#,
                &JwsSigner::new(&signing, JwsAlgorithm::HS256).with_kid("sender".to_owned()),
            )
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::RsaOaep256, &recipient_public)
            .build_compact()
            .unwrap();

        let jwe = Jwe::from(compact);
        let protected = jwe.protected_headers().unwrap();
        assert_eq!(protected.cty(), Some(NESTED_CONTENT_TYPE));
        assert_eq!(protected.alg(), Some("RSA-OAEP-256"));

        let decoded = JweDecryptor::new(&recipient_private)
            .decrypt_nested(&jwe, &JwsVerifier::new(&signing))
            .unwrap();
        assert_eq!(decoded.payload(), br#"{"iss":"joe"}"#);
        assert_eq!(decoded.signatures()[0].protected_headers().kid(), Some("sender"));
    }

    #[test]
    fn tampered_inner_signature_is_rejected() {
        let signing = hmac_key();
        let kek: JoseKey = SymmetricKey::generate(SecretKeyKind::Aes, 32).unwrap().into();

        let jws = JwsBuilder::new()
            .with_payload("transfer 10")
            .build_compact(&JwsSigner::new(&signing, JwsAlgorithm::HS256))
            .unwrap();
        let (signing_input, signature) = jws.as_str().rsplit_once('.').unwrap();
        let first = if signature.starts_with('A') { 'B' } else { 'A' };
        let tampered: JwsCompact = format!("{signing_input}.{first}{}", &signature[1..])
            .parse()
            .unwrap();

        let jwe = JweBuilder::new()
            .with_nested_jws(&tampered)
            .add_default_recipient(&kek)
            .build_general()
            .unwrap();

        let decryptor = JweDecryptor::new(&kek);
        // the outer layer is intact, only the signature is wrong
        assert_eq!(decryptor.decrypt(&jwe).unwrap(), tampered.as_str().as_bytes());
        let err = decryptor
            .decrypt_nested(&jwe, &JwsVerifier::new(&signing))
            .unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::AuthenticationFailure);
    }

    #[test]
    fn wrong_recipient_key_fails_before_verification() {
        let signing = hmac_key();
        let kek: JoseKey = SymmetricKey::generate(SecretKeyKind::Aes, 16).unwrap().into();
        let other: JoseKey = SymmetricKey::generate(SecretKeyKind::Aes, 16).unwrap().into();

        let jwe = JweBuilder::new()
            .try_with_signed_payload("hi", &JwsSigner::new(&signing, JwsAlgorithm::HS384))
            .unwrap()
            .add_default_recipient(&kek)
            .build_general()
            .unwrap();

        let err = JweDecryptor::new(&other)
            .decrypt_nested(&jwe, &JwsVerifier::new(&signing))
            .unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::AuthenticationFailure);
    }

    #[test]
    fn requires_the_nested_content_type() {
        let kek: JoseKey = SymmetricKey::generate(SecretKeyKind::Aes, 32).unwrap().into();
        let signing = hmac_key();
        let jws = JwsBuilder::new()
            .with_payload("plain")
            .build_compact(&JwsSigner::new(&signing, JwsAlgorithm::HS256))
            .unwrap();

        let unmarked = JweBuilder::new()
            .with_payload(jws.as_str())
            .add_default_recipient(&kek)
            .build_general()
            .unwrap();
        let err = JweDecryptor::new(&kek)
            .decrypt_nested(&unmarked, &JwsVerifier::new(&signing))
            .unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::PolicyViolation);

        let lowercase = JweBuilder::new()
            .with_payload(jws.as_str())
            .try_with_protected_header("cty", "jwt")
            .unwrap()
            .add_default_recipient(&kek)
            .build_general()
            .unwrap();
        let decoded = JweDecryptor::new(&kek)
            .decrypt_nested(&lowercase, &JwsVerifier::new(&signing))
            .unwrap();
        assert_eq!(decoded.payload(), b"plain");
    }

    #[test]
    fn json_serialized_inner_jws_is_accepted() {
        let kek: JoseKey = SymmetricKey::generate(SecretKeyKind::Aes, 32).unwrap().into();
        let signing = hmac_key();
        let jws = JwsBuilder::new()
            .with_payload("flattened inside")
            .build_flattened(&JwsSigner::new(&signing, JwsAlgorithm::HS512))
            .unwrap();

        let jwe = JweBuilder::new()
            .with_payload(serde_json::to_vec(&jws).unwrap())
            .try_with_protected_header("cty", NESTED_CONTENT_TYPE)
            .unwrap()
            .add_default_recipient(&kek)
            .build_general()
            .unwrap();

        let decoded = JweDecryptor::new(&kek)
            .decrypt_nested(&jwe, &JwsVerifier::new(&signing))
            .unwrap();
        assert_eq!(decoded.payload(), b"flattened inside");
        assert_eq!(decoded.signatures()[0].protected_headers().alg(), Some("HS512"));
    }
}
