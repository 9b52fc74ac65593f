use wax_utils::macros::generate_set_and_with;

use super::{ContentEncryptionAlgorithm, JoseKey, JwsAlgorithm, KeyManagementAlgorithm};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Default algorithm choices used by the JWS and JWE builders
/// when the caller does not name an algorithm explicitly.
///
/// ```
/// use wax_crypto::jose::{ContentEncryptionAlgorithm, JoseProfile};
///
/// let profile = JoseProfile::default()
///     .with_content_encryption(ContentEncryptionAlgorithm::A256Gcm);
/// assert_eq!(profile.content_encryption(), &ContentEncryptionAlgorithm::A256Gcm);
/// ```
pub struct JoseProfile {
    content_encryption: ContentEncryptionAlgorithm,
    asymmetric_key_management: KeyManagementAlgorithm,
    symmetric_key_management: KeyManagementAlgorithm,
    asymmetric_signature: JwsAlgorithm,
    symmetric_signature: JwsAlgorithm,
}

impl Default for JoseProfile {
    fn default() -> Self {
        Self {
            content_encryption: ContentEncryptionAlgorithm::A128CbcHs256,
            asymmetric_key_management: KeyManagementAlgorithm::Rsa1_5,
            symmetric_key_management: KeyManagementAlgorithm::A256Kw,
            asymmetric_signature: JwsAlgorithm::RS256,
            symmetric_signature: JwsAlgorithm::HS256,
        }
    }
}

impl JoseProfile {
    generate_set_and_with! {
        /// Set the default JWE `enc` algorithm.
        pub fn content_encryption(mut self, enc: ContentEncryptionAlgorithm) -> Self {
            self.content_encryption = enc;
            self
        }
    }

    generate_set_and_with! {
        /// Set the default JWE `alg` for RSA recipients.
        pub fn asymmetric_key_management(mut self, alg: KeyManagementAlgorithm) -> Self {
            self.asymmetric_key_management = alg;
            self
        }
    }

    generate_set_and_with! {
        /// Set the JWE `alg` for symmetric recipients whose key length
        /// does not select an AES key wrap variant.
        pub fn symmetric_key_management(mut self, alg: KeyManagementAlgorithm) -> Self {
            self.symmetric_key_management = alg;
            self
        }
    }

    generate_set_and_with! {
        /// Set the default JWS `alg` for RSA keys.
        pub fn asymmetric_signature(mut self, alg: JwsAlgorithm) -> Self {
            self.asymmetric_signature = alg;
            self
        }
    }

    generate_set_and_with! {
        /// Set the default JWS `alg` for symmetric keys.
        pub fn symmetric_signature(mut self, alg: JwsAlgorithm) -> Self {
            self.symmetric_signature = alg;
            self
        }
    }

    /// Default JWE `enc` algorithm.
    pub fn content_encryption(&self) -> &ContentEncryptionAlgorithm {
        &self.content_encryption
    }

    /// Default JWE `alg` for RSA recipients.
    pub fn asymmetric_key_management(&self) -> &KeyManagementAlgorithm {
        &self.asymmetric_key_management
    }

    /// Fallback JWE `alg` for symmetric recipients.
    pub fn symmetric_key_management(&self) -> &KeyManagementAlgorithm {
        &self.symmetric_key_management
    }

    /// Default JWS `alg` for RSA keys.
    pub fn asymmetric_signature(&self) -> &JwsAlgorithm {
        &self.asymmetric_signature
    }

    /// Default JWS `alg` for symmetric keys.
    pub fn symmetric_signature(&self) -> &JwsAlgorithm {
        &self.symmetric_signature
    }

    /// Key management algorithm for the given recipient key.
    ///
    /// Symmetric keys of 16, 24 or 32 bytes select the matching AES key wrap
    /// variant, other symmetric keys fall back to the profile value.
    /// Elliptic curve keys get the asymmetric choice and will be rejected
    /// by the key management engine.
    pub fn key_management_for(&self, key: &JoseKey) -> KeyManagementAlgorithm {
        match key {
            JoseKey::Symmetric(key) => KeyManagementAlgorithm::for_symmetric_key_len(key.len())
                .unwrap_or_else(|| self.symmetric_key_management.clone()),
            JoseKey::RsaPrivate(_) | JoseKey::RsaPublic(_) | JoseKey::EllipticCurve(_) => {
                self.asymmetric_key_management.clone()
            }
        }
    }

    /// Signature algorithm for the given signing key.
    pub fn signature_for(&self, key: &JoseKey) -> JwsAlgorithm {
        match key {
            JoseKey::Symmetric(_) => self.symmetric_signature.clone(),
            JoseKey::RsaPrivate(_) | JoseKey::RsaPublic(_) | JoseKey::EllipticCurve(_) => {
                self.asymmetric_signature.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jose::SymmetricKey;

    #[test]
    fn default_profile() {
        let profile = JoseProfile::default();
        assert_eq!(profile.content_encryption(), &ContentEncryptionAlgorithm::A128CbcHs256);
        assert_eq!(profile.asymmetric_key_management(), &KeyManagementAlgorithm::Rsa1_5);
        assert_eq!(profile.symmetric_key_management(), &KeyManagementAlgorithm::A256Kw);
        assert_eq!(profile.asymmetric_signature(), &JwsAlgorithm::RS256);
        assert_eq!(profile.symmetric_signature(), &JwsAlgorithm::HS256);
    }

    #[test]
    fn key_wrap_variant_follows_key_length() {
        let profile = JoseProfile::default();
        let key = JoseKey::from(SymmetricKey::aes(vec![0; 24]));
        assert_eq!(profile.key_management_for(&key), KeyManagementAlgorithm::A192Kw);
        let key = JoseKey::from(SymmetricKey::aes(vec![0; 64]));
        assert_eq!(profile.key_management_for(&key), KeyManagementAlgorithm::A256Kw);
        assert_eq!(profile.signature_for(&key), JwsAlgorithm::HS256);
    }

    #[test]
    fn profile_setters() {
        let mut profile = JoseProfile::default().with_symmetric_signature(JwsAlgorithm::HS512);
        profile.set_asymmetric_key_management(KeyManagementAlgorithm::RsaOaep256);
        assert_eq!(profile.symmetric_signature(), &JwsAlgorithm::HS512);
        assert_eq!(profile.asymmetric_key_management(), &KeyManagementAlgorithm::RsaOaep256);
    }
}
