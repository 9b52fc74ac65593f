//! Production and recovery of the Content Encryption Key (CEK) for one
//! JWE recipient, as defined in [`rfc7518, section 4`].
//!
//! [`rfc7518, section 4`]: https://datatracker.ietf.org/doc/html/rfc7518#section-4

use std::fmt;

use zeroize::Zeroizing;

use super::{
    AlgorithmDescriptor, JoseError, JoseKey, PrimitiveFamily, RsaPrivateKey, RsaPublicKey,
    SymmetricKey, key::random_bytes,
};

mod aes_kw;
mod rsa;

#[derive(Clone, PartialEq, Eq)]
/// Content Encryption Key, zeroed on drop.
pub struct ContentKey(SymmetricKey);

impl ContentKey {
    /// Use the given bytes as CEK.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(SymmetricKey::aes(bytes))
    }

    fn from_zeroizing(bytes: Zeroizing<Vec<u8>>) -> Self {
        Self::new(bytes.as_slice())
    }

    /// Raw CEK bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// CEK length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` for a zero length CEK.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The CEK as an AES [`SymmetricKey`], ready for the
    /// [`aead`](super::aead) engine.
    pub fn as_symmetric_key(&self) -> &SymmetricKey {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContentKey").field(&self.len()).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Output of [`encrypt_cek`].
pub struct KeyManagementResult {
    /// The CEK to encrypt the payload with.
    pub cek: ContentKey,
    /// The JWE Encrypted Key for this recipient, empty for `dir`.
    pub encrypted_key: Vec<u8>,
}

/// Generate a random CEK sized for the given content encryption algorithm.
pub fn generate_cek(content: &AlgorithmDescriptor) -> Result<ContentKey, JoseError> {
    check_content_family(content)?;
    Ok(ContentKey(SymmetricKey::generate(
        super::SecretKeyKind::Aes,
        content.key_len(),
    )?))
}

/// Produce the CEK and encrypted key for one recipient.
///
/// `cek` is used instead of a freshly generated key when given,
/// so several recipients can share one CEK. `dir` cannot do that:
/// its CEK is the recipient key itself.
pub fn encrypt_cek(
    key_descriptor: &AlgorithmDescriptor,
    content: &AlgorithmDescriptor,
    key: &JoseKey,
    cek: Option<ContentKey>,
) -> Result<KeyManagementResult, JoseError> {
    check_key_family(key_descriptor)?;
    check_content_family(content)?;
    reject_elliptic_curve(key_descriptor, key)?;
    tracing::trace!(alg = key_descriptor.name(), enc = content.name(), "encrypt cek");

    let cek = match (key_descriptor.family(), cek) {
        (PrimitiveFamily::Direct, cek) => {
            let key = direct_key(content, key)?;
            if cek.is_some_and(|cek| cek.as_bytes() != key.as_bytes()) {
                return Err(JoseError::invalid_input(
                    "dir cannot share a CEK with other recipients",
                ));
            }
            return Ok(KeyManagementResult {
                cek: ContentKey(SymmetricKey::aes(key.as_bytes())),
                encrypted_key: Vec::new(),
            });
        }
        (_, Some(cek)) => {
            if cek.len() != content.key_len() {
                return Err(JoseError::invalid_input(format!(
                    "{} requires a {} byte CEK, got {}",
                    content.name(),
                    content.key_len(),
                    cek.len()
                )));
            }
            cek
        }
        (_, None) => generate_cek(content)?,
    };

    let encrypted_key = match key_descriptor.family() {
        PrimitiveFamily::AesKeyWrap => {
            aes_kw::wrap(wrapping_key(key_descriptor, key)?.as_bytes(), cek.as_bytes())?
        }
        _ => rsa::encrypt(key_descriptor, rsa_public_key(key)?, cek.as_bytes())?,
    };

    Ok(KeyManagementResult { cek, encrypted_key })
}

/// Recover the CEK for one recipient from its encrypted key.
pub fn decrypt_cek(
    key_descriptor: &AlgorithmDescriptor,
    content: &AlgorithmDescriptor,
    encrypted_key: &[u8],
    key: &JoseKey,
) -> Result<ContentKey, JoseError> {
    check_key_family(key_descriptor)?;
    check_content_family(content)?;
    reject_elliptic_curve(key_descriptor, key)?;
    tracing::trace!(alg = key_descriptor.name(), enc = content.name(), "decrypt cek");

    match key_descriptor.family() {
        PrimitiveFamily::Direct => {
            if !encrypted_key.is_empty() {
                return Err(JoseError::invalid_input(
                    "dir recipients must not carry an encrypted key",
                ));
            }
            let key = direct_key(content, key)?;
            Ok(ContentKey(SymmetricKey::aes(key.as_bytes())))
        }
        PrimitiveFamily::AesKeyWrap => {
            let kek = wrapping_key(key_descriptor, key)?;
            let cek = aes_kw::unwrap(kek.as_bytes(), encrypted_key)?;
            if cek.len() != content.key_len() {
                return Err(JoseError::authentication_failure());
            }
            Ok(ContentKey::from_zeroizing(cek))
        }
        _ => {
            let cek = rsa::decrypt(key_descriptor, content, rsa_private_key(key)?, encrypted_key)?;
            Ok(ContentKey::from_zeroizing(cek))
        }
    }
}

fn check_key_family(descriptor: &AlgorithmDescriptor) -> Result<(), JoseError> {
    match descriptor.family() {
        PrimitiveFamily::Direct
        | PrimitiveFamily::AesKeyWrap
        | PrimitiveFamily::RsaPkcs1v15Encryption
        | PrimitiveFamily::RsaOaep => Ok(()),
        _ => Err(JoseError::unsupported_algorithm(format!(
            "'{}' is not a key management algorithm",
            descriptor.name()
        ))),
    }
}

fn check_content_family(descriptor: &AlgorithmDescriptor) -> Result<(), JoseError> {
    match descriptor.family() {
        PrimitiveFamily::AesCbcHmacSha2 | PrimitiveFamily::AesGcm => Ok(()),
        _ => Err(JoseError::unsupported_algorithm(format!(
            "'{}' is not a content encryption algorithm",
            descriptor.name()
        ))),
    }
}

fn reject_elliptic_curve(descriptor: &AlgorithmDescriptor, key: &JoseKey) -> Result<(), JoseError> {
    if let JoseKey::EllipticCurve(key) = key {
        return Err(JoseError::unsupported_algorithm(format!(
            "{} with an elliptic curve key ({}) is not implemented",
            descriptor.name(),
            key.curve()
        )));
    }
    Ok(())
}

fn aes_key(key: &JoseKey) -> Result<&SymmetricKey, JoseError> {
    match key {
        JoseKey::Symmetric(key) if key.kind().allows_aes() => Ok(key),
        _ => Err(JoseError::invalid_key_material(format!(
            "expected an AES key, got {}",
            key.algorithm_name()
        ))),
    }
}

fn direct_key<'a>(
    content: &AlgorithmDescriptor,
    key: &'a JoseKey,
) -> Result<&'a SymmetricKey, JoseError> {
    let key = aes_key(key)?;
    if key.len() != content.key_len() {
        return Err(JoseError::invalid_key_material(format!(
            "dir with {} requires a {} byte key, got {}",
            content.name(),
            content.key_len(),
            key.len()
        )));
    }
    Ok(key)
}

fn wrapping_key<'a>(
    descriptor: &AlgorithmDescriptor,
    key: &'a JoseKey,
) -> Result<&'a SymmetricKey, JoseError> {
    let key = aes_key(key)?;
    if key.len() != descriptor.key_len() {
        return Err(JoseError::invalid_key_material(format!(
            "{} requires a {} byte key, got {}",
            descriptor.name(),
            descriptor.key_len(),
            key.len()
        )));
    }
    Ok(key)
}

fn rsa_public_key(key: &JoseKey) -> Result<&RsaPublicKey, JoseError> {
    key.rsa_public().ok_or_else(|| {
        JoseError::invalid_key_material(format!(
            "expected an RSA key, got {}",
            key.algorithm_name()
        ))
    })
}

fn rsa_private_key(key: &JoseKey) -> Result<&RsaPrivateKey, JoseError> {
    key.rsa_private().ok_or_else(|| {
        JoseError::invalid_key_material(format!(
            "decrypting the CEK requires an RSA private key, got {}",
            match key {
                JoseKey::RsaPublic(_) => "an RSA public key",
                _ => key.algorithm_name(),
            }
        ))
    })
}
