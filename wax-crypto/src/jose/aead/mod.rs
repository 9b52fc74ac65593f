//! Authenticated encryption of the JWE payload under the CEK,
//! as defined in [`rfc7518, section 5`].
//!
//! Two families are implemented:
//!
//! - composite AES-CBC + HMAC-SHA2 ([`rfc7518, section 5.2`]), assembled here
//!   from the block cipher and the MAC primitive
//! - AES-GCM ([`rfc7518, section 5.3`])
//!
//! Every decryption failure, whatever the cause, is reported as
//! [`JoseErrorKind::AuthenticationFailure`] and returns no plaintext.
//!
//! [`rfc7518, section 5`]: https://datatracker.ietf.org/doc/html/rfc7518#section-5
//! [`rfc7518, section 5.2`]: https://datatracker.ietf.org/doc/html/rfc7518#section-5.2
//! [`rfc7518, section 5.3`]: https://datatracker.ietf.org/doc/html/rfc7518#section-5.3
//!
//! [`JoseErrorKind::AuthenticationFailure`]: super::JoseErrorKind::AuthenticationFailure

use super::{AlgorithmDescriptor, JoseError, PrimitiveFamily, SymmetricKey, key::random_bytes};

mod cbc_hmac;
mod gcm;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Output of [`encrypt`].
///
/// `iv` and `tag` always have the lengths mandated by the
/// [`AlgorithmDescriptor`] used to produce them.
pub struct EncryptionResult {
    /// Initialization vector, generated when none was supplied.
    pub iv: Vec<u8>,
    /// Additional authenticated data covered by `tag`.
    pub aad: Vec<u8>,
    /// Encrypted payload.
    pub ciphertext: Vec<u8>,
    /// Authentication tag.
    pub tag: Vec<u8>,
}

/// Encrypt `payload` under `key` with the content encryption algorithm
/// described by `descriptor`.
///
/// A random IV of the right length is generated when `iv` is `None`.
/// An empty `aad` is allowed.
pub fn encrypt(
    descriptor: &AlgorithmDescriptor,
    payload: &[u8],
    iv: Option<&[u8]>,
    aad: &[u8],
    key: &SymmetricKey,
) -> Result<EncryptionResult, JoseError> {
    check_family(descriptor)?;
    check_key(descriptor, key)?;

    let iv = match iv {
        Some(iv) => {
            check_iv(descriptor, iv)?;
            iv.to_vec()
        }
        None => random_bytes(descriptor.iv_len())?.to_vec(),
    };

    let (ciphertext, tag) = match descriptor.family() {
        PrimitiveFamily::AesCbcHmacSha2 => {
            cbc_hmac::encrypt(descriptor, key.as_bytes(), &iv, aad, payload)?
        }
        _ => gcm::encrypt(descriptor, key.as_bytes(), &iv, aad, payload)?,
    };
    tracing::trace!(alg = descriptor.name(), len = payload.len(), "encrypted jwe payload");

    Ok(EncryptionResult {
        iv,
        aad: aad.to_vec(),
        ciphertext,
        tag,
    })
}

/// Authenticate and decrypt `ciphertext` under `key`.
///
/// The IV length and key are validated first and rejected as caller errors.
/// Anything that goes wrong afterwards is an
/// [`AuthenticationFailure`](super::JoseErrorKind::AuthenticationFailure).
pub fn decrypt(
    descriptor: &AlgorithmDescriptor,
    ciphertext: &[u8],
    iv: &[u8],
    aad: &[u8],
    tag: &[u8],
    key: &SymmetricKey,
) -> Result<Vec<u8>, JoseError> {
    check_family(descriptor)?;
    check_key(descriptor, key)?;
    check_iv(descriptor, iv)?;

    if tag.len() != descriptor.tag_len() {
        tracing::debug!(alg = descriptor.name(), "jwe tag has unexpected length");
        return Err(JoseError::authentication_failure());
    }

    let result = match descriptor.family() {
        PrimitiveFamily::AesCbcHmacSha2 => {
            cbc_hmac::decrypt(descriptor, key.as_bytes(), iv, aad, ciphertext, tag)
        }
        _ => gcm::decrypt(descriptor, key.as_bytes(), iv, aad, ciphertext, tag),
    };
    if result.is_err() {
        tracing::debug!(alg = descriptor.name(), "jwe payload failed authentication");
    }
    result
}

fn check_family(descriptor: &AlgorithmDescriptor) -> Result<(), JoseError> {
    match descriptor.family() {
        PrimitiveFamily::AesCbcHmacSha2 | PrimitiveFamily::AesGcm => Ok(()),
        _ => Err(JoseError::unsupported_algorithm(format!(
            "'{}' is not a content encryption algorithm",
            descriptor.name()
        ))),
    }
}

fn check_key(descriptor: &AlgorithmDescriptor, key: &SymmetricKey) -> Result<(), JoseError> {
    if !key.kind().allows_aes() {
        return Err(JoseError::invalid_key_material(format!(
            "{} key cannot be used for {}",
            key.kind().algorithm_name(),
            descriptor.name()
        )));
    }
    if key.len() != descriptor.key_len() {
        return Err(JoseError::invalid_key_material(format!(
            "{} requires a {} byte key, got {}",
            descriptor.name(),
            descriptor.key_len(),
            key.len()
        )));
    }
    Ok(())
}

fn check_iv(descriptor: &AlgorithmDescriptor, iv: &[u8]) -> Result<(), JoseError> {
    if iv.len() != descriptor.iv_len() {
        return Err(JoseError::invalid_input(format!(
            "{} requires a {} byte iv, got {}",
            descriptor.name(),
            descriptor.iv_len(),
            iv.len()
        )));
    }
    Ok(())
}
