use std::fmt;

use aws_lc_rs::{
    digest::{SHA256, digest},
    encoding::AsDer,
    rand::{SecureRandom, SystemRandom},
    rsa::{KeySize, PrivateDecryptingKey, PublicEncryptingKey},
    signature::{KeyPair, RsaKeyPair},
};
use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use zeroize::Zeroizing;

use super::{JoseError, der};

/// Smallest RSA modulus accepted for any JOSE operation.
pub const MIN_RSA_KEY_BITS: usize = 2048;

/// Fill a fresh buffer from the system CSPRNG.
pub(super) fn random_bytes(len: usize) -> Result<Zeroizing<Vec<u8>>, JoseError> {
    let mut bytes = Zeroizing::new(vec![0u8; len]);
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|err| {
            JoseError::invalid_key_material("system random generator failed").with_source(err)
        })?;
    Ok(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// What a [`SymmetricKey`] was created for.
pub enum SecretKeyKind {
    /// AES key, usable for content encryption, key wrap and `dir`.
    Aes,
    /// HMAC key, usable for `HS*` signatures.
    Hmac,
    /// Untagged shared secret (for example an `oct` JWK), usable for both.
    Shared,
}

impl SecretKeyKind {
    /// Algorithm tag as reported by [`JoseKey::algorithm_name`].
    pub fn algorithm_name(self) -> &'static str {
        match self {
            Self::Aes => "AES",
            Self::Hmac => "HMAC",
            Self::Shared => "oct",
        }
    }

    pub(super) fn allows_aes(self) -> bool {
        matches!(self, Self::Aes | Self::Shared)
    }

    pub(super) fn allows_hmac(self) -> bool {
        matches!(self, Self::Hmac | Self::Shared)
    }
}

#[derive(Clone, PartialEq, Eq)]
/// Raw symmetric key bytes, zeroed on drop.
pub struct SymmetricKey {
    kind: SecretKeyKind,
    bytes: Zeroizing<Vec<u8>>,
}

impl SymmetricKey {
    /// Create a key of the given kind from raw bytes.
    pub fn new(kind: SecretKeyKind, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            bytes: Zeroizing::new(bytes.into()),
        }
    }

    /// Create an AES key.
    pub fn aes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(SecretKeyKind::Aes, bytes)
    }

    /// Create an HMAC key.
    pub fn hmac(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(SecretKeyKind::Hmac, bytes)
    }

    /// Create an untagged shared secret.
    pub fn shared(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(SecretKeyKind::Shared, bytes)
    }

    /// Generate `len` random bytes.
    pub fn generate(kind: SecretKeyKind, len: usize) -> Result<Self, JoseError> {
        let bytes = random_bytes(len)?;
        Ok(Self {
            kind,
            bytes,
        })
    }

    /// Decode an unpadded base64url secret (the `k` member of an `oct` JWK).
    pub fn from_base64url(kind: SecretKeyKind, encoded: &str) -> Result<Self, JoseError> {
        let bytes = BASE64_URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|err| JoseError::invalid_key_material("decode base64url secret").with_source(err))?;
        Ok(Self::new(kind, bytes))
    }

    /// Decode a hex encoded secret.
    pub fn from_hex(kind: SecretKeyKind, encoded: &str) -> Result<Self, JoseError> {
        let bytes = hex::decode(encoded)
            .map_err(|err| JoseError::invalid_key_material("decode hex secret").with_source(err))?;
        Ok(Self::new(kind, bytes))
    }

    /// Derive a 256-bit AES key as the SHA-256 digest of a UTF-8 passphrase.
    pub fn from_shared_secret(passphrase: &str) -> Self {
        Self::aes(digest(&SHA256, passphrase.as_bytes()).as_ref())
    }

    /// What this key was created for.
    pub fn kind(&self) -> SecretKeyKind {
        self.kind
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` if the key has no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// RSA public key, usable to verify `RS*`/`PS*` signatures and
/// to encrypt a CEK with `RSA1_5`, `RSA-OAEP` or `RSA-OAEP-256`.
pub struct RsaPublicKey {
    rsa_public_key_der: Vec<u8>,
    spki_der: Vec<u8>,
    bits: usize,
}

impl RsaPublicKey {
    /// Parse a DER encoded PKCS#1 `RSAPublicKey`.
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self, JoseError> {
        let spki_der = der::subject_public_key_info(der);
        let bits = parse_spki(&spki_der)?.key_size_bits();
        check_rsa_key_size(bits)?;
        Ok(Self {
            rsa_public_key_der: der.to_vec(),
            spki_der,
            bits,
        })
    }

    /// Parse a DER encoded X.509 `SubjectPublicKeyInfo`.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, JoseError> {
        Self::from_pkcs1_der(der::rsa_public_key_from_spki(der)?)
    }

    /// Create a public key from its big endian modulus and exponent,
    /// as found in the `n` and `e` members of an RSA JWK.
    pub fn from_components(n: &[u8], e: &[u8]) -> Result<Self, JoseError> {
        Self::from_pkcs1_der(&der::rsa_public_key(n, e)?)
    }

    /// DER encoded PKCS#1 `RSAPublicKey`.
    pub fn as_pkcs1_der(&self) -> &[u8] {
        &self.rsa_public_key_der
    }

    /// DER encoded X.509 `SubjectPublicKeyInfo`.
    pub fn as_spki_der(&self) -> &[u8] {
        &self.spki_der
    }

    /// Modulus size in bits.
    pub fn key_size_bits(&self) -> usize {
        self.bits
    }

    pub(super) fn encrypting_key(&self) -> Result<PublicEncryptingKey, JoseError> {
        parse_spki(&self.spki_der)
    }
}

fn parse_spki(spki: &[u8]) -> Result<PublicEncryptingKey, JoseError> {
    PublicEncryptingKey::from_der(spki)
        .map_err(|err| JoseError::invalid_key_material("parse RSA public key").with_source(err))
}

impl fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPublicKey")
            .field("bits", &self.key_size_bits())
            .finish()
    }
}

/// RSA private key, usable to sign `RS*`/`PS*` and to decrypt a CEK.
///
/// Verification and encryption with a private key use its public half.
pub struct RsaPrivateKey {
    signing: RsaKeyPair,
    pkcs8_der: Zeroizing<Vec<u8>>,
    public: RsaPublicKey,
}

impl RsaPrivateKey {
    /// Generate a new 2048-bit key.
    pub fn generate() -> Result<Self, JoseError> {
        Self::generate_with_size(KeySize::Rsa2048)
    }

    /// Generate a new key of the given size.
    pub fn generate_with_size(size: KeySize) -> Result<Self, JoseError> {
        let key_pair = RsaKeyPair::generate(size)
            .map_err(|err| JoseError::invalid_key_material("generate RSA key").with_source(err))?;
        let pkcs8 = key_pair
            .as_der()
            .map_err(|err| JoseError::invalid_key_material("encode RSA key").with_source(err))?;
        Self::from_pkcs8_der(pkcs8.as_ref())
    }

    /// Parse a DER encoded PKCS#8 private key.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, JoseError> {
        let signing = RsaKeyPair::from_pkcs8(der).map_err(|err| {
            JoseError::invalid_key_material("parse RSA private key").with_source(err)
        })?;
        check_rsa_key_size(signing.public_modulus_len() * 8)?;
        let public = RsaPublicKey::from_pkcs1_der(signing.public_key().as_ref())?;
        let key = Self {
            signing,
            pkcs8_der: Zeroizing::new(der.to_vec()),
            public,
        };
        key.decrypting_key()?;
        Ok(key)
    }

    /// DER encoded PKCS#8 form of this key.
    pub fn as_pkcs8_der(&self) -> &[u8] {
        &self.pkcs8_der
    }

    /// The public half of this key.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Modulus size in bits.
    pub fn key_size_bits(&self) -> usize {
        self.public.key_size_bits()
    }

    pub(super) fn signing_key(&self) -> &RsaKeyPair {
        &self.signing
    }

    pub(super) fn decrypting_key(&self) -> Result<PrivateDecryptingKey, JoseError> {
        PrivateDecryptingKey::from_pkcs8(&self.pkcs8_der).map_err(|err| {
            JoseError::invalid_key_material("parse RSA private key").with_source(err)
        })
    }
}

impl fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("bits", &self.key_size_bits())
            .finish()
    }
}

fn check_rsa_key_size(bits: usize) -> Result<(), JoseError> {
    if bits < MIN_RSA_KEY_BITS {
        return Err(JoseError::invalid_key_material(format!(
            "RSA key of {bits} bits is below the {MIN_RSA_KEY_BITS} bit minimum"
        )));
    }
    Ok(())
}

#[derive(Clone, PartialEq, Eq)]
/// Elliptic curve key material.
///
/// It can be carried around, but no signature or key management
/// operation is implemented for it: they fail with
/// [`JoseErrorKind::UnsupportedAlgorithm`](super::JoseErrorKind::UnsupportedAlgorithm).
pub struct EcKey {
    curve: String,
    bytes: Zeroizing<Vec<u8>>,
}

impl EcKey {
    /// Create an [`EcKey`] for the named curve (e.g. `P-256`) from raw key bytes.
    pub fn new(curve: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            curve: curve.into(),
            bytes: Zeroizing::new(bytes.into()),
        }
    }

    /// Curve name.
    pub fn curve(&self) -> &str {
        &self.curve
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for EcKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcKey").field("curve", &self.curve).finish()
    }
}

#[derive(Debug)]
/// Every kind of key the signature and key management engines dispatch on.
pub enum JoseKey {
    /// Shared secret for HMAC, AES key wrap, content encryption or `dir`.
    Symmetric(SymmetricKey),
    /// RSA private key.
    RsaPrivate(RsaPrivateKey),
    /// RSA public key.
    RsaPublic(RsaPublicKey),
    /// Elliptic curve key, not supported by any operation.
    EllipticCurve(EcKey),
}

impl JoseKey {
    /// Algorithm tag of the key material: `AES`, `HMAC`, `oct`, `RSA` or `EC`.
    pub fn algorithm_name(&self) -> &'static str {
        match self {
            Self::Symmetric(key) => key.kind().algorithm_name(),
            Self::RsaPrivate(_) | Self::RsaPublic(_) => "RSA",
            Self::EllipticCurve(_) => "EC",
        }
    }

    /// Symmetric key bytes, if this is a symmetric key.
    pub fn symmetric(&self) -> Option<&SymmetricKey> {
        match self {
            Self::Symmetric(key) => Some(key),
            _ => None,
        }
    }

    /// RSA public key, also available for private keys.
    pub fn rsa_public(&self) -> Option<&RsaPublicKey> {
        match self {
            Self::RsaPrivate(key) => Some(key.public_key()),
            Self::RsaPublic(key) => Some(key),
            _ => None,
        }
    }

    /// RSA private key, if this is one.
    pub fn rsa_private(&self) -> Option<&RsaPrivateKey> {
        match self {
            Self::RsaPrivate(key) => Some(key),
            _ => None,
        }
    }
}

impl From<SymmetricKey> for JoseKey {
    fn from(key: SymmetricKey) -> Self {
        Self::Symmetric(key)
    }
}

impl From<RsaPrivateKey> for JoseKey {
    fn from(key: RsaPrivateKey) -> Self {
        Self::RsaPrivate(key)
    }
}

impl From<RsaPublicKey> for JoseKey {
    fn from(key: RsaPublicKey) -> Self {
        Self::RsaPublic(key)
    }
}

impl From<EcKey> for JoseKey {
    fn from(key: EcKey) -> Self {
        Self::EllipticCurve(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    #[test]
    fn shared_secret_is_sha256_of_passphrase() {
        let key = SymmetricKey::from_shared_secret("abc");
        assert_eq!(key.kind(), SecretKeyKind::Aes);
        assert_eq!(
            hex::encode(key.as_bytes()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn symmetric_key_decoders() {
        let key = SymmetricKey::from_base64url(SecretKeyKind::Aes, "GawgguFyGrWKav7AX4VKUg").unwrap();
        assert_eq!(key.len(), 16);
        let key = SymmetricKey::from_hex(SecretKeyKind::Hmac, "000102").unwrap();
        assert_eq!(key.as_bytes(), &[0, 1, 2]);
        assert_err!(SymmetricKey::from_hex(SecretKeyKind::Hmac, "zz"));
        assert_err!(SymmetricKey::from_base64url(SecretKeyKind::Aes, "a+b/"));
    }

    #[test]
    fn debug_does_not_leak_key_bytes() {
        let key = SymmetricKey::hmac(vec![0xAB; 32]);
        let debug = format!("{key:?}");
        assert!(!debug.contains("171"));
        assert!(debug.contains("len: 32"));
    }

    #[test]
    fn algorithm_names() {
        assert_eq!(JoseKey::from(SymmetricKey::aes(vec![0; 16])).algorithm_name(), "AES");
        assert_eq!(JoseKey::from(SymmetricKey::hmac(vec![0; 16])).algorithm_name(), "HMAC");
        assert_eq!(JoseKey::from(SymmetricKey::shared(vec![0; 16])).algorithm_name(), "oct");
        assert_eq!(JoseKey::from(EcKey::new("P-256", vec![1; 32])).algorithm_name(), "EC");
    }

    #[test]
    fn rsa_private_key_round_trips_pkcs8() {
        let key = RsaPrivateKey::generate().unwrap();
        assert_eq!(key.key_size_bits(), 2048);
        let parsed = RsaPrivateKey::from_pkcs8_der(key.as_pkcs8_der()).unwrap();
        assert_eq!(parsed.public_key().as_pkcs1_der(), key.public_key().as_pkcs1_der());
        let jose = JoseKey::from(parsed);
        assert_eq!(jose.algorithm_name(), "RSA");
        assert!(jose.rsa_public().is_some());
        assert!(jose.symmetric().is_none());
    }

    #[test]
    fn rsa_public_key_forms_agree() {
        let key = RsaPrivateKey::generate().unwrap();
        let pkcs1 = key.public_key().as_pkcs1_der();
        let from_spki = RsaPublicKey::from_spki_der(key.public_key().as_spki_der()).unwrap();
        assert_eq!(from_spki.as_pkcs1_der(), pkcs1);
        assert_eq!(from_spki.key_size_bits(), 2048);
    }

    #[test]
    fn small_rsa_modulus_is_rejected() {
        let err = RsaPublicKey::from_components(&[0xc5; 128], &[1, 0, 1]).unwrap_err();
        assert_eq!(err.kind(), crate::jose::JoseErrorKind::InvalidKeyMaterial);
    }
}
