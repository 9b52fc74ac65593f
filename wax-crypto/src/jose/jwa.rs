use std::{collections::HashMap, sync::OnceLock};

use wax_utils::macros::enums::enum_builder;

enum_builder! {
    /// JWS `alg` header values as registered in [`rfc7518, section 3.1`]
    ///
    /// [`rfc7518, section 3.1`]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
    @String
    pub enum JwsAlgorithm {
        /// HMAC using SHA-256 (Required)
        HS256 => "HS256",
        /// HMAC using SHA-384 (Optional)
        HS384 => "HS384",
        /// HMAC using SHA-512 (Optional)
        HS512 => "HS512",
        /// RSASSA-PKCS1-v1_5 using SHA-256 (Recommended)
        RS256 => "RS256",
        /// RSASSA-PKCS1-v1_5 using SHA-384 (Optional)
        RS384 => "RS384",
        /// RSASSA-PKCS1-v1_5 using SHA-512 (Optional)
        RS512 => "RS512",
        /// ECDSA using P-256 and SHA-256 (Recommended+)
        ES256 => "ES256",
        /// ECDSA using P-384 and SHA-384 (Optional)
        ES384 => "ES384",
        /// ECDSA using P-521 and SHA-512 (Optional)
        ES512 => "ES512",
        /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256 (Optional)
        PS256 => "PS256",
        /// RSASSA-PSS using SHA-384 and MGF1 with SHA-384 (Optional)
        PS384 => "PS384",
        /// RSASSA-PSS using SHA-512 and MGF1 with SHA-512 (Optional)
        PS512 => "PS512",
        /// No digital signature or MAC performed (Optional)
        None => "none",
    }
}

enum_builder! {
    /// JWE `alg` header values (key management) as registered in [`rfc7518, section 4.1`]
    ///
    /// [`rfc7518, section 4.1`]: https://datatracker.ietf.org/doc/html/rfc7518#section-4.1
    @String
    pub enum KeyManagementAlgorithm {
        /// Direct use of a shared symmetric key as the CEK (Recommended)
        Dir => "dir",
        /// RSAES-PKCS1-v1_5 (Recommended-)
        Rsa1_5 => "RSA1_5",
        /// RSAES OAEP using default parameters (Recommended+)
        RsaOaep => "RSA-OAEP",
        /// RSAES OAEP using SHA-256 and MGF1 with SHA-256 (Optional)
        RsaOaep256 => "RSA-OAEP-256",
        /// AES Key Wrap with default initial value using 128-bit key (Recommended)
        A128Kw => "A128KW",
        /// AES Key Wrap with default initial value using 192-bit key (Optional)
        A192Kw => "A192KW",
        /// AES Key Wrap with default initial value using 256-bit key (Recommended)
        A256Kw => "A256KW",
    }
}

impl KeyManagementAlgorithm {
    /// AES key wrap variant for a wrapping key of `len` bytes.
    pub fn for_symmetric_key_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(Self::A128Kw),
            24 => Some(Self::A192Kw),
            32 => Some(Self::A256Kw),
            _ => None,
        }
    }
}

enum_builder! {
    /// JWE `enc` header values (content encryption) as registered in [`rfc7518, section 5.1`]
    ///
    /// [`rfc7518, section 5.1`]: https://datatracker.ietf.org/doc/html/rfc7518#section-5.1
    @String
    pub enum ContentEncryptionAlgorithm {
        /// AES_128_CBC_HMAC_SHA_256 authenticated encryption (Required)
        A128CbcHs256 => "A128CBC-HS256",
        /// AES_192_CBC_HMAC_SHA_384 authenticated encryption (Optional)
        A192CbcHs384 => "A192CBC-HS384",
        /// AES_256_CBC_HMAC_SHA_512 authenticated encryption (Required)
        A256CbcHs512 => "A256CBC-HS512",
        /// AES GCM using 128-bit key (Recommended)
        A128Gcm => "A128GCM",
        /// AES GCM using 192-bit key (Optional)
        A192Gcm => "A192GCM",
        /// AES GCM using 256-bit key (Recommended)
        A256Gcm => "A256GCM",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The primitive an [`AlgorithmDescriptor`] is executed with.
pub enum PrimitiveFamily {
    /// Keyed MAC over the signing input.
    HmacSha2,
    /// Composite AES-CBC + HMAC-SHA2 ([`rfc7518, section 5.2`]).
    ///
    /// [`rfc7518, section 5.2`]: https://datatracker.ietf.org/doc/html/rfc7518#section-5.2
    AesCbcHmacSha2,
    /// AES in Galois/Counter Mode.
    AesGcm,
    /// AES key wrap ([`rfc3394`]).
    ///
    /// [`rfc3394`]: https://datatracker.ietf.org/doc/html/rfc3394
    AesKeyWrap,
    /// The shared symmetric key is the CEK.
    Direct,
    /// RSAES-PKCS1-v1_5 key encryption.
    RsaPkcs1v15Encryption,
    /// RSAES-OAEP key encryption, digest taken from the descriptor.
    RsaOaep,
    /// RSASSA-PKCS1-v1_5 signature.
    RsaPkcs1v15Signature,
    /// RSASSA-PSS signature.
    RsaPss,
    /// ECDSA signature, registered but not implemented.
    Ecdsa,
    /// `alg = "none"`
    Unsecured,
    /// Sentinel for names the registry does not know.
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Digest function used by an algorithm.
pub enum DigestAlgorithm {
    /// SHA-1, only used by `RSA-OAEP`
    Sha1,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Output length of the digest in bytes.
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Immutable parameters of one registered JOSE algorithm.
///
/// Lengths are stored in bits, as they are written down in [`rfc7518`].
/// For signature and key encryption algorithms `key_bits` is the minimum key size.
///
/// [`rfc7518`]: https://datatracker.ietf.org/doc/html/rfc7518
pub struct AlgorithmDescriptor {
    name: &'static str,
    family: PrimitiveFamily,
    digest: Option<DigestAlgorithm>,
    key_bits: u16,
    iv_bits: u16,
    tag_bits: u16,
}

impl AlgorithmDescriptor {
    /// Descriptor returned for every name the registry does not know.
    pub const UNSUPPORTED: Self = Self::new("", PrimitiveFamily::Unsupported, None, 0, 0, 0);

    const fn new(
        name: &'static str,
        family: PrimitiveFamily,
        digest: Option<DigestAlgorithm>,
        key_bits: u16,
        iv_bits: u16,
        tag_bits: u16,
    ) -> Self {
        Self {
            name,
            family,
            digest,
            key_bits,
            iv_bits,
            tag_bits,
        }
    }

    /// Registered JOSE name, empty for [`Self::UNSUPPORTED`].
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The primitive used to execute this algorithm.
    pub fn family(&self) -> PrimitiveFamily {
        self.family
    }

    /// Digest used by the MAC, signature or OAEP padding.
    pub fn digest(&self) -> Option<DigestAlgorithm> {
        self.digest
    }

    /// `false` only for [`Self::UNSUPPORTED`].
    pub fn is_supported(&self) -> bool {
        self.family != PrimitiveFamily::Unsupported
    }

    /// Key length in bits.
    pub fn key_bits(&self) -> usize {
        self.key_bits as usize
    }

    /// Key length in bytes.
    pub fn key_len(&self) -> usize {
        self.key_bits() / 8
    }

    /// IV length in bytes.
    pub fn iv_len(&self) -> usize {
        self.iv_bits as usize / 8
    }

    /// Authentication tag length in bytes.
    pub fn tag_len(&self) -> usize {
        self.tag_bits as usize / 8
    }

    /// Length of the MAC key half of a composite CBC-HMAC key, `0` otherwise.
    pub fn mac_key_len(&self) -> usize {
        match self.family {
            PrimitiveFamily::AesCbcHmacSha2 => self.key_len() / 2,
            _ => 0,
        }
    }

    /// Length of the AES key used for the actual encryption.
    pub fn enc_key_len(&self) -> usize {
        match self.family {
            PrimitiveFamily::AesCbcHmacSha2 => self.key_len() / 2,
            _ => self.key_len(),
        }
    }
}

use DigestAlgorithm::{Sha1, Sha256, Sha384, Sha512};
use PrimitiveFamily as F;

const SIGNATURE_ALGORITHMS: [AlgorithmDescriptor; 13] = [
    AlgorithmDescriptor::new("HS256", F::HmacSha2, Some(Sha256), 256, 0, 256),
    AlgorithmDescriptor::new("HS384", F::HmacSha2, Some(Sha384), 384, 0, 384),
    AlgorithmDescriptor::new("HS512", F::HmacSha2, Some(Sha512), 512, 0, 512),
    AlgorithmDescriptor::new("RS256", F::RsaPkcs1v15Signature, Some(Sha256), 2048, 0, 0),
    AlgorithmDescriptor::new("RS384", F::RsaPkcs1v15Signature, Some(Sha384), 2048, 0, 0),
    AlgorithmDescriptor::new("RS512", F::RsaPkcs1v15Signature, Some(Sha512), 2048, 0, 0),
    AlgorithmDescriptor::new("ES256", F::Ecdsa, Some(Sha256), 256, 0, 512),
    AlgorithmDescriptor::new("ES384", F::Ecdsa, Some(Sha384), 384, 0, 768),
    AlgorithmDescriptor::new("ES512", F::Ecdsa, Some(Sha512), 521, 0, 1056),
    AlgorithmDescriptor::new("PS256", F::RsaPss, Some(Sha256), 2048, 0, 0),
    AlgorithmDescriptor::new("PS384", F::RsaPss, Some(Sha384), 2048, 0, 0),
    AlgorithmDescriptor::new("PS512", F::RsaPss, Some(Sha512), 2048, 0, 0),
    AlgorithmDescriptor::new("none", F::Unsecured, None, 0, 0, 0),
];

const KEY_MANAGEMENT_ALGORITHMS: [AlgorithmDescriptor; 7] = [
    AlgorithmDescriptor::new("dir", F::Direct, None, 0, 0, 0),
    AlgorithmDescriptor::new("RSA1_5", F::RsaPkcs1v15Encryption, None, 2048, 0, 0),
    AlgorithmDescriptor::new("RSA-OAEP", F::RsaOaep, Some(Sha1), 2048, 0, 0),
    AlgorithmDescriptor::new("RSA-OAEP-256", F::RsaOaep, Some(Sha256), 2048, 0, 0),
    AlgorithmDescriptor::new("A128KW", F::AesKeyWrap, None, 128, 64, 0),
    AlgorithmDescriptor::new("A192KW", F::AesKeyWrap, None, 192, 64, 0),
    AlgorithmDescriptor::new("A256KW", F::AesKeyWrap, None, 256, 64, 0),
];

const CONTENT_ENCRYPTION_ALGORITHMS: [AlgorithmDescriptor; 6] = [
    AlgorithmDescriptor::new("A128CBC-HS256", F::AesCbcHmacSha2, Some(Sha256), 256, 128, 128),
    AlgorithmDescriptor::new("A192CBC-HS384", F::AesCbcHmacSha2, Some(Sha384), 384, 128, 192),
    AlgorithmDescriptor::new("A256CBC-HS512", F::AesCbcHmacSha2, Some(Sha512), 512, 128, 256),
    AlgorithmDescriptor::new("A128GCM", F::AesGcm, None, 128, 96, 128),
    AlgorithmDescriptor::new("A192GCM", F::AesGcm, None, 192, 96, 128),
    AlgorithmDescriptor::new("A256GCM", F::AesGcm, None, 256, 96, 128),
];

#[derive(Debug, Clone)]
/// Lookup tables from JOSE algorithm names to [`AlgorithmDescriptor`]s.
///
/// Built once and read-only afterwards. Either own one and pass it
/// by reference, or use the process wide [`Registry::shared`] instance.
///
/// Lookups never fail: unknown, empty or absent names resolve to
/// [`AlgorithmDescriptor::UNSUPPORTED`], which every engine rejects.
pub struct Registry {
    signature: HashMap<&'static str, AlgorithmDescriptor>,
    key_management: HashMap<&'static str, AlgorithmDescriptor>,
    content_encryption: HashMap<&'static str, AlgorithmDescriptor>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Build a new [`Registry`] with all algorithms registered in [`rfc7518`].
    ///
    /// [`rfc7518`]: https://datatracker.ietf.org/doc/html/rfc7518
    pub fn new() -> Self {
        fn table(descriptors: &[AlgorithmDescriptor]) -> HashMap<&'static str, AlgorithmDescriptor> {
            descriptors.iter().map(|d| (d.name, *d)).collect()
        }

        Self {
            signature: table(&SIGNATURE_ALGORITHMS),
            key_management: table(&KEY_MANAGEMENT_ALGORITHMS),
            content_encryption: table(&CONTENT_ENCRYPTION_ALGORITHMS),
        }
    }

    /// Process wide [`Registry`], initialized on first use.
    pub fn shared() -> &'static Self {
        static REGISTRY: OnceLock<Registry> = OnceLock::new();
        REGISTRY.get_or_init(Self::new)
    }

    fn resolve(
        table: &HashMap<&'static str, AlgorithmDescriptor>,
        kind: &'static str,
        name: Option<&str>,
    ) -> AlgorithmDescriptor {
        match name.and_then(|name| table.get(name)) {
            Some(descriptor) => *descriptor,
            None => {
                tracing::debug!(?name, "unsupported {kind} algorithm");
                AlgorithmDescriptor::UNSUPPORTED
            }
        }
    }

    /// Resolve a JWS `alg` name.
    pub fn resolve_signature_algorithm(&self, name: Option<&str>) -> AlgorithmDescriptor {
        Self::resolve(&self.signature, "signature", name)
    }

    /// Resolve a JWE `alg` name.
    pub fn resolve_key_algorithm(&self, name: Option<&str>) -> AlgorithmDescriptor {
        Self::resolve(&self.key_management, "key management", name)
    }

    /// Resolve a JWE `enc` name.
    pub fn resolve_content_algorithm(&self, name: Option<&str>) -> AlgorithmDescriptor {
        Self::resolve(&self.content_encryption, "content encryption", name)
    }

    /// Descriptor for a typed [`JwsAlgorithm`].
    pub fn signature(&self, alg: &JwsAlgorithm) -> AlgorithmDescriptor {
        self.resolve_signature_algorithm(Some(alg.as_str()))
    }

    /// Descriptor for a typed [`KeyManagementAlgorithm`].
    pub fn key_management(&self, alg: &KeyManagementAlgorithm) -> AlgorithmDescriptor {
        self.resolve_key_algorithm(Some(alg.as_str()))
    }

    /// Descriptor for a typed [`ContentEncryptionAlgorithm`].
    pub fn content_encryption(&self, enc: &ContentEncryptionAlgorithm) -> AlgorithmDescriptor {
        self.resolve_content_algorithm(Some(enc.as_str()))
    }
}
