//! # JOSE: JSON Object Signing and Encryption
//!
//! JOSE is an IETF standard for securely transferring data between parties using JSON.
//! It provides a general framework for signing and encrypting any kind of data, and it's
//! the foundation for technologies like JSON Web Tokens (JWTs).
//!
//! This module implements the cryptographic core of it:
//!
//! * JWS (JSON Web Signature): a payload protected by one or more signatures or MACs,
//!   built with [`JwsBuilder`] and checked with a [`Verifier`] such as [`JwsVerifier`].
//!   See [`rfc7515`] for more details.
//!
//! * JWE (JSON Web Encryption): a payload encrypted under a Content Encryption Key (CEK),
//!   with that CEK protected for one or more recipients. Built with [`JweBuilder`] and
//!   opened with [`JweDecryptor`]. See [`rfc7516`] for more details.
//!
//! * JWA (JSON Web Algorithm): the algorithm names used in the `alg` and `enc` headers,
//!   resolved to [`AlgorithmDescriptor`]s by a [`Registry`]. See [`rfc7518`] for more details.
//!
//! Both formats can be written in the compact form and in the flattened or
//! general JSON serialization. A JWS can also be nested inside a JWE, signed
//! first and encrypted second, see [`JweBuilder::try_with_signed_payload`] and
//! [`JweDecryptor::decrypt_nested`].
//!
//! The engines underneath the formats are public as well: [`aead`] for content
//! encryption, [`key_mgmt`] for CEK management and [`sign`] for signatures.
//!
//! ```
//! use wax_crypto::jose::{
//!     JoseKey, JwsAlgorithm, JwsBuilder, JwsSigner, JwsVerifier, SecretKeyKind, SymmetricKey,
//! };
//!
//! let key: JoseKey = SymmetricKey::generate(SecretKeyKind::Hmac, 32).unwrap().into();
//! let jws = JwsBuilder::new()
//!     .with_payload(r#"{"iss":"joe"}"#)
//!     .build_compact(&JwsSigner::new(&key, JwsAlgorithm::HS256))
//!     .unwrap();
//!
//! let decoded = jws.decode(&JwsVerifier::new(&key)).unwrap();
//! assert_eq!(decoded.payload(), br#"{"iss":"joe"}"#);
//! ```
//!
//! [`rfc7515`]: https://datatracker.ietf.org/doc/html/rfc7515
//! [`rfc7516`]: https://datatracker.ietf.org/doc/html/rfc7516
//! [`rfc7518`]: https://datatracker.ietf.org/doc/html/rfc7518

mod error;
pub use error::{JoseError, JoseErrorKind};

mod jwa;
pub use jwa::{
    AlgorithmDescriptor, ContentEncryptionAlgorithm, DigestAlgorithm, JwsAlgorithm,
    KeyManagementAlgorithm, PrimitiveFamily, Registry,
};

mod profile;
pub use profile::JoseProfile;

mod der;
mod encoding;

mod key;
pub use key::{
    EcKey, JoseKey, MIN_RSA_KEY_BITS, RsaPrivateKey, RsaPublicKey, SecretKeyKind, SymmetricKey,
};

pub mod aead;
pub mod key_mgmt;
pub mod sign;

mod header;
pub use header::{CritPolicy, Headers};

mod jws;
pub use jws::{
    ChainedJwsBuilder, DecodedJws, DecodedSignature, Jws, JwsBuilder, JwsCompact, JwsFlattened,
    JwsSigner, JwsVerifier, Signer, ToVerifySignature, Verifier,
};

mod jwe;
pub use jwe::{Jwe, JweBuilder, JweCompact, JweDecryptor, JweFlattened, Recipient};

mod nested;
pub use nested::NESTED_CONTENT_TYPE;
