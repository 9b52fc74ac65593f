//! 🕯️ wax seals your payloads: the cryptographic core of the JOSE standards for Rust.
//!
//! | format | serializations | algorithms |
//! |-|-|-|
//! | JWS ([`rfc7515`]) | compact ⸱ flattened JSON ⸱ general JSON | `HS256/384/512` ⸱ `RS256/384/512` ⸱ `PS256/384/512` ⸱ `none` |
//! | JWE ([`rfc7516`]) | compact ⸱ flattened JSON ⸱ general JSON | `dir` ⸱ `RSA1_5` ⸱ `RSA-OAEP` ⸱ `RSA-OAEP-256` ⸱ `A128KW/A192KW/A256KW` with `A128/192/256CBC-HS256/384/512` ⸱ `A128/192/256GCM` |
//!
//! Elliptic curve keys can be represented, but no operation is implemented for them yet:
//! using one fails with an `UnsupportedAlgorithm` error.
//!
//! The crypto core is behind the `crypto` feature and found in the [`crypto`] module.
//! Every primitive comes from [`aws-lc-rs`].
//!
//! ```
//! # #[cfg(feature = "crypto")]
//! # {
//! use wax::crypto::jose::{
//!     Jwe, JweBuilder, JweDecryptor, JoseKey, SecretKeyKind, SymmetricKey,
//! };
//!
//! let key: JoseKey = SymmetricKey::generate(SecretKeyKind::Aes, 32).unwrap().into();
//! let compact = JweBuilder::new()
//!     .with_payload("Live long and prosper.")
//!     .add_default_recipient(&key)
//!     .build_compact()
//!     .unwrap();
//!
//! let payload = JweDecryptor::new(&key).decrypt(&Jwe::from(compact)).unwrap();
//! assert_eq!(payload, b"Live long and prosper.");
//! # }
//! ```
//!
//! [`rfc7515`]: https://datatracker.ietf.org/doc/html/rfc7515
//! [`rfc7516`]: https://datatracker.ietf.org/doc/html/rfc7516
//! [`aws-lc-rs`]: https://docs.rs/aws-lc-rs

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

#[doc(inline)]
pub use ::wax_error as error;

#[doc(inline)]
pub use ::wax_utils as utils;

#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
#[doc(inline)]
pub use ::wax_crypto as crypto;
