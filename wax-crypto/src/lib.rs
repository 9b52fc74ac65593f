//! Crypto core used by wax.
//!
//! This includes:
//! - JSON Web Signature (JWS) in compact, flattened and general form
//! - JSON Web Encryption (JWE) in compact, flattened and general form
//! - the JOSE algorithm registry and the keys these operate on
//!
//! All cryptographic primitives come from [`aws-lc-rs`].
//!
//! [`aws-lc-rs`]: https://docs.rs/aws-lc-rs

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

pub mod jose;

pub mod dep {
    //! Dependencies for wax crypto modules.
    //!
    //! Exported for your convenience

    pub mod aws_lc_rs {
        //! Re-export of the [`aws-lc-rs`] crate.
        //!
        //! [`aws-lc-rs`]: https://docs.rs/aws-lc-rs

        #[doc(inline)]
        pub use aws_lc_rs::*;
    }

    pub mod serde_json {
        //! Re-export of the [`serde_json`] crate.
        //!
        //! [`serde_json`]: https://docs.rs/serde_json

        #[doc(inline)]
        pub use serde_json::*;
    }
}
