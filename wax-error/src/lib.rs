//! Error utilities for wax.
//!
//! The [`BoxError`] type is a type-erased error type that can be used to represent any error that
//! implements the `std::error::Error` trait and is used for cases where it is usually not
//! that important what specific error type is returned, but rather that an error occurred.
//!
//! Crates within wax which need a typed error (such as the JOSE error kinds of `wax-crypto`)
//! still box their causes using [`BoxError`] and attach human context through [`ErrorContext`].
//!
//! # Wax
//!
//! Crate used by the end-user `wax` crate and `wax` crate authors alike.

#![doc(html_favicon_url = "https://raw.githubusercontent.com/plabayo/rama/main/docs/img/old_logo.png")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

/// Alias for a type-erased error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

mod ext;
pub use ext::{ErrorContext, ErrorExt, OpaqueError};
