//! utilities crate for wax
//!
//! `wax-utils` contains utilities used by `wax`,
//! not really being part of one of the other crates, or used
//! by plenty of other crates.
//!
//! # Wax
//!
//! Crate used by the end-user `wax` crate and `wax` crate authors alike.

#![doc(html_favicon_url = "https://raw.githubusercontent.com/plabayo/rama/main/docs/img/old_logo.png")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

#[doc(hidden)]
#[macro_use]
pub mod macros;
