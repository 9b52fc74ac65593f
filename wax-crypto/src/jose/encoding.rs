//! Unpadded base64url as required by [`rfc7515, section 2`].
//!
//! [`rfc7515, section 2`]: https://datatracker.ietf.org/doc/html/rfc7515#section-2

use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use serde::Serialize;

use super::JoseError;

pub(super) fn encode(bytes: impl AsRef<[u8]>) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode one base64url segment, `what` names the segment in the error.
pub(super) fn decode(segment: &str, what: &'static str) -> Result<Vec<u8>, JoseError> {
    BASE64_URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|err| JoseError::malformed_encoding(what).with_source(err))
}

/// Serialize to JSON and base64url encode the result.
pub(super) fn encode_json(value: &impl Serialize, what: &'static str) -> Result<String, JoseError> {
    let json =
        serde_json::to_vec(value).map_err(|err| JoseError::malformed_encoding(what).with_source(err))?;
    Ok(encode(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};
    use crate::jose::JoseErrorKind;

    #[test]
    fn rejects_padding_and_standard_alphabet() {
        assert_eq!(decode("AQID", "x").unwrap(), vec![1, 2, 3]);
        for input in ["AQI=", "+/8", "A", "AQ.D"] {
            let err = decode(input, "segment").unwrap_err();
            assert_eq!(err.kind(), JoseErrorKind::MalformedEncoding);
        }
    }

    #[test]
    fn rejects_non_canonical_trailing_bits() {
        assert_ok!(decode("AQ", "x"));
        assert_err!(decode("AR", "x"));
    }
}
