//! Just enough DER to move RSA public keys between the forms the
//! primitives want: the `RSAPublicKey` sequence of [RFC 3279] section 2.3.1
//! used to verify signatures, and the `SubjectPublicKeyInfo` wrapper of
//! [RFC 5280] section 4.1 used to encrypt.
//!
//! [RFC 3279]: https://datatracker.ietf.org/doc/rfc3279/
//! [RFC 5280]: https://datatracker.ietf.org/doc/rfc5280/

use super::JoseError;

const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_SEQUENCE: u8 = 0x30;
const LENGTH_SHORT_FORM_MAX: usize = 127;
const LONG_FORM_BIT: u8 = 0x80;
const BIT_STRING_NO_UNUSED_BITS: u8 = 0x00;

/// `SEQUENCE { OID 1.2.840.113549.1.1.1 (rsaEncryption), NULL }`
const RSA_ALGORITHM_IDENTIFIER: [u8; 15] = [
    0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01, 0x05, 0x00,
];

/// Encode modulus and public exponent (big endian, unsigned) as a DER `RSAPublicKey`.
pub(super) fn rsa_public_key(n: &[u8], e: &[u8]) -> Result<Vec<u8>, JoseError> {
    let n = encode_integer(n)?;
    let e = encode_integer(e)?;
    let mut content = Vec::with_capacity(n.len() + e.len());
    content.extend_from_slice(&n);
    content.extend_from_slice(&e);
    Ok(encode_element(TAG_SEQUENCE, &content))
}

/// Wrap a DER `RSAPublicKey` into a `SubjectPublicKeyInfo`.
pub(super) fn subject_public_key_info(rsa_public_key: &[u8]) -> Vec<u8> {
    let mut bit_string = Vec::with_capacity(1 + rsa_public_key.len());
    bit_string.push(BIT_STRING_NO_UNUSED_BITS);
    bit_string.extend_from_slice(rsa_public_key);
    let bit_string = encode_element(TAG_BIT_STRING, &bit_string);

    let mut content = Vec::with_capacity(RSA_ALGORITHM_IDENTIFIER.len() + bit_string.len());
    content.extend_from_slice(&RSA_ALGORITHM_IDENTIFIER);
    content.extend_from_slice(&bit_string);
    encode_element(TAG_SEQUENCE, &content)
}

/// Extract the `RSAPublicKey` from an RSA `SubjectPublicKeyInfo`.
pub(super) fn rsa_public_key_from_spki(spki: &[u8]) -> Result<&[u8], JoseError> {
    let (content, rest) = read_element(spki, TAG_SEQUENCE)?;
    if !rest.is_empty() {
        return Err(JoseError::invalid_key_material(
            "trailing data after SubjectPublicKeyInfo",
        ));
    }
    let algorithm = content
        .strip_prefix(&RSA_ALGORITHM_IDENTIFIER[..])
        .ok_or_else(|| JoseError::invalid_key_material("SubjectPublicKeyInfo is not an RSA key"))?;
    let (bit_string, rest) = read_element(algorithm, TAG_BIT_STRING)?;
    if !rest.is_empty() {
        return Err(JoseError::invalid_key_material(
            "trailing data after subjectPublicKey",
        ));
    }
    match bit_string.split_first() {
        Some((&BIT_STRING_NO_UNUSED_BITS, key)) => Ok(key),
        _ => Err(JoseError::invalid_key_material(
            "subjectPublicKey has unused bits",
        )),
    }
}

fn encode_element(tag: u8, content: &[u8]) -> Vec<u8> {
    let len = encode_length(content.len());
    let mut out = Vec::with_capacity(1 + len.len() + content.len());
    out.push(tag);
    out.extend_from_slice(&len);
    out.extend_from_slice(content);
    out
}

/// Length octets as defined in section 8.1.3 of
/// [ITU X.690](https://www.itu.int/ITU-T/studygroups/com17/languages/X.690-0207.pdf).
fn encode_length(len: usize) -> Vec<u8> {
    if len <= LENGTH_SHORT_FORM_MAX {
        return vec![len as u8];
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let mut out = Vec::with_capacity(1 + bytes.len() - skip);
    out.push(LONG_FORM_BIT | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
    out
}

/// Minimal positive INTEGER encoding: leading zero octets are dropped,
/// one is added back when the high bit is set.
fn encode_integer(value: &[u8]) -> Result<Vec<u8>, JoseError> {
    let skip = value.iter().take_while(|b| **b == 0).count();
    let value = &value[skip..];
    let Some(first) = value.first() else {
        return Err(JoseError::invalid_key_material("RSA integer is zero or empty"));
    };
    if first & LONG_FORM_BIT == 0 {
        return Ok(encode_element(TAG_INTEGER, value));
    }
    let mut padded = Vec::with_capacity(value.len() + 1);
    padded.push(0);
    padded.extend_from_slice(value);
    Ok(encode_element(TAG_INTEGER, &padded))
}

fn read_element(input: &[u8], tag: u8) -> Result<(&[u8], &[u8]), JoseError> {
    let truncated = || JoseError::invalid_key_material("truncated DER element");
    match input.split_first() {
        Some((found, _)) if *found == tag => (),
        _ => return Err(JoseError::invalid_key_material("unexpected DER tag")),
    }
    let (&first, rest) = input[1..].split_first().ok_or_else(truncated)?;
    let (len, rest) = if first & LONG_FORM_BIT == 0 {
        (first as usize, rest)
    } else {
        let octets = (first & !LONG_FORM_BIT) as usize;
        if octets == 0 || octets > size_of::<usize>() || rest.len() < octets {
            return Err(truncated());
        }
        let (len_bytes, rest) = rest.split_at(octets);
        let len = len_bytes
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize);
        (len, rest)
    };
    if rest.len() < len {
        return Err(truncated());
    }
    Ok(rest.split_at(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    #[test]
    fn short_and_long_form_lengths() {
        assert_eq!(encode_length(5), vec![5]);
        assert_eq!(encode_length(127), vec![127]);
        assert_eq!(encode_length(128), vec![0x81, 0x80]);
        assert_eq!(encode_length(270), vec![0x82, 0x01, 0x0e]);
    }

    #[test]
    fn integer_gets_sign_padding() {
        assert_eq!(encode_integer(&[0x01, 0x00, 0x01]).unwrap(), vec![0x02, 0x03, 0x01, 0x00, 0x01]);
        assert_eq!(encode_integer(&[0x00, 0x80]).unwrap(), vec![0x02, 0x02, 0x00, 0x80]);
        assert_err!(encode_integer(&[0, 0]));
    }

    #[test]
    fn spki_wraps_and_unwraps() {
        let n = [0xc5u8; 256];
        let pkcs1 = rsa_public_key(&n, &[0x01, 0x00, 0x01]).unwrap();
        let spki = subject_public_key_info(&pkcs1);
        assert_eq!(&spki[..4], &[0x30, 0x82, 0x01, 0x22]);
        assert_eq!(rsa_public_key_from_spki(&spki).unwrap(), &pkcs1[..]);
    }

    #[test]
    fn rejects_garbage_spki() {
        assert_err!(rsa_public_key_from_spki(&[0x30, 0x05, 0x00]));
        assert_err!(rsa_public_key_from_spki(&[0x02, 0x01, 0x00]));
        assert_err!(rsa_public_key_from_spki(&[]));
    }
}
