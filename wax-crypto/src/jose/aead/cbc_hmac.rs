use aws_lc_rs::{
    cipher::{
        AES_128, AES_192, AES_256, Algorithm, DecryptionContext, EncryptionContext,
        PaddedBlockDecryptingKey, PaddedBlockEncryptingKey, UnboundCipherKey,
    },
    constant_time, hmac,
    iv::FixedLength,
};

use crate::jose::{AlgorithmDescriptor, DigestAlgorithm, JoseError};

const AES_BLOCK_LEN: usize = 16;

pub(super) fn encrypt(
    descriptor: &AlgorithmDescriptor,
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    payload: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), JoseError> {
    let (mac_key, enc_key) = key.split_at(descriptor.mac_key_len());
    let iv = block_iv(iv)?;

    let cipher_key = UnboundCipherKey::new(aes_algorithm(descriptor)?, enc_key)
        .map_err(|err| JoseError::invalid_key_material("AES key").with_source(err))?;
    let encrypting = PaddedBlockEncryptingKey::cbc_pkcs7(cipher_key)
        .map_err(|err| JoseError::invalid_key_material("AES-CBC key").with_source(err))?;

    let mut ciphertext = payload.to_vec();
    encrypting
        .less_safe_encrypt(
            &mut ciphertext,
            EncryptionContext::Iv128(FixedLength::from(iv)),
        )
        .map_err(|err| JoseError::invalid_input("AES-CBC encryption").with_source(err))?;

    let tag = compute_tag(descriptor, mac_key, aad, &iv, &ciphertext)?;
    Ok((ciphertext, tag))
}

pub(super) fn decrypt(
    descriptor: &AlgorithmDescriptor,
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, JoseError> {
    let (mac_key, enc_key) = key.split_at(descriptor.mac_key_len());
    let iv = block_iv(iv)?;

    let expected = compute_tag(descriptor, mac_key, aad, &iv, ciphertext)?;
    constant_time::verify_slices_are_equal(&expected, tag)
        .map_err(|err| JoseError::authentication_failure().with_source(err))?;

    // tag is good, padding and cipher errors still must not be told apart
    let cipher_key = UnboundCipherKey::new(aes_algorithm(descriptor)?, enc_key)
        .map_err(|err| JoseError::authentication_failure().with_source(err))?;
    let decrypting = PaddedBlockDecryptingKey::cbc_pkcs7(cipher_key)
        .map_err(|err| JoseError::authentication_failure().with_source(err))?;

    let mut plaintext = ciphertext.to_vec();
    let len = decrypting
        .decrypt(
            &mut plaintext,
            DecryptionContext::Iv128(FixedLength::from(iv)),
        )
        .map_err(|err| JoseError::authentication_failure().with_source(err))?
        .len();
    plaintext.truncate(len);
    Ok(plaintext)
}

/// `HMAC(mac_key, AAD || IV || CIPHERTEXT || AL)` truncated to the tag length,
/// with `AL` the bit length of the AAD as a big endian `u64`.
fn compute_tag(
    descriptor: &AlgorithmDescriptor,
    mac_key: &[u8],
    aad: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, JoseError> {
    let al = (aad.len() as u64).wrapping_mul(8).to_be_bytes();

    let key = hmac::Key::new(hmac_algorithm(descriptor)?, mac_key);
    let mut ctx = hmac::Context::with_key(&key);
    ctx.update(aad);
    ctx.update(iv);
    ctx.update(ciphertext);
    ctx.update(&al);
    let mac = ctx.sign();

    mac.as_ref()
        .get(..descriptor.tag_len())
        .map(<[u8]>::to_vec)
        .ok_or_else(|| JoseError::unsupported_algorithm("tag longer than the MAC output"))
}

fn block_iv(iv: &[u8]) -> Result<[u8; AES_BLOCK_LEN], JoseError> {
    iv.try_into()
        .map_err(|err| JoseError::invalid_input("AES-CBC requires a 16 byte iv").with_source(err))
}

fn aes_algorithm(descriptor: &AlgorithmDescriptor) -> Result<&'static Algorithm, JoseError> {
    match descriptor.enc_key_len() {
        16 => Ok(&AES_128),
        24 => Ok(&AES_192),
        32 => Ok(&AES_256),
        len => Err(JoseError::unsupported_algorithm(format!(
            "no AES variant with a {len} byte key"
        ))),
    }
}

fn hmac_algorithm(descriptor: &AlgorithmDescriptor) -> Result<hmac::Algorithm, JoseError> {
    match descriptor.digest() {
        Some(DigestAlgorithm::Sha256) => Ok(hmac::HMAC_SHA256),
        Some(DigestAlgorithm::Sha384) => Ok(hmac::HMAC_SHA384),
        Some(DigestAlgorithm::Sha512) => Ok(hmac::HMAC_SHA512),
        Some(DigestAlgorithm::Sha1) | None => Err(JoseError::unsupported_algorithm(format!(
            "{} has no HMAC-SHA2 digest",
            descriptor.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use aws_lc_rs::cipher::EncryptingKey;

    use super::*;
    use crate::jose::{ContentEncryptionAlgorithm, JoseErrorKind, Registry};

    #[test]
    fn mac_covers_aad_length() {
        let descriptor = Registry::new().content_encryption(&ContentEncryptionAlgorithm::A128CbcHs256);
        let key = [7u8; 16];
        let iv = [1u8; 16];
        // moving a byte from the aad into the ciphertext keeps the mac input
        // identical except for AL
        let a = compute_tag(&descriptor, &key, b"ab", &iv, b"c").unwrap();
        let b = compute_tag(&descriptor, &key, b"a", &iv, b"bc").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn bad_padding_reads_as_tag_failure() {
        let descriptor = Registry::new().content_encryption(&ContentEncryptionAlgorithm::A128CbcHs256);
        let key = [9u8; 32];
        let (mac_key, enc_key) = key.split_at(16);
        let iv = [0u8; 16];

        // with a zero iv one CBC block is a single AES block encryption,
        // the final plaintext byte 0x00 is never valid PKCS#7 padding
        let mut plaintext = [0x11u8; 16];
        plaintext[15] = 0;
        let mut ciphertext = plaintext;
        EncryptingKey::ecb(UnboundCipherKey::new(&AES_128, enc_key).unwrap())
            .unwrap()
            .encrypt(&mut ciphertext)
            .unwrap();

        // the tag is valid, so only the padding check can fail
        let tag = compute_tag(&descriptor, mac_key, b"", &iv, &ciphertext).unwrap();
        let padding_err = decrypt(&descriptor, &key, &iv, b"", &ciphertext, &tag).unwrap_err();

        let mut bad_tag = tag;
        bad_tag[0] ^= 1;
        let tag_err = decrypt(&descriptor, &key, &iv, b"", &ciphertext, &bad_tag).unwrap_err();

        assert_eq!(padding_err.kind(), JoseErrorKind::AuthenticationFailure);
        assert_eq!(padding_err.kind(), tag_err.kind());
        assert_eq!(padding_err.to_string(), "authentication failed");
        assert_eq!(padding_err.to_string(), tag_err.to_string());
    }

    #[test]
    fn partial_block_ciphertext_is_rejected() {
        let descriptor = Registry::new().content_encryption(&ContentEncryptionAlgorithm::A256CbcHs512);
        let key = [3u8; 64];
        let iv = [0u8; 16];
        let ciphertext = [1u8; 15];
        let tag = compute_tag(&descriptor, &key[..32], b"", &iv, &ciphertext).unwrap();
        let err = decrypt(&descriptor, &key, &iv, b"", &ciphertext, &tag).unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::AuthenticationFailure);
    }
}
