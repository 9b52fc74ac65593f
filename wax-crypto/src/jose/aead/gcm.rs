use aws_lc_rs::aead::{
    AES_128_GCM, AES_192_GCM, AES_256_GCM, Aad, Algorithm, LessSafeKey, Nonce, UnboundKey,
};

use crate::jose::{AlgorithmDescriptor, JoseError};

pub(super) fn encrypt(
    descriptor: &AlgorithmDescriptor,
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    payload: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), JoseError> {
    let key = UnboundKey::new(gcm_algorithm(descriptor)?, key)
        .map(LessSafeKey::new)
        .map_err(|err| JoseError::invalid_key_material("AES-GCM key").with_source(err))?;
    let nonce = Nonce::try_assume_unique_for_key(iv)
        .map_err(|err| JoseError::invalid_input("AES-GCM iv").with_source(err))?;

    let mut ciphertext = payload.to_vec();
    let tag = key
        .seal_in_place_separate_tag(nonce, Aad::from(aad), &mut ciphertext)
        .map_err(|err| JoseError::invalid_input("AES-GCM encryption").with_source(err))?;
    Ok((ciphertext, tag.as_ref().to_vec()))
}

pub(super) fn decrypt(
    descriptor: &AlgorithmDescriptor,
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, JoseError> {
    let key = UnboundKey::new(gcm_algorithm(descriptor)?, key)
        .map(LessSafeKey::new)
        .map_err(|err| JoseError::invalid_key_material("AES-GCM key").with_source(err))?;
    let nonce = Nonce::try_assume_unique_for_key(iv)
        .map_err(|err| JoseError::invalid_input("AES-GCM iv").with_source(err))?;

    let mut in_out = Vec::with_capacity(ciphertext.len() + tag.len());
    in_out.extend_from_slice(ciphertext);
    in_out.extend_from_slice(tag);

    let len = key
        .open_in_place(nonce, Aad::from(aad), &mut in_out)
        .map_err(|err| JoseError::authentication_failure().with_source(err))?
        .len();
    in_out.truncate(len);
    Ok(in_out)
}

fn gcm_algorithm(descriptor: &AlgorithmDescriptor) -> Result<&'static Algorithm, JoseError> {
    match descriptor.key_len() {
        16 => Ok(&AES_128_GCM),
        24 => Ok(&AES_192_GCM),
        32 => Ok(&AES_256_GCM),
        len => Err(JoseError::unsupported_algorithm(format!(
            "no AES-GCM variant with a {len} byte key"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jose::{ContentEncryptionAlgorithm, Registry};

    #[test]
    fn gcm_test_case_3() {
        // McGrew & Viega, "The Galois/Counter Mode of Operation", test case 3
        let descriptor = Registry::new().content_encryption(&ContentEncryptionAlgorithm::A128Gcm);
        let key = hex::decode("feffe9928665731c6d6a8f9467308308").unwrap();
        let iv = hex::decode("cafebabefacedbaddecaf888").unwrap();
        let plaintext = hex::decode(concat!(
            "d9313225f88406e5a55909c5aff5269a86a7a9531534f7da2e4c303d8a318a72",
            "1c3c0c95956809532fcf0e2449a6b525b16aedf5aa0de657ba637b391aafd255",
        ))
        .unwrap();

        let (ciphertext, tag) = encrypt(&descriptor, &key, &iv, b"", &plaintext).unwrap();
        assert_eq!(
            hex::encode(&ciphertext),
            concat!(
                "42831ec2217774244b7221b784d0d49ce3aa212f2c02a4e035c17e2329aca12e",
                "21d514b25466931c7d8f6a5aac84aa051ba30b396a0aac973d58e091473f5985",
            )
        );
        assert_eq!(hex::encode(&tag), "4d5c2af327cd64a62cf35abd2ba6fab4");

        let decrypted = decrypt(&descriptor, &key, &iv, b"", &ciphertext, &tag).unwrap();
        assert_eq!(decrypted, plaintext);
    }
}
