use aws_lc_rs::rsa::{
    OAEP_SHA1_MGF1SHA1, OAEP_SHA256_MGF1SHA256, OaepAlgorithm, OaepPrivateDecryptingKey,
    OaepPublicEncryptingKey, Pkcs1PrivateDecryptingKey, Pkcs1PublicEncryptingKey,
};
use zeroize::Zeroizing;

use crate::jose::{
    AlgorithmDescriptor, DigestAlgorithm, JoseError, PrimitiveFamily, RsaPrivateKey, RsaPublicKey,
    key::random_bytes,
};

pub(super) fn encrypt(
    descriptor: &AlgorithmDescriptor,
    public: &RsaPublicKey,
    cek: &[u8],
) -> Result<Vec<u8>, JoseError> {
    check_key_size(descriptor, public.key_size_bits())?;
    let key = public.encrypting_key()?;

    let mut encrypted_key;
    let len = if descriptor.family() == PrimitiveFamily::RsaOaep {
        let algorithm = oaep_algorithm(descriptor)?;
        let key = OaepPublicEncryptingKey::new(key)
            .map_err(|err| JoseError::invalid_key_material("RSA-OAEP key").with_source(err))?;
        encrypted_key = vec![0u8; key.ciphertext_size()];
        key.encrypt(algorithm, cek, &mut encrypted_key, None)
            .map_err(|err| JoseError::invalid_input("RSA-OAEP encryption").with_source(err))?
            .len()
    } else {
        let key = Pkcs1PublicEncryptingKey::new(key)
            .map_err(|err| JoseError::invalid_key_material("RSA1_5 key").with_source(err))?;
        encrypted_key = vec![0u8; key.ciphertext_size()];
        key.encrypt(cek, &mut encrypted_key)
            .map_err(|err| JoseError::invalid_input("RSA1_5 encryption").with_source(err))?
            .len()
    };
    encrypted_key.truncate(len);
    Ok(encrypted_key)
}

pub(super) fn decrypt(
    descriptor: &AlgorithmDescriptor,
    content: &AlgorithmDescriptor,
    private: &RsaPrivateKey,
    encrypted_key: &[u8],
) -> Result<Zeroizing<Vec<u8>>, JoseError> {
    check_key_size(descriptor, private.key_size_bits())?;
    let key = private.decrypting_key()?;

    if descriptor.family() == PrimitiveFamily::RsaOaep {
        let algorithm = oaep_algorithm(descriptor)?;
        let key = OaepPrivateDecryptingKey::new(key)
            .map_err(|err| JoseError::invalid_key_material("RSA-OAEP key").with_source(err))?;
        let mut cek = Zeroizing::new(vec![0u8; key.min_output_size()]);
        let len = key
            .decrypt(algorithm, encrypted_key, &mut cek, None)
            .map_err(|err| JoseError::authentication_failure().with_source(err))?
            .len();
        cek.truncate(len);
        // a CEK of the wrong size must fail like a wrong key
        if cek.len() != content.key_len() {
            return Err(JoseError::authentication_failure());
        }
        return Ok(cek);
    }

    let key = Pkcs1PrivateDecryptingKey::new(key)
        .map_err(|err| JoseError::invalid_key_material("RSA1_5 key").with_source(err))?;
    // RFC 7516 section 11.5: on any failure continue with a random CEK,
    // content decryption then fails the same way a wrong key would.
    let substitute = random_bytes(content.key_len())?;
    let mut cek = Zeroizing::new(vec![0u8; key.min_output_size()]);
    let len = match key.decrypt(encrypted_key, &mut cek) {
        Ok(plaintext) => plaintext.len(),
        Err(_) => 0,
    };
    cek.truncate(len);
    if cek.len() != content.key_len() {
        tracing::trace!("RSA1_5 unwrap rejected, continuing with a random CEK");
        return Ok(substitute);
    }
    Ok(cek)
}

fn check_key_size(descriptor: &AlgorithmDescriptor, bits: usize) -> Result<(), JoseError> {
    if bits < descriptor.key_bits() {
        return Err(JoseError::invalid_key_material(format!(
            "{} requires an RSA key of at least {} bits",
            descriptor.name(),
            descriptor.key_bits()
        )));
    }
    Ok(())
}

fn oaep_algorithm(descriptor: &AlgorithmDescriptor) -> Result<&'static OaepAlgorithm, JoseError> {
    match descriptor.digest() {
        Some(DigestAlgorithm::Sha1) => Ok(&OAEP_SHA1_MGF1SHA1),
        Some(DigestAlgorithm::Sha256) => Ok(&OAEP_SHA256_MGF1SHA256),
        _ => Err(JoseError::unsupported_algorithm(format!(
            "no OAEP parameters for {}",
            descriptor.name()
        ))),
    }
}
