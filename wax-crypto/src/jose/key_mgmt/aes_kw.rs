//! AES key wrap with the default initial value, [`rfc3394`],
//! performed one AES block at a time.
//!
//! [`rfc3394`]: https://datatracker.ietf.org/doc/html/rfc3394

use aws_lc_rs::{
    cipher::{
        AES_128, AES_192, AES_256, Algorithm, DecryptingKey, DecryptionContext, EncryptingKey,
        UnboundCipherKey,
    },
    constant_time,
};
use zeroize::Zeroizing;

use crate::jose::JoseError;

const DEFAULT_IV: [u8; SEMIBLOCK] = [0xA6; SEMIBLOCK];
const SEMIBLOCK: usize = 8;
const ROUNDS: usize = 6;

/// Wrap `key` (at least two 64-bit blocks) under `kek`.
pub(super) fn wrap(kek: &[u8], key: &[u8]) -> Result<Vec<u8>, JoseError> {
    if key.len() < 2 * SEMIBLOCK || !key.len().is_multiple_of(SEMIBLOCK) {
        return Err(JoseError::invalid_input(format!(
            "AES key wrap input of {} bytes is not a multiple of 8 bytes of at least 16",
            key.len()
        )));
    }
    let cipher = EncryptingKey::ecb(cipher_key(kek)?)
        .map_err(|err| JoseError::invalid_key_material("AES key wrap key").with_source(err))?;

    let n = key.len() / SEMIBLOCK;
    let mut a = DEFAULT_IV;
    let mut r = Zeroizing::new(key.to_vec());
    let mut block = Zeroizing::new([0u8; 2 * SEMIBLOCK]);

    for j in 0..ROUNDS {
        for (i, r) in r.chunks_exact_mut(SEMIBLOCK).enumerate() {
            block[..SEMIBLOCK].copy_from_slice(&a);
            block[SEMIBLOCK..].copy_from_slice(r);
            cipher
                .encrypt(&mut block[..])
                .map_err(|err| JoseError::invalid_input("AES key wrap").with_source(err))?;
            let t = counter(n, j, i);
            for ((a, b), t) in a.iter_mut().zip(&block[..SEMIBLOCK]).zip(t) {
                *a = b ^ t;
            }
            r.copy_from_slice(&block[SEMIBLOCK..]);
        }
    }

    let mut wrapped = Vec::with_capacity(key.len() + SEMIBLOCK);
    wrapped.extend_from_slice(&a);
    wrapped.extend_from_slice(&r);
    Ok(wrapped)
}

/// Unwrap `wrapped` under `kek`.
///
/// Any structural or integrity problem is an authentication failure.
pub(super) fn unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>, JoseError> {
    if wrapped.len() < 3 * SEMIBLOCK || !wrapped.len().is_multiple_of(SEMIBLOCK) {
        return Err(JoseError::authentication_failure());
    }
    let cipher = DecryptingKey::ecb(cipher_key(kek)?)
        .map_err(|err| JoseError::invalid_key_material("AES key wrap key").with_source(err))?;

    let (iv, key) = wrapped.split_at(SEMIBLOCK);
    let n = key.len() / SEMIBLOCK;
    let mut a = [0u8; SEMIBLOCK];
    a.copy_from_slice(iv);
    let mut r = Zeroizing::new(key.to_vec());
    let mut block = Zeroizing::new([0u8; 2 * SEMIBLOCK]);

    for j in (0..ROUNDS).rev() {
        for (i, r) in r.chunks_exact_mut(SEMIBLOCK).enumerate().rev() {
            let t = counter(n, j, i);
            for ((b, a), t) in block[..SEMIBLOCK].iter_mut().zip(&a).zip(t) {
                *b = a ^ t;
            }
            block[SEMIBLOCK..].copy_from_slice(r);
            cipher
                .decrypt(&mut block[..], DecryptionContext::None)
                .map_err(|err| JoseError::authentication_failure().with_source(err))?;
            a.copy_from_slice(&block[..SEMIBLOCK]);
            r.copy_from_slice(&block[SEMIBLOCK..]);
        }
    }

    constant_time::verify_slices_are_equal(&a, &DEFAULT_IV)
        .map_err(|err| JoseError::authentication_failure().with_source(err))?;
    Ok(r)
}

/// `t = n * j + i`, with `i` counted from one.
fn counter(n: usize, j: usize, i: usize) -> [u8; SEMIBLOCK] {
    ((n * j + i + 1) as u64).to_be_bytes()
}

fn cipher_key(kek: &[u8]) -> Result<UnboundCipherKey, JoseError> {
    let algorithm: &'static Algorithm = match kek.len() {
        16 => &AES_128,
        24 => &AES_192,
        32 => &AES_256,
        len => {
            return Err(JoseError::invalid_key_material(format!(
                "AES key wrap needs a 16, 24 or 32 byte key, got {len}"
            )));
        }
    };
    UnboundCipherKey::new(algorithm, kek)
        .map_err(|err| JoseError::invalid_key_material("AES key wrap key").with_source(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jose::JoseErrorKind;

    fn kek(len: usize) -> Vec<u8> {
        (0..len as u8).collect()
    }

    const KEY_DATA: &str = "00112233445566778899aabbccddeeff";

    #[test]
    fn rfc3394_128_bit_kek() {
        let wrapped = wrap(&kek(16), &hex::decode(KEY_DATA).unwrap()).unwrap();
        assert_eq!(
            hex::encode(&wrapped),
            "1fa68b0a8112b447aef34bd8fb5a7b829d3e862371d2cfe5"
        );
        assert_eq!(hex::encode(unwrap(&kek(16), &wrapped).unwrap().as_slice()), KEY_DATA);
    }

    #[test]
    fn rfc3394_192_bit_kek() {
        let wrapped = wrap(&kek(24), &hex::decode(KEY_DATA).unwrap()).unwrap();
        assert_eq!(
            hex::encode(&wrapped),
            "96778b25ae6ca435f92b5b97c050aed2468ab8a17ad84e5d"
        );
        assert_eq!(hex::encode(unwrap(&kek(24), &wrapped).unwrap().as_slice()), KEY_DATA);
    }

    #[test]
    fn rfc3394_256_bit_kek() {
        let wrapped = wrap(&kek(32), &hex::decode(KEY_DATA).unwrap()).unwrap();
        assert_eq!(
            hex::encode(&wrapped),
            "64e8c3f9ce0f5ba263e9777905818a2a93c8191e7d6e8ae7"
        );
        assert_eq!(hex::encode(unwrap(&kek(32), &wrapped).unwrap().as_slice()), KEY_DATA);
    }

    #[test]
    fn rfc3394_256_bit_key_data() {
        let data = "00112233445566778899aabbccddeeff000102030405060708090a0b0c0d0e0f";
        let wrapped = wrap(&kek(32), &hex::decode(data).unwrap()).unwrap();
        assert_eq!(
            hex::encode(&wrapped),
            "28c9f404c4b810f4cbccb35cfb87f8263f5786e2d80ed326cbc7f0e71a99f43bfb988b9b7a02dd21"
        );
    }

    #[test]
    fn wrong_kek_is_authentication_failure() {
        let wrapped = wrap(&kek(16), &[5u8; 32]).unwrap();
        let err = unwrap(&[1u8; 16], &wrapped).unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::AuthenticationFailure);

        let err = unwrap(&kek(16), &wrapped[..16]).unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::AuthenticationFailure);
    }

    #[test]
    fn rejects_bad_sizes() {
        assert_eq!(
            wrap(&kek(16), &[0u8; 12]).unwrap_err().kind(),
            JoseErrorKind::InvalidInput
        );
        assert_eq!(
            wrap(&kek(20), &[0u8; 16]).unwrap_err().kind(),
            JoseErrorKind::InvalidKeyMaterial
        );
    }
}
