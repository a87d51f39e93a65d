use super::primitives::{self, CryptoError};

/// Passwords are truncated to this many bytes of their UTF-8 form.
pub const MAX_PASSWORD_LEN: usize = 127;

/// Normalize a password with SASLprep and truncate it to 127 bytes.
///
/// The UTF-8 password string is generated from Unicode input by processing it with the SASLprep
/// (RFC 4013) profile of stringprep (RFC 3454), then converting to UTF-8.
pub fn sanitize_password(password: &str) -> crate::Result<Vec<u8>> {
    let prepared = stringprep::saslprep(password)?;
    Ok(truncate_password(prepared.as_bytes()).to_vec())
}

#[inline]
pub fn truncate_password(password: &[u8]) -> &[u8] {
    &password[..password.len().min(MAX_PASSWORD_LEN)]
}

/// Compute a hash (revision 6).
///
/// This implements Algorithm 2.B as described in ISO 32000-2:2020 (PDF 2.0). `extra` is the
/// 48-byte U string when checking the owner password or creating the owner key.
pub fn derive_hash(password: &[u8], salt: &[u8], extra: Option<&[u8]>) -> Result<[u8; 32], CryptoError> {
    let password = truncate_password(password);
    let extra = extra.unwrap_or_default();

    // Take the SHA-256 hash of the original input to the algorithm and name the resulting 32
    // bytes, K.
    let mut k = primitives::sha256(&[password, salt, extra]);

    let mut k1 = Vec::with_capacity(64 * (password.len() + 64 + extra.len()));

    // Perform the following steps at least 64 times, until the value of the last byte in E is
    // less than or equal to (round number) - 32.
    for round in 1u32.. {
        // K1 is 64 repetitions of K0 = password || K || extra.
        k1.clear();
        for _ in 0..64 {
            k1.extend_from_slice(password);
            k1.extend_from_slice(&k);
            k1.extend_from_slice(extra);
        }

        // E = AES-128-CBC(K1) with the first 16 bytes of K as the key and the second 16 bytes
        // as the IV. K1 is always a multiple of 64 bytes long so no padding is needed.
        primitives::aes128_cbc_encrypt_no_pad(&k[..16], &k[16..32], &mut k1)?;
        let e = &k1;

        // The first 16 bytes of E as a big-endian integer mod 3 select the next hash. Since
        // 256 mod 3 == 1, that equals the byte sum mod 3.
        k = match e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3 {
            0 => primitives::sha256(&[e.as_slice()]),
            1 => primitives::sha384(e),
            _ => primitives::sha512(e),
        };

        let last = e.last().copied().map(u32::from).unwrap_or(0);
        if round >= 64 && last <= round - 32 {
            break;
        }
    }

    // The first 32 bytes of the final K are the output of the algorithm.
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&k[..32]);
    Ok(hash)
}

/// Encrypt the file encryption key with an intermediate key (AES-256-CBC, zero IV, no padding).
/// The result is stored as /UE or /OE.
pub fn wrap_file_key(intermediate: &[u8; 32], file_key: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
    let mut wrapped = *file_key;
    primitives::aes256_cbc_encrypt_no_pad(intermediate, &[0u8; 16], &mut wrapped)?;
    Ok(wrapped)
}

/// Recover the file encryption key from /UE or /OE.
pub fn derive_file_key(intermediate: &[u8; 32], wrapped: &[u8]) -> Result<[u8; 32], CryptoError> {
    if wrapped.len() != 32 {
        return Err(CryptoError::InvalidDataLength);
    }
    let mut file_key = [0u8; 32];
    file_key.copy_from_slice(wrapped);
    primitives::aes256_cbc_decrypt_no_pad(intermediate, &[0u8; 16], &mut file_key)?;
    Ok(file_key)
}
