use super::primitives::{self, AES_BLOCK_SIZE, CryptoError};
use rand::CryptoRng;
use std::fmt;

pub trait CryptFilter: fmt::Debug + Send + Sync {
    fn method(&self) -> &[u8];
    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;
    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Leaves data untouched. Used for metadata streams when /EncryptMetadata is false.
#[derive(Clone, Copy, Debug)]
pub struct IdentityCryptFilter;

impl CryptFilter for IdentityCryptFilter {
    fn method(&self) -> &[u8] {
        b"Identity"
    }

    fn encrypt(&self, _key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, _key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(ciphertext.to_vec())
    }
}

/// AES-256-CBC with PKCS#7 padding (the AESV3 crypt filter method).
///
/// The 32-byte file encryption key is used as is; revision 6 does not derive per-object keys.
/// Output is a random 16-byte initialization vector followed by the ciphertext.
#[derive(Clone, Copy, Debug)]
pub struct Aes256CryptFilter;

impl Aes256CryptFilter {
    pub fn encrypt_with_rng<R>(&self, key: &[u8], plaintext: &[u8], rng: &mut R) -> Result<Vec<u8>, CryptoError>
    where
        R: CryptoRng + ?Sized,
    {
        let mut iv = [0u8; AES_BLOCK_SIZE];
        rng.fill_bytes(&mut iv);
        self.encrypt_with_iv(key, &iv, plaintext)
    }

    pub fn encrypt_with_iv(
        &self, key: &[u8], iv: &[u8; AES_BLOCK_SIZE], plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if key.len() != 32 {
            return Err(CryptoError::InvalidKeyLength);
        }

        let encrypted = primitives::aes256_cbc_encrypt_pkcs7(key, iv, plaintext)?;

        let mut ciphertext = Vec::with_capacity(AES_BLOCK_SIZE + encrypted.len());
        ciphertext.extend_from_slice(iv);
        ciphertext.extend_from_slice(&encrypted);
        Ok(ciphertext)
    }
}

impl CryptFilter for Aes256CryptFilter {
    fn method(&self) -> &[u8] {
        b"AESV3"
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.encrypt_with_rng(key, plaintext, &mut rand::rng())
    }

    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if key.len() != 32 {
            return Err(CryptoError::InvalidKeyLength);
        }

        // At least the IV and one block of padding.
        if ciphertext.len() < 2 * AES_BLOCK_SIZE || ciphertext.len() % AES_BLOCK_SIZE != 0 {
            return Err(CryptoError::InvalidDataLength);
        }

        let (iv, data) = ciphertext.split_at(AES_BLOCK_SIZE);
        primitives::aes256_cbc_decrypt_pkcs7(key, iv, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_iv_known_answer() {
        // AES-256 key and first block from NIST SP 800-38A F.2.5, followed by a full padding block.
        let key = b"\x60\x3d\xeb\x10\x15\xca\x71\xbe\x2b\x73\xae\xf0\x85\x7d\x77\x81\
                    \x1f\x35\x2c\x07\x3b\x61\x08\xd7\x2d\x98\x10\xa3\x09\x14\xdf\xf4";
        let iv: [u8; 16] = std::array::from_fn(|i| i as u8);
        let plaintext = b"\x6b\xc1\xbe\xe2\x2e\x40\x9f\x96\xe9\x3d\x7e\x11\x73\x93\x17\x2a";

        let ciphertext = Aes256CryptFilter.encrypt_with_iv(key, &iv, plaintext).unwrap();
        assert_eq!(&ciphertext[..16], &iv);
        assert_eq!(
            &ciphertext[16..],
            b"\xf5\x8c\x4c\x04\xd6\xe5\xf1\xba\x77\x9e\xab\xfb\x5f\x7b\xfb\xd6\
              \x48\x5a\x5c\x81\x51\x9c\xf3\x78\xfa\x36\xd4\x2b\x85\x47\xed\xc0"
        );
        assert_eq!(Aes256CryptFilter.decrypt(key, &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn hello_gains_iv_and_padding() {
        let key = [1u8; 32];
        let ciphertext = Aes256CryptFilter.encrypt(&key, b"Hello").unwrap();

        // 16 bytes of IV plus one block holding 5 bytes of data and 11 bytes of padding.
        assert_eq!(ciphertext.len(), 32);
        assert_eq!(ciphertext.len() - b"Hello".len(), 27);
        assert_eq!(Aes256CryptFilter.decrypt(&key, &ciphertext).unwrap(), b"Hello");
    }

    #[test]
    fn fixed_iv_is_prepended() {
        let key = [2u8; 32];
        let iv = [0xABu8; 16];
        let ciphertext = Aes256CryptFilter.encrypt_with_iv(&key, &iv, b"").unwrap();

        assert_eq!(&ciphertext[..16], &iv);
        assert_eq!(ciphertext.len(), 32);
        assert_eq!(Aes256CryptFilter.decrypt(&key, &ciphertext).unwrap(), b"");
    }

    #[test]
    fn fresh_iv_per_call() {
        let key = [3u8; 32];
        let first = Aes256CryptFilter.encrypt(&key, b"same").unwrap();
        let second = Aes256CryptFilter.encrypt(&key, b"same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn truncated_ciphertext_is_rejected() {
        let key = [4u8; 32];
        assert_eq!(
            Aes256CryptFilter.decrypt(&key, &[0u8; 16]),
            Err(CryptoError::InvalidDataLength)
        );
        assert_eq!(Aes256CryptFilter.encrypt(&key[..16], b"x"), Err(CryptoError::InvalidKeyLength));
    }

    #[test]
    fn identity_is_a_no_op() {
        assert_eq!(IdentityCryptFilter.encrypt(&[], b"meta").unwrap(), b"meta");
        assert_eq!(IdentityCryptFilter.method(), b"Identity");
    }
}
