use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut as _, BlockEncryptMut as _, KeyInit as _, KeyIvInit as _};
use sha2::{Digest as _, Sha256, Sha384, Sha512};
use thiserror::Error;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes256EcbEnc = ecb::Encryptor<aes::Aes256>;
type Aes256EcbDec = ecb::Decryptor<aes::Aes256>;

pub const AES_BLOCK_SIZE: usize = 16;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key or initialization vector length")]
    InvalidKeyLength,
    #[error("data length is not a multiple of the AES block size")]
    InvalidDataLength,
    #[error("invalid PKCS#7 padding")]
    Padding,
}

/// SHA-256 over the concatenation of `parts`.
pub fn sha256(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

pub fn sha384(data: &[u8]) -> Vec<u8> {
    Sha384::digest(data).to_vec()
}

pub fn sha512(data: &[u8]) -> Vec<u8> {
    Sha512::digest(data).to_vec()
}

fn check_blocks(data: &[u8]) -> Result<(), CryptoError> {
    if data.len() % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidDataLength);
    }
    Ok(())
}

/// AES-128-CBC without padding, in place.
pub fn aes128_cbc_encrypt_no_pad(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), CryptoError> {
    check_blocks(data)?;
    let mut encryptor = Aes128CbcEnc::new_from_slices(key, iv).map_err(|_| CryptoError::InvalidKeyLength)?;
    for block in data.chunks_exact_mut(AES_BLOCK_SIZE) {
        encryptor.encrypt_block_mut(block.into());
    }
    Ok(())
}

/// AES-256-CBC without padding, in place.
pub fn aes256_cbc_encrypt_no_pad(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), CryptoError> {
    check_blocks(data)?;
    let mut encryptor = Aes256CbcEnc::new_from_slices(key, iv).map_err(|_| CryptoError::InvalidKeyLength)?;
    for block in data.chunks_exact_mut(AES_BLOCK_SIZE) {
        encryptor.encrypt_block_mut(block.into());
    }
    Ok(())
}

pub fn aes256_cbc_decrypt_no_pad(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), CryptoError> {
    check_blocks(data)?;
    let mut decryptor = Aes256CbcDec::new_from_slices(key, iv).map_err(|_| CryptoError::InvalidKeyLength)?;
    for block in data.chunks_exact_mut(AES_BLOCK_SIZE) {
        decryptor.decrypt_block_mut(block.into());
    }
    Ok(())
}

pub fn aes256_ecb_encrypt_block(key: &[u8], block: &mut [u8; AES_BLOCK_SIZE]) -> Result<(), CryptoError> {
    let mut encryptor = Aes256EcbEnc::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;
    encryptor.encrypt_block_mut(block.as_mut_slice().into());
    Ok(())
}

pub fn aes256_ecb_decrypt_block(key: &[u8], block: &mut [u8; AES_BLOCK_SIZE]) -> Result<(), CryptoError> {
    let mut decryptor = Aes256EcbDec::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;
    decryptor.decrypt_block_mut(block.as_mut_slice().into());
    Ok(())
}

/// AES-256-CBC with PKCS#7 padding. The IV is not part of the output.
///
/// A full padding block is appended when the plaintext is already block aligned, so the
/// ciphertext is always 1 to 16 bytes longer than the plaintext.
pub fn aes256_cbc_encrypt_pkcs7(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let encryptor = Aes256CbcEnc::new_from_slices(key, iv).map_err(|_| CryptoError::InvalidKeyLength)?;

    let padded_len = (plaintext.len() / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE;
    let mut buffer = vec![0u8; padded_len];
    buffer[..plaintext.len()].copy_from_slice(plaintext);

    let ciphertext_len = encryptor
        .encrypt_padded_mut::<Pkcs7>(&mut buffer, plaintext.len())
        .map_err(|_| CryptoError::Padding)?
        .len();
    buffer.truncate(ciphertext_len);

    Ok(buffer)
}

pub fn aes256_cbc_decrypt_pkcs7(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() {
        return Err(CryptoError::InvalidDataLength);
    }
    check_blocks(ciphertext)?;
    let decryptor = Aes256CbcDec::new_from_slices(key, iv).map_err(|_| CryptoError::InvalidKeyLength)?;

    let mut buffer = ciphertext.to_vec();
    let plaintext_len = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| CryptoError::Padding)?
        .len();
    buffer.truncate(plaintext_len);

    Ok(buffer)
}
