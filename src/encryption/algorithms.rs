use super::EncryptionError;
use super::key_derivation::{derive_file_key, derive_hash, truncate_password, wrap_file_key};
use super::permissions::{decode_perms, encode_perms};
use crate::{Dictionary, Object, Result};
use rand::CryptoRng;

/// The password-based security handler values of an /Encrypt dictionary (revision 6).
#[derive(Clone, Debug, Default)]
pub struct PasswordAlgorithm {
    pub(crate) encrypt_metadata: bool,
    pub(crate) version: i64,
    pub(crate) revision: i64,
    pub(crate) owner_value: Vec<u8>,
    pub(crate) owner_encrypted: Vec<u8>,
    pub(crate) user_value: Vec<u8>,
    pub(crate) user_encrypted: Vec<u8>,
    pub(crate) permissions: i32,
    pub(crate) permission_encrypted: Vec<u8>,
}

/// Which password authenticated against an /Encrypt dictionary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordRole {
    Owner,
    User,
}

fn string_entry(dict: &Dictionary, key: &[u8], missing: EncryptionError, len: usize) -> Result<Vec<u8>> {
    let value = dict
        .get(key)
        .map_err(|_| missing)?
        .as_str()
        .map_err(|_| EncryptionError::InvalidType)?;

    // Some writers pad O and U to 127 bytes; only the leading bytes are meaningful.
    value
        .get(..len)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| EncryptionError::InvalidHashLength.into())
}

impl TryFrom<&Dictionary> for PasswordAlgorithm {
    type Error = crate::Error;

    fn try_from(encrypted: &Dictionary) -> Result<Self> {
        let filter = encrypted
            .get(b"Filter")
            .and_then(Object::as_name)
            .map_err(|_| EncryptionError::InvalidType)?;
        if filter != b"Standard" {
            return Err(EncryptionError::UnsupportedSecurityHandler(String::from_utf8_lossy(filter).into_owned()).into());
        }

        let version = encrypted
            .get(b"V")
            .and_then(Object::as_i64)
            .map_err(|_| EncryptionError::InvalidType)?;
        let revision = encrypted
            .get(b"R")
            .and_then(Object::as_i64)
            .map_err(|_| EncryptionError::MissingRevision)?;
        if version != 5 || revision != 6 {
            return Err(EncryptionError::UnsupportedRevision.into());
        }

        let encrypt_metadata = encrypted
            .get(b"EncryptMetadata")
            .unwrap_or(&Object::Boolean(true))
            .as_bool()
            .map_err(|_| EncryptionError::InvalidType)?;

        let permissions = encrypted
            .get(b"P")
            .map_err(|_| EncryptionError::MissingPermissions)?
            .as_i64()
            .map_err(|_| EncryptionError::InvalidType)?;

        Ok(Self {
            encrypt_metadata,
            version,
            revision,
            owner_value: string_entry(encrypted, b"O", EncryptionError::MissingOwnerPassword, 48)?,
            owner_encrypted: string_entry(encrypted, b"OE", EncryptionError::MissingOwnerPassword, 32)?,
            user_value: string_entry(encrypted, b"U", EncryptionError::MissingUserPassword, 48)?,
            user_encrypted: string_entry(encrypted, b"UE", EncryptionError::MissingUserPassword, 32)?,
            // /P is a 32-bit value even when a writer stored it unsigned.
            permissions: permissions as i32,
            permission_encrypted: string_entry(encrypted, b"Perms", EncryptionError::MissingPermissions, 16)?,
        })
    }
}

impl PasswordAlgorithm {
    pub(crate) fn new(permissions: i32, encrypt_metadata: bool) -> Self {
        Self {
            encrypt_metadata,
            version: 5,
            revision: 6,
            permissions,
            ..Default::default()
        }
    }

    fn check_lengths(&self) -> Result<()> {
        if self.user_value.len() != 48 || self.owner_value.len() != 48 {
            return Err(EncryptionError::InvalidHashLength.into());
        }
        Ok(())
    }

    /// Compute the encryption dictionary's U and UE values (revision 6).
    ///
    /// This implements Algorithm 8 as described in ISO 32000-2:2020 (PDF 2.0).
    pub(crate) fn compute_hashed_user_password_r6<R>(
        &self, file_encryption_key: &[u8; 32], user_password: &[u8], rng: &mut R,
    ) -> Result<(Vec<u8>, Vec<u8>)>
    where
        R: CryptoRng + ?Sized,
    {
        // U = hash(password, validation salt) || validation salt || key salt.
        let mut user_value = [0u8; 48];
        rng.fill_bytes(&mut user_value[32..]);

        let hashed_user_password = derive_hash(user_password, &user_value[32..40], None)?;
        user_value[..32].copy_from_slice(&hashed_user_password);

        // UE is the file encryption key wrapped with the hash of password and key salt.
        let intermediate = derive_hash(user_password, &user_value[40..48], None)?;
        let user_encrypted = wrap_file_key(&intermediate, file_encryption_key)?;

        Ok((user_value.to_vec(), user_encrypted.to_vec()))
    }

    /// Compute the encryption dictionary's O and OE values (revision 6).
    ///
    /// This implements Algorithm 9 as described in ISO 32000-2:2020 (PDF 2.0). Requires the U
    /// value from Algorithm 8 to be set.
    pub(crate) fn compute_hashed_owner_password_r6<R>(
        &self, file_encryption_key: &[u8; 32], owner_password: &[u8], rng: &mut R,
    ) -> Result<(Vec<u8>, Vec<u8>)>
    where
        R: CryptoRng + ?Sized,
    {
        if self.user_value.len() != 48 {
            return Err(EncryptionError::InvalidHashLength.into());
        }

        let mut owner_value = [0u8; 48];
        rng.fill_bytes(&mut owner_value[32..]);

        let hashed_owner_password = derive_hash(owner_password, &owner_value[32..40], Some(self.user_value.as_slice()))?;
        owner_value[..32].copy_from_slice(&hashed_owner_password);

        let intermediate = derive_hash(owner_password, &owner_value[40..48], Some(self.user_value.as_slice()))?;
        let owner_encrypted = wrap_file_key(&intermediate, file_encryption_key)?;

        Ok((owner_value.to_vec(), owner_encrypted.to_vec()))
    }

    /// Compute the encryption dictionary's Perms value (revision 6).
    pub(crate) fn compute_permissions<R>(&self, file_encryption_key: &[u8; 32], rng: &mut R) -> Result<Vec<u8>>
    where
        R: CryptoRng + ?Sized,
    {
        Ok(encode_perms(self.permissions, self.encrypt_metadata, file_encryption_key, rng)?.to_vec())
    }

    /// Authenticate the user password.
    ///
    /// This implements Algorithm 11 as described in ISO 32000-2:2020 (PDF 2.0).
    pub fn authenticate_user_password(&self, user_password: &[u8]) -> Result<()> {
        self.check_lengths()?;
        let user_password = truncate_password(user_password);
        let hashed_user_password = &self.user_value[..32];
        let user_validation_salt = &self.user_value[32..40];

        if derive_hash(user_password, user_validation_salt, None)? != hashed_user_password {
            return Err(EncryptionError::IncorrectPassword.into());
        }
        Ok(())
    }

    /// Authenticate the owner password.
    ///
    /// This implements Algorithm 12 as described in ISO 32000-2:2020 (PDF 2.0).
    pub fn authenticate_owner_password(&self, owner_password: &[u8]) -> Result<()> {
        self.check_lengths()?;
        let owner_password = truncate_password(owner_password);
        let hashed_owner_password = &self.owner_value[..32];
        let owner_validation_salt = &self.owner_value[32..40];

        if derive_hash(owner_password, owner_validation_salt, Some(self.user_value.as_slice()))? != hashed_owner_password {
            return Err(EncryptionError::IncorrectPassword.into());
        }
        Ok(())
    }

    /// Compute the file encryption key from either password.
    ///
    /// This implements Algorithm 2.A as described in ISO 32000-2:2020 (PDF 2.0). The owner
    /// password is tried first.
    pub fn compute_file_encryption_key(&self, password: &[u8]) -> Result<([u8; 32], PasswordRole)> {
        let password = truncate_password(password);

        let (role, intermediate, wrapped) = if self.authenticate_owner_password(password).is_ok() {
            let owner_key_salt = &self.owner_value[40..48];
            let intermediate = derive_hash(password, owner_key_salt, Some(self.user_value.as_slice()))?;
            (PasswordRole::Owner, intermediate, &self.owner_encrypted)
        } else if self.authenticate_user_password(password).is_ok() {
            let user_key_salt = &self.user_value[40..48];
            let intermediate = derive_hash(password, user_key_salt, None)?;
            (PasswordRole::User, intermediate, &self.user_encrypted)
        } else {
            return Err(EncryptionError::IncorrectPassword.into());
        };

        let file_encryption_key = derive_file_key(&intermediate, wrapped)?;
        self.validate_permissions(&file_encryption_key)?;

        Ok((file_encryption_key, role))
    }

    /// Validate the permissions.
    ///
    /// This implements Algorithm 13 as described in ISO 32000-2:2020 (PDF 2.0).
    pub fn validate_permissions(&self, file_encryption_key: &[u8; 32]) -> Result<()> {
        let (p, encrypt_metadata) = decode_perms(&self.permission_encrypted, file_encryption_key)?;

        if p != self.permissions || encrypt_metadata != self.encrypt_metadata {
            return Err(EncryptionError::PermissionsMismatch.into());
        }
        Ok(())
    }
}
