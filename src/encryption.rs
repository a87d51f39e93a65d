mod algorithms;
pub mod crypt_filters;
mod key_derivation;
mod permissions;
mod primitives;

use crate::{Dictionary, Document, Object, Result, StringFormat, dictionary};
use crypt_filters::*;
use log::{debug, warn};
use rand::CryptoRng;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use algorithms::{PasswordAlgorithm, PasswordRole};
pub use key_derivation::{MAX_PASSWORD_LEN, derive_file_key, derive_hash, sanitize_password, wrap_file_key};
pub use permissions::{Permissions, decode_perms, encode_perms};
pub use primitives::CryptoError;

const STD_CF: &[u8] = b"StdCF";

#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("the /Encrypt dictionary is missing")]
    MissingEncryptDictionary,
    #[error("missing encryption revision")]
    MissingRevision,
    #[error("missing the owner password entries (/O, /OE)")]
    MissingOwnerPassword,
    #[error("missing the user password entries (/U, /UE)")]
    MissingUserPassword,
    #[error("missing the permissions entries (/P, /Perms)")]
    MissingPermissions,

    #[error("invalid hash or key length in the /Encrypt dictionary")]
    InvalidHashLength,
    // Used generically when the object type violates ISO 32000
    #[error("unexpected type in the /Encrypt dictionary")]
    InvalidType,

    #[error("the supplied password is incorrect")]
    IncorrectPassword,
    #[error("the /Perms entry does not match /P and /EncryptMetadata")]
    PermissionsMismatch,

    #[error("the security handler {0} is not supported")]
    UnsupportedSecurityHandler(String),
    #[error("only the AES-256 security handler (V 5, R 6) is supported")]
    UnsupportedRevision,
}

/// Key material and handler values for encrypting one document.
#[derive(Clone)]
pub struct EncryptionState {
    pub(crate) crypt_filters: BTreeMap<Vec<u8>, Arc<dyn CryptFilter>>,
    pub(crate) file_encryption_key: [u8; 32],
    pub(crate) stream_filter: Vec<u8>,
    pub(crate) string_filter: Vec<u8>,
    pub(crate) algorithm: PasswordAlgorithm,
}

impl fmt::Debug for EncryptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionState")
            .field("crypt_filters", &self.crypt_filters)
            .field("file_encryption_key", &"<redacted>")
            .field("stream_filter", &String::from_utf8_lossy(&self.stream_filter))
            .field("string_filter", &String::from_utf8_lossy(&self.string_filter))
            .field("permissions", &self.permissions())
            .finish()
    }
}

impl EncryptionState {
    /// Generate a fresh file encryption key and the revision 6 handler values.
    ///
    /// Passwords are expected to be sanitized already (see [`sanitize_password`]). The user
    /// values are computed before the owner values since the owner hash binds the U string.
    pub fn new<R>(
        user_password: &[u8], owner_password: &[u8], permissions: Permissions, encrypt_metadata: bool, rng: &mut R,
    ) -> Result<Self>
    where
        R: CryptoRng + ?Sized,
    {
        if user_password.is_empty() && owner_password.is_empty() {
            warn!("user and owner passwords are both empty; the document opens without a password");
        }

        let mut file_encryption_key = [0u8; 32];
        rng.fill_bytes(&mut file_encryption_key);

        let mut algorithm = PasswordAlgorithm::new(permissions.p_value(), encrypt_metadata);

        let (user_value, user_encrypted) =
            algorithm.compute_hashed_user_password_r6(&file_encryption_key, user_password, rng)?;
        algorithm.user_value = user_value;
        algorithm.user_encrypted = user_encrypted;

        let (owner_value, owner_encrypted) =
            algorithm.compute_hashed_owner_password_r6(&file_encryption_key, owner_password, rng)?;
        algorithm.owner_value = owner_value;
        algorithm.owner_encrypted = owner_encrypted;

        algorithm.permission_encrypted = algorithm.compute_permissions(&file_encryption_key, rng)?;

        debug!("generated revision 6 handler values, P = {}", algorithm.permissions);

        let mut crypt_filters: BTreeMap<Vec<u8>, Arc<dyn CryptFilter>> = BTreeMap::new();
        crypt_filters.insert(STD_CF.to_vec(), Arc::new(Aes256CryptFilter));

        Ok(Self {
            crypt_filters,
            file_encryption_key,
            stream_filter: STD_CF.to_vec(),
            string_filter: STD_CF.to_vec(),
            algorithm,
        })
    }

    /// Authenticate `password` against an existing /Encrypt dictionary and recover the key.
    pub fn decode(encrypted: &Dictionary, password: &[u8]) -> Result<(Self, PasswordRole)> {
        let algorithm = PasswordAlgorithm::try_from(encrypted)?;
        let (file_encryption_key, role) = algorithm.compute_file_encryption_key(password)?;

        let mut crypt_filters: BTreeMap<Vec<u8>, Arc<dyn CryptFilter>> = BTreeMap::new();
        if let Ok(filters) = encrypted.get(b"CF").and_then(Object::as_dict) {
            for (name, filter) in filters {
                let method = filter
                    .as_dict()
                    .and_then(|dict| dict.get(b"CFM"))
                    .and_then(Object::as_name)
                    .map_err(|_| EncryptionError::InvalidType)?;
                if method == b"AESV3" {
                    crypt_filters.insert(name.clone(), Arc::new(Aes256CryptFilter));
                } else {
                    crypt_filters.insert(name.clone(), Arc::new(IdentityCryptFilter));
                }
            }
        }

        let name_of = |key: &[u8]| {
            encrypted
                .get(key)
                .and_then(Object::as_name)
                .map(<[u8]>::to_vec)
                .unwrap_or_else(|_| b"Identity".to_vec())
        };

        let state = Self {
            crypt_filters,
            file_encryption_key,
            stream_filter: name_of(b"StmF"),
            string_filter: name_of(b"StrF"),
            algorithm,
        };

        Ok((state, role))
    }

    /// The /Encrypt dictionary for these handler values.
    pub fn encode(&self) -> Dictionary {
        let mut crypt_filters = Dictionary::new();
        for (name, filter) in &self.crypt_filters {
            crypt_filters.set(
                name.clone(),
                dictionary! {
                    "Type" => "CryptFilter",
                    "CFM" => Object::Name(filter.method().to_vec()),
                    "AuthEvent" => "DocOpen",
                    "Length" => 32,
                },
            );
        }

        let algorithm = &self.algorithm;
        dictionary! {
            "Filter" => "Standard",
            "V" => algorithm.version,
            "R" => algorithm.revision,
            "Length" => 256,
            "CF" => crypt_filters,
            "StmF" => Object::Name(self.stream_filter.clone()),
            "StrF" => Object::Name(self.string_filter.clone()),
            "O" => Object::string_hex(algorithm.owner_value.clone()),
            "U" => Object::string_hex(algorithm.user_value.clone()),
            "OE" => Object::string_hex(algorithm.owner_encrypted.clone()),
            "UE" => Object::string_hex(algorithm.user_encrypted.clone()),
            "P" => algorithm.permissions,
            "Perms" => Object::string_hex(algorithm.permission_encrypted.clone()),
            "EncryptMetadata" => algorithm.encrypt_metadata,
        }
    }

    pub fn permissions(&self) -> Permissions {
        Permissions::from_p_value(self.algorithm.permissions)
    }

    pub fn encrypt_metadata(&self) -> bool {
        self.algorithm.encrypt_metadata
    }

    pub fn file_encryption_key(&self) -> &[u8; 32] {
        &self.file_encryption_key
    }

    fn filter(&self, name: &[u8]) -> Arc<dyn CryptFilter> {
        self.crypt_filters
            .get(name)
            .cloned()
            .unwrap_or_else(|| Arc::new(IdentityCryptFilter))
    }

    pub fn get_stream_filter(&self) -> Arc<dyn CryptFilter> {
        self.filter(&self.stream_filter)
    }

    pub fn get_string_filter(&self) -> Arc<dyn CryptFilter> {
        self.filter(&self.string_filter)
    }
}

fn is_exempt_stream(state: &EncryptionState, obj: &Object) -> bool {
    let Ok(stream) = obj.as_stream() else {
        return false;
    };

    // The cross-reference stream shall not be encrypted.
    if stream.dict.has_type(b"XRef") {
        return true;
    }

    // Metadata stays readable by tools that do not support encryption.
    !state.encrypt_metadata() && stream.dict.has_type(b"Metadata")
}

/// Encrypts every string and stream inside `obj`.
pub fn encrypt_object(state: &EncryptionState, obj: &mut Object) -> Result<()> {
    if is_exempt_stream(state, obj) {
        return Ok(());
    }

    let (crypt_filter, plaintext) = match obj {
        // Strings nested in arrays and dictionaries are encrypted as well.
        Object::Array(objects) => {
            for obj in objects {
                encrypt_object(state, obj)?;
            }
            return Ok(());
        }
        Object::Dictionary(objects) => {
            for (_, obj) in objects.iter_mut() {
                encrypt_object(state, obj)?;
            }
            return Ok(());
        }
        Object::String(content, _) => (state.get_string_filter(), &*content),
        Object::Stream(stream) => {
            // Strings in the stream dictionary are encrypted like any other.
            for (_, obj) in stream.dict.iter_mut() {
                encrypt_object(state, obj)?;
            }
            (state.get_stream_filter(), &stream.content)
        }
        _ => return Ok(()),
    };

    let ciphertext = crypt_filter.encrypt(&state.file_encryption_key, plaintext)?;

    match obj {
        Object::Stream(stream) => stream.set_content(ciphertext),
        Object::String(content, format) => {
            *content = ciphertext;
            *format = StringFormat::Hexadecimal;
        }
        _ => (),
    }

    Ok(())
}

/// Decrypts every string and stream inside `obj`.
///
/// Reading encrypted documents is not supported; this only checks what [`encrypt_object`] wrote.
#[doc(hidden)]
pub fn decrypt_object(state: &EncryptionState, obj: &mut Object) -> Result<()> {
    if is_exempt_stream(state, obj) {
        return Ok(());
    }

    let (crypt_filter, ciphertext) = match obj {
        Object::Array(objects) => {
            for obj in objects {
                decrypt_object(state, obj)?;
            }
            return Ok(());
        }
        Object::Dictionary(objects) => {
            for (_, obj) in objects.iter_mut() {
                decrypt_object(state, obj)?;
            }
            return Ok(());
        }
        Object::String(content, _) => (state.get_string_filter(), &*content),
        Object::Stream(stream) => {
            for (_, obj) in stream.dict.iter_mut() {
                decrypt_object(state, obj)?;
            }
            (state.get_stream_filter(), &stream.content)
        }
        _ => return Ok(()),
    };

    let plaintext = crypt_filter.decrypt(&state.file_encryption_key, ciphertext)?;

    match obj {
        Object::Stream(stream) => stream.set_content(plaintext),
        Object::String(content, _) => *content = plaintext,
        _ => (),
    }

    Ok(())
}

impl Document {
    /// Encrypt all objects in place and attach the /Encrypt dictionary as a new indirect object.
    ///
    /// The trailer, and so the file /ID, is never encrypted.
    pub fn encrypt(&mut self, state: &EncryptionState) -> Result<()> {
        if self.is_encrypted() {
            return Err(crate::Error::AlreadyEncrypted);
        }

        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            self.objects
                .par_iter_mut()
                .try_for_each(|(_, obj)| encrypt_object(state, obj))?;
        }
        #[cfg(not(feature = "rayon"))]
        {
            for obj in self.objects.values_mut() {
                encrypt_object(state, obj)?;
            }
        }

        let encrypt_id = self.add_object(state.encode());
        self.trailer.set("Encrypt", Object::Reference(encrypt_id));
        debug!("encrypted {} objects, /Encrypt is {} {} R", self.objects.len() - 1, encrypt_id.0, encrypt_id.1);

        Ok(())
    }

    /// Decrypt all objects in place with a state recovered by [`EncryptionState::decode`].
    ///
    /// A verification aid for freshly protected output, not a general reader for encrypted files.
    #[doc(hidden)]
    pub fn decrypt(&mut self, state: &EncryptionState) -> Result<()> {
        let encrypt_id = self.trailer.get(b"Encrypt").and_then(Object::as_reference).ok();

        for (&id, obj) in self.objects.iter_mut() {
            if Some(id) == encrypt_id {
                continue;
            }
            decrypt_object(state, obj)?;
        }

        self.trailer.remove(b"Encrypt");
        if let Some(id) = encrypt_id {
            self.objects.remove(&id);
        }
        Ok(())
    }

    /// The /Encrypt dictionary, when the document has one.
    pub fn get_encrypted(&self) -> Result<&Dictionary> {
        let encrypt = self
            .trailer
            .get(b"Encrypt")
            .map_err(|_| EncryptionError::MissingEncryptDictionary)?;
        match encrypt {
            Object::Reference(id) => self.get_object(*id).and_then(Object::as_dict),
            Object::Dictionary(dict) => Ok(dict),
            _ => Err(EncryptionError::InvalidType.into()),
        }
    }
}
