use std::io::Write;
use std::path::Path;

use log::{debug, info};
use rand::CryptoRng;
use tempfile::NamedTempFile;

use crate::config::EncryptionConfig;
use crate::encryption::{EncryptionState, PasswordRole, sanitize_password};
use crate::{Document, Error, Object, Result};

/// Trailer entries kept from the source document; everything else is rebuilt by the writer.
const KEPT_TRAILER_KEYS: [&[u8]; 3] = [b"Root", b"Info", b"ID"];

/// Encrypt `document` with AES-256 (revision 6) and serialize it.
///
/// The object graph is rewritten first: only objects reachable from the trailer are kept,
/// numbered densely from 1. Nothing is produced unless every step succeeds.
pub fn protect_document(document: Document, config: &EncryptionConfig) -> Result<Vec<u8>> {
    let passwords = config.validate()?;
    protect_validated(document, config, passwords)
}

/// [`protect_document`] with passwords already prepared by [`EncryptionConfig::validate`].
fn protect_validated(
    mut document: Document, config: &EncryptionConfig, (user_password, owner_password): (Vec<u8>, Vec<u8>),
) -> Result<Vec<u8>> {
    let version = config.version()?.to_string();

    if document.is_encrypted() {
        return Err(Error::AlreadyEncrypted);
    }

    document.inline_stream_lengths();
    document.trailer = KEPT_TRAILER_KEYS
        .iter()
        .filter_map(|&key| document.trailer.get(key).ok().map(|value| (key, value.clone())))
        .collect();
    document.renumber_reachable()?;
    let pages = document.get_pages()?;
    debug!("{} objects, {} pages after rewrite", document.objects.len(), pages.len());

    if let Some(producer) = &config.producer {
        document.set_producer(producer)?;
    }
    if config.compress_streams {
        document.compress()?;
    }

    let mut rng = rand::rng();
    set_file_id(&mut document, &mut rng);

    let state = EncryptionState::new(
        &user_password,
        &owner_password,
        config.permissions,
        config.encrypt_metadata,
        &mut rng,
    )?;
    document.encrypt(&state)?;

    document.version = version;
    let bytes = document.save_to_vec()?;
    info!("encrypted document is {} bytes, P = {}", bytes.len(), config.permissions.p_value());
    Ok(bytes)
}

/// Keep a well-formed /ID from the source, otherwise use 16 random bytes for both halves.
fn set_file_id<R: CryptoRng + ?Sized>(document: &mut Document, rng: &mut R) {
    let valid = document
        .trailer
        .get(b"ID")
        .and_then(Object::as_array)
        .is_ok_and(|id| id.len() == 2 && id.iter().all(|part| part.as_str().is_ok_and(|s| !s.is_empty())));
    if valid {
        return;
    }

    let mut id = vec![0u8; 16];
    rng.fill_bytes(&mut id);
    document
        .trailer
        .set("ID", vec![Object::string_hex(id.clone()), Object::string_hex(id)]);
}

/// Read `input`, encrypt it and write the result to `output`.
///
/// The output is written to a temporary file next to `output` and renamed over it only on
/// success.
pub fn protect_file<P, Q>(input: P, output: Q, config: &EncryptionConfig) -> Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (input, output) = (input.as_ref(), output.as_ref());
    // Nothing is read or written with settings that cannot be applied.
    let passwords = config.validate()?;

    let document = Document::load(input)?;
    let bytes = protect_validated(document, config, passwords)?;

    let directory = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(directory)?;
    file.write_all(&bytes)?;
    file.as_file().sync_all()?;
    file.persist(output)?;

    info!("wrote {}", output.display());
    Ok(())
}

/// Authenticate `password` against an encrypted document.
///
/// Checks the /Perms entry as well, so a tampered /P is reported even for a correct password.
pub fn verify_password(bytes: &[u8], password: &str) -> Result<PasswordRole> {
    let document = Document::load_mem(bytes)?;
    let encrypted = document.get_encrypted()?;
    let password = sanitize_password(password)?;
    let (_, role) = EncryptionState::decode(encrypted, &password)?;
    Ok(role)
}
