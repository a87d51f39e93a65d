use super::EncryptionError;
use super::primitives;
use bitflags::bitflags;
use rand::CryptoRng;
use std::str::FromStr;

bitflags! {
    /// User access permissions, stored as the /P entry of the encryption dictionary.
    ///
    /// Bit positions are 0-based here; ISO 32000 numbers them from 1, so "bit 3" (print) is
    /// `1 << 2`.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
    pub struct Permissions: u32 {
        /// Print the document (possibly not at the highest quality level, depending on whether
        /// [`Permissions::PRINTABLE_IN_HIGH_QUALITY`] is also set).
        const PRINTABLE = 1 << 2;

        /// Modify the contents of the document by operations other than those controlled by
        /// [`Permissions::ANNOTABLE`], [`Permissions::FILLABLE`] and [`Permissions::ASSEMBLABLE`].
        const MODIFIABLE = 1 << 3;

        /// Copy or otherwise extract text and graphics from the document.
        const COPYABLE = 1 << 4;

        /// Add or modify text annotations and fill in interactive form fields.
        const ANNOTABLE = 1 << 5;

        /// Fill in existing interactive fields, even if [`Permissions::ANNOTABLE`] is clear.
        const FILLABLE = 1 << 8;

        /// Extract text and graphics for the purpose of providing content to assistive
        /// technology.
        const COPYABLE_FOR_ACCESSIBILITY = 1 << 9;

        /// Assemble the document (insert, rotate, or delete pages and create outline items or
        /// thumbnail images), even if [`Permissions::MODIFIABLE`] is not set.
        const ASSEMBLABLE = 1 << 10;

        /// Print to a representation from which a faithful copy of the content could be
        /// generated.
        const PRINTABLE_IN_HIGH_QUALITY = 1 << 11;
    }
}

// Bits 7-8 and 13-32 are reserved and must be 1. Bits 1-2 must be 0.
const RESERVED_ONES: u32 = (0b11 << 6) | 0xFFFF_F000;

const NAMES: [(&str, Permissions); 8] = [
    ("print", Permissions::PRINTABLE),
    ("modify", Permissions::MODIFIABLE),
    ("copy", Permissions::COPYABLE),
    ("annotate", Permissions::ANNOTABLE),
    ("fill-forms", Permissions::FILLABLE),
    ("accessibility", Permissions::COPYABLE_FOR_ACCESSIBILITY),
    ("assemble", Permissions::ASSEMBLABLE),
    ("print-high-res", Permissions::PRINTABLE_IN_HIGH_QUALITY),
];

impl Permissions {
    /// The signed 32-bit /P value with all reserved bits applied.
    pub fn p_value(&self) -> i32 {
        (self.bits() | RESERVED_ONES) as i32
    }

    /// Decode a /P value, ignoring reserved bits.
    pub fn from_p_value(p: i32) -> Permissions {
        Permissions::from_bits_truncate(p as u32)
    }

    /// Look up one capability by its command line name, e.g. `print` or `fill-forms`.
    pub fn from_capability_name(name: &str) -> Option<Permissions> {
        NAMES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name.trim()))
            .map(|(_, flag)| *flag)
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        NAMES.iter().map(|(name, _)| *name)
    }
}

/// Parses a comma separated list such as `print,copy`. `all` and `none` are also accepted.
impl FromStr for Permissions {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Permissions> {
        match s.trim() {
            "" | "none" => return Ok(Permissions::empty()),
            "all" => return Ok(Permissions::all()),
            _ => {}
        }

        s.split(',').try_fold(Permissions::empty(), |acc, name| {
            Permissions::from_capability_name(name).map(|flag| acc | flag).ok_or_else(|| {
                crate::Error::InvalidConfiguration(format!(
                    "unknown permission '{}', expected one of: {}",
                    name.trim(),
                    Permissions::names().collect::<Vec<_>>().join(", ")
                ))
            })
        })
    }
}

/// Compute the /Perms value.
///
/// This implements Algorithm 10 as described in ISO 32000-2:2020 (PDF 2.0).
pub fn encode_perms<R>(p: i32, encrypt_metadata: bool, file_key: &[u8; 32], rng: &mut R) -> crate::Result<[u8; 16]>
where
    R: CryptoRng + ?Sized,
{
    let mut bytes = [0u8; 16];

    // Bytes 0-3 are P low order byte first, bytes 4-7 are 0xFF.
    bytes[..4].copy_from_slice(&p.to_le_bytes());
    bytes[4..8].fill(0xFF);
    bytes[8] = if encrypt_metadata { b'T' } else { b'F' };
    bytes[9..12].copy_from_slice(b"adb");
    rng.fill_bytes(&mut bytes[12..]);

    primitives::aes256_ecb_encrypt_block(file_key, &mut bytes)?;
    Ok(bytes)
}

/// Decrypt and validate a /Perms value, returning the embedded P and EncryptMetadata flag.
///
/// This implements the checks of Algorithm 13 as described in ISO 32000-2:2020 (PDF 2.0).
pub fn decode_perms(perms: &[u8], file_key: &[u8; 32]) -> crate::Result<(i32, bool)> {
    let mut bytes: [u8; 16] = perms.try_into().map_err(|_| EncryptionError::InvalidHashLength)?;
    primitives::aes256_ecb_decrypt_block(file_key, &mut bytes)?;

    if &bytes[9..12] != b"adb" {
        return Err(EncryptionError::PermissionsMismatch.into());
    }

    let encrypt_metadata = match bytes[8] {
        b'T' => true,
        b'F' => false,
        _ => return Err(EncryptionError::PermissionsMismatch.into()),
    };

    let p = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    Ok((p, encrypt_metadata))
}
