use crate::encryption::{Permissions, sanitize_password};
use crate::{Error, Result};

pub const DEFAULT_HEADER: &str = "%PDF-2.0";
pub const DEFAULT_PRODUCER: &str = "pdfseal";

/// Settings for protecting a document.
#[derive(Clone)]
pub struct EncryptionConfig {
    /// Password required to open the document. May be empty.
    pub user_password: String,

    /// Password granting full access. Falls back to the user password when `None`.
    pub owner_password: Option<String>,

    /// Capabilities granted to users who open the document with the user password.
    pub permissions: Permissions,

    /// Whether /Type /Metadata streams are encrypted.
    pub encrypt_metadata: bool,

    /// First line of the output file.
    pub header: String,

    /// Flate-compress unfiltered streams before encrypting them.
    pub compress_streams: bool,

    /// Value for /Producer in the document information dictionary; `None` leaves it untouched.
    pub producer: Option<String>,
}

impl EncryptionConfig {
    pub fn new<S: Into<String>>(user_password: S) -> EncryptionConfig {
        EncryptionConfig {
            user_password: user_password.into(),
            ..EncryptionConfig::default()
        }
    }

    pub fn builder() -> EncryptionConfigBuilder {
        EncryptionConfigBuilder::default()
    }

    /// The owner password in effect.
    pub fn effective_owner_password(&self) -> &str {
        self.owner_password.as_deref().unwrap_or(&self.user_password)
    }

    /// Version part of the header, e.g. `2.0` for `%PDF-2.0`.
    pub fn version(&self) -> Result<&str> {
        self.header
            .strip_prefix("%PDF-")
            .filter(|version| {
                !version.is_empty() && version.bytes().all(|c| c.is_ascii_graphic()) && !version.contains('%')
            })
            .ok_or_else(|| {
                Error::InvalidConfiguration(format!("header {:?} does not start with \"%PDF-<version>\"", self.header))
            })
    }

    /// Check the header and prepare both passwords.
    ///
    /// Returns the SASLprep-normalized, truncated user and owner passwords.
    pub fn validate(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        self.version()?;
        let user = sanitize_password(&self.user_password)?;
        let owner = sanitize_password(self.effective_owner_password())?;
        Ok((user, owner))
    }
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        EncryptionConfig {
            user_password: String::new(),
            owner_password: None,
            permissions: Permissions::empty(),
            encrypt_metadata: true,
            header: DEFAULT_HEADER.to_string(),
            compress_streams: false,
            producer: Some(DEFAULT_PRODUCER.to_string()),
        }
    }
}

// Passwords stay out of logs.
impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("user_password", &"<redacted>")
            .field("owner_password", &self.owner_password.as_ref().map(|_| "<redacted>"))
            .field("permissions", &self.permissions)
            .field("encrypt_metadata", &self.encrypt_metadata)
            .field("header", &self.header)
            .field("compress_streams", &self.compress_streams)
            .field("producer", &self.producer)
            .finish()
    }
}

/// Builder for [`EncryptionConfig`].
#[derive(Default)]
pub struct EncryptionConfigBuilder {
    config: EncryptionConfig,
}

impl EncryptionConfigBuilder {
    pub fn user_password<S: Into<String>>(mut self, value: S) -> Self {
        self.config.user_password = value.into();
        self
    }

    pub fn owner_password<S: Into<String>>(mut self, value: S) -> Self {
        self.config.owner_password = Some(value.into());
        self
    }

    pub fn permissions(mut self, value: Permissions) -> Self {
        self.config.permissions = value;
        self
    }

    pub fn encrypt_metadata(mut self, value: bool) -> Self {
        self.config.encrypt_metadata = value;
        self
    }

    pub fn header<S: Into<String>>(mut self, value: S) -> Self {
        self.config.header = value.into();
        self
    }

    pub fn compress_streams(mut self, value: bool) -> Self {
        self.config.compress_streams = value;
        self
    }

    /// `None` keeps the producer of the source document.
    pub fn producer(mut self, value: Option<&str>) -> Self {
        self.config.producer = value.map(str::to_string);
        self
    }

    pub fn build(self) -> EncryptionConfig {
        self.config
    }
}
