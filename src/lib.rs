//! AES-256 (revision 6) password protection for PDF documents.
//!
//! ```no_run
//! use pdfseal::{EncryptionConfig, Permissions, protect_file};
//!
//! let config = EncryptionConfig::builder()
//!     .user_password("read1234")
//!     .owner_password("owner-secret")
//!     .permissions(Permissions::PRINTABLE | Permissions::COPYABLE_FOR_ACCESSIBILITY)
//!     .build();
//! protect_file("input.pdf", "protected.pdf", &config)?;
//! # Ok::<(), pdfseal::Error>(())
//! ```

mod object;
pub use object::{Dictionary, Object, ObjectId, Stream, StringFormat};

mod document;
pub use document::Document;

mod config;
pub use config::{DEFAULT_HEADER, DEFAULT_PRODUCER, EncryptionConfig, EncryptionConfigBuilder};

pub mod encryption;
pub use encryption::{EncryptionState, PasswordRole, Permissions};

mod error;
pub use error::{Error, GraphError, ParseError, Result, XrefError};

mod filters;
mod object_stream;
mod parser;
mod processor;
mod protect;
pub use protect::{protect_document, protect_file, verify_password};

mod reader;
pub use reader::Reader;

mod writer;
pub use writer::Writer;

pub mod xref;
