use thiserror::Error;

use crate::ObjectId;
use crate::encryption::{CryptoError, EncryptionError};
use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The source document does not exist or cannot be opened.
    #[error("input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },
    /// The object graph cannot be rewritten into a valid document.
    #[error("malformed object graph: {0}")]
    MalformedObjectGraph(#[from] GraphError),
    /// A hash or cipher primitive rejected its input. This indicates a bug.
    #[error("cryptographic primitive failure: {0}")]
    CryptoPrimitive(#[from] CryptoError),
    /// The encryption settings cannot be applied.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The document already carries an /Encrypt dictionary.
    #[error("the document is already encrypted")]
    AlreadyEncrypted,
    /// Reading back or authenticating against an encryption dictionary failed.
    #[error("encryption error: {0}")]
    Encryption(#[from] EncryptionError),
    /// An Object has the wrong type, e.g. the Object is an Array where a Name would be expected.
    #[error("object has wrong type; expected type {expected} but found type {found}")]
    ObjectType {
        expected: &'static str,
        found: &'static str,
    },
    /// Dictionary key was not found.
    #[error("missing required dictionary key \"{0}\"")]
    DictKey(String),
    /// The Object ID was not found.
    #[error("object {} {} R was not found", .0.0, .0.1)]
    ObjectNotFound(ObjectId),
    /// Failed to parse input.
    #[error("couldn't parse input: {0}")]
    Parse(#[from] ParseError),
    /// Error while parsing cross reference table.
    #[error("invalid cross-reference table: {0}")]
    Xref(XrefError),
    /// IO error
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("object {} {} R references missing object {} {} R", from.0, from.1, to.0, to.1)]
    DanglingReference { from: ObjectId, to: ObjectId },
    #[error("the trailer references missing object {} {} R", .0.0, .0.1)]
    DanglingTrailerReference(ObjectId),
    #[error("the trailer has no /Root catalog")]
    MissingCatalog,
    #[error("the document catalog has no page tree")]
    MissingPageTree,
    #[error("the page tree contains a cycle at {} {} R", .0.0, .0.1)]
    PageTreeCycle(ObjectId),
    #[error("unsupported object in page tree: {0}")]
    UnsupportedObject(String),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid file header")]
    InvalidFileHeader,
    #[error("invalid file trailer")]
    InvalidTrailer,
    #[error("invalid cross reference table")]
    InvalidXref,
    #[error("invalid indirect object at byte {offset}")]
    IndirectObject { offset: usize },
    #[error("invalid object stream: {0}")]
    InvalidObjectStream(String),
    #[error("invalid stream: {0}")]
    InvalidStream(String),
}

#[derive(Debug)]
pub enum XrefError {
    /// Could not find start of cross reference table.
    Start,
    /// The trailer's "Prev" field was invalid.
    PrevStart,
    /// The trailer's "XRefStm" field was invalid.
    StreamStart,
}

impl fmt::Display for XrefError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            XrefError::Start => write!(f, "invalid start value"),
            XrefError::PrevStart => write!(f, "invalid start value in Prev field"),
            XrefError::StreamStart => write!(f, "invalid stream start value in XRefStm field"),
        }
    }
}

impl std::error::Error for XrefError {}

impl From<stringprep::Error> for Error {
    fn from(err: stringprep::Error) -> Self {
        Error::InvalidConfiguration(format!("password rejected by SASLprep: {err}"))
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::IO(err.error)
    }
}
