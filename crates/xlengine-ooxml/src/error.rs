//! OOXML reader/writer/patcher error types.

use thiserror::Error;

pub type OoxmlResult<T> = std::result::Result<T, OoxmlError>;

/// Errors that can occur reading, writing, or patching an XLSX archive.
#[derive(Debug, Error)]
pub enum OoxmlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error in {part} at byte {offset}: {source}")]
    Xml { part: String, offset: u64, source: quick_xml::Error },

    #[error("{part} is not a valid XLSX: {detail}")]
    InvalidFormat { part: String, detail: String },

    #[error("missing required part: {0}")]
    MissingPart(String),

    #[error("unsupported element order in {part}: {detail}")]
    UnsupportedOrder { part: String, detail: String },

    #[error("core model error: {0}")]
    Core(#[from] xlengine_core::Error),
}

impl OoxmlError {
    pub fn xml(part: impl Into<String>, offset: u64, source: quick_xml::Error) -> Self {
        OoxmlError::Xml { part: part.into(), offset, source }
    }
}
