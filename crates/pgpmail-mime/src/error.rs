//! Error types for `pgpmail-mime`.

use thiserror::Error;

/// Errors produced while decoding MIME entity bodies.
///
/// Parsing itself never fails: malformed input degrades to a single-part
/// entity whose body holds the unparsed bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MimeError {
    /// Body declared `Content-Transfer-Encoding: base64` but is not valid base64.
    #[error("invalid base64 body: {0}")]
    InvalidBase64(String),

    /// Body declared a transfer encoding this model does not know.
    #[error("unsupported transfer encoding: {0}")]
    UnsupportedEncoding(String),
}
