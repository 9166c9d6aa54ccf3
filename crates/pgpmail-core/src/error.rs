//! Error types for `pgpmail-core`.

use pgpmail_mime::MimeError;
use thiserror::Error;

use crate::operation::CryptoOperation;

/// Errors produced by gpg-backed operations.
#[derive(Debug, Error)]
pub enum GpgError {
    /// No gpg binary was located when the manager was built.
    #[error("can't find gpg binary in path")]
    BinaryUnavailable,

    /// gpg exited unsuccessfully. `output` is everything it reported on
    /// the captured stream.
    #[error("GPG command failed. See log for details.")]
    CommandFailure {
        /// Captured diagnostic text.
        output: String,
    },

    /// `dispatch_outgoing` was handed an operation that does not produce
    /// an outgoing message.
    #[error("{0} is not an outgoing operation")]
    NotOutgoing(CryptoOperation),

    /// A signature part could not be transfer-decoded.
    #[error(transparent)]
    Mime(#[from] MimeError),

    /// Temporary file or subprocess spawn failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error parsing a [`CryptoOperation`] from its string form.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown crypto operation: {0}")]
pub struct ParseOperationError(pub String);
