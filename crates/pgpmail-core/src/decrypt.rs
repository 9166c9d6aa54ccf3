//! Turning decrypted bytes back into a message.

use pgpmail_mime::MimeMessage;
use serde::Serialize;

use crate::notice::CryptoNotice;

/// Line prepended when a decrypted multipart message lacks it.
pub const MIME_VERSION_LINE: &str = "MIME-Version: 1.0\n";

/// Result of a successful decrypt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decrypted {
    /// Always `Valid`: "decrypted for display".
    pub notice: CryptoNotice,
    /// Verdict on a signature inside the ciphertext, if gpg reported one.
    pub signature: Option<CryptoNotice>,
    /// The plaintext as a message.
    #[serde(skip)]
    pub message: MimeMessage,
}

/// Parse decrypted plaintext as a top-level message.
///
/// The inner entity of a PGP/MIME message was never a top-level message
/// and usually has no `MIME-Version`, so a multipart body would parse as
/// a leaf. When that happens the header is added and the bytes parsed
/// once more. This is a best-effort fix for that one case.
#[must_use]
pub fn parse_decrypted(plaintext: &[u8]) -> MimeMessage {
    let message = MimeMessage::parse(plaintext);
    if message.is_multipart() || !message.content_type().starts_with("multipart/") {
        return message;
    }

    tracing::debug!("crypto: decrypted multipart message lacks MIME-Version, reparsing");
    let mut repaired = Vec::with_capacity(plaintext.len().saturating_add(MIME_VERSION_LINE.len()));
    repaired.extend_from_slice(MIME_VERSION_LINE.as_bytes());
    repaired.extend_from_slice(plaintext);
    MimeMessage::parse(&repaired)
}
