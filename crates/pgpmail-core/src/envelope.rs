//! RFC 3156 PGP/MIME envelopes.

use pgpmail_mime::MimeMessage;

/// `Content-Type` of a signed envelope. The digest name is fixed; gpg's
/// actual choice is not inspected.
pub const SIGNED_CONTENT_TYPE: &str =
    "multipart/signed; protocol=application/pgp-signature; micalg=pgp-sha1";

/// `Content-Type` of an encrypted envelope.
pub const ENCRYPTED_CONTENT_TYPE: &str =
    "multipart/encrypted; protocol=\"application/pgp-encrypted\"";

/// Media type of a detached signature part.
pub const SIGNATURE_MEDIA_TYPE: &str = "application/pgp-signature";

/// Filename of the detached signature part.
pub const SIGNATURE_FILENAME: &str = "signature.asc";

/// Body of the PGP/MIME control part.
pub const CONTROL_BODY: &str = "Version: 1\n";

/// `multipart/signed`: the payload untouched, then the detached signature.
#[must_use]
pub fn signed_envelope(payload: &MimeMessage, signature: &[u8]) -> MimeMessage {
    let mut envelope = MimeMessage::new();
    envelope.set_header("Content-Type", SIGNED_CONTENT_TYPE);
    envelope.add_part(payload.clone());
    envelope.add_part(MimeMessage::attachment(
        signature,
        SIGNATURE_MEDIA_TYPE,
        SIGNATURE_FILENAME,
    ));
    envelope
}

/// `multipart/encrypted`: the version control part, then the armored
/// ciphertext.
#[must_use]
pub fn encrypted_envelope(ciphertext: &[u8]) -> MimeMessage {
    let mut control = MimeMessage::new();
    control.set_header("Content-Type", "application/pgp-encrypted");
    control.set_header("Content-Disposition", "attachment");
    control.set_body(CONTROL_BODY);

    let mut data = MimeMessage::new();
    data.set_header("Content-Type", "application/octet-stream");
    data.set_header("Content-Disposition", "inline; filename=\"msg.asc\"");
    data.set_body(ciphertext.to_vec());

    let mut envelope = MimeMessage::new();
    envelope.set_header("Content-Type", ENCRYPTED_CONTENT_TYPE);
    envelope.add_part(control);
    envelope.add_part(data);
    envelope
}

// ── Tests ──────────────────────────────────────────────────────────
