#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
#![cfg(unix)]

//! Integration tests: every manager operation against a scripted gpg.

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use common::{text_message, FakeGpg, RecordingHost};
use pgpmail_core::notice::DECRYPTION_FAILED_DESCRIPTION;
use pgpmail_core::{CryptoOperation, CryptoStatus, GpgError, GpgManager};
use pgpmail_mime::MimeMessage;

const SIGNATURE: &[u8] = b"-----BEGIN PGP SIGNATURE-----\n\
\n\
iQEzBAEBCAAdFiEEabc\n\
-----END PGP SIGNATURE-----\n";

const CIPHERTEXT: &[u8] = b"-----BEGIN PGP MESSAGE-----\n\
\n\
hQEMA5xyz\n\
-----END PGP MESSAGE-----\n";

fn to(addresses: &[&str]) -> Vec<String> {
    addresses.iter().map(|a| (*a).to_string()).collect()
}

fn signed_payload() -> MimeMessage {
    let mut message = text_message("hello\n");
    message.set_header("MIME-Version", "1.0");
    message
}

// ---------------------------------------------------------------------------
// Sign
// ---------------------------------------------------------------------------

#[test]
fn sign_wraps_payload_and_signature() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(SIGNATURE);
    let payload = signed_payload();

    let envelope = gpg
        .manager()
        .sign("alice@example.org", &to(&["bob@example.org"]), &payload)
        .into_result()
        .unwrap();

    assert_eq!(envelope.content_type(), "multipart/signed");
    let parts = envelope.parts();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0], payload);
    assert_eq!(parts[1].content_type(), "application/pgp-signature");
    assert_eq!(parts[1].filename().as_deref(), Some("signature.asc"));
    assert_eq!(parts[1].decoded_body().unwrap(), SIGNATURE);

    let invocations = gpg.invocations();
    assert_eq!(invocations.len(), 1);
    assert!(invocations[0]
        .starts_with("--quiet --batch --no-verbose --logger-fd 1 --use-agent --output "));
    assert!(invocations[0]
        .contains(" --yes --armor --detach-sign --textmode --local-user alice@example.org "));
}

#[test]
fn signed_payload_is_canonicalized() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(SIGNATURE);

    gpg.manager()
        .sign("alice@example.org", &[], &signed_payload())
        .into_result()
        .unwrap();

    assert_eq!(
        gpg.last_input(),
        b"Content-Type: text/plain; charset=utf-8\r\n\r\nhello\r\n"
    );
}

#[test]
fn sign_failure_carries_gpg_output() {
    let gpg = FakeGpg::new();
    gpg.set_diagnostics("gpg: skipped \"alice@example.org\": No secret key\n");
    gpg.set_exit_code(2);

    let outcome = gpg.manager().sign("alice@example.org", &[], &signed_payload());

    let Some(GpgError::CommandFailure { output }) = outcome.error() else {
        panic!("expected command failure, got {outcome:?}");
    };
    assert_eq!(output, "gpg: skipped \"alice@example.org\": No secret key\n");
    let notice = outcome.notice().unwrap();
    assert_eq!(notice.status, CryptoStatus::Invalid);
    assert_eq!(notice.description, "GPG command failed. See log for details.");
}

#[test]
fn quotes_in_addresses_stay_inside_one_argument() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(SIGNATURE);

    gpg.manager()
        .sign("o'neil@example.org", &[], &signed_payload())
        .into_result()
        .unwrap();

    assert!(gpg.invocations()[0].contains("--local-user o'neil@example.org "));
}

// ---------------------------------------------------------------------------
// Encrypt
// ---------------------------------------------------------------------------

#[test]
fn encrypt_always_includes_the_sender() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(CIPHERTEXT);

    gpg.manager()
        .encrypt("a@x", &[], &text_message("hi\n"), false)
        .into_result()
        .unwrap();

    let invocation = &gpg.invocations()[0];
    assert!(invocation.contains(" --yes --armor --encrypt --textmode --recipient <a@x> "));
    assert!(!invocation.contains("--sign"));
}

#[test]
fn encrypt_lists_recipients_then_sender() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(CIPHERTEXT);

    gpg.manager()
        .encrypt("a@x", &to(&["b@y", "c@z"]), &text_message("hi\n"), false)
        .into_result()
        .unwrap();

    assert!(gpg.invocations()[0]
        .contains("--recipient <b@y> --recipient <c@z> --recipient <a@x> "));
}

#[test]
fn encrypt_builds_encrypted_envelope() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(CIPHERTEXT);

    let envelope = gpg
        .manager()
        .encrypt("a@x", &to(&["b@y"]), &text_message("hi\n"), false)
        .into_result()
        .unwrap();

    assert_eq!(envelope.content_type(), "multipart/encrypted");
    let parts = envelope.parts();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].content_type(), "application/pgp-encrypted");
    assert_eq!(parts[0].body(), b"Version: 1\n");
    assert_eq!(parts[1].content_type(), "application/octet-stream");
    assert_eq!(
        parts[1].header("Content-Disposition").as_deref(),
        Some("inline; filename=\"msg.asc\"")
    );
    assert_eq!(parts[1].body(), CIPHERTEXT);
}

#[test]
fn sign_and_encrypt_adds_signing_flags() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(CIPHERTEXT);

    gpg.manager()
        .sign_and_encrypt("a@x", &to(&["b@y"]), &text_message("hi\n"))
        .into_result()
        .unwrap();

    assert!(gpg.invocations()[0]
        .contains("--encrypt --textmode --sign --local-user a@x --recipient <b@y>"));
}

#[test]
fn dispatch_routes_outgoing_operations() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(CIPHERTEXT);
    let manager = gpg.manager();

    for op in CryptoOperation::OUTGOING {
        assert!(manager
            .dispatch_outgoing(op, "a@x", &[], &text_message("hi\n"))
            .is_completed());
    }

    let invocations = gpg.invocations();
    assert_eq!(invocations.len(), 3);
    assert!(invocations[0].contains("--detach-sign"));
    assert!(invocations[1].contains("--encrypt --textmode --sign"));
    assert!(invocations[2].contains("--encrypt --textmode --recipient"));
}

// ---------------------------------------------------------------------------
// Verify
// ---------------------------------------------------------------------------

fn signature_part() -> MimeMessage {
    MimeMessage::attachment(SIGNATURE, "application/pgp-signature", "signature.asc")
}

#[test]
fn verify_good_signature_is_valid() {
    let gpg = FakeGpg::new();
    gpg.set_diagnostics("gpg: Signature made today\ngpg: Good signature from \"X\"\n");

    let notice = gpg
        .manager()
        .verify(&signed_payload(), &signature_part())
        .into_result()
        .unwrap();

    assert_eq!(notice.status, CryptoStatus::Valid);
    assert_eq!(notice.description, "Good signature from \"X\"");
    assert_eq!(
        notice.detail_lines,
        ["gpg: Signature made today", "gpg: Good signature from \"X\""]
    );
    assert!(gpg.invocations()[0].contains("--use-agent --verify "));
    assert_eq!(gpg.signature_input(), SIGNATURE);
    assert_eq!(
        gpg.last_input(),
        b"Content-Type: text/plain; charset=utf-8\r\n\r\nhello\r\n"
    );
}

#[test]
fn verify_signature_line_with_failed_exit_is_invalid() {
    let gpg = FakeGpg::new();
    gpg.set_diagnostics("gpg: BAD signature from \"X\"\n");
    gpg.set_exit_code(1);

    let notice = gpg
        .manager()
        .verify(&signed_payload(), &signature_part())
        .into_result()
        .unwrap();

    assert_eq!(notice.status, CryptoStatus::Invalid);
    assert_eq!(notice.description, "BAD signature from \"X\"");
}

#[test]
fn verify_unrecognized_output_is_unknown() {
    let gpg = FakeGpg::new();
    gpg.set_diagnostics("gpg: Can't check signature: No public key\n");
    gpg.set_exit_code(2);

    let outcome = gpg.manager().verify(&signed_payload(), &signature_part());

    assert!(outcome.is_completed());
    let notice = outcome.into_notice();
    assert_eq!(notice.status, CryptoStatus::Unknown);
    assert_eq!(notice.detail_lines, ["gpg: Can't check signature: No public key"]);
}

#[test]
fn verify_decodes_base64_signatures() {
    let gpg = FakeGpg::new();
    gpg.set_diagnostics("gpg: Good signature from \"X\"\n");
    let mut signature = MimeMessage::new();
    signature.set_header("Content-Type", "application/pgp-signature");
    signature.set_header("Content-Transfer-Encoding", "base64");
    signature.set_body("AAEC/w==\n");

    gpg.manager()
        .verify(&signed_payload(), &signature)
        .into_result()
        .unwrap();

    assert_eq!(gpg.signature_input(), [0x00u8, 0x01, 0x02, 0xff]);
}

#[test]
fn verify_hands_gpg_the_signed_bytes_of_a_nested_multipart() {
    // RFC 3156 signs everything between the first delimiter line and the
    // CRLF before the next one, so the inner close line ends without a break.
    const SIGNED_RANGE: &[u8] = b"Content-Type: multipart/mixed; boundary=\"inner\"\r\n\
\r\n\
--inner\r\n\
Content-Type: text/plain\r\n\
\r\n\
hello\r\n\
--inner\r\n\
Content-Type: application/octet-stream; name=\"a.bin\"\r\n\
Content-Disposition: attachment; filename=\"a.bin\"\r\n\
\r\n\
data\r\n\
--inner--";
    let mut wire = b"MIME-Version: 1.0\r\n\
Content-Type: multipart/signed; micalg=pgp-sha1; protocol=\"application/pgp-signature\"; boundary=\"outer\"\r\n\
\r\n\
--outer\r\n"
        .to_vec();
    wire.extend_from_slice(SIGNED_RANGE);
    wire.extend_from_slice(b"\r\n--outer\r\nContent-Type: application/pgp-signature\r\n\r\n");
    wire.extend_from_slice(SIGNATURE);
    wire.extend_from_slice(b"\r\n--outer--\r\n");

    let gpg = FakeGpg::new();
    gpg.set_diagnostics("gpg: Good signature from \"X\"\n");
    let signed = MimeMessage::parse(&wire);
    let [payload, signature] = signed.parts() else {
        panic!("expected two parts");
    };

    let notice = gpg
        .manager()
        .verify(payload, signature)
        .into_result()
        .unwrap();

    assert_eq!(notice.status, CryptoStatus::Valid);
    assert_eq!(gpg.last_input(), SIGNED_RANGE);
}

// ---------------------------------------------------------------------------
// Decrypt
// ---------------------------------------------------------------------------

const INNER_MULTIPART: &[u8] = b"Content-Type: multipart/mixed; boundary=\"inner\"\n\
\n\
--inner\n\
Content-Type: text/plain\n\
\n\
the secret\n\
--inner\n\
Content-Type: application/pdf; name=\"a.pdf\"\n\
Content-Transfer-Encoding: base64\n\
\n\
JVBERg==\n\
--inner--\n";

fn encrypted_part() -> MimeMessage {
    let mut part = MimeMessage::new();
    part.set_header("Content-Type", "application/octet-stream");
    part.set_body(CIPHERTEXT);
    part
}

#[test]
fn decrypt_failure_reports_gpg_output() {
    let gpg = FakeGpg::new();
    gpg.set_diagnostics("decryption failed: No secret key\n");
    gpg.set_exit_code(2);

    let outcome = gpg.manager().decrypt(&encrypted_part());

    let notice = outcome.notice().unwrap();
    assert_eq!(notice.status, CryptoStatus::Invalid);
    assert_eq!(notice.description, DECRYPTION_FAILED_DESCRIPTION);
    assert_eq!(notice.detail_lines, ["decryption failed: No secret key"]);
}

#[test]
fn decrypt_repairs_inner_multipart_and_finds_signature() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(INNER_MULTIPART);
    gpg.set_diagnostics(
        "gpg: encrypted with 3072-bit RSA key\ngpg: Good signature from \"Alice\" [ultimate]\n",
    );

    let decrypted = gpg
        .manager()
        .decrypt(&encrypted_part())
        .into_result()
        .unwrap();

    assert_eq!(decrypted.notice.status, CryptoStatus::Valid);
    assert_eq!(
        decrypted.notice.description,
        "This message has been decrypted for display"
    );
    let signature = decrypted.signature.unwrap();
    assert_eq!(signature.status, CryptoStatus::Valid);
    assert_eq!(signature.description, "Good signature from \"Alice\" [ultimate]");

    assert!(decrypted.message.is_multipart());
    let parts = decrypted.message.parts();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].body(), b"the secret");
    assert_eq!(parts[1].decoded_body().unwrap(), b"%PDF");
}

#[test]
fn decrypt_without_signature_claim_has_no_sub_result() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(b"Content-Type: text/plain\n\nplain secret\n");
    gpg.set_diagnostics("gpg: encrypted with 1 passphrase\n");

    let decrypted = gpg
        .manager()
        .decrypt(&encrypted_part())
        .into_result()
        .unwrap();

    assert!(decrypted.signature.is_none());
    assert_eq!(decrypted.message.body(), b"plain secret\n");
}

#[test]
fn decrypt_passes_payload_unformatted() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(b"\n");

    gpg.manager()
        .decrypt(&encrypted_part())
        .into_result()
        .unwrap();

    assert_eq!(gpg.last_input(), encrypted_part().to_bytes());
    assert!(gpg.invocations()[0].contains(" --yes --decrypt "));
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

#[test]
fn unusable_binary_never_runs() {
    let gpg = FakeGpg::new();
    fs::set_permissions(gpg.binary(), fs::Permissions::from_mode(0o644)).unwrap();
    let manager = gpg.manager();
    assert!(!manager.have_crypto());

    let verified = manager.verify(&signed_payload(), &signature_part());
    assert_eq!(verified.notice().unwrap().status, CryptoStatus::Unknown);
    assert_eq!(
        verified.notice().unwrap().detail_lines,
        ["Can't find gpg binary in path."]
    );
    assert!(!manager.decrypt(&encrypted_part()).is_completed());
    assert!(!manager.sign("a@x", &[], &signed_payload()).is_completed());
    assert!(gpg.invocations().is_empty());
}

#[test]
fn args_hook_rewrites_every_invocation() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(SIGNATURE);
    let manager = GpgManager::builder(&gpg.config())
        .hook(|args: &str| Some(format!("--trust-model always {args}")))
        .build();

    manager
        .sign("a@x", &[], &signed_payload())
        .into_result()
        .unwrap();
    let _ = manager.verify(&signed_payload(), &signature_part());

    for invocation in gpg.invocations() {
        assert!(invocation.starts_with(
            "--quiet --batch --no-verbose --logger-fd 1 --use-agent --trust-model always --"
        ));
    }
}

#[test]
fn interactive_runs_use_the_host_and_verify_stays_batch() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(SIGNATURE);
    gpg.set_diagnostics("gpg: Good signature from \"X\"\n");
    let host = Arc::new(RecordingHost::default());
    let mut config = gpg.config();
    config.interactive = true;
    let manager = GpgManager::builder(&config).host(host.clone()).build();

    manager
        .sign("a@x", &[], &signed_payload())
        .into_result()
        .unwrap();
    let notice = manager
        .verify(&signed_payload(), &signature_part())
        .into_result()
        .unwrap();

    assert_eq!(notice.status, CryptoStatus::Valid);
    assert_eq!(gpg.invocations().len(), 2);
    let commands = host.commands.lock().unwrap();
    assert_eq!(commands.len(), 1);
    assert!(commands[0].contains("--detach-sign"));
    assert!(commands[0].ends_with(" 2> /dev/null"));
}

#[test]
fn manager_serializes_concurrent_callers() {
    let gpg = FakeGpg::new();
    gpg.set_artifact(SIGNATURE);
    gpg.set_run_delay("0.1");
    let manager = Arc::new(gpg.manager());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || {
                manager
                    .sign(&format!("user{i}@x"), &[], &signed_payload())
                    .is_completed()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(gpg.invocations().len(), 4);
    assert!(!gpg.runs_overlapped(), "gpg ran twice at the same time");
}
