//! Payload canonicalization and shell quoting.
//!
//! OpenPGP signing and encryption in text mode expect canonical `\r\n`
//! line endings. The enclosing PGP/MIME envelope supplies its own
//! `MIME-Version`, so any such line is dropped from the payload.

use std::path::Path;

/// Header removed from payloads before they reach gpg.
const MIME_VERSION_PREFIX: &[u8] = b"MIME-Version:";

/// Canonicalize a serialized payload for gpg.
///
/// Every `\n` not already preceded by `\r` becomes `\r\n`, then every
/// line starting with `MIME-Version:` is removed.
#[must_use]
pub fn format_payload(payload: &[u8]) -> Vec<u8> {
    let mut crlf = Vec::with_capacity(payload.len());
    let mut previous = None;
    for &byte in payload {
        if byte == b'\n' && previous != Some(b'\r') {
            crlf.push(b'\r');
        }
        crlf.push(byte);
        previous = Some(byte);
    }

    let mut out = Vec::with_capacity(crlf.len());
    for line in crlf.split_inclusive(|&b| b == b'\n') {
        if !line.starts_with(MIME_VERSION_PREFIX) {
            out.extend_from_slice(line);
        }
    }
    out
}

/// Wrap `value` in single quotes for `sh`, escaping embedded quotes.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len().saturating_add(2));
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

/// [`shell_quote`] for a filesystem path.
#[must_use]
pub fn quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

// ── Tests ──────────────────────────────────────────────────────────
