//! Content-Transfer-Encoding helpers.

use data_encoding::BASE64;

use crate::error::MimeError;

/// Maximum encoded line length for base64 bodies (RFC 2045 §6.8).
const BASE64_LINE_LEN: usize = 76;

/// Maximum line length for a body to qualify as `7bit` (RFC 5322).
const MAX_7BIT_LINE_LEN: usize = 998;

/// Decode `body` according to a `Content-Transfer-Encoding` value.
///
/// `None`, `7bit`, `8bit` and `binary` are identity encodings.
///
/// # Errors
///
/// - [`MimeError::InvalidBase64`] if a base64 body does not decode
/// - [`MimeError::UnsupportedEncoding`] for any other encoding name
pub fn decode(body: &[u8], encoding: Option<&str>) -> Result<Vec<u8>, MimeError> {
    let encoding = encoding.map(|e| e.trim().to_ascii_lowercase());
    match encoding.as_deref() {
        None | Some("" | "7bit" | "8bit" | "binary") => Ok(body.to_vec()),
        Some("base64") => decode_base64(body),
        Some("quoted-printable") => Ok(decode_quoted_printable(body)),
        Some(other) => Err(MimeError::UnsupportedEncoding(other.to_string())),
    }
}

fn decode_base64(body: &[u8]) -> Result<Vec<u8>, MimeError> {
    let compact: Vec<u8> = body
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    BASE64
        .decode(&compact)
        .map_err(|e| MimeError::InvalidBase64(e.to_string()))
}

fn hex_pair(high: u8, low: u8) -> Option<u8> {
    let digits = [high, low];
    let text = std::str::from_utf8(&digits).ok()?;
    u8::from_str_radix(text, 16).ok()
}

/// Lenient quoted-printable decoding: malformed escapes pass through.
fn decode_quoted_printable(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let mut rest = body;
    while let Some((&byte, tail)) = rest.split_first() {
        if byte != b'=' {
            out.push(byte);
            rest = tail;
            continue;
        }
        rest = match tail {
            [b'\r', b'\n', more @ ..] | [b'\n', more @ ..] => more,
            [high, low, more @ ..] => {
                if let Some(decoded) = hex_pair(*high, *low) {
                    out.push(decoded);
                    more
                } else {
                    out.push(b'=');
                    tail
                }
            }
            _ => {
                out.push(b'=');
                tail
            }
        };
    }
    out
}

/// Whether `body` can travel unencoded as `7bit`.
#[must_use]
pub fn is_7bit(body: &[u8]) -> bool {
    body.iter().all(|&b| b.is_ascii() && b != 0)
        && body
            .split(|&b| b == b'\n')
            .all(|line| line.len() <= MAX_7BIT_LINE_LEN)
}

/// Base64-encode `body`, wrapped at 76 columns with `\n`.
#[must_use]
pub fn encode_base64(body: &[u8]) -> Vec<u8> {
    let encoded = BASE64.encode(body);
    let mut out = Vec::with_capacity(encoded.len());
    for chunk in encoded.as_bytes().chunks(BASE64_LINE_LEN) {
        out.extend_from_slice(chunk);
        out.push(b'\n');
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────
