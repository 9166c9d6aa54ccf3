//! MIME entity: header block plus either a leaf body or child parts.
//!
//! Parsing is lenient and infallible. A *top-level* message is only
//! recognized as multipart when it carries a `MIME-Version` header
//! (RFC 2045 §4); nested parts are not held to that rule. Callers that
//! feed an inner part to [`MimeMessage::parse`] therefore see a leaf body,
//! which is what PGP/MIME decryption has to compensate for.
//!
//! Parsed entities keep the exact line breaks and transport padding of
//! their blank line and boundary lines, so they serialize back byte for
//! byte. Structure added through the API uses `\n` line endings.

use data_encoding::HEXLOWER;
use rand::RngCore;

use crate::encoding;
use crate::error::MimeError;
use crate::grammar::{self, BoundaryLine, HeaderLine};
use crate::header::{self, Headers};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Boundary used when a multipart entity lost its `boundary` parameter.
const FALLBACK_BOUNDARY: &str = "=_pgpmail_boundary";

/// Random bytes in a generated boundary.
const BOUNDARY_RAND_LEN: usize = 12;

/// Media type assumed when no `Content-Type` header is present.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Line break that ends a header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlankLine {
    Lf,
    CrLf,
    /// The body started without a blank line (or there was no body).
    Absent,
}

impl BlankLine {
    const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
            Self::Absent => b"",
        }
    }
}

/// Framing of one boundary line as it appeared on the wire.
///
/// `lead` is the line break before the line, which belongs to the
/// delimiter (RFC 2046 §5.1.1). `trail` is whatever follows the boundary
/// token (or the closing `--`): transport padding and the line break, if
/// the line had one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiter {
    /// Line break preceding the boundary line.
    pub lead: Vec<u8>,
    /// Padding and line break after the boundary token.
    pub trail: Vec<u8>,
}

impl Delimiter {
    /// Framing for a part added through the API.
    fn emitted(first: bool) -> Self {
        Self {
            lead: if first { Vec::new() } else { b"\n".to_vec() },
            trail: b"\n".to_vec(),
        }
    }

    fn write_to(&self, out: &mut Vec<u8>, boundary: &str, close: bool) {
        out.extend_from_slice(&self.lead);
        out.extend_from_slice(b"--");
        out.extend_from_slice(boundary.as_bytes());
        if close {
            out.extend_from_slice(b"--");
        }
        out.extend_from_slice(&self.trail);
    }
}

/// Body of a MIME entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Single-part body, kept in its transfer encoding.
    Leaf(Vec<u8>),
    /// Multipart body.
    Multipart {
        /// Text before the first delimiter line, if any.
        preamble: Option<Vec<u8>>,
        /// Child entities in wire order.
        parts: Vec<MimeMessage>,
        /// Framing of the delimiter line before each part. Parts without
        /// an entry get `\n` line breaks.
        delimiters: Vec<Delimiter>,
        /// Framing of the close delimiter line; `None` writes `\n--b--\n`.
        close: Option<Delimiter>,
        /// Text after the close delimiter line, if any.
        epilogue: Option<Vec<u8>>,
    },
}

/// A MIME entity (a whole message or one part of it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeMessage {
    headers: Headers,
    blank_line: BlankLine,
    body: Body,
}

impl Default for MimeMessage {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl MimeMessage {
    /// Empty entity: no headers, empty leaf body.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            headers: Headers::new(),
            blank_line: BlankLine::Lf,
            body: Body::Leaf(Vec::new()),
        }
    }

    /// Build an attachment part.
    ///
    /// Sets `Content-Type: <type>; name="<file>"` and
    /// `Content-Disposition: attachment; filename="<file>"`. ASCII bodies
    /// travel as `7bit`; anything else is base64-encoded.
    #[must_use]
    pub fn attachment(body: &[u8], content_type: &str, filename: &str) -> Self {
        let mut part = Self::new();
        part.set_header("Content-Type", &format!("{content_type}; name=\"{filename}\""));
        part.set_header(
            "Content-Disposition",
            &format!("attachment; filename=\"{filename}\""),
        );
        if encoding::is_7bit(body) {
            part.set_header("Content-Transfer-Encoding", "7bit");
            part.set_body(body.to_vec());
        } else {
            part.set_header("Content-Transfer-Encoding", "base64");
            part.set_body(encoding::encode_base64(body));
        }
        part
    }

    /// Parse a top-level message.
    #[must_use]
    pub fn parse(data: &[u8]) -> Self {
        Self::parse_entity(data, true)
    }

    /// Parse a nested body part (no `MIME-Version` requirement).
    #[must_use]
    pub fn parse_part(data: &[u8]) -> Self {
        Self::parse_entity(data, false)
    }

    fn parse_entity(data: &[u8], top_level: bool) -> Self {
        let (headers, blank_line, body) = split_header_block(data);
        let content_type = headers.get("Content-Type").unwrap_or_default();
        let multipart_allowed = !top_level || headers.contains("MIME-Version");

        if multipart_allowed && header::media_type(&content_type).starts_with("multipart/") {
            if let Some(boundary) = header::parameter(&content_type, "boundary") {
                if let Some(split) = split_multipart(body, &boundary) {
                    return Self {
                        headers,
                        blank_line,
                        body: Body::Multipart {
                            preamble: split.preamble,
                            parts: split.parts.into_iter().map(Self::parse_part).collect(),
                            delimiters: split.delimiters,
                            close: split.close,
                            epilogue: split.epilogue,
                        },
                    };
                }
            }
        }

        Self {
            headers,
            blank_line,
            body: Body::Leaf(body.to_vec()),
        }
    }
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

impl MimeMessage {
    /// Header block.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Unfolded value of the first header named `name`.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name)
    }

    /// Set a header, replacing any existing field with that name.
    ///
    /// Replacing the `Content-Type` of a multipart entity keeps its
    /// boundary when the new value does not carry one.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("Content-Type") && self.is_multipart() {
            if let Some(boundary) = self.content_type_param("boundary") {
                if header::parameter(value, "boundary").is_none() {
                    self.headers
                        .set(name, &format!("{value}; boundary=\"{boundary}\""));
                    return;
                }
            }
        }
        self.headers.set(name, value);
    }

    /// Append a header without touching existing fields.
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.add(name, value);
    }

    /// Remove every header named `name`.
    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    /// Lowercased media type, `text/plain` when absent.
    #[must_use]
    pub fn content_type(&self) -> String {
        self.header("Content-Type")
            .map(|value| header::media_type(&value))
            .filter(|media| !media.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
    }

    /// Parameter of the `Content-Type` header.
    #[must_use]
    pub fn content_type_param(&self, name: &str) -> Option<String> {
        self.header("Content-Type")
            .and_then(|value| header::parameter(&value, name))
    }

    /// Attachment filename from `Content-Disposition` or `Content-Type`.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.header("Content-Disposition")
            .and_then(|value| header::parameter(&value, "filename"))
            .or_else(|| self.content_type_param("name"))
    }
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

impl MimeMessage {
    /// Whether the body holds child parts.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Multipart { .. })
    }

    /// Child parts; empty for a leaf entity.
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        match &self.body {
            Body::Multipart { parts, .. } => parts,
            Body::Leaf(_) => &[],
        }
    }

    /// Raw leaf body; empty for a multipart entity.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        match &self.body {
            Body::Leaf(bytes) => bytes,
            Body::Multipart { .. } => &[],
        }
    }

    /// Full body structure.
    #[must_use]
    pub const fn body_kind(&self) -> &Body {
        &self.body
    }

    /// Replace the body with a leaf body, discarding any parts.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = Body::Leaf(body.into());
    }

    /// Leaf body with its `Content-Transfer-Encoding` removed.
    ///
    /// # Errors
    ///
    /// Returns [`MimeError`] when the body does not match its declared
    /// encoding or the encoding is unknown.
    pub fn decoded_body(&self) -> Result<Vec<u8>, MimeError> {
        let cte = self.header("Content-Transfer-Encoding");
        encoding::decode(self.body(), cte.as_deref())
    }

    /// Append a child part.
    ///
    /// A leaf entity becomes multipart; a non-empty leaf body is kept as
    /// the first part. The `Content-Type` gains a generated boundary if it
    /// has none (`multipart/mixed` is assumed when the header is missing).
    pub fn add_part(&mut self, part: Self) {
        self.ensure_boundary();
        match &mut self.body {
            Body::Multipart { parts, .. } => parts.push(part),
            Body::Leaf(existing) => {
                let existing = std::mem::take(existing);
                let mut parts = Vec::with_capacity(2);
                if !existing.is_empty() {
                    let mut first = Self::new();
                    first.set_body(existing);
                    parts.push(first);
                }
                parts.push(part);
                self.body = Body::Multipart {
                    preamble: None,
                    parts,
                    delimiters: Vec::new(),
                    close: None,
                    epilogue: None,
                };
            }
        }
    }

    fn ensure_boundary(&mut self) {
        match self.header("Content-Type") {
            Some(value) if header::parameter(&value, "boundary").is_some() => {}
            Some(value) => self.headers.set(
                "Content-Type",
                &format!("{value}; boundary=\"{}\"", generate_boundary()),
            ),
            None => self.headers.set(
                "Content-Type",
                &format!("multipart/mixed; boundary=\"{}\"", generate_boundary()),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

impl MimeMessage {
    /// Serialize to wire bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        self.headers.write_to(out);
        out.extend_from_slice(self.blank_line().as_bytes());
        match &self.body {
            Body::Leaf(bytes) => out.extend_from_slice(bytes),
            Body::Multipart {
                preamble,
                parts,
                delimiters,
                close,
                epilogue,
            } => {
                let boundary = self
                    .content_type_param("boundary")
                    .unwrap_or_else(|| FALLBACK_BOUNDARY.to_string());
                if let Some(preamble) = preamble {
                    out.extend_from_slice(preamble);
                }
                for (index, part) in parts.iter().enumerate() {
                    match delimiters.get(index) {
                        Some(delimiter) => delimiter.write_to(out, &boundary, false),
                        None => Delimiter::emitted(index == 0 && preamble.is_none())
                            .write_to(out, &boundary, false),
                    }
                    part.write_to(out);
                }
                match close {
                    Some(close) => close.write_to(out, &boundary, true),
                    None => Delimiter::emitted(false).write_to(out, &boundary, true),
                }
                if let Some(epilogue) = epilogue {
                    out.extend_from_slice(epilogue);
                }
            }
        }
    }
}

impl MimeMessage {
    /// Blank line to emit. A missing one is only reproduced while the
    /// headers and the body cannot run into each other.
    fn blank_line(&self) -> BlankLine {
        let body_empty = matches!(&self.body, Body::Leaf(bytes) if bytes.is_empty());
        match self.blank_line {
            BlankLine::Absent if !self.headers.is_empty() && !body_empty => BlankLine::Lf,
            blank_line => blank_line,
        }
    }
}

impl std::fmt::Display for MimeMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn generate_boundary() -> String {
    let mut bytes = [0u8; BOUNDARY_RAND_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("=_{}", HEXLOWER.encode(&bytes))
}

/// Split `data` into its header block and the body that follows the
/// first blank line. A line that is neither a field nor a continuation
/// ends the header block and starts the body.
fn split_header_block(data: &[u8]) -> (Headers, BlankLine, &[u8]) {
    let mut headers = Headers::new();
    let mut offset = 0usize;

    for line in data.split_inclusive(|&b| b == b'\n') {
        let text = || String::from_utf8_lossy(line.strip_suffix(b"\n").unwrap_or(line));
        let accepted = match grammar::header_line(line) {
            Ok((_, HeaderLine::Blank(line_break))) => {
                let blank_line = if line_break == b"\r\n" {
                    BlankLine::CrLf
                } else {
                    BlankLine::Lf
                };
                let body_start = offset.saturating_add(line.len());
                return (headers, blank_line, &data[body_start..]);
            }
            Ok((_, HeaderLine::Field(name))) => {
                headers.push_raw(&String::from_utf8_lossy(name), &text());
                true
            }
            Ok((_, HeaderLine::Continuation)) => headers.continue_raw(&text()),
            Err(_) => false,
        };
        if !accepted {
            return (headers, BlankLine::Absent, &data[offset..]);
        }
        offset = offset.saturating_add(line.len());
    }

    (headers, BlankLine::Absent, &data[data.len()..])
}

struct MultipartSplit<'a> {
    preamble: Option<Vec<u8>>,
    parts: Vec<&'a [u8]>,
    delimiters: Vec<Delimiter>,
    close: Option<Delimiter>,
    epilogue: Option<Vec<u8>>,
}

/// Position of the line break that precedes a delimiter line at `pos`.
/// The break belongs to the delimiter (RFC 2046 §5.1.1).
fn before_line_break(data: &[u8], pos: usize) -> usize {
    let Some(lf) = pos.checked_sub(1).filter(|&i| data[i] == b'\n') else {
        return pos;
    };
    lf.checked_sub(1).filter(|&i| data[i] == b'\r').unwrap_or(lf)
}

fn split_multipart<'a>(data: &'a [u8], boundary: &str) -> Option<MultipartSplit<'a>> {
    let mut preamble = None;
    let mut parts = Vec::new();
    let mut delimiters = Vec::new();
    let mut part_start: Option<usize> = None;
    let mut offset = 0usize;

    for line in data.split_inclusive(|&b| b == b'\n') {
        let line_start = offset;
        offset = offset.saturating_add(line.len());

        let Ok((_, BoundaryLine { close, trail })) = grammar::boundary_line(line, boundary) else {
            continue;
        };

        // The break before the line never reaches back past the start of
        // the current part; an empty part keeps its break in the previous
        // delimiter's trail.
        let lead_start = before_line_break(data, line_start).max(part_start.unwrap_or(0));
        match part_start {
            Some(start) => parts.push(&data[start..lead_start]),
            None if line_start > 0 => preamble = Some(data[..lead_start].to_vec()),
            None => {}
        }
        let framing = Delimiter {
            lead: data[lead_start..line_start].to_vec(),
            trail: trail.to_vec(),
        };

        if close {
            if part_start.is_none() {
                return None;
            }
            let rest = &data[offset..];
            let epilogue = (!rest.is_empty()).then(|| rest.to_vec());
            return Some(MultipartSplit {
                preamble,
                parts,
                delimiters,
                close: Some(framing),
                epilogue,
            });
        }
        delimiters.push(framing);
        part_start = Some(offset);
    }

    // Unterminated multipart: the last part runs to the end of the data and
    // serializing adds the missing close delimiter.
    let start = part_start?;
    parts.push(&data[start..]);
    Some(MultipartSplit {
        preamble,
        parts,
        delimiters,
        close: None,
        epilogue: None,
    })
}

// ── Tests ──────────────────────────────────────────────────────────
