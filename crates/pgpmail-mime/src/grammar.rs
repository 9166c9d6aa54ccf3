//! Line grammar for header blocks and multipart boundary lines.
//!
//! Each parser takes one physical line (up to and including its `\n`).

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{line_ending, space0, space1};
use nom::combinator::{eof, map, opt, recognize};
use nom::sequence::{pair, terminated};
use nom::IResult;

/// What a line inside a header block is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderLine<'a> {
    /// The empty line ending the block; holds its line break.
    Blank(&'a [u8]),
    /// Start of a field; holds the field name.
    Field(&'a [u8]),
    /// Folded continuation of the previous field.
    Continuation,
}

/// A boundary line of a multipart body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BoundaryLine<'a> {
    /// `--boundary--` rather than `--boundary`.
    pub close: bool,
    /// Transport padding plus the line break, if the line had one.
    pub trail: &'a [u8],
}

const fn is_field_name_char(b: u8) -> bool {
    b.is_ascii_graphic() && b != b':'
}

/// `CRLF / LF`, `field-name ":"`, or leading whitespace.
pub(crate) fn header_line(line: &[u8]) -> IResult<&[u8], HeaderLine<'_>> {
    alt((
        map(line_ending, HeaderLine::Blank),
        map(
            terminated(take_while1(is_field_name_char), tag(":")),
            HeaderLine::Field,
        ),
        map(space1, |_| HeaderLine::Continuation),
    ))(line)
}

/// `"--" boundary ["--"] *WSP (CRLF / LF / end of input)`.
pub(crate) fn boundary_line<'a>(
    line: &'a [u8],
    boundary: &str,
) -> IResult<&'a [u8], BoundaryLine<'a>> {
    let (line, _) = tag("--")(line)?;
    let (line, _) = tag(boundary)(line)?;
    let (line, close) = opt(tag("--"))(line)?;
    let (line, trail) = recognize(pair(space0, alt((line_ending, eof))))(line)?;
    Ok((
        line,
        BoundaryLine {
            close: close.is_some(),
            trail,
        },
    ))
}

// ── Tests ──────────────────────────────────────────────────────────
