//! `pgpmail-mime` — Minimal MIME entity model for pgpmail.
//!
//! Exposes the capability set the PGP/MIME core needs from a mail message:
//! header mutation, body get/set, part attachment, multipart detection,
//! lenient parsing and byte-stable serialization.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod encoding;
pub mod error;
mod grammar;
pub mod header;
pub mod message;

pub use error::MimeError;
pub use header::Headers;
pub use message::{Body, Delimiter, MimeMessage, DEFAULT_CONTENT_TYPE};
