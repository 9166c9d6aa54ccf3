//! `pgpmail-core` — PGP/MIME operations backed by an external gpg binary.
//!
//! gpg does the cryptography; this crate canonicalizes payloads, runs gpg
//! (batch or through an interactive host), builds RFC 3156 envelopes and
//! classifies gpg's diagnostics into signature notices.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod config;
pub mod error;
pub mod operation;

pub mod format;
pub mod locator;
pub mod runner;

pub mod classify;
pub mod notice;

pub mod decrypt;
pub mod envelope;

pub mod manager;

pub use classify::{GnupgClassifier, OutputClassifier};
pub use config::GpgConfig;
pub use decrypt::{parse_decrypted, Decrypted};
pub use envelope::{encrypted_envelope, signed_envelope};
pub use error::{GpgError, ParseOperationError};
pub use format::format_payload;
pub use manager::{GpgManager, GpgManagerBuilder};
pub use notice::{CryptoNotice, CryptoOutcome, CryptoStatus};
pub use operation::CryptoOperation;
pub use runner::{
    ArgsHook, GpgInvocation, GpgOutput, InteractiveHost, GPG_ARGS_HOOK_DESCRIPTION,
    GPG_ARGS_HOOK_NAME,
};
