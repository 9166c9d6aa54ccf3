//! The fixed set of crypto operations and the outgoing-message menu.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseOperationError;

/// One of the five operations the manager performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoOperation {
    /// Detached signature, `multipart/signed`.
    Sign,
    /// Encryption to all recipients plus the sender, `multipart/encrypted`.
    Encrypt,
    /// Encryption with an embedded signature.
    SignAndEncrypt,
    /// Detached signature verification.
    Verify,
    /// Decryption (with embedded signature detection).
    Decrypt,
}

impl CryptoOperation {
    /// Operations offered when composing a message, in menu order.
    pub const OUTGOING: [Self; 3] = [Self::Sign, Self::SignAndEncrypt, Self::Encrypt];

    /// Menu label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sign => "Sign",
            Self::SignAndEncrypt => "Sign and encrypt",
            Self::Encrypt => "Encrypt only",
            Self::Verify => "Verify",
            Self::Decrypt => "Decrypt",
        }
    }

    /// Stable identifier (`sign`, `sign_and_encrypt`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sign => "sign",
            Self::Encrypt => "encrypt",
            Self::SignAndEncrypt => "sign_and_encrypt",
            Self::Verify => "verify",
            Self::Decrypt => "decrypt",
        }
    }

    /// Whether the operation produces an outgoing envelope.
    #[must_use]
    pub const fn is_outgoing(self) -> bool {
        matches!(self, Self::Sign | Self::Encrypt | Self::SignAndEncrypt)
    }
}

impl fmt::Display for CryptoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CryptoOperation {
    type Err = ParseOperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "sign" => Ok(Self::Sign),
            "encrypt" => Ok(Self::Encrypt),
            "sign_and_encrypt" => Ok(Self::SignAndEncrypt),
            "verify" => Ok(Self::Verify),
            "decrypt" => Ok(Self::Decrypt),
            _ => Err(ParseOperationError(s.to_string())),
        }
    }
}
