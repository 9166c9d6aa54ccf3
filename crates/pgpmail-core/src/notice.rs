//! Signature/decryption status notices and the per-operation outcome type.
//!
//! Every public operation returns a [`CryptoOutcome`]: either the value it
//! produced, or a failure that carries both the typed [`GpgError`] and a
//! ready-to-display [`CryptoNotice`]. Callers decide whether to propagate
//! ([`CryptoOutcome::into_result`]) or absorb ([`CryptoOutcome::notice`]).

use serde::{Deserialize, Serialize};

use crate::error::GpgError;
use crate::operation::CryptoOperation;

// ---------------------------------------------------------------------------
// Fixed descriptions
// ---------------------------------------------------------------------------

/// Description used whenever the signature state cannot be determined.
pub const UNKNOWN_STATUS_DESCRIPTION: &str =
    "Unable to determine validity of cryptographic signature";

/// Detail line reported when no gpg binary is available.
pub const BINARY_MISSING_LINE: &str = "Can't find gpg binary in path.";

/// Description of a failed decryption.
pub const DECRYPTION_FAILED_DESCRIPTION: &str = "This message could not be decrypted";

/// Description of a successful decryption.
pub const DECRYPTED_FOR_DISPLAY_DESCRIPTION: &str = "This message has been decrypted for display";

/// Description of a failed sign/encrypt run.
pub const COMMAND_FAILED_DESCRIPTION: &str = "GPG command failed. See log for details.";

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

/// Three-valued signature status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CryptoStatus {
    /// Signature verified / message decrypted.
    Valid,
    /// Signature bad or operation failed.
    Invalid,
    /// Nothing conclusive could be determined.
    Unknown,
}

/// Status, a human-readable description and the tool's raw output lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoNotice {
    /// Classification result.
    pub status: CryptoStatus,
    /// One-line summary for display.
    pub description: String,
    /// gpg output, verbatim and in order.
    pub detail_lines: Vec<String>,
}

impl CryptoNotice {
    /// Build a notice.
    #[must_use]
    pub fn new(status: CryptoStatus, description: impl Into<String>, detail_lines: Vec<String>) -> Self {
        Self {
            status,
            description: description.into(),
            detail_lines,
        }
    }

    /// `Unknown` notice with the fixed undetermined-validity description.
    #[must_use]
    pub fn unknown_status(detail_lines: Vec<String>) -> Self {
        Self::new(CryptoStatus::Unknown, UNKNOWN_STATUS_DESCRIPTION, detail_lines)
    }

    /// `Unknown` notice for a missing gpg binary.
    #[must_use]
    pub fn binary_missing() -> Self {
        Self::unknown_status(vec![BINARY_MISSING_LINE.to_string()])
    }

    /// `Valid` notice shown above decrypted content.
    #[must_use]
    pub fn decrypted_for_display() -> Self {
        Self::new(CryptoStatus::Valid, DECRYPTED_FOR_DISPLAY_DESCRIPTION, Vec::new())
    }

    /// Whether the status is `Valid`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.status == CryptoStatus::Valid
    }
}

/// Split tool output into lines the way it is shown to users: on `\n`,
/// keeping any `\r`, without trailing empty lines.
#[must_use]
pub fn split_lines(output: &str) -> Vec<String> {
    let mut lines: Vec<String> = output.split('\n').map(str::to_string).collect();
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of one manager operation.
#[derive(Debug)]
#[must_use = "an outcome may carry a failure notice that should be shown"]
pub enum CryptoOutcome<T> {
    /// The operation ran and produced a value.
    Completed(T),
    /// The operation could not complete.
    Failed {
        /// What went wrong.
        error: GpgError,
        /// User-facing rendering of the failure.
        notice: CryptoNotice,
    },
}

impl<T> CryptoOutcome<T> {
    /// Build a failure outcome, rendering `error` for `operation`.
    pub fn failed(operation: CryptoOperation, error: GpgError) -> Self {
        let notice = failure_notice(operation, &error);
        Self::Failed { error, notice }
    }

    /// Wrap a `Result`, rendering errors for `operation`.
    pub fn from_result(operation: CryptoOperation, result: Result<T, GpgError>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(error) => Self::failed(operation, error),
        }
    }

    /// Whether the operation completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Failure notice, if the operation failed.
    #[must_use]
    pub const fn notice(&self) -> Option<&CryptoNotice> {
        match self {
            Self::Completed(_) => None,
            Self::Failed { notice, .. } => Some(notice),
        }
    }

    /// Failure error, if the operation failed.
    #[must_use]
    pub const fn error(&self) -> Option<&GpgError> {
        match self {
            Self::Completed(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    /// Produced value, discarding any failure.
    #[must_use]
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Failed { .. } => None,
        }
    }

    /// Propagate instead of absorbing.
    ///
    /// # Errors
    ///
    /// Returns the carried [`GpgError`] if the operation failed.
    pub fn into_result(self) -> Result<T, GpgError> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Failed { error, .. } => Err(error),
        }
    }

    /// Transform the produced value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CryptoOutcome<U> {
        match self {
            Self::Completed(value) => CryptoOutcome::Completed(f(value)),
            Self::Failed { error, notice } => CryptoOutcome::Failed { error, notice },
        }
    }
}

impl CryptoOutcome<CryptoNotice> {
    /// The notice to show, whether the operation completed or not.
    #[must_use]
    pub fn into_notice(self) -> CryptoNotice {
        match self {
            Self::Completed(notice) | Self::Failed { notice, .. } => notice,
        }
    }
}

/// Render `error` as the notice a user sees for `operation`.
fn failure_notice(operation: CryptoOperation, error: &GpgError) -> CryptoNotice {
    let failed_description = match operation {
        CryptoOperation::Decrypt => DECRYPTION_FAILED_DESCRIPTION,
        _ => COMMAND_FAILED_DESCRIPTION,
    };
    match error {
        GpgError::BinaryUnavailable => CryptoNotice::binary_missing(),
        GpgError::CommandFailure { output } => {
            CryptoNotice::new(CryptoStatus::Invalid, failed_description, split_lines(output))
        }
        GpgError::NotOutgoing(_) => CryptoNotice::unknown_status(vec![error.to_string()]),
        GpgError::Mime(_) | GpgError::Io(_) if operation == CryptoOperation::Verify => {
            CryptoNotice::unknown_status(vec![error.to_string()])
        }
        GpgError::Mime(_) | GpgError::Io(_) => {
            CryptoNotice::new(CryptoStatus::Invalid, failed_description, vec![error.to_string()])
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
