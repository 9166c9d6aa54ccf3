//! Classification of gpg's free-text diagnostics.
//!
//! gpg reports signature results as human-readable lines such as
//! `gpg: Good signature from "Alice <alice@example.org>"`. The patterns
//! are those of an English-locale GnuPG; other locales or wordings
//! classify as unknown (verify) or no signature (decrypt). Swap in a
//! different [`OutputClassifier`] to handle them.
//!
//! Classification never fails: any input, including empty or binary
//! garbage, produces a notice.

use crate::notice::{split_lines, CryptoNotice, CryptoStatus};

const LINE_PREFIX: &str = "gpg: ";
const SIGNATURE_FROM: &str = " signature from ";
const GOOD_SIGNATURE: &str = "good signature from ";
const BAD_SIGNATURE: &str = "bad signature from ";

/// Turns raw gpg output into notices.
pub trait OutputClassifier: Send + Sync {
    /// Classify the output of a `--verify` run.
    fn classify_verification(&self, output: &str, success: bool) -> CryptoNotice;

    /// Look for a signature verdict in the diagnostics of a successful
    /// decrypt. `None` means the message made no signature claim.
    fn embedded_signature(&self, output: &str) -> Option<CryptoNotice>;
}

/// Matches English GnuPG diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct GnupgClassifier;

impl OutputClassifier for GnupgClassifier {
    fn classify_verification(&self, output: &str, success: bool) -> CryptoNotice {
        let lines = split_lines(output);
        let summary = lines.iter().find_map(|line| {
            let rest = line.strip_prefix(LINE_PREFIX)?;
            rest.contains(SIGNATURE_FROM)
                .then(|| rest.trim_end_matches('\r').to_string())
        });
        match summary {
            Some(description) => {
                let status = if success {
                    CryptoStatus::Valid
                } else {
                    CryptoStatus::Invalid
                };
                CryptoNotice::new(status, description, lines)
            }
            None => CryptoNotice::unknown_status(lines),
        }
    }

    fn embedded_signature(&self, output: &str) -> Option<CryptoNotice> {
        let (status, description) = find_verdict(output, GOOD_SIGNATURE)
            .map(|d| (CryptoStatus::Valid, d))
            .or_else(|| find_verdict(output, BAD_SIGNATURE).map(|d| (CryptoStatus::Invalid, d)))?;
        Some(CryptoNotice::new(status, description, split_lines(output)))
    }
}

/// First line of `output` reading `gpg: <verdict>...`, ignoring ASCII
/// case. Returns the text after the prefix in its original case.
fn find_verdict(output: &str, verdict: &str) -> Option<String> {
    output.split('\n').find_map(|line| {
        let folded = line.to_ascii_lowercase();
        let rest = folded.strip_prefix(LINE_PREFIX)?;
        if !rest.starts_with(verdict) {
            return None;
        }
        // ASCII folding keeps byte offsets, so the prefix length carries over.
        line.get(LINE_PREFIX.len()..)
            .map(|tail| tail.trim_end_matches('\r').to_string())
    })
}

// ── Tests ──────────────────────────────────────────────────────────
