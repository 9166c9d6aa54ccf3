//! The gpg-backed crypto manager.
//!
//! A [`GpgManager`] is built once from a [`GpgConfig`] and shared (by
//! reference or `Arc`) with whatever composes or displays mail. Every
//! operation holds the manager's lock from formatting the payload until
//! the result is parsed, so at most one gpg process runs at a time and
//! interactive runs never fight over the terminal.
//!
//! # Flow
//!
//! ```text
//! payload ─► format_payload ─► temp file ─► Runner (gpg) ─┬─► envelope      (sign, encrypt)
//!                                                         └─► classifier    (verify, decrypt)
//! ```

use std::fs;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use pgpmail_mime::MimeMessage;
use tempfile::NamedTempFile;

use crate::classify::{GnupgClassifier, OutputClassifier};
use crate::config::GpgConfig;
use crate::decrypt::{parse_decrypted, Decrypted};
use crate::envelope::{encrypted_envelope, signed_envelope};
use crate::error::GpgError;
use crate::format::{format_payload, quote_path, shell_quote};
use crate::locator::{command_prefix, locate_binary};
use crate::notice::{CryptoNotice, CryptoOutcome};
use crate::operation::CryptoOperation;
use crate::runner::{ArgsHook, GpgInvocation, GpgOutput, InteractiveHost, Runner};

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Runs PGP/MIME operations through an external gpg binary.
pub struct GpgManager {
    command: Option<String>,
    interactive: bool,
    lock: Mutex<()>,
    hook: Option<Box<dyn ArgsHook>>,
    host: Option<Arc<dyn InteractiveHost>>,
    classifier: Box<dyn OutputClassifier>,
}

impl GpgManager {
    /// Locate gpg per `config`, with no hook, no interactive host and the
    /// default classifier.
    #[must_use]
    pub fn new(config: &GpgConfig) -> Self {
        Self::builder(config).build()
    }

    /// Start customizing a manager for `config`.
    #[must_use]
    pub fn builder(config: &GpgConfig) -> GpgManagerBuilder {
        GpgManagerBuilder {
            command: locate_binary(config)
                .map(|binary| command_prefix(&binary, config.homedir.as_deref())),
            interactive: config.interactive,
            hook: None,
            host: None,
            classifier: Box::new(GnupgClassifier),
        }
    }

    /// Whether a gpg binary was found.
    #[must_use]
    pub const fn have_crypto(&self) -> bool {
        self.command.is_some()
    }

    /// Command prefix every invocation starts with, if gpg was found.
    #[must_use]
    pub fn command_prefix(&self) -> Option<&str> {
        self.command.as_deref()
    }

    // -- Outgoing --------------------------------------------------------

    /// Detach-sign `payload` as `from`.
    ///
    /// `to` is unused; it is accepted so all outgoing operations share
    /// one shape (see [`Self::dispatch_outgoing`]).
    pub fn sign(
        &self,
        from: &str,
        _to: &[String],
        payload: &MimeMessage,
    ) -> CryptoOutcome<MimeMessage> {
        let _guard = self.lock();
        CryptoOutcome::from_result(CryptoOperation::Sign, self.sign_inner(from, payload))
    }

    fn sign_inner(&self, from: &str, payload: &MimeMessage) -> Result<MimeMessage, GpgError> {
        self.ensure_binary()?;
        let payload_file = write_temp("pgpmail.payload", &format_payload(&payload.to_bytes()))?;
        let signature_file = empty_temp("pgpmail.signature")?;

        let args = format!(
            "--output {} --yes --armor --detach-sign --textmode --local-user {} {}",
            quote_path(signature_file.path()),
            shell_quote(from),
            quote_path(payload_file.path()),
        );
        checked(self.run(args, self.interactive)?)?;

        let signature = fs::read(signature_file.path())?;
        Ok(signed_envelope(payload, &signature))
    }

    /// Encrypt `payload` to every address in `to` and to `from`,
    /// optionally signing it as `from`.
    pub fn encrypt(
        &self,
        from: &str,
        to: &[String],
        payload: &MimeMessage,
        sign: bool,
    ) -> CryptoOutcome<MimeMessage> {
        let _guard = self.lock();
        let operation = if sign {
            CryptoOperation::SignAndEncrypt
        } else {
            CryptoOperation::Encrypt
        };
        CryptoOutcome::from_result(operation, self.encrypt_inner(from, to, payload, sign))
    }

    fn encrypt_inner(
        &self,
        from: &str,
        to: &[String],
        payload: &MimeMessage,
        sign: bool,
    ) -> Result<MimeMessage, GpgError> {
        self.ensure_binary()?;
        let payload_file = write_temp("pgpmail.payload", &format_payload(&payload.to_bytes()))?;
        let encrypted_file = empty_temp("pgpmail.encrypted")?;

        let mut args = format!(
            "--output {} --yes --armor --encrypt --textmode",
            quote_path(encrypted_file.path())
        );
        if sign {
            args.push_str(" --sign --local-user ");
            args.push_str(&shell_quote(from));
        }
        for recipient in to.iter().map(String::as_str).chain([from]) {
            args.push_str(" --recipient ");
            args.push_str(&shell_quote(&format!("<{recipient}>")));
        }
        args.push(' ');
        args.push_str(&quote_path(payload_file.path()));
        checked(self.run(args, self.interactive)?)?;

        let ciphertext = fs::read(encrypted_file.path())?;
        Ok(encrypted_envelope(&ciphertext))
    }

    /// [`Self::encrypt`] with signing.
    pub fn sign_and_encrypt(
        &self,
        from: &str,
        to: &[String],
        payload: &MimeMessage,
    ) -> CryptoOutcome<MimeMessage> {
        self.encrypt(from, to, payload, true)
    }

    /// Run the outgoing operation `operation`.
    ///
    /// Verify and decrypt fail with [`GpgError::NotOutgoing`].
    pub fn dispatch_outgoing(
        &self,
        operation: CryptoOperation,
        from: &str,
        to: &[String],
        payload: &MimeMessage,
    ) -> CryptoOutcome<MimeMessage> {
        match operation {
            CryptoOperation::Sign => self.sign(from, to, payload),
            CryptoOperation::Encrypt => self.encrypt(from, to, payload, false),
            CryptoOperation::SignAndEncrypt => self.sign_and_encrypt(from, to, payload),
            CryptoOperation::Verify | CryptoOperation::Decrypt => {
                CryptoOutcome::failed(operation, GpgError::NotOutgoing(operation))
            }
        }
    }

    // -- Incoming --------------------------------------------------------

    /// Check a detached `signature` part against `payload`.
    ///
    /// Output gpg's wording does not match still completes, as `Unknown`.
    pub fn verify(
        &self,
        payload: &MimeMessage,
        signature: &MimeMessage,
    ) -> CryptoOutcome<CryptoNotice> {
        let _guard = self.lock();
        CryptoOutcome::from_result(CryptoOperation::Verify, self.verify_inner(payload, signature))
    }

    fn verify_inner(
        &self,
        payload: &MimeMessage,
        signature: &MimeMessage,
    ) -> Result<CryptoNotice, GpgError> {
        self.ensure_binary()?;
        let payload_file = write_temp("pgpmail.payload", &format_payload(&payload.to_bytes()))?;
        let signature_file = write_temp("pgpmail.signature", &signature.decoded_body()?)?;

        let args = format!(
            "--verify {} {}",
            quote_path(signature_file.path()),
            quote_path(payload_file.path()),
        );
        let output = self.run(args, false)?;
        Ok(self
            .classifier
            .classify_verification(&output.text, output.success))
    }

    /// Decrypt `payload` (normally the ciphertext part of a
    /// `multipart/encrypted` message).
    pub fn decrypt(&self, payload: &MimeMessage) -> CryptoOutcome<Decrypted> {
        let _guard = self.lock();
        CryptoOutcome::from_result(CryptoOperation::Decrypt, self.decrypt_inner(payload))
    }

    fn decrypt_inner(&self, payload: &MimeMessage) -> Result<Decrypted, GpgError> {
        self.ensure_binary()?;
        let payload_file = write_temp("pgpmail.payload", &payload.to_bytes())?;
        let plaintext_file = empty_temp("pgpmail.plaintext")?;

        let args = format!(
            "--output {} --yes --decrypt {}",
            quote_path(plaintext_file.path()),
            quote_path(payload_file.path()),
        );
        let output = checked(self.run(args, self.interactive)?)?;

        let plaintext = fs::read(plaintext_file.path())?;
        Ok(Decrypted {
            notice: CryptoNotice::decrypted_for_display(),
            signature: self.classifier.embedded_signature(&output.text),
            message: parse_decrypted(&plaintext),
        })
    }

    // -- Plumbing --------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("crypto: recovering poisoned gpg lock");
            poisoned.into_inner()
        })
    }

    fn ensure_binary(&self) -> Result<(), GpgError> {
        if self.have_crypto() {
            Ok(())
        } else {
            Err(GpgError::BinaryUnavailable)
        }
    }

    fn run(&self, args: String, interactive: bool) -> Result<GpgOutput, GpgError> {
        let prefix = self.command.as_deref().ok_or(GpgError::BinaryUnavailable)?;
        let host = self.host.as_deref();
        Runner::new(prefix, self.hook.as_deref(), host).run(&GpgInvocation { args, interactive })
    }
}

/// Turn an unsuccessful run into [`GpgError::CommandFailure`].
fn checked(output: GpgOutput) -> Result<GpgOutput, GpgError> {
    if output.success {
        Ok(output)
    } else {
        tracing::info!("Error while running gpg: {}", output.text);
        Err(GpgError::CommandFailure {
            output: output.text,
        })
    }
}

fn write_temp(prefix: &str, contents: &[u8]) -> Result<NamedTempFile, GpgError> {
    let mut file = empty_temp(prefix)?;
    file.write_all(contents)?;
    file.flush()?;
    Ok(file)
}

fn empty_temp(prefix: &str) -> Result<NamedTempFile, GpgError> {
    Ok(tempfile::Builder::new().prefix(prefix).tempfile()?)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Customizes a [`GpgManager`] before it is built.
pub struct GpgManagerBuilder {
    command: Option<String>,
    interactive: bool,
    hook: Option<Box<dyn ArgsHook>>,
    host: Option<Arc<dyn InteractiveHost>>,
    classifier: Box<dyn OutputClassifier>,
}

impl GpgManagerBuilder {
    /// Install the `gpg-args` hook.
    #[must_use]
    pub fn hook(mut self, hook: impl ArgsHook + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Install the host that runs interactive invocations.
    #[must_use]
    pub fn host(mut self, host: Arc<dyn InteractiveHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Replace the output classifier.
    #[must_use]
    pub fn classifier(mut self, classifier: impl OutputClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// Finish.
    #[must_use]
    pub fn build(self) -> GpgManager {
        GpgManager {
            command: self.command,
            interactive: self.interactive,
            lock: Mutex::new(()),
            hook: self.hook,
            host: self.host,
            classifier: self.classifier,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
