//! `pgpmail`: sign, encrypt, verify and decrypt PGP/MIME messages with gpg.
//!
//! Messages are read from `.eml` files. Envelopes and plaintext go to
//! stdout; notices are printed as JSON (stdout for `verify` and `status`,
//! stderr otherwise) and logs go to stderr.
//!
//! Exit codes: 0 on success, 1 when `verify` completes without a valid
//! signature, 2 on any error.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command as Process, ExitCode};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pgpmail_core::{
    CryptoNotice, CryptoOperation, CryptoOutcome, GpgConfig, GpgError, GpgManager, InteractiveHost,
};
use pgpmail_mime::MimeMessage;
use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "pgpmail", version, about = "PGP/MIME mail operations through gpg.")]
struct Cli {
    /// Directory holding `gpg.json`.
    #[arg(long, value_name = "DIR", global = true)]
    config: Option<PathBuf>,

    /// Run gpg in batch mode even if the configuration allows the terminal.
    #[arg(long, global = true)]
    no_interactive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report whether a gpg binary was found.
    Status,
    /// Wrap a message in a `multipart/signed` envelope.
    Sign {
        /// Signing identity.
        #[arg(long)]
        from: String,
        /// Recipients (accepted for symmetry with `encrypt`).
        #[arg(long)]
        to: Vec<String>,
        /// Message file.
        message: PathBuf,
    },
    /// Wrap a message in a `multipart/encrypted` envelope.
    Encrypt {
        /// Also sign as `--from`.
        #[arg(long)]
        sign: bool,
        /// Sender; always added to the recipients.
        #[arg(long)]
        from: String,
        /// Recipients.
        #[arg(long)]
        to: Vec<String>,
        /// Message file.
        message: PathBuf,
    },
    /// Check a `multipart/signed` message.
    Verify {
        /// Message file.
        message: PathBuf,
    },
    /// Decrypt a `multipart/encrypted` message (or a bare armored one).
    Decrypt {
        /// Message file.
        message: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
enum CliError {
    /// A message file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: io::Error,
    },

    /// `verify` was given something other than a two-part signed message.
    #[error("{} is not a multipart/signed message with a signature part", .0.display())]
    NotSigned(PathBuf),

    #[error(transparent)]
    Gpg(#[from] GpgError),

    #[error("cannot write output: {0}")]
    Write(#[from] io::Error),

    #[error("cannot render notice: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Interactive host
// ---------------------------------------------------------------------------

/// Hands the terminal to gpg by running it in the foreground with the
/// CLI's own stdin and tty.
struct TerminalHost;

impl InteractiveHost for TerminalHost {
    fn shell_out(&self, command: &str) -> io::Result<bool> {
        Ok(Process::new("sh").arg("-c").arg(command).status()?.success())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            let _ = writeln!(io::stderr(), "pgpmail: {err}");
            ExitCode::from(2)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::from_default_env().add_directive(
        "pgpmail=info"
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into()),
    );

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn build_manager(cli: &Cli) -> GpgManager {
    let mut config = cli
        .config
        .as_deref()
        .map_or_else(GpgConfig::default, GpgConfig::load);
    if cli.no_interactive {
        config.interactive = false;
    }
    let interactive = config.interactive;
    let builder = GpgManager::builder(&config);
    if interactive {
        builder.host(Arc::new(TerminalHost)).build()
    } else {
        builder.build()
    }
}

fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let manager = build_manager(cli);
    match &cli.command {
        Command::Status => {
            let status = serde_json::json!({
                "haveCrypto": manager.have_crypto(),
                "commandPrefix": manager.command_prefix(),
                "outgoing": CryptoOperation::OUTGOING.map(CryptoOperation::label),
            });
            print_json(&mut io::stdout(), &status)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Sign { from, to, message } => {
            let payload = read_message(message)?;
            let envelope = settle(manager.sign(from, to, &payload))?;
            write_envelope(envelope)
        }
        Command::Encrypt {
            sign,
            from,
            to,
            message,
        } => {
            let payload = read_message(message)?;
            let envelope = settle(manager.encrypt(from, to, &payload, *sign))?;
            write_envelope(envelope)
        }
        Command::Verify { message } => {
            let signed = read_message(message)?;
            let [payload, signature] = signed_parts(&signed)
                .ok_or_else(|| CliError::NotSigned(message.clone()))?;
            let notice = settle(manager.verify(payload, signature))?;
            print_json(&mut io::stdout(), &notice)?;
            Ok(if notice.is_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Command::Decrypt { message } => {
            let encrypted = read_message(message)?;
            let ciphertext = encrypted_part(&encrypted);
            let decrypted = settle(manager.decrypt(ciphertext))?;
            print_json(&mut io::stderr(), &decrypted)?;
            io::stdout().write_all(&decrypted.message.to_bytes())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_message(path: &Path) -> Result<MimeMessage, CliError> {
    let bytes = fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(MimeMessage::parse(&bytes))
}

/// Print a failure notice before handing back the error.
fn settle<T>(outcome: CryptoOutcome<T>) -> Result<T, CliError> {
    if let Some(notice) = outcome.notice() {
        print_notice(notice);
    }
    outcome.into_result().map_err(CliError::from)
}

fn print_notice(notice: &CryptoNotice) {
    if let Err(e) = print_json(&mut io::stderr(), notice) {
        tracing::warn!("could not print notice: {e}");
    }
}

fn print_json(out: &mut impl Write, value: &impl serde::Serialize) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_envelope(mut envelope: MimeMessage) -> Result<ExitCode, CliError> {
    envelope.set_header("MIME-Version", "1.0");
    io::stdout().write_all(&envelope.to_bytes())?;
    Ok(ExitCode::SUCCESS)
}

/// Payload and signature of a `multipart/signed` message.
fn signed_parts(message: &MimeMessage) -> Option<[&MimeMessage; 2]> {
    if message.content_type() != "multipart/signed" {
        return None;
    }
    match message.parts() {
        [payload, signature, ..] => Some([payload, signature]),
        _ => None,
    }
}

/// The armored part of a `multipart/encrypted` message, or the message
/// itself.
fn encrypted_part(message: &MimeMessage) -> &MimeMessage {
    match message.parts() {
        [_, data, ..] if message.content_type() == "multipart/encrypted" => data,
        _ => message,
    }
}

// ── Tests ──────────────────────────────────────────────────────────
