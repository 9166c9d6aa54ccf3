//! gpg subprocess execution.
//!
//! One [`GpgInvocation`] becomes one shell command line:
//! `<prefix> <args>`, where `args` may first be rewritten by the
//! `gpg-args` hook. Interactive invocations are handed to an
//! [`InteractiveHost`] when one is installed so gpg can own the terminal
//! (passphrase entry); everything else runs under `sh -c` with stdout
//! captured and stderr discarded.
//!
//! A nonzero exit is reported through [`GpgOutput::success`], never as an
//! error. Only a failure to spawn or to create the capture file is.

use std::fs;
use std::io;
use std::process::{Command, Stdio};

use crate::error::GpgError;
use crate::format::quote_path;

// ---------------------------------------------------------------------------
// Extension points
// ---------------------------------------------------------------------------

/// Name of the argument-rewriting extension point.
pub const GPG_ARGS_HOOK_NAME: &str = "gpg-args";

/// What the `gpg-args` hook is for, as shown to users configuring it.
pub const GPG_ARGS_HOOK_DESCRIPTION: &str = "\
Runs before gpg is executed, allowing you to modify the arguments (most
likely you would want to add something to certain commands, like
--trust-model always to signing/encrypting a message, but who knows).

Variables:
args: arguments for running GPG

Return value: the arguments for running GPG";

/// Literal output reported when an interactive run left no readable capture.
pub const UNREADABLE_OUTPUT: &str = "can't read output";

/// The `gpg-args` hook: may replace the argument string of every
/// invocation. `None` keeps the arguments unchanged.
pub trait ArgsHook: Send + Sync {
    /// Rewrite `args`, or return `None` to leave them alone.
    fn gpg_args(&self, args: &str) -> Option<String>;
}

impl<F> ArgsHook for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn gpg_args(&self, args: &str) -> Option<String> {
        self(args)
    }
}

/// A UI that can suspend its own display and run one blocking foreground
/// shell command.
pub trait InteractiveHost: Send + Sync {
    /// Run `command` to completion with the terminal handed over.
    ///
    /// Returns whether the command exited successfully.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the command could not be started.
    fn shell_out(&self, command: &str) -> io::Result<bool>;
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// One gpg call: operation flags and whether it may need the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpgInvocation {
    /// Operation-specific arguments (without the fixed prefix).
    pub args: String,
    /// Whether gpg may need direct terminal access.
    pub interactive: bool,
}

/// Captured result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpgOutput {
    /// Everything gpg wrote to the captured stream (lossy UTF-8).
    pub text: String,
    /// Whether gpg exited with status 0.
    pub success: bool,
}

/// Executes invocations against a fixed command prefix.
pub struct Runner<'a> {
    prefix: &'a str,
    hook: Option<&'a dyn ArgsHook>,
    host: Option<&'a dyn InteractiveHost>,
}

impl<'a> Runner<'a> {
    /// Runner for `prefix` with optional hook and host.
    #[must_use]
    pub fn new(
        prefix: &'a str,
        hook: Option<&'a dyn ArgsHook>,
        host: Option<&'a dyn InteractiveHost>,
    ) -> Self {
        Self { prefix, hook, host }
    }

    /// Full command line for `invocation`, after the hook ran.
    #[must_use]
    pub fn command_line(&self, invocation: &GpgInvocation) -> String {
        let args = self
            .hook
            .and_then(|hook| hook.gpg_args(&invocation.args))
            .unwrap_or_else(|| invocation.args.clone());
        format!("{} {args}", self.prefix)
    }

    /// Execute `invocation`.
    ///
    /// # Errors
    ///
    /// Returns [`GpgError::Io`] if the process or capture file cannot be
    /// created. A nonzero gpg exit is not an error.
    pub fn run(&self, invocation: &GpgInvocation) -> Result<GpgOutput, GpgError> {
        let command = self.command_line(invocation);
        match self.host {
            Some(host) if invocation.interactive => Self::run_hosted(host, &command),
            _ => Self::run_captured(&command),
        }
    }

    fn run_hosted(host: &dyn InteractiveHost, command: &str) -> Result<GpgOutput, GpgError> {
        let capture = tempfile::Builder::new()
            .prefix("pgpmail.capture")
            .tempfile()?;
        let command = format!("{command} > {} 2> /dev/null", quote_path(capture.path()));
        tracing::debug!("crypto: running: {command}");

        let success = host.shell_out(&command)?;
        let text = fs::read(capture.path()).map_or_else(
            |e| {
                tracing::warn!("could not read gpg output capture: {e}");
                UNREADABLE_OUTPUT.to_string()
            },
            |bytes| String::from_utf8_lossy(&bytes).into_owned(),
        );
        Ok(GpgOutput { text, success })
    }

    fn run_captured(command: &str) -> Result<GpgOutput, GpgError> {
        tracing::debug!("crypto: running: {command}");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()?;
        Ok(GpgOutput {
            text: String::from_utf8_lossy(&output.stdout).into_owned(),
            success: output.status.success(),
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────
