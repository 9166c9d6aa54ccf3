//! Shared helpers for integration tests: a scripted stand-in for gpg.

#![allow(dead_code)]

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;

use pgpmail_core::{GpgConfig, GpgManager, InteractiveHost};
use pgpmail_mime::MimeMessage;
use tempfile::TempDir;

/// Logs its arguments, copies the file it was given, writes a canned
/// artifact to `--output`, prints canned diagnostics and exits with a
/// canned status. A run that starts while another is still in flight
/// leaves an `overlap` marker behind.
const SCRIPT: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
owner=""
if mkdir "$dir/inflight" 2>/dev/null; then owner=1; else echo overlap >> "$dir/overlap"; fi
if [ -f "$dir/delay" ]; then sleep "$(cat "$dir/delay")"; fi
printf '%s\n' "$*" >> "$dir/args.log"
prev=""
last=""
out=""
sig=""
for arg in "$@"; do
    [ "$prev" = "--output" ] && out="$arg"
    [ "$prev" = "--verify" ] && sig="$arg"
    prev="$arg"
    last="$arg"
done
if [ -n "$out" ] && [ -f "$dir/artifact" ]; then cp "$dir/artifact" "$out"; fi
if [ -f "$last" ]; then cp "$last" "$dir/last_input"; fi
if [ -n "$sig" ]; then cp "$sig" "$dir/signature_input"; fi
if [ -f "$dir/diagnostics" ]; then cat "$dir/diagnostics"; fi
echo "gpg: this goes to stderr" >&2
code="$(cat "$dir/exit_code" 2>/dev/null)"
if [ -n "$owner" ]; then rmdir "$dir/inflight"; fi
exit "${code:-0}"
"#;

/// A fake gpg living in its own temporary directory.
pub struct FakeGpg {
    dir: TempDir,
}

impl FakeGpg {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        // Written by a child process so no thread of the test binary holds a
        // write handle that a concurrent spawn could inherit (ETXTBSY).
        let status = Command::new("sh")
            .args(["-c", "printf '%s' \"$1\" > \"$2\" && chmod 755 \"$2\"", "sh", SCRIPT])
            .arg(dir.path().join("gpg"))
            .status()
            .unwrap();
        assert!(status.success());
        Self { dir }
    }

    pub fn binary(&self) -> PathBuf {
        self.dir.path().join("gpg")
    }

    /// Batch-mode config pointing at the script.
    pub fn config(&self) -> GpgConfig {
        GpgConfig {
            binary_path: Some(self.binary()),
            interactive: false,
            ..GpgConfig::default()
        }
    }

    pub fn manager(&self) -> GpgManager {
        GpgManager::new(&self.config())
    }

    /// Bytes the script copies to its `--output` path.
    pub fn set_artifact(&self, bytes: &[u8]) {
        fs::write(self.path("artifact"), bytes).unwrap();
    }

    /// Text the script prints to stdout.
    pub fn set_diagnostics(&self, text: &str) {
        fs::write(self.path("diagnostics"), text).unwrap();
    }

    pub fn set_exit_code(&self, code: i32) {
        fs::write(self.path("exit_code"), code.to_string()).unwrap();
    }

    /// Seconds every run sleeps while marked in flight.
    pub fn set_run_delay(&self, seconds: &str) {
        fs::write(self.path("delay"), seconds).unwrap();
    }

    /// Whether any run started before the previous one finished.
    pub fn runs_overlapped(&self) -> bool {
        self.path("overlap").exists()
    }

    /// Argument strings of every run so far, oldest first.
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(self.path("args.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Contents of the last file argument of the latest run.
    pub fn last_input(&self) -> Vec<u8> {
        fs::read(self.path("last_input")).unwrap()
    }

    /// Contents of the signature file of the latest `--verify` run.
    pub fn signature_input(&self) -> Vec<u8> {
        fs::read(self.path("signature_input")).unwrap()
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Interactive host that runs commands itself and records them.
#[derive(Default)]
pub struct RecordingHost {
    pub commands: Mutex<Vec<String>>,
}

impl InteractiveHost for RecordingHost {
    fn shell_out(&self, command: &str) -> io::Result<bool> {
        self.commands.lock().unwrap().push(command.to_string());
        Ok(Command::new("sh").arg("-c").arg(command).status()?.success())
    }
}

/// A plain single-part message.
pub fn text_message(body: &str) -> MimeMessage {
    let mut message = MimeMessage::new();
    message.set_header("Content-Type", "text/plain; charset=utf-8");
    message.set_body(body.as_bytes());
    message
}
