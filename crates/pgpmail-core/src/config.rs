//! gpg invocation settings, stored as plain JSON.
//!
//! Loaded once at startup and handed to [`crate::GpgManager::new`]. A
//! missing or unreadable file yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ── Settings ───────────────────────────────────────────────────────

/// Settings for locating and running gpg.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GpgConfig {
    /// Program name searched on `PATH`.
    #[serde(default = "default_program")]
    pub program: String,

    /// Explicit binary path; skips the `PATH` search when set.
    #[serde(default)]
    pub binary_path: Option<PathBuf>,

    /// Alternate keyring directory passed as `--homedir`.
    #[serde(default)]
    pub homedir: Option<PathBuf>,

    /// Whether sign, encrypt and decrypt may take over the terminal
    /// (passphrase entry). Verify always runs in batch.
    #[serde(default = "default_interactive")]
    pub interactive: bool,
}

impl Default for GpgConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            binary_path: None,
            homedir: None,
            interactive: default_interactive(),
        }
    }
}

fn default_program() -> String {
    "gpg".into()
}
const fn default_interactive() -> bool {
    true
}

// ── File I/O ───────────────────────────────────────────────────────

const CONFIG_FILE: &str = "gpg.json";

impl GpgConfig {
    /// Load settings from `{config_dir}/gpg.json`.
    ///
    /// Returns [`Default::default()`] when the file is missing or
    /// contains invalid JSON.
    #[must_use]
    pub fn load(config_dir: &Path) -> Self {
        let path = config_dir.join(CONFIG_FILE);
        fs::read_to_string(&path).map_or_else(
            |_| Self::default(),
            |contents| {
                serde_json::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!(path = %path.display(), "ignoring invalid gpg config: {e}");
                    Self::default()
                })
            },
        )
    }

    /// Persist settings to `{config_dir}/gpg.json`.
    ///
    /// Writes to `.gpg.json.tmp` and renames over the target.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the directory does not exist or the
    /// file system rejects the write/rename.
    pub fn save(&self, config_dir: &Path) -> std::io::Result<()> {
        let path = config_dir.join(CONFIG_FILE);
        let tmp = config_dir.join(".gpg.json.tmp");

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(&tmp, &json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp, &path)?;

        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────
