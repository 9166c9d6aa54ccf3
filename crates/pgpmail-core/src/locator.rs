//! gpg binary discovery and the fixed command prefix.

use std::env;
use std::path::{Path, PathBuf};

use crate::config::GpgConfig;
use crate::format::{quote_path, shell_quote};

/// Flags every invocation carries. `--logger-fd 1` sends gpg's status and
/// diagnostic messages to stdout, the stream the runner captures.
pub const FIXED_FLAGS: &str = "--quiet --batch --no-verbose --logger-fd 1 --use-agent";

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Search `search_path` (a `PATH`-style list) for `program`.
///
/// A program name containing a path separator is checked as-is.
#[must_use]
pub fn find_in_path(program: &str, search_path: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    env::split_paths(search_path?)
        .map(|dir| dir.join(program))
        .find(|path| is_executable(path))
}

/// Resolve the gpg binary for `config`.
#[must_use]
pub fn locate_binary(config: &GpgConfig) -> Option<PathBuf> {
    let found = match &config.binary_path {
        Some(path) if is_executable(path) => Some(path.clone()),
        Some(path) => {
            tracing::warn!(path = %path.display(), "configured gpg binary is not executable");
            None
        }
        None => find_in_path(&config.program, env::var_os("PATH").as_deref()),
    };
    match &found {
        Some(bin) => tracing::debug!("crypto: detected gpg binary in {}", bin.display()),
        None => tracing::debug!("crypto: no gpg binary detected"),
    }
    found
}

/// Full command prefix: quoted binary, fixed flags, optional `--homedir`.
#[must_use]
pub fn command_prefix(binary: &Path, homedir: Option<&Path>) -> String {
    let mut prefix = format!("{} {FIXED_FLAGS}", quote_path(binary));
    if let Some(dir) = homedir {
        prefix.push_str(" --homedir ");
        prefix.push_str(&shell_quote(&dir.to_string_lossy()));
    }
    prefix
}

// ── Tests ──────────────────────────────────────────────────────────
