//! Centralized path resolution for linuxhost
//!
//! # Environment Variables
//!
//! - `LINUXHOST_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/linuxhost`)
//! - `LINUXHOST_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `LINUXHOST_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/linuxhost` (if set)
//! 3. `~/.config/linuxhost`
//!
//! For state_dir():
//! 1. `LINUXHOST_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/linuxhost` (if set)
//! 3. `~/.local/state/linuxhost`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "LINUXHOST_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "LINUXHOST_STATE_DIR";

const APP_DIR: &str = "linuxhost";

/// Manifest file name inside the config directory
pub const MANIFEST_FILE: &str = "linuxhost.toml";

/// State file name inside the state directory
pub const STATE_FILE: &str = "state.json";

/// Get the linuxhost config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {ENV_CONFIG_DIR}: {}", path.display());
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the linuxhost state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {ENV_STATE_DIR}: {}", path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Default manifest path, `<config_dir>/linuxhost.toml`
pub fn manifest_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(MANIFEST_FILE))
}

/// Default state path, `<state_dir>/state.json`
pub fn state_file() -> Result<PathBuf> {
    Ok(state_dir()?.join(STATE_FILE))
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    /// Serializes tests that touch the process environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Run `f` with each `(key, value)` set, or removed when value is None.
    fn with_env<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let originals: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();
        for (key, value) in vars {
            // SAFETY: environment access in these tests is serialized by ENV_LOCK
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }
        let result = f();
        for (key, value) in originals {
            // SAFETY: as above
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env(&[(ENV_CONFIG_DIR, Some("/custom/config/path"))], || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/config/path"));
            assert_eq!(
                manifest_file().unwrap(),
                PathBuf::from("/custom/config/path/linuxhost.toml")
            );
        });
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        with_env(&[(ENV_CONFIG_DIR, Some("~/dotfiles/linuxhost"))], || {
            assert_eq!(config_dir().unwrap(), home.join("dotfiles").join("linuxhost"));
        });
    }

    #[test]
    fn test_xdg_config_home() {
        with_env(
            &[
                (ENV_CONFIG_DIR, None),
                ("XDG_CONFIG_HOME", Some("/tmp/xdg-config-test")),
            ],
            || {
                assert_eq!(
                    config_dir().unwrap(),
                    PathBuf::from("/tmp/xdg-config-test/linuxhost")
                );
            },
        );
    }

    #[test]
    fn test_state_dir_env_override() {
        with_env(&[(ENV_STATE_DIR, Some("/custom/state"))], || {
            assert_eq!(
                state_file().unwrap(),
                PathBuf::from("/custom/state/state.json")
            );
        });
    }

    #[test]
    fn test_xdg_state_home() {
        with_env(
            &[
                (ENV_STATE_DIR, None),
                ("XDG_STATE_HOME", Some("/tmp/xdg-state-test")),
            ],
            || {
                assert_eq!(
                    state_dir().unwrap(),
                    PathBuf::from("/tmp/xdg-state-test/linuxhost")
                );
            },
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_default_state_dir_unix() {
        with_env(&[(ENV_STATE_DIR, None), ("XDG_STATE_HOME", None)], || {
            let home = dirs::home_dir().unwrap();
            assert_eq!(
                state_dir().unwrap(),
                home.join(".local").join("state").join("linuxhost")
            );
        });
    }

    #[test]
    fn test_expand_with_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/test/path"), home.join("test").join("path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }
}
