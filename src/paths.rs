//! Centralized path resolution for deckhand
//!
//! # Environment Variables
//!
//! - `DECKHAND_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/deckhand`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `DECKHAND_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/deckhand` (if set)
//! 3. `~/.config/deckhand`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "DECKHAND_CONFIG_DIR";

/// Name of the config file inside [`config_dir`]
pub const CONFIG_FILE: &str = "config.toml";

/// Get the deckhand config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("deckhand");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("deckhand");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Default location of the config file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
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
    use std::sync::{Mutex, MutexGuard, PoisonError};

    /// Serializes tests that mutate the process environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var; callers hold
    /// [`env_lock`] so no other test touches the environment meanwhile.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: callers hold ENV_LOCK
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: callers hold ENV_LOCK
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    /// Helper to run a test with env var removed
    fn without_env_var<F, R>(key: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: callers hold ENV_LOCK
        unsafe { env::remove_var(key) };
        let result = f();
        if let Some(v) = original {
            // SAFETY: callers hold ENV_LOCK
            unsafe { env::set_var(key, v) };
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        let _env = env_lock();
        with_env_var(ENV_CONFIG_DIR, "/custom/deckhand", || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/deckhand"));
            assert_eq!(
                config_file().unwrap(),
                PathBuf::from("/custom/deckhand/config.toml")
            );
        });
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let _env = env_lock();
        let home = dirs::home_dir().unwrap();
        with_env_var(ENV_CONFIG_DIR, "~/dotfiles/deckhand-tilde-test", || {
            assert_eq!(
                config_dir().unwrap(),
                home.join("dotfiles").join("deckhand-tilde-test")
            );
        });
    }

    #[test]
    fn test_xdg_config_home() {
        let _env = env_lock();
        without_env_var(ENV_CONFIG_DIR, || {
            with_env_var("XDG_CONFIG_HOME", "/tmp/xdg-config-test", || {
                assert_eq!(
                    config_dir().unwrap(),
                    PathBuf::from("/tmp/xdg-config-test/deckhand")
                );
            });
        });
    }

    #[test]
    fn test_expand_with_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/deploy/hostplans"), home.join("deploy").join("hostplans"));
    }

    #[test]
    fn test_expand_with_env_var() {
        let _env = env_lock();
        with_env_var("DECKHAND_TEST_VAR", "staging", || {
            assert_eq!(
                expand("/srv/$DECKHAND_TEST_VAR/plans"),
                PathBuf::from("/srv/staging/plans")
            );
        });
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }
}
