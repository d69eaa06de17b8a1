//! XDG directory helpers for config/data locations.

use std::path::PathBuf;

/// File name of the shared counter table.
pub const DATA_FILE_NAME: &str = "user_data.json";

/// Base directory for persistent data (counter table, logs).
///
/// Uses `TALLY_DATA_DIR` if set, otherwise `$XDG_DATA_HOME/tally` or
/// `~/.local/share/tally`.
pub fn data_dir() -> PathBuf {
    data_dir_from(|key| std::env::var(key).ok())
}

/// Base directory for configuration files.
///
/// Uses `TALLY_CONFIG_DIR` if set, otherwise `$XDG_CONFIG_HOME/tally` or
/// `~/.config/tally`.
pub fn config_dir() -> PathBuf {
    config_dir_from(|key| std::env::var(key).ok())
}

/// Default location of the counter table.
pub fn default_data_file() -> PathBuf {
    data_dir().join(DATA_FILE_NAME)
}

/// Default directory for rolling log files.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

fn data_dir_from(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    resolve(&env, "TALLY_DATA_DIR", "XDG_DATA_HOME", &[".local", "share"])
}

fn config_dir_from(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    resolve(&env, "TALLY_CONFIG_DIR", "XDG_CONFIG_HOME", &[".config"])
}

fn resolve(
    env: &impl Fn(&str) -> Option<String>,
    override_var: &str,
    xdg_var: &str,
    home_fallback: &[&str],
) -> PathBuf {
    if let Some(dir) = env(override_var)
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }

    env(xdg_var)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
            base.extend(home_fallback);
            base
        })
        .join("tally")
}
