use std::path::PathBuf;

use crate::store::LockMode;

use super::{Config, ConfigLayer};

/// Apply `layers` in order on top of the defaults; later layers win.
pub fn merge_layers(layers: impl IntoIterator<Item = ConfigLayer>) -> Config {
    let mut config = Config::default();
    for layer in layers {
        layer.apply_to(&mut config);
    }
    config
}

pub fn apply_env_overrides(config: &mut Config) {
    apply_env_overrides_from(config, |key| std::env::var(key).ok());
}

/// Env overrides read through `env`, so callers can supply a fixed map.
pub fn apply_env_overrides_from(config: &mut Config, env: impl Fn(&str) -> Option<String>) {
    if let Some(raw) = env("TALLY_DATA_FILE") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.store.data_file = Some(PathBuf::from(trimmed));
        }
    }

    if let Some(raw) = env("TALLY_LOCK") {
        match LockMode::parse(&raw) {
            Some(mode) => config.store.lock = mode,
            None => tracing::warn!("invalid TALLY_LOCK `{raw}`, ignoring"),
        }
    }

    if let Some(raw) = env("TALLY_LOCK_TIMEOUT_MS") {
        match raw.trim().parse::<u64>() {
            Ok(value) => config.store.lock_timeout_ms = Some(value),
            Err(err) => tracing::warn!("invalid TALLY_LOCK_TIMEOUT_MS, ignoring: {err}"),
        }
    }

    if let Some(raw) = env("TALLY_POLL_INTERVAL_MS") {
        match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => config.poll.interval_ms = value,
            Ok(_) => tracing::warn!("TALLY_POLL_INTERVAL_MS must be positive, ignoring"),
            Err(err) => tracing::warn!("invalid TALLY_POLL_INTERVAL_MS, ignoring: {err}"),
        }
    }
}
