//! Config loading and persistence.

mod load;
mod merge;
mod schema;

pub use load::{ConfigError, config_path, load, load_from, load_or_default, load_user_config, write_config};
pub use merge::{apply_env_overrides, apply_env_overrides_from, merge_layers};
pub use schema::{
    Config, ConfigLayer, FileLoggingConfig, FileLoggingConfigOverride, LogFormat, LogRotation,
    LoggingConfig, LoggingConfigOverride, PollConfig, PollConfigOverride, StoreConfig,
    StoreConfigOverride,
};
