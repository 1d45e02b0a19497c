mod settings;

use config::{Config, ConfigError, Environment, File};

pub use settings::{ChatSettings, HubSettings, LogSettings, PartialSettings, ServerSettings, Settings};

/// Prefix for environment overrides, e.g. `CHATHUB__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "CHATHUB";

/// Loads configuration from `config/default` (any format `config` knows,
/// optional) and `CHATHUB__*` environment variables, merged over defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Same as [`load_config`] with an explicit base file path (no extension).
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(Settings::merge(partial))
}
