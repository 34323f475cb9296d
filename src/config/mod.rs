//! The `config` module loads [`Settings`] from an optional `config/default`
//! file and `RELAY_`-prefixed environment variables, falling back to
//! built-in defaults for anything not provided.

mod settings;

use config::{Config, ConfigError, Environment, File};

pub use settings::{
    BrokerSettings, ClientSettings, LogSettings, PartialSettings, ServerSettings, Settings,
};

/// Loads the configuration from the default file and environment variables
/// and merges it with default values.
///
/// Nested keys use a double underscore in the environment, e.g.
/// `RELAY_SERVER__PORT=9000` or `RELAY_BROKER__TOPICS=default,other`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("RELAY")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("broker.topics")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(Settings::default().merged_with(partial))
}
