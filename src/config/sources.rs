use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "FETCHDECK_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/fetchdeck.toml";
const ENV_PREFIX: &str = "FETCHDECK";
const ENV_SEPARATOR: &str = "__";
const API_TOKEN_ENV_VAR: &str = "FETCHDECK_API_TOKEN";

/// Layers, lowest priority first: struct defaults, the TOML file,
/// `FETCHDECK__*` variables (a `.env` file counts as environment).
/// Secrets are applied last and only ever come from the environment.
pub fn load() -> Result<Config, ConfigError> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let mut config = load_from_sources(config_path())?;
    apply_secrets(&mut config, |name| env::var(name).ok());
    Ok(config)
}

fn config_path() -> PathBuf {
    env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn apply_secrets(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(token) = lookup(API_TOKEN_ENV_VAR).filter(|token| !token.is_empty()) {
        config.server.api_token = Some(token);
    }
}

/// Builds the file and environment layers for `config_path`
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.is_file() {
        tracing::info!(path = %config_path.display(), "Loading configuration file");
        builder = builder.add_source(File::from(config_path));
    } else {
        tracing::warn!(
            path = %config_path.display(),
            "Configuration file not found, using defaults and environment"
        );
    }

    // FETCHDECK__ENGINE__MAX_RUNNING -> engine.max_running
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
