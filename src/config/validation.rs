use super::models::Config;
use crate::humanize::ByteSize;
use thiserror::Error;

/// Hard ceiling for `server.api.max_body_bytes`
const MAX_BODY_LIMIT: ByteSize = ByteSize::mib(64);

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("max_body_bytes ({actual}) must be between 1B and {limit}")]
    BodyLimitOutOfRange { actual: ByteSize, limit: ByteSize },

    #[error("engine.max_running must be at least 1")]
    InvalidMaxRunning,

    #[error("Timeout must be positive: {field}")]
    InvalidTimeout { field: String },

    #[error("extensions.manifest_path must not be empty")]
    EmptyManifestPath,

    #[error("API token must not be empty when set")]
    EmptyApiToken,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_engine(config)?;
    validate_timeouts(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    let actual = config.server.api.max_body_bytes;
    if actual.as_u64() == 0 || actual > MAX_BODY_LIMIT {
        return Err(ValidationError::BodyLimitOutOfRange {
            actual,
            limit: MAX_BODY_LIMIT,
        });
    }

    if let Some(token) = &config.server.api_token {
        if token.trim().is_empty() {
            return Err(ValidationError::EmptyApiToken);
        }
    }

    Ok(())
}

fn validate_engine(config: &Config) -> Result<(), ValidationError> {
    if config.engine.max_running == 0 {
        return Err(ValidationError::InvalidMaxRunning);
    }

    if config.extensions.manifest_path.trim_matches('/').is_empty() {
        return Err(ValidationError::EmptyManifestPath);
    }

    Ok(())
}

fn validate_timeouts(config: &Config) -> Result<(), ValidationError> {
    if config.extensions.fetch_timeout_secs == 0 {
        return Err(ValidationError::InvalidTimeout {
            field: "extensions.fetch_timeout_secs".to_string(),
        });
    }

    if config.relay.timeout_secs == 0 {
        return Err(ValidationError::InvalidTimeout {
            field: "relay.timeout_secs".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_body_limit_bounds() {
        let mut config = Config::default();
        config.server.api.max_body_bytes = ByteSize(0);
        assert!(matches!(
            validate(&config),
            Err(ValidationError::BodyLimitOutOfRange { .. })
        ));

        config.server.api.max_body_bytes = ByteSize::mib(65);
        assert!(validate(&config).is_err());

        config.server.api.max_body_bytes = ByteSize::mib(64);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_max_running_must_be_positive() {
        let mut config = Config::default();
        config.engine.max_running = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidMaxRunning)
        ));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = Config::default();
        config.relay.timeout_secs = 0;
        match validate(&config) {
            Err(ValidationError::InvalidTimeout { field }) => {
                assert_eq!(field, "relay.timeout_secs")
            }
            other => panic!("expected InvalidTimeout, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_token_and_manifest_path() {
        let mut config = Config::default();
        config.server.api_token = Some("  ".to_string());
        assert!(matches!(validate(&config), Err(ValidationError::EmptyApiToken)));

        let mut config = Config::default();
        config.extensions.manifest_path = "/".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::EmptyManifestPath)
        ));
    }
}
