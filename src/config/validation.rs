use crate::config::types::{BatchConfig, BrowserConfig, HttpConfig, SessionConfig};
use crate::ConfigError;

/// Longest accepted pause between batches
const MAX_BATCH_DELAY_SECS: u64 = 3600;

/// Validates the entire configuration
pub fn validate(config: &SessionConfig) -> Result<(), ConfigError> {
    validate_batch_config(&config.session)?;
    validate_http_config(&config.http)?;
    validate_browser_config(&config.browser)?;
    Ok(())
}

/// Validates batch scheduling configuration
pub(crate) fn validate_batch_config(config: &BatchConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.batch_delay_secs > MAX_BATCH_DELAY_SECS {
        return Err(ConfigError::Validation(format!(
            "batch_delay_secs must be <= {}s, got {}s",
            MAX_BATCH_DELAY_SECS, config.batch_delay_secs
        )));
    }

    Ok(())
}

/// Validates HTTP strategy configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "http timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "http connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates browser strategy configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.navigation_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "browser navigation_timeout_secs must be >= 1".to_string(),
        ));
    }

    if let Some(path) = &config.executable {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "browser executable cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
