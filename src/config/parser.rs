use crate::config::types::SessionConfig;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a session configuration file from the given path
///
/// Every section and key is optional; missing values fall back to defaults.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(SessionConfig)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sift_scrape::config::load_config;
///
/// let config = load_config(Path::new("session.toml")).unwrap();
/// println!("Batch size: {}", config.session.batch_size);
/// ```
pub fn load_config(path: &Path) -> Result<SessionConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<SessionConfig, ConfigError> {
    let config: SessionConfig = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[session]
batch-size = 4
batch-delay-secs = 2
mode = "browser"
extraction-workers = 3

[http]
timeout-secs = 15
connect-timeout-secs = 5

[browser]
headless = false
navigation-timeout-secs = 45
args = ["--lang=en-GB"]
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.session.batch_size, 4);
        assert_eq!(config.session.batch_delay_secs, 2);
        assert_eq!(config.session.mode, FetchMode::Browser);
        assert_eq!(config.session.worker_count(), 3);
        assert_eq!(config.http.timeout_secs, 15);
        assert!(!config.browser.headless);
        assert_eq!(config.browser.navigation_timeout_secs, 45);
        assert_eq!(config.browser.args, vec!["--lang=en-GB".to_string()]);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.session.batch_size, 8);
        assert_eq!(config.session.batch_delay_secs, 10);
        assert_eq!(config.session.mode, FetchMode::Http);
        assert!(config.session.worker_count() >= 1);
        assert!(config.browser.headless);
        assert_eq!(config.browser.navigation_timeout_secs, 30);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = parse_config("[session]\nbatch-size = 2\n").unwrap();
        assert_eq!(config.session.batch_size, 2);
        assert_eq!(config.session.batch_delay_secs, 10);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/session.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result = parse_config("[session]\nmode = \"carrier-pigeon\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[session]\nbatch-size = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }
}
