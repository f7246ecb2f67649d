use crate::config::types::{Config, DispatchConfig, FederationConfig, FetchConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_federation_config(&config.federation)?;
    validate_fetch_config(&config.fetch)?;
    validate_dispatch_config(&config.dispatch)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates endpoint sources
fn validate_federation_config(config: &FederationConfig) -> Result<(), ConfigError> {
    if config.instances.is_empty() {
        validate_http_url("directory-url", &config.directory_url)?;
    }

    for instance in &config.instances {
        validate_http_url("instances", instance)?;
    }

    if !config.probe_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "probe-path must start with '/', got '{}'",
            config.probe_path
        )));
    }

    Ok(())
}

/// Validates retry budget and timings
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.request_timeout_ms == 0 || config.probe_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-ms and probe-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.cooldown_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "cooldown-threshold must be >= 1, got {}",
            config.cooldown_threshold
        )));
    }

    if config.page_jitter_min_ms > config.page_jitter_max_ms {
        return Err(ConfigError::Validation(format!(
            "page-jitter-min-ms ({}) cannot exceed page-jitter-max-ms ({})",
            config.page_jitter_min_ms, config.page_jitter_max_ms
        )));
    }

    Ok(())
}

fn validate_dispatch_config(config: &DispatchConfig) -> Result<(), ConfigError> {
    if config.max_parallel == Some(0) {
        return Err(ConfigError::Validation(
            "max-parallel must be >= 1".to_string(),
        ));
    }

    if config.task_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "task-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent value cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Checks that a URL parses and uses an HTTP(S) scheme
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("instances", "https://nitter.example.org").is_ok());
        assert!(validate_http_url("instances", "http://127.0.0.1:8080").is_ok());

        assert!(validate_http_url("instances", "").is_err());
        assert!(validate_http_url("instances", "ftp://nitter.example.org").is_err());
        assert!(validate_http_url("instances", "nitter.example.org").is_err());
    }

    #[test]
    fn test_jitter_bounds() {
        let mut config = Config::default();
        config.fetch.page_jitter_min_ms = 3_000;
        config.fetch.page_jitter_max_ms = 1_000;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_probe_path_must_be_absolute() {
        let mut config = Config::default();
        config.federation.probe_path = "jack".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let mut config = Config::default();
        config.dispatch.max_parallel = Some(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_instance_rejected() {
        let mut config = Config::default();
        config.federation.instances = vec!["not a url".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }
}
