use crate::config::types::{
    Config, CrawlSettings, EmbeddingSettings, FetchSettings, StorageSettings,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Archive names are checked later against the adapter registry, since the
/// set of known archives is not a configuration concern.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_settings(&config.crawl)?;
    validate_fetch_settings(&config.fetch)?;
    validate_storage_settings(&config.storage)?;
    validate_embedding_settings(&config.embedding)?;
    Ok(())
}

fn validate_crawl_settings(settings: &CrawlSettings) -> Result<(), ConfigError> {
    if !settings.timeout.is_finite() || settings.timeout <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "timeout must be a positive number of seconds, got {}",
            settings.timeout
        )));
    }

    if settings.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1".to_string(),
        ));
    }

    if settings.workers == Some(0) {
        return Err(ConfigError::Validation("workers must be >= 1".to_string()));
    }

    if let (Some(begin), Some(end)) = (settings.begin_date, settings.end_date) {
        if begin > end {
            return Err(ConfigError::Validation(format!(
                "begin-date {} is after end-date {}",
                begin, end
            )));
        }
    }

    Ok(())
}

fn validate_fetch_settings(settings: &FetchSettings) -> Result<(), ConfigError> {
    if settings.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if settings.session_lifetime_secs == 0 {
        return Err(ConfigError::Validation(
            "session-lifetime-secs must be >= 1".to_string(),
        ));
    }

    if settings.browser_restart_after < 1 {
        return Err(ConfigError::Validation(
            "browser-restart-after must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage_settings(settings: &StorageSettings) -> Result<(), ConfigError> {
    if settings.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if settings.pool_size < 1 {
        return Err(ConfigError::Validation(
            "pool-size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_embedding_settings(settings: &EmbeddingSettings) -> Result<(), ConfigError> {
    if settings.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "embedding timeout-secs must be >= 1".to_string(),
        ));
    }

    if let Some(raw) = &settings.url {
        let parsed = Url::parse(raw)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid embedding url: {}", e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "Embedding url must be http(s), got '{}'",
                raw
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_non_positive_timeout() {
        let mut config = Config::default();
        config.crawl.timeout = 0.0;
        assert!(validate(&config).is_err());

        config.crawl.timeout = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_inverted_window() {
        let mut config = Config::default();
        config.crawl.begin_date = NaiveDate::from_ymd_opt(2020, 2, 1);
        config.crawl.end_date = NaiveDate::from_ymd_opt(2020, 1, 1);

        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("after end-date"));
    }

    #[test]
    fn test_zero_workers() {
        let mut config = Config::default();
        config.crawl.workers = Some(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_embedding_url() {
        let mut config = Config::default();
        config.embedding.url = Some("not a url".to_string());
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.embedding.url = Some("ftp://example.com/embed".to_string());
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.embedding.url = Some("http://localhost:8000/v1/embeddings".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_storage_settings() {
        let mut config = Config::default();
        config.storage.database_path = String::new();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.storage.pool_size = 0;
        assert!(validate(&config).is_err());
    }
}
