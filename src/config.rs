use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ReaderConfig {
    pub server_url: String,
    /// JSON file backing the persisted cache tier and session state.
    pub state_file: String,
    pub double_tap_ms: u64,
    pub highlights_visible: bool,
    pub language_detect_timeout_secs: u64,
    pub enrichment_batch_size: usize,
    pub mark_done: MarkDoneConfig,
    pub cache: CacheConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MarkDoneConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub book_language_ttl_secs: u64,
    pub language_name_ttl_secs: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            server_url: "http://localhost:5001".to_string(),
            state_file: "readweave_state.json".to_string(),
            double_tap_ms: 300,
            highlights_visible: true,
            language_detect_timeout_secs: 5,
            enrichment_batch_size: 5,
            mark_done: MarkDoneConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for MarkDoneConfig {
    fn default() -> Self {
        MarkDoneConfig { max_retries: 3, base_delay_ms: 1000 }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            book_language_ttl_secs: 5 * 60,
            language_name_ttl_secs: 30 * 60,
        }
    }
}

impl ReaderConfig {
    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_ms)
    }

    pub fn language_detect_timeout(&self) -> Duration {
        Duration::from_secs(self.language_detect_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "server_url",
                reason: format!("'{}' is not an http(s) URL", self.server_url),
            });
        }
        if self.enrichment_batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "enrichment_batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.double_tap_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "double_tap_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

pub fn parse_config(contents: &str, origin: &str) -> Result<ReaderConfig, ConfigError> {
    let loaded_config = toml::from_str::<ReaderConfig>(contents).map_err(|e| ConfigError::Parse {
        path: origin.to_string(),
        source: e,
    })?;
    loaded_config.validate()?;
    Ok(loaded_config)
}

pub fn load_config_from_file(file_path: &str) -> Result<ReaderConfig, ConfigError> {
    let contents = fs::read_to_string(file_path).map_err(|e| ConfigError::Read {
        path: file_path.to_string(),
        source: e,
    })?;
    parse_config(&contents, file_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("", "inline").unwrap();
        assert_eq!(config, ReaderConfig::default());
        assert_eq!(config.mark_done.max_retries, 3);
        assert_eq!(config.cache.book_language_ttl_secs, 300);
    }

    #[test]
    fn nested_tables_override_defaults() {
        let config = parse_config(
            r#"
            server_url = "https://reader.example"
            double_tap_ms = 250

            [mark_done]
            base_delay_ms = 500

            [cache]
            language_name_ttl_secs = 60
            "#,
            "inline",
        )
        .unwrap();
        assert_eq!(config.server_url, "https://reader.example");
        assert_eq!(config.double_tap_window(), Duration::from_millis(250));
        assert_eq!(config.mark_done.base_delay_ms, 500);
        assert_eq!(config.mark_done.max_retries, 3);
        assert_eq!(config.cache.language_name_ttl_secs, 60);
    }

    #[test]
    fn rejects_non_http_server() {
        let err = parse_config(r#"server_url = "ftp://x""#, "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "server_url", .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_config_from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
