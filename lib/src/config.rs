//! Defines the configuration of the update engine: how LOAD retrieves documents.

use crate::consts::{DEFAULT_ACCEPT, DEFAULT_FETCH_TIMEOUT_SECS};
use anyhow::Result;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::path::Path;
use std::time::Duration;

fn default_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_accept_order() -> Vec<String> {
    DEFAULT_ACCEPT.iter().map(|s| s.to_string()).collect()
}

#[derive(Builder, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[builder(setter(into))]
pub struct Config {
    /// offline mode: LOAD refuses remote sources
    #[serde(default)]
    #[builder(default)]
    pub offline: bool,
    /// timeout applied to each HTTP request made by LOAD
    #[serde(default = "default_timeout")]
    #[builder(default = "default_timeout()")]
    pub fetch_timeout_secs: u64,
    /// media types negotiated by LOAD, highest priority first
    #[serde(default = "default_accept_order")]
    #[builder(default = "default_accept_order()")]
    pub accept_order: Vec<String>,
    /// base IRI used when parsing loaded documents
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub base_iri: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            offline: false,
            fetch_timeout_secs: default_timeout(),
            accept_order: default_accept_order(),
            base_iri: None,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn save_to_file(&self, file: &Path) -> Result<()> {
        let config_str = serde_json::to_string_pretty(&self)?;
        let mut file = std::fs::File::create(file)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    pub fn from_file(file: &Path) -> Result<Self> {
        let file = std::fs::File::open(file)?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Prints out the current Config in a clear and readable way for command line output.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Offline: {}", self.offline);
        println!("  Fetch Timeout: {}s", self.fetch_timeout_secs);
        println!("  Accept:");
        for media_type in &self.accept_order {
            println!("    - {}", media_type);
        }
        if let Some(base) = &self.base_iri {
            println!("  Base IRI: {}", base);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = Config::builder().build().unwrap();
        assert_eq!(config, Config::default());

        let config = Config::builder()
            .offline(true)
            .fetch_timeout_secs(5u64)
            .base_iri("http://example.org/")
            .build()
            .unwrap();
        assert!(config.offline);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));
        assert_eq!(config.base_iri.as_deref(), Some("http://example.org/"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"offline": true}"#).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert!(config.offline);
        assert_eq!(config.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
        assert_eq!(config.accept_order.len(), DEFAULT_ACCEPT.len());

        config.save_to_file(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }
}
