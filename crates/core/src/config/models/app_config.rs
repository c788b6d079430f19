use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    broker::BrokerConfig,
    clients::{GenerationConfig, MetadataConfig},
    database::DatabaseConfig,
    ingest::{IngestConfig, WorkerConfig},
    observability::ObservabilityConfig,
};

/// 环境变量前缀，例如 `INGEST__BROKER__URL=redis://localhost:6379`
pub const ENV_PREFIX: &str = "INGEST";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub broker: BrokerConfig,
    pub ingest: IngestConfig,
    pub worker: WorkerConfig,
    pub metadata: MetadataConfig,
    pub generation: GenerationConfig,
    pub database: DatabaseConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = ["config/ingest.toml", "ingest.toml", "/etc/ingest/config.toml"];

            if let Some(path) = default_paths.iter().find(|p| Path::new(p).exists()) {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> Result<()> {
        self.broker.validate().context("broker配置无效")?;
        self.ingest.validate().context("ingest配置无效")?;
        self.worker.validate().context("worker配置无效")?;
        self.metadata.validate().context("metadata配置无效")?;
        self.generation.validate().context("generation配置无效")?;
        self.database.validate().context("database配置无效")?;
        self.observability
            .validate()
            .context("observability配置无效")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.broker.is_configured());
        assert_eq!(config.ingest.artist_search_limit, 10);
        assert_eq!(config.ingest.fallback_fanout_delay_ms, 1000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [broker]
            url = "redis://127.0.0.1:6379/0"

            [ingest]
            fallback_fanout_delay_ms = 250
            "#,
        )
        .unwrap();

        assert!(config.broker.is_configured());
        assert_eq!(config.broker.queue_name, "song_ingest_tasks");
        assert_eq!(config.ingest.fallback_fanout_delay_ms, 250);
        assert_eq!(config.ingest.artist_search_limit, 10);
        assert_eq!(config.worker.max_concurrent_tasks, 4);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(AppConfig::from_toml("[ingest]\nartist_search_limit = 0").is_err());
        assert!(AppConfig::from_toml("[observability]\nlog_format = \"xml\"").is_err());
        assert!(AppConfig::from_toml("[database]\nurl = \"postgres://localhost/db\"").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AppConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.broker.queue_name, config.broker.queue_name);
        assert_eq!(parsed.metadata.base_url, config.metadata.base_url);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[worker]\nmax_concurrent_tasks = 9").unwrap();

        let config = AppConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.worker.max_concurrent_tasks, 9);
    }

    #[test]
    fn test_example_config_is_valid() {
        let config =
            AppConfig::from_toml(include_str!("../../../../../config/ingest.example.toml"))
                .unwrap();
        assert!(config.broker.is_configured());
        assert_eq!(config.broker.batch_size, 8);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = AppConfig::load(Some("/nonexistent/ingest.toml"));
        assert!(result.is_err());
    }
}
