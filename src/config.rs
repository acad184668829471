//! Ingress configuration.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`GRAPH_INGRESS_*`)
//! 2. A TOML file
//! 3. Built-in defaults
//!
//! # Environment Variables
//!
//! - `GRAPH_INGRESS_NUM_PARTITIONS=16`
//! - `GRAPH_INGRESS_INGRESS_CODE=1`
//! - `GRAPH_INGRESS_NO_BIDIRECTIONAL=true`
//!
//! # Example
//!
//! ```toml
//! [partitioning]
//! num_partitions = 9
//! ingress_code = 2
//!
//! [reader]
//! start_delimiter = "<page>"
//! end_delimiter = "</page>"
//! position_check = "fatal"
//!
//! [dedup]
//! no_bidirectional = true
//! key_function = "unordered_pair"
//! edge_reducer = { kind = "count", property = "weight" }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dedup::{DedupConfig, ReducerKind};
use crate::ingress::{IngressAlgorithm, VertexCutIngress};
use crate::key::KeyFunction;
use crate::reader::{Delimiters, PositionCheck};
use crate::tokenizer::TokenizerKind;
use crate::{Error, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngressConfig {
    pub partitioning: PartitioningConfig,
    pub reader: ReaderConfig,
    pub dedup: DedupSection,
    pub tokenizer: TokenizerConfig,
    pub logging: LoggingConfig,
}

impl IngressConfig {
    /// Read a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Apply `GRAPH_INGRESS_*` overrides. Unparsable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse("GRAPH_INGRESS_NUM_PARTITIONS") {
            self.partitioning.num_partitions = v;
        }
        if let Some(v) = env_parse("GRAPH_INGRESS_INGRESS_CODE") {
            self.partitioning.ingress_code = v;
        }
        if let Ok(val) = std::env::var("GRAPH_INGRESS_NO_BIDIRECTIONAL") {
            self.dedup.no_bidirectional = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Reject configurations no stage could run with.
    pub fn validate(&self) -> Result<()> {
        if self.partitioning.num_partitions == 0 {
            return Err(Error::Configuration("num_partitions must be > 0".into()));
        }
        VertexCutIngress::from_code(
            self.partitioning.ingress_code,
            self.partitioning.num_partitions,
        )?;
        self.reader.delimiters()?;
        if self.dedup.no_bidirectional && !self.dedup.key_function.groups_reverse_pairs() {
            tracing::warn!(
                key_function = ?self.dedup.key_function,
                "no_bidirectional only collapses pairs that share a key-group"
            );
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.parse().ok()
}

/// Partition layout and ingress algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitioningConfig {
    pub num_partitions: u32,
    /// Ingress algorithm selector, `[0, INGRESS_CODE_LIMIT]`.
    pub ingress_code: u32,
}

impl Default for PartitioningConfig {
    fn default() -> Self {
        Self {
            num_partitions: 4,
            ingress_code: IngressAlgorithm::Oblivious.code(),
        }
    }
}

/// Boundary reader settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub start_delimiter: String,
    pub end_delimiter: String,
    pub position_check: PositionCheck,
    /// Records larger than this are dropped (None = unlimited)
    pub max_record_bytes: Option<usize>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            start_delimiter: "<page>".to_string(),
            end_delimiter: "</page>".to_string(),
            position_check: PositionCheck::Log,
            max_record_bytes: None,
        }
    }
}

impl ReaderConfig {
    pub fn delimiters(&self) -> Result<Delimiters> {
        Delimiters::new(self.start_delimiter.as_bytes(), self.end_delimiter.as_bytes())
    }
}

/// Dedup settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupSection {
    pub no_bidirectional: bool,
    pub key_function: KeyFunction,
    pub edge_reducer: ReducerKind,
    pub vertex_reducer: ReducerKind,
}

impl DedupSection {
    pub fn dedup_config(&self) -> DedupConfig {
        DedupConfig { no_bidirectional: self.no_bidirectional }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub kind: TokenizerKind,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Use JSON format for log output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngressConfig::default();
        assert_eq!(config.partitioning.num_partitions, 4);
        assert_eq!(config.partitioning.ingress_code, 1);
        assert_eq!(config.reader.start_delimiter, "<page>");
        assert!(!config.dedup.no_bidirectional);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [partitioning]
            num_partitions = 9
            ingress_code = 2

            [reader]
            start_delimiter = "<doc>"
            end_delimiter = "</doc>"
            position_check = "fatal"
            max_record_bytes = 4096

            [dedup]
            no_bidirectional = true
            key_function = "unordered_pair"
            edge_reducer = { kind = "sum" }

            [tokenizer]
            kind = "edge_list"
        "#;
        let config = IngressConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.partitioning.num_partitions, 9);
        assert_eq!(config.reader.position_check, PositionCheck::Fatal);
        assert_eq!(config.reader.max_record_bytes, Some(4096));
        assert_eq!(config.dedup.key_function, KeyFunction::UnorderedPair);
        assert_eq!(config.dedup.edge_reducer, ReducerKind::Sum);
        assert_eq!(config.dedup.vertex_reducer, ReducerKind::Overwrite);
        assert_eq!(config.tokenizer.kind, TokenizerKind::EdgeList);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = IngressConfig::default();
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("[partitioning]"));
        assert!(toml_str.contains("[reader]"));
        let parsed = IngressConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = IngressConfig::default();
        config.partitioning.ingress_code = 99;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let mut config = IngressConfig::default();
        config.partitioning.num_partitions = 0;
        assert!(config.validate().is_err());

        let mut config = IngressConfig::default();
        config.partitioning.ingress_code = 2;
        config.partitioning.num_partitions = 8;
        assert!(config.validate().is_err());

        let mut config = IngressConfig::default();
        config.partitioning.ingress_code = 2;
        config.partitioning.num_partitions = u32::MAX;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let mut config = IngressConfig::default();
        config.reader.end_delimiter.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingress.toml");
        std::fs::write(&path, "[partitioning]\nnum_partitions = 2\n").unwrap();
        let config = IngressConfig::load(&path).unwrap();
        // Env overrides may apply; only the file-sourced default path is checked.
        assert!(config.partitioning.num_partitions > 0);
        assert_eq!(config.reader.end_delimiter, "</page>");
    }
}
