//! Store configuration
//!
//! Describes how document types map onto tables, read from `docquery.toml`.
//!
//! ## Environment Variables
//!
//! The following environment variables override config file settings:
//!
//! - `DOCQUERY_SCHEMA` - Database schema that qualifies every table
//! - `DOCQUERY_TABLE_PREFIX` - Prefix for generated table names
//!
//! These can be set in a `.env` file next to the config file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::QueryResult;
use crate::schema::{Casing, DocumentSchema, DEFAULT_TABLE_PREFIX};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "docquery.toml";

/// Environment variable names
pub const ENV_SCHEMA: &str = "DOCQUERY_SCHEMA";
pub const ENV_TABLE_PREFIX: &str = "DOCQUERY_TABLE_PREFIX";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Schema qualifying every table (unqualified when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Prefix for tables of documents without an explicit `table`
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    /// Casing of JSON keys relative to member names
    #[serde(default)]
    pub casing: Casing,
    #[serde(default)]
    pub documents: Vec<DocumentConfig>,
}

/// Per document type overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentConfig {
    #[serde(rename = "type")]
    pub document_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default)]
    pub soft_deleted: bool,
    /// Sub-type alias when the type shares its table with a hierarchy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_class: Option<String>,
}

fn default_table_prefix() -> String {
    DEFAULT_TABLE_PREFIX.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            schema: None,
            table_prefix: default_table_prefix(),
            casing: Casing::default(),
            documents: Vec::new(),
        }
    }
}

impl StoreConfig {
    /// Load `docquery.toml` from a directory
    ///
    /// This also loads any `.env` file in the directory and applies
    /// environment variable overrides.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }

        let config_path = dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            anyhow::bail!("Configuration file not found: {}", config_path.display());
        }
        Self::load_file(&config_path)
    }

    /// Load a config file by path, then apply environment overrides
    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        tracing::debug!(
            "Loaded store config from {} ({} document types)",
            path.display(),
            config.documents.len()
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to a directory
    pub fn save(&self, dir: &Path) -> anyhow::Result<()> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(schema) = lookup(ENV_SCHEMA) {
            if !schema.is_empty() {
                self.schema = Some(schema);
            }
        }

        if let Some(prefix) = lookup(ENV_TABLE_PREFIX) {
            self.table_prefix = prefix;
        }
    }

    pub fn document(&self, document_type: &str) -> Option<&DocumentConfig> {
        self.documents
            .iter()
            .find(|d| d.document_type == document_type)
    }

    /// Build the mapping for a document type; unlisted types get the defaults
    pub fn mapping_for(&self, document_type: &str) -> QueryResult<DocumentSchema> {
        let mut mapping =
            DocumentSchema::with_prefix(document_type, &self.table_prefix)?.casing(self.casing);

        if let Some(schema) = &self.schema {
            mapping = mapping.schema(schema)?;
        }

        if let Some(doc) = self.document(document_type) {
            if let Some(table) = &doc.table {
                mapping = mapping.table(table)?;
            }
            mapping = mapping.soft_deleted(doc.soft_deleted);
            if let Some(alias) = &doc.sub_class {
                mapping = mapping.sub_class(alias.clone());
            }
        }

        Ok(mapping)
    }
}
