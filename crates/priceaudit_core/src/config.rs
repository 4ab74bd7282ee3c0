use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::completeness::MissingFieldPolicy;

pub const DEFAULT_PRICES_FILE: &str = "prices.json";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const CONFIG_FILENAME: &str = "priceaudit.toml";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct AuditConfig {
    #[serde(default)]
    pub catalog: CatalogSection,
    #[serde(default)]
    pub audit: AuditSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct CatalogSection {
    pub prices_file: Option<String>,
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct AuditSection {
    pub missing_fields: Option<MissingFieldPolicy>,
}

impl AuditConfig {
    pub fn prices_file(&self) -> Option<&str> {
        non_empty(self.catalog.prices_file.as_deref())
    }

    pub fn data_dir(&self) -> Option<&str> {
        non_empty(self.catalog.data_dir.as_deref())
    }
}

/// Load and parse an AuditConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<AuditConfig> {
    if !config_path.exists() {
        return Ok(AuditConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: AuditConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

pub fn parse_missing_field_policy(value: &str) -> Result<MissingFieldPolicy> {
    if value.eq_ignore_ascii_case("error") {
        return Ok(MissingFieldPolicy::Error);
    }
    if value.eq_ignore_ascii_case("absent") {
        return Ok(MissingFieldPolicy::Absent);
    }
    bail!("unsupported missing field policy `{value}` (expected `error` or `absent`)")
}

pub fn render_default_config() -> String {
    format!(
        "# priceaudit configuration (materialized by `priceaudit init`)\n# relative paths resolve against the project root\n\n[catalog]\nprices_file = \"{DEFAULT_PRICES_FILE}\"\ndata_dir = \"{DEFAULT_DATA_DIR}\"\n\n[audit]\n# \"error\" aborts on an item without a tracked key, \"absent\" counts it as empty\nmissing_fields = \"error\"\n"
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
