use std::collections::BTreeSet;

use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::filesystem::{first_segment, list_data_files};
use crate::runtime::ResolvedPaths;

const STORE_ID_COLUMN: &str = "store_id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanStore {
    pub store_file: String,
    pub chain_id: String,
    pub store_id: String,
    /// Row as `(column, value)` pairs in header order.
    pub record: Vec<(String, String)>,
}

impl OrphanStore {
    pub fn price_key(&self) -> String {
        format!("{}_{}", self.chain_id, self.store_id)
    }

    pub fn render(&self) -> String {
        let fields = self
            .record
            .iter()
            .map(|(column, value)| format!("{column}={value}"))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} {fields}", self.store_file)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrphanStoresReport {
    pub price_keys: usize,
    pub store_files: usize,
    pub store_rows: usize,
    pub orphans: Vec<OrphanStore>,
}

/// Store rows whose `<chain>_<store_id>` has no matching price file.
pub fn find_orphan_stores(paths: &ResolvedPaths) -> Result<OrphanStoresReport> {
    let price_keys = list_data_files(&paths.prices_dir)?
        .iter()
        .map(|file| file.stem().to_string())
        .collect::<BTreeSet<_>>();
    let store_files = list_data_files(&paths.stores_dir)?;

    let mut orphans = Vec::new();
    let mut store_rows = 0usize;
    for file in &store_files {
        let chain_id = first_segment(&file.file_name, '_');
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&file.path)
            .with_context(|| format!("failed to open {}", file.path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("failed to read header of {}", file.path.display()))?
            .clone();
        if headers.is_empty() {
            warn!(file = %file.file_name, "store file has no header; skipping");
            continue;
        }
        let Some(store_column) = headers.iter().position(|column| column == STORE_ID_COLUMN)
        else {
            bail!(
                "store file {} has no `{STORE_ID_COLUMN}` column",
                file.path.display()
            );
        };

        for record in reader.records() {
            let record =
                record.with_context(|| format!("failed to read {}", file.path.display()))?;
            store_rows += 1;
            let store_id = record.get(store_column).unwrap_or_default();
            if price_keys.contains(&format!("{chain_id}_{store_id}")) {
                continue;
            }
            orphans.push(OrphanStore {
                store_file: file.file_name.clone(),
                chain_id: chain_id.to_string(),
                store_id: store_id.to_string(),
                record: headers
                    .iter()
                    .zip(record.iter())
                    .map(|(column, value)| (column.to_string(), value.to_string()))
                    .collect(),
            });
        }
        debug!(file = %file.file_name, "scanned store file");
    }

    info!(
        price_keys = price_keys.len(),
        store_files = store_files.len(),
        rows = store_rows,
        orphans = orphans.len(),
        "orphan store scan finished"
    );
    Ok(OrphanStoresReport {
        price_keys: price_keys.len(),
        store_files: store_files.len(),
        store_rows,
        orphans,
    })
}
