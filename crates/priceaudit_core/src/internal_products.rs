use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::filesystem::{DataFile, list_data_files};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct InternalProduct {
    pub chain_id: String,
    pub store_id: String,
    pub item_code: String,
    pub name: String,
}

impl InternalProduct {
    pub fn render(&self) -> String {
        format!(
            "{} {} {} {}",
            self.chain_id, self.store_id, self.item_code, self.name
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InternalProductsReport {
    pub scanned_files: usize,
    pub scanned_rows: usize,
    pub external_rows: usize,
    pub products: Vec<InternalProduct>,
}

/// Collect the distinct internal products listed in the price CSV files.
///
/// Price files are named `<chain>_<store>[...].<ext>`; column 0 holds the item
/// code, column 1 the internal flag and column 2 the item name. Rows flagged
/// `false` are external products and are skipped.
pub fn collect_internal_products(prices_dir: &Path) -> Result<InternalProductsReport> {
    let files = list_data_files(prices_dir)?;
    let mut products = BTreeSet::new();
    let mut scanned_rows = 0usize;
    let mut external_rows = 0usize;

    for file in &files {
        let (chain_id, store_id) = price_file_ids(file)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&file.path)
            .with_context(|| format!("failed to open {}", file.path.display()))?;

        for (index, record) in reader.records().enumerate() {
            let record =
                record.with_context(|| format!("failed to read {}", file.path.display()))?;
            scanned_rows += 1;
            if record.get(1) == Some("false") {
                external_rows += 1;
                continue;
            }
            let (Some(item_code), Some(name)) = (record.get(0), record.get(2)) else {
                bail!(
                    "row {} of {} has {} columns; expected at least 3",
                    index + 1,
                    file.path.display(),
                    record.len()
                );
            };
            products.insert(InternalProduct {
                chain_id: chain_id.to_string(),
                store_id: store_id.to_string(),
                item_code: item_code.to_string(),
                name: name.to_string(),
            });
        }
        debug!(file = %file.file_name, "scanned price file");
    }

    info!(
        files = files.len(),
        rows = scanned_rows,
        products = products.len(),
        "internal product scan finished"
    );
    Ok(InternalProductsReport {
        scanned_files: files.len(),
        scanned_rows,
        external_rows,
        products: products.into_iter().collect(),
    })
}

fn price_file_ids(file: &DataFile) -> Result<(&str, &str)> {
    let mut parts = file.stem().split('_');
    match (parts.next(), parts.next()) {
        (Some(chain_id), Some(store_id)) if !chain_id.is_empty() => Ok((chain_id, store_id)),
        _ => bail!(
            "price file name must look like <chain>_<store>.<ext>: {}",
            file.path.display()
        ),
    }
}
