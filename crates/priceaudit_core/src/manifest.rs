use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::filesystem::list_data_files;
use crate::runtime::ResolvedPaths;

/// File listing of the local price catalog, written to `data/catalog.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogManifest {
    pub prices: Vec<String>,
    pub stores: Vec<String>,
    pub prices_per_product: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ManifestReport {
    pub manifest: CatalogManifest,
    pub manifest_path: PathBuf,
    pub bytes: usize,
    pub sha256: String,
    pub wrote: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ManifestOptions {
    pub dry_run: bool,
}

pub fn build_manifest(paths: &ResolvedPaths) -> Result<CatalogManifest> {
    Ok(CatalogManifest {
        prices: list_names(&paths.prices_dir, &paths.manifest_path)?,
        stores: list_names(&paths.stores_dir, &paths.manifest_path)?,
        prices_per_product: list_names(&paths.prices_per_product_dir, &paths.manifest_path)?,
    })
}

/// Build the manifest and, unless `dry_run` is set, write it to
/// `paths.manifest_path`.
pub fn write_manifest(paths: &ResolvedPaths, options: &ManifestOptions) -> Result<ManifestReport> {
    let manifest = build_manifest(paths)?;
    let rendered =
        serde_json::to_string_pretty(&manifest).context("failed to serialize catalog manifest")?;

    if !options.dry_run {
        if let Some(parent) = paths.manifest_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&paths.manifest_path, &rendered)
            .with_context(|| format!("failed to write {}", paths.manifest_path.display()))?;
    }

    info!(
        path = %paths.manifest_path.display(),
        prices = manifest.prices.len(),
        stores = manifest.stores.len(),
        prices_per_product = manifest.prices_per_product.len(),
        dry_run = options.dry_run,
        "catalog manifest built"
    );
    Ok(ManifestReport {
        manifest_path: paths.manifest_path.clone(),
        bytes: rendered.len(),
        sha256: compute_hash(&rendered),
        wrote: !options.dry_run,
        manifest,
    })
}

fn list_names(dir: &Path, manifest_path: &Path) -> Result<Vec<String>> {
    Ok(list_data_files(dir)?
        .into_iter()
        .filter(|file| file.path != manifest_path)
        .map(|file| file.file_name)
        .collect())
}

fn compute_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut output = String::with_capacity(64);
    for byte in digest.iter() {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}
