use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::completeness::MissingFieldPolicy;
use crate::config::{
    AuditConfig, CONFIG_FILENAME, DEFAULT_DATA_DIR, DEFAULT_PRICES_FILE, load_config,
    parse_missing_field_policy, render_default_config,
};

pub const MANIFEST_FILENAME: &str = "catalog.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Config,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Config => "config",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub project_root: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub prices_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self { cwd })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub project_root: PathBuf,
    pub prices_path: PathBuf,
    pub data_dir: PathBuf,
    pub prices_dir: PathBuf,
    pub stores_dir: PathBuf,
    pub prices_per_product_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub config_path: PathBuf,
    pub config: AuditConfig,
    pub missing_fields: MissingFieldPolicy,
    pub root_source: ValueSource,
    pub prices_source: ValueSource,
    pub data_source: ValueSource,
    pub config_source: ValueSource,
    pub missing_fields_source: ValueSource,
}

#[derive(Debug, Clone)]
pub struct RuntimeStatus {
    pub project_root_exists: bool,
    pub prices_file_exists: bool,
    pub prices_file_bytes: Option<u64>,
    pub data_dir_exists: bool,
    pub prices_dir_exists: bool,
    pub stores_dir_exists: bool,
    pub prices_per_product_dir_exists: bool,
    pub manifest_exists: bool,
    pub config_exists: bool,
    pub warnings: Vec<String>,
}

impl ResolvedPaths {
    pub fn diagnostics(&self) -> String {
        format!(
            "project_root={} ({})\nprices_path={} ({})\ndata_dir={} ({})\nprices_dir={}\nstores_dir={}\nprices_per_product_dir={}\nmanifest_path={}\nconfig_path={} ({})\nmissing_fields={} ({})",
            normalize_for_display(&self.project_root),
            self.root_source.as_str(),
            normalize_for_display(&self.prices_path),
            self.prices_source.as_str(),
            normalize_for_display(&self.data_dir),
            self.data_source.as_str(),
            normalize_for_display(&self.prices_dir),
            normalize_for_display(&self.stores_dir),
            normalize_for_display(&self.prices_per_product_dir),
            normalize_for_display(&self.manifest_path),
            normalize_for_display(&self.config_path),
            self.config_source.as_str(),
            self.missing_fields.as_str(),
            self.missing_fields_source.as_str(),
        )
    }
}

pub fn inspect_runtime(paths: &ResolvedPaths) -> Result<RuntimeStatus> {
    let prices_file_exists = paths.prices_path.is_file();
    let prices_file_bytes = if prices_file_exists {
        let metadata = fs::metadata(&paths.prices_path)
            .with_context(|| format!("failed to inspect {}", paths.prices_path.display()))?;
        Some(metadata.len())
    } else {
        None
    };
    let data_dir_exists = paths.data_dir.is_dir();
    let prices_dir_exists = paths.prices_dir.is_dir();
    let stores_dir_exists = paths.stores_dir.is_dir();

    let mut warnings = Vec::new();
    if !prices_file_exists {
        warnings.push(format!(
            "{} is missing; `fields` has nothing to audit",
            normalize_for_display(&paths.prices_path)
        ));
    }
    if !data_dir_exists {
        warnings.push(format!(
            "{} is missing; directory scans will report empty results",
            normalize_for_display(&paths.data_dir)
        ));
    } else {
        if !prices_dir_exists {
            warnings.push(format!(
                "{} is missing; every store will look orphaned",
                normalize_for_display(&paths.prices_dir)
            ));
        }
        if !stores_dir_exists {
            warnings.push(format!(
                "{} is missing; orphan detection has no input",
                normalize_for_display(&paths.stores_dir)
            ));
        }
    }

    Ok(RuntimeStatus {
        project_root_exists: paths.project_root.is_dir(),
        prices_file_exists,
        prices_file_bytes,
        data_dir_exists,
        prices_dir_exists,
        stores_dir_exists,
        prices_per_product_dir_exists: paths.prices_per_product_dir.is_dir(),
        manifest_exists: paths.manifest_path.is_file(),
        config_exists: paths.config_path.is_file(),
        warnings,
    })
}

#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct InitReport {
    pub config_path: PathBuf,
    pub wrote_config: bool,
}

pub fn resolve_paths(
    context: &ResolutionContext,
    overrides: &PathOverrides,
) -> Result<ResolvedPaths> {
    resolve_paths_with_lookup(context, overrides, |key| env::var(key).ok())
}

pub(crate) fn resolve_paths_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: F,
) -> Result<ResolvedPaths>
where
    F: Fn(&str) -> Option<String>,
{
    let (project_root, root_source) = if let Some(path) = overrides.project_root.as_deref() {
        (absolutize(path, &context.cwd), ValueSource::Flag)
    } else if let Some(value) = lookup_non_empty(&lookup_env, "PRICEAUDIT_PROJECT_ROOT") {
        (
            absolutize(Path::new(&value), &context.cwd),
            ValueSource::Env,
        )
    } else {
        (context.cwd.clone(), ValueSource::Default)
    };

    let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
        (absolutize(path, &project_root), ValueSource::Flag)
    } else if let Some(value) = lookup_non_empty(&lookup_env, "PRICEAUDIT_CONFIG") {
        (
            absolutize(Path::new(&value), &project_root),
            ValueSource::Env,
        )
    } else {
        (project_root.join(CONFIG_FILENAME), ValueSource::Default)
    };
    let config = load_config(&config_path)?;

    let (data_dir, data_source) = if let Some(path) = overrides.data_dir.as_deref() {
        (absolutize(path, &project_root), ValueSource::Flag)
    } else if let Some(value) = lookup_non_empty(&lookup_env, "PRICEAUDIT_DATA_DIR") {
        (
            absolutize(Path::new(&value), &project_root),
            ValueSource::Env,
        )
    } else if let Some(value) = config.data_dir() {
        (
            absolutize(Path::new(value), &project_root),
            ValueSource::Config,
        )
    } else {
        (project_root.join(DEFAULT_DATA_DIR), ValueSource::Default)
    };

    let (prices_path, prices_source) = if let Some(path) = overrides.prices_file.as_deref() {
        (absolutize(path, &project_root), ValueSource::Flag)
    } else if let Some(value) = lookup_non_empty(&lookup_env, "PRICEAUDIT_PRICES_FILE") {
        (
            absolutize(Path::new(&value), &project_root),
            ValueSource::Env,
        )
    } else if let Some(value) = config.prices_file() {
        (
            absolutize(Path::new(value), &project_root),
            ValueSource::Config,
        )
    } else {
        (project_root.join(DEFAULT_PRICES_FILE), ValueSource::Default)
    };

    let (missing_fields, missing_fields_source) =
        if let Some(value) = lookup_non_empty(&lookup_env, "PRICEAUDIT_MISSING_FIELDS") {
            (parse_missing_field_policy(&value)?, ValueSource::Env)
        } else if let Some(policy) = config.audit.missing_fields {
            (policy, ValueSource::Config)
        } else {
            (MissingFieldPolicy::default(), ValueSource::Default)
        };

    Ok(ResolvedPaths {
        prices_dir: data_dir.join("prices"),
        stores_dir: data_dir.join("stores"),
        prices_per_product_dir: data_dir.join("prices_per_product"),
        manifest_path: data_dir.join(MANIFEST_FILENAME),
        project_root,
        prices_path,
        data_dir,
        config_path,
        config,
        missing_fields,
        root_source,
        prices_source,
        data_source,
        config_source,
        missing_fields_source,
    })
}

pub fn init_layout(paths: &ResolvedPaths, options: &InitOptions) -> Result<InitReport> {
    let wrote_config = write_text_file(&paths.config_path, &render_default_config(), options.force)?;
    Ok(InitReport {
        config_path: paths.config_path.clone(),
        wrote_config,
    })
}

fn lookup_non_empty<F>(lookup_env: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup_env(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn write_text_file(path: &Path, content: &str, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }

    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create parent directory {}", parent.display()))?;
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

pub fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
