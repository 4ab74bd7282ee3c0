use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use priceaudit_core::completeness::{MissingFieldPolicy, audit_file, render_report_lines};
use priceaudit_core::internal_products::collect_internal_products;
use priceaudit_core::manifest::{ManifestOptions, write_manifest};
use priceaudit_core::orphan_stores::find_orphan_stores;
use priceaudit_core::runtime::{
    InitOptions, PathOverrides, ResolutionContext, ResolvedPaths, init_layout, inspect_runtime,
    resolve_paths,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "priceaudit",
    version,
    about = "Inspection commands for a local catalog of retail price and store files"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[arg(
        short,
        long,
        global = true,
        help = "Log debug events to stderr (RUST_LOG takes precedence)"
    )]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    project_root: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            project_root: cli.project_root.clone(),
            data_dir: cli.data_dir.clone(),
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Count items with a present value for each tracked field")]
    Fields(FieldsArgs),
    #[command(
        name = "internal-products",
        about = "List distinct internal products found in price files"
    )]
    InternalProducts,
    #[command(about = "Write the catalog file listing to data/catalog.json")]
    Manifest(ManifestArgs),
    #[command(
        name = "orphan-stores",
        about = "List store records that have no price file"
    )]
    OrphanStores,
    #[command(about = "Show resolved paths and which inputs exist")]
    Status,
    #[command(about = "Write a default priceaudit.toml")]
    Init(InitArgs),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Args, Default)]
struct FieldsArgs {
    #[arg(long, value_name = "PATH", help = "Catalog JSON file (default: prices.json)")]
    file: Option<PathBuf>,
    #[arg(long, help = "Count items lacking a tracked key as absent instead of failing")]
    missing_as_absent: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ManifestArgs {
    #[arg(long, help = "Print the manifest without writing it")]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long, help = "Overwrite an existing config file")]
    force: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Fields(args)) => run_fields(&runtime, args),
        Some(Commands::InternalProducts) => run_internal_products(&runtime),
        Some(Commands::Manifest(args)) => run_manifest(&runtime, args),
        Some(Commands::OrphanStores) => run_orphan_stores(&runtime),
        Some(Commands::Status) => run_status(&runtime),
        Some(Commands::Init(args)) => run_init(&runtime, args),
        None => run_fields(&runtime, FieldsArgs::default()),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_fields(runtime: &RuntimeOptions, args: FieldsArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime, args.file)?;
    let policy = if args.missing_as_absent {
        MissingFieldPolicy::Absent
    } else {
        paths.missing_fields
    };
    debug!(
        prices = %normalize_path(&paths.prices_path),
        policy = policy.as_str(),
        "running field completeness audit"
    );

    let report = audit_file(&paths.prices_path, policy)?;
    match args.format {
        OutputFormat::Text => {
            for line in render_report_lines(&report) {
                println!("{line}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_internal_products(runtime: &RuntimeOptions) -> Result<()> {
    let paths = resolve_runtime_paths(runtime, None)?;
    let report = collect_internal_products(&paths.prices_dir)?;

    for product in &report.products {
        println!("{}", product.render());
    }
    if runtime.diagnostics {
        println!("scanned_files: {}", report.scanned_files);
        println!("scanned_rows: {}", report.scanned_rows);
        println!("external_rows: {}", report.external_rows);
        println!("internal_products: {}", report.products.len());
    }
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_manifest(runtime: &RuntimeOptions, args: ManifestArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime, None)?;
    let report = write_manifest(
        &paths,
        &ManifestOptions {
            dry_run: args.dry_run,
        },
    )?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&report.manifest)?);
    }
    println!("catalog manifest");
    println!("manifest_path: {}", normalize_path(&report.manifest_path));
    println!("prices: {}", report.manifest.prices.len());
    println!("stores: {}", report.manifest.stores.len());
    println!(
        "prices_per_product: {}",
        report.manifest.prices_per_product.len()
    );
    println!("bytes: {}", report.bytes);
    println!("sha256: {}", report.sha256);
    println!("wrote: {}", format_flag(report.wrote));
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_orphan_stores(runtime: &RuntimeOptions) -> Result<()> {
    let paths = resolve_runtime_paths(runtime, None)?;
    let report = find_orphan_stores(&paths)?;

    for orphan in &report.orphans {
        println!("{}", orphan.render());
    }
    if runtime.diagnostics {
        println!("price_keys: {}", report.price_keys);
        println!("store_files: {}", report.store_files);
        println!("store_rows: {}", report.store_rows);
        println!("orphans: {}", report.orphans.len());
    }
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_status(runtime: &RuntimeOptions) -> Result<()> {
    let paths = resolve_runtime_paths(runtime, None)?;
    let status = inspect_runtime(&paths)?;

    println!("runtime status");
    println!("project_root: {}", normalize_path(&paths.project_root));
    println!(
        "project_root_exists: {}",
        format_flag(status.project_root_exists)
    );
    println!("prices_path: {}", normalize_path(&paths.prices_path));
    println!(
        "prices_file_exists: {}",
        format_flag(status.prices_file_exists)
    );
    println!(
        "prices_file_bytes: {}",
        status
            .prices_file_bytes
            .map(|size| size.to_string())
            .unwrap_or_else(|| "n/a".to_string())
    );
    println!("data_dir: {}", normalize_path(&paths.data_dir));
    println!("data_dir_exists: {}", format_flag(status.data_dir_exists));
    println!("prices_dir_exists: {}", format_flag(status.prices_dir_exists));
    println!("stores_dir_exists: {}", format_flag(status.stores_dir_exists));
    println!(
        "prices_per_product_dir_exists: {}",
        format_flag(status.prices_per_product_dir_exists)
    );
    println!("manifest_exists: {}", format_flag(status.manifest_exists));
    println!("config_path: {}", normalize_path(&paths.config_path));
    println!("config_exists: {}", format_flag(status.config_exists));
    println!("missing_fields: {}", paths.missing_fields.as_str());
    if !status.warnings.is_empty() {
        println!("warnings:");
        for warning in &status.warnings {
            println!("  - {warning}");
        }
    }
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_init(runtime: &RuntimeOptions, args: InitArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime, None)?;
    let report = init_layout(&paths, &InitOptions { force: args.force })?;

    if report.wrote_config {
        println!("Wrote config: {}", normalize_path(&report.config_path));
    } else {
        println!(
            "Config already exists: {} (use --force to overwrite)",
            normalize_path(&report.config_path)
        );
    }
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn resolve_runtime_paths(
    runtime: &RuntimeOptions,
    prices_file: Option<PathBuf>,
) -> Result<ResolvedPaths> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let overrides = PathOverrides {
        project_root: runtime.project_root.clone(),
        data_dir: runtime.data_dir.clone(),
        config: runtime.config.clone(),
        prices_file,
    };

    let initial = resolve_paths(&context, &overrides)?;
    let project_env = initial.project_root.join(".env");
    if project_env.exists() {
        let _ = dotenvy::from_path_override(&project_env);
        return resolve_paths(&context, &overrides);
    }
    Ok(initial)
}

fn print_diagnostics(runtime: &RuntimeOptions, paths: &ResolvedPaths) {
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
