use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use fpx_config::{init_tracing, load_for_dir, ExplorerConfig};
use fpx_core::{IndexEntry, LookupFilter, PackageId, PackageRef};
use fpx_explorer::{Explorer, ExplorerError, ExplorerOptions, TracingLogger};
use fpx_packages::FsPackageManager;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "fpx", version, about = "Explore FHIR package contexts from the local package cache")]
struct Cli {
    /// Config file (defaults to `fpx.toml` discovered from the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Package cache root (overrides config and `FPX_PACKAGE_CACHE`)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,
    /// Context package (`id@version`, `id#version` or `id`); repeatable, replaces the config context
    #[arg(long = "context", global = true)]
    context: Vec<String>,
    /// Emit JSON suitable for scripting
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every package in the resolved context
    Context,
    /// List the non-redundant root packages
    Roots,
    /// Expand the dependencies of a package
    Deps(DepsArgs),
    /// Print the manifest (`package.json`) of a package
    Manifest(PackageArgs),
    /// Print every resource matching a filter
    Lookup(QueryArgs),
    /// Print the single resource matching a filter, after duplicate resolution
    Resolve(QueryArgs),
}

#[derive(Args)]
struct DepsArgs {
    package: String,
    /// Only list direct dependency declarations
    #[arg(long)]
    direct: bool,
}

#[derive(Args)]
struct PackageArgs {
    package: String,
}

#[derive(Args)]
struct QueryArgs {
    /// `field=value` constraint; repeatable
    #[arg(short = 'f', long = "filter", value_name = "FIELD=VALUE")]
    filters: Vec<String>,
    /// Restrict the query to a package and its dependencies
    #[arg(long)]
    package: Option<String>,
    /// Print index metadata instead of documents
    #[arg(long)]
    meta: bool,
}

impl QueryArgs {
    fn filter(&self) -> Result<LookupFilter> {
        let mut filter = LookupFilter::from_pairs(&self.filters).context("invalid filter")?;
        if let Some(package) = &self.package {
            let package: PackageRef = package
                .parse()
                .with_context(|| format!("invalid package `{package}`"))?;
            filter = filter.package(package);
        }
        Ok(filter)
    }
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = load_config(&cli)?;
    init_tracing(&config.logging);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(execute(cli, config))
}

fn load_config(cli: &Cli) -> Result<ExplorerConfig> {
    let mut config = match &cli.config {
        Some(path) => ExplorerConfig::load_from_path(path)?,
        None => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            let (config, path) = load_for_dir(&cwd)?;
            if let Some(path) = path {
                tracing::debug!(target: "fpx.cli", path = %path.display(), "loaded config");
            }
            config
        }
    };
    if !cli.context.is_empty() {
        config.context = cli.context.clone();
    }
    if let Some(cache) = &cli.cache {
        config.cache_path = Some(cache.clone());
    }
    Ok(config)
}

async fn open_explorer(config: &ExplorerConfig) -> Result<Explorer> {
    let manager = config
        .cache_path
        .clone()
        .map(FsPackageManager::new)
        .or_else(FsPackageManager::discover)
        .ok_or_else(|| anyhow!("no package cache found; pass --cache or set FPX_PACKAGE_CACHE"))?;
    tracing::debug!(target: "fpx.cli", root = %manager.root().display(), "using package cache");
    let options = ExplorerOptions::try_from(config)?;
    if options.context.is_empty() {
        tracing::warn!(target: "fpx.cli", "context is empty; queries will not match anything");
    }
    let explorer = Explorer::create_with_logger(
        Arc::new(manager),
        options,
        Arc::new(TracingLogger),
    )
    .await?;
    Ok(explorer)
}

async fn execute(cli: Cli, config: ExplorerConfig) -> Result<i32> {
    let explorer = open_explorer(&config).await?;
    let json = cli.json;

    match cli.command {
        Command::Context => {
            print_packages(explorer.context_packages(), json)?;
            Ok(0)
        }
        Command::Roots => {
            print_packages(explorer.normalized_root_packages(), json)?;
            Ok(0)
        }
        Command::Deps(args) => {
            let package: PackageRef = args.package.parse()?;
            let packages = if args.direct {
                explorer.direct_dependencies(&package).await?
            } else {
                explorer.expand_package_dependencies(&package).await?
            };
            print_packages(&packages, json)?;
            Ok(0)
        }
        Command::Manifest(args) => {
            let manifest = explorer.package_manifest(&args.package.parse()?).await?;
            print_json(&manifest)?;
            Ok(0)
        }
        Command::Lookup(args) => {
            let filter = args.filter()?;
            let found = if args.meta {
                let entries = explorer.lookup_meta(&filter).await?;
                let entries: Vec<&IndexEntry> = entries.iter().map(|entry| &**entry).collect();
                print_entries(&entries, json)?;
                entries.len()
            } else {
                let documents = explorer.lookup(&filter).await?;
                print_json(&documents)?;
                documents.len()
            };
            Ok(if found == 0 { 1 } else { 0 })
        }
        Command::Resolve(args) => {
            let filter = args.filter()?;
            let outcome = if args.meta {
                match explorer.resolve_meta(&filter).await {
                    Ok(entry) => print_entries(&[entry.as_ref()], json).map(Ok),
                    Err(err) => Ok(Err(err)),
                }
            } else {
                match explorer.resolve(&filter).await {
                    Ok(document) => print_json(&document).map(Ok),
                    Err(err) => Ok(Err(err)),
                }
            };
            lookup_exit(outcome?)
        }
    }
}

/// No-match and ambiguity are query outcomes: report them and exit 1.
fn lookup_exit(outcome: Result<(), ExplorerError>) -> Result<i32> {
    match outcome {
        Ok(()) => Ok(0),
        Err(err) if err.is_lookup_failure() => {
            eprintln!("{err}");
            Ok(1)
        }
        Err(err) => Err(err.into()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}

fn print_packages(packages: &[PackageId], json: bool) -> Result<()> {
    if json {
        return print_json(packages);
    }
    for package in packages {
        println!("{package}");
    }
    Ok(())
}

fn print_entries(entries: &[&IndexEntry], json: bool) -> Result<()> {
    if json {
        return print_json(entries);
    }
    for entry in entries {
        let canonical = match (&entry.meta.url, &entry.meta.version) {
            (Some(url), Some(version)) => format!("{url}|{version}"),
            (Some(url), None) => url.clone(),
            _ => String::new(),
        };
        println!(
            "{}@{}\t{}\t{}\t{canonical}",
            entry.package_id,
            entry.package_version,
            entry.filename(),
            entry.resource_type(),
        );
    }
    Ok(())
}
