use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use conform::config::CONFIG_FILE;
use conform::Config;
use conform_report::{json, markdown, text};

#[derive(Parser)]
#[command(name = "conform")]
#[command(about = "Check Go projects against declared architecture rules")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a project and exit with code 0 (pass) or 1 (violations)
    Check {
        /// Path to the project root
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Config file path (defaults to .conform.toml in the project or an ancestor)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },
    /// Create a default .conform.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
    /// List application packages and the layers they belong to
    Packages {
        /// Path to the project root
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Check {
            path,
            config,
            format,
        } => cmd_check(&path, config.as_deref(), format),
        Commands::Init { force } => cmd_init(force),
        Commands::Packages { path, config } => cmd_packages(&path, config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_check(path: &Path, config_path: Option<&Path>, format: Format) -> Result<()> {
    let config = load_config(path, config_path)?;
    let arch = conform::architecture(path, &config)?;
    let rules = conform::rules_from_config(&arch, &config.rules)?;
    if rules.is_empty() {
        tracing::warn!("no rules configured");
    }
    let report = conform::validate(&arch, &rules);

    let (output, passed) = match format {
        Format::Text => text::format_check(report.as_ref()),
        Format::Json => {
            json::format_check(report.as_ref(), false).context("failed to serialize report")?
        }
        Format::Markdown => markdown::format_check(report.as_ref()),
    };
    print!("{output}");
    if matches!(format, Format::Json) {
        println!();
    }
    if !passed {
        process::exit(1);
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())
        .with_context(|| format!("failed to write {CONFIG_FILE}"))?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}

fn cmd_packages(path: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(path, config_path)?;
    let arch = conform::architecture(path, &config)?;

    let packages = arch.artifact().packages(true);
    println!(
        "{} ({})",
        format!("Packages of {}", arch.artifact().module()).bold(),
        packages.len()
    );
    for package in packages {
        let layers = arch.layers_of(package.id());
        if layers.is_empty() {
            println!("  {}", package.id());
        } else {
            println!("  {} {}", package.id(), format!("[{}]", layers.join(", ")).cyan());
        }
    }
    Ok(())
}

fn load_config(project_path: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => Ok(Config::load_or_default(project_path)),
    }
}
