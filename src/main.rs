//! make-chain CLI
//!
//! Reads a leaf certificate, loads candidate certificates from the system
//! bundle and a CA directory, and writes the leaf-to-root chain as PEM.

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use make_chain::{
    pem, write_chain_pem, CandidateLoader, ChainBuilder, ChainConfiguration, ChainStatus,
    ConfigManager, ExportFormat,
};
use miette::{Context, IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit code when no root certificate was found.
const EXIT_INCOMPLETE: u8 = 2;

/// Exit code when the walk ran into a certificate already in the chain.
const EXIT_CYCLE: u8 = 3;

#[derive(Parser)]
#[command(name = "make-chain")]
#[command(about = "make a chain from a single certificate")]
#[command(long_about = "
Builds the chain for a certificate by repeatedly looking up its issuer among
the certificates found in the system bundle and the CA path, and writes the
result (leaf first) as concatenated PEM blocks.

Issuers are matched on their encoded names only. Signatures and validity
periods are NOT checked.

EXIT CODES:
    0   chain ends in a self-signed root
    2   no root found (partial chain written)
    3   issuer loop detected (partial chain written)

ENVIRONMENT VARIABLES:
    CA_PATH     Path to certificate store
    DEBUG       Debug output (true/false)
    RUST_LOG    Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    /// PEM (or DER) encoded certificate to build the chain for
    #[arg(value_name = "CERT", required_unless_present = "show_config")]
    cert: Option<PathBuf>,

    /// Path to certificate store
    #[arg(short = 'c', long, value_name = "DIR")]
    ca_path: Option<PathBuf>,

    /// Debug output
    #[arg(short, long)]
    debug: bool,

    /// Write the chain to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not load the system CA bundle
    #[arg(long)]
    no_system_bundle: bool,

    /// Exit with status 0 even when no root was found
    #[arg(long)]
    allow_incomplete: bool,

    /// Print the effective configuration and exit
    #[arg(long, value_enum, value_name = "FORMAT")]
    show_config: Option<ExportFormatArg>,

    /// Save the effective configuration to the config file
    #[arg(long)]
    save_config: bool,
}

#[derive(ValueEnum, Clone, Copy)]
enum ExportFormatArg {
    Toml,
    Json,
    Yaml,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Toml => ExportFormat::Toml,
            ExportFormatArg::Json => ExportFormat::Json,
            ExportFormatArg::Yaml => ExportFormat::Yaml,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };
    let config = resolve_config(&cli, &manager)?;

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if config.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    if let Some(format) = cli.show_config {
        let rendered = config
            .export(format.into())
            .context("Failed to render configuration")?;
        println!("{rendered}");
        return Ok(ExitCode::SUCCESS);
    }

    if cli.save_config {
        manager
            .save(&config)
            .context("Failed to save configuration")?;
    }

    let Some(cert_path) = &cli.cert else {
        return Err(miette::miette!("no certificate file given"));
    };

    let leaf_bytes = std::fs::read(cert_path)
        .into_diagnostic()
        .with_context(|| format!("unable to open file({})", cert_path.display()))?;
    let leaf = pem::read_leaf(&leaf_bytes).with_context(|| {
        format!(
            "unable to parse certificate from file({})",
            cert_path.display()
        )
    })?;

    let ca_path = config.expanded_ca_path(|key| std::env::var(key).ok());
    let (pool, summary) = CandidateLoader::from_config(&config, ca_path.clone()).load();
    if pool.is_empty() {
        log::warn!(
            "no candidate certificates found in {} ({} files read)",
            ca_path.display(),
            summary.files_read
        );
    }

    let outcome = ChainBuilder::new(&pool).build(leaf);

    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .into_diagnostic()
                .with_context(|| format!("unable to create output file({})", path.display()))?;
            write_chain_pem(&outcome.chain, &mut BufWriter::new(file))
                .context("Failed to write chain")?;
        }
        None => {
            write_chain_pem(&outcome.chain, &mut io::stdout().lock())
                .context("Failed to write chain")?;
        }
    }

    let last = outcome.chain.last();
    let code = match outcome.status {
        ChainStatus::Complete => {
            log::info!(
                "chain complete: {} certificates, root {}",
                outcome.chain.len(),
                last.subject()
            );
            ExitCode::SUCCESS
        }
        ChainStatus::Incomplete => {
            log::warn!(
                "partial chain, root CA not found: no issuer for {} (issuer {})",
                last.subject(),
                last.issuer()
            );
            if config.allow_incomplete {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_INCOMPLETE)
            }
        }
        ChainStatus::CycleDetected => {
            log::error!(
                "issuer loop detected after {}: its issuer {} is already in the chain",
                last.subject(),
                last.issuer()
            );
            ExitCode::from(EXIT_CYCLE)
        }
    };

    Ok(code)
}

/// Defaults, then the config file, then environment, then flags.
fn resolve_config(cli: &Cli, manager: &ConfigManager) -> Result<ChainConfiguration> {
    let mut config = manager.load_or_default().with_context(|| {
        format!(
            "Failed to load configuration from {}",
            manager.config_path().display()
        )
    })?;

    config
        .apply_env(|key| std::env::var(key).ok())
        .context("Invalid environment override")?;

    if let Some(ca_path) = &cli.ca_path {
        config.ca_path = ca_path.clone();
    }
    if cli.debug {
        config.debug = true;
    }
    if cli.no_system_bundle {
        config.include_system_bundle = false;
    }
    if cli.allow_incomplete {
        config.allow_incomplete = true;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
