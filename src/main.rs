use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sales_ledger::{logging, run, PipelineConfig, PipelineInputs, SchemaVariant};

/// Combine Cantaloupe and Kiosoft exports into one flat sales ledger (CSV)
#[derive(Parser, Debug)]
#[command(name = "sales-ledger", version, about)]
struct Cli {
    /// Cantaloupe transaction export
    #[arg(long, value_name = "FILE")]
    cantaloupe: Option<PathBuf>,

    /// Kiosoft card transaction export
    #[arg(long, value_name = "FILE")]
    kiosoft_card: Option<PathBuf>,

    /// Kiosoft coin transaction export
    #[arg(long, value_name = "FILE")]
    kiosoft_coin: Option<PathBuf>,

    /// Output shape: basic or enhanced (overrides config and LEDGER_VARIANT)
    #[arg(long)]
    variant: Option<SchemaVariant>,

    /// TOML deployment config
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where to write the ledger CSV (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write a JSON run report (kept/dropped rows) to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    logging::init_logging();
    let cli = Cli::parse();

    let config = load_config(&cli)?;

    let cantaloupe = read_input(cli.cantaloupe.as_deref())?;
    let kiosoft_card = read_input(cli.kiosoft_card.as_deref())?;
    let kiosoft_coin = read_input(cli.kiosoft_coin.as_deref())?;

    let inputs = PipelineInputs {
        cantaloupe: cantaloupe.as_deref(),
        kiosoft_card: kiosoft_card.as_deref(),
        kiosoft_coin: kiosoft_coin.as_deref(),
    };

    let output = run(&inputs, &config)?;

    match &cli.output {
        Some(path) => {
            fs::write(path, &output.csv)
                .with_context(|| format!("Failed to write ledger: {}", path.display()))?;
            eprintln!(
                "✓ Wrote {} rows (total {:.2}) to {}",
                output.ledger.len(),
                output.ledger.total_amount(),
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output.csv.as_bytes())?;
            stdout.flush()?;
        }
    }

    if let Some(path) = &cli.report {
        fs::write(path, output.report.to_json()?)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        eprintln!("✓ Run report: {}", path.display());
    }

    Ok(())
}

/// File config, then LEDGER_VARIANT, then --variant
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let config = config.apply_env()?;

    Ok(match cli.variant {
        Some(variant) => config.with_variant(variant),
        None => config,
    })
}

fn read_input(path: Option<&Path>) -> Result<Option<Vec<u8>>> {
    path.map(|p| fs::read(p).with_context(|| format!("Failed to open file: {}", p.display())))
        .transpose()
}
