//! casework CLI: operator interface to the findings store and unit generator.

use casework::catalog::Catalog;
use casework::config::Config;
use casework::config::secrets::ExposeSecret;
use casework::generator::Generator;
use casework::locator::Locator;
use casework::model::{DocumentNumber, DocumentUrl, Partition, UnitType};
use casework::store::{ExportFilters, ExportFormat, Store};
use casework::telemetry::{SERVICE_NAME, TelemetryConfig, init_telemetry};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "casework", about = "Work units, validation and findings for document verification")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Finding counts and coverage per unit type
    Status,
    /// Write a public snapshot of the findings store
    Export {
        /// json or csv
        #[arg(long, default_value = "json")]
        format: String,
        /// Only findings with this status (quarantined is never included otherwise)
        #[arg(long)]
        status: Option<String>,
        /// Only findings for this unit type
        #[arg(long)]
        unit_type: Option<String>,
        /// Only findings from this worker
        #[arg(long)]
        worker: Option<String>,
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Findings citing a document
    Findings {
        /// Document identifier, e.g. EFTA00039186
        document: String,
    },
    /// Resolve a document number to a live URL, trying adjacent partitions
    Resolve {
        /// Document number (digits only)
        number: u32,
        /// Primary partition; looked up from the catalog's ranges when omitted
        #[arg(long)]
        partition: Option<u8>,
    },
    /// Generate one unit from the catalog and print it
    Preview {
        /// verify_finding or decision_chain
        #[arg(long = "type")]
        unit_type: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: SERVICE_NAME.to_string(),
        log_level: config.log_level.clone(),
    })?;

    match cli.command {
        Command::Status => {
            let store = Store::connect(config.database_url.expose_secret()).await?;
            cmd_status(&store).await
        }
        Command::Export {
            format,
            status,
            unit_type,
            worker,
            out,
        } => {
            let filters = ExportFilters {
                status: status.map(|s| s.parse()).transpose()?,
                unit_type: unit_type.map(|t| t.parse()).transpose()?,
                worker_id: worker,
            };
            let format: ExportFormat = format.parse()?;
            let store = Store::connect(config.database_url.expose_secret()).await?;
            cmd_export(&store, format, &filters, out).await
        }
        Command::Findings { document } => {
            let store = Store::connect(config.database_url.expose_secret()).await?;
            cmd_findings(&store, &document).await
        }
        Command::Resolve { number, partition } => cmd_resolve(&config, number, partition).await,
        Command::Preview { unit_type } => cmd_preview(&config, &unit_type),
    }
}

async fn cmd_status(store: &Store) -> anyhow::Result<()> {
    store.health_check().await?;
    let counts = store.count_by_status().await?;
    println!(
        "findings: {} total, {} accepted, {} quarantined, {} pending, {} disputed",
        counts.total(),
        counts.accepted,
        counts.quarantined,
        counts.pending,
        counts.disputed
    );
    for unit_type in UnitType::ALL {
        let c = store.get_coverage(unit_type).await?;
        println!(
            "{:<16} {:>6}/{:<6} {:>6.2}%",
            c.unit_type.as_str(),
            c.completed,
            c.total,
            c.percent
        );
    }
    Ok(())
}

async fn cmd_export(
    store: &Store,
    format: ExportFormat,
    filters: &ExportFilters,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let bytes = store.export(format, filters).await?;
    match out {
        Some(path) => {
            tokio::fs::write(&path, &bytes).await?;
            println!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            use std::io::Write as _;
            std::io::stdout().write_all(&bytes)?;
        }
    }
    Ok(())
}

async fn cmd_findings(store: &Store, document: &str) -> anyhow::Result<()> {
    let findings = store.get_findings_for_document(document).await?;
    if findings.is_empty() {
        println!("No findings cite {document}.");
        return Ok(());
    }
    println!(
        "{:<38} {:<16} {:<12} {:<20} SUBMITTED",
        "FINDING", "UNIT TYPE", "STATUS", "WORKER"
    );
    for f in &findings {
        println!(
            "{:<38} {:<16} {:<12} {:<20} {}",
            f.finding_id,
            f.unit_type.as_str(),
            f.status.as_str(),
            f.worker_id,
            f.submitted_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn cmd_resolve(config: &Config, number: u32, partition: Option<u8>) -> anyhow::Result<()> {
    let document = DocumentNumber::new(number)?;
    let catalog = Catalog::load_from_dir(&config.data_dir)?;
    let locator = Locator::new(config.corpus_base_url.clone(), catalog.ranges)?;

    let primary = match partition {
        Some(p) => Partition::new(p)?,
        None => locator.get_primary_partition(document).ok_or_else(|| {
            anyhow::anyhow!("no partition range covers {document}; pass --partition")
        })?,
    };

    let result = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        let exists = |url: &DocumentUrl| {
            client
                .head(url.as_str())
                .send()
                .map(|r| r.status().is_success())
                .unwrap_or(false)
        };
        Ok(locator.resolve(document, primary, &exists))
    })
    .await??;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_preview(config: &Config, unit_type: &str) -> anyhow::Result<()> {
    let catalog = Catalog::load_from_dir(&config.data_dir)?;
    let locator = Locator::new(config.corpus_base_url.clone(), catalog.ranges.clone())?;
    let generator = Generator::new(&catalog, locator);
    let unit = generator.generate(unit_type)?;
    println!("{}", serde_json::to_string_pretty(&unit)?);
    Ok(())
}
