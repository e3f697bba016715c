use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use securities_ledger::{
    Amount, Config, Document, DocumentExtraction, Ledger, PeriodKey, Pipeline, UpsertOutcome,
};

/// Log filter when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "info";

const USAGE: &str = "\
Usage: securities-ledger [--config PATH] <command>

Commands:
  extract <document.json>                   Show amounts found on the statement page
  import <document.json> [--period YYYY-MM] Extract and save into the ledger
  list                                      Show every period in the ledger";

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(log_filter(env::var("RUST_LOG").ok()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let config = load_config(&mut args)?;

    match args.first().map(String::as_str) {
        Some("extract") => {
            let doc_path = document_arg(&args)?;
            run_extract(&config, &doc_path)?;
        }
        Some("import") => {
            let doc_path = document_arg(&args)?;
            let period = period_arg(&args)?;
            run_import(&config, &doc_path, period)?;
        }
        Some("list") => run_list(&config)?,
        Some(other) => bail!("Unknown command: {}\n\n{}", other, USAGE),
        None => println!("{}", USAGE),
    }

    Ok(())
}

fn log_filter(rust_log: Option<String>) -> EnvFilter {
    EnvFilter::new(rust_log.unwrap_or_else(|| DEFAULT_LOG_FILTER.into()))
}

/// Pull `--config PATH` out of the argument list and build the configuration
fn load_config(args: &mut Vec<String>) -> Result<Config> {
    let config = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            if i + 1 >= args.len() {
                bail!("--config needs a path");
            }
            let path = args.remove(i + 1);
            args.remove(i);
            Config::from_file(&path).with_context(|| format!("Loading config {}", path))?
        }
        None => Config::default(),
    };
    Ok(config.with_env())
}

fn document_arg(args: &[String]) -> Result<PathBuf> {
    match args.get(1) {
        Some(path) if !path.starts_with("--") => Ok(PathBuf::from(path)),
        _ => bail!("Missing document path\n\n{}", USAGE),
    }
}

fn period_arg(args: &[String]) -> Result<Option<PeriodKey>> {
    match args.iter().position(|a| a == "--period") {
        Some(i) => {
            let raw = args.get(i + 1).context("--period needs a value")?;
            Ok(Some(raw.parse()?))
        }
        None => Ok(None),
    }
}

fn extract_document(config: &Config, doc_path: &Path) -> Result<DocumentExtraction> {
    let pipeline = Pipeline::from_config(config).context("Loading category catalog")?;
    let document = Document::from_json_file(doc_path)?;
    let extraction = pipeline
        .process_document(&document)
        .with_context(|| format!("Processing {}", doc_path.display()))?;
    Ok(extraction)
}

fn run_extract(config: &Config, doc_path: &Path) -> Result<()> {
    println!("📄 Extracting holdings from {}", doc_path.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let extraction = extract_document(config, doc_path)?;
    let catalog = config.catalog()?;

    match &extraction.period {
        Some(period) => println!("\n📅 Period: {}", period),
        None => println!("\n📅 Period: not found (pass --period when importing)"),
    }

    println!();
    for category in catalog.categories() {
        let amount = extraction.amounts.get(&category.name);
        let how = extraction
            .found_by
            .iter()
            .find(|(name, _)| name == &category.name)
            .map(|(_, kind)| format!("  [{}]", kind.name()))
            .unwrap_or_default();
        println!("  {:<12} {:>16}{}", category.label, amount.to_string(), how);
    }

    println!("\n🔍 Diagnostics:");
    for line in &extraction.diagnostics {
        println!("   {}", line);
    }

    Ok(())
}

fn run_import(config: &Config, doc_path: &Path, period: Option<PeriodKey>) -> Result<()> {
    println!("💾 Importing {} into {}", doc_path.display(), config.ledger_path.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let extraction = extract_document(config, doc_path)?;
    let found = extraction.amounts.found_count();
    let total = extraction.amounts.len();
    let record = extraction.into_record(period, &[])?;
    let period = record.period.clone();

    let ledger = Ledger::open(&config.ledger_path, config.catalog()?);
    let outcome = ledger
        .upsert(record)
        .with_context(|| format!("Saving period {}", period))?;

    match outcome {
        UpsertOutcome::Inserted => println!("\n✓ Added period {}", period),
        UpsertOutcome::Updated => println!("\n✓ Overwrote period {}", period),
    }
    println!("✓ {} of {} categories found", found, total);

    Ok(())
}

fn run_list(config: &Config) -> Result<()> {
    let catalog = config.catalog()?;
    let ledger = Ledger::open(&config.ledger_path, catalog.clone());
    let records = ledger.load_all()?;

    println!("📊 Ledger {} ({} periods)", config.ledger_path.display(), records.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if records.is_empty() {
        println!("\nNo periods saved yet.");
        return Ok(());
    }

    let header: Vec<&str> = catalog.categories().iter().map(|c| c.label.as_str()).collect();
    println!("{:<8} {}", "年月", header.join(" | "));

    for record in &records {
        let cells: Vec<String> = catalog
            .names()
            .map(|name| match record.amount(name) {
                Amount::Value(v) => v.to_string(),
                Amount::NotFound => "-".to_string(),
            })
            .collect();
        println!("{:<8} {}", record.period, cells.join(" | "));
    }

    Ok(())
}
