// Shipflow CLI - Thin wrapper around the core pipeline
// Loads shipment rows from CSV, runs one batch, prints the run report.
// All contracts live in the library; this file only moves data in and out.

use anyhow::{Context, Result};
use std::env;
use std::path::Path;

use shipflow::{
    Pipeline, PipelineConfig, RawValue, ReferenceCell, ShipmentRecord, Vendor, YearMonth,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: shipflow <records.csv> [config.json] [reference.csv]");
        eprintln!();
        eprintln!("  records.csv    one row per shipment; first column (or a");
        eprintln!("                 'Case No.'/'ID' column) is the record id,");
        eprintln!("                 a 'Vendor' column tags provenance");
        eprintln!("  config.json    pattern lists, tie-breaks, date formats");
        eprintln!("  reference.csv  trusted pivot: location,month,ending_inventory");
        std::process::exit(2);
    }

    run_batch(&args[1], args.get(2), args.get(3))
}

fn run_batch(
    records_path: &str,
    config_path: Option<&String>,
    reference_path: Option<&String>,
) -> Result<()> {
    println!("🚢 Shipflow v{} - Flow Code & Monthly Stock Run", shipflow::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Configuration
    let config = match config_path {
        Some(path) => {
            println!("\n🗂️  Loading config from {}...", path);
            PipelineConfig::from_file(path)?
        }
        None => {
            println!("\n🗂️  Using built-in configuration");
            PipelineConfig::default()
        }
    };

    // 2. Records
    println!("\n📂 Loading records...");
    let records = load_records(Path::new(records_path))?;
    println!("✓ Loaded {} shipment records", records.len());

    // 3. Optional reference pivot
    let reference = match reference_path {
        Some(path) => {
            println!("\n📋 Loading reference pivot from {}...", path);
            let cells = load_reference(Path::new(path))?;
            println!("✓ Loaded {} reference cells", cells.len());
            Some(cells)
        }
        None => None,
    };

    // 4. Run the pipeline
    println!("\n⚙️  Classifying and aggregating...");
    let pipeline = Pipeline::new(config)?;
    let output = pipeline.run(&records, reference.as_deref())?;

    // 5. Report
    println!("✓ Run {} complete", output.run_id);
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut by_code = [0usize; 5];
    for c in &output.classifications {
        by_code[c.flow_code.code() as usize] += 1;
    }
    println!("Flow Codes:");
    for (code, count) in by_code.iter().enumerate() {
        if *count > 0 {
            println!("  {}: {:>6} records", code, count);
        }
    }

    println!(
        "\nWarehouse balance rows: {}   Site balance rows: {}",
        output.warehouse_balances.len(),
        output.site_balances.len()
    );

    if !output.unbucketed.is_empty() {
        println!("\n⚠️  {} unbucketed location(s):", output.unbucketed.len());
        for u in &output.unbucketed {
            println!("  {} @ {} ({})", u.record_id, u.location, u.reason);
        }
    }

    if !output.warnings.is_empty() {
        println!("\n⚠️  {} warning(s):", output.warnings.len());
        for w in &output.warnings {
            println!("  {}", w);
        }
    }

    if !output.ignored_columns.is_empty() {
        println!("\nIgnored columns:");
        for (column, count) in &output.ignored_columns {
            println!("  {} ({}x)", column, count);
        }
    }

    println!("\n{}", output.validation.summary());
    println!("Fingerprint: {}", output.fingerprint);

    Ok(())
}

/// Load shipment rows: id from a 'Case No.'/'ID' column (else the first
/// column), vendor from a 'Vendor' column, every other column raw
fn load_records(path: &Path) -> Result<Vec<ShipmentRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open records file: {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let id_index = headers
        .iter()
        .position(|h| {
            let lower = h.trim().to_lowercase();
            lower == "case no." || lower == "case no" || lower == "id"
        })
        .unwrap_or(0);

    let vendor_index = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("vendor"));

    let mut records = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let row = result
            .with_context(|| format!("Failed to parse CSV line {}", line + 2))?;

        let id = row.get(id_index).unwrap_or("").trim().to_string();
        let vendor = vendor_index
            .and_then(|i| row.get(i))
            .map(Vendor::detect)
            .unwrap_or(Vendor::Unknown);

        let mut pairs = Vec::new();
        for (i, header) in headers.iter().enumerate() {
            if i == id_index || Some(i) == vendor_index {
                continue;
            }
            let cell = row.get(i).unwrap_or("");
            pairs.push((header.clone(), RawValue::text(cell)));
        }

        records.push(ShipmentRecord::from_pairs(id, vendor, pairs));
    }

    Ok(records)
}

/// Load a trusted pivot: location,month,ending_inventory with month as YYYY-MM
fn load_reference(path: &Path) -> Result<Vec<ReferenceCell>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open reference file: {}", path.display()))?;

    let mut cells = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let row = result
            .with_context(|| format!("Failed to parse reference line {}", line + 2))?;

        let location = row.get(0).unwrap_or("").trim().to_string();
        let month: YearMonth = row
            .get(1)
            .unwrap_or("")
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("reference line {}: {}", line + 2, e))?;
        let ending: f64 = row
            .get(2)
            .unwrap_or("")
            .trim()
            .parse()
            .with_context(|| format!("bad ending_inventory on reference line {}", line + 2))?;

        cells.push(ReferenceCell {
            location,
            month,
            ending_inventory: ending,
        });
    }

    Ok(cells)
}
