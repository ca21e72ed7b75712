//! cohort-runner: builds the signup cohort workbook from a source database.
//!
//! Usage:
//!   cohort-runner --db source.db
//!   cohort-runner --db source.db --config report.json --start 2023-01 --end 2023-12 --out ./reports
//!   cohort-runner --db fresh.db --migrate

use anyhow::{Context, Result};
use cohort_core::{
    clock::RunClock,
    config::ReportConfig,
    export,
    report,
    store::CohortStore,
    YearMonth,
};
use std::env;
use std::path::PathBuf;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = flag_value(&args, "--db").unwrap_or("./cohort.db");
    let migrate = args.iter().any(|a| a == "--migrate");

    let mut config = match flag_value(&args, "--config") {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };
    if let Some(start) = flag_value(&args, "--start") {
        config.start_month = start.parse::<YearMonth>().context("--start")?;
    }
    if let Some(end) = flag_value(&args, "--end") {
        config.end_month = Some(end.parse::<YearMonth>().context("--end")?);
    }
    if let Some(out) = flag_value(&args, "--out") {
        config.output_dir = PathBuf::from(out);
    }

    let clock = RunClock::from_system();
    let end_month = config.resolve_end_month(&clock);

    println!("{}", "=".repeat(70));
    println!("COMPLETE COHORT ANALYSIS - SIGNUP BASED");
    println!("{}", "=".repeat(70));
    println!("  db:          {db}");
    println!("  date range:  {} to {end_month}", config.start_month);
    println!("  cohort by:   signup month");
    println!("  output dir:  {}", config.output_dir.display());
    println!();

    let store = CohortStore::open(db)?;
    if migrate {
        store.migrate()?;
    }

    let sources = store.load_sources(&config)?;
    if sources.signups.is_empty() {
        println!("No data found!");
        return Ok(());
    }

    let workbook = report::run_report(&sources, &config, &clock)?;
    let paths = export::write_workbook(&workbook, &config.output_dir)?;
    log::info!("manifest written to {}", paths.manifest.display());

    println!("=== RUN SUMMARY ===");
    println!("  signups:        {}", sources.signups.len());
    println!("  kyc records:    {}", sources.kyc.len());
    println!("  investments:    {}", sources.investments.len());
    println!("  sheets planned: {}", workbook.planned);
    println!("  sheets written: {}", workbook.sheets.len());
    println!("  saved to:       {}", paths.directory.display());
    println!("{}", "=".repeat(70));
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
