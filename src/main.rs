use anyhow::{bail, Result};
use chrono::Local;
use std::env;
use std::path::Path;

use clinica::config::Config;
use clinica::import::import_ledger_file;
use clinica::queries;
use clinica::store::SqliteStore;

fn main() -> Result<()> {
    let config = Config::from_env()?;
    clinica::logging::init(&config.log_filter);

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("init") => run_init(&config),
        Some("import") => match args.get(2) {
            Some(csv_path) => run_import(&config, Path::new(csv_path)),
            None => bail!("usage: clinica import <ledger.csv>"),
        },
        Some("summary") | None => run_summary(&config),
        Some(other) => bail!("unknown command '{}' (expected init, import or summary)", other),
    }
}

fn run_init(config: &Config) -> Result<()> {
    println!("🔧 Setting up database...");
    SqliteStore::open(&config.database_path)?;
    println!("✓ Database ready at {:?} (WAL mode)", config.database_path);
    Ok(())
}

fn run_import(config: &Config, csv_path: &Path) -> Result<()> {
    println!("📂 Importing ledger from {:?}...", csv_path);

    let store = SqliteStore::open(&config.database_path)?;
    let report = import_ledger_file(csv_path, &store)?;

    println!("✓ Inserted: {} records", report.inserted);
    if !report.rejected.is_empty() {
        println!("✗ Rejected: {} rows", report.rejected.len());
        for row in &report.rejected {
            println!("   line {}: {}", row.line, row.errors);
        }
    }

    Ok(())
}

fn run_summary(config: &Config) -> Result<()> {
    let db_path = &config.database_path;
    if !db_path.exists() {
        eprintln!("❌ Database not found at {:?}", db_path);
        eprintln!("   Run: clinica init");
        std::process::exit(1);
    }

    let store = SqliteStore::open(db_path)?;
    let now = Local::now().naive_local();

    let dashboard = queries::dashboard(&store, now)?;
    let ledger = queries::financial_overview(&store, config.recent_window)?;

    println!("📊 {} {}", clinica::config::APP_NAME, clinica::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Patients:            {}", dashboard.patient_count);
    println!("Appointments today:  {}", dashboard.appointments_today);
    match &dashboard.next_appointment {
        Some(next) => println!(
            "Next appointment:    {} - {}",
            next.appointment.date_time.format("%d/%m %H:%M"),
            next.patient_name
        ),
        None => println!("Next appointment:    none"),
    }
    println!("Revenue (all time):  {}", dashboard.total_revenue);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Last {} records:", ledger.records.len());
    println!("  Income:   {}", ledger.summary.total_income);
    println!("  Expense:  {}", ledger.summary.total_expense);
    println!("  Balance:  {}", ledger.summary.net_balance);

    Ok(())
}
