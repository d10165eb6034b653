// 📥 Ledger Import - bulk-load financial records from CSV
//
// Columns mirror the cash-flow form: description, amount, type, date.
// Rows go through the same validation as form submissions. Valid rows are
// written in one batch, so a failed import leaves the ledger untouched.

use crate::entities::FinancialRecord;
use crate::store::{ClinicStore, StoreError};
use crate::validation::{self, FieldErrors, FormInput};
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// 1-based line where the row starts (the header is line 1)
    pub line: u64,
    pub errors: FieldErrors,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub rejected: Vec<RejectedRow>,
}

pub fn import_ledger<R: Read, S: ClinicStore + ?Sized>(
    reader: R,
    store: &S,
) -> Result<ImportReport, ImportError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut report = ImportReport::default();
    let mut records = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let form: FormInput = headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        match validation::validate_transaction(&form) {
            Ok(draft) => records.push(FinancialRecord::book(draft)),
            Err(errors) => report.rejected.push(RejectedRow {
                line: record.position().map_or(0, |p| p.line()),
                errors,
            }),
        }
    }

    if let Err(e) = store.insert_financial_records(&records) {
        tracing::error!(rows = records.len(), error = %e, "ledger import rolled back");
        return Err(e.into());
    }
    report.inserted = records.len();

    tracing::info!(
        inserted = report.inserted,
        rejected = report.rejected.len(),
        "ledger import finished"
    );

    Ok(report)
}

pub fn import_ledger_file<S: ClinicStore + ?Sized>(
    path: &Path,
    store: &S,
) -> Result<ImportReport, ImportError> {
    let file = File::open(path).map_err(|source| ImportError::Open {
        path: path.display().to_string(),
        source,
    })?;
    import_ledger(file, store)
}
