// Clinica - Core Library
// Patient registry, daily agenda, procedure catalog and cash-flow ledger.
// Exposes all modules for use in the CLI, the web server, and tests

pub mod entities;
pub mod validation;    // Form input → typed drafts
pub mod scheduling;    // Slots, daily window, next appointment
pub mod ledger;        // KPIs + chart series
pub mod store;         // SQLite persistence
pub mod queries;       // Read paths
pub mod commands;      // Write paths
pub mod import;        // CSV ledger import
pub mod config;
pub mod logging;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use entities::{
    AgendaEntry, Appointment, AppointmentStatus, FinancialRecord, NewAppointment,
    NewFinancialRecord, NewPatient, NewProcedure, Patient, Procedure, RecordStatus, RecordType,
};
pub use validation::{
    parse_locale_decimal, validate_appointment, validate_patient, validate_procedure,
    validate_transaction, FieldErrors, FormInput,
};
pub use scheduling::{combine, next_upcoming, DayWindow};
pub use ledger::{chart_series, ChartPoint, LedgerError, LedgerSummary, LedgerView, RECENT_WINDOW};
pub use queries::QueryError;
pub use store::{ClinicStore, SqliteStore, StoreError};
pub use commands::{
    create_appointment, create_patient, create_procedure, create_transaction, CommandError,
    ErrorBody, Redirect, StaleViews, View, ViewRefresh,
};
pub use config::{Config, ConfigError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
