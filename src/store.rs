// 🗄️ Store - SQLite persistence for the clinic
//
// The ClinicStore trait is the only seam the rest of the crate talks to.
// SqliteStore owns one rusqlite Connection; callers serialize access.

use crate::entities::{
    AgendaEntry, Appointment, AppointmentStatus, FinancialRecord, Patient, Procedure,
    RecordStatus, RecordType,
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A UNIQUE constraint rejected the write
    #[error("unique constraint violated on {0}")]
    Conflict(String),

    /// A FOREIGN KEY pointed at a row that does not exist
    #[error("referenced record does not exist")]
    MissingReference,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored value could not be read back into its domain type
    #[error("corrupt value in column {column}: {value}")]
    Corrupt { column: &'static str, value: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Turn constraint failures into Conflict / MissingReference
fn classify(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return StoreError::Conflict(message.clone().unwrap_or_default());
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return StoreError::MissingReference,
            _ => {}
        }
    }
    StoreError::Sqlite(err)
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Persistence collaborator: create / find-many / find-first / count
pub trait ClinicStore {
    fn insert_patient(&self, patient: &Patient) -> Result<(), StoreError>;
    fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;
    fn insert_procedure(&self, procedure: &Procedure) -> Result<(), StoreError>;
    fn insert_financial_record(&self, record: &FinancialRecord) -> Result<(), StoreError>;

    /// Insert every record or none of them
    fn insert_financial_records(&self, records: &[FinancialRecord]) -> Result<(), StoreError>;

    /// All patients, name ascending (ASCII case folded)
    fn patients_by_name(&self) -> Result<Vec<Patient>, StoreError>;
    fn count_patients(&self) -> Result<i64, StoreError>;

    /// Appointments with start <= instant <= end, instant ascending
    fn appointments_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<AgendaEntry>, StoreError>;

    /// Earliest non-canceled appointment with instant >= from; ties go to
    /// the one booked first
    fn first_upcoming(&self, from: NaiveDateTime) -> Result<Option<AgendaEntry>, StoreError>;

    /// All procedures, name ascending (ASCII case folded)
    fn procedures_by_name(&self) -> Result<Vec<Procedure>, StoreError>;

    /// Most recent records first (due date descending), at most `limit`
    fn recent_records(&self, limit: usize) -> Result<Vec<FinancialRecord>, StoreError>;

    fn records_of_type(&self, kind: RecordType) -> Result<Vec<FinancialRecord>, StoreError>;
}

// ============================================================================
// SQLITE IMPLEMENTATION
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // WAL for crash recovery on file databases
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

pub fn setup_database(conn: &Connection) -> Result<(), StoreError> {
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS patients (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            phone TEXT,
            email TEXT UNIQUE,
            cpf TEXT UNIQUE,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS appointments (
            id TEXT PRIMARY KEY NOT NULL,
            patient_id TEXT NOT NULL REFERENCES patients(id),
            date_time TEXT NOT NULL,
            type TEXT NOT NULL,
            notes TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'confirmed', 'finished', 'canceled')),
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS procedures (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            price TEXT NOT NULL,
            duration_min INTEGER NOT NULL CHECK (duration_min > 0),
            description TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS financial_records (
            id TEXT PRIMARY KEY NOT NULL,
            description TEXT NOT NULL,
            amount TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('INCOME', 'EXPENSE')),
            due_date TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);
        CREATE INDEX IF NOT EXISTS idx_appointments_date_time ON appointments(date_time);
        CREATE INDEX IF NOT EXISTS idx_procedures_name ON procedures(name);
        CREATE INDEX IF NOT EXISTS idx_financial_due_date ON financial_records(due_date);",
    )?;

    Ok(())
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn corrupt(column: &'static str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(StoreError::Corrupt {
            column,
            value: value.to_string(),
        }),
    )
}

fn decimal_column(row: &Row<'_>, idx: usize, column: &'static str) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|_| corrupt(column, &raw))
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        national_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Columns: appointment fields 0..=6, patient name at 7
fn agenda_entry_from_row(row: &Row<'_>) -> rusqlite::Result<AgendaEntry> {
    let status: String = row.get(5)?;
    let status = AppointmentStatus::from_str(&status).map_err(|_| corrupt("status", &status))?;

    Ok(AgendaEntry {
        appointment: Appointment {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            date_time: row.get(2)?,
            kind: row.get(3)?,
            notes: row.get(4)?,
            status,
            created_at: row.get(6)?,
        },
        patient_name: row.get(7)?,
    })
}

fn procedure_from_row(row: &Row<'_>) -> rusqlite::Result<Procedure> {
    Ok(Procedure {
        id: row.get(0)?,
        name: row.get(1)?,
        price: decimal_column(row, 2, "price")?,
        duration_min: row.get(3)?,
        description: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<FinancialRecord> {
    let kind: String = row.get(3)?;
    let kind = RecordType::from_str(&kind).map_err(|_| corrupt("type", &kind))?;
    let status: String = row.get(5)?;
    let status = RecordStatus::from_str(&status).map_err(|_| corrupt("status", &status))?;

    Ok(FinancialRecord {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: decimal_column(row, 2, "amount")?,
        kind,
        due_date: row.get(4)?,
        status,
        created_at: row.get(6)?,
    })
}

/// Surface a Corrupt wrapped by row mapping as itself
fn unwrap_row_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::FromSqlConversionFailure(_, _, inner) => {
            match inner.downcast::<StoreError>() {
                Ok(store_err) => *store_err,
                Err(other) => StoreError::Sqlite(rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    other,
                )),
            }
        }
        other => StoreError::Sqlite(other),
    }
}

const AGENDA_SELECT: &str = "SELECT a.id, a.patient_id, a.date_time, a.type, a.notes, a.status, a.created_at, p.name
     FROM appointments a
     JOIN patients p ON p.id = a.patient_id";

const RECORD_SELECT: &str =
    "SELECT id, description, amount, type, due_date, status, created_at FROM financial_records";

fn insert_record(conn: &Connection, record: &FinancialRecord) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO financial_records (id, description, amount, type, due_date, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id,
            record.description,
            record.amount.to_string(),
            record.kind.as_str(),
            record.due_date,
            record.status.as_str(),
            record.created_at,
        ],
    )
    .map_err(classify)?;
    Ok(())
}

impl ClinicStore for SqliteStore {
    fn insert_patient(&self, patient: &Patient) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO patients (id, name, phone, email, cpf, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    patient.id,
                    patient.name,
                    patient.phone,
                    patient.email,
                    patient.national_id,
                    patient.created_at,
                ],
            )
            .map_err(classify)?;
        Ok(())
    }

    fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO appointments (id, patient_id, date_time, type, notes, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    appointment.id,
                    appointment.patient_id,
                    appointment.date_time,
                    appointment.kind,
                    appointment.notes,
                    appointment.status.as_str(),
                    appointment.created_at,
                ],
            )
            .map_err(classify)?;
        Ok(())
    }

    fn insert_procedure(&self, procedure: &Procedure) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO procedures (id, name, price, duration_min, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    procedure.id,
                    procedure.name,
                    procedure.price.to_string(),
                    procedure.duration_min,
                    procedure.description,
                    procedure.created_at,
                ],
            )
            .map_err(classify)?;
        Ok(())
    }

    fn insert_financial_record(&self, record: &FinancialRecord) -> Result<(), StoreError> {
        insert_record(&self.conn, record)
    }

    fn insert_financial_records(&self, records: &[FinancialRecord]) -> Result<(), StoreError> {
        // Dropping the transaction without commit rolls every row back
        let tx = self.conn.unchecked_transaction()?;
        for record in records {
            insert_record(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn patients_by_name(&self) -> Result<Vec<Patient>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, phone, email, cpf, created_at
             FROM patients
             ORDER BY name COLLATE NOCASE ASC, rowid ASC",
        )?;

        let patients = stmt
            .query_map([], patient_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(unwrap_row_error)?;

        Ok(patients)
    }

    fn count_patients(&self) -> Result<i64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(count)
    }

    fn appointments_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<AgendaEntry>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "{AGENDA_SELECT}
             WHERE a.date_time >= ?1 AND a.date_time <= ?2
             ORDER BY a.date_time ASC, a.rowid ASC"
        ))?;

        let entries = stmt
            .query_map(params![start, end], agenda_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(unwrap_row_error)?;

        Ok(entries)
    }

    fn first_upcoming(&self, from: NaiveDateTime) -> Result<Option<AgendaEntry>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "{AGENDA_SELECT}
             WHERE a.date_time >= ?1 AND a.status != ?2
             ORDER BY a.date_time ASC, a.rowid ASC
             LIMIT 1"
        ))?;

        let entry = stmt
            .query_map(
                params![from, AppointmentStatus::Canceled.as_str()],
                agenda_entry_from_row,
            )?
            .next()
            .transpose()
            .map_err(unwrap_row_error)?;

        Ok(entry)
    }

    fn procedures_by_name(&self) -> Result<Vec<Procedure>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, price, duration_min, description, created_at
             FROM procedures
             ORDER BY name COLLATE NOCASE ASC, rowid ASC",
        )?;

        let procedures = stmt
            .query_map([], procedure_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(unwrap_row_error)?;

        Ok(procedures)
    }

    fn recent_records(&self, limit: usize) -> Result<Vec<FinancialRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "{RECORD_SELECT}
             ORDER BY due_date DESC, rowid DESC
             LIMIT ?1"
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![limit], record_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(unwrap_row_error)?;

        Ok(records)
    }

    fn records_of_type(&self, kind: RecordType) -> Result<Vec<FinancialRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "{RECORD_SELECT}
             WHERE type = ?1
             ORDER BY due_date DESC, rowid DESC"
        ))?;

        let records = stmt
            .query_map(params![kind.as_str()], record_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(unwrap_row_error)?;

        Ok(records)
    }
}
