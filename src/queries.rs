// 🔎 Query Facade - read paths behind every page
//
// Nothing here mutates or caches. Store errors propagate to the caller.

use crate::entities::{AgendaEntry, FinancialRecord, Patient, Procedure, RecordType};
use crate::ledger::{self, LedgerError, LedgerView};
use crate::scheduling::DayWindow;
use crate::store::{ClinicStore, StoreError};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

/// Failure of a read that aggregates ledger lines
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub fn patients_alphabetical<S: ClinicStore + ?Sized>(store: &S) -> Result<Vec<Patient>, StoreError> {
    store.patients_by_name()
}

pub fn procedures_alphabetical<S: ClinicStore + ?Sized>(
    store: &S,
) -> Result<Vec<Procedure>, StoreError> {
    store.procedures_by_name()
}

/// Appointments inside today's window, earliest first, with patient names
pub fn todays_appointments<S: ClinicStore + ?Sized>(
    store: &S,
    now: NaiveDateTime,
) -> Result<Vec<AgendaEntry>, StoreError> {
    let window = DayWindow::containing(now);
    store.appointments_between(window.start, window.end)
}

/// Earliest non-canceled appointment at or after `now`
pub fn next_appointment<S: ClinicStore + ?Sized>(
    store: &S,
    now: NaiveDateTime,
) -> Result<Option<AgendaEntry>, StoreError> {
    store.first_upcoming(now)
}

pub fn recent_transactions<S: ClinicStore + ?Sized>(
    store: &S,
    limit: usize,
) -> Result<Vec<FinancialRecord>, StoreError> {
    store.recent_records(limit)
}

/// Cash-flow page: recent records with their KPIs and chart
pub fn financial_overview<S: ClinicStore + ?Sized>(
    store: &S,
    limit: usize,
) -> Result<LedgerView, QueryError> {
    Ok(LedgerView::build(recent_transactions(store, limit)?)?)
}

// ============================================================================
// DASHBOARD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub patient_count: i64,
    pub appointments_today: usize,
    pub next_appointment: Option<AgendaEntry>,
    /// All-time income, not limited to the recent window
    pub total_revenue: Decimal,
}

pub fn dashboard<S: ClinicStore + ?Sized>(
    store: &S,
    now: NaiveDateTime,
) -> Result<Dashboard, QueryError> {
    let income = store.records_of_type(RecordType::Income)?;

    Ok(Dashboard {
        patient_count: store.count_patients()?,
        appointments_today: todays_appointments(store, now)?.len(),
        next_appointment: next_appointment(store, now)?,
        total_revenue: ledger::total_of(&income, RecordType::Income)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        Appointment, AppointmentStatus, NewAppointment, NewFinancialRecord, NewPatient,
    };
    use crate::scheduling::{self, combine, parse_date, parse_time};
    use crate::store::SqliteStore;
    use chrono::NaiveDate;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        combine(parse_date(date).unwrap(), parse_time(time).unwrap())
    }

    fn seed_patient(store: &SqliteStore, name: &str) -> String {
        let patient = Patient::register(NewPatient {
            name: name.to_string(),
            phone: None,
            email: None,
            national_id: None,
        });
        store.insert_patient(&patient).unwrap();
        patient.id
    }

    fn book(store: &SqliteStore, patient_id: &str, when: NaiveDateTime, status: AppointmentStatus) {
        let mut apt = Appointment::schedule(NewAppointment {
            patient_id: patient_id.to_string(),
            date_time: when,
            kind: "Consulta".to_string(),
            notes: None,
        });
        apt.status = status;
        store.insert_appointment(&apt).unwrap();
    }

    fn ledger_line(store: &SqliteStore, kind: RecordType, cents: i64, date: &str) {
        store
            .insert_financial_record(&FinancialRecord::book(NewFinancialRecord {
                description: "linha".to_string(),
                amount: Decimal::new(cents, 2),
                kind,
                due_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            }))
            .unwrap();
    }

    #[test]
    fn test_todays_appointments_window() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ana = seed_patient(&store, "Ana");

        book(&store, &ana, at("2024-02-04", "23:59:59"), AppointmentStatus::Pending);
        book(&store, &ana, at("2024-02-05", "23:59:59"), AppointmentStatus::Pending);
        book(&store, &ana, at("2024-02-05", "00:00"), AppointmentStatus::Confirmed);
        book(&store, &ana, at("2024-02-06", "00:00"), AppointmentStatus::Pending);

        let today = todays_appointments(&store, at("2024-02-05", "12:00")).unwrap();
        let times: Vec<String> = today
            .iter()
            .map(|e| e.appointment.date_time.to_string())
            .collect();

        assert_eq!(times, vec!["2024-02-05 00:00:00", "2024-02-05 23:59:59"]);
        assert!(today.iter().all(|e| e.patient_name == "Ana"));
    }

    #[test]
    fn test_next_appointment_ignores_canceled() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ana = seed_patient(&store, "Ana");
        let bruno = seed_patient(&store, "Bruno");

        book(&store, &ana, at("2024-02-05", "09:00"), AppointmentStatus::Finished);
        book(&store, &ana, at("2024-02-05", "14:00"), AppointmentStatus::Canceled);
        book(&store, &bruno, at("2024-02-05", "16:00"), AppointmentStatus::Pending);

        let next = next_appointment(&store, at("2024-02-05", "10:00")).unwrap().unwrap();
        assert_eq!(next.patient_name, "Bruno");
    }

    #[test]
    fn test_next_appointment_tie_goes_to_first_booked() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ana = seed_patient(&store, "Ana");
        let bruno = seed_patient(&store, "Bruno");

        book(&store, &bruno, at("2024-02-05", "16:00"), AppointmentStatus::Pending);
        book(&store, &ana, at("2024-02-05", "16:00"), AppointmentStatus::Pending);

        let next = next_appointment(&store, at("2024-02-05", "10:00")).unwrap().unwrap();
        assert_eq!(next.patient_name, "Bruno");
    }

    #[test]
    fn test_next_appointment_matches_agenda_rule() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ana = seed_patient(&store, "Ana");
        let bruno = seed_patient(&store, "Bruno");

        book(&store, &ana, at("2024-02-05", "09:00"), AppointmentStatus::Confirmed);
        book(&store, &bruno, at("2024-02-05", "11:00"), AppointmentStatus::Canceled);
        book(&store, &bruno, at("2024-02-05", "13:00"), AppointmentStatus::Pending);
        book(&store, &ana, at("2024-02-05", "13:00"), AppointmentStatus::Pending);
        book(&store, &ana, at("2024-02-05", "18:30"), AppointmentStatus::Finished);

        let agenda = todays_appointments(&store, at("2024-02-05", "00:00")).unwrap();
        for time in ["08:00", "09:00", "10:00", "13:00", "18:30", "20:00"] {
            let now = at("2024-02-05", time);
            let expected = scheduling::next_upcoming(&agenda, now).map(|e| e.appointment.id.clone());
            let actual = next_appointment(&store, now).unwrap().map(|e| e.appointment.id);
            assert_eq!(actual, expected, "at {}", time);
        }
    }

    #[test]
    fn test_next_appointment_none_when_agenda_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(next_appointment(&store, at("2024-02-05", "10:00")).unwrap().is_none());
    }

    #[test]
    fn test_financial_overview_uses_recent_window() {
        let store = SqliteStore::open_in_memory().unwrap();
        ledger_line(&store, RecordType::Income, 15000, "2024-02-05");
        ledger_line(&store, RecordType::Expense, 50000, "2024-02-06");
        ledger_line(&store, RecordType::Income, 99900, "2024-01-01");

        let view = financial_overview(&store, 2).unwrap();

        assert_eq!(view.records.len(), 2);
        assert_eq!(view.summary.net_balance, Decimal::new(-35000, 2));
        assert_eq!(view.chart[0].date, "05/02");
        assert_eq!(view.chart[1].date, "06/02");
    }

    #[test]
    fn test_overflowing_ledger_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        for _ in 0..2 {
            store
                .insert_financial_record(&FinancialRecord::book(NewFinancialRecord {
                    description: "Legado".to_string(),
                    amount: Decimal::MAX,
                    kind: RecordType::Income,
                    due_date: NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(),
                }))
                .unwrap();
        }

        let now = at("2024-02-05", "10:00");
        assert!(matches!(
            financial_overview(&store, 50),
            Err(QueryError::Ledger(LedgerError::Overflow))
        ));
        assert!(matches!(
            dashboard(&store, now),
            Err(QueryError::Ledger(LedgerError::Overflow))
        ));
    }

    #[test]
    fn test_dashboard_counts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ana = seed_patient(&store, "Ana");
        seed_patient(&store, "Bruno");

        book(&store, &ana, at("2024-02-05", "08:00"), AppointmentStatus::Finished);
        book(&store, &ana, at("2024-02-05", "15:00"), AppointmentStatus::Pending);
        book(&store, &ana, at("2024-02-07", "15:00"), AppointmentStatus::Pending);

        ledger_line(&store, RecordType::Income, 15000, "2024-02-05");
        ledger_line(&store, RecordType::Income, 5050, "2023-12-20");
        ledger_line(&store, RecordType::Expense, 50000, "2024-02-06");

        let dash = dashboard(&store, at("2024-02-05", "10:00")).unwrap();

        assert_eq!(dash.patient_count, 2);
        assert_eq!(dash.appointments_today, 2);
        assert_eq!(
            dash.next_appointment.unwrap().appointment.date_time,
            at("2024-02-05", "15:00")
        );
        assert_eq!(dash.total_revenue, Decimal::new(20050, 2));
    }
}
