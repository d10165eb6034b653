// ✍️ Command Handlers - validate → persist → mark view stale → redirect
//
// Handlers never panic or leak store internals: every failure becomes a
// CommandError whose body() is safe to show to the user.

use crate::entities::{Appointment, FinancialRecord, Patient, Procedure};
use crate::store::{ClinicStore, StoreError};
use crate::validation::{self, FieldErrors, FormInput};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// VIEWS & REFRESH SIGNAL
// ============================================================================

/// List views a write can make stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Patients,
    Agenda,
    Procedures,
    Financial,
}

impl View {
    /// Page the user lands on after a successful write
    pub fn path(&self) -> &'static str {
        match self {
            View::Patients => "/patients",
            View::Agenda => "/agenda",
            View::Procedures => "/procedures",
            View::Financial => "/financial",
        }
    }

    fn index(&self) -> usize {
        match self {
            View::Patients => 0,
            View::Agenda => 1,
            View::Procedures => 2,
            View::Financial => 3,
        }
    }
}

/// Receiver of "this view is stale" signals
pub trait ViewRefresh {
    fn invalidate(&self, view: View);
}

/// Monotonic generation counter per view. Any cache keyed on the generation
/// knows to recompute once it moves.
#[derive(Debug, Default)]
pub struct StaleViews {
    generations: [AtomicU64; 4],
}

impl StaleViews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self, view: View) -> u64 {
        self.generations[view.index()].load(Ordering::Acquire)
    }
}

impl ViewRefresh for StaleViews {
    fn invalidate(&self, view: View) {
        let generation = self.generations[view.index()].fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(?view, generation, "view invalidated");
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Successful write: where to send the user next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    pub view: View,
}

impl Redirect {
    pub fn location(&self) -> &'static str {
        self.view.path()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    Validation(FieldErrors),

    #[error("patient already exists")]
    Conflict,

    #[error("patient not found")]
    UnknownPatient,

    /// Generic failure; the underlying store error is logged, not exposed
    #[error("failed to save {0}")]
    Persistence(&'static str),
}

/// Wire shape of a failed command: `{ error }` or `{ errors: {field: [..]} }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Message { error: String },
    Fields { errors: FieldErrors },
}

impl CommandError {
    pub fn body(&self) -> ErrorBody {
        match self {
            CommandError::Validation(errors) => ErrorBody::Fields {
                errors: errors.clone(),
            },
            other => ErrorBody::Message {
                error: other.to_string(),
            },
        }
    }
}

fn persistence_failure(entity: &'static str, err: StoreError) -> CommandError {
    tracing::error!(entity, error = %err, "store write failed");
    CommandError::Persistence(entity)
}

fn rejected(entity: &'static str, errors: FieldErrors) -> CommandError {
    let fields: Vec<&str> = errors.fields().collect();
    tracing::warn!(entity, ?fields, "submission rejected");
    CommandError::Validation(errors)
}

fn finish<R: ViewRefresh + ?Sized>(refresh: &R, view: View) -> Redirect {
    refresh.invalidate(view);
    Redirect { view }
}

// ============================================================================
// HANDLERS
// ============================================================================

pub fn create_patient<S, R>(store: &S, refresh: &R, form: &FormInput) -> Result<Redirect, CommandError>
where
    S: ClinicStore + ?Sized,
    R: ViewRefresh + ?Sized,
{
    let draft = validation::validate_patient(form).map_err(|e| rejected("patient", e))?;
    let patient = Patient::register(draft);

    match store.insert_patient(&patient) {
        Ok(()) => {}
        Err(StoreError::Conflict(constraint)) => {
            tracing::warn!(%constraint, "duplicate patient rejected");
            return Err(CommandError::Conflict);
        }
        Err(e) => return Err(persistence_failure("patient", e)),
    }

    tracing::info!(id = %patient.id, "patient created");
    Ok(finish(refresh, View::Patients))
}

pub fn create_appointment<S, R>(
    store: &S,
    refresh: &R,
    form: &FormInput,
) -> Result<Redirect, CommandError>
where
    S: ClinicStore + ?Sized,
    R: ViewRefresh + ?Sized,
{
    let draft = validation::validate_appointment(form).map_err(|e| rejected("appointment", e))?;
    let appointment = Appointment::schedule(draft);

    match store.insert_appointment(&appointment) {
        Ok(()) => {}
        Err(StoreError::MissingReference) => {
            tracing::warn!(patient_id = %appointment.patient_id, "appointment for unknown patient");
            return Err(CommandError::UnknownPatient);
        }
        Err(e) => return Err(persistence_failure("appointment", e)),
    }

    tracing::info!(id = %appointment.id, at = %appointment.date_time, "appointment scheduled");
    Ok(finish(refresh, View::Agenda))
}

pub fn create_procedure<S, R>(
    store: &S,
    refresh: &R,
    form: &FormInput,
) -> Result<Redirect, CommandError>
where
    S: ClinicStore + ?Sized,
    R: ViewRefresh + ?Sized,
{
    let draft = validation::validate_procedure(form).map_err(|e| rejected("procedure", e))?;
    let procedure = Procedure::catalog(draft);

    store
        .insert_procedure(&procedure)
        .map_err(|e| persistence_failure("procedure", e))?;

    tracing::info!(id = %procedure.id, "procedure created");
    Ok(finish(refresh, View::Procedures))
}

pub fn create_transaction<S, R>(
    store: &S,
    refresh: &R,
    form: &FormInput,
) -> Result<Redirect, CommandError>
where
    S: ClinicStore + ?Sized,
    R: ViewRefresh + ?Sized,
{
    let draft = validation::validate_transaction(form).map_err(|e| rejected("transaction", e))?;
    let record = FinancialRecord::book(draft);

    store
        .insert_financial_record(&record)
        .map_err(|e| persistence_failure("transaction", e))?;

    tracing::info!(id = %record.id, kind = record.kind.as_str(), "transaction booked");
    Ok(finish(refresh, View::Financial))
}
