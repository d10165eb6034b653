// 📅 Appointment Entity - a booked slot for one patient
//
// Holds a non-owning reference (patient_id) to a Patient.
// The instant is local wall-clock time, no timezone attached.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// APPOINTMENT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Finished,
    Canceled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Finished => "finished",
            AppointmentStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown appointment status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "finished" => Ok(AppointmentStatus::Finished),
            "canceled" => Ok(AppointmentStatus::Canceled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// ============================================================================
// APPOINTMENT ENTITY
// ============================================================================

/// Validated appointment payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub patient_id: String,
    pub date_time: NaiveDateTime,
    pub kind: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    /// Combined date + time, the agenda sort key
    pub date_time: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Book a validated appointment. New bookings always start as pending.
    pub fn schedule(new: NewAppointment) -> Self {
        Appointment {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: new.patient_id,
            date_time: new.date_time,
            kind: new.kind,
            notes: new.notes,
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.status == AppointmentStatus::Canceled
    }
}

/// Appointment joined with its patient's display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaEntry {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient_name: String,
}
