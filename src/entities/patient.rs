// 👤 Patient Entity - identity record for the clinic registry
//
// Email and national id (CPF) are unique when present. The store enforces
// that; nothing here pre-checks it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validated patient payload, ready to be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatient {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Digits only (punctuation stripped by validation)
    pub national_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Stable identity (UUID)
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub national_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// Register a validated patient, assigning identity and creation time
    pub fn register(new: NewPatient) -> Self {
        Patient {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name,
            phone: new.phone,
            email: new.email,
            national_id: new.national_id,
            created_at: Utc::now(),
        }
    }
}
