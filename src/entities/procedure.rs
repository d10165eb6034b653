// 📋 Procedure Entity - catalog of billable services

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProcedure {
    pub name: String,
    pub price: Decimal,
    pub duration_min: u32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    /// Duration in whole minutes
    pub duration_min: u32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Procedure {
    pub fn catalog(new: NewProcedure) -> Self {
        Procedure {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name,
            price: new.price,
            duration_min: new.duration_min,
            description: new.description,
            created_at: Utc::now(),
        }
    }
}
