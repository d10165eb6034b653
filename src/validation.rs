// 📐 Validation Layer - raw form fields → typed drafts
//
// Every validator returns Result<Draft, FieldErrors>. Nothing here panics
// on user input; numeric coercion failures become field errors.

use crate::entities::{NewAppointment, NewFinancialRecord, NewPatient, NewProcedure, RecordType};
use crate::scheduling;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::OnceLock;

/// Flat form submission: field name → submitted string
pub type FormInput = HashMap<String, String>;

// ============================================================================
// FIELD ERRORS
// ============================================================================

/// Field-scoped validation messages, serialized as `{ "field": ["msg"] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Ok(value) when no errors were collected
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

// ============================================================================
// FIELD HELPERS
// ============================================================================

fn text<'a>(form: &'a FormInput, field: &str) -> &'a str {
    form.get(field).map(|s| s.trim()).unwrap_or("")
}

fn optional_text(form: &FormInput, field: &str) -> Option<String> {
    let value = text(form, field);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn required_text(form: &FormInput, field: &str, errors: &mut FieldErrors) -> String {
    let value = text(form, field);
    if value.is_empty() {
        errors.push(field, "is required");
    }
    value.to_string()
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

// ============================================================================
// LOCALE DECIMALS
// ============================================================================

/// Largest whole part a price or amount may carry (999.999.999.999,99)
pub const MAX_INTEGER_DIGITS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalError {
    Empty,
    Negative,
    Malformed,
    TooLarge,
}

impl fmt::Display for DecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecimalError::Empty => write!(f, "is required"),
            DecimalError::Negative => write!(f, "must not be negative"),
            DecimalError::Malformed => write!(f, "must be a number such as 150,00"),
            DecimalError::TooLarge => {
                write!(f, "must have at most {} digits before the decimal separator", MAX_INTEGER_DIGITS)
            }
        }
    }
}

/// Parse currency text using comma as decimal separator.
///
/// Accepts "150", "150,5", "150,00" and the dot form "150.00" that numeric
/// inputs submit. At most one separator and two fractional digits; thousands
/// grouping ("1.234,56") is rejected rather than guessed. The whole part is
/// capped at [`MAX_INTEGER_DIGITS`] so ledger totals stay in range.
pub fn parse_locale_decimal(raw: &str) -> Result<Decimal, DecimalError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DecimalError::Empty);
    }
    if raw.starts_with('-') {
        return Err(DecimalError::Negative);
    }

    let mut parts = raw.splitn(2, |c: char| c == ',' || c == '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next().unwrap_or("");

    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty()
        || !digits_only(whole)
        || !digits_only(fraction)
        || fraction.len() > 2
        || (raw.contains([',', '.']) && fraction.is_empty())
    {
        return Err(DecimalError::Malformed);
    }
    if whole.trim_start_matches('0').len() > MAX_INTEGER_DIGITS {
        return Err(DecimalError::TooLarge);
    }

    let normalized = if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    };
    normalized.parse::<Decimal>().map_err(|_| DecimalError::Malformed)
}

// ============================================================================
// ENTITY VALIDATORS
// ============================================================================

/// name ≥ 3 chars; email well-formed, phone ≥ 10 chars and CPF exactly
/// 11 digits when present.
pub fn validate_patient(form: &FormInput) -> Result<NewPatient, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = required_text(form, "name", &mut errors);
    if !name.is_empty() && name.chars().count() < 3 {
        errors.push("name", "must have at least 3 characters");
    }

    let email = optional_text(form, "email");
    if let Some(email) = &email {
        if !email_pattern().is_match(email) {
            errors.push("email", "must be a valid email address");
        }
    }

    let phone = optional_text(form, "phone");
    if let Some(phone) = &phone {
        if phone.chars().count() < 10 {
            errors.push("phone", "must have at least 10 characters");
        }
    }

    // "000.000.000-00" is the usual way to write a CPF
    let national_id = optional_text(form, "cpf")
        .map(|raw| raw.chars().filter(|c| *c != '.' && *c != '-').collect::<String>());
    if let Some(id) = &national_id {
        if id.len() != 11 || !id.chars().all(|c| c.is_ascii_digit()) {
            errors.push("cpf", "must have exactly 11 digits");
        }
    }

    errors.finish(|| NewPatient {
        name,
        phone,
        email: email.map(|e| e.to_lowercase()),
        national_id,
    })
}

/// Patient references are store identifiers: letters, digits, '-' or '_'
fn is_identifier(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= 64
        && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn validate_appointment(form: &FormInput) -> Result<NewAppointment, FieldErrors> {
    let mut errors = FieldErrors::new();

    let patient_id = required_text(form, "patientId", &mut errors);
    if !patient_id.is_empty() && !is_identifier(&patient_id) {
        errors.push("patientId", "is not a valid patient reference");
    }

    let date = match text(form, "date") {
        "" => {
            errors.push("date", "is required");
            None
        }
        raw => scheduling::parse_date(raw)
            .map_err(|_| errors.push("date", "must be a date in YYYY-MM-DD format"))
            .ok(),
    };

    let time = match text(form, "time") {
        "" => {
            errors.push("time", "is required");
            None
        }
        raw => scheduling::parse_time(raw)
            .map_err(|_| errors.push("time", "must be a time in HH:MM format"))
            .ok(),
    };

    let kind = required_text(form, "type", &mut errors);
    let notes = optional_text(form, "notes");

    match (date, time) {
        (Some(date), Some(time)) if errors.is_empty() => Ok(NewAppointment {
            patient_id,
            date_time: scheduling::combine(date, time),
            kind,
            notes,
        }),
        _ => Err(errors),
    }
}

/// name ≥ 2 chars, price > 0 (locale decimal), duration a positive integer
pub fn validate_procedure(form: &FormInput) -> Result<NewProcedure, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = required_text(form, "name", &mut errors);
    if !name.is_empty() && name.chars().count() < 2 {
        errors.push("name", "must have at least 2 characters");
    }

    let price = match parse_locale_decimal(text(form, "price")) {
        Ok(price) if price > Decimal::ZERO => Some(price),
        Ok(_) => {
            errors.push("price", "must be greater than zero");
            None
        }
        Err(e) => {
            errors.push("price", e.to_string());
            None
        }
    };

    let duration_min = match text(form, "duration") {
        "" => {
            errors.push("duration", "is required");
            None
        }
        raw => match raw.parse::<u32>() {
            Ok(0) | Err(_) => {
                errors.push("duration", "must be a whole number of minutes");
                None
            }
            Ok(minutes) => Some(minutes),
        },
    };

    let description = optional_text(form, "description");

    match (price, duration_min) {
        (Some(price), Some(duration_min)) if errors.is_empty() => Ok(NewProcedure {
            name,
            price,
            duration_min,
            description,
        }),
        _ => Err(errors),
    }
}

/// description, type (INCOME | EXPENSE), date and amount are all required
pub fn validate_transaction(form: &FormInput) -> Result<NewFinancialRecord, FieldErrors> {
    let mut errors = FieldErrors::new();

    let description = required_text(form, "description", &mut errors);

    let kind = match text(form, "type") {
        "" => {
            errors.push("type", "is required");
            None
        }
        raw => raw
            .parse::<RecordType>()
            .map_err(|_| errors.push("type", "must be INCOME or EXPENSE"))
            .ok(),
    };

    let due_date = match text(form, "date") {
        "" => {
            errors.push("date", "is required");
            None
        }
        raw => scheduling::parse_date(raw)
            .map_err(|_| errors.push("date", "must be a date in YYYY-MM-DD format"))
            .ok(),
    };

    let amount = parse_locale_decimal(text(form, "amount"))
        .map_err(|e| errors.push("amount", e.to_string()))
        .ok();

    match (kind, due_date, amount) {
        (Some(kind), Some(due_date), Some(amount)) if errors.is_empty() => {
            Ok(NewFinancialRecord {
                description,
                amount,
                kind,
                due_date,
            })
        }
        _ => Err(errors),
    }
}
