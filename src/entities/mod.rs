// Entity Models
//
// Each entity has a stable UUID identity assigned at creation and is never
// mutated in place afterwards. Appointment references Patient by id only.

pub mod patient;
pub mod appointment;
pub mod procedure;
pub mod financial;

pub use patient::{NewPatient, Patient};
pub use appointment::{AgendaEntry, Appointment, AppointmentStatus, NewAppointment};
pub use procedure::{NewProcedure, Procedure};
pub use financial::{FinancialRecord, NewFinancialRecord, RecordStatus, RecordType};
