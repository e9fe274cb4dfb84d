pub mod employee;
pub mod prediction;
pub mod record;

pub use employee::EmployeeRecord;
pub use prediction::{decide, PredictionResult, RiskLevel, DECISION_THRESHOLD};
pub use record::{FieldRef, FieldValue, RawRecord, Record};
