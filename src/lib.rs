//! ICU pharmacist helper core library
//!
//! Bedside calculators for ICU pharmacists: infusion rate / γ, creatinine
//! clearance, acid-base, renal differential, Forrester and shock
//! classification, and electrolyte unit conversion. Results are advisory;
//! the final judgement stays with the clinician.

pub mod core;
pub mod drafts;
pub mod error;
pub mod models;
pub mod settings;
pub mod tools;

pub use error::{CalcError, DraftError};
pub use models::{Field, FieldValue, Form, Level, Report};
pub use settings::Settings;
pub use tools::Calculator;
