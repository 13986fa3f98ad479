//! Form state and report types shared by every calculator.

pub mod form;
pub mod report;

pub use form::{Field, FieldValue, Form};
pub use report::{Advisory, Level, Measurement, Report};
