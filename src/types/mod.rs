//! Type definitions for the fraud scoring service

pub mod report;
pub mod transaction;

pub use report::{FieldError, ScoreResult, ValidationReport};
pub use transaction::{Channel, NormalizedTransaction};
