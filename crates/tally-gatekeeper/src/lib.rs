//! Tally Gatekeeper
//!
//! Evaluates candidate ledger records against domain plausibility rules.
//!
//! The gatekeeper provides:
//! - Deterministic rule validation (currency subunit ranges, completeness)
//! - A weighted rule confidence in [0, 1]
//! - An explicit violation list for auditability
//!
//! Validation never rejects a record: malformed-but-parsed candidates flow
//! through with a depressed score and their violations on display, so a
//! reviewer can find them instead of wondering where they went.
//!
//! # Examples
//!
//! ```no_run
//! use tally_gatekeeper::{SchemaValidator, ValidationConfig};
//!
//! let validator = SchemaValidator::new(ValidationConfig::default());
//! // let validation = validator.validate(&candidate);
//! ```

#![warn(missing_docs)]

mod config;
mod validator;

pub use config::ValidationConfig;
pub use validator::{RuleViolation, SchemaValidator, Validation};
