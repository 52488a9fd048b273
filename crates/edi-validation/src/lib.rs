#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-validation
//!
//! Field validation and error collection for EDI segments.
//!
//! The [`FieldValidator`] checks one segment's raw fields against its record
//! definition (mandatory status, data type, length, undeclared values). All
//! findings, structural ones included, go through an [`ErrorCollector`],
//! which applies the strict or lenient severity policy.
//!
//! ## Example Usage
//!
//! ```rust
//! use edi_ir::{Position, RawField, RawSegment};
//! use edi_schema::{DataType, FieldRule};
//! use edi_validation::{ErrorCollector, ErrorKind, FieldValidator, ValidationMode};
//!
//! let rules = vec![FieldRule::new(1, "QTY01", DataType::Numeric { implied_decimals: 0 })
//!     .mandatory()
//!     .length(1, 5)];
//! let segment = RawSegment::new("ITEM", 3, Position::default())
//!     .with_field(RawField::simple("abc"));
//!
//! let mut collector = ErrorCollector::new(ValidationMode::Strict);
//! let fields = FieldValidator::new().validate_segment(&segment, Some(&rules), "T/ITEM", &mut collector);
//!
//! assert!(fields[0].has_violation());
//! assert_eq!(collector.errors()[0].kind, ErrorKind::InvalidDataType);
//! assert!(collector.has_blocking());
//! ```

pub mod collector;
pub mod engine;
pub mod error;
pub mod rules;

// Re-export main types
pub use collector::{ErrorCollector, Summary, ValidationMode};
pub use engine::FieldValidator;
pub use error::{ErrorKind, ErrorPosition, ValidationError};
pub use rules::{RuleResult, significant_length, validate_data_type, validate_length};
