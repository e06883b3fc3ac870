#![forbid(unsafe_code)]

//! Scalar values and SQL statement rendering.
//!
//! Statement builders here only assemble text; every identifier passed in
//! must already have gone through [`crate::db::validate_identifiers`].

/// Statement text builders for the CRUD and read paths.
pub mod sql;

/// Canonical scalar value representation.
pub mod value;

pub use value::Value;
