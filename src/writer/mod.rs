//! Rendering of diagnostics and parsed scripts for stdout.
//!
//! `report` is the human-readable form, `json` the machine-readable one.
pub mod json;
pub mod report;
