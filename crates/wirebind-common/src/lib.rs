//! # wirebind-common
//!
//! Shared error definitions, configuration model, and constants used
//! across the wirebind workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the primitives the resolution engine builds
//! upon.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
