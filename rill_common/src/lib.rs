//! Shared utilities and error types for the Rill compiler
//!
//! This crate provides the error taxonomy used across all compiler stages
//! and the mapping from errors to process exit codes.

pub mod error;

pub use error::*;
