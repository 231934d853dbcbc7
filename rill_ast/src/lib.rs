//! Abstract Syntax Tree definitions for the Rill language
//!
//! The tree is a plain tagged-variant structure: no visitors, no dispatch.
//! The IR builder walks it with a single match per node kind.

pub mod ast;

pub use ast::*;
