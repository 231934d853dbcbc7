//! Driver logic for the Rill compiler
//!
//! The `rillc` binary is a thin wrapper over [`driver`], which runs the
//! pipeline: parse → lower to IR → build bytecode → emit the container.

pub mod driver;

pub use driver::{compile_to_binary, lower_source, output_name};
