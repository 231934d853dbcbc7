//! The compile pipeline, one stage after another

use log::info;
use rill_common::CompileResult;
use std::path::{Path, PathBuf};

/// Parse source text and lower it to an IR module
pub fn lower_source(source: &str, module_name: &str) -> CompileResult<rill_ir::Module> {
    info!("parsing {}", module_name);
    let program = rill_parser::parse(source)?;
    info!("parsed {} top level items", program.items.len());

    info!("lowering to IR");
    rill_ir::lower(&program, module_name)
}

/// Compile source text all the way to a binary at `output`
pub fn compile_to_binary(source: &str, module_name: &str, output: &Path) -> CompileResult<()> {
    let ir = lower_source(source, module_name)?;

    info!("building bytecode");
    let bytecode = rill_bytecode::Module::build(&ir)?;

    info!("writing {}", output.display());
    rill_bytecode::write_binary(&bytecode, output)
}

/// The output path for a given input path
///
/// Everything from the last `.` of the file name onward is replaced with
/// `.bin`; a name without a dot gets `.bin` appended.
pub fn output_name(input: &Path) -> PathBuf {
    let name = input.file_name().and_then(|n| n.to_str()).unwrap_or("out");
    let stem = match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    };
    input.with_file_name(format!("{}.bin", stem))
}
