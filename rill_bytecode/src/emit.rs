//! Binary layout and emission
//!
//! The container has three regions: a 24-byte primary header, a segment
//! table, and the segment data (`.data` then `.text`). Jump immediates are
//! rewritten from function numbers to final vm addresses during layout.

use crate::instruction::{Instruction, InstructionData, Opcode};
use crate::module::{Function, Module};
use crate::registers::Register;
use log::debug;
use rill_common::{CompileError, CompileResult};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Virtual address the `.data` segment is mapped at
pub const VM_DATA_START: u32 = 0x4000;
/// Virtual address the `.text` segment is mapped at
pub const VM_TEXT_START: u32 = 0x5000;
/// Initial stack pointer handed to the VM
pub const SP_START: u32 = 0x3000_0000;

/// File magic: eight identifying bytes, a format version, padding to 12
pub const MAGIC: [u8; 12] =
    [0xEF, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0x01, 0x00, 0x00, 0x00];

/// Bytes before the segment table: magic + exec_start + sp_start + table len
const HEADER_SIZE: u32 = MAGIC.len() as u32 + 3 * 4;

/// A named contiguous region of the output file
struct Segment {
    /// Bytes from the end of the segment table to this segment's data
    start_after_table: u32,
    length: u32,
    vm_addr: u32,
    name: &'static str,
}

impl Segment {
    /// Size of this segment's table entry: three words plus the packed name
    fn table_size(&self) -> u32 {
        let name_size = (self.name.len() as u32 + 1).next_multiple_of(4);
        3 * 4 + name_size
    }
}

struct ProgramData {
    segment_table: Vec<u32>,
    segment_data: Vec<u32>,
    exec_start: u32,
}

/// Serialise the whole container into memory
pub fn emit_bytes(module: &Module) -> CompileResult<Vec<u8>> {
    let prog = layout_segments(module)?;

    let table_byte_len = prog.segment_table.len() as u32 * 4;
    let mut bytes =
        Vec::with_capacity((HEADER_SIZE + table_byte_len) as usize + prog.segment_data.len() * 4);
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&prog.exec_start.to_le_bytes());
    bytes.extend_from_slice(&SP_START.to_le_bytes());
    bytes.extend_from_slice(&table_byte_len.to_le_bytes());
    for word in &prog.segment_table {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    // segment data is stored as big-endian words, so .data bytes appear in
    // their natural order
    for word in &prog.segment_data {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    Ok(bytes)
}

/// Write the container to `path`
///
/// The bytes go to a temporary file beside the destination first and are
/// renamed into place once complete, so a failure cannot leave a truncated
/// binary behind.
pub fn write_binary(module: &Module, path: &Path) -> CompileResult<()> {
    let bytes = emit_bytes(module)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut output = NamedTempFile::new_in(dir)?;
    output.write_all(&bytes)?;
    output.persist(path).map_err(|err| CompileError::Io(err.error))?;
    debug!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Compute the final layout: data words, text words with resolved jumps,
/// the segment table, and `main`'s entry address
fn layout_segments(module: &Module) -> CompileResult<ProgramData> {
    let main = module.function("main").ok_or(CompileError::MissingMain)?;
    let main_num = main.number;

    // data segment, padded to a word boundary and packed big-endian
    let mut data = module.data_segment().to_vec();
    while data.len() % 4 != 0 {
        data.push(0);
    }
    let text_start = data.len() as u32;
    let mut segment_data: Vec<u32> = data
        .chunks_exact(4)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    // text segment: functions in ascending number order; a call instruction
    // always targets an already-placed function, so jump rewriting never
    // sees an unknown number
    let mut func_addrs: BTreeMap<u32, u32> = BTreeMap::new();
    for func in emitted_functions(module) {
        let addr = VM_TEXT_START + segment_data.len() as u32 * 4 - text_start;
        func_addrs.insert(func.number, addr);
        debug!("function #{} placed at {:#x}", func.number, addr);

        for instruction in &func.instructions {
            segment_data.push(resolve_jumps(*instruction, &func_addrs)?.encode());
        }
        // execution falls off the end of main into a halt
        if func.number == main_num {
            let halt = Instruction::syscall(
                Register::Zero,
                Register::Zero,
                Register::Zero,
                Register::Zero,
                0,
            );
            segment_data.push(halt.encode());
        }
    }

    let segments = [
        Segment { start_after_table: 0, length: text_start, vm_addr: VM_DATA_START, name: ".data" },
        Segment {
            start_after_table: text_start,
            length: segment_data.len() as u32 * 4 - text_start,
            vm_addr: VM_TEXT_START,
            name: ".text",
        },
    ];

    let table_total: u32 = segments.iter().map(Segment::table_size).sum();
    let mut segment_table = Vec::new();
    for segment in &segments {
        segment_table.push(HEADER_SIZE + table_total + segment.start_after_table);
        segment_table.push(segment.length);
        segment_table.push(segment.vm_addr);
        segment_table.extend(pack_name(segment.name));
    }

    let exec_start = func_addrs.get(&main_num).copied().ok_or(CompileError::MissingMain)?;
    Ok(ProgramData { segment_table, segment_data, exec_start })
}

/// Replace a `jal`'s function-number placeholder with the final address
fn resolve_jumps(
    mut instruction: Instruction,
    func_addrs: &BTreeMap<u32, u32>,
) -> CompileResult<Instruction> {
    if instruction.op == Opcode::Jal {
        if let InstructionData::J { rd, imm } = instruction.data {
            let addr = func_addrs
                .get(&imm)
                .copied()
                .ok_or_else(|| CompileError::unknown_symbol(format!("function #{}", imm)))?;
            instruction.data = InstructionData::J { rd, imm: addr };
        }
    }
    Ok(instruction)
}

/// The functions that go into `.text`, in ascending number order
///
/// Every source-registered function is written. A builtin is written only
/// when some written function calls it, so a program that never prints
/// carries no `print` body.
fn emitted_functions(module: &Module) -> Vec<&Function> {
    let mut funcs: Vec<&Function> = module.functions().values().collect();
    funcs.sort_by_key(|func| func.number);

    let mut included: BTreeSet<u32> =
        funcs.iter().filter(|f| !f.is_builtin()).map(|f| f.number).collect();
    loop {
        let referenced: BTreeSet<u32> = funcs
            .iter()
            .filter(|f| included.contains(&f.number))
            .flat_map(|f| f.instructions.iter())
            .filter(|inst| inst.op == Opcode::Jal)
            .filter_map(|inst| match inst.data {
                InstructionData::J { imm, .. } => Some(imm),
                _ => None,
            })
            .collect();

        let before = included.len();
        included.extend(funcs.iter().filter(|f| referenced.contains(&f.number)).map(|f| f.number));
        if included.len() == before {
            break;
        }
    }

    funcs.into_iter().filter(|f| included.contains(&f.number)).collect()
}

/// Pack a segment name: ASCII bytes, NUL terminator, zero-padded to a word
/// boundary, stored big-endian
fn pack_name(name: &str) -> Vec<u32> {
    let mut bytes = name.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
