//! The bytecode module: lowers IR functions onto the register machine

use crate::emit::VM_DATA_START;
use crate::instruction::Instruction;
use crate::registers::Register;
use log::debug;
use rill_common::{CompileError, CompileResult};
use rill_ir::{Operand, Operation, Type};
use std::collections::{BTreeMap, BTreeSet};

/// A function lowered to machine instructions
#[derive(Debug)]
pub struct Function {
    pub instructions: Vec<Instruction>,
    /// Every operand this function has placed in a register; an entry stays
    /// live for the rest of the function
    pub allocated_registers: BTreeMap<Operand, Register>,
    pub parameters: Vec<Operand>,
    pub return_type: Type,
    pub number: u32,
    builtin: bool,
    /// Round-robin cursor into [`Register::SAVED`]
    next_saved: usize,
}

impl Function {
    fn new(parameters: Vec<Operand>, return_type: Type, number: u32, builtin: bool) -> Self {
        Self {
            instructions: Vec::new(),
            allocated_registers: BTreeMap::new(),
            parameters,
            return_type,
            number,
            builtin,
            next_saved: 0,
        }
    }

    /// Whether this came from a compiler-seeded builtin rather than source
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// The registers currently holding operands of this function
    pub fn used_registers(&self) -> BTreeSet<Register> {
        self.allocated_registers.values().copied().collect()
    }
}

/// The bytecode for one source module: per-function instruction lists plus
/// the data segment holding string literals
#[derive(Debug)]
pub struct Module {
    functions: BTreeMap<String, Function>,
    data_segment: Vec<u8>,
}

impl Module {
    /// Lower every IR function, in registration order
    pub fn build(ir: &rill_ir::Module) -> CompileResult<Module> {
        Builder::new(ir).build()
    }

    pub fn functions(&self) -> &BTreeMap<String, Function> {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// The raw data segment bytes (unpadded)
    pub fn data_segment(&self) -> &[u8] {
        &self.data_segment
    }
}

/// Build-time state; borrows the IR module for the duration of the build
struct Builder<'ir> {
    ir: &'ir rill_ir::Module,
    functions: BTreeMap<String, Function>,
    current_function_name: Option<String>,
    data_segment: Vec<u8>,
}

impl<'ir> Builder<'ir> {
    fn new(ir: &'ir rill_ir::Module) -> Self {
        Self {
            ir,
            functions: BTreeMap::new(),
            current_function_name: None,
            data_segment: Vec::new(),
        }
    }

    fn build(mut self) -> CompileResult<Module> {
        // registration order: function numbers are dense and assigned in
        // registration order, so sorting by number recovers it
        let mut ir_functions: Vec<(&String, &rill_ir::Function)> =
            self.ir.functions().iter().collect();
        ir_functions.sort_by_key(|(_, func)| func.number);

        for (name, func) in ir_functions {
            debug!("building {}", name);
            self.build_function(name, func)?;
        }

        Ok(Module { functions: self.functions, data_segment: self.data_segment })
    }

    fn build_function(&mut self, name: &str, ir_func: &rill_ir::Function) -> CompileResult<()> {
        if ir_func.parameters.len() > Register::ARGS.len() {
            return Err(CompileError::TooManyParameters {
                function: name.to_string(),
                count: ir_func.parameters.len(),
            });
        }

        let mut func = Function::new(
            ir_func.parameters.clone(),
            ir_func.return_type.clone(),
            ir_func.number,
            ir_func.is_builtin(),
        );
        for (param, reg) in ir_func.parameters.iter().zip(Register::ARGS) {
            func.allocated_registers.insert(param.clone(), reg);
        }
        self.functions.insert(name.to_string(), func);

        self.current_function_name = Some(name.to_string());
        let result = ir_func
            .instructions
            .iter()
            .try_for_each(|instruction| self.compile_instruction(instruction));
        self.current_function_name = None;
        result
    }

    /// Lower one IR instruction (§ the closed set: call, syscall, ret)
    fn compile_instruction(&mut self, inst: &rill_ir::Instruction) -> CompileResult<()> {
        match inst.op {
            Operation::Call => self.compile_call(inst),
            Operation::Syscall => self.compile_syscall(inst),
            Operation::Ret => {
                self.add_instruction(Instruction::jr(Register::Lr));
                Ok(())
            }
            op => Err(CompileError::UnsupportedIrOp { op: op.to_string() }),
        }
    }

    fn compile_call(&mut self, inst: &rill_ir::Instruction) -> CompileResult<()> {
        let callee = &inst.args[0];
        let callee_number = match self.ir.function(&callee.name) {
            Some(func) => func.number,
            None => return Err(CompileError::unknown_symbol(&callee.name)),
        };
        if inst.args.len() - 1 > Register::ARGS.len() {
            return Err(CompileError::TooManyArguments {
                callee: callee.name.clone(),
                count: inst.args.len() - 1,
            });
        }

        // push the live registers onto the stack
        let used = self.current().used_registers();
        let mut stack_used: u16 = 0;
        for reg in &used {
            self.add_instruction(Instruction::sw(*reg, Register::Sp, stack_used));
            stack_used += 4;
        }

        // copy the arguments into the argument registers
        for (index, arg) in inst.args.iter().skip(1).enumerate() {
            let src = self.register_for(arg)?;
            self.add_instruction(Instruction::ori(Register::ARGS[index], src, 0));
        }

        // the immediate is the callee's function number; the emitter
        // substitutes the final address during layout
        self.add_instruction(Instruction::jal(Register::Lr, callee_number));

        // harvest the return value before the restores
        if let Some(result) = &inst.result {
            let dest = self.allocate(result)?;
            self.add_instruction(Instruction::ori(dest, Register::V0, 0));
        }

        // pop the live registers, in reverse
        for reg in used.iter().rev() {
            stack_used -= 4;
            self.add_instruction(Instruction::lw(*reg, Register::Sp, stack_used));
        }
        debug_assert_eq!(stack_used, 0);
        Ok(())
    }

    fn compile_syscall(&mut self, inst: &rill_ir::Instruction) -> CompileResult<()> {
        if inst.args.len() != 5 {
            return Err(CompileError::UnsupportedIrOp {
                op: format!("syscall with {} arguments", inst.args.len()),
            });
        }
        let rd = self.register_for(&inst.args[1])?;
        let rs1 = self.register_for(&inst.args[2])?;
        let rs2 = self.register_for(&inst.args[3])?;
        let rs3 = self.register_for(&inst.args[4])?;
        let func = self.register_for(&inst.args[0])?;
        self.add_instruction(Instruction::syscall(rd, rs1, rs2, rs3, func.number()));
        Ok(())
    }

    /// The register holding `operand`, materialising constants on demand
    ///
    /// Unallocated string and integer constants are loaded into a freshly
    /// allocated saved register, which then stays bound to the operand for
    /// the rest of the function.
    fn register_for(&mut self, operand: &Operand) -> CompileResult<Register> {
        if let Some(reg) = self.current().allocated_registers.get(operand) {
            return Ok(*reg);
        }

        match operand.ty {
            Type::String => {
                let addr = self.add_string_to_data(&operand.name);
                if addr > u16::MAX as u32 {
                    return Err(CompileError::ImmediateOverflow { value: addr });
                }
                let reg = self.allocate(operand)?;
                self.add_instruction(Instruction::ori(reg, Register::Zero, addr as u16));
                Ok(reg)
            }
            Type::Integer => {
                let value: u32 = operand.name.parse().map_err(|_| {
                    CompileError::UnsupportedOperandType {
                        operand: operand.name.clone(),
                        ty: operand.ty.to_string(),
                    }
                })?;
                if value >= u16::MAX as u32 {
                    return Err(CompileError::ImmediateOverflow { value });
                }
                let reg = self.allocate(operand)?;
                self.add_instruction(Instruction::ori(reg, Register::Zero, value as u16));
                Ok(reg)
            }
            _ => Err(CompileError::UnsupportedOperandType {
                operand: operand.name.clone(),
                ty: operand.ty.to_string(),
            }),
        }
    }

    /// Append the literal's bytes plus a trailing NUL; returns its vm address
    fn add_string_to_data(&mut self, text: &str) -> u32 {
        let addr = VM_DATA_START + self.data_segment.len() as u32;
        self.data_segment.extend_from_slice(text.as_bytes());
        self.data_segment.push(0);
        addr
    }

    /// Bind `operand` to a register from the saved range
    fn allocate(&mut self, operand: &Operand) -> CompileResult<Register> {
        let reg = self.alloc_reg()?;
        self.current_mut().allocated_registers.insert(operand.clone(), reg);
        Ok(reg)
    }

    /// Round-robin over `s0..s19`: first free register after the previous
    /// pick. A full scan without a free register is a hard error; nothing is
    /// ever freed because no liveness analysis is performed.
    fn alloc_reg(&mut self) -> CompileResult<Register> {
        let used = self.current().used_registers();
        let start = self.current().next_saved;
        for offset in 0..Register::SAVED.len() {
            let index = (start + offset) % Register::SAVED.len();
            let candidate = Register::SAVED[index];
            if !used.contains(&candidate) {
                self.current_mut().next_saved = (index + 1) % Register::SAVED.len();
                return Ok(candidate);
            }
        }
        Err(CompileError::RegisterPressureExceeded)
    }

    fn add_instruction(&mut self, instruction: Instruction) {
        self.current_mut().instructions.push(instruction);
    }

    fn current(&self) -> &Function {
        let name = self
            .current_function_name
            .as_deref()
            .expect("instruction emitted outside of a function build");
        &self.functions[name]
    }

    fn current_mut(&mut self) -> &mut Function {
        let name = self
            .current_function_name
            .clone()
            .expect("instruction emitted outside of a function build");
        self.functions.get_mut(&name).expect("current function exists")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{InstructionData, Opcode};
    use pretty_assertions::assert_eq;
    use rill_ir::lower;
    use smallvec::smallvec;

    fn build_source(source: &str) -> CompileResult<Module> {
        let program = rill_parser::parse(source).expect("test source parses");
        let ir = lower(&program, "test")?;
        Module::build(&ir)
    }

    #[test]
    fn test_parameters_preassign_argument_registers() {
        let module =
            build_source("function f(a: integer, b: string, c: boolean) { }").unwrap();
        let func = module.function("f").unwrap();
        let regs: Vec<Register> =
            func.parameters.iter().map(|p| func.allocated_registers[p]).collect();
        assert_eq!(regs, vec![Register::A0, Register::A1, Register::A2]);
    }

    #[test]
    fn test_seven_parameters_fail() {
        let source = "function f(a: integer, b: integer, c: integer, d: integer, \
                      e: integer, f: integer, g: integer) { }";
        let err = build_source(source).unwrap_err();
        assert!(matches!(err, CompileError::TooManyParameters { count: 7, .. }));
    }

    #[test]
    fn test_print_body_lowering() {
        let module = build_source("function main() { }").unwrap();
        let print = module.function("print").unwrap();
        assert!(print.is_builtin());
        // "0", "1" and "3" materialise round-robin into s0, s1, s2; the
        // second "0" reuses s0
        assert_eq!(
            print.instructions,
            vec![
                Instruction::ori(Register::S0, Register::Zero, 0),
                Instruction::ori(Register::S1, Register::Zero, 1),
                Instruction::ori(Register::S2, Register::Zero, 3),
                Instruction::syscall(
                    Register::A0,
                    Register::S0,
                    Register::S0,
                    Register::S1,
                    Register::S2.number(),
                ),
                Instruction::jr(Register::Lr),
            ]
        );
    }

    #[test]
    fn test_hello_world_call_sequence() {
        let module = build_source(r#"function main() { print("hi"); }"#).unwrap();
        assert_eq!(module.data_segment(), b"hi\0");
        let main = module.function("main").unwrap();
        assert_eq!(
            main.instructions,
            vec![
                Instruction::ori(Register::S0, Register::Zero, 0x4000),
                Instruction::ori(Register::A0, Register::S0, 0),
                Instruction::jal(Register::Lr, 0), // print's number, not yet an address
                Instruction::jr(Register::Lr),
            ]
        );
    }

    #[test]
    fn test_repeated_string_literals_each_enter_the_data_segment() {
        let module =
            build_source(r#"function main() { print("ab"); print("cd"); }"#).unwrap();
        assert_eq!(module.data_segment(), b"ab\0cd\0");
        let main = module.function("main").unwrap();
        // the second literal lands at 0x4003
        assert!(main
            .instructions
            .contains(&Instruction::ori(Register::S1, Register::Zero, 0x4003)));
    }

    #[test]
    fn test_caller_saves_live_registers_around_a_call() {
        // set up a function whose live set is exactly {s0, s3}
        let ir = lower(
            &rill_parser::parse("function helper() { }").unwrap(),
            "test",
        )
        .unwrap();
        let mut builder = Builder::new(&ir);
        let mut func = Function::new(Vec::new(), Type::Unit, 2, false);
        func.allocated_registers.insert(Operand::new("x", Type::Integer), Register::S0);
        func.allocated_registers.insert(Operand::new("y", Type::Integer), Register::S3);
        builder.functions.insert("caller".to_string(), func);
        builder.current_function_name = Some("caller".to_string());

        let helper = ir.function("helper").unwrap();
        let call = rill_ir::Instruction::new(
            Operation::Call,
            smallvec![Operand::new("helper", helper.func_type().clone())],
            None,
        );
        builder.compile_instruction(&call).unwrap();

        let caller = &builder.functions["caller"];
        assert_eq!(
            caller.instructions,
            vec![
                Instruction::sw(Register::S0, Register::Sp, 0),
                Instruction::sw(Register::S3, Register::Sp, 4),
                Instruction::jal(Register::Lr, helper.number),
                Instruction::lw(Register::S3, Register::Sp, 4),
                Instruction::lw(Register::S0, Register::Sp, 0),
            ]
        );
    }

    #[test]
    fn test_call_result_is_harvested_from_v0() {
        let module = build_source(
            "function answer() -> integer { return 42; }\n\
             function main() { let x = answer(); }",
        );
        // `let` lowers to an assign op, which the bytecode stage rejects, so
        // drive the call through the IR directly
        assert!(matches!(
            module.unwrap_err(),
            CompileError::UnsupportedIrOp { .. }
        ));

        let ir = lower(
            &rill_parser::parse("function answer() -> integer { return 42; }").unwrap(),
            "test",
        )
        .unwrap();
        let mut builder = Builder::new(&ir);
        builder
            .functions
            .insert("caller".to_string(), Function::new(Vec::new(), Type::Unit, 2, false));
        builder.current_function_name = Some("caller".to_string());

        let answer = ir.function("answer").unwrap();
        let call = rill_ir::Instruction::new(
            Operation::Call,
            smallvec![Operand::new("answer", answer.func_type().clone())],
            Some(Operand::new("temp_0", Type::Integer)),
        );
        builder.compile_instruction(&call).unwrap();

        let caller = &builder.functions["caller"];
        assert_eq!(
            caller.instructions,
            vec![
                Instruction::jal(Register::Lr, answer.number),
                Instruction::ori(Register::S0, Register::V0, 0),
            ]
        );
        assert_eq!(
            caller.allocated_registers[&Operand::new("temp_0", Type::Integer)],
            Register::S0
        );
    }

    #[test]
    fn test_seven_arguments_fail() {
        let source = "function f(a: integer, b: integer, c: integer, d: integer, \
                      e: integer, f: integer) { }\n\
                      function main() { f(1, 2, 3, 4, 5, 6, 7); }";
        let err = build_source(source).unwrap_err();
        assert!(matches!(err, CompileError::TooManyArguments { count: 7, .. }));
    }

    #[test]
    fn test_six_arguments_are_accepted() {
        let source = "function f(a: integer, b: integer, c: integer, d: integer, \
                      e: integer, f: integer) { }\n\
                      function main() { f(1, 2, 3, 4, 5, 6); }";
        let module = build_source(source).unwrap();
        let main = module.function("main").unwrap();
        assert!(main
            .instructions
            .contains(&Instruction::ori(Register::A5, Register::S5, 0)));
    }

    #[test]
    fn test_boolean_operand_cannot_be_materialised() {
        let err = build_source("function main() { print(true); }").unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedOperandType { .. }));
    }

    #[test]
    fn test_large_integer_literal_overflows() {
        let err = build_source("function main() { print(65535); }").unwrap_err();
        assert!(matches!(
            err,
            CompileError::ImmediateOverflow { value: 0xFFFF }
        ));
        // one below the limit is fine
        assert!(build_source("function main() { print(65534); }").is_ok());
    }

    #[test]
    fn test_arithmetic_ops_are_not_lowerable() {
        let err = build_source("function main() { print(1 + 2); }").unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedIrOp { .. }));
    }

    #[test]
    fn test_register_pressure_is_a_hard_error() {
        let ir = lower(&rill_parser::parse("function f() { }").unwrap(), "test").unwrap();
        let mut builder = Builder::new(&ir);
        let mut func = Function::new(Vec::new(), Type::Unit, 2, false);
        for (i, reg) in Register::SAVED.into_iter().enumerate() {
            func.allocated_registers
                .insert(Operand::new(format!("op_{}", i), Type::Integer), reg);
        }
        builder.functions.insert("full".to_string(), func);
        builder.current_function_name = Some("full".to_string());
        assert!(matches!(
            builder.alloc_reg().unwrap_err(),
            CompileError::RegisterPressureExceeded
        ));
    }

    #[test]
    fn test_allocation_is_round_robin() {
        let ir = lower(&rill_parser::parse("function f() { }").unwrap(), "test").unwrap();
        let mut builder = Builder::new(&ir);
        builder
            .functions
            .insert("g".to_string(), Function::new(Vec::new(), Type::Unit, 2, false));
        builder.current_function_name = Some("g".to_string());
        let a = builder.allocate(&Operand::new("a", Type::Integer)).unwrap();
        let b = builder.allocate(&Operand::new("b", Type::Integer)).unwrap();
        let c = builder.allocate(&Operand::new("c", Type::Integer)).unwrap();
        assert_eq!((a, b, c), (Register::S0, Register::S1, Register::S2));
    }

    #[test]
    fn test_instruction_shapes_match_their_opcodes() {
        let module = build_source(r#"function main() { print("hi"); }"#).unwrap();
        for func in module.functions().values() {
            for inst in &func.instructions {
                match inst.op {
                    Opcode::Ori | Opcode::Lui | Opcode::Lw | Opcode::Sw => {
                        assert!(matches!(inst.data, InstructionData::I { .. }))
                    }
                    Opcode::Jal | Opcode::Jr => {
                        assert!(matches!(inst.data, InstructionData::J { .. }))
                    }
                    Opcode::Syscall => {
                        assert!(matches!(inst.data, InstructionData::S { .. }))
                    }
                    Opcode::RType => assert!(matches!(inst.data, InstructionData::R { .. })),
                }
            }
        }
    }
}
