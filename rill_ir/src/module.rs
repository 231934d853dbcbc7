//! The IR module: a symbol table of functions under construction

use crate::ir::{Args, Function, Instruction, Operand, Operation};
use crate::types::{ast_to_ir_type, Type};
use log::debug;
use rill_ast::{AstType, BinaryOp, TypedId, UnaryOp};
use rill_common::{CompileError, CompileResult};
use smallvec::smallvec;
use std::collections::BTreeMap;
use std::fmt;

/// Name of the builtin write-to-stdout function
pub const PRINT: &str = "print";

/// The syscall code for writing a NUL-terminated string
const SYSCALL_WRITE: &str = "3";
/// File-descriptor-like code for standard output
const STDOUT_FD: &str = "1";

/// The IR for one source module
///
/// Functions are registered in source order and numbered densely from 0;
/// number 0 is always the builtin `print`.
#[derive(Debug)]
pub struct Module {
    filename: String,
    functions: BTreeMap<String, Function>,
    current_function_name: Option<String>,
    temp_counter: u32,
    func_counter: u32,
}

impl Module {
    /// Create a module seeded with the builtin `print` function
    pub fn new(filename: impl Into<String>) -> Self {
        let mut module = Module {
            filename: filename.into(),
            functions: BTreeMap::new(),
            current_function_name: None,
            temp_counter: 0,
            func_counter: 0,
        };
        module.seed_print();
        module
    }

    /// Insert `print(input: string)`: one write syscall, then a return
    fn seed_print(&mut self) {
        let input = Operand::new("input", Type::String);
        let number = self.next_func_number();
        let mut print = Function::new_builtin(vec![input.clone()], Type::Unit, number);
        print.instructions.push(Instruction::new(
            Operation::Syscall,
            smallvec![
                Operand::new(SYSCALL_WRITE, Type::Integer),
                input,
                Operand::new("0", Type::Integer),
                Operand::new("0", Type::Integer),
                Operand::new(STDOUT_FD, Type::Integer),
            ],
            None,
        ));
        print.instructions.push(Instruction::new(Operation::Ret, Args::new(), None));
        self.functions.insert(PRINT.to_string(), print);
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// All registered functions, keyed by name
    pub fn functions(&self) -> &BTreeMap<String, Function> {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    // Top level item compilation

    /// Register a module-level global. Currently nothing is emitted for
    /// globals; repeated registration stays a no-op.
    pub fn register_global(
        &mut self,
        _id: &str,
        _ty: Option<&str>,
        _value: &rill_ast::Expr,
        _constant: bool,
    ) {
    }

    /// Register a struct declaration. No IR is produced for structs.
    pub fn register_struct(&mut self, _id: &str, _fields: &[TypedId]) {}

    /// Register a function and populate its body
    ///
    /// Fails with `DuplicateSymbol` when `id` is already present. The body
    /// always ends in a `ret`; one is appended when the source did not
    /// provide it.
    pub fn register_function(
        &mut self,
        id: &str,
        params: &[TypedId],
        return_type: Option<&str>,
        body: &rill_ast::Block,
    ) -> CompileResult<()> {
        if self.functions.contains_key(id) {
            return Err(CompileError::duplicate_symbol(id));
        }

        let mut parameters = Vec::with_capacity(params.len());
        for param in params {
            parameters.push(Operand::new(param.id.clone(), ast_to_ir_type(&param.ty)?));
        }
        let return_type = match return_type {
            Some(name) => ast_to_ir_type(name)?,
            None => Type::Unit,
        };

        let number = self.next_func_number();
        debug!("registering function {} as #{}", id, number);
        self.functions.insert(id.to_string(), Function::new(parameters, return_type, number));

        self.current_function_name = Some(id.to_string());
        let build_result = crate::lower::build_block(self, body);
        if build_result.is_ok() {
            let needs_ret = self
                .current_function()
                .instructions
                .last()
                .map_or(true, |inst| inst.op != Operation::Ret);
            if needs_ret {
                self.compile_return();
            }
        }
        self.current_function_name = None;
        build_result
    }

    // Statement compilation

    /// Emit a call whose result is discarded
    pub fn call_function(&mut self, id: &str, args: Vec<Operand>) -> CompileResult<()> {
        let args = self.call_args(id, args)?;
        self.add_instruction(Instruction::new(Operation::Call, args, None));
        Ok(())
    }

    /// Emit a call in expression position; the returned temporary carries
    /// the callee's return type
    pub fn call_function_expr(&mut self, id: &str, args: Vec<Operand>) -> CompileResult<Operand> {
        let args = self.call_args(id, args)?;
        let callee_ret = self.functions[id].return_type.clone();
        let result = self.temp_operand(callee_ret);
        self.add_instruction(Instruction::new(Operation::Call, args, Some(result.clone())));
        Ok(result)
    }

    /// Prepend the callee operand to the argument list
    fn call_args(&self, id: &str, args: Vec<Operand>) -> CompileResult<Args> {
        let callee = match self.functions.get(id) {
            Some(callee) => Operand::new(id, callee.func_type().clone()),
            None => return Err(CompileError::unknown_symbol(id)),
        };
        let mut all = Args::with_capacity(args.len() + 1);
        all.push(callee);
        all.extend(args);
        Ok(all)
    }

    /// Emit a return from the current function
    pub fn compile_return(&mut self) {
        self.add_instruction(Instruction::new(Operation::Ret, Args::new(), None));
    }

    /// Emit a move of `value` into the named local
    pub fn compile_assign(&mut self, id: &str, value: Operand) -> Operand {
        let result = Operand::new(id, value.ty.clone());
        self.add_instruction(Instruction::new(
            Operation::Assign,
            smallvec![value],
            Some(result.clone()),
        ));
        result
    }

    // Expression compilation

    /// The operand for a literal: its source text, typed canonically
    pub fn compile_literal(&self, text: &str, kind: AstType) -> CompileResult<Operand> {
        Ok(Operand::new(text, Type::for_literal(kind)?))
    }

    /// Emit a binary operation into a fresh temporary
    pub fn compile_binary_op(
        &mut self,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    ) -> CompileResult<Operand> {
        if lhs.ty != rhs.ty {
            return Err(CompileError::TypeMismatch {
                lhs: lhs.ty.to_string(),
                rhs: rhs.ty.to_string(),
            });
        }
        let result_type = match op {
            BinaryOp::BooleanAnd
            | BinaryOp::BooleanOr
            | BinaryOp::LessEq
            | BinaryOp::Less
            | BinaryOp::GreaterEq
            | BinaryOp::Greater
            | BinaryOp::Equal
            | BinaryOp::NotEqual => Type::Boolean,
            _ => lhs.ty.clone(),
        };
        let result = self.temp_operand(result_type);
        self.add_instruction(Instruction::new(
            Operation::from(op),
            smallvec![lhs, rhs],
            Some(result.clone()),
        ));
        Ok(result)
    }

    /// Emit a unary operation into a fresh temporary
    pub fn compile_unary_op(&mut self, op: UnaryOp, operand: Operand) -> Operand {
        let result = self.temp_operand(operand.ty.clone());
        self.add_instruction(Instruction::new(
            Operation::from(op),
            smallvec![operand],
            Some(result.clone()),
        ));
        result
    }

    // Internals

    /// Fresh `temp_<N>` operand of the given type
    fn temp_operand(&mut self, ty: Type) -> Operand {
        let operand = Operand::new(format!("temp_{}", self.temp_counter), ty);
        self.temp_counter += 1;
        operand
    }

    fn next_func_number(&mut self) -> u32 {
        let number = self.func_counter;
        self.func_counter += 1;
        number
    }

    fn add_instruction(&mut self, instruction: Instruction) {
        self.current_function_mut().instructions.push(instruction);
    }

    fn current_function(&self) -> &Function {
        let name = self
            .current_function_name
            .as_deref()
            .expect("instruction emitted outside of a function body");
        &self.functions[name]
    }

    fn current_function_mut(&mut self) -> &mut Function {
        let name = self
            .current_function_name
            .clone()
            .expect("instruction emitted outside of a function body");
        self.functions.get_mut(&name).expect("current function is registered")
    }

    /// Parameter types of the current function, for identifier lookup
    pub(crate) fn current_parameters(&self) -> &[Operand] {
        &self.current_function().parameters
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.filename)?;
        for (name, function) in &self.functions {
            write!(f, "\nfunction {}{}", name, function)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rill_ast::Block;

    fn empty_block() -> Block {
        Block { statements: Vec::new() }
    }

    #[test]
    fn test_print_is_seeded_with_number_zero() {
        let module = Module::new("test");
        let print = module.function(PRINT).expect("print is seeded");
        assert!(print.is_builtin());
        assert_eq!(print.number, 0);
        assert_eq!(print.parameters, vec![Operand::new("input", Type::String)]);
        assert_eq!(print.return_type, Type::Unit);
        assert_eq!(print.instructions.len(), 2);
        assert_eq!(print.instructions[0].op, Operation::Syscall);
        assert_eq!(print.instructions[0].args.len(), 5);
        assert_eq!(print.instructions[0].args[0].name, "3");
        assert_eq!(print.instructions[0].args[1].name, "input");
        assert_eq!(print.instructions[0].args[4].name, "1");
        assert_eq!(print.instructions[1].op, Operation::Ret);
    }

    #[test]
    fn test_function_numbers_are_dense_and_increasing() {
        let mut module = Module::new("test");
        module.register_function("first", &[], None, &empty_block()).unwrap();
        module.register_function("second", &[], None, &empty_block()).unwrap();
        assert_eq!(module.function("first").unwrap().number, 1);
        assert_eq!(module.function("second").unwrap().number, 2);
    }

    #[test]
    fn test_duplicate_function_registration_fails() {
        let mut module = Module::new("test");
        module.register_function("foo", &[], None, &empty_block()).unwrap();
        let err = module.register_function("foo", &[], None, &empty_block()).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateSymbol { .. }));
    }

    #[test]
    fn test_unknown_parameter_type_is_fatal() {
        let mut module = Module::new("test");
        let params = [TypedId { id: "x".to_string(), ty: "widget".to_string() }];
        let err = module.register_function("f", &params, None, &empty_block()).unwrap_err();
        assert!(matches!(err, CompileError::UnknownType { .. }));
    }

    #[test]
    fn test_empty_body_gets_an_implicit_ret() {
        let mut module = Module::new("test");
        module.register_function("main", &[], None, &empty_block()).unwrap();
        let main = module.function("main").unwrap();
        assert_eq!(main.instructions.len(), 1);
        assert_eq!(main.instructions[0].op, Operation::Ret);
    }

    #[test]
    fn test_call_prepends_the_callee_operand() {
        let mut module = Module::new("test");
        module.register_function("main", &[], None, &empty_block()).unwrap();
        module.current_function_name = Some("main".to_string());
        let arg = module.compile_literal("hi", AstType::String).unwrap();
        module.call_function(PRINT, vec![arg]).unwrap();
        module.current_function_name = None;

        let main = module.function("main").unwrap();
        let call = main.instructions.last().unwrap();
        assert_eq!(call.op, Operation::Call);
        assert_eq!(call.args[0].name, "print");
        assert!(call.args[0].ty.composite());
        assert_eq!(call.args[1].name, "hi");
        assert!(call.result.is_none());
    }

    #[test]
    fn test_call_of_unregistered_function_fails() {
        let mut module = Module::new("test");
        module.register_function("main", &[], None, &empty_block()).unwrap();
        module.current_function_name = Some("main".to_string());
        let err = module.call_function("bar", Vec::new()).unwrap_err();
        assert!(matches!(err, CompileError::UnknownSymbol { .. }));
    }

    #[test]
    fn test_literals_keep_their_text_and_canonical_type() {
        let module = Module::new("test");
        let op = module.compile_literal("42", AstType::Integer).unwrap();
        assert_eq!(op.name, "42");
        assert_eq!(op.ty, Type::Integer);
        let op = module.compile_literal("true", AstType::Boolean).unwrap();
        assert_eq!(op.ty, Type::Boolean);
        assert!(module.compile_literal("1.5", AstType::Floating).is_err());
    }

    #[test]
    fn test_binary_op_allocates_fresh_temporaries() {
        let mut module = Module::new("test");
        module.register_function("main", &[], None, &empty_block()).unwrap();
        module.current_function_name = Some("main".to_string());
        let one = module.compile_literal("1", AstType::Integer).unwrap();
        let two = module.compile_literal("2", AstType::Integer).unwrap();
        let sum = module.compile_binary_op(BinaryOp::Add, one, two).unwrap();
        assert_eq!(sum.name, "temp_0");
        assert_eq!(sum.ty, Type::Integer);

        let three = module.compile_literal("3", AstType::Integer).unwrap();
        let cmp = module.compile_binary_op(BinaryOp::Less, sum.clone(), three).unwrap();
        assert_eq!(cmp.name, "temp_1");
        assert_eq!(cmp.ty, Type::Boolean);
    }

    #[test]
    fn test_binary_op_type_mismatch_is_fatal() {
        let mut module = Module::new("test");
        module.register_function("main", &[], None, &empty_block()).unwrap();
        module.current_function_name = Some("main".to_string());
        let lhs = module.compile_literal("1", AstType::Integer).unwrap();
        let rhs = module.compile_literal("x", AstType::String).unwrap();
        let err = module.compile_binary_op(BinaryOp::Add, lhs, rhs).unwrap_err();
        assert!(matches!(err, CompileError::TypeMismatch { .. }));
    }

    #[test]
    fn test_register_global_and_struct_are_noops() {
        let mut module = Module::new("test");
        let value = rill_ast::Expr::Literal(rill_ast::Literal {
            text: "1".to_string(),
            kind: AstType::Integer,
        });
        module.register_global("g", Some("integer"), &value, true);
        module.register_global("g", Some("integer"), &value, true);
        module.register_struct("pair", &[]);
        assert_eq!(module.functions().len(), 1); // just print
    }

    #[test]
    fn test_pretty_print_lists_functions_and_instructions() {
        let module = Module::new("test");
        let dump = module.to_string();
        assert!(dump.contains("module test"));
        assert!(dump.contains("function print(input: string) -> unit"));
        assert!(dump.contains("syscall 3, input, 0, 0, 1"));
        assert!(dump.contains("    ret"));
    }
}
