//! Lowering from the AST to the IR
//!
//! A single pass over the tagged-variant tree. Each node kind maps to one
//! IR-module builder call; there is no visitor machinery.

use crate::ir::Operand;
use crate::module::Module;
use crate::types::ast_to_ir_type;
use rill_ast::{Block, Expr, Item, Program, Stmt};
use rill_common::{CompileError, CompileResult};
use std::collections::BTreeMap;

/// Lower a parsed program into an IR module
pub fn lower(program: &Program, filename: &str) -> CompileResult<Module> {
    let mut module = Module::new(filename);
    for item in &program.items {
        match item {
            Item::Function(func) => {
                module.register_function(
                    &func.name,
                    &func.params,
                    func.return_type.as_deref(),
                    &func.body,
                )?;
            }
            Item::Global(global) => {
                module.register_global(
                    &global.name,
                    global.ty.as_deref(),
                    &global.value,
                    global.constant,
                );
            }
            Item::Struct(def) => module.register_struct(&def.name, &def.fields),
        }
    }
    Ok(module)
}

/// Names visible in the current function body, with their IR types
type Scope = BTreeMap<String, crate::types::Type>;

/// Build the instructions for a function body
///
/// Called by `Module::register_function` once the function's symbol-table
/// entry exists and is current.
pub(crate) fn build_block(module: &mut Module, body: &Block) -> CompileResult<()> {
    let mut scope: Scope = module
        .current_parameters()
        .iter()
        .map(|param| (param.name.clone(), param.ty.clone()))
        .collect();
    build_statements(module, body, &mut scope)
}

fn build_statements(module: &mut Module, block: &Block, scope: &mut Scope) -> CompileResult<()> {
    for stmt in &block.statements {
        match stmt {
            Stmt::Block(inner) => {
                // Inner blocks open a child scope; bindings do not escape
                let mut child = scope.clone();
                build_statements(module, inner, &mut child)?;
            }
            Stmt::Let(let_stmt) => {
                let value = build_expr(module, &let_stmt.value, scope)?;
                if let Some(annotation) = &let_stmt.ty {
                    let annotated = ast_to_ir_type(annotation)?;
                    if annotated != value.ty {
                        return Err(CompileError::TypeMismatch {
                            lhs: annotated.to_string(),
                            rhs: value.ty.to_string(),
                        });
                    }
                }
                let bound = module.compile_assign(&let_stmt.name, value);
                scope.insert(bound.name.clone(), bound.ty);
            }
            Stmt::Return(value) => {
                if let Some(expr) = value {
                    build_expr(module, expr, scope)?;
                }
                module.compile_return();
            }
            Stmt::Call(call) => {
                let args = build_args(module, &call.args, scope)?;
                module.call_function(&call.callee, args)?;
            }
        }
    }
    Ok(())
}

fn build_expr(module: &mut Module, expr: &Expr, scope: &mut Scope) -> CompileResult<Operand> {
    match expr {
        Expr::Literal(literal) => module.compile_literal(&literal.text, literal.kind),
        Expr::Identifier(name) => match scope.get(name) {
            Some(ty) => Ok(Operand::new(name.clone(), ty.clone())),
            None => Err(CompileError::unknown_symbol(name)),
        },
        Expr::Call(call) => {
            let args = build_args(module, &call.args, scope)?;
            module.call_function_expr(&call.callee, args)
        }
        Expr::Binary { op, lhs, rhs } => {
            let lhs = build_expr(module, lhs, scope)?;
            let rhs = build_expr(module, rhs, scope)?;
            module.compile_binary_op(*op, lhs, rhs)
        }
        Expr::Unary { op, operand } => {
            let operand = build_expr(module, operand, scope)?;
            Ok(module.compile_unary_op(*op, operand))
        }
    }
}

fn build_args(
    module: &mut Module,
    args: &[Expr],
    scope: &mut Scope,
) -> CompileResult<Vec<Operand>> {
    args.iter().map(|arg| build_expr(module, arg, scope)).collect()
}
