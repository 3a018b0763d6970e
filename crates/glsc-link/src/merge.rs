//! Merging the shaders of one stage into a single module.
//!
//! Every input module is copied into a fresh [`Module`]. Handles of the
//! input do not address the merged arenas, so each copied node has its
//! type, global, function, and operand handles translated through a
//! [`Remap`] built while copying.

use std::collections::HashSet;

use glsc_context::ShaderKind;
use glsc_ir::{
    Arena, Block, Expression, Function, FunctionArgument, GlobalVariable, Handle, InfoLog,
    LocalVariable, Module, Statement, Type, format_type,
};

use crate::{LinkInput, LinkedStage};

/// Translation of one input module's handles into the merged module.
#[derive(Default)]
struct Remap {
    types: Vec<Handle<Type>>,
    globals: Vec<Handle<GlobalVariable>>,
    functions: Vec<Handle<Function>>,
}

impl Remap {
    fn ty(&self, ty: Handle<Type>) -> Handle<Type> {
        self.types[ty.index()]
    }
}

/// Merges `group`, the shaders of `kind` in program order.
pub(crate) fn merge_stage(
    kind: ShaderKind,
    group: &[&LinkInput<'_>],
    log: &mut InfoLog,
) -> Option<LinkedStage> {
    let mut merged = Module::default();
    let mut builtins: Vec<String> = Vec::new();

    for input in group {
        merge_module(&mut merged, input.module, log);
        for name in input.builtins {
            if !builtins.contains(name) {
                builtins.push(name.clone());
            }
        }
    }

    check_unresolved(&merged, log);
    if merged.entry_point().is_none() {
        log.error(None, format!("{kind} shader lacks `main'"));
    }

    let version = group.iter().map(|i| i.version).max()?;
    Some(LinkedStage {
        kind,
        module: merged,
        version,
        builtins,
    })
}

fn merge_module(dst: &mut Module, src: &Module, log: &mut InfoLog) {
    let mut remap = Remap::default();

    // Array element types precede the array type in the interner.
    for (_, ty) in src.types.iter() {
        let ty = match *ty {
            Type::Array { base, size } => Type::Array {
                base: remap.ty(base),
                size,
            },
            other => other,
        };
        remap.types.push(dst.types.insert(ty));
    }

    for (_, var) in src.global_variables.iter() {
        remap.globals.push(import_global(dst, var, &remap, log));
    }

    let global_exprs = import_expressions(
        &src.global_expressions,
        &mut dst.global_expressions,
        &remap,
    );
    for (handle, var) in src.global_variables.iter() {
        if let Some(init) = var.init {
            merge_initializer(dst, remap.globals[handle.index()], global_exprs[init.index()], log);
        }
    }

    // Map every function first; bodies may call functions declared later.
    for (_, func) in src.functions.iter() {
        remap.functions.push(declare_function(dst, func, &remap, log));
    }
    for (handle, func) in src.functions.iter() {
        if !func.defined {
            continue;
        }
        let target = remap.functions[handle.index()];
        if dst.functions[target].defined {
            log.error(
                None,
                format!("function `{}' is defined in more than one shader", func.name),
            );
            continue;
        }
        dst.functions[target] = import_function(func, &remap);
    }
}

fn import_global(
    dst: &mut Module,
    var: &GlobalVariable,
    remap: &Remap,
    log: &mut InfoLog,
) -> Handle<GlobalVariable> {
    let ty = remap.ty(var.ty);
    if let Some(existing) = dst.find_global(&var.name) {
        let (old_ty, old_space) = {
            let e = &dst.global_variables[existing];
            (e.ty, e.space)
        };
        if old_ty != ty {
            log.error(
                None,
                format!(
                    "`{}' declared as type `{}' and type `{}'",
                    var.name,
                    format_type(&dst.types[old_ty], &dst.types),
                    format_type(&dst.types[ty], &dst.types),
                ),
            );
        } else if old_space != var.space {
            log.error(
                None,
                format!(
                    "`{}' declared as `{old_space}' and `{}'",
                    var.name, var.space
                ),
            );
        }
        let e = &mut dst.global_variables[existing];
        e.invariant |= var.invariant;
        return existing;
    }

    let mut copy = var.clone();
    copy.ty = ty;
    copy.init = None;
    dst.global_variables.append(copy)
}

fn merge_initializer(
    dst: &mut Module,
    var: Handle<GlobalVariable>,
    init: Handle<Expression>,
    log: &mut InfoLog,
) {
    match dst.global_variables[var].init {
        None => dst.global_variables[var].init = Some(init),
        Some(existing) => {
            let same = match (
                dst.global_expressions[existing].as_literal(),
                dst.global_expressions[init].as_literal(),
            ) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            };
            if !same {
                log.error(
                    None,
                    format!(
                        "`{}' has initializers in more than one shader",
                        dst.global_variables[var].name
                    ),
                );
            }
        }
    }
}

/// Finds the merged function with `func`'s signature, adding a prototype
/// for it if there is none yet.
fn declare_function(
    dst: &mut Module,
    func: &Function,
    remap: &Remap,
    log: &mut InfoLog,
) -> Handle<Function> {
    let prototype = prototype_of(func, remap);
    let existing = dst
        .functions
        .iter()
        .find(|(_, f)| f.same_signature(&prototype))
        .map(|(h, f)| (h, f.result));
    match existing {
        Some((handle, result)) => {
            if result != prototype.result {
                log.error(
                    None,
                    format!(
                        "function `{}' declared with different return types",
                        func.name
                    ),
                );
            }
            handle
        }
        None => dst.functions.append(prototype),
    }
}

fn prototype_of(func: &Function, remap: &Remap) -> Function {
    let mut proto = Function::new(func.name.clone());
    proto.arguments = func
        .arguments
        .iter()
        .map(|a| FunctionArgument {
            name: a.name.clone(),
            ty: remap.ty(a.ty),
        })
        .collect();
    proto.result = func.result.map(|ty| remap.ty(ty));
    proto.defined = false;
    proto
}

fn import_function(func: &Function, remap: &Remap) -> Function {
    let mut out = prototype_of(func, remap);
    out.defined = true;
    // Locals are appended in order, so local handles carry over unchanged.
    for (_, local) in func.local_variables.iter() {
        out.local_variables.append(LocalVariable {
            name: local.name.clone(),
            ty: remap.ty(local.ty),
        });
    }
    let exprs = import_expressions(&func.expressions, &mut out.expressions, remap);
    out.body = import_block(&func.body, &exprs, remap);
    out
}

/// Copies `src` to the end of `dst`, returning where each expression went.
fn import_expressions(
    src: &Arena<Expression>,
    dst: &mut Arena<Expression>,
    remap: &Remap,
) -> Vec<Handle<Expression>> {
    let mut moved: Vec<Handle<Expression>> = Vec::with_capacity(src.len());
    for (_, expr) in src.iter() {
        let op = |h: &Handle<Expression>| moved[h.index()];
        let copy = match expr {
            Expression::Literal(lit) => Expression::Literal(*lit),
            Expression::Compose { ty, components } => Expression::Compose {
                ty: remap.ty(*ty),
                components: components.iter().map(op).collect(),
            },
            Expression::FunctionArgument(index) => Expression::FunctionArgument(*index),
            Expression::GlobalVariable(var) => {
                Expression::GlobalVariable(remap.globals[var.index()])
            }
            Expression::LocalVariable(local) => Expression::LocalVariable(*local),
            Expression::Load { pointer } => Expression::Load {
                pointer: op(pointer),
            },
            Expression::Access { base, index } => Expression::Access {
                base: op(base),
                index: op(index),
            },
            Expression::AccessIndex { base, index } => Expression::AccessIndex {
                base: op(base),
                index: *index,
            },
            Expression::Swizzle {
                size,
                vector,
                pattern,
            } => Expression::Swizzle {
                size: *size,
                vector: op(vector),
                pattern: *pattern,
            },
            Expression::Unary { op: unary, expr } => Expression::Unary {
                op: *unary,
                expr: op(expr),
            },
            Expression::Binary {
                op: binary,
                left,
                right,
            } => Expression::Binary {
                op: *binary,
                left: op(left),
                right: op(right),
            },
            Expression::Select {
                condition,
                accept,
                reject,
            } => Expression::Select {
                condition: op(condition),
                accept: op(accept),
                reject: op(reject),
            },
            Expression::Builtin { fun, arguments } => Expression::Builtin {
                fun: *fun,
                arguments: arguments.iter().map(op).collect(),
            },
            Expression::CallResult(function) => {
                Expression::CallResult(remap.functions[function.index()])
            }
        };
        moved.push(dst.append(copy));
    }
    moved
}

fn import_block(block: &[Statement], exprs: &[Handle<Expression>], remap: &Remap) -> Block {
    let e = |h: Handle<Expression>| exprs[h.index()];
    block
        .iter()
        .map(|stmt| match stmt {
            Statement::Store { pointer, value } => Statement::Store {
                pointer: e(*pointer),
                value: e(*value),
            },
            Statement::If {
                condition,
                accept,
                reject,
            } => Statement::If {
                condition: e(*condition),
                accept: import_block(accept, exprs, remap),
                reject: import_block(reject, exprs, remap),
            },
            Statement::Loop {
                body,
                continuing,
                break_if,
            } => Statement::Loop {
                body: import_block(body, exprs, remap),
                continuing: import_block(continuing, exprs, remap),
                break_if: break_if.map(e),
            },
            Statement::Call {
                function,
                arguments,
                result,
            } => Statement::Call {
                function: remap.functions[function.index()],
                arguments: arguments.iter().map(|&a| e(a)).collect(),
                result: result.map(e),
            },
            Statement::Break => Statement::Break,
            Statement::Continue => Statement::Continue,
            Statement::Return { value } => Statement::Return {
                value: value.map(e),
            },
            Statement::Kill => Statement::Kill,
        })
        .collect()
}

/// Reports calls of functions that no shader of the stage defines.
fn check_unresolved(module: &Module, log: &mut InfoLog) {
    fn calls(block: &[Statement], out: &mut Vec<Handle<Function>>) {
        for stmt in block {
            match stmt {
                Statement::Call { function, .. } => out.push(*function),
                Statement::If { accept, reject, .. } => {
                    calls(accept, out);
                    calls(reject, out);
                }
                Statement::Loop {
                    body, continuing, ..
                } => {
                    calls(body, out);
                    calls(continuing, out);
                }
                _ => {}
            }
        }
    }

    let mut called = Vec::new();
    for (_, func) in module.functions.iter() {
        calls(&func.body, &mut called);
    }
    let mut reported = HashSet::new();
    for function in called {
        let func = &module.functions[function];
        if !func.defined && reported.insert(function) {
            log.error(
                None,
                format!("unresolved reference to function `{}'", func.name),
            );
        }
    }
}
