//! Statement lowering.
//!
//! Every loop form becomes a [`Statement::Loop`]: `while` and `for` test
//! their condition at the top of the body, `for` runs its step in the
//! continuing block, and `do`-`while` evaluates its condition in the
//! continuing block and exits through `break_if`.

use glsc_ir::{Block, Expression, Statement, Type, UnaryOp};

use super::{LowerResult, Lowerer, Symbol, Var, error};
use crate::ast::{self, Declaration, Declarator, StatementKind, StorageQualifier};

impl Lowerer<'_> {
    /// Lowers one statement into the current block, reporting rather than
    /// propagating its errors.
    pub(super) fn statement(&mut self, stmt: &ast::Statement) {
        if let Err(e) = self.try_statement(stmt) {
            self.report(e);
        }
    }

    /// Lowers `stmt` into a block of its own, in a new scope.
    fn nested(&mut self, stmt: &ast::Statement) -> LowerResult<Block> {
        self.with_scope(|this| {
            this.in_block(|this| {
                this.statement(stmt);
                Ok(())
            })
        })
        .map(|(block, ())| block)
    }

    /// `if (!condition) break;`
    fn exit_unless(&mut self, condition: &ast::Expr, what: &str) -> LowerResult<()> {
        let condition_handle = self.condition(condition, what)?;
        self.push_statement(
            Statement::If {
                condition: condition_handle,
                accept: Vec::new(),
                reject: vec![Statement::Break],
            },
            condition.location,
        )
    }

    fn try_statement(&mut self, stmt: &ast::Statement) -> LowerResult<()> {
        let location = stmt.location;
        match &stmt.kind {
            StatementKind::Declaration(decl) => self.local_declaration(decl),
            StatementKind::Precision(precision) => self.precision_statement(precision),
            StatementKind::Expression(None) => Ok(()),
            StatementKind::Expression(Some(expr)) => self.expression_statement(expr),
            StatementKind::Compound(statements) => {
                self.with_scope(|this| {
                    for stmt in statements {
                        this.statement(stmt);
                    }
                });
                Ok(())
            }
            StatementKind::If {
                condition,
                accept,
                reject,
            } => {
                let condition = self.condition(condition, "if-statement")?;
                let accept = self.nested(accept)?;
                let reject = match reject {
                    Some(reject) => self.nested(reject)?,
                    None => Vec::new(),
                };
                self.push_statement(
                    Statement::If {
                        condition,
                        accept,
                        reject,
                    },
                    location,
                )
            }
            StatementKind::While { condition, body } => {
                self.loop_depth += 1;
                let lowered = self.with_scope(|this| {
                    this.in_block(|this| {
                        this.exit_unless(condition, "while-loop")?;
                        this.statement(body);
                        Ok(())
                    })
                });
                self.loop_depth -= 1;
                let (body, ()) = lowered?;
                self.push_statement(
                    Statement::Loop {
                        body,
                        continuing: Vec::new(),
                        break_if: None,
                    },
                    location,
                )
            }
            StatementKind::DoWhile { body, condition } => {
                self.loop_depth += 1;
                let body = self.nested(body);
                let continuing = self.in_block(|this| this.condition(condition, "do-while"));
                self.loop_depth -= 1;
                let body = body?;
                let (continuing, condition) = continuing?;
                let break_if = self.emit(Expression::Unary {
                    op: UnaryOp::LogicalNot,
                    expr: condition,
                });
                self.push_statement(
                    Statement::Loop {
                        body,
                        continuing,
                        break_if: Some(break_if),
                    },
                    location,
                )
            }
            StatementKind::For {
                init,
                condition,
                step,
                body,
            } => self.with_scope(|this| {
                if let Some(init) = init {
                    this.try_statement(init)?;
                }
                this.loop_depth += 1;
                let lowered = this.in_block(|this| {
                    if let Some(condition) = condition {
                        this.exit_unless(condition, "for-loop")?;
                    }
                    this.statement(body);
                    Ok(())
                });
                let continuing = this.in_block(|this| match step {
                    Some(step) => this.expression_statement(step),
                    None => Ok(()),
                });
                this.loop_depth -= 1;
                let (body, ()) = lowered?;
                let (continuing, ()) = continuing?;
                this.push_statement(
                    Statement::Loop {
                        body,
                        continuing,
                        break_if: None,
                    },
                    location,
                )
            }),
            StatementKind::Return(value) => self.return_statement(value.as_ref(), location),
            StatementKind::Break => {
                if self.loop_depth == 0 {
                    return error(location, "`break' may only appear in a loop");
                }
                self.push_statement(Statement::Break, location)
            }
            StatementKind::Continue => {
                if self.loop_depth == 0 {
                    return error(location, "`continue' may only appear in a loop");
                }
                self.push_statement(Statement::Continue, location)
            }
            StatementKind::Discard => {
                if self.kind != glsc_context::ShaderKind::Fragment {
                    return error(location, "`discard' may only appear in a fragment shader");
                }
                self.push_statement(Statement::Kill, location)
            }
        }
    }

    fn return_statement(
        &mut self,
        value: Option<&ast::Expr>,
        location: glsc_ir::SourceLocation,
    ) -> LowerResult<()> {
        let (name, result) = match &self.function {
            Some(function) => (function.name.clone(), function.result),
            None => return error(location, "`return' outside of a function"),
        };
        let value = match (value, result) {
            (None, None) => None,
            (Some(_), None) => {
                return error(
                    location,
                    format!("`return' with a value, in function `{name}' returning void"),
                );
            }
            (None, Some(ty)) => {
                return error(
                    location,
                    format!(
                        "`return' with no value, in function `{name}' returning `{}'",
                        self.type_name(ty)
                    ),
                );
            }
            (Some(expr), Some(ty)) => {
                let value = self.rvalue(expr)?;
                if value.ty != ty {
                    return error(
                        location,
                        format!(
                            "`return' argument has type `{}', function `{name}' returns `{}'",
                            self.type_name(value.ty),
                            self.type_name(ty)
                        ),
                    );
                }
                Some(value.handle)
            }
        };
        self.push_statement(Statement::Return { value }, location)
    }

    fn local_declaration(&mut self, decl: &Declaration) -> LowerResult<()> {
        let qualifiers = &decl.ty.qualifiers;
        let constant = match qualifiers.storage {
            None => false,
            Some(StorageQualifier::Const) => true,
            Some(other) => {
                return error(
                    decl.location,
                    format!("`{other}' qualifier cannot be used on a local variable"),
                );
            }
        };
        if qualifiers.invariant || qualifiers.centroid || qualifiers.interpolation.is_some() {
            return error(
                decl.location,
                "local variables may only be qualified with `const'",
            );
        }
        if decl.declarators.is_empty() {
            self.log.warning(Some(decl.location), "empty declaration");
        }
        for declarator in &decl.declarators {
            if let Err(e) = self.local_declarator(decl, constant, declarator) {
                self.report(e);
            }
        }
        Ok(())
    }

    fn local_declarator(
        &mut self,
        decl: &Declaration,
        constant: bool,
        d: &Declarator,
    ) -> LowerResult<()> {
        self.check_new_name(&d.name, d.location)?;
        let ty = self.resolve_type(&decl.ty.ty, d.array_size.as_ref(), d.location)?;
        self.check_precision(&decl.ty.ty, ty, d.location)?;
        if matches!(self.innermost(ty), Type::Sampler(_)) {
            return error(
                d.location,
                format!("sampler `{}' must be declared uniform", d.name),
            );
        }

        let init = match &d.initializer {
            Some(expr) => {
                let value = self.rvalue(expr)?;
                self.check_initializer(&d.name, ty, value.ty, expr.location)?;
                Some(value.handle)
            }
            None if constant => {
                return error(
                    d.location,
                    format!("const variable `{}' must be initialized", d.name),
                );
            }
            None => None,
        };
        let folded = match &d.initializer {
            Some(expr) if constant && matches!(self.ty(ty), Type::Scalar(_)) => {
                self.eval_const(expr)
            }
            _ => None,
        };

        let local = self.add_local(Some(d.name.clone()), ty, d.location)?;
        if let Some(value) = init {
            let pointer = self.emit(Expression::LocalVariable(local));
            self.push_statement(Statement::Store { pointer, value }, d.location)?;
        }
        self.declare(
            &d.name,
            Symbol {
                var: Var::Local(local),
                ty,
                read_only: constant,
                constant: folded,
            },
        );
        Ok(())
    }
}
