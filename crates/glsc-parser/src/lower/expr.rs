//! Expression lowering and constant evaluation.

use glsc_ir::{
    BinaryOp, BuiltinFunction, Expression, Handle, Literal, ScalarKind, SourceLocation, Statement,
    SwizzleComponent, Type, UnaryOp,
};

use super::{LowerResult, Lowerer, Var, builtins, convert_type, error};
use crate::ast::{self, AssignOp, Callee, Expr, ExprKind, PostfixOp, TypeName};

/// Whether a pointer may be stored through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Access {
    Writable,
    ReadOnly,
    /// A swizzle such as `v.xx`, which cannot be assigned.
    RepeatedSwizzle,
}

/// A lowered expression with its type.
#[derive(Clone, Copy, Debug)]
pub(super) struct Typed {
    pub handle: Handle<Expression>,
    pub ty: Handle<Type>,
    /// Set if `handle` is a pointer rather than a value.
    pub access: Option<Access>,
}

fn convert_binary(op: ast::BinaryOp) -> BinaryOp {
    match op {
        ast::BinaryOp::Add => BinaryOp::Add,
        ast::BinaryOp::Sub => BinaryOp::Subtract,
        ast::BinaryOp::Mul => BinaryOp::Multiply,
        ast::BinaryOp::Div => BinaryOp::Divide,
        ast::BinaryOp::Less => BinaryOp::Less,
        ast::BinaryOp::Greater => BinaryOp::Greater,
        ast::BinaryOp::LessEqual => BinaryOp::LessEqual,
        ast::BinaryOp::GreaterEqual => BinaryOp::GreaterEqual,
        ast::BinaryOp::Equal => BinaryOp::Equal,
        ast::BinaryOp::NotEqual => BinaryOp::NotEqual,
        ast::BinaryOp::And => BinaryOp::LogicalAnd,
        ast::BinaryOp::Or => BinaryOp::LogicalOr,
        ast::BinaryOp::Xor => BinaryOp::LogicalXor,
    }
}

fn compound_op(op: AssignOp) -> Option<BinaryOp> {
    match op {
        AssignOp::Assign => None,
        AssignOp::Add => Some(BinaryOp::Add),
        AssignOp::Sub => Some(BinaryOp::Subtract),
        AssignOp::Mul => Some(BinaryOp::Multiply),
        AssignOp::Div => Some(BinaryOp::Divide),
    }
}

fn is_numeric(ty: &Type) -> bool {
    matches!(ty.scalar_kind(), Some(ScalarKind::Int | ScalarKind::Float))
}

/// Result type of `+ - * /` on operands of type `left` and `right`.
fn arithmetic_result(op: BinaryOp, left: Type, right: Type) -> Option<Type> {
    if !is_numeric(&left) || !is_numeric(&right) || left.scalar_kind() != right.scalar_kind() {
        return None;
    }
    match (left, right) {
        _ if left == right => Some(left),
        (Type::Scalar(_), other) | (other, Type::Scalar(_)) => Some(other),
        (Type::Matrix { size }, Type::Vector { size: n, .. })
        | (Type::Vector { size: n, .. }, Type::Matrix { size })
            if op == BinaryOp::Multiply && size == n =>
        {
            Some(Type::Vector {
                size,
                kind: ScalarKind::Float,
            })
        }
        _ => None,
    }
}

/// The variable name at the root of an lvalue expression.
fn lvalue_name(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Identifier(name) => Some(name),
        ExprKind::Index(base, _) | ExprKind::Field(base, _) => lvalue_name(base),
        _ => None,
    }
}

impl Lowerer<'_> {
    /// Lowers `expr` and loads the value if it is a pointer.
    pub(super) fn rvalue(&mut self, expr: &Expr) -> LowerResult<Typed> {
        if let ExprKind::Identifier(name) = &expr.kind {
            if let Some(constant) = self.lookup(name).and_then(|symbol| symbol.constant) {
                return Ok(self.literal(constant));
            }
        }
        let typed = self.expression(expr)?;
        Ok(self.load(typed))
    }

    fn load(&mut self, typed: Typed) -> Typed {
        if typed.access.is_none() {
            return typed;
        }
        let handle = self.emit(Expression::Load {
            pointer: typed.handle,
        });
        Typed {
            handle,
            ty: typed.ty,
            access: None,
        }
    }

    fn literal(&mut self, literal: Literal) -> Typed {
        let ty = self.intern(Type::Scalar(literal.kind()));
        let handle = self.emit(Expression::Literal(literal));
        Typed {
            handle,
            ty,
            access: None,
        }
    }

    fn value(&mut self, expr: Expression, ty: Handle<Type>) -> Typed {
        let handle = self.emit(expr);
        Typed {
            handle,
            ty,
            access: None,
        }
    }

    /// Lowers an expression whose value is discarded. Calls of `void`
    /// functions are only legal here.
    pub(super) fn expression_statement(&mut self, expr: &Expr) -> LowerResult<()> {
        match &expr.kind {
            ExprKind::Call(Callee::Function(name), args) => {
                self.call(name, args, expr.location)?;
            }
            ExprKind::Comma(first, second) => {
                self.expression_statement(first)?;
                self.expression_statement(second)?;
            }
            ExprKind::Postfix(op, operand) => {
                let target = self.expression(operand)?;
                self.check_writable(&target, operand)?;
                self.increment(target, *op == PostfixOp::Increment, expr.location)?;
            }
            _ => {
                self.expression(expr)?;
            }
        }
        Ok(())
    }

    /// Lowers `expr`, keeping pointers for lvalues.
    pub(super) fn expression(&mut self, expr: &Expr) -> LowerResult<Typed> {
        let location = expr.location;
        match &expr.kind {
            ExprKind::Identifier(name) => self.identifier(name, location),
            ExprKind::IntConstant(v) => Ok(self.literal(Literal::Int(*v))),
            ExprKind::FloatConstant(v) => Ok(self.literal(Literal::Float(*v))),
            ExprKind::BoolConstant(v) => Ok(self.literal(Literal::Bool(*v))),
            ExprKind::Unary(op, operand) => self.unary(*op, operand, location),
            ExprKind::Postfix(op, operand) => self.postfix(*op, operand, location),
            ExprKind::Binary(op, left, right) => self.binary(*op, left, right, location),
            ExprKind::Assign(op, target, value) => self.assign(*op, target, value, location),
            ExprKind::Ternary(condition, accept, reject) => {
                self.ternary(condition, accept, reject, location)
            }
            ExprKind::Comma(first, second) => {
                self.expression_statement(first)?;
                self.expression(second)
            }
            ExprKind::Index(base, index) => self.index(base, index, location),
            ExprKind::Field(base, name) => self.field(base, name, location),
            ExprKind::Call(Callee::Constructor(name), args) => {
                self.constructor(*name, args, location)
            }
            ExprKind::Call(Callee::Function(name), args) => match self.call(name, args, location)? {
                Some(result) => Ok(result),
                None => error(
                    location,
                    format!("void function `{name}' used in an expression"),
                ),
            },
        }
    }

    fn identifier(&mut self, name: &str, location: SourceLocation) -> LowerResult<Typed> {
        let Some(symbol) = self.lookup(name) else {
            return error(location, format!("`{name}' undeclared"));
        };
        let handle = match symbol.var {
            Var::Global(var) => self.emit(Expression::GlobalVariable(var)),
            Var::Local(var) => self.emit(Expression::LocalVariable(var)),
        };
        Ok(Typed {
            handle,
            ty: symbol.ty,
            access: Some(if symbol.read_only {
                Access::ReadOnly
            } else {
                Access::Writable
            }),
        })
    }

    fn check_writable(&self, target: &Typed, expr: &Expr) -> LowerResult<()> {
        match target.access {
            Some(Access::Writable) => Ok(()),
            Some(Access::ReadOnly) => error(
                expr.location,
                format!(
                    "assignment to read-only variable `{}'",
                    lvalue_name(expr).unwrap_or_default()
                ),
            ),
            Some(Access::RepeatedSwizzle) => error(
                expr.location,
                "l-value swizzle contains repeated components",
            ),
            None => error(expr.location, "assignment target is not an l-value"),
        }
    }

    /// Stores `*target + 1` (or `- 1`) back into `target`.
    fn increment(&mut self, target: Typed, up: bool, location: SourceLocation) -> LowerResult<()> {
        let one = match self.ty(target.ty).scalar_kind() {
            Some(ScalarKind::Int) => Literal::Int(1),
            Some(ScalarKind::Float) => Literal::Float(1.0),
            _ => {
                return error(
                    location,
                    format!(
                        "`++' and `--' cannot be applied to type `{}'",
                        self.type_name(target.ty)
                    ),
                );
            }
        };
        let current = self.emit(Expression::Load {
            pointer: target.handle,
        });
        let one = self.emit(Expression::Literal(one));
        let value = self.emit(Expression::Binary {
            op: if up {
                BinaryOp::Add
            } else {
                BinaryOp::Subtract
            },
            left: current,
            right: one,
        });
        self.push_statement(
            Statement::Store {
                pointer: target.handle,
                value,
            },
            location,
        )
    }

    fn unary(
        &mut self,
        op: ast::UnaryOp,
        operand: &Expr,
        location: SourceLocation,
    ) -> LowerResult<Typed> {
        if let ast::UnaryOp::PreIncrement | ast::UnaryOp::PreDecrement = op {
            let target = self.expression(operand)?;
            self.check_writable(&target, operand)?;
            self.increment(target, op == ast::UnaryOp::PreIncrement, location)?;
            return Ok(self.load(target));
        }

        let value = self.rvalue(operand)?;
        let ty = self.ty(value.ty);
        match op {
            ast::UnaryOp::Plus if is_numeric(&ty) => Ok(value),
            ast::UnaryOp::Minus if is_numeric(&ty) => Ok(self.value(
                Expression::Unary {
                    op: UnaryOp::Negate,
                    expr: value.handle,
                },
                value.ty,
            )),
            ast::UnaryOp::Not if ty == Type::BOOL => Ok(self.value(
                Expression::Unary {
                    op: UnaryOp::LogicalNot,
                    expr: value.handle,
                },
                value.ty,
            )),
            _ => error(
                location,
                format!(
                    "operand of unary `{op}' cannot have type `{}'",
                    self.type_name(value.ty)
                ),
            ),
        }
    }

    /// `x++` yields the old value, saved in a temporary.
    fn postfix(&mut self, op: PostfixOp, operand: &Expr, location: SourceLocation) -> LowerResult<Typed> {
        let target = self.expression(operand)?;
        self.check_writable(&target, operand)?;
        let old = self.load(target);
        let temp = self.add_local(None, target.ty, location)?;
        let temp = self.emit(Expression::LocalVariable(temp));
        self.push_statement(
            Statement::Store {
                pointer: temp,
                value: old.handle,
            },
            location,
        )?;
        self.increment(target, op == PostfixOp::Increment, location)?;
        Ok(self.value(Expression::Load { pointer: temp }, target.ty))
    }

    fn binary_result(
        &mut self,
        op: BinaryOp,
        left: Handle<Type>,
        right: Handle<Type>,
        location: SourceLocation,
    ) -> LowerResult<Handle<Type>> {
        let (lt, rt) = (self.ty(left), self.ty(right));
        let result = if op.is_logical() {
            (lt == Type::BOOL && rt == Type::BOOL).then_some(Type::BOOL)
        } else if op.is_relational() {
            (lt == rt && matches!(lt, Type::Scalar(ScalarKind::Int | ScalarKind::Float)))
                .then_some(Type::BOOL)
        } else if op.is_equality() {
            (left == right && !matches!(lt, Type::Sampler(_) | Type::Array { .. }))
                .then_some(Type::BOOL)
        } else {
            arithmetic_result(op, lt, rt)
        };
        match result {
            Some(ty) => Ok(self.intern(ty)),
            None => error(
                location,
                format!(
                    "operands of `{op}' have incompatible types `{}' and `{}'",
                    self.type_name(left),
                    self.type_name(right)
                ),
            ),
        }
    }

    fn binary(
        &mut self,
        op: ast::BinaryOp,
        left: &Expr,
        right: &Expr,
        location: SourceLocation,
    ) -> LowerResult<Typed> {
        let left = self.rvalue(left)?;
        let right = self.rvalue(right)?;
        let op = convert_binary(op);
        let ty = self.binary_result(op, left.ty, right.ty, location)?;
        Ok(self.value(
            Expression::Binary {
                op,
                left: left.handle,
                right: right.handle,
            },
            ty,
        ))
    }

    fn assign(
        &mut self,
        op: AssignOp,
        target_expr: &Expr,
        value_expr: &Expr,
        location: SourceLocation,
    ) -> LowerResult<Typed> {
        let target = self.expression(target_expr)?;
        self.check_writable(&target, target_expr)?;
        let value = self.rvalue(value_expr)?;

        let stored = match compound_op(op) {
            None => {
                if value.ty != target.ty {
                    return error(
                        location,
                        format!(
                            "cannot assign a value of type `{}' to an l-value of type `{}'",
                            self.type_name(value.ty),
                            self.type_name(target.ty)
                        ),
                    );
                }
                value.handle
            }
            Some(binary) => {
                let result = self.binary_result(binary, target.ty, value.ty, location)?;
                if result != target.ty {
                    return error(
                        location,
                        format!(
                            "result of `{op}' has type `{}', not `{}'",
                            self.type_name(result),
                            self.type_name(target.ty)
                        ),
                    );
                }
                let current = self.load(target);
                self.emit(Expression::Binary {
                    op: binary,
                    left: current.handle,
                    right: value.handle,
                })
            }
        };
        self.push_statement(
            Statement::Store {
                pointer: target.handle,
                value: stored,
            },
            location,
        )?;
        Ok(self.load(target))
    }

    fn ternary(
        &mut self,
        condition: &Expr,
        accept: &Expr,
        reject: &Expr,
        location: SourceLocation,
    ) -> LowerResult<Typed> {
        let condition = self.condition(condition, "`?:'")?;
        let accept = self.rvalue(accept)?;
        let reject = self.rvalue(reject)?;
        if accept.ty != reject.ty {
            return error(
                location,
                format!(
                    "branches of `?:' have different types `{}' and `{}'",
                    self.type_name(accept.ty),
                    self.type_name(reject.ty)
                ),
            );
        }
        Ok(self.value(
            Expression::Select {
                condition,
                accept: accept.handle,
                reject: reject.handle,
            },
            accept.ty,
        ))
    }

    /// Lowers a condition, which must be a scalar `bool`.
    pub(super) fn condition(&mut self, expr: &Expr, what: &str) -> LowerResult<Handle<Expression>> {
        let value = self.rvalue(expr)?;
        if self.ty(value.ty) != Type::BOOL {
            return error(
                expr.location,
                format!(
                    "{what} condition must be a scalar boolean, not `{}'",
                    self.type_name(value.ty)
                ),
            );
        }
        Ok(value.handle)
    }

    fn index(&mut self, base: &Expr, index: &Expr, location: SourceLocation) -> LowerResult<Typed> {
        let target = self.expression(base)?;
        let (element, bound) = match self.ty(target.ty) {
            Type::Array { base, size } => (base, size),
            Type::Vector { size, kind } => (self.intern(Type::Scalar(kind)), size.count()),
            Type::Matrix { size } => (
                self.intern(Type::Vector {
                    size,
                    kind: ScalarKind::Float,
                }),
                size.count(),
            ),
            _ => {
                return error(
                    location,
                    format!("cannot index a value of type `{}'", self.type_name(target.ty)),
                );
            }
        };

        let handle = match self.eval_const(index) {
            Some(Literal::Int(i)) => {
                let Some(i) = u32::try_from(i).ok().filter(|&i| i < bound) else {
                    return error(
                        index.location,
                        format!(
                            "index {i} is out of bounds for `{}'",
                            self.type_name(target.ty)
                        ),
                    );
                };
                self.emit(Expression::AccessIndex {
                    base: target.handle,
                    index: i,
                })
            }
            _ => {
                let value = self.rvalue(index)?;
                if self.ty(value.ty) != Type::INT {
                    return error(
                        index.location,
                        format!(
                            "index must be a scalar integer, not `{}'",
                            self.type_name(value.ty)
                        ),
                    );
                }
                let frag_data = matches!(&base.kind, ExprKind::Identifier(n) if n == "gl_FragData");
                if frag_data && self.version.es {
                    return error(
                        index.location,
                        "`gl_FragData' must be indexed with a constant expression",
                    );
                }
                self.emit(Expression::Access {
                    base: target.handle,
                    index: value.handle,
                })
            }
        };
        Ok(Typed {
            handle,
            ty: element,
            access: target.access,
        })
    }

    fn field(&mut self, base: &Expr, name: &str, location: SourceLocation) -> LowerResult<Typed> {
        let target = self.expression(base)?;
        let Type::Vector { size, kind } = self.ty(target.ty) else {
            return error(
                location,
                format!(
                    "cannot select `{name}' from a value of type `{}'",
                    self.type_name(target.ty)
                ),
            );
        };
        let invalid = |this: &Self| {
            error(
                location,
                format!(
                    "invalid swizzle `.{name}' of `{}'",
                    this.type_name(target.ty)
                ),
            )
        };

        let count = name.chars().count();
        if count == 0 || count > 4 {
            return invalid(self);
        }
        let mut pattern = [SwizzleComponent::X; 4];
        let mut letter_set = None;
        for (i, c) in name.chars().enumerate() {
            let Some((component, set)) = SwizzleComponent::from_letter(c) else {
                return invalid(self);
            };
            if *letter_set.get_or_insert(set) != set || component as u32 >= size.count() {
                return invalid(self);
            }
            pattern[i] = component;
        }
        let repeated = (1..count).any(|i| pattern[..i].contains(&pattern[i]));
        let access = target.access.map(|access| match access {
            Access::Writable if repeated => Access::RepeatedSwizzle,
            other => other,
        });

        let Some(ty) = Type::vector_or_scalar(kind, count as u32) else {
            return invalid(self);
        };
        let ty = self.intern(ty);
        let handle = if count == 1 {
            self.emit(Expression::AccessIndex {
                base: target.handle,
                index: pattern[0] as u32,
            })
        } else {
            self.emit(Expression::Swizzle {
                size: count as u8,
                vector: target.handle,
                pattern,
            })
        };
        Ok(Typed { handle, ty, access })
    }

    fn constructor(
        &mut self,
        name: TypeName,
        args: &[Expr],
        location: SourceLocation,
    ) -> LowerResult<Typed> {
        let target = match convert_type(name) {
            Some(ty @ (Type::Scalar(_) | Type::Vector { .. } | Type::Matrix { .. })) => ty,
            _ => return error(location, format!("cannot construct a value of type `{name}'")),
        };
        if args.is_empty() {
            return error(location, format!("`{name}' constructor requires arguments"));
        }
        let ty = self.intern(target);

        let mut values = Vec::with_capacity(args.len());
        let mut counts = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.rvalue(arg)?;
            let Some(count) = self.ty(value.ty).component_count() else {
                return error(
                    arg.location,
                    format!(
                        "cannot use a value of type `{}' in a `{name}' constructor",
                        self.type_name(value.ty)
                    ),
                );
            };
            values.push(value);
            counts.push(count);
        }

        match target {
            Type::Scalar(_) => {
                if values.len() != 1 {
                    return error(
                        location,
                        format!("`{name}' constructor takes exactly one argument"),
                    );
                }
                if values[0].ty == ty {
                    return Ok(values[0]);
                }
            }
            _ => {
                let needed = target.component_count().unwrap_or(0);
                let broadcast = values.len() == 1 && counts[0] == 1;
                let resize = values.len() == 1
                    && matches!(target, Type::Matrix { .. })
                    && matches!(self.ty(values[0].ty), Type::Matrix { .. });
                if !broadcast && !resize {
                    let total: u32 = counts.iter().sum();
                    let before_last: u32 = counts[..counts.len() - 1].iter().sum();
                    if total < needed {
                        return error(
                            location,
                            format!("too few components to construct `{name}'"),
                        );
                    }
                    if before_last >= needed {
                        return error(
                            location,
                            format!("too many arguments to construct `{name}'"),
                        );
                    }
                }
            }
        }

        let components = values.iter().map(|v| v.handle).collect();
        Ok(self.value(Expression::Compose { ty, components }, ty))
    }

    fn no_match(&self, name: &str, types: &[Handle<Type>]) -> String {
        let types: Vec<_> = types.iter().map(|&ty| self.type_name(ty)).collect();
        format!(
            "no matching function for call to `{name}({})'",
            types.join(", ")
        )
    }

    /// Lowers a call of a user or built-in function. Returns `None` for
    /// `void` functions.
    pub(super) fn call(
        &mut self,
        name: &str,
        args: &[Expr],
        location: SourceLocation,
    ) -> LowerResult<Option<Typed>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.rvalue(arg)?);
        }
        let types: Vec<_> = values.iter().map(|v| v.ty).collect();
        let arguments: Vec<_> = values.iter().map(|v| v.handle).collect();

        let user = self.functions.get(name).map(|overloads| {
            overloads
                .iter()
                .copied()
                .find(|&h| self.module.functions[h].parameter_types() == types)
        });
        match user {
            Some(Some(function)) => {
                let result = self.module.functions[function]
                    .result
                    .map(|ty| (self.emit(Expression::CallResult(function)), ty));
                self.push_statement(
                    Statement::Call {
                        function,
                        arguments,
                        result: result.map(|(handle, _)| handle),
                    },
                    location,
                )?;
                return Ok(result.map(|(handle, ty)| Typed {
                    handle,
                    ty,
                    access: None,
                }));
            }
            Some(None) => return error(location, self.no_match(name, &types)),
            None => {}
        }

        let builtin = BuiltinFunction::from_name(name)
            .filter(|&fun| builtins::function_available(fun, self.kind, self.version));
        if let Some(fun) = builtin {
            let arg_types: Vec<Type> = types.iter().map(|&ty| self.ty(ty)).collect();
            let Some(result) = builtins::function_result(fun, &arg_types) else {
                return error(location, self.no_match(name, &types));
            };
            self.record_builtin(fun);
            let ty = self.intern(result);
            return Ok(Some(self.value(Expression::Builtin { fun, arguments }, ty)));
        }

        if self.lookup(name).is_some() {
            return error(location, format!("`{name}' is not a function"));
        }
        error(location, format!("no function with name `{name}'"))
    }

    /// Evaluates `expr` if it is a scalar constant expression.
    ///
    /// Works on the syntax tree, so nothing is emitted.
    pub(super) fn eval_const(&mut self, expr: &Expr) -> Option<Literal> {
        match &expr.kind {
            ExprKind::IntConstant(v) => Some(Literal::Int(*v)),
            ExprKind::FloatConstant(v) => Some(Literal::Float(*v)),
            ExprKind::BoolConstant(v) => Some(Literal::Bool(*v)),
            ExprKind::Identifier(name) => self.lookup(name)?.constant,
            ExprKind::Unary(ast::UnaryOp::Plus, operand) => self
                .eval_const(operand)
                .filter(|lit| lit.kind() != ScalarKind::Bool),
            ExprKind::Unary(ast::UnaryOp::Minus, operand) => {
                UnaryOp::Negate.eval(self.eval_const(operand)?)
            }
            ExprKind::Unary(ast::UnaryOp::Not, operand) => {
                UnaryOp::LogicalNot.eval(self.eval_const(operand)?)
            }
            ExprKind::Binary(op, left, right) => {
                let left = self.eval_const(left)?;
                let right = self.eval_const(right)?;
                convert_binary(*op).eval(left, right)
            }
            ExprKind::Ternary(condition, accept, reject) => match self.eval_const(condition)? {
                Literal::Bool(true) => self.eval_const(accept),
                Literal::Bool(false) => self.eval_const(reject),
                _ => None,
            },
            ExprKind::Call(Callee::Constructor(name), args) if args.len() == 1 => {
                let kind = match name {
                    TypeName::Int => ScalarKind::Int,
                    TypeName::Float => ScalarKind::Float,
                    TypeName::Bool => ScalarKind::Bool,
                    _ => return None,
                };
                Some(self.eval_const(&args[0])?.convert(kind))
            }
            _ => None,
        }
    }
}
