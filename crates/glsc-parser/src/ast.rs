//! Abstract syntax tree.
//!
//! The `Display` implementations print the tree back as normalized GLSL with
//! every compound expression parenthesized; that text is the `--dump-ast`
//! output.

use std::fmt;

use glsc_ir::SourceLocation;

/// A parsed shader: its external declarations in source order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TranslationUnit {
    pub declarations: Vec<ExternalDeclaration>,
}

impl TranslationUnit {
    /// Returns `true` if the shader declares nothing.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// A top-level declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum ExternalDeclaration {
    Variables(Declaration),
    Precision(PrecisionStatement),
    /// `invariant name, ...;` redeclaring existing outputs.
    Invariant {
        names: Vec<String>,
        location: SourceLocation,
    },
    /// A prototype (`body == None`) or a definition.
    Function(FunctionDefinition),
}

// ---------------------------------------------------------------------------
// Types and qualifiers
// ---------------------------------------------------------------------------

/// A built-in type name.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum TypeName {
    Void,
    Bool,
    Int,
    Float,
    Vec(u8),
    BVec(u8),
    IVec(u8),
    Mat(u8),
    Sampler2D,
    SamplerCube,
}

/// A precision qualifier.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Precision {
    High,
    Medium,
    Low,
}

/// A storage qualifier on a declaration.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum StorageQualifier {
    Const,
    Attribute,
    Uniform,
    Varying,
    In,
    Out,
}

/// An interpolation qualifier (GLSL 1.30).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Interpolation {
    Smooth,
    Flat,
    NoPerspective,
}

/// The qualifier list preceding a declaration's type.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TypeQualifiers {
    pub invariant: bool,
    pub interpolation: Option<Interpolation>,
    pub centroid: bool,
    pub storage: Option<StorageQualifier>,
}

impl TypeQualifiers {
    /// Returns `true` if no qualifier was written.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A type with its optional precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TypeSpecifier {
    pub precision: Option<Precision>,
    pub name: TypeName,
}

/// A qualified type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FullySpecifiedType {
    pub qualifiers: TypeQualifiers,
    pub ty: TypeSpecifier,
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// One name in a declaration list.
#[derive(Clone, Debug, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub array_size: Option<Expr>,
    pub initializer: Option<Expr>,
    pub location: SourceLocation,
}

/// `qualifiers type name [= init], ...;`
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub ty: FullySpecifiedType,
    pub declarators: Vec<Declarator>,
    pub location: SourceLocation,
}

/// `precision highp float;`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrecisionStatement {
    pub precision: Precision,
    pub ty: TypeName,
    pub location: SourceLocation,
}

/// Direction qualifier of a function parameter.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub enum ParameterDirection {
    #[default]
    In,
    Out,
    InOut,
}

/// A function parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub constant: bool,
    pub direction: ParameterDirection,
    /// Whether a direction keyword was written.
    pub explicit_direction: bool,
    pub ty: TypeSpecifier,
    pub name: Option<String>,
    pub array_size: Option<Expr>,
    pub location: SourceLocation,
}

/// Name and signature of a function.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionPrototype {
    pub return_type: FullySpecifiedType,
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub location: SourceLocation,
}

/// A function prototype, with a body if it is a definition.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDefinition {
    pub prototype: FunctionPrototype,
    pub body: Option<Vec<Statement>>,
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// A statement with its location.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub location: SourceLocation,
}

/// Statement variants.
#[derive(Clone, Debug, PartialEq)]
pub enum StatementKind {
    Declaration(Declaration),
    Precision(PrecisionStatement),
    /// An expression statement; `None` is the empty statement `;`.
    Expression(Option<Expr>),
    Compound(Vec<Statement>),
    If {
        condition: Expr,
        accept: Box<Statement>,
        reject: Option<Box<Statement>>,
    },
    While {
        condition: Expr,
        body: Box<Statement>,
    },
    DoWhile {
        body: Box<Statement>,
        condition: Expr,
    },
    For {
        init: Option<Box<Statement>>,
        condition: Option<Expr>,
        step: Option<Expr>,
        body: Box<Statement>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Discard,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Prefix operators.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    PreIncrement,
    PreDecrement,
}

/// Postfix `++`/`--`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

/// Infix operators.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
    Xor,
}

/// Assignment operators.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

/// What a call expression calls.
#[derive(Clone, Debug, PartialEq)]
pub enum Callee {
    /// A user or built-in function.
    Function(String),
    /// A type constructor such as `vec4(...)`.
    Constructor(TypeName),
}

/// An expression with its location.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: SourceLocation,
}

/// Expression variants.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Identifier(String),
    IntConstant(i32),
    FloatConstant(f32),
    BoolConstant(bool),
    Unary(UnaryOp, Box<Expr>),
    Postfix(PostfixOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Assign(AssignOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Comma(Box<Expr>, Box<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Field(Box<Expr>, String),
    Call(Callee, Vec<Expr>),
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Vec(n) => write!(f, "vec{n}"),
            Self::BVec(n) => write!(f, "bvec{n}"),
            Self::IVec(n) => write!(f, "ivec{n}"),
            Self::Mat(n) => write!(f, "mat{n}"),
            Self::Sampler2D => f.write_str("sampler2D"),
            Self::SamplerCube => f.write_str("samplerCube"),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "highp",
            Self::Medium => "mediump",
            Self::Low => "lowp",
        })
    }
}

impl fmt::Display for StorageQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Const => "const",
            Self::Attribute => "attribute",
            Self::Uniform => "uniform",
            Self::Varying => "varying",
            Self::In => "in",
            Self::Out => "out",
        })
    }
}

impl fmt::Display for TypeQualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.invariant {
            f.write_str("invariant ")?;
        }
        match self.interpolation {
            Some(Interpolation::Smooth) => f.write_str("smooth ")?,
            Some(Interpolation::Flat) => f.write_str("flat ")?,
            Some(Interpolation::NoPerspective) => f.write_str("noperspective ")?,
            None => {}
        }
        if self.centroid {
            f.write_str("centroid ")?;
        }
        if let Some(storage) = self.storage {
            write!(f, "{storage} ")?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(precision) = self.precision {
            write!(f, "{precision} ")?;
        }
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for FullySpecifiedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.qualifiers, self.ty)
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)?;
        for (i, decl) in self.declarators.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            f.write_str(&decl.name)?;
            if let Some(size) = &decl.array_size {
                write!(f, "[{size}]")?;
            }
            if let Some(init) = &decl.initializer {
                write!(f, " = {init}")?;
            }
        }
        f.write_str(";")
    }
}

impl fmt::Display for PrecisionStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "precision {} {};", self.precision, self.ty)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constant {
            f.write_str("const ")?;
        }
        if self.explicit_direction {
            f.write_str(match self.direction {
                ParameterDirection::In => "in ",
                ParameterDirection::Out => "out ",
                ParameterDirection::InOut => "inout ",
            })?;
        }
        write!(f, "{}", self.ty)?;
        if let Some(name) = &self.name {
            write!(f, " {name}")?;
        }
        if let Some(size) = &self.array_size {
            write!(f, "[{size}]")?;
        }
        Ok(())
    }
}

impl fmt::Display for FunctionPrototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

fn write_indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str("   ")?;
    }
    Ok(())
}

fn write_statement(f: &mut fmt::Formatter<'_>, stmt: &Statement, depth: usize) -> fmt::Result {
    write_indent(f, depth)?;
    match &stmt.kind {
        StatementKind::Declaration(decl) => writeln!(f, "{decl}"),
        StatementKind::Precision(p) => writeln!(f, "{p}"),
        StatementKind::Expression(Some(e)) => writeln!(f, "{e};"),
        StatementKind::Expression(None) => writeln!(f, ";"),
        StatementKind::Compound(body) => {
            writeln!(f, "{{")?;
            for s in body {
                write_statement(f, s, depth + 1)?;
            }
            write_indent(f, depth)?;
            writeln!(f, "}}")
        }
        StatementKind::If {
            condition,
            accept,
            reject,
        } => {
            writeln!(f, "if ({condition})")?;
            write_statement(f, accept, depth + 1)?;
            if let Some(reject) = reject {
                write_indent(f, depth)?;
                writeln!(f, "else")?;
                write_statement(f, reject, depth + 1)?;
            }
            Ok(())
        }
        StatementKind::While { condition, body } => {
            writeln!(f, "while ({condition})")?;
            write_statement(f, body, depth + 1)
        }
        StatementKind::DoWhile { body, condition } => {
            writeln!(f, "do")?;
            write_statement(f, body, depth + 1)?;
            write_indent(f, depth)?;
            writeln!(f, "while ({condition});")
        }
        StatementKind::For {
            init,
            condition,
            step,
            body,
        } => {
            f.write_str("for (")?;
            match init.as_deref().map(|s| &s.kind) {
                Some(StatementKind::Declaration(decl)) => write!(f, "{decl}")?,
                Some(StatementKind::Expression(Some(e))) => write!(f, "{e};")?,
                _ => f.write_str(";")?,
            }
            if let Some(c) = condition {
                write!(f, " {c}")?;
            }
            f.write_str(";")?;
            if let Some(s) = step {
                write!(f, " {s}")?;
            }
            writeln!(f, ")")?;
            write_statement(f, body, depth + 1)
        }
        StatementKind::Return(Some(e)) => writeln!(f, "return {e};"),
        StatementKind::Return(None) => writeln!(f, "return;"),
        StatementKind::Break => writeln!(f, "break;"),
        StatementKind::Continue => writeln!(f, "continue;"),
        StatementKind::Discard => writeln!(f, "discard;"),
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_statement(f, self, 0)
    }
}

impl fmt::Display for ExternalDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variables(decl) => writeln!(f, "{decl}"),
            Self::Precision(p) => writeln!(f, "{p}"),
            Self::Invariant { names, .. } => writeln!(f, "invariant {};", names.join(", ")),
            Self::Function(def) => match &def.body {
                None => writeln!(f, "{};", def.prototype),
                Some(body) => {
                    writeln!(f, "{}", def.prototype)?;
                    writeln!(f, "{{")?;
                    for stmt in body {
                        write_statement(f, stmt, 1)?;
                    }
                    writeln!(f, "}}")
                }
            },
        }
    }
}

impl fmt::Display for TranslationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decl in &self.declarations {
            write!(f, "{decl}")?;
        }
        Ok(())
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Not => "!",
            Self::PreIncrement => "++",
            Self::PreDecrement => "--",
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::And => "&&",
            Self::Or => "||",
            Self::Xor => "^^",
        })
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Assign => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::Div => "/=",
        })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Identifier(name) => f.write_str(name),
            ExprKind::IntConstant(v) => write!(f, "{v}"),
            ExprKind::FloatConstant(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{v:.1}"),
            ExprKind::FloatConstant(v) => write!(f, "{v}"),
            ExprKind::BoolConstant(v) => write!(f, "{v}"),
            ExprKind::Unary(op, e) => write!(f, "({op}{e})"),
            ExprKind::Postfix(PostfixOp::Increment, e) => write!(f, "({e}++)"),
            ExprKind::Postfix(PostfixOp::Decrement, e) => write!(f, "({e}--)"),
            ExprKind::Binary(op, l, r) => write!(f, "({l} {op} {r})"),
            ExprKind::Assign(op, l, r) => write!(f, "({l} {op} {r})"),
            ExprKind::Ternary(c, a, b) => write!(f, "({c} ? {a} : {b})"),
            ExprKind::Comma(a, b) => write!(f, "({a}, {b})"),
            ExprKind::Index(base, index) => write!(f, "{base}[{index}]"),
            ExprKind::Field(base, field) => write!(f, "{base}.{field}"),
            ExprKind::Call(callee, args) => {
                match callee {
                    Callee::Function(name) => f.write_str(name)?,
                    Callee::Constructor(ty) => write!(f, "{ty}")?,
                }
                f.write_str("(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}
