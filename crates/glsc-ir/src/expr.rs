//! Expressions.
//!
//! Expressions are side-effect free. An expression is evaluated at the
//! statement that (transitively) references it, so a [`Expression::Load`]
//! observes memory as it is at that statement.

use crate::arena::Handle;
use crate::func::{Function, LocalVariable};
use crate::global::GlobalVariable;
use crate::types::{ScalarKind, Type};

/// A literal constant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i32),
    Float(f32),
}

impl Literal {
    /// The component kind of this literal.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::Int(_) => ScalarKind::Int,
            Self::Float(_) => ScalarKind::Float,
        }
    }
}

/// A unary operator.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
}

/// A binary operator.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
}

impl BinaryOp {
    /// Returns `true` for `<`, `<=`, `>`, `>=`.
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            Self::Less | Self::LessEqual | Self::Greater | Self::GreaterEqual
        )
    }

    /// Returns `true` for `==` and `!=`.
    pub fn is_equality(self) -> bool {
        matches!(self, Self::Equal | Self::NotEqual)
    }

    /// Returns `true` for `&&`, `||`, `^^`.
    pub fn is_logical(self) -> bool {
        matches!(self, Self::LogicalAnd | Self::LogicalOr | Self::LogicalXor)
    }

    /// Evaluates the operator on two scalar literals of the same kind.
    ///
    /// Returns `None` for mismatched kinds, operators that do not apply to
    /// the kind, and integer division by zero.
    pub fn eval(self, left: Literal, right: Literal) -> Option<Literal> {
        use Literal as L;
        Some(match (left, right) {
            (L::Int(a), L::Int(b)) => match self {
                Self::Add => L::Int(a.wrapping_add(b)),
                Self::Subtract => L::Int(a.wrapping_sub(b)),
                Self::Multiply => L::Int(a.wrapping_mul(b)),
                Self::Divide => L::Int(a.checked_div(b)?),
                Self::Equal => L::Bool(a == b),
                Self::NotEqual => L::Bool(a != b),
                Self::Less => L::Bool(a < b),
                Self::LessEqual => L::Bool(a <= b),
                Self::Greater => L::Bool(a > b),
                Self::GreaterEqual => L::Bool(a >= b),
                _ => return None,
            },
            (L::Float(a), L::Float(b)) => match self {
                Self::Add => L::Float(a + b),
                Self::Subtract => L::Float(a - b),
                Self::Multiply => L::Float(a * b),
                Self::Divide => L::Float(a / b),
                Self::Equal => L::Bool(a == b),
                Self::NotEqual => L::Bool(a != b),
                Self::Less => L::Bool(a < b),
                Self::LessEqual => L::Bool(a <= b),
                Self::Greater => L::Bool(a > b),
                Self::GreaterEqual => L::Bool(a >= b),
                _ => return None,
            },
            (L::Bool(a), L::Bool(b)) => match self {
                Self::Equal => L::Bool(a == b),
                Self::NotEqual => L::Bool(a != b),
                Self::LogicalAnd => L::Bool(a && b),
                Self::LogicalOr => L::Bool(a || b),
                Self::LogicalXor => L::Bool(a != b),
                _ => return None,
            },
            _ => return None,
        })
    }
}

impl UnaryOp {
    /// Evaluates the operator on a scalar literal.
    pub fn eval(self, operand: Literal) -> Option<Literal> {
        match (self, operand) {
            (Self::Negate, Literal::Int(v)) => Some(Literal::Int(v.wrapping_neg())),
            (Self::Negate, Literal::Float(v)) => Some(Literal::Float(-v)),
            (Self::LogicalNot, Literal::Bool(v)) => Some(Literal::Bool(!v)),
            _ => None,
        }
    }
}

impl Literal {
    /// Converts the literal to another scalar kind, as a scalar
    /// constructor (`float(i)`, `int(f)`, `bool(x)`) does.
    pub fn convert(self, kind: ScalarKind) -> Literal {
        match (self, kind) {
            (_, ScalarKind::Bool) => Literal::Bool(match self {
                Literal::Bool(v) => v,
                Literal::Int(v) => v != 0,
                Literal::Float(v) => v != 0.0,
            }),
            (_, ScalarKind::Int) => Literal::Int(match self {
                Literal::Bool(v) => i32::from(v),
                Literal::Int(v) => v,
                Literal::Float(v) => v as i32,
            }),
            (_, ScalarKind::Float) => Literal::Float(match self {
                Literal::Bool(v) => f32::from(u8::from(v)),
                Literal::Int(v) => v as f32,
                Literal::Float(v) => v,
            }),
        }
    }
}

/// A vector component selector.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum SwizzleComponent {
    X = 0,
    Y = 1,
    Z = 2,
    W = 3,
}

impl SwizzleComponent {
    /// The component addressed by a swizzle letter from any of the
    /// `xyzw`, `rgba`, `stpq` sets, together with the set index.
    pub fn from_letter(c: char) -> Option<(Self, u8)> {
        for (set, letters) in ["xyzw", "rgba", "stpq"].into_iter().enumerate() {
            if let Some(i) = letters.find(c) {
                return Some(([Self::X, Self::Y, Self::Z, Self::W][i], set as u8));
            }
        }
        None
    }
}

macro_rules! builtin_functions {
    ($($variant:ident => $name:literal,)*) => {
        /// A built-in function of the shading language.
        #[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
        pub enum BuiltinFunction {
            $($variant,)*
        }

        impl BuiltinFunction {
            /// Every built-in function.
            pub const ALL: &'static [BuiltinFunction] = &[$(Self::$variant,)*];

            /// The source-level name.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Looks a built-in up by its source-level name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

builtin_functions! {
    Radians => "radians",
    Degrees => "degrees",
    Sin => "sin",
    Cos => "cos",
    Tan => "tan",
    Asin => "asin",
    Acos => "acos",
    Atan => "atan",
    Pow => "pow",
    Exp => "exp",
    Log => "log",
    Exp2 => "exp2",
    Log2 => "log2",
    Sqrt => "sqrt",
    InverseSqrt => "inversesqrt",
    Abs => "abs",
    Sign => "sign",
    Floor => "floor",
    Ceil => "ceil",
    Fract => "fract",
    Mod => "mod",
    Min => "min",
    Max => "max",
    Clamp => "clamp",
    Mix => "mix",
    Step => "step",
    SmoothStep => "smoothstep",
    Length => "length",
    Distance => "distance",
    Dot => "dot",
    Cross => "cross",
    Normalize => "normalize",
    FaceForward => "faceforward",
    Reflect => "reflect",
    Refract => "refract",
    MatrixCompMult => "matrixCompMult",
    LessThan => "lessThan",
    LessThanEqual => "lessThanEqual",
    GreaterThan => "greaterThan",
    GreaterThanEqual => "greaterThanEqual",
    Equal => "equal",
    NotEqual => "notEqual",
    Any => "any",
    All => "all",
    Not => "not",
    Texture2D => "texture2D",
    Texture2DProj => "texture2DProj",
    Texture2DLod => "texture2DLod",
    TextureCube => "textureCube",
    TextureCubeLod => "textureCubeLod",
    DFdx => "dFdx",
    DFdy => "dFdy",
    Fwidth => "fwidth",
}

/// An expression node.
#[derive(Clone, Debug)]
pub enum Expression {
    /// A literal constant.
    Literal(Literal),
    /// A constructor: vector, matrix, scalar conversion, or array.
    Compose {
        ty: Handle<Type>,
        components: Vec<Handle<Expression>>,
    },
    /// The value of the n-th argument of the enclosing function.
    FunctionArgument(u32),
    /// Pointer to a module-scope variable.
    GlobalVariable(Handle<GlobalVariable>),
    /// Pointer to a function-local variable.
    LocalVariable(Handle<LocalVariable>),
    /// Read through a pointer.
    Load { pointer: Handle<Expression> },
    /// Dynamic array/vector/matrix element of a value or pointer.
    Access {
        base: Handle<Expression>,
        index: Handle<Expression>,
    },
    /// Constant array/vector/matrix element of a value or pointer.
    AccessIndex { base: Handle<Expression>, index: u32 },
    /// Component selection of a vector value or pointer.
    Swizzle {
        size: u8,
        vector: Handle<Expression>,
        pattern: [SwizzleComponent; 4],
    },
    /// Unary operation.
    Unary {
        op: UnaryOp,
        expr: Handle<Expression>,
    },
    /// Binary operation.
    Binary {
        op: BinaryOp,
        left: Handle<Expression>,
        right: Handle<Expression>,
    },
    /// `condition ? accept : reject`.
    Select {
        condition: Handle<Expression>,
        accept: Handle<Expression>,
        reject: Handle<Expression>,
    },
    /// Call of a built-in function.
    Builtin {
        fun: BuiltinFunction,
        arguments: Vec<Handle<Expression>>,
    },
    /// The value returned by a [`Statement::Call`](crate::Statement::Call).
    CallResult(Handle<Function>),
}

impl Expression {
    /// Expression handles directly referenced by this expression.
    pub fn operands(&self) -> Vec<Handle<Expression>> {
        match self {
            Self::Literal(_)
            | Self::FunctionArgument(_)
            | Self::GlobalVariable(_)
            | Self::LocalVariable(_)
            | Self::CallResult(_) => vec![],
            Self::Load { pointer } => vec![*pointer],
            Self::AccessIndex { base, .. } => vec![*base],
            Self::Swizzle { vector, .. } => vec![*vector],
            Self::Unary { expr, .. } => vec![*expr],
            Self::Access { base, index } => vec![*base, *index],
            Self::Binary { left, right, .. } => vec![*left, *right],
            Self::Select {
                condition,
                accept,
                reject,
            } => vec![*condition, *accept, *reject],
            Self::Compose { components, .. } => components.clone(),
            Self::Builtin { arguments, .. } => arguments.clone(),
        }
    }

    /// Returns the literal if this is a [`Expression::Literal`].
    pub fn as_literal(&self) -> Option<Literal> {
        match *self {
            Self::Literal(lit) => Some(lit),
            _ => None,
        }
    }
}
