//! Display implementations and the text dump used by `--dump-hir` and
//! `--dump-lir`.

use std::fmt::{self, Write as _};

use crate::Module;
use crate::arena::{Arena, Handle, UniqueArena};
use crate::expr::{BinaryOp, Expression, Literal, SwizzleComponent, UnaryOp};
use crate::func::Function;
use crate::stmt::Statement;
use crate::types::{SamplerDim, ScalarKind, Type};

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{v:.1}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Negate => "-",
            Self::LogicalNot => "!",
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::LogicalXor => "^^",
        })
    }
}

impl fmt::Display for SwizzleComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::W => "w",
        })
    }
}

/// Formats a type with its GLSL spelling (`vec3`, `mat4`, `float[4]`).
pub fn format_type(ty: &Type, types: &UniqueArena<Type>) -> String {
    let prefix = |kind: ScalarKind| match kind {
        ScalarKind::Bool => "b",
        ScalarKind::Int => "i",
        ScalarKind::Float => "",
    };
    match *ty {
        Type::Scalar(ScalarKind::Bool) => "bool".into(),
        Type::Scalar(ScalarKind::Int) => "int".into(),
        Type::Scalar(ScalarKind::Float) => "float".into(),
        Type::Vector { size, kind } => format!("{}vec{}", prefix(kind), size.count()),
        Type::Matrix { size } => format!("mat{}", size.count()),
        Type::Sampler(SamplerDim::D2) => "sampler2D".into(),
        Type::Sampler(SamplerDim::Cube) => "samplerCube".into(),
        Type::Array { base, size } => format!("{}[{size}]", format_type(&types[base], types)),
    }
}

fn format_expr(expr: &Expression, module: &Module, func: Option<&Function>) -> String {
    let list = |items: &[Handle<Expression>]| {
        items
            .iter()
            .map(|h| format!("{h:?}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    match expr {
        Expression::Literal(lit) => format!("{lit}"),
        Expression::Compose { ty, components } => format!(
            "{}({})",
            format_type(&module.types[*ty], &module.types),
            list(components)
        ),
        Expression::FunctionArgument(i) => match func.and_then(|f| f.arguments.get(*i as usize)) {
            Some(arg) => format!("arg{i} {}", arg.name.as_deref().unwrap_or("_")),
            None => format!("arg{i}"),
        },
        Expression::GlobalVariable(h) => match module.global_variables.get(*h) {
            Some(var) => format!("&{}", var.name),
            None => format!("&global{h:?}"),
        },
        Expression::LocalVariable(h) => {
            match func.and_then(|f| f.local_variables.get(*h)).and_then(|l| l.name.as_deref()) {
                Some(name) => format!("&{name}"),
                None => format!("&local{h:?}"),
            }
        }
        Expression::Load { pointer } => format!("load {pointer:?}"),
        Expression::Access { base, index } => format!("{base:?}[{index:?}]"),
        Expression::AccessIndex { base, index } => format!("{base:?}[{index}]"),
        Expression::Swizzle {
            size,
            vector,
            pattern,
        } => {
            let comps: String = pattern[..*size as usize]
                .iter()
                .map(|c| c.to_string())
                .collect();
            format!("{vector:?}.{comps}")
        }
        Expression::Unary { op, expr } => format!("{op}{expr:?}"),
        Expression::Binary { op, left, right } => format!("{left:?} {op} {right:?}"),
        Expression::Select {
            condition,
            accept,
            reject,
        } => format!("{condition:?} ? {accept:?} : {reject:?}"),
        Expression::Builtin { fun, arguments } => format!("{}({})", fun.name(), list(arguments)),
        Expression::CallResult(f) => match module.functions.get(*f) {
            Some(callee) => format!("result of {}", callee.name),
            None => format!("result of function{f:?}"),
        },
    }
}

fn write_block(out: &mut String, block: &[Statement], module: &Module, indent: usize) {
    for stmt in block {
        write_stmt(out, stmt, module, indent);
    }
}

fn write_stmt(out: &mut String, stmt: &Statement, module: &Module, indent: usize) {
    let pad = " ".repeat(indent);
    match stmt {
        Statement::Store { pointer, value } => {
            let _ = writeln!(out, "{pad}store {pointer:?} = {value:?}");
        }
        Statement::If {
            condition,
            accept,
            reject,
        } => {
            let _ = writeln!(out, "{pad}if ({condition:?}) {{");
            write_block(out, accept, module, indent + 4);
            if !reject.is_empty() {
                let _ = writeln!(out, "{pad}}} else {{");
                write_block(out, reject, module, indent + 4);
            }
            let _ = writeln!(out, "{pad}}}");
        }
        Statement::Loop {
            body,
            continuing,
            break_if,
        } => {
            let _ = writeln!(out, "{pad}loop {{");
            write_block(out, body, module, indent + 4);
            if !continuing.is_empty() || break_if.is_some() {
                let _ = writeln!(out, "{pad}  continuing {{");
                write_block(out, continuing, module, indent + 8);
                if let Some(cond) = break_if {
                    let _ = writeln!(out, "{pad}        break if {cond:?}");
                }
                let _ = writeln!(out, "{pad}  }}");
            }
            let _ = writeln!(out, "{pad}}}");
        }
        Statement::Call {
            function,
            arguments,
            result,
        } => {
            let name = module
                .functions
                .get(*function)
                .map_or("<unknown>", |f| f.name.as_str());
            let args: Vec<_> = arguments.iter().map(|h| format!("{h:?}")).collect();
            let res = result.map(|r| format!(" -> {r:?}")).unwrap_or_default();
            let _ = writeln!(out, "{pad}call {name}({}){res}", args.join(", "));
        }
        Statement::Break => {
            let _ = writeln!(out, "{pad}break");
        }
        Statement::Continue => {
            let _ = writeln!(out, "{pad}continue");
        }
        Statement::Return { value: Some(v) } => {
            let _ = writeln!(out, "{pad}return {v:?}");
        }
        Statement::Return { value: None } => {
            let _ = writeln!(out, "{pad}return");
        }
        Statement::Kill => {
            let _ = writeln!(out, "{pad}discard");
        }
    }
}

fn write_expressions(
    out: &mut String,
    exprs: &Arena<Expression>,
    module: &Module,
    func: Option<&Function>,
    indent: usize,
) {
    let pad = " ".repeat(indent);
    for (handle, expr) in exprs.iter() {
        let _ = writeln!(out, "{pad}{handle:?} {}", format_expr(expr, module, func));
    }
}

fn dump_function(out: &mut String, func: &Function, module: &Module) {
    let ty = |h| format_type(&module.types[h], &module.types);
    let params: Vec<_> = func
        .arguments
        .iter()
        .map(|a| format!("{} {}", ty(a.ty), a.name.as_deref().unwrap_or("_")))
        .collect();
    let ret = func.result.map_or_else(|| "void".to_string(), ty);
    let _ = write!(out, "  {ret} {}({})", func.name, params.join(", "));
    if !func.defined {
        out.push_str(";\n");
        return;
    }
    out.push_str(" {\n");

    if !func.local_variables.is_empty() {
        out.push_str("    locals:\n");
        for (handle, local) in func.local_variables.iter() {
            let _ = writeln!(
                out,
                "      {handle:?} {} {}",
                ty(local.ty),
                local.name.as_deref().unwrap_or("_")
            );
        }
    }
    if !func.expressions.is_empty() {
        out.push_str("    expressions:\n");
        write_expressions(out, &func.expressions, module, Some(func), 6);
    }
    out.push_str("    body:\n");
    write_block(out, &func.body, module, 6);
    out.push_str("  }\n");
}

/// Renders a whole module as indented text.
pub fn dump_module(module: &Module) -> String {
    let mut out = String::new();

    if !module.global_variables.is_empty() {
        out.push_str("globals:\n");
        for (handle, var) in module.global_variables.iter() {
            let _ = write!(
                out,
                "  {handle:?} {}{} {} {}",
                if var.invariant { "invariant " } else { "" },
                var.space,
                format_type(&module.types[var.ty], &module.types),
                var.name
            );
            if let Some(init) = var.init {
                let _ = write!(out, " = {init:?}");
            }
            out.push('\n');
        }
    }

    if !module.global_expressions.is_empty() {
        out.push_str("global expressions:\n");
        write_expressions(&mut out, &module.global_expressions, module, None, 2);
    }

    if !module.functions.is_empty() {
        out.push_str("functions:\n");
        for (_, func) in module.functions.iter() {
            dump_function(&mut out, func, module);
        }
    }

    out
}
