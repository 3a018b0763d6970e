//! Semantic analysis: lowering a [`TranslationUnit`] into an IR [`Module`].
//!
//! Lowering resolves names and types, enforces the qualifier and stage
//! rules of the shading language, and materializes the `gl_*` variables a
//! shader actually references. Errors are written to the [`InfoLog`];
//! lowering recovers at declaration and statement granularity so that one
//! shader can report several independent problems.

mod builtins;
mod expr;
mod stmt;

use std::collections::HashMap;

use glsc_context::{CapabilityContext, ShaderKind, Version};
use glsc_ir::{
    AddressSpace, Block, BuiltinFunction, Expression, Function, FunctionArgument,
    GlobalVariable, Handle, InfoLog, Literal, LocalVariable, Module, ScalarKind, SourceLocation,
    Statement, Type, VectorSize, format_type,
};

use crate::ast::{
    Declaration, Declarator, Expr, ExternalDeclaration, FunctionDefinition, Parameter,
    ParameterDirection, PrecisionStatement, StorageQualifier, TranslationUnit, TypeName,
    TypeQualifiers, TypeSpecifier,
};

/// The result of lowering one shader.
#[derive(Clone, Debug, Default)]
pub struct Lowered {
    /// The lowered shader.
    pub module: Module,
    /// Names of the built-in functions the shader calls, in order of first
    /// use and without duplicates.
    pub builtins: Vec<String>,
}

/// Lowers `unit`, a `kind` shader written against `version`.
///
/// The returned module is only meaningful if no error was added to `log`.
pub fn lower(
    unit: &TranslationUnit,
    ctx: &CapabilityContext,
    kind: ShaderKind,
    version: Version,
    log: &mut InfoLog,
) -> Lowered {
    if kind == ShaderKind::Geometry && version.es {
        log.error(None, format!("geometry shaders are not supported in {version}"));
        return Lowered::default();
    }

    let mut lowerer = Lowerer::new(ctx, kind, version, log);
    for declaration in &unit.declarations {
        if let Err(e) = lowerer.external_declaration(declaration) {
            lowerer.report(e);
        }
    }
    lowerer.finish()
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A semantic error, reported at the smallest enclosing declaration or
/// statement.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct LowerError {
    location: SourceLocation,
    message: String,
}

type LowerResult<T> = Result<T, LowerError>;

fn error<T>(location: SourceLocation, message: impl Into<String>) -> LowerResult<T> {
    Err(LowerError {
        location,
        message: message.into(),
    })
}

// ---------------------------------------------------------------------------
// Symbols
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Var {
    Global(Handle<GlobalVariable>),
    Local(Handle<LocalVariable>),
}

#[derive(Clone, Copy, Debug)]
struct Symbol {
    var: Var,
    ty: Handle<Type>,
    read_only: bool,
    /// Folded value of a scalar `const`.
    constant: Option<Literal>,
}

#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<String, Symbol>,
    /// A `precision ... float;` statement is in effect.
    float_precision: bool,
}

fn convert_type(name: TypeName) -> Option<Type> {
    let vector = |n: u8, kind| {
        VectorSize::from_count(u32::from(n)).map(|size| Type::Vector { size, kind })
    };
    match name {
        TypeName::Void => None,
        TypeName::Bool => Some(Type::BOOL),
        TypeName::Int => Some(Type::INT),
        TypeName::Float => Some(Type::FLOAT),
        TypeName::Vec(n) => vector(n, ScalarKind::Float),
        TypeName::BVec(n) => vector(n, ScalarKind::Bool),
        TypeName::IVec(n) => vector(n, ScalarKind::Int),
        TypeName::Mat(n) => {
            VectorSize::from_count(u32::from(n)).map(|size| Type::Matrix { size })
        }
        TypeName::Sampler2D => Some(Type::Sampler(glsc_ir::SamplerDim::D2)),
        TypeName::SamplerCube => Some(Type::Sampler(glsc_ir::SamplerDim::Cube)),
    }
}

// ---------------------------------------------------------------------------
// Lowerer
// ---------------------------------------------------------------------------

struct Lowerer<'a> {
    ctx: &'a CapabilityContext,
    kind: ShaderKind,
    version: Version,
    log: &'a mut InfoLog,
    module: Module,
    globals: HashMap<String, Symbol>,
    functions: HashMap<String, Vec<Handle<Function>>>,
    builtins: Vec<String>,
    global_float_precision: bool,

    // State of the function being defined.
    function: Option<Function>,
    scopes: Vec<Scope>,
    blocks: Vec<Block>,
    loop_depth: u32,
}

impl<'a> Lowerer<'a> {
    fn new(
        ctx: &'a CapabilityContext,
        kind: ShaderKind,
        version: Version,
        log: &'a mut InfoLog,
    ) -> Self {
        Self {
            ctx,
            kind,
            version,
            log,
            module: Module::default(),
            globals: HashMap::new(),
            functions: HashMap::new(),
            builtins: Vec::new(),
            // ES fragment shaders have no default float precision.
            global_float_precision: !(version.es && kind == ShaderKind::Fragment),
            function: None,
            scopes: Vec::new(),
            blocks: Vec::new(),
            loop_depth: 0,
        }
    }

    fn report(&mut self, e: LowerError) {
        log::debug!("{}:{}: {}", e.location.line, e.location.column, e.message);
        self.log.error(Some(e.location), e.message);
    }

    fn finish(mut self) -> Lowered {
        if self.kind == ShaderKind::Fragment {
            let color = self.module.find_global("gl_FragColor");
            let data = self.module.find_global("gl_FragData");
            if let (Some(color), Some(data)) = (color, data) {
                if self.module.writes_global(color) && self.module.writes_global(data) {
                    self.log.error(
                        None,
                        "fragment shader writes to both `gl_FragColor' and `gl_FragData'",
                    );
                }
            }
        }
        Lowered {
            module: self.module,
            builtins: self.builtins,
        }
    }

    // -- types -------------------------------------------------------------

    fn intern(&mut self, ty: Type) -> Handle<Type> {
        self.module.types.insert(ty)
    }

    fn ty(&self, handle: Handle<Type>) -> Type {
        self.module.types[handle]
    }

    fn type_name(&self, handle: Handle<Type>) -> String {
        format_type(&self.module.types[handle], &self.module.types)
    }

    /// Element type of an array, or the type itself.
    fn innermost(&self, handle: Handle<Type>) -> Type {
        match self.ty(handle) {
            Type::Array { base, .. } => self.ty(base),
            other => other,
        }
    }

    /// Resolves a (possibly array) variable type. `void` is rejected.
    fn resolve_type(
        &mut self,
        spec: &TypeSpecifier,
        array_size: Option<&Expr>,
        location: SourceLocation,
    ) -> LowerResult<Handle<Type>> {
        let Some(base) = convert_type(spec.name) else {
            return error(location, format!("`{}' is not a valid variable type", spec.name));
        };
        let base = self.intern(base);
        match array_size {
            None => Ok(base),
            Some(size) => {
                let size = self.array_length(size)?;
                Ok(self.intern(Type::Array { base, size }))
            }
        }
    }

    fn array_length(&mut self, expr: &Expr) -> LowerResult<u32> {
        match self.eval_const(expr) {
            Some(Literal::Int(n)) if n > 0 => Ok(n.unsigned_abs()),
            Some(Literal::Int(_)) => error(expr.location, "array size must be positive"),
            _ => error(
                expr.location,
                "array size must be a constant integer expression",
            ),
        }
    }

    fn float_precision_in_scope(&self) -> bool {
        self.global_float_precision || self.scopes.iter().any(|s| s.float_precision)
    }

    /// ES fragment shaders must give every float-based declaration a
    /// precision, explicitly or through a default.
    fn check_precision(
        &self,
        spec: &TypeSpecifier,
        ty: Handle<Type>,
        location: SourceLocation,
    ) -> LowerResult<()> {
        if spec.precision.is_none()
            && self.innermost(ty).is_float_based()
            && !self.float_precision_in_scope()
        {
            return error(
                location,
                format!(
                    "No precision specified in this scope for type `{}'",
                    self.type_name(ty)
                ),
            );
        }
        Ok(())
    }

    fn precision_statement(&mut self, stmt: &PrecisionStatement) -> LowerResult<()> {
        match stmt.ty {
            TypeName::Float => {
                match self.scopes.last_mut() {
                    Some(scope) => scope.float_precision = true,
                    None => self.global_float_precision = true,
                }
                Ok(())
            }
            TypeName::Int | TypeName::Sampler2D | TypeName::SamplerCube => Ok(()),
            other => error(
                stmt.location,
                format!("default precision cannot be declared for type `{other}'"),
            ),
        }
    }

    // -- emission ----------------------------------------------------------

    /// Appends an expression to the arena of the current context: the
    /// function being defined, or the global initializer arena.
    fn emit(&mut self, expr: Expression) -> Handle<Expression> {
        match self.function.as_mut() {
            Some(function) => function.expressions.append(expr),
            None => self.module.global_expressions.append(expr),
        }
    }

    fn push_statement(&mut self, stmt: Statement, location: SourceLocation) -> LowerResult<()> {
        match self.blocks.last_mut() {
            Some(block) => {
                block.push(stmt);
                Ok(())
            }
            None => error(location, "global initializers must not have side effects"),
        }
    }

    fn add_local(
        &mut self,
        name: Option<String>,
        ty: Handle<Type>,
        location: SourceLocation,
    ) -> LowerResult<Handle<LocalVariable>> {
        match self.function.as_mut() {
            Some(function) => Ok(function.local_variables.append(LocalVariable { name, ty })),
            None => error(location, "global initializers must not have side effects"),
        }
    }

    /// Runs `f` with a fresh statement block and returns the block, which
    /// is popped even if `f` fails.
    fn in_block<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> LowerResult<R>,
    ) -> LowerResult<(Block, R)> {
        self.blocks.push(Vec::new());
        let result = f(self);
        let block = self.blocks.pop().unwrap_or_default();
        result.map(|value| (block, value))
    }

    fn with_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scopes.push(Scope::default());
        let result = f(self);
        self.scopes.pop();
        result
    }

    // -- names -------------------------------------------------------------

    fn lookup(&mut self, name: &str) -> Option<Symbol> {
        for scope in self.scopes.iter().rev() {
            if let Some(symbol) = scope.symbols.get(name) {
                return Some(*symbol);
            }
        }
        if let Some(symbol) = self.globals.get(name) {
            return Some(*symbol);
        }
        self.materialize_builtin(name)
    }

    /// Adds the `gl_*` variable `name` to the module on first reference.
    fn materialize_builtin(&mut self, name: &str) -> Option<Symbol> {
        let builtin = builtins::lookup_variable(name, self.kind, self.version, self.ctx)?;
        let mut ty = self.intern(builtin.ty);
        if let Some(size) = builtin.array_size {
            ty = self.intern(Type::Array { base: ty, size });
        }
        let constant = builtin.value.map(Literal::Int);
        let mut var = GlobalVariable::new(name, ty, builtin.space);
        var.builtin = true;
        var.init = constant.map(|lit| self.module.global_expressions.append(Expression::Literal(lit)));
        let handle = self.module.global_variables.append(var);
        log::debug!("materialized built-in `{name}'");

        let symbol = Symbol {
            var: Var::Global(handle),
            ty,
            read_only: builtin.space.is_read_only(),
            constant,
        };
        self.globals.insert(name.to_string(), symbol);
        Some(symbol)
    }

    fn check_new_name(&self, name: &str, location: SourceLocation) -> LowerResult<()> {
        if name.starts_with("gl_") {
            return error(
                location,
                format!("identifier `{name}' uses reserved `gl_' prefix"),
            );
        }
        let taken = match self.scopes.last() {
            Some(scope) => scope.symbols.contains_key(name),
            None => self.globals.contains_key(name) || self.functions.contains_key(name),
        };
        if taken {
            return error(location, format!("`{name}' redeclared"));
        }
        Ok(())
    }

    fn declare(&mut self, name: &str, symbol: Symbol) {
        match self.scopes.last_mut() {
            Some(scope) => scope.symbols.insert(name.to_string(), symbol),
            None => self.globals.insert(name.to_string(), symbol),
        };
    }

    fn record_builtin(&mut self, fun: BuiltinFunction) {
        let name = fun.name();
        if !self.builtins.iter().any(|b| b == name) {
            self.builtins.push(name.to_string());
        }
    }

    // -- global declarations -----------------------------------------------

    fn external_declaration(&mut self, declaration: &ExternalDeclaration) -> LowerResult<()> {
        match declaration {
            ExternalDeclaration::Variables(decl) => self.global_declaration(decl),
            ExternalDeclaration::Precision(stmt) => self.precision_statement(stmt),
            ExternalDeclaration::Invariant { names, location } => {
                for name in names {
                    self.invariant_redeclaration(name, *location)?;
                }
                Ok(())
            }
            ExternalDeclaration::Function(def) => self.function(def),
        }
    }

    fn invariant_redeclaration(&mut self, name: &str, location: SourceLocation) -> LowerResult<()> {
        let Some(symbol) = self.lookup(name) else {
            return error(location, format!("`{name}' undeclared"));
        };
        let Var::Global(handle) = symbol.var else {
            return error(location, format!("`{name}' undeclared"));
        };
        let space = self.module.global_variables[handle].space;
        if !self.may_be_invariant(space) {
            return error(
                location,
                format!("`invariant' cannot be applied to `{name}', which is not a shader output"),
            );
        }
        self.module.global_variables[handle].invariant = true;
        Ok(())
    }

    fn may_be_invariant(&self, space: AddressSpace) -> bool {
        match space {
            AddressSpace::Output => self.kind != ShaderKind::Fragment,
            AddressSpace::Input => self.kind == ShaderKind::Fragment && self.version.es,
            _ => false,
        }
    }

    /// Address space of a global declared with `qualifiers`, and whether
    /// it is an interpolated varying.
    fn global_space(
        &mut self,
        qualifiers: &TypeQualifiers,
        location: SourceLocation,
    ) -> LowerResult<(AddressSpace, bool)> {
        use StorageQualifier as Q;
        let kind = self.kind;
        let (space, varying) = match qualifiers.storage {
            None => (AddressSpace::Private, false),
            Some(Q::Const) => (AddressSpace::Constant, false),
            Some(Q::Uniform) => (AddressSpace::Uniform, false),
            Some(Q::Attribute) => {
                if kind != ShaderKind::Vertex {
                    return error(
                        location,
                        "`attribute' qualifier may only be used in vertex shaders",
                    );
                }
                if self.version.has_in_out_globals() {
                    self.log.warning(
                        Some(location),
                        format!("`attribute' is deprecated in {}", self.version),
                    );
                }
                (AddressSpace::Input, false)
            }
            Some(Q::Varying) if kind == ShaderKind::Fragment => (AddressSpace::Input, true),
            Some(Q::Varying) => (AddressSpace::Output, true),
            Some(q @ (Q::In | Q::Out)) => {
                if !self.version.has_in_out_globals() {
                    return error(
                        location,
                        format!("`{q}' qualifier on a global variable requires GLSL 1.30"),
                    );
                }
                match q {
                    Q::In => (AddressSpace::Input, kind != ShaderKind::Vertex),
                    _ => (AddressSpace::Output, kind != ShaderKind::Fragment),
                }
            }
        };

        if qualifiers.interpolation.is_some() && !varying {
            return error(
                location,
                "interpolation qualifiers may only be applied to shader inputs and outputs",
            );
        }
        if qualifiers.centroid && !varying {
            return error(location, "`centroid' may only be applied to varyings");
        }
        if qualifiers.invariant && !(varying && self.may_be_invariant(space)) {
            return error(location, "`invariant' may only be applied to shader outputs");
        }
        Ok((space, varying))
    }

    fn global_declaration(&mut self, decl: &Declaration) -> LowerResult<()> {
        if decl.declarators.is_empty() {
            self.log.warning(Some(decl.location), "empty declaration");
            return Ok(());
        }
        let (space, varying) = self.global_space(&decl.ty.qualifiers, decl.location)?;
        for declarator in &decl.declarators {
            if let Err(e) = self.global_declarator(decl, space, varying, declarator) {
                self.report(e);
            }
        }
        Ok(())
    }

    fn global_declarator(
        &mut self,
        decl: &Declaration,
        space: AddressSpace,
        varying: bool,
        d: &Declarator,
    ) -> LowerResult<()> {
        let name = d.name.as_str();
        self.check_new_name(name, d.location)?;
        let ty = self.resolve_type(&decl.ty.ty, d.array_size.as_ref(), d.location)?;
        self.check_precision(&decl.ty.ty, ty, d.location)?;
        self.check_storage_type(decl, space, varying, ty, d)?;

        let init = match &d.initializer {
            None if space == AddressSpace::Constant => {
                return error(
                    d.location,
                    format!("const variable `{name}' must be initialized"),
                );
            }
            None => None,
            Some(init) => {
                match space {
                    AddressSpace::Input | AddressSpace::Output => {
                        return error(
                            d.location,
                            format!("shader input or output `{name}' cannot be initialized"),
                        );
                    }
                    AddressSpace::Uniform if self.version.es || self.version.number < 120 => {
                        return error(
                            d.location,
                            format!("uniform `{name}' cannot be initialized in {}", self.version),
                        );
                    }
                    _ => {}
                }
                let value = self.rvalue(init)?;
                self.check_initializer(name, ty, value.ty, init.location)?;
                Some(value.handle)
            }
        };
        let constant = match (&d.initializer, space) {
            (Some(init), AddressSpace::Constant) if matches!(self.ty(ty), Type::Scalar(_)) => {
                self.eval_const(init)
            }
            _ => None,
        };

        let mut var = GlobalVariable::new(name, ty, space);
        var.init = init;
        var.invariant = decl.ty.qualifiers.invariant;
        let handle = self.module.global_variables.append(var);
        self.declare(
            name,
            Symbol {
                var: Var::Global(handle),
                ty,
                read_only: space.is_read_only(),
                constant,
            },
        );
        Ok(())
    }

    /// Type restrictions that depend on the storage qualifier.
    fn check_storage_type(
        &self,
        decl: &Declaration,
        space: AddressSpace,
        varying: bool,
        ty: Handle<Type>,
        d: &Declarator,
    ) -> LowerResult<()> {
        let element = self.innermost(ty);
        let is_array = matches!(self.ty(ty), Type::Array { .. });
        if matches!(element, Type::Sampler(_)) && space != AddressSpace::Uniform {
            return error(
                d.location,
                format!("sampler `{}' must be declared uniform", d.name),
            );
        }
        let attribute = decl.ty.qualifiers.storage == Some(StorageQualifier::Attribute)
            || (decl.ty.qualifiers.storage == Some(StorageQualifier::In)
                && self.kind == ShaderKind::Vertex);
        if attribute && (is_array || !element.is_float_based()) {
            return error(
                d.location,
                format!(
                    "vertex input `{}' must be a float, vector, or matrix, not `{}'",
                    d.name,
                    self.type_name(ty)
                ),
            );
        }
        let flat = decl.ty.qualifiers.interpolation == Some(crate::ast::Interpolation::Flat);
        let integral = element.scalar_kind() == Some(ScalarKind::Int);
        if varying && !element.is_float_based() && !(flat && integral) {
            return error(
                d.location,
                format!(
                    "varying `{}' cannot have type `{}'",
                    d.name,
                    self.type_name(ty)
                ),
            );
        }
        Ok(())
    }

    fn check_initializer(
        &self,
        name: &str,
        ty: Handle<Type>,
        value: Handle<Type>,
        location: SourceLocation,
    ) -> LowerResult<()> {
        if ty != value {
            return error(
                location,
                format!(
                    "cannot initialize `{name}' of type `{}' with a value of type `{}'",
                    self.type_name(ty),
                    self.type_name(value)
                ),
            );
        }
        Ok(())
    }

    // -- functions ---------------------------------------------------------

    fn function(&mut self, def: &FunctionDefinition) -> LowerResult<()> {
        let proto = &def.prototype;
        let name = proto.name.as_str();
        let location = proto.location;

        if !proto.return_type.qualifiers.is_empty() {
            return error(
                location,
                format!("return type of `{name}' cannot have qualifiers"),
            );
        }
        let result = match proto.return_type.ty.name {
            TypeName::Void => None,
            _ => {
                let ty = self.resolve_type(&proto.return_type.ty, None, location)?;
                self.check_precision(&proto.return_type.ty, ty, location)?;
                if matches!(self.ty(ty), Type::Sampler(_)) {
                    return error(location, format!("function `{name}' cannot return a sampler"));
                }
                Some(ty)
            }
        };
        if name.starts_with("gl_") {
            return error(
                location,
                format!("identifier `{name}' uses reserved `gl_' prefix"),
            );
        }
        if BuiltinFunction::from_name(name).is_some() {
            return error(location, format!("redeclaration of built-in function `{name}'"));
        }
        if self.globals.contains_key(name) {
            return error(location, format!("`{name}' redeclared"));
        }

        let mut arguments = Vec::with_capacity(proto.parameters.len());
        for param in &proto.parameters {
            arguments.push(self.parameter_type(param)?);
        }
        if name == "main" {
            if result.is_some() {
                return error(location, "function `main' must return void");
            }
            if !arguments.is_empty() {
                return error(location, "function `main' must not take any parameters");
            }
        }

        let mut function = Function::new(name);
        function.arguments = arguments;
        function.result = result;
        function.defined = false;

        let existing = self.functions.get(name).and_then(|overloads| {
            overloads
                .iter()
                .copied()
                .find(|&h| self.module.functions[h].same_signature(&function))
        });
        let handle = match existing {
            Some(handle) => {
                let previous = &self.module.functions[handle];
                if previous.result != function.result {
                    return error(
                        location,
                        format!("function `{name}' redeclared with a different return type"),
                    );
                }
                if def.body.is_some() && previous.defined {
                    return error(location, format!("function `{name}' redefined"));
                }
                handle
            }
            None => {
                let handle = self.module.functions.append(function.clone());
                self.functions.entry(name.to_string()).or_default().push(handle);
                handle
            }
        };

        if let Some(body) = &def.body {
            self.define_function(handle, function, &proto.parameters, body);
        }
        Ok(())
    }

    fn parameter_type(&mut self, param: &Parameter) -> LowerResult<FunctionArgument> {
        match param.direction {
            ParameterDirection::In => {}
            ParameterDirection::Out => {
                return error(param.location, "`out' parameters are not supported");
            }
            ParameterDirection::InOut => {
                return error(param.location, "`inout' parameters are not supported");
            }
        }
        let ty = self.resolve_type(&param.ty, param.array_size.as_ref(), param.location)?;
        self.check_precision(&param.ty, ty, param.location)?;
        Ok(FunctionArgument {
            name: param.name.clone(),
            ty,
        })
    }

    fn define_function(
        &mut self,
        handle: Handle<Function>,
        mut function: Function,
        parameters: &[Parameter],
        body: &[crate::ast::Statement],
    ) {
        function.defined = true;
        self.module.functions[handle].defined = true;
        self.function = Some(function);
        self.scopes.push(Scope::default());
        self.blocks.push(Vec::new());
        self.loop_depth = 0;

        for (index, param) in parameters.iter().enumerate() {
            if let Err(e) = self.bind_parameter(index, param) {
                self.report(e);
            }
        }
        for stmt in body {
            self.statement(stmt);
        }

        let body = self.blocks.pop().unwrap_or_default();
        self.blocks.clear();
        self.scopes.clear();
        if let Some(mut function) = self.function.take() {
            function.body = body;
            self.module.functions[handle] = function;
        }
    }

    /// Copies an argument into a local so that the body may assign to it.
    fn bind_parameter(&mut self, index: usize, param: &Parameter) -> LowerResult<()> {
        let Some(name) = &param.name else {
            return Ok(());
        };
        self.check_new_name(name, param.location)?;
        let ty = match self.function.as_ref().and_then(|f| f.arguments.get(index)) {
            Some(arg) => arg.ty,
            None => return Ok(()),
        };
        let local = self.add_local(Some(name.clone()), ty, param.location)?;
        let pointer = self.emit(Expression::LocalVariable(local));
        let value = self.emit(Expression::FunctionArgument(index as u32));
        self.push_statement(Statement::Store { pointer, value }, param.location)?;
        self.declare(
            name,
            Symbol {
                var: Var::Local(local),
                ty,
                read_only: param.constant,
                constant: None,
            },
        );
        Ok(())
    }
}
