//! Recursive-descent parser producing an [`ast::TranslationUnit`].
//!
//! Parsing stops at the first syntax error.

use glsc_context::Version;
use glsc_ir::SourceLocation;

use crate::SyntaxError;
use crate::ast::*;
use crate::lexer::{Keyword, Punct, Token, TokenKind, tokenize};

/// Parses preprocessed `source` written for `version`.
pub fn parse(source: &str, version: Version) -> Result<TranslationUnit, SyntaxError> {
    let tokens = tokenize(source, version)?;
    let mut parser = Parser { tokens, pos: 0 };
    let unit = parser.translation_unit()?;
    log::debug!("parsed {} external declarations", unit.declarations.len());
    Ok(unit)
}

type PResult<T> = Result<T, SyntaxError>;

/// Binary operator precedence levels, loosest first.
const BINARY_LEVELS: &[&[(Punct, BinaryOp)]] = &[
    &[(Punct::OrOp, BinaryOp::Or)],
    &[(Punct::XorOp, BinaryOp::Xor)],
    &[(Punct::AndOp, BinaryOp::And)],
    &[(Punct::EqOp, BinaryOp::Equal), (Punct::NeOp, BinaryOp::NotEqual)],
    &[
        (Punct::LeftAngle, BinaryOp::Less),
        (Punct::RightAngle, BinaryOp::Greater),
        (Punct::LeOp, BinaryOp::LessEqual),
        (Punct::GeOp, BinaryOp::GreaterEqual),
    ],
    &[(Punct::Plus, BinaryOp::Add), (Punct::Dash, BinaryOp::Sub)],
    &[(Punct::Star, BinaryOp::Mul), (Punct::Slash, BinaryOp::Div)],
];

fn type_name(keyword: Keyword) -> Option<TypeName> {
    Some(match keyword {
        Keyword::Void => TypeName::Void,
        Keyword::Bool => TypeName::Bool,
        Keyword::Int => TypeName::Int,
        Keyword::Float => TypeName::Float,
        Keyword::Vec2 => TypeName::Vec(2),
        Keyword::Vec3 => TypeName::Vec(3),
        Keyword::Vec4 => TypeName::Vec(4),
        Keyword::BVec2 => TypeName::BVec(2),
        Keyword::BVec3 => TypeName::BVec(3),
        Keyword::BVec4 => TypeName::BVec(4),
        Keyword::IVec2 => TypeName::IVec(2),
        Keyword::IVec3 => TypeName::IVec(3),
        Keyword::IVec4 => TypeName::IVec(4),
        Keyword::Mat2 => TypeName::Mat(2),
        Keyword::Mat3 => TypeName::Mat(3),
        Keyword::Mat4 => TypeName::Mat(4),
        Keyword::Sampler2D => TypeName::Sampler2D,
        Keyword::SamplerCube => TypeName::SamplerCube,
        _ => return None,
    })
}

fn precision(keyword: Keyword) -> Option<Precision> {
    match keyword {
        Keyword::HighP => Some(Precision::High),
        Keyword::MediumP => Some(Precision::Medium),
        Keyword::LowP => Some(Precision::Low),
        _ => None,
    }
}

fn is_qualifier(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Const
            | Keyword::Attribute
            | Keyword::Uniform
            | Keyword::Varying
            | Keyword::In
            | Keyword::Out
            | Keyword::Invariant
            | Keyword::Centroid
            | Keyword::Flat
            | Keyword::Smooth
            | Keyword::NoPerspective
    )
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    // -----------------------------------------------------------------------
    // Token helpers
    // -----------------------------------------------------------------------

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn location(&self) -> SourceLocation {
        self.peek().location
    }

    fn at_punct(&self, punct: Punct) -> bool {
        self.peek().kind == TokenKind::Punct(punct)
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.peek().kind == TokenKind::Keyword(keyword)
    }

    fn keyword(&self) -> Option<Keyword> {
        match self.peek().kind {
            TokenKind::Keyword(k) => Some(k),
            _ => None,
        }
    }

    fn eat_punct(&mut self, punct: Punct) -> bool {
        let matched = self.at_punct(punct);
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn unexpected(&self, expecting: &str) -> SyntaxError {
        let token = self.peek();
        let mut message = format!("unexpected {}", token.kind);
        if !expecting.is_empty() {
            message.push_str(", expecting ");
            message.push_str(expecting);
        }
        SyntaxError {
            location: token.location,
            message,
        }
    }

    fn expect_punct(&mut self, punct: Punct) -> PResult<SourceLocation> {
        let location = self.location();
        if self.eat_punct(punct) {
            Ok(location)
        } else {
            Err(self.unexpected(&format!("`{}'", punct.as_str())))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> PResult<()> {
        if self.at_keyword(keyword) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{}'", keyword.as_str())))
        }
    }

    fn expect_identifier(&mut self) -> PResult<(String, SourceLocation)> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Identifier(name) => {
                self.pos += 1;
                Ok((name, token.location))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    // -----------------------------------------------------------------------
    // External declarations
    // -----------------------------------------------------------------------

    fn translation_unit(&mut self) -> PResult<TranslationUnit> {
        let mut declarations = Vec::new();
        while self.peek().kind != TokenKind::Eof {
            declarations.push(self.external_declaration()?);
        }
        Ok(TranslationUnit { declarations })
    }

    fn external_declaration(&mut self) -> PResult<ExternalDeclaration> {
        let location = self.location();
        if self.at_keyword(Keyword::Precision) {
            return Ok(ExternalDeclaration::Precision(self.precision_statement()?));
        }
        if self.at_keyword(Keyword::Invariant)
            && matches!(self.peek_at(1).kind, TokenKind::Identifier(_))
        {
            self.pos += 1;
            let mut names = vec![self.expect_identifier()?.0];
            while self.eat_punct(Punct::Comma) {
                names.push(self.expect_identifier()?.0);
            }
            self.expect_punct(Punct::Semicolon)?;
            return Ok(ExternalDeclaration::Invariant { names, location });
        }

        let ty = self.fully_specified_type()?;
        if matches!(self.peek().kind, TokenKind::Identifier(_))
            && self.peek_at(1).kind == TokenKind::Punct(Punct::LeftParen)
        {
            return Ok(ExternalDeclaration::Function(self.function(ty, location)?));
        }
        Ok(ExternalDeclaration::Variables(
            self.declaration_rest(ty, location)?,
        ))
    }

    fn precision_statement(&mut self) -> PResult<PrecisionStatement> {
        let location = self.location();
        self.expect_keyword(Keyword::Precision)?;
        let precision = self
            .keyword()
            .and_then(precision)
            .ok_or_else(|| self.unexpected("precision qualifier"))?;
        self.pos += 1;
        let ty = self
            .keyword()
            .and_then(type_name)
            .ok_or_else(|| self.unexpected("type"))?;
        self.pos += 1;
        self.expect_punct(Punct::Semicolon)?;
        Ok(PrecisionStatement {
            precision,
            ty,
            location,
        })
    }

    fn qualifiers(&mut self) -> PResult<TypeQualifiers> {
        let mut q = TypeQualifiers::default();
        while let Some(keyword) = self.keyword().filter(|k| is_qualifier(*k)) {
            let storage = match keyword {
                Keyword::Invariant if !q.invariant => {
                    q.invariant = true;
                    None
                }
                Keyword::Smooth | Keyword::Flat | Keyword::NoPerspective
                    if q.interpolation.is_none() =>
                {
                    q.interpolation = Some(match keyword {
                        Keyword::Smooth => Interpolation::Smooth,
                        Keyword::Flat => Interpolation::Flat,
                        _ => Interpolation::NoPerspective,
                    });
                    None
                }
                Keyword::Centroid if !q.centroid => {
                    q.centroid = true;
                    None
                }
                Keyword::Const => Some(StorageQualifier::Const),
                Keyword::Attribute => Some(StorageQualifier::Attribute),
                Keyword::Uniform => Some(StorageQualifier::Uniform),
                Keyword::Varying => Some(StorageQualifier::Varying),
                Keyword::In => Some(StorageQualifier::In),
                Keyword::Out => Some(StorageQualifier::Out),
                _ => return Err(self.unexpected("type")),
            };
            if let Some(storage) = storage {
                if q.storage.is_some() {
                    return Err(self.unexpected("type"));
                }
                q.storage = Some(storage);
            }
            self.pos += 1;
        }
        Ok(q)
    }

    fn type_specifier(&mut self) -> PResult<TypeSpecifier> {
        let precision = self.keyword().and_then(precision);
        if precision.is_some() {
            self.pos += 1;
        }
        let name = self
            .keyword()
            .and_then(type_name)
            .ok_or_else(|| self.unexpected("type"))?;
        self.pos += 1;
        Ok(TypeSpecifier { precision, name })
    }

    fn fully_specified_type(&mut self) -> PResult<FullySpecifiedType> {
        let qualifiers = self.qualifiers()?;
        let ty = self.type_specifier()?;
        Ok(FullySpecifiedType { qualifiers, ty })
    }

    fn array_size(&mut self) -> PResult<Option<Expr>> {
        if !self.eat_punct(Punct::LeftBracket) {
            return Ok(None);
        }
        let size = self.conditional()?;
        self.expect_punct(Punct::RightBracket)?;
        Ok(Some(size))
    }

    /// Parses the declarator list after the type, through the `;`.
    fn declaration_rest(
        &mut self,
        ty: FullySpecifiedType,
        location: SourceLocation,
    ) -> PResult<Declaration> {
        let mut declarators = Vec::new();
        if !self.at_punct(Punct::Semicolon) {
            loop {
                let (name, location) = self.expect_identifier()?;
                let array_size = self.array_size()?;
                let initializer = if self.eat_punct(Punct::Equal) {
                    Some(self.assignment()?)
                } else {
                    None
                };
                declarators.push(Declarator {
                    name,
                    array_size,
                    initializer,
                    location,
                });
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
        }
        if !self.at_punct(Punct::Semicolon) {
            return Err(self.unexpected("`,' or `;'"));
        }
        self.pos += 1;
        Ok(Declaration {
            ty,
            declarators,
            location,
        })
    }

    fn function(
        &mut self,
        return_type: FullySpecifiedType,
        location: SourceLocation,
    ) -> PResult<FunctionDefinition> {
        let (name, _) = self.expect_identifier()?;
        self.expect_punct(Punct::LeftParen)?;

        let mut parameters = Vec::new();
        let void_list = self.at_keyword(Keyword::Void)
            && self.peek_at(1).kind == TokenKind::Punct(Punct::RightParen);
        if void_list {
            self.pos += 1;
        } else if !self.at_punct(Punct::RightParen) {
            loop {
                parameters.push(self.parameter()?);
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RightParen)?;

        let prototype = FunctionPrototype {
            return_type,
            name,
            parameters,
            location,
        };
        if self.eat_punct(Punct::Semicolon) {
            return Ok(FunctionDefinition {
                prototype,
                body: None,
            });
        }
        if !self.at_punct(Punct::LeftBrace) {
            return Err(self.unexpected("`;' or `{'"));
        }
        let body = self.compound_body()?;
        Ok(FunctionDefinition {
            prototype,
            body: Some(body),
        })
    }

    fn parameter(&mut self) -> PResult<Parameter> {
        let location = self.location();
        let constant = self.at_keyword(Keyword::Const);
        if constant {
            self.pos += 1;
        }
        let direction = match self.keyword() {
            Some(Keyword::In) => Some(ParameterDirection::In),
            Some(Keyword::Out) => Some(ParameterDirection::Out),
            Some(Keyword::InOut) => Some(ParameterDirection::InOut),
            _ => None,
        };
        if direction.is_some() {
            self.pos += 1;
        }
        let ty = self.type_specifier()?;
        let name = match &self.peek().kind {
            TokenKind::Identifier(_) => Some(self.expect_identifier()?.0),
            _ => None,
        };
        let array_size = if name.is_some() {
            self.array_size()?
        } else {
            None
        };
        Ok(Parameter {
            constant,
            direction: direction.unwrap_or_default(),
            explicit_direction: direction.is_some(),
            ty,
            name,
            array_size,
            location,
        })
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    /// Parses `{ statement* }` and returns the statements.
    fn compound_body(&mut self) -> PResult<Vec<Statement>> {
        self.expect_punct(Punct::LeftBrace)?;
        let mut body = Vec::new();
        while !self.at_punct(Punct::RightBrace) {
            if self.peek().kind == TokenKind::Eof {
                return Err(self.unexpected("`}'"));
            }
            body.push(self.statement()?);
        }
        self.pos += 1;
        Ok(body)
    }

    fn is_declaration_start(&self) -> bool {
        match self.keyword() {
            Some(k) if is_qualifier(k) || precision(k).is_some() => true,
            Some(k) if type_name(k).is_some() => {
                self.peek_at(1).kind != TokenKind::Punct(Punct::LeftParen)
            }
            _ => false,
        }
    }

    fn statement(&mut self) -> PResult<Statement> {
        let location = self.location();
        let kind = match self.keyword() {
            _ if self.at_punct(Punct::LeftBrace) => StatementKind::Compound(self.compound_body()?),
            _ if self.eat_punct(Punct::Semicolon) => StatementKind::Expression(None),
            Some(Keyword::If) => {
                self.pos += 1;
                self.expect_punct(Punct::LeftParen)?;
                let condition = self.expression()?;
                self.expect_punct(Punct::RightParen)?;
                let accept = Box::new(self.statement()?);
                let reject = if self.at_keyword(Keyword::Else) {
                    self.pos += 1;
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                StatementKind::If {
                    condition,
                    accept,
                    reject,
                }
            }
            Some(Keyword::While) => {
                self.pos += 1;
                self.expect_punct(Punct::LeftParen)?;
                let condition = self.expression()?;
                self.expect_punct(Punct::RightParen)?;
                let body = Box::new(self.statement()?);
                StatementKind::While { condition, body }
            }
            Some(Keyword::Do) => {
                self.pos += 1;
                let body = Box::new(self.statement()?);
                self.expect_keyword(Keyword::While)?;
                self.expect_punct(Punct::LeftParen)?;
                let condition = self.expression()?;
                self.expect_punct(Punct::RightParen)?;
                self.expect_punct(Punct::Semicolon)?;
                StatementKind::DoWhile { body, condition }
            }
            Some(Keyword::For) => self.for_statement()?,
            Some(Keyword::Return) => {
                self.pos += 1;
                let value = if self.at_punct(Punct::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect_punct(Punct::Semicolon)?;
                StatementKind::Return(value)
            }
            Some(jump @ (Keyword::Break | Keyword::Continue | Keyword::Discard)) => {
                self.pos += 1;
                self.expect_punct(Punct::Semicolon)?;
                match jump {
                    Keyword::Break => StatementKind::Break,
                    Keyword::Continue => StatementKind::Continue,
                    _ => StatementKind::Discard,
                }
            }
            Some(Keyword::Precision) => StatementKind::Precision(self.precision_statement()?),
            _ if self.is_declaration_start() => {
                let ty = self.fully_specified_type()?;
                StatementKind::Declaration(self.declaration_rest(ty, location)?)
            }
            _ => {
                let expr = self.expression()?;
                self.expect_punct(Punct::Semicolon)?;
                StatementKind::Expression(Some(expr))
            }
        };
        Ok(Statement { kind, location })
    }

    fn for_statement(&mut self) -> PResult<StatementKind> {
        self.expect_keyword(Keyword::For)?;
        self.expect_punct(Punct::LeftParen)?;

        let init_location = self.location();
        let init = if self.eat_punct(Punct::Semicolon) {
            None
        } else if self.is_declaration_start() {
            let ty = self.fully_specified_type()?;
            let decl = self.declaration_rest(ty, init_location)?;
            Some(Box::new(Statement {
                kind: StatementKind::Declaration(decl),
                location: init_location,
            }))
        } else {
            let expr = self.expression()?;
            self.expect_punct(Punct::Semicolon)?;
            Some(Box::new(Statement {
                kind: StatementKind::Expression(Some(expr)),
                location: init_location,
            }))
        };

        let condition = if self.at_punct(Punct::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(Punct::Semicolon)?;
        let step = if self.at_punct(Punct::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(Punct::RightParen)?;
        let body = Box::new(self.statement()?);
        Ok(StatementKind::For {
            init,
            condition,
            step,
            body,
        })
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn expression(&mut self) -> PResult<Expr> {
        let mut expr = self.assignment()?;
        while self.eat_punct(Punct::Comma) {
            let rhs = self.assignment()?;
            let location = expr.location;
            expr = Expr {
                kind: ExprKind::Comma(Box::new(expr), Box::new(rhs)),
                location,
            };
        }
        Ok(expr)
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let lhs = self.conditional()?;
        let op = match self.peek().kind {
            TokenKind::Punct(Punct::Equal) => AssignOp::Assign,
            TokenKind::Punct(Punct::AddAssign) => AssignOp::Add,
            TokenKind::Punct(Punct::SubAssign) => AssignOp::Sub,
            TokenKind::Punct(Punct::MulAssign) => AssignOp::Mul,
            TokenKind::Punct(Punct::DivAssign) => AssignOp::Div,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.assignment()?;
        let location = lhs.location;
        Ok(Expr {
            kind: ExprKind::Assign(op, Box::new(lhs), Box::new(rhs)),
            location,
        })
    }

    fn conditional(&mut self) -> PResult<Expr> {
        let condition = self.binary(0)?;
        if !self.eat_punct(Punct::Question) {
            return Ok(condition);
        }
        let accept = self.expression()?;
        self.expect_punct(Punct::Colon)?;
        let reject = self.assignment()?;
        let location = condition.location;
        Ok(Expr {
            kind: ExprKind::Ternary(Box::new(condition), Box::new(accept), Box::new(reject)),
            location,
        })
    }

    fn binary(&mut self, level: usize) -> PResult<Expr> {
        let Some(operators) = BINARY_LEVELS.get(level) else {
            return self.unary();
        };
        let mut lhs = self.binary(level + 1)?;
        loop {
            let op = operators
                .iter()
                .find(|(punct, _)| self.at_punct(*punct))
                .map(|&(_, op)| op);
            let Some(op) = op else {
                return Ok(lhs);
            };
            self.pos += 1;
            let rhs = self.binary(level + 1)?;
            let location = lhs.location;
            lhs = Expr {
                kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
                location,
            };
        }
    }

    fn unary(&mut self) -> PResult<Expr> {
        let location = self.location();
        let op = match self.peek().kind {
            TokenKind::Punct(Punct::Plus) => UnaryOp::Plus,
            TokenKind::Punct(Punct::Dash) => UnaryOp::Minus,
            TokenKind::Punct(Punct::Bang) => UnaryOp::Not,
            TokenKind::Punct(Punct::IncOp) => UnaryOp::PreIncrement,
            TokenKind::Punct(Punct::DecOp) => UnaryOp::PreDecrement,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let operand = self.unary()?;
        Ok(Expr {
            kind: ExprKind::Unary(op, Box::new(operand)),
            location,
        })
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            let location = expr.location;
            let kind = if self.eat_punct(Punct::LeftBracket) {
                let index = self.expression()?;
                self.expect_punct(Punct::RightBracket)?;
                ExprKind::Index(Box::new(expr), Box::new(index))
            } else if self.eat_punct(Punct::Dot) {
                let (field, _) = self.expect_identifier()?;
                ExprKind::Field(Box::new(expr), field)
            } else if self.eat_punct(Punct::IncOp) {
                ExprKind::Postfix(PostfixOp::Increment, Box::new(expr))
            } else if self.eat_punct(Punct::DecOp) {
                ExprKind::Postfix(PostfixOp::Decrement, Box::new(expr))
            } else {
                return Ok(expr);
            };
            expr = Expr { kind, location };
        }
    }

    fn call_arguments(&mut self) -> PResult<Vec<Expr>> {
        self.expect_punct(Punct::LeftParen)?;
        let mut args = Vec::new();
        let void_list = self.at_keyword(Keyword::Void)
            && self.peek_at(1).kind == TokenKind::Punct(Punct::RightParen);
        if void_list {
            self.pos += 1;
        } else if !self.at_punct(Punct::RightParen) {
            loop {
                args.push(self.assignment()?);
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RightParen)?;
        Ok(args)
    }

    fn primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        let location = token.location;
        let kind = match token.kind {
            TokenKind::Identifier(name) => {
                self.pos += 1;
                if self.at_punct(Punct::LeftParen) {
                    ExprKind::Call(Callee::Function(name), self.call_arguments()?)
                } else {
                    ExprKind::Identifier(name)
                }
            }
            TokenKind::IntConstant(v) => {
                self.pos += 1;
                ExprKind::IntConstant(v)
            }
            TokenKind::FloatConstant(v) => {
                self.pos += 1;
                ExprKind::FloatConstant(v)
            }
            TokenKind::BoolConstant(v) => {
                self.pos += 1;
                ExprKind::BoolConstant(v)
            }
            TokenKind::Keyword(k) => match type_name(k) {
                Some(ty) if self.peek_at(1).kind == TokenKind::Punct(Punct::LeftParen) => {
                    self.pos += 1;
                    ExprKind::Call(Callee::Constructor(ty), self.call_arguments()?)
                }
                _ => return Err(self.unexpected("")),
            },
            TokenKind::Punct(Punct::LeftParen) => {
                self.pos += 1;
                let inner = self.expression()?;
                self.expect_punct(Punct::RightParen)?;
                return Ok(inner);
            }
            _ => return Err(self.unexpected("")),
        };
        Ok(Expr { kind, location })
    }
}
