//! The GLSL preprocessor.
//!
//! Works line by line over comment-stripped, continuation-spliced source.
//! Directive lines and lines in inactive conditional groups are replaced by
//! empty lines, so line numbers reported by later stages still match the
//! original file.

use std::collections::HashMap;

use glsc_context::{CapabilityContext, Dialect, Version};
use glsc_ir::{InfoLog, SourceLocation};

/// Output of [`preprocess`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preprocessed {
    /// The rewritten source text.
    pub source: String,
    /// The language version selected by `#version`, or the dialect default.
    pub version: Version,
}

#[derive(Debug, thiserror::Error)]
enum DirectiveError {
    #[error("#version must appear on the first line")]
    VersionNotFirst,
    #[error("invalid #version directive")]
    MalformedVersion,
    #[error("{found} is not supported. Supported versions are: {supported}")]
    UnsupportedVersion { found: Version, supported: String },
    #[error("#{0} without macro name")]
    MissingMacroName(&'static str),
    #[error("invalid macro name `{0}'")]
    InvalidMacroName(String),
    #[error("macro names beginning with `GL_' are reserved")]
    ReservedPrefix,
    #[error("macro names containing `__' are reserved")]
    ReservedDoubleUnderscore,
    #[error("function-like macro `{0}' is not supported")]
    FunctionLikeMacro(String),
    #[error("redefinition of macro `{0}'")]
    Redefinition(String),
    #[error("#{0} without #if")]
    UnmatchedConditional(&'static str),
    #[error("#{0} after #else")]
    AfterElse(&'static str),
    #[error("invalid expression in #{0}")]
    InvalidExpression(&'static str),
    #[error("undefined macro `{0}' in expression (illegal in GLSL ES)")]
    UndefinedInExpression(String),
    #[error("division by zero in #if")]
    DivisionByZero,
    #[error("#error {0}")]
    User(String),
    #[error("invalid #extension directive")]
    MalformedExtension,
    #[error("unknown extension behavior `{0}'")]
    UnknownBehavior(String),
    #[error("cannot {0} all extensions")]
    AllExtensions(String),
    #[error("extension `{0}' unsupported")]
    UnsupportedExtension(String),
    #[error("invalid directive `#{0}'")]
    UnknownDirective(String),
}

/// Runs the preprocessor over `source`.
///
/// Errors and warnings are appended to `log`; the caller checks
/// [`InfoLog::has_errors`] to decide whether to continue.
pub fn preprocess(source: &str, ctx: &CapabilityContext, log: &mut InfoLog) -> Preprocessed {
    let (lines, unterminated) = split_lines(source);
    let mut pp = Preprocessor::new(ctx, log);

    let mut output = String::with_capacity(source.len());
    for line in &lines {
        pp.line = line.number;
        let text = pp.process_line(&line.text);
        output.push_str(&text);
        for _ in 0..=line.spliced {
            output.push('\n');
        }
    }

    if let Some(location) = unterminated {
        pp.log.error(Some(location), "unterminated comment");
    }
    if let Some(open) = pp.conditionals.last() {
        let location = open.location;
        pp.log.error(Some(location), "unterminated #if");
    }

    log::debug!(
        "preprocessed {} lines as {}, {} macros defined",
        lines.len(),
        pp.version,
        pp.macros.len()
    );
    Preprocessed {
        source: output,
        version: pp.version,
    }
}

// ---------------------------------------------------------------------------
// Line splitting
// ---------------------------------------------------------------------------

struct LogicalLine {
    /// Physical line the logical line starts on.
    number: u32,
    text: String,
    /// Physical lines joined onto this one by continuations.
    spliced: u32,
}

#[derive(PartialEq)]
enum CommentState {
    Code,
    Line,
    Block,
}

/// Strips comments and joins `\`-continued lines. A block comment becomes a
/// single space; the newlines inside it are kept.
fn split_lines(source: &str) -> (Vec<LogicalLine>, Option<SourceLocation>) {
    let mut lines = Vec::new();
    let mut physical = 1u32;
    let mut current = LogicalLine {
        number: physical,
        text: String::new(),
        spliced: 0,
    };
    let mut state = CommentState::Code;
    let mut comment_start = SourceLocation::default();
    let mut column = 1u32;

    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && matches!(chars.peek(), Some('\n' | '\r')) {
            if chars.next() == Some('\r') && chars.peek() == Some(&'\n') {
                chars.next();
            }
            physical += 1;
            current.spliced += 1;
            continue;
        }
        if c == '\r' {
            continue;
        }
        if c == '\n' {
            physical += 1;
            column = 1;
            if state == CommentState::Line {
                state = CommentState::Code;
            }
            let next = LogicalLine {
                number: physical,
                text: String::new(),
                spliced: 0,
            };
            lines.push(std::mem::replace(&mut current, next));
            continue;
        }
        match state {
            CommentState::Code if c == '/' && chars.peek() == Some(&'/') => {
                chars.next();
                state = CommentState::Line;
            }
            CommentState::Code if c == '/' && chars.peek() == Some(&'*') => {
                chars.next();
                comment_start = SourceLocation::new(physical, column);
                state = CommentState::Block;
                current.text.push(' ');
            }
            CommentState::Code => current.text.push(c),
            CommentState::Line => {}
            CommentState::Block => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = CommentState::Code;
                }
            }
        }
        column += 1;
    }
    lines.push(current);

    let unterminated = (state == CommentState::Block).then_some(comment_start);
    (lines, unterminated)
}

// ---------------------------------------------------------------------------
// Directive processing
// ---------------------------------------------------------------------------

enum MacroBody {
    Text(String),
    Line,
    File,
    Version,
}

struct Macro {
    body: MacroBody,
}

struct Conditional {
    /// Whether the enclosing group is active.
    parent_active: bool,
    /// Whether the current branch of this group is active.
    branch_active: bool,
    /// Whether some branch of this group has been taken.
    taken: bool,
    seen_else: bool,
    location: SourceLocation,
}

struct Preprocessor<'a> {
    ctx: &'a CapabilityContext,
    log: &'a mut InfoLog,
    version: Version,
    macros: HashMap<String, Macro>,
    conditionals: Vec<Conditional>,
    /// Set once anything other than whitespace precedes the current line.
    seen_content: bool,
    line: u32,
}

impl<'a> Preprocessor<'a> {
    fn new(ctx: &'a CapabilityContext, log: &'a mut InfoLog) -> Self {
        let mut macros = HashMap::new();
        macros.insert("__LINE__".to_string(), Macro { body: MacroBody::Line });
        macros.insert("__FILE__".to_string(), Macro { body: MacroBody::File });
        macros.insert(
            "__VERSION__".to_string(),
            Macro {
                body: MacroBody::Version,
            },
        );
        if ctx.dialect() == Dialect::Embedded {
            macros.insert(
                "GL_ES".to_string(),
                Macro {
                    body: MacroBody::Text("1".into()),
                },
            );
        }
        for name in ctx.extensions().enabled() {
            macros.insert(
                name.to_string(),
                Macro {
                    body: MacroBody::Text("1".into()),
                },
            );
        }

        Self {
            ctx,
            log,
            version: Version::default_for(ctx.dialect()),
            macros,
            conditionals: Vec::new(),
            seen_content: false,
            line: 1,
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, 1)
    }

    fn active(&self) -> bool {
        self.conditionals
            .last()
            .is_none_or(|c| c.parent_active && c.branch_active)
    }

    fn process_line(&mut self, text: &str) -> String {
        let trimmed = text.trim_start();
        if let Some(directive) = trimmed.strip_prefix('#') {
            if let Err(err) = self.directive(directive.trim()) {
                let location = self.location();
                self.log.error(Some(location), err.to_string());
            }
            return String::new();
        }
        if !trimmed.is_empty() {
            self.seen_content = true;
        }
        if self.active() {
            self.expand(text)
        } else {
            String::new()
        }
    }

    fn directive(&mut self, directive: &str) -> Result<(), DirectiveError> {
        let (name, rest) = split_identifier(directive);
        let rest = rest.trim();

        // Conditionals are tracked even inside inactive groups.
        match name {
            "if" => return self.push_conditional(|pp| pp.eval_condition(rest, "if")),
            "ifdef" => {
                let defined = self.macro_operand(rest, "ifdef")?;
                return self.push_conditional(|_| Ok(defined));
            }
            "ifndef" => {
                let defined = self.macro_operand(rest, "ifndef")?;
                return self.push_conditional(|_| Ok(!defined));
            }
            "elif" => return self.elif(rest),
            "else" => return self.else_branch(),
            "endif" => {
                self.seen_content = true;
                return match self.conditionals.pop() {
                    Some(_) => Ok(()),
                    None => Err(DirectiveError::UnmatchedConditional("endif")),
                };
            }
            _ => {}
        }

        if !self.active() {
            return Ok(());
        }

        let first = !self.seen_content;
        self.seen_content = true;
        match name {
            "" => Ok(()),
            "version" => self.version_directive(rest, first),
            "define" => self.define(rest),
            "undef" => self.undef(rest),
            "error" => Err(DirectiveError::User(rest.to_string())),
            "extension" => self.extension(rest),
            "pragma" | "line" => Ok(()),
            other => Err(DirectiveError::UnknownDirective(other.to_string())),
        }
    }

    fn version_directive(&mut self, rest: &str, first: bool) -> Result<(), DirectiveError> {
        if !first {
            return Err(DirectiveError::VersionNotFirst);
        }
        let mut words = rest.split_whitespace();
        let number: u16 = words
            .next()
            .and_then(|n| n.parse().ok())
            .ok_or(DirectiveError::MalformedVersion)?;
        let es = match words.next() {
            None => number == 100,
            Some("es") => true,
            Some(_) => return Err(DirectiveError::MalformedVersion),
        };
        if words.next().is_some() {
            return Err(DirectiveError::MalformedVersion);
        }

        let found = Version { number, es };
        let dialect = self.ctx.dialect();
        let accepted = Version::supported(dialect).contains(&number)
            && es == (dialect == Dialect::Embedded);
        if !accepted {
            let supported = Version::supported(dialect)
                .iter()
                .map(|&n| {
                    let v = Version {
                        number: n,
                        es: dialect == Dialect::Embedded,
                    };
                    v.to_string()
                })
                .collect::<Vec<_>>()
                .join(", ");
            return Err(DirectiveError::UnsupportedVersion { found, supported });
        }
        self.version = found;
        Ok(())
    }

    fn define(&mut self, rest: &str) -> Result<(), DirectiveError> {
        let (name, body) = split_identifier(rest);
        check_macro_name(name, rest, "define")?;
        if body.starts_with('(') {
            return Err(DirectiveError::FunctionLikeMacro(name.to_string()));
        }
        let body = normalize_whitespace(body);
        if let Some(existing) = self.macros.get(name) {
            match &existing.body {
                MacroBody::Text(old) if *old == body => return Ok(()),
                _ => return Err(DirectiveError::Redefinition(name.to_string())),
            }
        }
        self.macros.insert(
            name.to_string(),
            Macro {
                body: MacroBody::Text(body),
            },
        );
        Ok(())
    }

    fn undef(&mut self, rest: &str) -> Result<(), DirectiveError> {
        let (name, _) = split_identifier(rest);
        check_macro_name(name, rest, "undef")?;
        self.macros.remove(name);
        Ok(())
    }

    fn extension(&mut self, rest: &str) -> Result<(), DirectiveError> {
        let (name, behavior) = rest
            .split_once(':')
            .ok_or(DirectiveError::MalformedExtension)?;
        let (name, behavior) = (name.trim(), behavior.trim());
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(DirectiveError::MalformedExtension);
        }
        if !matches!(behavior, "require" | "enable" | "warn" | "disable") {
            return Err(DirectiveError::UnknownBehavior(behavior.to_string()));
        }

        if name == "all" {
            return match behavior {
                "warn" | "disable" => Ok(()),
                _ => Err(DirectiveError::AllExtensions(behavior.to_string())),
            };
        }
        if self.ctx.extensions().is_supported(name) {
            return Ok(());
        }
        match behavior {
            "require" => Err(DirectiveError::UnsupportedExtension(name.to_string())),
            "disable" => Ok(()),
            _ => {
                let location = self.location();
                self.log.warning(
                    Some(location),
                    DirectiveError::UnsupportedExtension(name.to_string()).to_string(),
                );
                Ok(())
            }
        }
    }

    /// Parses the single identifier operand of `#ifdef`/`#ifndef` and
    /// reports whether it names a macro.
    fn macro_operand(&self, rest: &str, directive: &'static str) -> Result<bool, DirectiveError> {
        let (name, tail) = split_identifier(rest);
        if name.is_empty() || !tail.trim().is_empty() {
            return Err(DirectiveError::InvalidExpression(directive));
        }
        Ok(self.macros.contains_key(name))
    }

    fn push_conditional(
        &mut self,
        condition: impl FnOnce(&Self) -> Result<bool, DirectiveError>,
    ) -> Result<(), DirectiveError> {
        self.seen_content = true;
        let parent_active = self.active();
        let location = self.location();
        // Conditions inside skipped groups are never evaluated.
        let value = if parent_active { condition(self)? } else { false };
        self.conditionals.push(Conditional {
            parent_active,
            branch_active: value,
            taken: value,
            seen_else: false,
            location,
        });
        Ok(())
    }

    fn elif(&mut self, rest: &str) -> Result<(), DirectiveError> {
        let Some(top) = self.conditionals.last() else {
            return Err(DirectiveError::UnmatchedConditional("elif"));
        };
        if top.seen_else {
            return Err(DirectiveError::AfterElse("elif"));
        }
        let value = if top.parent_active && !top.taken {
            self.eval_condition(rest, "elif")?
        } else {
            false
        };
        if let Some(top) = self.conditionals.last_mut() {
            top.branch_active = value;
            top.taken |= value;
        }
        Ok(())
    }

    fn else_branch(&mut self) -> Result<(), DirectiveError> {
        let Some(top) = self.conditionals.last_mut() else {
            return Err(DirectiveError::UnmatchedConditional("else"));
        };
        if top.seen_else {
            return Err(DirectiveError::AfterElse("else"));
        }
        top.branch_active = !top.taken;
        top.taken = true;
        top.seen_else = true;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Macro expansion
    // -----------------------------------------------------------------------

    fn expand(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        self.expand_into(text, &mut out, &mut Vec::new());
        out
    }

    fn expand_into<'m>(&'m self, text: &str, out: &mut String, expanding: &mut Vec<&'m str>) {
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < text.len() {
            let c = bytes[i];
            if c.is_ascii_alphabetic() || c == b'_' {
                let end = scan_while(bytes, i, |b| b.is_ascii_alphanumeric() || b == b'_');
                self.expand_identifier(&text[i..end], out, expanding);
                i = end;
            } else if c.is_ascii_digit() {
                let end = scan_pp_number(bytes, i);
                out.push_str(&text[i..end]);
                i = end;
            } else {
                let ch_len = text[i..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&text[i..i + ch_len]);
                i += ch_len;
            }
        }
    }

    fn expand_identifier<'m>(&'m self, ident: &str, out: &mut String, expanding: &mut Vec<&'m str>) {
        let Some((name, mac)) = self.macros.get_key_value(ident) else {
            out.push_str(ident);
            return;
        };
        if expanding.contains(&name.as_str()) {
            out.push_str(ident);
            return;
        }
        match &mac.body {
            MacroBody::Text(body) => {
                expanding.push(name);
                self.expand_into(body, out, expanding);
                expanding.pop();
            }
            MacroBody::Line => out.push_str(&self.line.to_string()),
            MacroBody::File => out.push('0'),
            MacroBody::Version => out.push_str(&self.version.number.to_string()),
        }
    }

    // -----------------------------------------------------------------------
    // Conditional expressions
    // -----------------------------------------------------------------------

    fn eval_condition(&self, expr: &str, directive: &'static str) -> Result<bool, DirectiveError> {
        let resolved = self.resolve_defined(expr, directive)?;
        let expanded = self.expand(&resolved);
        let tokens = self.tokenize_condition(&expanded, directive)?;
        if tokens.is_empty() {
            return Err(DirectiveError::InvalidExpression(directive));
        }
        let mut parser = ConditionParser {
            tokens: &tokens,
            pos: 0,
            directive,
        };
        let value = parser.binary(1)?;
        if parser.pos != tokens.len() {
            return Err(DirectiveError::InvalidExpression(directive));
        }
        Ok(value != 0)
    }

    /// Replaces `defined X` and `defined(X)` with `1` or `0` before macro
    /// expansion.
    fn resolve_defined(&self, expr: &str, directive: &'static str) -> Result<String, DirectiveError> {
        let mut out = String::with_capacity(expr.len());
        let mut rest = expr;
        while let Some(pos) = find_word(rest, "defined") {
            out.push_str(&rest[..pos]);
            let mut tail = rest[pos + "defined".len()..].trim_start();
            let parenthesized = tail.starts_with('(');
            if parenthesized {
                tail = tail[1..].trim_start();
            }
            let (name, after) = split_identifier(tail);
            if name.is_empty() {
                return Err(DirectiveError::InvalidExpression(directive));
            }
            let mut after = after;
            if parenthesized {
                after = after
                    .trim_start()
                    .strip_prefix(')')
                    .ok_or(DirectiveError::InvalidExpression(directive))?;
            }
            out.push_str(if self.macros.contains_key(name) { " 1 " } else { " 0 " });
            rest = after;
        }
        out.push_str(rest);
        Ok(out)
    }

    fn tokenize_condition(
        &self,
        text: &str,
        directive: &'static str,
    ) -> Result<Vec<CondToken>, DirectiveError> {
        const OPERATORS: [&str; 22] = [
            "||", "&&", "==", "!=", "<=", ">=", "<<", ">>", "|", "^", "&", "<", ">", "+", "-",
            "*", "/", "%", "!", "~", "(", ")",
        ];
        let bytes = text.as_bytes();
        let mut tokens = Vec::new();
        let mut i = 0;
        'outer: while i < text.len() {
            let c = bytes[i];
            if c.is_ascii_whitespace() {
                i += 1;
                continue;
            }
            if c.is_ascii_digit() {
                let end = scan_while(bytes, i, |b| b.is_ascii_alphanumeric());
                let value = parse_integer(&text[i..end])
                    .ok_or(DirectiveError::InvalidExpression(directive))?;
                tokens.push(CondToken::Number(value));
                i = end;
                continue;
            }
            if c.is_ascii_alphabetic() || c == b'_' {
                let end = scan_while(bytes, i, |b| b.is_ascii_alphanumeric() || b == b'_');
                if self.ctx.dialect() == Dialect::Embedded {
                    return Err(DirectiveError::UndefinedInExpression(text[i..end].to_string()));
                }
                tokens.push(CondToken::Number(0));
                i = end;
                continue;
            }
            for op in OPERATORS {
                if text[i..].starts_with(op) {
                    tokens.push(CondToken::Operator(op));
                    i += op.len();
                    continue 'outer;
                }
            }
            return Err(DirectiveError::InvalidExpression(directive));
        }
        Ok(tokens)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum CondToken {
    Number(i64),
    Operator(&'static str),
}

/// Precedence-climbing evaluator for `#if` expressions.
struct ConditionParser<'t> {
    tokens: &'t [CondToken],
    pos: usize,
    directive: &'static str,
}

impl ConditionParser<'_> {
    fn invalid(&self) -> DirectiveError {
        DirectiveError::InvalidExpression(self.directive)
    }

    fn next(&mut self) -> Option<CondToken> {
        let token = self.tokens.get(self.pos).copied();
        self.pos += 1;
        token
    }

    fn binary(&mut self, min_precedence: u8) -> Result<i64, DirectiveError> {
        let mut lhs = self.unary()?;
        while let Some(&CondToken::Operator(op)) = self.tokens.get(self.pos) {
            let Some(precedence) = binary_precedence(op) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(precedence + 1)?;
            lhs = apply_binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<i64, DirectiveError> {
        match self.next() {
            Some(CondToken::Number(n)) => Ok(n),
            Some(CondToken::Operator("-")) => Ok(self.unary()?.wrapping_neg()),
            Some(CondToken::Operator("+")) => self.unary(),
            Some(CondToken::Operator("!")) => Ok(i64::from(self.unary()? == 0)),
            Some(CondToken::Operator("~")) => Ok(!self.unary()?),
            Some(CondToken::Operator("(")) => {
                let value = self.binary(1)?;
                match self.next() {
                    Some(CondToken::Operator(")")) => Ok(value),
                    _ => Err(self.invalid()),
                }
            }
            _ => Err(self.invalid()),
        }
    }
}

fn binary_precedence(op: &str) -> Option<u8> {
    Some(match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | ">" | "<=" | ">=" => 7,
        "<<" | ">>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    })
}

fn apply_binary(op: &str, a: i64, b: i64) -> Result<i64, DirectiveError> {
    Ok(match op {
        "||" => i64::from(a != 0 || b != 0),
        "&&" => i64::from(a != 0 && b != 0),
        "|" => a | b,
        "^" => a ^ b,
        "&" => a & b,
        "==" => i64::from(a == b),
        "!=" => i64::from(a != b),
        "<" => i64::from(a < b),
        ">" => i64::from(a > b),
        "<=" => i64::from(a <= b),
        ">=" => i64::from(a >= b),
        "<<" => a.wrapping_shl(b as u32),
        ">>" => a.wrapping_shr(b as u32),
        "+" => a.wrapping_add(b),
        "-" => a.wrapping_sub(b),
        "*" => a.wrapping_mul(b),
        "/" => a.checked_div(b).ok_or(DirectiveError::DivisionByZero)?,
        "%" => a.checked_rem(b).ok_or(DirectiveError::DivisionByZero)?,
        _ => return Err(DirectiveError::InvalidExpression("if")),
    })
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

fn scan_while(bytes: &[u8], start: usize, pred: impl Fn(u8) -> bool) -> usize {
    let mut end = start;
    while end < bytes.len() && pred(bytes[end]) {
        end += 1;
    }
    end
}

/// Scans a preprocessing number (`1`, `0x1F`, `1.5e-3`, `2.0f`).
fn scan_pp_number(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() {
        let b = bytes[end];
        let exponent_sign =
            (b == b'+' || b == b'-') && end > start && matches!(bytes[end - 1], b'e' | b'E');
        if b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || exponent_sign {
            end += 1;
        } else {
            break;
        }
    }
    end
}

/// Splits a leading identifier off `text`. The identifier is empty if
/// `text` does not start with one.
fn split_identifier(text: &str) -> (&str, &str) {
    let bytes = text.as_bytes();
    if bytes.first().is_some_and(|b| b.is_ascii_digit()) {
        return ("", text);
    }
    let end = scan_while(bytes, 0, |b| b.is_ascii_alphanumeric() || b == b'_');
    text.split_at(end)
}

/// Finds `word` in `text` as a whole identifier.
fn find_word(text: &str, word: &str) -> Option<usize> {
    let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(pos) = text[from..].find(word) {
        let start = from + pos;
        let end = start + word.len();
        let before_ok = start == 0 || !is_ident(bytes[start - 1]);
        let after_ok = end == bytes.len() || !is_ident(bytes[end]);
        if before_ok && after_ok {
            return Some(start);
        }
        from = end;
    }
    None
}

fn check_macro_name(name: &str, rest: &str, directive: &'static str) -> Result<(), DirectiveError> {
    if name.is_empty() {
        return match rest.split_whitespace().next() {
            None => Err(DirectiveError::MissingMacroName(directive)),
            Some(word) => Err(DirectiveError::InvalidMacroName(word.to_string())),
        };
    }
    if name.starts_with("GL_") {
        return Err(DirectiveError::ReservedPrefix);
    }
    if name.contains("__") {
        return Err(DirectiveError::ReservedDoubleUnderscore);
    }
    Ok(())
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim_end_matches(['u', 'U']);
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if text.len() > 1 && text.starts_with('0') {
        i64::from_str_radix(&text[1..], 8).ok()
    } else {
        text.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> (Preprocessed, InfoLog) {
        run_with(source, Dialect::Desktop)
    }

    fn run_with(source: &str, dialect: Dialect) -> (Preprocessed, InfoLog) {
        let ctx = CapabilityContext::new(dialect);
        let mut log = InfoLog::new();
        let out = preprocess(source, &ctx, &mut log);
        (out, log)
    }

    fn lines(out: &Preprocessed) -> Vec<&str> {
        out.source.lines().collect()
    }

    #[test]
    fn comments_are_stripped_and_lines_kept() {
        let (out, log) = run("a // one\n/* two\nthree */ b\nc");
        assert!(log.is_empty());
        assert_eq!(lines(&out), ["a ", " ", " b", "c"]);
    }

    #[test]
    fn continuation_preserves_line_count() {
        let (out, log) = run("#define X 1 \\\n + 2\nX\n");
        assert!(!log.has_errors(), "{log}");
        assert_eq!(lines(&out)[..3], ["", "", "1 + 2"]);
    }

    #[test]
    fn version_directive_selects_version() {
        let (out, log) = run("// header\n#version 120\nvoid main() {}\n");
        assert!(!log.has_errors(), "{log}");
        assert_eq!(out.version.number, 120);
        assert!(!out.version.es);
    }

    #[test]
    fn default_version_per_dialect() {
        let (out, _) = run("void main() {}");
        assert_eq!(out.version, Version::default_for(Dialect::Desktop));
        let (out, _) = run_with("void main() {}", Dialect::Embedded);
        assert_eq!(out.version, Version::default_for(Dialect::Embedded));
    }

    #[test]
    fn version_after_code_is_an_error() {
        let (_, log) = run("float x;\n#version 120\n");
        assert!(log.has_errors());
        assert!(log.to_string().contains("0:2(1): error: #version must appear"));
    }

    #[test]
    fn unsupported_versions() {
        let (_, log) = run("#version 140\n");
        assert!(
            log.to_string()
                .contains("GLSL 1.40 is not supported. Supported versions are: GLSL 1.10")
        );
        let (_, log) = run("#version 100\n");
        assert!(log.has_errors());
        let (out, log) = run_with("#version 100\n", Dialect::Embedded);
        assert!(!log.has_errors(), "{log}");
        assert!(out.version.es);
        let (_, log) = run_with("#version 120\n", Dialect::Embedded);
        assert!(log.has_errors());
    }

    #[test]
    fn object_like_macros_expand_recursively() {
        let (out, log) = run("#define A B + 1\n#define B 2\nA\n");
        assert!(!log.has_errors(), "{log}");
        assert_eq!(lines(&out)[2], "2 + 1");
    }

    #[test]
    fn self_referential_macro_terminates() {
        let (out, log) = run("#define X X + 1\nX\n");
        assert!(!log.has_errors(), "{log}");
        assert_eq!(lines(&out)[1], "X + 1");
    }

    #[test]
    fn function_like_macro_is_rejected() {
        let (_, log) = run("#define F(x) x\n");
        assert!(log.to_string().contains("function-like macro `F'"));
    }

    #[test]
    fn reserved_and_redefined_names() {
        let (_, log) = run("#define GL_FOO 1\n");
        assert!(log.to_string().contains("`GL_' are reserved"));
        let (_, log) = run("#define A__B 1\n");
        assert!(log.to_string().contains("`__' are reserved"));
        let (_, log) = run("#define A 1\n#define A 1\n");
        assert!(!log.has_errors());
        let (_, log) = run("#define A 1\n#define A 2\n");
        assert!(log.to_string().contains("redefinition of macro `A'"));
    }

    #[test]
    fn conditionals_select_groups() {
        let src = "\
#define FOO 2
#if FOO > 1 && defined(FOO)
yes
#elif 1
no1
#else
no2
#endif
#ifndef BAR
bar
#endif
";
        let (out, log) = run(src);
        assert!(!log.has_errors(), "{log}");
        let kept: Vec<_> = lines(&out).into_iter().filter(|l| !l.is_empty()).collect();
        assert_eq!(kept, ["yes", "bar"]);
    }

    #[test]
    fn nested_inactive_groups_are_not_evaluated() {
        let (out, log) = run("#if 0\n#if 1/0\nx\n#endif\n#else\ny\n#endif\n");
        assert!(!log.has_errors(), "{log}");
        assert_eq!(lines(&out)[5], "y");
    }

    #[test]
    fn conditional_errors() {
        let (_, log) = run("#endif\n");
        assert!(log.to_string().contains("#endif without #if"));
        let (_, log) = run("#if 1\n");
        assert!(log.to_string().contains("0:1(1): error: unterminated #if"));
        let (_, log) = run("#if 1\n#else\n#else\n#endif\n");
        assert!(log.to_string().contains("#else after #else"));
        let (_, log) = run("#if 1 / 0\n#endif\n");
        assert!(log.to_string().contains("division by zero"));
    }

    #[test]
    fn undefined_identifier_in_condition() {
        let (out, log) = run("#if UNDEFINED\nx\n#endif\n");
        assert!(!log.has_errors());
        assert!(!out.source.contains('x'));
        let (_, log) = run_with("#if UNDEFINED\n#endif\n", Dialect::Embedded);
        assert!(log.to_string().contains("undefined macro `UNDEFINED'"));
    }

    #[test]
    fn predefined_macros() {
        let (out, log) = run("#version 130\n__VERSION__ __LINE__\n#ifdef GL_ARB_draw_buffers\next\n#endif\n");
        assert!(!log.has_errors(), "{log}");
        assert_eq!(lines(&out)[1], "130 2");
        assert_eq!(lines(&out)[3], "ext");

        let (out, _) = run_with("#ifdef GL_ES\nes\n#endif\n", Dialect::Embedded);
        assert_eq!(lines(&out)[1], "es");
    }

    #[test]
    fn error_directive() {
        let (_, log) = run("#error stop here\n");
        assert_eq!(log.to_string(), "0:1(1): error: #error stop here\n");
        let (_, log) = run("#if 0\n#error skipped\n#endif\n");
        assert!(log.is_empty());
    }

    #[test]
    fn extension_behaviors() {
        let (_, log) = run("#extension GL_ARB_draw_buffers : require\n");
        assert!(log.is_empty());
        let (_, log) = run("#extension GL_FOO_bar : require\n");
        assert!(log.to_string().contains("error: extension `GL_FOO_bar' unsupported"));
        let (_, log) = run("#extension GL_FOO_bar : enable\n");
        assert!(!log.has_errors());
        assert!(log.to_string().contains("warning: extension `GL_FOO_bar' unsupported"));
        let (_, log) = run("#extension all : require\n");
        assert!(log.has_errors());
        let (_, log) = run("#extension all : disable\n");
        assert!(log.is_empty());
        let (_, log) = run("#extension GL_FOO : maybe\n");
        assert!(log.to_string().contains("unknown extension behavior `maybe'"));
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let (_, log) = run("float x; /* no end\n");
        assert!(log.to_string().contains("0:1(10): error: unterminated comment"));
    }

    #[test]
    fn pragma_and_line_are_ignored() {
        let (_, log) = run("#pragma optimize(on)\n#line 10\n#\n");
        assert!(log.is_empty());
        let (_, log) = run("#include \"x.h\"\n");
        assert!(log.to_string().contains("invalid directive `#include'"));
    }
}
