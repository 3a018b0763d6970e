//! Tokenizer for preprocessed GLSL.

use std::fmt;

use glsc_context::Version;
use glsc_ir::SourceLocation;

use crate::SyntaxError;

macro_rules! keywords {
    ($($variant:ident => $name:literal,)*) => {
        /// A reserved word of the language.
        #[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
        pub enum Keyword {
            $($variant,)*
        }

        impl Keyword {
            fn lookup(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// The keyword as written in source.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

keywords! {
    Attribute => "attribute",
    Const => "const",
    Uniform => "uniform",
    Varying => "varying",
    In => "in",
    Out => "out",
    InOut => "inout",
    Centroid => "centroid",
    Flat => "flat",
    Smooth => "smooth",
    NoPerspective => "noperspective",
    Invariant => "invariant",
    Precision => "precision",
    HighP => "highp",
    MediumP => "mediump",
    LowP => "lowp",
    Break => "break",
    Continue => "continue",
    Do => "do",
    For => "for",
    While => "while",
    If => "if",
    Else => "else",
    Discard => "discard",
    Return => "return",
    Struct => "struct",
    Void => "void",
    Bool => "bool",
    Int => "int",
    Float => "float",
    Vec2 => "vec2",
    Vec3 => "vec3",
    Vec4 => "vec4",
    BVec2 => "bvec2",
    BVec3 => "bvec3",
    BVec4 => "bvec4",
    IVec2 => "ivec2",
    IVec3 => "ivec3",
    IVec4 => "ivec4",
    Mat2 => "mat2",
    Mat3 => "mat3",
    Mat4 => "mat4",
    Sampler2D => "sampler2D",
    SamplerCube => "samplerCube",
}

impl Keyword {
    /// Returns `true` if the word is a keyword in `version`; otherwise it
    /// lexes as an identifier.
    fn available(self, version: Version) -> bool {
        match self {
            Self::Centroid | Self::Invariant => version.es || version.number >= 120,
            Self::Flat | Self::Smooth | Self::NoPerspective => !version.es && version.number >= 130,
            Self::Precision | Self::HighP | Self::MediumP | Self::LowP => {
                version.es || version.number >= 130
            }
            _ => true,
        }
    }
}

/// Words reserved for future use; using one is an error.
const RESERVED: &[&str] = &[
    "asm", "class", "union", "enum", "typedef", "template", "this", "packed", "goto", "switch",
    "default", "inline", "noinline", "volatile", "public", "static", "extern", "external",
    "interface", "long", "short", "double", "half", "fixed", "unsigned", "input", "output",
    "hvec2", "hvec3", "hvec4", "dvec2", "dvec3", "dvec4", "fvec2", "fvec3", "fvec4",
    "sampler1D", "sampler3D", "sampler1DShadow", "sampler2DShadow", "sampler2DRect",
    "sampler3DRect", "sampler2DRectShadow", "sizeof", "cast", "namespace", "using",
];

/// Punctuation and operators.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Punct {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Dot,
    Comma,
    Colon,
    Semicolon,
    Question,
    Plus,
    Dash,
    Star,
    Slash,
    Bang,
    Equal,
    EqOp,
    NeOp,
    LeftAngle,
    RightAngle,
    LeOp,
    GeOp,
    AndOp,
    OrOp,
    XorOp,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    IncOp,
    DecOp,
}

/// Longest match first.
const PUNCTUATION: &[(&str, Punct)] = &[
    ("==", Punct::EqOp),
    ("!=", Punct::NeOp),
    ("<=", Punct::LeOp),
    (">=", Punct::GeOp),
    ("&&", Punct::AndOp),
    ("||", Punct::OrOp),
    ("^^", Punct::XorOp),
    ("+=", Punct::AddAssign),
    ("-=", Punct::SubAssign),
    ("*=", Punct::MulAssign),
    ("/=", Punct::DivAssign),
    ("++", Punct::IncOp),
    ("--", Punct::DecOp),
    ("(", Punct::LeftParen),
    (")", Punct::RightParen),
    ("[", Punct::LeftBracket),
    ("]", Punct::RightBracket),
    ("{", Punct::LeftBrace),
    ("}", Punct::RightBrace),
    (".", Punct::Dot),
    (",", Punct::Comma),
    (":", Punct::Colon),
    (";", Punct::Semicolon),
    ("?", Punct::Question),
    ("+", Punct::Plus),
    ("-", Punct::Dash),
    ("*", Punct::Star),
    ("/", Punct::Slash),
    ("!", Punct::Bang),
    ("=", Punct::Equal),
    ("<", Punct::LeftAngle),
    (">", Punct::RightAngle),
];

impl Punct {
    /// The operator as written in source.
    pub fn as_str(self) -> &'static str {
        PUNCTUATION
            .iter()
            .find(|(_, p)| *p == self)
            .map_or("?", |(s, _)| s)
    }
}

/// What a token is.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    IntConstant(i32),
    FloatConstant(f32),
    BoolConstant(bool),
    Keyword(Keyword),
    Punct(Punct),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(name) => write!(f, "identifier `{name}'"),
            Self::IntConstant(v) => write!(f, "integer constant `{v}'"),
            Self::FloatConstant(v) => write!(f, "float constant `{v}'"),
            Self::BoolConstant(v) => write!(f, "`{v}'"),
            Self::Keyword(k) => write!(f, "`{}'", k.as_str()),
            Self::Punct(p) => write!(f, "`{}'", p.as_str()),
            Self::Eof => f.write_str("end of file"),
        }
    }
}

/// A token with the position of its first character.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

/// Splits `source` into tokens. The result always ends with
/// [`TokenKind::Eof`].
pub fn tokenize(source: &str, version: Version) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer {
        source,
        bytes: source.as_bytes(),
        pos: 0,
        line: 1,
        line_start: 0,
        version,
    };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let eof = token.kind == TokenKind::Eof;
        tokens.push(token);
        if eof {
            return Ok(tokens);
        }
    }
}

struct Lexer<'s> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    line: u32,
    line_start: usize,
    version: Version,
}

impl Lexer<'_> {
    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, (self.pos - self.line_start) as u32 + 1)
    }

    fn error(&self, location: SourceLocation, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            location,
            message: message.into(),
        }
    }

    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek_byte(0) {
            match b {
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    self.line_start = self.pos;
                }
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => self.pos += 1,
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_whitespace();
        let location = self.location();
        let Some(b) = self.peek_byte(0) else {
            return Ok(Token {
                kind: TokenKind::Eof,
                location,
            });
        };

        let kind = if b.is_ascii_alphabetic() || b == b'_' {
            self.word(location)?
        } else if b.is_ascii_digit() || (b == b'.' && self.peek_byte(1).is_some_and(|c| c.is_ascii_digit())) {
            self.number(location)?
        } else {
            let rest = &self.source[self.pos..];
            match PUNCTUATION.iter().find(|(s, _)| rest.starts_with(s)) {
                Some(&(text, punct)) => {
                    self.pos += text.len();
                    TokenKind::Punct(punct)
                }
                None => {
                    let c = rest.chars().next().unwrap_or('?');
                    return Err(self.error(location, format!("unexpected character `{c}'")));
                }
            }
        };
        Ok(Token { kind, location })
    }

    fn word(&mut self, location: SourceLocation) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        while self
            .peek_byte(0)
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        let word = &self.source[start..self.pos];

        if let Some(keyword) = Keyword::lookup(word).filter(|k| k.available(self.version)) {
            return Ok(TokenKind::Keyword(keyword));
        }
        match word {
            "true" => Ok(TokenKind::BoolConstant(true)),
            "false" => Ok(TokenKind::BoolConstant(false)),
            _ if RESERVED.contains(&word) => Err(self.error(
                location,
                format!("illegal use of reserved word `{word}'"),
            )),
            _ => Ok(TokenKind::Identifier(word.to_string())),
        }
    }

    fn digits(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek_byte(0).is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn number(&mut self, location: SourceLocation) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;

        if self.peek_byte(0) == Some(b'0') && matches!(self.peek_byte(1), Some(b'x' | b'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            self.digits(|b| b.is_ascii_hexdigit());
            let digits = &self.source[digits_start..self.pos];
            let value = u32::from_str_radix(digits, 16)
                .map_err(|_| self.error(location, "invalid hexadecimal constant"))?;
            return self.finish_integer(location, value);
        }

        self.digits(|b| b.is_ascii_digit());
        let mut is_float = false;
        if self.peek_byte(0) == Some(b'.') {
            is_float = true;
            self.pos += 1;
            self.digits(|b| b.is_ascii_digit());
        }
        if matches!(self.peek_byte(0), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_byte(1), Some(b'+' | b'-')));
            if self.peek_byte(1 + sign).is_some_and(|b| b.is_ascii_digit()) {
                is_float = true;
                self.pos += 1 + sign;
                self.digits(|b| b.is_ascii_digit());
            }
        }
        let text = &self.source[start..self.pos];

        if is_float {
            if matches!(self.peek_byte(0), Some(b'f' | b'F')) && self.version.number >= 130 {
                self.pos += 1;
            }
            let value: f32 = text
                .parse()
                .map_err(|_| self.error(location, format!("invalid float constant `{text}'")))?;
            self.check_suffix(location)?;
            return Ok(TokenKind::FloatConstant(value));
        }

        let value = if text.len() > 1 && text.starts_with('0') {
            u32::from_str_radix(&text[1..], 8)
                .map_err(|_| self.error(location, format!("invalid octal constant `{text}'")))?
        } else {
            text.parse::<u32>()
                .map_err(|_| self.error(location, format!("integer constant `{text}' overflows")))?
        };
        self.finish_integer(location, value)
    }

    fn finish_integer(&mut self, location: SourceLocation, value: u32) -> Result<TokenKind, SyntaxError> {
        self.check_suffix(location)?;
        Ok(TokenKind::IntConstant(value as i32))
    }

    fn check_suffix(&self, location: SourceLocation) -> Result<(), SyntaxError> {
        match self.peek_byte(0) {
            Some(b) if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' => {
                Err(self.error(location, "invalid suffix on numeric constant"))
            }
            _ => Ok(()),
        }
    }
}
