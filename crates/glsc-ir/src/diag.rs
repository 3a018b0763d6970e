//! The append-only diagnostic log shared by all compilation stages.

use std::fmt;

/// A position in preprocessed source text (1-based).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceLocation {
    /// Line number.
    pub line: u32,
    /// Column number.
    pub column: u32,
}

impl SourceLocation {
    /// Creates a location.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Severity of a logged message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Fails the stage that reported it.
    Error,
    /// Informational; does not affect status.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
        })
    }
}

/// A single log entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// How serious the message is.
    pub severity: Severity,
    /// Where in the source it was reported, if anywhere.
    pub location: Option<SourceLocation>,
    /// Human-readable text.
    pub text: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "0:{}({}): {}: {}",
                loc.line, loc.column, self.severity, self.text
            ),
            None => write!(f, "{}: {}", self.severity, self.text),
        }
    }
}

/// Ordered, append-only diagnostics for one shader or one link.
///
/// Messages are never removed or reordered; [`InfoLog::has_errors`] is the
/// error flag the pipeline consults between stages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfoLog {
    messages: Vec<Message>,
}

impl InfoLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error.
    pub fn error(&mut self, location: Option<SourceLocation>, text: impl Into<String>) {
        self.push(Severity::Error, location, text.into());
    }

    /// Appends a warning.
    pub fn warning(&mut self, location: Option<SourceLocation>, text: impl Into<String>) {
        self.push(Severity::Warning, location, text.into());
    }

    fn push(&mut self, severity: Severity, location: Option<SourceLocation>, text: String) {
        self.messages.push(Message {
            severity,
            location,
            text,
        });
    }

    /// Appends every message of `other`, preserving order.
    pub fn extend(&mut self, other: InfoLog) {
        self.messages.extend(other.messages);
    }

    /// Returns `true` if any error was logged.
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity == Severity::Error)
    }

    /// Number of logged errors.
    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Error)
            .count()
    }

    /// Returns `true` if nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Messages in the order they were logged.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

impl fmt::Display for InfoLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.messages {
            writeln!(f, "{message}")?;
        }
        Ok(())
    }
}
