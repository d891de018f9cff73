//! Diagnostics: the closed error-code set, positioned errors, and the
//! error-handler seam that decides whether parsing recovers or aborts.

use alloc::vec::Vec;

use log::debug;
use thiserror::Error;

use crate::handler::ParseContext;

/// The closed set of diagnostics the parsers can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("extra non-whitespace character after JSON text")]
    ExtraCharacter,
    #[error("illegal control character in string")]
    IllegalControlCharacter,
    #[error("illegal character in string")]
    IllegalCharacterInString,
    #[error("maximum nesting depth exceeded")]
    MaxDepthExceeded,
    #[error("unexpected right brace '}}'")]
    UnexpectedRightBrace,
    #[error("unexpected right bracket ']'")]
    UnexpectedRightBracket,
    #[error("invalid JSON text")]
    InvalidJsonText,
    #[error("expected comma or right brace '}}'")]
    ExpectedCommaOrRightBrace,
    #[error("expected comma or right bracket ']'")]
    ExpectedCommaOrRightBracket,
    #[error("single quote where a double quote is required")]
    SingleQuote,
    #[error("expected member name")]
    ExpectedName,
    #[error("expected colon")]
    ExpectedColon,
    #[error("extra comma")]
    ExtraComma,
    #[error("expected value")]
    ExpectedValue,
    #[error("expected codepoint surrogate pair")]
    ExpectedCodepointSurrogatePair,
    #[error("invalid hex escape sequence")]
    InvalidHexEscapeSequence,
    #[error("illegal escaped character")]
    IllegalEscapedCharacter,
    #[error("invalid value")]
    InvalidValue,
    #[error("invalid number")]
    InvalidNumber,
    #[error("leading zero in number")]
    LeadingZero,
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("source error")]
    SourceError,
    #[error("invalid UTF-8 text string")]
    InvalidUtf8TextString,
}

/// A diagnostic positioned in the input.
///
/// `line` and `column` point at the byte whose consumption produced the
/// diagnostic; for binary input `line` is 0 and `column` is the byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at {line}:{column}")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub(crate) fn at(kind: ErrorKind, ctx: &ParseContext) -> Self {
        Self {
            kind,
            line: ctx.line(),
            column: ctx.column(),
        }
    }
}

/// Receiver for parser diagnostics, deciding whether parsing continues.
///
/// [`error`](Self::error) is invoked for recoverable diagnostics; returning
/// `Ok(())` lets the parser apply its local repair and continue, returning
/// `Err` aborts the parse. [`fatal_error`](Self::fatal_error) is invoked
/// when the parser cannot continue meaningfully; the returned error is
/// always propagated.
pub trait ErrorHandler {
    /// A recoverable diagnostic. `Ok(())` means recover and continue.
    fn error(&mut self, kind: ErrorKind, ctx: &ParseContext) -> Result<(), ParseError>;

    /// A fatal diagnostic. The returned error aborts the parse.
    fn fatal_error(&mut self, kind: ErrorKind, ctx: &ParseContext) -> ParseError;
}

/// The default error handler: every diagnostic, recoverable or not, aborts
/// the parse.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailFast;

impl ErrorHandler for FailFast {
    fn error(&mut self, kind: ErrorKind, ctx: &ParseContext) -> Result<(), ParseError> {
        Err(ParseError::at(kind, ctx))
    }

    fn fatal_error(&mut self, kind: ErrorKind, ctx: &ParseContext) -> ParseError {
        ParseError::at(kind, ctx)
    }
}

/// An error handler that swallows recoverable diagnostics, recording them
/// for later inspection, so the parser produces a best-effort event stream
/// and as many diagnostics as possible in one pass.
#[derive(Debug, Clone, Default)]
pub struct Recovering {
    diagnostics: Vec<ParseError>,
}

impl Recovering {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The diagnostics recorded so far, in input order.
    #[must_use]
    pub fn diagnostics(&self) -> &[ParseError] {
        &self.diagnostics
    }

    /// Consumes the handler, returning the recorded diagnostics.
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<ParseError> {
        self.diagnostics
    }
}

impl ErrorHandler for Recovering {
    fn error(&mut self, kind: ErrorKind, ctx: &ParseContext) -> Result<(), ParseError> {
        let err = ParseError::at(kind, ctx);
        debug!("recovering from {err}");
        self.diagnostics.push(err);
        Ok(())
    }

    fn fatal_error(&mut self, kind: ErrorKind, ctx: &ParseContext) -> ParseError {
        ParseError::at(kind, ctx)
    }
}
