//! The push-side contract: semantic token callbacks and their context.
//!
//! Both parsers drive an [`EventHandler`] with a strictly sequential stream
//! of begin/end-container, member-name and scalar callbacks. The handler owns
//! whatever in-memory representation it wants to build; the parsers never
//! materialize one. Every callback receives a [`ParseContext`] locating the
//! token in the input; the borrowed views (`&str`, `&[u8]`) must not outlive
//! the callback.

/// Side-channel classification on a scalar value, distinguishing wire-level
/// types that share a host representation (e.g. a BSON datetime arrives as an
/// `i64` tagged [`SemanticTag::Timestamp`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SemanticTag {
    /// No additional classification.
    #[default]
    None,
    /// The value is a point in time (BSON datetime and timestamp elements).
    Timestamp,
}

/// Position information passed alongside every handler callback.
///
/// For the JSON parser, `line` and `column` are 1-based text coordinates and
/// `current_char` is the character being consumed. For the BSON parser,
/// `line` is 0 and `column` is the byte offset into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseContext {
    line: usize,
    column: usize,
    current_char: char,
}

impl ParseContext {
    pub(crate) fn new(line: usize, column: usize, current_char: char) -> Self {
        Self {
            line,
            column,
            current_char,
        }
    }

    /// 1-based line of the token being reported (0 for binary input).
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column of the token being reported, or the byte offset for
    /// binary input.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    /// The character under the cursor when the callback fired (`'\0'` when
    /// there is none, e.g. at end of input).
    #[must_use]
    pub fn current_char(&self) -> char {
        self.current_char
    }
}

/// Receiver for the semantic token stream.
///
/// All methods have no-op defaults so handlers only implement what they care
/// about. The `bool` returned from the end-container callbacks is a
/// cooperative cancellation signal: returning `false` makes the parser stop
/// at the nearest safe boundary (see [`crate::JsonParser::restart`]).
pub trait EventHandler {
    /// The start of a JSON text has been recognized.
    fn begin_json(&mut self) {}

    /// The end of a complete JSON text has been recognized.
    fn end_json(&mut self) {}

    /// An object opens.
    fn begin_object(&mut self, _ctx: &ParseContext) -> bool {
        true
    }

    /// An object closes. Return `false` to stop parsing.
    fn end_object(&mut self, _ctx: &ParseContext) -> bool {
        true
    }

    /// An array opens.
    fn begin_array(&mut self, _ctx: &ParseContext) -> bool {
        true
    }

    /// An array closes. Return `false` to stop parsing.
    fn end_array(&mut self, _ctx: &ParseContext) -> bool {
        true
    }

    /// A member name inside an object.
    fn name(&mut self, _name: &str, _ctx: &ParseContext) {}

    /// A string value.
    fn string_value(&mut self, _value: &str, _ctx: &ParseContext) {}

    /// A boolean value.
    fn bool_value(&mut self, _value: bool, _ctx: &ParseContext) {}

    /// A null value.
    fn null_value(&mut self, _ctx: &ParseContext) {}

    /// A signed integer value.
    fn int64_value(&mut self, _value: i64, _tag: SemanticTag, _ctx: &ParseContext) {}

    /// An unsigned integer value that does not fit the signed range.
    fn uint64_value(&mut self, _value: u64, _tag: SemanticTag, _ctx: &ParseContext) {}

    /// A floating-point value. `precision` is the number of significant
    /// decimal digits in the original lexeme (integral digits plus fraction
    /// digits, exponent excluded), so callers can round-trip the lexical
    /// form; it is 0 when the source had no decimal lexeme (binary input).
    fn double_value(&mut self, _value: f64, _precision: u8, _ctx: &ParseContext) {}

    /// A byte-string value (BSON binary, subtype byte included as the first
    /// payload byte).
    fn byte_string_value(&mut self, _bytes: &[u8], _tag: SemanticTag, _ctx: &ParseContext) {}
}
