//! The incremental JSON parser.
//!
//! [`JsonParser`] drives an [`EventHandler`] over arbitrarily chunked input:
//! [`parse`](JsonParser::parse) consumes one chunk and returns when the
//! chunk is exhausted or the document is complete, and a later call resumes
//! from the saved state. A final [`end_parse`](JsonParser::end_parse)
//! flushes any trailing number and reports `UnexpectedEof` if the document
//! never completed.
//!
//! The machine is an explicit stack of [`State`] tags; the bottom entry is
//! always [`State::Root`], container frames sit under the state that scans
//! their contents, and the top entry is what the next input byte is matched
//! against. Comments (`//` and `/* */`) are accepted anywhere whitespace is.
//!
//! # Examples
//!
//! ```rust
//! use eventson::{EventHandler, FailFast, JsonParser, ParseContext, ParserOptions};
//!
//! #[derive(Default)]
//! struct Keys(Vec<String>);
//!
//! impl EventHandler for Keys {
//!     fn name(&mut self, name: &str, _ctx: &ParseContext) {
//!         self.0.push(name.to_string());
//!     }
//! }
//!
//! let mut parser = JsonParser::default();
//! let mut keys = Keys::default();
//! let mut errors = FailFast;
//! parser.parse(r#"{"a": 1, "#, &mut keys, &mut errors).unwrap();
//! parser.parse(r#""b": 2}"#, &mut keys, &mut errors).unwrap();
//! parser.end_parse(&mut keys, &mut errors).unwrap();
//! assert_eq!(keys.0, ["a", "b"]);
//! ```

use alloc::{string::String, vec::Vec};

use log::debug;

use crate::{
    error::{ErrorHandler, ErrorKind, ParseError},
    escape_buffer::{self, CodepointBuffer},
    handler::{EventHandler, ParseContext, SemanticTag},
    literal_buffer::{Literal, LiteralBuffer},
    numbers,
    options::ParserOptions,
};

/// Parser state tags. The bottom of the stack is always [`Root`](State::Root);
/// [`Object`](State::Object), [`Array`](State::Array) and
/// [`MemberName`](State::MemberName) act as frame markers under the state
/// that scans their contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Root,
    Start,
    Slash,
    SlashSlash,
    SlashStar,
    SlashStarStar,
    ExpectCommaOrEnd,
    Object,
    ExpectMemberNameOrEnd,
    ExpectMemberName,
    ExpectColon,
    ExpectValue,
    Array,
    String,
    MemberName,
    Escape,
    U1,
    U2,
    U3,
    U4,
    ExpectSurrogatePair1,
    ExpectSurrogatePair2,
    U6,
    U7,
    U8,
    U9,
    Minus,
    Zero,
    Integer,
    Fraction,
    Exp1,
    Exp2,
    Exp3,
    N,
    T,
    F,
    Cr,
    Lf,
    Done,
}

/// The incremental JSON parser. See the [module documentation](self).
#[derive(Debug)]
pub struct JsonParser {
    stack: Vec<State>,
    line: usize,
    column: usize,
    index: usize,

    string_buffer: String,
    number_buffer: String,
    is_negative: bool,
    precision: u8,

    cp: CodepointBuffer,
    cp2: CodepointBuffer,
    literal: LiteralBuffer,

    nesting_depth: usize,
    max_depth: usize,
    depth_exceeded: bool,

    proceed: bool,
}

impl Default for JsonParser {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

impl JsonParser {
    /// Creates a parser ready to accept the first chunk.
    #[must_use]
    pub fn new(options: ParserOptions) -> Self {
        let mut parser = Self {
            stack: Vec::with_capacity(options.initial_stack_capacity),
            line: 1,
            column: 1,
            index: 0,
            string_buffer: String::new(),
            number_buffer: String::new(),
            is_negative: false,
            precision: 0,
            cp: CodepointBuffer::default(),
            cp2: CodepointBuffer::default(),
            literal: LiteralBuffer::new(Literal::Null),
            nesting_depth: 0,
            max_depth: options.max_nesting_depth,
            depth_exceeded: false,
            proceed: true,
        };
        parser.begin_parse();
        parser
    }

    /// Re-initializes the parser for a new document. Accumulator buffers
    /// are retained for reuse.
    pub fn begin_parse(&mut self) {
        self.stack.clear();
        self.stack.push(State::Root);
        self.stack.push(State::Start);
        self.line = 1;
        self.column = 1;
        self.index = 0;
        self.string_buffer.clear();
        self.number_buffer.clear();
        self.is_negative = false;
        self.precision = 0;
        self.nesting_depth = 0;
        self.depth_exceeded = false;
        self.proceed = true;
    }

    /// Whether the machine has reached its terminal state.
    #[must_use]
    pub fn done(&self) -> bool {
        self.top() == State::Done
    }

    /// Whether a handler callback requested cancellation.
    #[must_use]
    pub fn stopped(&self) -> bool {
        !self.proceed
    }

    /// Clears a handler-requested cancellation so [`parse`](Self::parse)
    /// can resume.
    pub fn restart(&mut self) {
        self.proceed = true;
    }

    /// The current (top-of-stack) state.
    #[must_use]
    pub fn state(&self) -> State {
        self.top()
    }

    /// Total number of input bytes consumed across all chunks.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based line of the next byte to be consumed.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column of the next byte to be consumed.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    /// The configured maximum nesting depth.
    #[must_use]
    pub fn max_nesting_depth(&self) -> usize {
        self.max_depth
    }

    /// Reconfigures the maximum nesting depth.
    pub fn set_max_nesting_depth(&mut self, depth: usize) {
        self.max_depth = depth;
    }

    /// Advances the machine over one chunk.
    ///
    /// Returns when the chunk is exhausted, the machine reaches its
    /// terminal state, a handler callback requests cancellation, or the
    /// error handler aborts. The parser is resumable: a later call
    /// continues from the saved state, so tokens may span chunk
    /// boundaries arbitrarily.
    ///
    /// # Errors
    ///
    /// Whatever the error handler turns into an abort: every diagnostic
    /// under [`FailFast`](crate::FailFast), only fatal ones under
    /// [`Recovering`](crate::Recovering).
    pub fn parse<H, E>(
        &mut self,
        input: &str,
        handler: &mut H,
        errors: &mut E,
    ) -> Result<(), ParseError>
    where
        H: EventHandler + ?Sized,
        E: ErrorHandler + ?Sized,
    {
        let bytes = input.as_bytes();
        let mut p = 0usize;

        while p < bytes.len() && self.proceed && self.top() != State::Done {
            match self.top() {
                State::Cr => {
                    self.line += 1;
                    self.column = 1;
                    self.pop_state();
                    if bytes[p] == b'\n' {
                        p += 1;
                    }
                }

                State::Lf => {
                    self.line += 1;
                    self.column = 1;
                    self.pop_state();
                }

                State::Start => {
                    let c = bytes[p];
                    match c {
                        b'\r' => self.stack.push(State::Cr),
                        b'\n' => self.stack.push(State::Lf),
                        b' ' | b'\t' => p += skip_spaces(bytes, p, &mut self.column),
                        b'/' => self.stack.push(State::Slash),
                        b'{' => {
                            self.push_depth(errors, c)?;
                            handler.begin_json();
                            self.set_top(State::Object);
                            self.stack.push(State::ExpectMemberNameOrEnd);
                            handler.begin_object(&self.ctx(c));
                        }
                        b'[' => {
                            self.push_depth(errors, c)?;
                            handler.begin_json();
                            self.set_top(State::Array);
                            self.stack.push(State::Array);
                            handler.begin_array(&self.ctx(c));
                        }
                        b'"' => {
                            handler.begin_json();
                            self.set_top(State::String);
                        }
                        b'-' => {
                            handler.begin_json();
                            self.is_negative = true;
                            self.set_top(State::Minus);
                        }
                        b'0' => {
                            handler.begin_json();
                            self.number_buffer.push('0');
                            self.set_top(State::Zero);
                        }
                        b'1'..=b'9' => {
                            handler.begin_json();
                            self.number_buffer.push(c as char);
                            self.set_top(State::Integer);
                        }
                        b'f' => {
                            handler.begin_json();
                            self.set_top(State::F);
                            self.literal = LiteralBuffer::new(Literal::False);
                        }
                        b'n' => {
                            handler.begin_json();
                            self.set_top(State::N);
                            self.literal = LiteralBuffer::new(Literal::Null);
                        }
                        b't' => {
                            handler.begin_json();
                            self.set_top(State::T);
                            self.literal = LiteralBuffer::new(Literal::True);
                        }
                        b'}' => {
                            return Err(
                                errors.fatal_error(ErrorKind::UnexpectedRightBrace, &self.ctx(c))
                            );
                        }
                        b']' => {
                            return Err(
                                errors.fatal_error(ErrorKind::UnexpectedRightBracket, &self.ctx(c))
                            );
                        }
                        _ => {
                            return Err(
                                errors.fatal_error(ErrorKind::InvalidJsonText, &self.ctx(c))
                            );
                        }
                    }
                    p += 1;
                    self.column += 1;
                }

                State::ExpectCommaOrEnd => {
                    let c = bytes[p];
                    match c {
                        b'\r' => self.stack.push(State::Cr),
                        b'\n' => self.stack.push(State::Lf),
                        b' ' | b'\t' => p += skip_spaces(bytes, p, &mut self.column),
                        b'/' => self.stack.push(State::Slash),
                        b'}' => self.close_object(handler, errors, c)?,
                        b']' => self.close_array(handler, errors, c)?,
                        b',' => self.begin_member_or_element(errors, c)?,
                        _ => {
                            debug_assert!(self.stack.len() >= 2);
                            match self.stack[self.stack.len() - 2] {
                                State::Array => errors
                                    .error(ErrorKind::ExpectedCommaOrRightBracket, &self.ctx(c))?,
                                State::Object => errors
                                    .error(ErrorKind::ExpectedCommaOrRightBrace, &self.ctx(c))?,
                                _ => {}
                            }
                        }
                    }
                    p += 1;
                    self.column += 1;
                }

                State::ExpectMemberNameOrEnd => {
                    let c = bytes[p];
                    match c {
                        b'\r' => self.stack.push(State::Cr),
                        b'\n' => self.stack.push(State::Lf),
                        b' ' | b'\t' => p += skip_spaces(bytes, p, &mut self.column),
                        b'/' => self.stack.push(State::Slash),
                        b'}' => self.close_object(handler, errors, c)?,
                        b'"' => {
                            self.set_top(State::MemberName);
                            self.stack.push(State::String);
                        }
                        b'\'' => errors.error(ErrorKind::SingleQuote, &self.ctx(c))?,
                        _ => errors.error(ErrorKind::ExpectedName, &self.ctx(c))?,
                    }
                    p += 1;
                    self.column += 1;
                }

                State::ExpectMemberName => {
                    let c = bytes[p];
                    match c {
                        b'\r' => self.stack.push(State::Cr),
                        b'\n' => self.stack.push(State::Lf),
                        b' ' | b'\t' => p += skip_spaces(bytes, p, &mut self.column),
                        b'/' => self.stack.push(State::Slash),
                        b'"' => {
                            self.set_top(State::MemberName);
                            self.stack.push(State::String);
                        }
                        b'}' => {
                            self.pop_depth();
                            errors.error(ErrorKind::ExtraComma, &self.ctx(c))?;
                        }
                        b'\'' => errors.error(ErrorKind::SingleQuote, &self.ctx(c))?,
                        _ => errors.error(ErrorKind::ExpectedName, &self.ctx(c))?,
                    }
                    p += 1;
                    self.column += 1;
                }

                State::ExpectColon => {
                    let c = bytes[p];
                    match c {
                        b'\r' => self.stack.push(State::Cr),
                        b'\n' => self.stack.push(State::Lf),
                        b' ' | b'\t' => p += skip_spaces(bytes, p, &mut self.column),
                        b'/' => self.stack.push(State::Slash),
                        b':' => self.set_top(State::ExpectValue),
                        _ => errors.error(ErrorKind::ExpectedColon, &self.ctx(c))?,
                    }
                    p += 1;
                    self.column += 1;
                }

                State::ExpectValue => {
                    let c = bytes[p];
                    match c {
                        b'\r' => self.stack.push(State::Cr),
                        b'\n' => self.stack.push(State::Lf),
                        b' ' | b'\t' => p += skip_spaces(bytes, p, &mut self.column),
                        b'/' => self.stack.push(State::Slash),
                        b'{' => {
                            self.push_depth(errors, c)?;
                            self.set_top(State::Object);
                            self.stack.push(State::ExpectMemberNameOrEnd);
                            handler.begin_object(&self.ctx(c));
                        }
                        b'[' => {
                            self.push_depth(errors, c)?;
                            self.set_top(State::Array);
                            self.stack.push(State::Array);
                            handler.begin_array(&self.ctx(c));
                        }
                        b'"' => self.set_top(State::String),
                        b'-' => {
                            self.is_negative = true;
                            self.set_top(State::Minus);
                        }
                        b'0' => {
                            self.number_buffer.push('0');
                            self.set_top(State::Zero);
                        }
                        b'1'..=b'9' => {
                            self.number_buffer.push(c as char);
                            self.set_top(State::Integer);
                        }
                        b'f' => {
                            self.set_top(State::F);
                            self.literal = LiteralBuffer::new(Literal::False);
                        }
                        b'n' => {
                            self.set_top(State::N);
                            self.literal = LiteralBuffer::new(Literal::Null);
                        }
                        b't' => {
                            self.set_top(State::T);
                            self.literal = LiteralBuffer::new(Literal::True);
                        }
                        b']' => {
                            debug_assert!(self.stack.len() >= 2);
                            if self.stack[self.stack.len() - 2] == State::Array {
                                errors.error(ErrorKind::ExtraComma, &self.ctx(c))?;
                            } else {
                                errors.error(ErrorKind::ExpectedValue, &self.ctx(c))?;
                            }
                        }
                        b'\'' => errors.error(ErrorKind::SingleQuote, &self.ctx(c))?,
                        _ => errors.error(ErrorKind::ExpectedValue, &self.ctx(c))?,
                    }
                    p += 1;
                    self.column += 1;
                }

                State::Array => {
                    let c = bytes[p];
                    match c {
                        b'\r' => self.stack.push(State::Cr),
                        b'\n' => self.stack.push(State::Lf),
                        b' ' | b'\t' => p += skip_spaces(bytes, p, &mut self.column),
                        b'/' => self.stack.push(State::Slash),
                        b'{' => {
                            self.push_depth(errors, c)?;
                            self.set_top(State::Object);
                            self.stack.push(State::ExpectMemberNameOrEnd);
                            handler.begin_object(&self.ctx(c));
                        }
                        b'[' => {
                            self.push_depth(errors, c)?;
                            self.set_top(State::Array);
                            self.stack.push(State::Array);
                            handler.begin_array(&self.ctx(c));
                        }
                        b']' => self.close_array(handler, errors, c)?,
                        b'"' => self.set_top(State::String),
                        b'-' => {
                            self.is_negative = true;
                            self.set_top(State::Minus);
                        }
                        b'0' => {
                            self.number_buffer.push('0');
                            self.set_top(State::Zero);
                        }
                        b'1'..=b'9' => {
                            self.number_buffer.push(c as char);
                            self.set_top(State::Integer);
                        }
                        b'f' => {
                            self.set_top(State::F);
                            self.literal = LiteralBuffer::new(Literal::False);
                        }
                        b'n' => {
                            self.set_top(State::N);
                            self.literal = LiteralBuffer::new(Literal::Null);
                        }
                        b't' => {
                            self.set_top(State::T);
                            self.literal = LiteralBuffer::new(Literal::True);
                        }
                        b'\'' => errors.error(ErrorKind::SingleQuote, &self.ctx(c))?,
                        _ => errors.error(ErrorKind::ExpectedValue, &self.ctx(c))?,
                    }
                    p += 1;
                    self.column += 1;
                }

                State::String => {
                    p = self.parse_string_run(input, p, handler, errors)?;
                }

                State::Escape => {
                    self.escape_next_char(bytes[p], errors)?;
                    p += 1;
                    self.column += 1;
                }

                State::U1 | State::U2 | State::U3 => {
                    let c = bytes[p];
                    if !self.cp.push_hex(c) {
                        errors.error(ErrorKind::InvalidHexEscapeSequence, &self.ctx(c))?;
                    }
                    self.set_top(match self.top() {
                        State::U1 => State::U2,
                        State::U2 => State::U3,
                        _ => State::U4,
                    });
                    p += 1;
                    self.column += 1;
                }

                State::U4 => {
                    let c = bytes[p];
                    if !self.cp.push_hex(c) {
                        errors.error(ErrorKind::InvalidHexEscapeSequence, &self.ctx(c))?;
                    }
                    if self.cp.is_lead_surrogate() {
                        self.set_top(State::ExpectSurrogatePair1);
                    } else {
                        if !escape_buffer::push_scalar(self.cp.get(), &mut self.string_buffer) {
                            errors.error(ErrorKind::InvalidHexEscapeSequence, &self.ctx(c))?;
                        }
                        self.set_top(State::String);
                    }
                    p += 1;
                    self.column += 1;
                }

                State::ExpectSurrogatePair1 => {
                    let c = bytes[p];
                    match c {
                        b'\\' => {
                            self.cp2.reset();
                            self.set_top(State::ExpectSurrogatePair2);
                        }
                        _ => {
                            errors.error(ErrorKind::ExpectedCodepointSurrogatePair, &self.ctx(c))?;
                        }
                    }
                    p += 1;
                    self.column += 1;
                }

                State::ExpectSurrogatePair2 => {
                    let c = bytes[p];
                    match c {
                        b'u' => self.set_top(State::U6),
                        _ => {
                            errors.error(ErrorKind::ExpectedCodepointSurrogatePair, &self.ctx(c))?;
                        }
                    }
                    p += 1;
                    self.column += 1;
                }

                State::U6 | State::U7 | State::U8 => {
                    let c = bytes[p];
                    if !self.cp2.push_hex(c) {
                        errors.error(ErrorKind::InvalidHexEscapeSequence, &self.ctx(c))?;
                    }
                    self.set_top(match self.top() {
                        State::U6 => State::U7,
                        State::U7 => State::U8,
                        _ => State::U9,
                    });
                    p += 1;
                    self.column += 1;
                }

                State::U9 => {
                    let c = bytes[p];
                    if !self.cp2.push_hex(c) {
                        errors.error(ErrorKind::InvalidHexEscapeSequence, &self.ctx(c))?;
                    }
                    let cp = escape_buffer::combine_surrogates(self.cp, self.cp2);
                    if !escape_buffer::push_scalar(cp, &mut self.string_buffer) {
                        errors.error(ErrorKind::InvalidHexEscapeSequence, &self.ctx(c))?;
                    }
                    self.set_top(State::String);
                    p += 1;
                    self.column += 1;
                }

                State::Minus => {
                    let c = bytes[p];
                    match c {
                        b'0' => {
                            self.number_buffer.push('0');
                            self.set_top(State::Zero);
                        }
                        b'1'..=b'9' => {
                            self.number_buffer.push(c as char);
                            self.set_top(State::Integer);
                        }
                        _ => errors.error(ErrorKind::ExpectedValue, &self.ctx(c))?,
                    }
                    p += 1;
                    self.column += 1;
                }

                State::Zero => {
                    let c = bytes[p];
                    match c {
                        b'\r' => {
                            self.end_integer_value(handler, errors, c)?;
                            self.stack.push(State::Cr);
                        }
                        b'\n' => {
                            self.end_integer_value(handler, errors, c)?;
                            self.stack.push(State::Lf);
                        }
                        b' ' | b'\t' => {
                            self.end_integer_value(handler, errors, c)?;
                            p += skip_spaces(bytes, p, &mut self.column);
                        }
                        b'/' => {
                            self.end_integer_value(handler, errors, c)?;
                            self.stack.push(State::Slash);
                        }
                        b'}' => {
                            self.end_integer_value(handler, errors, c)?;
                            self.close_object(handler, errors, c)?;
                        }
                        b']' => {
                            self.end_integer_value(handler, errors, c)?;
                            self.close_array(handler, errors, c)?;
                        }
                        b'.' => {
                            self.precision = digit_count(&self.number_buffer);
                            self.number_buffer.push('.');
                            self.set_top(State::Fraction);
                        }
                        b'e' | b'E' => {
                            self.precision = digit_count(&self.number_buffer);
                            self.number_buffer.push(c as char);
                            self.set_top(State::Exp1);
                        }
                        b',' => {
                            self.end_integer_value(handler, errors, c)?;
                            self.begin_member_or_element(errors, c)?;
                        }
                        b'0'..=b'9' => errors.error(ErrorKind::LeadingZero, &self.ctx(c))?,
                        _ => errors.error(ErrorKind::InvalidNumber, &self.ctx(c))?,
                    }
                    p += 1;
                    self.column += 1;
                }

                State::Integer => {
                    let c = bytes[p];
                    match c {
                        b'\r' => {
                            self.end_integer_value(handler, errors, c)?;
                            self.stack.push(State::Cr);
                        }
                        b'\n' => {
                            self.end_integer_value(handler, errors, c)?;
                            self.stack.push(State::Lf);
                        }
                        b' ' | b'\t' => {
                            self.end_integer_value(handler, errors, c)?;
                            p += skip_spaces(bytes, p, &mut self.column);
                        }
                        b'/' => {
                            self.end_integer_value(handler, errors, c)?;
                            self.stack.push(State::Slash);
                        }
                        b'}' => {
                            self.end_integer_value(handler, errors, c)?;
                            self.close_object(handler, errors, c)?;
                        }
                        b']' => {
                            self.end_integer_value(handler, errors, c)?;
                            self.close_array(handler, errors, c)?;
                        }
                        b'0'..=b'9' => self.number_buffer.push(c as char),
                        b'.' => {
                            self.precision = digit_count(&self.number_buffer);
                            self.number_buffer.push('.');
                            self.set_top(State::Fraction);
                        }
                        b',' => {
                            self.end_integer_value(handler, errors, c)?;
                            self.begin_member_or_element(errors, c)?;
                        }
                        b'e' | b'E' => {
                            // No decimal point was seen, so the whole buffer
                            // is integral digits.
                            self.precision = digit_count(&self.number_buffer);
                            self.number_buffer.push(c as char);
                            self.set_top(State::Exp1);
                        }
                        _ => errors.error(ErrorKind::InvalidNumber, &self.ctx(c))?,
                    }
                    p += 1;
                    self.column += 1;
                }

                State::Fraction => {
                    let c = bytes[p];
                    match c {
                        b'\r' => {
                            self.end_fraction_value(handler, errors, c)?;
                            self.stack.push(State::Cr);
                        }
                        b'\n' => {
                            self.end_fraction_value(handler, errors, c)?;
                            self.stack.push(State::Lf);
                        }
                        b' ' | b'\t' => {
                            self.end_fraction_value(handler, errors, c)?;
                            p += skip_spaces(bytes, p, &mut self.column);
                        }
                        b'/' => {
                            self.end_fraction_value(handler, errors, c)?;
                            self.stack.push(State::Slash);
                        }
                        b'}' => {
                            self.end_fraction_value(handler, errors, c)?;
                            self.close_object(handler, errors, c)?;
                        }
                        b']' => {
                            self.end_fraction_value(handler, errors, c)?;
                            self.close_array(handler, errors, c)?;
                        }
                        b'0'..=b'9' => {
                            self.precision = self.precision.saturating_add(1);
                            self.number_buffer.push(c as char);
                        }
                        b',' => {
                            self.end_fraction_value(handler, errors, c)?;
                            self.begin_member_or_element(errors, c)?;
                        }
                        b'e' | b'E' => {
                            self.number_buffer.push(c as char);
                            self.set_top(State::Exp1);
                        }
                        _ => errors.error(ErrorKind::InvalidNumber, &self.ctx(c))?,
                    }
                    p += 1;
                    self.column += 1;
                }

                State::Exp1 => {
                    let c = bytes[p];
                    match c {
                        b'+' => self.set_top(State::Exp2),
                        b'-' => {
                            self.number_buffer.push('-');
                            self.set_top(State::Exp2);
                        }
                        b'0'..=b'9' => {
                            self.number_buffer.push(c as char);
                            self.set_top(State::Exp3);
                        }
                        _ => errors.error(ErrorKind::ExpectedValue, &self.ctx(c))?,
                    }
                    p += 1;
                    self.column += 1;
                }

                State::Exp2 => {
                    let c = bytes[p];
                    match c {
                        b'0'..=b'9' => {
                            self.number_buffer.push(c as char);
                            self.set_top(State::Exp3);
                        }
                        _ => errors.error(ErrorKind::ExpectedValue, &self.ctx(c))?,
                    }
                    p += 1;
                    self.column += 1;
                }

                State::Exp3 => {
                    let c = bytes[p];
                    match c {
                        b'\r' => {
                            self.end_fraction_value(handler, errors, c)?;
                            self.stack.push(State::Cr);
                        }
                        b'\n' => {
                            self.end_fraction_value(handler, errors, c)?;
                            self.stack.push(State::Lf);
                        }
                        b' ' | b'\t' => {
                            self.end_fraction_value(handler, errors, c)?;
                            p += skip_spaces(bytes, p, &mut self.column);
                        }
                        b'/' => {
                            self.end_fraction_value(handler, errors, c)?;
                            self.stack.push(State::Slash);
                        }
                        b'}' => {
                            self.end_fraction_value(handler, errors, c)?;
                            self.close_object(handler, errors, c)?;
                        }
                        b']' => {
                            self.end_fraction_value(handler, errors, c)?;
                            self.close_array(handler, errors, c)?;
                        }
                        b',' => {
                            self.end_fraction_value(handler, errors, c)?;
                            self.begin_member_or_element(errors, c)?;
                        }
                        b'0'..=b'9' => self.number_buffer.push(c as char),
                        _ => errors.error(ErrorKind::InvalidNumber, &self.ctx(c))?,
                    }
                    p += 1;
                    self.column += 1;
                }

                State::T | State::F | State::N => {
                    while p < bytes.len() && !self.literal.is_complete() {
                        let c = bytes[p];
                        if !self.literal.step(c) {
                            errors.error(ErrorKind::InvalidValue, &self.ctx(c))?;
                        }
                        p += 1;
                        self.column += 1;
                    }
                    if self.literal.is_complete() {
                        let ctx = self.ctx(0);
                        match self.literal.kind() {
                            Literal::True => handler.bool_value(true, &ctx),
                            Literal::False => handler.bool_value(false, &ctx),
                            Literal::Null => handler.null_value(&ctx),
                        }
                        self.leave_frame(handler);
                    }
                }

                State::Slash => {
                    let c = bytes[p];
                    match c {
                        b'*' => self.set_top(State::SlashStar),
                        b'/' => self.set_top(State::SlashSlash),
                        _ => errors.error(ErrorKind::InvalidJsonText, &self.ctx(c))?,
                    }
                    p += 1;
                    self.column += 1;
                }

                State::SlashStar => {
                    match bytes[p] {
                        b'\r' => self.stack.push(State::Cr),
                        b'\n' => self.stack.push(State::Lf),
                        b'*' => self.set_top(State::SlashStarStar),
                        _ => {}
                    }
                    p += 1;
                    self.column += 1;
                }

                State::SlashSlash => {
                    match bytes[p] {
                        b'\r' => self.set_top(State::Cr),
                        b'\n' => self.set_top(State::Lf),
                        _ => {}
                    }
                    p += 1;
                    self.column += 1;
                }

                State::SlashStarStar => {
                    match bytes[p] {
                        b'/' => self.pop_state(),
                        _ => self.set_top(State::SlashStar),
                    }
                    p += 1;
                    self.column += 1;
                }

                State::Root | State::Object | State::MemberName | State::Done => {
                    debug_assert!(false, "bad parser state: {:?}", self.top());
                    return Err(
                        errors.fatal_error(ErrorKind::InvalidJsonText, &self.ctx(bytes[p]))
                    );
                }
            }
        }

        self.index += p;
        Ok(())
    }

    /// Marks the end of input: flushes a trailing top-level number and
    /// reports `UnexpectedEof` if the document never reached its terminal
    /// state.
    ///
    /// # Errors
    ///
    /// Whatever the error handler turns into an abort.
    pub fn end_parse<H, E>(&mut self, handler: &mut H, errors: &mut E) -> Result<(), ParseError>
    where
        H: EventHandler + ?Sized,
        E: ErrorHandler + ?Sized,
    {
        if self.stack.len() < 2 {
            // Already ended and collapsed.
            return Ok(());
        }

        // A line break as the very last byte leaves its state parked on the
        // stack; resolve it before looking at what is underneath.
        while matches!(self.top(), State::Cr | State::Lf) {
            self.line += 1;
            self.column = 1;
            self.pop_state();
        }

        debug_assert!(self.stack.len() >= 2);
        if self.stack[self.stack.len() - 2] == State::Root {
            match self.top() {
                State::Zero | State::Integer => self.end_integer_value(handler, errors, 0)?,
                State::Fraction | State::Exp3 => self.end_fraction_value(handler, errors, 0)?,
                _ => {}
            }
        }

        if self.top() == State::Done {
            // Collapse to the terminal state alone.
            self.stack.clear();
            self.stack.push(State::Done);
        } else {
            errors.error(ErrorKind::UnexpectedEof, &self.ctx(0))?;
        }
        Ok(())
    }

    /// Scans input trailing a completed document, reporting
    /// `ExtraCharacter` for anything but JSON whitespace.
    ///
    /// # Errors
    ///
    /// Whatever the error handler turns into an abort.
    pub fn check_done<E>(&mut self, input: &str, errors: &mut E) -> Result<(), ParseError>
    where
        E: ErrorHandler + ?Sized,
    {
        for c in input.bytes() {
            match c {
                b'\n' | b'\r' | b'\t' | b' ' => {}
                _ => errors.error(ErrorKind::ExtraCharacter, &self.ctx(c))?,
            }
            self.index += 1;
        }
        Ok(())
    }

    // --------------------------------------------------------------------
    // Strings
    // --------------------------------------------------------------------

    /// Scans string content from `p`. Fast path: content that neither
    /// escapes nor crosses a chunk boundary is handed to the handler as a
    /// borrowed slice of `input` without copying. Returns the new cursor.
    fn parse_string_run<H, E>(
        &mut self,
        input: &str,
        mut p: usize,
        handler: &mut H,
        errors: &mut E,
    ) -> Result<usize, ParseError>
    where
        H: EventHandler + ?Sized,
        E: ErrorHandler + ?Sized,
    {
        let bytes = input.as_bytes();
        let sb = p;
        while p < bytes.len() {
            match bytes[p] {
                c @ (0x00..=0x08 | 0x0B | 0x0C | 0x0E..=0x1F) => {
                    self.string_buffer.push_str(&input[sb..p]);
                    self.column += p - sb + 1;
                    errors.error(ErrorKind::IllegalControlCharacter, &self.ctx(c))?;
                    // recovery - skip
                    return Ok(p + 1);
                }
                b'\r' => {
                    self.column += p - sb + 1;
                    errors.error(ErrorKind::IllegalCharacterInString, &self.ctx(b'\r'))?;
                    // recovery - keep
                    self.string_buffer.push_str(&input[sb..=p]);
                    self.stack.push(State::Cr);
                    return Ok(p + 1);
                }
                b'\n' => {
                    self.column += p - sb + 1;
                    errors.error(ErrorKind::IllegalCharacterInString, &self.ctx(b'\n'))?;
                    // recovery - keep
                    self.string_buffer.push_str(&input[sb..=p]);
                    self.stack.push(State::Lf);
                    return Ok(p + 1);
                }
                b'\t' => {
                    self.column += p - sb + 1;
                    errors.error(ErrorKind::IllegalCharacterInString, &self.ctx(b'\t'))?;
                    // recovery - keep
                    self.string_buffer.push_str(&input[sb..=p]);
                    return Ok(p + 1);
                }
                b'\\' => {
                    self.string_buffer.push_str(&input[sb..p]);
                    self.column += p - sb + 1;
                    self.set_top(State::Escape);
                    return Ok(p + 1);
                }
                b'"' => {
                    if self.string_buffer.is_empty() {
                        self.end_string_value(&input[sb..p], handler, errors)?;
                    } else {
                        self.string_buffer.push_str(&input[sb..p]);
                        let buffered = core::mem::take(&mut self.string_buffer);
                        self.end_string_value(&buffered, handler, errors)?;
                        // Hand the allocation back for reuse.
                        self.string_buffer = buffered;
                        self.string_buffer.clear();
                    }
                    self.column += p - sb + 1;
                    return Ok(p + 1);
                }
                _ => p += 1,
            }
        }
        // Chunk exhausted mid-string: stash the scanned run.
        self.string_buffer.push_str(&input[sb..p]);
        self.column += p - sb;
        Ok(p)
    }

    fn end_string_value<H, E>(
        &mut self,
        s: &str,
        handler: &mut H,
        errors: &mut E,
    ) -> Result<(), ParseError>
    where
        H: EventHandler + ?Sized,
        E: ErrorHandler + ?Sized,
    {
        debug_assert!(self.stack.len() >= 2);
        match self.stack[self.stack.len() - 2] {
            State::MemberName => {
                handler.name(s, &self.ctx(b'"'));
                self.pop_state();
                self.set_top(State::ExpectColon);
            }
            State::Object | State::Array => {
                handler.string_value(s, &self.ctx(b'"'));
                self.set_top(State::ExpectCommaOrEnd);
            }
            State::Root => {
                handler.string_value(s, &self.ctx(b'"'));
                self.set_top(State::Done);
                handler.end_json();
            }
            _ => errors.error(ErrorKind::InvalidJsonText, &self.ctx(b'"'))?,
        }
        Ok(())
    }

    fn escape_next_char<E>(&mut self, c: u8, errors: &mut E) -> Result<(), ParseError>
    where
        E: ErrorHandler + ?Sized,
    {
        match c {
            b'"' => {
                self.string_buffer.push('"');
                self.set_top(State::String);
            }
            b'\\' => {
                self.string_buffer.push('\\');
                self.set_top(State::String);
            }
            b'/' => {
                self.string_buffer.push('/');
                self.set_top(State::String);
            }
            b'b' => {
                self.string_buffer.push('\u{0008}');
                self.set_top(State::String);
            }
            b'f' => {
                self.string_buffer.push('\u{000C}');
                self.set_top(State::String);
            }
            b'n' => {
                self.string_buffer.push('\n');
                self.set_top(State::String);
            }
            b'r' => {
                self.string_buffer.push('\r');
                self.set_top(State::String);
            }
            b't' => {
                self.string_buffer.push('\t');
                self.set_top(State::String);
            }
            b'u' => {
                self.cp.reset();
                self.set_top(State::U1);
            }
            _ => errors.error(ErrorKind::IllegalEscapedCharacter, &self.ctx(c))?,
        }
        Ok(())
    }

    // --------------------------------------------------------------------
    // Numbers
    // --------------------------------------------------------------------

    fn end_integer_value<H, E>(
        &mut self,
        handler: &mut H,
        errors: &mut E,
        c: u8,
    ) -> Result<(), ParseError>
    where
        H: EventHandler + ?Sized,
        E: ErrorHandler + ?Sized,
    {
        let ctx = self.ctx(c);
        if self.is_negative {
            if let Some(v) = numbers::parse_i64(&self.number_buffer, true) {
                handler.int64_value(v, SemanticTag::None, &ctx);
            } else if let Some(d) = numbers::parse_digits(&self.number_buffer) {
                handler.double_value(-d, digit_count(&self.number_buffer), &ctx);
            } else {
                errors.error(ErrorKind::InvalidNumber, &ctx)?;
                handler.null_value(&ctx); // recovery
            }
        } else if let Some(v) = numbers::parse_u64(&self.number_buffer) {
            handler.uint64_value(v, SemanticTag::None, &ctx);
        } else if let Some(d) = numbers::parse_digits(&self.number_buffer) {
            handler.double_value(d, digit_count(&self.number_buffer), &ctx);
        } else {
            errors.error(ErrorKind::InvalidNumber, &ctx)?;
            handler.null_value(&ctx); // recovery
        }
        self.number_buffer.clear();
        self.is_negative = false;
        self.leave_frame(handler);
        Ok(())
    }

    fn end_fraction_value<H, E>(
        &mut self,
        handler: &mut H,
        errors: &mut E,
        c: u8,
    ) -> Result<(), ParseError>
    where
        H: EventHandler + ?Sized,
        E: ErrorHandler + ?Sized,
    {
        let ctx = self.ctx(c);
        match numbers::parse_digits(&self.number_buffer) {
            Some(d) => {
                let d = if self.is_negative { -d } else { d };
                handler.double_value(d, self.precision, &ctx);
            }
            None => {
                errors.error(ErrorKind::InvalidNumber, &ctx)?;
                handler.null_value(&ctx); // recovery
            }
        }
        self.number_buffer.clear();
        self.is_negative = false;
        self.precision = 0;
        self.leave_frame(handler);
        Ok(())
    }

    // --------------------------------------------------------------------
    // Structural transitions
    // --------------------------------------------------------------------

    fn close_object<H, E>(
        &mut self,
        handler: &mut H,
        errors: &mut E,
        c: u8,
    ) -> Result<(), ParseError>
    where
        H: EventHandler + ?Sized,
        E: ErrorHandler + ?Sized,
    {
        self.pop_depth();
        self.pop_state();
        match self.top() {
            State::Object => {
                if !handler.end_object(&self.ctx(c)) {
                    self.proceed = false;
                }
            }
            State::Array => {
                return Err(
                    errors.fatal_error(ErrorKind::ExpectedCommaOrRightBracket, &self.ctx(c))
                );
            }
            _ => {
                return Err(errors.fatal_error(ErrorKind::UnexpectedRightBrace, &self.ctx(c)));
            }
        }
        self.leave_frame(handler);
        Ok(())
    }

    fn close_array<H, E>(
        &mut self,
        handler: &mut H,
        errors: &mut E,
        c: u8,
    ) -> Result<(), ParseError>
    where
        H: EventHandler + ?Sized,
        E: ErrorHandler + ?Sized,
    {
        self.pop_depth();
        self.pop_state();
        match self.top() {
            State::Array => {
                if !handler.end_array(&self.ctx(c)) {
                    self.proceed = false;
                }
            }
            State::Object => {
                return Err(
                    errors.fatal_error(ErrorKind::ExpectedCommaOrRightBrace, &self.ctx(c))
                );
            }
            _ => {
                return Err(errors.fatal_error(ErrorKind::UnexpectedRightBracket, &self.ctx(c)));
            }
        }
        self.leave_frame(handler);
        Ok(())
    }

    /// After a value or closed container: the enclosing frame decides
    /// whether a comma may follow or the document is complete.
    fn leave_frame<H>(&mut self, handler: &mut H)
    where
        H: EventHandler + ?Sized,
    {
        debug_assert!(self.stack.len() >= 2);
        if self.stack[self.stack.len() - 2] == State::Root {
            self.set_top(State::Done);
            handler.end_json();
        } else {
            self.set_top(State::ExpectCommaOrEnd);
        }
    }

    fn begin_member_or_element<E>(&mut self, errors: &mut E, c: u8) -> Result<(), ParseError>
    where
        E: ErrorHandler + ?Sized,
    {
        debug_assert!(self.stack.len() >= 2);
        match self.stack[self.stack.len() - 2] {
            State::Object => self.set_top(State::ExpectMemberName),
            State::Array => self.set_top(State::ExpectValue),
            State::Root => {}
            _ => errors.error(ErrorKind::InvalidJsonText, &self.ctx(c))?,
        }
        Ok(())
    }

    fn push_depth<E>(&mut self, errors: &mut E, c: u8) -> Result<(), ParseError>
    where
        E: ErrorHandler + ?Sized,
    {
        if self.nesting_depth >= self.max_depth {
            // Clamp so pathological nesting yields one diagnostic, not a
            // cascade.
            if !self.depth_exceeded {
                self.depth_exceeded = true;
                debug!(
                    "nesting depth limit {} reached at {}:{}",
                    self.max_depth, self.line, self.column
                );
                errors.error(ErrorKind::MaxDepthExceeded, &self.ctx(c))?;
            }
        } else {
            self.nesting_depth += 1;
        }
        Ok(())
    }

    fn pop_depth(&mut self) {
        self.nesting_depth = self.nesting_depth.saturating_sub(1);
    }

    // --------------------------------------------------------------------
    // Stack primitives
    // --------------------------------------------------------------------

    fn top(&self) -> State {
        debug_assert!(!self.stack.is_empty());
        *self.stack.last().unwrap_or(&State::Done)
    }

    fn set_top(&mut self, state: State) {
        debug_assert!(!self.stack.is_empty());
        if let Some(top) = self.stack.last_mut() {
            *top = state;
        }
    }

    fn pop_state(&mut self) {
        debug_assert!(self.stack.len() >= 2);
        self.stack.pop();
    }

    fn ctx(&self, c: u8) -> ParseContext {
        ParseContext::new(self.line, self.column, c as char)
    }
}

/// Consumes a run of blanks after the one at `p`, updating the column.
/// Returns how many extra bytes were consumed.
fn skip_spaces(bytes: &[u8], p: usize, column: &mut usize) -> usize {
    let mut extra = 0;
    while p + extra + 1 < bytes.len() && matches!(bytes[p + extra + 1], b' ' | b'\t') {
        extra += 1;
        *column += 1;
    }
    extra
}

/// Significant decimal digits in the accumulator (sign and exponent never
/// contribute; the buffer holds only digits when this is consulted).
fn digit_count(buffer: &str) -> u8 {
    u8::try_from(buffer.len()).unwrap_or(u8::MAX)
}
