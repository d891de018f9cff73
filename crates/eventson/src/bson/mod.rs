//! The BSON document walker.
//!
//! [`BsonParser`] pulls bytes from a [`Source`] and drives an
//! [`EventHandler`] with the same semantic token stream the JSON parser
//! produces: a document becomes `begin_object` / `name` / scalar /
//! `end_object`, an embedded array becomes `begin_array` / scalars /
//! `end_array` with its numeric string keys discarded (the handler
//! synthesizes indices by position). Wire-level types that share a host
//! representation are distinguished by [`SemanticTag`]: datetimes arrive as
//! `int64_value(_, Timestamp)`, timestamps as `uint64_value(_, Timestamp)`.
//!
//! Short reads abort with `UnexpectedEof`; element and document lengths are
//! read but the element loop is terminated by the `0x00` sentinel alone.
//!
//! # Examples
//!
//! ```rust
//! use eventson::{BsonParser, EventHandler, ParseContext, SliceSource};
//!
//! #[derive(Default)]
//! struct Strings(Vec<String>);
//!
//! impl EventHandler for Strings {
//!     fn string_value(&mut self, value: &str, _ctx: &ParseContext) {
//!         self.0.push(value.to_string());
//!     }
//! }
//!
//! // { "h": "world" }
//! let doc = b"\x16\x00\x00\x00\x02h\x00\x06\x00\x00\x00world\x00\x00";
//! let mut parser = BsonParser::new(SliceSource::new(doc));
//! let mut strings = Strings::default();
//! parser.parse(&mut strings).unwrap();
//! assert_eq!(strings.0, ["world"]);
//! ```

mod source;

use alloc::vec::Vec;

use log::debug;

use crate::{
    error::{ErrorKind, ParseError},
    handler::{EventHandler, ParseContext, SemanticTag},
};

pub use source::{SliceSource, Source};

/// BSON element type bytes.
mod element {
    pub(super) const DOUBLE: u8 = 0x01;
    pub(super) const STRING: u8 = 0x02;
    pub(super) const DOCUMENT: u8 = 0x03;
    pub(super) const ARRAY: u8 = 0x04;
    pub(super) const BINARY: u8 = 0x05;
    pub(super) const BOOL: u8 = 0x08;
    pub(super) const DATETIME: u8 = 0x09;
    pub(super) const NULL: u8 = 0x0A;
    pub(super) const INT32: u8 = 0x10;
    pub(super) const TIMESTAMP: u8 = 0x11;
    pub(super) const INT64: u8 = 0x12;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseMode {
    Root,
    Document,
    Array,
}

/// One open container: its mode, declared length, the type byte of the
/// element currently being read, and how many elements have been read.
#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
struct Frame {
    mode: ParseMode,
    length: usize,
    element_type: u8,
    index: usize,
}

impl Frame {
    fn new(mode: ParseMode, length: usize) -> Self {
        Self {
            mode,
            length,
            element_type: 0,
            index: 0,
        }
    }
}

/// The BSON document walker. See the [module documentation](self).
#[derive(Debug)]
pub struct BsonParser<S> {
    source: S,
    frames: Vec<Frame>,
    nesting_depth: usize,
    name_buffer: Vec<u8>,
    text_buffer: Vec<u8>,
    proceed: bool,
    done: bool,
}

impl<S: Source> BsonParser<S> {
    /// Creates a walker over `source`, ready to parse one document.
    pub fn new(source: S) -> Self {
        let mut frames = Vec::with_capacity(16);
        frames.push(Frame::new(ParseMode::Root, 0));
        Self {
            source,
            frames,
            nesting_depth: 0,
            name_buffer: Vec::new(),
            text_buffer: Vec::new(),
            proceed: true,
            done: false,
        }
    }

    /// Re-arms the walker for another document from the same source.
    /// Scratch buffers are retained for reuse.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.frames.push(Frame::new(ParseMode::Root, 0));
        self.nesting_depth = 0;
        self.proceed = true;
        self.done = false;
    }

    /// Whether a complete document has been walked.
    #[must_use]
    pub fn done(&self) -> bool {
        self.done
    }

    /// Whether a handler callback requested cancellation.
    #[must_use]
    pub fn stopped(&self) -> bool {
        !self.proceed
    }

    /// Clears a handler-requested cancellation.
    pub fn restart(&mut self) {
        self.proceed = true;
    }

    /// Byte offset of the next read.
    #[must_use]
    pub fn position(&self) -> usize {
        self.source.position()
    }

    /// Walks one document, pushing its token stream into `handler`.
    ///
    /// # Errors
    ///
    /// `SourceError` when the source reports an error state,
    /// `UnexpectedEof` on any short read, `InvalidUtf8TextString` when a
    /// name or string element fails UTF-8 validation.
    pub fn parse<H>(&mut self, handler: &mut H) -> Result<(), ParseError>
    where
        H: EventHandler + ?Sized,
    {
        if self.source.is_error() {
            return Err(self.err(ErrorKind::SourceError));
        }
        self.begin_document(handler)?;
        self.read_e_list(handler)?;
        self.end_document(handler);
        if self.frames.len() == 1 {
            self.done = true;
        }
        Ok(())
    }

    fn begin_document<H>(&mut self, handler: &mut H) -> Result<(), ParseError>
    where
        H: EventHandler + ?Sized,
    {
        // The declared length is read but the element loop is bounded by
        // the zero sentinel, not by it.
        let length = self.read_i32()?;
        handler.begin_object(&self.ctx());
        self.nesting_depth += 1;
        self.frames
            .push(Frame::new(ParseMode::Document, length.max(0) as usize));
        Ok(())
    }

    fn end_document<H>(&mut self, handler: &mut H)
    where
        H: EventHandler + ?Sized,
    {
        if !handler.end_object(&self.ctx()) {
            self.proceed = false;
        }
        self.frames.pop();
        self.nesting_depth -= 1;
    }

    fn begin_array<H>(&mut self, handler: &mut H) -> Result<(), ParseError>
    where
        H: EventHandler + ?Sized,
    {
        let length = self.read_i32()?;
        handler.begin_array(&self.ctx());
        self.nesting_depth += 1;
        self.frames
            .push(Frame::new(ParseMode::Array, length.max(0) as usize));
        Ok(())
    }

    fn end_array<H>(&mut self, handler: &mut H)
    where
        H: EventHandler + ?Sized,
    {
        if !handler.end_array(&self.ctx()) {
            self.proceed = false;
        }
        self.frames.pop();
        self.nesting_depth -= 1;
    }

    /// Reads `(type, name, value)` elements until the `0x00` sentinel or
    /// end of input.
    fn read_e_list<H>(&mut self, handler: &mut H) -> Result<(), ParseError>
    where
        H: EventHandler + ?Sized,
    {
        loop {
            if !self.proceed {
                return Ok(());
            }
            let t = match self.source.get() {
                Some(t) if t != 0x00 => t,
                _ => return Ok(()),
            };
            if let Some(frame) = self.frames.last_mut() {
                frame.element_type = t;
            }
            self.read_name(handler)?;
            self.read_value(handler, t)?;
            if let Some(frame) = self.frames.last_mut() {
                frame.index += 1;
            }
        }
    }

    /// Reads a NUL-terminated name. Document names are validated as UTF-8
    /// and forwarded; array names carry positional keys the handler
    /// synthesizes, so they are read and discarded.
    fn read_name<H>(&mut self, handler: &mut H) -> Result<(), ParseError>
    where
        H: EventHandler + ?Sized,
    {
        self.name_buffer.clear();
        while let Some(c) = self.source.get() {
            if c == 0 {
                break;
            }
            self.name_buffer.push(c);
        }
        let mode = self.frames.last().map(|frame| frame.mode);
        if mode == Some(ParseMode::Document) {
            let name = core::str::from_utf8(&self.name_buffer)
                .map_err(|_| self.err(ErrorKind::InvalidUtf8TextString))?;
            handler.name(name, &self.ctx());
        }
        Ok(())
    }

    fn read_value<H>(&mut self, handler: &mut H, element_type: u8) -> Result<(), ParseError>
    where
        H: EventHandler + ?Sized,
    {
        match element_type {
            element::DOUBLE => {
                let v = self.read_f64()?;
                handler.double_value(v, 0, &self.ctx());
            }
            element::STRING => {
                let len = self.read_i32()?;
                let n = usize::try_from(i64::from(len) - 1)
                    .map_err(|_| self.err(ErrorKind::UnexpectedEof))?;
                self.fill_text(n)?;
                let _ = self.source.get(); // trailing NUL
                let s = core::str::from_utf8(&self.text_buffer)
                    .map_err(|_| self.err(ErrorKind::InvalidUtf8TextString))?;
                handler.string_value(s, &self.ctx());
            }
            element::DOCUMENT => self.parse(handler)?,
            element::ARRAY => {
                self.begin_array(handler)?;
                self.read_e_list(handler)?;
                self.end_array(handler);
            }
            element::BINARY => {
                // The subtype byte is counted as part of the payload and
                // delivered as its first byte.
                let len = self.read_i32()?;
                let n = usize::try_from(len).map_err(|_| self.err(ErrorKind::UnexpectedEof))?;
                self.fill_text(n)?;
                let bytes = core::mem::take(&mut self.text_buffer);
                handler.byte_string_value(&bytes, SemanticTag::None, &self.ctx());
                self.text_buffer = bytes;
            }
            element::BOOL => {
                let v = self
                    .source
                    .get()
                    .ok_or_else(|| self.err(ErrorKind::UnexpectedEof))?;
                handler.bool_value(v != 0, &self.ctx());
            }
            element::DATETIME => {
                let v = self.read_i64()?;
                handler.int64_value(v, SemanticTag::Timestamp, &self.ctx());
            }
            element::NULL => handler.null_value(&self.ctx()),
            element::INT32 => {
                let v = self.read_i32()?;
                handler.int64_value(i64::from(v), SemanticTag::None, &self.ctx());
            }
            element::TIMESTAMP => {
                let v = self.read_u64()?;
                handler.uint64_value(v, SemanticTag::Timestamp, &self.ctx());
            }
            element::INT64 => {
                let v = self.read_i64()?;
                handler.int64_value(v, SemanticTag::None, &self.ctx());
            }
            _ => {
                // Unrecognized type bytes end the element silently.
                debug!(
                    "skipping unrecognized element type {element_type:#04x} at offset {}",
                    self.source.position()
                );
            }
        }
        Ok(())
    }

    // --------------------------------------------------------------------
    // Wire primitives
    // --------------------------------------------------------------------

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ParseError> {
        if self.source.read(buf) != buf.len() {
            return Err(self.err(ErrorKind::UnexpectedEof));
        }
        Ok(())
    }

    fn read_i32(&mut self) -> Result<i32, ParseError> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_i64(&mut self) -> Result<i64, ParseError> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64, ParseError> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_f64(&mut self) -> Result<f64, ParseError> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    /// Fills `text_buffer` with exactly `n` bytes. Reads in bounded steps
    /// so a corrupt length prefix cannot force a huge upfront allocation.
    fn fill_text(&mut self, n: usize) -> Result<(), ParseError> {
        self.text_buffer.clear();
        let mut buf = [0u8; 4096];
        let mut remaining = n;
        while remaining > 0 {
            let want = remaining.min(buf.len());
            let got = self.source.read(&mut buf[..want]);
            if got == 0 {
                return Err(self.err(ErrorKind::UnexpectedEof));
            }
            self.text_buffer.extend_from_slice(&buf[..got]);
            remaining -= got;
        }
        Ok(())
    }

    fn ctx(&self) -> ParseContext {
        ParseContext::new(0, self.source.position(), '\0')
    }

    fn err(&self, kind: ErrorKind) -> ParseError {
        ParseError {
            kind,
            line: 0,
            column: self.source.position(),
        }
    }
}
