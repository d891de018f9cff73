//! Incremental push parsers for JSON text and BSON documents.
//!
//! Both parsers consume input from the caller — the JSON parser is push-fed
//! `&str` chunks of any size, the BSON parser pulls bytes from a
//! [`Source`] — and drive an [`EventHandler`] with a strictly sequential
//! stream of semantic tokens: begin/end container, member name, scalar
//! value. Diagnostics carry the exact line and column of the offending
//! byte; an [`ErrorHandler`] decides per diagnostic whether the parse
//! recovers or aborts.
//!
//! # Examples
//!
//! ```rust
//! use eventson::{EventHandler, FailFast, JsonParser, ParseContext, SemanticTag};
//!
//! #[derive(Default)]
//! struct Sum(i64);
//!
//! impl EventHandler for Sum {
//!     fn uint64_value(&mut self, value: u64, _tag: SemanticTag, _ctx: &ParseContext) {
//!         self.0 += value as i64;
//!     }
//!     fn int64_value(&mut self, value: i64, _tag: SemanticTag, _ctx: &ParseContext) {
//!         self.0 += value;
//!     }
//! }
//!
//! let mut parser = JsonParser::default();
//! let mut sum = Sum::default();
//! let mut errors = FailFast;
//! parser.parse("[1, 2, ", &mut sum, &mut errors).unwrap();
//! parser.parse("3, -4]", &mut sum, &mut errors).unwrap();
//! parser.end_parse(&mut sum, &mut errors).unwrap();
//! assert_eq!(sum.0, 2);
//! ```

#![no_std]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod bson;
mod error;
mod escape_buffer;
mod handler;
mod literal_buffer;
mod numbers;
mod options;
mod parser;

pub use bson::{BsonParser, SliceSource, Source};
pub use error::{ErrorHandler, ErrorKind, FailFast, ParseError, Recovering};
pub use handler::{EventHandler, ParseContext, SemanticTag};
pub use options::ParserOptions;
pub use parser::{JsonParser, State};

#[cfg(test)]
mod tests;
