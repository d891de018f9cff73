#![no_main]
use eventson::{
    ErrorHandler, ErrorKind, EventHandler, JsonParser, ParseContext, ParseError, ParserOptions,
};
use libfuzzer_sys::fuzz_target;

struct Sink;

impl EventHandler for Sink {}

/// Swallows every recoverable diagnostic so the fuzzer exercises the
/// recovery paths; only fatal errors abort.
struct Swallow;

impl ErrorHandler for Swallow {
    fn error(&mut self, _kind: ErrorKind, _ctx: &ParseContext) -> Result<(), ParseError> {
        Ok(())
    }

    fn fatal_error(&mut self, kind: ErrorKind, ctx: &ParseContext) -> ParseError {
        ParseError {
            kind,
            line: ctx.line(),
            column: ctx.column(),
        }
    }
}

const HEADER: usize = 9; // 1 flag + 8-byte split seed

fn parser(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }

    let flags = data[0];
    let split_seed = u64::from_le_bytes(data[1..9].try_into().unwrap());
    let data = &data[HEADER..];
    if data.is_empty() {
        return;
    }

    let text = String::from_utf8_lossy(data).into_owned();
    let chunks = split_into_safe_chunks(&text, split_seed);

    let mut parser = JsonParser::new(ParserOptions {
        max_nesting_depth: if flags & 1 != 0 { 8 } else { usize::MAX },
        ..Default::default()
    });
    let mut sink = Sink;
    let mut errors = Swallow;

    for chunk in &chunks {
        if parser.parse(chunk, &mut sink, &mut errors).is_err() {
            return;
        }
    }
    let _ = parser.end_parse(&mut sink, &mut errors);
}

fuzz_target!(|data: &[u8]| parser(data));

/// Split a UTF-8 `&str` into boundary-safe chunks using a deterministic
/// random value to generate splits.
///
/// * `split_seed` may be any `u64`.
/// * Each chunk is at least one byte.
/// * Every slice ends on a valid UTF-8 boundary, so it can't panic.
fn split_into_safe_chunks(serialized: &str, split_seed: u64) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let len = serialized.len();

    while start < len {
        let remaining = len - start;

        // Derive a candidate size from the fixed seed.
        let mut size = (split_seed as usize % remaining) + 1;

        // Bump `size` forward until it lands on a char boundary
        // (or hits the end of the string, which is always a boundary).
        while start + size < len && !serialized.is_char_boundary(start + size) {
            size += 1;
        }

        chunks.push(&serialized[start..start + size]);
        start += size;
    }

    chunks
}
