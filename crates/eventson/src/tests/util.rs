//! Shared test plumbing: a handler that records the event stream.

use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use crate::{
    EventHandler, JsonParser, ParseContext, ParseError, ParserOptions, Recovering, SemanticTag,
};

/// One recorded handler callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BeginJson,
    EndJson,
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Name(String),
    Str(String),
    Bool(bool),
    Null,
    I64(i64, SemanticTag),
    U64(u64, SemanticTag),
    Double(f64, u8),
    Bytes(Vec<u8>, SemanticTag),
}

/// Records every callback in order.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl EventHandler for Recorder {
    fn begin_json(&mut self) {
        self.events.push(Event::BeginJson);
    }

    fn end_json(&mut self) {
        self.events.push(Event::EndJson);
    }

    fn begin_object(&mut self, _ctx: &ParseContext) -> bool {
        self.events.push(Event::BeginObject);
        true
    }

    fn end_object(&mut self, _ctx: &ParseContext) -> bool {
        self.events.push(Event::EndObject);
        true
    }

    fn begin_array(&mut self, _ctx: &ParseContext) -> bool {
        self.events.push(Event::BeginArray);
        true
    }

    fn end_array(&mut self, _ctx: &ParseContext) -> bool {
        self.events.push(Event::EndArray);
        true
    }

    fn name(&mut self, name: &str, _ctx: &ParseContext) {
        self.events.push(Event::Name(name.to_string()));
    }

    fn string_value(&mut self, value: &str, _ctx: &ParseContext) {
        self.events.push(Event::Str(value.to_string()));
    }

    fn bool_value(&mut self, value: bool, _ctx: &ParseContext) {
        self.events.push(Event::Bool(value));
    }

    fn null_value(&mut self, _ctx: &ParseContext) {
        self.events.push(Event::Null);
    }

    fn int64_value(&mut self, value: i64, tag: SemanticTag, _ctx: &ParseContext) {
        self.events.push(Event::I64(value, tag));
    }

    fn uint64_value(&mut self, value: u64, tag: SemanticTag, _ctx: &ParseContext) {
        self.events.push(Event::U64(value, tag));
    }

    fn double_value(&mut self, value: f64, precision: u8, _ctx: &ParseContext) {
        self.events.push(Event::Double(value, precision));
    }

    fn byte_string_value(&mut self, bytes: &[u8], tag: SemanticTag, _ctx: &ParseContext) {
        self.events.push(Event::Bytes(bytes.to_vec(), tag));
    }
}

/// Parses `input` in one chunk with the recovering error handler,
/// returning the event stream and the recorded diagnostics.
pub fn parse_events(input: &str) -> (Vec<Event>, Vec<ParseError>) {
    parse_events_chunked(&[input])
}

/// Feeds `chunks` in order, then ends the parse.
pub fn parse_events_chunked(chunks: &[&str]) -> (Vec<Event>, Vec<ParseError>) {
    let mut parser = JsonParser::new(ParserOptions::default());
    let mut recorder = Recorder::default();
    let mut errors = Recovering::new();
    for chunk in chunks {
        parser
            .parse(chunk, &mut recorder, &mut errors)
            .expect("unexpected fatal error");
    }
    parser
        .end_parse(&mut recorder, &mut errors)
        .expect("unexpected fatal error");
    (recorder.events, errors.into_diagnostics())
}
