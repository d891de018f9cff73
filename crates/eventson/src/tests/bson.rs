//! BSON walks: typed dispatch, nesting, truncation, validation, and the
//! encode-and-reparse round trip.

use alloc::{
    string::{String, ToString},
    vec,
    vec::Vec,
};

use crate::{
    tests::util::{Event, Recorder},
    BsonParser, ErrorKind, EventHandler, ParseContext, SemanticTag, SliceSource,
};

/// Appends one element: type byte, NUL-terminated name, payload.
fn elem(out: &mut Vec<u8>, element_type: u8, name: &str, payload: &[u8]) {
    out.push(element_type);
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    out.extend_from_slice(payload);
}

/// Wraps an element list into a length-prefixed, NUL-terminated document.
fn doc(elements: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let len = i32::try_from(elements.len() + 5).unwrap();
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(elements);
    out.push(0);
    out
}

fn string_payload(s: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    let len = i32::try_from(s.len() + 1).unwrap();
    payload.extend_from_slice(&len.to_le_bytes());
    payload.extend_from_slice(s.as_bytes());
    payload.push(0);
    payload
}

fn walk(bytes: &[u8]) -> Result<Vec<Event>, crate::ParseError> {
    let mut parser = BsonParser::new(SliceSource::new(bytes));
    let mut recorder = Recorder::default();
    parser.parse(&mut recorder)?;
    Ok(recorder.events)
}

#[test]
fn hello_world_document() {
    // { "h": "world" }
    let bytes = b"\x16\x00\x00\x00\x02h\x00\x06\x00\x00\x00world\x00\x00";
    assert_eq!(
        walk(bytes).unwrap(),
        vec![
            Event::BeginObject,
            Event::Name("h".to_string()),
            Event::Str("world".to_string()),
            Event::EndObject,
        ]
    );
}

#[test]
fn every_scalar_type() {
    let mut bin = Vec::new();
    bin.extend_from_slice(&4i32.to_le_bytes());
    bin.extend_from_slice(&[0x00, 1, 2, 3]); // subtype + data

    let mut elements = Vec::new();
    elem(&mut elements, 0x01, "d", &2.5f64.to_le_bytes());
    elem(&mut elements, 0x02, "s", &string_payload("text"));
    elem(&mut elements, 0x05, "bin", &bin);
    elem(&mut elements, 0x08, "t", &[1]);
    elem(&mut elements, 0x08, "f", &[0]);
    elem(&mut elements, 0x09, "when", &1_500_000_000_000i64.to_le_bytes());
    elem(&mut elements, 0x0A, "nothing", &[]);
    elem(&mut elements, 0x10, "i32", &(-7i32).to_le_bytes());
    elem(&mut elements, 0x11, "ts", &42u64.to_le_bytes());
    elem(&mut elements, 0x12, "i64", &i64::MIN.to_le_bytes());

    assert_eq!(
        walk(&doc(&elements)).unwrap(),
        vec![
            Event::BeginObject,
            Event::Name("d".to_string()),
            Event::Double(2.5, 0),
            Event::Name("s".to_string()),
            Event::Str("text".to_string()),
            Event::Name("bin".to_string()),
            Event::Bytes(vec![0x00, 1, 2, 3], SemanticTag::None),
            Event::Name("t".to_string()),
            Event::Bool(true),
            Event::Name("f".to_string()),
            Event::Bool(false),
            Event::Name("when".to_string()),
            Event::I64(1_500_000_000_000, SemanticTag::Timestamp),
            Event::Name("nothing".to_string()),
            Event::Null,
            Event::Name("i32".to_string()),
            Event::I64(-7, SemanticTag::None),
            Event::Name("ts".to_string()),
            Event::U64(42, SemanticTag::Timestamp),
            Event::Name("i64".to_string()),
            Event::I64(i64::MIN, SemanticTag::None),
            Event::EndObject,
        ]
    );
}

#[test]
fn nested_document_recurses() {
    let mut inner = Vec::new();
    elem(&mut inner, 0x10, "x", &1i32.to_le_bytes());
    let mut elements = Vec::new();
    elem(&mut elements, 0x03, "inner", &doc(&inner));

    assert_eq!(
        walk(&doc(&elements)).unwrap(),
        vec![
            Event::BeginObject,
            Event::Name("inner".to_string()),
            Event::BeginObject,
            Event::Name("x".to_string()),
            Event::I64(1, SemanticTag::None),
            Event::EndObject,
            Event::EndObject,
        ]
    );
}

#[test]
fn array_names_are_discarded() {
    let mut items = Vec::new();
    elem(&mut items, 0x10, "0", &10i32.to_le_bytes());
    elem(&mut items, 0x10, "1", &20i32.to_le_bytes());
    let mut elements = Vec::new();
    elem(&mut elements, 0x04, "arr", &doc(&items));

    assert_eq!(
        walk(&doc(&elements)).unwrap(),
        vec![
            Event::BeginObject,
            Event::Name("arr".to_string()),
            Event::BeginArray,
            Event::I64(10, SemanticTag::None),
            Event::I64(20, SemanticTag::None),
            Event::EndArray,
            Event::EndObject,
        ]
    );
}

#[test]
fn truncated_length_prefix() {
    assert_eq!(walk(b"\x16\x00").unwrap_err().kind, ErrorKind::UnexpectedEof);
}

#[test]
fn truncated_scalar_payload() {
    let mut elements = Vec::new();
    elem(&mut elements, 0x12, "i", &[1, 2, 3]); // int64 needs 8 bytes
    let mut bytes = doc(&elements);
    bytes.truncate(bytes.len() - 1);
    assert_eq!(walk(&bytes).unwrap_err().kind, ErrorKind::UnexpectedEof);
}

#[test]
fn invalid_utf8_name() {
    let mut elements = Vec::new();
    elements.push(0x0A); // null element
    elements.extend_from_slice(&[0xFF, 0xFE]); // not UTF-8
    elements.push(0);
    assert_eq!(
        walk(&doc(&elements)).unwrap_err().kind,
        ErrorKind::InvalidUtf8TextString
    );
}

#[test]
fn invalid_utf8_string_value() {
    let mut payload = Vec::new();
    payload.extend_from_slice(&3i32.to_le_bytes());
    payload.extend_from_slice(&[0xC0, 0xAF]); // overlong encoding
    payload.push(0);
    let mut elements = Vec::new();
    elem(&mut elements, 0x02, "s", &payload);
    assert_eq!(
        walk(&doc(&elements)).unwrap_err().kind,
        ErrorKind::InvalidUtf8TextString
    );
}

#[test]
fn unrecognized_type_byte_ends_element_silently() {
    let mut elements = Vec::new();
    elem(&mut elements, 0x7F, "odd", &[]);
    assert_eq!(
        walk(&doc(&elements)).unwrap(),
        vec![
            Event::BeginObject,
            Event::Name("odd".to_string()),
            Event::EndObject,
        ]
    );
}

#[test]
fn cancellation_stops_at_element_boundary() {
    struct StopOnInnerEnd {
        recorder: Recorder,
        depth: usize,
    }

    impl EventHandler for StopOnInnerEnd {
        fn begin_object(&mut self, ctx: &ParseContext) -> bool {
            self.depth += 1;
            self.recorder.begin_object(ctx)
        }
        fn end_object(&mut self, ctx: &ParseContext) -> bool {
            self.depth -= 1;
            self.recorder.end_object(ctx);
            self.depth == 0
        }
        fn name(&mut self, name: &str, ctx: &ParseContext) {
            self.recorder.name(name, ctx);
        }
        fn int64_value(&mut self, value: i64, tag: SemanticTag, ctx: &ParseContext) {
            self.recorder.int64_value(value, tag, ctx);
        }
    }

    let mut inner = Vec::new();
    elem(&mut inner, 0x10, "x", &1i32.to_le_bytes());
    let mut elements = Vec::new();
    elem(&mut elements, 0x03, "first", &doc(&inner));
    elem(&mut elements, 0x10, "second", &2i32.to_le_bytes());
    let bytes = doc(&elements);

    let mut parser = BsonParser::new(SliceSource::new(&bytes));
    let mut handler = StopOnInnerEnd {
        recorder: Recorder::default(),
        depth: 0,
    };
    parser.parse(&mut handler).unwrap();

    assert!(parser.stopped());
    // "second" is never reached; the enclosing document still closes.
    assert_eq!(
        handler.recorder.events,
        vec![
            Event::BeginObject,
            Event::Name("first".to_string()),
            Event::BeginObject,
            Event::Name("x".to_string()),
            Event::I64(1, SemanticTag::None),
            Event::EndObject,
            Event::EndObject,
        ]
    );
}

#[test]
fn reset_rearms_the_walker() {
    let mut elements = Vec::new();
    elem(&mut elements, 0x10, "x", &5i32.to_le_bytes());
    let mut bytes = doc(&elements);
    let second = bytes.clone();
    bytes.extend_from_slice(&second);

    let mut parser = BsonParser::new(SliceSource::new(&bytes));
    let mut recorder = Recorder::default();
    parser.parse(&mut recorder).unwrap();
    assert!(parser.done());
    parser.reset();
    assert!(!parser.done());
    parser.parse(&mut recorder).unwrap();
    assert!(parser.done());
    assert_eq!(
        recorder.events.iter().filter(|e| **e == Event::BeginObject).count(),
        2
    );
}

// ------------------------------------------------------------------------
// Round trip: encode the received events back to BSON and re-walk them.
// ------------------------------------------------------------------------

struct EncFrame {
    name: Option<String>,
    bytes: Vec<u8>,
    is_array: bool,
    index: usize,
}

/// Re-encodes a recorded event stream (document subset) as BSON.
fn encode_events(events: &[Event]) -> Vec<u8> {
    let mut stack: Vec<EncFrame> = Vec::new();
    let mut pending: Option<String> = None;
    let mut root: Option<Vec<u8>> = None;

    fn take_name(stack: &mut [EncFrame], pending: &mut Option<String>) -> Option<String> {
        match stack.last_mut() {
            Some(frame) if frame.is_array => {
                let name = frame.index.to_string();
                frame.index += 1;
                Some(name)
            }
            Some(_) => pending.take(),
            None => None,
        }
    }

    fn push_elem(stack: &mut Vec<EncFrame>, element_type: u8, name: &str, payload: &[u8]) {
        let out = &mut stack.last_mut().unwrap().bytes;
        out.push(element_type);
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        out.extend_from_slice(payload);
    }

    for event in events {
        match event {
            Event::Name(n) => pending = Some(n.clone()),
            Event::BeginObject => {
                let name = take_name(&mut stack, &mut pending);
                stack.push(EncFrame {
                    name,
                    bytes: Vec::new(),
                    is_array: false,
                    index: 0,
                });
            }
            Event::BeginArray => {
                let name = take_name(&mut stack, &mut pending);
                stack.push(EncFrame {
                    name,
                    bytes: Vec::new(),
                    is_array: true,
                    index: 0,
                });
            }
            Event::EndObject | Event::EndArray => {
                let frame = stack.pop().unwrap();
                let document = doc(&frame.bytes);
                match (frame.name, stack.is_empty()) {
                    (Some(name), false) => {
                        let element_type = if frame.is_array { 0x04 } else { 0x03 };
                        push_elem(&mut stack, element_type, &name, &document);
                    }
                    _ => root = Some(document),
                }
            }
            Event::Str(s) => {
                let name = take_name(&mut stack, &mut pending).unwrap();
                push_elem(&mut stack, 0x02, &name, &string_payload(s));
            }
            Event::Double(d, _) => {
                let name = take_name(&mut stack, &mut pending).unwrap();
                push_elem(&mut stack, 0x01, &name, &d.to_le_bytes());
            }
            Event::Bool(b) => {
                let name = take_name(&mut stack, &mut pending).unwrap();
                push_elem(&mut stack, 0x08, &name, &[u8::from(*b)]);
            }
            Event::Null => {
                let name = take_name(&mut stack, &mut pending).unwrap();
                push_elem(&mut stack, 0x0A, &name, &[]);
            }
            Event::I64(v, SemanticTag::Timestamp) => {
                let name = take_name(&mut stack, &mut pending).unwrap();
                push_elem(&mut stack, 0x09, &name, &v.to_le_bytes());
            }
            Event::I64(v, SemanticTag::None) => {
                let name = take_name(&mut stack, &mut pending).unwrap();
                push_elem(&mut stack, 0x12, &name, &v.to_le_bytes());
            }
            Event::U64(v, _) => {
                let name = take_name(&mut stack, &mut pending).unwrap();
                push_elem(&mut stack, 0x11, &name, &v.to_le_bytes());
            }
            Event::Bytes(b, _) => {
                let name = take_name(&mut stack, &mut pending).unwrap();
                let mut payload = Vec::new();
                payload.extend_from_slice(&i32::try_from(b.len()).unwrap().to_le_bytes());
                payload.extend_from_slice(b);
                push_elem(&mut stack, 0x05, &name, &payload);
            }
            Event::BeginJson | Event::EndJson => {}
        }
    }

    root.unwrap()
}

#[test]
fn encode_reparse_round_trip() {
    let mut items = Vec::new();
    elem(&mut items, 0x01, "0", &0.5f64.to_le_bytes());
    elem(&mut items, 0x08, "1", &[1]);
    let mut inner = Vec::new();
    elem(&mut inner, 0x02, "name", &string_payload("nested"));
    elem(&mut inner, 0x04, "items", &doc(&items));
    let mut elements = Vec::new();
    elem(&mut elements, 0x03, "doc", &doc(&inner));
    elem(&mut elements, 0x09, "at", &99i64.to_le_bytes());
    elem(&mut elements, 0x11, "ts", &7u64.to_le_bytes());
    elem(&mut elements, 0x12, "n", &(-3i64).to_le_bytes());
    elem(&mut elements, 0x0A, "z", &[]);
    let bytes = doc(&elements);

    let events = walk(&bytes).unwrap();
    let reencoded = encode_events(&events);
    assert_eq!(walk(&reencoded).unwrap(), events);
}
