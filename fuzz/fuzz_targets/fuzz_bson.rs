#![no_main]
use eventson::{BsonParser, EventHandler, SliceSource};
use libfuzzer_sys::fuzz_target;

struct Sink;

impl EventHandler for Sink {}

fuzz_target!(|data: &[u8]| {
    let mut parser = BsonParser::new(SliceSource::new(data));
    let mut sink = Sink;
    let _ = parser.parse(&mut sink);
});
