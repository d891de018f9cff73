//! Chunk-invariance: any partition of the input into chunks must produce
//! the identical event stream and diagnostics as a single-shot parse.

use alloc::{vec, vec::Vec};

use quickcheck::QuickCheck;

use crate::{
    tests::util::{Event, Recorder},
    JsonParser, ParseError, ParserOptions, Recovering,
};

/// Inputs with tokens that are interesting to split: numbers, literals,
/// escapes, surrogate pairs, comments, CRLF, and a few malformed documents
/// whose diagnostics must also be split-invariant.
static CORPUS: &[&str] = &[
    r#"{"a":1,"b":-2.5e3}"#,
    r#"[true,false,null,"x"]"#,
    "{ /* c */ \"k\" : \"v\" // tail\n }",
    r#"{"nested":{"deep":[1,2,{"three":3.14159}]}}"#,
    r#""𝄞 and A""#,
    r#"["\"\\\/\b\f\n\r\t"]"#,
    "[1234567890123456789012345, -0.000125, 1e300]",
    "{\r\n  \"crlf\": [10, 20]\r\n}",
    "  [ 100 , 200.5 , \"s\" ]  ",
    "null",
    "-9223372036854775808",
    "[[[[[[[1]]]]]]]",
    // Malformed but recoverable.
    r#"{"a":01}"#,
    "[1,]",
    "\"bare\tta b\"",
];

fn run(doc: &str, splits: &[usize]) -> (Vec<Event>, Vec<ParseError>) {
    let mut parser = JsonParser::new(ParserOptions::default());
    let mut recorder = Recorder::default();
    let mut errors = Recovering::new();

    let mut start = 0;
    for s in splits {
        if start >= doc.len() {
            break;
        }
        let mut size = 1 + (s % (doc.len() - start));
        while !doc.is_char_boundary(start + size) {
            size += 1;
        }
        parser
            .parse(&doc[start..start + size], &mut recorder, &mut errors)
            .unwrap();
        start += size;
    }
    if start < doc.len() {
        parser
            .parse(&doc[start..], &mut recorder, &mut errors)
            .unwrap();
    }
    parser.end_parse(&mut recorder, &mut errors).unwrap();
    (recorder.events, errors.into_diagnostics())
}

#[test]
fn partition_invariance_quickcheck() {
    fn prop(doc_index: usize, splits: Vec<usize>) -> bool {
        let doc = CORPUS[doc_index % CORPUS.len()];
        run(doc, &splits) == run(doc, &[])
    }

    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    QuickCheck::new()
        .tests(tests)
        .quickcheck(prop as fn(usize, Vec<usize>) -> bool);
}

#[test]
fn byte_at_a_time_matches_single_shot() {
    for doc in CORPUS {
        let single = run(doc, &[]);
        let splits = vec![0; doc.len()]; // every chunk one character
        assert_eq!(run(doc, &splits), single, "doc: {doc}");
    }
}
