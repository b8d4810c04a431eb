//! Fuzz target for whole-document parsing
//!
//! Arbitrary bytes, including invalid UTF-8, must parse without panicking
//! and yield alignment metadata consistent with the entries.
//!
//! Run with: cargo +nightly fuzz run document_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use verbum_usfm::{parse_document, ParseOptions};

fuzz_target!(|data: &[u8]| {
    let parsed = parse_document(data, &ParseOptions::default());
    let alignment = &parsed.alignment;

    assert_eq!(alignment.metadata.total_alignments, alignment.words.len());
    for entry in &alignment.words {
        assert!(entry.position.start < entry.position.end, "empty entry span");
        if let Some(confidence) = entry.confidence {
            assert!((0.0..=1.0).contains(&confidence), "confidence out of range");
        }
    }
    for pair in alignment.words.windows(2) {
        assert!(pair[0].position.start < pair[1].position.start, "entries out of order");
    }
});
