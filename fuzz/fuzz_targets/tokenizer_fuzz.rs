//! Fuzz target for the USFM tokenizer
//!
//! Feeds arbitrary UTF-8 text through the tokenizer looking for panics,
//! non-terminating scans and spans outside the source.
//!
//! Run with: cargo +nightly fuzz run tokenizer_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use verbum_usfm::tokenize;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut tokenizer = tokenize(input);
        let tokens: Vec<_> = tokenizer.by_ref().collect();
        let warnings = tokenizer.take_warnings();

        let mut last_start = 0;
        for token in &tokens {
            assert!(token.span.start <= token.span.end, "inverted span");
            assert!(token.span.end <= input.len(), "span past end of input");
            assert!(token.span.start >= last_start, "tokens out of order");
            assert_eq!(&input[token.span.start..token.span.end], token.raw);
            last_start = token.span.start;
        }
        for warning in &warnings {
            assert!(warning.offset <= input.len(), "warning offset past end of input");
        }
    }
});
