//! VERBUM Test Utilities
//!
//! Centralized test infrastructure for the VERBUM workspace:
//! - Instrumented fetchers and stores for concurrency and failure tests
//! - Proptest generators for aligned USFM documents
//! - USFM fixtures for common scenarios
//! - Custom assertions for alignment invariants

pub use verbum_core::{
    AlignmentEntry, AlignmentResult, CacheStoreError, FetchError, ResourceKey, VerbumError,
    VerbumResult,
};
pub use verbum_fetch::ResourceFetcher;
pub use verbum_storage::{CacheEntry, CacheKey, CacheStats, CacheStore};

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ============================================================================
// MOCK FETCHERS AND STORES
// ============================================================================

/// Fetcher that counts invocations, optionally sleeps, and can fail its
/// first N calls.
#[derive(Debug)]
pub struct CountingFetcher {
    body: Bytes,
    delay: Duration,
    fail_first: usize,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            delay: Duration::ZERO,
            fail_first: 0,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep this long (on the tokio clock) before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the first `count` calls with a transient network error.
    pub fn failing_first(mut self, count: usize) -> Self {
        self.fail_first = count;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceFetcher for CountingFetcher {
    async fn fetch(&self, key: &ResourceKey) -> Result<Bytes, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if call < self.fail_first {
            return Err(FetchError::Network {
                resource: key.to_string(),
                reason: format!("injected failure {}", call + 1),
            });
        }
        Ok(self.body.clone())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Store whose every read and write fails.
#[derive(Debug, Default)]
pub struct FailingCacheStore {
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl FailingCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    fn unavailable() -> CacheStoreError {
        CacheStoreError::Backend {
            reason: "store unavailable".to_string(),
        }
    }
}

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, CacheStoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }

    async fn set(&self, _key: &CacheKey, _entry: CacheEntry) -> Result<(), CacheStoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }

    async fn delete(&self, _key: &CacheKey) -> Result<bool, CacheStoreError> {
        Err(Self::unavailable())
    }

    async fn stats(&self) -> Result<CacheStats, CacheStoreError> {
        Err(Self::unavailable())
    }

    async fn flush(&self) -> Result<(), CacheStoreError> {
        Err(Self::unavailable())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for well-formed aligned USFM.

    use proptest::prelude::*;

    /// A rendered English-like word.
    pub fn arb_target_word() -> impl Strategy<Value = String> {
        "[A-Za-z]{1,10}"
    }

    /// A Strong's number such as `G25` or `H07225`.
    pub fn arb_strong() -> impl Strategy<Value = String> {
        "[GH][0-9]{2,5}"
    }

    /// One `\zaln-s ... \zaln-e\*` group wrapping one to three words.
    pub fn arb_alignment_group() -> impl Strategy<Value = String> {
        (
            "[α-ω]{1,8}",
            prop::option::of(arb_strong()),
            prop::option::of("[α-ω]{1,8}"),
            (1u32..4, 0u32..3),
            prop::collection::vec(arb_target_word(), 1..4),
        )
            .prop_map(|(content, strong, lemma, (occurrence, extra), words)| {
                let mut attrs = format!("x-content=\"{}\"", content);
                if let Some(strong) = strong {
                    attrs.push_str(&format!(" x-strong=\"{}\"", strong));
                }
                if let Some(lemma) = lemma {
                    attrs.push_str(&format!(" x-lemma=\"{}\"", lemma));
                }
                attrs.push_str(&format!(
                    " x-occurrence=\"{}\" x-occurrences=\"{}\"",
                    occurrence,
                    occurrence + extra
                ));
                let body: Vec<String> = words
                    .iter()
                    .map(|w| format!("\\w {}|x-occurrence=\"1\" x-occurrences=\"1\"\\w*", w))
                    .collect();
                format!("\\zaln-s |{}\\*{}\\zaln-e\\*", attrs, body.join(" "))
            })
    }

    /// A single-chapter document for `book`, every verse fully aligned.
    pub fn arb_aligned_chapter(book: &'static str, chapter: u32) -> impl Strategy<Value = String> {
        prop::collection::vec(prop::collection::vec(arb_alignment_group(), 1..5), 1..6).prop_map(
            move |verses| {
                let mut doc = format!("\\id {}\n\\c {}\n\\p\n", book, chapter);
                for (i, groups) in verses.iter().enumerate() {
                    doc.push_str(&format!("\\v {} {}\n", i + 1, groups.join("\n")));
                }
                doc
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built USFM documents for common testing scenarios.

    use super::*;

    /// John 3:16-17 from an aligned ULT excerpt.
    pub const JOHN_3_ALIGNED: &str = concat!(
        "\\id JHN EN_ULT en_English_ltr unfoldingWord Literal Text\n",
        "\\h John\n",
        "\\mt John\n",
        "\\c 3\n",
        "\\p\n",
        "\\v 16 \\zaln-s |x-strong=\"G37790\" x-lemma=\"οὕτω\" x-morph=\"Gr,D,,,,,,,,\" x-occurrence=\"1\" x-occurrences=\"1\" x-content=\"οὕτως\"\\*",
        "\\w For|x-occurrence=\"1\" x-occurrences=\"1\"\\w*\\zaln-e\\*\n",
        "\\zaln-s |x-strong=\"G23160\" x-lemma=\"θεός\" x-morph=\"Gr,N,,,,,NMS,\" x-occurrence=\"1\" x-occurrences=\"1\" x-content=\"Θεὸς\"\\*",
        "\\w God|x-occurrence=\"1\" x-occurrences=\"1\"\\w*\\zaln-e\\*\n",
        "\\zaln-s |x-strong=\"G00250\" x-lemma=\"ἀγαπάω\" x-morph=\"Gr,V,IAA3,,S,\" x-occurrence=\"1\" x-occurrences=\"1\" x-content=\"ἠγάπησεν\"\\*",
        "\\w so|x-occurrence=\"1\" x-occurrences=\"1\"\\w*\n",
        "\\w loved|x-occurrence=\"1\" x-occurrences=\"1\"\\w*\\zaln-e\\*\n",
        "\\zaln-s |x-strong=\"G28890\" x-lemma=\"κόσμος\" x-morph=\"Gr,N,,,,,AMS,\" x-occurrence=\"1\" x-occurrences=\"1\" x-content=\"κόσμον\"\\*",
        "\\w the|x-occurrence=\"1\" x-occurrences=\"2\"\\w*\n",
        "\\w world|x-occurrence=\"1\" x-occurrences=\"1\"\\w*\\zaln-e\\*,\n",
        "\\v 17 \\zaln-s |x-strong=\"G10630\" x-lemma=\"γάρ\" x-morph=\"Gr,CC,,,,,,,,\" x-occurrence=\"1\" x-occurrences=\"1\" x-content=\"γὰρ\"\\*",
        "\\w For|x-occurrence=\"2\" x-occurrences=\"2\"\\w*\\zaln-e\\*\n",
        "\\zaln-s |x-strong=\"G23160\" x-lemma=\"θεός\" x-morph=\"Gr,N,,,,,NMS,\" x-occurrence=\"1\" x-occurrences=\"1\" x-content=\"Θεὸς\"\\*",
        "\\w God|x-occurrence=\"2\" x-occurrences=\"2\"\\w*\\zaln-e\\*\n",
        "\\zaln-s |x-strong=\"G06490\" x-lemma=\"ἀποστέλλω\" x-morph=\"Gr,V,IAA3,,S,\" x-occurrence=\"1\" x-occurrences=\"1\" x-content=\"ἀπέστειλεν\"\\*",
        "\\w sent|x-occurrence=\"1\" x-occurrences=\"1\"\\w*\\zaln-e\\*\n",
    );

    /// Plain-text ULT rendering of [`JOHN_3_ALIGNED`] with verse numbers.
    pub const JOHN_3_TEXT: &str = "16 For God so loved the world, 17 For God sent";

    /// Stray alignment end, unterminated word and an empty word.
    pub const MALFORMED: &str = concat!(
        "\\c 1\n",
        "\\v 1 In the beginning\\zaln-e\\* was \\w \\w* the Word.\n",
        "\\v 2 \\zaln-s |x-content=\"οὗτος\"\\*\\w He\\w*\\zaln-e\\* was \\w in\n",
    );

    /// Verse text without any alignment markup.
    pub const UNALIGNED: &str = "\\id GEN\n\\c 1\n\\p\n\\v 1 In the beginning God created the heavens and the earth.\n";

    /// Resource key for the unfoldingWord English ULT.
    pub fn ult_key(book: &str) -> ResourceKey {
        ResourceKey::new("unfoldingWord", "en", "ult", book, "master")
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over alignment results.

    use super::*;

    /// Assert the per-entry and summary invariants of an alignment result
    /// parsed from `source`.
    #[track_caller]
    pub fn assert_alignment_invariants(source: &str, result: &AlignmentResult) {
        assert_eq!(
            result.metadata.total_alignments,
            result.words.len(),
            "totalAlignments must equal the entry count"
        );
        for entry in &result.words {
            assert_entry_invariants(source, entry);
        }
        for pair in result.words.windows(2) {
            assert!(
                pair[0].position.start < pair[1].position.start,
                "entries out of document order: {:?} then {:?}",
                pair[0].position,
                pair[1].position
            );
        }
    }

    #[track_caller]
    pub fn assert_entry_invariants(source: &str, entry: &AlignmentEntry) {
        let position = &entry.position;
        assert!(position.start < position.end, "empty span: {:?}", position);
        assert_eq!(
            source.get(position.start..position.end),
            Some(entry.target_word.as_str()),
            "span does not cover the target word"
        );
        if let (Some(o), Some(n)) = (entry.attributes.occurrence, entry.attributes.occurrences) {
            assert!(o <= n, "occurrence {} > occurrences {}", o, n);
        }
        if let Some(confidence) = entry.confidence {
            assert!((0.0..=1.0).contains(&confidence), "confidence {} out of range", confidence);
        }
    }

    /// Assert that a result failed with a fetch error.
    #[track_caller]
    pub fn assert_fetch_error<T: std::fmt::Debug>(result: &VerbumResult<T>) {
        match result {
            Err(e) if e.is_fetch_error() => {}
            other => panic!("Expected fetch error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
