//! Property tests over generated, fully aligned chapters.

use std::sync::Arc;

use proptest::prelude::*;
use verbum_core::ScriptureRequest;
use verbum_fetch::StaticFetcher;
use verbum_service::{ScriptureService, ServiceConfig};
use verbum_storage::InMemoryCacheStore;
use verbum_test_utils::assertions::assert_alignment_invariants;
use verbum_test_utils::fixtures::ult_key;
use verbum_test_utils::generators::arb_aligned_chapter;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_aligned_chapter_is_complete(doc in arb_aligned_chapter("ROM", 8)) {
        let fetcher = StaticFetcher::new().with_document(&ult_key("ROM"), doc.clone());
        let service = ScriptureService::new(
            Arc::new(fetcher),
            Arc::new(InMemoryCacheStore::default()),
            ServiceConfig::default(),
        );

        let result = runtime()
            .block_on(service.fetch_scripture(ScriptureRequest::new("Romans 8")))
            .unwrap();
        let alignment = result.alignment.unwrap();

        assert_alignment_invariants(&doc, &alignment);
        prop_assert!(alignment.metadata.has_complete_alignment);
        prop_assert!(result.warnings.is_empty());
        prop_assert!(!result.text.contains('\\'));
        prop_assert!(result.text.starts_with("1 "));
    }
}
