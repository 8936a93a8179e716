//! Property-based tests for tool input models.

use proptest::prelude::*;
use glean_mcp::models::{MAX_PAGE_SIZE, PeopleProfileSearchInput, ReadDocumentsInput, SearchInput};

proptest! {
    /// Any non-blank query with an in-range page size validates.
    #[test]
    fn search_accepts_valid_input(
        query in "[a-zA-Z0-9][a-zA-Z0-9 ]{0,80}",
        page_size in 1u32..=MAX_PAGE_SIZE,
    ) {
        let input: SearchInput = serde_json::from_value(serde_json::json!({
            "query": query,
            "pageSize": page_size,
        })).unwrap();
        prop_assert!(input.validate().is_ok());
    }

    /// Page sizes above the cap are always rejected.
    #[test]
    fn search_rejects_oversized_pages(page_size in (MAX_PAGE_SIZE + 1)..10_000u32) {
        let input: SearchInput = serde_json::from_value(serde_json::json!({
            "query": "q",
            "pageSize": page_size,
        })).unwrap();
        prop_assert!(input.validate().is_err());
    }

    /// Whitespace-only queries never validate.
    #[test]
    fn search_rejects_blank_query(query in "[ \t\n]{0,10}") {
        let input: SearchInput = serde_json::from_value(serde_json::json!({"query": query})).unwrap();
        prop_assert!(input.validate().is_err());
    }

    /// A people search is valid iff it has a query or a filter.
    #[test]
    fn people_needs_query_or_filter(
        query in proptest::option::of("[a-z]{0,5}"),
        filters in proptest::collection::btree_map("[a-z]{1,8}", "[A-Za-z]{1,8}", 0..3),
    ) {
        let has_query = query.as_deref().is_some_and(|q| !q.is_empty());
        let has_filters = !filters.is_empty();
        let input: PeopleProfileSearchInput = serde_json::from_value(serde_json::json!({
            "query": query,
            "filters": filters,
        })).unwrap();

        prop_assert_eq!(input.validate().is_ok(), has_query || has_filters);
    }

    /// Document reads need at least one id or URL.
    #[test]
    fn read_documents_needs_target(
        ids in proptest::collection::vec("[a-z0-9-]{1,12}", 0..3),
        urls in proptest::collection::vec("https://[a-z]{1,8}\\.example\\.com/[a-z]{0,8}", 0..3),
    ) {
        let expect_ok = !ids.is_empty() || !urls.is_empty();
        let input: ReadDocumentsInput = serde_json::from_value(serde_json::json!({
            "ids": ids,
            "urls": urls,
        })).unwrap();

        prop_assert_eq!(input.validate().is_ok(), expect_ok);
    }
}
