//! RSQL Storage - Query Executor and In-Memory Implementation
//!
//! Defines the executor abstraction that query plans are handed to, an
//! in-memory store that evaluates plans directly, and the [`FilterService`]
//! that ties compilation and execution together.
//!
//! A relational backend implements [`QueryExecutor`] by rendering the plan's
//! joins and predicates into its own query language.

pub mod eval;
pub mod memory;
pub mod page;
pub mod record;
pub mod service;

pub use eval::CompiledPlan;
pub use memory::{InMemoryStore, QueryExecutor};
pub use page::{Direction, Page, PageRequest, SortKey};
pub use record::{Filterable, Row, StoreValue};
pub use service::FilterService;

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use rsql_core::{EntityType, FilterConfig, FixedClock, Target};
    use std::sync::Arc;

    fn service() -> FilterService<'static> {
        FilterService::new(FilterConfig::default())
            .with_clock(Arc::new(FixedClock::at_millis(0).unwrap()))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Paging never changes the total and never returns more than the limit.
        #[test]
        fn prop_page_window(count in 0usize..40, offset in 0usize..50, limit in 0usize..20) {
            let store = InMemoryStore::with_items((0..count).map(|i| Target::new(format!("t{:02}", i))));
            let page: Page<Target> = service()
                .find_by_rsql(&store, EntityType::Target, "name==t*", PageRequest::new(offset, limit))
                .unwrap();
            prop_assert_eq!(page.total, count);
            prop_assert_eq!(page.len(), count.saturating_sub(offset).min(limit));
        }

        /// An exact-name filter finds exactly the matching target.
        #[test]
        fn prop_exact_name_matches_once(count in 1usize..30, pick in any::<prop::sample::Index>()) {
            let store = InMemoryStore::with_items((0..count).map(|i| Target::new(format!("t{:02}", i))));
            let wanted = format!("t{:02}", pick.index(count));
            let page: Page<Target> = service()
                .find_by_rsql(&store, EntityType::Target, &format!("controllerid=={}", wanted), PageRequest::new(0, 100))
                .unwrap();
            prop_assert_eq!(page.total, 1);
            prop_assert_eq!(&page.content[0].controller_id, &wanted);
        }
    }
}
