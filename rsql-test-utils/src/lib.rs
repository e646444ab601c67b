//! RSQL Test Utilities
//!
//! Shared test infrastructure for the RSQL workspace:
//! - Fixtures for the device-management scenario used across crates
//! - Proptest generators for filters, entities and configuration
//! - Assertions for filter results and error codes
//! - Tracing setup for tests

// Re-export the types tests touch most
pub use rsql_core::{
    Clock, ComparisonOp, DistributionSet, EntityType, FilterConfig, FilterError, FixedClock,
    QueryPlan, RsqlError, RsqlResult, SchemaRegistry, StorageError, Target, TargetType, Timestamp,
    UpdateStatus, UPDATE_STATUS_NAMES,
};
pub use rsql_dsl::{parse, pretty_print, Argument, FilterExpr};
pub use rsql_storage::{FilterService, InMemoryStore, Page, PageRequest, QueryExecutor, SortKey};

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Install a test-writer subscriber honouring `RUST_LOG`. Safe to call from
/// every test; only the first call installs.
pub fn init_test_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rsql_dsl=debug,rsql_storage=debug,warn"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! The device-management scenario: five targets with tags, attributes,
    //! metadata, a target type and poll times, plus optional extras.

    use super::*;

    /// Second poll; the later of the two polled targets.
    pub const LAST_POLL_MILLIS: i64 = 1_700_000_000_000;
    /// First poll, two minutes earlier.
    pub const FIRST_POLL_MILLIS: i64 = LAST_POLL_MILLIS - 120_000;
    /// "Now" for placeholder tests: one minute after the last poll, so both
    /// polls are in the past but inside the default overdue window.
    pub const NOW_MILLIS: i64 = LAST_POLL_MILLIS + 60_000;

    fn at(millis: i64) -> Timestamp {
        DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn fixed_clock() -> FixedClock {
        FixedClock::new(at(NOW_MILLIS))
    }

    pub fn type1() -> TargetType {
        TargetType::new(1, "Type1").with_description("First target type")
    }

    pub fn type2() -> TargetType {
        TargetType::new(2, "Type2").with_description("Second target type")
    }

    pub fn assigned_ds() -> DistributionSet {
        DistributionSet::new(1, "AssignedDs", "1.0")
            .with_type("os", "OS")
            .with_tag("stable")
            .complete()
    }

    /// The five scenario targets:
    ///
    /// | controller id | tags        | attribute revision | metadata metaKey | type  |
    /// |---------------|-------------|--------------------|------------------|-------|
    /// | targetId123   | Tag1, Tag3  | 1.1                | metaValue        | Type1 |
    /// | targetId1234  | Tag1        | 1.2                | value            | Type2 |
    /// | targetId1235  | Tag2, Tag3  |                    |                  |       |
    /// | targetId1236  | Tag2, Tag3  |                    |                  |       |
    /// | targetId1237  |             |                    |                  |       |
    pub fn targets() -> Vec<Target> {
        vec![
            Target::new("targetId123")
                .with_name("targetName123")
                .with_description("targetDesc123")
                .with_attribute("revision", "1.1")
                .with_metadata("metaKey", "metaValue")
                .with_tag("Tag1")
                .with_tag("Tag3")
                .with_assigned_ds(assigned_ds())
                .with_type(type1())
                .with_status(UpdateStatus::Pending)
                .polled_at(at(FIRST_POLL_MILLIS))
                .created(at(FIRST_POLL_MILLIS - 3_600_000)),
            Target::new("targetId1234")
                .with_description("targetId1234")
                .with_attribute("revision", "1.2")
                .with_metadata("metaKey", "value")
                .with_tag("Tag1")
                .with_type(type2())
                .with_status(UpdateStatus::Registered)
                .polled_at(at(LAST_POLL_MILLIS))
                .created(at(FIRST_POLL_MILLIS - 1_800_000)),
            Target::new("targetId1235").with_tag("Tag2").with_tag("Tag3"),
            Target::new("targetId1236").with_tag("Tag2").with_tag("Tag3"),
            Target::new("targetId1237"),
        ]
    }

    /// A sixth target whose attribute and metadata keys contain dots.
    pub fn dotted_target() -> Target {
        Target::new("targetId1238")
            .with_attribute("test.dot", "dotted")
            .with_metadata("key.dot", "dotted")
            .with_address("10.0.0.8")
    }

    pub fn target_store() -> InMemoryStore<Target> {
        InMemoryStore::with_items(targets())
    }

    pub fn target_store_with_dotted() -> InMemoryStore<Target> {
        InMemoryStore::with_items(targets().into_iter().chain(std::iter::once(dotted_target())))
    }

    pub fn target_type_store() -> InMemoryStore<TargetType> {
        InMemoryStore::with_items(vec![type1(), type2(), TargetType::new(3, "Gateway")])
    }

    pub fn distribution_set_store() -> InMemoryStore<DistributionSet> {
        InMemoryStore::with_items(vec![
            assigned_ds(),
            DistributionSet::new(2, "OtherDs", "2.0")
                .with_description("incomplete")
                .with_type("app", "Application")
                .with_metadata("channel", "beta"),
            DistributionSet::new(3, "OtherDs", "2.1").complete(),
        ])
    }

    /// Filter service over the global registry, frozen at [`NOW_MILLIS`].
    pub fn service() -> FilterService<'static> {
        FilterService::new(FilterConfig::default()).with_clock(Arc::new(fixed_clock()))
    }

    /// The largest page [`service`] accepts.
    pub fn full_page() -> PageRequest {
        PageRequest::new(0, FilterConfig::default().max_page_size)
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for filters, entities and configuration.

    use super::*;
    use proptest::prelude::*;
    use rsql_dsl::LogicalOp;

    fn is_keyword(word: &str) -> bool {
        word.eq_ignore_ascii_case("and") || word.eq_ignore_ascii_case("or")
    }

    // === Scalar Generators ===

    /// Generate a Timestamp within 2020-2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        })
    }

    pub fn arb_entity_type() -> impl Strategy<Value = EntityType> {
        prop::sample::select(EntityType::ALL.to_vec())
    }

    pub fn arb_update_status() -> impl Strategy<Value = UpdateStatus> {
        prop_oneof![
            Just(UpdateStatus::Error),
            Just(UpdateStatus::InSync),
            Just(UpdateStatus::Pending),
            Just(UpdateStatus::Registered),
            Just(UpdateStatus::Unknown),
        ]
    }

    pub fn arb_comparison_op() -> impl Strategy<Value = ComparisonOp> {
        prop::sample::select(ComparisonOp::ALL.to_vec())
    }

    /// Generate a FilterConfig that passes validation.
    pub fn arb_valid_config() -> impl Strategy<Value = FilterConfig> {
        (any::<bool>(), 1u64..=86_400, 0u64..=86_400, 1usize..=1000).prop_map(
            |(case_insensitive, interval, overdue, max_page_size)| FilterConfig {
                case_insensitive,
                polling_interval_secs: interval,
                polling_overdue_secs: overdue,
                max_page_size,
            },
        )
    }

    // === Syntax Generators ===

    /// Generate a selector: a word, optionally with one dotted segment.
    pub fn arb_selector() -> impl Strategy<Value = String> {
        "[a-zA-Z][a-zA-Z0-9_]{0,6}(\\.[a-zA-Z0-9_]{1,6})?".prop_filter("keyword", |s| !is_keyword(s))
    }

    /// Generate an argument that prints without quotes.
    pub fn arb_bare_argument() -> impl Strategy<Value = Argument> {
        "[a-zA-Z0-9_.*$-]{1,8}"
            .prop_filter("keyword", |s| !is_keyword(s))
            .prop_map(Argument::bare)
    }

    /// Generate a quoted argument, including quotes and backslashes.
    pub fn arb_quoted_argument() -> impl Strategy<Value = Argument> {
        "\\PC{0,6}".prop_map(Argument::quoted)
    }

    pub fn arb_argument() -> impl Strategy<Value = Argument> {
        prop_oneof![3 => arb_bare_argument(), 1 => arb_quoted_argument()]
    }

    /// Generate a comparison with an argument count valid for its operator.
    pub fn arb_comparison() -> impl Strategy<Value = FilterExpr> {
        (arb_selector(), arb_comparison_op()).prop_flat_map(|(selector, op)| {
            let arguments = if op.is_multi_value() {
                prop::collection::vec(arb_argument(), 1..4).boxed()
            } else {
                arb_argument().prop_map(|a| vec![a]).boxed()
            };
            arguments.prop_map(move |arguments| FilterExpr::comparison(selector.clone(), op, arguments))
        })
    }

    /// Generate a filter shaped exactly as the parser builds it: left-nested
    /// OR of left-nested ANDs, with groups wherever a nested OR appears.
    pub fn arb_filter_expr() -> impl Strategy<Value = FilterExpr> {
        arb_comparison().prop_recursive(3, 24, 4, |inner| {
            let term = prop_oneof![3 => arb_comparison(), 1 => inner.prop_map(FilterExpr::group)];
            let conjunction = prop::collection::vec(term, 1..4);
            prop::collection::vec(conjunction, 1..3).prop_map(|disjuncts| {
                let fold = |op: LogicalOp, parts: Vec<FilterExpr>| {
                    parts
                        .into_iter()
                        .reduce(|left, right| match op {
                            LogicalOp::And => FilterExpr::and(left, right),
                            LogicalOp::Or => FilterExpr::or(left, right),
                        })
                };
                let ands = disjuncts
                    .into_iter()
                    .filter_map(|terms| fold(LogicalOp::And, terms))
                    .collect();
                fold(LogicalOp::Or, ands).unwrap_or_else(|| {
                    FilterExpr::comparison("name", ComparisonOp::Eq, vec![Argument::bare("x")])
                })
            })
        })
    }

    // === Entity Generators ===

    pub fn arb_tag() -> impl Strategy<Value = String> {
        prop_oneof![Just("Tag1"), Just("Tag2"), Just("Tag3"), Just("Other")].prop_map(str::to_string)
    }

    fn arb_map() -> impl Strategy<Value = Vec<(String, String)>> {
        let key = prop_oneof![Just("revision"), Just("metaKey"), Just("other")];
        let value = prop_oneof![Just("1.1"), Just("1.2"), Just("value"), Just("metaValue"), Just("")];
        prop::collection::vec((key, value), 0..3).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
    }

    /// Generate a Target drawing values from the fixture vocabulary, so
    /// generated filters actually hit.
    pub fn arb_target() -> impl Strategy<Value = Target> {
        (
            "dev-[a-z0-9]{1,6}",
            prop::option::of(prop_oneof![Just(String::new()), "[a-zA-Z0-9]{1,8}"]),
            prop::collection::btree_set(arb_tag(), 0..3),
            arb_map(),
            arb_map(),
            prop::option::of(prop_oneof![Just("Type1"), Just("Type2")]),
            prop::option::of(prop_oneof![Just("AssignedDs"), Just("OtherDs")]),
            arb_update_status(),
            prop::option::of(arb_timestamp()),
        )
            .prop_map(
                |(id, description, tags, attributes, metadata, target_type, ds, status, polled)| {
                    let mut target = Target::new(id).with_status(status);
                    target.description = description;
                    target.tags = tags.into_iter().collect();
                    target.attributes = attributes.into_iter().collect();
                    target.metadata = metadata.into_iter().collect();
                    target.target_type = target_type.map(|name| TargetType::new(1, name));
                    target.assigned_ds = ds.map(|name| DistributionSet::new(1, name, "1.0"));
                    target.last_target_query = polled;
                    target
                },
            )
    }

    /// Generate a `(field, value)` pair for an equality leaf on targets,
    /// covering every field kind and the empty-string operand.
    pub fn arb_target_leaf() -> impl Strategy<Value = (String, String)> {
        let text_field = prop_oneof![
            Just("name"),
            Just("description"),
            Just("tag"),
            Just("attribute.revision"),
            Just("metadata.metaKey"),
            Just("targettype.name"),
            Just("assignedds.name"),
        ];
        let text_value = prop_oneof![
            Just("''"),
            Just("*"),
            Just("Tag1"),
            Just("T*"),
            Just("1.1"),
            Just("value"),
            Just("Type1"),
            Just("dev-*"),
            Just("AssignedDs"),
        ];
        prop_oneof![
            3 => (text_field, text_value).prop_map(|(f, v)| (f.to_string(), v.to_string())),
            1 => prop::sample::select(UPDATE_STATUS_NAMES.to_vec())
                .prop_map(|v| ("updatestatus".to_string(), v.to_string())),
        ]
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for filter results.

    use super::*;

    /// Run `rsql` against `store` and return the number of matches.
    #[track_caller]
    pub fn count<T, S>(service: &FilterService<'_>, store: &S, entity: EntityType, rsql: &str) -> usize
    where
        S: QueryExecutor<T>,
    {
        let page = PageRequest::new(0, service.config().max_page_size);
        match service.find_by_rsql(store, entity, rsql, page) {
            Ok(page) => page.total,
            Err(e) => panic!("filter {:?} failed: {}", rsql, e),
        }
    }

    /// Assert the number of targets matching `rsql`.
    #[track_caller]
    pub fn assert_target_count(store: &InMemoryStore<Target>, rsql: &str, expected: usize) {
        let actual = count::<Target, _>(&fixtures::service(), store, EntityType::Target, rsql);
        assert_eq!(actual, expected, "filter {:?}", rsql);
    }

    /// Assert that a result is a filter error with the given code.
    #[track_caller]
    pub fn assert_filter_error<T: std::fmt::Debug>(result: &RsqlResult<T>, code: &str) {
        match result {
            Err(RsqlError::Filter(e)) => assert_eq!(e.code(), code, "unexpected error: {}", e),
            other => panic!("Expected filter error {}, got: {:?}", code, other),
        }
    }

    /// Assert that a result is a storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &RsqlResult<T>) {
        match result {
            Err(RsqlError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
