//! Fuzz test for filter compilation
//!
//! Arbitrary text must either compile or fail with a filter error; the
//! compiler must never panic, whatever the field paths or values.
//!
//! Run with: cargo +nightly fuzz run compile_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use rsql_core::{EntityType, FilterConfig, FixedClock, SchemaRegistry};
use rsql_dsl::{compile, CompileContext};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let config = FilterConfig::default();
        let Some(clock) = FixedClock::at_millis(0) else {
            return;
        };
        let ctx = CompileContext::new(SchemaRegistry::global(), &config, &clock);

        for entity in EntityType::ALL {
            if let Ok(plan) = compile(input, entity, &ctx) {
                assert_eq!(plan.entity, entity);
                let mut ids: Vec<_> = plan.joins.iter().map(|j| j.id.clone()).collect();
                ids.sort();
                ids.dedup();
                assert_eq!(ids.len(), plan.joins.len(), "Joins must be unique");
            }
        }
    }
});
