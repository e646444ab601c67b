//! Fuzz test for the RSQL parser
//!
//! Run with: cargo +nightly fuzz run parser_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use rsql_dsl::{parse, pretty_print};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match parse(input) {
            Ok(ast) => {
                assert!(!ast.comparisons().is_empty(), "A filter has at least one comparison");

                // Canonical output must parse back to the same tree.
                let printed = pretty_print(&ast);
                let reparsed = parse(&printed)
                    .unwrap_or_else(|e| panic!("canonical form {:?} rejected: {}", printed, e));
                assert_eq!(reparsed, ast);
            }
            Err(err) => {
                assert!(err.line >= 1, "Error line should be >= 1");
                assert!(err.column >= 1, "Error column should be >= 1");
                assert!(!err.message.is_empty(), "Error message should not be empty");
            }
        }
    }
});
