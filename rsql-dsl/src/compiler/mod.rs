//! RSQL Compiler - Transform a filter string into a QueryPlan
//!
//! # Pipeline
//!
//! ```text
//! RSQL → Lexer → Parser → FilterExpr → Resolver → ValidatedExpr → Translator → QueryPlan
//!                                         ↓                           ↓
//!                                   SchemaRegistry               Normalizer
//!                                                           (placeholders, patterns)
//! ```
//!
//! Every stage is pure and synchronous. Placeholder values are captured once
//! at the start of each compilation.

pub mod normalizer;
pub mod resolver;
pub mod translator;

pub use normalizer::*;
pub use resolver::*;
pub use translator::*;

use crate::parser::parse;
use rsql_core::{
    Clock, EntityType, FilterConfig, FilterError, PlaceholderValues, QueryPlan, SchemaRegistry,
};

/// Everything a compilation reads besides the filter itself.
#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    pub registry: &'a SchemaRegistry,
    pub config: &'a FilterConfig,
    pub clock: &'a dyn Clock,
}

impl<'a> CompileContext<'a> {
    pub fn new(registry: &'a SchemaRegistry, config: &'a FilterConfig, clock: &'a dyn Clock) -> Self {
        Self {
            registry,
            config,
            clock,
        }
    }

    /// Capture placeholder values for one translation.
    pub fn value_context(&self) -> ValueContext {
        ValueContext {
            placeholders: PlaceholderValues::capture(self.clock, self.config),
            case_insensitive: self.config.case_insensitive,
        }
    }
}

/// Parse, validate and translate `rsql` for `entity`.
pub fn compile(
    rsql: &str,
    entity: EntityType,
    ctx: &CompileContext<'_>,
) -> Result<QueryPlan, FilterError> {
    let result = parse(rsql)
        .map_err(FilterError::from)
        .and_then(|ast| resolve(&ast, entity, ctx.registry))
        .and_then(|validated| translate(&validated, entity, &ctx.value_context()));

    match &result {
        Ok(plan) => tracing::debug!(
            entity = %entity,
            filter = rsql,
            joins = plan.joins.len(),
            predicate = %plan.predicate,
            "Compiled RSQL filter"
        ),
        Err(e) => tracing::debug!(
            entity = %entity,
            filter = rsql,
            code = e.code(),
            error = %e,
            "Rejected RSQL filter"
        ),
    }

    result
}

/// Parse and structurally validate `rsql` without translating it.
pub fn validate(
    rsql: &str,
    entity: EntityType,
    registry: &SchemaRegistry,
) -> Result<ValidatedExpr, FilterError> {
    let ast = parse(rsql)?;
    resolve(&ast, entity, registry)
}
