//! Filter service
//!
//! Entry point used by request handlers: compiles an RSQL filter for an
//! entity and runs the plan through a [`QueryExecutor`]. Filter errors and
//! executor errors stay distinct in [`RsqlError`].

use crate::memory::QueryExecutor;
use crate::page::{Page, PageRequest};
use rsql_core::{
    Clock, EntityType, FilterConfig, FilterError, QueryPlan, RsqlResult, SchemaRegistry,
    SystemClock,
};
use rsql_dsl::{compile, validate, CompileContext};
use std::sync::Arc;

#[derive(Clone)]
pub struct FilterService<'r> {
    registry: &'r SchemaRegistry,
    config: FilterConfig,
    clock: Arc<dyn Clock>,
}

impl FilterService<'static> {
    /// Service over the global registry and the system clock.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            registry: SchemaRegistry::global(),
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Service configured from defaults plus `RSQL_*` environment variables.
    pub fn from_env() -> RsqlResult<Self> {
        let config = FilterConfig::default().with_env_overrides()?;
        Ok(Self::new(config))
    }
}

impl<'r> FilterService<'r> {
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_registry<'n>(self, registry: &'n SchemaRegistry) -> FilterService<'n> {
        FilterService {
            registry,
            config: self.config,
            clock: self.clock,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Translate `rsql` into a plan without executing it.
    pub fn plan(&self, entity: EntityType, rsql: &str) -> Result<QueryPlan, FilterError> {
        let ctx = CompileContext::new(self.registry, &self.config, self.clock.as_ref());
        compile(rsql, entity, &ctx)
    }

    /// Check `rsql` for syntax and field errors only.
    pub fn validate(&self, entity: EntityType, rsql: &str) -> Result<(), FilterError> {
        validate(rsql, entity, self.registry).map(|_| ())
    }

    /// Compile `rsql` and execute it. The page request reaches the executor
    /// as given; a limit above the configured maximum page size is rejected.
    pub fn find_by_rsql<T, S>(
        &self,
        store: &S,
        entity: EntityType,
        rsql: &str,
        page: PageRequest,
    ) -> RsqlResult<Page<T>>
    where
        S: QueryExecutor<T> + ?Sized,
    {
        if page.limit > self.config.max_page_size {
            return Err(FilterError::PageLimitExceeded {
                limit: page.limit,
                max: self.config.max_page_size,
            }
            .into());
        }
        let plan = self.plan(entity, rsql)?;
        let result = store.execute(&plan, &page).map_err(|e| {
            tracing::warn!(entity = %entity, filter = rsql, error = %e, "Query execution failed");
            e
        })?;
        Ok(result)
    }
}

impl std::fmt::Debug for FilterService<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
