//! Query executor trait and in-memory implementation

use crate::eval::CompiledPlan;
use crate::page::{compare_by, Page, PageRequest};
use crate::record::Filterable;
use rsql_core::{QueryPlan, StorageError};
use std::sync::{Arc, RwLock};

/// Executes translated plans against a store.
pub trait QueryExecutor<T>: Send + Sync {
    fn execute(&self, plan: &QueryPlan, page: &PageRequest) -> Result<Page<T>, StorageError>;
}

/// In-memory store for one entity type.
#[derive(Debug)]
pub struct InMemoryStore<T> {
    items: Arc<RwLock<Vec<T>>>,
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl<T> Clone for InMemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T: Filterable> InMemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items.into_iter().collect())),
        }
    }

    pub fn insert(&self, item: T) -> Result<(), StorageError> {
        self.items
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .push(item);
        Ok(())
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self
            .items
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl<T: Filterable> QueryExecutor<T> for InMemoryStore<T> {
    fn execute(&self, plan: &QueryPlan, page: &PageRequest) -> Result<Page<T>, StorageError> {
        if plan.entity != T::ENTITY {
            return Err(StorageError::EntityMismatch {
                plan: plan.entity,
                store: T::ENTITY,
            });
        }
        if let Some(key) = page.sort.iter().find(|k| !T::COLUMNS.contains(&k.column.as_str())) {
            return Err(StorageError::UnknownSortColumn {
                column: key.column.clone(),
            });
        }

        let compiled = CompiledPlan::compile(plan)?;
        let items = self.items.read().map_err(|_| StorageError::LockPoisoned)?;

        let mut matched: Vec<&T> = items.iter().filter(|item| compiled.matches(*item)).collect();
        if !page.sort.is_empty() {
            matched.sort_by(|a, b| compare_by(*a, *b, &page.sort));
        }

        let total = matched.len();
        let content = matched
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect::<Vec<_>>();

        tracing::debug!(
            entity = %plan.entity,
            scanned = items.len(),
            total,
            returned = content.len(),
            "Executed query plan"
        );

        Ok(Page { content, total })
    }
}
