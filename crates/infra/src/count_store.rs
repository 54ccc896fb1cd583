//! Inventory count persistence.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use stockyard_core::{CountId, LedgerError, LedgerResult, ReferenceNo};
use stockyard_ledger::InventoryCount;

use crate::query::{CountFilter, Page, Pagination};

/// Keyed store for inventory counts. Listings are ordered newest first.
pub trait CountStore: Send + Sync {
    /// Stores a new count. Fails with `Conflict` if the id already exists.
    fn insert(&self, count: InventoryCount) -> LedgerResult<()>;

    /// Replaces an existing count. Fails with `NotFound` if absent.
    fn update(&self, count: InventoryCount) -> LedgerResult<()>;

    fn get(&self, id: &CountId) -> LedgerResult<Option<InventoryCount>>;

    fn list(
        &self,
        filter: &CountFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<InventoryCount>>;
}

impl<S> CountStore for Arc<S>
where
    S: CountStore + ?Sized,
{
    fn insert(&self, count: InventoryCount) -> LedgerResult<()> {
        (**self).insert(count)
    }

    fn update(&self, count: InventoryCount) -> LedgerResult<()> {
        (**self).update(count)
    }

    fn get(&self, id: &CountId) -> LedgerResult<Option<InventoryCount>> {
        (**self).get(id)
    }

    fn list(
        &self,
        filter: &CountFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<InventoryCount>> {
        (**self).list(filter, pagination)
    }
}

#[derive(Debug, Default)]
struct Inner {
    by_id: HashMap<CountId, InventoryCount>,
    /// Reference numbers are unique across all counts ever inserted.
    references: HashSet<ReferenceNo>,
}

/// In-memory count store for tests and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemoryCountStore {
    inner: RwLock<Inner>,
}

impl InMemoryCountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CountStore for InMemoryCountStore {
    fn insert(&self, count: InventoryCount) -> LedgerResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerError::storage("count store lock poisoned"))?;
        if inner.by_id.contains_key(&count.id) {
            return Err(LedgerError::conflict(format!(
                "count {} already exists",
                count.id
            )));
        }
        if inner.references.contains(&count.reference_no) {
            return Err(LedgerError::conflict(format!(
                "reference {} already exists",
                count.reference_no
            )));
        }
        inner.references.insert(count.reference_no.clone());
        inner.by_id.insert(count.id, count);
        Ok(())
    }

    fn update(&self, count: InventoryCount) -> LedgerResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerError::storage("count store lock poisoned"))?;
        if !inner.by_id.contains_key(&count.id) {
            return Err(LedgerError::not_found("inventory count"));
        }
        inner.by_id.insert(count.id, count);
        Ok(())
    }

    fn get(&self, id: &CountId) -> LedgerResult<Option<InventoryCount>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::storage("count store lock poisoned"))?;
        Ok(inner.by_id.get(id).cloned())
    }

    fn list(
        &self,
        filter: &CountFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<InventoryCount>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::storage("count store lock poisoned"))?;

        let mut matching: Vec<InventoryCount> = inner
            .by_id
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            (b.created_at, b.id.as_uuid()).cmp(&(a.created_at, a.id.as_uuid()))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit as usize)
            .collect();
        Ok(Page::new(items, pagination, total))
    }
}
