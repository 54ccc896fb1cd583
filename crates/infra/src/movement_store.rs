//! Movement persistence.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use stockyard_core::{LedgerError, LedgerResult, MovementId, ReferenceNo};
use stockyard_ledger::Movement;

use crate::query::{MovementFilter, Page, Pagination};

/// Keyed store for stock movements.
///
/// Listings are ordered newest first.
pub trait MovementStore: Send + Sync {
    /// Stores a new movement. Fails with `Conflict` if the id already exists.
    fn insert(&self, movement: Movement) -> LedgerResult<()>;

    /// Replaces an existing movement. Fails with `NotFound` if absent.
    fn update(&self, movement: Movement) -> LedgerResult<()>;

    fn get(&self, id: &MovementId) -> LedgerResult<Option<Movement>>;

    fn list(
        &self,
        filter: &MovementFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<Movement>>;
}

impl<S> MovementStore for Arc<S>
where
    S: MovementStore + ?Sized,
{
    fn insert(&self, movement: Movement) -> LedgerResult<()> {
        (**self).insert(movement)
    }

    fn update(&self, movement: Movement) -> LedgerResult<()> {
        (**self).update(movement)
    }

    fn get(&self, id: &MovementId) -> LedgerResult<Option<Movement>> {
        (**self).get(id)
    }

    fn list(
        &self,
        filter: &MovementFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<Movement>> {
        (**self).list(filter, pagination)
    }
}

#[derive(Debug, Default)]
struct Inner {
    by_id: HashMap<MovementId, Movement>,
    /// Reference numbers are unique across all movements ever inserted.
    references: HashSet<ReferenceNo>,
}

/// In-memory movement store for tests and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemoryMovementStore {
    inner: RwLock<Inner>,
}

impl InMemoryMovementStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MovementStore for InMemoryMovementStore {
    fn insert(&self, movement: Movement) -> LedgerResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerError::storage("movement store lock poisoned"))?;
        if inner.by_id.contains_key(&movement.id) {
            return Err(LedgerError::conflict(format!(
                "movement {} already exists",
                movement.id
            )));
        }
        if inner.references.contains(&movement.reference_no) {
            return Err(LedgerError::conflict(format!(
                "reference {} already exists",
                movement.reference_no
            )));
        }
        inner.references.insert(movement.reference_no.clone());
        inner.by_id.insert(movement.id, movement);
        Ok(())
    }

    fn update(&self, movement: Movement) -> LedgerResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerError::storage("movement store lock poisoned"))?;
        if !inner.by_id.contains_key(&movement.id) {
            return Err(LedgerError::not_found("stock movement"));
        }
        inner.by_id.insert(movement.id, movement);
        Ok(())
    }

    fn get(&self, id: &MovementId) -> LedgerResult<Option<Movement>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::storage("movement store lock poisoned"))?;
        Ok(inner.by_id.get(id).cloned())
    }

    fn list(
        &self,
        filter: &MovementFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<Movement>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::storage("movement store lock poisoned"))?;

        let mut matching: Vec<Movement> = inner
            .by_id
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        // Newest first; id breaks creation-time ties.
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
