//! Entity trait: identity + continuity across state changes.

use std::collections::BTreeMap;

use crate::error::{DomainError, DomainResult};

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Ord + core::fmt::Debug + core::fmt::Display;

    /// Human-readable kind used in `SubjectNotFound` errors.
    const KIND: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Look up an entity by id, mapping absence to `SubjectNotFound`.
pub fn find<E: Entity>(table: &BTreeMap<E::Id, E>, id: E::Id) -> DomainResult<&E> {
    table.get(&id).ok_or_else(|| DomainError::not_found(E::KIND, id))
}

/// Mutable counterpart of [`find`].
pub fn find_mut<E: Entity>(table: &mut BTreeMap<E::Id, E>, id: E::Id) -> DomainResult<&mut E> {
    table
        .get_mut(&id)
        .ok_or_else(|| DomainError::not_found(E::KIND, id))
}

/// Insert an entity keyed by its own id.
pub fn insert<E: Entity>(table: &mut BTreeMap<E::Id, E>, entity: E) -> E::Id {
    let id = *entity.id();
    table.insert(id, entity);
    id
}

/// Find a child entity inside an owning collection (lines, returns).
pub fn find_in<E: Entity>(items: &[E], id: E::Id) -> DomainResult<&E> {
    items
        .iter()
        .find(|e| *e.id() == id)
        .ok_or_else(|| DomainError::not_found(E::KIND, id))
}

/// Mutable counterpart of [`find_in`].
pub fn find_in_mut<E: Entity>(items: &mut [E], id: E::Id) -> DomainResult<&mut E> {
    items
        .iter_mut()
        .find(|e| *e.id() == id)
        .ok_or_else(|| DomainError::not_found(E::KIND, id))
}
