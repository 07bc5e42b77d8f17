// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use thiserror::Error;

use crate::group::{Changeset, Group, GroupId};
use crate::types::ObjectIdentity;

/// Persistent storage of groups and their object assignments.
///
/// Implementations must apply a `Changeset` atomically: either every mutation in it becomes
/// visible or none does, and concurrent commits touching the same (group, object) key must not
/// lose updates.
pub trait GroupStore {
    type Error: Error;

    /// Load one group, `None` if it does not exist.
    fn load_group(&self, id: &GroupId) -> Result<Option<Group>, Self::Error>;

    /// Insert or replace a group.
    fn save_group(&self, group: &Group) -> Result<(), Self::Error>;

    /// All stored groups, static and dynamic.
    fn all_groups(&self) -> Result<Vec<Group>, Self::Error>;

    /// Apply all mutations of a changeset in one transaction.
    fn commit(&self, changeset: &Changeset) -> Result<(), Self::Error>;

    /// Delete the assignments of one object from every group.
    ///
    /// Returns the number of removed assignments.
    fn delete_assignments(&self, object: &ObjectIdentity) -> Result<usize, Self::Error>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("storage backend error: {0}")]
    Backend(String),
}
