// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::group::{Changeset, Group, GroupId};
use crate::traits::{GroupStore, StoreError};
use crate::types::ObjectIdentity;

/// Group store keeping everything in memory.
///
/// Clones share the same groups. A changeset is applied under a single write lock, so readers
/// observe either none or all of its mutations.
#[derive(Clone, Debug, Default)]
pub struct GroupMemoryStore {
    groups: Arc<RwLock<BTreeMap<GroupId, Group>>>,
}

impl GroupMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the given groups.
    pub fn with_groups(groups: impl IntoIterator<Item = Group>) -> Self {
        let groups = groups
            .into_iter()
            .map(|group| (group.id().clone(), group))
            .collect();
        Self {
            groups: Arc::new(RwLock::new(groups)),
        }
    }
}

impl GroupStore for GroupMemoryStore {
    type Error = StoreError;

    fn load_group(&self, id: &GroupId) -> Result<Option<Group>, Self::Error> {
        let groups = self.groups.read().unwrap_or_else(PoisonError::into_inner);
        Ok(groups.get(id).cloned())
    }

    fn save_group(&self, group: &Group) -> Result<(), Self::Error> {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        groups.insert(group.id().clone(), group.clone());
        Ok(())
    }

    fn all_groups(&self) -> Result<Vec<Group>, Self::Error> {
        let groups = self.groups.read().unwrap_or_else(PoisonError::into_inner);
        Ok(groups.values().cloned().collect())
    }

    fn commit(&self, changeset: &Changeset) -> Result<(), Self::Error> {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);

        // Validate before touching anything, a failing commit leaves no trace.
        for mutation in changeset.mutations() {
            let known = groups.contains_key(&mutation.group)
                || changeset
                    .created_groups()
                    .iter()
                    .any(|group| group.id() == &mutation.group);
            if !known {
                return Err(StoreError::GroupNotFound(mutation.group.clone()));
            }
        }

        for group in changeset.created_groups() {
            groups
                .entry(group.id().clone())
                .or_insert_with(|| group.clone());
        }

        for group in groups.values_mut() {
            changeset.apply_to(group);
        }

        debug!(
            created = changeset.created_groups().len(),
            mutations = changeset.len(),
            "committed changeset"
        );
        Ok(())
    }

    fn delete_assignments(&self, object: &ObjectIdentity) -> Result<usize, Self::Error> {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = 0;
        for group in groups.values_mut() {
            if group.remove_object(object) {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use crate::group::{Changeset, DynamicGroupId, Group, GroupId};
    use crate::traits::{GroupStore, StoreError};
    use crate::types::{AssignmentInfo, ObjectIdentity};

    use super::GroupMemoryStore;

    #[test]
    fn commit_applies_all_mutations() {
        let store =
            GroupMemoryStore::with_groups([Group::new(1, "Editors"), Group::new(2, "Staff")]);
        let post = ObjectIdentity::new("post", 5);

        let mut setup = Changeset::new();
        setup.add_object(GroupId::Static(1), post.clone(), AssignmentInfo::unbounded());
        store.commit(&setup).unwrap();

        let dynamic = Group::dynamic(DynamicGroupId::user(3), "Alice");
        let mut changeset = Changeset::new();
        changeset.remove_object(GroupId::Static(1), post.clone());
        changeset.add_object(GroupId::Static(2), post.clone(), AssignmentInfo::unbounded());
        changeset.create_group(dynamic.clone());
        changeset.add_object(dynamic.id().clone(), post.clone(), AssignmentInfo::unbounded());
        store.commit(&changeset).unwrap();

        let editors = store.load_group(&GroupId::Static(1)).unwrap().unwrap();
        let staff = store.load_group(&GroupId::Static(2)).unwrap().unwrap();
        let alice = store.load_group(dynamic.id()).unwrap().unwrap();
        assert!(!editors.has_object(&post));
        assert!(staff.has_object(&post));
        assert!(alice.has_object(&post));
        assert_eq!(store.all_groups().unwrap().len(), 3);
    }

    #[test]
    fn failing_commit_leaves_store_untouched() {
        let store = GroupMemoryStore::with_groups([Group::new(1, "Editors")]);
        let post = ObjectIdentity::new("post", 5);

        let mut changeset = Changeset::new();
        changeset.add_object(GroupId::Static(1), post.clone(), AssignmentInfo::unbounded());
        changeset.add_object(GroupId::Static(9), post.clone(), AssignmentInfo::unbounded());

        let result = store.commit(&changeset);
        assert!(matches!(result, Err(StoreError::GroupNotFound(GroupId::Static(9)))));

        let editors = store.load_group(&GroupId::Static(1)).unwrap().unwrap();
        assert!(!editors.has_object(&post));
    }

    #[test]
    fn delete_assignments_of_one_object() {
        let post = ObjectIdentity::new("post", 5);
        let page = ObjectIdentity::new("page", 5);

        let mut editors = Group::new(1, "Editors");
        editors.add_object(post.clone(), AssignmentInfo::unbounded());
        editors.add_object(page.clone(), AssignmentInfo::unbounded());
        let mut staff = Group::new(2, "Staff");
        staff.add_object(post.clone(), AssignmentInfo::unbounded());
        let store = GroupMemoryStore::with_groups([editors, staff]);

        assert_eq!(store.delete_assignments(&post).unwrap(), 2);
        assert_eq!(store.delete_assignments(&post).unwrap(), 0);

        // Same id under another type is a different object.
        let editors = store.load_group(&GroupId::Static(1)).unwrap().unwrap();
        assert!(editors.has_object(&page));
    }
}
