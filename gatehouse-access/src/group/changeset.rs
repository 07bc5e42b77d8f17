// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::group::{Group, GroupId};
use crate::types::{AssignmentInfo, ObjectIdentity};

/// What a mutation does to one (group, object) assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationOp {
    /// Insert or overwrite the assignment with these bounds.
    Add(AssignmentInfo),

    /// Remove the assignment.
    Remove,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mutation {
    pub group: GroupId,
    pub object: ObjectIdentity,
    pub op: MutationOp,
}

/// Ordered set of assignment mutations which is committed as one unit.
///
/// Groups created on the way (dynamic groups materialised for a user or role) are part of the
/// changeset so they are only persisted together with their assignments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Changeset {
    created: Vec<Group>,
    mutations: Vec<Mutation>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a group which did not exist before. Creating the same group twice is a no-op.
    pub fn create_group(&mut self, group: Group) {
        if !self.created.iter().any(|created| created.id() == group.id()) {
            self.created.push(group);
        }
    }

    pub fn add_object(&mut self, group: GroupId, object: ObjectIdentity, info: AssignmentInfo) {
        self.mutations.push(Mutation {
            group,
            object,
            op: MutationOp::Add(info),
        });
    }

    pub fn remove_object(&mut self, group: GroupId, object: ObjectIdentity) {
        self.mutations.push(Mutation {
            group,
            object,
            op: MutationOp::Remove,
        });
    }

    pub fn created_groups(&self) -> &[Group] {
        &self.created
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Groups receiving an `Add` in this changeset.
    pub fn adds(&self) -> impl Iterator<Item = (&GroupId, &AssignmentInfo)> {
        self.mutations.iter().filter_map(|mutation| match &mutation.op {
            MutationOp::Add(info) => Some((&mutation.group, info)),
            MutationOp::Remove => None,
        })
    }

    /// Groups receiving a `Remove` in this changeset.
    pub fn removals(&self) -> impl Iterator<Item = &GroupId> {
        self.mutations
            .iter()
            .filter(|mutation| mutation.op == MutationOp::Remove)
            .map(|mutation| &mutation.group)
    }

    pub fn adds_to(&self, group: &GroupId) -> bool {
        self.adds().any(|(id, _)| id == group)
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Apply all mutations addressed to `group`, in order.
    pub fn apply_to(&self, group: &mut Group) {
        let id = group.id().clone();
        for mutation in self.mutations.iter().filter(|mutation| mutation.group == id) {
            match mutation.op {
                MutationOp::Add(info) => {
                    group.add_object(mutation.object.clone(), info);
                }
                MutationOp::Remove => {
                    group.remove_object(&mutation.object);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::group::{Group, GroupId};
    use crate::types::{AssignmentInfo, ObjectIdentity};

    use super::Changeset;

    #[test]
    fn apply_only_mutations_addressed_to_the_group() {
        let post = ObjectIdentity::new("post", 1);
        let page = ObjectIdentity::new("page", 2);

        let mut editors = Group::new(1, "Editors");
        editors.add_object(page.clone(), AssignmentInfo::unbounded());

        let mut changeset = Changeset::new();
        changeset.add_object(GroupId::Static(1), post.clone(), AssignmentInfo::unbounded());
        changeset.remove_object(GroupId::Static(1), page.clone());
        changeset.add_object(GroupId::Static(2), page.clone(), AssignmentInfo::unbounded());
        changeset.apply_to(&mut editors);

        assert!(editors.has_object(&post));
        assert!(!editors.has_object(&page));
        assert_eq!(editors.assignments().count(), 1);
    }
}
