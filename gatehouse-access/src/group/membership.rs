// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, HashSet, btree_map};

use crate::cache::Hierarchy;
use crate::group::Group;
use crate::registry::TypeRegistry;
use crate::traits::ContentHost;
use crate::types::{AssignmentInfo, GeneralCategory, ObjectId, ObjectIdentity};
use crate::Timestamp;

/// Objects through which a group reaches another object, keyed by their specific object type.
///
/// The object itself is never part of its own trace, only the ancestors, roles or associated
/// terms the group is assigned to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MembershipTrace {
    entries: BTreeMap<String, BTreeMap<ObjectId, AssignmentInfo>>,
}

impl MembershipTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        object_type: impl Into<String>,
        object_id: impl Into<ObjectId>,
        info: AssignmentInfo,
    ) {
        self.entries
            .entry(object_type.into())
            .or_default()
            .insert(object_id.into(), info);
    }

    /// Merge another trace into this one. Entries of `other` win on conflict.
    pub fn extend(&mut self, other: MembershipTrace) {
        for (object_type, objects) in other.entries {
            self.entries.entry(object_type).or_default().extend(objects);
        }
    }

    pub fn get(&self, object_type: &str) -> Option<&BTreeMap<ObjectId, AssignmentInfo>> {
        self.entries.get(object_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<ObjectId, AssignmentInfo>)> {
        self.entries.iter()
    }

    pub fn contains(&self, object: &ObjectIdentity) -> bool {
        self.entries
            .get(&object.object_type)
            .is_some_and(|objects| objects.contains_key(&object.object_id))
    }

    /// Returns `true` if any traced assignment is active at `now`.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.entries
            .values()
            .flat_map(|objects| objects.values())
            .any(|info| info.is_active_at(now))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|objects| objects.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|objects| objects.len()).sum()
    }
}

impl IntoIterator for MembershipTrace {
    type Item = (String, BTreeMap<ObjectId, AssignmentInfo>);
    type IntoIter = btree_map::IntoIter<String, BTreeMap<ObjectId, AssignmentInfo>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Group {
    /// Every object through which this group reaches `object` without being assigned to it
    /// directly.
    ///
    /// Users are reached through their roles, terms through their ancestor terms, posts through
    /// their ancestor posts, their terms and the ancestors of those terms. Pluggable objects ask
    /// their provider. Roles and unknown types have no parents.
    pub fn recursive_membership_for<H: ContentHost>(
        &self,
        object: &ObjectIdentity,
        registry: &TypeRegistry,
        hierarchy: &Hierarchy<'_, H>,
    ) -> MembershipTrace {
        let mut trace = MembershipTrace::new();

        match registry.classify(&object.object_type) {
            GeneralCategory::User => {
                let user = object
                    .object_id
                    .as_int()
                    .and_then(|id| hierarchy.host().user(id));
                if let Some(user) = user {
                    for role in user.roles {
                        self.trace(&mut trace, GeneralCategory::Role.as_str(), role.into());
                    }
                }
            }
            GeneralCategory::Term => {
                if let Some(term_id) = object.object_id.as_int() {
                    for (ancestor, taxonomy) in hierarchy.term_ancestors(term_id) {
                        self.trace(&mut trace, &taxonomy, ancestor.into());
                    }
                }
            }
            GeneralCategory::Post => {
                if let Some(post_id) = object.object_id.as_int() {
                    self.trace_post(&mut trace, post_id, hierarchy);
                }
            }
            GeneralCategory::Pluggable => {
                if let Some(provider) = registry.provider_for(&object.object_type) {
                    trace.extend(provider.recursive_membership(self, &object.object_id));
                }
            }
            GeneralCategory::Role | GeneralCategory::Unknown => (),
        }

        trace
    }

    fn trace_post<H: ContentHost>(
        &self,
        trace: &mut MembershipTrace,
        post_id: i64,
        hierarchy: &Hierarchy<'_, H>,
    ) {
        let ancestors = hierarchy.post_ancestors(post_id);
        for (ancestor, post_type) in &ancestors {
            self.trace(trace, post_type, (*ancestor).into());
        }

        let mut visited_terms = HashSet::new();
        let posts = std::iter::once(post_id).chain(ancestors.iter().map(|(id, _)| *id));
        for post in posts {
            for (term_id, taxonomy) in hierarchy.post_terms(post) {
                if !visited_terms.insert(term_id) {
                    continue;
                }
                self.trace(trace, &taxonomy, term_id.into());

                for (ancestor, taxonomy) in hierarchy.term_ancestors(term_id) {
                    if visited_terms.insert(ancestor) {
                        self.trace(trace, &taxonomy, ancestor.into());
                    }
                }
            }
        }
    }

    fn trace(&self, trace: &mut MembershipTrace, object_type: &str, object_id: ObjectId) {
        let object = ObjectIdentity::new(object_type, object_id);
        if let Some(info) = self.assignment(&object) {
            trace.insert(object.object_type, object.object_id, *info);
        }
    }
}
