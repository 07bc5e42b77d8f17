// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn a submitted set of desired group assignments into the minimal set of mutations.
//!
//! Reconciliation is planned into a `Changeset` first and committed with one call to the group
//! store, so a request either applies completely or not at all.
mod request;
#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::error::Error;

use thiserror::Error;
use tracing::{debug, warn};

use crate::group::{Changeset, GroupId};
use crate::registry::TypeRegistry;
use crate::resolver::{AccessResolver, Actor};
use crate::traits::{ContentHost, GroupStore};
use crate::types::{AssignmentInfo, DefaultMembership, GeneralCategory, ObjectId, ObjectIdentity};
use crate::Timestamp;

pub use request::{BulkMode, DynamicRow, ReconcileRequest};

/// Request action marking the creation of a post.
pub const NEW_OBJECT_ACTION: &str = "new";

#[derive(Debug, Error)]
pub enum ReconcileError<E>
where
    E: Error,
{
    #[error("group store failed: {0}")]
    Store(E),
}

/// Result of a reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The actor may not touch the assignments of this object, nothing happened.
    Unauthorized,

    /// The changeset was committed. It can be empty.
    Applied(Changeset),
}

impl ReconcileOutcome {
    pub fn changeset(&self) -> Option<&Changeset> {
        match self {
            ReconcileOutcome::Unauthorized => None,
            ReconcileOutcome::Applied(changeset) => Some(changeset),
        }
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, ReconcileOutcome::Applied(_))
    }
}

/// Reconciles desired group assignments of one object with the stored ones.
#[derive(Debug)]
pub struct AssignmentReconciler<'a, H, S> {
    resolver: &'a AccessResolver<H, S>,
}

impl<'a, H, S> AssignmentReconciler<'a, H, S>
where
    H: ContentHost,
    S: GroupStore,
{
    pub fn new(resolver: &'a AccessResolver<H, S>) -> Self {
        Self { resolver }
    }

    /// Identity the assignments of an object are stored under.
    pub fn target_for(
        &self,
        category: GeneralCategory,
        object_id: impl Into<ObjectId>,
    ) -> ObjectIdentity {
        self.resolver
            .registry()
            .specific_identity(self.resolver.host(), category, object_id.into())
    }

    /// Plan and commit the mutations which bring the object's assignments in line with the
    /// request.
    ///
    /// Actors without the manage-groups capability only get the default groups applied, and
    /// only to new objects when authors are allowed to add to groups. Anything else is
    /// `Unauthorized` and leaves storage and caches untouched.
    pub fn reconcile(
        &self,
        actor: &Actor,
        request: &ReconcileRequest,
    ) -> Result<ReconcileOutcome, ReconcileError<S::Error>> {
        let Some(changeset) = self.plan(actor, request)? else {
            debug!(object = %request.target, "actor may not change group assignments");
            return Ok(ReconcileOutcome::Unauthorized);
        };

        if !changeset.is_empty() {
            self.resolver
                .store()
                .commit(&changeset)
                .map_err(ReconcileError::Store)?;
            self.resolver.clear_resolutions();
        }
        self.resolver.unset_user_groups_for_object(&request.target);

        debug!(
            object = %request.target,
            mutations = changeset.len(),
            "reconciled group assignments"
        );
        Ok(ReconcileOutcome::Applied(changeset))
    }

    /// Plan the mutations of a reconciliation without committing them.
    ///
    /// Returns `None` if the actor may not change the object's assignments.
    pub fn plan(
        &self,
        actor: &Actor,
        request: &ReconcileRequest,
    ) -> Result<Option<Changeset>, ReconcileError<S::Error>> {
        let config = self.resolver.config();
        let manual = actor.can_manage_groups();
        let defaults_only =
            !manual && request.is_new_object && config.authors_can_add_to_groups;
        if !manual && !defaults_only {
            return Ok(None);
        }

        let mut changeset = Changeset::new();
        let overridden = if manual {
            self.plan_explicit(actor, request, &mut changeset)?
        } else {
            BTreeSet::new()
        };

        if manual && request.bulk_mode == BulkMode::None {
            self.plan_dynamic(actor, request, &mut changeset)?;
        }

        if request.is_new_object && request.bulk_mode == BulkMode::None {
            self.plan_defaults(request, &overridden, &mut changeset)?;
        }

        Ok(Some(changeset))
    }

    /// Diff the desired explicit groups against the manageable groups the object is in.
    ///
    /// Returns the groups which received an explicit `Add`.
    fn plan_explicit(
        &self,
        actor: &Actor,
        request: &ReconcileRequest,
        changeset: &mut Changeset,
    ) -> Result<BTreeSet<u64>, ReconcileError<S::Error>> {
        let target = &request.target;
        let existing: BTreeSet<u64> = self
            .resolver
            .filtered_user_groups_for(actor, target, false)
            .map_err(ReconcileError::Store)?
            .iter()
            .filter_map(|group| group.id().as_static())
            .collect();
        let manageable: BTreeSet<u64> = self
            .resolver
            .manageable_groups(actor)
            .map_err(ReconcileError::Store)?
            .iter()
            .filter_map(|group| group.id().as_static())
            .collect();

        let desired: BTreeSet<u64> = request
            .desired_explicit_ids
            .iter()
            .copied()
            .filter(|id| {
                let known = manageable.contains(id);
                if !known {
                    warn!(group = id, "skip group the actor can not manage");
                }
                known
            })
            .collect();

        let mut added = BTreeSet::new();
        if request.bulk_mode == BulkMode::Remove {
            for id in &desired {
                changeset.remove_object(GroupId::Static(*id), target.clone());
            }
            return Ok(added);
        }

        for id in desired.difference(&existing) {
            let info = request
                .date_overrides
                .get(id)
                .copied()
                .unwrap_or_else(AssignmentInfo::unbounded);
            changeset.add_object(GroupId::Static(*id), target.clone(), info);
            added.insert(*id);
        }

        for id in existing.difference(&request.desired_explicit_ids) {
            changeset.remove_object(GroupId::Static(*id), target.clone());
        }

        // Unchanged memberships are only touched to apply new dates.
        for id in desired.intersection(&existing) {
            if let Some(info) = request.date_overrides.get(id) {
                changeset.add_object(GroupId::Static(*id), target.clone(), *info);
                added.insert(*id);
            }
        }

        Ok(added)
    }

    /// Upsert the object into the dynamic group of every well-formed row and remove it from the
    /// dynamic groups no row asks for anymore.
    fn plan_dynamic(
        &self,
        actor: &Actor,
        request: &ReconcileRequest,
        changeset: &mut Changeset,
    ) -> Result<(), ReconcileError<S::Error>> {
        let factory = self.resolver.group_factory();
        let mut desired = BTreeSet::new();

        for row in &request.desired_dynamic_rows {
            let Some(id) = row.group_id() else {
                warn!(
                    submitted_under = %row.submitted_under,
                    kind = %row.kind,
                    external_id = %row.external_id,
                    "skip malformed dynamic group row"
                );
                continue;
            };
            desired.insert(id.clone());

            let (group, created) = factory.dynamic_group(&id).map_err(ReconcileError::Store)?;
            let info = row.assignment_info();
            if !created && group.assignment(&request.target) == Some(&info) {
                continue;
            }

            if created {
                changeset.create_group(group);
            }
            changeset.add_object(GroupId::Dynamic(id), request.target.clone(), info);
        }

        let existing = self
            .resolver
            .filtered_user_groups_for(actor, &request.target, false)
            .map_err(ReconcileError::Store)?;
        let dropped = existing.iter().filter(|group| {
            matches!(group.id(), GroupId::Dynamic(id) if !desired.contains(id))
        });
        for group in dropped {
            changeset.remove_object(group.id().clone(), request.target.clone());
        }

        Ok(())
    }

    /// Apply default groups of the object type to a new object.
    ///
    /// Groups which already hold the object, or received an explicit assignment in this pass,
    /// keep their bounds.
    fn plan_defaults(
        &self,
        request: &ReconcileRequest,
        overridden: &BTreeSet<u64>,
        changeset: &mut Changeset,
    ) -> Result<(), ReconcileError<S::Error>> {
        let now = Timestamp::now();
        let target = &request.target;

        for group in self.resolver.full_groups().map_err(ReconcileError::Store)? {
            let DefaultMembership::Default(info) =
                group.is_default_group_for_object_type(&target.object_type, now)
            else {
                continue;
            };

            let explicit = group
                .id()
                .as_static()
                .is_some_and(|id| overridden.contains(&id));
            if explicit || group.has_object(target) || changeset.adds_to(group.id()) {
                continue;
            }

            changeset.add_object(group.id().clone(), target.clone(), info);
        }

        Ok(())
    }

    /// Delete every assignment of an object, in every group.
    ///
    /// Returns the number of removed assignments.
    pub fn remove_object_data(
        &self,
        object: &ObjectIdentity,
    ) -> Result<usize, ReconcileError<S::Error>> {
        let removed = self
            .resolver
            .store()
            .delete_assignments(object)
            .map_err(ReconcileError::Store)?;
        if removed > 0 {
            self.resolver.clear_resolutions();
        }
        self.resolver.unset_user_groups_for_object(object);

        debug!(%object, removed, "removed object data");
        Ok(removed)
    }
}

/// Returns `true` if a request addresses an object which does not exist yet.
///
/// A request without object type never does. A request with a type but no id does. Posts are
/// only new when the request action says so.
pub fn is_new_object(
    registry: &TypeRegistry,
    object_type: Option<&str>,
    object_id: Option<&ObjectId>,
    action: Option<&str>,
) -> bool {
    let Some(object_type) = object_type else {
        return false;
    };

    if object_id.is_none() {
        return true;
    }

    registry.classify(object_type) == GeneralCategory::Post && action == Some(NEW_OBJECT_ACTION)
}
