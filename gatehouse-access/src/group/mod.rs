// SPDX-License-Identifier: MIT OR Apache-2.0

//! Groups and the objects assigned to them.
//!
//! A group holds time-bounded assignments of single objects plus "default" assignments which
//! are applied to every new object of a given type. Dynamic groups are groups materialised on
//! demand for one user or one role and are addressed by a composite "kind|externalId" key.
mod changeset;
mod factory;
mod membership;

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolver::Actor;
use crate::types::{
    AssignmentInfo, DefaultBounds, DefaultMembership, GeneralCategory, ObjectId, ObjectIdentity,
};
use crate::Timestamp;

pub use changeset::{Changeset, Mutation, MutationOp};
pub use factory::GroupFactory;
pub use membership::MembershipTrace;

/// Separator of the composite key addressing dynamic groups.
pub const DYNAMIC_GROUP_SEPARATOR: char = '|';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupIdError {
    #[error("dynamic group key \"{0}\" is missing the kind separator")]
    MissingSeparator(String),

    #[error("unknown dynamic group kind \"{0}\"")]
    UnknownKind(String),

    #[error("dynamic group key \"{0}\" has an empty external id")]
    EmptyExternalId(String),
}

/// Whom a dynamic group is materialised for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DynamicKind {
    User,
    Role,
}

impl DynamicKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DynamicKind::User => "user",
            DynamicKind::Role => "role",
        }
    }
}

impl Display for DynamicKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DynamicKind {
    type Err = GroupIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(DynamicKind::User),
            "role" => Ok(DynamicKind::Role),
            other => Err(GroupIdError::UnknownKind(other.to_string())),
        }
    }
}

/// Identifier of a dynamic group: its kind plus the id of the user or role.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DynamicGroupId {
    pub kind: DynamicKind,
    pub external_id: String,
}

impl DynamicGroupId {
    pub fn new(kind: DynamicKind, external_id: impl Into<String>) -> Self {
        Self {
            kind,
            external_id: external_id.into(),
        }
    }

    pub fn user(user_id: i64) -> Self {
        Self::new(DynamicKind::User, user_id.to_string())
    }

    pub fn role(role: impl Into<String>) -> Self {
        Self::new(DynamicKind::Role, role)
    }
}

impl Display for DynamicGroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.kind, DYNAMIC_GROUP_SEPARATOR, self.external_id)
    }
}

impl FromStr for DynamicGroupId {
    type Err = GroupIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, external_id) = s
            .split_once(DYNAMIC_GROUP_SEPARATOR)
            .ok_or_else(|| GroupIdError::MissingSeparator(s.to_string()))?;

        if external_id.is_empty() {
            return Err(GroupIdError::EmptyExternalId(s.to_string()));
        }

        Ok(Self::new(kind.parse()?, external_id))
    }
}

/// Identifier of a group.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GroupId {
    /// A group defined up front by an administrator.
    Static(u64),

    /// A group materialised for one user or role.
    Dynamic(DynamicGroupId),
}

impl GroupId {
    pub fn as_static(&self) -> Option<u64> {
        match self {
            GroupId::Static(id) => Some(*id),
            GroupId::Dynamic(_) => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, GroupId::Dynamic(_))
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupId::Static(id) => write!(f, "{id}"),
            GroupId::Dynamic(id) => write!(f, "{id}"),
        }
    }
}

impl From<u64> for GroupId {
    fn from(value: u64) -> Self {
        GroupId::Static(value)
    }
}

impl From<DynamicGroupId> for GroupId {
    fn from(value: DynamicGroupId) -> Self {
        GroupId::Dynamic(value)
    }
}

/// A permission group and the objects assigned to it.
///
/// Explicit assignments and default assignments are independent: an object can have an
/// explicit assignment no matter what the defaults for its type say.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    id: GroupId,
    name: String,
    description: String,
    assignments: BTreeMap<ObjectIdentity, AssignmentInfo>,
    default_assignments: BTreeMap<String, DefaultBounds>,
}

impl Group {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self::with_id(GroupId::Static(id), name)
    }

    /// Dynamic group for one user or role.
    pub fn dynamic(id: DynamicGroupId, name: impl Into<String>) -> Self {
        Self::with_id(GroupId::Dynamic(id), name)
    }

    fn with_id(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            assignments: BTreeMap::new(),
            default_assignments: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn id(&self) -> &GroupId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_dynamic(&self) -> bool {
        self.id.is_dynamic()
    }

    /// Assign an object, overwriting the bounds of an existing assignment.
    ///
    /// Returns the previous assignment if there was one.
    pub fn add_object(
        &mut self,
        object: ObjectIdentity,
        info: AssignmentInfo,
    ) -> Option<AssignmentInfo> {
        self.assignments.insert(object, info)
    }

    /// Remove the assignment of an object. Returns `false` if there was none.
    pub fn remove_object(&mut self, object: &ObjectIdentity) -> bool {
        self.assignments.remove(object).is_some()
    }

    /// Explicit assignment of an object, ignoring its time bounds.
    pub fn assignment(&self, object: &ObjectIdentity) -> Option<&AssignmentInfo> {
        self.assignments.get(object)
    }

    pub fn has_object(&self, object: &ObjectIdentity) -> bool {
        self.assignments.contains_key(object)
    }

    pub fn assignments(&self) -> impl Iterator<Item = (&ObjectIdentity, &AssignmentInfo)> {
        self.assignments.iter()
    }

    /// Ids and assignments of all objects of one specific type.
    pub fn objects_of_type<'a>(
        &'a self,
        object_type: &'a str,
    ) -> impl Iterator<Item = (&'a ObjectId, &'a AssignmentInfo)> + 'a {
        self.assignments
            .iter()
            .filter(move |(object, _)| object.object_type == object_type)
            .map(|(object, info)| (&object.object_id, info))
    }

    /// Make this group a default group for every new object of the given type.
    pub fn set_default_for_object_type(
        &mut self,
        object_type: impl Into<String>,
        bounds: DefaultBounds,
    ) {
        self.default_assignments.insert(object_type.into(), bounds);
    }

    pub fn unset_default_for_object_type(&mut self, object_type: &str) -> bool {
        self.default_assignments.remove(object_type).is_some()
    }

    /// Whether this group is applied by default to new objects of the given type, and if so
    /// with which absolute bounds when applied at `now`.
    pub fn is_default_group_for_object_type(
        &self,
        object_type: &str,
        now: Timestamp,
    ) -> DefaultMembership {
        match self.default_assignments.get(object_type) {
            Some(bounds) => DefaultMembership::Default(bounds.resolve(now)),
            None => DefaultMembership::NotDefault,
        }
    }

    /// Returns `true` if the group holds an assignment for `object` which is active at `now`.
    pub fn is_active_for(&self, object: &ObjectIdentity, now: Timestamp) -> bool {
        self.assignment(object)
            .is_some_and(|info| info.is_active_at(now))
    }

    /// Returns `true` if the visitor belongs to this group at `now`.
    ///
    /// A dynamic group contains exactly the user or the holders of the role it was materialised
    /// for. Any group contains users and role holders assigned to it.
    pub fn contains_actor(&self, actor: &Actor, now: Timestamp) -> bool {
        if let GroupId::Dynamic(dynamic) = &self.id {
            let matches = match dynamic.kind {
                DynamicKind::User => actor
                    .user_id()
                    .is_some_and(|user_id| user_id.to_string() == dynamic.external_id),
                DynamicKind::Role => actor.has_role(&dynamic.external_id),
            };
            if matches {
                return true;
            }
        }

        let user_assigned = actor.user_id().is_some_and(|user_id| {
            self.is_active_for(
                &ObjectIdentity::new(GeneralCategory::User.as_str(), user_id),
                now,
            )
        });

        user_assigned
            || actor.roles().any(|role| {
                self.is_active_for(
                    &ObjectIdentity::new(GeneralCategory::Role.as_str(), role),
                    now,
                )
            })
    }
}
