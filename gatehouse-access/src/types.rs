// SPDX-License-Identifier: MIT OR Apache-2.0

//! Value types shared by every component: object identities, general categories and the
//! time-bounded assignment records.
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Object id a host uses to signal "no such object".
pub const SENTINEL_ID: i64 = -1;

/// Opaque identifier of a content object.
///
/// Built-in objects (posts, terms, users) are addressed by integers, roles and pluggable objects
/// often by strings.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectId {
    Int(i64),
    Str(String),
}

impl ObjectId {
    /// The "not found" sentinel.
    pub fn sentinel() -> Self {
        Self::Int(SENTINEL_ID)
    }

    /// Returns `true` if this id is the "not found" sentinel.
    pub fn is_sentinel(&self) -> bool {
        match self {
            ObjectId::Int(id) => *id == SENTINEL_ID,
            ObjectId::Str(id) => id == "-1",
        }
    }

    /// Integer value of this id, parsing string ids which hold a number.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ObjectId::Int(id) => Some(*id),
            ObjectId::Str(id) => id.parse().ok(),
        }
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectId::Int(id) => write!(f, "{id}"),
            ObjectId::Str(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for ObjectId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// A specific object type paired with an object id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectIdentity {
    pub object_type: String,
    pub object_id: ObjectId,
}

impl ObjectIdentity {
    pub fn new(object_type: impl Into<String>, object_id: impl Into<ObjectId>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
        }
    }
}

impl Display for ObjectIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.object_type, self.object_id)
    }
}

/// Coarse object kinds every specific object type maps into.
///
/// The declaration order is the evaluation order used when explaining memberships.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GeneralCategory {
    Role,
    User,
    Term,
    Post,
    Pluggable,
    Unknown,
}

impl GeneralCategory {
    /// Categories in explanation order, `Unknown` excluded.
    pub const ORDERED: [GeneralCategory; 5] = [
        GeneralCategory::Role,
        GeneralCategory::User,
        GeneralCategory::Term,
        GeneralCategory::Post,
        GeneralCategory::Pluggable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GeneralCategory::Role => "role",
            GeneralCategory::User => "user",
            GeneralCategory::Term => "term",
            GeneralCategory::Post => "post",
            GeneralCategory::Pluggable => "pluggable",
            GeneralCategory::Unknown => "unknown",
        }
    }

    /// Built-in category named exactly like the given object type.
    pub fn from_builtin(object_type: &str) -> Option<Self> {
        match object_type {
            "role" => Some(GeneralCategory::Role),
            "user" => Some(GeneralCategory::User),
            "term" => Some(GeneralCategory::Term),
            "post" => Some(GeneralCategory::Post),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, GeneralCategory::Unknown)
    }
}

impl Display for GeneralCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One grant of one group to one object, optionally bounded in time.
///
/// `None` bounds are unbounded. Both bounds are inclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentInfo {
    pub from_date: Option<Timestamp>,
    pub to_date: Option<Timestamp>,
}

impl AssignmentInfo {
    pub fn new(from_date: Option<Timestamp>, to_date: Option<Timestamp>) -> Self {
        Self { from_date, to_date }
    }

    /// Assignment without any time bounds.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Returns `true` if the assignment is in effect at the given time.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        let started = self.from_date.is_none_or(|from| from <= now);
        let not_ended = self.to_date.is_none_or(|to| now <= to);
        started && not_ended
    }
}

/// Bounds of a default assignment, expressed as offsets in seconds from the moment the default
/// is applied to a new object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultBounds {
    pub from_offset: Option<u64>,
    pub to_offset: Option<u64>,
}

impl DefaultBounds {
    pub fn new(from_offset: Option<u64>, to_offset: Option<u64>) -> Self {
        Self {
            from_offset,
            to_offset,
        }
    }

    /// Absolute assignment bounds when applied at `now`. Missing or zero offsets stay unbounded.
    pub fn resolve(&self, now: Timestamp) -> AssignmentInfo {
        let absolute = |offset: Option<u64>| match offset {
            Some(0) | None => None,
            Some(offset) => Some(now + offset),
        };

        AssignmentInfo::new(absolute(self.from_offset), absolute(self.to_offset))
    }
}

/// Outcome of asking a group whether it is a default group for an object type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultMembership {
    NotDefault,
    Default(AssignmentInfo),
}

impl DefaultMembership {
    pub fn is_default(&self) -> bool {
        matches!(self, DefaultMembership::Default(_))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::Timestamp;

    use super::{AssignmentInfo, DefaultBounds, GeneralCategory, ObjectId};

    #[rstest]
    #[case(None, None, 50, true)]
    #[case(Some(10), None, 50, true)]
    #[case(Some(50), Some(50), 50, true)]
    #[case(Some(51), None, 50, false)]
    #[case(None, Some(49), 50, false)]
    #[case(Some(10), Some(100), 101, false)]
    fn assignment_window(
        #[case] from: Option<u64>,
        #[case] to: Option<u64>,
        #[case] now: u64,
        #[case] expected: bool,
    ) {
        let info = AssignmentInfo::new(from.map(Timestamp::new), to.map(Timestamp::new));
        assert_eq!(info.is_active_at(Timestamp::new(now)), expected);
    }

    #[test]
    fn default_bounds_are_relative_to_now() {
        let bounds = DefaultBounds::new(Some(1), Some(2));
        assert_eq!(
            bounds.resolve(Timestamp::new(100)),
            AssignmentInfo::new(Some(Timestamp::new(101)), Some(Timestamp::new(102)))
        );

        let open = DefaultBounds::new(Some(0), None);
        assert_eq!(open.resolve(Timestamp::new(100)), AssignmentInfo::unbounded());
    }

    #[test]
    fn sentinel_ids() {
        assert!(ObjectId::sentinel().is_sentinel());
        assert!(ObjectId::from("-1").is_sentinel());
        assert!(!ObjectId::from(1).is_sentinel());
        assert_eq!(ObjectId::from("12").as_int(), Some(12));
        assert_eq!(ObjectId::from("admin").as_int(), None);
    }

    #[test]
    fn builtin_categories() {
        assert_eq!(GeneralCategory::from_builtin("term"), Some(GeneralCategory::Term));
        assert_eq!(GeneralCategory::from_builtin("category"), None);
        assert!(GeneralCategory::ORDERED.windows(2).all(|w| w[0] < w[1]));
    }
}
