// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use crate::group::DynamicGroupId;
use crate::types::{AssignmentInfo, ObjectIdentity};
use crate::Timestamp;

/// How the explicit group ids of a request are interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BulkMode {
    /// The ids are the complete desired set of groups.
    #[default]
    None,

    /// The ids are removed from the object, nothing is added.
    Remove,
}

/// One submitted dynamic group assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamicRow {
    /// Composite "kind|externalId" key the row was submitted under.
    pub submitted_under: String,
    pub kind: String,
    pub external_id: String,
    pub from_date: Option<Timestamp>,
    pub to_date: Option<Timestamp>,
}

impl DynamicRow {
    /// Well-formed row for the given dynamic group.
    pub fn new(
        id: &DynamicGroupId,
        from_date: Option<Timestamp>,
        to_date: Option<Timestamp>,
    ) -> Self {
        Self {
            submitted_under: id.to_string(),
            kind: id.kind.to_string(),
            external_id: id.external_id.clone(),
            from_date,
            to_date,
        }
    }

    /// Dynamic group this row addresses, `None` if the row is malformed or its declared id does
    /// not match the key it was submitted under.
    pub fn group_id(&self) -> Option<DynamicGroupId> {
        let kind = self.kind.parse().ok()?;
        let declared = DynamicGroupId::new(kind, self.external_id.clone());
        let submitted: DynamicGroupId = self.submitted_under.parse().ok()?;
        (declared == submitted).then_some(declared)
    }

    pub fn assignment_info(&self) -> AssignmentInfo {
        AssignmentInfo::new(self.from_date, self.to_date)
    }
}

/// Desired group assignments of one object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub target: ObjectIdentity,
    pub desired_explicit_ids: BTreeSet<u64>,
    pub desired_dynamic_rows: Vec<DynamicRow>,
    /// New bounds for memberships which are otherwise left as they are.
    pub date_overrides: BTreeMap<u64, AssignmentInfo>,
    pub is_new_object: bool,
    pub bulk_mode: BulkMode,
}

impl ReconcileRequest {
    pub fn new(target: ObjectIdentity) -> Self {
        Self {
            target,
            desired_explicit_ids: BTreeSet::new(),
            desired_dynamic_rows: Vec::new(),
            date_overrides: BTreeMap::new(),
            is_new_object: false,
            bulk_mode: BulkMode::None,
        }
    }

    pub fn with_groups(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.desired_explicit_ids.extend(ids);
        self
    }

    pub fn with_dynamic_row(mut self, row: DynamicRow) -> Self {
        self.desired_dynamic_rows.push(row);
        self
    }

    pub fn with_date_override(mut self, id: u64, info: AssignmentInfo) -> Self {
        self.date_overrides.insert(id, info);
        self
    }

    pub fn new_object(mut self) -> Self {
        self.is_new_object = true;
        self
    }

    pub fn bulk_remove(mut self) -> Self {
        self.bulk_mode = BulkMode::Remove;
        self
    }
}
