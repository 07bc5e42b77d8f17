// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, HashSet};

use crate::group::{Group, MembershipTrace};
use crate::traits::PluggableObject;
use crate::types::{ObjectId, ObjectIdentity};

/// Pluggable provider with named objects and a parent chain.
#[derive(Clone, Debug)]
pub struct TestPluggable {
    object_type: String,
    display_type: Option<String>,
    names: BTreeMap<ObjectId, String>,
    parents: BTreeMap<ObjectId, ObjectId>,
}

impl TestPluggable {
    pub fn new(object_type: &str) -> Self {
        Self {
            object_type: object_type.to_string(),
            display_type: None,
            names: BTreeMap::new(),
            parents: BTreeMap::new(),
        }
    }

    pub fn with_display_type(mut self, display_type: &str) -> Self {
        self.display_type = Some(display_type.to_string());
        self
    }

    pub fn with_object(mut self, id: impl Into<ObjectId>, name: &str) -> Self {
        self.names.insert(id.into(), name.to_string());
        self
    }

    pub fn with_parent(mut self, child: impl Into<ObjectId>, parent: impl Into<ObjectId>) -> Self {
        self.parents.insert(child.into(), parent.into());
        self
    }
}

impl PluggableObject for TestPluggable {
    fn object_type(&self) -> &str {
        &self.object_type
    }

    fn display_type(&self) -> &str {
        self.display_type.as_deref().unwrap_or(&self.object_type)
    }

    fn object_name(&self, id: &ObjectId) -> Option<String> {
        self.names.get(id).cloned()
    }

    fn recursive_membership(&self, group: &Group, id: &ObjectId) -> MembershipTrace {
        let mut trace = MembershipTrace::new();
        let mut visited = HashSet::from([id.clone()]);
        let mut current = self.parents.get(id);

        while let Some(parent) = current {
            if !visited.insert(parent.clone()) {
                break;
            }
            let object = ObjectIdentity::new(self.object_type.clone(), parent.clone());
            if let Some(info) = group.assignment(&object) {
                trace.insert(self.object_type.clone(), parent.clone(), *info);
            }
            current = self.parents.get(parent);
        }

        trace
    }
}
