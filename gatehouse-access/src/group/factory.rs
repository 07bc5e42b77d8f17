// SPDX-License-Identifier: MIT OR Apache-2.0

use tracing::trace;

use crate::group::{DynamicGroupId, DynamicKind, Group, GroupId};
use crate::traits::{ContentHost, GroupStore};

/// Materialises dynamic groups for users and roles.
#[derive(Debug)]
pub struct GroupFactory<'a, H, S> {
    host: &'a H,
    store: &'a S,
}

impl<'a, H, S> GroupFactory<'a, H, S>
where
    H: ContentHost,
    S: GroupStore,
{
    pub fn new(host: &'a H, store: &'a S) -> Self {
        Self { host, store }
    }

    /// Load the dynamic group with the given id, or build an unsaved one if it was never
    /// persisted.
    ///
    /// The second value is `true` when the group is new and still needs to be stored.
    pub fn dynamic_group(&self, id: &DynamicGroupId) -> Result<(Group, bool), S::Error> {
        if let Some(group) = self.store.load_group(&GroupId::Dynamic(id.clone()))? {
            return Ok((group, false));
        }

        trace!(%id, "materialise dynamic group");
        Ok((Group::dynamic(id.clone(), self.dynamic_group_name(id)), true))
    }

    /// Display name of a dynamic group, the raw external id if the host does not know it.
    pub fn dynamic_group_name(&self, id: &DynamicGroupId) -> String {
        let name = match id.kind {
            DynamicKind::User => id
                .external_id
                .parse()
                .ok()
                .and_then(|user_id| self.host.user(user_id))
                .map(|user| user.display_name),
            DynamicKind::Role => self.host.role_name(&id.external_id),
        };

        name.unwrap_or_else(|| id.external_id.clone())
    }
}
