// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

use crate::group::{DynamicGroupId, DynamicKind};
use crate::resolver::{AccessResolver, Actor};
use crate::traits::{ContentHost, GroupStore};

/// Candidate dynamic group offered while typing into a group picker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicGroupSuggestion {
    /// Composite "kind|externalId" key of the dynamic group.
    pub id: String,
    pub name: String,
    pub kind: DynamicKind,
}

impl<H, S> AccessResolver<H, S>
where
    H: ContentHost,
    S: GroupStore,
{
    /// Users and roles matching the last comma-separated term of `query`, users first.
    ///
    /// Only actors who may manage groups get suggestions.
    pub fn dynamic_group_suggestions(
        &self,
        actor: &Actor,
        query: &str,
    ) -> Vec<DynamicGroupSuggestion> {
        if !actor.can_manage_groups() {
            return Vec::new();
        }

        let search = query.rsplit(',').next().unwrap_or_default().trim();
        if search.is_empty() {
            return Vec::new();
        }

        let users = self.host.search_users(search).into_iter().map(|user| {
            let id = DynamicGroupId::user(user.id);
            DynamicGroupSuggestion {
                id: id.to_string(),
                name: format!("User: {} ({})", user.display_name, user.login),
                kind: DynamicKind::User,
            }
        });

        let needle = search.to_lowercase();
        let roles = self
            .host
            .roles()
            .into_iter()
            .filter(|role| {
                role.id.to_lowercase().contains(&needle)
                    || role.name.to_lowercase().contains(&needle)
            })
            .map(|role| {
                let id = DynamicGroupId::role(role.id);
                DynamicGroupSuggestion {
                    id: id.to_string(),
                    name: format!("Role: {}", role.name),
                    kind: DynamicKind::Role,
                }
            });

        users.chain(roles).collect()
    }
}
