// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The visitor a resolution or reconciliation runs on behalf of.
///
/// Passed explicitly into every call, there is no ambient "current user".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    user_id: Option<i64>,
    roles: BTreeSet<String>,
    can_manage_groups: bool,
}

impl Actor {
    /// Visitor who is not logged in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user<R>(user_id: i64, roles: impl IntoIterator<Item = R>) -> Self
    where
        R: Into<String>,
    {
        Self {
            user_id: Some(user_id),
            roles: roles.into_iter().map(Into::into).collect(),
            can_manage_groups: false,
        }
    }

    /// Grant the capability to manage groups and their assignments.
    pub fn with_manage_groups(mut self) -> Self {
        self.can_manage_groups = true;
        self
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn can_manage_groups(&self) -> bool {
        self.can_manage_groups
    }
}
