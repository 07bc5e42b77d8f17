// SPDX-License-Identifier: MIT OR Apache-2.0

//! Policy configuration for access resolution and assignment reconciliation.
use serde::{Deserialize, Serialize};

/// Policy flags consulted by `AccessResolver` and `AssignmentReconciler`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Authors without the manage-groups capability may apply default groups to objects they
    /// create.
    pub authors_can_add_to_groups: bool,

    /// Objects inherit groups from their parents (term ancestors, parent posts, post terms).
    ///
    /// When disabled only direct assignments apply.
    pub inherit_from_parents: bool,

    /// Access granted for objects no group applies to.
    pub public_without_groups: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            authors_can_add_to_groups: false,
            inherit_from_parents: true,
            public_without_groups: false,
        }
    }
}
