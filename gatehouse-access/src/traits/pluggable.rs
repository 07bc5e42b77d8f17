// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::group::{Group, MembershipTrace};
use crate::types::ObjectId;

/// Provider for an object kind registered by a caller, outside the built-in categories.
pub trait PluggableObject: Send + Sync {
    /// Object type name this provider answers for.
    fn object_type(&self) -> &str;

    /// Name of the bucket the provider's objects are listed under when explaining memberships.
    fn display_type(&self) -> &str {
        self.object_type()
    }

    /// Display name of one object, `None` if the provider does not know it.
    fn object_name(&self, id: &ObjectId) -> Option<String>;

    /// How the given group reaches the object through the provider's own hierarchy.
    ///
    /// Providers without a hierarchy keep the default, an empty trace.
    fn recursive_membership(&self, _group: &Group, _id: &ObjectId) -> MembershipTrace {
        MembershipTrace::default()
    }
}
