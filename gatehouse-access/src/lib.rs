// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group-based access resolution for content objects.
//!
//! Content objects (posts, taxonomy terms, users, roles and caller-registered pluggable objects)
//! are assigned to permission groups, optionally bounded in time. `AccessResolver` answers which
//! groups apply to an object, following term trees, post trees and post/term associations, and
//! explains through which objects a group reaches it. `AssignmentReconciler` turns a submitted
//! set of desired groups into the minimal set of mutations and commits them atomically.
//!
//! The host's content, pluggable object kinds and group storage are reached through the traits
//! in `traits`. Derived post/term relations are cached in a `RelationCache` which is cleared by a
//! `CacheInvalidator` whenever posts or terms change.
pub mod cache;
mod config;
pub mod group;
pub mod reconcile;
pub mod registry;
pub mod resolver;
pub mod store;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
mod timestamp;
pub mod traits;
pub mod types;

pub use cache::{CacheInvalidator, CacheKey, RelationCache};
pub use config::Config;
pub use group::{Changeset, DynamicGroupId, DynamicKind, Group, GroupFactory, GroupId};
pub use reconcile::{AssignmentReconciler, ReconcileOutcome, ReconcileRequest, is_new_object};
pub use registry::TypeRegistry;
pub use resolver::{AccessResolver, Actor};
pub use store::GroupMemoryStore;
pub use timestamp::Timestamp;
pub use traits::{ContentHost, GroupStore, PluggableObject};
pub use types::{AssignmentInfo, GeneralCategory, ObjectId, ObjectIdentity};
