// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces to the collaborators this crate does not own: the host's content API, pluggable
//! object providers and persistent group storage.
mod host;
mod pluggable;
mod store;

pub use host::{ContentHost, PostRecord, RoleRecord, TermRecord, UserRecord};
pub use pluggable::PluggableObject;
pub use store::{GroupStore, StoreError};
