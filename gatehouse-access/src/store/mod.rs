// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group storage implementations.
mod memory;

pub use memory::GroupMemoryStore;
