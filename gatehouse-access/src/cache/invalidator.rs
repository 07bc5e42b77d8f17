// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheKey, RelationCache};

/// Keys cleared when a term is created, edited or deleted.
///
/// A term edit can change the post/term association in both directions and the term hierarchy.
pub const TERM_CACHE_KEYS: [CacheKey; 3] = [
    CacheKey::PostTermMap,
    CacheKey::TermPostMap,
    CacheKey::TermTreeMap,
];

/// Keys cleared when a post is created, edited or deleted.
///
/// A post edit can change the post/term association in both directions and the post tree.
pub const POST_CACHE_KEYS: [CacheKey; 3] = [
    CacheKey::TermPostMap,
    CacheKey::PostTermMap,
    CacheKey::PostTreeMap,
];

/// Clears the relation maps affected by content mutations.
///
/// Both directions of the post/term association are always cleared together, they are two views
/// of the same data and must never diverge.
#[derive(Clone, Debug)]
pub struct CacheInvalidator {
    cache: Arc<RelationCache>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<RelationCache>) -> Self {
        Self { cache }
    }

    /// Invalidate after a term mutation. The post tree is left untouched.
    pub fn invalidate_term_cache(&self) {
        debug!("invalidate term relation maps");
        for key in TERM_CACHE_KEYS {
            self.cache.invalidate(key);
        }
    }

    /// Invalidate after a post mutation. The term tree is left untouched.
    pub fn invalidate_post_cache(&self) {
        debug!("invalidate post relation maps");
        for key in POST_CACHE_KEYS {
            self.cache.invalidate(key);
        }
    }
}
