// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lazily materialised relations between posts and terms.
//!
//! Four derived maps are kept, each under a well-known key: post to terms, term to posts, the
//! term tree and the post tree. A map is built from host data on first read and lives until its
//! key is invalidated. Invalidation only ever clears a map, it never patches one.
mod invalidator;
mod maps;

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use crate::traits::ContentHost;

pub use invalidator::CacheInvalidator;
pub use maps::{AssociationMap, TreeMap};

pub const POST_TERM_MAP_CACHE_KEY: &str = "post_term_map";
pub const TERM_POST_MAP_CACHE_KEY: &str = "term_post_map";
pub const TERM_TREE_MAP_CACHE_KEY: &str = "term_tree_map";
pub const POST_TREE_MAP_CACHE_KEY: &str = "post_tree_map";

/// Keys of the derived relation maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    PostTermMap,
    TermPostMap,
    TermTreeMap,
    PostTreeMap,
}

impl CacheKey {
    pub const ALL: [CacheKey; 4] = [
        CacheKey::PostTermMap,
        CacheKey::TermPostMap,
        CacheKey::TermTreeMap,
        CacheKey::PostTreeMap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::PostTermMap => POST_TERM_MAP_CACHE_KEY,
            CacheKey::TermPostMap => TERM_POST_MAP_CACHE_KEY,
            CacheKey::TermTreeMap => TERM_TREE_MAP_CACHE_KEY,
            CacheKey::PostTreeMap => POST_TREE_MAP_CACHE_KEY,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One cached map plus the epoch it belongs to.
///
/// Every clear bumps the epoch. A build which started before a clear is handed to its caller but
/// never installed, so a map computed from outdated host data cannot outlive the invalidation.
#[derive(Debug)]
struct Slot<T> {
    inner: RwLock<(u64, Option<Arc<T>>)>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new((0, None)),
        }
    }
}

impl<T> Slot<T> {
    fn get_or_build(&self, key: CacheKey, build: impl FnOnce() -> T) -> Arc<T> {
        let epoch = {
            let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(value) = guard.1.as_ref() {
                return value.clone();
            }
            guard.0
        };

        // Concurrent readers of a cold slot may all build, the first one to finish wins.
        trace!(%key, "rebuild relation map");
        let built = Arc::new(build());

        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match guard.1.as_ref() {
            Some(existing) => existing.clone(),
            None if guard.0 == epoch => {
                guard.1 = Some(built.clone());
                built
            }
            None => built,
        }
    }

    fn clear(&self) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.0 += 1;
        guard.1.take().is_some()
    }

    fn is_filled(&self) -> bool {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.1.is_some()
    }
}

/// Shared store of the derived post/term relation maps.
#[derive(Debug, Default)]
pub struct RelationCache {
    post_terms: Slot<AssociationMap>,
    term_posts: Slot<AssociationMap>,
    term_tree: Slot<TreeMap>,
    post_tree: Slot<TreeMap>,
    generation: AtomicU64,
}

impl RelationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post id to the terms it is associated with.
    pub fn post_term_map<H: ContentHost>(&self, host: &H) -> Arc<AssociationMap> {
        self.post_terms
            .get_or_build(CacheKey::PostTermMap, || AssociationMap::post_terms(host))
    }

    /// Term id to the posts associated with it.
    pub fn term_post_map<H: ContentHost>(&self, host: &H) -> Arc<AssociationMap> {
        self.term_posts
            .get_or_build(CacheKey::TermPostMap, || AssociationMap::term_posts(host))
    }

    /// Parent/child hierarchy of all terms.
    pub fn term_tree_map<H: ContentHost>(&self, host: &H) -> Arc<TreeMap> {
        self.term_tree
            .get_or_build(CacheKey::TermTreeMap, || TreeMap::terms(host))
    }

    /// Parent/child hierarchy of all posts, attachments included.
    pub fn post_tree_map<H: ContentHost>(&self, host: &H) -> Arc<TreeMap> {
        self.post_tree
            .get_or_build(CacheKey::PostTreeMap, || TreeMap::posts(host))
    }

    /// Clear exactly the map stored under `key`. The next read rebuilds it.
    ///
    /// Returns `true` if a materialised map was dropped.
    pub fn invalidate(&self, key: CacheKey) -> bool {
        let slot_was_filled = match key {
            CacheKey::PostTermMap => self.post_terms.clear(),
            CacheKey::TermPostMap => self.term_posts.clear(),
            CacheKey::TermTreeMap => self.term_tree.clear(),
            CacheKey::PostTreeMap => self.post_tree.clear(),
        };
        self.generation.fetch_add(1, Ordering::SeqCst);
        trace!(%key, slot_was_filled, "invalidated relation map");
        slot_was_filled
    }

    /// Returns `true` if the map under `key` is currently materialised.
    pub fn is_cached(&self, key: CacheKey) -> bool {
        match key {
            CacheKey::PostTermMap => self.post_terms.is_filled(),
            CacheKey::TermPostMap => self.term_posts.is_filled(),
            CacheKey::TermTreeMap => self.term_tree.is_filled(),
            CacheKey::PostTreeMap => self.post_tree.is_filled(),
        }
    }

    /// Counter bumped on every invalidation.
    ///
    /// Results derived from the relation maps can remember the generation they were computed
    /// against and treat themselves as stale once it moved.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Hierarchy queries answered from this cache, backed by the given host.
    pub fn hierarchy<'a, H: ContentHost>(&'a self, host: &'a H) -> Hierarchy<'a, H> {
        Hierarchy { cache: self, host }
    }
}

/// Read-only hierarchy queries over the relation maps.
#[derive(Debug)]
pub struct Hierarchy<'a, H> {
    cache: &'a RelationCache,
    host: &'a H,
}

impl<H: ContentHost> Hierarchy<'_, H> {
    pub fn host(&self) -> &H {
        self.host
    }

    /// Ancestor terms of a term with their taxonomy, nearest first.
    pub fn term_ancestors(&self, term_id: i64) -> Vec<(i64, String)> {
        self.cache.term_tree_map(self.host).ancestors(term_id)
    }

    /// Ancestor posts (parents of attachments and child pages) with their post type.
    pub fn post_ancestors(&self, post_id: i64) -> Vec<(i64, String)> {
        self.cache.post_tree_map(self.host).ancestors(post_id)
    }

    /// Terms directly associated with a post, with their taxonomy.
    pub fn post_terms(&self, post_id: i64) -> Vec<(i64, String)> {
        self.cache.post_term_map(self.host).related(post_id)
    }

    /// Posts directly associated with a term, with their post type.
    pub fn term_posts(&self, term_id: i64) -> Vec<(i64, String)> {
        self.cache.term_post_map(self.host).related(term_id)
    }
}
