// SPDX-License-Identifier: MIT OR Apache-2.0

//! Which groups apply to an object, whether a visitor may access it, and why a group reaches it.
mod actor;
mod explain;
mod suggestions;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use crate::cache::{CacheInvalidator, RelationCache};
use crate::config::Config;
use crate::group::{Group, GroupFactory, GroupId};
use crate::registry::TypeRegistry;
use crate::traits::{ContentHost, GroupStore};
use crate::types::{GeneralCategory, ObjectId, ObjectIdentity};
use crate::Timestamp;

pub use actor::Actor;
pub use explain::MembershipExplanation;
pub use suggestions::DynamicGroupSuggestion;

/// Per-object resolutions, valid while neither the relation maps nor any assignment changed.
///
/// Only group ids are kept, the groups themselves are loaded from the store on every read.
#[derive(Debug, Default)]
struct Resolutions {
    /// Relation cache generation the entries were computed against.
    generation: u64,

    /// Bumped whenever entries are dropped, so a resolution computed before that is never
    /// installed.
    revision: u64,

    entries: HashMap<(ObjectIdentity, bool), Vec<GroupId>>,
}

/// Resolves group memberships of content objects.
///
/// Resolutions are cached per object. An object's inherited groups depend on the assignments of
/// its parents, so every committed assignment change drops all cached resolutions. The whole
/// cache is also dropped once the relation maps were invalidated.
#[derive(Debug)]
pub struct AccessResolver<H, S> {
    host: H,
    store: S,
    registry: TypeRegistry,
    config: Config,
    cache: Arc<RelationCache>,
    resolved: RwLock<Resolutions>,
}

impl<H, S> AccessResolver<H, S>
where
    H: ContentHost,
    S: GroupStore,
{
    pub fn new(host: H, store: S, registry: TypeRegistry, config: Config) -> Self {
        Self::with_cache(host, store, registry, config, Arc::new(RelationCache::new()))
    }

    /// Resolver sharing an existing relation cache.
    pub fn with_cache(
        host: H,
        store: S,
        registry: TypeRegistry,
        config: Config,
        cache: Arc<RelationCache>,
    ) -> Self {
        Self {
            host,
            store,
            registry,
            config,
            cache,
            resolved: RwLock::new(Resolutions::default()),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn relation_cache(&self) -> &Arc<RelationCache> {
        &self.cache
    }

    /// Invalidator clearing the relation maps this resolver reads from.
    pub fn invalidator(&self) -> CacheInvalidator {
        CacheInvalidator::new(self.cache.clone())
    }

    pub fn group_factory(&self) -> GroupFactory<'_, H, S> {
        GroupFactory::new(&self.host, &self.store)
    }

    /// Every stored group, static and dynamic.
    pub fn full_groups(&self) -> Result<Vec<Group>, S::Error> {
        self.store.all_groups()
    }

    /// Groups assigned to the object directly, plus the groups it inherits through its parents
    /// when `recursive` is set.
    ///
    /// Time bounds are ignored, a group whose assignment expired is still listed.
    pub fn user_groups_for(
        &self,
        object: &ObjectIdentity,
        recursive: bool,
    ) -> Result<Vec<Group>, S::Error> {
        let key = (object.clone(), recursive);
        let generation = self.cache.generation();

        let (cached, revision) = {
            let resolved = self.resolved.read().unwrap_or_else(PoisonError::into_inner);
            let cached = if resolved.generation == generation {
                resolved.entries.get(&key).cloned()
            } else {
                None
            };
            (cached, resolved.revision)
        };
        if let Some(ids) = cached {
            return self.load_groups(&ids);
        }

        let inherit = recursive && self.config.inherit_from_parents;
        let hierarchy = self.cache.hierarchy(&self.host);
        let groups: Vec<Group> = self
            .full_groups()?
            .into_iter()
            .filter(|group| {
                group.has_object(object)
                    || (inherit
                        && !group
                            .recursive_membership_for(object, &self.registry, &hierarchy)
                            .is_empty())
            })
            .collect();

        trace!(%object, recursive, groups = groups.len(), "resolved object groups");
        let ids = groups.iter().map(|group| group.id().clone()).collect();
        self.install(key, ids, generation, revision);

        Ok(groups)
    }

    fn load_groups(&self, ids: &[GroupId]) -> Result<Vec<Group>, S::Error> {
        let mut groups = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(group) = self.store.load_group(id)? {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    /// Cache a resolution unless the relation maps or assignments changed while computing it.
    fn install(
        &self,
        key: (ObjectIdentity, bool),
        ids: Vec<GroupId>,
        generation: u64,
        revision: u64,
    ) {
        let mut resolved = self.resolved.write().unwrap_or_else(PoisonError::into_inner);
        if self.cache.generation() != generation || resolved.revision != revision {
            return;
        }

        if resolved.generation != generation {
            resolved.entries.clear();
            resolved.generation = generation;
        }

        resolved.entries.insert(key, ids);
    }

    /// Like `user_groups_for`, restricted to the groups the actor may manage.
    ///
    /// Actors with the manage-groups capability may manage every group, everyone else only the
    /// groups they belong to.
    pub fn filtered_user_groups_for(
        &self,
        actor: &Actor,
        object: &ObjectIdentity,
        recursive: bool,
    ) -> Result<Vec<Group>, S::Error> {
        let groups = self.user_groups_for(object, recursive)?;
        if actor.can_manage_groups() {
            return Ok(groups);
        }

        let now = Timestamp::now();
        Ok(groups
            .into_iter()
            .filter(|group| group.contains_actor(actor, now))
            .collect())
    }

    /// Groups the actor may manage, regardless of any object.
    pub fn manageable_groups(&self, actor: &Actor) -> Result<Vec<Group>, S::Error> {
        let groups = self.full_groups()?;
        if actor.can_manage_groups() {
            return Ok(groups);
        }

        let now = Timestamp::now();
        Ok(groups
            .into_iter()
            .filter(|group| group.contains_actor(actor, now))
            .collect())
    }

    /// Number of groups applying to the object which the actor can not see.
    pub fn hidden_group_count(
        &self,
        actor: &Actor,
        object: &ObjectIdentity,
    ) -> Result<usize, S::Error> {
        let all = self.user_groups_for(object, true)?.len();
        let visible = self.filtered_user_groups_for(actor, object, true)?.len();
        Ok(all.saturating_sub(visible))
    }

    /// Returns `true` if the actor may access the object right now.
    ///
    /// Only assignments active at this moment apply. When no group applies the configured
    /// public default decides.
    pub fn check_object_access(
        &self,
        actor: &Actor,
        object: &ObjectIdentity,
    ) -> Result<bool, S::Error> {
        if actor.can_manage_groups() {
            return Ok(true);
        }

        let now = Timestamp::now();
        let hierarchy = self.cache.hierarchy(&self.host);
        let applicable: Vec<Group> = self
            .user_groups_for(object, true)?
            .into_iter()
            .filter(|group| {
                group.is_active_for(object, now)
                    || (self.config.inherit_from_parents
                        && group
                            .recursive_membership_for(object, &self.registry, &hierarchy)
                            .is_active_at(now))
            })
            .collect();

        if applicable.is_empty() {
            return Ok(self.config.public_without_groups);
        }

        Ok(applicable
            .iter()
            .any(|group| group.contains_actor(actor, now)))
    }

    /// Returns `true` if the actor may edit the given object.
    ///
    /// Posts are checked under their own post type. A post the host does not know has nothing
    /// to protect.
    pub fn can_edit(
        &self,
        actor: &Actor,
        category: GeneralCategory,
        object_id: impl Into<ObjectId>,
    ) -> Result<bool, S::Error> {
        let object_id = object_id.into();
        let object = match category {
            GeneralCategory::Post => {
                let post = object_id.as_int().and_then(|id| self.host.post(id));
                match post {
                    Some(post) => ObjectIdentity::new(post.post_type, post.id),
                    None => return Ok(true),
                }
            }
            category => ObjectIdentity::new(category.as_str(), object_id),
        };

        self.check_object_access(actor, &object)
    }

    /// Drop the cached resolutions of one object. The next read recomputes them.
    ///
    /// Returns `true` if anything was cached.
    pub fn unset_user_groups_for_object(&self, object: &ObjectIdentity) -> bool {
        let mut resolved = self.resolved.write().unwrap_or_else(PoisonError::into_inner);
        resolved.revision += 1;
        let direct = resolved.entries.remove(&(object.clone(), false)).is_some();
        let recursive = resolved.entries.remove(&(object.clone(), true)).is_some();
        direct || recursive
    }

    /// Drop every cached resolution.
    ///
    /// Needed after any assignment change, objects inherit the groups of their parents.
    pub fn clear_resolutions(&self) {
        let mut resolved = self.resolved.write().unwrap_or_else(PoisonError::into_inner);
        resolved.revision += 1;
        resolved.entries.clear();
    }

    /// Returns `true` if a resolution of the object is cached and still valid.
    pub fn has_cached_groups(&self, object: &ObjectIdentity) -> bool {
        let resolved = self.resolved.read().unwrap_or_else(PoisonError::into_inner);
        resolved.generation == self.cache.generation()
            && (resolved.entries.contains_key(&(object.clone(), false))
                || resolved.entries.contains_key(&(object.clone(), true)))
    }

    /// Load one group from the store.
    pub fn group(&self, id: &GroupId) -> Result<Option<Group>, S::Error> {
        self.store.load_group(id)
    }
}
