// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of specific object types into general categories.
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use crate::traits::{ContentHost, PluggableObject};
use crate::types::{GeneralCategory, ObjectId, ObjectIdentity};

/// Post type of revisions. Assignments of a revision are stored on its parent post.
pub const REVISION_POST_TYPE: &str = "revision";

/// Maps specific object types to general categories and hosts pluggable object providers.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    post_types: HashSet<String>,
    taxonomies: HashSet<String>,
    pluggables: HashMap<String, Arc<dyn PluggableObject>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry knowing every post type and taxonomy the host currently has registered.
    pub fn from_host<H: ContentHost>(host: &H) -> Self {
        let mut registry = Self::new();
        for post_type in host.post_types() {
            registry.register_post_type(post_type);
        }
        for taxonomy in host.taxonomies() {
            registry.register_taxonomy(taxonomy);
        }
        registry
    }

    pub fn register_post_type(&mut self, post_type: impl Into<String>) {
        self.post_types.insert(post_type.into());
    }

    pub fn register_taxonomy(&mut self, taxonomy: impl Into<String>) {
        self.taxonomies.insert(taxonomy.into());
    }

    /// Register a pluggable provider under the object type it declares.
    pub fn register_pluggable(&mut self, provider: Arc<dyn PluggableObject>) {
        self.pluggables
            .insert(provider.object_type().to_string(), provider);
    }

    /// General category of an object type, `Unknown` if the type is neither built-in, a
    /// registered post type or taxonomy, nor a pluggable object.
    pub fn classify(&self, object_type: &str) -> GeneralCategory {
        if let Some(category) = GeneralCategory::from_builtin(object_type) {
            return category;
        }

        if self.post_types.contains(object_type) {
            GeneralCategory::Post
        } else if self.taxonomies.contains(object_type) {
            GeneralCategory::Term
        } else if self.is_pluggable(object_type) {
            GeneralCategory::Pluggable
        } else {
            GeneralCategory::Unknown
        }
    }

    pub fn is_pluggable(&self, object_type: &str) -> bool {
        self.pluggables.contains_key(object_type)
    }

    pub fn provider_for(&self, object_type: &str) -> Option<&Arc<dyn PluggableObject>> {
        self.pluggables.get(object_type)
    }

    /// Object type under which the assignments of an object are stored.
    ///
    /// Posts are stored under their own post type, revisions under their parent post. Terms are
    /// stored under their taxonomy. When the host does not know the object the general category
    /// name is used. Users and roles always use the category name.
    pub fn specific_identity<H: ContentHost>(
        &self,
        host: &H,
        category: GeneralCategory,
        object_id: ObjectId,
    ) -> ObjectIdentity {
        match category {
            GeneralCategory::Post => {
                let post = object_id.as_int().and_then(|id| host.post(id));
                match post {
                    Some(post) if post.post_type == REVISION_POST_TYPE => {
                        match post.parent.and_then(|parent| host.post(parent)) {
                            Some(parent) => ObjectIdentity::new(parent.post_type, parent.id),
                            None => ObjectIdentity::new(post.post_type, post.id),
                        }
                    }
                    Some(post) => ObjectIdentity::new(post.post_type, post.id),
                    None => ObjectIdentity::new(category.as_str(), object_id),
                }
            }
            GeneralCategory::Term => {
                match object_id.as_int().and_then(|id| host.term(id)) {
                    Some(term) => ObjectIdentity::new(term.taxonomy, term.id),
                    None => ObjectIdentity::new(category.as_str(), object_id),
                }
            }
            _ => ObjectIdentity::new(category.as_str(), object_id),
        }
    }
}

impl Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("post_types", &self.post_types)
            .field("taxonomies", &self.taxonomies)
            .field("pluggables", &self.pluggables.keys().collect::<Vec<_>>())
            .finish()
    }
}
