// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::traits::{ContentHost, PostRecord, RoleRecord, TermRecord, UserRecord};

/// Single-record lookup issued against a `TestHost`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Post(i64),
    Term(i64),
    User(i64),
    Role(String),
    PostTypeLabel(String),
    TaxonomyLabel(String),
}

/// Content host backed by in-memory records.
///
/// Every single-record lookup is logged, clones share the log.
#[derive(Clone, Debug, Default)]
pub struct TestHost {
    posts: BTreeMap<i64, PostRecord>,
    terms: BTreeMap<i64, TermRecord>,
    users: BTreeMap<i64, UserRecord>,
    roles: BTreeMap<String, String>,
    post_types: BTreeMap<String, String>,
    taxonomies: BTreeMap<String, String>,
    lookups: Arc<Mutex<Vec<Lookup>>>,
}

impl TestHost {
    pub fn with_post_type(mut self, name: &str, label: &str) -> Self {
        self.post_types.insert(name.to_string(), label.to_string());
        self
    }

    pub fn with_taxonomy(mut self, name: &str, label: &str) -> Self {
        self.taxonomies.insert(name.to_string(), label.to_string());
        self
    }

    /// Insert or replace a post. Term associations of a replaced post are kept.
    pub fn with_post(mut self, id: i64, title: &str, post_type: &str, parent: Option<i64>) -> Self {
        let terms = self
            .posts
            .remove(&id)
            .map(|post| post.terms)
            .unwrap_or_default();
        self.posts.insert(
            id,
            PostRecord {
                id,
                title: title.to_string(),
                post_type: post_type.to_string(),
                parent,
                terms,
            },
        );
        self
    }

    /// Associate a post with terms. Unknown posts are ignored.
    pub fn with_post_terms(mut self, post_id: i64, terms: &[i64]) -> Self {
        if let Some(post) = self.posts.get_mut(&post_id) {
            post.terms.extend_from_slice(terms);
        }
        self
    }

    pub fn with_term(mut self, id: i64, name: &str, taxonomy: &str, parent: Option<i64>) -> Self {
        self.terms.insert(
            id,
            TermRecord {
                id,
                name: name.to_string(),
                taxonomy: taxonomy.to_string(),
                parent,
            },
        );
        self
    }

    pub fn with_user(mut self, id: i64, display_name: &str, roles: &[&str]) -> Self {
        self.users.insert(
            id,
            UserRecord {
                id,
                display_name: display_name.to_string(),
                login: display_name.to_lowercase().replace(' ', "."),
                roles: roles.iter().map(|role| role.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_role(mut self, id: &str, name: &str) -> Self {
        self.roles.insert(id.to_string(), name.to_string());
        self
    }

    /// All single-record lookups issued so far.
    pub fn lookups(&self) -> Vec<Lookup> {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_lookups(&self) {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn log(&self, lookup: Lookup) {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(lookup);
    }
}

impl ContentHost for TestHost {
    fn post(&self, id: i64) -> Option<PostRecord> {
        self.log(Lookup::Post(id));
        self.posts.get(&id).cloned()
    }

    fn term(&self, id: i64) -> Option<TermRecord> {
        self.log(Lookup::Term(id));
        self.terms.get(&id).cloned()
    }

    fn user(&self, id: i64) -> Option<UserRecord> {
        self.log(Lookup::User(id));
        self.users.get(&id).cloned()
    }

    fn roles(&self) -> Vec<RoleRecord> {
        self.roles
            .iter()
            .map(|(id, name)| RoleRecord {
                id: id.clone(),
                name: name.clone(),
            })
            .collect()
    }

    fn role_name(&self, id: &str) -> Option<String> {
        self.log(Lookup::Role(id.to_string()));
        self.roles.get(id).cloned()
    }

    fn post_type_label(&self, post_type: &str) -> Option<String> {
        self.log(Lookup::PostTypeLabel(post_type.to_string()));
        self.post_types.get(post_type).cloned()
    }

    fn taxonomy_label(&self, taxonomy: &str) -> Option<String> {
        self.log(Lookup::TaxonomyLabel(taxonomy.to_string()));
        self.taxonomies.get(taxonomy).cloned()
    }

    fn post_types(&self) -> Vec<String> {
        self.post_types.keys().cloned().collect()
    }

    fn taxonomies(&self) -> Vec<String> {
        self.taxonomies.keys().cloned().collect()
    }

    fn posts(&self) -> Vec<PostRecord> {
        self.posts.values().cloned().collect()
    }

    fn terms(&self) -> Vec<TermRecord> {
        self.terms.values().cloned().collect()
    }

    fn search_users(&self, search: &str) -> Vec<UserRecord> {
        let search = search.to_lowercase();
        self.users
            .values()
            .filter(|user| {
                user.display_name.to_lowercase().contains(&search)
                    || user.login.to_lowercase().contains(&search)
            })
            .cloned()
            .collect()
    }
}
