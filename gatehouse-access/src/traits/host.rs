// SPDX-License-Identifier: MIT OR Apache-2.0

/// A post (or any post-like object such as a page, attachment or revision) as known to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub post_type: String,
    pub parent: Option<i64>,
    /// Terms this post is associated with.
    pub terms: Vec<i64>,
}

/// A taxonomy term as known to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermRecord {
    pub id: i64,
    pub name: String,
    pub taxonomy: String,
    pub parent: Option<i64>,
}

/// A user account as known to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub display_name: String,
    pub login: String,
    pub roles: Vec<String>,
}

/// A registered role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleRecord {
    pub id: String,
    pub name: String,
}

/// Read-only view on the host's content.
///
/// Every lookup returns `None` when the record does not exist, including for the sentinel id
/// `-1`. A miss is never an error.
pub trait ContentHost {
    fn post(&self, id: i64) -> Option<PostRecord>;

    fn term(&self, id: i64) -> Option<TermRecord>;

    fn user(&self, id: i64) -> Option<UserRecord>;

    /// All registered roles.
    fn roles(&self) -> Vec<RoleRecord>;

    /// Human label of a post type, `None` if the post type is not registered.
    fn post_type_label(&self, post_type: &str) -> Option<String>;

    /// Human label of a taxonomy, `None` if the taxonomy is not registered.
    fn taxonomy_label(&self, taxonomy: &str) -> Option<String>;

    /// Names of all registered post types.
    fn post_types(&self) -> Vec<String>;

    /// Names of all registered taxonomies.
    fn taxonomies(&self) -> Vec<String>;

    /// All posts, used to materialise the post tree and post/term maps.
    fn posts(&self) -> Vec<PostRecord>;

    /// All terms, used to materialise the term tree.
    fn terms(&self) -> Vec<TermRecord>;

    /// Users whose display name, login or email matches the given search term.
    fn search_users(&self, search: &str) -> Vec<UserRecord>;

    fn role_name(&self, id: &str) -> Option<String> {
        self.roles()
            .into_iter()
            .find(|role| role.id == id)
            .map(|role| role.name)
    }
}
