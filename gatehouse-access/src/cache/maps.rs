// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, HashMap};

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Dfs, Reversed};

use crate::traits::ContentHost;

/// One view on the post/term association: object id to related ids and their specific type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssociationMap {
    links: HashMap<i64, BTreeMap<i64, String>>,
}

impl AssociationMap {
    pub(crate) fn post_terms<H: ContentHost>(host: &H) -> Self {
        let taxonomies: HashMap<i64, String> = host
            .terms()
            .into_iter()
            .map(|term| (term.id, term.taxonomy))
            .collect();

        let mut map = Self::default();
        for post in host.posts() {
            for term_id in post.terms {
                // Stale references to deleted terms are not part of the association.
                if let Some(taxonomy) = taxonomies.get(&term_id) {
                    map.insert(post.id, term_id, taxonomy.clone());
                }
            }
        }
        map
    }

    pub(crate) fn term_posts<H: ContentHost>(host: &H) -> Self {
        let terms: HashMap<i64, String> = host
            .terms()
            .into_iter()
            .map(|term| (term.id, term.taxonomy))
            .collect();

        let mut map = Self::default();
        for post in host.posts() {
            for term_id in post.terms {
                if terms.contains_key(&term_id) {
                    map.insert(term_id, post.id, post.post_type.clone());
                }
            }
        }
        map
    }

    fn insert(&mut self, id: i64, related: i64, related_type: String) {
        self.links
            .entry(id)
            .or_default()
            .insert(related, related_type);
    }

    /// Related ids and their types, empty if the id has no relations.
    pub fn related(&self, id: i64) -> Vec<(i64, String)> {
        self.links
            .get(&id)
            .map(|related| {
                related
                    .iter()
                    .map(|(id, object_type)| (*id, object_type.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Parent/child hierarchy. Edges point from parent to child.
#[derive(Clone, Debug, Default)]
pub struct TreeMap {
    graph: DiGraphMap<i64, ()>,
    types: HashMap<i64, String>,
}

impl TreeMap {
    pub(crate) fn terms<H: ContentHost>(host: &H) -> Self {
        Self::from_nodes(
            host.terms()
                .into_iter()
                .map(|term| (term.id, term.taxonomy, term.parent)),
        )
    }

    pub(crate) fn posts<H: ContentHost>(host: &H) -> Self {
        Self::from_nodes(
            host.posts()
                .into_iter()
                .map(|post| (post.id, post.post_type, post.parent)),
        )
    }

    fn from_nodes(nodes: impl Iterator<Item = (i64, String, Option<i64>)>) -> Self {
        let mut tree = Self::default();
        for (id, object_type, parent) in nodes {
            tree.graph.add_node(id);
            tree.types.insert(id, object_type);

            // Hosts use 0 for "no parent".
            match parent {
                Some(parent) if parent > 0 && parent != id => {
                    tree.graph.add_edge(parent, id, ());
                }
                _ => (),
            }
        }
        tree
    }

    /// All ancestors of a node with their type, closest first. The node itself is not included.
    ///
    /// Every node is visited at most once, so cycles in host data terminate.
    pub fn ancestors(&self, id: i64) -> Vec<(i64, String)> {
        if !self.graph.contains_node(id) {
            return Vec::new();
        }

        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(&reversed, id);
        let mut ancestors = Vec::new();
        while let Some(node) = dfs.next(&reversed) {
            if node != id {
                ancestors.push((node, self.object_type(node)));
            }
        }
        ancestors
    }

    /// All descendants of a node with their type. The node itself is not included.
    pub fn descendants(&self, id: i64) -> Vec<(i64, String)> {
        if !self.graph.contains_node(id) {
            return Vec::new();
        }

        let mut dfs = Dfs::new(&self.graph, id);
        let mut descendants = Vec::new();
        while let Some(node) = dfs.next(&self.graph) {
            if node != id {
                descendants.push((node, self.object_type(node)));
            }
        }
        descendants
    }

    /// Parents missing from host data have an empty type.
    fn object_type(&self, id: i64) -> String {
        self.types.get(&id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}
