// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

use tracing::trace;

use crate::group::{Group, MembershipTrace};
use crate::resolver::AccessResolver;
use crate::traits::{ContentHost, GroupStore};
use crate::types::{GeneralCategory, ObjectId, ObjectIdentity};

/// Human-facing explanation of a membership: bucket label to object id to display name.
pub type MembershipExplanation = BTreeMap<String, BTreeMap<ObjectId, String>>;

impl<H, S> AccessResolver<H, S>
where
    H: ContentHost,
    S: GroupStore,
{
    /// Explain through which roles, users, terms, posts and pluggable objects the group reaches
    /// the object.
    pub fn explain_membership(
        &self,
        group: &Group,
        object: &ObjectIdentity,
    ) -> MembershipExplanation {
        let hierarchy = self.cache.hierarchy(&self.host);
        let trace = group.recursive_membership_for(object, &self.registry, &hierarchy);
        self.explain_trace(object, trace)
    }

    /// Turn a raw membership trace of `subject` into display buckets.
    ///
    /// Categories are evaluated in the order role, user, term, post, pluggable. Entries of
    /// unknown object types are dropped. Sentinel ids are listed under their own id without
    /// asking the host.
    pub fn explain_trace(
        &self,
        subject: &ObjectIdentity,
        trace: MembershipTrace,
    ) -> MembershipExplanation {
        let mut by_category: BTreeMap<GeneralCategory, Vec<(String, Vec<ObjectId>)>> =
            BTreeMap::new();
        for (object_type, members) in trace {
            let category = self.registry.classify(&object_type);
            if category.is_unknown() {
                trace!(%object_type, "drop trace entries of unknown type");
                continue;
            }
            by_category
                .entry(category)
                .or_default()
                .push((object_type, members.into_keys().collect()));
        }

        let mut explanation = MembershipExplanation::new();
        for category in GeneralCategory::ORDERED {
            let Some(entries) = by_category.remove(&category) else {
                continue;
            };

            for (object_type, members) in entries {
                for object_id in members {
                    let entry = match category {
                        GeneralCategory::Role => Some(self.explain_role(&object_id)),
                        GeneralCategory::User => Some(self.explain_user(&object_id)),
                        GeneralCategory::Term => Some(self.explain_term(subject, &object_id)),
                        GeneralCategory::Post => Some(self.explain_post(subject, &object_id)),
                        GeneralCategory::Pluggable => {
                            self.explain_pluggable(&object_type, &object_id)
                        }
                        GeneralCategory::Unknown => None,
                    };

                    if let Some((bucket, name)) = entry {
                        explanation.entry(bucket).or_default().insert(object_id, name);
                    }
                }
            }
        }

        explanation
    }

    fn explain_role(&self, id: &ObjectId) -> (String, String) {
        let bucket = GeneralCategory::Role.as_str().to_string();
        if id.is_sentinel() {
            return (bucket, id.to_string());
        }

        let name = self
            .host
            .role_name(&id.to_string())
            .unwrap_or_else(|| id.to_string());
        (bucket, name)
    }

    fn explain_user(&self, id: &ObjectId) -> (String, String) {
        let bucket = GeneralCategory::User.as_str().to_string();
        if id.is_sentinel() {
            return (bucket, id.to_string());
        }

        let name = id
            .as_int()
            .and_then(|user_id| self.host.user(user_id))
            .map(|user| user.display_name)
            .unwrap_or_else(|| id.to_string());
        (bucket, name)
    }

    /// Terms of another taxonomy than the subject's are listed under their taxonomy's label.
    fn explain_term(&self, subject: &ObjectIdentity, id: &ObjectId) -> (String, String) {
        let generic = GeneralCategory::Term.as_str().to_string();
        if id.is_sentinel() {
            return (generic, id.to_string());
        }

        let Some(term) = id.as_int().and_then(|term_id| self.host.term(term_id)) else {
            return (generic, id.to_string());
        };

        let bucket = if term.taxonomy != subject.object_type {
            self.host.taxonomy_label(&term.taxonomy).unwrap_or(generic)
        } else {
            generic
        };
        (bucket, term.name)
    }

    /// Posts of another post type than the subject's are listed under their post type's label.
    fn explain_post(&self, subject: &ObjectIdentity, id: &ObjectId) -> (String, String) {
        let generic = GeneralCategory::Post.as_str().to_string();
        if id.is_sentinel() {
            return (generic, id.to_string());
        }

        let Some(post) = id.as_int().and_then(|post_id| self.host.post(post_id)) else {
            return (generic, id.to_string());
        };

        let bucket = if post.post_type != subject.object_type {
            self.host.post_type_label(&post.post_type).unwrap_or(generic)
        } else {
            generic
        };
        (bucket, post.title)
    }

    fn explain_pluggable(&self, object_type: &str, id: &ObjectId) -> Option<(String, String)> {
        let provider = self.registry.provider_for(object_type)?;
        let name = provider.object_name(id).unwrap_or_else(|| id.to_string());
        Some((provider.display_type().to_string(), name))
    }
}
