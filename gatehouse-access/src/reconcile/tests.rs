// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;
use std::time::Duration;

use mock_instant::thread_local::MockClock;
use rstest::rstest;

use crate::config::Config;
use crate::group::{DynamicGroupId, Group, GroupId, MutationOp};
use crate::registry::TypeRegistry;
use crate::resolver::{AccessResolver, Actor};
use crate::store::GroupMemoryStore;
use crate::test_utils::{TestHost, setup_logging};
use crate::traits::GroupStore;
use crate::types::{AssignmentInfo, DefaultBounds, GeneralCategory, ObjectId, ObjectIdentity};
use crate::Timestamp;

use super::{AssignmentReconciler, DynamicRow, ReconcileOutcome, ReconcileRequest, is_new_object};

type Resolver = AccessResolver<TestHost, GroupMemoryStore>;

fn host() -> TestHost {
    TestHost::default()
        .with_post_type("post", "Posts")
        .with_taxonomy("category", "Categories")
        .with_post(12, "Article", "post", None)
        .with_post(13, "Article (rev)", "revision", Some(12))
        .with_term(7, "News", "category", None)
        .with_post_terms(12, &[7])
        .with_user(3, "Alice", &["author"])
        .with_role("author", "Author")
}

fn article() -> ObjectIdentity {
    ObjectIdentity::new("post", 12)
}

fn window(from: u64, to: u64) -> AssignmentInfo {
    AssignmentInfo::new(Some(Timestamp::new(from)), Some(Timestamp::new(to)))
}

/// Groups 1 to 5, the article is assigned to the given ones.
fn resolver_with(assigned: &[u64], config: Config) -> Resolver {
    let groups = (1..=5).map(|id| {
        let mut group = Group::new(id, format!("Group {id}"));
        if assigned.contains(&id) {
            group.add_object(article(), AssignmentInfo::unbounded());
        }
        group
    });

    let host = host();
    let registry = TypeRegistry::from_host(&host);
    AccessResolver::new(host, GroupMemoryStore::with_groups(groups), registry, config)
}

fn admin() -> Actor {
    Actor::user(1, ["administrator"]).with_manage_groups()
}

fn applied(outcome: ReconcileOutcome) -> Vec<(GroupId, MutationOp)> {
    match outcome {
        ReconcileOutcome::Applied(changeset) => changeset
            .mutations()
            .iter()
            .map(|mutation| (mutation.group.clone(), mutation.op))
            .collect(),
        ReconcileOutcome::Unauthorized => panic!("expected an applied reconciliation"),
    }
}

fn assigned_groups(resolver: &Resolver, object: &ObjectIdentity) -> BTreeSet<GroupId> {
    resolver
        .full_groups()
        .unwrap()
        .into_iter()
        .filter(|group| group.has_object(object))
        .map(|group| group.id().clone())
        .collect()
}

#[test]
fn diff_adds_and_removes_only_changes() {
    setup_logging();

    let resolver = resolver_with(&[1, 2, 3], Config::default());
    let reconciler = AssignmentReconciler::new(&resolver);
    let request = ReconcileRequest::new(article()).with_groups([2, 3, 4]);

    let mutations = applied(reconciler.reconcile(&admin(), &request).unwrap());
    assert_eq!(
        mutations,
        vec![
            (GroupId::Static(4), MutationOp::Add(AssignmentInfo::unbounded())),
            (GroupId::Static(1), MutationOp::Remove),
        ]
    );
    assert_eq!(
        assigned_groups(&resolver, &article()),
        BTreeSet::from([GroupId::Static(2), GroupId::Static(3), GroupId::Static(4)])
    );

    // Running again with the same input changes nothing.
    let mutations = applied(reconciler.reconcile(&admin(), &request).unwrap());
    assert!(mutations.is_empty());
}

#[test]
fn bulk_remove_ignores_adds_and_defaults() {
    let resolver = resolver_with(&[1, 2, 3], Config::default());
    let mut defaults = resolver.group(&GroupId::Static(5)).unwrap().unwrap();
    defaults.set_default_for_object_type("post", DefaultBounds::default());
    resolver.store().save_group(&defaults).unwrap();

    let reconciler = AssignmentReconciler::new(&resolver);
    let request = ReconcileRequest::new(article())
        .with_groups([2, 3])
        .with_date_override(4, AssignmentInfo::unbounded())
        .with_dynamic_row(DynamicRow::new(&DynamicGroupId::user(3), None, None))
        .new_object()
        .bulk_remove();

    let mutations = applied(reconciler.reconcile(&admin(), &request).unwrap());
    assert_eq!(
        mutations,
        vec![
            (GroupId::Static(2), MutationOp::Remove),
            (GroupId::Static(3), MutationOp::Remove),
        ]
    );
    assert_eq!(assigned_groups(&resolver, &article()), BTreeSet::from([GroupId::Static(1)]));
}

#[test]
fn unauthorized_actors_change_nothing() {
    let resolver = resolver_with(&[1], Config::default());
    let reconciler = AssignmentReconciler::new(&resolver);

    // Populate the resolution cache.
    assert_eq!(resolver.user_groups_for(&article(), false).unwrap().len(), 1);

    let author = Actor::user(3, ["author"]);
    let request = ReconcileRequest::new(article()).with_groups([2, 3]);
    let outcome = reconciler.reconcile(&author, &request).unwrap();

    assert_eq!(outcome, ReconcileOutcome::Unauthorized);
    assert!(outcome.changeset().is_none());
    assert!(resolver.has_cached_groups(&article()));
    assert_eq!(assigned_groups(&resolver, &article()), BTreeSet::from([GroupId::Static(1)]));

    // New objects are no exception unless authors may add to groups.
    let outcome = reconciler.reconcile(&author, &request.clone().new_object()).unwrap();
    assert!(!outcome.is_authorized());
}

#[test]
fn authorized_reconciliation_drops_cached_resolution() {
    let resolver = resolver_with(&[1], Config::default());
    let reconciler = AssignmentReconciler::new(&resolver);

    assert_eq!(resolver.user_groups_for(&article(), false).unwrap().len(), 1);
    assert!(resolver.has_cached_groups(&article()));

    let request = ReconcileRequest::new(article()).with_groups([1]);
    assert!(applied(reconciler.reconcile(&admin(), &request).unwrap()).is_empty());
    assert!(!resolver.has_cached_groups(&article()));
}

#[test]
fn date_overrides_are_always_applied() {
    let resolver = resolver_with(&[1, 2], Config::default());
    let reconciler = AssignmentReconciler::new(&resolver);
    let request = ReconcileRequest::new(article())
        .with_groups([1, 2, 3])
        .with_date_override(2, window(10, 20))
        .with_date_override(3, window(30, 40));

    let mutations = applied(reconciler.reconcile(&admin(), &request).unwrap());
    assert_eq!(
        mutations,
        vec![
            (GroupId::Static(3), MutationOp::Add(window(30, 40))),
            (GroupId::Static(2), MutationOp::Add(window(10, 20))),
        ]
    );

    // Group 3 is unchanged now, both overrides are applied again.
    let mutations = applied(reconciler.reconcile(&admin(), &request).unwrap());
    assert_eq!(
        mutations,
        vec![
            (GroupId::Static(2), MutationOp::Add(window(10, 20))),
            (GroupId::Static(3), MutationOp::Add(window(30, 40))),
        ]
    );

    let group = resolver.group(&GroupId::Static(2)).unwrap().unwrap();
    assert_eq!(group.assignment(&article()), Some(&window(10, 20)));
}

#[test]
fn dynamic_rows_upsert_once() {
    let resolver = resolver_with(&[], Config::default());
    let reconciler = AssignmentReconciler::new(&resolver);

    let alice = DynamicGroupId::user(3);
    let tampered = DynamicRow {
        submitted_under: "role|author".to_string(),
        kind: "user".to_string(),
        external_id: "author".to_string(),
        from_date: None,
        to_date: None,
    };
    let unknown_kind = DynamicRow {
        submitted_under: "team|1".to_string(),
        kind: "team".to_string(),
        external_id: "1".to_string(),
        from_date: None,
        to_date: None,
    };
    let request = ReconcileRequest::new(article())
        .with_dynamic_row(tampered)
        .with_dynamic_row(unknown_kind)
        .with_dynamic_row(DynamicRow::new(&alice, Some(Timestamp::new(5)), None));

    let outcome = reconciler.reconcile(&admin(), &request).unwrap();
    let changeset = outcome.changeset().unwrap();
    assert_eq!(changeset.created_groups().len(), 1);
    assert_eq!(changeset.created_groups()[0].name(), "Alice");
    assert_eq!(changeset.len(), 1);

    let group = resolver.group(&GroupId::Dynamic(alice.clone())).unwrap().unwrap();
    assert_eq!(
        group.assignment(&article()),
        Some(&AssignmentInfo::new(Some(Timestamp::new(5)), None))
    );

    let mutations = applied(reconciler.reconcile(&admin(), &request).unwrap());
    assert!(mutations.is_empty());

    // New bounds for the same row update the existing group.
    let request = ReconcileRequest::new(article())
        .with_dynamic_row(DynamicRow::new(&alice, None, Some(Timestamp::new(9))));
    let outcome = reconciler.reconcile(&admin(), &request).unwrap();
    let changeset = outcome.changeset().unwrap();
    assert!(changeset.created_groups().is_empty());
    assert_eq!(changeset.len(), 1);
}

#[test]
fn dropped_dynamic_rows_remove_the_membership() {
    let resolver = resolver_with(&[2], Config::default());
    let reconciler = AssignmentReconciler::new(&resolver);

    let alice = DynamicGroupId::user(3);
    let authors = DynamicGroupId::role("author");
    let request = ReconcileRequest::new(article())
        .with_groups([2])
        .with_dynamic_row(DynamicRow::new(&alice, None, None))
        .with_dynamic_row(DynamicRow::new(&authors, None, None));
    assert_eq!(applied(reconciler.reconcile(&admin(), &request).unwrap()).len(), 2);

    let request = ReconcileRequest::new(article())
        .with_groups([2])
        .with_dynamic_row(DynamicRow::new(&authors, None, None));
    let mutations = applied(reconciler.reconcile(&admin(), &request).unwrap());
    assert_eq!(mutations, vec![(GroupId::Dynamic(alice.clone()), MutationOp::Remove)]);
    assert_eq!(
        assigned_groups(&resolver, &article()),
        BTreeSet::from([GroupId::Static(2), GroupId::Dynamic(authors)])
    );

    // The removed group itself stays around for later assignments.
    assert!(resolver.group(&GroupId::Dynamic(alice)).unwrap().is_some());
    assert!(applied(reconciler.reconcile(&admin(), &request).unwrap()).is_empty());
}

#[test]
fn reconciling_a_parent_refreshes_inherited_resolutions() {
    let resolver = resolver_with(&[], Config::default());
    let reconciler = AssignmentReconciler::new(&resolver);
    let news = ObjectIdentity::new("category", 7);

    assert!(resolver.user_groups_for(&article(), true).unwrap().is_empty());
    assert!(resolver.has_cached_groups(&article()));

    let request = ReconcileRequest::new(news.clone()).with_groups([1]);
    applied(reconciler.reconcile(&admin(), &request).unwrap());

    let inherited: Vec<GroupId> = resolver
        .user_groups_for(&article(), true)
        .unwrap()
        .iter()
        .map(|group| group.id().clone())
        .collect();
    assert_eq!(inherited, vec![GroupId::Static(1)]);

    assert_eq!(reconciler.remove_object_data(&news).unwrap(), 1);
    assert!(resolver.user_groups_for(&article(), true).unwrap().is_empty());
}

#[test]
fn default_groups_apply_to_new_objects() {
    MockClock::set_system_time(Duration::from_secs(100));

    let resolver = resolver_with(&[], Config::default());
    for id in [4, 5] {
        let mut group = resolver.group(&GroupId::Static(id)).unwrap().unwrap();
        group.set_default_for_object_type("post", DefaultBounds::new(Some(1), Some(2)));
        resolver.store().save_group(&group).unwrap();
    }

    let reconciler = AssignmentReconciler::new(&resolver);
    let request = ReconcileRequest::new(article())
        .with_groups([1, 4])
        .with_date_override(4, window(7, 8))
        .new_object();

    let mutations = applied(reconciler.reconcile(&admin(), &request).unwrap());
    assert_eq!(
        mutations,
        vec![
            (GroupId::Static(1), MutationOp::Add(AssignmentInfo::unbounded())),
            (GroupId::Static(4), MutationOp::Add(window(7, 8))),
            (GroupId::Static(5), MutationOp::Add(window(101, 102))),
        ]
    );

    // Existing objects never receive defaults.
    let page = ObjectIdentity::new("post", 99);
    let request = ReconcileRequest::new(page.clone());
    assert!(applied(reconciler.reconcile(&admin(), &request).unwrap()).is_empty());

    // A second pass over the new object keeps the default bounds untouched.
    let request = ReconcileRequest::new(article()).with_groups([1, 4, 5]).new_object();
    assert!(applied(reconciler.reconcile(&admin(), &request).unwrap()).is_empty());
}

#[test]
fn authors_may_only_apply_defaults() {
    let resolver = resolver_with(
        &[],
        Config {
            authors_can_add_to_groups: true,
            ..Config::default()
        },
    );
    let mut defaults = resolver.group(&GroupId::Static(5)).unwrap().unwrap();
    defaults.set_default_for_object_type("post", DefaultBounds::default());
    resolver.store().save_group(&defaults).unwrap();

    let reconciler = AssignmentReconciler::new(&resolver);
    let author = Actor::user(3, ["author"]);
    let request = ReconcileRequest::new(article())
        .with_groups([1, 2])
        .with_dynamic_row(DynamicRow::new(&DynamicGroupId::user(3), None, None))
        .new_object();

    let mutations = applied(reconciler.reconcile(&author, &request).unwrap());
    assert_eq!(
        mutations,
        vec![(GroupId::Static(5), MutationOp::Add(AssignmentInfo::unbounded()))]
    );

    // Editing an existing object stays out of reach.
    let request = ReconcileRequest::new(article()).with_groups([1]);
    assert_eq!(
        reconciler.reconcile(&author, &request).unwrap(),
        ReconcileOutcome::Unauthorized
    );
}

#[test]
fn remove_object_data_from_every_group() {
    let resolver = resolver_with(&[1, 3], Config::default());
    let reconciler = AssignmentReconciler::new(&resolver);

    assert_eq!(resolver.user_groups_for(&article(), false).unwrap().len(), 2);
    assert_eq!(reconciler.remove_object_data(&article()).unwrap(), 2);
    assert!(!resolver.has_cached_groups(&article()));
    assert!(resolver.user_groups_for(&article(), false).unwrap().is_empty());
}

#[test]
fn revisions_target_their_parent() {
    let resolver = resolver_with(&[], Config::default());
    let reconciler = AssignmentReconciler::new(&resolver);

    assert_eq!(reconciler.target_for(GeneralCategory::Post, 13), article());
    assert_eq!(
        reconciler.target_for(GeneralCategory::User, 3),
        ObjectIdentity::new("user", 3)
    );
}

#[rstest]
#[case(None, None, None, false)]
#[case(Some("post"), None, None, true)]
#[case(Some("category"), None, Some("edit"), true)]
#[case(Some("post"), Some(1), Some("new"), true)]
#[case(Some("post"), Some(1), Some("edit"), false)]
#[case(Some("post"), Some(1), None, false)]
#[case(Some("category"), Some(1), Some("new"), false)]
fn new_objects(
    #[case] object_type: Option<&str>,
    #[case] object_id: Option<i64>,
    #[case] action: Option<&str>,
    #[case] expected: bool,
) {
    let registry = TypeRegistry::from_host(&host());
    let object_id = object_id.map(ObjectId::from);
    assert_eq!(
        is_new_object(&registry, object_type, object_id.as_ref(), action),
        expected
    );
}
