use crate::support::*;

use syncodex::models::FOLLOWS;

#[tokio::test]
async fn follow_twice_is_same_as_once() {
    let (store, graph) = graph();
    seed(&graph, &["u1", "u2"]).await;
    let u1 = signed_in("u1");

    graph.follow(Some(&u1), &uid("u2")).await.unwrap();
    graph.follow(Some(&u1), &uid("u2")).await.unwrap();

    assert!(graph.relation_status(Some(&u1), &uid("u2")).await.unwrap().is_following);
    let edges = store.query(FOLLOWS, &[]).await.unwrap();
    assert_eq!(edges.len(), 1);
    let profile = graph.require_profile(&uid("u1")).await.unwrap();
    assert_eq!(profile.following.len(), 1);
}

#[tokio::test]
async fn unfollow_of_non_followed_target_is_noop() {
    let (_, graph) = graph();
    seed(&graph, &["u1", "u2"]).await;
    let u1 = signed_in("u1");

    graph.unfollow(Some(&u1), &uid("u2")).await.unwrap();
    graph.unfollow(Some(&u1), &uid("nobody")).await.unwrap();

    assert!(!graph.relation_status(Some(&u1), &uid("u2")).await.unwrap().is_following);
    assert!(graph.require_profile(&uid("u2")).await.unwrap().followers.is_empty());
}

#[tokio::test]
async fn following_and_followers_stay_inverse() {
    let (_, graph) = graph();
    let users = ["u1", "u2", "u3", "u4"];
    seed(&graph, &users).await;

    let moves = [
        ("u1", "u2", true),
        ("u2", "u1", true),
        ("u3", "u1", true),
        ("u1", "u4", true),
        ("u3", "u1", false),
        ("u4", "u2", true),
        ("u1", "u2", false),
    ];
    for (viewer, target, follow) in moves {
        let viewer = signed_in(viewer);
        if follow {
            graph.follow(Some(&viewer), &uid(target)).await.unwrap();
        } else {
            graph.unfollow(Some(&viewer), &uid(target)).await.unwrap();
        }
    }

    for a in users {
        let a_profile = graph.require_profile(&uid(a)).await.unwrap();
        for b in users {
            let b_profile = graph.require_profile(&uid(b)).await.unwrap();
            assert_eq!(
                a_profile.following.contains(&uid(b)),
                b_profile.followers.contains(&uid(a)),
                "{a} -> {b} is one-sided"
            );
        }
    }
}

#[tokio::test]
async fn self_follow_is_rejected_without_state_change() {
    let (store, graph) = graph();
    seed(&graph, &["u1"]).await;
    let u1 = signed_in("u1");

    let err = graph.follow(Some(&u1), &uid("u1")).await.unwrap_err();
    match err {
        GraphError::Validation(err) => assert!(err.has_code("self_follow")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(store.query(FOLLOWS, &[]).await.unwrap().is_empty());
    let profile = graph.require_profile(&uid("u1")).await.unwrap();
    assert!(profile.following.is_empty());
    assert!(profile.followers.is_empty());
}

#[tokio::test]
async fn fresh_user_follows_and_lists() {
    let (_, graph) = graph();
    seed(&graph, &["u1", "u2"]).await;
    let u1 = signed_in("u1");

    graph.follow(Some(&u1), &uid("u2")).await.unwrap();

    assert!(graph.relation_status(Some(&u1), &uid("u2")).await.unwrap().is_following);
    let following = graph.list_following(Some(&u1)).await.unwrap();
    assert_eq!(following.len(), 1);
    assert_eq!(following[0].id, uid("u2"));

    let followers = graph.list_followers(Some(&signed_in("u2"))).await.unwrap();
    assert_eq!(ids(&followers), vec!["u1"]);
}

#[tokio::test]
async fn follow_then_unfollow_clears_relation() {
    let (_, graph) = graph();
    seed(&graph, &["u1", "u2"]).await;
    let u1 = signed_in("u1");

    graph.follow(Some(&u1), &uid("u2")).await.unwrap();
    graph.unfollow(Some(&u1), &uid("u2")).await.unwrap();

    assert!(!graph.relation_status(Some(&u1), &uid("u2")).await.unwrap().is_following);
    assert!(graph.list_following(Some(&u1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn signed_out_status_is_false_without_store_access() {
    let (store, graph) = graph();
    seed(&graph, &["u2"]).await;
    let before = store.calls();

    let status = graph.relation_status(None, &uid("u2")).await.unwrap();

    assert!(!status.is_following);
    assert_eq!(store.calls(), before);
}

#[tokio::test]
async fn signed_out_mutations_require_auth() {
    let (store, graph) = graph();
    seed(&graph, &["u2"]).await;
    let before = store.calls();

    assert!(matches!(graph.follow(None, &uid("u2")).await, Err(GraphError::AuthRequired)));
    assert!(matches!(graph.unfollow(None, &uid("u2")).await, Err(GraphError::AuthRequired)));
    assert!(matches!(graph.list_following(None).await, Err(GraphError::AuthRequired)));
    assert_eq!(store.calls(), before);
}

#[tokio::test]
async fn ensure_profile_keeps_existing_fields() {
    let (_, graph) = graph();
    let first = signed_in("u1");
    let created = graph
        .ensure_profile_initialized(&first, ProfileDefaults::from_identity(&first))
        .await
        .unwrap();
    assert!(created.was_created());
    assert_eq!(created.as_inner().display_name, "Display u1");

    let renamed = Identity::new(uid("u1")).with_display_name("Someone Else");
    let found = graph
        .ensure_profile_initialized(&renamed, ProfileDefaults::from_identity(&renamed))
        .await
        .unwrap();
    assert!(!found.was_created());
    assert_eq!(found.into_inner().display_name, "Display u1");
}

#[tokio::test]
async fn reconcile_repairs_one_sided_sets() {
    let (store, graph) = graph();
    seed(&graph, &["u1", "u2", "u3"]).await;
    let u1 = signed_in("u1");
    graph.follow(Some(&u1), &uid("u2")).await.unwrap();

    // Simulate a writer that only updated one side.
    store
        .commit(
            syncodex::store::WriteBatch::new()
                .remove_from_set("users", "u2", "followers", "u1")
                .add_to_set("users", "u1", "following", "u3"),
        )
        .await
        .unwrap();

    let report = graph.reconcile(&uid("u1")).await.unwrap();
    assert_eq!(report.following_removed, vec!["u3"]);
    assert_eq!(graph.reconcile(&uid("u2")).await.unwrap().followers_added, vec!["u1"]);

    assert!(graph.reconcile(&uid("u1")).await.unwrap().is_clean());
    let u1_profile = graph.require_profile(&uid("u1")).await.unwrap();
    let u2_profile = graph.require_profile(&uid("u2")).await.unwrap();
    assert_eq!(u1_profile.following.len(), 1);
    assert!(u2_profile.followers.contains(&uid("u1")));
}

#[tokio::test]
async fn counts_follow_set_sizes() {
    let (_, graph) = graph();
    seed(&graph, &["u1", "u2", "u3"]).await;
    graph.follow(Some(&signed_in("u1")), &uid("u3")).await.unwrap();
    graph.follow(Some(&signed_in("u2")), &uid("u3")).await.unwrap();

    let counts = graph.relation_counts(&uid("u3")).await.unwrap();
    assert_eq!(counts.followers, 2);
    assert_eq!(counts.following, 0);
}
