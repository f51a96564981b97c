use syncodex::models::FOLLOWS;

use crate::support::*;

#[tokio::test]
async fn transient_failures_are_retried() {
    let (store, graph) = graph();
    seed(&graph, &["u1", "u2"]).await;
    let u1 = signed_in("u1");
    let before = store.calls();

    store.fail_next(2);
    graph.follow(Some(&u1), &uid("u2")).await.unwrap();

    assert_eq!(store.calls() - before, 3);
    assert!(graph.relation_status(Some(&u1), &uid("u2")).await.unwrap().is_following);
}

#[tokio::test]
async fn retries_are_bounded() {
    let (store, graph) = graph();
    seed(&graph, &["u1", "u2"]).await;
    let before = store.calls();

    store.fail_next(5);
    let err = graph.follow(Some(&signed_in("u1")), &uid("u2")).await.unwrap_err();

    assert!(matches!(err, GraphError::StoreUnavailable(_)));
    assert_eq!(store.calls() - before, 3);
}

#[tokio::test]
async fn outage_surfaces_and_leaves_no_edge() {
    let (store, graph) = graph();
    seed(&graph, &["u1", "u2"]).await;
    let u1 = signed_in("u1");

    store.set_unavailable(true);
    let err = graph.follow(Some(&u1), &uid("u2")).await.unwrap_err();
    assert!(matches!(err, GraphError::StoreUnavailable(_)));
    let err = graph.relation_status(Some(&u1), &uid("u2")).await.unwrap_err();
    assert!(matches!(err, GraphError::StoreUnavailable(_)));
    store.set_unavailable(false);

    assert!(!store.exists(FOLLOWS, "u2.u1").await.unwrap());
    assert!(!graph.relation_status(Some(&u1), &uid("u2")).await.unwrap().is_following);
    assert!(graph.require_profile(&uid("u1")).await.unwrap().following.is_empty());
}

#[tokio::test]
async fn follow_of_missing_target_is_not_retried() {
    let (store, graph) = graph();
    seed(&graph, &["u1"]).await;
    let before = store.calls();

    let err = graph.follow(Some(&signed_in("u1")), &uid("ghost")).await.unwrap_err();

    assert!(matches!(err, GraphError::ProfileNotFound { .. }));
    assert_eq!(store.calls() - before, 1);
}
