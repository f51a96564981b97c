use syncodex::CancellationToken;
use tokio::time::{Instant, sleep};

use crate::support::*;

async fn following_three() -> (Arc<InstrumentedStore>, FollowGraphService<InstrumentedStore>) {
    let (store, graph) = graph();
    seed(&graph, &["u1", "u2", "u3", "u4"]).await;
    let u1 = signed_in("u1");
    for target in ["u2", "u3", "u4"] {
        graph.follow(Some(&u1), &uid(target)).await.unwrap();
    }
    (store, graph)
}

#[tokio::test(start_paused = true)]
async fn profile_lookups_run_concurrently() {
    let (store, graph) = following_three().await;
    store.delay("users", "u2", Duration::from_millis(100));
    store.delay("users", "u3", Duration::from_millis(100));
    store.delay("users", "u4", Duration::from_millis(200));

    let started = Instant::now();
    let following = graph.list_following(Some(&signed_in("u1"))).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(ids(&following), vec!["u2", "u3", "u4"]);
    assert!(elapsed >= Duration::from_millis(200), "finished early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "lookups ran sequentially: {elapsed:?}");
}

#[tokio::test]
async fn dangling_entries_are_skipped() {
    let (store, graph) = following_three().await;
    assert!(store.delete("users", "u3").await.unwrap());

    let following = graph.list_following(Some(&signed_in("u1"))).await.unwrap();

    assert_eq!(ids(&following), vec!["u2", "u4"]);
}

#[tokio::test]
async fn followers_listing_resolves_other_side() {
    let (_, graph) = following_three().await;
    graph.follow(Some(&signed_in("u2")), &uid("u4")).await.unwrap();

    let followers = graph.list_followers(Some(&signed_in("u4"))).await.unwrap();
    assert_eq!(ids(&followers), vec!["u1", "u2"]);

    let none = graph.list_followers(Some(&signed_in("u1"))).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn empty_set_reads_only_the_viewer() {
    let (store, graph) = graph();
    seed(&graph, &["u1"]).await;
    let before = store.calls();

    let following = graph.list_following(Some(&signed_in("u1"))).await.unwrap();

    assert!(following.is_empty());
    assert_eq!(store.calls() - before, 1);
}

#[tokio::test]
async fn listing_without_profile_is_not_found() {
    let (_, graph) = graph();
    let err = graph.list_following(Some(&signed_in("stranger"))).await.unwrap_err();
    assert!(matches!(err, GraphError::ProfileNotFound { ref user_id } if user_id == "stranger"));
}

#[tokio::test(start_paused = true)]
async fn cancellation_abandons_pending_lookups() {
    let (store, graph) = following_three().await;
    for target in ["u2", "u3", "u4"] {
        store.delay("users", target, Duration::from_secs(5));
    }
    let cancel = CancellationToken::new();
    let viewer = signed_in("u1");

    let started = Instant::now();
    let (result, _) = tokio::join!(graph.list_following_with(Some(&viewer), &cancel), async {
        sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    assert!(matches!(result, Err(GraphError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn uncancelled_listing_completes() {
    let (_, graph) = following_three().await;
    let cancel = CancellationToken::new();

    let followers = graph.list_followers_with(Some(&signed_in("u2")), &cancel).await.unwrap();
    assert_eq!(ids(&followers), vec!["u1"]);
}
