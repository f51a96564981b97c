use tokio::time::{Instant, sleep};

use crate::support::*;

#[tokio::test(start_paused = true)]
async fn cancel_during_slow_snapshot_ends_stream_promptly() {
    let (store, graph) = graph();
    seed(&graph, &["u1", "u2"]).await;
    store.delay("follows", "u2.u1", Duration::from_secs(10));
    let mut subscription = graph.subscribe(Some(&signed_in("u1")), &uid("u2"));
    let handle = subscription.cancel_handle();

    let started = Instant::now();
    let (next, _) = tokio::join!(subscription.next(), async {
        sleep(Duration::from_millis(10)).await;
        handle.cancel();
    });

    assert!(next.is_none());
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(subscription.is_cancelled());
}

#[tokio::test]
async fn snapshot_follows_changes_from_cloned_service() {
    let (_, graph) = graph();
    seed(&graph, &["u1", "u2"]).await;
    let u1 = signed_in("u1");
    let mut subscription = graph.subscribe(Some(&u1), &uid("u2"));
    assert!(!subscription.next().await.unwrap().unwrap().is_following);

    let other_handle = graph.clone();
    other_handle.follow(Some(&u1), &uid("u2")).await.unwrap();

    let snapshot = subscription.next().await.unwrap().unwrap();
    assert!(snapshot.is_following);
    assert_eq!(snapshot.viewer, Some(uid("u1")));
}
