use veil_store::{Expiry, ScoreBound, Store, StoreError, StoreTransport, Topology};

fn store() -> Store {
    Store::builder().memory().build()
}

#[tokio::test]
async fn sorted_set_range_is_inclusive_and_ordered() {
    let store = store();
    assert_eq!(store.zadd("scores", 20.0, "bob").await.unwrap(), 1);
    assert_eq!(store.zadd("scores", 10.0, "alice").await.unwrap(), 1);
    assert_eq!(store.zadd("scores", 30.0, "carol").await.unwrap(), 1);

    let all = store.zrange_by_score("scores", ScoreBound::NegInf, ScoreBound::PosInf).await.unwrap();
    let members: Vec<&str> = all.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(members, ["alice", "bob", "carol"]);

    let mid = store
        .zrange_by_score("scores", ScoreBound::Value(10.0), ScoreBound::Value(20.0))
        .await
        .unwrap();
    assert_eq!(mid, vec![("alice".to_owned(), 10.0), ("bob".to_owned(), 20.0)]);
}

#[tokio::test]
async fn zadd_existing_member_updates_score() {
    let store = store();
    store.zadd("z", 1.0, "m").await.unwrap();
    assert_eq!(store.zadd("z", 5.0, "m").await.unwrap(), 0);
    let range = store.zrange_by_score("z", ScoreBound::NegInf, ScoreBound::PosInf).await.unwrap();
    assert_eq!(range, vec![("m".to_owned(), 5.0)]);
}

#[tokio::test]
async fn sadd_counts_only_new_members() {
    let store = store();
    let first = ["a".to_owned(), "b".to_owned()];
    let second = ["b".to_owned(), "c".to_owned()];
    assert_eq!(store.sadd("s", &first).await.unwrap(), 2);
    assert_eq!(store.sadd("s", &second).await.unwrap(), 1);

    let mut members = store.smembers("s").await.unwrap();
    members.sort();
    assert_eq!(members, ["a", "b", "c"]);
}

#[tokio::test]
async fn missing_keys_are_empty() {
    let store = store();
    assert_eq!(store.get("nope").await.unwrap(), None);
    assert!(store.smembers("nope").await.unwrap().is_empty());
    assert!(
        store
            .zrange_by_score("nope", ScoreBound::NegInf, ScoreBound::PosInf)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn flush_all_clears_everything() {
    let store = store();
    store.set("a", "1", None).await.unwrap();
    store.sadd("b", &["x".to_owned()]).await.unwrap();
    store.flush_all().await.unwrap();
    assert_eq!(store.get("a").await.unwrap(), None);
    assert!(store.smembers("b").await.unwrap().is_empty());
}

#[tokio::test]
async fn topology_is_reported() {
    assert_eq!(store().topology(), Topology::Single);
    let cluster = Store::builder().memory().topology(Topology::Cluster).build();
    assert_eq!(cluster.topology(), Topology::Cluster);
    assert!(cluster.ping().await.is_ok());
}

#[tokio::test]
async fn clones_share_state() {
    let store = store();
    let clone = store.clone();
    clone.set("shared", "yes", None).await.unwrap();
    assert_eq!(store.get("shared").await.unwrap().as_deref(), Some("yes"));
    assert!(matches!(store.zadd("shared", 1.0, "m").await, Err(StoreError::WrongType { .. })));
}

#[tokio::test]
async fn expired_values_disappear() {
    let store = store();
    store.set("short", "v", Some(Expiry::Millis(20))).await.unwrap();
    store.set("long", "v", Some(Expiry::Seconds(60))).await.unwrap();
    assert!(store.get("short").await.unwrap().is_some());

    tokio::time::sleep(std::time::Duration::from_millis(60)).await;

    assert_eq!(store.get("short").await.unwrap(), None);
    assert_eq!(store.get("long").await.unwrap().as_deref(), Some("v"));
}
