use std::sync::{Arc, LazyLock};
use veil_core::{KeyRing, SecureStore, VeilError};
use veil_crypto::PaillierKey;
use veil_domain::{MemberScheme, SchemeConfig, ValueScheme};
use veil_store::{MemoryStore, StoreTransport};

static PAILLIER: LazyLock<PaillierKey> =
    LazyLock::new(|| PaillierKey::generate(512).expect("key generation"));

fn keys(master: &str) -> Arc<KeyRing> {
    KeyRing::builder().paillier(PAILLIER.clone()).secret(master, "salt").build().unwrap()
}

fn secure(transport: MemoryStore, scheme: SchemeConfig) -> SecureStore<MemoryStore> {
    SecureStore::new(transport, keys("master"), scheme).unwrap()
}

/// Replaces the single stored string value with `edit(value)`.
async fn rewrite(store: &SecureStore<MemoryStore>, edit: impl FnOnce(&str) -> String) {
    let (key, mut values) = store.transport().dump().remove(0);
    let edited = edit(&values.remove(0));
    store.transport().set(&key, &edited, None).await.unwrap();
}

fn flip_char(value: &str, index: usize) -> String {
    let mut bytes = value.as_bytes().to_vec();
    bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
    String::from_utf8(bytes).unwrap()
}

#[tokio::test]
async fn test_tampered_hash_is_integrity_violation() {
    let store = secure(MemoryStore::new(), SchemeConfig::default());
    store.set("k", "secret value", None).await.unwrap();
    rewrite(&store, |v| flip_char(v, v.len() - 6)).await;

    let err = store.get("k").await.unwrap_err();
    assert!(matches!(err, VeilError::IntegrityViolation { .. }));
    assert!(err.is_security_violation());
}

#[tokio::test]
async fn test_tampered_payload_is_detected() {
    let store = secure(MemoryStore::new(), SchemeConfig::default());
    store.set("k", "secret value", None).await.unwrap();
    rewrite(&store, |v| flip_char(v, 6)).await;
    assert!(store.get("k").await.unwrap_err().is_security_violation());
}

#[tokio::test]
async fn test_tampered_counter_blocks_arithmetic() {
    let store = secure(MemoryStore::new(), SchemeConfig::default());
    store.set("n", "5", None).await.unwrap();
    rewrite(&store, |v| {
        let mut fields: Vec<&str> = v.split('|').collect();
        fields[1] = "12345";
        fields.join("|")
    })
    .await;

    assert!(store.sum("n", "1").await.unwrap_err().is_security_violation());
}

#[tokio::test]
async fn test_swapped_tag_is_rejected() {
    let store = secure(MemoryStore::new(), SchemeConfig::default());
    store.set("n", "5", None).await.unwrap();
    rewrite(&store, |v| v.replacen("ADD", "RND", 1)).await;
    assert!(matches!(store.get("n").await.unwrap_err(), VeilError::IntegrityViolation { .. }));
}

#[tokio::test]
async fn test_truncated_envelope_is_rejected() {
    let scheme = SchemeConfig { values: ValueScheme::Envelope, ..SchemeConfig::default() };
    let store = secure(MemoryStore::new(), scheme);
    store.set("k", "v", None).await.unwrap();
    rewrite(&store, |v| v.rsplit_once('|').map(|(head, _)| head.to_owned()).unwrap()).await;
    assert!(matches!(store.get("k").await.unwrap_err(), VeilError::IntegrityViolation { .. }));
}

#[tokio::test]
async fn test_values_from_other_keys_are_rejected() {
    let transport = MemoryStore::new();
    let writer = secure(transport.clone(), SchemeConfig::default());
    writer.set("k", "v", None).await.unwrap();
    let (writer_key, mut written) = transport.dump().remove(0);

    let reader = SecureStore::new(transport.clone(), keys("other"), SchemeConfig::default()).unwrap();
    reader.set("k", "placeholder", None).await.unwrap();
    let reader_key =
        transport.dump().into_iter().map(|(key, _)| key).find(|key| *key != writer_key).unwrap();
    transport.set(&reader_key, &written.remove(0), None).await.unwrap();

    assert!(reader.get("k").await.unwrap_err().is_security_violation());
}

#[tokio::test]
async fn test_tampered_set_member_is_rejected() {
    let scheme = SchemeConfig { members: MemberScheme::Envelope, ..SchemeConfig::default() };
    let store = secure(MemoryStore::new(), scheme);
    store.sadd("s", &["member".to_owned()]).await.unwrap();

    let (key, members) = store.transport().dump().remove(0);
    store.transport().sadd(&key, &[flip_char(&members[0], 8)]).await.unwrap();
    assert!(store.smembers("s", None).await.unwrap_err().is_security_violation());
}
