use std::time::Duration;
use veil_store::{Store, StoreError, TlsPaths};

#[tokio::test]
async fn unreachable_node_reports_connection_error() {
    let result = Store::builder()
        .redis("127.0.0.1", 1)
        .retries(1)
        .connection_timeout(Duration::from_millis(500))
        .connect()
        .await;

    assert!(matches!(result, Err(StoreError::Connection { .. })), "got {result:?}");
}

#[tokio::test]
async fn missing_tls_files_fail_before_connecting() {
    let result = Store::builder()
        .redis("127.0.0.1", 1)
        .tls(TlsPaths { ca_cert: Some("/definitely/not/here.pem".into()), ..Default::default() })
        .connect()
        .await;

    assert!(matches!(result, Err(StoreError::Io { .. })), "got {result:?}");
}

#[tokio::test]
async fn half_client_identity_is_rejected() {
    let cert = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(cert.path(), b"not really a cert").unwrap();

    let result = Store::builder()
        .redis("127.0.0.1", 1)
        .tls(TlsPaths { client_cert: Some(cert.path().to_path_buf()), ..Default::default() })
        .connect()
        .await;

    assert!(matches!(result, Err(StoreError::Validation { .. })), "got {result:?}");
}
