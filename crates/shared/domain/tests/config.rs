use serde_json::json;
use veil_domain::config::{AppConfig, StoreBackend, StoreConfig, StoreTopology};
use veil_domain::{MemberScheme, ScoreScheme, ValueScheme};

#[test]
fn config_defaults_are_sane() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.server.port, 8080);
    assert!(cfg.server.tls.is_none());

    let store = StoreConfig::default();
    assert_eq!(store.backend, StoreBackend::Redis);
    assert_eq!(store.host, "localhost");
    assert_eq!(store.port, 6379);
    assert_eq!(store.connect_retries, 3);
    assert_eq!(store.topology, StoreTopology::Single);

    assert_eq!(cfg.scheme.values, ValueScheme::Homomorphic);
    assert_eq!(cfg.logging.level, "info");
}

#[test]
fn app_config_deserializes() {
    let raw = json!({
        "server": { "address": "::", "port": 9000 },
        "store": {
            "backend": "memory",
            "topology": "cluster",
            "nodes": ["10.0.0.1:7000", "10.0.0.2:7000"],
            "tls": { "ca_cert": "/etc/veil/ca.pem" }
        },
        "keys": { "master_secret": "m", "salt": "s" },
        "scheme": { "values": "envelope", "members": "envelope", "scores": "plain" }
    });

    let cfg: AppConfig = serde_json::from_value(raw).expect("config deserialize");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.store.backend, StoreBackend::Memory);
    assert_eq!(cfg.store.nodes.len(), 2);
    assert_eq!(cfg.store.port, 6379);
    assert!(cfg.store.tls.as_ref().is_some_and(|t| t.client_cert.is_none()));
    assert_eq!(cfg.scheme.values, ValueScheme::Envelope);
    assert_eq!(cfg.scheme.members, MemberScheme::Envelope);
    assert_eq!(cfg.scheme.scores, ScoreScheme::Plain);
    assert!(cfg.keys.homomorphic_key.is_none());
}

#[test]
fn secrets_are_not_debug_printed() {
    let raw = json!({
        "store": { "password": "hunter2" },
        "keys": { "master_secret": "top-secret", "salt": "pepper" }
    });
    let cfg: AppConfig = serde_json::from_value(raw).unwrap();
    let printed = format!("{cfg:?}");
    assert!(!printed.contains("hunter2"));
    assert!(!printed.contains("top-secret"));
    assert!(printed.contains("[redacted]"));
}

#[test]
fn unknown_scheme_is_rejected() {
    let raw = json!({ "scheme": { "values": "rot13" } });
    assert!(serde_json::from_value::<AppConfig>(raw).is_err());
}
