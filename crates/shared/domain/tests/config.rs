use nosh_domain::config::ApiConfig;

#[test]
fn defaults_are_sane() {
    let cfg = ApiConfig::default();

    assert_eq!(cfg.server.port, 4680);
    assert!(cfg.server.ssl.is_none());
    assert_eq!(cfg.database.url, "mem://");
    assert_eq!(cfg.database.namespace, "nosh");
    assert_eq!(cfg.places.query_limit, 25);
    assert_eq!(cfg.places.category, "restaurant");
}

#[test]
fn deserializes_partial_overrides() {
    let cfg: ApiConfig = serde_json::from_str(
        r#"{
            "server": { "port": 9000 },
            "places": { "category": "cafe" }
        }"#,
    )
    .expect("partial config should deserialize");

    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.places.category, "cafe");
    // Untouched sections fall back to defaults.
    assert_eq!(cfg.database.database, "core");
}

#[test]
fn clone_is_cheap_and_mutation_detaches() {
    let cfg = ApiConfig::default();
    let mut other = cfg.clone();
    other.server.port = 1;

    assert_eq!(cfg.server.port, 4680);
    assert_eq!(other.server.port, 1);
}
