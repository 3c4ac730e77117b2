use nosh_database::*;

#[tokio::test]
async fn connect_in_memory_and_health_check() {
    let db = Database::builder()
        .url("mem://")
        .session("test_ns", "test_db")
        .init()
        .await
        .expect("connect to mem://");

    // Health should be OK for mem://
    db.health().await.expect("health check");
    db.use_ns("test_ns").use_db("test_db").await.expect("session switch");
}

#[tokio::test]
async fn missing_parameters_fail_validation() {
    let err = Database::builder().init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}

#[tokio::test]
async fn migrations_are_idempotent_across_connections() {
    // Two connects against the same engine would share the ledger; with
    // mem:// each connect is a fresh engine, so the second run exercises the
    // full apply path instead of the skip path. Both must succeed.
    for _ in 0..2 {
        let db = Database::builder()
            .url("mem://")
            .session("test_ns", "test_db")
            .init()
            .await
            .expect("connect");

        // The place table exists after migrations.
        let mut response =
            db.query("INFO FOR DB").await.expect("info query");
        let _ = response.take::<surrealdb::types::Value>(0).expect("info result");
    }
}
