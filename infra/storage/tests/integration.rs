use nosh_storage::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_path_traversal_blocked() {
    let temp = TempDir::new().unwrap();

    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    assert!(storage.resolve("../etc/passwd").is_err());
    assert!(storage.resolve("foo/../../bar").is_err());
}

#[tokio::test]
async fn test_write_read_roundtrip_uncompressed() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    let payload = b"hello world";
    storage.write("foo/bar.bin", payload).await.unwrap();
    assert!(storage.exists("foo/bar.bin").unwrap());

    let data = storage.read("foo/bar.bin").await.unwrap();
    assert_eq!(data, payload);

    let meta = storage.metadata("foo/bar.bin").await.unwrap();
    assert!(meta.len() > 0);
}

#[tokio::test]
async fn test_write_read_roundtrip_compressed() {
    let temp = TempDir::new().unwrap();
    let storage =
        Storage::builder().root(temp.path()).compression(Compression::Lz4).connect().await.unwrap();

    let payload = vec![1u8; 4096];
    storage.write("bin/data.dat", &payload).await.unwrap();

    let data = storage.read("bin/data.dat").await.unwrap();
    assert_eq!(data, payload);
}

#[tokio::test]
async fn test_text_roundtrip() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    storage.write_text("snapshots/markers.json", "{\"records\":[]}").await.unwrap();
    let text = storage.read_text("snapshots/markers.json").await.unwrap();
    assert_eq!(text, "{\"records\":[]}");
}

#[tokio::test]
async fn test_namespace_isolation() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    let ns_a = storage.namespace("places").unwrap();
    let ns_b = storage.namespace("reference").unwrap();

    ns_a.write("snapshot.json", b"a").await.unwrap();
    ns_b.write("snapshot.json", b"b").await.unwrap();

    let a_path = ns_a.resolve("snapshot.json").unwrap();
    let b_path = ns_b.resolve("snapshot.json").unwrap();
    assert_ne!(a_path, b_path, "namespaced paths must differ");

    assert_eq!(ns_a.read("snapshot.json").await.unwrap(), b"a");
    assert_eq!(ns_b.read("snapshot.json").await.unwrap(), b"b");
}

#[tokio::test]
async fn test_namespace_rejects_illegal_names() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    assert!(storage.namespace("").is_err());
    assert!(storage.namespace("../escape").is_err());
    assert!(storage.namespace("with space").is_err());
}

#[tokio::test]
async fn test_overwrite_replaces_content() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    storage.write("file.bin", b"first").await.unwrap();
    storage.write("file.bin", b"second").await.unwrap();

    assert_eq!(storage.read("file.bin").await.unwrap(), b"second");
}

#[tokio::test]
async fn test_delete_and_exists() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    storage.write("tmp/file.txt", b"x").await.unwrap();
    assert!(storage.exists("tmp/file.txt").unwrap());

    storage.delete("tmp/file.txt").await.unwrap();
    assert!(!storage.exists("tmp/file.txt").unwrap());
}

#[tokio::test]
async fn test_read_missing_returns_file_not_found() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();

    let err = storage.read("missing.bin").await.expect_err("expected error");
    match err {
        StorageError::FileNotFound { .. } => {},
        other => panic!("unexpected error: {other:?}"),
    }
}
