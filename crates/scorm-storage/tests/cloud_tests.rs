//! Cloud backend tests against a mock API server

use bytes::Bytes;
use scorm_storage::{CloudConfig, CloudStorage, FolderName, ObjectKey, StorageAdapter, StorageError};
use serde_json::json;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn storage(server: &MockServer) -> CloudStorage {
    let config = CloudConfig::with_credentials("demo", "key", "secret")
        .with_api_url(server.uri())
        .with_root_prefix("scorm");
    CloudStorage::new(config).unwrap()
}

fn empty_listing() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "resources": [] }))
}

#[tokio::test]
async fn test_upload_returns_secure_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/demo/auto/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_id": "scorm/course/index.html",
            "secure_url": "https://cdn.example.com/raw/upload/scorm/course/index.html",
            "bytes": 6,
            "resource_type": "raw"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = storage(&server);
    let key = ObjectKey::parse("course", "index.html").unwrap();
    let stored = store.put_bytes(&key, Bytes::from_static(b"<html>")).await.unwrap();

    assert_eq!(stored.url, "https://cdn.example.com/raw/upload/scorm/course/index.html");
    assert_eq!(stored.size, 6);
    assert_eq!(stored.key, "course/index.html");
}

#[tokio::test]
async fn test_upload_file_streams_contents() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/demo/auto/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_id": "scorm/scorm_files/course.zip",
            "secure_url": "https://cdn.example.com/raw/upload/scorm/scorm_files/course.zip",
            "bytes": 3,
            "resource_type": "raw"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("course.zip");
    std::fs::write(&source, b"ABC").unwrap();

    let store = storage(&server);
    let key = ObjectKey::parse("scorm_files", "course.zip").unwrap();
    let stored = store.put_file(&key, &source).await.unwrap();
    assert!(stored.url.ends_with("/course.zip"));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"public_id\""));
    assert!(body.contains("scorm/scorm_files/course.zip"));
    assert!(body.contains("name=\"signature\""));
    assert!(body.contains("ABC"));
}

#[tokio::test]
async fn test_upload_error_message_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/demo/auto/upload"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Invalid Signature" }
        })))
        .mount(&server)
        .await;

    let store = storage(&server);
    let key = ObjectKey::parse("course", "index.html").unwrap();
    let err = store.put_bytes(&key, Bytes::from_static(b"x")).await.unwrap_err();

    match err {
        StorageError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid Signature");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_list_groups_by_folder_and_prefers_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/demo/resources/raw/upload"))
        .and(query_param("prefix", "scorm/"))
        .and(basic_auth("key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": [
                { "public_id": "scorm/alpha/imsmanifest.xml", "secure_url": "https://cdn/alpha/imsmanifest.xml" },
                { "public_id": "scorm/alpha/index.html", "secure_url": "https://cdn/alpha/index.html" },
                { "public_id": "scorm/loose.txt", "secure_url": "https://cdn/loose.txt" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/demo/resources/image/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": [
                { "public_id": "scorm/beta/logo", "secure_url": "https://cdn/beta/logo.png" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/demo/resources/video/upload"))
        .respond_with(empty_listing())
        .mount(&server)
        .await;

    let store = storage(&server);
    let folders = store.list_folders(500).await.unwrap();

    assert_eq!(folders.len(), 2);
    assert_eq!(folders[0].name, "beta");
    assert_eq!(folders[0].link, "https://cdn/beta/logo.png");
    assert_eq!(folders[1].name, "alpha");
    assert_eq!(folders[1].link, "https://cdn/alpha/index.html");

    let truncated = store.list_folders(1).await.unwrap();
    assert_eq!(truncated.len(), 1);
}

#[tokio::test]
async fn test_list_failure_surfaces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(420).set_body_string("Rate Limit Exceeded"))
        .mount(&server)
        .await;

    let store = storage(&server);
    let err = store.list_folders(500).await.unwrap_err();
    assert!(matches!(err, StorageError::Api { status: 420, .. }));
}

#[tokio::test]
async fn test_delete_uses_folder_prefix_for_every_type() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(query_param("prefix", "scorm/course/"))
        .and(basic_auth("key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deleted": {} })))
        .expect(3)
        .mount(&server)
        .await;

    let store = storage(&server);
    let folder = FolderName::parse("course").unwrap();
    store.delete_folder(&folder).await.unwrap();
}

#[tokio::test]
async fn test_delete_missing_prefix_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = storage(&server);
    let folder = FolderName::parse("ghost").unwrap();
    store.delete_folder(&folder).await.unwrap();
}

#[tokio::test]
async fn test_timeout_reports_configured_duration() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/demo/resources/image/upload"))
        .respond_with(empty_listing().set_delay(std::time::Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = CloudConfig::with_credentials("demo", "key", "secret")
        .with_api_url(server.uri())
        .with_timeout(std::time::Duration::from_secs(1));
    let store = CloudStorage::new(config).unwrap();

    let err = store.list_folders(10).await.unwrap_err();
    assert!(matches!(err, StorageError::Timeout { seconds: 1 }), "{err:?}");
}
