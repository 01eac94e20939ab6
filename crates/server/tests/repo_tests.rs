//! Integration tests for repository creation and listing.

mod common;

use axum::http::StatusCode;
use common::{TestServer, blob_data, blob_name};
use serde_json::{Value, json};

const TYPE_DIRS: [&str; 5] = ["data", "index", "keys", "locks", "snapshots"];

fn assert_layout(server: &TestServer, repo: &str) {
    let base = server.disk_path(repo);
    for dir in TYPE_DIRS {
        assert!(base.join(dir).is_dir(), "missing {dir}");
    }
    assert!(!base.join("config").exists());

    let mut shards: Vec<String> = std::fs::read_dir(base.join("data"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    shards.sort();
    assert_eq!(shards.len(), 256);
    assert_eq!(shards.first().map(String::as_str), Some("00"));
    assert_eq!(shards.last().map(String::as_str), Some("ff"));
    assert!(shards.iter().all(|s| s.len() == 2));
}

#[tokio::test]
async fn create_named_repo_layout() {
    let server = TestServer::new().await;

    let resp = server.create_repo("photos").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_layout(&server, "photos");
}

#[tokio::test]
async fn create_root_repo_layout() {
    let server = TestServer::new().await;

    let resp = server.create_repo("").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_layout(&server, "");
}

#[tokio::test]
async fn create_twice_is_safe() {
    let server = TestServer::new().await;

    assert_eq!(server.create_repo("photos").await.status, StatusCode::OK);
    server.save("/photos/keys/k1", "key").await;
    assert_eq!(server.create_repo("photos").await.status, StatusCode::OK);

    assert_layout(&server, "photos");
    assert!(server.disk_path("photos/keys/k1").is_file());
}

#[tokio::test]
async fn create_requires_flag() {
    let server = TestServer::new().await;

    for uri in [
        "/photos/",
        "/photos/?create=",
        "/photos/?create=false",
        "/photos/?create=TRUE",
        "/photos/?other=true",
    ] {
        let resp = server.call("POST", uri).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(&resp.body[..], b"Bad Request\n");
    }
    assert!(!server.disk_path("photos").exists());
}

#[tokio::test]
async fn create_uses_first_flag_value() {
    let server = TestServer::new().await;

    let resp = server.call("POST", "/photos/?create=true&create=true").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_layout(&server, "photos");

    let resp = server.call("POST", "/music/?create=false&create=true").await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(!server.disk_path("music").exists());
}

#[tokio::test]
async fn list_fresh_repo_is_empty() {
    let server = TestServer::new().await;
    server.create_repo("photos").await;

    for blob_type in ["keys", "data"] {
        let resp = server.call("GET", &format!("/photos/{blob_type}/")).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(
            resp.header("content-type"),
            Some("application/vnd.x.restic.rest.v2")
        );
        assert_eq!(&resp.body[..], b"[]");
    }
}

#[tokio::test]
async fn list_flattens_shards() {
    let server = TestServer::new().await;
    server.create_repo("photos").await;

    let a1 = blob_name("a1");
    let a2 = format!("a1{}", "f".repeat(62));
    let b1 = blob_name("b1");
    server.save(&format!("/photos/data/{b1}"), blob_data(30, 1)).await;
    server.save(&format!("/photos/data/{a2}"), blob_data(20, 2)).await;
    server.save(&format!("/photos/data/{a1}"), blob_data(10, 3)).await;

    let resp = server.call("GET", "/photos/data/").await;
    assert_eq!(resp.status, StatusCode::OK);
    let listing: Value = serde_json::from_slice(&resp.body).unwrap();

    // Shard directories in order, each shard's blobs in order.
    assert_eq!(
        listing,
        json!([
            {"name": a1, "size": 10},
            {"name": a2, "size": 20},
            {"name": b1, "size": 30},
        ])
    );
}

#[tokio::test]
async fn list_unsharded_type() {
    let server = TestServer::new().await;

    server.save("/snapshots/s2", "22").await;
    server.save("/snapshots/s1", "1").await;

    let resp = server.call("GET", "/snapshots/").await;
    assert_eq!(resp.status, StatusCode::OK);
    let listing: Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(
        listing,
        json!([{"name": "s1", "size": 1}, {"name": "s2", "size": 2}])
    );
}

#[tokio::test]
async fn list_missing_type_dir_is_not_found() {
    let server = TestServer::new().await;

    let resp = server.call("GET", "/nope/keys/").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = server.call("GET", "/nope/bogus/").await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn list_of_config_object_is_not_found() {
    let server = TestServer::new().await;
    server.create_repo("photos").await;
    server.save("/photos/config", "cfg").await;
    server.save("/config", "cfg").await;

    let resp = server.call("GET", "/photos/config/").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(&resp.body[..], b"Not Found\n");

    let resp = server.call("GET", "/config/").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
