//! Bootstrap crawler behavior.

mod common;

use bytes::Bytes;
use common::TestServer;
use common::fixtures::{HELLO_DIGEST, manifest_body, seed_bucket_manifest};
use common::memory::MemoryStore;
use reg_core::paths;
use reg_server::crawler;

async fn indexed_tag_count(server: &TestServer) -> usize {
    let mut count = 0;
    let mut token: Option<String> = None;
    loop {
        let (repos, next) = server
            .metadata()
            .list_repositories(token.as_deref(), 100)
            .await
            .unwrap();
        if repos.is_empty() {
            break;
        }
        for repo in &repos {
            count += server.metadata().list_tags(repo).await.unwrap().len();
        }
        token = next;
    }
    count
}

#[tokio::test]
async fn bootstrap_populates_index_from_bucket() {
    // Small listing pages force the scan through many continuation tokens.
    let server = TestServer::with_storage(MemoryStore::with_page_size(2)).await;
    let body = manifest_body(HELLO_DIGEST, 5);
    for i in 0..5 {
        seed_bucket_manifest(&server.storage, &format!("lib/app{i}"), "latest", &body);
    }

    let stats = crawler::bootstrap(server.registry.clone()).await.unwrap();
    assert_eq!(stats.found, 5);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.processed, 5);

    assert_eq!(indexed_tag_count(&server).await, 5);
    for i in 0..5 {
        let raw = server
            .metadata()
            .get_manifest(&format!("lib/app{i}"), "latest")
            .await
            .unwrap();
        assert_eq!(raw, body);
    }
}

#[tokio::test]
async fn second_run_skips_indexed_tags() {
    let server = TestServer::new().await;
    let body = manifest_body(HELLO_DIGEST, 5);
    for i in 0..10 {
        seed_bucket_manifest(&server.storage, "lib/app", &format!("v{i}"), &body);
    }
    crawler::bootstrap(server.registry.clone()).await.unwrap();

    for i in 0..3 {
        seed_bucket_manifest(&server.storage, "lib/app", &format!("new{i}"), &body);
    }

    let stats = crawler::bootstrap(server.registry.clone()).await.unwrap();
    assert_eq!(stats.found, 13);
    assert_eq!(stats.skipped, 10);
    assert_eq!(stats.processed, 3);
    assert_eq!(indexed_tag_count(&server).await, 13);
}

#[tokio::test]
async fn bootstrap_is_idempotent() {
    let server = TestServer::new().await;
    let body = manifest_body(HELLO_DIGEST, 5);
    for i in 0..4 {
        seed_bucket_manifest(&server.storage, &format!("repo{i}/img"), "latest", &body);
    }

    crawler::bootstrap(server.registry.clone()).await.unwrap();
    let after_first = indexed_tag_count(&server).await;

    let stats = crawler::bootstrap(server.registry.clone()).await.unwrap();
    assert_eq!(stats.skipped, stats.found);
    assert_eq!(stats.processed, 0);
    assert_eq!(indexed_tag_count(&server).await, after_first);
}

#[tokio::test]
async fn fetch_errors_are_counted_not_fatal() {
    let server = TestServer::new().await;
    let body = manifest_body(HELLO_DIGEST, 5);
    seed_bucket_manifest(&server.storage, "lib/good", "v1", &body);
    // A tag pointer whose manifest blob is missing from the bucket.
    server.storage.insert(
        &paths::tag_current_key("lib/broken", "v1"),
        Bytes::from_static(
            b"sha256:00000000000000000000000000000000000000000000000000000000000000aa",
        ),
    );

    let stats = crawler::bootstrap(server.registry.clone()).await.unwrap();
    assert_eq!(stats.found, 2);
    assert_eq!(stats.processed, 2);

    assert!(server.metadata().tag_exists("lib/good", "v1").await.unwrap());
    assert!(!server.metadata().tag_exists("lib/broken", "v1").await.unwrap());
}

#[tokio::test]
async fn non_link_keys_are_ignored() {
    let server = TestServer::new().await;
    let body = manifest_body(HELLO_DIGEST, 5);
    // A full manifest put also writes index/ and revisions/ pointers;
    // only current/link keys count.
    server
        .request("PUT", "/v2/lib/app/manifests/v1", &[], body)
        .await;

    // Fresh index over the same bucket.
    let server2 = TestServer::with_storage(MemoryStore::new()).await;
    for key in server.storage.keys() {
        server2
            .storage
            .insert(&key, server.storage.object(&key).unwrap());
    }

    let stats = crawler::bootstrap(server2.registry.clone()).await.unwrap();
    assert_eq!(stats.found, 1);
    assert_eq!(stats.processed, 1);
}
