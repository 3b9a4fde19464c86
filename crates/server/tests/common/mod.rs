//! Shared integration test harness.
//!
//! Each test binary uses a subset of these helpers.
#![allow(dead_code)]

pub mod fixtures;
pub mod memory;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use memory::MemoryStore;
use reg_core::config::AppConfig;
use reg_metadata::{MetadataStore, SqliteStore};
use reg_server::{AppState, Registry, create_router};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A registry wired to an in-memory bucket and a temp-file index.
pub struct TestServer {
    pub router: Router,
    pub storage: Arc<MemoryStore>,
    pub registry: Arc<Registry>,
    _temp: TempDir,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with_storage(MemoryStore::new()).await
    }

    /// Build with a pre-configured store (e.g. a small listing page
    /// size to exercise pagination).
    pub async fn with_storage(storage: MemoryStore) -> Self {
        let temp = TempDir::new().unwrap();
        let storage = Arc::new(storage);
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(temp.path().join("registry.db"))
                .await
                .unwrap(),
        );
        let registry = Arc::new(Registry::new(storage.clone(), metadata));
        let state = AppState::new(AppConfig::for_testing(), registry.clone());

        Self {
            router: create_router(state),
            storage,
            registry,
            _temp: temp,
        }
    }

    pub fn metadata(&self) -> &Arc<dyn MetadataStore> {
        self.registry.metadata()
    }

    /// Issue one request against the router, returning status, headers,
    /// and the collected body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        headers: &[(&str, &str)],
        body: impl Into<Body>,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(body.into()).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body)
    }
}

/// Header accessor that panics with context when absent.
pub fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}
