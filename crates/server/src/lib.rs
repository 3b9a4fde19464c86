//! reg server library.
//!
//! The server composes the storage and metadata crates into the
//! registry coordination layer:
//! - [`registry::Registry`] — reads (blob redirects, manifest
//!   fetch-or-fill, tag lists) and manifest ingestion
//! - [`uploads`] — the blob upload session state machine
//! - [`crawler`] — the one-shot bootstrap crawler
//! - [`routes`] / [`handlers`] — the OCI Distribution HTTP surface

pub mod crawler;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod routes;
pub mod state;
pub mod uploads;

pub use error::{ApiError, ApiResult};
pub use registry::Registry;
pub use routes::create_router;
pub use state::AppState;
