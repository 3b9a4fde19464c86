//! Bootstrap crawler: reconstruct the metadata index from a
//! pre-existing bucket.
//!
//! Scans every key under the repositories prefix page by page. Each
//! `current/link` tombstone names a `(repository, tag)`; tags already
//! in the index are skipped, the rest are fetched through the regular
//! manifest read path (which backfills the index). Fetches run on a
//! worker pool capped at `available_parallelism * 4`; the listing loop
//! blocks on a permit before spawning, so in-flight work stays bounded
//! on large bucket scans.

use crate::error::ApiResult;
use crate::registry::Registry;
use reg_core::paths;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Counters reported by a bootstrap run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootstrapStats {
    /// `current/link` keys seen in the scan.
    pub found: u64,
    /// Tags already present in the index.
    pub skipped: u64,
    /// Manifest fetches dispatched to workers.
    pub processed: u64,
}

fn pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        * 4
}

/// Run one bootstrap pass. Returns after the last page is consumed and
/// every worker has finished. Individual fetch errors are logged and
/// counted, never fatal; dropping the returned future aborts in-flight
/// workers.
pub async fn bootstrap(registry: Arc<Registry>) -> ApiResult<BootstrapStats> {
    let semaphore = Arc::new(Semaphore::new(pool_size()));
    let mut workers: JoinSet<()> = JoinSet::new();
    let processed = Arc::new(AtomicU64::new(0));

    let mut found = 0u64;
    let mut skipped = 0u64;
    let mut token: Option<String> = None;

    loop {
        let page = registry
            .storage
            .list_page(paths::REPOSITORIES_PREFIX, token.as_deref())
            .await?;

        for key in &page.keys {
            let Some((repo, tag)) = paths::repo_tag_from_key(key) else {
                continue;
            };
            found += 1;

            if registry.metadata.tag_exists(&repo, &tag).await? {
                skipped += 1;
                if skipped % 10_000 == 5_000 {
                    tracing::info!(skipped, "bootstrap progress");
                }
                continue;
            }

            // Reap finished workers so the join set does not grow with
            // the scan.
            while workers.try_join_next().is_some() {}

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("bootstrap semaphore is never closed");
            let registry = registry.clone();
            let processed_for_worker = processed.clone();
            workers.spawn(async move {
                let _permit = permit;
                if let Err(e) = registry.get_manifest(&repo, &tag).await {
                    tracing::warn!(%repo, %tag, error = %e, "bootstrap manifest fetch failed");
                }
                processed_for_worker.fetch_add(1, Ordering::Relaxed);
            });

            if found % 1_000 == 500 {
                tracing::info!(
                    found,
                    processed = processed.load(Ordering::Relaxed),
                    "bootstrap progress"
                );
            }
        }

        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    while workers.join_next().await.is_some() {}

    let stats = BootstrapStats {
        found,
        skipped,
        processed: processed.load(Ordering::Relaxed),
    };
    tracing::info!(
        found = stats.found,
        skipped = stats.skipped,
        processed = stats.processed,
        "bootstrap finished"
    );
    Ok(stats)
}
