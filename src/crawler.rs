//! Query dispatcher: fetch, merge, follow pagination, persist
//!
//! A `Crawler` is a single worker task owning the in-memory cache tree, the
//! disk cache, and an HTTP client. Query chains arrive as jobs on a channel;
//! pagination continuations are re-enqueued on an internal work queue rather
//! than followed by direct recursion, so an arbitrarily long chain keeps a
//! bounded stack and pages stay strictly sequential. Because the worker is
//! the only writer, the cache tree needs no locking.
//!
//! Resolution order per cache path: a readable backing file short-circuits
//! the network entirely (the file is authoritative and is not re-saved);
//! otherwise pages are fetched and merged until one has no `next` link, at
//! which point the accumulated subtree is persisted exactly once. Any fetch,
//! status, or body-parse failure abandons the chain without persisting, so a
//! future run refetches it from page 1.

use std::collections::VecDeque;
use std::path::PathBuf;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::{CachePath, CachePathError, CacheStore, DiskCache};

/// Errors that can end a pagination chain early
///
/// None of these propagate past the crawler: each is logged and converted
/// into a partial (possibly zero) object count.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Transport-level failure issuing the request
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with something other than 200
    #[error("unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },

    /// The response body was not valid JSON
    #[error("invalid response body from {url}: {source}")]
    Body {
        url: String,
        source: serde_json::Error,
    },

    /// The query URL yields no cache path
    #[error(transparent)]
    Path(#[from] CachePathError),
}

/// One unit of work on the crawler's queue
#[derive(Debug)]
enum Job {
    /// Entry point for a query chain: derive the cache path, try the file
    /// cache, fall through to the first page fetch
    Resolve {
        url: String,
        done: oneshot::Sender<usize>,
    },
    /// One page of an in-flight chain, carrying the running object count
    Page {
        url: String,
        cache_path: CachePath,
        total: usize,
        done: oneshot::Sender<usize>,
    },
}

/// Handle for submitting query chains to a spawned crawler
#[derive(Debug, Clone)]
pub struct CrawlerHandle {
    tx: mpsc::Sender<Job>,
}

impl CrawlerHandle {
    /// Resolves a query URL and returns the total number of objects merged
    /// for its chain, whether served from the file cache or fetched.
    ///
    /// Returns 0 if the crawler has already shut down.
    pub async fn resolve(&self, query_url: impl Into<String>) -> usize {
        let (done, result) = oneshot::channel();
        let job = Job::Resolve {
            url: query_url.into(),
            done,
        };
        if self.tx.send(job).await.is_err() {
            return 0;
        }
        result.await.unwrap_or(0)
    }
}

/// Result of fetching and merging one page
struct PageOutcome {
    count: usize,
    next: Option<String>,
}

/// Single-writer worker driving fetch/merge/persist for query chains
#[derive(Debug)]
pub struct Crawler {
    store: CacheStore,
    disk: DiskCache,
    client: Client,
    /// Continuations for in-flight chains; drained before new external jobs
    queue: VecDeque<Job>,
    rx: mpsc::Receiver<Job>,
}

impl Crawler {
    /// Spawns a crawler task persisting under `root_dir`.
    ///
    /// The task runs until every handle is dropped and all pending chains
    /// have drained, then resolves to the in-memory store.
    pub fn spawn(root_dir: impl Into<PathBuf>) -> (CrawlerHandle, JoinHandle<CacheStore>) {
        let (tx, rx) = mpsc::channel(32);
        let crawler = Self {
            store: CacheStore::new(),
            disk: DiskCache::new(root_dir),
            client: Client::new(),
            queue: VecDeque::new(),
            rx,
        };
        let task = tokio::spawn(crawler.run());
        (CrawlerHandle { tx }, task)
    }

    /// Processes jobs until the channel closes and the queue drains
    pub async fn run(mut self) -> CacheStore {
        while let Some(job) = self.next_job().await {
            self.process(job).await;
        }
        self.store
    }

    /// Internal continuations take priority over new external jobs, which
    /// keeps each chain's pages strictly ordered.
    async fn next_job(&mut self) -> Option<Job> {
        if let Some(job) = self.queue.pop_front() {
            return Some(job);
        }
        self.rx.recv().await
    }

    async fn process(&mut self, job: Job) {
        match job {
            Job::Resolve { url, done } => self.resolve(url, done),
            Job::Page {
                url,
                cache_path,
                total,
                done,
            } => self.page(url, cache_path, total, done).await,
        }
    }

    /// Checks the file cache for a query URL's path; on a hit merges the
    /// persisted subtree and completes, on a miss enqueues the first page.
    fn resolve(&mut self, url: String, done: oneshot::Sender<usize>) {
        let cache_path = match CachePath::from_url(&url) {
            Ok(cache_path) => cache_path,
            Err(err) => {
                error!(%url, %err, "cannot derive cache path");
                let _ = done.send(0);
                return;
            }
        };

        if let Some(persisted) = self.disk.load(&cache_path) {
            let count = self.store.merge_value(&cache_path, Some(persisted));
            info!(cache_path = %cache_path, count, "served from file cache");
            let _ = done.send(count);
            return;
        }

        debug!(cache_path = %cache_path, %url, "file cache miss, starting chain");
        self.queue.push_back(Job::Page {
            url,
            cache_path,
            total: 0,
            done,
        });
    }

    /// Fetches and merges one page, then either enqueues the next page or
    /// persists the completed subtree.
    async fn page(
        &mut self,
        url: String,
        cache_path: CachePath,
        total: usize,
        done: oneshot::Sender<usize>,
    ) {
        let outcome = match self.fetch_page(&url, &cache_path).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // Nothing was persisted, so a future run restarts the chain
                // from page 1.
                error!(%url, cache_path = %cache_path, %err, "fetch failed, abandoning chain");
                let _ = done.send(total);
                return;
            }
        };

        let total = total + outcome.count;
        match outcome.next {
            Some(next) => {
                debug!(cache_path = %cache_path, %next, total, "following next page");
                self.queue.push_back(Job::Page {
                    url: next,
                    cache_path,
                    total,
                    done,
                });
            }
            None => {
                let subtree = self.store.node_at(&cache_path);
                if let Err(err) = self.disk.save(&cache_path, subtree) {
                    error!(cache_path = %cache_path, %err, "failed to persist subtree");
                } else {
                    info!(cache_path = %cache_path, total, "chain complete, subtree persisted");
                }
                let _ = done.send(total);
            }
        }
    }

    /// Issues one GET, merges the payload, and reports the next-page link.
    async fn fetch_page(
        &mut self,
        url: &str,
        cache_path: &CachePath,
    ) -> Result<PageOutcome, CrawlError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(CrawlError::Status {
                status,
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        let parsed: Value = serde_json::from_slice(&body).map_err(|source| CrawlError::Body {
            url: url.to_string(),
            source,
        })?;

        let next = next_link(&parsed);
        let count = self.store.merge_response(cache_path, parsed);
        Ok(PageOutcome { count, next })
    }
}

/// Extracts the next-page link from a response's pagination block.
///
/// An absent block, absent `urls`, or absent `next` all mean the chain is on
/// its last page.
fn next_link(response: &Value) -> Option<String> {
    response
        .get("pagination")?
        .get("urls")?
        .get("next")?
        .as_str()
        .map(str::to_owned)
}

/// Startup hook invoked once after the HTTP server begins listening.
///
/// Triggers the initial query chain and logs its outcome. Recoverable
/// failures inside the chain have already been logged and folded into the
/// count by the crawler.
pub async fn on_started(handle: CrawlerHandle, init_query: String) {
    info!(%init_query, "dispatching initial query");
    let count = handle.resolve(init_query).await;
    info!(count, "initial query resolved");
}
