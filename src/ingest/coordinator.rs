use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{self, JoinSet};

use super::{
    ArticleWriter, EntryFetcher, IngestError, IngestFailure, IngestionResult, SourceRegistry,
    SourcedEntry,
};
use crate::feed::FetchError;
use crate::storage::{FeedSource, NewArticle};
use crate::util::strip_tags;

/// Default ceiling on simultaneous feed fetches.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Capacity of the entry channel between fetch tasks and the writer.
const CHANNEL_CAPACITY: usize = 100;

/// What a fetch task reports once it has sent all of its entries.
struct SourceOutcome {
    source: FeedSource,
    result: Result<usize, FetchError>,
}

/// Runs ingestion cycles over a registry, a fetcher and a writer.
///
/// Each cycle fans out one task per feed source (at most
/// `max_concurrent` fetching at once), funnels every parsed entry through a
/// single channel, and writes them one at a time.
pub struct Ingestor<R, F, W> {
    registry: R,
    fetcher: Arc<F>,
    writer: W,
    max_concurrent: usize,
}

impl<R, F, W> Ingestor<R, F, W>
where
    R: SourceRegistry,
    F: EntryFetcher,
    W: ArticleWriter,
{
    pub fn new(registry: R, fetcher: F, writer: W) -> Self {
        Self {
            registry,
            fetcher: Arc::new(fetcher),
            writer,
            max_concurrent: DEFAULT_CONCURRENCY,
        }
    }

    /// Limit how many feeds are fetched at the same time (minimum 1).
    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Run one ingestion cycle to completion.
    ///
    /// The source list is read once up front. Fetch failures and write
    /// failures are logged, recorded in the result and otherwise ignored;
    /// only failing to read the source list aborts the run.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::SourceListUnavailable`] if the registry could
    /// not be read. No partial result is reported in that case.
    pub async fn run_cycle(&self) -> Result<IngestionResult, IngestError> {
        let sources = self
            .registry
            .list_sources()
            .await
            .map_err(IngestError::SourceListUnavailable)?;

        let mut result = IngestionResult {
            sources_total: sources.len(),
            ..IngestionResult::default()
        };

        if sources.is_empty() {
            tracing::info!("No feeds registered, nothing to ingest");
            return Ok(result);
        }

        tracing::info!(
            sources = sources.len(),
            max_concurrent = self.max_concurrent,
            "Starting ingestion cycle"
        );

        let (tx, mut rx) = mpsc::channel::<SourcedEntry>(CHANNEL_CAPACITY);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();
        // A panicked task returns no outcome, so remember which source each
        // task was fetching.
        let mut task_sources: HashMap<task::Id, (i64, String)> =
            HashMap::with_capacity(sources.len());

        for source in sources {
            let label = (source.id, source.url.clone());
            let tx = tx.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);

            let handle = tasks.spawn(async move {
                let fetched = {
                    // The semaphore is never closed, so acquire cannot fail
                    let _permit = semaphore.acquire_owned().await.ok();
                    fetcher.fetch(&source).await
                };

                let result = match fetched {
                    Ok(entries) => {
                        let count = entries.len();
                        for entry in entries {
                            let item = SourcedEntry {
                                source_id: source.id,
                                entry,
                            };
                            if tx.send(item).await.is_err() {
                                break;
                            }
                        }
                        Ok(count)
                    }
                    Err(e) => Err(e),
                };

                SourceOutcome { source, result }
            });
            task_sources.insert(handle.id(), label);
        }
        // Only the tasks hold senders now; the channel closes when the last
        // one finishes.
        drop(tx);

        while let Some(item) = rx.recv().await {
            self.store(item, &mut result).await;
        }

        // Every sender is gone, so every task has finished or is finishing.
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(SourceOutcome {
                    source,
                    result: Ok(count),
                }) => {
                    tracing::debug!(feed_id = source.id, entries = count, "Feed ingested");
                }
                Ok(SourceOutcome {
                    source,
                    result: Err(e),
                }) => {
                    tracing::warn!(
                        feed_id = source.id,
                        url = %source.url,
                        error = %e,
                        "Failed to fetch feed"
                    );
                    result.sources_failed += 1;
                    result.failures.push(IngestFailure::SourceFetchFailed {
                        source_id: source.id,
                        url: source.url,
                        cause: e.to_string(),
                    });
                }
                Err(join_err) => {
                    let (source_id, url) = task_sources
                        .remove(&join_err.id())
                        .unwrap_or_default();
                    tracing::error!(
                        feed_id = source_id,
                        url = %url,
                        error = %join_err,
                        "Feed fetch task panicked"
                    );
                    result.sources_failed += 1;
                    result.failures.push(IngestFailure::SourceFetchFailed {
                        source_id,
                        url,
                        cause: join_err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            new_articles = result.new_article_count,
            entries = result.entries_seen,
            duplicates = result.duplicates,
            failed_sources = result.sources_failed,
            write_failures = result.write_failures,
            "Ingestion cycle complete"
        );

        Ok(result)
    }

    /// Sanitize one entry and write it, updating the run statistics.
    async fn store(&self, item: SourcedEntry, result: &mut IngestionResult) {
        let SourcedEntry { source_id, entry } = item;
        result.entries_seen += 1;

        let title = strip_tags(&entry.title);
        let article = NewArticle {
            title: if title.is_empty() {
                "Untitled".to_string()
            } else {
                title.into_owned()
            },
            content: strip_tags(&entry.raw_body).into_owned(),
            link: entry.link,
            published_at: entry.published_at,
            feed_id: source_id,
        };

        match self.writer.insert_article_if_absent(&article).await {
            Ok(true) => result.new_article_count += 1,
            Ok(false) => {
                tracing::debug!(link = %article.link, "Article already stored");
                result.duplicates += 1;
            }
            Err(e) => {
                tracing::warn!(
                    feed_id = source_id,
                    link = %article.link,
                    error = %e,
                    "Failed to store article"
                );
                result.write_failures += 1;
                result.failures.push(IngestFailure::WriteFailed {
                    link: article.link,
                    cause: e.to_string(),
                });
            }
        }
    }
}
