use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::MovieId;

/// Keys of cached API responses
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    MovieSearch(String),
    MovieDetail(MovieId),
    Recommendations(MovieId),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::MovieSearch(query) => write!(f, "search:{}", query.trim().to_lowercase()),
            CacheKey::MovieDetail(id) => write!(f, "movie:{}", id),
            CacheKey::Recommendations(id) => write!(f, "rec:{}", id),
        }
    }
}

/// Creates a Redis client for the response cache
///
/// Opening a client does not connect; connections are made per operation.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Pending write handed to the background writer
struct PendingWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Response cache backed by Redis
///
/// Reads go straight to Redis. Writes are queued and applied by a background
/// task so that request handlers never wait on them.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
}

/// Owns the background writer; shut it down to flush queued writes
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Signals the writer and waits until queued writes are flushed
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
        tracing::info!("Cache writer stopped");
    }
}

impl Cache {
    /// Creates the cache and spawns its background writer
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(Self::run_writer(
            redis_client.clone(),
            write_rx,
            shutdown_rx,
        ));

        (
            Self {
                redis_client,
                write_tx,
            },
            CacheWriterHandle { shutdown_tx, task },
        )
    }

    async fn run_writer(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Cache writer started");

        loop {
            tokio::select! {
                Some(write) = write_rx.recv() => {
                    if let Err(e) = Self::apply(&client, write).await {
                        tracing::warn!(error = %e, "Cache write failed");
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }

        write_rx.close();
        let mut flushed = 0usize;
        while let Some(write) = write_rx.recv().await {
            match Self::apply(&client, write).await {
                Ok(()) => flushed += 1,
                Err(e) => tracing::warn!(error = %e, "Cache write failed during shutdown"),
            }
        }
        tracing::debug!(flushed, "Cache writer drained");
    }

    async fn apply(client: &Client, write: PendingWrite) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(write.key, write.value, write.ttl).await?;
        Ok(())
    }

    /// Reads and deserializes a cached value, `None` on a miss
    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })
            })
            .transpose()
    }

    /// Queues a value for caching with a TTL in seconds
    ///
    /// Returns immediately; failures are logged by the writer.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Cache serialization error");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            value,
            ttl,
        };

        if self.write_tx.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer is gone, dropping write");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_search_normalizes_query() {
        let key = CacheKey::MovieSearch("  The MATRIX ".to_string());
        assert_eq!(key.to_string(), "search:the matrix");
    }

    #[test]
    fn test_cache_key_display_movie_detail() {
        assert_eq!(CacheKey::MovieDetail(19995).to_string(), "movie:19995");
    }

    #[test]
    fn test_cache_key_display_recommendations() {
        assert_eq!(CacheKey::Recommendations(603).to_string(), "rec:603");
    }

    #[tokio::test]
    async fn test_get_reports_unreachable_redis() {
        // Nothing listens on port 1
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, handle) = Cache::new(client);

        let result: AppResult<Option<String>> = cache.get(&CacheKey::MovieDetail(1)).await;
        assert!(matches!(result, Err(AppError::Cache(_))));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_failed_writes() {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, handle) = Cache::new(client);

        cache.set_in_background(&CacheKey::Recommendations(1), &vec!["Alien"], 30);

        // Completes even though every write fails
        handle.shutdown().await;
    }
}
