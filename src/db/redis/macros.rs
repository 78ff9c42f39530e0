/// Serves a value from the response cache or computes and caches it.
///
/// `$cache` is an `Option<&Cache>`; with `None` the block is simply awaited.
/// A failed cache read is logged and treated as a miss, so Redis outages
/// never fail a request. Fresh values are written in the background.
///
/// # Arguments
/// * `$cache`: `Option<&Cache>` to read from and write to.
/// * `$key`: the `CacheKey` of the value.
/// * `$ttl`: time-to-live in seconds for a freshly computed value.
/// * `$block`: future resolving to `AppResult<T>`, awaited on a miss.
/// * `$cacheable` (optional): `Fn(&T) -> bool`; values it rejects are
///   returned but not written.
///
/// # Example
/// ```rust,ignore
/// let response: SearchResponse = cached!(state.cache(), key, ttl, async {
///     search_movies(graph, &query).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {
        $crate::cached!($cache, $key, $ttl, $block, |_| true)
    };
    ($cache:expr, $key:expr, $ttl:expr, $block:expr, $cacheable:expr) => {{
        match $cache {
            Some(cache) => match cache.get(&$key).await {
                Ok(Some(hit)) => {
                    tracing::debug!(key = %$key, "Cache hit");
                    Ok(hit)
                }
                miss => {
                    if let Err(e) = miss {
                        tracing::warn!(error = %e, key = %$key, "Cache read failed, treating as miss");
                    }
                    match $block.await {
                        Ok(value) => {
                            if ($cacheable)(&value) {
                                cache.set_in_background(&$key, &value, $ttl);
                            } else {
                                tracing::debug!(key = %$key, "Result not cacheable, skipping write");
                            }
                            Ok(value)
                        }
                        Err(e) => Err(e),
                    }
                }
            },
            None => $block.await,
        }
    }};
}
