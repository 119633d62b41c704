/// Read-through caching in Redis.
///
/// Returns the cached value when `$key` is present. Otherwise awaits `$block`,
/// queues its value for a background write with `$ttl` seconds to live and
/// returns it. Errors from the cache read or from `$block` are propagated
/// with `?`, so failed lookups are never cached.
///
/// # Example
/// ```rust,ignore
/// let movie: OmdbMovie = cached!(cache, CacheKey::Movie(id.clone()), MOVIE_CACHE_TTL, async {
///     fetch_movie(&id).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await? {
            tracing::debug!(key = %key, "Cache hit");
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
