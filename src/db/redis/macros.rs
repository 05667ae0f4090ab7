/// Looks a value up in an optional cache, computing and storing it on a miss.
///
/// `$cache` is an `Option<Cache>`; with `None`, or when Redis cannot be read,
/// the block runs directly.
///
/// ```rust,ignore
/// let genres: Vec<Genre> = cached!(self.cache, CacheKey::Genres(kind), GENRE_TTL, async move {
///     self.fetch_genres(kind).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        match $cache.as_ref() {
            Some(cache) => match cache.get_from_cache(&key).await {
                Ok(Some(hit)) => Ok(hit),
                Ok(None) => match $block.await {
                    Ok(value) => {
                        cache.set_in_background(&key, &value, $ttl);
                        Ok(value)
                    }
                    Err(e) => Err(e),
                },
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Cache read failed");
                    $block.await
                }
            },
            None => $block.await,
        }
    }};
}
