use std::collections::HashMap;
use std::future::Future;

/// Rows looked up by id, kept for the lifetime of one reader.
///
/// Only hits are remembered; an id the store does not know is asked
/// for again next time.
#[derive(Debug)]
pub(crate) struct LookupCache<V> {
    entries: HashMap<i64, V>,
}

impl<V: Clone> LookupCache<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub(crate) async fn get_or_fetch<F, Fut, E>(
        &mut self,
        id: i64,
        fetch: F,
    ) -> Result<Option<V>, E>
    where
        F: FnOnce(i64) -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        if let Some(value) = self.entries.get(&id) {
            return Ok(Some(value.clone()));
        }
        let fetched = fetch(id).await?;
        if let Some(value) = &fetched {
            self.entries.insert(id, value.clone());
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    async fn lookup(
        cache: &mut LookupCache<String>,
        id: i64,
        calls: &Cell<u32>,
    ) -> Option<String> {
        cache
            .get_or_fetch(id, |id| async move {
                calls.set(calls.get() + 1);
                Ok::<_, ()>((id != 0).then(|| format!("row {id}")))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn hit_skips_the_store() {
        let calls = Cell::new(0);
        let mut cache = LookupCache::new();

        assert_eq!(lookup(&mut cache, 7, &calls).await.as_deref(), Some("row 7"));
        assert_eq!(lookup(&mut cache, 7, &calls).await.as_deref(), Some("row 7"));
        assert_eq!(calls.get(), 1);

        lookup(&mut cache, 8, &calls).await;
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn misses_are_not_remembered() {
        let calls = Cell::new(0);
        let mut cache = LookupCache::new();

        assert_eq!(lookup(&mut cache, 0, &calls).await, None);
        assert_eq!(lookup(&mut cache, 0, &calls).await, None);
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn fetch_errors_propagate() {
        let mut cache: LookupCache<String> = LookupCache::new();
        let result = cache
            .get_or_fetch(1, |_| async { Err::<Option<String>, _>("store down") })
            .await;
        assert_eq!(result, Err("store down"));
        let again = cache
            .get_or_fetch(1, |_| async { Ok::<_, &str>(Some("x".to_string())) })
            .await;
        assert_eq!(again, Ok(Some("x".to_string())));
    }
}
