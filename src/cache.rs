//! The `PlanCache` contract (§6, §13) and its one shipped implementation.
//!
//! `PlanCache` stays a trait because plan caching is fundamentally a deployment concern (Redis,
//! a shared service, an in-process LRU); `MokaPlanCache` exists only so the crate has a working
//! default rather than forcing every caller to write one before they can plan a second request.

use async_trait::async_trait;
use std::time::Duration;

use crate::location::RequestContext;

#[async_trait]
pub trait PlanCache: Send + Sync {
    async fn on_cache_read(&self, digest: &str, context: &RequestContext) -> Option<String>;
    async fn on_cache_write(&self, digest: &str, plan_json: String, context: &RequestContext);
}

/// In-memory plan cache backed by `moka`'s concurrent async cache, bounded by
/// `PlanCacheConfig::capacity` with an optional TTL.
pub struct MokaPlanCache {
    inner: moka::future::Cache<String, String>,
}

impl MokaPlanCache {
    pub fn new(config: &crate::config::PlanCacheConfig) -> Self {
        let mut builder = moka::future::Cache::builder().max_capacity(config.capacity);
        if let Some(ttl) = config.ttl_seconds {
            builder = builder.time_to_live(Duration::from_secs(ttl));
        }
        Self { inner: builder.build() }
    }
}

#[async_trait]
impl PlanCache for MokaPlanCache {
    async fn on_cache_read(&self, digest: &str, _context: &RequestContext) -> Option<String> {
        self.inner.get(digest).await
    }

    async fn on_cache_write(&self, digest: &str, plan_json: String, _context: &RequestContext) {
        self.inner.insert(digest.to_string(), plan_json).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanCacheConfig;

    #[tokio::test]
    async fn round_trips_a_plan() {
        let cache = MokaPlanCache::new(&PlanCacheConfig::default());
        let ctx = RequestContext::new();
        assert!(cache.on_cache_read("abc", &ctx).await.is_none());
        cache.on_cache_write("abc", "{\"ops\":[]}".to_string(), &ctx).await;
        assert_eq!(cache.on_cache_read("abc", &ctx).await.as_deref(), Some("{\"ops\":[]}"));
    }
}
