use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::feed::FeedFetcher;
use crate::models::{CandidateItem, FeedSource};
use crate::services::{Deliver, DeliveryCache, DeliveryClient};

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub unique: usize,
    pub already_delivered: usize,
    pub attempted: usize,
    pub delivered: usize,
}

/// Collapse items sharing a link. A later item replaces an earlier one but
/// keeps the earlier one's position.
pub fn dedup_by_link(items: Vec<CandidateItem>) -> Vec<CandidateItem> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut out: Vec<CandidateItem> = Vec::with_capacity(items.len());
    for item in items {
        match index.get(&item.link) {
            Some(&pos) => out[pos] = item,
            None => {
                index.insert(item.link.clone(), out.len());
                out.push(item);
            }
        }
    }
    out
}

/// Drop items whose link was delivered in an earlier run.
pub fn filter_undelivered(items: Vec<CandidateItem>, cache: &DeliveryCache) -> Vec<CandidateItem> {
    items
        .into_iter()
        .filter(|item| !cache.contains(&item.link))
        .collect()
}

/// Deliver items one at a time. Successful links go into `cache`; failed
/// ones are left out so a later run may try them again.
pub async fn deliver_all<D: Deliver>(
    items: &[CandidateItem],
    deliverer: &D,
    cache: &mut DeliveryCache,
    delay: Duration,
    persist_each: bool,
) -> usize {
    let mut delivered = 0;
    for item in items {
        let result = deliverer.deliver(item).await;
        if result.success {
            delivered += 1;
            cache.add(item.link.clone());
            if persist_each {
                cache.persist();
            }
            tracing::info!("Posted {}", item.link);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        } else {
            tracing::warn!("Post failed {} -> {}", item.link, result.detail);
        }
    }
    delivered
}

/// One pull-and-deliver batch run.
pub struct Pipeline {
    fetcher: FeedFetcher,
    client: DeliveryClient,
    config: ClientConfig,
}

impl Pipeline {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let fetcher = FeedFetcher::new(timeout, config.max_items_per_feed)?;
        let client = DeliveryClient::new(config.api_url.clone(), config.api_key.clone(), timeout)?;
        Ok(Self {
            fetcher,
            client,
            config,
        })
    }

    pub async fn run(&self, sources: &[FeedSource]) -> RunSummary {
        let now = Utc::now();
        let mut cache = DeliveryCache::load(&self.config.cache_path);

        let fetched = self
            .fetcher
            .fetch_all(sources, now, self.config.fetch_concurrency)
            .await;
        let fetched_count = fetched.len();

        let unique = dedup_by_link(fetched);
        let unique_count = unique.len();

        let pending = filter_undelivered(unique, &cache);
        let already_delivered = unique_count - pending.len();

        let delivered = deliver_all(
            &pending,
            &self.client,
            &mut cache,
            Duration::from_millis(self.config.delivery_delay_ms),
            self.config.persist_each_delivery,
        )
        .await;

        cache.persist();
        tracing::info!("Done. Posted {}/{} new items.", delivered, pending.len());

        RunSummary {
            fetched: fetched_count,
            unique: unique_count,
            already_delivered,
            attempted: pending.len(),
            delivered,
        }
    }
}
