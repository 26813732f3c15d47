//! Scheduler for periodic re-crawls of the seed list
//!
//! This module handles:
//! - Triggering one crawl per seed on boot
//! - Re-triggering the seed list on a fixed interval
//! - Fire-and-forget dispatch: a slow crawl never delays the next tick

use crate::config::CrawlerConfig;
use crate::crawler::{CrawlReport, Crawler};
use crate::storage::PageStore;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Scheduler owns the seed list and decides when crawls start
///
/// Each trigger spawns an independent crawl invocation per seed. Overlapping
/// invocations may crawl the same pages; the store's atomic increments keep
/// the counters consistent.
pub struct Scheduler<S> {
    crawler: Crawler<S>,
    seeds: Vec<String>,
    max_depth: u32,
    interval: Option<Duration>,
}

impl<S> Scheduler<S>
where
    S: PageStore + Send + 'static,
{
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `crawler` - The crawler used for every triggered crawl
    /// * `config` - Supplies seeds, max depth and the re-crawl interval
    ///   (0 means boot only)
    pub fn new(crawler: Crawler<S>, config: &CrawlerConfig) -> Self {
        let interval = match config.recrawl_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            crawler,
            seeds: config.seeds.clone(),
            max_depth: config.max_depth,
            interval,
        }
    }

    pub fn seeds(&self) -> &[String] {
        &self.seeds
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Starts one crawl per seed without waiting for any of them
    ///
    /// # Returns
    ///
    /// The handles of the spawned crawls. Dropping them detaches the crawls.
    pub fn trigger(&self) -> Vec<JoinHandle<Option<CrawlReport>>> {
        tracing::info!("Triggering crawl of {} seeds", self.seeds.len());

        self.seeds
            .iter()
            .map(|seed| self.crawler.spawn(seed.clone(), self.max_depth))
            .collect()
    }

    /// Runs the schedule
    ///
    /// With no interval the seeds are crawled once and this returns when
    /// those crawls finish. Otherwise it triggers on boot and on every tick,
    /// and only returns when the surrounding task is cancelled.
    pub async fn run(self) {
        let Some(period) = self.interval else {
            for handle in self.trigger() {
                if let Err(e) = handle.await {
                    tracing::error!("Scheduled crawl aborted: {}", e);
                }
            }
            return;
        };

        tracing::info!("Re-crawling {} seeds every {:?}", self.seeds.len(), period);

        // The first tick completes immediately, which is the boot crawl
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            // Handles are dropped on purpose: crawls outlive the tick
            drop(self.trigger());
        }
    }
}
