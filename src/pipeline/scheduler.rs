//! Batch scheduler for spreading load across sites
//!
//! This module handles:
//! - Interleaving URLs so consecutive requests hit different sites
//! - Cutting the interleaved sequence into fixed-size batches
//! - Handing batches out in order, exactly once

use super::BatchUrl;
use crate::config::{validate_batch_config, BatchConfig};
use crate::ConfigResult;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Interleaves items round robin across the groups produced by `key`
///
/// Groups are formed in first-seen order and then stably sorted by size,
/// largest first. The output takes the first item of every group in that
/// order, then the second item of every group that has one, and so on.
///
/// # Example
///
/// ```
/// use sift_scrape::pipeline::reorder_by;
///
/// let urls = vec!["a1", "a2", "a3", "b1", "b2", "c1"];
/// let ordered = reorder_by(urls, |u| u.chars().next());
/// assert_eq!(ordered, vec!["a1", "b1", "c1", "a2", "b2", "a3"]);
/// ```
pub fn reorder_by<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let total = items.len();
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<VecDeque<T>> = Vec::new();

    for item in items {
        let slot = *index.entry(key(&item)).or_insert_with(|| {
            groups.push(VecDeque::new());
            groups.len() - 1
        });
        groups[slot].push_back(item);
    }

    // sort_by is stable, so equal-sized groups keep first-seen order
    groups.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut ordered = Vec::with_capacity(total);
    while ordered.len() < total {
        for group in groups.iter_mut() {
            if let Some(item) = group.pop_front() {
                ordered.push(item);
            }
        }
    }
    ordered
}

/// Interleaves target URLs by site identifier
pub fn reorder(urls: Vec<BatchUrl>) -> Vec<BatchUrl> {
    reorder_by(urls, |u| u.site.clone())
}

/// Splits a sequence into contiguous chunks of `size`
///
/// The final chunk may be shorter; an empty sequence yields no chunks.
pub fn partition<T>(items: Vec<T>, size: NonZeroUsize) -> Vec<Vec<T>> {
    let size = size.get();
    let mut batches = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter().peekable();

    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(size).collect());
    }
    batches
}

/// Hands out interleaved batches of target URLs in order
#[derive(Debug)]
pub struct BatchScheduler {
    queue: VecDeque<Vec<BatchUrl>>,
    total_batches: usize,
    url_count: usize,
    popped: usize,
}

impl BatchScheduler {
    /// Creates a scheduler from parsed target URLs
    ///
    /// # Arguments
    ///
    /// * `urls` - Target URLs in input order
    /// * `config` - Batch configuration; `batch_size` must be at least 1
    ///
    /// # Returns
    ///
    /// * `Ok(BatchScheduler)` - Ready to hand out batches
    /// * `Err(ConfigError::Validation)` - The batch size is zero
    pub fn new(urls: Vec<BatchUrl>, config: &BatchConfig) -> ConfigResult<Self> {
        validate_batch_config(config)?;
        let size = NonZeroUsize::new(config.batch_size).unwrap_or(NonZeroUsize::MIN);

        let url_count = urls.len();
        let batches = partition(reorder(urls), size);
        let total_batches = batches.len();

        tracing::debug!(
            urls = url_count,
            batches = total_batches,
            batch_size = size.get(),
            "Scheduled batches"
        );

        Ok(Self {
            queue: VecDeque::from(batches),
            total_batches,
            url_count,
            popped: 0,
        })
    }

    /// Pops the next batch, or `None` once every batch has been handed out
    pub fn next_batch(&mut self) -> Option<Vec<BatchUrl>> {
        let batch = self.queue.pop_front()?;
        self.popped += 1;
        Some(batch)
    }

    /// Batches not yet handed out
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// 1-based number of the most recently popped batch (0 before the first pop)
    pub fn batch_number(&self) -> usize {
        self.popped
    }

    pub fn total_batches(&self) -> usize {
        self.total_batches
    }

    pub fn url_count(&self) -> usize {
        self.url_count
    }
}
