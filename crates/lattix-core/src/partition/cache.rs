//! Memory Budget Cache
//!
//! Byte-level memory accounting for loaded partitions, plus the
//! eviction-priority scoring used to pick which partition to unload first.
//!
//! Thread-safe via interior mutability using parking_lot::Mutex.

use crate::config::{EvictionPolicy, EvictionWeights};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Accounting entry for a loaded partition
#[derive(Debug, Clone)]
pub struct LoadedStats {
    /// Estimated memory footprint in bytes
    pub estimated_bytes: usize,
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    /// Number of cache hits (partition already loaded)
    pub hits: u64,
    /// Number of cache misses (partition needed loading)
    pub misses: u64,
    /// Number of partitions evicted
    pub evictions: u64,
    /// Total bytes evicted
    pub bytes_evicted: usize,
}

impl CacheMetrics {
    /// Get hit rate as a fraction (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Inner state (protected by Mutex)
struct CacheState {
    /// Current estimated memory usage in bytes
    current_memory_bytes: usize,

    /// LRU cache mapping partition ID to its stats.
    /// Most recently used partitions are at the "front".
    partition_lru: LruCache<String, LoadedStats>,

    /// Cache metrics
    metrics: CacheMetrics,
}

/// Memory budget cache with byte-level tracking.
///
/// Tracks loaded partitions and their memory footprint; candidate selection
/// for eviction is score-based (see [`eviction_score`]), with the LRU order
/// maintained here as the recency signal backing the `lru` policy.
///
/// All methods take `&self` and use interior mutability for concurrent access.
pub struct MemoryBudgetCache {
    /// Maximum memory budget in bytes (immutable after construction)
    max_memory_bytes: usize,

    /// Mutable state protected by Mutex
    state: Mutex<CacheState>,
}

impl MemoryBudgetCache {
    /// Create a new cache with the given memory budget
    pub fn new(max_memory_bytes: usize) -> Self {
        Self {
            max_memory_bytes,
            state: Mutex::new(CacheState {
                current_memory_bytes: 0,
                // Large cap - eviction is managed by bytes, not entry count
                partition_lru: LruCache::new(NonZeroUsize::new(10000).unwrap()),
                metrics: CacheMetrics::default(),
            }),
        }
    }

    /// Get the memory budget in bytes
    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_bytes
    }

    /// Get current memory usage in bytes
    pub fn current_memory_bytes(&self) -> usize {
        self.state.lock().current_memory_bytes
    }

    /// Get memory usage as a fraction of the budget (0.0 - 1.0)
    pub fn memory_usage_ratio(&self) -> f64 {
        if self.max_memory_bytes == 0 {
            0.0
        } else {
            self.state.lock().current_memory_bytes as f64 / self.max_memory_bytes as f64
        }
    }

    /// Get the number of partitions currently tracked
    pub fn loaded_count(&self) -> usize {
        self.state.lock().partition_lru.len()
    }

    /// Get a snapshot of cache metrics
    pub fn metrics(&self) -> CacheMetrics {
        self.state.lock().metrics.clone()
    }

    /// Reset cache metrics
    pub fn reset_metrics(&self) {
        self.state.lock().metrics = CacheMetrics::default();
    }

    /// Mark a partition as accessed (updates LRU order, records hit/miss).
    ///
    /// Returns true if the partition was tracked.
    pub fn touch(&self, partition_id: &str) -> bool {
        let mut state = self.state.lock();
        if state.partition_lru.get(partition_id).is_some() {
            state.metrics.hits += 1;
            true
        } else {
            state.metrics.misses += 1;
            false
        }
    }

    /// Record that a partition has been loaded
    pub fn record_loaded(&self, partition_id: String, estimated_bytes: usize) {
        let mut state = self.state.lock();
        state.current_memory_bytes += estimated_bytes;
        state
            .partition_lru
            .put(partition_id, LoadedStats { estimated_bytes });
    }

    /// Remove a partition from the accounting (tracks eviction metrics)
    pub fn record_evicted(&self, partition_id: &str) -> Option<LoadedStats> {
        let mut state = self.state.lock();
        if let Some(stats) = state.partition_lru.pop(partition_id) {
            state.current_memory_bytes = state
                .current_memory_bytes
                .saturating_sub(stats.estimated_bytes);
            state.metrics.evictions += 1;
            state.metrics.bytes_evicted += stats.estimated_bytes;
            Some(stats)
        } else {
            None
        }
    }

    /// Check if usage exceeds the pressure threshold
    pub fn is_over_pressure(&self, threshold: f64) -> bool {
        self.memory_usage_ratio() > threshold
    }

    /// Bytes that must be freed so usage drops to `target_fraction` of budget
    pub fn bytes_over_target(&self, target_fraction: f64) -> usize {
        let target = (self.max_memory_bytes as f64 * target_fraction) as usize;
        self.state
            .lock()
            .current_memory_bytes
            .saturating_sub(target)
    }

    /// Bytes that must be freed to accommodate an additional load
    pub fn bytes_needed_for(&self, additional_bytes: usize) -> usize {
        let current = self.state.lock().current_memory_bytes;
        (current + additional_bytes).saturating_sub(self.max_memory_bytes)
    }

    /// Clear all tracked partitions
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.partition_lru.clear();
        state.current_memory_bytes = 0;
    }
}

// ============================================================================
// Eviction Scoring
// ============================================================================

/// Per-partition inputs to the eviction score.
#[derive(Debug, Clone)]
pub struct EvictionSnapshot {
    pub partition_id: String,
    pub minutes_since_access: f64,
    pub access_count: u64,
    pub estimated_bytes: usize,
    pub priority: f64,
}

/// Compute the keep-score of a loaded partition under a policy.
///
/// Lower scores evict first. The hybrid policy is the weighted sum of a
/// recency term (minutes since last access, inverted), an access-frequency
/// term, and an inverse-size bonus so larger partitions are preferred for
/// eviction. The other policies are single-term degenerations.
pub fn eviction_score(
    policy: EvictionPolicy,
    weights: &EvictionWeights,
    snapshot: &EvictionSnapshot,
) -> f64 {
    let recency = 1.0 / (1.0 + snapshot.minutes_since_access);
    let frequency = (snapshot.access_count as f64).ln_1p();
    let size_mib = snapshot.estimated_bytes as f64 / (1024.0 * 1024.0);
    let inverse_size = 1.0 / (1.0 + size_mib);

    match policy {
        EvictionPolicy::Lru => recency,
        EvictionPolicy::Lfu => frequency,
        EvictionPolicy::Priority => snapshot.priority,
        EvictionPolicy::SizeBased => inverse_size,
        EvictionPolicy::Hybrid => {
            weights.recency * recency + weights.frequency * frequency + weights.size * inverse_size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &str, minutes: f64, accesses: u64, bytes: usize) -> EvictionSnapshot {
        EvictionSnapshot {
            partition_id: id.to_string(),
            minutes_since_access: minutes,
            access_count: accesses,
            estimated_bytes: bytes,
            priority: 1.0,
        }
    }

    #[test]
    fn test_accounting_round_trip() {
        let cache = MemoryBudgetCache::new(1_000_000);
        cache.record_loaded("p1".to_string(), 400_000);
        cache.record_loaded("p2".to_string(), 300_000);

        assert_eq!(cache.current_memory_bytes(), 700_000);
        assert_eq!(cache.loaded_count(), 2);
        assert!((cache.memory_usage_ratio() - 0.7).abs() < 1e-9);

        let evicted = cache.record_evicted("p1").unwrap();
        assert_eq!(evicted.estimated_bytes, 400_000);
        assert_eq!(cache.current_memory_bytes(), 300_000);
        assert_eq!(cache.metrics().evictions, 1);
        assert_eq!(cache.metrics().bytes_evicted, 400_000);
    }

    #[test]
    fn test_pressure_and_targets() {
        let cache = MemoryBudgetCache::new(1_000_000);
        cache.record_loaded("p1".to_string(), 900_000);

        assert!(cache.is_over_pressure(0.8));
        assert!(!cache.is_over_pressure(0.95));

        // Target 60% of 1MB = 600KB, so 300KB over
        assert_eq!(cache.bytes_over_target(0.6), 300_000);

        // Loading another 200KB would exceed the budget by 100KB
        assert_eq!(cache.bytes_needed_for(200_000), 100_000);
        assert_eq!(cache.bytes_needed_for(50_000), 0);
    }

    #[test]
    fn test_touch_records_hits_and_misses() {
        let cache = MemoryBudgetCache::new(1_000_000);
        cache.record_loaded("p1".to_string(), 1000);

        assert!(cache.touch("p1"));
        assert!(cache.touch("p1"));
        assert!(!cache.touch("missing"));

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 2);
        assert_eq!(metrics.misses, 1);
        assert!((metrics.hit_rate() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_hybrid_prefers_evicting_cold_large_partitions() {
        let weights = EvictionWeights::default();
        let hot_small = snapshot("hot", 0.1, 50, 100_000);
        let cold_large = snapshot("cold", 120.0, 1, 50_000_000);

        let hot_score = eviction_score(EvictionPolicy::Hybrid, &weights, &hot_small);
        let cold_score = eviction_score(EvictionPolicy::Hybrid, &weights, &cold_large);
        assert!(cold_score < hot_score);
    }

    #[test]
    fn test_single_term_policies() {
        let weights = EvictionWeights::default();

        let old = snapshot("old", 60.0, 10, 1000);
        let fresh = snapshot("fresh", 0.5, 10, 1000);
        assert!(
            eviction_score(EvictionPolicy::Lru, &weights, &old)
                < eviction_score(EvictionPolicy::Lru, &weights, &fresh)
        );

        let rare = snapshot("rare", 1.0, 1, 1000);
        let busy = snapshot("busy", 1.0, 100, 1000);
        assert!(
            eviction_score(EvictionPolicy::Lfu, &weights, &rare)
                < eviction_score(EvictionPolicy::Lfu, &weights, &busy)
        );

        let big = snapshot("big", 1.0, 1, 100_000_000);
        let small = snapshot("small", 1.0, 1, 1000);
        assert!(
            eviction_score(EvictionPolicy::SizeBased, &weights, &big)
                < eviction_score(EvictionPolicy::SizeBased, &weights, &small)
        );
    }
}
