//! Partitioning and memory-manager configuration.
//!
//! All knobs default to the values the engine ships with; callers override
//! only what they need via struct update syntax or the builder helpers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default memory budget (512 MB)
pub const DEFAULT_MEMORY_BUDGET: usize = 512 * 1024 * 1024;

/// Default memory pressure threshold (load triggers eviction above this ratio)
pub const DEFAULT_PRESSURE_THRESHOLD: f64 = 0.8;

/// Default eviction target (evict until usage drops below this ratio)
pub const DEFAULT_EVICTION_TARGET: f64 = 0.6;

/// Default resident fraction used by the memory-reduction statistic
pub const DEFAULT_RESIDENT_FRACTION: f64 = 0.2;

// ============================================================================
// Partitioning
// ============================================================================

/// Strategy used to split the graph into partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStrategy {
    /// Group nodes by module path
    Module,
    /// Group nodes by parent directory
    Directory,
    /// Group nodes by file extension
    FileType,
    /// Fixed-size buckets bounded by `max_nodes_per_partition`
    SizeBased,
    /// Connected clusters over the (undirected) edge graph, size-bounded
    DependencyCluster,
    /// Group nodes by modification-age band
    Temporal,
}

impl PartitionStrategy {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionStrategy::Module => "module",
            PartitionStrategy::Directory => "directory",
            PartitionStrategy::FileType => "file_type",
            PartitionStrategy::SizeBased => "size_based",
            PartitionStrategy::DependencyCluster => "dependency_cluster",
            PartitionStrategy::Temporal => "temporal",
        }
    }
}

/// Criteria bundle driving default strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitioningCriteria {
    /// Prefer grouping by module path
    pub group_by_module: bool,
    /// Prefer grouping by parent directory
    pub group_by_directory: bool,
    /// Prefer grouping by file extension
    pub group_by_file_type: bool,
    /// Prefer dependency clusters over plain grouping
    pub respect_dependencies: bool,
    /// Hint to the partitioner to keep coupled nodes together
    pub minimize_cross_refs: bool,
}

impl Default for PartitioningCriteria {
    fn default() -> Self {
        Self {
            group_by_module: true,
            group_by_directory: false,
            group_by_file_type: false,
            respect_dependencies: false,
            minimize_cross_refs: true,
        }
    }
}

/// Configuration for the graph partitioner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Maximum nodes per partition (size-based and cluster strategies)
    pub max_nodes_per_partition: usize,
    /// Maximum edges per partition (advisory; reported, not enforced)
    pub max_edges_per_partition: usize,
    /// Maximum estimated bytes per partition (advisory; reported, not enforced)
    pub max_memory_per_partition: usize,
    /// Criteria driving default strategy selection
    pub criteria: PartitioningCriteria,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            max_nodes_per_partition: 1000,
            max_edges_per_partition: 5000,
            max_memory_per_partition: 64 * 1024 * 1024,
            criteria: PartitioningCriteria::default(),
        }
    }
}

impl PartitionConfig {
    /// Resolve the partition strategy implied by the criteria booleans.
    ///
    /// Dependency clusters win when requested, then module, directory and
    /// file-type grouping in that order; size-based is the fallback.
    pub fn strategy(&self) -> PartitionStrategy {
        if self.criteria.respect_dependencies {
            PartitionStrategy::DependencyCluster
        } else if self.criteria.group_by_module {
            PartitionStrategy::Module
        } else if self.criteria.group_by_directory {
            PartitionStrategy::Directory
        } else if self.criteria.group_by_file_type {
            PartitionStrategy::FileType
        } else {
            PartitionStrategy::SizeBased
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Eviction policy for loaded partitions.
///
/// Only `Hybrid` carries the full weighted formula; the others are
/// single-term degenerations of the same scoring seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Least recently used first
    Lru,
    /// Least frequently used first
    Lfu,
    /// Lowest caller-assigned priority first
    Priority,
    /// Largest partitions first
    SizeBased,
    /// Weighted recency + frequency + inverse size
    Hybrid,
}

/// Weights for the hybrid eviction score.
///
/// Heuristic constants preserved from the source system as configurable
/// defaults rather than hard invariants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionWeights {
    /// Weight of the recency term (minutes since last access, inverted)
    pub recency: f64,
    /// Weight of the access-frequency term
    pub frequency: f64,
    /// Weight of the inverse-size bonus (large partitions evict first)
    pub size: f64,
}

impl Default for EvictionWeights {
    fn default() -> Self {
        Self {
            recency: 0.5,
            frequency: 0.3,
            size: 0.2,
        }
    }
}

/// Configuration for the memory manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum memory budget in bytes
    pub max_memory_usage: usize,
    /// Eviction policy
    pub eviction_policy: EvictionPolicy,
    /// Usage ratio above which a load triggers eviction first (0–1)
    pub memory_pressure_threshold: f64,
    /// Eviction stops once usage drops below this fraction of the budget
    pub eviction_target_fraction: f64,
    /// Minimum number of partitions kept resident (avoid thrashing)
    pub min_loaded_partitions: usize,
    /// Resident fraction assumed by the memory-reduction statistic
    pub resident_fraction_estimate: f64,
    /// Hybrid scoring weights
    pub eviction_weights: EvictionWeights,
    /// Optional simulated load latency per MiB of estimated partition size
    #[serde(skip)]
    pub io_latency_per_mib: Option<Duration>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memory_usage: DEFAULT_MEMORY_BUDGET,
            eviction_policy: EvictionPolicy::Hybrid,
            memory_pressure_threshold: DEFAULT_PRESSURE_THRESHOLD,
            eviction_target_fraction: DEFAULT_EVICTION_TARGET,
            min_loaded_partitions: 2,
            resident_fraction_estimate: DEFAULT_RESIDENT_FRACTION,
            eviction_weights: EvictionWeights::default(),
            io_latency_per_mib: None,
        }
    }
}

impl MemoryConfig {
    /// Create a config with a custom budget, keeping the remaining defaults
    pub fn with_budget(max_memory_usage: usize) -> Self {
        Self {
            max_memory_usage,
            ..Self::default()
        }
    }
}
