//! Partition Manager
//!
//! Orchestrates the partition lifecycle: builds partition sets via the
//! partitioner, serves transparent node access (loading partitions on
//! demand), and evicts under memory pressure through the pluggable
//! partition store.
//!
//! State machine per partition: `Unloaded → Loading → Loaded → (Evicting)
//! → Unloaded`. Distinct partitions may load concurrently; a given
//! partition's transitions are serialized through a per-partition lock with
//! double-checked state so a second concurrent caller awaits the in-flight
//! load instead of re-triggering it. A failed load reverts the partition to
//! `Unloaded`; a failed eviction keeps the in-memory contents (nothing is
//! cleared until the persisted copy is confirmed written).

use crate::config::{MemoryConfig, PartitionConfig, PartitionStrategy};
use crate::graph::{CodePattern, EdgeData, GraphEdge, GraphNode, KnowledgeGraph, ProjectContext};
use crate::partition::cache::{
    eviction_score, CacheMetrics, EvictionSnapshot, MemoryBudgetCache,
};
use crate::partition::cross_refs::{CrossPartitionReference, CrossRefIndex};
use crate::partition::partition::{GraphPartition, LoadState, PartitionError};
use crate::partition::partitioner::{
    GraphPartitioner, PartitionerError, PartitioningStats,
};
use crate::store::{PartitionStore, StoreError};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during partition manager operations
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Partition error: {0}")]
    Partition(#[from] PartitionError),

    #[error("Partitioner error: {0}")]
    Partitioner(#[from] PartitionerError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Partition not found: {0}")]
    PartitionNotFound(String),

    #[error("load failed for partition '{partition_id}': no stored copy available")]
    MissingStoredCopy { partition_id: String },
}

/// Point-in-time memory accounting exposed to callers.
#[derive(Debug, Clone)]
pub struct MemoryStats {
    /// Current estimated usage in bytes
    pub current: usize,
    /// Memory budget in bytes
    pub max: usize,
    /// Usage as a fraction of the budget (0.0 - 1.0)
    pub usage: f64,
    /// Number of currently loaded partitions
    pub loaded_partitions: usize,
    /// Total number of partitions in the table
    pub total_partitions: usize,
}

/// The partition manager.
///
/// Explicitly constructed and passed by reference; there is no global
/// instance. Shared mutable state (partition table, cross-reference index,
/// loaded-graph view) is owned exclusively by the manager behind interior
/// mutability, so callers never hold references into the containers across
/// a load/evict boundary.
pub struct PartitionManager {
    /// Loaded-node traversal view (all currently loaded partitions)
    graph: RwLock<KnowledgeGraph>,

    /// The partition table
    partitions: RwLock<HashMap<String, GraphPartition>>,

    /// Node ID -> partition ID (survives eviction; rebuilt on repartition)
    node_to_partition: DashMap<String, String>,

    /// Per-partition locks serializing load/evict transitions
    transition_locks: DashMap<String, Arc<parking_lot::Mutex<()>>>,

    /// Cross-partition edge index (always resident)
    cross_refs: RwLock<CrossRefIndex>,

    /// Byte-level memory accounting
    cache: MemoryBudgetCache,

    /// Serialized-partition storage
    store: Arc<dyn PartitionStore>,

    /// Partitioning configuration
    partition_config: PartitionConfig,

    /// Memory management configuration
    memory_config: MemoryConfig,
}

impl PartitionManager {
    /// Create a manager over a partition store with the given configuration.
    pub fn new(
        store: Arc<dyn PartitionStore>,
        partition_config: PartitionConfig,
        memory_config: MemoryConfig,
    ) -> Self {
        let cache = MemoryBudgetCache::new(memory_config.max_memory_usage);
        Self {
            graph: RwLock::new(KnowledgeGraph::new()),
            partitions: RwLock::new(HashMap::new()),
            node_to_partition: DashMap::new(),
            transition_locks: DashMap::new(),
            cross_refs: RwLock::new(CrossRefIndex::new()),
            cache,
            store,
            partition_config,
            memory_config,
        }
    }

    /// Create a manager with default configuration.
    pub fn with_store(store: Arc<dyn PartitionStore>) -> Self {
        Self::new(store, PartitionConfig::default(), MemoryConfig::default())
    }

    // ========================================================================
    // Partitioning
    // ========================================================================

    /// Partition a full node/edge/pattern set using the strategy implied by
    /// the configured criteria.
    pub fn partition_graph(
        &self,
        nodes: &[GraphNode],
        edges: &[GraphEdge],
        patterns: &[CodePattern],
        context: &ProjectContext,
    ) -> Result<PartitioningStats, ManagerError> {
        self.partition_graph_with_strategy(
            nodes,
            edges,
            patterns,
            context,
            self.partition_config.strategy(),
        )
    }

    /// Partition a full node/edge/pattern set with an explicit strategy.
    ///
    /// The new partition set is computed completely before anything is
    /// installed; on error the previous table is left untouched.
    pub fn partition_graph_with_strategy(
        &self,
        nodes: &[GraphNode],
        edges: &[GraphEdge],
        patterns: &[CodePattern],
        context: &ProjectContext,
        strategy: PartitionStrategy,
    ) -> Result<PartitioningStats, ManagerError> {
        let set = GraphPartitioner::partition(
            nodes,
            edges,
            patterns,
            context,
            &self.partition_config,
            strategy,
            self.memory_config.resident_fraction_estimate,
        )?;

        // Full set computed; install atomically from the caller's view.
        let stats = set.stats.clone();

        {
            let mut graph = self.graph.write();
            let mut partitions = self.partitions.write();
            let mut cross_refs = self.cross_refs.write();

            *graph = KnowledgeGraph::new();
            self.node_to_partition.clear();
            self.transition_locks.clear();
            self.cache.clear();

            for (partition_id, partition) in &set.partitions {
                for node in partition.nodes.values() {
                    self.node_to_partition
                        .insert(node.id.clone(), partition_id.clone());
                    graph.add_node(node.clone());
                }
                self.cache
                    .record_loaded(partition_id.clone(), partition.metadata.estimated_size);
            }
            // Edges after all nodes so cross-partition endpoints resolve
            for partition in set.partitions.values() {
                for edge in partition.edges.values() {
                    graph.add_edge(&edge.source, &edge.target, EdgeData::from(edge));
                }
            }

            *partitions = set.partitions;
            *cross_refs = set.cross_refs;
        }

        info!(
            partitions = stats.partition_count,
            nodes = stats.total_nodes,
            "installed new partition table"
        );

        Ok(stats)
    }

    // ========================================================================
    // Partition Loading
    // ========================================================================

    /// Check if a partition is currently loaded
    pub fn is_partition_loaded(&self, partition_id: &str) -> bool {
        self.partitions
            .read()
            .get(partition_id)
            .map(|p| p.is_loaded())
            .unwrap_or(false)
    }

    /// Get all partition IDs in the table
    pub fn partition_ids(&self) -> Vec<String> {
        self.partitions.read().keys().cloned().collect()
    }

    /// Get the IDs of currently loaded partitions
    pub fn loaded_partitions(&self) -> Vec<String> {
        self.partitions
            .read()
            .values()
            .filter(|p| p.is_loaded())
            .map(|p| p.id.clone())
            .collect()
    }

    /// Get the partition ID a node belongs to (if known)
    pub fn partition_for_node(&self, node_id: &str) -> Option<String> {
        self.node_to_partition.get(node_id).map(|r| r.clone())
    }

    /// Load a partition from the store into memory.
    ///
    /// No-op (with access-tracking refresh) if already loaded. Under memory
    /// pressure, eviction runs before the load. Uses double-checked locking
    /// so concurrent loads of the same partition collapse into one.
    pub fn load_partition(&self, partition_id: &str) -> Result<(), ManagerError> {
        // First check without the transition lock
        if self.touch_if_loaded(partition_id) {
            return Ok(());
        }

        let lock = self.transition_lock(partition_id);
        let _guard = lock.lock();

        // Second check: another caller may have finished the load
        if self.touch_if_loaded(partition_id) {
            return Ok(());
        }
        self.cache.touch(partition_id); // records the miss

        // Evict before loading when over the pressure threshold
        if self
            .cache
            .is_over_pressure(self.memory_config.memory_pressure_threshold)
        {
            if let Err(e) = self.evict_partitions() {
                warn!(partition_id, error = %e, "pre-load eviction failed");
            }
        }

        let estimated_size = {
            let mut partitions = self.partitions.write();
            let partition = partitions
                .get_mut(partition_id)
                .ok_or_else(|| ManagerError::PartitionNotFound(partition_id.to_string()))?;
            partition.load_state = LoadState::Loading;
            partition.metadata.estimated_size
        };

        self.simulate_io_latency(estimated_size);

        let loaded = self
            .store
            .retrieve(partition_id)
            .map_err(ManagerError::from)
            .and_then(|bytes| {
                bytes.ok_or_else(|| ManagerError::MissingStoredCopy {
                    partition_id: partition_id.to_string(),
                })
            });

        let bytes = match loaded {
            Ok(bytes) => bytes,
            Err(e) => {
                // Failed loads revert to Unloaded rather than sticking in Loading
                if let Some(p) = self.partitions.write().get_mut(partition_id) {
                    p.load_state = LoadState::Unloaded;
                }
                warn!(partition_id, error = %e, "partition load failed");
                return Err(e);
            }
        };

        let mut partitions = self.partitions.write();
        let partition = partitions
            .get_mut(partition_id)
            .ok_or_else(|| ManagerError::PartitionNotFound(partition_id.to_string()))?;

        if let Err(e) = partition.apply_payload_bytes(&bytes) {
            partition.load_state = LoadState::Unloaded;
            return Err(e.into());
        }
        partition.load_state = LoadState::Loaded;
        partition.touch();

        // Populate the traversal view
        {
            let mut graph = self.graph.write();
            for node in partition.nodes.values() {
                graph.add_node(node.clone());
            }
            for edge in partition.edges.values() {
                graph.add_edge(&edge.source, &edge.target, EdgeData::from(edge));
            }
        }

        self.cache
            .record_loaded(partition_id.to_string(), partition.metadata.estimated_size);

        debug!(
            partition_id,
            nodes = partition.nodes.len(),
            "loaded partition"
        );
        Ok(())
    }

    /// Touch a partition if loaded; returns whether it was.
    fn touch_if_loaded(&self, partition_id: &str) -> bool {
        let mut partitions = self.partitions.write();
        match partitions.get_mut(partition_id) {
            Some(p) if p.is_loaded() => {
                p.touch();
                self.cache.touch(partition_id);
                true
            }
            _ => false,
        }
    }

    fn transition_lock(&self, partition_id: &str) -> Arc<parking_lot::Mutex<()>> {
        self.transition_locks
            .entry(partition_id.to_string())
            .or_insert_with(|| Arc::new(parking_lot::Mutex::new(())))
            .clone()
    }

    fn simulate_io_latency(&self, estimated_size: usize) {
        if let Some(per_mib) = self.memory_config.io_latency_per_mib {
            let mib = estimated_size as f64 / (1024.0 * 1024.0);
            std::thread::sleep(per_mib.mul_f64(mib.max(0.01)));
        }
    }

    // ========================================================================
    // Eviction
    // ========================================================================

    /// Evict lowest-scoring loaded partitions until usage drops to the
    /// configured target fraction of the budget.
    ///
    /// A partition's in-memory contents are cleared only after its
    /// serialized copy is confirmed written to the store; a store failure
    /// keeps the partition loaded and moves on to the next candidate.
    ///
    /// Returns the IDs of the partitions evicted.
    pub fn evict_partitions(&self) -> Result<Vec<String>, ManagerError> {
        let mut to_free = self
            .cache
            .bytes_over_target(self.memory_config.eviction_target_fraction);
        if to_free == 0 {
            return Ok(Vec::new());
        }

        // Score loaded partitions; lowest keep-score evicts first
        let mut scored: Vec<(f64, EvictionSnapshot)> = {
            let partitions = self.partitions.read();
            partitions
                .values()
                .filter(|p| p.is_loaded())
                .map(|p| {
                    let snapshot = EvictionSnapshot {
                        partition_id: p.id.clone(),
                        minutes_since_access: p.metadata.minutes_since_access(),
                        access_count: p.metadata.access_count,
                        estimated_bytes: p.metadata.estimated_size,
                        priority: p.metadata.priority,
                    };
                    (
                        eviction_score(
                            self.memory_config.eviction_policy,
                            &self.memory_config.eviction_weights,
                            &snapshot,
                        ),
                        snapshot,
                    )
                })
                .collect()
        };
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut loaded_remaining = scored.len();
        let mut evicted = Vec::new();

        for (_, snapshot) in scored {
            if to_free == 0 {
                break;
            }
            if loaded_remaining <= self.memory_config.min_loaded_partitions {
                debug!("eviction stopped at the minimum-resident floor");
                break;
            }

            match self.evict_one(&snapshot.partition_id) {
                Ok(freed) => {
                    to_free = to_free.saturating_sub(freed);
                    loaded_remaining -= 1;
                    evicted.push(snapshot.partition_id);
                }
                Err(e) => {
                    warn!(
                        partition_id = snapshot.partition_id.as_str(),
                        error = %e,
                        "eviction failed; partition kept in memory"
                    );
                }
            }
        }

        if !evicted.is_empty() {
            info!(count = evicted.len(), "evicted partitions");
        }
        Ok(evicted)
    }

    /// Evict a single partition; returns the bytes freed.
    fn evict_one(&self, partition_id: &str) -> Result<usize, ManagerError> {
        let lock = self.transition_lock(partition_id);
        let _guard = lock.lock();

        // Serialize while contents are still valid
        let (bytes, node_ids) = {
            let mut partitions = self.partitions.write();
            let partition = partitions
                .get_mut(partition_id)
                .ok_or_else(|| ManagerError::PartitionNotFound(partition_id.to_string()))?;
            if !partition.is_loaded() {
                return Ok(0);
            }
            partition.load_state = LoadState::Evicting;
            let bytes = match partition.to_payload_bytes() {
                Ok(bytes) => bytes,
                Err(e) => {
                    partition.load_state = LoadState::Loaded;
                    return Err(e.into());
                }
            };
            let node_ids: Vec<String> = partition.nodes.keys().cloned().collect();
            (bytes, node_ids)
        };

        // Persist first; only a confirmed write may clear memory
        if let Err(e) = self.store.store(partition_id, bytes) {
            if let Some(p) = self.partitions.write().get_mut(partition_id) {
                p.load_state = LoadState::Loaded;
            }
            return Err(e.into());
        }

        {
            let mut graph = self.graph.write();
            for node_id in &node_ids {
                graph.remove_node(node_id);
            }
        }

        let freed = {
            let mut partitions = self.partitions.write();
            let partition = partitions
                .get_mut(partition_id)
                .ok_or_else(|| ManagerError::PartitionNotFound(partition_id.to_string()))?;
            partition.clear_containers();
            partition.load_state = LoadState::Unloaded;
            partition.metadata.estimated_size
        };

        self.cache.record_evicted(partition_id);
        debug!(partition_id, freed, "evicted partition");
        Ok(freed)
    }

    /// Remove a partition entirely: its nodes leave the traversal view, its
    /// cross-references are purged from both sides, and its stored copy is
    /// deleted.
    pub fn remove_partition(&self, partition_id: &str) -> Result<(), ManagerError> {
        let lock = self.transition_lock(partition_id);
        let _guard = lock.lock();

        let partition = self
            .partitions
            .write()
            .remove(partition_id)
            .ok_or_else(|| ManagerError::PartitionNotFound(partition_id.to_string()))?;

        {
            let mut graph = self.graph.write();
            for node_id in partition.nodes.keys() {
                graph.remove_node(node_id);
            }
        }
        self.node_to_partition
            .retain(|_, pid| pid.as_str() != partition_id);
        self.cross_refs.write().remove_by_partition(partition_id);
        self.cache.record_evicted(partition_id);
        self.store.delete(partition_id)?;
        Ok(())
    }

    // ========================================================================
    // Node Access (transparent loading)
    // ========================================================================

    /// Get a node by ID, loading its partition if necessary.
    ///
    /// Returns an owned clone so no reference into manager-owned containers
    /// escapes across a load/evict boundary. Unknown ids return None.
    pub fn get_node(&self, node_id: &str) -> Result<Option<GraphNode>, ManagerError> {
        // Fast path: already in the loaded view
        let resident = {
            let graph = self.graph.read();
            graph.get_node(node_id).cloned()
        };
        if let Some(node) = resident {
            // Access tracking still applies on the fast path
            if let Some(partition_id) = self.partition_for_node(node_id) {
                self.touch_if_loaded(&partition_id);
            }
            return Ok(Some(node));
        }

        let Some(partition_id) = self.partition_for_node(node_id) else {
            return Ok(None);
        };
        self.load_partition(&partition_id)?;

        let graph = self.graph.read();
        Ok(graph.get_node(node_id).cloned())
    }

    /// Get all nodes of a partition, loading it if necessary.
    pub fn get_partition_nodes(
        &self,
        partition_id: &str,
    ) -> Result<Vec<GraphNode>, ManagerError> {
        self.load_partition(partition_id)?;
        let partitions = self.partitions.read();
        let partition = partitions
            .get(partition_id)
            .ok_or_else(|| ManagerError::PartitionNotFound(partition_id.to_string()))?;
        Ok(partition.nodes.values().cloned().collect())
    }

    /// Get outgoing edges of a node as (target node, edge type, weight),
    /// merging intra-partition edges with cross-partition references and
    /// transparently loading the partitions involved.
    pub fn get_outgoing_edges(
        &self,
        node_id: &str,
    ) -> Result<Vec<(GraphNode, EdgeData)>, ManagerError> {
        if let Some(partition_id) = self.partition_for_node(node_id) {
            self.load_partition(&partition_id)?;
        }

        let mut edges: Vec<(GraphNode, EdgeData)> = {
            let graph = self.graph.read();
            graph
                .outgoing_edges(node_id)
                .map(|(n, e)| (n.clone(), e.clone()))
                .collect()
        };

        // Clone refs first; loading the far partition takes write locks
        let cross: Vec<CrossPartitionReference> = self
            .cross_refs
            .read()
            .get_by_source(node_id)
            .cloned()
            .unwrap_or_default();

        for cross_ref in cross {
            self.load_partition(&cross_ref.target_partition)?;
            let graph = self.graph.read();
            if let Some(target) = graph.get_node(&cross_ref.target_node_id) {
                edges.push((
                    target.clone(),
                    EdgeData {
                        edge_type: cross_ref.edge_type,
                        weight: cross_ref.weight,
                        ref_line: None,
                    },
                ));
            }
        }

        Ok(edges)
    }

    /// Get incoming edges of a node; the mirror of [`get_outgoing_edges`].
    pub fn get_incoming_edges(
        &self,
        node_id: &str,
    ) -> Result<Vec<(GraphNode, EdgeData)>, ManagerError> {
        if let Some(partition_id) = self.partition_for_node(node_id) {
            self.load_partition(&partition_id)?;
        }

        let mut edges: Vec<(GraphNode, EdgeData)> = {
            let graph = self.graph.read();
            graph
                .incoming_edges(node_id)
                .map(|(n, e)| (n.clone(), e.clone()))
                .collect()
        };

        let cross: Vec<CrossPartitionReference> = self
            .cross_refs
            .read()
            .get_by_target(node_id)
            .cloned()
            .unwrap_or_default();

        for cross_ref in cross {
            self.load_partition(&cross_ref.source_partition)?;
            let graph = self.graph.read();
            if let Some(source) = graph.get_node(&cross_ref.source_node_id) {
                edges.push((
                    source.clone(),
                    EdgeData {
                        edge_type: cross_ref.edge_type,
                        weight: cross_ref.weight,
                        ref_line: None,
                    },
                ));
            }
        }

        Ok(edges)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Get current memory accounting.
    pub fn memory_stats(&self) -> MemoryStats {
        let partitions = self.partitions.read();
        MemoryStats {
            current: self.cache.current_memory_bytes(),
            max: self.cache.max_memory_bytes(),
            usage: self.cache.memory_usage_ratio(),
            loaded_partitions: partitions.values().filter(|p| p.is_loaded()).count(),
            total_partitions: partitions.len(),
        }
    }

    /// Get a snapshot of cache metrics (hit/miss rates, evictions)
    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// Reset cache metrics
    pub fn reset_cache_metrics(&self) {
        self.cache.reset_metrics();
    }

    /// Number of cross-partition references in the index
    pub fn cross_ref_count(&self) -> usize {
        self.cross_refs.read().len()
    }

    /// Cross-references touching a partition (both directions)
    pub fn cross_refs_for_partition(
        &self,
        partition_id: &str,
    ) -> Vec<CrossPartitionReference> {
        self.cross_refs
            .read()
            .get_by_partition(partition_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeType, NodeKind};
    use crate::store::MemoryStore;

    fn test_nodes(count: usize, files_per_dir: usize) -> Vec<GraphNode> {
        (0..count)
            .map(|i| {
                let dir = i / files_per_dir;
                let file = format!("src/d{}/f{}.rs", dir, i);
                GraphNode::new(format!("{}:fn{}", file, i), format!("fn{}", i), NodeKind::Callable)
                    .with_location(file, 1, 10)
            })
            .collect()
    }

    fn manager_with(memory_config: MemoryConfig) -> PartitionManager {
        PartitionManager::new(
            Arc::new(MemoryStore::new()),
            PartitionConfig::default(),
            memory_config,
        )
    }

    #[test]
    fn test_partition_and_get_node() {
        let manager = manager_with(MemoryConfig::default());
        let nodes = test_nodes(20, 5);

        let stats = manager
            .partition_graph_with_strategy(
                &nodes,
                &[],
                &[],
                &ProjectContext::default(),
                PartitionStrategy::Directory,
            )
            .unwrap();
        assert_eq!(stats.partition_count, 4);
        assert_eq!(stats.total_nodes, 20);

        let node = manager.get_node(&nodes[0].id).unwrap().unwrap();
        assert_eq!(node.id, nodes[0].id);
        assert_eq!(manager.get_node("missing").unwrap(), None);
    }

    #[test]
    fn test_evict_then_transparent_reload() {
        // Tiny budget: everything must evict down to the floor
        let config = MemoryConfig {
            max_memory_usage: 1,
            eviction_target_fraction: 0.0,
            min_loaded_partitions: 0,
            ..MemoryConfig::default()
        };
        let manager = manager_with(config);
        let nodes = test_nodes(20, 5);

        manager
            .partition_graph_with_strategy(
                &nodes,
                &[],
                &[],
                &ProjectContext::default(),
                PartitionStrategy::Directory,
            )
            .unwrap();

        let evicted = manager.evict_partitions().unwrap();
        assert_eq!(evicted.len(), 4);
        assert_eq!(manager.memory_stats().loaded_partitions, 0);
        assert_eq!(manager.memory_stats().current, 0);

        // Transparent reload through get_node
        let node = manager.get_node(&nodes[0].id).unwrap().unwrap();
        assert_eq!(node.id, nodes[0].id);
        assert_eq!(manager.memory_stats().loaded_partitions, 1);
        assert!(manager.cache_metrics().evictions >= 4);
    }

    #[test]
    fn test_eviction_respects_min_loaded_floor() {
        let config = MemoryConfig {
            max_memory_usage: 1,
            eviction_target_fraction: 0.0,
            min_loaded_partitions: 2,
            ..MemoryConfig::default()
        };
        let manager = manager_with(config);
        let nodes = test_nodes(20, 5);

        manager
            .partition_graph_with_strategy(
                &nodes,
                &[],
                &[],
                &ProjectContext::default(),
                PartitionStrategy::Directory,
            )
            .unwrap();

        manager.evict_partitions().unwrap();
        assert_eq!(manager.memory_stats().loaded_partitions, 2);
    }

    #[test]
    fn test_get_partition_nodes_loads() {
        let config = MemoryConfig {
            max_memory_usage: 1,
            eviction_target_fraction: 0.0,
            min_loaded_partitions: 0,
            ..MemoryConfig::default()
        };
        let manager = manager_with(config);
        let nodes = test_nodes(10, 5);

        manager
            .partition_graph_with_strategy(
                &nodes,
                &[],
                &[],
                &ProjectContext::default(),
                PartitionStrategy::Directory,
            )
            .unwrap();
        manager.evict_partitions().unwrap();

        let pid = manager.partition_for_node(&nodes[0].id).unwrap();
        let partition_nodes = manager.get_partition_nodes(&pid).unwrap();
        assert_eq!(partition_nodes.len(), 5);
        assert!(manager.is_partition_loaded(&pid));
    }

    #[test]
    fn test_unknown_partition_is_not_found() {
        let manager = manager_with(MemoryConfig::default());
        let err = manager.load_partition("nope").unwrap_err();
        assert!(matches!(err, ManagerError::PartitionNotFound(_)));
    }

    #[test]
    fn test_cross_partition_edge_traversal() {
        let manager = manager_with(MemoryConfig::default());
        let mut nodes = test_nodes(10, 5);
        nodes.push(
            GraphNode::new("src/d0/f0.rs:caller", "caller", NodeKind::Callable)
                .with_location("src/d0/f0.rs", 20, 25),
        );
        let edges = vec![GraphEdge::new(
            "src/d0/f0.rs:caller",
            "src/d1/f5.rs:fn5",
            EdgeType::Uses,
        )];

        manager
            .partition_graph_with_strategy(
                &nodes,
                &edges,
                &[],
                &ProjectContext::default(),
                PartitionStrategy::Directory,
            )
            .unwrap();
        assert_eq!(manager.cross_ref_count(), 1);

        let out = manager.get_outgoing_edges("src/d0/f0.rs:caller").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0.id, "src/d1/f5.rs:fn5");

        let incoming = manager.get_incoming_edges("src/d1/f5.rs:fn5").unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].0.id, "src/d0/f0.rs:caller");
    }

    #[test]
    fn test_remove_partition_purges_cross_refs() {
        let manager = manager_with(MemoryConfig::default());
        let nodes = test_nodes(10, 5);
        let edges = vec![GraphEdge::new(
            "src/d0/f0.rs:fn0",
            "src/d1/f5.rs:fn5",
            EdgeType::Uses,
        )];

        manager
            .partition_graph_with_strategy(
                &nodes,
                &edges,
                &[],
                &ProjectContext::default(),
                PartitionStrategy::Directory,
            )
            .unwrap();

        let pid = manager.partition_for_node("src/d1/f5.rs:fn5").unwrap();
        manager.remove_partition(&pid).unwrap();

        assert_eq!(manager.cross_ref_count(), 0);
        assert_eq!(manager.get_node("src/d1/f5.rs:fn5").unwrap(), None);
        assert_eq!(manager.memory_stats().total_partitions, 1);
    }

    #[test]
    fn test_repartition_replaces_table() {
        let manager = manager_with(MemoryConfig::default());
        let nodes = test_nodes(10, 5);

        manager
            .partition_graph_with_strategy(
                &nodes,
                &[],
                &[],
                &ProjectContext::default(),
                PartitionStrategy::Directory,
            )
            .unwrap();
        assert_eq!(manager.memory_stats().total_partitions, 2);

        let stats = manager
            .partition_graph_with_strategy(
                &nodes,
                &[],
                &[],
                &ProjectContext::default(),
                PartitionStrategy::FileType,
            )
            .unwrap();
        assert_eq!(stats.partition_count, 1); // all .rs
        assert_eq!(manager.memory_stats().total_partitions, 1);
    }
}
