//! Partition Records and Lifecycle State
//!
//! A `GraphPartition` exclusively owns copies of its member nodes, edges and
//! patterns while loaded. On eviction the serialized payload passes to the
//! partition store and the in-memory containers are cleared, so any later
//! access has to reload.

use crate::config::PartitionStrategy;
use crate::graph::{CodePattern, GraphEdge, GraphNode};
use crate::partition::cross_refs::CrossPartitionReference;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;
use thiserror::Error;

/// Constants for memory estimation
const NODE_BASE_SIZE: usize = 512; // Base size of GraphNode + typical string data
const EDGE_BASE_SIZE: usize = 128; // GraphEdge + container overhead
const PATTERN_BASE_SIZE: usize = 96;
const CONTAINER_OVERHEAD: f64 = 1.4; // HashMap + graph-view overhead factor

/// Errors raised by partition payload (de)serialization.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("failed to serialize partition '{partition_id}': {source}")]
    Serialize {
        partition_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to deserialize partition '{partition_id}': {source}")]
    Deserialize {
        partition_id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Lifecycle state of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Containers are empty; contents live in the partition store
    Unloaded,
    /// A load is in flight
    Loading,
    /// Containers hold the partition contents
    Loaded,
    /// An eviction is in flight; contents are still valid until persisted
    Evicting,
}

/// Bookkeeping mutated on every load/access, recomputed on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionMetadata {
    /// Creation timestamp
    pub created_at: SystemTime,
    /// Last access timestamp (load or node read)
    pub last_accessed: SystemTime,
    /// Last content-modification timestamp
    pub last_modified: SystemTime,
    /// Number of accesses since creation
    pub access_count: u64,
    /// Estimated memory footprint in bytes (derived, not measured)
    pub estimated_size: usize,
    /// Number of member nodes
    pub node_count: usize,
    /// Number of member edges
    pub edge_count: usize,
    /// Caller-assigned eviction priority (higher = keep longer)
    pub priority: f64,
    /// Partition ids this partition has cross-references into
    pub dependencies: Vec<String>,
}

impl PartitionMetadata {
    fn new(node_count: usize, edge_count: usize, pattern_count: usize) -> Self {
        let now = SystemTime::now();
        Self {
            created_at: now,
            last_accessed: now,
            last_modified: now,
            access_count: 0,
            estimated_size: estimate_memory(node_count, edge_count, pattern_count),
            node_count,
            edge_count,
            priority: 1.0,
            dependencies: Vec::new(),
        }
    }

    /// Minutes elapsed since the last access (saturating at zero)
    pub fn minutes_since_access(&self) -> f64 {
        self.last_accessed
            .elapsed()
            .map(|d| d.as_secs_f64() / 60.0)
            .unwrap_or(0.0)
    }
}

/// Estimate the memory footprint of a partition's containers.
pub fn estimate_memory(node_count: usize, edge_count: usize, pattern_count: usize) -> usize {
    let base = node_count * NODE_BASE_SIZE
        + edge_count * EDGE_BASE_SIZE
        + pattern_count * PATTERN_BASE_SIZE;
    (base as f64 * CONTAINER_OVERHEAD) as usize
}

/// Serialized form of a partition's contents, as handed to the store.
#[derive(Debug, Serialize, Deserialize)]
pub struct PartitionPayload {
    pub nodes: HashMap<String, GraphNode>,
    pub edges: HashMap<String, GraphEdge>,
    pub patterns: HashMap<String, CodePattern>,
}

/// A disjoint subset of the knowledge graph, independently loadable.
#[derive(Debug, Clone)]
pub struct GraphPartition {
    /// Stable partition ID
    pub id: String,
    /// Human-readable name (the grouping key that produced it)
    pub name: String,
    /// Strategy used to build this partition
    pub strategy: PartitionStrategy,
    /// Member nodes keyed by id (owned copies, empty while unloaded)
    pub nodes: HashMap<String, GraphNode>,
    /// Member (internal) edges keyed by edge key
    pub edges: HashMap<String, GraphEdge>,
    /// Member patterns keyed by id
    pub patterns: HashMap<String, CodePattern>,
    /// Bookkeeping
    pub metadata: PartitionMetadata,
    /// Cross-partition references touching this partition
    pub cross_refs: Vec<CrossPartitionReference>,
    /// Lifecycle state
    pub load_state: LoadState,
}

impl GraphPartition {
    /// Create a freshly built, loaded partition from owned containers.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        strategy: PartitionStrategy,
        nodes: HashMap<String, GraphNode>,
        edges: HashMap<String, GraphEdge>,
        patterns: HashMap<String, CodePattern>,
    ) -> Self {
        let metadata = PartitionMetadata::new(nodes.len(), edges.len(), patterns.len());
        Self {
            id: id.into(),
            name: name.into(),
            strategy,
            nodes,
            edges,
            patterns,
            metadata,
            cross_refs: Vec::new(),
            load_state: LoadState::Loaded,
        }
    }

    /// Record an access (refreshes recency, bumps the counter)
    pub fn touch(&mut self) {
        self.metadata.last_accessed = SystemTime::now();
        self.metadata.access_count += 1;
    }

    /// Recompute derived metadata from the current containers
    pub fn recompute_metadata(&mut self) {
        self.metadata.node_count = self.nodes.len();
        self.metadata.edge_count = self.edges.len();
        self.metadata.estimated_size =
            estimate_memory(self.nodes.len(), self.edges.len(), self.patterns.len());
        self.metadata.last_modified = SystemTime::now();
    }

    /// Check whether the partition currently holds its contents
    pub fn is_loaded(&self) -> bool {
        self.load_state == LoadState::Loaded
    }

    /// Serialize the containers for hand-off to the partition store.
    pub fn to_payload_bytes(&self) -> Result<Vec<u8>, PartitionError> {
        let payload = PartitionPayload {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            patterns: self.patterns.clone(),
        };
        serde_json::to_vec(&payload).map_err(|source| PartitionError::Serialize {
            partition_id: self.id.clone(),
            source,
        })
    }

    /// Repopulate the containers from stored payload bytes.
    pub fn apply_payload_bytes(&mut self, bytes: &[u8]) -> Result<(), PartitionError> {
        let payload: PartitionPayload =
            serde_json::from_slice(bytes).map_err(|source| PartitionError::Deserialize {
                partition_id: self.id.clone(),
                source,
            })?;
        self.nodes = payload.nodes;
        self.edges = payload.edges;
        self.patterns = payload.patterns;
        self.recompute_metadata();
        Ok(())
    }

    /// Drop the in-memory containers (post-eviction).
    ///
    /// Contents must already be persisted; counts in the metadata are kept
    /// so the estimated reload cost stays known.
    pub fn clear_containers(&mut self) {
        self.nodes = HashMap::new();
        self.edges = HashMap::new();
        self.patterns = HashMap::new();
    }
}
