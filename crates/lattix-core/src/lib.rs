//! Lattix Core - Partitioned knowledge-graph management
//!
//! This crate provides the core functionality for keeping a large code
//! knowledge graph queryable under a memory budget:
//! - Graph schema (nodes, edges, detected patterns) and a petgraph-backed
//!   runtime view for traversal
//! - Graph partitioning under six strategies with cross-partition edge
//!   tracking
//! - On-demand partition loading and score-based eviction through a
//!   pluggable blob store

// Implemented modules
pub mod config;
pub mod graph;
pub mod partition;
pub mod store;

// Re-exports for convenience
pub use config::{
    EvictionPolicy, EvictionWeights, MemoryConfig, PartitionConfig, PartitionStrategy,
    PartitioningCriteria,
};
pub use graph::{
    CodePattern, EdgeData, EdgeType, GraphEdge, GraphNode, KnowledgeGraph, NodeKind, PatternKind,
    ProjectContext, GRAPH_SCHEMA_VERSION,
};
pub use partition::{
    CacheMetrics, CrossPartitionReference, CrossRefIndex, GraphPartition, GraphPartitioner,
    LoadState, ManagerError, MemoryStats, PartitionError, PartitionManager, PartitionMetadata,
    PartitioningStats,
};
pub use store::{FileStore, MemoryStore, PartitionStore, StoreError};
