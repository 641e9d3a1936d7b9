//! Graph Partitioner
//!
//! Splits a full node/edge/pattern set into disjoint, bounded partitions
//! under one of six strategies, then classifies every edge as internal or
//! cross-partition. The partitioner is pure: it computes a complete new
//! partition set and hands it back; installing the result (and discarding
//! the previous table) is the manager's job, so a failed run never leaves a
//! partial table behind.

use crate::config::{PartitionConfig, PartitionStrategy};
use crate::graph::{CodePattern, GraphEdge, GraphNode, ProjectContext};
use crate::partition::cross_refs::{CrossPartitionReference, CrossRefIndex};
use crate::partition::partition::GraphPartition;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during partitioning
#[derive(Debug, Error)]
pub enum PartitionerError {
    #[error("duplicate node id '{node_id}' in partitioning input")]
    DuplicateNode { node_id: String },
}

/// Statistics from the partitioning process
#[derive(Debug, Clone)]
pub struct PartitioningStats {
    /// Total number of nodes partitioned
    pub total_nodes: usize,
    /// Total number of edges classified
    pub total_edges: usize,
    /// Number of partitions created
    pub partition_count: usize,
    /// Average nodes per partition
    pub avg_nodes_per_partition: f64,
    /// Average edges per partition
    pub avg_edges_per_partition: f64,
    /// Number of cross-partition edges
    pub cross_partition_edges: usize,
    /// Number of intra-partition edges
    pub intra_partition_edges: usize,
    /// Wall-clock partitioning time
    pub elapsed: Duration,
    /// Estimated memory reduction (percent) assuming only a fraction of
    /// partitions is resident at once
    pub estimated_memory_reduction_pct: f64,
}

/// Result of a full partitioning run, ready for the manager to install.
#[derive(Debug)]
pub struct PartitionSet {
    /// The new partitions, keyed by id
    pub partitions: HashMap<String, GraphPartition>,
    /// Cross-partition reference index
    pub cross_refs: CrossRefIndex,
    /// Run statistics
    pub stats: PartitioningStats,
}

/// Graph Partitioner
pub struct GraphPartitioner;

impl GraphPartitioner {
    /// Partition a node/edge/pattern set under the given strategy.
    pub fn partition(
        nodes: &[GraphNode],
        edges: &[GraphEdge],
        patterns: &[CodePattern],
        context: &ProjectContext,
        config: &PartitionConfig,
        strategy: PartitionStrategy,
        resident_fraction: f64,
    ) -> Result<PartitionSet, PartitionerError> {
        let started = Instant::now();

        // Step 1: Group nodes into disjoint buckets
        let buckets = Self::group_nodes(nodes, edges, context, config, strategy)?;

        // Step 2: Node -> partition id map for edge/pattern classification
        let node_to_partition: HashMap<String, String> = buckets
            .iter()
            .flat_map(|(partition_id, bucket)| {
                bucket
                    .iter()
                    .map(move |node| (node.id.clone(), partition_id.clone()))
            })
            .collect();

        // Step 3: Build partitions (internal edges and patterns per bucket)
        let mut partitions: HashMap<String, GraphPartition> = HashMap::new();
        for (partition_id, bucket) in &buckets {
            let partition = Self::create_partition(
                partition_id,
                strategy,
                bucket,
                edges,
                patterns,
                &node_to_partition,
            );
            partitions.insert(partition_id.clone(), partition);
        }

        // Step 4: Classify cross-partition edges
        let cross: Vec<CrossPartitionReference> = edges
            .par_iter()
            .filter_map(|edge| {
                let src = node_to_partition.get(&edge.source)?;
                let tgt = node_to_partition.get(&edge.target)?;
                if src == tgt {
                    return None;
                }
                Some(CrossPartitionReference::new(
                    src.clone(),
                    tgt.clone(),
                    edge.source.clone(),
                    edge.target.clone(),
                    edge.edge_type,
                    edge.weight,
                ))
            })
            .collect();

        let mut cross_refs = CrossRefIndex::new();
        for cross_ref in &cross {
            cross_refs.add(cross_ref.clone());
        }

        // Step 5: Record refs and dependency lists against both partitions
        for cross_ref in &cross {
            if let Some(p) = partitions.get_mut(&cross_ref.source_partition) {
                p.cross_refs.push(cross_ref.clone());
                if !p
                    .metadata
                    .dependencies
                    .contains(&cross_ref.target_partition)
                {
                    p.metadata
                        .dependencies
                        .push(cross_ref.target_partition.clone());
                }
            }
            if let Some(p) = partitions.get_mut(&cross_ref.target_partition) {
                p.cross_refs.push(cross_ref.clone());
                if !p
                    .metadata
                    .dependencies
                    .contains(&cross_ref.source_partition)
                {
                    p.metadata
                        .dependencies
                        .push(cross_ref.source_partition.clone());
                }
            }
        }

        let intra: usize = partitions.values().map(|p| p.edges.len()).sum();
        let count = partitions.len();
        let stats = PartitioningStats {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            partition_count: count,
            avg_nodes_per_partition: if count == 0 {
                0.0
            } else {
                nodes.len() as f64 / count as f64
            },
            avg_edges_per_partition: if count == 0 {
                0.0
            } else {
                intra as f64 / count as f64
            },
            cross_partition_edges: cross.len(),
            intra_partition_edges: intra,
            elapsed: started.elapsed(),
            estimated_memory_reduction_pct: (1.0 - resident_fraction) * 100.0,
        };

        info!(
            strategy = strategy.as_str(),
            partitions = stats.partition_count,
            cross_refs = stats.cross_partition_edges,
            "partitioned graph"
        );

        Ok(PartitionSet {
            partitions,
            cross_refs,
            stats,
        })
    }

    /// Shared helper: build one partition from a node bucket, pulling in the
    /// edges and patterns fully internal to the bucket.
    fn create_partition(
        partition_id: &str,
        strategy: PartitionStrategy,
        bucket: &[GraphNode],
        edges: &[GraphEdge],
        patterns: &[CodePattern],
        node_to_partition: &HashMap<String, String>,
    ) -> GraphPartition {
        let member_ids: HashSet<&str> = bucket.iter().map(|n| n.id.as_str()).collect();

        let node_map: HashMap<String, GraphNode> = bucket
            .iter()
            .map(|n| (n.id.clone(), n.clone()))
            .collect();

        let edge_map: HashMap<String, GraphEdge> = edges
            .iter()
            .filter(|e| {
                member_ids.contains(e.source.as_str()) && member_ids.contains(e.target.as_str())
            })
            .map(|e| (e.key(), e.clone()))
            .collect();

        let pattern_map: HashMap<String, CodePattern> = patterns
            .iter()
            .filter(|p| {
                !p.node_ids.is_empty()
                    && p.node_ids.iter().all(|id| {
                        node_to_partition.get(id).map(String::as_str) == Some(partition_id)
                    })
            })
            .map(|p| (p.id.clone(), p.clone()))
            .collect();

        debug!(
            partition_id,
            nodes = node_map.len(),
            edges = edge_map.len(),
            patterns = pattern_map.len(),
            "created partition"
        );

        GraphPartition::new(
            partition_id,
            partition_id,
            strategy,
            node_map,
            edge_map,
            pattern_map,
        )
    }

    // ========================================================================
    // Grouping Strategies
    // ========================================================================

    /// Dispatch to the grouping strategy.
    ///
    /// Returns (partition id, bucket) pairs in deterministic order; every
    /// input node lands in exactly one bucket.
    fn group_nodes(
        nodes: &[GraphNode],
        edges: &[GraphEdge],
        context: &ProjectContext,
        config: &PartitionConfig,
        strategy: PartitionStrategy,
    ) -> Result<Vec<(String, Vec<GraphNode>)>, PartitionerError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(nodes.len());
        for node in nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(PartitionerError::DuplicateNode {
                    node_id: node.id.clone(),
                });
            }
        }

        Ok(match strategy {
            PartitionStrategy::Module => Self::group_by_key(nodes, |n| {
                format!(
                    "module_{}",
                    context.module_for(n).unwrap_or("unknown")
                )
            }),
            PartitionStrategy::Directory => {
                Self::group_by_key(nodes, |n| format!("dir_{}", n.file_directory()))
            }
            PartitionStrategy::FileType => Self::group_by_key(nodes, |n| {
                format!(
                    "ext_{}",
                    n.file_extension().unwrap_or_else(|| "none".to_string())
                )
            }),
            PartitionStrategy::SizeBased => {
                Self::group_by_size(nodes, config.max_nodes_per_partition)
            }
            PartitionStrategy::DependencyCluster => {
                Self::group_by_dependency_cluster(nodes, edges, config.max_nodes_per_partition)
            }
            PartitionStrategy::Temporal => Self::group_by_key(nodes, |n| {
                format!("age_{}", Self::age_band(n.modified_at))
            }),
        })
    }

    /// Group nodes by an arbitrary string key, deterministically ordered.
    fn group_by_key<F>(nodes: &[GraphNode], key: F) -> Vec<(String, Vec<GraphNode>)>
    where
        F: Fn(&GraphNode) -> String,
    {
        let mut buckets: BTreeMap<String, Vec<GraphNode>> = BTreeMap::new();
        for node in nodes {
            buckets.entry(key(node)).or_default().push(node.clone());
        }
        buckets.into_iter().collect()
    }

    /// Fixed-size buckets in input order.
    fn group_by_size(nodes: &[GraphNode], max_nodes: usize) -> Vec<(String, Vec<GraphNode>)> {
        let max_nodes = max_nodes.max(1);
        nodes
            .chunks(max_nodes)
            .enumerate()
            .map(|(i, chunk)| (format!("size_{}", i), chunk.to_vec()))
            .collect()
    }

    /// Connected clusters over the undirected edge graph, bounded by
    /// `max_nodes` per cluster so highly connected regions stay loadable.
    fn group_by_dependency_cluster(
        nodes: &[GraphNode],
        edges: &[GraphEdge],
        max_nodes: usize,
    ) -> Vec<(String, Vec<GraphNode>)> {
        let max_nodes = max_nodes.max(1);
        let by_id: HashMap<&str, &GraphNode> =
            nodes.iter().map(|n| (n.id.as_str(), n)).collect();

        // Undirected adjacency over known endpoints
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in edges {
            if by_id.contains_key(edge.source.as_str()) && by_id.contains_key(edge.target.as_str())
            {
                adjacency
                    .entry(edge.source.as_str())
                    .or_default()
                    .push(edge.target.as_str());
                adjacency
                    .entry(edge.target.as_str())
                    .or_default()
                    .push(edge.source.as_str());
            }
        }

        let mut visited: HashSet<&str> = HashSet::with_capacity(nodes.len());
        let mut buckets: Vec<(String, Vec<GraphNode>)> = Vec::new();

        for start in nodes {
            if visited.contains(start.id.as_str()) {
                continue;
            }

            // Depth-first sweep, cut off at the size bound
            let mut cluster: Vec<GraphNode> = Vec::new();
            let mut stack: Vec<&str> = vec![start.id.as_str()];

            while let Some(id) = stack.pop() {
                if cluster.len() >= max_nodes {
                    break;
                }
                if !visited.insert(id) {
                    continue;
                }
                if let Some(node) = by_id.get(id) {
                    cluster.push((*node).clone());
                }
                if let Some(neighbors) = adjacency.get(id) {
                    for neighbor in neighbors {
                        if !visited.contains(neighbor) {
                            stack.push(neighbor);
                        }
                    }
                }
            }

            if !cluster.is_empty() {
                buckets.push((format!("cluster_{}", buckets.len()), cluster));
            }
        }

        buckets
    }

    /// Coarse modification-age band for temporal grouping.
    fn age_band(modified_at: Option<SystemTime>) -> &'static str {
        let Some(ts) = modified_at else {
            return "unknown";
        };
        let age = ts.elapsed().unwrap_or(Duration::ZERO);
        let days = age.as_secs() / 86_400;
        match days {
            0 => "day",
            1..=6 => "week",
            7..=29 => "month",
            30..=89 => "quarter",
            _ => "older",
        }
    }
}
