//! Cross-Partition Edge Index
//!
//! Edges whose endpoints land in different partitions are recorded here as
//! weak, non-owning references. The index is always fully resident so that
//! cross-partition queries never require loading a partition just to
//! discover that an edge leaves it.
//!
//! # Architecture
//!
//! ```text
//! CrossRefIndex (in-memory)
//! ├── by_target: HashMap<node_id, Vec<CrossPartitionReference>>
//! ├── by_source: HashMap<node_id, Vec<CrossPartitionReference>>
//! └── by_partition: HashMap<partition_id, Vec<CrossPartitionReference>>
//! ```

use crate::graph::EdgeType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A cross-partition edge reference.
///
/// Pure value record; it appears in the reference lists of *both* partitions
/// it connects. Neither side owns the referenced nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossPartitionReference {
    /// Partition containing the source node
    pub source_partition: String,
    /// Partition containing the target node
    pub target_partition: String,
    /// Source node ID
    pub source_node_id: String,
    /// Target node ID
    pub target_node_id: String,
    /// Type of the underlying edge
    pub edge_type: EdgeType,
    /// Weight of the underlying edge
    pub weight: f64,
}

impl CrossPartitionReference {
    /// Create a new cross-partition reference
    pub fn new(
        source_partition: impl Into<String>,
        target_partition: impl Into<String>,
        source_node_id: impl Into<String>,
        target_node_id: impl Into<String>,
        edge_type: EdgeType,
        weight: f64,
    ) -> Self {
        Self {
            source_partition: source_partition.into(),
            target_partition: target_partition.into(),
            source_node_id: source_node_id.into(),
            target_node_id: target_node_id.into(),
            edge_type,
            weight,
        }
    }

    /// Check whether the reference touches a partition on either side
    pub fn touches(&self, partition_id: &str) -> bool {
        self.source_partition == partition_id || self.target_partition == partition_id
    }
}

/// In-memory index for cross-partition edges.
#[derive(Debug, Default, Clone)]
pub struct CrossRefIndex {
    /// References indexed by target node ID (find incoming references)
    by_target: HashMap<String, Vec<CrossPartitionReference>>,
    /// References indexed by source node ID (find outgoing references)
    by_source: HashMap<String, Vec<CrossPartitionReference>>,
    /// References indexed by partition ID (both sides; purge on delete)
    by_partition: HashMap<String, Vec<CrossPartitionReference>>,
}

impl CrossRefIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cross-reference to the index.
    ///
    /// The reference is registered against both partitions it connects.
    pub fn add(&mut self, cross_ref: CrossPartitionReference) {
        self.by_target
            .entry(cross_ref.target_node_id.clone())
            .or_default()
            .push(cross_ref.clone());

        self.by_source
            .entry(cross_ref.source_node_id.clone())
            .or_default()
            .push(cross_ref.clone());

        self.by_partition
            .entry(cross_ref.source_partition.clone())
            .or_default()
            .push(cross_ref.clone());
        if cross_ref.target_partition != cross_ref.source_partition {
            self.by_partition
                .entry(cross_ref.target_partition.clone())
                .or_default()
                .push(cross_ref);
        }
    }

    /// Add multiple cross-references
    pub fn add_all(&mut self, cross_refs: impl IntoIterator<Item = CrossPartitionReference>) {
        for cross_ref in cross_refs {
            self.add(cross_ref);
        }
    }

    /// Get all cross-references targeting a specific node
    pub fn get_by_target(&self, target_node_id: &str) -> Option<&Vec<CrossPartitionReference>> {
        self.by_target.get(target_node_id)
    }

    /// Get all cross-references from a specific source node
    pub fn get_by_source(&self, source_node_id: &str) -> Option<&Vec<CrossPartitionReference>> {
        self.by_source.get(source_node_id)
    }

    /// Get all cross-references touching a partition on either side
    pub fn get_by_partition(&self, partition_id: &str) -> Option<&Vec<CrossPartitionReference>> {
        self.by_partition.get(partition_id)
    }

    /// Remove all cross-references involving a partition (source or target).
    ///
    /// Deleting a partition must also purge its references from the other
    /// side's lists; this removes the reference everywhere it was indexed.
    pub fn remove_by_partition(&mut self, partition_id: &str) {
        self.by_partition.remove(partition_id);

        self.by_partition.retain(|_, refs| {
            refs.retain(|r| !r.touches(partition_id));
            !refs.is_empty()
        });

        self.by_source.retain(|_, refs| {
            refs.retain(|r| !r.touches(partition_id));
            !refs.is_empty()
        });

        self.by_target.retain(|_, refs| {
            refs.retain(|r| !r.touches(partition_id));
            !refs.is_empty()
        });
    }

    /// Get total number of cross-references
    pub fn len(&self) -> usize {
        self.by_source.values().map(|v| v.len()).sum()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }

    /// Clear all cross-references
    pub fn clear(&mut self) {
        self.by_source.clear();
        self.by_target.clear();
        self.by_partition.clear();
    }

    /// Iterate over all cross-references
    pub fn iter(&self) -> impl Iterator<Item = &CrossPartitionReference> {
        self.by_source.values().flat_map(|refs| refs.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cross_ref(src_part: &str, tgt_part: &str, src: &str, tgt: &str) -> CrossPartitionReference {
        CrossPartitionReference::new(src_part, tgt_part, src, tgt, EdgeType::Uses, 1.0)
    }

    #[test]
    fn test_add_and_lookup() {
        let mut index = CrossRefIndex::new();
        index.add(cross_ref("pa", "pb", "a1", "b1"));
        index.add(cross_ref("pa", "pc", "a1", "c1"));

        assert_eq!(index.len(), 2);
        assert_eq!(index.get_by_source("a1").unwrap().len(), 2);
        assert_eq!(index.get_by_target("b1").unwrap().len(), 1);
        assert!(index.get_by_target("a1").is_none());
    }

    #[test]
    fn test_registered_against_both_partitions() {
        let mut index = CrossRefIndex::new();
        index.add(cross_ref("pa", "pb", "a1", "b1"));

        assert_eq!(index.get_by_partition("pa").unwrap().len(), 1);
        assert_eq!(index.get_by_partition("pb").unwrap().len(), 1);
    }

    #[test]
    fn test_remove_by_partition_purges_other_side() {
        let mut index = CrossRefIndex::new();
        index.add(cross_ref("pa", "pb", "a1", "b1"));
        index.add(cross_ref("pb", "pc", "b2", "c1"));
        index.add(cross_ref("pa", "pc", "a2", "c2"));

        index.remove_by_partition("pb");

        // Every reference touching pb is gone from every view
        assert_eq!(index.len(), 1);
        assert!(index.get_by_partition("pb").is_none());
        assert!(index.get_by_source("b2").is_none());
        assert!(index.get_by_target("b1").is_none());

        // pa→pc survives, still visible from both partitions
        assert_eq!(index.get_by_partition("pa").unwrap().len(), 1);
        assert_eq!(index.get_by_partition("pc").unwrap().len(), 1);
    }
}
