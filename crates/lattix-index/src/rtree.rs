//! Spatial Index (R-tree)
//!
//! Bounding-box insert and overlap search. Insertion descends by minimum
//! bounding-box enlargement (first-encountered child wins ties); a node
//! exceeding `max_entries` is split by linear bisection of its entry/child
//! list, and a root split grows a new root. Every ancestor's bounding box
//! is recomputed bottom-up on the unwind of each insert.

use crate::bbox::BoundingBox;
use serde::{Deserialize, Serialize};

/// Default leaf capacity bounds
pub const DEFAULT_MIN_ENTRIES: usize = 2;
pub const DEFAULT_MAX_ENTRIES: usize = 8;

/// A payload-carrying entry in the spatial index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialEntry {
    /// Bounding box of the entry
    pub bbox: BoundingBox,
    /// Opaque payload (node id)
    pub node_id: String,
}

impl SpatialEntry {
    /// Create a new entry
    pub fn new(bbox: BoundingBox, node_id: impl Into<String>) -> Self {
        Self {
            bbox,
            node_id: node_id.into(),
        }
    }
}

/// One R-tree node. Leaves hold entries; internal nodes hold children.
/// Invariant: `bbox` is the minimal box covering everything below.
#[derive(Debug, Clone)]
struct RTreeNode {
    bbox: BoundingBox,
    entries: Vec<SpatialEntry>,
    children: Vec<RTreeNode>,
    is_leaf: bool,
}

impl RTreeNode {
    fn leaf() -> Self {
        Self {
            bbox: BoundingBox::empty(),
            entries: Vec::new(),
            children: Vec::new(),
            is_leaf: true,
        }
    }

    fn recompute_bbox(&mut self) {
        let mut bbox = BoundingBox::empty();
        if self.is_leaf {
            for entry in &self.entries {
                bbox = bbox.union(&entry.bbox);
            }
        } else {
            for child in &self.children {
                bbox = bbox.union(&child.bbox);
            }
        }
        self.bbox = bbox;
    }

    /// Split an overfull node in two halves by bisecting its list.
    fn split(&mut self) -> RTreeNode {
        let mut sibling = if self.is_leaf {
            let half = self.entries.len() / 2;
            RTreeNode {
                bbox: BoundingBox::empty(),
                entries: self.entries.split_off(half),
                children: Vec::new(),
                is_leaf: true,
            }
        } else {
            let half = self.children.len() / 2;
            RTreeNode {
                bbox: BoundingBox::empty(),
                entries: Vec::new(),
                children: self.children.split_off(half),
                is_leaf: false,
            }
        };
        self.recompute_bbox();
        sibling.recompute_bbox();
        sibling
    }
}

/// R-tree over axis-aligned bounding boxes.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    root: RTreeNode,
    min_entries: usize,
    max_entries: usize,
    len: usize,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ENTRIES, DEFAULT_MAX_ENTRIES)
    }
}

impl SpatialIndex {
    /// Create an index with the given leaf capacity bounds.
    pub fn new(min_entries: usize, max_entries: usize) -> Self {
        let min_entries = min_entries.max(1);
        let max_entries = max_entries.max(2 * min_entries);
        Self {
            root: RTreeNode::leaf(),
            min_entries,
            max_entries,
            len: 0,
        }
    }

    /// Number of entries in the index
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Configured minimum leaf occupancy
    pub fn min_entries(&self) -> usize {
        self.min_entries
    }

    /// Configured maximum node capacity
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.root = RTreeNode::leaf();
        self.len = 0;
    }

    /// Insert an entry.
    pub fn insert(&mut self, entry: SpatialEntry) {
        let max = self.max_entries;
        if let Some(sibling) = Self::insert_rec(&mut self.root, entry, max) {
            // Root split: grow a new root over the two halves
            let old_root = std::mem::replace(&mut self.root, RTreeNode::leaf());
            self.root = RTreeNode {
                bbox: old_root.bbox.union(&sibling.bbox),
                entries: Vec::new(),
                children: vec![old_root, sibling],
                is_leaf: false,
            };
        }
        self.len += 1;
    }

    /// Recursive insert; returns a split-off sibling when the node overflowed.
    fn insert_rec(
        node: &mut RTreeNode,
        entry: SpatialEntry,
        max_entries: usize,
    ) -> Option<RTreeNode> {
        if node.is_leaf {
            node.entries.push(entry);
            node.recompute_bbox();
            if node.entries.len() > max_entries {
                return Some(node.split());
            }
            return None;
        }

        // Choose the child needing the least enlargement; first wins ties
        let mut best = 0;
        let mut best_enlargement = f64::INFINITY;
        for (i, child) in node.children.iter().enumerate() {
            let enlargement = child.bbox.enlargement(&entry.bbox);
            if enlargement < best_enlargement {
                best_enlargement = enlargement;
                best = i;
            }
        }

        if let Some(sibling) = Self::insert_rec(&mut node.children[best], entry, max_entries) {
            node.children.push(sibling);
        }
        node.recompute_bbox();
        if node.children.len() > max_entries {
            return Some(node.split());
        }
        None
    }

    /// Find all entries whose bounding box intersects the query box.
    pub fn search(&self, query: &BoundingBox) -> Vec<&SpatialEntry> {
        let mut out = Vec::new();
        Self::search_rec(&self.root, query, &mut out);
        out
    }

    fn search_rec<'a>(node: &'a RTreeNode, query: &BoundingBox, out: &mut Vec<&'a SpatialEntry>) {
        if !node.bbox.intersects(query) {
            return;
        }
        if node.is_leaf {
            for entry in &node.entries {
                if entry.bbox.intersects(query) {
                    out.push(entry);
                }
            }
        } else {
            for child in &node.children {
                Self::search_rec(child, query, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, x: f64, y: f64, w: f64, h: f64) -> SpatialEntry {
        SpatialEntry::new(BoundingBox::new(x, y, x + w, y + h), id)
    }

    #[test]
    fn test_insert_and_search_small() {
        let mut index = SpatialIndex::default();
        index.insert(entry("a", 0.0, 0.0, 2.0, 2.0));
        index.insert(entry("b", 5.0, 5.0, 2.0, 2.0));
        index.insert(entry("c", 1.0, 1.0, 3.0, 3.0));

        let hits = index.search(&BoundingBox::new(0.5, 0.5, 1.5, 1.5));
        let ids: Vec<&str> = hits.iter().map(|e| e.node_id.as_str()).collect();
        assert!(ids.contains(&"a"));
        assert!(ids.contains(&"c"));
        assert!(!ids.contains(&"b"));
    }

    #[test]
    fn test_reflexive_containment_through_splits() {
        // Enough entries to force several splits and a multi-level tree
        let mut index = SpatialIndex::new(2, 4);
        let entries: Vec<SpatialEntry> = (0..100)
            .map(|i| {
                let x = (i % 10) as f64 * 3.0;
                let y = (i / 10) as f64 * 3.0;
                entry(&format!("e{}", i), x, y, 2.0, 2.0)
            })
            .collect();
        for e in &entries {
            index.insert(e.clone());
        }
        assert_eq!(index.len(), 100);

        // Every entry is found by a query with its own box
        for e in &entries {
            let hits = index.search(&e.bbox);
            assert!(
                hits.iter().any(|h| h.node_id == e.node_id),
                "entry {} not found by its own bbox",
                e.node_id
            );
        }
    }

    #[test]
    fn test_search_never_returns_non_intersecting() {
        let mut index = SpatialIndex::new(2, 4);
        for i in 0..50 {
            index.insert(entry(&format!("e{}", i), i as f64 * 10.0, 0.0, 1.0, 1.0));
        }

        let query = BoundingBox::new(95.0, -1.0, 145.0, 2.0);
        for hit in index.search(&query) {
            assert!(hit.bbox.intersects(&query));
        }
    }

    #[test]
    fn test_empty_search() {
        let index = SpatialIndex::default();
        assert!(index.search(&BoundingBox::new(0.0, 0.0, 100.0, 100.0)).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut index = SpatialIndex::default();
        index.insert(entry("a", 0.0, 0.0, 1.0, 1.0));
        index.clear();
        assert!(index.is_empty());
        assert!(index.search(&BoundingBox::new(0.0, 0.0, 2.0, 2.0)).is_empty());
    }
}
