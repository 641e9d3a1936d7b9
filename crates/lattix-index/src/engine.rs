//! Engine Facade
//!
//! Owns one `PartitionManager` and one `IndexOrchestrator` and moves nodes
//! between them: as partitions are touched, their nodes are flattened into
//! index documents and fanned out. The engine is an explicitly constructed
//! instance handed around by reference; there is no global singleton.

use crate::error::IndexError;
use crate::orchestrator::{IndexDefinition, IndexOrchestrator, IndexStats, RemoveReport};
use crate::value::{FieldValue, NodeData};
use lattix_core::{GraphNode, ManagerError, PartitionManager};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by the engine facade.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Partition manager error: {0}")]
    Manager(#[from] ManagerError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

/// Flatten a graph node into the field map the indexes consume.
pub fn node_document(node: &GraphNode) -> NodeData {
    let mut data = NodeData::new();
    data.insert("name".to_string(), FieldValue::from(node.name.as_str()));
    data.insert("kind".to_string(), FieldValue::from(node.kind.as_str()));
    data.insert("file".to_string(), FieldValue::from(node.file.as_str()));
    data.insert("line".to_string(), FieldValue::from(node.line));
    data.insert("end_line".to_string(), FieldValue::from(node.end_line));
    if let Some(subtype) = &node.subtype {
        data.insert("subtype".to_string(), FieldValue::from(subtype.as_str()));
    }
    if let Some(module) = &node.module {
        data.insert("module".to_string(), FieldValue::from(module.as_str()));
    }
    if let Some(language) = &node.language {
        data.insert("language".to_string(), FieldValue::from(language.as_str()));
    }
    if let Some(text) = &node.text {
        data.insert("text".to_string(), FieldValue::from(text.as_str()));
    }
    data
}

/// Partitioned graph storage plus multi-index querying behind one handle.
pub struct GraphEngine {
    manager: PartitionManager,
    orchestrator: Mutex<IndexOrchestrator>,
}

impl GraphEngine {
    /// Wire a manager and an orchestrator together.
    pub fn new(manager: PartitionManager, orchestrator: IndexOrchestrator) -> Self {
        Self {
            manager,
            orchestrator: Mutex::new(orchestrator),
        }
    }

    /// The underlying partition manager
    pub fn manager(&self) -> &PartitionManager {
        &self.manager
    }

    /// Register an additional index
    pub fn register_index(&self, name: impl Into<String>, definition: IndexDefinition) {
        self.orchestrator.lock().register(name, definition);
    }

    // ========================================================================
    // Index Maintenance
    // ========================================================================

    /// Index every node of a partition, loading it first if needed.
    ///
    /// Returns the number of nodes handed to the orchestrator.
    pub fn index_partition(&self, partition_id: &str) -> Result<usize, EngineError> {
        let nodes = self.manager.get_partition_nodes(partition_id)?;
        let mut orchestrator = self.orchestrator.lock();
        for node in &nodes {
            orchestrator.add_node(&node.id, &node_document(node))?;
        }
        debug!(partition_id, nodes = nodes.len(), "indexed partition");
        Ok(nodes.len())
    }

    /// Index a single node, loading its partition transparently.
    ///
    /// Unknown ids are a no-op and return false.
    pub fn index_node(&self, node_id: &str) -> Result<bool, EngineError> {
        match self.manager.get_node(node_id)? {
            Some(node) => {
                self.orchestrator
                    .lock()
                    .add_node(&node.id, &node_document(&node))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-index a node from its current graph state (= remove + add).
    pub fn update_node(&self, node_id: &str) -> Result<bool, EngineError> {
        match self.manager.get_node(node_id)? {
            Some(node) => {
                self.orchestrator
                    .lock()
                    .update_node(&node.id, &node_document(&node))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove a node from the indexes that support removal.
    pub fn remove_node(&self, node_id: &str) -> RemoveReport {
        self.orchestrator.lock().remove_node(node_id)
    }

    /// Clear and rebuild every index from the full partition table.
    ///
    /// Loads each partition in turn (eviction may interleave under memory
    /// pressure) and feeds all nodes back through the orchestrator. Returns
    /// the number of documents indexed.
    pub fn rebuild_indexes(&self) -> Result<usize, EngineError> {
        let mut documents: Vec<(String, NodeData)> = Vec::new();
        for partition_id in self.manager.partition_ids() {
            for node in self.manager.get_partition_nodes(&partition_id)? {
                documents.push((node.id.clone(), node_document(&node)));
            }
        }

        let mut orchestrator = self.orchestrator.lock();
        let provider = move || -> Result<Vec<(String, NodeData)>, IndexError> {
            Ok(documents.clone())
        };
        Ok(orchestrator.rebuild_indexes(&provider)?)
    }

    // ========================================================================
    // Query Pass-Through
    // ========================================================================

    /// Exact ordered-index lookup
    pub fn search_btree(
        &self,
        index: &str,
        key: &FieldValue,
    ) -> Result<Option<String>, EngineError> {
        Ok(self.orchestrator.lock().search_btree(index, key)?)
    }

    /// Inclusive ordered-index range scan
    pub fn range_btree_search(
        &self,
        index: &str,
        start: &FieldValue,
        end: &FieldValue,
    ) -> Result<Vec<(FieldValue, String)>, EngineError> {
        Ok(self
            .orchestrator
            .lock()
            .range_btree_search(index, start, end)?)
    }

    /// Ranked full-text search
    pub fn full_text_search(
        &self,
        index: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<crate::fulltext::SearchResult>, EngineError> {
        Ok(self.orchestrator.lock().full_text_search(index, query, limit)?)
    }

    /// Bounding-box overlap search
    pub fn spatial_search(
        &self,
        index: &str,
        query: &crate::bbox::BoundingBox,
    ) -> Result<Vec<crate::rtree::SpatialEntry>, EngineError> {
        Ok(self.orchestrator.lock().spatial_search(index, query)?)
    }

    /// Partial-key composite search
    pub fn composite_search(
        &self,
        index: &str,
        partial: &NodeData,
    ) -> Result<Vec<String>, EngineError> {
        Ok(self.orchestrator.lock().composite_search(index, partial)?)
    }

    /// Per-index entry counts
    pub fn get_index_stats(&self) -> Vec<IndexStats> {
        self.orchestrator.lock().get_index_stats()
    }
}
