//! Graph Schema Definitions for the Knowledge Graph Model
//!
//! This module defines the node/edge/pattern records handed over by the
//! graph-building pipeline, plus the `KnowledgeGraph` runtime representation
//! used for traversal of currently loaded partitions.
//!
//! This module provides the `KnowledgeGraph` implementation using petgraph for
//! efficient traversal and graph algorithms.

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// Schema version constant
pub const GRAPH_SCHEMA_VERSION: &str = "1.0";

// ============================================================================
// Edge Types
// ============================================================================

/// Types of relationships between code entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Hierarchical containment (File→Module, Module→Type, Type→Method)
    Contains,
    /// References (Callable→Callable, Callable→Data)
    Uses,
    /// Definition relationships (Container→Data, Callable→Data)
    Defines,
    /// Module/component dependency
    DependsOn,
}

impl EdgeType {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Contains => "CONTAINS",
            EdgeType::Uses => "USES",
            EdgeType::Defines => "DEFINES",
            EdgeType::DependsOn => "DEPENDS_ON",
        }
    }
}

// ============================================================================
// Node Kinds
// ============================================================================

/// High-level node kind classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Structural organization entity (file, namespace, module, type)
    Container,
    /// Executable code entity (function, method, constructor)
    Callable,
    /// State and value entity (constant, variable, field)
    Data,
}

impl NodeKind {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Container => "Container",
            NodeKind::Callable => "Callable",
            NodeKind::Data => "Data",
        }
    }
}

// ============================================================================
// Node
// ============================================================================

/// A node in the knowledge graph representing a code entity.
///
/// Produced by the graph-building pipeline; the partition manager and the
/// indexes treat it as an opaque record with stable string identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Hierarchical node ID (e.g., "src/auth.rs:AuthService:login")
    pub id: String,

    /// Entity name
    pub name: String,

    /// Node kind: Container, Callable, or Data
    #[serde(rename = "kind")]
    pub kind: NodeKind,

    /// Language-specific subtype (e.g., "struct", "interface", "method")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    /// Source file path
    pub file: String,

    /// Module path this node belongs to (e.g., "auth::service")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Source language (e.g., "rust", "python")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Starting line number (1-indexed)
    pub line: usize,

    /// Ending line number (1-indexed)
    pub end_line: usize,

    /// Source code text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Last modification time of the owning file, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<SystemTime>,
}

impl GraphNode {
    /// Create a new node with the minimum required fields
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            subtype: None,
            file: String::new(),
            module: None,
            language: None,
            line: 1,
            end_line: 1,
            text: None,
            modified_at: None,
        }
    }

    /// Set the source file and line range
    pub fn with_location(mut self, file: impl Into<String>, line: usize, end_line: usize) -> Self {
        self.file = file.into();
        self.line = line;
        self.end_line = end_line;
        self
    }

    /// Set the module path
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Set the source language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the source text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the file modification timestamp
    pub fn with_modified_at(mut self, modified_at: SystemTime) -> Self {
        self.modified_at = Some(modified_at);
        self
    }

    /// File extension of the owning file, lowercased ("rs", "py", ...)
    pub fn file_extension(&self) -> Option<String> {
        std::path::Path::new(&self.file)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    /// Parent directory of the owning file ("root" for top-level files)
    pub fn file_directory(&self) -> String {
        std::path::Path::new(&self.file)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| "root".to_string())
    }

    /// Rough in-memory footprint estimate in bytes (derived, not measured)
    pub fn estimated_size(&self) -> usize {
        let strings = self.id.len()
            + self.name.len()
            + self.file.len()
            + self.subtype.as_deref().map_or(0, str::len)
            + self.module.as_deref().map_or(0, str::len)
            + self.language.as_deref().map_or(0, str::len)
            + self.text.as_deref().map_or(0, str::len);
        std::mem::size_of::<Self>() + strings
    }
}

// ============================================================================
// Edge
// ============================================================================

/// An edge in the knowledge graph representing a relationship between nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node ID
    pub source: String,

    /// Target node ID
    pub target: String,

    /// Relationship type
    #[serde(rename = "type")]
    pub edge_type: EdgeType,

    /// Relationship strength (1.0 for plain structural edges)
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Line number where the reference occurs (for USES edges)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_line: Option<usize>,
}

fn default_weight() -> f64 {
    1.0
}

impl GraphEdge {
    /// Create a new edge with weight 1.0
    pub fn new(source: impl Into<String>, target: impl Into<String>, edge_type: EdgeType) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            edge_type,
            weight: 1.0,
            ref_line: None,
        }
    }

    /// Set the relationship weight
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Set the reference line
    pub fn with_ref_line(mut self, line: usize) -> Self {
        self.ref_line = Some(line);
        self
    }

    /// Stable identity for keying an edge inside a partition container
    pub fn key(&self) -> String {
        format!(
            "{}->{}:{}{}",
            self.source,
            self.target,
            self.edge_type.as_str(),
            self.ref_line.map(|l| format!("@{}", l)).unwrap_or_default()
        )
    }
}

// ============================================================================
// Detected Patterns
// ============================================================================

/// Kinds of detected code patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Singleton,
    Factory,
    Observer,
    Builder,
    Adapter,
    GodObject,
    CircularDependency,
}

impl PatternKind {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Singleton => "singleton",
            PatternKind::Factory => "factory",
            PatternKind::Observer => "observer",
            PatternKind::Builder => "builder",
            PatternKind::Adapter => "adapter",
            PatternKind::GodObject => "god_object",
            PatternKind::CircularDependency => "circular_dependency",
        }
    }
}

/// A pattern detected across one or more graph nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodePattern {
    /// Stable pattern ID
    pub id: String,

    /// Pattern kind
    pub kind: PatternKind,

    /// IDs of the nodes participating in the pattern
    pub node_ids: Vec<String>,

    /// Detector confidence in [0, 1]
    pub confidence: f64,
}

impl CodePattern {
    /// Create a new pattern
    pub fn new(
        id: impl Into<String>,
        kind: PatternKind,
        node_ids: Vec<String>,
        confidence: f64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            node_ids,
            confidence,
        }
    }
}

// ============================================================================
// Project Context
// ============================================================================

/// Project-level metadata handed over by the graph-building pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Absolute project root path
    pub root: String,

    /// Map from file path to the module it belongs to
    #[serde(default)]
    pub file_modules: HashMap<String, String>,
}

impl ProjectContext {
    /// Create a context for a project root
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            file_modules: HashMap::new(),
        }
    }

    /// Register a file→module mapping
    pub fn set_module(&mut self, file: impl Into<String>, module: impl Into<String>) {
        self.file_modules.insert(file.into(), module.into());
    }

    /// Resolve the module for a file, falling back to the node's own field
    pub fn module_for<'a>(&'a self, node: &'a GraphNode) -> Option<&'a str> {
        self.file_modules
            .get(&node.file)
            .map(|s| s.as_str())
            .or(node.module.as_deref())
    }
}

// ============================================================================
// PetGraph-Based Knowledge Graph (for efficient traversal)
// ============================================================================

/// Edge data stored as edge weights in petgraph.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    /// Relationship type
    pub edge_type: EdgeType,
    /// Relationship strength
    pub weight: f64,
    /// Line number where the reference occurs
    pub ref_line: Option<usize>,
}

impl From<&GraphEdge> for EdgeData {
    fn from(edge: &GraphEdge) -> Self {
        Self {
            edge_type: edge.edge_type,
            weight: edge.weight,
            ref_line: edge.ref_line,
        }
    }
}

/// A petgraph-based knowledge graph for efficient traversal.
///
/// Uses `petgraph::StableGraph`:
/// - O(1) neighbor access via adjacency lists
/// - Stable indices (node/edge removal doesn't invalidate others)
///
/// The partition manager maintains one instance holding all currently loaded
/// partitions; eviction removes a partition's nodes (and incident edges) from
/// this view.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    /// The underlying petgraph instance
    graph: StableGraph<GraphNode, EdgeData, petgraph::Directed>,

    /// Map from node ID (string) to petgraph NodeIndex for O(1) lookup
    node_index_map: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Node Operations
    // ------------------------------------------------------------------------

    /// Add a node to the graph, returning its NodeIndex.
    ///
    /// If a node with the same ID already exists, it is replaced.
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        let node_id = node.id.clone();

        if let Some(&existing_idx) = self.node_index_map.get(&node_id) {
            self.graph.remove_node(existing_idx);
        }

        let idx = self.graph.add_node(node);
        self.node_index_map.insert(node_id, idx);
        idx
    }

    /// Get a node by its string ID
    pub fn get_node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index_map
            .get(id)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Check if the graph contains a node with the given ID
    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index_map.contains_key(id)
    }

    /// Remove a node and all its incident edges
    pub fn remove_node(&mut self, id: &str) -> Option<GraphNode> {
        self.node_index_map
            .remove(id)
            .and_then(|idx| self.graph.remove_node(idx))
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Iterate over all nodes
    pub fn iter_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    // ------------------------------------------------------------------------
    // Edge Operations
    // ------------------------------------------------------------------------

    /// Add an edge between two nodes by ID.
    ///
    /// Returns false if either endpoint is not present in the graph.
    pub fn add_edge(&mut self, source: &str, target: &str, data: EdgeData) -> bool {
        match (
            self.node_index_map.get(source),
            self.node_index_map.get(target),
        ) {
            (Some(&src), Some(&tgt)) => {
                self.graph.add_edge(src, tgt, data);
                true
            }
            _ => false,
        }
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterate over edges leaving a node as (target node, edge data) pairs
    pub fn outgoing_edges<'a>(
        &'a self,
        id: &str,
    ) -> impl Iterator<Item = (&'a GraphNode, &'a EdgeData)> + 'a {
        self.node_index_map
            .get(id)
            .copied()
            .into_iter()
            .flat_map(move |idx| {
                self.graph
                    .edges_directed(idx, Direction::Outgoing)
                    .filter_map(move |edge| {
                        self.graph
                            .node_weight(edge.target())
                            .map(|n| (n, edge.weight()))
                    })
            })
    }

    /// Iterate over edges entering a node as (source node, edge data) pairs
    pub fn incoming_edges<'a>(
        &'a self,
        id: &str,
    ) -> impl Iterator<Item = (&'a GraphNode, &'a EdgeData)> + 'a {
        self.node_index_map
            .get(id)
            .copied()
            .into_iter()
            .flat_map(move |idx| {
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .filter_map(move |edge| {
                        self.graph
                            .node_weight(edge.source())
                            .map(|n| (n, edge.weight()))
                    })
            })
    }
}
