//! Lattix Index - Multi-index querying for partitioned knowledge graphs
//!
//! This crate provides the four index structures behind one maintenance
//! API, plus the engine facade wiring them to `lattix-core`'s partition
//! manager:
//!
//! - **Ordered** (B-tree): sorted key→id lookups and range scans
//! - **Full-text** (inverted index): tokenized fields, TF-IDF ranking
//! - **Spatial** (R-tree): bounding-box insert and overlap search
//! - **Composite**: multi-field exact and partial-key match
//!
//! # Example
//!
//! ```
//! use lattix_index::{IndexDefinition, IndexOrchestrator, node_data};
//!
//! let mut orchestrator = IndexOrchestrator::new();
//! orchestrator.register("content", IndexDefinition::full_text(["name", "text"]));
//!
//! orchestrator
//!     .add_node("src/fox.rs:run", &node_data([("name", "run"), ("text", "fast red fox")]))
//!     .unwrap();
//! let hits = orchestrator.full_text_search("content", "fox", None).unwrap();
//! assert_eq!(hits[0].node_id, "src/fox.rs:run");
//! ```

pub mod bbox;
pub mod btree;
pub mod composite;
pub mod engine;
pub mod error;
pub mod fulltext;
pub mod orchestrator;
pub mod rtree;
pub mod value;

// Re-exports for convenience
pub use bbox::BoundingBox;
pub use btree::{Comparator, OrderedIndex};
pub use composite::{CompositeConfig, CompositeIndex};
pub use engine::{node_document, EngineError, GraphEngine};
pub use error::IndexError;
pub use fulltext::{tokenize, FieldMatch, FullTextIndex, InvertedEntry, SearchResult};
pub use orchestrator::{
    CoordinateFields, IndexDefinition, IndexErrorEvent, IndexKind, IndexOrchestrator, IndexStats,
    NodeDataSource, RemoveReport,
};
pub use rtree::{SpatialEntry, SpatialIndex};
pub use value::{node_data, FieldValue, NodeData};
