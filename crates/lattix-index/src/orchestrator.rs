//! Index Orchestrator
//!
//! Owns zero or more named index instances and fans node maintenance out to
//! every index whose declared fields are present in the node's data. The
//! four index kinds sit behind one tagged `Index` enum, so the fan-out loop
//! is a single dispatch rather than per-kind duplication.
//!
//! Maintenance errors are caught per index, reported through the registered
//! error hook (and `tracing`), and re-raised after the fan-out completes;
//! indexes already updated in the same call are NOT rolled back. Removal is
//! fully supported for full-text and composite indexes only; ordered and
//! spatial indexes are repaired via [`IndexOrchestrator::rebuild_indexes`].

use crate::btree::{Comparator, OrderedIndex};
use crate::composite::{CompositeConfig, CompositeIndex};
use crate::error::IndexError;
use crate::fulltext::{FullTextIndex, SearchResult, DEFAULT_SEARCH_LIMIT};
use crate::rtree::{SpatialEntry, SpatialIndex, DEFAULT_MAX_ENTRIES, DEFAULT_MIN_ENTRIES};
use crate::value::{FieldValue, NodeData};
use crate::bbox::BoundingBox;
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

/// Index kind discriminator (stats and error reporting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Ordered,
    FullText,
    Spatial,
    Composite,
}

impl IndexKind {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Ordered => "ordered",
            IndexKind::FullText => "full_text",
            IndexKind::Spatial => "spatial",
            IndexKind::Composite => "composite",
        }
    }
}

/// Mapping from document fields to bounding-box coordinates.
#[derive(Debug, Clone)]
pub struct CoordinateFields {
    pub x_min: String,
    pub y_min: String,
    pub x_max: String,
    pub y_max: String,
}

/// Registration-time description of one index instance.
pub enum IndexDefinition {
    /// Sorted key→id index over one field
    Ordered {
        key_field: String,
        /// B-tree minimum degree `t`
        order: usize,
        /// Custom key order; None uses the natural total order
        comparator: Option<Comparator<FieldValue>>,
    },
    /// Inverted full-text index over the given fields
    FullText {
        fields: Vec<String>,
        default_limit: usize,
    },
    /// R-tree over a coordinate field mapping
    Spatial {
        coordinates: CoordinateFields,
        min_entries: usize,
        max_entries: usize,
    },
    /// Composite multi-field index
    Composite { config: CompositeConfig },
}

impl IndexDefinition {
    /// Ordered index with the default degree and natural key order
    pub fn ordered(key_field: impl Into<String>) -> Self {
        Self::Ordered {
            key_field: key_field.into(),
            order: 16,
            comparator: None,
        }
    }

    /// Ordered index with a custom comparator
    pub fn ordered_with_comparator(
        key_field: impl Into<String>,
        order: usize,
        comparator: Comparator<FieldValue>,
    ) -> Self {
        Self::Ordered {
            key_field: key_field.into(),
            order,
            comparator: Some(comparator),
        }
    }

    /// Full-text index with the default result limit
    pub fn full_text<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::FullText {
            fields: fields.into_iter().map(Into::into).collect(),
            default_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    /// Spatial index with default capacity bounds
    pub fn spatial(coordinates: CoordinateFields) -> Self {
        Self::Spatial {
            coordinates,
            min_entries: DEFAULT_MIN_ENTRIES,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// Composite index from a config
    pub fn composite(config: CompositeConfig) -> Self {
        Self::Composite { config }
    }
}

/// One live index instance behind the common dispatch.
enum Index {
    Ordered {
        key_field: String,
        tree: OrderedIndex<FieldValue, String>,
    },
    FullText {
        fields: Vec<String>,
        default_limit: usize,
        index: FullTextIndex,
    },
    Spatial {
        coordinates: CoordinateFields,
        index: SpatialIndex,
    },
    Composite { index: CompositeIndex },
}

impl Index {
    fn kind(&self) -> IndexKind {
        match self {
            Index::Ordered { .. } => IndexKind::Ordered,
            Index::FullText { .. } => IndexKind::FullText,
            Index::Spatial { .. } => IndexKind::Spatial,
            Index::Composite { .. } => IndexKind::Composite,
        }
    }

    fn entry_count(&self) -> usize {
        match self {
            Index::Ordered { tree, .. } => tree.len(),
            Index::FullText { index, .. } => index.document_count(),
            Index::Spatial { index, .. } => index.len(),
            Index::Composite { index } => index.entry_count(),
        }
    }

    /// Apply an add for `node_id` if the declared fields are present.
    fn add(&mut self, node_id: &str, data: &NodeData) -> Result<(), IndexError> {
        match self {
            Index::Ordered { key_field, tree } => {
                if let Some(value) = data.get(key_field).filter(|v| !v.is_null()) {
                    tree.insert(value.clone(), node_id.to_string());
                }
                Ok(())
            }
            Index::FullText { fields, index, .. } => {
                let texts: BTreeMap<String, String> = fields
                    .iter()
                    .filter_map(|f| {
                        data.get(f)
                            .filter(|v| !v.is_null())
                            .map(|v| (f.clone(), v.to_string()))
                    })
                    .collect();
                if !texts.is_empty() {
                    index.add_document(node_id, &texts);
                }
                Ok(())
            }
            Index::Spatial { coordinates, index } => {
                let coord = |field: &str| data.get(field).and_then(FieldValue::as_f64);
                if let (Some(x_min), Some(y_min), Some(x_max), Some(y_max)) = (
                    coord(&coordinates.x_min),
                    coord(&coordinates.y_min),
                    coord(&coordinates.x_max),
                    coord(&coordinates.y_max),
                ) {
                    index.insert(SpatialEntry::new(
                        BoundingBox::new(x_min, y_min, x_max, y_max),
                        node_id,
                    ));
                }
                Ok(())
            }
            Index::Composite { index } => {
                if index.fields().iter().any(|f| data.contains_key(f)) {
                    index.add_entry(node_id, data)?;
                }
                Ok(())
            }
        }
    }

    fn clear(&mut self) {
        match self {
            Index::Ordered { tree, .. } => tree.clear(),
            Index::FullText { index, .. } => index.clear(),
            Index::Spatial { index, .. } => index.clear(),
            Index::Composite { index } => index.clear(),
        }
    }
}

/// Notification emitted when an index rejects a maintenance operation.
#[derive(Debug, Clone)]
pub struct IndexErrorEvent {
    /// Index that failed
    pub index: String,
    /// Operation that failed ("add_node", "rebuild", ...)
    pub operation: String,
    /// Node involved
    pub node_id: String,
    /// Rendered error
    pub message: String,
}

/// Per-index statistics.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub name: String,
    pub kind: IndexKind,
    pub entries: usize,
}

/// Outcome of a `remove_node` call.
///
/// Ordered and spatial indexes do not support point removal; the ones that
/// may still hold stale entries for the node are listed in
/// `requires_rebuild` so callers can schedule a rebuild instead of silently
/// serving stale hits.
#[derive(Debug, Clone, Default)]
pub struct RemoveReport {
    /// Indexes the node was removed from
    pub removed: Vec<String>,
    /// Indexes that need `rebuild_indexes` to forget the node
    pub requires_rebuild: Vec<String>,
}

/// Supplies the full document set for an index rebuild.
pub trait NodeDataSource {
    /// Produce every (node id, document) pair to index
    fn node_data(&self) -> Result<Vec<(String, NodeData)>, IndexError>;
}

impl<F> NodeDataSource for F
where
    F: Fn() -> Result<Vec<(String, NodeData)>, IndexError>,
{
    fn node_data(&self) -> Result<Vec<(String, NodeData)>, IndexError> {
        self()
    }
}

type ErrorHook = Box<dyn Fn(&IndexErrorEvent) + Send + Sync>;

/// Fan-out maintenance and search over all configured indexes.
#[derive(Default)]
pub struct IndexOrchestrator {
    /// Named indexes, iterated in name order for deterministic fan-out
    indexes: BTreeMap<String, Index>,
    /// Caller-registered error notification hook
    error_hook: Option<ErrorHook>,
}

impl IndexOrchestrator {
    /// Create an orchestrator with no indexes
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an index under a name.
    pub fn register(&mut self, name: impl Into<String>, definition: IndexDefinition) {
        let name = name.into();
        let index = match definition {
            IndexDefinition::Ordered {
                key_field,
                order,
                comparator,
            } => Index::Ordered {
                key_field,
                tree: match comparator {
                    Some(cmp) => OrderedIndex::with_comparator(order, cmp),
                    None => OrderedIndex::new(order),
                },
            },
            IndexDefinition::FullText {
                fields,
                default_limit,
            } => Index::FullText {
                fields,
                default_limit,
                index: FullTextIndex::new(),
            },
            IndexDefinition::Spatial {
                coordinates,
                min_entries,
                max_entries,
            } => Index::Spatial {
                coordinates,
                index: SpatialIndex::new(min_entries, max_entries),
            },
            IndexDefinition::Composite { config } => Index::Composite {
                index: CompositeIndex::new(name.clone(), config),
            },
        };
        self.indexes.insert(name, index);
    }

    /// Register the error notification hook.
    pub fn on_index_error(&mut self, hook: ErrorHook) {
        self.error_hook = Some(hook);
    }

    /// Names of the registered indexes
    pub fn index_names(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }

    fn notify(&self, index: &str, operation: &str, node_id: &str, err: &IndexError) {
        error!(index, operation, node_id, error = %err, "index maintenance failed");
        if let Some(hook) = &self.error_hook {
            hook(&IndexErrorEvent {
                index: index.to_string(),
                operation: operation.to_string(),
                node_id: node_id.to_string(),
                message: err.to_string(),
            });
        }
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Fan a node out to every index whose declared fields are present.
    ///
    /// Best-effort, not transactional: every index is attempted; the first
    /// error is re-raised afterwards, with no rollback of the indexes that
    /// already applied the update.
    pub fn add_node(&mut self, node_id: &str, data: &NodeData) -> Result<(), IndexError> {
        let mut failures: Vec<(String, IndexError)> = Vec::new();

        for (name, index) in self.indexes.iter_mut() {
            if let Err(err) = index.add(node_id, data) {
                failures.push((name.clone(), err));
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        for (name, err) in &failures {
            self.notify(name, "add_node", node_id, err);
        }
        let (_, first) = failures.swap_remove(0);
        Err(first)
    }

    /// Replace a node's index entries (= remove + add).
    pub fn update_node(&mut self, node_id: &str, data: &NodeData) -> Result<RemoveReport, IndexError> {
        let report = self.remove_node(node_id);
        self.add_node(node_id, data)?;
        Ok(report)
    }

    /// Remove a node from every index that supports removal.
    ///
    /// Ordered and spatial indexes do not; they are reported in the result
    /// rather than silently skipped.
    pub fn remove_node(&mut self, node_id: &str) -> RemoveReport {
        let mut report = RemoveReport::default();

        for (name, index) in self.indexes.iter_mut() {
            match index {
                Index::FullText { index, .. } => {
                    index.remove_document(node_id);
                    report.removed.push(name.clone());
                }
                Index::Composite { index } => {
                    index.remove_id(node_id);
                    report.removed.push(name.clone());
                }
                Index::Ordered { .. } | Index::Spatial { .. } => {
                    report.requires_rebuild.push(name.clone());
                }
            }
        }

        if !report.requires_rebuild.is_empty() {
            warn!(
                node_id,
                indexes = ?report.requires_rebuild,
                "removal unsupported; stale entries remain until rebuild_indexes"
            );
        }
        report
    }

    /// Clear and recreate every index from a caller-supplied data provider.
    ///
    /// Returns the number of documents indexed.
    pub fn rebuild_indexes(&mut self, source: &dyn NodeDataSource) -> Result<usize, IndexError> {
        let documents = source.node_data()?;

        for index in self.indexes.values_mut() {
            index.clear();
        }

        let mut indexed = 0;
        for (node_id, data) in &documents {
            self.add_node(node_id, data)?;
            indexed += 1;
        }
        debug!(documents = indexed, "rebuilt indexes");
        Ok(indexed)
    }

    // ========================================================================
    // Search
    // ========================================================================

    fn get(&self, name: &str) -> Result<&Index, IndexError> {
        self.indexes.get(name).ok_or_else(|| IndexError::IndexNotFound {
            index: name.to_string(),
        })
    }

    /// Exact lookup in an ordered index; unknown keys return None.
    pub fn search_btree(&self, name: &str, key: &FieldValue) -> Result<Option<String>, IndexError> {
        match self.get(name)? {
            Index::Ordered { tree, .. } => Ok(tree.search(key).cloned()),
            _ => Err(IndexError::WrongIndexKind {
                index: name.to_string(),
                expected: "ordered",
            }),
        }
    }

    /// Inclusive range scan in an ordered index.
    pub fn range_btree_search(
        &self,
        name: &str,
        start: &FieldValue,
        end: &FieldValue,
    ) -> Result<Vec<(FieldValue, String)>, IndexError> {
        match self.get(name)? {
            Index::Ordered { tree, .. } => Ok(tree
                .range_search(start, end)
                .into_iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            _ => Err(IndexError::WrongIndexKind {
                index: name.to_string(),
                expected: "ordered",
            }),
        }
    }

    /// Ranked full-text search; `limit` defaults to the index's configured limit.
    pub fn full_text_search(
        &self,
        name: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>, IndexError> {
        match self.get(name)? {
            Index::FullText {
                index,
                default_limit,
                ..
            } => Ok(index.search(query, Some(limit.unwrap_or(*default_limit)))),
            _ => Err(IndexError::WrongIndexKind {
                index: name.to_string(),
                expected: "full_text",
            }),
        }
    }

    /// Bounding-box overlap search in a spatial index.
    pub fn spatial_search(
        &self,
        name: &str,
        query: &BoundingBox,
    ) -> Result<Vec<SpatialEntry>, IndexError> {
        match self.get(name)? {
            Index::Spatial { index, .. } => {
                Ok(index.search(query).into_iter().cloned().collect())
            }
            _ => Err(IndexError::WrongIndexKind {
                index: name.to_string(),
                expected: "spatial",
            }),
        }
    }

    /// Partial-key search in a composite index.
    pub fn composite_search(
        &self,
        name: &str,
        partial: &NodeData,
    ) -> Result<Vec<String>, IndexError> {
        match self.get(name)? {
            Index::Composite { index } => Ok(index.search(partial)),
            _ => Err(IndexError::WrongIndexKind {
                index: name.to_string(),
                expected: "composite",
            }),
        }
    }

    /// Per-index entry counts.
    pub fn get_index_stats(&self) -> Vec<IndexStats> {
        self.indexes
            .iter()
            .map(|(name, index)| IndexStats {
                name: name.clone(),
                kind: index.kind(),
                entries: index.entry_count(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::node_data;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn orchestrator() -> IndexOrchestrator {
        let mut o = IndexOrchestrator::new();
        o.register("by_line", IndexDefinition::ordered("line"));
        o.register("content", IndexDefinition::full_text(["name", "text"]));
        o.register(
            "span",
            IndexDefinition::spatial(CoordinateFields {
                x_min: "line".to_string(),
                y_min: "col_start".to_string(),
                x_max: "end_line".to_string(),
                y_max: "col_end".to_string(),
            }),
        );
        o.register(
            "by_lang_kind",
            IndexDefinition::composite(CompositeConfig::new(["lang", "kind"])),
        );
        o
    }

    fn doc(name: &str, line: i64) -> NodeData {
        node_data([
            ("name", FieldValue::from(name)),
            ("text", FieldValue::from(format!("body of {}", name).as_str())),
            ("line", FieldValue::from(line)),
            ("end_line", FieldValue::from(line + 10)),
            ("col_start", FieldValue::from(0i64)),
            ("col_end", FieldValue::from(80i64)),
            ("lang", FieldValue::from("rust")),
            ("kind", FieldValue::from("fn")),
        ])
    }

    #[test]
    fn test_fan_out_reaches_every_index() {
        let mut o = orchestrator();
        o.add_node("n1", &doc("parse_header", 10)).unwrap();
        o.add_node("n2", &doc("emit_footer", 50)).unwrap();

        assert_eq!(
            o.search_btree("by_line", &FieldValue::from(10i64)).unwrap(),
            Some("n1".to_string())
        );
        let range = o
            .range_btree_search("by_line", &FieldValue::from(0i64), &FieldValue::from(20i64))
            .unwrap();
        assert_eq!(range.len(), 1);

        let hits = o.full_text_search("content", "parse", None).unwrap();
        assert_eq!(hits[0].node_id, "n1");

        let spatial = o
            .spatial_search("span", &BoundingBox::new(9.0, 0.0, 11.0, 100.0))
            .unwrap();
        assert!(spatial.iter().any(|e| e.node_id == "n1"));

        let ids = o
            .composite_search("by_lang_kind", &node_data([("lang", "rust")]))
            .unwrap();
        assert_eq!(ids, vec!["n1".to_string(), "n2".to_string()]);

        for stat in o.get_index_stats() {
            assert_eq!(stat.entries, 2, "index {} missed a node", stat.name);
        }
    }

    #[test]
    fn test_partial_documents_skip_absent_indexes() {
        let mut o = orchestrator();
        // No coordinates, no composite fields
        o.add_node("n1", &node_data([("name", "lonely"), ("text", "no spans here")]))
            .unwrap();

        let stats: BTreeMap<String, usize> = o
            .get_index_stats()
            .into_iter()
            .map(|s| (s.name, s.entries))
            .collect();
        assert_eq!(stats["content"], 1);
        assert_eq!(stats["span"], 0);
        assert_eq!(stats["by_lang_kind"], 0);
        assert_eq!(stats["by_line"], 0);
    }

    #[test]
    fn test_error_hook_fires_and_error_is_reraised() {
        let mut o = IndexOrchestrator::new();
        o.register(
            "uniq",
            IndexDefinition::composite(CompositeConfig::new(["lang", "kind"]).unique()),
        );
        o.register("content", IndexDefinition::full_text(["name"]));

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        o.on_index_error(Box::new(move |event| {
            assert_eq!(event.index, "uniq");
            assert_eq!(event.operation, "add_node");
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let data = node_data([("lang", "ts"), ("kind", "fn"), ("name", "thing")]);
        o.add_node("n1", &data).unwrap();

        let err = o.add_node("n2", &data).unwrap_err();
        assert!(matches!(err, IndexError::ConstraintViolation { .. }));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Best-effort: the full-text index still indexed n2
        let hits = o.full_text_search("content", "thing", None).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_remove_node_reports_unsupported_indexes() {
        let mut o = orchestrator();
        o.add_node("n1", &doc("victim", 5)).unwrap();

        let report = o.remove_node("n1");
        assert_eq!(
            report.removed,
            vec!["by_lang_kind".to_string(), "content".to_string()]
        );
        assert_eq!(
            report.requires_rebuild,
            vec!["by_line".to_string(), "span".to_string()]
        );

        // Supported indexes forgot the node; unsupported ones still hold it
        assert!(o.full_text_search("content", "victim", None).unwrap().is_empty());
        assert_eq!(
            o.search_btree("by_line", &FieldValue::from(5i64)).unwrap(),
            Some("n1".to_string())
        );
    }

    #[test]
    fn test_update_node_swaps_entries() {
        let mut o = orchestrator();
        o.add_node("n1", &doc("before_name", 5)).unwrap();
        o.update_node("n1", &doc("after_name", 5)).unwrap();

        assert!(o.full_text_search("content", "before", None).unwrap().is_empty());
        assert_eq!(
            o.full_text_search("content", "after", None).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_rebuild_clears_stale_entries() {
        let mut o = orchestrator();
        o.add_node("n1", &doc("stale", 5)).unwrap();
        o.add_node("n2", &doc("kept", 9)).unwrap();
        o.remove_node("n1");

        // by_line still knows n1 until the rebuild
        assert!(o.search_btree("by_line", &FieldValue::from(5i64)).unwrap().is_some());

        let survivors = vec![("n2".to_string(), doc("kept", 9))];
        let provider = move || -> Result<Vec<(String, NodeData)>, IndexError> {
            Ok(survivors.clone())
        };
        let indexed = o.rebuild_indexes(&provider).unwrap();
        assert_eq!(indexed, 1);

        assert_eq!(o.search_btree("by_line", &FieldValue::from(5i64)).unwrap(), None);
        assert_eq!(
            o.search_btree("by_line", &FieldValue::from(9i64)).unwrap(),
            Some("n2".to_string())
        );
        for stat in o.get_index_stats() {
            assert_eq!(stat.entries, 1);
        }
    }

    #[test]
    fn test_registered_custom_comparator_reverses_ranges() {
        let mut o = IndexOrchestrator::new();
        o.register(
            "by_line_desc",
            IndexDefinition::ordered_with_comparator(
                "line",
                4,
                Arc::new(|a: &FieldValue, b: &FieldValue| b.cmp(a)),
            ),
        );
        for i in 0..10i64 {
            o.add_node(&format!("n{}", i), &node_data([("line", FieldValue::from(i))]))
                .unwrap();
        }

        let hits = o
            .range_btree_search(
                "by_line_desc",
                &FieldValue::from(7i64),
                &FieldValue::from(4i64),
            )
            .unwrap();
        let keys: Vec<i64> = hits
            .iter()
            .filter_map(|(k, _)| k.as_f64().map(|f| f as i64))
            .collect();
        assert_eq!(keys, vec![7, 6, 5, 4]);
    }

    #[test]
    fn test_unknown_index_and_wrong_kind() {
        let o = orchestrator();
        assert!(matches!(
            o.search_btree("nope", &FieldValue::from(1i64)),
            Err(IndexError::IndexNotFound { .. })
        ));
        assert!(matches!(
            o.full_text_search("by_line", "query", None),
            Err(IndexError::WrongIndexKind { .. })
        ));
    }

    #[test]
    fn test_provider_failure_propagates() {
        let mut o = orchestrator();
        let provider = || -> Result<Vec<(String, NodeData)>, IndexError> {
            Err(IndexError::provider("backend offline"))
        };
        let err = o.rebuild_indexes(&provider).unwrap_err();
        assert!(matches!(err, IndexError::Provider { .. }));
    }
}
