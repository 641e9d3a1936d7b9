//! Engine Integration Tests
//!
//! End-to-end coverage of the index orchestrator wired to the partition
//! manager: indexing across partition loads and evictions, query fan-in
//! across all four index kinds, and rebuild after removal.

use std::sync::Arc;

use anyhow::Result;
use pretty_assertions::assert_eq;
use lattix_core::{
    EdgeType, GraphEdge, GraphNode, MemoryConfig, MemoryStore, NodeKind, PartitionConfig,
    PartitionManager, PartitionStrategy, ProjectContext,
};
use lattix_index::{
    node_data, BoundingBox, CompositeConfig, CoordinateFields, FieldValue, GraphEngine,
    IndexDefinition, IndexOrchestrator,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// A small project: auth and render modules in Rust, a TypeScript frontend.
fn sample_nodes() -> Vec<GraphNode> {
    vec![
        GraphNode::new("src/auth.rs:login", "login", NodeKind::Callable)
            .with_location("src/auth.rs", 10, 42)
            .with_language("rust")
            .with_module("auth")
            .with_text("verify password hash and issue session token"),
        GraphNode::new("src/auth.rs:logout", "logout", NodeKind::Callable)
            .with_location("src/auth.rs", 50, 61)
            .with_language("rust")
            .with_module("auth")
            .with_text("revoke session token"),
        GraphNode::new("src/render.rs:draw", "draw", NodeKind::Callable)
            .with_location("src/render.rs", 5, 120)
            .with_language("rust")
            .with_module("render")
            .with_text("rasterize scene graph layers"),
        GraphNode::new("web/app.ts:mount", "mount", NodeKind::Callable)
            .with_location("web/app.ts", 1, 33)
            .with_language("typescript")
            .with_module("frontend")
            .with_text("mount application shell"),
        GraphNode::new("web/app.ts:State", "State", NodeKind::Data)
            .with_location("web/app.ts", 40, 55)
            .with_language("typescript")
            .with_module("frontend")
            .with_text("session token cache"),
    ]
}

fn sample_edges() -> Vec<GraphEdge> {
    vec![
        GraphEdge::new("src/auth.rs:login", "src/auth.rs:logout", EdgeType::Uses).with_ref_line(20),
        GraphEdge::new("web/app.ts:mount", "src/auth.rs:login", EdgeType::Uses).with_ref_line(12),
        GraphEdge::new("web/app.ts:mount", "web/app.ts:State", EdgeType::Defines),
    ]
}

fn build_engine(memory: MemoryConfig) -> GraphEngine {
    let manager = PartitionManager::new(
        Arc::new(MemoryStore::new()),
        PartitionConfig::default(),
        memory,
    );

    let mut orchestrator = IndexOrchestrator::new();
    orchestrator.register("by_line", IndexDefinition::ordered("line"));
    orchestrator.register("content", IndexDefinition::full_text(["name", "text"]));
    orchestrator.register(
        "span",
        IndexDefinition::spatial(CoordinateFields {
            x_min: "line".to_string(),
            y_min: "line".to_string(),
            x_max: "end_line".to_string(),
            y_max: "end_line".to_string(),
        }),
    );
    orchestrator.register(
        "by_lang_kind",
        IndexDefinition::composite(CompositeConfig::new(["language", "kind"])),
    );

    GraphEngine::new(manager, orchestrator)
}

fn partition_sample(engine: &GraphEngine) -> Result<()> {
    engine.manager().partition_graph_with_strategy(
        &sample_nodes(),
        &sample_edges(),
        &[],
        &ProjectContext::default(),
        PartitionStrategy::Directory,
    )?;
    Ok(())
}

fn index_everything(engine: &GraphEngine) -> Result<usize> {
    let mut total = 0;
    for pid in engine.manager().partition_ids() {
        total += engine.index_partition(&pid)?;
    }
    Ok(total)
}

// ============================================================================
// Cross-Index Queries
// ============================================================================

#[test]
fn all_four_indexes_answer_after_full_indexing() -> Result<()> {
    let engine = build_engine(MemoryConfig::default());
    partition_sample(&engine)?;
    assert_eq!(index_everything(&engine)?, 5);

    // Ordered: point and range
    assert_eq!(
        engine.search_btree("by_line", &FieldValue::from(10usize))?,
        Some("src/auth.rs:login".to_string())
    );
    let in_range = engine.range_btree_search(
        "by_line",
        &FieldValue::from(1usize),
        &FieldValue::from(10usize),
    )?;
    let mut range_ids: Vec<&str> = in_range.iter().map(|(_, id)| id.as_str()).collect();
    range_ids.sort_unstable();
    assert_eq!(
        range_ids,
        vec!["src/auth.rs:login", "src/render.rs:draw", "web/app.ts:mount"]
    );

    // Full-text: "session" appears in three nodes, "rasterize" in one
    let session = engine.full_text_search("content", "session", None)?;
    assert_eq!(session.len(), 3);
    assert!(session.iter().all(|r| r.score > 0.0));
    let raster = engine.full_text_search("content", "rasterize", None)?;
    assert_eq!(raster.len(), 1);
    assert_eq!(raster[0].node_id, "src/render.rs:draw");

    // Spatial: line-span boxes overlapping lines 40..60
    let spans = engine.spatial_search("span", &BoundingBox::new(40.0, 40.0, 60.0, 60.0))?;
    let mut span_ids: Vec<&str> = spans.iter().map(|e| e.node_id.as_str()).collect();
    span_ids.sort_unstable();
    assert_eq!(
        span_ids,
        vec![
            "src/auth.rs:login",
            "src/auth.rs:logout",
            "src/render.rs:draw",
            "web/app.ts:State"
        ]
    );

    // Composite: language partial match
    assert_eq!(
        engine.composite_search("by_lang_kind", &node_data([("language", "typescript")]))?,
        vec!["web/app.ts:State".to_string(), "web/app.ts:mount".to_string()]
    );
    assert_eq!(
        engine.composite_search(
            "by_lang_kind",
            &node_data([("language", "typescript"), ("kind", "Data")])
        )?,
        vec!["web/app.ts:State".to_string()]
    );

    Ok(())
}

// ============================================================================
// Indexing Across Eviction
// ============================================================================

#[test]
fn indexing_survives_partition_eviction() -> Result<()> {
    // Budget of one byte: every load pushes everything else out
    let config = MemoryConfig {
        max_memory_usage: 1,
        eviction_target_fraction: 0.0,
        min_loaded_partitions: 0,
        ..MemoryConfig::default()
    };
    let engine = build_engine(config);
    partition_sample(&engine)?;

    engine.manager().evict_partitions()?;
    assert_eq!(engine.manager().memory_stats().loaded_partitions, 0);

    // index_partition reloads transparently, one partition at a time
    assert_eq!(index_everything(&engine)?, 5);

    // Queries serve from the indexes even though partitions evicted again
    let hits = engine.full_text_search("content", "token", None)?;
    assert_eq!(hits.len(), 3);

    // Graph access still round-trips through the store
    let node = engine.manager().get_node("src/render.rs:draw")?.unwrap();
    assert_eq!(node.module.as_deref(), Some("render"));

    Ok(())
}

#[test]
fn cross_partition_edges_survive_eviction() -> Result<()> {
    let config = MemoryConfig {
        max_memory_usage: 1,
        eviction_target_fraction: 0.0,
        min_loaded_partitions: 0,
        ..MemoryConfig::default()
    };
    let engine = build_engine(config);
    partition_sample(&engine)?;

    // mount (web) -> login (src) is the only cross-partition edge
    assert_eq!(engine.manager().cross_ref_count(), 1);

    engine.manager().evict_partitions()?;

    let outgoing = engine.manager().get_outgoing_edges("web/app.ts:mount")?;
    let targets: Vec<&str> = outgoing.iter().map(|(n, _)| n.id.as_str()).collect();
    assert!(targets.contains(&"src/auth.rs:login"));
    assert!(targets.contains(&"web/app.ts:State"));

    Ok(())
}

// ============================================================================
// Removal and Rebuild
// ============================================================================

#[test]
fn remove_then_rebuild_clears_stale_index_entries() -> Result<()> {
    let engine = build_engine(MemoryConfig::default());
    partition_sample(&engine)?;
    index_everything(&engine)?;

    let report = engine.remove_node("src/auth.rs:login");
    assert_eq!(report.removed.len(), 2);
    assert_eq!(report.requires_rebuild.len(), 2);

    // Full-text forgot it; the ordered index still holds the stale entry
    assert!(engine
        .full_text_search("content", "password", None)?
        .is_empty());
    assert_eq!(
        engine.search_btree("by_line", &FieldValue::from(10usize))?,
        Some("src/auth.rs:login".to_string())
    );

    // Drop the node from its partition's world view by rebuilding from the
    // (unchanged) partition table: the node is still in the graph, so it
    // comes back; this asserts rebuild reflects the table exactly.
    let indexed = engine.rebuild_indexes()?;
    assert_eq!(indexed, 5);
    assert_eq!(
        engine.full_text_search("content", "password", None)?.len(),
        1
    );

    for stat in engine.get_index_stats() {
        assert_eq!(stat.entries, 5, "index {} out of sync", stat.name);
    }
    Ok(())
}

// ============================================================================
// Unique Composite Constraint Through the Engine
// ============================================================================

#[test]
fn unique_composite_violation_surfaces_through_engine() -> Result<()> {
    let engine = build_engine(MemoryConfig::default());
    engine.register_index(
        "unique_name",
        IndexDefinition::composite(CompositeConfig::new(["name"]).unique()),
    );
    partition_sample(&engine)?;

    // Two distinct nodes named differently index fine
    assert!(engine.index_node("src/auth.rs:login")?);
    assert!(engine.index_node("src/auth.rs:logout")?);

    // A second node with a colliding name violates the constraint
    let mut clash = sample_nodes();
    clash.push(
        GraphNode::new("src/other.rs:login", "login", NodeKind::Callable)
            .with_location("src/other.rs", 1, 5)
            .with_language("rust"),
    );
    engine.manager().partition_graph_with_strategy(
        &clash,
        &[],
        &[],
        &ProjectContext::default(),
        PartitionStrategy::Directory,
    )?;

    engine.index_node("src/auth.rs:login")?;
    let err = engine.index_node("src/other.rs:login").unwrap_err();
    assert!(err.to_string().contains("unique_name"));
    Ok(())
}
