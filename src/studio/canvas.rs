use std::collections::BTreeMap;

use crate::graph::filter::{
    FilterState, HighlightOverlay, apply_filter, highlight_matches, visible_edges,
};
use crate::graph::layout::{LayoutDirection, layout_nodes};
use crate::graph::{CoverageMetrics, IssueEdge, IssueGraph, IssueNode, IssueStats, Position};

/// View state for the graph pane: the laid-out graph, the active filter and
/// highlight overlay, and per-node drag offsets. Drag positions are kept
/// separate from the layout so a re-layout never loses them silently.
#[derive(Debug, Default)]
pub struct CanvasState {
    graph: Option<IssueGraph>,
    stats: IssueStats,
    coverage: CoverageMetrics,
    filter: FilterState,
    highlight: Option<HighlightOverlay>,
    direction: LayoutDirection,
    position_overrides: BTreeMap<String, Position>,
}

impl CanvasState {
    pub fn graph(&self) -> Option<&IssueGraph> {
        self.graph.as_ref()
    }

    pub fn stats(&self) -> IssueStats {
        self.stats
    }

    pub fn coverage(&self) -> CoverageMetrics {
        self.coverage
    }

    pub fn direction(&self) -> LayoutDirection {
        self.direction
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut FilterState {
        &mut self.filter
    }

    pub fn highlight(&self) -> Option<&HighlightOverlay> {
        self.highlight.as_ref()
    }

    /// Installs a freshly decoded graph, lays it out for the current
    /// direction, and drops view state that referenced nodes which no longer
    /// exist.
    pub fn set_graph(&mut self, graph: IssueGraph, stats: IssueStats, coverage: CoverageMetrics) {
        self.graph = Some(graph);
        self.stats = stats;
        self.coverage = coverage;
        self.highlight = None;
        self.relayout();
        self.prune_unknown_overrides();
    }

    pub fn set_direction(&mut self, direction: LayoutDirection) {
        if self.direction == direction {
            return;
        }
        self.direction = direction;
        // A direction switch is a full re-layout; manual drag offsets from
        // the old orientation would land in arbitrary places.
        self.position_overrides.clear();
        self.relayout();
    }

    pub fn displayed_nodes(&self) -> Vec<&IssueNode> {
        match &self.graph {
            Some(graph) => apply_filter(&graph.nodes, &self.filter),
            None => Vec::new(),
        }
    }

    pub fn displayed_edges<'a>(&'a self, visible_nodes: &[&IssueNode]) -> Vec<&'a IssueEdge> {
        match &self.graph {
            Some(graph) => visible_edges(&graph.edges, visible_nodes),
            None => Vec::new(),
        }
    }

    /// Layout position with any drag offset applied.
    pub fn position_of(&self, node: &IssueNode) -> Position {
        self.position_overrides
            .get(&node.id)
            .copied()
            .unwrap_or(node.position)
    }

    pub fn drag_node(&mut self, node_id: &str, delta_x: f32, delta_y: f32) {
        let Some(node) = self
            .graph
            .as_ref()
            .and_then(|graph| graph.node_by_id(node_id))
        else {
            return;
        };
        let current = self.position_of(node);
        self.position_overrides.insert(
            node_id.to_owned(),
            Position {
                x: current.x + delta_x,
                y: current.y + delta_y,
            },
        );
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.position_overrides
    }

    pub fn restore_positions(&mut self, positions: BTreeMap<String, Position>) {
        self.position_overrides = positions;
        self.prune_unknown_overrides();
    }

    /// Recomputes the highlight overlay from the current search term.
    /// Returns whether anything matched.
    pub fn apply_highlight(&mut self) -> bool {
        let Some(graph) = &self.graph else {
            self.highlight = None;
            return false;
        };
        self.highlight =
            highlight_matches(&graph.nodes, &graph.edges, self.filter.search_term());
        self.highlight.is_some()
    }

    pub fn clear_highlight(&mut self) {
        self.highlight = None;
    }

    pub fn clear(&mut self) {
        *self = Self {
            direction: self.direction,
            ..Self::default()
        };
    }

    fn relayout(&mut self) {
        if let Some(graph) = &mut self.graph {
            graph.nodes = layout_nodes(&graph.nodes, &graph.edges, self.direction);
        }
    }

    fn prune_unknown_overrides(&mut self) {
        let Some(graph) = &self.graph else {
            self.position_overrides.clear();
            return;
        };
        self.position_overrides
            .retain(|node_id, _| graph.node_by_id(node_id).is_some());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use crate::graph::layout::LayoutDirection;
    use crate::graph::{CoverageMetrics, IssueGraph, IssueStats, NodeKind, Position, RawGraphPayload};

    use super::CanvasState;

    fn sample_graph() -> IssueGraph {
        let payload: RawGraphPayload = serde_json::from_value(json!({
            "nodes": [
                { "id": "1", "type": "central", "data": { "key": "ABC-1", "summary": "central" } },
                { "id": "2", "type": "requirement", "data": { "key": "ABC-2", "summary": "req" } },
                { "id": "3", "type": "test", "data": { "key": "ABC-3", "summary": "test" } }
            ],
            "edges": [
                { "source": "1", "target": "2", "label": "implements" },
                { "source": "2", "target": "3", "label": "is tested by" }
            ]
        }))
        .expect("payload should deserialize");
        IssueGraph::from_payload(payload)
    }

    fn loaded_canvas() -> CanvasState {
        let graph = sample_graph();
        let stats = IssueStats::collect(&graph.nodes);
        let coverage = CoverageMetrics::compute(&stats, &graph.edges);
        let mut canvas = CanvasState::default();
        canvas.set_graph(graph, stats, coverage);
        canvas
    }

    #[test]
    fn set_graph_assigns_layout_positions() {
        let canvas = loaded_canvas();
        let graph = canvas.graph().expect("graph should be present");
        let central = graph.node_by_id("1").expect("central should exist");
        let test = graph.node_by_id("3").expect("test should exist");
        assert!(test.position.y > central.position.y);
    }

    #[test]
    fn drag_offsets_override_layout_positions_and_survive_nothing_else() {
        let mut canvas = loaded_canvas();
        let base = {
            let graph = canvas.graph().expect("graph should be present");
            graph.node_by_id("2").expect("node should exist").position
        };

        canvas.drag_node("2", 40.0, -10.0);
        let node = canvas
            .graph()
            .expect("graph should be present")
            .node_by_id("2")
            .expect("node should exist")
            .clone();
        let dragged = canvas.position_of(&node);
        assert_eq!(dragged.x, base.x + 40.0);
        assert_eq!(dragged.y, base.y - 10.0);

        // Replacing the graph with one that no longer has the node drops the
        // stale override.
        let replacement = IssueGraph::from_payload(
            serde_json::from_value(json!({
                "nodes": [
                    { "id": "9", "type": "central", "data": { "key": "XYZ-9" } }
                ],
                "edges": []
            }))
            .expect("payload should deserialize"),
        );
        let stats = IssueStats::collect(&replacement.nodes);
        let coverage = CoverageMetrics::compute(&stats, &replacement.edges);
        canvas.set_graph(replacement, stats, coverage);
        assert!(canvas.positions().is_empty());
    }

    #[test]
    fn drag_ignores_unknown_nodes() {
        let mut canvas = loaded_canvas();
        canvas.drag_node("ghost", 5.0, 5.0);
        assert!(canvas.positions().is_empty());
    }

    #[test]
    fn displayed_edges_follow_the_filtered_node_set() {
        let mut canvas = loaded_canvas();
        canvas.filter_mut().toggle_kind(NodeKind::Test);

        let nodes = canvas.displayed_nodes();
        assert_eq!(nodes.len(), 2);
        let edges = canvas.displayed_edges(&nodes);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target, "2");
    }

    #[test]
    fn highlight_follows_the_search_term_and_clears() {
        let mut canvas = loaded_canvas();
        canvas.filter_mut().set_search_term("ABC-2");
        assert!(canvas.apply_highlight());
        let overlay = canvas.highlight().expect("overlay should be set");
        assert!(overlay.contains("1"));
        assert!(overlay.contains("2"));
        assert!(overlay.contains("3"));

        canvas.clear_highlight();
        assert!(canvas.highlight().is_none());

        canvas.filter_mut().set_search_term("no-match");
        assert!(!canvas.apply_highlight());
    }

    #[test]
    fn direction_change_relayouts_and_clears_drag_offsets() {
        let mut canvas = loaded_canvas();
        canvas.drag_node("2", 15.0, 15.0);
        let before = canvas
            .graph()
            .expect("graph should be present")
            .node_by_id("3")
            .expect("node should exist")
            .position;

        canvas.set_direction(LayoutDirection::LeftToRight);
        assert!(canvas.positions().is_empty());
        let after = canvas
            .graph()
            .expect("graph should be present")
            .node_by_id("3")
            .expect("node should exist")
            .position;
        assert_ne!(before, after);
    }

    #[test]
    fn restore_positions_keeps_only_known_nodes() {
        let mut canvas = loaded_canvas();
        let mut positions = BTreeMap::new();
        positions.insert("2".to_owned(), Position { x: 1.0, y: 2.0 });
        positions.insert("ghost".to_owned(), Position { x: 9.0, y: 9.0 });

        canvas.restore_positions(positions);
        assert_eq!(canvas.positions().len(), 1);
        assert!(canvas.positions().contains_key("2"));
    }
}
