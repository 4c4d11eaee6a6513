use std::collections::BTreeSet;

use super::{ALL_NODE_KINDS, IssueEdge, IssueNode, NodeKind};

pub const DIMMED_OPACITY: f32 = 0.25;
pub const FULL_OPACITY: f32 = 1.0;

/// Active node-kind filter plus the free-text search term. Defaults to every
/// kind selected and no term, which displays the whole graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    selected_kinds: BTreeSet<NodeKind>,
    search_term: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            selected_kinds: ALL_NODE_KINDS.into_iter().collect(),
            search_term: String::new(),
        }
    }
}

impl FilterState {
    pub fn is_selected(&self, kind: NodeKind) -> bool {
        self.selected_kinds.contains(&kind)
    }

    pub fn toggle_kind(&mut self, kind: NodeKind) {
        if !self.selected_kinds.remove(&kind) {
            self.selected_kinds.insert(kind);
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn clear_search_term(&mut self) {
        self.search_term.clear();
    }
}

/// Nodes whose kind is selected and which match the search term across
/// key, summary, status, and issue type (case-insensitive).
pub fn apply_filter<'a>(nodes: &'a [IssueNode], state: &FilterState) -> Vec<&'a IssueNode> {
    let term = state.search_term.trim().to_ascii_lowercase();
    nodes
        .iter()
        .filter(|node| state.is_selected(node.kind))
        .filter(|node| term.is_empty() || summary_matches(node, &term))
        .collect()
}

/// Edge visibility is always derived from node visibility: an edge is shown
/// only when both endpoints are in the displayed set.
pub fn visible_edges<'a>(edges: &'a [IssueEdge], visible_nodes: &[&IssueNode]) -> Vec<&'a IssueEdge> {
    let visible_ids: BTreeSet<&str> = visible_nodes.iter().map(|node| node.id.as_str()).collect();
    edges
        .iter()
        .filter(|edge| {
            visible_ids.contains(edge.source.as_str()) && visible_ids.contains(edge.target.as_str())
        })
        .collect()
}

fn summary_matches(node: &IssueNode, lowered_term: &str) -> bool {
    let data = &node.data;
    [
        data.key.as_str(),
        data.summary.as_str(),
        data.status.as_str(),
        data.issue_type.as_str(),
    ]
    .iter()
    .any(|field| field.to_ascii_lowercase().contains(lowered_term))
}

/// Cosmetic overlay marking search matches and their direct neighbors. It
/// never alters the node or edge sets; everything outside the highlighted set
/// is rendered dimmed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HighlightOverlay {
    highlighted: BTreeSet<String>,
}

impl HighlightOverlay {
    pub fn contains(&self, node_id: &str) -> bool {
        self.highlighted.contains(node_id)
    }

    pub fn len(&self) -> usize {
        self.highlighted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlighted.is_empty()
    }

    pub fn opacity_for(&self, node_id: &str) -> f32 {
        if self.contains(node_id) {
            FULL_OPACITY
        } else {
            DIMMED_OPACITY
        }
    }
}

/// Computes the highlight set for a term: nodes whose key or summary match,
/// expanded one hop along every edge touching a match. Returns `None` when the
/// term is blank or nothing matches, leaving the display unchanged.
pub fn highlight_matches(
    nodes: &[IssueNode],
    edges: &[IssueEdge],
    term: &str,
) -> Option<HighlightOverlay> {
    let term = term.trim().to_ascii_lowercase();
    if term.is_empty() {
        return None;
    }

    let mut highlighted: BTreeSet<String> = nodes
        .iter()
        .filter(|node| {
            node.data.key.to_ascii_lowercase().contains(&term)
                || node.data.summary.to_ascii_lowercase().contains(&term)
        })
        .map(|node| node.id.clone())
        .collect();
    if highlighted.is_empty() {
        return None;
    }

    let matches = highlighted.clone();
    for edge in edges {
        if matches.contains(&edge.source) || matches.contains(&edge.target) {
            highlighted.insert(edge.source.clone());
            highlighted.insert(edge.target.clone());
        }
    }

    Some(HighlightOverlay { highlighted })
}

#[cfg(test)]
mod tests {
    use crate::graph::{IssueEdge, IssueNode, IssueSummary, NodeKind, Position};

    use super::{
        DIMMED_OPACITY, FULL_OPACITY, FilterState, apply_filter, highlight_matches, visible_edges,
    };

    fn node(id: &str, kind: NodeKind, key: &str, summary: &str) -> IssueNode {
        IssueNode {
            id: id.to_owned(),
            kind,
            data: IssueSummary {
                key: key.to_owned(),
                summary: summary.to_owned(),
                issue_type: "Story".to_owned(),
                status: "Open".to_owned(),
                ..IssueSummary::default()
            },
            position: Position::default(),
        }
    }

    fn edge(source: &str, target: &str) -> IssueEdge {
        IssueEdge {
            id: format!("e{source}-{target}"),
            source: source.to_owned(),
            target: target.to_owned(),
            label: None,
            animated: false,
        }
    }

    fn sample_nodes() -> Vec<IssueNode> {
        vec![
            node("1", NodeKind::Central, "ABC-1", "Login flow"),
            node("2", NodeKind::Requirement, "ABC-2", "Password reset"),
            node("3", NodeKind::Test, "ABC-3", "Verify login"),
            node("4", NodeKind::Defect, "ABC-4", "Crash on submit"),
        ]
    }

    #[test]
    fn default_filter_selects_every_kind() {
        let nodes = sample_nodes();
        let state = FilterState::default();
        assert_eq!(apply_filter(&nodes, &state).len(), nodes.len());
    }

    #[test]
    fn toggling_a_kind_removes_and_restores_it() {
        let nodes = sample_nodes();
        let mut state = FilterState::default();

        state.toggle_kind(NodeKind::Defect);
        let without_defects = apply_filter(&nodes, &state);
        assert_eq!(without_defects.len(), 3);
        assert!(without_defects.iter().all(|node| node.kind != NodeKind::Defect));

        state.toggle_kind(NodeKind::Defect);
        assert_eq!(apply_filter(&nodes, &state).len(), 4);
    }

    #[test]
    fn search_matches_key_summary_status_and_issue_type() {
        let nodes = sample_nodes();
        let mut state = FilterState::default();

        state.set_search_term("abc-2");
        assert_eq!(apply_filter(&nodes, &state).len(), 1);

        state.set_search_term("LOGIN");
        assert_eq!(apply_filter(&nodes, &state).len(), 2);

        state.set_search_term("open");
        assert_eq!(apply_filter(&nodes, &state).len(), 4);

        state.set_search_term("story");
        assert_eq!(apply_filter(&nodes, &state).len(), 4);

        state.set_search_term("nothing-matches-this");
        assert!(apply_filter(&nodes, &state).is_empty());
    }

    #[test]
    fn filtering_twice_with_the_same_state_is_idempotent() {
        let nodes = sample_nodes();
        let mut state = FilterState::default();
        state.toggle_kind(NodeKind::Test);
        state.set_search_term("abc");

        let first: Vec<String> = apply_filter(&nodes, &state)
            .iter()
            .map(|node| node.id.clone())
            .collect();
        let second: Vec<String> = apply_filter(&nodes, &state)
            .iter()
            .map(|node| node.id.clone())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn edges_require_both_endpoints_visible() {
        let nodes = sample_nodes();
        let edges = vec![edge("1", "2"), edge("2", "3"), edge("3", "4")];
        let mut state = FilterState::default();
        state.toggle_kind(NodeKind::Defect);

        let visible = apply_filter(&nodes, &state);
        let shown = visible_edges(&edges, &visible);
        assert_eq!(shown.len(), 2);
        assert!(shown.iter().all(|edge| edge.target != "4"));
    }

    #[test]
    fn highlight_marks_single_match_and_exactly_its_neighbors() {
        let nodes = sample_nodes();
        let edges = vec![edge("1", "2"), edge("2", "3"), edge("3", "4")];

        let overlay = highlight_matches(&nodes, &edges, "password")
            .expect("term should match ABC-2");
        assert!(overlay.contains("2"));
        assert!(overlay.contains("1"));
        assert!(overlay.contains("3"));
        assert!(!overlay.contains("4"));
        assert_eq!(overlay.len(), 3);
    }

    #[test]
    fn highlight_assigns_reduced_opacity_outside_the_set() {
        let nodes = sample_nodes();
        let edges = vec![edge("1", "2")];

        let overlay =
            highlight_matches(&nodes, &edges, "ABC-1").expect("term should match ABC-1");
        assert_eq!(overlay.opacity_for("1"), FULL_OPACITY);
        assert_eq!(overlay.opacity_for("4"), DIMMED_OPACITY);
    }

    #[test]
    fn highlight_returns_none_for_blank_or_unmatched_terms() {
        let nodes = sample_nodes();
        assert!(highlight_matches(&nodes, &[], "   ").is_none());
        assert!(highlight_matches(&nodes, &[], "zzz").is_none());
    }

    #[test]
    fn highlight_does_not_chain_beyond_one_hop() {
        let nodes = vec![
            node("1", NodeKind::Central, "ABC-1", "root"),
            node("2", NodeKind::Related, "ABC-2", "middle"),
            node("3", NodeKind::Related, "ABC-3", "far"),
        ];
        let edges = vec![edge("1", "2"), edge("2", "3")];

        let overlay = highlight_matches(&nodes, &edges, "root").expect("root should match");
        assert!(overlay.contains("1"));
        assert!(overlay.contains("2"));
        assert!(!overlay.contains("3"), "two hops away should stay dimmed");
    }
}
