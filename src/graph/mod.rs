use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::issue::Description;

pub mod filter;
pub mod layout;

/// Category assigned to an issue while the proxy walks outward from the
/// central issue. Unknown categories from the wire fall back to `Related`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Central,
    Parent,
    Requirement,
    Test,
    Defect,
    Related,
}

pub const ALL_NODE_KINDS: [NodeKind; 6] = [
    NodeKind::Central,
    NodeKind::Parent,
    NodeKind::Requirement,
    NodeKind::Test,
    NodeKind::Defect,
    NodeKind::Related,
];

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Central => "central",
            Self::Parent => "parent",
            Self::Requirement => "requirement",
            Self::Test => "test",
            Self::Defect => "defect",
            Self::Related => "related",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "central" => Self::Central,
            "parent" => Self::Parent,
            "requirement" => Self::Requirement,
            "test" => Self::Test,
            "defect" => Self::Defect,
            _ => Self::Related,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IssueSummary {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub issue_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub reporter: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub connected_issues: Option<u32>,
    #[serde(default)]
    pub description: Description,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub data: IssueSummary,
    #[serde(default)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

impl IssueEdge {
    pub fn category(&self) -> RelationCategory {
        relation_category(self.label.as_deref())
    }
}

/// Relationship bucket derived from the link label, used for edge styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationCategory {
    Blocking,
    Verification,
    Implementation,
    Other,
}

pub fn relation_category(label: Option<&str>) -> RelationCategory {
    let Some(label) = label else {
        return RelationCategory::Other;
    };
    let lower = label.to_ascii_lowercase();
    if lower.contains("block") || lower.contains("depend") {
        RelationCategory::Blocking
    } else if lower.contains("test") || lower.contains("verif") {
        RelationCategory::Verification
    } else if lower.contains("implement") || lower.contains("requir") {
        RelationCategory::Implementation
    } else {
        RelationCategory::Other
    }
}

fn edge_is_animated(label: Option<&str>) -> bool {
    relation_category(label) == RelationCategory::Blocking
}

/// Raw visualize payload as the proxy sends it. Entries are kept loose so a
/// malformed element can be skipped instead of failing the whole decode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGraphPayload {
    #[serde(default)]
    pub nodes: Vec<serde_json::Value>,
    #[serde(default)]
    pub edges: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WireNode {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Option<IssueSummary>,
    #[serde(default)]
    position: Option<Position>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WireEdge {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IssueGraph {
    pub nodes: Vec<IssueNode>,
    pub edges: Vec<IssueEdge>,
}

impl IssueGraph {
    /// Decodes a proxy payload, dropping entries that cannot be used: null or
    /// non-object elements, nodes without an id or data block, duplicate ids,
    /// and edges whose endpoints are not both present in the decoded node set.
    pub fn from_payload(payload: RawGraphPayload) -> Self {
        let mut nodes = Vec::with_capacity(payload.nodes.len());
        let mut seen_ids = BTreeSet::new();

        for value in payload.nodes {
            let wire: WireNode = match serde_json::from_value(value) {
                Ok(wire) => wire,
                Err(error) => {
                    warn!(%error, "skipping malformed graph node entry");
                    continue;
                }
            };
            let Some(id) = wire.id.filter(|id| !id.is_empty()) else {
                warn!("skipping graph node without an id");
                continue;
            };
            let Some(data) = wire.data else {
                warn!(node_id = %id, "skipping graph node without a data block");
                continue;
            };
            if !seen_ids.insert(id.clone()) {
                warn!(node_id = %id, "skipping duplicate graph node");
                continue;
            }

            nodes.push(IssueNode {
                id,
                kind: NodeKind::parse(wire.kind.as_deref().unwrap_or_default()),
                data,
                position: wire.position.unwrap_or_default(),
            });
        }

        let mut edges = Vec::with_capacity(payload.edges.len());
        for value in payload.edges {
            let wire: WireEdge = match serde_json::from_value(value) {
                Ok(wire) => wire,
                Err(error) => {
                    warn!(%error, "skipping malformed graph edge entry");
                    continue;
                }
            };
            let (Some(source), Some(target)) = (
                wire.source.filter(|id| !id.is_empty()),
                wire.target.filter(|id| !id.is_empty()),
            ) else {
                warn!("skipping graph edge without both endpoints");
                continue;
            };
            if !seen_ids.contains(&source) || !seen_ids.contains(&target) {
                warn!(%source, %target, "skipping graph edge with unknown endpoint");
                continue;
            }

            let animated = edge_is_animated(wire.label.as_deref());
            edges.push(IssueEdge {
                id: wire
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("e{source}-{target}")),
                source,
                target,
                label: wire.label,
                animated,
            });
        }

        Self { nodes, edges }
    }

    /// Edges touching the given node, with the id of the far endpoint.
    pub fn connections_of<'a>(&'a self, node_id: &str) -> Vec<(&'a IssueEdge, &'a str)> {
        self.edges
            .iter()
            .filter_map(|edge| {
                if edge.source == node_id {
                    Some((edge, edge.target.as_str()))
                } else if edge.target == node_id {
                    Some((edge, edge.source.as_str()))
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn node_by_id(&self, node_id: &str) -> Option<&IssueNode> {
        self.nodes.iter().find(|node| node.id == node_id)
    }

    pub fn node_by_key(&self, key: &str) -> Option<&IssueNode> {
        self.nodes.iter().find(|node| node.data.key == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IssueStats {
    pub total: usize,
    pub requirements: usize,
    pub tests: usize,
    pub defects: usize,
    pub other: usize,
}

impl IssueStats {
    pub fn collect(nodes: &[IssueNode]) -> Self {
        let mut stats = Self::default();
        for node in nodes {
            stats.total += 1;
            match node.kind {
                NodeKind::Requirement => stats.requirements += 1,
                NodeKind::Test => stats.tests += 1,
                NodeKind::Defect => stats.defects += 1,
                NodeKind::Central => {}
                NodeKind::Parent | NodeKind::Related => stats.other += 1,
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CoverageMetrics {
    /// Tests per requirement, as a percentage. `None` when there are no
    /// requirements to cover.
    pub test_coverage_ratio: Option<f64>,
    /// Defects per test, as a percentage. `None` when there are no tests.
    pub defect_rate: Option<f64>,
    pub total_relationships: usize,
    pub average_connections: f64,
}

impl CoverageMetrics {
    pub fn compute(stats: &IssueStats, edges: &[IssueEdge]) -> Self {
        let test_coverage_ratio = (stats.requirements > 0)
            .then(|| stats.tests as f64 / stats.requirements as f64 * 100.0);
        let defect_rate =
            (stats.tests > 0).then(|| stats.defects as f64 / stats.tests as f64 * 100.0);
        let average_connections = if stats.total > 0 {
            edges.len() as f64 / stats.total as f64
        } else {
            0.0
        };

        Self {
            test_coverage_ratio,
            defect_rate,
            total_relationships: edges.len(),
            average_connections,
        }
    }
}
