use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::{Result, anyhow};

use super::{IssueEdge, IssueNode, Position};

pub const NODE_WIDTH: f32 = 250.0;
pub const NODE_HEIGHT: f32 = 120.0;
const RANK_SEPARATION: f32 = 80.0;
const NODE_SEPARATION: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutDirection {
    #[default]
    TopToBottom,
    LeftToRight,
}

impl LayoutDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopToBottom => "TB",
            Self::LeftToRight => "LR",
        }
    }
}

impl Display for LayoutDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutDirection {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TB" => Ok(Self::TopToBottom),
            "LR" => Ok(Self::LeftToRight),
            other => Err(anyhow!(
                "invalid layout direction `{other}`; expected `TB` or `LR`"
            )),
        }
    }
}

/// Assigns layered positions to the given nodes: connected nodes are separated
/// by rank along the layout direction, nodes within a rank are spread on the
/// cross axis with a fixed footprint, and each rank is centered against the
/// widest one. Pure function over its inputs; a node the ranking cannot place
/// keeps its previous position.
pub fn layout_nodes(
    nodes: &[IssueNode],
    edges: &[IssueEdge],
    direction: LayoutDirection,
) -> Vec<IssueNode> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let mut ranks = BTreeMap::<&str, usize>::new();
    for node in nodes {
        ranks.entry(node.id.as_str()).or_insert(0);
    }

    // Longest-path ranking, bounded by the node count so cyclic link graphs
    // still terminate with stable ranks.
    for _ in 0..nodes.len() {
        let mut changed = false;
        for edge in edges {
            if edge.source == edge.target {
                continue;
            }
            let (Some(&source_rank), Some(&target_rank)) =
                (ranks.get(edge.source.as_str()), ranks.get(edge.target.as_str()))
            else {
                continue;
            };
            if source_rank + 1 > target_rank {
                ranks.insert(edge.target.as_str(), source_rank + 1);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // Bounded relaxation on a cycle can leave holes between rank values;
    // compress to a dense sequence before measuring extents.
    let mut distinct_ranks: Vec<usize> = ranks.values().copied().collect();
    distinct_ranks.sort_unstable();
    distinct_ranks.dedup();
    let dense_rank: BTreeMap<usize, usize> = distinct_ranks
        .iter()
        .enumerate()
        .map(|(dense, &raw)| (raw, dense))
        .collect();

    let mut rank_members: Vec<Vec<&str>> = vec![Vec::new(); distinct_ranks.len()];
    for node in nodes {
        let raw = ranks[node.id.as_str()];
        let members = &mut rank_members[dense_rank[&raw]];
        if !members.contains(&node.id.as_str()) {
            members.push(node.id.as_str());
        }
    }

    let (main_extent, cross_extent, cross_separation) = match direction {
        LayoutDirection::TopToBottom => (NODE_HEIGHT, NODE_WIDTH, NODE_SEPARATION),
        LayoutDirection::LeftToRight => (NODE_WIDTH, NODE_HEIGHT, NODE_SEPARATION),
    };

    let rank_breadth = |count: usize| -> f32 {
        count as f32 * cross_extent + count.saturating_sub(1) as f32 * cross_separation
    };
    let widest = rank_members
        .iter()
        .map(|members| rank_breadth(members.len()))
        .fold(0.0_f32, f32::max);

    let mut placed = BTreeMap::<&str, Position>::new();
    for (rank, members) in rank_members.iter().enumerate() {
        let offset = (widest - rank_breadth(members.len())) / 2.0;
        for (index, &node_id) in members.iter().enumerate() {
            let along = rank as f32 * (main_extent + RANK_SEPARATION);
            let across = offset + index as f32 * (cross_extent + cross_separation);
            let position = match direction {
                LayoutDirection::TopToBottom => Position { x: across, y: along },
                LayoutDirection::LeftToRight => Position { x: along, y: across },
            };
            placed.insert(node_id, position);
        }
    }

    nodes
        .iter()
        .map(|node| {
            let mut laid_out = node.clone();
            laid_out.position = placed
                .get(node.id.as_str())
                .copied()
                .unwrap_or(node.position);
            laid_out
        })
        .collect()
}
