//! Layered (Sugiyama-style) layout of the mapping graph.
//!
//! Phases:
//!   1. Rank assignment (sources first, targets after, longest path for chains)
//!   2. Initial ordering within each rank by (kind, label)
//!   3. Crossing minimisation (barycenter sweeps, kept only if they help)
//!   4. Coordinate assignment, converted to top-left anchors
//!
//! Every call recomputes from scratch, and nothing depends on the order in
//! which nodes or edges were inserted.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use tracing::warn;

use crate::config::LayoutConfig;
use crate::core::graph::{Edge, Node};
use crate::core::types::{EdgeId, NodeId, NodeKind, Position, Size};

/// Result of one layout pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    /// Rank of every positioned node.
    pub ranks: BTreeMap<NodeId, usize>,
    /// Node ids per rank, in final in-rank order. Empty ranks are kept.
    pub order: Vec<Vec<NodeId>>,
    /// Top-left anchored position of every node.
    pub positions: BTreeMap<NodeId, Position>,
    /// Edges left out of the pass because they were dangling, self loops,
    /// duplicates, or pointed from a target back to a source. Sorted by id.
    pub excluded_edges: Vec<EdgeId>,
}

impl Layout {
    pub fn position(&self, id: &NodeId) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn rank_of(&self, id: &NodeId) -> Option<usize> {
        self.ranks.get(id).copied()
    }
}

fn base_rank(kind: NodeKind) -> usize {
    match kind {
        NodeKind::Source => 0,
        NodeKind::Target => 1,
    }
}

//stable secondary key: kind first, then label, id only breaks ties between
//duplicate labels which the graph never produces
fn sort_key(a: &Node, b: &Node) -> Ordering {
    a.kind()
        .cmp(&b.kind())
        .then_with(|| a.original_label.cmp(&b.original_label))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn layout(nodes: &[Node], edges: &[Edge], config: &LayoutConfig) -> Layout {
    //dedupe nodes by id, first one wins
    let mut seen = HashSet::new();
    let mut sorted: Vec<&Node> = nodes.iter().filter(|n| seen.insert(&n.id)).collect();
    sorted.sort_by(|a, b| sort_key(a, b));

    if sorted.is_empty() {
        return Layout::default();
    }

    let index: HashMap<&NodeId, usize> = sorted.iter().enumerate().map(|(i, n)| (&n.id, i)).collect();

    let mut excluded_edges = Vec::new();
    let mut pairs: HashSet<(usize, usize)> = HashSet::new();
    for e in edges {
        let (Some(&s), Some(&t)) = (index.get(&e.source), index.get(&e.target)) else {
            warn!(edge = %e.id, "layout: edge references an unknown node, excluded");
            excluded_edges.push(e.id.clone());
            continue;
        };
        if s == t {
            warn!(edge = %e.id, "layout: self loop excluded");
            excluded_edges.push(e.id.clone());
            continue;
        }
        if sorted[s].kind() == NodeKind::Target && sorted[t].kind() == NodeKind::Source {
            warn!(edge = %e.id, "layout: edge from a target into a source excluded");
            excluded_edges.push(e.id.clone());
            continue;
        }
        if !pairs.insert((s, t)) {
            excluded_edges.push(e.id.clone());
        }
    }
    excluded_edges.sort_unstable();
    let mut links: Vec<(usize, usize)> = pairs.into_iter().collect();
    links.sort_unstable();

    let ranks = assign_ranks(&sorted, &links);
    let rank_count = ranks.iter().copied().max().unwrap_or(0) + 1;

    let mut order: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
    for (i, &r) in ranks.iter().enumerate() {
        order[r].push(i);
    }

    minimise_crossings(&mut order, &ranks, &links, config.max_crossing_passes);

    let positions = assign_coordinates(&sorted, &order, config);

    Layout {
        ranks: sorted.iter().zip(&ranks).map(|(n, &r)| (n.id.clone(), r)).collect(),
        order: order
            .iter()
            .map(|rank| rank.iter().map(|&i| sorted[i].id.clone()).collect())
            .collect(),
        positions,
        excluded_edges,
    }
}

/// Longest-path ranking on top of the kind's base rank. Nodes caught in a
/// cycle keep whatever rank they had reached when the cycle blocked them.
fn assign_ranks(nodes: &[&Node], links: &[(usize, usize)]) -> Vec<usize> {
    let n = nodes.len();
    let mut ranks: Vec<usize> = nodes.iter().map(|node| base_rank(node.kind())).collect();
    let mut succs: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_deg = vec![0usize; n];
    for &(s, t) in links {
        succs[s].push(t);
        in_deg[t] += 1;
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_deg[i] == 0).collect();
    let mut visited = 0;
    while let Some(u) = queue.pop_front() {
        visited += 1;
        for &v in &succs[u] {
            ranks[v] = ranks[v].max(ranks[u] + 1);
            in_deg[v] -= 1;
            if in_deg[v] == 0 {
                queue.push_back(v);
            }
        }
    }
    if visited < n {
        warn!(stuck = n - visited, "layout: cycle in edge set, affected nodes keep their partial rank");
    }

    ranks
}

fn adjacent_links(order: &[Vec<usize>], ranks: &[usize], links: &[(usize, usize)]) -> Vec<Vec<(usize, usize)>> {
    //links between rank r and r+1, as (position in r, position in r+1)
    let mut pos = vec![0usize; ranks.len()];
    for rank in order {
        for (p, &i) in rank.iter().enumerate() {
            pos[i] = p;
        }
    }
    let mut by_rank = vec![Vec::new(); order.len().saturating_sub(1)];
    for &(s, t) in links {
        if ranks[t] == ranks[s] + 1 {
            by_rank[ranks[s]].push((pos[s], pos[t]));
        }
    }
    by_rank
}

fn count_crossings(order: &[Vec<usize>], ranks: &[usize], links: &[(usize, usize)]) -> usize {
    let mut crossings = 0;
    for between in adjacent_links(order, ranks, links) {
        for (i, &(a1, b1)) in between.iter().enumerate() {
            for &(a2, b2) in &between[i + 1..] {
                if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                    crossings += 1;
                }
            }
        }
    }
    crossings
}

fn barycenter(current: usize, neighbours: &[usize], pos: &HashMap<usize, usize>) -> f64 {
    let placed: Vec<f64> = neighbours.iter().filter_map(|n| pos.get(n)).map(|&p| p as f64).collect();
    if placed.is_empty() {
        //no neighbour in the fixed rank: stay put
        return current as f64;
    }
    placed.iter().sum::<f64>() / placed.len() as f64
}

fn sort_rank_by(rank: &mut [usize], neighbours: &[Vec<usize>], fixed: &[usize]) {
    let fixed_pos: HashMap<usize, usize> = fixed.iter().enumerate().map(|(p, &i)| (i, p)).collect();
    let current: HashMap<usize, usize> = rank.iter().enumerate().map(|(p, &i)| (i, p)).collect();
    let weights: HashMap<usize, f64> = rank
        .iter()
        .map(|&i| (i, barycenter(current[&i], &neighbours[i], &fixed_pos)))
        .collect();
    //sort_by is stable: equal barycenters keep the alphabetical order
    rank.sort_by(|a, b| weights[a].partial_cmp(&weights[b]).unwrap_or(Ordering::Equal));
}

fn minimise_crossings(order: &mut Vec<Vec<usize>>, ranks: &[usize], links: &[(usize, usize)], max_passes: usize) {
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); ranks.len()];
    let mut succs: Vec<Vec<usize>> = vec![Vec::new(); ranks.len()];
    for &(s, t) in links {
        if ranks[t] == ranks[s] + 1 {
            preds[t].push(s);
            succs[s].push(t);
        }
    }

    let mut best = count_crossings(order, ranks, links);
    for _ in 0..max_passes {
        if best == 0 {
            break;
        }
        let mut candidate = order.clone();
        for r in 1..candidate.len() {
            let fixed = candidate[r - 1].clone();
            sort_rank_by(&mut candidate[r], &preds, &fixed);
        }
        for r in (0..candidate.len().saturating_sub(1)).rev() {
            let fixed = candidate[r + 1].clone();
            sort_rank_by(&mut candidate[r], &succs, &fixed);
        }

        let crossings = count_crossings(&candidate, ranks, links);
        if crossings >= best {
            break;
        }
        best = crossings;
        *order = candidate;
    }
}

fn assign_coordinates(nodes: &[&Node], order: &[Vec<usize>], config: &LayoutConfig) -> BTreeMap<NodeId, Position> {
    let horizontal = config.direction.is_horizontal();
    let default = Size::new(config.node_width, config.node_height);
    let size_at = |i: usize| nodes[i].size.unwrap_or(default);
    //(extent along the rank axis, extent along the in-rank axis)
    let extents = |s: Size| if horizontal { (s.width, s.height) } else { (s.height, s.width) };

    let used: Vec<&Vec<usize>> = order.iter().filter(|r| !r.is_empty()).collect();

    let rank_depth: Vec<f64> = used
        .iter()
        .map(|r| r.iter().map(|&i| extents(size_at(i)).0).fold(0.0, f64::max))
        .collect();
    let rank_breadth: Vec<f64> = used
        .iter()
        .map(|r| {
            let sum: f64 = r.iter().map(|&i| extents(size_at(i)).1).sum();
            sum + config.node_sep * (r.len() as f64 - 1.0)
        })
        .collect();
    let max_breadth = rank_breadth.iter().copied().fold(0.0, f64::max);
    let total_depth: f64 =
        rank_depth.iter().sum::<f64>() + config.rank_sep * (used.len() as f64 - 1.0).max(0.0);

    let mut positions = BTreeMap::new();
    let mut rank_start = 0.0;
    for (r, rank) in used.iter().enumerate() {
        let mut rank_center = rank_start + rank_depth[r] / 2.0;
        if config.direction.is_reversed() {
            rank_center = total_depth - rank_center;
        }

        let mut offset = (max_breadth - rank_breadth[r]) / 2.0;
        for &i in rank.iter() {
            let size = size_at(i);
            let breadth = extents(size).1;
            let center = offset + breadth / 2.0;
            offset += breadth + config.node_sep;

            let (cx, cy) = if horizontal { (rank_center, center) } else { (center, rank_center) };
            positions.insert(
                nodes[i].id.clone(),
                Position::new(cx - size.width / 2.0, cy - size.height / 2.0),
            );
        }
        rank_start += rank_depth[r] + config.rank_sep;
    }
    positions
}
