//! Topology Builder - 2D lattice plus random long-range edges.
//!
//! The graph is built once per run and frozen: `Graph` has no mutating
//! methods, only node status (held in `SimulationState`) changes over time.
//!
//! # Construction
//!
//! 1. **Lattice**: 4-neighbor grid, periodic (torus) or open boundary.
//! 2. **Long-range edges**: added on top of the lattice by one of two
//!    rewiring policies with materially different statistics:
//!    - `Pairwise`: every non-adjacent unordered pair gets an edge with
//!      probability p. O(N²), ≈ p·C(N,2) edges.
//!    - `PerNode`: every node, with probability p, links to one uniformly
//!      chosen non-adjacent node. O(N), ≈ p·N edges.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::debug;
use voter_env::{Coord, NodeId, VoterError, VoterResult};

/// Rejection attempts before the per-node policy falls back to exact
/// sampling over the explicit candidate set.
pub const MAX_REJECTION_ATTEMPTS: usize = 64;

/// How the lattice treats its edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Wrap-around: the last row/column is adjacent to the first
    #[default]
    Periodic,
    /// Border nodes have fewer neighbors
    Open,
}

impl BoundaryPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            BoundaryPolicy::Periodic => "periodic",
            BoundaryPolicy::Open => "open",
        }
    }
}

impl std::fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for BoundaryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "periodic" | "torus" | "wrap" => Ok(BoundaryPolicy::Periodic),
            "open" | "fixed" => Ok(BoundaryPolicy::Open),
            _ => Err(format!("Unknown boundary policy: {}", s)),
        }
    }
}

/// How long-range edges are added after the lattice is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewiringPolicy {
    /// Independent Bernoulli(p) trial for every non-adjacent pair
    Pairwise,
    /// One Bernoulli(p) trial per node, success adds one edge to a random target
    #[default]
    PerNode,
}

impl RewiringPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            RewiringPolicy::Pairwise => "pairwise",
            RewiringPolicy::PerNode => "per_node",
        }
    }
}

impl std::fmt::Display for RewiringPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for RewiringPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pairwise" | "pair" => Ok(RewiringPolicy::Pairwise),
            "per_node" | "pernode" | "per-node" | "node" => Ok(RewiringPolicy::PerNode),
            _ => Err(format!("Unknown rewiring policy: {}", s)),
        }
    }
}

/// Lattice size, given either explicitly or as a target population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatticeSpec {
    /// `width` columns by `height` rows
    Dimensions { width: u32, height: u32 },
    /// Square lattice with side ⌈√nodes⌉
    Population { nodes: u32 },
}

impl Default for LatticeSpec {
    fn default() -> Self {
        LatticeSpec::Population { nodes: 100 }
    }
}

impl LatticeSpec {
    /// Returns `(width, height)` of the described lattice.
    pub fn dimensions(&self) -> (u32, u32) {
        match *self {
            LatticeSpec::Dimensions { width, height } => (width, height),
            LatticeSpec::Population { nodes } => {
                let side = ceil_sqrt(nodes);
                (side, side)
            }
        }
    }

    /// Number of lattice nodes, or None if it does not fit a `NodeId`.
    pub fn node_count(&self) -> Option<u32> {
        let (width, height) = self.dimensions();
        width.checked_mul(height)
    }

    pub fn validate(&self) -> VoterResult<()> {
        match *self {
            LatticeSpec::Dimensions { width, height } => {
                if width == 0 || height == 0 {
                    return Err(VoterError::invalid(format!(
                        "lattice dimensions must be positive, got {}x{}",
                        width, height
                    )));
                }
            }
            LatticeSpec::Population { nodes } => {
                if nodes == 0 {
                    return Err(VoterError::invalid("population must be positive"));
                }
            }
        }
        if self.node_count().is_none() {
            let (width, height) = self.dimensions();
            return Err(VoterError::invalid(format!(
                "lattice {}x{} exceeds the maximum node count",
                width, height
            )));
        }
        Ok(())
    }
}

/// Smallest `s` with `s * s >= n`.
fn ceil_sqrt(n: u32) -> u32 {
    let n = u64::from(n);
    let mut side = (n as f64).sqrt() as u64;
    while side * side < n {
        side += 1;
    }
    while side > 0 && (side - 1) * (side - 1) >= n {
        side -= 1;
    }
    side as u32
}

/// Everything the builder needs to produce a graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub lattice: LatticeSpec,
    pub boundary: BoundaryPolicy,
    pub rewiring: RewiringPolicy,
    /// Rewiring probability p in [0, 1]
    pub p: f64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            lattice: LatticeSpec::default(),
            boundary: BoundaryPolicy::Periodic,
            rewiring: RewiringPolicy::PerNode,
            p: 0.0,
        }
    }
}

impl TopologyConfig {
    pub fn validate(&self) -> VoterResult<()> {
        self.lattice.validate()?;
        if !(0.0..=1.0).contains(&self.p) {
            return Err(VoterError::invalid(format!(
                "rewiring probability p={} outside [0, 1]",
                self.p
            )));
        }
        Ok(())
    }
}

/// Edge set under construction; rejects self-loops and duplicates.
struct EdgeSet {
    adjacency: Vec<Vec<NodeId>>,
    edges: Vec<(NodeId, NodeId)>,
    index: HashSet<(NodeId, NodeId)>,
}

impl EdgeSet {
    fn new(node_count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); node_count],
            edges: Vec::new(),
            index: HashSet::new(),
        }
    }

    fn key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    fn contains(&self, a: NodeId, b: NodeId) -> bool {
        self.index.contains(&Self::key(a, b))
    }

    /// Inserts `a -- b`, returning false if it was a self-loop or already present.
    fn insert(&mut self, a: NodeId, b: NodeId) -> bool {
        let key = Self::key(a, b);
        if a == b || !self.index.insert(key) {
            return false;
        }
        self.adjacency[a.index()].push(b);
        self.adjacency[b.index()].push(a);
        self.edges.push(key);
        true
    }

    fn len(&self) -> usize {
        self.edges.len()
    }
}

/// Summary of a built graph, exported alongside trajectories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyStats {
    pub width: u32,
    pub height: u32,
    pub nodes: usize,
    pub edges: usize,
    pub structural_edges: usize,
    pub long_range_edges: usize,
    pub isolated_nodes: usize,
    /// Nodes whose per-node rewiring trial succeeded but had no valid target
    pub saturated_nodes: usize,
    pub mean_degree: f64,
}

/// The frozen network: lattice nodes plus structural and long-range edges.
#[derive(Debug, Clone)]
pub struct Graph {
    width: u32,
    height: u32,
    adjacency: Vec<Vec<NodeId>>,
    edges: Vec<(NodeId, NodeId)>,
    structural_edges: usize,
    saturated_nodes: usize,
}

impl Graph {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges contributed by the lattice adjacency.
    pub fn structural_edge_count(&self) -> usize {
        self.structural_edges
    }

    /// Edges added by rewiring.
    pub fn long_range_edge_count(&self) -> usize {
        self.edges.len() - self.structural_edges
    }

    pub fn saturated_node_count(&self) -> usize {
        self.saturated_nodes
    }

    /// All node identifiers in enumeration (row-major) order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.adjacency.len()).map(NodeId::from_index)
    }

    /// All edges as `(low, high)` pairs, in insertion order.
    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.adjacency
            .get(node.index())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        // Scan the shorter list
        let (from, to) = if self.degree(a) <= self.degree(b) {
            (a, b)
        } else {
            (b, a)
        };
        self.neighbors(from).contains(&to)
    }

    /// Lattice position of a node.
    pub fn coord(&self, node: NodeId) -> Coord {
        Coord::new(node.0 / self.width, node.0 % self.width)
    }

    /// Node at a lattice position, if the position is on the lattice.
    pub fn node_at(&self, coord: Coord) -> Option<NodeId> {
        if coord.row < self.height && coord.col < self.width {
            Some(NodeId(coord.row * self.width + coord.col))
        } else {
            None
        }
    }

    /// Number of nodes with no neighbors at all.
    pub fn isolated_count(&self) -> usize {
        self.adjacency.iter().filter(|n| n.is_empty()).count()
    }

    /// Degree -> number of nodes with that degree.
    pub fn degree_histogram(&self) -> BTreeMap<usize, usize> {
        let mut histogram = BTreeMap::new();
        for neighbors in &self.adjacency {
            *histogram.entry(neighbors.len()).or_insert(0) += 1;
        }
        histogram
    }

    /// True if every node is reachable from node 0 (BFS).
    pub fn is_connected(&self) -> bool {
        let n = self.node_count();
        if n == 0 {
            return true;
        }

        let mut seen = vec![false; n];
        let mut queue = VecDeque::from([NodeId(0)]);
        seen[0] = true;
        let mut reached = 1;

        while let Some(node) = queue.pop_front() {
            for &next in self.neighbors(node) {
                if !seen[next.index()] {
                    seen[next.index()] = true;
                    reached += 1;
                    queue.push_back(next);
                }
            }
        }

        reached == n
    }

    pub fn stats(&self) -> TopologyStats {
        let nodes = self.node_count();
        TopologyStats {
            width: self.width,
            height: self.height,
            nodes,
            edges: self.edge_count(),
            structural_edges: self.structural_edges,
            long_range_edges: self.long_range_edge_count(),
            isolated_nodes: self.isolated_count(),
            saturated_nodes: self.saturated_nodes,
            mean_degree: if nodes > 0 {
                2.0 * self.edge_count() as f64 / nodes as f64
            } else {
                0.0
            },
        }
    }
}

/// Builds frozen graphs from a validated `TopologyConfig`.
#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    config: TopologyConfig,
}

impl TopologyBuilder {
    /// Creates a builder, rejecting invalid configurations up front.
    pub fn new(config: TopologyConfig) -> VoterResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// Builds the lattice, then adds long-range edges drawn from `rng`.
    pub fn build<R: Rng>(&self, rng: &mut R) -> VoterResult<Graph> {
        let (width, height) = self.config.lattice.dimensions();
        let node_count = (width as usize) * (height as usize);

        let mut edges = EdgeSet::new(node_count);
        self.add_lattice_edges(&mut edges, width, height);
        let structural_edges = edges.len();

        let bernoulli = Bernoulli::new(self.config.p).map_err(|e| {
            VoterError::invalid(format!("rewiring probability p={}: {}", self.config.p, e))
        })?;

        let saturated_nodes = if self.config.p > 0.0 {
            match self.config.rewiring {
                RewiringPolicy::Pairwise => {
                    Self::rewire_pairwise(&mut edges, &bernoulli, rng);
                    0
                }
                RewiringPolicy::PerNode => Self::rewire_per_node(&mut edges, &bernoulli, rng),
            }
        } else {
            0
        };

        debug!(
            "Built {}x{} {} lattice: {} structural + {} long-range edges ({} policy, p={})",
            width,
            height,
            self.config.boundary,
            structural_edges,
            edges.len() - structural_edges,
            self.config.rewiring,
            self.config.p,
        );

        Ok(Graph {
            width,
            height,
            adjacency: edges.adjacency,
            edges: edges.edges,
            structural_edges,
            saturated_nodes,
        })
    }

    /// Right and down neighbors of every cell; wrap-around when periodic.
    fn add_lattice_edges(&self, edges: &mut EdgeSet, width: u32, height: u32) {
        let periodic = self.config.boundary == BoundaryPolicy::Periodic;

        for row in 0..height {
            for col in 0..width {
                let node = NodeId(row * width + col);

                let right = if col + 1 < width {
                    Some(col + 1)
                } else if periodic {
                    Some(0)
                } else {
                    None
                };
                if let Some(c) = right {
                    edges.insert(node, NodeId(row * width + c));
                }

                let down = if row + 1 < height {
                    Some(row + 1)
                } else if periodic {
                    Some(0)
                } else {
                    None
                };
                if let Some(r) = down {
                    edges.insert(node, NodeId(r * width + col));
                }
            }
        }
    }

    fn rewire_pairwise<R: Rng>(edges: &mut EdgeSet, bernoulli: &Bernoulli, rng: &mut R) {
        let n = edges.adjacency.len() as u32;
        for a in 0..n {
            for b in (a + 1)..n {
                let (a, b) = (NodeId(a), NodeId(b));
                if !edges.contains(a, b) && bernoulli.sample(rng) {
                    edges.insert(a, b);
                }
            }
        }
    }

    /// Returns the number of saturated nodes (trial succeeded, no valid target).
    fn rewire_per_node<R: Rng>(edges: &mut EdgeSet, bernoulli: &Bernoulli, rng: &mut R) -> usize {
        let n = edges.adjacency.len() as u32;
        let mut saturated = 0;

        for a in 0..n {
            let node = NodeId(a);
            if !bernoulli.sample(rng) {
                continue;
            }

            let mut target = None;
            for _ in 0..MAX_REJECTION_ATTEMPTS {
                let candidate = NodeId(rng.gen_range(0..n));
                if candidate != node && !edges.contains(node, candidate) {
                    target = Some(candidate);
                    break;
                }
            }

            if target.is_none() {
                // Nearly complete neighborhood: sample the valid set exactly
                let candidates: Vec<NodeId> = (0..n)
                    .map(NodeId)
                    .filter(|&c| c != node && !edges.contains(node, c))
                    .collect();
                target = candidates.choose(rng).copied();
            }

            match target {
                Some(t) => {
                    edges.insert(node, t);
                }
                None => {
                    debug!("Node {} has no valid long-range target", node);
                    saturated += 1;
                }
            }
        }

        saturated
    }
}
