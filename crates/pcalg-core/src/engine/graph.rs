//! # Graph structures
//!
//! Two fixed-node-count graphs over variables `0..n`:
//!
//! - **UndirectedGraph**: the skeleton. One sorted neighbor list per node, so
//!   neighbor iteration is ascending and subset enumeration over neighbors is
//!   deterministic.
//!
//! - **MixedGraph**: the CPDAG. A bitmask with one bit per ordered pair. An
//!   undirected relationship `i – j` is the presence of both arcs `i→j` and
//!   `j→i`; a directed edge `i→j` is the presence of exactly one.
//!
//! Both graphs compare by exact edge set on the same labeled nodes, which is
//! what the orientation fixpoint uses to detect convergence.

use smallvec::SmallVec;

use crate::engine::errors::PcError;

/// Inline capacity for neighbor lists. Skeletons are sparse after the first
/// passes, so most lists never spill to the heap.
const INLINE_NEIGHBORS: usize = 8;

/// Sorted neighbor list of one node.
pub type Neighbors = SmallVec<[usize; INLINE_NEIGHBORS]>;

/// Simple undirected graph over nodes `0..n`.
///
/// Serialized as a node count plus edge list; deserialization goes through
/// [`from_edges`](Self::from_edges).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "EdgeList", into = "EdgeList")
)]
pub struct UndirectedGraph {
    adjacency: Vec<Neighbors>,
}

impl UndirectedGraph {
    /// Graph with `n` nodes and no edges.
    pub fn empty(n: usize) -> Self {
        Self {
            adjacency: vec![Neighbors::new(); n],
        }
    }

    /// Complete graph over `n` nodes.
    pub fn complete(n: usize) -> Self {
        let adjacency = (0..n)
            .map(|i| (0..n).filter(|&j| j != i).collect())
            .collect();
        Self { adjacency }
    }

    /// Builds a graph from unordered pairs. Duplicates are ignored.
    pub fn from_edges(
        n: usize,
        edges: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self, PcError> {
        let mut graph = Self::empty(n);
        for (i, j) in edges {
            graph.check_pair(i, j)?;
            graph.add_edge(i, j);
        }
        Ok(graph)
    }

    fn check_pair(&self, i: usize, j: usize) -> Result<(), PcError> {
        let n = self.n_nodes();
        if i >= n || j >= n {
            return Err(PcError::config(format!(
                "edge ({i}, {j}) out of range for {n} nodes"
            )));
        }
        if i == j {
            return Err(PcError::config(format!("self loop on node {i}")));
        }
        Ok(())
    }

    /// Number of nodes.
    pub fn n_nodes(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of edges.
    pub fn n_edges(&self) -> usize {
        self.adjacency.iter().map(|n| n.len()).sum::<usize>() / 2
    }

    /// Whether `i` and `j` are adjacent.
    #[inline]
    pub fn has_edge(&self, i: usize, j: usize) -> bool {
        self.adjacency
            .get(i)
            .is_some_and(|n| n.binary_search(&j).is_ok())
    }

    /// Adds `i – j`. Returns `false` when already present.
    ///
    /// Panics on out-of-range nodes or self loops; use
    /// [`from_edges`](Self::from_edges) for unchecked input.
    pub fn add_edge(&mut self, i: usize, j: usize) -> bool {
        assert!(i != j, "self loop on node {i}");
        let inserted = insert_sorted(&mut self.adjacency[i], j);
        if inserted {
            insert_sorted(&mut self.adjacency[j], i);
        }
        inserted
    }

    /// Removes `i – j`. Returns `false` when absent.
    pub fn remove_edge(&mut self, i: usize, j: usize) -> bool {
        if i >= self.n_nodes() || j >= self.n_nodes() {
            return false;
        }
        let removed = remove_sorted(&mut self.adjacency[i], j);
        if removed {
            remove_sorted(&mut self.adjacency[j], i);
        }
        removed
    }

    /// Neighbors of `i`, ascending.
    #[inline]
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.adjacency[i]
    }

    /// All edges as `(i, j)` with `i < j`, lexicographic.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adjacency.iter().enumerate().flat_map(|(i, ns)| {
            ns.iter()
                .copied()
                .filter(move |&j| j > i)
                .map(move |j| (i, j))
        })
    }

    /// Both arcs for every edge.
    pub fn to_directed(&self) -> MixedGraph {
        let mut mixed = MixedGraph::empty(self.n_nodes());
        for (i, j) in self.edges() {
            mixed.add_arc(i, j);
            mixed.add_arc(j, i);
        }
        mixed
    }
}

fn insert_sorted(list: &mut Neighbors, value: usize) -> bool {
    match list.binary_search(&value) {
        Ok(_) => false,
        Err(pos) => {
            list.insert(pos, value);
            true
        }
    }
}

fn remove_sorted(list: &mut Neighbors, value: usize) -> bool {
    match list.binary_search(&value) {
        Ok(pos) => {
            list.remove(pos);
            true
        }
        Err(_) => false,
    }
}

/// A CPDAG edge as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MixedEdge {
    /// `from → to`; the reverse arc is absent.
    Directed { from: usize, to: usize },
    /// `a – b` with `a < b`; both arcs present.
    Undirected { a: usize, b: usize },
}

const WORD_BITS: usize = u64::BITS as usize;

/// Directed adjacency bitmask over nodes `0..n`.
///
/// Serialized as a node count plus arc list; deserialization goes through
/// [`from_arcs`](Self::from_arcs).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "EdgeList", into = "EdgeList")
)]
pub struct MixedGraph {
    n: usize,
    bits: Vec<u64>,
}

impl MixedGraph {
    /// Graph with `n` nodes and no arcs.
    pub fn empty(n: usize) -> Self {
        let words = (n * n).div_ceil(WORD_BITS);
        Self {
            n,
            bits: vec![0; words],
        }
    }

    /// Builds a graph from ordered pairs.
    pub fn from_arcs(
        n: usize,
        arcs: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self, PcError> {
        let mut graph = Self::empty(n);
        for (i, j) in arcs {
            if i >= n || j >= n {
                return Err(PcError::config(format!(
                    "arc ({i}, {j}) out of range for {n} nodes"
                )));
            }
            if i == j {
                return Err(PcError::config(format!("self loop on node {i}")));
            }
            graph.add_arc(i, j);
        }
        Ok(graph)
    }

    /// Number of nodes.
    pub fn n_nodes(&self) -> usize {
        self.n
    }

    #[inline]
    fn slot(&self, i: usize, j: usize) -> (usize, u64) {
        let bit = i * self.n + j;
        (bit / WORD_BITS, 1u64 << (bit % WORD_BITS))
    }

    /// Whether the arc `i → j` is present (regardless of `j → i`).
    #[inline]
    pub fn has_arc(&self, i: usize, j: usize) -> bool {
        if i >= self.n || j >= self.n {
            return false;
        }
        let (word, mask) = self.slot(i, j);
        self.bits[word] & mask != 0
    }

    /// Adds `i → j`. Returns `false` when already present.
    pub fn add_arc(&mut self, i: usize, j: usize) -> bool {
        assert!(i < self.n && j < self.n && i != j, "invalid arc ({i}, {j})");
        let (word, mask) = self.slot(i, j);
        let was = self.bits[word] & mask != 0;
        self.bits[word] |= mask;
        !was
    }

    /// Removes `i → j`. Returns `false` when absent.
    pub fn remove_arc(&mut self, i: usize, j: usize) -> bool {
        if !self.has_arc(i, j) {
            return false;
        }
        let (word, mask) = self.slot(i, j);
        self.bits[word] &= !mask;
        true
    }

    /// Both `i → j` and `j → i`.
    #[inline]
    pub fn is_undirected(&self, i: usize, j: usize) -> bool {
        self.has_arc(i, j) && self.has_arc(j, i)
    }

    /// `i → j` without `j → i`.
    #[inline]
    pub fn is_directed(&self, i: usize, j: usize) -> bool {
        self.has_arc(i, j) && !self.has_arc(j, i)
    }

    /// Any arc between `i` and `j`.
    #[inline]
    pub fn is_adjacent(&self, i: usize, j: usize) -> bool {
        self.has_arc(i, j) || self.has_arc(j, i)
    }

    /// Number of arcs (an undirected edge counts twice).
    pub fn n_arcs(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// All arcs `(i, j)`, lexicographic.
    pub fn arcs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.n;
        (0..n).flat_map(move |i| (0..n).filter(move |&j| self.has_arc(i, j)).map(move |j| (i, j)))
    }

    /// Nodes `j` with `i → j`.
    pub fn successors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.n).filter(move |&j| self.has_arc(i, j))
    }

    /// Nodes `j` with `j → i`.
    pub fn predecessors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.n).filter(move |&j| self.has_arc(j, i))
    }

    /// Arcs whose reverse is missing.
    pub fn one_directional_arcs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.arcs().filter(|&(i, j)| !self.has_arc(j, i))
    }

    /// Each adjacent pair once, classified.
    pub fn edges(&self) -> impl Iterator<Item = MixedEdge> + '_ {
        self.arcs().filter_map(|(i, j)| {
            if !self.has_arc(j, i) {
                Some(MixedEdge::Directed { from: i, to: j })
            } else if i < j {
                Some(MixedEdge::Undirected { a: i, b: j })
            } else {
                None
            }
        })
    }

    /// The undirected graph of all adjacencies.
    pub fn skeleton(&self) -> UndirectedGraph {
        let mut graph = UndirectedGraph::empty(self.n);
        for (i, j) in self.arcs() {
            graph.add_edge(i, j);
        }
        graph
    }
}

impl From<&UndirectedGraph> for MixedGraph {
    fn from(graph: &UndirectedGraph) -> Self {
        graph.to_directed()
    }
}

/// Wire form of both graph types. Pairs are unordered edges for
/// [`UndirectedGraph`] and arcs for [`MixedGraph`].
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct EdgeList {
    n_nodes: usize,
    pairs: Vec<(usize, usize)>,
}

#[cfg(feature = "serde")]
impl From<UndirectedGraph> for EdgeList {
    fn from(graph: UndirectedGraph) -> Self {
        Self {
            n_nodes: graph.n_nodes(),
            pairs: graph.edges().collect(),
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<EdgeList> for UndirectedGraph {
    type Error = PcError;

    fn try_from(list: EdgeList) -> Result<Self, PcError> {
        Self::from_edges(list.n_nodes, list.pairs)
    }
}

#[cfg(feature = "serde")]
impl From<MixedGraph> for EdgeList {
    fn from(graph: MixedGraph) -> Self {
        Self {
            n_nodes: graph.n_nodes(),
            pairs: graph.arcs().collect(),
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<EdgeList> for MixedGraph {
    type Error = PcError;

    fn try_from(list: EdgeList) -> Result<Self, PcError> {
        if list.n_nodes.checked_mul(list.n_nodes).is_none() {
            return Err(PcError::config(format!(
                "{} nodes overflow the arc bitmask",
                list.n_nodes
            )));
        }
        Self::from_arcs(list.n_nodes, list.pairs)
    }
}
