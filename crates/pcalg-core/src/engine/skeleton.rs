//! # Skeleton search
//!
//! Starting from a complete (or caller-supplied) undirected graph, the search
//! removes `x – y` as soon as some subset `K` of `x`'s other neighbors makes
//! the pair conditionally independent, recording `K` as the separating set.
//!
//! Passes run for conditioning-set sizes `l = 0, 1, 2, ...`. Within a pass,
//! ordered pairs `(i, j)` are visited lexicographically and subsets of
//! `adj(i) \ {j}` are enumerated as lexicographic combinations of the
//! ascending neighbor list. The first separating subset wins.
//!
//! ## Methods
//!
//! - **Original**: removals take effect immediately, so later pairs in the
//!   same pass see the thinned graph. The result depends on visitation order.
//! - **Stable**: every pair in a pass reads a snapshot of the graph taken at
//!   the start of the pass; removals are applied when the pass ends. The
//!   separating set of `{a, b}` (with `a < b`) comes from the ordered pair
//!   `(a, b)` when that direction separated it, otherwise from `(b, a)`, so the
//!   result does not depend on visitation order.
//!
//! ## Termination
//!
//! The search stops after a pass in which no pair had at least `l` candidate
//! neighbors, or once the next `l` would exceed `max_reach`.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::engine::ci_test::{CiOutcome, IndependenceTest};
use crate::engine::data::DataMatrix;
use crate::engine::diagnostics::{CondSet, DefaultSink, Diagnostic, DiagnosticSink};
use crate::engine::errors::PcError;
use crate::engine::graph::{MixedGraph, Neighbors, UndirectedGraph};
use crate::engine::oracle::IndependenceOracle;
use crate::engine::sepset::SeparationSets;

/// How removals within a pass interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkeletonMethod {
    /// Remove edges immediately.
    #[default]
    Original,
    /// Order-independent variant: snapshot adjacency per pass.
    Stable,
}

/// Options for [`estimate_skeleton`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkeletonOptions {
    /// Largest conditioning-set size to try. `None` runs until no pair has
    /// enough neighbors.
    pub max_reach: Option<usize>,
    pub method: SkeletonMethod,
    /// Starting graph. Pairs it does not connect are never tested and their
    /// separation entry is marked unusable.
    pub init_graph: Option<UndirectedGraph>,
    /// Edges that are never tested and never removed. Must contain only
    /// undirected relationships (both arcs of each pair).
    pub fixed_edges: Option<MixedGraph>,
}

impl SkeletonOptions {
    pub fn stable() -> Self {
        Self {
            method: SkeletonMethod::Stable,
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: SkeletonMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_max_reach(mut self, max_reach: usize) -> Self {
        self.max_reach = Some(max_reach);
        self
    }

    pub fn with_init_graph(mut self, graph: UndirectedGraph) -> Self {
        self.init_graph = Some(graph);
        self
    }

    pub fn with_fixed_edges(mut self, fixed: MixedGraph) -> Self {
        self.fixed_edges = Some(fixed);
        self
    }
}

/// Counters collected during a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkeletonStats {
    /// Independence tests executed.
    pub tests_run: usize,
    /// Edges removed across all passes.
    pub edges_removed: usize,
    /// Largest conditioning-set size at which a test ran.
    pub max_depth: Option<usize>,
}

/// Result of a skeleton search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skeleton {
    pub graph: UndirectedGraph,
    pub sep_sets: SeparationSets,
    pub stats: SkeletonStats,
}

/// Estimates the skeleton, reporting diagnostics to the [`DefaultSink`].
pub fn estimate_skeleton<T: IndependenceTest + ?Sized>(
    test: &T,
    data: &DataMatrix,
    alpha: f64,
    options: &SkeletonOptions,
) -> Result<Skeleton, PcError> {
    let mut sink = DefaultSink::default();
    estimate_skeleton_with_sink(test, data, alpha, options, &mut sink)
}

/// Estimates the skeleton, reporting diagnostics to `sink`.
///
/// Every configuration check (alpha, test configuration, `init_graph` and
/// `fixed_edges` shape) runs before the first independence test.
pub fn estimate_skeleton_with_sink<T: IndependenceTest + ?Sized>(
    test: &T,
    data: &DataMatrix,
    alpha: f64,
    options: &SkeletonOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<Skeleton, PcError> {
    let pairs = ordered_pairs(data.n_cols());
    search(test, data, alpha, options, sink, &pairs)
}

/// All `(i, j)` with `i ≠ j`, lexicographic.
fn ordered_pairs(n: usize) -> Vec<(usize, usize)> {
    (0..n)
        .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
        .collect()
}

struct Start {
    graph: UndirectedGraph,
    sep_sets: SeparationSets,
    fixed: UndirectedGraph,
}

fn initialize(n: usize, options: &SkeletonOptions) -> Result<Start, PcError> {
    let graph = match &options.init_graph {
        Some(init) if init.n_nodes() != n => {
            return Err(PcError::config(format!(
                "init graph has {} nodes, data has {n} columns",
                init.n_nodes()
            )));
        }
        Some(init) => init.clone(),
        None => UndirectedGraph::complete(n),
    };

    let mut sep_sets = SeparationSets::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if !graph.has_edge(i, j) {
                sep_sets.mark_unusable(i, j)?;
            }
        }
    }

    let fixed = match &options.fixed_edges {
        Some(fixed) if fixed.n_nodes() != n => {
            return Err(PcError::config(format!(
                "fixed edges have {} nodes, data has {n} columns",
                fixed.n_nodes()
            )));
        }
        Some(fixed) => {
            if let Some((i, j)) = fixed.one_directional_arcs().next() {
                return Err(PcError::config(format!(
                    "fixed arc {i} -> {j} has no reverse; fixed edges must be undirected"
                )));
            }
            let fixed = fixed.skeleton();
            if let Some((i, j)) = fixed.edges().find(|&(i, j)| !graph.has_edge(i, j)) {
                return Err(PcError::config(format!(
                    "fixed edge {i} - {j} is missing from the init graph"
                )));
            }
            fixed
        }
        None => UndirectedGraph::empty(n),
    };

    Ok(Start {
        graph,
        sep_sets,
        fixed,
    })
}

/// Runs the search visiting `pairs` in the given order on every pass.
fn search<T: IndependenceTest + ?Sized>(
    test: &T,
    data: &DataMatrix,
    alpha: f64,
    options: &SkeletonOptions,
    sink: &mut dyn DiagnosticSink,
    pairs: &[(usize, usize)],
) -> Result<Skeleton, PcError> {
    let oracle = IndependenceOracle::new(test, alpha)?;
    test.validate(data)?;
    let Start {
        mut graph,
        mut sep_sets,
        fixed,
    } = initialize(data.n_cols(), options)?;

    let stable = options.method == SkeletonMethod::Stable;
    let mut stats = SkeletonStats::default();
    let mut depth = 0usize;

    loop {
        sink.record(Diagnostic::PassStarted {
            depth,
            edges: graph.n_edges(),
        });
        let snapshot = stable.then(|| graph.clone());
        let mut scheduled: Vec<(usize, usize)> = Vec::new();
        let mut forward_separated: FxHashSet<(usize, usize)> = FxHashSet::default();
        let mut continuing = false;
        let mut removed = 0usize;

        for &(i, j) in pairs {
            if fixed.has_edge(i, j) {
                continue;
            }
            let candidates: Neighbors = {
                let view = snapshot.as_ref().unwrap_or(&graph);
                if !view.has_edge(i, j) {
                    continue;
                }
                view.neighbors(i).iter().copied().filter(|&k| k != j).collect()
            };
            if candidates.len() < depth {
                continue;
            }
            continuing = true;
            if stable && i > j && forward_separated.contains(&(j, i)) {
                continue;
            }

            let Some(sep) =
                first_separating_set(&oracle, data, i, j, &candidates, depth, &mut stats, sink)?
            else {
                continue;
            };
            sep_sets.set(i, j, &sep)?;
            if stable {
                if i < j {
                    forward_separated.insert((i, j));
                }
                scheduled.push((i.min(j), i.max(j)));
            } else if graph.remove_edge(i, j) {
                removed += 1;
                sink.record(Diagnostic::EdgeRemoved { x: i, y: j, sep });
            }
        }

        if stable {
            scheduled.sort_unstable();
            scheduled.dedup();
            for (a, b) in scheduled {
                if graph.remove_edge(a, b) {
                    removed += 1;
                    let sep = sep_sets
                        .get(a, b)
                        .as_set()
                        .map(CondSet::from_slice)
                        .unwrap_or_default();
                    sink.record(Diagnostic::EdgeRemoved { x: a, y: b, sep });
                }
            }
        }

        if continuing {
            stats.max_depth = Some(depth);
        }
        stats.edges_removed += removed;
        sink.record(Diagnostic::PassFinished { depth, removed });

        depth += 1;
        if !continuing {
            break;
        }
        if options.max_reach.is_some_and(|max| depth > max) {
            break;
        }
    }

    Ok(Skeleton {
        graph,
        sep_sets,
        stats,
    })
}

/// Tests size-`depth` subsets of `candidates` in lexicographic order and
/// returns the first one that separates `x` and `y`.
#[allow(clippy::too_many_arguments)]
fn first_separating_set<T: IndependenceTest + ?Sized>(
    oracle: &IndependenceOracle<'_, T>,
    data: &DataMatrix,
    x: usize,
    y: usize,
    candidates: &[usize],
    depth: usize,
    stats: &mut SkeletonStats,
    sink: &mut dyn DiagnosticSink,
) -> Result<Option<CondSet>, PcError> {
    let mut subsets = Combinations::new(candidates.len(), depth);
    let mut cond = CondSet::with_capacity(depth);
    while let Some(indices) = subsets.next_indices() {
        cond.clear();
        cond.extend(indices.iter().map(|&k| candidates[k]));
        let verdict = oracle.query(data, x, y, &cond)?;
        stats.tests_run += 1;
        report(sink, x, y, &cond, &verdict.outcome);
        if verdict.independent {
            return Ok(Some(cond));
        }
    }
    Ok(None)
}

fn report(sink: &mut dyn DiagnosticSink, x: usize, y: usize, cond: &CondSet, outcome: &CiOutcome) {
    sink.record(Diagnostic::EdgeTested {
        x,
        y,
        cond: cond.clone(),
        p_value: outcome.p_value,
    });
    if let Some(shortfall) = outcome.shortfall {
        sink.record(Diagnostic::InsufficientSamples {
            x,
            y,
            cond: cond.clone(),
            rows: shortfall.rows,
            required: shortfall.required,
        });
    }
    if let Some(g) = outcome.statistic.filter(|g| g.empty_strata > 0) {
        sink.record(Diagnostic::EmptyStrata {
            x,
            y,
            cond: cond.clone(),
            empty: g.empty_strata,
            strata: g.strata,
        });
    }
}

/// Lexicographic `k`-combinations of `0..n`, yielded as index slices.
struct Combinations {
    n: usize,
    indices: SmallVec<[usize; 8]>,
    started: bool,
    done: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            started: false,
            done: k > n,
        }
    }

    fn next_indices(&mut self) -> Option<&[usize]> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(&self.indices);
        }
        let k = self.indices.len();
        let mut pos = k;
        loop {
            if pos == 0 {
                self.done = true;
                return None;
            }
            pos -= 1;
            if self.indices[pos] < self.n - k + pos {
                break;
            }
        }
        self.indices[pos] += 1;
        for q in (pos + 1)..k {
            self.indices[q] = self.indices[q - 1] + 1;
        }
        Some(&self.indices)
    }
}
