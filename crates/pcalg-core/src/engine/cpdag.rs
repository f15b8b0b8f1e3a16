//! # CPDAG orientation
//!
//! Turns a skeleton and its separation sets into a partially directed graph:
//!
//! 1. Every skeleton edge starts as both arcs.
//! 2. **Colliders**: for each non-adjacent pair `i < j` with a usable
//!    separation entry and each common neighbor `k` outside `sep[i][j]`, the
//!    arcs `k → i` and `k → j` are removed, leaving `i → k ← j`.
//!    An arc is only removed while its reverse is still present.
//! 3. **Meek rules 1-3** run over every ordered pair `(a, b)` with `a – b`
//!    undirected, in full passes, until a pass leaves the arc set unchanged.
//!
//! Two colliders can disagree about the same edge. The first orientation in
//! pair order wins, so every skeleton edge keeps at least one arc.

use crate::engine::diagnostics::{DefaultSink, Diagnostic, DiagnosticSink, MeekRule};
use crate::engine::errors::PcError;
use crate::engine::graph::{MixedGraph, UndirectedGraph};
use crate::engine::sepset::SeparationSets;

/// Orients `graph` using `sep_sets`, reporting to the [`DefaultSink`].
pub fn estimate_cpdag(
    graph: &UndirectedGraph,
    sep_sets: &SeparationSets,
) -> Result<MixedGraph, PcError> {
    let mut sink = DefaultSink::default();
    estimate_cpdag_with_sink(graph, sep_sets, &mut sink)
}

/// Orients `graph` using `sep_sets`, reporting to `sink`.
///
/// Fails with [`PcError::Configuration`] when the two inputs disagree on the
/// number of nodes.
pub fn estimate_cpdag_with_sink(
    graph: &UndirectedGraph,
    sep_sets: &SeparationSets,
    sink: &mut dyn DiagnosticSink,
) -> Result<MixedGraph, PcError> {
    let n = graph.n_nodes();
    if sep_sets.n_nodes() != n {
        return Err(PcError::config(format!(
            "skeleton has {n} nodes, separation sets cover {}",
            sep_sets.n_nodes()
        )));
    }

    let mut dag = graph.to_directed();
    orient_colliders(graph, sep_sets, &mut dag, sink);

    let mut passes = 0usize;
    loop {
        let before = dag.clone();
        passes += 1;
        for a in 0..n {
            for b in 0..n {
                if a == b || !dag.is_undirected(a, b) {
                    continue;
                }
                if let Some(rule) = applicable_rule(&dag, a, b) {
                    dag.remove_arc(b, a);
                    sink.record(Diagnostic::RuleFired { rule, from: a, to: b });
                }
            }
        }
        if dag == before {
            break;
        }
    }
    sink.record(Diagnostic::OrientationConverged { passes });

    Ok(dag)
}

fn orient_colliders(
    graph: &UndirectedGraph,
    sep_sets: &SeparationSets,
    dag: &mut MixedGraph,
    sink: &mut dyn DiagnosticSink,
) {
    let n = graph.n_nodes();
    for i in 0..n {
        for j in (i + 1)..n {
            if graph.has_edge(i, j) {
                continue;
            }
            let entry = sep_sets.get(i, j);
            if entry.as_set().is_none() {
                continue;
            }
            for k in common_neighbors(graph.neighbors(i), graph.neighbors(j)) {
                if entry.contains(k) {
                    continue;
                }
                for end in [i, j] {
                    if dag.has_arc(end, k) {
                        dag.remove_arc(k, end);
                    }
                }
                sink.record(Diagnostic::ColliderOriented { i, k, j });
            }
        }
    }
}

/// Intersection of two ascending lists, ascending.
fn common_neighbors<'a>(a: &'a [usize], b: &'a [usize]) -> impl Iterator<Item = usize> + 'a {
    a.iter().copied().filter(move |k| b.binary_search(k).is_ok())
}

/// The first rule that orients the undirected `a – b` as `a → b`.
fn applicable_rule(dag: &MixedGraph, a: usize, b: usize) -> Option<MeekRule> {
    let n = dag.n_nodes();

    // k → a, k and b non-adjacent
    if dag
        .predecessors(a)
        .any(|k| k != b && dag.is_directed(k, a) && !dag.is_adjacent(k, b))
    {
        return Some(MeekRule::Rule1);
    }

    // a → k → b
    if (0..n).any(|k| k != a && k != b && dag.is_directed(a, k) && dag.is_directed(k, b)) {
        return Some(MeekRule::Rule2);
    }

    // a – k → b and a – l → b with k, l non-adjacent
    let parents: Vec<usize> = (0..n)
        .filter(|&k| k != b && dag.is_undirected(a, k) && dag.is_directed(k, b))
        .collect();
    for (idx, &k) in parents.iter().enumerate() {
        if parents[idx + 1..].iter().any(|&l| !dag.is_adjacent(k, l)) {
            return Some(MeekRule::Rule3);
        }
    }

    None
}
