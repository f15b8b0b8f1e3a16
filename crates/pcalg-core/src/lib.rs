//! # pcalg core
//!
//! Causal structure discovery from categorical data with the PC algorithm.
//!
//! The pipeline has two stages:
//!
//! 1. [`estimate_skeleton`] removes edges of a complete undirected graph
//!    whenever a conditional-independence test accepts independence, keeping
//!    the separating sets.
//! 2. [`estimate_cpdag`] orients colliders and propagates orientations with
//!    Meek's rules 1-3.
//!
//! [`run_pc`] runs both. Independence is decided by any [`IndependenceTest`];
//! [`BinaryGSquare`] and [`DiscreteGSquare`] implement the G² likelihood-ratio
//! test.
//!
//! ```no_run
//! use pcalg_core::{run_pc, BinaryGSquare, DataMatrix, SkeletonOptions};
//!
//! # fn main() -> Result<(), pcalg_core::PcError> {
//! let data = DataMatrix::from_rows([[0u32, 1, 1], [1, 1, 0], [0, 0, 0]])?;
//! let result = run_pc(&BinaryGSquare::default(), &data, 0.01, &SkeletonOptions::stable())?;
//! for edge in result.cpdag.edges() {
//!     println!("{edge:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod engine;

pub use engine::ci_test::{
    BinaryGSquare, CiOutcome, DiscreteGSquare, GSquareConfig, IndependenceTest, SampleShortfall,
    SparsityPolicy,
};
pub use engine::cpdag::{estimate_cpdag, estimate_cpdag_with_sink};
pub use engine::data::{Category, DataMatrix};
pub use engine::diagnostics::{
    DefaultSink, Diagnostic, DiagnosticSink, MeekRule, NullSink, RecordingSink,
};
#[cfg(feature = "tracing")]
pub use engine::diagnostics::TracingSink;
pub use engine::errors::PcError;
pub use engine::graph::{MixedEdge, MixedGraph, UndirectedGraph};
pub use engine::oracle::{IndependenceOracle, Verdict};
pub use engine::sepset::{SepEntry, SeparationSets};
pub use engine::skeleton::{
    estimate_skeleton, estimate_skeleton_with_sink, Skeleton, SkeletonMethod, SkeletonOptions,
    SkeletonStats,
};

/// Skeleton and CPDAG of one PC run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PcResult {
    pub skeleton: Skeleton,
    pub cpdag: MixedGraph,
}

/// Runs skeleton search followed by orientation, reporting to the
/// [`DefaultSink`].
pub fn run_pc<T: IndependenceTest + ?Sized>(
    test: &T,
    data: &DataMatrix,
    alpha: f64,
    options: &SkeletonOptions,
) -> Result<PcResult, PcError> {
    let mut sink = DefaultSink::default();
    run_pc_with_sink(test, data, alpha, options, &mut sink)
}

/// [`run_pc`] with an explicit diagnostic sink shared by both stages.
pub fn run_pc_with_sink<T: IndependenceTest + ?Sized>(
    test: &T,
    data: &DataMatrix,
    alpha: f64,
    options: &SkeletonOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<PcResult, PcError> {
    let skeleton = estimate_skeleton_with_sink(test, data, alpha, options, sink)?;
    let cpdag = estimate_cpdag_with_sink(&skeleton.graph, &skeleton.sep_sets, sink)?;
    Ok(PcResult { skeleton, cpdag })
}
