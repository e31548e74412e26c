// THEORY:
// Error handling for the scheduling core follows a strict split. Degenerate
// inputs that the network produces in normal operation (a cluster with one
// survivor, a candidate with no overlap left) are *not* errors and are handled
// where they occur. Everything in this enum is an invariant violation or a
// caller bug: coverage accounting that went wrong must abort the scheduling
// run loudly, because a silently wrong coverage number is worse than a crash.

use thiserror::Error;

/// Fatal conditions raised by the coverage engine and the optimizer.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// A painted pixel carried no owner. The rasterizer only materializes a
    /// pixel when a node covers it, so this can only mean corrupted state.
    #[error("pixel ({x}, {y}) has an empty owner set")]
    EmptyOwnerSet { x: i64, y: i64 },

    /// The optimizer was handed a zero-length candidate. The driver's
    /// degenerate-cluster pre-check is supposed to make this unreachable.
    #[error("optimizer started with an empty candidate")]
    EmptyCandidate,

    /// Every gene is pinned awake, so mutation would loop forever looking for
    /// a flippable gene. Fail fast instead.
    #[error("optimizer started with no mutable gene ({nb_nodes} nodes, all pinned)")]
    NoMutableGenes { nb_nodes: usize },

    /// A worker in the parallel driver disappeared before replying.
    #[error("cluster worker dropped its result channel")]
    WorkerLost,
}
