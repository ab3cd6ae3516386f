//! Engine-wide constants and the zero-sized marker types used to specialize
//! the search at compile time instead of branching on a runtime flag.

/// Upper bound on search depth/ply; every per-ply table (stack, accumulator
/// stack, history arrays) is sized against this.
pub const MAX_SEARCH_PLY: usize = 128;

pub const MAX_THREADS: usize = 256;

/// King-square buckets used by the NNUE feature indexer.
pub const N_KING_BUCKETS: usize = 10;

pub const N_FEATURES: usize = N_KING_BUCKETS * 12 * 64;
/// Hidden-layer width of the compact embedded default network. `EvalFile`
/// can load a differently-shaped net at runtime (see `nnue::network`).
pub const N_HIDDEN: usize = 32;

/// Input/output quantization scales, matching the embedded network's own
/// quantizer so inference reproduces its training-time arithmetic exactly.
pub const QA: i32 = 255;
pub const QB: i32 = 64;

pub const CHECKMATE: i32 = 32_000;
pub const MATE_IN_MAX_PLY: i32 = CHECKMATE - MAX_SEARCH_PLY as i32;
pub const TB_WIN_BOUND: i32 = CHECKMATE - 2 * MAX_SEARCH_PLY as i32;
pub const EVAL_UNKNOWN: i32 = 32_001;

pub const DEFAULT_TT_SIZE_MB: usize = 256;
pub const PAWN_CORRECTION_SIZE: usize = 16_384;

/// Marker trait distinguishing a PV (principal-variation) search node from a
/// non-PV node at the type level, matching the generic negamax specialization
/// idiom the search module inherits.
pub trait NodeKind {
    const IS_PV: bool;
}

pub struct PV;
pub struct NonPV;

impl NodeKind for PV {
    const IS_PV: bool = true;
}
impl NodeKind for NonPV {
    const IS_PV: bool = false;
}
