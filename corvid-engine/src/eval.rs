//! Evaluation post-processing: material-draw shortcut, contempt, phase
//! scaling, and the final clamp to a representable centipawn range.

use crate::consts::EVAL_UNKNOWN;
use crate::nnue::accumulator::AccumulatorStack;
use crate::nnue::network::Network;
use crate::nnue::infer;
use corvid_core::board::Position;
use corvid_core::types::PieceType;

/// Per-side-to-move contempt applied only at the root, per the resolved
/// Open Question on contempt scope.
#[derive(Copy, Clone, Debug, Default)]
pub struct EvalContext {
    pub contempt: i32,
    pub at_root: bool,
}

pub fn evaluate(
    stack: &mut AccumulatorStack,
    ply: usize,
    pos: &Position,
    network: &Network,
    ctx: EvalContext,
) -> i32 {
    if pos.is_material_draw() {
        return 0;
    }

    let mut score = infer(stack, ply, pos, network);

    if ctx.at_root {
        score += ctx.contempt;
    }

    let phase = game_phase(pos);
    score = score * (128 + phase) / 128;

    score.clamp(-(EVAL_UNKNOWN - 1), EVAL_UNKNOWN - 1)
}

/// Phase in `[0, 64]`, 0 = endgame, 64 = opening, from remaining
/// non-pawn/non-king material.
fn game_phase(pos: &Position) -> i32 {
    const WEIGHTS: [(PieceType, i32); 4] = [
        (PieceType::Knight, 1),
        (PieceType::Bishop, 1),
        (PieceType::Rook, 2),
        (PieceType::Queen, 4),
    ];
    // Full material: 4 knights + 4 bishops + 4 rooks + 2 queens across both sides.
    const MAX_PHASE: i32 = 4 * 1 + 4 * 1 + 4 * 2 + 2 * 4;
    let mut phase = 0;
    for (pt, weight) in WEIGHTS {
        phase += pos.pieces_of_type(pt).popcount() as i32 * weight;
    }
    (phase * 64 / MAX_PHASE).clamp(0, 64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MAX_SEARCH_PLY;

    #[test]
    fn startpos_phase_is_opening() {
        let pos = Position::startpos();
        assert_eq!(game_phase(&pos), 64);
    }

    #[test]
    fn bare_kings_is_material_draw() {
        let pos = Position::from_fen("8/8/4k3/8/8/4K3/8/8 w - - 0 1").unwrap();
        let network = Network::default_embedded();
        let mut stack = AccumulatorStack::new(&network, MAX_SEARCH_PLY + 1);
        assert_eq!(evaluate(&mut stack, 0, &pos, &network, EvalContext::default()), 0);
    }
}
