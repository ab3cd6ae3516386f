//! Perspective-relative NNUE evaluator: feature indexing, the accumulator
//! stack, and final inference.

pub mod accumulator;
pub mod features;
pub mod network;

use crate::consts::{QA, QB};
use accumulator::AccumulatorStack;
use corvid_core::board::Position;
use network::Network;

/// Runs the two-perspective forward pass and returns a centipawn score from
/// the side-to-move's perspective (before draw/contempt/phase
/// post-processing, which lives in `crate::eval`).
pub fn infer(stack: &mut AccumulatorStack, ply: usize, pos: &Position, network: &Network) -> i32 {
    let stm = pos.side_to_move();
    let us = stack.value_for(ply, stm, pos, network).to_vec();
    let them = stack.value_for(ply, !stm, pos, network).to_vec();

    let mut acc: i32 = 0;
    for (i, &v) in us.iter().enumerate() {
        let clamped = v.clamp(0, QA as i16) as i32;
        acc += clamped * network.output_weights[i] as i32;
    }
    let offset = network.n_hidden;
    for (i, &v) in them.iter().enumerate() {
        let clamped = v.clamp(0, QA as i16) as i32;
        acc += clamped * network.output_weights[offset + i] as i32;
    }
    acc += network.output_bias;
    acc * 16 / (QA * QB / 16).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MAX_SEARCH_PLY;

    #[test]
    fn infer_runs_on_startpos() {
        let network = Network::default_embedded();
        let pos = Position::startpos();
        let mut stack = AccumulatorStack::new(&network, MAX_SEARCH_PLY + 1);
        let score = infer(&mut stack, 0, &pos, &network);
        assert!(score.abs() < 100_000);
    }
}
