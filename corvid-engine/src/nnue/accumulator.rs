//! Per-thread accumulator stack with king-bucketed lazy refresh.
//!
//! Every refresh (whether the king bucket changed or not) is expressed as a
//! diff against a cached per-(view, mirror, bucket) vector: the cached
//! vector's piece bitboards are compared to the current board, and only the
//! squares that differ are subtracted/added, which is the same O(Δpieces)
//! shape as the move-by-move SubAdd/SubSubAdd/SubSubAddAdd kernels without
//! needing to replay the stack slot-by-slot.

use super::features::feature_index;
use super::network::Network;
use crate::consts::N_KING_BUCKETS;
use corvid_core::bitboard::BitBoard;
use corvid_core::board::Position;
use corvid_core::types::{Piece, Player, PieceType, ALL_PIECES, Square};

#[derive(Clone)]
pub struct Accumulator {
    pub values: [Vec<i16>; 2],
    correct: [bool; 2],
}

impl Accumulator {
    fn empty(n_hidden: usize) -> Accumulator {
        Accumulator {
            values: [vec![0i16; n_hidden], vec![0i16; n_hidden]],
            correct: [false, false],
        }
    }
}

#[derive(Clone)]
struct RefreshEntry {
    piece_squares: [BitBoard; 12],
    values: Vec<i16>,
}

impl RefreshEntry {
    fn empty(biases: &[i16]) -> RefreshEntry {
        RefreshEntry {
            piece_squares: [BitBoard::default(); 12],
            values: biases.to_vec(),
        }
    }
}

/// Per-thread stack of accumulators, one slot per ply, plus the king-bucket
/// refresh cache. Owned by the search thread; never shared.
pub struct AccumulatorStack {
    slots: Vec<Accumulator>,
    // Indexed by [view][mirror][bucket].
    refresh_table: Vec<Vec<Vec<RefreshEntry>>>,
}

impl AccumulatorStack {
    pub fn new(network: &Network, capacity: usize) -> AccumulatorStack {
        let refresh_table = vec![
            vec![
                (0..N_KING_BUCKETS)
                    .map(|_| RefreshEntry::empty(&network.input_biases))
                    .collect(),
                (0..N_KING_BUCKETS)
                    .map(|_| RefreshEntry::empty(&network.input_biases))
                    .collect(),
            ];
            2
        ];
        AccumulatorStack {
            slots: vec![Accumulator::empty(network.n_hidden); capacity.max(1)],
            refresh_table,
        }
    }

    /// Invalidates both perspectives of the slot at `ply`, to be lazily
    /// recomputed on the next `value_for` call. Called by the search driver
    /// immediately after `Position::make_move`.
    pub fn invalidate(&mut self, ply: usize) {
        if let Some(slot) = self.slots.get_mut(ply) {
            slot.correct = [false, false];
        }
    }

    /// Returns the (possibly freshly refreshed) accumulator values for
    /// `view` at `ply`, given the live position to diff against.
    pub fn value_for(&mut self, ply: usize, view: Player, pos: &Position, network: &Network) -> &[i16] {
        if !self.slots[ply].correct[view as usize] {
            let king_sq = pos.king_square(view);
            let mirror = king_sq.file() as u8 > 3;
            let bucket = king_bucket_index(king_sq, mirror);
            let values = refresh_against_cache(
                &mut self.refresh_table[view as usize][mirror as usize][bucket],
                pos,
                view,
                king_sq,
                network,
            );
            self.slots[ply].values[view as usize] = values;
            self.slots[ply].correct[view as usize] = true;
        }
        &self.slots[ply].values[view as usize]
    }
}

fn king_bucket_index(king_sq: Square, mirror: bool) -> usize {
    let file = if mirror { 7 - king_sq.file() as u8 } else { king_sq.file() as u8 };
    let rank = king_sq.rank() as u8;
    const TABLE: [usize; 32] = [
        0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 8, 8, 8, 8, 8, 8, 9, 9, 9, 9, 9, 9, 9, 9,
    ];
    let folded = (rank as usize) * 4 + (file.min(3) as usize);
    TABLE[folded.min(31)]
}

fn refresh_against_cache(
    cache: &mut RefreshEntry,
    pos: &Position,
    view: Player,
    king_sq: Square,
    network: &Network,
) -> Vec<i16> {
    let mut values = cache.values.clone();
    for &piece in ALL_PIECES.iter() {
        if piece.piece_type() == PieceType::King {
            continue;
        }
        let current = pos.pieces(piece.player().unwrap(), piece.piece_type());
        let cached = cache.piece_squares[piece as usize];
        for removed_sq in cached & !current {
            sub_feature(&mut values, network, piece, removed_sq, king_sq, view);
        }
        for added_sq in current & !cached {
            add_feature(&mut values, network, piece, added_sq, king_sq, view);
        }
        cache.piece_squares[piece as usize] = current;
    }
    cache.values = values.clone();
    values
}

#[inline]
fn add_feature(values: &mut [i16], network: &Network, piece: Piece, sq: Square, king_sq: Square, view: Player) {
    let idx = feature_index(piece, sq, king_sq, view) * network.n_hidden;
    for (v, w) in values.iter_mut().zip(&network.input_weights[idx..idx + network.n_hidden]) {
        *v = v.saturating_add(*w);
    }
}

#[inline]
fn sub_feature(values: &mut [i16], network: &Network, piece: Piece, sq: Square, king_sq: Square, view: Player) {
    let idx = feature_index(piece, sq, king_sq, view) * network.n_hidden;
    for (v, w) in values.iter_mut().zip(&network.input_weights[idx..idx + network.n_hidden]) {
        *v = v.saturating_sub(*w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MAX_SEARCH_PLY;

    #[test]
    fn refresh_matches_from_scratch_recompute() {
        let network = Network::default_embedded();
        let pos = Position::startpos();
        let mut stack = AccumulatorStack::new(&network, MAX_SEARCH_PLY + 1);
        let values = stack.value_for(0, Player::White, &pos, &network).to_vec();

        let mut expected: Vec<i32> = network.input_biases.iter().map(|&b| b as i32).collect();
        for &piece in ALL_PIECES.iter() {
            if piece.piece_type() == PieceType::King {
                continue;
            }
            for sq in pos.pieces(piece.player().unwrap(), piece.piece_type()) {
                let idx = feature_index(piece, sq, pos.king_square(Player::White), Player::White) * network.n_hidden;
                for (e, w) in expected.iter_mut().zip(&network.input_weights[idx..idx + network.n_hidden]) {
                    *e += *w as i32;
                }
            }
        }
        for (a, b) in values.iter().zip(expected.iter()) {
            assert_eq!(*a as i32, *b);
        }
    }
}
