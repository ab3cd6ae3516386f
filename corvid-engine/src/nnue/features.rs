//! NNUE feature indexing: maps (piece, square, king square, viewing side) to
//! a column in the input-weight matrix.

use corvid_core::types::{Piece, Player, Square};

/// `FeatureIdx(piece, sq, kingSq, view)`: mirrors horizontally when the king
/// sits on the king-side, flips vertically for the black perspective, and
/// folds piece color into "own" vs "opponent" relative to `view`.
pub fn feature_index(piece: Piece, sq: Square, king_sq: Square, view: Player) -> usize {
    let mirror = king_sq.file() as u8 > 3;
    let mut oriented_sq = sq;
    if mirror {
        oriented_sq = oriented_sq.flip_file();
    }
    if view == Player::Black {
        oriented_sq = oriented_sq.flip_rank();
    }
    let owner = piece.player().expect("feature_index requires a real piece");
    let oriented_piece = (piece.piece_type() as usize) * 2 + if owner == view { 0 } else { 1 };

    let bucket = king_bucket(king_sq, mirror);
    bucket * 768 + oriented_piece * 64 + oriented_sq.0 as usize
}

/// Partitions the 64 king squares into `N_KING_BUCKETS` coarse equivalence
/// classes; the horizontal-mirror decision is folded in by the caller before
/// this is consulted, so only the non-mirrored half of the board needs an
/// entry per bucket.
fn king_bucket(king_sq: Square, mirror: bool) -> usize {
    let file = if mirror { 7 - king_sq.file() as u8 } else { king_sq.file() as u8 };
    let rank = king_sq.rank() as u8;
    // A simple, deterministic 10-way partition of the folded king square
    // (rank 0..7, file 0..3 after mirroring): four central files collapse
    // together at the back two ranks, the rest get individual buckets.
    const TABLE: [usize; 32] = [
        0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 8, 8, 8, 8, 8, 8, 9, 9, 9, 9, 9, 9, 9, 9,
    ];
    let folded = (rank as usize) * 4 + (file.min(3) as usize);
    TABLE[folded.min(31)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvid_core::types::PieceType;

    #[test]
    fn own_and_opponent_pieces_land_in_different_halves() {
        let king = Square::from_algebraic("e1").unwrap();
        let own_pawn = Piece::make(Player::White, PieceType::Pawn);
        let opp_pawn = Piece::make(Player::Black, PieceType::Pawn);
        let sq = Square::from_algebraic("e4").unwrap();
        let a = feature_index(own_pawn, sq, king, Player::White);
        let b = feature_index(opp_pawn, sq, king, Player::White);
        assert_ne!(a, b);
    }

    #[test]
    fn index_is_in_range() {
        let king = Square::from_algebraic("g1").unwrap();
        let piece = Piece::make(Player::White, PieceType::Queen);
        let sq = Square::from_algebraic("d4").unwrap();
        let idx = feature_index(piece, sq, king, Player::White);
        assert!(idx < crate::consts::N_FEATURES);
    }
}
