//! Static attack tables: leaper attacks, magic-bitboard slider attacks, and the
//! between/pin-ray tables built on top of them.
//!
//! Everything here is computed once, lazily, behind a [`once_cell::sync::Lazy`]
//! static and treated as immutable afterward.

mod leapers;
mod magic;
mod rays;

use crate::bitboard::BitBoard;
use crate::types::{Player, Square};
use once_cell::sync::Lazy;

pub use magic::sliding_attacks_on_the_fly;

struct Attacks {
    knight: [BitBoard; 64],
    king: [BitBoard; 64],
    pawn: [[BitBoard; 64]; 2],
    bishop: magic::MagicTable,
    rook: magic::MagicTable,
    between: Vec<BitBoard>,
    line: Vec<BitBoard>,
}

static ATTACKS: Lazy<Attacks> = Lazy::new(|| {
    let bishop = magic::build_bishop_table();
    let rook = magic::build_rook_table();
    let (between, line) = rays::build_ray_tables(&bishop, &rook);
    Attacks {
        knight: leapers::knight_table(),
        king: leapers::king_table(),
        pawn: leapers::pawn_table(),
        bishop,
        rook,
        between,
        line,
    }
});

#[inline]
pub fn knight_attacks(sq: Square) -> BitBoard {
    ATTACKS.knight[sq.0 as usize]
}

#[inline]
pub fn king_attacks(sq: Square) -> BitBoard {
    ATTACKS.king[sq.0 as usize]
}

#[inline]
pub fn pawn_attacks(player: Player, sq: Square) -> BitBoard {
    ATTACKS.pawn[player as usize][sq.0 as usize]
}

#[inline]
pub fn bishop_attacks(sq: Square, occupied: BitBoard) -> BitBoard {
    ATTACKS.bishop.attacks(sq, occupied)
}

#[inline]
pub fn rook_attacks(sq: Square, occupied: BitBoard) -> BitBoard {
    ATTACKS.rook.attacks(sq, occupied)
}

#[inline]
pub fn queen_attacks(sq: Square, occupied: BitBoard) -> BitBoard {
    bishop_attacks(sq, occupied) | rook_attacks(sq, occupied)
}

/// The open ray strictly between `a` and `b` if they share a rank, file, or
/// diagonal; otherwise empty.
#[inline]
pub fn between(a: Square, b: Square) -> BitBoard {
    ATTACKS.between[a.0 as usize * 64 + b.0 as usize]
}

/// The full line through `a` and `b` (both endpoints included) if they share a
/// rank, file, or diagonal; otherwise empty. Used to restrict a pinned piece's
/// pseudo-legal targets to the ray back to its king.
#[inline]
pub fn line_through(a: Square, b: Square) -> BitBoard {
    ATTACKS.line[a.0 as usize * 64 + b.0 as usize]
}

/// All squares (of either color) attacking `sq` given the full board occupancy
/// and per-color-per-type piece boards, indexed `[color][piece_type]`.
pub fn attackers_to(sq: Square, occupied: BitBoard, boards: &[[BitBoard; 6]; 2]) -> BitBoard {
    use crate::types::PieceType;
    let knights = boards[0][PieceType::Knight as usize] | boards[1][PieceType::Knight as usize];
    let kings = boards[0][PieceType::King as usize] | boards[1][PieceType::King as usize];
    let bishops_queens = boards[0][PieceType::Bishop as usize]
        | boards[1][PieceType::Bishop as usize]
        | boards[0][PieceType::Queen as usize]
        | boards[1][PieceType::Queen as usize];
    let rooks_queens = boards[0][PieceType::Rook as usize]
        | boards[1][PieceType::Rook as usize]
        | boards[0][PieceType::Queen as usize]
        | boards[1][PieceType::Queen as usize];

    let mut attackers = knight_attacks(sq) & knights;
    attackers |= king_attacks(sq) & kings;
    attackers |= bishop_attacks(sq, occupied) & bishops_queens;
    attackers |= rook_attacks(sq, occupied) & rooks_queens;
    attackers |= pawn_attacks(Player::White, sq) & boards[1][PieceType::Pawn as usize];
    attackers |= pawn_attacks(Player::Black, sq) & boards[0][PieceType::Pawn as usize];
    attackers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knight_corner_has_two_targets() {
        let a8 = Square(0);
        assert_eq!(knight_attacks(a8).popcount(), 2);
    }

    #[test]
    fn king_center_has_eight_targets() {
        let e4 = Square::from_algebraic("e4").unwrap();
        assert_eq!(king_attacks(e4).popcount(), 8);
    }

    #[test]
    fn rook_open_board_has_fourteen_targets() {
        let d4 = Square::from_algebraic("d4").unwrap();
        assert_eq!(rook_attacks(d4, BitBoard::from_sq(d4)).popcount(), 14);
    }

    #[test]
    fn bishop_open_board_from_corner() {
        let a1 = Square::from_algebraic("a1").unwrap();
        assert_eq!(bishop_attacks(a1, BitBoard::from_sq(a1)).popcount(), 7);
    }

    #[test]
    fn between_on_shared_rank() {
        let a1 = Square::from_algebraic("a1").unwrap();
        let d1 = Square::from_algebraic("d1").unwrap();
        assert_eq!(between(a1, d1).popcount(), 2);
    }

    #[test]
    fn between_unrelated_squares_is_empty() {
        let a1 = Square::from_algebraic("a1").unwrap();
        let b3 = Square::from_algebraic("b3").unwrap();
        assert!(between(a1, b3).is_empty());
    }
}
