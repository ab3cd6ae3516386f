//! The 64x64 between-squares and line-through-squares tables.

use super::magic::{sliding_attacks_on_the_fly, MagicTable};
use crate::bitboard::BitBoard;
use crate::types::Square;

const ROOK_DELTAS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DELTAS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

pub fn build_ray_tables(bishop: &MagicTable, rook: &MagicTable) -> (Vec<BitBoard>, Vec<BitBoard>) {
    let _ = (bishop, rook); // tables built independently of the magic hash scheme
    let mut between = vec![BitBoard::default(); 64 * 64];
    let mut line = vec![BitBoard::default(); 64 * 64];

    for a in 0..64u8 {
        let sq_a = Square(a);
        for b in 0..64u8 {
            if a == b {
                continue;
            }
            let sq_b = Square(b);
            if let Some(deltas) = shared_direction(sq_a, sq_b) {
                let occ_with_b = BitBoard::from_sq(sq_b);
                let ray_from_a = sliding_attacks_on_the_fly(&deltas, sq_a, occ_with_b);
                if ray_from_a.has(sq_b) {
                    between[a as usize * 64 + b as usize] = ray_from_a & !BitBoard::from_sq(sq_b)
                        & sliding_attacks_on_the_fly(&deltas, sq_b, BitBoard::from_sq(sq_a));
                    let full_a = sliding_attacks_on_the_fly(&deltas, sq_a, BitBoard::default());
                    let full_b = sliding_attacks_on_the_fly(&deltas, sq_b, BitBoard::default());
                    line[a as usize * 64 + b as usize] =
                        (full_a & full_b) | BitBoard::from_sq(sq_a) | BitBoard::from_sq(sq_b);
                }
            }
        }
    }
    (between, line)
}

/// The single delta set (rook-like or bishop-like) connecting `a` and `b`, if
/// they share a rank, file, or diagonal.
fn shared_direction(a: Square, b: Square) -> Option<[(i32, i32); 4]> {
    let fa = a.0 as i32 % 8;
    let ra = a.0 as i32 / 8;
    let fb = b.0 as i32 % 8;
    let rb = b.0 as i32 / 8;
    if fa == fb || ra == rb {
        Some(ROOK_DELTAS)
    } else if (fa - fb).abs() == (ra - rb).abs() {
        Some(BISHOP_DELTAS)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::magic::{build_bishop_table, build_rook_table};
    use super::*;

    #[test]
    fn between_diagonal_squares() {
        let (between, _) = build_ray_tables(&build_bishop_table(), &build_rook_table());
        let a1 = Square::from_algebraic("a1").unwrap();
        let d4 = Square::from_algebraic("d4").unwrap();
        assert_eq!(between[a1.0 as usize * 64 + d4.0 as usize].popcount(), 2);
    }

    #[test]
    fn line_contains_both_endpoints() {
        let (_, line) = build_ray_tables(&build_bishop_table(), &build_rook_table());
        let a1 = Square::from_algebraic("a1").unwrap();
        let h8 = Square::from_algebraic("h8").unwrap();
        let l = line[a1.0 as usize * 64 + h8.0 as usize];
        assert!(l.has(a1));
        assert!(l.has(h8));
    }
}
