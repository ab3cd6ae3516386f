//! Knight, king, and pawn attack tables, computed by masked shifts with
//! file-wrap exclusion.

use crate::bitboard::BitBoard;
use crate::types::{Player, Square};

pub fn knight_table() -> [BitBoard; 64] {
    let mut table = [BitBoard::default(); 64];
    for i in 0..64u8 {
        let b = BitBoard::from_sq(Square(i));
        let mut targets = BitBoard::default();
        // One step in one axis, two in the other, each computed as two shifts
        // so file-wrap is excluded by the underlying shift primitives.
        targets |= b.shift_north().shift_north().shift_east();
        targets |= b.shift_north().shift_north().shift_west();
        targets |= b.shift_south().shift_south().shift_east();
        targets |= b.shift_south().shift_south().shift_west();
        targets |= b.shift_east().shift_east().shift_north();
        targets |= b.shift_east().shift_east().shift_south();
        targets |= b.shift_west().shift_west().shift_north();
        targets |= b.shift_west().shift_west().shift_south();
        table[i as usize] = targets;
    }
    table
}

pub fn king_table() -> [BitBoard; 64] {
    let mut table = [BitBoard::default(); 64];
    for i in 0..64u8 {
        let b = BitBoard::from_sq(Square(i));
        let mut targets = BitBoard::default();
        targets |= b.shift_north();
        targets |= b.shift_south();
        targets |= b.shift_east();
        targets |= b.shift_west();
        targets |= b.shift_north_east();
        targets |= b.shift_north_west();
        targets |= b.shift_south_east();
        targets |= b.shift_south_west();
        table[i as usize] = targets;
    }
    table
}

pub fn pawn_table() -> [[BitBoard; 64]; 2] {
    let mut table = [[BitBoard::default(); 64]; 2];
    for i in 0..64u8 {
        let b = BitBoard::from_sq(Square(i));
        table[Player::White as usize][i as usize] = b.shift_north_east() | b.shift_north_west();
        table[Player::Black as usize][i as usize] = b.shift_south_east() | b.shift_south_west();
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knight_center_has_eight_targets() {
        let table = knight_table();
        let d4 = Square::from_algebraic("d4").unwrap();
        assert_eq!(table[d4.0 as usize].popcount(), 8);
    }

    #[test]
    fn pawn_attacks_mirror_between_colors() {
        let table = pawn_table();
        let e4 = Square::from_algebraic("e4").unwrap();
        assert_eq!(
            table[Player::White as usize][e4.0 as usize].popcount(),
            2
        );
        assert_eq!(
            table[Player::Black as usize][e4.0 as usize].popcount(),
            2
        );
    }
}
