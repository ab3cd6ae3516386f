//! Static Exchange Evaluation: simulates the capture exchange on a square and
//! reports whether it nets at least a given threshold, without playing moves
//! on the real board.

use crate::attacks::{bishop_attacks, rook_attacks};
use crate::bitboard::BitBoard;
use crate::board::Position;
use crate::mv::{Move, MoveFlag};
use crate::types::PieceType;

/// Returns true if the capture/exchange initiated by `mv` nets at least
/// `threshold` pawns of material for the side to move. Promotions, castles,
/// and en-passant are treated as unconditionally satisfying any reasonable
/// threshold, matching the "not worth simulating" carve-out.
pub fn see_ge(pos: &Position, mv: Move, threshold: i32) -> bool {
    if mv.is_promotion() || mv.is_castle() || mv.is_en_passant() {
        return threshold <= PieceType::Pawn.see_value();
    }

    let from = mv.from_sq();
    let to = mv.to_sq();
    let mut moving_pt = pos.piece_at(from).piece_type();
    let mut balance = captured_value(pos, mv) - threshold;
    if balance < 0 {
        return false;
    }
    balance -= moving_pt.see_value();
    if balance >= 0 {
        return true;
    }

    let mut occ = pos.occupied() & !BitBoard::from_sq(from);
    let bishops_queens_both = pos.pieces_of_type(PieceType::Bishop) | pos.pieces_of_type(PieceType::Queen);
    let rooks_queens_both = pos.pieces_of_type(PieceType::Rook) | pos.pieces_of_type(PieceType::Queen);

    let mut attackers = pos.attackers_to(to, occ) & occ;
    let mut side = !pos.side_to_move();

    loop {
        let side_attackers = attackers & pos.occupancy(side);
        if side_attackers.is_empty() {
            break;
        }
        let attacker_sq = least_valuable_attacker(pos, side_attackers, &mut moving_pt);
        occ &= !BitBoard::from_sq(attacker_sq);

        // Re-expose sliding attackers behind the piece that just moved.
        attackers &= occ;
        attackers |= bishop_attacks(to, occ) & bishops_queens_both & occ;
        attackers |= rook_attacks(to, occ) & rooks_queens_both & occ;

        balance = -balance - 1 - moving_pt.see_value();
        side = !side;
        if balance >= 0 {
            // If the side to move after this exchange step has no reply
            // and still stands to gain, the exchange favors the attacker.
            if moving_pt == PieceType::King && !(attackers & pos.occupancy(side)).is_empty() {
                side = !side;
            }
            break;
        }
    }
    side != pos.side_to_move()
}

fn captured_value(pos: &Position, mv: Move) -> i32 {
    if mv.flag() == MoveFlag::EnPassant {
        PieceType::Pawn.see_value()
    } else {
        let captured = pos.piece_at(mv.to_sq());
        if captured.is_none() {
            0
        } else {
            captured.piece_type().see_value()
        }
    }
}

/// Finds the least valuable attacker in `attackers`, returning its square and
/// writing its piece type through `out_pt`.
fn least_valuable_attacker(pos: &Position, attackers: BitBoard, out_pt: &mut PieceType) -> crate::types::Square {
    let mut best_sq = attackers.lsb();
    let mut best_val = i32::MAX;
    for sq in attackers {
        let pt = pos.piece_at(sq).piece_type();
        let val = pt.see_value();
        if val < best_val {
            best_val = val;
            best_sq = sq;
            *out_pt = pt;
        }
    }
    best_sq
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mv::MoveFlag;
    use crate::types::{Piece, Square};

    #[test]
    fn simple_pawn_trade_is_even() {
        // White pawn on e4 can capture a black pawn on d5, defended by
        // nothing else: a straightforward pawn-for-pawn trade nets zero.
        let pos = Position::from_fen(
            "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2",
        )
        .unwrap();
        let mv = Move::new(
            Square::from_algebraic("e4").unwrap(),
            Square::from_algebraic("d5").unwrap(),
            Piece::WhitePawn,
            MoveFlag::Capture,
        );
        assert!(see_ge(&pos, mv, 0));
        assert!(!see_ge(&pos, mv, 100));
    }
}
