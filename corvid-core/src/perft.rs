//! Perft: exhaustive move-count enumeration, used to validate move generation
//! against known node counts.

use crate::board::Position;
use crate::movegen::generate_legal;
use crate::types::GenType;

pub fn perft(pos: &mut Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = generate_legal(pos, GenType::All);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0u64;
    for mv in moves {
        pos.make_move(mv);
        nodes += perft(pos, depth - 1);
        pos.undo_move(mv);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_depth_3() {
        let mut pos = Position::startpos();
        assert_eq!(perft(&mut pos, 3), 8_902);
    }

    #[test]
    fn startpos_depth_4() {
        let mut pos = Position::startpos();
        assert_eq!(perft(&mut pos, 4), 197_281);
    }

    #[test]
    fn kiwipete_depth_3() {
        let mut pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&mut pos, 3), 97_862);
    }

    #[test]
    #[ignore] // multi-minute even in release mode
    fn startpos_depth_6_canonical() {
        let mut pos = Position::startpos();
        assert_eq!(perft(&mut pos, 6), 119_060_324);
    }

    #[test]
    #[ignore]
    fn kiwipete_depth_5_canonical() {
        let mut pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&mut pos, 5), 193_690_690);
    }
}
