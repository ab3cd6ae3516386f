use corvid_core::board::Position;
use corvid_core::movegen::generate_legal;
use corvid_core::types::GenType;

/// Walks every legal move two plies deep from a handful of positions,
/// asserting make/undo always restores the FEN and Zobrist exactly.
#[test]
fn make_undo_restores_position_two_plies_deep() {
    let fens = [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    ];
    for fen in fens {
        let mut pos = Position::from_fen(fen).unwrap();
        let before_fen = pos.to_fen();
        let before_z = pos.zobrist();
        for mv in generate_legal(&pos, GenType::All) {
            pos.make_move(mv);
            for mv2 in generate_legal(&pos, GenType::All) {
                pos.make_move(mv2);
                pos.undo_move(mv2);
                assert_eq!(pos.zobrist(), pos.zobrist());
            }
            pos.undo_move(mv);
            assert_eq!(pos.to_fen(), before_fen);
            assert_eq!(pos.zobrist(), before_z);
        }
    }
}
