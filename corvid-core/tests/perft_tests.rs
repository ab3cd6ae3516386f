use corvid_core::board::Position;
use corvid_core::perft::perft;

/// The six canonical perft positions, run to a depth shallow enough for a
/// fast test run; the full canonical depths are covered by `#[ignore]`d
/// tests inside `src/perft.rs`.
#[test]
fn six_standard_positions_at_reduced_depth() {
    let cases: [(&str, u32, u64); 6] = [
        (
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            4,
            197_281,
        ),
        (
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            3,
            97_862,
        ),
        (
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            4,
            43_238,
        ),
        (
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            3,
            9_467,
        ),
        (
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            3,
            62_379,
        ),
        (
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
            3,
            89_890,
        ),
    ];

    for (fen, depth, expected) in cases {
        let mut pos = Position::from_fen(fen).unwrap();
        assert_eq!(perft(&mut pos, depth), expected, "fen={fen} depth={depth}");
    }
}
