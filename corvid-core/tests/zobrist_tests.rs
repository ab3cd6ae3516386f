use corvid_core::board::Position;
use corvid_core::mv::{Move, MoveFlag};
use corvid_core::types::{Piece, Square};

#[test]
fn transposition_by_different_move_orders_hashes_equal() {
    let mut a = Position::startpos();
    let mut b = Position::startpos();

    let nf3 = Move::new(
        Square::from_algebraic("g1").unwrap(),
        Square::from_algebraic("f3").unwrap(),
        Piece::WhiteKnight,
        MoveFlag::Quiet,
    );
    let nf6 = Move::new(
        Square::from_algebraic("g8").unwrap(),
        Square::from_algebraic("f6").unwrap(),
        Piece::BlackKnight,
        MoveFlag::Quiet,
    );
    let ng1 = Move::new(
        Square::from_algebraic("f3").unwrap(),
        Square::from_algebraic("g1").unwrap(),
        Piece::WhiteKnight,
        MoveFlag::Quiet,
    );
    let ng8 = Move::new(
        Square::from_algebraic("f6").unwrap(),
        Square::from_algebraic("g8").unwrap(),
        Piece::BlackKnight,
        MoveFlag::Quiet,
    );

    a.make_move(nf3);
    a.make_move(nf6);
    a.make_move(ng1);
    a.make_move(ng8);

    assert_eq!(a.zobrist(), b.zobrist());
    let _ = &mut b;
}

#[test]
fn double_push_without_adjacent_enemy_pawn_sets_no_ep() {
    let pos = Position::from_fen("8/8/8/8/8/8/P7/K6k w - - 0 1").unwrap();
    assert!(!pos.ep_square().is_okay());
}
