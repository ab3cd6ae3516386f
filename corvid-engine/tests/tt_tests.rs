use corvid_core::mv::{Move, MoveFlag};
use corvid_core::types::{Piece, Square};
use corvid_engine::tt::{Bound, TranspositionTable};

#[test]
fn deep_entry_is_not_overwritten_by_a_shallower_one() {
    let tt = TranspositionTable::new(1).unwrap();
    let key = 0x1234_5678_9ABC_DEF0;
    let mv = Move::new(Square(4), Square(20), Piece::WhiteKnight, MoveFlag::Quiet);

    tt.store(key, 0, 20, 55, 50, Bound::Exact, false, mv);
    tt.store(key, 0, 2, -10, -5, Bound::Upper, false, mv);

    let data = tt.probe(key, 0).unwrap();
    assert_eq!(data.depth, 20);
    assert_eq!(data.score, 55);
}

#[test]
fn mate_scores_are_normalized_and_denormalized_around_ply() {
    let tt = TranspositionTable::new(1).unwrap();
    let key = 0x0F0F_0F0F_0F0F_0F0F;
    let mv = Move::new(Square(0), Square(1), Piece::WhiteKing, MoveFlag::Quiet);

    tt.store(key, 5, 10, 31_900, 31_900, Bound::Exact, true, mv);
    let data = tt.probe(key, 5).unwrap();
    assert_eq!(data.score, 31_900);
}

#[test]
fn miss_on_a_never_stored_key_returns_none() {
    let tt = TranspositionTable::new(1).unwrap();
    assert!(tt.probe(0xDEAD_DEAD_DEAD_DEAD, 0).is_none());
}
