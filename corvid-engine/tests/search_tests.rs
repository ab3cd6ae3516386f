use corvid_core::board::Position;
use corvid_engine::nnue::network::Network;
use corvid_engine::search::{iterative_deepening, SearchThread};
use corvid_engine::time::{GoLimits, TimeManager};
use corvid_engine::tt::TranspositionTable;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn back_rank_mate_in_one_is_found() {
    let network = Network::default_embedded();
    let tt = TranspositionTable::new(4).unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let mut thread = SearchThread::new(&network, &tt, stop);
    // White rook delivers mate on the back rank.
    let mut pos = Position::from_fen("6k1/5ppp/8/8/8/8/8/4R1K1 w - - 0 1").unwrap();
    let mut tm = TimeManager::new(&GoLimits { infinite: true, ..Default::default() }, None, None, Duration::ZERO, 0);

    let result = iterative_deepening(&mut thread, &mut pos, &mut tm, 5, |_, _| {});
    assert!(result.score > 30_000);
}

#[test]
fn repeated_search_of_same_position_reuses_the_tt() {
    let network = Network::default_embedded();
    let tt = TranspositionTable::new(4).unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    let mut thread_a = SearchThread::new(&network, &tt, stop.clone());
    let mut pos = Position::startpos();
    let mut tm_a = TimeManager::new(&GoLimits { infinite: true, ..Default::default() }, None, None, Duration::ZERO, 0);
    iterative_deepening(&mut thread_a, &mut pos, &mut tm_a, 4, |_, _| {});

    assert!(tt.hashfull() > 0);
}

#[test]
fn depth_limited_search_terminates_promptly() {
    let network = Network::default_embedded();
    let tt = TranspositionTable::new(4).unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let mut thread = SearchThread::new(&network, &tt, stop);
    let mut pos = Position::from_fen("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1").unwrap();
    let mut tm = TimeManager::new(&GoLimits { infinite: true, ..Default::default() }, None, None, Duration::ZERO, 0);

    let result = iterative_deepening(&mut thread, &mut pos, &mut tm, 3, |_, _| {});
    assert!(result.depth <= 4);
    assert!(pos.is_legal(result.pv[0]));
}
