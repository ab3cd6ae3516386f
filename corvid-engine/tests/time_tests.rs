use corvid_engine::time::{GoLimits, TimeManager};
use std::time::Duration;

#[test]
fn depth_only_search_has_no_time_budget() {
    let limits = GoLimits { depth: Some(10), ..Default::default() };
    let tm = TimeManager::new(&limits, None, None, Duration::ZERO, 0);
    assert!(!tm.out_of_time());
    assert!(!tm.should_stop_soft());
}

#[test]
fn repeated_stable_best_move_relaxes_the_soft_stop() {
    let limits = GoLimits { wtime: Some(Duration::from_secs(10)), ..Default::default() };
    let mut tm = TimeManager::new(&limits, Some(Duration::from_secs(10)), None, Duration::ZERO, 0);
    let mv = corvid_core::mv::Move::new(
        corvid_core::types::Square(12),
        corvid_core::types::Square(28),
        corvid_core::types::Piece::WhitePawn,
        corvid_core::mv::MoveFlag::DoublePawnPush,
    );
    for _ in 0..8 {
        tm.record_iteration(mv, 20, 0, 0);
    }
    // Enough stable iterations should not force an immediate stop at time 0.
    assert!(!tm.should_stop_soft());
}
