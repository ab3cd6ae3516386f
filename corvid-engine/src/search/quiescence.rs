//! Capture-only search at the leaves of the main tree: resolves tactical
//! sequences (captures, check evasions, and promotions) before trusting the
//! static evaluation.

use super::SearchThread;
use crate::consts::{CHECKMATE, MAX_SEARCH_PLY};
use crate::eval::evaluate;
use crate::movepick::QuiescencePicker;
use crate::tt::Bound;
use corvid_core::board::Position;
use corvid_core::mv::NULL_MOVE;
use corvid_core::see::see_ge;

const MAX_QUIESCENCE_PLY_EXTRA: usize = 16;

pub fn quiescence(thread: &mut SearchThread, pos: &mut Position, ply: usize, mut alpha: i32, beta: i32, qply: u32) -> i32 {
    thread.node();
    if ply as u32 > thread.seldepth {
        thread.seldepth = ply as u32;
    }

    if ply >= MAX_SEARCH_PLY + MAX_QUIESCENCE_PLY_EXTRA {
        let ctx = thread.eval_ctx(ply);
        return evaluate(&mut thread.accumulators, ply.min(MAX_SEARCH_PLY - 1), pos, thread.network, ctx);
    }

    let in_check = pos.in_check() && qply < 16;

    if let Some(data) = thread.tt.probe(pos.zobrist(), ply) {
        let usable = match data.bound {
            Bound::Exact => true,
            Bound::Lower => data.score >= beta,
            Bound::Upper => data.score <= alpha,
            Bound::None => false,
        };
        if usable {
            return data.score;
        }
    }

    let static_eval = if in_check {
        -CHECKMATE + ply as i32
    } else {
        let ctx = thread.eval_ctx(ply);
        let raw = evaluate(&mut thread.accumulators, ply, pos, thread.network, ctx);
        raw + thread.correction.get(pos.zobrist(), pos.side_to_move())
    };

    if !in_check {
        if static_eval >= beta {
            return static_eval;
        }
        if static_eval > alpha {
            alpha = static_eval;
        }
    }

    let picker = QuiescencePicker::new(pos, &thread.capture_history, in_check);
    let moves: Vec<_> = picker.collect();

    let mut best_score = if in_check { -CHECKMATE + ply as i32 } else { static_eval };
    let mut best_move = NULL_MOVE;
    let mut searched_any = false;

    for mv in moves {
        if !in_check && !see_ge(pos, mv, 0) {
            continue;
        }

        pos.make_move(mv);
        thread.accumulators.invalidate(ply + 1);
        let score = -quiescence(thread, pos, ply + 1, -beta, -alpha, qply + 1);
        pos.undo_move(mv);
        searched_any = true;

        if score > best_score {
            best_score = score;
            best_move = mv;
            if score > alpha {
                alpha = score;
            }
        }
        if alpha >= beta {
            break;
        }
    }

    if in_check && !searched_any {
        return -CHECKMATE + ply as i32;
    }

    let bound = if best_score >= beta {
        Bound::Lower
    } else if best_move.is_null() {
        Bound::Upper
    } else {
        Bound::Exact
    };
    thread.tt.store(pos.zobrist(), ply, 0, best_score, static_eval, bound, false, best_move);

    best_score
}
