//! Iterative-deepening PVS negamax: aspiration windows at the root, the
//! usual pruning/reduction/extension stack in the tree, and a capture-only
//! quiescence search at the leaves.

mod quiescence;

use crate::consts::{CHECKMATE, MAX_SEARCH_PLY, NodeKind, NonPV, PV};
use crate::eval::{evaluate, EvalContext};
use crate::history::{ButterflyHistory, CaptureHistory, ContinuationHistory, CounterMoveTable, CorrectionHistory, KillerTable};
use crate::movepick::{MovePicker, PickerContext, ProbCutPicker, CONTINUATION_OFFSETS, CONTINUATION_WEIGHTS};
use crate::nnue::accumulator::AccumulatorStack;
use crate::nnue::network::Network;
use crate::syzygy::{ProbeResult, TablebaseOracle, Wdl};
use crate::time::TimeManager;
use crate::tt::{Bound, TranspositionTable};
use corvid_core::board::Position;
use corvid_core::mv::{Move, NULL_MOVE};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub use quiescence::quiescence;

/// Per-worker mutable state that lives for the whole search: history
/// tables, the accumulator stack, and the per-ply scratch the negamax
/// recursion reads and writes.
pub struct SearchThread<'a> {
    pub network: &'a Network,
    pub tt: &'a TranspositionTable,
    pub tablebase: &'a dyn TablebaseOracle,
    pub stop: Arc<AtomicBool>,
    pub nodes: AtomicU64,

    pub accumulators: AccumulatorStack,
    pub butterfly: ButterflyHistory,
    pub capture_history: CaptureHistory,
    pub continuation: ContinuationHistory,
    pub counter_moves: CounterMoveTable,
    pub killers: KillerTable,
    pub correction: CorrectionHistory,

    pub contempt: i32,
    pub multi_pv: u32,
    excluded_root_moves: Vec<Move>,
    excluded_move: Option<Move>,

    pub seldepth: u32,
    pv_table: Vec<Vec<Move>>,
    ply_piece_to: Vec<Option<(usize, corvid_core::types::Square)>>,
}

impl<'a> SearchThread<'a> {
    pub fn new(network: &'a Network, tt: &'a TranspositionTable, stop: Arc<AtomicBool>) -> SearchThread<'a> {
        SearchThread::with_options(network, tt, &crate::syzygy::NO_TABLEBASE, stop, 0, 1)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_options(
        network: &'a Network,
        tt: &'a TranspositionTable,
        tablebase: &'a dyn TablebaseOracle,
        stop: Arc<AtomicBool>,
        contempt: i32,
        multi_pv: u32,
    ) -> SearchThread<'a> {
        SearchThread {
            network,
            tt,
            tablebase,
            stop,
            nodes: AtomicU64::new(0),
            accumulators: AccumulatorStack::new(network, MAX_SEARCH_PLY + 8),
            butterfly: ButterflyHistory::new(),
            capture_history: CaptureHistory::new(),
            continuation: ContinuationHistory::new(),
            counter_moves: CounterMoveTable::new(),
            killers: KillerTable::new(MAX_SEARCH_PLY + 8),
            correction: CorrectionHistory::new(crate::consts::PAWN_CORRECTION_SIZE),
            contempt,
            multi_pv: multi_pv.max(1),
            excluded_root_moves: Vec::new(),
            excluded_move: None,
            seldepth: 0,
            pv_table: vec![Vec::new(); MAX_SEARCH_PLY + 8],
            ply_piece_to: vec![None; MAX_SEARCH_PLY + 8],
        }
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    fn node(&self) -> u64 {
        self.nodes.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn eval_ctx(&self, ply: usize) -> EvalContext {
        EvalContext { contempt: self.contempt, at_root: ply == 0 }
    }
}

/// The (piece, to) played `offset` plies before `ply`, or `None` if the
/// search tree isn't that deep yet; used to index continuation history at
/// the lookback distances `CONTINUATION_OFFSETS` names.
fn piece_to_at_offset(thread: &SearchThread, ply: usize, offset: usize) -> Option<(usize, corvid_core::types::Square)> {
    ply.checked_sub(offset).and_then(|idx| thread.ply_piece_to[idx])
}

/// Result of one completed iterative-deepening pass. `multipv_index` is
/// 1-based, matching the UCI `multipv` option it is reported under.
pub struct IterationResult {
    pub depth: u32,
    pub score: i32,
    pub pv: Vec<Move>,
    pub multipv_index: u32,
}

/// Runs iterative deepening from `pos` until `time_manager` calls a soft
/// stop, `max_depth` is reached, or `thread.stop` is externally set.
/// `on_iteration` is invoked after each completed depth (and, when
/// `thread.multi_pv` is above 1, after each PV line within that depth) for
/// `info` output. The returned result is always the depth's primary
/// (multipv 1) line.
pub fn iterative_deepening(
    thread: &mut SearchThread,
    pos: &mut Position,
    time_manager: &mut TimeManager,
    max_depth: u32,
    mut on_iteration: impl FnMut(&IterationResult, &SearchThread),
) -> IterationResult {
    let mut best = IterationResult { depth: 0, score: 0, pv: Vec::new(), multipv_index: 1 };
    let mut score = 0;

    let root_move_count = corvid_core::movegen::generate_legal(pos, corvid_core::types::GenType::All).len();
    let lines_per_depth = thread.multi_pv.max(1).min(root_move_count.max(1) as u32);

    for depth in 1..=max_depth.max(1) {
        if thread.should_stop() || (depth > 1 && time_manager.out_of_time()) {
            break;
        }

        thread.excluded_root_moves.clear();
        let mut depth_best: Option<IterationResult> = None;

        for multipv_index in 1..=lines_per_depth {
            if thread.should_stop() || (depth > 1 && time_manager.out_of_time()) {
                break;
            }

            thread.seldepth = 0;
            let pv_score = aspiration_window(thread, pos, depth, score, time_manager);

            if thread.should_stop() {
                break;
            }

            let pv = thread.pv_table[0].clone();
            if pv.is_empty() {
                break;
            }
            thread.excluded_root_moves.push(pv[0]);

            let result = IterationResult { depth, score: pv_score, pv: pv.clone(), multipv_index };
            on_iteration(&result, thread);
            if multipv_index == 1 {
                score = pv_score;
                time_manager.record_iteration(pv[0], pv_score, 0, thread.nodes.load(Ordering::Relaxed));
                depth_best = Some(result);
            }
        }

        let Some(depth_best) = depth_best else { break };
        best = depth_best;

        if depth > 4 && time_manager.should_stop_soft() {
            break;
        }
    }

    best
}

fn aspiration_window(thread: &mut SearchThread, pos: &mut Position, depth: u32, prev_score: i32, time_manager: &TimeManager) -> i32 {
    if depth <= 4 {
        return negamax::<PV>(thread, pos, depth, 0, -CHECKMATE, CHECKMATE, time_manager);
    }

    let mut delta = 16;
    let mut alpha = (prev_score - delta).max(-CHECKMATE);
    let mut beta = (prev_score + delta).min(CHECKMATE);

    loop {
        let score = negamax::<PV>(thread, pos, depth, 0, alpha, beta, time_manager);
        if thread.should_stop() {
            return score;
        }
        if score <= alpha {
            beta = (alpha + beta) / 2;
            alpha = (score - delta).max(-CHECKMATE);
        } else if score >= beta {
            beta = (score + delta).min(CHECKMATE);
        } else {
            return score;
        }
        delta += delta / 2;
    }
}

#[allow(clippy::too_many_arguments)]
fn negamax<N: NodeKind>(
    thread: &mut SearchThread,
    pos: &mut Position,
    mut depth: u32,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    time_manager: &TimeManager,
) -> i32 {
    thread.pv_table[ply].clear();
    let in_check = pos.in_check();

    if in_check {
        depth += 1;
    }

    if depth == 0 {
        return quiescence(thread, pos, ply, alpha, beta, 0);
    }

    let is_root = ply == 0;
    if !is_root {
        if pos.is_repetition_draw(ply) || pos.halfmove_clock() >= 100 {
            return 0;
        }
        // Upcoming-repetition cycle: a single reversible move would recreate
        // an earlier position, so treat the line as drawish without waiting
        // for a literal two-fold match.
        if pos.has_cycle(ply) {
            if 0 >= beta {
                return 0;
            }
            alpha = alpha.max(0);
        }
        // Mate-distance pruning: a shorter mate than the current bound
        // cannot improve on it.
        let mate_alpha = (-CHECKMATE + ply as i32).max(alpha);
        let mate_beta = (CHECKMATE - ply as i32 - 1).min(beta);
        if mate_alpha >= mate_beta {
            return mate_alpha;
        }
        alpha = mate_alpha;
    }

    thread.node();
    if ply as u32 > thread.seldepth {
        thread.seldepth = ply as u32;
    }

    if ply >= MAX_SEARCH_PLY {
        let ctx = thread.eval_ctx(ply);
        return evaluate(&mut thread.accumulators, ply, pos, thread.network, ctx);
    }

    let tt_hit = thread.tt.probe(pos.zobrist(), ply);
    let tt_move = tt_hit.map(|d| d.mv).unwrap_or(NULL_MOVE);
    if !N::IS_PV {
        if let Some(data) = tt_hit {
            if data.depth as u32 >= depth {
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
        }
    }

    // Syzygy probe: positions with castling rights or more pieces than the
    // configured tables cover aren't representable in the WDL table format,
    // so this only ever fires deep into an endgame.
    if !is_root && pos.castling().is_empty() {
        let piece_count = pos.occupied().popcount();
        if piece_count <= thread.tablebase.max_pieces() {
            if let ProbeResult::Wdl(wdl) = thread.tablebase.probe_wdl(pos) {
                thread.node();
                let tb_score = match wdl {
                    Wdl::Win => CHECKMATE - MAX_SEARCH_PLY as i32 - ply as i32,
                    Wdl::CursedWin => 0,
                    Wdl::Draw => 0,
                    Wdl::BlessedLoss => 0,
                    Wdl::Loss => -(CHECKMATE - MAX_SEARCH_PLY as i32 - ply as i32),
                };
                let bound = match wdl {
                    Wdl::Win => Bound::Lower,
                    Wdl::Loss => Bound::Upper,
                    _ => Bound::Exact,
                };
                let usable = match bound {
                    Bound::Lower => tb_score >= beta,
                    Bound::Upper => tb_score <= alpha,
                    _ => true,
                };
                if usable {
                    let depth_u8 = depth.min(u8::MAX as u32) as u8;
                    thread.tt.store(pos.zobrist(), ply, depth_u8, tb_score, tb_score, bound, false, NULL_MOVE);
                    return tb_score;
                }
            }
        }
    }

    let static_eval = if in_check {
        -CHECKMATE + ply as i32
    } else {
        let ctx = thread.eval_ctx(ply);
        let raw = evaluate(&mut thread.accumulators, ply, pos, thread.network, ctx);
        raw + thread.correction.get(pos.zobrist(), pos.side_to_move())
    };

    // Reverse futility pruning: a comfortably-ahead static eval at shallow
    // depth is assumed to hold up without searching further.
    if !N::IS_PV && !in_check && depth <= 8 {
        let margin = 80 * depth as i32;
        if static_eval - margin >= beta {
            return static_eval - margin;
        }
    }

    // Razoring: a static eval far below alpha at shallow depth is assumed
    // to be beyond saving by ordinary moves; drop straight to quiescence
    // and trust its verdict instead of spending a full-depth search on it.
    if !N::IS_PV && !in_check && depth <= 3 {
        let margin = 300 + 200 * depth as i32;
        if static_eval + margin <= alpha {
            let razor_score = quiescence(thread, pos, ply, alpha, beta, 0);
            if razor_score <= alpha {
                return razor_score;
            }
        }
    }

    // Null-move pruning: skip a turn and see if the opponent is still in
    // trouble; only sound when not in check and with non-pawn material left.
    if !N::IS_PV && !in_check && depth >= 3 && static_eval >= beta && pos.has_non_pawn_material(pos.side_to_move()) {
        let reduction = 3 + depth / 4;
        pos.make_null_move();
        thread.accumulators.invalidate(ply + 1);
        let score = -negamax::<NonPV>(thread, pos, depth.saturating_sub(reduction).max(0), ply + 1, -beta, -beta + 1, time_manager);
        pos.undo_null_move();
        if thread.should_stop() {
            return 0;
        }
        if score >= beta {
            return beta;
        }
    }

    // ProbCut: a handful of good captures searched shallow at a raised beta;
    // if one holds up there's little point searching the rest of the node
    // at full depth just to confirm what's already obvious.
    if !N::IS_PV && !in_check && depth >= 5 && beta.abs() < CHECKMATE - MAX_SEARCH_PLY as i32 {
        let probcut_beta = beta + 150;
        let see_threshold = probcut_beta - static_eval;
        let probcut_moves: Vec<Move> = ProbCutPicker::new(pos, tt_move, see_threshold).collect();
        for mv in probcut_moves {
            if thread.should_stop() || time_manager.out_of_time() {
                break;
            }
            pos.make_move(mv);
            thread.accumulators.invalidate(ply + 1);
            let qscore = -quiescence(thread, pos, ply + 1, -probcut_beta, -probcut_beta + 1, 0);
            let score = if qscore >= probcut_beta {
                -negamax::<NonPV>(thread, pos, depth.saturating_sub(4), ply + 1, -probcut_beta, -probcut_beta + 1, time_manager)
            } else {
                qscore
            };
            pos.undo_move(mv);
            if thread.should_stop() {
                return 0;
            }
            if score >= probcut_beta {
                return score;
            }
        }
    }

    // Internal iterative reduction: without a hash move to try first, the
    // ordering at this node is weaker than usual, so shave a ply off the
    // depth rather than spend a full search confirming it.
    if tt_move == NULL_MOVE && depth >= 4 {
        depth -= 1;
    }

    let ctx = PickerContext {
        butterfly: &thread.butterfly,
        capture: &thread.capture_history,
        continuation: &thread.continuation,
        counter_moves: &thread.counter_moves,
        killers: thread.killers.get(ply),
        counter_move_piece_to: piece_to_at_offset(thread, ply, 1),
        prev_continuations: CONTINUATION_OFFSETS.map(|offset| piece_to_at_offset(thread, ply, offset)),
    };
    let picker = MovePicker::new(pos, tt_move, ctx);
    let moves: Vec<Move> = if is_root && !thread.excluded_root_moves.is_empty() {
        // MultiPV: lines already reported this depth are skipped so the
        // next iteration searches among the remaining root moves.
        picker.filter(|mv| !thread.excluded_root_moves.contains(mv)).collect()
    } else if let Some(excluded) = thread.excluded_move {
        picker.filter(|mv| *mv != excluded).collect()
    } else {
        picker.collect()
    };

    let mut best_score = -CHECKMATE;
    let mut best_move = NULL_MOVE;
    let mut moves_searched = 0;
    let mut bound = Bound::Upper;

    for mv in moves {
        if thread.should_stop() || time_manager.out_of_time() {
            break;
        }

        let is_quiet = !mv.is_capture() && !mv.is_promotion();
        let piece_idx = mv.piece() as usize;

        // Late move pruning: skip late quiets at shallow depth once the
        // position looks settled.
        if !N::IS_PV && !in_check && is_quiet && depth <= 6 && moves_searched as u32 >= 3 + depth * depth {
            continue;
        }

        // Singular extensions and multi-cut: verify the hash move is the
        // only move that clears a window just under its stored score. If
        // nothing else comes close, the hash move is worth an extra ply; if
        // something else also clears it, the node is already decided.
        let mut extension = 0;
        if !is_root && mv == tt_move && depth >= 8 {
            if let Some(data) = tt_hit {
                if data.bound != Bound::Upper && data.depth as u32 + 3 <= depth {
                    let singular_beta = data.score - 2 * depth as i32;
                    let singular_depth = (depth - 1) / 2;
                    thread.excluded_move = Some(tt_move);
                    let s_score = negamax::<NonPV>(thread, pos, singular_depth, ply, singular_beta - 1, singular_beta, time_manager);
                    thread.excluded_move = None;
                    if thread.should_stop() {
                        return 0;
                    }
                    if s_score < singular_beta {
                        extension = 1;
                    } else if singular_beta >= beta {
                        return singular_beta;
                    }
                }
            }
        }

        pos.make_move(mv);
        thread.accumulators.invalidate(ply + 1);
        thread.ply_piece_to[ply] = Some((piece_idx, mv.to_sq()));

        let gives_check = pos.in_check();
        if gives_check {
            extension = extension.max(1);
        }

        let mut reduction = 0;
        if depth >= 3 && moves_searched >= 3 && is_quiet && !in_check {
            reduction = 1 + (depth / 3).min(3);
        }

        let mut score;
        if moves_searched == 0 {
            score = -negamax::<N>(thread, pos, (depth + extension).saturating_sub(1), ply + 1, -beta, -alpha, time_manager);
        } else {
            let reduced_depth = depth.saturating_sub(1 + reduction).max(0);
            score = -negamax::<NonPV>(thread, pos, reduced_depth + extension, ply + 1, -alpha - 1, -alpha, time_manager);
            if score > alpha && (reduction > 0 || N::IS_PV) {
                score = -negamax::<NonPV>(thread, pos, (depth + extension).saturating_sub(1), ply + 1, -alpha - 1, -alpha, time_manager);
            }
            if score > alpha && N::IS_PV {
                score = -negamax::<PV>(thread, pos, (depth + extension).saturating_sub(1), ply + 1, -beta, -alpha, time_manager);
            }
        }

        pos.undo_move(mv);
        moves_searched += 1;

        if thread.should_stop() {
            return 0;
        }

        if score > best_score {
            best_score = score;
            best_move = mv;

            if N::IS_PV {
                let (head, tail) = thread.pv_table.split_at_mut(ply + 1);
                head[ply].clear();
                head[ply].push(mv);
                if let Some(child) = tail.first() {
                    head[ply].extend_from_slice(child);
                }
            }

            if score > alpha {
                alpha = score;
                bound = Bound::Exact;
            }
        }

        if alpha >= beta {
            bound = Bound::Lower;
            let bonus = (depth * depth) as i32;
            if is_quiet {
                thread.killers.push(ply, mv);
                let stm = pos.side_to_move();
                let occ = pos.occupied();
                let from_threatened = pos.is_attacked_by(mv.from_sq(), !stm, occ);
                let to_threatened = pos.is_attacked_by(mv.to_sq(), !stm, occ);
                thread.butterfly.update(stm, from_threatened, to_threatened, mv, bonus);
                // Fail-high bonus formula: weight the immediate reply (ply-1)
                // and its predecessor (ply-2) twice as heavily as the
                // longer-range ply-4/ply-6 echoes.
                for (offset, weight) in CONTINUATION_OFFSETS.into_iter().zip(CONTINUATION_WEIGHTS) {
                    if let Some(prev) = piece_to_at_offset(thread, ply, offset) {
                        thread.continuation.update(false, prev.0, prev.1, piece_idx, mv.to_sq(), weight * bonus);
                    }
                }
                if let Some(prev) = piece_to_at_offset(thread, ply, 1) {
                    thread.counter_moves.set(prev.0, prev.1, mv);
                }
            } else {
                let captured = pos.piece_at(mv.to_sq());
                let defended = captured
                    .player()
                    .is_some_and(|owner| pos.is_attacked_by(mv.to_sq(), owner, pos.occupied()));
                thread.capture_history.update(piece_idx, mv.to_sq(), defended, captured.piece_type(), bonus);
            }
            break;
        }
    }

    if moves_searched == 0 {
        return if in_check { -CHECKMATE + ply as i32 } else { 0 };
    }

    if !in_check && !best_move.is_capture() && !best_move.is_promotion() {
        let error = best_score - static_eval;
        thread.correction.update(pos.zobrist(), pos.side_to_move(), error, 32);
    }

    let depth_u8 = depth.min(u8::MAX as u32) as u8;
    thread.tt.store(pos.zobrist(), ply, depth_u8, best_score, static_eval, bound, N::IS_PV, best_move);

    best_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::GoLimits;

    #[test]
    fn finds_mate_in_one() {
        let network = Network::default_embedded();
        let tt = TranspositionTable::new(4).unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let mut thread = SearchThread::new(&network, &tt, stop);
        let mut pos = Position::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        let mut tm = TimeManager::new(&GoLimits { infinite: true, ..Default::default() }, None, None, std::time::Duration::ZERO, 0);
        let result = iterative_deepening(&mut thread, &mut pos, &mut tm, 6, |_, _| {});
        assert!(result.score >= CHECKMATE - 10);
        assert!(!result.pv.is_empty());
    }

    #[test]
    fn startpos_search_returns_a_legal_move() {
        let network = Network::default_embedded();
        let tt = TranspositionTable::new(4).unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let mut thread = SearchThread::new(&network, &tt, stop);
        let mut pos = Position::startpos();
        let mut tm = TimeManager::new(&GoLimits { infinite: true, ..Default::default() }, None, None, std::time::Duration::ZERO, 0);
        let result = iterative_deepening(&mut thread, &mut pos, &mut tm, 3, |_, _| {});
        assert!(!result.pv.is_empty());
        assert!(pos.is_legal(result.pv[0]));
    }
}
