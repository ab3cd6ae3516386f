//! Staged move picker: yields moves in the order the search wants to try
//! them without ever materializing and sorting a full legal-move list.

use crate::history::{ButterflyHistory, CaptureHistory, ContinuationHistory, CounterMoveTable};
use corvid_core::board::Position;
use corvid_core::mv::{Move, MoveList, NULL_MOVE};
use corvid_core::movegen::generate;
use corvid_core::see::see_ge;
use corvid_core::types::{GenType, Player};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Stage {
    HashMove,
    GenerateNoisy,
    GoodNoisy,
    Killer1,
    Killer2,
    CounterMove,
    GenerateQuiets,
    Quiets,
    BadNoisy,
    GenerateEvasions,
    EvasionCaptures,
    EvasionQuiets,
    Done,
}

/// Lookback distances (in plies) and matching weights for the continuation
/// history terms summed into a quiet move's score: `2*ch[-1] + 2*ch[-2] +
/// ch[-4] + ch[-6]`.
pub const CONTINUATION_OFFSETS: [usize; 4] = [1, 2, 4, 6];
pub const CONTINUATION_WEIGHTS: [i32; 4] = [2, 2, 1, 1];

/// Context borrowed from the search thread for one ply's worth of move
/// ordering: history tables plus the prior plies' (piece, to) at the
/// lookback distances in `CONTINUATION_OFFSETS`, needed to index
/// continuation history.
pub struct PickerContext<'a> {
    pub butterfly: &'a ButterflyHistory,
    pub capture: &'a CaptureHistory,
    pub continuation: &'a ContinuationHistory,
    pub counter_moves: &'a CounterMoveTable,
    pub killers: [Move; 2],
    pub counter_move_piece_to: Option<(usize, corvid_core::types::Square)>,
    pub prev_continuations: [Option<(usize, corvid_core::types::Square)>; 4],
}

pub struct MovePicker<'a> {
    stage: Stage,
    pos: &'a Position,
    ctx: PickerContext<'a>,
    hash_move: Move,
    in_check: bool,
    noisy: Vec<(Move, i32)>,
    quiets: Vec<(Move, i32)>,
    bad_noisy: Vec<Move>,
    cursor: usize,
}

impl<'a> MovePicker<'a> {
    pub fn new(pos: &'a Position, hash_move: Move, ctx: PickerContext<'a>) -> MovePicker<'a> {
        let in_check = pos.in_check();
        let stage = if hash_move != NULL_MOVE && pos.is_pseudo_legal(hash_move) {
            Stage::HashMove
        } else if in_check {
            Stage::GenerateEvasions
        } else {
            Stage::GenerateNoisy
        };
        MovePicker {
            stage,
            pos,
            ctx,
            hash_move,
            in_check,
            noisy: Vec::new(),
            quiets: Vec::new(),
            bad_noisy: Vec::new(),
            cursor: 0,
        }
    }

    /// King-in-check evasions are a single restricted pseudo-legal set
    /// (block, capture the checker, or move the king); splitting noisy
    /// killer/counter-move ordering on top of that set would just reorder
    /// a handful of moves, so evasions get their own two-stage capture-then-
    /// quiet split instead of the full staged machine.
    fn generate_evasions(&mut self) {
        let mut list = MoveList::new();
        generate(self.pos, GenType::Evasions, &mut list);
        let stm = self.pos.side_to_move();
        for mv in list {
            if mv == self.hash_move || !self.pos.is_legal(mv) {
                continue;
            }
            if mv.is_capture() {
                self.noisy.push((mv, self.score_noisy(mv)));
            } else {
                self.quiets.push((mv, self.score_quiet(stm, mv)));
            }
        }
        self.noisy.sort_by_key(|&(_, s)| std::cmp::Reverse(s));
        self.quiets.sort_by_key(|&(_, s)| std::cmp::Reverse(s));
    }

    fn score_noisy(&self, mv: Move) -> i32 {
        let captured = self.pos.piece_at(mv.to_sq());
        let base = if mv.is_en_passant() {
            0
        } else {
            captured.piece_type() as i32
        };
        let defended = captured
            .player()
            .is_some_and(|owner| self.pos.is_attacked_by(mv.to_sq(), owner, self.pos.occupied()));
        let history = self.ctx.capture.get(mv.piece() as usize, mv.to_sq(), defended, captured.piece_type());
        base * 1_000_000 + history
    }

    fn score_quiet(&self, stm: Player, mv: Move) -> i32 {
        let occ = self.pos.occupied();
        let from_threatened = self.pos.is_attacked_by(mv.from_sq(), !stm, occ);
        let to_threatened = self.pos.is_attacked_by(mv.to_sq(), !stm, occ);
        let mut score = self.ctx.butterfly.get(stm, from_threatened, to_threatened, mv);
        for (prev, weight) in self.ctx.prev_continuations.iter().zip(CONTINUATION_WEIGHTS) {
            if let Some(prev) = prev {
                score += weight * self.ctx.continuation.get(false, prev.0, prev.1, mv.piece() as usize, mv.to_sq());
            }
        }
        score
    }

    fn generate_noisy(&mut self) {
        let mut list = MoveList::new();
        generate(self.pos, GenType::Captures, &mut list);
        for mv in list {
            if mv == self.hash_move || !self.pos.is_legal(mv) {
                continue;
            }
            let score = self.score_noisy(mv);
            // A capture counts as "good" if it nets at least half the
            // victim's value back even in the worst-case exchange; losing
            // more than that demotes it to the bad-noisy bucket searched
            // after quiets.
            let captured_value = self.pos.piece_at(mv.to_sq()).piece_type().see_value();
            if see_ge(self.pos, mv, -captured_value / 2) {
                self.noisy.push((mv, score));
            } else {
                self.bad_noisy.push(mv);
            }
        }
        self.noisy.sort_by_key(|&(_, s)| std::cmp::Reverse(s));
    }

    fn generate_quiets(&mut self) {
        let mut list = MoveList::new();
        generate(self.pos, GenType::Quiets, &mut list);
        let stm = self.pos.side_to_move();
        for mv in list {
            if mv == self.hash_move || self.ctx.killers.contains(&mv) || !self.pos.is_legal(mv) {
                continue;
            }
            if let Some((piece, to)) = self.ctx.counter_move_piece_to {
                if self.ctx.counter_moves.get(piece, to) == mv {
                    continue;
                }
            }
            let score = self.score_quiet(stm, mv);
            self.quiets.push((mv, score));
        }
        self.quiets.sort_by_key(|&(_, s)| std::cmp::Reverse(s));
    }
}

impl<'a> Iterator for MovePicker<'a> {
    type Item = Move;

    fn next(&mut self) -> Option<Move> {
        loop {
            match self.stage {
                Stage::HashMove => {
                    self.stage = if self.in_check { Stage::GenerateEvasions } else { Stage::GenerateNoisy };
                    return Some(self.hash_move);
                }
                Stage::GenerateNoisy => {
                    self.generate_noisy();
                    self.cursor = 0;
                    self.stage = Stage::GoodNoisy;
                }
                Stage::GoodNoisy => {
                    if self.cursor < self.noisy.len() {
                        let mv = self.noisy[self.cursor].0;
                        self.cursor += 1;
                        return Some(mv);
                    }
                    self.stage = Stage::Killer1;
                }
                Stage::Killer1 => {
                    self.stage = Stage::Killer2;
                    let k = self.ctx.killers[0];
                    if k != NULL_MOVE && k != self.hash_move && self.pos.is_pseudo_legal(k) && self.pos.is_legal(k) {
                        return Some(k);
                    }
                }
                Stage::Killer2 => {
                    self.stage = Stage::CounterMove;
                    let k = self.ctx.killers[1];
                    if k != NULL_MOVE && k != self.hash_move && self.pos.is_pseudo_legal(k) && self.pos.is_legal(k) {
                        return Some(k);
                    }
                }
                Stage::CounterMove => {
                    self.stage = Stage::GenerateQuiets;
                    if let Some((piece, to)) = self.ctx.counter_move_piece_to {
                        let cm = self.ctx.counter_moves.get(piece, to);
                        if cm != NULL_MOVE
                            && cm != self.hash_move
                            && !self.ctx.killers.contains(&cm)
                            && self.pos.is_pseudo_legal(cm)
                            && self.pos.is_legal(cm)
                        {
                            return Some(cm);
                        }
                    }
                }
                Stage::GenerateQuiets => {
                    self.generate_quiets();
                    self.cursor = 0;
                    self.stage = Stage::Quiets;
                }
                Stage::Quiets => {
                    if self.cursor < self.quiets.len() {
                        let mv = self.quiets[self.cursor].0;
                        self.cursor += 1;
                        return Some(mv);
                    }
                    self.cursor = 0;
                    self.stage = Stage::BadNoisy;
                }
                Stage::BadNoisy => {
                    if self.cursor < self.bad_noisy.len() {
                        let mv = self.bad_noisy[self.cursor];
                        self.cursor += 1;
                        return Some(mv);
                    }
                    self.stage = Stage::Done;
                }
                Stage::GenerateEvasions => {
                    self.generate_evasions();
                    self.cursor = 0;
                    self.stage = Stage::EvasionCaptures;
                }
                Stage::EvasionCaptures => {
                    if self.cursor < self.noisy.len() {
                        let mv = self.noisy[self.cursor].0;
                        self.cursor += 1;
                        return Some(mv);
                    }
                    self.cursor = 0;
                    self.stage = Stage::EvasionQuiets;
                }
                Stage::EvasionQuiets => {
                    if self.cursor < self.quiets.len() {
                        let mv = self.quiets[self.cursor].0;
                        self.cursor += 1;
                        return Some(mv);
                    }
                    self.stage = Stage::Done;
                }
                Stage::Done => return None,
            }
        }
    }
}

/// ProbCut picker: captures (and queen promotions) whose SEE clears a
/// caller-supplied margin, MVV/LVA-ordered. Used only by the shallow
/// verification search ProbCut runs at non-PV nodes, never the main move
/// loop, so it does not need killers, counter-moves, or quiets at all.
pub struct ProbCutPicker<'a> {
    pos: &'a Position,
    noisy: Vec<(Move, i32)>,
    cursor: usize,
}

impl<'a> ProbCutPicker<'a> {
    pub fn new(pos: &'a Position, hash_move: Move, see_threshold: i32) -> ProbCutPicker<'a> {
        let mut list = MoveList::new();
        generate(pos, GenType::Captures, &mut list);
        let mut noisy = Vec::new();
        for mv in list {
            if mv == hash_move || !pos.is_legal(mv) {
                continue;
            }
            if !see_ge(pos, mv, see_threshold) {
                continue;
            }
            let captured = pos.piece_at(mv.to_sq());
            let base = if mv.is_en_passant() { 0 } else { captured.piece_type() as i32 };
            noisy.push((mv, base));
        }
        noisy.sort_by_key(|&(_, s)| std::cmp::Reverse(s));
        ProbCutPicker { pos, noisy, cursor: 0 }
    }
}

impl<'a> Iterator for ProbCutPicker<'a> {
    type Item = Move;

    fn next(&mut self) -> Option<Move> {
        if self.cursor < self.noisy.len() {
            let mv = self.noisy[self.cursor].0;
            self.cursor += 1;
            let _ = self.pos;
            Some(mv)
        } else {
            None
        }
    }
}

/// Quiescence-search picker: noisy moves only, plus checking moves when
/// `include_checks` is set, skipping the killer/counter/quiet stages
/// entirely.
pub struct QuiescencePicker<'a> {
    pos: &'a Position,
    noisy: Vec<(Move, i32)>,
    cursor: usize,
}

impl<'a> QuiescencePicker<'a> {
    pub fn new(pos: &'a Position, capture_history: &CaptureHistory, include_checks: bool) -> QuiescencePicker<'a> {
        let mut list = MoveList::new();
        let gen_type = if include_checks { GenType::NonEvasions } else { GenType::Captures };
        generate(pos, gen_type, &mut list);
        let mut noisy = Vec::new();
        for mv in list {
            if !mv.is_capture() && !mv.is_promotion() && !include_checks {
                continue;
            }
            if !pos.is_legal(mv) {
                continue;
            }
            let captured = pos.piece_at(mv.to_sq());
            let base = captured.piece_type() as i32;
            let defended = captured
                .player()
                .is_some_and(|owner| pos.is_attacked_by(mv.to_sq(), owner, pos.occupied()));
            let hist = capture_history.get(mv.piece() as usize, mv.to_sq(), defended, captured.piece_type());
            noisy.push((mv, base * 1_000_000 + hist));
        }
        noisy.sort_by_key(|&(_, s)| std::cmp::Reverse(s));
        QuiescencePicker { pos, noisy, cursor: 0 }
    }
}

impl<'a> Iterator for QuiescencePicker<'a> {
    type Item = Move;

    fn next(&mut self) -> Option<Move> {
        if self.cursor < self.noisy.len() {
            let mv = self.noisy[self.cursor].0;
            self.cursor += 1;
            let _ = self.pos;
            Some(mv)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::KillerTable;

    #[test]
    fn hash_move_is_yielded_first() {
        let pos = Position::startpos();
        let mut list = MoveList::new();
        generate(&pos, GenType::All, &mut list);
        let hash_move = *list.iter().find(|m| pos.is_legal(**m)).unwrap();

        let butterfly = ButterflyHistory::new();
        let capture = CaptureHistory::new();
        let continuation = ContinuationHistory::new();
        let counters = CounterMoveTable::new();
        let killers = KillerTable::new(1);
        let ctx = PickerContext {
            butterfly: &butterfly,
            capture: &capture,
            continuation: &continuation,
            counter_moves: &counters,
            killers: killers.get(0),
            counter_move_piece_to: None,
            prev_continuations: [None, None, None, None],
        };
        let mut picker = MovePicker::new(&pos, hash_move, ctx);
        assert_eq!(picker.next(), Some(hash_move));
    }

    #[test]
    fn picker_eventually_exhausts_all_legal_moves() {
        let pos = Position::startpos();
        let butterfly = ButterflyHistory::new();
        let capture = CaptureHistory::new();
        let continuation = ContinuationHistory::new();
        let counters = CounterMoveTable::new();
        let ctx = PickerContext {
            butterfly: &butterfly,
            capture: &capture,
            continuation: &continuation,
            counter_moves: &counters,
            killers: [NULL_MOVE, NULL_MOVE],
            counter_move_piece_to: None,
            prev_continuations: [None, None, None, None],
        };
        let picker = MovePicker::new(&pos, NULL_MOVE, ctx);
        let count = picker.count();
        assert_eq!(count, 20);
    }

    #[test]
    fn in_check_picker_only_yields_evasions() {
        // White king on e1 in check from a rook on e8; legal replies are
        // restricted to blocking, capturing the rook, or moving the king.
        let pos = Position::from_fen("4r2k/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(pos.in_check());

        let butterfly = ButterflyHistory::new();
        let capture = CaptureHistory::new();
        let continuation = ContinuationHistory::new();
        let counters = CounterMoveTable::new();
        let ctx = PickerContext {
            butterfly: &butterfly,
            capture: &capture,
            continuation: &continuation,
            counter_moves: &counters,
            killers: [NULL_MOVE, NULL_MOVE],
            counter_move_piece_to: None,
            prev_continuations: [None, None, None, None],
        };
        let picker = MovePicker::new(&pos, NULL_MOVE, ctx);
        let mut legal = MoveList::new();
        generate(&pos, GenType::Evasions, &mut legal);
        let legal_count = legal.iter().filter(|m| pos.is_legal(**m)).count();
        assert_eq!(picker.count(), legal_count);
    }

    #[test]
    fn probcut_picker_filters_by_see_threshold() {
        // White pawn e4 can capture the black knight on d5 for a clear net
        // gain; that should survive a zero SEE threshold.
        let pos = Position::from_fen("4k3/8/8/3n4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let picker = ProbCutPicker::new(&pos, NULL_MOVE, 0);
        let moves: Vec<Move> = picker.collect();
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|m| m.is_capture()));
    }
}
