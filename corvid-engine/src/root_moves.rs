//! Root move list and the best-thread voting used to reconcile Lazy-SMP
//! workers' independent results into a single bestmove.

use corvid_core::mv::Move;

#[derive(Clone, Debug)]
pub struct RootMove {
    pub pv: Vec<Move>,
    pub score: i32,
    pub previous_score: i32,
    pub depth_reached: u32,
    pub nodes: u64,
}

impl RootMove {
    pub fn new(mv: Move) -> RootMove {
        RootMove {
            pv: vec![mv],
            score: -crate::consts::EVAL_UNKNOWN,
            previous_score: -crate::consts::EVAL_UNKNOWN,
            depth_reached: 0,
            nodes: 0,
        }
    }

    pub fn mv(&self) -> Move {
        self.pv[0]
    }
}

pub struct RootMoveList {
    moves: Vec<RootMove>,
}

impl RootMoveList {
    pub fn new(legal_moves: impl Iterator<Item = Move>) -> RootMoveList {
        RootMoveList { moves: legal_moves.map(RootMove::new).collect() }
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RootMove> {
        self.moves.iter()
    }

    pub fn find_mut(&mut self, mv: Move) -> Option<&mut RootMove> {
        self.moves.iter_mut().find(|rm| rm.mv() == mv)
    }

    /// Moves the just-searched move to the front, the convention every PVS
    /// driver relies on to read "the current best line" as `moves[0]`.
    pub fn promote_to_front(&mut self, mv: Move) {
        if let Some(pos) = self.moves.iter().position(|rm| rm.mv() == mv) {
            self.moves[..=pos].rotate_right(1);
        }
    }

    pub fn sort_by_score_desc(&mut self) {
        self.moves.sort_by(|a, b| b.score.cmp(&a.score));
    }

    pub fn best(&self) -> Option<&RootMove> {
        self.moves.first()
    }
}

/// One finished worker's final report, summarized down to what voting
/// needs.
pub struct WorkerResult {
    pub best_move: Move,
    pub ponder_move: Option<Move>,
    pub score: i32,
    pub depth_reached: u32,
    pub nodes: u64,
}

/// Picks the move to report as `bestmove` across all Lazy-SMP workers: each
/// worker "votes" for its own best move, weighted by how deep it searched
/// and how good its score was, and the heaviest-voted move wins. Ties favor
/// the deepest individual search as a tiebreaker.
pub fn vote_best_move(results: &[WorkerResult]) -> Option<(Move, Option<Move>)> {
    if results.is_empty() {
        return None;
    }
    if results.len() == 1 {
        return Some((results[0].best_move, results[0].ponder_move));
    }

    let min_score = results.iter().map(|r| r.score).min().unwrap();
    let mut votes: Vec<(Move, f64)> = Vec::new();
    for r in results {
        let weight = ((r.score - min_score + 1) as f64) * (r.depth_reached as f64).sqrt();
        if let Some(slot) = votes.iter_mut().find(|(mv, _)| *mv == r.best_move) {
            slot.1 += weight;
        } else {
            votes.push((r.best_move, weight));
        }
    }

    let (winner, _) = votes
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .expect("at least one result");

    let best = results
        .iter()
        .filter(|r| r.best_move == winner)
        .max_by_key(|r| r.depth_reached)
        .expect("winner came from some result");

    Some((winner, best.ponder_move))
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvid_core::mv::MoveFlag;
    use corvid_core::types::{Piece, Square};

    fn mv(from: u8, to: u8) -> Move {
        Move::new(Square(from), Square(to), Piece::WhitePawn, MoveFlag::Quiet)
    }

    #[test]
    fn single_worker_wins_trivially() {
        let results = vec![WorkerResult {
            best_move: mv(8, 16),
            ponder_move: None,
            score: 20,
            depth_reached: 10,
            nodes: 1000,
        }];
        let (winner, _) = vote_best_move(&results).unwrap();
        assert_eq!(winner, mv(8, 16));
    }

    #[test]
    fn majority_and_depth_favor_the_stronger_move() {
        let a = mv(8, 16);
        let b = mv(9, 25);
        let results = vec![
            WorkerResult { best_move: a, ponder_move: None, score: 30, depth_reached: 20, nodes: 1 },
            WorkerResult { best_move: a, ponder_move: None, score: 28, depth_reached: 18, nodes: 1 },
            WorkerResult { best_move: b, ponder_move: None, score: 32, depth_reached: 12, nodes: 1 },
        ];
        let (winner, _) = vote_best_move(&results).unwrap();
        assert_eq!(winner, a);
    }
}
