//! Time allocation: turns the UCI `go` clock parameters into a soft/hard
//! budget, and decides after each completed iteration whether the search is
//! stable enough to stop early.

use std::time::{Duration, Instant};

#[derive(Copy, Clone, Debug, Default)]
pub struct GoLimits {
    pub movetime: Option<Duration>,
    pub wtime: Option<Duration>,
    pub btime: Option<Duration>,
    pub winc: Option<Duration>,
    pub binc: Option<Duration>,
    pub movestogo: Option<u32>,
    pub depth: Option<u8>,
    pub nodes: Option<u64>,
    pub infinite: bool,
}

pub struct TimeManager {
    start: Instant,
    soft_limit: Option<Duration>,
    hard_limit: Option<Duration>,
    move_overhead: Duration,

    // Soft-stop stability tracking, updated once per completed iteration.
    stable_best_move_count: u32,
    last_best_move: Option<corvid_core::mv::Move>,
    score_history: Vec<i32>,
}

impl TimeManager {
    pub fn new(limits: &GoLimits, us_time: Option<Duration>, us_inc: Option<Duration>, move_overhead: Duration, ply_count: u32) -> TimeManager {
        let start = Instant::now();
        if limits.infinite || (limits.movetime.is_none() && us_time.is_none()) {
            return TimeManager {
                start,
                soft_limit: None,
                hard_limit: None,
                move_overhead,
                stable_best_move_count: 0,
                last_best_move: None,
                score_history: Vec::new(),
            };
        }

        if let Some(movetime) = limits.movetime {
            let budget = movetime.saturating_sub(move_overhead);
            return TimeManager {
                start,
                soft_limit: Some(budget),
                hard_limit: Some(budget),
                move_overhead,
                stable_best_move_count: 0,
                last_best_move: None,
                score_history: Vec::new(),
            };
        }

        let time_left = us_time.unwrap_or(Duration::ZERO);
        let inc = us_inc.unwrap_or(Duration::ZERO);

        // Sudden-death (no movestogo): spend proportionally to how far the
        // game plausibly still has to go, favoring the increment so we never
        // spend below it.
        let moves_to_go = limits.movestogo.unwrap_or_else(|| estimate_moves_to_go(ply_count));
        let base = time_left.as_secs_f64() / moves_to_go as f64 + inc.as_secs_f64() * 0.8;
        let soft = Duration::from_secs_f64(base.max(0.001));
        let hard = Duration::from_secs_f64((base * 3.5).min(time_left.as_secs_f64() * 0.8).max(0.001));

        TimeManager {
            start,
            soft_limit: Some(soft.saturating_sub(move_overhead)),
            hard_limit: Some(hard.saturating_sub(move_overhead)),
            move_overhead,
            stable_best_move_count: 0,
            last_best_move: None,
            score_history: Vec::new(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Hard cutoff: the search must stop immediately regardless of
    /// iteration boundaries. Polled periodically from inside the search.
    pub fn out_of_time(&self) -> bool {
        match self.hard_limit {
            Some(limit) => self.elapsed() >= limit,
            None => false,
        }
    }

    /// Called once per completed iterative-deepening iteration; records the
    /// new best move/score and decides whether another iteration is worth
    /// starting.
    pub fn record_iteration(&mut self, best_move: corvid_core::mv::Move, score: i32, nodes_this_iter: u64, total_nodes: u64) {
        if Some(best_move) == self.last_best_move {
            self.stable_best_move_count += 1;
        } else {
            self.stable_best_move_count = 0;
            self.last_best_move = Some(best_move);
        }
        self.score_history.push(score);
        let _ = (nodes_this_iter, total_nodes);
    }

    /// Soft stop: should the driver skip starting the next iteration.
    pub fn should_stop_soft(&self) -> bool {
        let soft = match self.soft_limit {
            Some(s) => s,
            None => return false,
        };

        let score_swing = self.score_volatility();
        // A still-unstable best move or a recently swinging score earns the
        // position extra time, up to 2x the base soft budget.
        let instability_scale = if self.stable_best_move_count == 0 {
            1.3
        } else if score_swing > 40 {
            1.15
        } else {
            1.0 - (self.stable_best_move_count.min(6) as f64) * 0.05
        };

        self.elapsed().as_secs_f64() >= soft.as_secs_f64() * instability_scale
    }

    fn score_volatility(&self) -> i32 {
        if self.score_history.len() < 2 {
            return 0;
        }
        let n = self.score_history.len();
        (self.score_history[n - 1] - self.score_history[n - 2]).abs()
    }
}

fn estimate_moves_to_go(ply_count: u32) -> u32 {
    // A smooth falloff from a busy middlegame estimate toward a long-game
    // floor, in lieu of tracking actual game phase here.
    (50u32.saturating_sub(ply_count / 2)).max(20)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movetime_limit_is_exact_minus_overhead() {
        let limits = GoLimits { movetime: Some(Duration::from_millis(1000)), ..Default::default() };
        let tm = TimeManager::new(&limits, None, None, Duration::from_millis(50), 0);
        assert_eq!(tm.soft_limit, Some(Duration::from_millis(950)));
        assert_eq!(tm.hard_limit, Some(Duration::from_millis(950)));
    }

    #[test]
    fn infinite_search_never_times_out() {
        let limits = GoLimits { infinite: true, ..Default::default() };
        let tm = TimeManager::new(&limits, None, None, Duration::ZERO, 0);
        assert!(!tm.out_of_time());
        assert!(!tm.should_stop_soft());
    }

    #[test]
    fn sudden_death_allocates_a_fraction_of_remaining_time() {
        let limits = GoLimits { movestogo: None, ..Default::default() };
        let tm = TimeManager::new(&limits, Some(Duration::from_secs(60)), Some(Duration::from_secs(1)), Duration::ZERO, 0);
        let soft = tm.soft_limit.unwrap();
        assert!(soft.as_secs_f64() > 0.5 && soft.as_secs_f64() < 10.0);
    }
}
