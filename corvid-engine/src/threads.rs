//! Lazy-SMP worker pool: independent search threads sharing only the
//! transposition table, coordinated with a `Mutex`+`Condvar` idle loop
//! instead of raw pointers and spin-polling.

use crate::nnue::network::Network;
use crate::root_moves::{vote_best_move, WorkerResult};
use crate::search::{iterative_deepening, SearchThread};
use crate::syzygy::TablebaseOracle;
#[cfg(test)]
use crate::syzygy::NoTablebase;
use crate::time::{GoLimits, TimeManager};
use crate::tt::TranspositionTable;
use corvid_core::board::Position;
use corvid_core::mv::Move;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// One `go` command's parameters, shared read-only by every worker.
#[derive(Clone)]
pub struct SearchRequest {
    pub pos: Position,
    pub limits: GoLimits,
    pub max_depth: u32,
    pub move_overhead: Duration,
    pub contempt: i32,
    pub multi_pv: u32,
}

enum PoolState {
    Idle,
    Running(Arc<SearchRequest>),
}

struct Shared {
    state: Mutex<PoolState>,
    cv: Condvar,
    stop: Arc<AtomicBool>,
    network: Arc<Network>,
    tt: Arc<TranspositionTable>,
    tablebase: Arc<dyn TablebaseOracle>,
}

/// Owns the worker threads; `go`/`stop` just flip shared state and park/wake
/// the pool rather than spawning per-search.
pub struct ThreadPool {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
    results: Arc<Mutex<Vec<WorkerResult>>>,
    done_cv: Arc<Condvar>,
    last_search_nodes: AtomicU64,
}

impl ThreadPool {
    pub fn new(count: usize, network: Arc<Network>, tt: Arc<TranspositionTable>, tablebase: Arc<dyn TablebaseOracle>) -> ThreadPool {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState::Idle),
            cv: Condvar::new(),
            stop: Arc::new(AtomicBool::new(false)),
            network,
            tt,
            tablebase,
        });
        let results = Arc::new(Mutex::new(Vec::new()));
        let done_cv = Arc::new(Condvar::new());

        let mut handles = Vec::with_capacity(count.max(1));
        for id in 0..count.max(1) {
            let shared = shared.clone();
            let results = results.clone();
            let done_cv = done_cv.clone();
            handles.push(std::thread::spawn(move || worker_loop(id, shared, results, done_cv)));
        }

        ThreadPool { shared, handles, results, done_cv, last_search_nodes: AtomicU64::new(0) }
    }

    /// Summed node count across every worker from the most recently
    /// completed `go()`, the counter a UCI `bench` harness would read.
    pub fn nodes_searched(&self) -> u64 {
        self.last_search_nodes.load(Ordering::Relaxed)
    }

    /// Starts a search across every worker and blocks until they all
    /// finish (either by exhausting `max_depth` or by `stop()`), returning
    /// the voted bestmove/ponder pair.
    pub fn go(&self, request: SearchRequest) -> (Move, Option<Move>) {
        self.results.lock().unwrap().clear();
        self.shared.stop.store(false, Ordering::Relaxed);
        self.shared.tt.new_search();
        *self.shared.state.lock().unwrap() = PoolState::Running(Arc::new(request));
        self.shared.cv.notify_all();

        let guard = self.results.lock().unwrap();
        let mut guard = self
            .done_cv
            .wait_while(guard, |r| r.len() < self.handles.len())
            .unwrap();

        *self.shared.state.lock().unwrap() = PoolState::Idle;
        let results = std::mem::take(&mut *guard);
        self.last_search_nodes.store(results.iter().map(|r| r.nodes).sum(), Ordering::Relaxed);
        vote_best_move(&results).expect("at least one worker reports a result")
    }

    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Relaxed);
    }

    pub fn resize(&mut self, count: usize, network: Arc<Network>, tt: Arc<TranspositionTable>, tablebase: Arc<dyn TablebaseOracle>) {
        self.shutdown();
        *self = ThreadPool::new(count, network, tt, tablebase);
    }

    /// Wakes every parked worker with a zero-depth sentinel request so it
    /// observes `stop` and exits, then joins all handles.
    fn shutdown(&mut self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        *self.shared.state.lock().unwrap() = PoolState::Running(Arc::new(SearchRequest {
            pos: Position::startpos(),
            limits: GoLimits { depth: Some(0), ..Default::default() },
            max_depth: 0,
            move_overhead: Duration::ZERO,
            contempt: 0,
            multi_pv: 1,
        }));
        self.shared.cv.notify_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(id: usize, shared: Arc<Shared>, results: Arc<Mutex<Vec<WorkerResult>>>, done_cv: Arc<Condvar>) {
    loop {
        let request = {
            let guard = shared.state.lock().unwrap();
            let mut guard = shared
                .cv
                .wait_while(guard, |s| matches!(s, PoolState::Idle))
                .unwrap();
            match &mut *guard {
                PoolState::Running(req) => req.clone(),
                PoolState::Idle => continue,
            }
        };

        if request.max_depth == 0 && shared.stop.load(Ordering::Relaxed) {
            return;
        }

        let mut pos = request.pos.clone();
        let mut thread = SearchThread::with_options(&shared.network, &shared.tt, shared.tablebase.as_ref(), shared.stop.clone(), request.contempt, request.multi_pv);
        // Odd-numbered helper threads search from a slightly different
        // starting depth, the usual Lazy-SMP trick for decorrelating
        // otherwise-identical workers.
        let depth_skew = if id % 2 == 1 && request.max_depth > 2 { 1 } else { 0 };
        let (us_time, us_inc) = match pos.side_to_move() {
            corvid_core::types::Player::White => (request.limits.wtime, request.limits.winc),
            corvid_core::types::Player::Black => (request.limits.btime, request.limits.binc),
        };
        let mut time_manager = TimeManager::new(&request.limits, us_time, us_inc, request.move_overhead, pos.fullmove_number() as u32 * 2);

        let result = iterative_deepening(&mut thread, &mut pos, &mut time_manager, request.max_depth + depth_skew, |_, _| {});

        let worker_result = WorkerResult {
            best_move: result.pv.first().copied().unwrap_or(corvid_core::mv::NULL_MOVE),
            ponder_move: result.pv.get(1).copied(),
            score: result.score,
            depth_reached: result.depth,
            nodes: thread.nodes.load(Ordering::Relaxed),
        };

        let mut guard = results.lock().unwrap();
        guard.push(worker_result);
        done_cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_of_two_produces_a_legal_bestmove() {
        let network = Arc::new(Network::default_embedded());
        let tt = Arc::new(TranspositionTable::new(4).unwrap());
        let tablebase: Arc<dyn TablebaseOracle> = Arc::new(NoTablebase);
        let pool = ThreadPool::new(2, network, tt, tablebase);
        let request = SearchRequest {
            pos: Position::startpos(),
            limits: GoLimits { depth: Some(3), ..Default::default() },
            max_depth: 3,
            move_overhead: Duration::ZERO,
            contempt: 0,
            multi_pv: 1,
        };
        let (best, _ponder) = pool.go(request);
        let pos = Position::startpos();
        assert!(pos.is_legal(best));
    }
}
