//! The UCI-facing engine facade: owns the position, options, thread pool,
//! and transposition table, and exposes typed methods a protocol adapter
//! calls into instead of parsing strings itself.

use crate::error::CorvidError;
use crate::nnue::network::Network;
use crate::syzygy::{NoTablebase, TablebaseOracle};
use crate::threads::{SearchRequest, ThreadPool};
use crate::time::GoLimits;
use crate::tt::TranspositionTable;
use corvid_core::board::Position;
use corvid_core::mv::Move;
use log::info;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct EngineOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub multi_pv: u32,
    pub ponder: bool,
    pub show_wdl: bool,
    pub chess960: bool,
    pub move_overhead: Duration,
    pub contempt: i32,
    pub syzygy_path: Option<String>,
    pub eval_file: Option<String>,
}

impl Default for EngineOptions {
    fn default() -> EngineOptions {
        EngineOptions {
            hash_mb: crate::consts::DEFAULT_TT_SIZE_MB,
            threads: num_cpus::get().clamp(1, crate::consts::MAX_THREADS),
            multi_pv: 1,
            ponder: false,
            show_wdl: false,
            chess960: false,
            move_overhead: Duration::from_millis(10),
            contempt: 0,
            syzygy_path: None,
            eval_file: None,
        }
    }
}

pub struct Engine {
    pos: Position,
    options: EngineOptions,
    network: Arc<Network>,
    tt: Arc<TranspositionTable>,
    pool: ThreadPool,
    tablebase: Arc<dyn TablebaseOracle>,
}

impl Engine {
    pub fn new() -> Result<Engine, CorvidError> {
        Engine::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Result<Engine, CorvidError> {
        let network = Arc::new(Network::default_embedded());
        let tt = Arc::new(TranspositionTable::new(options.hash_mb)?);
        let tablebase: Arc<dyn TablebaseOracle> = Arc::new(NoTablebase);
        let pool = ThreadPool::new(options.threads, network.clone(), tt.clone(), tablebase.clone());
        Ok(Engine {
            pos: Position::startpos(),
            options,
            network,
            tt,
            pool,
            tablebase,
        })
    }

    pub fn position_from_fen(&mut self, fen: &str) -> Result<(), CorvidError> {
        self.pos = Position::from_fen(fen).map_err(|e| CorvidError::InvalidFen(e.to_string()))?;
        Ok(())
    }

    pub fn position_startpos(&mut self) {
        self.pos = Position::startpos();
    }

    pub fn apply_moves(&mut self, moves: &[Move]) -> Result<(), CorvidError> {
        for &mv in moves {
            if !self.pos.is_pseudo_legal(mv) || !self.pos.is_legal(mv) {
                return Err(CorvidError::IllegalMove { mv, fen: self.pos.to_fen() });
            }
            self.pos.make_move(mv);
        }
        Ok(())
    }

    pub fn set_option_hash(&mut self, mb: usize) -> Result<(), CorvidError> {
        self.options.hash_mb = mb;
        self.tt = Arc::new(TranspositionTable::new(mb)?);
        self.pool = ThreadPool::new(self.options.threads, self.network.clone(), self.tt.clone(), self.tablebase.clone());
        Ok(())
    }

    pub fn set_option_threads(&mut self, threads: usize) {
        self.options.threads = threads.max(1);
        self.pool.resize(self.options.threads, self.network.clone(), self.tt.clone(), self.tablebase.clone());
    }

    pub fn set_option_eval_file(&mut self, path: &str) -> Result<(), CorvidError> {
        let network = Network::load_file(std::path::Path::new(path))?;
        self.network = Arc::new(network);
        self.options.eval_file = Some(path.to_string());
        self.pool = ThreadPool::new(self.options.threads, self.network.clone(), self.tt.clone(), self.tablebase.clone());
        Ok(())
    }

    pub fn set_tablebase(&mut self, oracle: Box<dyn TablebaseOracle>) {
        self.tablebase = Arc::from(oracle);
        self.pool = ThreadPool::new(self.options.threads, self.network.clone(), self.tt.clone(), self.tablebase.clone());
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn position(&self) -> &Position {
        &self.pos
    }

    /// Runs a search to completion and returns the best/ponder move pair.
    /// Streaming `info` lines during the search is the caller's job via
    /// `go_with_info`; this is the simple synchronous entry point.
    pub fn go(&self, limits: GoLimits) -> (Move, Option<Move>) {
        let max_depth = limits.depth.unwrap_or(crate::consts::MAX_SEARCH_PLY as u8).min(crate::consts::MAX_SEARCH_PLY as u8) as u32;
        let request = SearchRequest {
            pos: self.pos.clone(),
            limits,
            max_depth,
            move_overhead: self.options.move_overhead,
            contempt: self.options.contempt,
            multi_pv: self.options.multi_pv,
        };
        info!("[{}] starting search at depth {}", chrono::Local::now().format("%H:%M:%S%.3f"), max_depth);
        self.pool.go(request)
    }

    pub fn stop(&self) {
        self.pool.stop();
    }

    /// Total nodes searched across all workers during the most recent
    /// `go()`, the counter an external bench harness would report.
    pub fn nodes_searched(&self) -> u64 {
        self.pool.nodes_searched()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_engine_starts_at_startpos() {
        let engine = Engine::new().unwrap();
        assert_eq!(engine.position().to_fen(), Position::startpos().to_fen());
    }

    #[test]
    fn go_returns_a_legal_move_from_startpos() {
        let _ = env_logger::builder().is_test(true).try_init();
        let engine = Engine::new().unwrap();
        let limits = GoLimits { depth: Some(2), ..Default::default() };
        let (best, _) = engine.go(limits);
        assert!(engine.position().is_legal(best));
        assert!(engine.nodes_searched() > 0);
    }
}
