//! UCI-facing text formatting: score normalization, the WDL model, and the
//! `info` line.

use crate::consts::{CHECKMATE, MATE_IN_MAX_PLY};
use corvid_core::mv::Move;
use std::fmt;
use std::time::Duration;

#[derive(Copy, Clone, Debug)]
pub enum UciScore {
    Centipawns(i32),
    Mate(i32),
}

/// Converts an internal score (pawn = 100) to the `info score` token,
/// collapsing mate-bound scores into a "mate in N" ply count.
pub fn classify_score(internal: i32) -> UciScore {
    if internal >= MATE_IN_MAX_PLY {
        let plies = CHECKMATE - internal;
        UciScore::Mate((plies + 1) / 2)
    } else if internal <= -MATE_IN_MAX_PLY {
        let plies = CHECKMATE + internal;
        UciScore::Mate(-((plies + 1) / 2))
    } else {
        UciScore::Centipawns(internal_to_cp(internal))
    }
}

/// Internal evaluation units are scaled roughly 1.70x larger than
/// centipawns so the NNUE's native output range gives finer search
/// resolution; UCI output divides back down before display.
fn internal_to_cp(internal: i32) -> i32 {
    ((internal as f64) / 1.70).round() as i32
}

impl fmt::Display for UciScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciScore::Centipawns(cp) => write!(f, "cp {}", cp),
            UciScore::Mate(n) => write!(f, "mate {}", n),
        }
    }
}

/// Cubic win/draw/loss model fit against the engine's own centipawn scale,
/// reported in per-mille as `UCI_ShowWDL` requires.
pub fn wdl_model(cp: i32, ply: u32) -> (u32, u32, u32) {
    let m = (ply.min(240) as f64) / 64.0;
    let a = ((-1.5 * m + 4.5) * m - 3.0) * m + 90.0;
    let b = ((-0.5 * m + 2.0) * m - 1.0) * m + 35.0;

    let x = (cp as f64).clamp(-4000.0, 4000.0);
    let win = 1000.0 / (1.0 + (-(x - a) / b).exp());
    let loss = 1000.0 / (1.0 + (-(-x - a) / b).exp());
    let win = win.round().clamp(0.0, 1000.0) as u32;
    let loss = loss.round().clamp(0.0, 1000.0) as u32;
    let draw = 1000u32.saturating_sub(win).saturating_sub(loss);
    (win, draw, loss)
}

pub struct SearchInfo {
    pub depth: u32,
    pub seldepth: u32,
    pub multipv: u32,
    pub score: UciScore,
    pub wdl: Option<(u32, u32, u32)>,
    pub nodes: u64,
    pub nps: u64,
    pub hashfull: u32,
    pub time: Duration,
    pub pv: Vec<Move>,
}

impl fmt::Display for SearchInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "info depth {} seldepth {} multipv {} score {}",
            self.depth, self.seldepth, self.multipv, self.score
        )?;
        if let Some((w, d, l)) = self.wdl {
            write!(f, " wdl {} {} {}", w, d, l)?;
        }
        write!(
            f,
            " nodes {} nps {} hashfull {} time {}",
            self.nodes,
            self.nps,
            self.hashfull,
            self.time.as_millis()
        )?;
        if !self.pv.is_empty() {
            write!(f, " pv")?;
            for mv in &self.pv {
                write!(f, " {}", mv.to_uci_string())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_score_classifies_above_threshold() {
        let score = classify_score(CHECKMATE - 3);
        match score {
            UciScore::Mate(n) => assert_eq!(n, 2),
            UciScore::Centipawns(_) => panic!("expected mate score"),
        }
    }

    #[test]
    fn wdl_sums_to_one_thousand() {
        let (w, d, l) = wdl_model(150, 40);
        assert_eq!(w + d + l, 1000);
    }

    #[test]
    fn zero_score_is_roughly_balanced_wdl() {
        let (w, d, l) = wdl_model(0, 0);
        assert!(w.abs_diff(l) < 50);
        assert!(d > 0);
    }
}
