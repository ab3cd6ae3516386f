//! Lock-free-tolerant 3-way bucket transposition table.
//!
//! Entries are never written atomically; every consumer re-validates a
//! probed move with `Position::is_pseudo_legal` and treats the packed score
//! as advisory until the bound says otherwise, so a torn read from a
//! concurrent writer can never corrupt search results, only waste a probe.

use crate::consts::{CHECKMATE, TB_WIN_BOUND};
use crate::error::CorvidError;
use corvid_core::mv::{Move, NULL_MOVE};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    None = 0,
    Upper = 1,
    Lower = 2,
    Exact = 3,
}

impl Bound {
    fn from_bits(b: u8) -> Bound {
        match b & 0b11 {
            0 => Bound::None,
            1 => Bound::Upper,
            2 => Bound::Lower,
            _ => Bound::Exact,
        }
    }
}

const AGE_BITS: u8 = 5;
const AGE_MASK: u8 = (1 << AGE_BITS) - 1;

/// One transposition-table slot. `key16` is the upper 16 bits of the
/// Zobrist hash (a partial-key match, not a full-key guarantee); depth 0
/// means "empty" so a freshly zeroed table is trivially "all misses".
struct Entry {
    key16: u16,
    depth: u8,
    age_pv_bound: AtomicU8,
    mv: Move,
    eval: i16,
    score: i16,
}

impl Entry {
    fn empty() -> Entry {
        Entry {
            key16: 0,
            depth: 0,
            age_pv_bound: AtomicU8::new(0),
            mv: NULL_MOVE,
            eval: 0,
            score: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.depth == 0
    }

    fn bound(&self) -> Bound {
        Bound::from_bits(self.age_pv_bound.load(Ordering::Relaxed))
    }

    fn is_pv(&self) -> bool {
        self.age_pv_bound.load(Ordering::Relaxed) & 0b100 != 0
    }

    fn age(&self) -> u8 {
        (self.age_pv_bound.load(Ordering::Relaxed) >> 3) & AGE_MASK
    }
}

const BUCKET_SIZE: usize = 3;

struct Bucket {
    entries: [Entry; BUCKET_SIZE],
}

/// A probed or stored transposition-table record, denormalized from mate
/// scores back to plain scores at probe time.
#[derive(Copy, Clone, Debug)]
pub struct TtData {
    pub mv: Move,
    pub score: i32,
    pub eval: i32,
    pub depth: u8,
    pub bound: Bound,
    pub is_pv: bool,
}

/// Shareable across Lazy-SMP worker threads via `Arc<TranspositionTable>`.
/// `Bucket` access goes through `UnsafeCell` rather than a lock: a torn
/// concurrent read/write can only hand back a stale or slightly garbled
/// entry, which `probe`'s key/depth/bound checks already have to tolerate,
/// so no worker ever blocks on another's store.
pub struct TranspositionTable {
    buckets: Vec<CachePadded<UnsafeCell<Bucket>>>,
    age: AtomicU8,
}

unsafe impl Sync for TranspositionTable {}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> Result<TranspositionTable, CorvidError> {
        let bucket_bytes = std::mem::size_of::<Entry>() * BUCKET_SIZE;
        let bucket_count = (size_mb * 1024 * 1024 / bucket_bytes.max(1)).max(1);
        let mut buckets = Vec::new();
        buckets.try_reserve(bucket_count).map_err(|_| CorvidError::TtAllocation { requested_mb: size_mb })?;
        for _ in 0..bucket_count {
            buckets.push(CachePadded::new(UnsafeCell::new(Bucket {
                entries: [Entry::empty(), Entry::empty(), Entry::empty()],
            })));
        }
        Ok(TranspositionTable {
            buckets,
            age: AtomicU8::new(0),
        })
    }

    pub fn resize(&mut self, size_mb: usize) -> Result<(), CorvidError> {
        *self = TranspositionTable::new(size_mb)?;
        Ok(())
    }

    pub fn new_search(&self) {
        self.age.fetch_add(1, Ordering::Relaxed);
    }

    fn index(&self, key: u64) -> usize {
        (((key as u128) * (self.buckets.len() as u128)) >> 64) as usize
    }

    pub fn probe(&self, key: u64, ply: usize) -> Option<TtData> {
        let idx = self.index(key);
        let key16 = (key >> 48) as u16;
        // SAFETY: see struct doc; concurrent readers/writers only risk a
        // stale entry, never a type-unsafe read, since `Bucket` is plain data.
        let bucket = unsafe { &*self.buckets[idx].get() };
        let current_age = self.age.load(Ordering::Relaxed);
        for entry in &bucket.entries {
            if !entry.is_empty() && entry.key16 == key16 {
                let bits = entry.age_pv_bound.load(Ordering::Relaxed);
                let refreshed = (bits & !(AGE_MASK << 3)) | (current_age << 3);
                entry.age_pv_bound.store(refreshed, Ordering::Relaxed);
                return Some(TtData {
                    mv: entry.mv,
                    score: denormalize_score(entry.score as i32, ply),
                    eval: entry.eval as i32,
                    depth: entry.depth,
                    bound: entry.bound(),
                    is_pv: entry.is_pv(),
                });
            }
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    pub fn store(&self, key: u64, ply: usize, depth: u8, score: i32, eval: i32, bound: Bound, is_pv: bool, mv: Move) {
        let idx = self.index(key);
        let key16 = (key >> 48) as u16;
        let current_age = self.age.load(Ordering::Relaxed);
        // SAFETY: see struct doc.
        let bucket = unsafe { &mut *self.buckets[idx].get() };

        let mut victim = 0usize;
        let mut victim_score = i32::MAX;
        for (i, entry) in bucket.entries.iter().enumerate() {
            if entry.is_empty() || entry.key16 == key16 {
                victim = i;
                victim_score = i32::MIN;
                break;
            }
            let age_dist = (AGE_MASK as i32 + current_age as i32 - entry.age() as i32) & AGE_MASK as i32;
            let replace_score = entry.depth as i32 - age_dist * 2;
            if replace_score < victim_score {
                victim_score = replace_score;
                victim = i;
            }
        }

        let entry = &mut bucket.entries[victim];
        let replace = bound == Bound::Exact
            || entry.key16 != key16
            || entry.is_empty()
            || (depth as i32) + 4 > entry.depth as i32;
        if !replace {
            return;
        }

        let keep_move = mv.is_null() && entry.key16 == key16 && !entry.mv.is_null();
        entry.key16 = key16;
        entry.depth = depth;
        entry.eval = eval.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        entry.score = normalize_score(score, ply).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        if !keep_move {
            entry.mv = mv;
        }
        let pv_bit = if is_pv { 0b100 } else { 0 };
        entry.age_pv_bound = AtomicU8::new((current_age << 3) | pv_bit | bound as u8);
    }

    /// Per-mille of the first 1000 buckets' entries whose age matches the
    /// current search generation.
    pub fn hashfull(&self) -> u32 {
        let sample = self.buckets.len().min(1000);
        if sample == 0 {
            return 0;
        }
        let current_age = self.age.load(Ordering::Relaxed);
        let mut count = 0u32;
        for cell in self.buckets.iter().take(sample) {
            let bucket = unsafe { &*cell.get() };
            for entry in &bucket.entries {
                if !entry.is_empty() && entry.age() == current_age {
                    count += 1;
                }
            }
        }
        count * 1000 / (sample as u32 * BUCKET_SIZE as u32)
    }
}

fn normalize_score(score: i32, ply: usize) -> i32 {
    if score >= TB_WIN_BOUND {
        score + ply as i32
    } else if score <= -TB_WIN_BOUND {
        score - ply as i32
    } else {
        score
    }
}

fn denormalize_score(score: i32, ply: usize) -> i32 {
    if score >= TB_WIN_BOUND {
        (score - ply as i32).min(CHECKMATE)
    } else if score <= -TB_WIN_BOUND {
        (score + ply as i32).max(-CHECKMATE)
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvid_core::types::{Piece, Square};
    use corvid_core::mv::MoveFlag;

    #[test]
    fn store_then_probe_round_trips() {
        let tt = TranspositionTable::new(1).unwrap();
        let mv = Move::new(Square(0), Square(1), Piece::WhitePawn, MoveFlag::Quiet);
        tt.store(0xDEAD_BEEF_0000_0001, 3, 10, 55, 40, Bound::Exact, true, mv);
        let data = tt.probe(0xDEAD_BEEF_0000_0001, 3).unwrap();
        assert_eq!(data.score, 55);
        assert_eq!(data.depth, 10);
        assert_eq!(data.bound, Bound::Exact);
        assert_eq!(data.mv, mv);
    }

    #[test]
    fn hashfull_starts_at_zero() {
        let tt = TranspositionTable::new(1).unwrap();
        assert_eq!(tt.hashfull(), 0);
    }
}
