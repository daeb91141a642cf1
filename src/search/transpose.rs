// src/search/transpose.rs

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::game::board::Board;
use crate::game::defs::{piece_index, Square};
use crate::game::moves::Move;
use crate::search::eval::{Score, INF_SCORE};

// ===================== Zobrist keying =====================

/// Fixed seed so keys are identical across runs.
const ZOBRIST_SEED: u64 = 1_234_567;

pub struct ZobristKeys {
    piece: [[u64; 64]; 12],
    side: u64,
    castle: [u64; 16],
    ep_file: [u64; 8],
}

impl ZobristKeys {
    pub fn new() -> Self {
        Self::new_with_seed(ZOBRIST_SEED)
    }

    pub fn new_with_seed(seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);

        let mut piece = [[0u64; 64]; 12];
        for p in piece.iter_mut() {
            for sq in p.iter_mut() {
                *sq = rng.next_u64();
            }
        }

        let side = rng.next_u64();

        let mut castle = [0u64; 16];
        for k in castle.iter_mut() {
            *k = rng.next_u64();
        }

        let mut ep_file = [0u64; 8];
        for k in ep_file.iter_mut() {
            *k = rng.next_u64();
        }

        Self {
            piece,
            side,
            castle,
            ep_file,
        }
    }

    /// Key of a position, computed from scratch: every occupied square,
    /// the side to move, the 4-bit castling mask and the en-passant file.
    pub fn key(&self, board: &Board) -> u64 {
        let mut key = 0u64;

        for i in 0..64u8 {
            let piece = board.square(Square(i));
            if let Some(idx) = piece_index(piece) {
                key ^= self.piece[idx][i as usize];
            }
        }

        if !board.white_to_move() {
            key ^= self.side;
        }

        let [wk, wq, bk, bq] = board.castling_rights();
        let mut mask = 0usize;
        if wk {
            mask |= 1;
        }
        if wq {
            mask |= 2;
        }
        if bk {
            mask |= 4;
        }
        if bq {
            mask |= 8;
        }
        key ^= self.castle[mask];

        if let Some(file) = board.en_passant_file() {
            key ^= self.ep_file[file as usize];
        }

        key
    }
}

impl Default for ZobristKeys {
    fn default() -> Self {
        Self::new()
    }
}

// ===================== Bounds / TT entry =====================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Bound {
    Exact,
    LowerBound,
    UpperBound,
}

#[derive(Clone)]
pub struct TTEntry {
    pub key: u64,
    /// Depth-to-go at which the entry was computed, never ply-from-root.
    pub depth: i32,
    pub score: Score,
    pub bound: Bound,
    pub best_move: Option<Move>,
}

// ------------------- TT sizing and table ---------------------

/// Power of two, required for mask indexing.
pub const TT_SIZE: usize = 1 << 20;

pub struct TranspositionTable {
    entries: Vec<Option<TTEntry>>,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self {
            entries: vec![None; TT_SIZE],
        }
    }

    #[inline]
    fn index(key: u64) -> usize {
        (key as usize) & (TT_SIZE - 1)
    }

    #[inline]
    pub fn probe(&self, key: u64) -> Option<&TTEntry> {
        match &self.entries[Self::index(key)] {
            Some(e) if e.key == key => Some(e),
            _ => None,
        }
    }

    /// Depth-preferred replacement: a slot only ever gets deeper.
    pub fn store(&mut self, entry: TTEntry) {
        let slot = &mut self.entries[Self::index(entry.key)];
        match slot {
            None => *slot = Some(entry),
            Some(old) => {
                if entry.depth > old.depth {
                    *slot = Some(entry);
                }
            }
        }
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------- Mate score normalization helpers ----------

// Mate scores are stored as distance-from-node so an entry reused at a
// different ply still prefers the shorter mate.

const MATE_WINDOW: Score = 1000.0;

#[inline]
pub fn to_tt(score: Score, ply: i32) -> Score {
    if score > INF_SCORE - MATE_WINDOW {
        score + ply as Score
    } else if score < -INF_SCORE + MATE_WINDOW {
        score - ply as Score
    } else {
        score
    }
}

#[inline]
pub fn from_tt(score: Score, ply: i32) -> Score {
    if score > INF_SCORE - MATE_WINDOW {
        score - ply as Score
    } else if score < -INF_SCORE + MATE_WINDOW {
        score + ply as Score
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_seed_is_deterministic() {
        let a = ZobristKeys::new();
        let b = ZobristKeys::new();
        let board = Board::new();
        assert_eq!(a.key(&board), b.key(&board));
    }

    #[test]
    fn key_tracks_piece_placement() {
        let keys = ZobristKeys::new();
        let mut board = Board::new();
        let start = keys.key(&board);

        let m = board
            .legal_moves()
            .into_iter()
            .find(|m| m.to_string() == "e2e4")
            .unwrap();
        board.push(&m);
        assert_ne!(keys.key(&board), start);
        board.pop();
        assert_eq!(keys.key(&board), start);
    }

    #[test]
    fn key_tracks_side_to_move() {
        let keys = ZobristKeys::new();
        let white = Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let black = Board::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        assert_ne!(keys.key(&white), keys.key(&black));
    }

    #[test]
    fn key_tracks_castling_mask() {
        let keys = ZobristKeys::new();
        let full = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let partial = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w Kkq - 0 1").unwrap();
        assert_ne!(keys.key(&full), keys.key(&partial));
    }

    #[test]
    fn key_tracks_en_passant_file() {
        let keys = ZobristKeys::new();
        let with_ep =
            Board::from_fen("rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 2")
                .unwrap();
        let without =
            Board::from_fen("rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 2")
                .unwrap();
        assert_ne!(keys.key(&with_ep), keys.key(&without));
    }

    #[test]
    fn store_prefers_deeper_entries() {
        let mut tt = TranspositionTable::new();
        let entry = |key: u64, depth: i32, score: Score| TTEntry {
            key,
            depth,
            score,
            bound: Bound::Exact,
            best_move: None,
        };

        tt.store(entry(42, 3, 10.0));
        assert_eq!(tt.probe(42).unwrap().depth, 3);

        // Shallower result never displaces a deeper one.
        tt.store(entry(42, 2, 99.0));
        assert_eq!(tt.probe(42).unwrap().score, 10.0);

        // Same depth does not replace either.
        tt.store(entry(42, 3, 99.0));
        assert_eq!(tt.probe(42).unwrap().score, 10.0);

        tt.store(entry(42, 5, 7.0));
        assert_eq!(tt.probe(42).unwrap().score, 7.0);

        // A colliding key maps to the same slot; only deeper wins it.
        let colliding = 42 + (TT_SIZE as u64);
        tt.store(entry(colliding, 4, 1.0));
        assert!(tt.probe(colliding).is_none());
        tt.store(entry(colliding, 6, 1.0));
        assert_eq!(tt.probe(colliding).unwrap().key, colliding);
        assert!(tt.probe(42).is_none());
    }

    #[test]
    fn mate_scores_rebase_by_ply() {
        let mate_in_3 = INF_SCORE - 3.0;
        let stored = to_tt(mate_in_3, 2);
        assert_eq!(stored, INF_SCORE - 1.0);
        assert_eq!(from_tt(stored, 2), mate_in_3);
        assert_eq!(from_tt(stored, 4), INF_SCORE - 5.0);

        let mated_in_3 = -INF_SCORE + 3.0;
        assert_eq!(from_tt(to_tt(mated_in_3, 2), 2), mated_in_3);

        // Ordinary scores pass through untouched.
        assert_eq!(to_tt(123.0, 5), 123.0);
        assert_eq!(from_tt(-42.0, 5), -42.0);
    }
}
