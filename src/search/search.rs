// src/search/search.rs

use std::time::{Duration, Instant};

use crate::game::board::{Board, Terminal};
use crate::game::defs::is_white_piece;
use crate::game::moves::Move;
use crate::search::eval::{pst, static_eval, Score, INF_SCORE};
use crate::search::transpose::{from_tt, to_tt, Bound, TTEntry, TranspositionTable, ZobristKeys};

pub const MAX_DEPTH: i32 = 7;
pub const MAX_KILLER_MOVES: usize = 2;

const MAX_PLY: usize = 64;
// Wall-clock checks are amortized: only every 5th ply of the recursion.
const TIME_CHECK_INTERVAL: i32 = 5;
const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(20);

// --- Evaluation from the side to move's perspective ---
#[inline]
pub fn eval_stm(board: &Board) -> Score {
    let base = static_eval(board);
    if board.white_to_move() {
        base
    } else {
        -base
    }
}

/// Rank a move for ordering: victim value for captures, a promotion bump,
/// and the piece-square gain of the travel scaled down to pawn units.
pub fn score_move(m: &Move, board: &Board) -> Score {
    let mut score: Score = 0.0;

    if m.is_capture() {
        score += match m.capture.to_ascii_lowercase() {
            'p' => 1.0,
            'n' => 3.0,
            'b' => 3.0,
            'r' => 5.0,
            'q' => 9.0,
            'k' => 1000.0, // king capture, shouldn't happen
            _ => 0.0,
        };
    }

    if m.is_promotion() {
        score += 9.0;
    }

    let piece = board.square(m.from);
    if let Some(table) = pst(piece.to_ascii_lowercase()) {
        let (from, to) = if is_white_piece(piece) {
            (m.from.0 as usize, m.to.0 as usize)
        } else {
            (63 - m.from.0 as usize, 63 - m.to.0 as usize)
        };
        score += (table[to] - table[from]) as Score / 100.0;
    }

    score
}

// =================== Engine ===================

/// Iterative-deepening alpha-beta searcher.
///
/// The transposition table persists across `solve` calls; killer and
/// history tables are reset at each one. The wall clock is the
/// authoritative budget, `MAX_DEPTH` only caps the deepening loop.
pub struct Engine {
    keys: ZobristKeys,
    tt: TranspositionTable,
    killers: Vec<[Option<Move>; MAX_KILLER_MOVES]>,
    history: [[f32; 64]; 64],
    start_time: Instant,
    time_limit: Duration,
    time_limit_reached: bool,
    nodes: u64,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_time_limit(DEFAULT_TIME_LIMIT)
    }

    pub fn with_time_limit(time_limit: Duration) -> Self {
        Self {
            keys: ZobristKeys::new(),
            tt: TranspositionTable::new(),
            killers: vec![[None, None]; MAX_PLY],
            history: [[0.0; 64]; 64],
            start_time: Instant::now(),
            time_limit,
            time_limit_reached: false,
            nodes: 0,
        }
    }

    /// Pick the best move for the side to move, deepening from depth 1
    /// until `MAX_DEPTH` or the time budget runs out. Only fully completed
    /// iterations count; a cancelled one is discarded wholesale.
    ///
    /// Returns `None` iff the position has no legal moves.
    pub fn solve(&mut self, board: &mut Board, white_to_move: bool) -> Option<Move> {
        self.time_limit_reached = false;
        self.start_time = Instant::now();
        self.killers = vec![[None, None]; MAX_PLY];
        self.history = [[0.0; 64]; 64];

        let mut best_move_so_far: Option<Move> = None;

        for current_depth in 1..=MAX_DEPTH {
            self.nodes = 0;
            if self.time_limit_reached {
                break;
            }

            let mut current_best: Option<Move> = None;
            let score = self.search(
                board,
                white_to_move,
                &mut current_best,
                0,
                current_depth,
                -INF_SCORE,
                INF_SCORE,
            );

            if self.time_limit_reached {
                break;
            }
            best_move_so_far = current_best;

            let elapsed = self.start_time.elapsed().as_secs_f64();
            println!(
                "Depth: {}, Score: {}, Time: {}s, Nodes Evaluated = {}, knps: {}",
                current_depth,
                score / 100.0,
                elapsed,
                self.nodes,
                (self.nodes as f64 / 1000.0) / elapsed
            );
        }

        if best_move_so_far.is_some() {
            best_move_so_far
        } else {
            // Never completed a depth: fall back to the first legal move.
            board.legal_moves().into_iter().next()
        }
    }

    /// Alpha-beta in plain minimax form: scores are always from White's
    /// perspective, White maximizes and Black minimizes.
    fn search(
        &mut self,
        board: &mut Board,
        white_to_move: bool,
        best_move: &mut Option<Move>,
        ply: i32,
        max_depth: i32,
        mut alpha: Score,
        mut beta: Score,
    ) -> Score {
        if self.time_limit_reached {
            return 0.0;
        }

        if ply % TIME_CHECK_INTERVAL == 0 && self.start_time.elapsed() >= self.time_limit {
            self.time_limit_reached = true;
            return 0.0;
        }

        let key = self.keys.key(board);
        let alpha_original = alpha;
        let search_depth = max_depth - ply;

        let mut tt_move: Option<Move> = None;
        if let Some(entry) = self.tt.probe(key) {
            tt_move = entry.best_move.clone();
            if entry.depth >= search_depth {
                let score = from_tt(entry.score, ply);
                match entry.bound {
                    Bound::Exact => {
                        if ply == 0 {
                            *best_move = entry.best_move.clone();
                        }
                        return score;
                    }
                    Bound::LowerBound => {
                        // True score >= stored: fail high or raise alpha.
                        if score >= beta {
                            return score;
                        }
                        alpha = alpha.max(score);
                    }
                    Bound::UpperBound => {
                        // True score <= stored: fail low or lower beta.
                        if score <= alpha {
                            return score;
                        }
                        beta = beta.min(score);
                    }
                }
                if alpha >= beta {
                    return score;
                }
            }
        }

        if board.is_draw() {
            return 0.0;
        }

        match board.terminal() {
            Terminal::WhiteMated => {
                self.nodes += 1;
                // Ply-adjusted so nearer mates score better.
                return -INF_SCORE + ply as Score;
            }
            Terminal::BlackMated => {
                self.nodes += 1;
                return INF_SCORE - ply as Score;
            }
            Terminal::WhiteStalemated | Terminal::BlackStalemated => {
                self.nodes += 1;
                return 0.0;
            }
            Terminal::None => {}
        }

        if ply == max_depth {
            // Horizon: quiescence runs in negamax, convert at the boundary.
            return if white_to_move {
                self.quiesce(board, alpha, beta)
            } else {
                -self.quiesce(board, -beta, -alpha)
            };
        }

        let legal_moves = board.legal_moves();
        if legal_moves.is_empty() {
            // Mate and stalemate were handled above.
            return 0.0;
        }

        let ordered = self.order_moves(board, legal_moves, tt_move.as_ref(), ply);

        let mut best_score = if white_to_move { -INF_SCORE } else { INF_SCORE };
        let mut local_best: Option<Move> = None;

        for m in &ordered {
            board.push(m);
            let score = self.search(
                board,
                !white_to_move,
                best_move,
                ply + 1,
                max_depth,
                alpha,
                beta,
            );
            board.pop();

            // The move has been popped; unwind without touching state.
            if self.time_limit_reached {
                return 0.0;
            }

            if white_to_move {
                if score > best_score {
                    best_score = score;
                    local_best = Some(m.clone());
                    alpha = alpha.max(best_score);
                    if ply == 0 {
                        *best_move = local_best.clone();
                    }
                }
                if alpha >= beta {
                    self.record_cutoff(m, tt_move.as_ref(), ply);
                    break;
                }
            } else {
                if score < best_score {
                    best_score = score;
                    local_best = Some(m.clone());
                    beta = beta.min(best_score);
                    if ply == 0 {
                        *best_move = local_best.clone();
                    }
                }
                if beta <= alpha {
                    self.record_cutoff(m, tt_move.as_ref(), ply);
                    break;
                }
            }
        }

        let bound = if best_score <= alpha_original {
            Bound::UpperBound
        } else if best_score >= beta {
            Bound::LowerBound
        } else {
            Bound::Exact
        };

        self.tt.store(TTEntry {
            key,
            depth: search_depth,
            score: to_tt(best_score, ply),
            bound,
            best_move: local_best,
        });

        best_score
    }

    /// Capture-only extension below the horizon, negamax convention:
    /// the score is always from the side to move's perspective.
    fn quiesce(&mut self, board: &mut Board, mut alpha: Score, beta: Score) -> Score {
        self.nodes += 1;

        let stand_pat = eval_stm(board);
        if stand_pat >= beta {
            return stand_pat;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let mut captures: Vec<(Score, Move)> = board
            .legal_moves()
            .into_iter()
            .filter(|m| m.is_capture())
            .map(|m| (score_move(&m, board), m))
            .collect();
        captures.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());

        for (_, m) in captures {
            board.push(&m);
            let score = -self.quiesce(board, -beta, -alpha);
            board.pop();

            if self.time_limit_reached {
                return 0.0;
            }

            if score >= beta {
                return score;
            }
            if score > alpha {
                alpha = score;
            }
        }

        alpha
    }

    /// Compose the move list: TT move first, killers next, the rest by
    /// `score_move` plus the history counter.
    fn order_moves(
        &self,
        board: &Board,
        mut moves: Vec<Move>,
        tt_move: Option<&Move>,
        ply: i32,
    ) -> Vec<Move> {
        let ply = (ply as usize).min(MAX_PLY - 1);
        let mut scored: Vec<(Score, Move)> = Vec::with_capacity(moves.len());

        if let Some(ttm) = tt_move {
            if let Some(i) = moves.iter().position(|m| m == ttm) {
                scored.push((INF_SCORE, moves.remove(i)));
            }
        }

        for killer in self.killers[ply].iter().flatten() {
            if let Some(i) = moves.iter().position(|m| m == killer) {
                scored.push((INF_SCORE - 1.0, moves.remove(i)));
            }
        }

        for m in moves {
            let score =
                score_move(&m, board) + self.history[m.from.0 as usize][m.to.0 as usize];
            scored.push((score, m));
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
        scored.into_iter().map(|(_, m)| m).collect()
    }

    /// Beta-cutoff bookkeeping: bump the history counter, and remember the
    /// move as a killer if it is quiet and not already the TT move.
    fn record_cutoff(&mut self, m: &Move, tt_move: Option<&Move>, ply: i32) {
        self.history[m.from.0 as usize][m.to.0 as usize] += 1.0;

        if m.is_capture() || tt_move == Some(m) {
            return;
        }
        let ply = (ply as usize).min(MAX_PLY - 1);
        if self.killers[ply].iter().any(|k| k.as_ref() == Some(m)) {
            return;
        }
        let first = self.killers[ply][0].take();
        self.killers[ply][1] = first;
        self.killers[ply][0] = Some(m.clone());
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_move(board: &Board, text: &str) -> Move {
        board
            .legal_moves()
            .into_iter()
            .find(|m| m.to_string() == text)
            .unwrap_or_else(|| panic!("move {} not legal here", text))
    }

    #[test]
    fn score_move_values_captures_by_victim() {
        let board = Board::from_fen("k7/8/8/3q4/4P3/8/8/7K w - - 0 1").unwrap();
        let take_queen = find_move(&board, "e4d5");
        // 9 for the queen plus the pawn-table gain e4 -> d5 (20 -> 25).
        let expected = 9.0 + (25.0 - 20.0) / 100.0;
        assert!((score_move(&take_queen, &board) - expected).abs() < 1e-6);
    }

    #[test]
    fn score_move_rewards_promotion() {
        let board = Board::from_fen("k7/4P3/8/8/8/8/8/7K w - - 0 1").unwrap();
        let promote = find_move(&board, "e7e8q");
        // 9 for the promotion minus the pawn-table drop off the 50 row.
        let expected = 9.0 + (0.0 - 50.0) / 100.0;
        assert!((score_move(&promote, &board) - expected).abs() < 1e-6);
    }

    #[test]
    fn quiet_moves_score_by_positional_delta() {
        let board = Board::new();
        // Knight to the rim scores below knight toward the center.
        let to_center = find_move(&board, "g1f3");
        let to_rim = find_move(&board, "g1h3");
        assert!(score_move(&to_center, &board) > score_move(&to_rim, &board));
    }

    #[test]
    fn ordering_puts_tt_move_first() {
        let engine = Engine::new();
        let board = Board::new();
        let moves = board.legal_moves();
        let tt_move = find_move(&board, "a2a3"); // deliberately unremarkable
        let ordered = engine.order_moves(&board, moves, Some(&tt_move), 0);
        assert_eq!(ordered[0], tt_move);
    }

    #[test]
    fn killers_rank_below_tt_move_but_above_quiets() {
        let mut engine = Engine::new();
        let board = Board::new();
        let killer = find_move(&board, "h2h3");
        engine.record_cutoff(&killer, None, 0);

        let tt_move = find_move(&board, "a2a3");
        let ordered = engine.order_moves(&board, board.legal_moves(), Some(&tt_move), 0);
        assert_eq!(ordered[0], tt_move);
        assert_eq!(ordered[1], killer);
    }

    #[test]
    fn cutoff_bookkeeping_skips_captures_and_tt_move() {
        let mut engine = Engine::new();
        let board = Board::from_fen("k7/8/8/3q4/4P3/8/8/7K w - - 0 1").unwrap();
        let capture = find_move(&board, "e4d5");
        engine.record_cutoff(&capture, None, 0);
        assert!(engine.killers[0].iter().all(|k| k.is_none()));
        // History is bumped regardless.
        assert!(engine.history[capture.from.0 as usize][capture.to.0 as usize] > 0.0);
    }
}
