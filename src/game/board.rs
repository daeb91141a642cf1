// src/game/board.rs

use std::fmt;

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{CastlingMode, CastlingSide, Chess, Color, EnPassantMode, Position};

use crate::game::defs::Square;
use crate::game::moves::{square_to_rules, Move};

// =================== Terminal / draw states ===================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminal {
    None,
    WhiteMated,
    BlackMated,
    WhiteStalemated,
    BlackStalemated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawReason {
    FiftyMove,
    InsufficientMaterial,
    Repetition,
}

// =================== Board adapter ===================

/// Uniform view over the external rules crate.
///
/// The engine mutates the position exclusively through balanced
/// `push`/`pop` pairs; internally that is an undo stack of snapshots.
/// Repetition is tracked here with the rules crate's own position
/// hashing, independent of the search's transposition keying.
pub struct Board {
    pos: Chess,
    undo: Vec<Chess>,
    reps: Vec<u64>,
}

impl Board {
    /// Starting position.
    pub fn new() -> Self {
        Self::from_position(Chess::default())
    }

    pub fn from_fen(fen: &str) -> Result<Self> {
        let setup: Fen = fen.parse().context("unparseable FEN")?;
        let pos: Chess = setup
            .into_position(CastlingMode::Standard)
            .map_err(|e| anyhow!("illegal position: {}", e))?;
        Ok(Self::from_position(pos))
    }

    fn from_position(pos: Chess) -> Self {
        let hash = rep_key(&pos);
        Self {
            pos,
            undo: Vec::with_capacity(128),
            reps: vec![hash],
        }
    }

    pub fn fen(&self) -> String {
        Fen::from_position(self.pos.clone(), EnPassantMode::Legal).to_string()
    }

    // ---------------- moves ----------------

    pub fn legal_moves(&self) -> Vec<Move> {
        annotate(&self.pos)
    }

    /// Legal moves for one side, independent of whose turn it is. The
    /// off-turn list comes from a turn-swapped scratch copy; when the swap
    /// is illegal (the mover is giving check) the list is empty.
    pub fn legal_moves_for(&self, white: bool) -> Vec<Move> {
        if white == self.white_to_move() {
            return self.legal_moves();
        }
        match self.pos.clone().swap_turn() {
            Ok(swapped) => annotate(&swapped),
            Err(_) => Vec::new(),
        }
    }

    pub fn push(&mut self, m: &Move) {
        self.undo.push(self.pos.clone());
        self.pos.play_unchecked(&m.inner);
        self.reps.push(rep_key(&self.pos));
    }

    pub fn pop(&mut self) {
        debug_assert!(!self.undo.is_empty(), "pop without matching push");
        if let Some(prev) = self.undo.pop() {
            self.pos = prev;
            self.reps.pop();
        }
    }

    /// Depth of the undo stack (plies since construction).
    #[inline]
    pub fn ply(&self) -> usize {
        self.undo.len()
    }

    // ---------------- state queries ----------------

    #[inline]
    pub fn white_to_move(&self) -> bool {
        self.pos.turn().is_white()
    }

    /// Piece code on a square: uppercase white, lowercase black, ' ' empty.
    pub fn square(&self, sq: Square) -> char {
        match self.pos.board().piece_at(square_to_rules(sq)) {
            Some(piece) => {
                let c = piece.role.char();
                if piece.color.is_white() {
                    c.to_ascii_uppercase()
                } else {
                    c
                }
            }
            None => ' ',
        }
    }

    /// (wk, wq, bk, bq)
    pub fn castling_rights(&self) -> [bool; 4] {
        let castles = self.pos.castles();
        [
            castles.has(Color::White, CastlingSide::KingSide),
            castles.has(Color::White, CastlingSide::QueenSide),
            castles.has(Color::Black, CastlingSide::KingSide),
            castles.has(Color::Black, CastlingSide::QueenSide),
        ]
    }

    pub fn en_passant_file(&self) -> Option<u8> {
        self.pos
            .ep_square(EnPassantMode::Legal)
            .map(|sq| sq.file() as u8)
    }

    pub fn terminal(&self) -> Terminal {
        if self.pos.is_checkmate() {
            if self.white_to_move() {
                Terminal::WhiteMated
            } else {
                Terminal::BlackMated
            }
        } else if self.pos.is_stalemate() {
            if self.white_to_move() {
                Terminal::WhiteStalemated
            } else {
                Terminal::BlackStalemated
            }
        } else {
            Terminal::None
        }
    }

    pub fn is_draw(&self) -> bool {
        self.draw_reason().is_some()
    }

    pub fn draw_reason(&self) -> Option<DrawReason> {
        if self.pos.halfmoves() >= 100 {
            return Some(DrawReason::FiftyMove);
        }
        if self.pos.is_insufficient_material() {
            return Some(DrawReason::InsufficientMaterial);
        }
        if self.repetitions() >= 3 {
            return Some(DrawReason::Repetition);
        }
        None
    }

    /// How many times the current position has occurred since construction.
    fn repetitions(&self) -> usize {
        let current = match self.reps.last() {
            Some(&h) => h,
            None => return 0,
        };
        self.reps.iter().filter(|&&h| h == current).count()
    }

    // ---------------- parsing ----------------

    /// Parse a user move in SAN ("Nf3", "exd5", "O-O") against this position.
    pub fn parse_san(&self, input: &str) -> Option<Move> {
        let san: San = input.parse().ok()?;
        let m = san.to_move(&self.pos).ok()?;
        Move::from_rules(m, self.white_to_move())
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

fn annotate(pos: &Chess) -> Vec<Move> {
    let white = pos.turn().is_white();
    pos.legal_moves()
        .into_iter()
        .filter_map(|m| Move::from_rules(m, white))
        .collect()
}

#[inline]
fn rep_key(pos: &Chess) -> u64 {
    pos.zobrist_hash::<Zobrist64>(EnPassantMode::Legal).0
}

// =================== Rendering ===================

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Unicode chess symbols, white then black
        let symbol = |c: char| -> &'static str {
            match c {
                'K' => "\u{2654}\u{FE0E}",
                'Q' => "\u{2655}\u{FE0E}",
                'R' => "\u{2656}\u{FE0E}",
                'B' => "\u{2657}\u{FE0E}",
                'N' => "\u{2658}\u{FE0E}",
                'P' => "\u{2659}\u{FE0E}",
                'k' => "\u{265A}\u{FE0E}",
                'q' => "\u{265B}\u{FE0E}",
                'r' => "\u{265C}\u{FE0E}",
                'b' => "\u{265D}\u{FE0E}",
                'n' => "\u{265E}\u{FE0E}",
                'p' => "\u{265F}\u{FE0E}",
                _ => " ",
            }
        };

        // board colors (lichess palette)
        let light = (240, 217, 181);
        let dark = (181, 136, 99);

        for row in 0..8u8 {
            write!(f, "{} ", (8 - row).to_string().red())?;

            for file in 0..8u8 {
                let sq = Square(row * 8 + file);
                let piece = self.square(sq);

                let (r, g, b) = if (row + file) % 2 == 0 { light } else { dark };
                let cell = format!(" {} ", symbol(piece))
                    .on_truecolor(r, g, b)
                    .truecolor(0, 0, 0);
                write!(f, "{}", cell)?;
            }
            writeln!(f)?;
        }

        write!(f, "  ")?;
        for file in 0..8u8 {
            write!(f, " {} ", ((b'a' + file) as char).to_string().red())?;
        }
        writeln!(f)
    }
}
