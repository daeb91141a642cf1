// src/game/moves.rs

use std::fmt;

use shakmaty::{CastlingSide, Move as RulesMove, Role, Square as RulesSquare};

use crate::game::defs::Square;

// =================== Special move tags ===================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Special {
    Quiet,
    KingsideCastle,
    QueensideCastle,
    EnPassant,
    PromoteQueen,
    PromoteRook,
    PromoteBishop,
    PromoteKnight,
}

impl Special {
    #[inline]
    pub fn is_promotion(self) -> bool {
        matches!(
            self,
            Special::PromoteQueen
                | Special::PromoteRook
                | Special::PromoteBishop
                | Special::PromoteKnight
        )
    }

    /// Promotion suffix for coordinate notation, if any.
    pub fn promotion_char(self) -> Option<char> {
        match self {
            Special::PromoteQueen => Some('q'),
            Special::PromoteRook => Some('r'),
            Special::PromoteBishop => Some('b'),
            Special::PromoteKnight => Some('n'),
            _ => None,
        }
    }
}

// =================== Move ===================

/// A legal move as handed out by the rules adapter.
///
/// Carries the captured piece code (`' '` for quiets) and a special tag so
/// the search never has to re-derive either. The underlying rules-crate
/// move rides along for push.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub capture: char,
    pub special: Special,
    pub(crate) inner: RulesMove,
}

impl Move {
    #[inline]
    pub fn is_capture(&self) -> bool {
        self.capture != ' '
    }

    #[inline]
    pub fn is_promotion(&self) -> bool {
        self.special.is_promotion()
    }

    /// Annotate a rules-crate move. `white_to_move` is the mover's side,
    /// needed to color the captured piece code.
    pub(crate) fn from_rules(m: RulesMove, white_to_move: bool) -> Option<Move> {
        let from = m.from()?;

        // Standard-chess castling: the rules crate encodes the rook square
        // as the target; the engine-facing move uses the king's destination.
        let (to, special) = if let Some(side) = m.castling_side() {
            let file = match side {
                CastlingSide::KingSide => 6,
                CastlingSide::QueenSide => 2,
            };
            let to = Square::from_file_rank(file, from.rank() as u8);
            let special = match side {
                CastlingSide::KingSide => Special::KingsideCastle,
                CastlingSide::QueenSide => Special::QueensideCastle,
            };
            (to, special)
        } else {
            let special = if m.is_en_passant() {
                Special::EnPassant
            } else {
                match m.promotion() {
                    Some(Role::Queen) => Special::PromoteQueen,
                    Some(Role::Rook) => Special::PromoteRook,
                    Some(Role::Bishop) => Special::PromoteBishop,
                    Some(Role::Knight) => Special::PromoteKnight,
                    Some(_) => Special::Quiet,
                    None => Special::Quiet,
                }
            };
            (square_from_rules(m.to()), special)
        };

        let capture = match m.capture() {
            Some(role) => {
                let c = role.char();
                // The victim belongs to the side not moving.
                if white_to_move {
                    c
                } else {
                    c.to_ascii_uppercase()
                }
            }
            None => ' ',
        };

        Some(Move {
            from: square_from_rules(from),
            to,
            capture,
            special,
            inner: m,
        })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(p) = self.special.promotion_char() {
            write!(f, "{}", p)?;
        }
        Ok(())
    }
}

#[inline]
pub(crate) fn square_from_rules(sq: RulesSquare) -> Square {
    Square::from_file_rank(sq.file() as u8, sq.rank() as u8)
}

#[inline]
pub(crate) fn square_to_rules(sq: Square) -> RulesSquare {
    RulesSquare::from_coords(
        shakmaty::File::new(sq.get_file() as u32),
        shakmaty::Rank::new(sq.get_rank() as u32),
    )
}
