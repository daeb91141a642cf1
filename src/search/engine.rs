// src/search/engine.rs

use std::io::{self, Write};

use crate::game::board::{Board, DrawReason, Terminal};
use crate::game::defs::square_from_str;
use crate::game::moves::{Move, Special};
use crate::search::search::Engine;

/// Interactive loop: the computer plays one side, the user the other.
pub fn run_game(computer_is_white: bool) {
    let mut board = Board::new();
    let mut engine = Engine::new();

    loop {
        let white_to_move = board.white_to_move();
        let side = if white_to_move { "White" } else { "Black" };

        if white_to_move == computer_is_white {
            match engine.solve(&mut board, white_to_move) {
                Some(mv) => {
                    println!("Computer ({}) plays: {}", side, mv);
                    board.push(&mv);
                }
                None => {
                    // No legal moves; the terminal check below reports why.
                }
            }
        } else {
            println!("{}", board);
            let user_input = input(&format!("Your move ({}): ", side));
            match parse_move(&board, &user_input) {
                Some(mv) => board.push(&mv),
                None => {
                    println!("Invalid move. Try again.");
                    continue;
                }
            }
        }

        println!("{}", board);

        match board.terminal() {
            Terminal::WhiteMated => {
                println!("White is checkmated. Black wins!");
                break;
            }
            Terminal::BlackMated => {
                println!("Black is checkmated. White wins!");
                break;
            }
            Terminal::WhiteStalemated | Terminal::BlackStalemated => {
                println!("Stalemate. It's a draw!");
                break;
            }
            Terminal::None => {}
        }

        if let Some(reason) = board.draw_reason() {
            let text = match reason {
                DrawReason::FiftyMove => "the 50-move rule",
                DrawReason::InsufficientMaterial => "insufficient material",
                DrawReason::Repetition => "threefold repetition",
            };
            println!("Draw due to {}.", text);
            break;
        }
    }
}

/// Parse a user move: coordinate form first ("e2e4", "e7e8q"), SAN as a
/// fallback ("Nf3", "exd5", "O-O"). Returns `None` for anything illegal.
pub fn parse_move(board: &Board, input: &str) -> Option<Move> {
    let input = input.trim();

    if input.is_ascii() && (input.len() == 4 || input.len() == 5) {
        let from = square_from_str(&input[0..2]);
        let to = square_from_str(&input[2..4]);
        if let (Some(from), Some(to)) = (from, to) {
            let promo = if input.len() == 5 {
                Some((input.as_bytes()[4] as char).to_ascii_lowercase())
            } else {
                None
            };

            let candidates: Vec<Move> = board
                .legal_moves()
                .into_iter()
                .filter(|m| m.from == from && m.to == to)
                .collect();

            return match promo {
                Some(p) => candidates
                    .into_iter()
                    .find(|m| m.special.promotion_char() == Some(p)),
                // No promotion piece given: the match is unique unless the
                // move promotes, in which case prefer Q > R > B > N.
                None => candidates
                    .into_iter()
                    .max_by_key(|m| promo_priority(m.special)),
            };
        }
    }

    board.parse_san(input)
}

fn promo_priority(special: Special) -> i32 {
    match special {
        Special::PromoteQueen => 4,
        Special::PromoteRook => 3,
        Special::PromoteBishop => 2,
        Special::PromoteKnight => 1,
        _ => 0,
    }
}

fn input(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().unwrap();

    let mut buffer = String::new();
    io::stdin()
        .read_line(&mut buffer)
        .expect("Failed to read line");

    buffer.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinate_moves() {
        let board = Board::new();
        assert_eq!(parse_move(&board, "e2e4").unwrap().to_string(), "e2e4");
        assert_eq!(parse_move(&board, "g1f3").unwrap().to_string(), "g1f3");
        assert!(parse_move(&board, "e2e5").is_none());
        assert!(parse_move(&board, "xyzzy").is_none());
    }

    #[test]
    fn parses_san_moves() {
        let board = Board::new();
        assert_eq!(parse_move(&board, "Nf3").unwrap().to_string(), "g1f3");
        assert_eq!(parse_move(&board, "e4").unwrap().to_string(), "e2e4");
    }

    #[test]
    fn bare_promotion_prefers_queen() {
        let board = Board::from_fen("k7/4P3/8/8/8/8/8/7K w - - 0 1").unwrap();
        let m = parse_move(&board, "e7e8").unwrap();
        assert_eq!(m.special, Special::PromoteQueen);
        let m = parse_move(&board, "e7e8n").unwrap();
        assert_eq!(m.special, Special::PromoteKnight);
    }
}
