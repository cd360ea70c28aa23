// Test helpers shared between unit tests and the integration suite.

use lazy_static::lazy_static;
use regex_lite::Regex;

use crate::board::{Board, TurnError};
use crate::coord::Coord;
use crate::piece::PieceKind;
use crate::util::as_single_char;


pub fn sq(s: &str) -> Coord {
    Coord::from_algebraic(s).unwrap_or_else(|| panic!("bad square: {}", s))
}

// Turns written as coordinate pairs: "e2e4", plus "=N" and friends for promotions.
pub fn parse_turn(notation: &str) -> (Coord, Coord, Option<PieceKind>) {
    lazy_static! {
        static ref TURN_RE: Regex =
            Regex::new("^([a-h][1-8])([a-h][1-8])(?:=([NBRQ]))?$").unwrap();
    }
    let cap = TURN_RE
        .captures(notation)
        .unwrap_or_else(|| panic!("cannot parse turn: {}", notation));
    let from = sq(cap.get(1).unwrap().as_str());
    let to = sq(cap.get(2).unwrap().as_str());
    let promote_to = cap.get(3).map(|m| {
        let ch = as_single_char(m.as_str()).unwrap();
        PieceKind::from_ascii(ch).unwrap().0
    });
    (from, to, promote_to)
}

pub fn replay_moves(board: &mut Board, log: &str) -> Result<(), TurnError> {
    for notation in log.split_whitespace() {
        let (from, to, promote_to) = parse_turn(notation);
        board.apply_move(from, to, promote_to)?;
    }
    Ok(())
}
