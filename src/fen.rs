use enum_map::enum_map;
use itertools::Itertools;

use crate::board::{Board, BoardSetup, CastlingRights};
use crate::coord::{Col, Coord, Row, NUM_COLS, NUM_ROWS};
use crate::force::Force;
use crate::grid::Grid;
use crate::piece::{CastleDirection, PieceKind, PieceOnBoard};
use crate::util::as_single_char;


pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn force_to_fen(force: Force) -> char {
    match force {
        Force::White => 'w',
        Force::Black => 'b',
    }
}
fn force_from_fen(s: &str) -> Result<Force, String> {
    let ch = as_single_char(s).ok_or_else(|| format!("invalid active color: {}", s))?;
    match ch {
        'w' => Ok(Force::White),
        'b' => Ok(Force::Black),
        _ => Err(format!("invalid active color: {}", ch)),
    }
}

fn castling_to_fen(castling_rights: &CastlingRights) -> String {
    let mut s = String::new();
    // FEN lists kingside before queenside, white before black.
    for (force, dir, letter) in [
        (Force::White, CastleDirection::HSide, 'K'),
        (Force::White, CastleDirection::ASide, 'Q'),
        (Force::Black, CastleDirection::HSide, 'k'),
        (Force::Black, CastleDirection::ASide, 'q'),
    ] {
        if castling_rights[force][dir] {
            s.push(letter);
        }
    }
    if s.is_empty() { "-".to_owned() } else { s }
}
fn castling_from_fen(s: &str) -> Result<CastlingRights, String> {
    let mut castling_rights: CastlingRights = enum_map! { _ => enum_map! { _ => false } };
    if s == "-" {
        return Ok(castling_rights);
    }
    for ch in s.chars() {
        let (force, dir) = match ch {
            'K' => (Force::White, CastleDirection::HSide),
            'Q' => (Force::White, CastleDirection::ASide),
            'k' => (Force::Black, CastleDirection::HSide),
            'q' => (Force::Black, CastleDirection::ASide),
            _ => return Err(format!("invalid castling availability: {}", ch)),
        };
        castling_rights[force][dir] = true;
    }
    Ok(castling_rights)
}

fn en_passant_to_fen(en_passant_target: Option<Coord>) -> String {
    match en_passant_target {
        None => "-".to_owned(),
        Some(pos) => pos.to_algebraic(),
    }
}
fn en_passant_from_fen(s: &str) -> Result<Option<Coord>, String> {
    if s == "-" {
        Ok(None)
    } else {
        let pos =
            Coord::from_algebraic(s).ok_or_else(|| format!("invalid en passant target: {}", s))?;
        Ok(Some(pos))
    }
}

fn grid_from_fen(placement: &str) -> Result<Grid, String> {
    let rows = placement.split('/').collect_vec();
    if rows.len() != NUM_ROWS as usize {
        return Err(format!("invalid FEN: has {} rows, expected {}", rows.len(), NUM_ROWS));
    }
    let mut grid = Grid::new();
    for (row_idx, row_notation) in rows.iter().rev().enumerate() {
        let row = Row::from_zero_based(row_idx as u8);
        let mut col: u8 = 0;
        for ch in row_notation.chars() {
            if let Some(n) = ch.to_digit(10) {
                if n == 0 || n > NUM_COLS as u32 {
                    return Err(format!("invalid FEN: bad empty square count: {}", ch));
                }
                col += n as u8;
            } else if let Some((kind, force)) = PieceKind::from_ascii(ch) {
                if col >= NUM_COLS {
                    return Err(format!("invalid FEN: row {} is too long", row_notation));
                }
                grid[Coord::new(row, Col::from_zero_based(col))] =
                    Some(PieceOnBoard::new(kind, force));
                col += 1;
            } else {
                return Err(format!("invalid FEN: unknown piece: {}", ch));
            }
        }
        if col != NUM_COLS {
            return Err(format!(
                "invalid FEN: row {} has {} columns, expected {}",
                row_notation, col, NUM_COLS
            ));
        }
    }
    Ok(grid)
}

pub fn board_from_fen(fen: &str) -> Result<Board, String> {
    let (
        placement,
        active_force_notation,
        castling_notation,
        en_passant_notation,
        halfmove_clock,
        full_turn_index,
    ) = fen
        .split_whitespace()
        .collect_tuple()
        .ok_or_else(|| format!("invalid FEN: expected 6 fields: {}", fen))?;

    let grid = grid_from_fen(placement)?;
    let active_force = force_from_fen(active_force_notation)?;
    let castling_rights = castling_from_fen(castling_notation)?;
    let en_passant_target = en_passant_from_fen(en_passant_notation)?;
    let halfmove_clock = halfmove_clock
        .parse::<u32>()
        .map_err(|_| format!("invalid halfmove clock: {}", halfmove_clock))?;
    let full_turn_index = full_turn_index
        .parse::<u32>()
        .map_err(|_| format!("invalid full move number: {}", full_turn_index))?;
    if full_turn_index == 0 {
        return Err("invalid full move number: 0".to_owned());
    }

    Board::new_from_setup(BoardSetup {
        grid,
        active_force,
        castling_rights,
        en_passant_target,
        halfmove_clock,
        full_turn_index,
    })
}

pub fn board_to_fen(board: &Board) -> String {
    let grid = board.grid();
    let placement = Row::all()
        .rev()
        .map(|row| {
            let mut row_notation = String::new();
            let mut empty_count: u8 = 0;
            for col in Col::all() {
                match grid[Coord::new(row, col)] {
                    Some(piece) => {
                        if empty_count > 0 {
                            row_notation.push_str(&empty_count.to_string());
                            empty_count = 0;
                        }
                        row_notation.push(piece.kind.to_ascii(piece.force));
                    }
                    None => empty_count += 1,
                }
            }
            if empty_count > 0 {
                row_notation.push_str(&empty_count.to_string());
            }
            row_notation
        })
        .join("/");

    format!(
        "{} {} {} {} {} {}",
        placement,
        force_to_fen(board.active_force()),
        castling_to_fen(board.castling_rights()),
        en_passant_to_fen(board.en_passant_target()),
        board.halfmove_clock(),
        board.full_turn_index()
    )
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn starting_position() {
        let board = board_from_fen(STARTING_FEN).unwrap();
        assert_eq!(board, Board::new());
        assert_eq!(board_to_fen(&board), STARTING_FEN);
    }

    #[test]
    fn round_trip_mid_game() {
        let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
        let board = board_from_fen(fen).unwrap();
        assert_eq!(board_to_fen(&board), fen);
    }

    #[test]
    fn round_trip_en_passant_target() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        let board = board_from_fen(fen).unwrap();
        assert_eq!(board.en_passant_target(), Coord::from_algebraic("e3"));
        assert_eq!(board_to_fen(&board), fen);
    }

    #[test]
    fn malformed_structure() {
        // Not enough fields.
        assert!(board_from_fen("8/8/8/8/8/8/8/8 w - -").is_err());
        // Wrong rank count.
        assert!(board_from_fen("k7/8/8/8/8/8/KQ6 w - - 0 1").is_err());
        // Row too long, row too short, zero digit.
        assert!(board_from_fen("k7/8/8/8/8/8/8/KQ7 w - - 0 1").is_err());
        assert!(board_from_fen("k7/8/8/8/8/8/8/KQ4 w - - 0 1").is_err());
        assert!(board_from_fen("k7/8/8/8/8/8/8/KQ06 w - - 0 1").is_err());
        // Unknown piece letter.
        assert!(board_from_fen("k7/8/8/8/8/8/8/KX6 w - - 0 1").is_err());
        // Bad active color, castling, en passant and counters.
        assert!(board_from_fen("k7/8/8/8/8/8/8/K7 x - - 0 1").is_err());
        assert!(board_from_fen("k7/8/8/8/8/8/8/K7 w KX - 0 1").is_err());
        assert!(board_from_fen("k7/8/8/8/8/8/8/K7 w - e0 0 1").is_err());
        assert!(board_from_fen("k7/8/8/8/8/8/8/K7 w - - -1 1").is_err());
        assert!(board_from_fen("k7/8/8/8/8/8/8/K7 w - - 0 0").is_err());
    }

    #[test]
    fn malformed_kings() {
        assert!(board_from_fen("8/8/8/8/8/8/8/K7 w - - 0 1").is_err());
        assert!(board_from_fen("kk6/8/8/8/8/8/8/K7 w - - 0 1").is_err());
    }

    #[test]
    fn castling_rights_require_home_squares() {
        // White king not on e1.
        assert!(board_from_fen("4k3/8/8/8/8/8/8/3K3R w K - 0 1").is_err());
        // White kingside rook missing.
        assert!(board_from_fen("4k3/8/8/8/8/8/8/4K3 w K - 0 1").is_err());
        // Black queenside rook replaced by a knight.
        assert!(board_from_fen("n3k3/8/8/8/8/8/8/4K3 b q - 0 1").is_err());
        assert!(board_from_fen("r3k3/8/8/8/8/8/8/4K3 b q - 0 1").is_ok());
    }

    #[test]
    fn en_passant_target_row_is_validated() {
        // With white on move the target must be on the sixth rank.
        assert!(board_from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 3").is_ok());
        assert!(board_from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d3 0 3").is_err());
    }

    #[test]
    fn side_not_on_move_cannot_be_in_check() {
        // The active side being in check is an ordinary position.
        assert!(board_from_fen("4k3/8/8/8/8/8/8/4K2r w - - 0 1").is_ok());
        // The side that just moved must not be.
        assert!(board_from_fen("4k2R/8/8/8/8/8/8/4K3 w - - 0 1").is_err());
    }
}
