use enum_map::{enum_map, EnumMap};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::coord::{Col, Coord, Row, SubjectiveRow};
use crate::force::Force;
use crate::grid::Grid;
use crate::piece::{CastleDirection, PieceKind, PieceOnBoard};
use crate::util::sort_two;


pub type CastlingRights = EnumMap<Force, EnumMap<CastleDirection, bool>>;

fn col_range_inclusive((col_min, col_max): (Col, Col)) -> impl Iterator<Item = Col> {
    assert!(col_min <= col_max);
    (col_min.to_zero_based()..=col_max.to_zero_based()).map(Col::from_zero_based)
}

fn home_row(force: Force) -> Row {
    SubjectiveRow::from_one_based(1).to_row(force)
}

fn rook_home_col(dir: CastleDirection) -> Col {
    match dir {
        CastleDirection::ASide => Col::A,
        CastleDirection::HSide => Col::H,
    }
}

fn should_promote(force: Force, piece_kind: PieceKind, to: Coord) -> bool {
    let last_row = SubjectiveRow::from_one_based(8).to_row(force);
    piece_kind == PieceKind::Pawn && to.row == last_row
}

// Castling is requested by moving the king two files along its home rank.
fn castle_direction(from: Coord, to: Coord) -> Option<CastleDirection> {
    match to - from {
        (0, -2) => Some(CastleDirection::ASide),
        (0, 2) => Some(CastleDirection::HSide),
        _ => None,
    }
}

// Returns the square of the piece captured by the move, if any. For an en passant
// capture this is not the destination square.
fn get_capture(
    grid: &Grid, from: Coord, to: Coord, en_passant_target: Option<Coord>,
) -> Option<Coord> {
    let piece = grid[from].unwrap();
    if let Some(target_piece) = grid[to] {
        if target_piece.force == piece.force {
            None
        } else {
            Some(to)
        }
    } else if piece.kind == PieceKind::Pawn && en_passant_target == Some(to) {
        let (d_row, d_col) = to - from;
        if d_row != piece.force.forward() || d_col.abs() != 1 {
            return None;
        }
        let passed_pos = Coord::new(from.row, to.col);
        match grid[passed_pos] {
            Some(passed) if passed.kind == PieceKind::Pawn && passed.force != piece.force => {
                Some(passed_pos)
            }
            _ => None,
        }
    } else {
        None
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ProtoReachability {
    Ok,
    OkIfCapturing,
    OkIfNonCapturing,
    Blocked,
    Impossible,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Reachability {
    Ok,
    Blocked,
    Impossible,
}

impl Reachability {
    fn ok(self) -> bool { self == Reachability::Ok }
}

// Classifies whether the piece at `from` could move to `to`, ignoring what stands on
// the destination square itself (that is the caller's business, via `capturing`).
fn trajectory(grid: &Grid, from: Coord, to: Coord) -> ProtoReachability {
    use ProtoReachability::*;
    if to == from {
        return Impossible;
    }
    let piece = match grid[from] {
        Some(piece) => piece,
        None => return Impossible,
    };
    let (d_row, d_col) = to - from;
    let is_straight = d_row == 0 || d_col == 0;
    let is_diagonal = d_row.abs() == d_col.abs();
    // Squares strictly between `from` and `to` must be free.
    let free_passage = || {
        let direction = (d_row.signum(), d_col.signum());
        let mut pos = from + direction;
        while pos != to {
            if grid[pos].is_some() {
                return false;
            }
            pos = pos + direction;
        }
        true
    };
    let sliding = |possible: bool| {
        if !possible {
            Impossible
        } else if free_passage() {
            Ok
        } else {
            Blocked
        }
    };
    match piece.kind {
        PieceKind::Pawn => {
            let forward = piece.force.forward();
            let second_row = SubjectiveRow::from_one_based(2).to_row(piece.force);
            if d_col.abs() == 1 && d_row == forward {
                OkIfCapturing
            } else if d_col == 0 && d_row == forward {
                OkIfNonCapturing
            } else if d_col == 0
                && d_row == forward * 2
                && from.row == second_row
                && !piece.has_moved
            {
                if free_passage() { OkIfNonCapturing } else { Blocked }
            } else {
                Impossible
            }
        }
        PieceKind::Knight => {
            if sort_two((d_row.abs(), d_col.abs())) == (1, 2) { Ok } else { Impossible }
        }
        PieceKind::Bishop => sliding(is_diagonal),
        PieceKind::Rook => sliding(is_straight),
        PieceKind::Queen => sliding(is_straight || is_diagonal),
        PieceKind::King => {
            // Castling is not a trajectory; it is resolved at turn level.
            if d_row.abs() <= 1 && d_col.abs() <= 1 { Ok } else { Impossible }
        }
    }
}

fn reachability(grid: &Grid, from: Coord, to: Coord, capturing: bool) -> Reachability {
    use ProtoReachability::*;
    let proto = trajectory(grid, from, to);
    if matches!(proto, Ok | OkIfCapturing | OkIfNonCapturing) {
        if let Some(target_piece) = grid[to] {
            if target_piece.force == grid[from].unwrap().force {
                return Reachability::Blocked;
            }
        }
    }
    match proto {
        Ok => Reachability::Ok,
        OkIfCapturing if capturing => Reachability::Ok,
        OkIfNonCapturing if !capturing => Reachability::Ok,
        OkIfCapturing | OkIfNonCapturing | Blocked => Reachability::Blocked,
        Impossible => Reachability::Impossible,
    }
}

// A square is attacked iff an enemy piece could capture on it. Reachability never
// consults king safety, so enumerating enemy pieces here cannot recurse; an attacking
// king is answered from its own adjacency entry in `trajectory`.
fn find_attacker(grid: &Grid, target: Coord, by: Force) -> Option<Coord> {
    Coord::all().find(|&from| match grid[from] {
        Some(piece) => piece.force == by && reachability(grid, from, target, true).ok(),
        None => false,
    })
}

fn king_force(grid: &Grid, king_pos: Coord) -> Force {
    let piece = grid[king_pos].unwrap();
    assert_eq!(piece.kind, PieceKind::King);
    piece.force
}

fn is_check_to(grid: &Grid, king_pos: Coord) -> bool {
    let force = king_force(grid, king_pos);
    find_attacker(grid, king_pos, force.opponent()).is_some()
}


#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Capture {
    pub kind: PieceKind,
    pub force: Force,
    // Where the captured piece stood; differs from the move destination for en passant.
    pub pos: Coord,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Check {
    // The force whose king is attacked.
    pub force: Force,
    pub attacker: Coord,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TurnReport {
    pub capture: Option<Capture>,
    pub is_en_passant: bool,
    pub castle: Option<CastleDirection>,
    pub promoted: Option<PieceKind>,
    // Check status of the new side to move.
    pub check: Option<Check>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TurnError {
    PieceMissing,
    WrongTurnOrder,
    ImpossibleTrajectory,
    PathBlocked,
    UnprotectedKing,
    CastlingPieceHasMoved,
    BadPromotion,
}

// Everything needed to commit a turn. Validation happens while the outcome is being
// constructed; applying it cannot fail. The scratch grid doubles as the rollback
// snapshot: rejecting a move is dropping the outcome.
#[derive(Clone, Debug)]
struct TurnOutcome {
    new_grid: Grid,
    new_king_pos: Coord,
    from: Coord,
    moved_piece: PieceOnBoard,
    capture: Option<Capture>,
    is_en_passant: bool,
    castle: Option<CastleDirection>,
    promoted: Option<PieceKind>,
    // Set by the double advance just made, empty for every other turn.
    en_passant_target: Option<Coord>,
    resets_halfmove_clock: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoardSetup {
    pub grid: Grid,
    pub active_force: Force,
    pub castling_rights: CastlingRights,
    pub en_passant_target: Option<Coord>,
    pub halfmove_clock: u32,
    pub full_turn_index: u32,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Board {
    grid: Grid,
    kings: EnumMap<Force, Coord>,
    active_force: Force,
    castling_rights: CastlingRights,
    en_passant_target: Option<Coord>,
    halfmove_clock: u32,
    full_turn_index: u32,
    check: Option<Check>,
}

impl Board {
    pub fn new() -> Board {
        use PieceKind::*;
        let back_row = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];
        let mut grid = Grid::new();
        for (col, kind) in Col::all().zip(back_row) {
            grid[Coord::new(Row::_1, col)] = Some(PieceOnBoard::new(kind, Force::White));
            grid[Coord::new(Row::_2, col)] = Some(PieceOnBoard::new(Pawn, Force::White));
            grid[Coord::new(Row::_7, col)] = Some(PieceOnBoard::new(Pawn, Force::Black));
            grid[Coord::new(Row::_8, col)] = Some(PieceOnBoard::new(kind, Force::Black));
        }
        Board::new_from_setup(BoardSetup {
            grid,
            active_force: Force::White,
            castling_rights: enum_map! { _ => enum_map! { _ => true } },
            en_passant_target: None,
            halfmove_clock: 0,
            full_turn_index: 1,
        })
        .unwrap()
    }

    pub fn new_from_setup(setup: BoardSetup) -> Result<Board, String> {
        let BoardSetup {
            grid,
            active_force,
            castling_rights,
            en_passant_target,
            halfmove_clock,
            full_turn_index,
        } = setup;

        let mut king_pos = EnumMap::<Force, Option<Coord>>::default();
        for pos in Coord::all() {
            if let Some(piece) = grid[pos] {
                if piece.kind == PieceKind::King {
                    if king_pos[piece.force].is_some() {
                        return Err(format!("multiple {:?} kings", piece.force));
                    }
                    king_pos[piece.force] = Some(pos);
                }
            }
        }
        let white_king =
            king_pos[Force::White].ok_or_else(|| "missing White king".to_owned())?;
        let black_king =
            king_pos[Force::Black].ok_or_else(|| "missing Black king".to_owned())?;
        let kings = enum_map! { Force::White => white_king, Force::Black => black_king };

        for force in Force::iter() {
            for dir in CastleDirection::iter() {
                if !castling_rights[force][dir] {
                    continue;
                }
                let king_home = Coord::new(home_row(force), Col::E);
                let rook_home = Coord::new(home_row(force), rook_home_col(dir));
                let rook_present = matches!(
                    grid[rook_home],
                    Some(piece) if piece.kind == PieceKind::Rook && piece.force == force
                );
                if kings[force] != king_home || !rook_present {
                    return Err(format!(
                        "{:?} has {:?} castling rights, but the pieces are not on their home squares",
                        force, dir
                    ));
                }
            }
        }

        if let Some(target) = en_passant_target {
            // The target is the square skipped by the move immediately before, so it
            // belongs to the force that is not on move.
            let expected_row = SubjectiveRow::from_one_based(3).to_row(active_force.opponent());
            if target.row != expected_row {
                return Err(format!("bad en passant target: {}", target.to_algebraic()));
            }
        }

        if find_attacker(&grid, kings[active_force.opponent()], active_force).is_some() {
            return Err("the side not on move is in check".to_owned());
        }

        let mut board = Board {
            grid,
            kings,
            active_force,
            castling_rights,
            en_passant_target,
            halfmove_clock,
            full_turn_index,
            check: None,
        };
        board.check = board.find_check(active_force);
        Ok(board)
    }

    pub fn grid(&self) -> &Grid { &self.grid }
    pub fn active_force(&self) -> Force { self.active_force }
    pub fn castling_rights(&self) -> &CastlingRights { &self.castling_rights }
    pub fn en_passant_target(&self) -> Option<Coord> { self.en_passant_target }
    pub fn halfmove_clock(&self) -> u32 { self.halfmove_clock }
    pub fn full_turn_index(&self) -> u32 { self.full_turn_index }
    pub fn king_pos(&self, force: Force) -> Coord { self.kings[force] }
    pub fn check(&self) -> Option<Check> { self.check }

    pub fn in_check(&self, force: Force) -> bool { self.find_check(force).is_some() }

    // All destinations for the piece at `from` that survive full validation, including
    // the self-check test. Castle destinations are included.
    pub fn legal_destinations(&self, from: Coord) -> Vec<Coord> {
        Coord::all()
            .filter(|&to| self.turn_outcome(self.active_force, from, to, None).is_ok())
            .collect()
    }

    pub fn has_any_legal_move(&self, force: Force) -> bool {
        Coord::all().any(|from| {
            matches!(self.grid[from], Some(piece) if piece.force == force)
                && Coord::all().any(|to| self.turn_outcome(force, from, to, None).is_ok())
        })
    }

    // The single mutating entry point. On error the board is untouched; a move that
    // would leave the mover's own king in check never gets past validation.
    pub fn apply_move(
        &mut self, from: Coord, to: Coord, promote_to: Option<PieceKind>,
    ) -> Result<TurnReport, TurnError> {
        let force = self.active_force;
        let outcome = self.turn_outcome(force, from, to, promote_to)?;
        Ok(self.commit(force, outcome))
    }

    fn find_check(&self, force: Force) -> Option<Check> {
        find_attacker(&self.grid, self.kings[force], force.opponent())
            .map(|attacker| Check { force, attacker })
    }

    // Pure validation: resolves a candidate move into everything needed to commit it.
    // The board is not touched; all speculative work happens on a scratch grid.
    fn turn_outcome(
        &self, force: Force, from: Coord, to: Coord, promote_to: Option<PieceKind>,
    ) -> Result<TurnOutcome, TurnError> {
        let piece = self.grid[from].ok_or(TurnError::PieceMissing)?;
        if piece.force != force {
            return Err(TurnError::WrongTurnOrder);
        }
        if piece.kind == PieceKind::King {
            if let Some(dir) = castle_direction(from, to) {
                return self.castle_outcome(force, dir, promote_to);
            }
        }

        let mut new_grid = self.grid.clone();
        let capture_pos = get_capture(&new_grid, from, to, self.en_passant_target);
        match reachability(&new_grid, from, to, capture_pos.is_some()) {
            Reachability::Ok => {}
            Reachability::Blocked => return Err(TurnError::PathBlocked),
            Reachability::Impossible => return Err(TurnError::ImpossibleTrajectory),
        }

        let is_en_passant = capture_pos.is_some() && capture_pos != Some(to);
        new_grid[from] = None;
        let mut capture = None;
        if let Some(pos) = capture_pos {
            let captured = new_grid[pos].take().unwrap();
            capture = Some(Capture { kind: captured.kind, force: captured.force, pos });
        }

        let mut promoted = None;
        if should_promote(force, piece.kind, to) {
            let promote_to = promote_to.unwrap_or(PieceKind::Queen);
            if !promote_to.can_promote_to() {
                return Err(TurnError::BadPromotion);
            }
            promoted = Some(promote_to);
            new_grid[to] = Some(PieceOnBoard { kind: promote_to, has_moved: true, ..piece });
        } else {
            if promote_to.is_some() {
                return Err(TurnError::BadPromotion);
            }
            new_grid[to] = Some(PieceOnBoard { has_moved: true, ..piece });
        }

        let new_king_pos = if piece.kind == PieceKind::King { to } else { self.kings[force] };
        if is_check_to(&new_grid, new_king_pos) {
            return Err(TurnError::UnprotectedKing);
        }

        let en_passant_target = if piece.kind == PieceKind::Pawn && (to - from).0.abs() == 2 {
            Some(Coord::new(from.row + force.forward(), from.col))
        } else {
            None
        };
        Ok(TurnOutcome {
            new_grid,
            new_king_pos,
            from,
            moved_piece: piece,
            capture,
            is_en_passant,
            castle: None,
            promoted,
            en_passant_target,
            resets_halfmove_clock: piece.kind == PieceKind::Pawn || capture.is_some(),
        })
    }

    fn castle_outcome(
        &self, force: Force, dir: CastleDirection, promote_to: Option<PieceKind>,
    ) -> Result<TurnOutcome, TurnError> {
        if promote_to.is_some() {
            return Err(TurnError::BadPromotion);
        }
        if !self.castling_rights[force][dir] {
            return Err(TurnError::CastlingPieceHasMoved);
        }
        let row = home_row(force);
        let king_from = self.kings[force];
        // While the right is intact neither piece has moved.
        debug_assert_eq!(king_from, Coord::new(row, Col::E));
        let rook_from = Coord::new(row, rook_home_col(dir));

        let mut new_grid = self.grid.clone();
        let king = new_grid[king_from].take().unwrap();
        let rook = new_grid[rook_from].take().unwrap();
        assert_eq!(rook.kind, PieceKind::Rook);

        let (king_to, rook_to) = match dir {
            CastleDirection::ASide => (Coord::new(row, Col::C), Coord::new(row, Col::D)),
            CastleDirection::HSide => (Coord::new(row, Col::G), Coord::new(row, Col::F)),
        };

        // Every square either piece crosses or lands on must be free. Taking the union
        // of both spans also covers the b-file square a queenside rook passes over.
        let cols = [king_from.col, king_to.col, rook_from.col, rook_to.col];
        let col_span = cols.into_iter().minmax().into_option().unwrap();
        for col in col_range_inclusive(col_span) {
            if new_grid[Coord::new(row, col)].is_some() {
                return Err(TurnError::PathBlocked);
            }
        }

        // The king must not start on, pass through or land on an attacked square.
        for col in col_range_inclusive(sort_two((king_from.col, king_to.col))) {
            let pos = Coord::new(row, col);
            let attacked =
                new_grid.with_scoped_set(pos, Some(king), |grid| is_check_to(grid, pos));
            if attacked {
                return Err(TurnError::UnprotectedKing);
            }
        }

        new_grid[king_to] = Some(PieceOnBoard { has_moved: true, ..king });
        new_grid[rook_to] = Some(PieceOnBoard { has_moved: true, ..rook });
        Ok(TurnOutcome {
            new_grid,
            new_king_pos: king_to,
            from: king_from,
            moved_piece: king,
            capture: None,
            is_en_passant: false,
            castle: Some(dir),
            promoted: None,
            en_passant_target: None,
            resets_halfmove_clock: false,
        })
    }

    // Cannot fail: the outcome has been fully validated.
    fn commit(&mut self, force: Force, outcome: TurnOutcome) -> TurnReport {
        let TurnOutcome {
            new_grid,
            new_king_pos,
            from,
            moved_piece,
            capture,
            is_en_passant,
            castle,
            promoted,
            en_passant_target,
            resets_halfmove_clock,
        } = outcome;
        self.grid = new_grid;
        self.kings[force] = new_king_pos;

        // Castling rights only ever degrade: any king move clears both for its force, a
        // rook leaving its home corner or an enemy rook captured on its home corner
        // clears the corresponding side.
        if moved_piece.kind == PieceKind::King {
            self.castling_rights[force] = enum_map! { _ => false };
        }
        if moved_piece.kind == PieceKind::Rook {
            for dir in CastleDirection::iter() {
                if from == Coord::new(home_row(force), rook_home_col(dir)) {
                    self.castling_rights[force][dir] = false;
                }
            }
        }
        if let Some(capture) = capture {
            if capture.kind == PieceKind::Rook {
                for dir in CastleDirection::iter() {
                    if capture.pos == Coord::new(home_row(capture.force), rook_home_col(dir)) {
                        self.castling_rights[capture.force][dir] = false;
                    }
                }
            }
        }

        self.en_passant_target = en_passant_target;
        if resets_halfmove_clock {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if force == Force::Black {
            self.full_turn_index += 1;
        }
        self.active_force = force.opponent();
        self.check = self.find_check(self.active_force);
        debug_assert!(matches!(
            self.grid[self.kings[force]],
            Some(piece) if piece.kind == PieceKind::King && piece.force == force
        ));
        TurnReport { capture, is_en_passant, castle, promoted, check: self.check }
    }
}
