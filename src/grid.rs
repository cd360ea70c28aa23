use std::{fmt, mem, ops};

use ndarray::{Array, Array2};
use serde::{Deserialize, Serialize};

use crate::coord::{Coord, NUM_COLS, NUM_ROWS};
use crate::piece::PieceOnBoard;


#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    data: Array2<Option<PieceOnBoard>>,
}

impl Grid {
    pub fn new() -> Self {
        Grid {
            data: Array::from_elem((NUM_ROWS as usize, NUM_COLS as usize), None),
        }
    }

    // Replaces a cell for the duration of `f`. The original value is restored on every
    // exit path before `with_scoped_set` returns.
    pub fn with_scoped_set<R>(
        &mut self,
        pos: Coord,
        piece: Option<PieceOnBoard>,
        f: impl FnOnce(&Grid) -> R,
    ) -> R {
        let original = mem::replace(&mut self[pos], piece);
        let guard = scopeguard::guard(self, move |grid| grid[pos] = original);
        f(&**guard)
    }
}

impl ops::Index<Coord> for Grid {
    type Output = Option<PieceOnBoard>;
    fn index(&self, pos: Coord) -> &Self::Output {
        // Coord construction is bounds-checked, so the cell always exists.
        &self.data[coord_to_index(pos)]
    }
}

impl ops::IndexMut<Coord> for Grid {
    fn index_mut(&mut self, pos: Coord) -> &mut Self::Output {
        &mut self.data[coord_to_index(pos)]
    }
}

fn coord_to_index(pos: Coord) -> [usize; 2] {
    [pos.row.to_zero_based() as usize, pos.col.to_zero_based() as usize]
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Grid ")?;
        f.debug_map()
            .entries(Coord::all().filter_map(|coord| {
                self[coord].map(|piece| {
                    (coord.to_algebraic(), format!("{:?}-{:?}", piece.force, piece.kind))
                })
            }))
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{Col, Row};
    use crate::force::Force;
    use crate::piece::PieceKind;

    #[test]
    fn scoped_set_restores() {
        let a1 = Coord::new(Row::_1, Col::A);
        let b2 = Coord::new(Row::_2, Col::B);
        let mut g = Grid::new();
        g[a1] = Some(PieceOnBoard::new(PieceKind::Queen, Force::White));
        g[b2] = Some(PieceOnBoard::new(PieceKind::King, Force::White));
        let seen = g.with_scoped_set(a1, None, |g| g[a1]);
        assert_eq!(seen, None);
        assert_eq!(g[a1].unwrap().kind, PieceKind::Queen);
        let seen = g.with_scoped_set(b2, Some(PieceOnBoard::new(PieceKind::Rook, Force::Black)), |g| g[b2]);
        assert_eq!(seen.unwrap().kind, PieceKind::Rook);
        assert_eq!(g[b2].unwrap().kind, PieceKind::King);
        assert_eq!(g[b2].unwrap().force, Force::White);
    }
}
