#![forbid(unsafe_code)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod board;
pub mod coord;
pub mod fen;
pub mod force;
pub mod grid;
pub mod piece;
pub mod test_util;
pub mod util;

pub use crate::board::{
    Board, BoardSetup, Capture, CastlingRights, Check, TurnError, TurnReport,
};
pub use crate::coord::{Col, Coord, Row, SubjectiveRow, NUM_COLS, NUM_ROWS};
pub use crate::force::Force;
pub use crate::grid::Grid;
pub use crate::piece::{CastleDirection, PieceKind, PieceOnBoard};
