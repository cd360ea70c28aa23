use derive_new::new;
use enum_map::Enum;
use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::force::Force;


#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Enum, EnumIter, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Enum, EnumIter, Serialize, Deserialize)]
pub enum CastleDirection {
    ASide,  // queenside
    HSide,  // kingside
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, new, Serialize, Deserialize)]
pub struct PieceOnBoard {
    pub kind: PieceKind,
    pub force: Force,
    #[new(value = "false")]
    pub has_moved: bool,
}

impl PieceKind {
    // FEN piece letter: uppercase for white, lowercase for black.
    pub fn to_ascii(self, force: Force) -> char {
        let ch = match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };
        match force {
            Force::White => ch.to_ascii_uppercase(),
            Force::Black => ch,
        }
    }

    pub fn from_ascii(ch: char) -> Option<(Self, Force)> {
        let force = if ch.is_ascii_uppercase() { Force::White } else { Force::Black };
        let kind = match ch.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return None,
        };
        Some((kind, force))
    }

    // Kinds a pawn may become on reaching the last row.
    pub fn can_promote_to(self) -> bool {
        use PieceKind::*;
        match self {
            Pawn | King => false,
            Knight | Bishop | Rook | Queen => true,
        }
    }
}
