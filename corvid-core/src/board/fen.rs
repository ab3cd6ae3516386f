//! FEN and Shredder-FEN parsing/writing.

use super::{Castling, Position};
use crate::types::{File, Piece, PieceType, Player, Square, NO_SQUARE};
use crate::zobrist::{castle_key, ep_key, side_key};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("FEN must have 6 space-separated fields, found {0}")]
    WrongFieldCount(usize),
    #[error("invalid piece placement field: {0}")]
    BadPlacement(String),
    #[error("invalid side-to-move field: {0}")]
    BadSideToMove(String),
    #[error("invalid castling field: {0}")]
    BadCastling(String),
    #[error("invalid en-passant field: {0}")]
    BadEnPassant(String),
    #[error("invalid half-move or full-move counter: {0}")]
    BadCounter(String),
}

pub fn parse(fen: &str) -> Result<Position, FenError> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(FenError::WrongFieldCount(fields.len()));
    }

    let mut pos = Position {
        boards: [[crate::bitboard::BitBoard::default(); 6]; 2],
        occ: [crate::bitboard::BitBoard::default(); 3],
        squares: [Piece::NoPiece; 64],
        stm: Player::White,
        castling: Castling::empty(),
        rook_files: super::STANDARD_ROOK_FILES,
        ep_square: NO_SQUARE,
        halfmove_clock: 0,
        fullmove_number: 1,
        null_ply: 0,
        zobrist: 0,
        material_key: 0,
        checkers: crate::bitboard::BitBoard::default(),
        pinned: crate::bitboard::BitBoard::default(),
        history: Vec::with_capacity(256),
        chess960: false,
    };

    let mut row = 0u8;
    let mut col = 0u8;
    for ch in fields[0].chars() {
        match ch {
            '/' => {
                if col != 8 {
                    return Err(FenError::BadPlacement(fields[0].to_string()));
                }
                row += 1;
                col = 0;
            }
            '1'..='8' => {
                col += ch.to_digit(10).unwrap() as u8;
            }
            c => {
                let piece = char_to_piece(c).ok_or_else(|| FenError::BadPlacement(fields[0].to_string()))?;
                if col >= 8 || row >= 8 {
                    return Err(FenError::BadPlacement(fields[0].to_string()));
                }
                let sq = Square(row * 8 + col);
                pos.place(piece, sq);
                col += 1;
            }
        }
    }

    pos.stm = match fields[1] {
        "w" => Player::White,
        "b" => Player::Black,
        other => return Err(FenError::BadSideToMove(other.to_string())),
    };

    let mut rights = Castling::empty();
    if fields[2] != "-" {
        for c in fields[2].chars() {
            match c {
                'K' => rights |= Castling::WHITE_KING_SIDE,
                'Q' => rights |= Castling::WHITE_QUEEN_SIDE,
                'k' => rights |= Castling::BLACK_KING_SIDE,
                'q' => rights |= Castling::BLACK_QUEEN_SIDE,
                // Shredder-FEN: a file letter names the castling rook directly.
                'A'..='H' => {
                    let file = c as u8 - b'A';
                    let king_file = pos.king_square(Player::White).file() as u8;
                    if file > king_file {
                        pos.rook_files[0] = File::from_index(file);
                        rights |= Castling::WHITE_KING_SIDE;
                    } else {
                        pos.rook_files[1] = File::from_index(file);
                        rights |= Castling::WHITE_QUEEN_SIDE;
                    }
                    pos.chess960 = true;
                }
                'a'..='h' => {
                    let file = c as u8 - b'a';
                    let king_file = pos.king_square(Player::Black).file() as u8;
                    if file > king_file {
                        pos.rook_files[2] = File::from_index(file);
                        rights |= Castling::BLACK_KING_SIDE;
                    } else {
                        pos.rook_files[3] = File::from_index(file);
                        rights |= Castling::BLACK_QUEEN_SIDE;
                    }
                    pos.chess960 = true;
                }
                _ => return Err(FenError::BadCastling(fields[2].to_string())),
            }
        }
    }
    pos.castling = rights;
    pos.zobrist ^= castle_key(pos.castling.bits());

    if fields[3] != "-" {
        let sq = Square::from_algebraic(fields[3]).ok_or_else(|| FenError::BadEnPassant(fields[3].to_string()))?;
        pos.ep_square = sq;
        pos.zobrist ^= ep_key(sq.file());
    }

    if let Some(hmc) = fields.get(4) {
        pos.halfmove_clock = hmc.parse().map_err(|_| FenError::BadCounter(hmc.to_string()))?;
    }
    if let Some(fmn) = fields.get(5) {
        pos.fullmove_number = fmn.parse().map_err(|_| FenError::BadCounter(fmn.to_string()))?;
    }

    if pos.stm == Player::Black {
        pos.zobrist ^= side_key();
    }

    pos.recompute_checkers_and_pinned();
    Ok(pos)
}

fn char_to_piece(c: char) -> Option<Piece> {
    let player = if c.is_ascii_uppercase() { Player::White } else { Player::Black };
    let pt = match c.to_ascii_lowercase() {
        'p' => PieceType::Pawn,
        'n' => PieceType::Knight,
        'b' => PieceType::Bishop,
        'r' => PieceType::Rook,
        'q' => PieceType::Queen,
        'k' => PieceType::King,
        _ => return None,
    };
    Some(Piece::make(player, pt))
}

pub fn write(pos: &Position) -> String {
    let mut s = String::new();
    for row in 0..8u8 {
        let mut empty = 0u8;
        for col in 0..8u8 {
            let piece = pos.squares[(row * 8 + col) as usize];
            if piece.is_none() {
                empty += 1;
            } else {
                if empty > 0 {
                    s.push((b'0' + empty) as char);
                    empty = 0;
                }
                s.push(piece.character());
            }
        }
        if empty > 0 {
            s.push((b'0' + empty) as char);
        }
        if row != 7 {
            s.push('/');
        }
    }
    s.push(' ');
    s.push(if pos.stm == Player::White { 'w' } else { 'b' });
    s.push(' ');
    if pos.castling.is_empty() {
        s.push('-');
    } else {
        if pos.castling.contains(Castling::WHITE_KING_SIDE) {
            s.push('K');
        }
        if pos.castling.contains(Castling::WHITE_QUEEN_SIDE) {
            s.push('Q');
        }
        if pos.castling.contains(Castling::BLACK_KING_SIDE) {
            s.push('k');
        }
        if pos.castling.contains(Castling::BLACK_QUEEN_SIDE) {
            s.push('q');
        }
    }
    s.push(' ');
    if pos.ep_square.is_okay() {
        s.push_str(&pos.ep_square.algebraic());
    } else {
        s.push('-');
    }
    s.push_str(&format!(" {} {}", pos.halfmove_clock, pos.fullmove_number));
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_round_trips() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let pos = parse(fen).unwrap();
        assert_eq!(write(&pos), fen);
    }

    #[test]
    fn kiwipete_round_trips() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let pos = parse(fen).unwrap();
        assert_eq!(write(&pos), fen);
    }
}
