//! Bitboard position state: piece placement, occupancies, castling, en
//! passant, Zobrist hashing, and make/undo with repetition tracking.

mod fen;

pub use fen::FenError;

use crate::attacks::{attackers_to, between, bishop_attacks, king_attacks, knight_attacks, line_through, pawn_attacks, queen_attacks, rook_attacks};
use crate::bitboard::BitBoard;
use crate::mv::{Move, MoveFlag};
use crate::types::{File, Piece, PieceType, Player, Rank, Square, NO_SQUARE};
use crate::zobrist::{castle_key, ep_key, piece_square_key, side_key};
use bitflags::bitflags;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct Castling: u8 {
        const WHITE_KING_SIDE  = 0b0001;
        const WHITE_QUEEN_SIDE = 0b0010;
        const BLACK_KING_SIDE  = 0b0100;
        const BLACK_QUEEN_SIDE = 0b1000;
    }
}

impl Castling {
    pub fn for_player_king_side(player: Player) -> Castling {
        match player {
            Player::White => Castling::WHITE_KING_SIDE,
            Player::Black => Castling::BLACK_KING_SIDE,
        }
    }

    pub fn for_player_queen_side(player: Player) -> Castling {
        match player {
            Player::White => Castling::WHITE_QUEEN_SIDE,
            Player::Black => Castling::BLACK_QUEEN_SIDE,
        }
    }

    pub fn for_player(player: Player) -> Castling {
        match player {
            Player::White => Castling::WHITE_KING_SIDE | Castling::WHITE_QUEEN_SIDE,
            Player::Black => Castling::BLACK_KING_SIDE | Castling::BLACK_QUEEN_SIDE,
        }
    }
}

/// Standard chess squares for the four rook origins; overridden per-game in
/// Chess960 by `Position::rook_origin`.
const STANDARD_ROOK_FILES: [File; 4] = [File::H, File::A, File::H, File::A];

/// History snapshot pushed by `make_move` and popped by `undo_move`.
#[derive(Copy, Clone)]
struct Undo {
    mv: Move,
    captured: Piece,
    castling: Castling,
    ep_square: Square,
    halfmove_clock: u16,
    null_ply: u16,
    zobrist: u64,
    material_key: u64,
    checkers: BitBoard,
    pinned: BitBoard,
}

/// A chess position: bitboards, occupancy, side to move, and everything
/// needed to make and undo moves while keeping Zobrist, material key,
/// checkers, and pinned pieces consistent.
#[derive(Clone)]
pub struct Position {
    boards: [[BitBoard; 6]; 2],
    occ: [BitBoard; 3],
    squares: [Piece; 64],
    stm: Player,
    castling: Castling,
    rook_files: [File; 4],
    ep_square: Square,
    halfmove_clock: u16,
    fullmove_number: u16,
    null_ply: u16,
    zobrist: u64,
    material_key: u64,
    checkers: BitBoard,
    pinned: BitBoard,
    history: Vec<Undo>,
    chess960: bool,
}

const OCC_WHITE: usize = 0;
const OCC_BLACK: usize = 1;
const OCC_BOTH: usize = 2;

impl Position {
    pub fn startpos() -> Position {
        Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .expect("startpos FEN is well-formed")
    }

    pub fn from_fen(fen: &str) -> Result<Position, FenError> {
        fen::parse(fen)
    }

    pub fn to_fen(&self) -> String {
        fen::write(self)
    }

    #[inline]
    pub fn side_to_move(&self) -> Player {
        self.stm
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Piece {
        self.squares[sq.0 as usize]
    }

    #[inline]
    pub fn pieces(&self, player: Player, pt: PieceType) -> BitBoard {
        self.boards[player as usize][pt as usize]
    }

    #[inline]
    pub fn pieces_of_type(&self, pt: PieceType) -> BitBoard {
        self.boards[0][pt as usize] | self.boards[1][pt as usize]
    }

    /// True if `player` has any piece other than pawns and king, the
    /// standard null-move-pruning safety check (zugzwang is common with only
    /// pawns left on the board).
    pub fn has_non_pawn_material(&self, player: Player) -> bool {
        const NON_PAWN: [PieceType; 4] = [PieceType::Knight, PieceType::Bishop, PieceType::Rook, PieceType::Queen];
        NON_PAWN.iter().any(|&pt| !self.pieces(player, pt).is_empty())
    }

    #[inline]
    pub fn occupancy(&self, player: Player) -> BitBoard {
        self.occ[player as usize]
    }

    #[inline]
    pub fn occupied(&self) -> BitBoard {
        self.occ[OCC_BOTH]
    }

    #[inline]
    pub fn king_square(&self, player: Player) -> Square {
        self.boards[player as usize][PieceType::King as usize].lsb()
    }

    #[inline]
    pub fn zobrist(&self) -> u64 {
        self.zobrist
    }

    #[inline]
    pub fn material_key(&self) -> u64 {
        self.material_key
    }

    #[inline]
    pub fn checkers(&self) -> BitBoard {
        self.checkers
    }

    #[inline]
    pub fn pinned(&self) -> BitBoard {
        self.pinned
    }

    #[inline]
    pub fn in_check(&self) -> bool {
        !self.checkers.is_empty()
    }

    #[inline]
    pub fn ep_square(&self) -> Square {
        self.ep_square
    }

    #[inline]
    pub fn castling(&self) -> Castling {
        self.castling
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    #[inline]
    pub fn null_ply(&self) -> u16 {
        self.null_ply
    }

    #[inline]
    pub fn is_chess960(&self) -> bool {
        self.chess960
    }

    pub fn rook_origin(&self, player: Player, king_side: bool) -> Square {
        let idx = match (player, king_side) {
            (Player::White, true) => 0,
            (Player::White, false) => 1,
            (Player::Black, true) => 2,
            (Player::Black, false) => 3,
        };
        let home_rank = match player {
            Player::White => Rank::R1,
            Player::Black => Rank::R8,
        };
        Square::from_file_rank(self.rook_files[idx], home_rank)
    }

    fn material_index(piece: Piece, count: u32) -> u64 {
        let capped = count.min(7) as u64;
        capped << (piece as u64 * 3)
    }

    fn recompute_checkers_and_pinned(&mut self) {
        let us = self.stm;
        let them = !us;
        let king_sq = self.king_square(us);
        self.checkers = attackers_to(king_sq, self.occ[OCC_BOTH], &self.boards) & self.occ[them as usize];

        let mut pinned = BitBoard::default();
        let their_bishops_queens =
            self.boards[them as usize][PieceType::Bishop as usize] | self.boards[them as usize][PieceType::Queen as usize];
        let their_rooks_queens =
            self.boards[them as usize][PieceType::Rook as usize] | self.boards[them as usize][PieceType::Queen as usize];
        let pinners = (bishop_attacks(king_sq, BitBoard::default()) & their_bishops_queens)
            | (rook_attacks(king_sq, BitBoard::default()) & their_rooks_queens);
        for pinner_sq in pinners {
            let ray = between(king_sq, pinner_sq) & self.occ[OCC_BOTH];
            if ray.popcount() == 1 {
                pinned |= ray & self.occ[us as usize];
            }
        }
        self.pinned = pinned;
    }

    fn place(&mut self, piece: Piece, sq: Square) {
        debug_assert!(self.squares[sq.0 as usize].is_none());
        let player = piece.player().expect("place requires a real piece");
        self.boards[player as usize][piece.piece_type() as usize].set(sq);
        self.occ[player as usize].set(sq);
        self.occ[OCC_BOTH].set(sq);
        self.squares[sq.0 as usize] = piece;
        self.zobrist ^= piece_square_key(piece, sq);
        let cur = (self.material_key >> (piece as u64 * 3)) & 0b111;
        self.material_key = (self.material_key & !(0b111 << (piece as u64 * 3)))
            | Self::material_index(piece, cur as u32 + 1);
    }

    fn remove(&mut self, sq: Square) -> Piece {
        let piece = self.squares[sq.0 as usize];
        debug_assert!(!piece.is_none());
        let player = piece.player().unwrap();
        self.boards[player as usize][piece.piece_type() as usize].clear(sq);
        self.occ[player as usize].clear(sq);
        self.occ[OCC_BOTH].clear(sq);
        self.squares[sq.0 as usize] = Piece::NoPiece;
        self.zobrist ^= piece_square_key(piece, sq);
        let cur = (self.material_key >> (piece as u64 * 3)) & 0b111;
        self.material_key = (self.material_key & !(0b111 << (piece as u64 * 3)))
            | Self::material_index(piece, cur.saturating_sub(1) as u32);
        piece
    }

    fn move_piece(&mut self, from: Square, to: Square) {
        let piece = self.squares[from.0 as usize];
        let player = piece.player().unwrap();
        let from_to = BitBoard::from_sq(from) | BitBoard::from_sq(to);
        self.boards[player as usize][piece.piece_type() as usize] ^= from_to;
        self.occ[player as usize] ^= from_to;
        self.occ[OCC_BOTH] ^= from_to;
        self.squares[from.0 as usize] = Piece::NoPiece;
        self.squares[to.0 as usize] = piece;
        self.zobrist ^= piece_square_key(piece, from) ^ piece_square_key(piece, to);
    }

    /// Per-square castling-right masks, ANDed into the current rights on
    /// every move so that moving or capturing a rook/king updates rights.
    fn castle_mask_for_square(&self, sq: Square) -> Castling {
        let mut mask = Castling::empty();
        if sq == Square::from_file_rank(File::E, Rank::R1) {
            mask |= Castling::for_player(Player::White);
        }
        if sq == Square::from_file_rank(File::E, Rank::R8) {
            mask |= Castling::for_player(Player::Black);
        }
        if sq == self.rook_origin(Player::White, true) {
            mask |= Castling::WHITE_KING_SIDE;
        }
        if sq == self.rook_origin(Player::White, false) {
            mask |= Castling::WHITE_QUEEN_SIDE;
        }
        if sq == self.rook_origin(Player::Black, true) {
            mask |= Castling::BLACK_KING_SIDE;
        }
        if sq == self.rook_origin(Player::Black, false) {
            mask |= Castling::BLACK_QUEEN_SIDE;
        }
        mask
    }

    fn set_ep(&mut self, sq: Square) {
        self.ep_square = sq;
        self.zobrist ^= ep_key(sq.file());
    }

    fn clear_ep(&mut self) {
        if self.ep_square.is_okay() {
            self.zobrist ^= ep_key(self.ep_square.file());
            self.ep_square = NO_SQUARE;
        }
    }

    fn set_castling(&mut self, new_rights: Castling) {
        self.zobrist ^= castle_key(self.castling.bits());
        self.castling = new_rights;
        self.zobrist ^= castle_key(self.castling.bits());
    }

    /// Applies a pseudo-legal move. Callers are responsible for having
    /// verified legality beforehand (see the `movegen` module); this only
    /// maintains internal consistency.
    pub fn make_move(&mut self, mv: Move) {
        let us = self.stm;
        let them = !us;
        let from = mv.from_sq();
        let to = mv.to_sq();
        let flag = mv.flag();

        let undo = Undo {
            mv,
            captured: Piece::NoPiece,
            castling: self.castling,
            ep_square: self.ep_square,
            halfmove_clock: self.halfmove_clock,
            null_ply: self.null_ply,
            zobrist: self.zobrist,
            material_key: self.material_key,
            checkers: self.checkers,
            pinned: self.pinned,
        };
        self.history.push(undo);

        self.halfmove_clock += 1;
        self.null_ply += 1;

        let moving_piece = self.squares[from.0 as usize];
        let is_pawn_move = moving_piece.piece_type() == PieceType::Pawn;

        let mut captured = Piece::NoPiece;
        if flag.is_capture() {
            let cap_sq = if flag == MoveFlag::EnPassant {
                Square((to.0 as i8 - us.pawn_push()) as u8)
            } else {
                to
            };
            captured = self.remove(cap_sq);
            self.halfmove_clock = 0;
        }

        if flag.is_castle() {
            let king_side = flag == MoveFlag::KingCastle;
            let rook_from = self.rook_origin(us, king_side);
            let rook_to_file = if king_side { File::F } else { File::D };
            let king_to_file = if king_side { File::G } else { File::C };
            let home_rank = to.rank();
            let rook_to = Square::from_file_rank(rook_to_file, home_rank);
            let king_to = Square::from_file_rank(king_to_file, home_rank);
            // Clear the rook first: in Chess960 the king and rook squares
            // may overlap, and writing the king before clearing the rook
            // would lose that cell.
            self.remove(rook_from);
            self.remove(from);
            self.place(Piece::make(us, PieceType::Rook), rook_to);
            self.place(Piece::make(us, PieceType::King), king_to);
        } else if let Some(promo) = flag.promotion_piece_type() {
            self.remove(from);
            self.place(Piece::make(us, promo), to);
        } else {
            self.move_piece(from, to);
        }

        self.clear_ep();

        let mask = self.castle_mask_for_square(from) | self.castle_mask_for_square(to);
        if !mask.is_empty() {
            self.set_castling(self.castling & !mask);
        }

        if flag == MoveFlag::DoublePawnPush {
            let candidate = Square((to.0 as i8 - us.pawn_push()) as u8);
            let enemy_pawns_adjacent = pawn_attacks(us, candidate) & self.boards[them as usize][PieceType::Pawn as usize];
            if !enemy_pawns_adjacent.is_empty() {
                self.set_ep(candidate);
            }
        }

        if is_pawn_move {
            self.halfmove_clock = 0;
        }

        self.history.last_mut().unwrap().captured = captured;

        self.stm = them;
        self.zobrist ^= side_key();
        if self.stm == Player::White {
            self.fullmove_number += 1;
        }

        self.recompute_checkers_and_pinned();
    }

    pub fn undo_move(&mut self, mv: Move) {
        let undo = self.history.pop().expect("undo_move without matching make_move");
        debug_assert_eq!(undo.mv, mv);

        self.stm = !self.stm;
        if self.stm == Player::Black {
            self.fullmove_number -= 1;
        }
        let us = self.stm;
        let flag = mv.flag();
        let from = mv.from_sq();
        let to = mv.to_sq();

        if flag.is_castle() {
            let king_side = flag == MoveFlag::KingCastle;
            let home_rank = to.rank();
            let rook_to_file = if king_side { File::F } else { File::D };
            let king_to_file = if king_side { File::G } else { File::C };
            let rook_to = Square::from_file_rank(rook_to_file, home_rank);
            let king_to = Square::from_file_rank(king_to_file, home_rank);
            let rook_from = self.rook_origin(us, king_side);
            self.remove(king_to);
            self.remove(rook_to);
            self.place(Piece::make(us, PieceType::King), from);
            self.place(Piece::make(us, PieceType::Rook), rook_from);
        } else if let Some(_promo) = flag.promotion_piece_type() {
            self.remove(to);
            self.place(Piece::make(us, PieceType::Pawn), from);
        } else {
            self.move_piece(to, from);
        }

        if flag.is_capture() && undo.captured != Piece::NoPiece {
            let cap_sq = if flag == MoveFlag::EnPassant {
                Square((to.0 as i8 - us.pawn_push()) as u8)
            } else {
                to
            };
            self.place(undo.captured, cap_sq);
        }

        self.castling = undo.castling;
        self.ep_square = undo.ep_square;
        self.halfmove_clock = undo.halfmove_clock;
        self.null_ply = undo.null_ply;
        self.zobrist = undo.zobrist;
        self.material_key = undo.material_key;
        self.checkers = undo.checkers;
        self.pinned = undo.pinned;
    }

    /// Makes a null move: flips side to move without moving a piece. Illegal
    /// when in check.
    pub fn make_null_move(&mut self) {
        debug_assert!(!self.in_check());
        let undo = Undo {
            mv: crate::mv::NULL_MOVE,
            captured: Piece::NoPiece,
            castling: self.castling,
            ep_square: self.ep_square,
            halfmove_clock: self.halfmove_clock,
            null_ply: self.null_ply,
            zobrist: self.zobrist,
            material_key: self.material_key,
            checkers: self.checkers,
            pinned: self.pinned,
        };
        self.history.push(undo);
        self.clear_ep();
        self.null_ply = 0;
        self.halfmove_clock += 1;
        self.stm = !self.stm;
        self.zobrist ^= side_key();
        self.recompute_checkers_and_pinned();
    }

    pub fn undo_null_move(&mut self) {
        let undo = self.history.pop().expect("undo_null_move without matching make_null_move");
        self.stm = !self.stm;
        self.castling = undo.castling;
        self.ep_square = undo.ep_square;
        self.halfmove_clock = undo.halfmove_clock;
        self.null_ply = undo.null_ply;
        self.zobrist = undo.zobrist;
        self.material_key = undo.material_key;
        self.checkers = undo.checkers;
        self.pinned = undo.pinned;
    }

    /// True when `sq` is attacked by `by_player`, computed against the
    /// current occupancy. Used for castle-through-check and king-move
    /// legality checks.
    pub fn is_attacked_by(&self, sq: Square, by_player: Player, occ: BitBoard) -> bool {
        let boards = &self.boards;
        if !(knight_attacks(sq) & boards[by_player as usize][PieceType::Knight as usize]).is_empty() {
            return true;
        }
        if !(king_attacks(sq) & boards[by_player as usize][PieceType::King as usize]).is_empty() {
            return true;
        }
        if !(pawn_attacks(!by_player, sq) & boards[by_player as usize][PieceType::Pawn as usize]).is_empty() {
            return true;
        }
        let bishops_queens =
            boards[by_player as usize][PieceType::Bishop as usize] | boards[by_player as usize][PieceType::Queen as usize];
        if !(bishop_attacks(sq, occ) & bishops_queens).is_empty() {
            return true;
        }
        let rooks_queens =
            boards[by_player as usize][PieceType::Rook as usize] | boards[by_player as usize][PieceType::Queen as usize];
        if !(rook_attacks(sq, occ) & rooks_queens).is_empty() {
            return true;
        }
        false
    }

    /// Attackers of `sq`, both colors, used by SEE.
    pub fn attackers_to(&self, sq: Square, occ: BitBoard) -> BitBoard {
        attackers_to(sq, occ, &self.boards)
    }

    /// Whether a reconstructed move (e.g. from the transposition table) is
    /// still pseudo-legal against the current position.
    pub fn is_pseudo_legal(&self, mv: Move) -> bool {
        if mv.is_null() {
            return false;
        }
        let from = mv.from_sq();
        let to = mv.to_sq();
        let piece = self.squares[from.0 as usize];
        if piece.is_none() || piece.player() != Some(self.stm) || piece != mv.piece() {
            return false;
        }
        let flag = mv.flag();

        if flag.is_castle() {
            let king_side = flag == MoveFlag::KingCastle;
            let right = if king_side {
                Castling::for_player_king_side(self.stm)
            } else {
                Castling::for_player_queen_side(self.stm)
            };
            if !self.castling.contains(right) {
                return false;
            }
            let rook_from = self.rook_origin(self.stm, king_side);
            if to != rook_from || self.squares[rook_from.0 as usize].piece_type() != PieceType::Rook {
                return false;
            }
            let home_rank = from.rank();
            let king_to = Square::from_file_rank(if king_side { File::G } else { File::C }, home_rank);
            let rook_to = Square::from_file_rank(if king_side { File::F } else { File::D }, home_rank);
            let mut required = BitBoard::default();
            for sq in [from, king_to, rook_from, rook_to] {
                required.set(sq);
            }
            let must_be_empty = required & !BitBoard::from_sq(from) & !BitBoard::from_sq(rook_from);
            return (self.occ[OCC_BOTH] & must_be_empty).is_empty();
        }

        if self.occ[self.stm as usize].has(to) {
            return false;
        }
        if flag.is_capture() && flag != MoveFlag::EnPassant && self.squares[to.0 as usize].is_none() {
            return false;
        }
        if flag == MoveFlag::EnPassant && to != self.ep_square {
            return false;
        }
        if flag.is_promotion() && to.rank() != self.stm.promotion_rank() {
            return false;
        }
        // Cheap geometric containment check; full legality (discovered
        // check, pins, castle-through-check) is handled by `is_legal`.
        let occ = self.occ[OCC_BOTH];
        let pseudo_targets = match piece.piece_type() {
            PieceType::Pawn => {
                let push = pawn_push_targets(self.stm, from, occ);
                let attacks = pawn_attacks(self.stm, from) & (self.occ[(!self.stm) as usize] | BitBoard::from_sq(self.ep_square));
                push | attacks
            }
            PieceType::Knight => knight_attacks(from),
            PieceType::Bishop => bishop_attacks(from, occ),
            PieceType::Rook => rook_attacks(from, occ),
            PieceType::Queen => queen_attacks(from, occ),
            PieceType::King => king_attacks(from),
        };
        pseudo_targets.has(to)
    }

    /// Full legality: the side-to-move's king must not end up in check.
    pub fn is_legal(&self, mv: Move) -> bool {
        let us = self.stm;
        let from = mv.from_sq();
        let to = mv.to_sq();
        let king_sq = self.king_square(us);

        if mv.flag().is_castle() {
            let king_side = mv.flag() == MoveFlag::KingCastle;
            let home_rank = from.rank();
            let king_to_file = if king_side { File::G } else { File::C };
            let king_to = Square::from_file_rank(king_to_file, home_rank);
            let step: i8 = if king_to.0 > from.0 { 1 } else { -1 };
            let mut sq = from.0 as i8;
            loop {
                if self.is_attacked_by(Square(sq as u8), !us, self.occ[OCC_BOTH]) {
                    return false;
                }
                if sq as u8 == king_to.0 {
                    break;
                }
                sq += step;
            }
            return true;
        }

        if mv.flag() == MoveFlag::EnPassant {
            let cap_sq = Square((to.0 as i8 - us.pawn_push()) as u8);
            let occ_after = (self.occ[OCC_BOTH] & !BitBoard::from_sq(from) & !BitBoard::from_sq(cap_sq))
                | BitBoard::from_sq(to);
            return !self.is_attacked_by(king_sq, !us, occ_after);
        }

        if from == king_sq {
            let occ_after = (self.occ[OCC_BOTH] & !BitBoard::from_sq(from)) | BitBoard::from_sq(to);
            return !self.is_attacked_by(to, !us, occ_after);
        }

        if self.pinned.has(from) {
            return line_through(king_sq, from).has(to);
        }

        if !self.checkers.is_empty() {
            if self.checkers.more_than_one() {
                return false; // double check: only king moves are legal, handled above
            }
            let checker_sq = self.checkers.lsb();
            return to == checker_sq || between(king_sq, checker_sq).has(to);
        }

        true
    }

    /// Draw by the 50-move rule or insufficient material; repetition is
    /// checked separately since it needs the search-tree-relative history.
    ///
    /// Covers every symmetry the material key is specified to recognize:
    /// K-K, K+N(N)-K / K-K+N(N), K+NN-K, K+B-K / K-K+B, K+BN-KN symmetries,
    /// and K+B-K+B with same-colored bishops.
    pub fn is_material_draw(&self) -> bool {
        if self.pieces_of_type(PieceType::Pawn).popcount() != 0 {
            return false;
        }
        if self.pieces_of_type(PieceType::Rook).popcount() != 0
            || self.pieces_of_type(PieceType::Queen).popcount() != 0
        {
            return false;
        }

        let minors = |player: Player| {
            self.pieces(player, PieceType::Knight).popcount() + self.pieces(player, PieceType::Bishop).popcount()
        };
        let (white_minors, black_minors) = (minors(Player::White), minors(Player::Black));
        let total_non_king = white_minors + black_minors;

        match total_non_king {
            0 => true, // K-K
            1 => true, // K+N-K or K+B-K (and their mirrors)
            2 => {
                if white_minors == 2 || black_minors == 2 {
                    // K+NN-K (drawn under standard rules) or K+BN-K: the
                    // single-side-has-both-minors case only the NN variant
                    // is listed as drawn.
                    let (two_side, _) = if white_minors == 2 { (Player::White, Player::Black) } else { (Player::Black, Player::White) };
                    self.pieces(two_side, PieceType::Knight).popcount() == 2
                } else {
                    // One minor per side: K+B-K+B is drawn only with
                    // same-colored bishops; K+N-K+N, K+N-K+B, K+B-K+N are
                    // not (a lone minor vs a lone minor of different kind,
                    // or knight vs knight, can still force progress).
                    let white_bishop = self.pieces(Player::White, PieceType::Bishop);
                    let black_bishop = self.pieces(Player::Black, PieceType::Bishop);
                    if white_bishop.popcount() == 1 && black_bishop.popcount() == 1 {
                        white_bishop.lsb().is_light() == black_bishop.lsb().is_light()
                    } else {
                        false
                    }
                }
            }
            3 => {
                // K+BN-KN symmetries: one side has bishop+knight, the other
                // a lone knight.
                let bn_side_has_bn =
                    |side_minors: u32, side: Player| side_minors == 2 && self.pieces(side, PieceType::Bishop).popcount() == 1 && self.pieces(side, PieceType::Knight).popcount() == 1;
                let other_has_lone_knight = |other_minors: u32, other: Player| other_minors == 1 && self.pieces(other, PieceType::Knight).popcount() == 1;
                (bn_side_has_bn(white_minors, Player::White) && other_has_lone_knight(black_minors, Player::Black))
                    || (bn_side_has_bn(black_minors, Player::Black) && other_has_lone_knight(white_minors, Player::White))
            }
            _ => false,
        }
    }

    /// Repetition/50-move detection scanning backward through reversible
    /// moves, per the position's own history stack.
    pub fn is_repetition_draw(&self, root_distance: usize) -> bool {
        let limit = self.halfmove_clock.min(self.null_ply) as usize;
        if limit < 4 || self.history.len() < 4 {
            return false;
        }
        let mut matches = 0;
        let mut idx = self.history.len();
        let mut steps = 0;
        while steps + 2 <= limit && idx >= 2 {
            idx -= 2;
            steps += 2;
            if self.history[idx].zobrist == self.zobrist {
                matches += 1;
                if idx + root_distance >= self.history.len() || matches >= 2 {
                    return true;
                }
            }
        }
        false
    }

    /// Upcoming-repetition ("cycle") detection: true if some reversible move
    /// available from here would recreate a position already reached earlier
    /// in the game, without needing a literal two-fold match. Lets the
    /// search treat a forced cycle as drawn well before `is_repetition_draw`
    /// would actually trigger.
    ///
    /// Per Marcel van Kervinck's algorithm: `current_key XOR history[i].key`
    /// for `i` an odd ply-distance already carries exactly one side-to-move
    /// flip, so a hit against the cuckoo table means exactly one non-pawn
    /// reversible move separates the two positions; `ply` is unused beyond
    /// distinguishing in-tree cycles from callers that care, kept for parity
    /// with `is_repetition_draw`'s signature.
    pub fn has_cycle(&self, _ply: usize) -> bool {
        let max_i = self.halfmove_clock.min(self.null_ply) as usize;
        if max_i < 3 {
            return false;
        }
        let hist_len = self.history.len();
        let mut i = 3usize;
        while i <= max_i && i <= hist_len {
            let idx = hist_len - i;
            let candidate_key = self.zobrist ^ self.history[idx].zobrist;
            if let Some((piece, s1, s2)) = crate::zobrist::ZOBRIST.cuckoo_probe(candidate_key) {
                if (between(s1, s2) & self.occ[OCC_BOTH]).is_empty()
                    && (self.squares[s1.0 as usize] == piece || self.squares[s2.0 as usize] == piece)
                {
                    return true;
                }
            }
            i += 2;
        }
        false
    }

    pub fn is_chess960_mut(&mut self, v: bool) {
        self.chess960 = v;
    }
}

fn pawn_push_targets(player: Player, from: Square, occ: BitBoard) -> BitBoard {
    let single = match player {
        Player::White => BitBoard::from_sq(from).shift_north(),
        Player::Black => BitBoard::from_sq(from).shift_south(),
    } & !occ;
    if single.is_empty() {
        return single;
    }
    let on_start_rank = from.rank() == player.pawn_start_rank();
    let double = if on_start_rank {
        (match player {
            Player::White => single.shift_north(),
            Player::Black => single.shift_south(),
        }) & !occ
    } else {
        BitBoard::default()
    };
    single | double
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_has_sixteen_pawns() {
        let pos = Position::startpos();
        assert_eq!(pos.pieces_of_type(PieceType::Pawn).popcount(), 16);
        assert_eq!(pos.side_to_move(), Player::White);
    }

    #[test]
    fn make_undo_restores_state() {
        let mut pos = Position::startpos();
        let before_zobrist = pos.zobrist();
        let before_fen = pos.to_fen();
        let mv = Move::new(
            Square::from_algebraic("e2").unwrap(),
            Square::from_algebraic("e4").unwrap(),
            Piece::WhitePawn,
            MoveFlag::DoublePawnPush,
        );
        pos.make_move(mv);
        assert_ne!(pos.zobrist(), before_zobrist);
        pos.undo_move(mv);
        assert_eq!(pos.zobrist(), before_zobrist);
        assert_eq!(pos.to_fen(), before_fen);
    }

    #[test]
    fn null_move_toggles_side_only() {
        let mut pos = Position::startpos();
        let occ_before = pos.occupied().0;
        pos.make_null_move();
        assert_eq!(pos.side_to_move(), Player::Black);
        assert_eq!(pos.occupied().0, occ_before);
        pos.undo_null_move();
        assert_eq!(pos.side_to_move(), Player::White);
    }

    #[test]
    fn knight_shuffle_is_detected_as_an_upcoming_cycle() {
        let mut pos = Position::startpos();
        let nf3 = Move::new(Square::from_algebraic("g1").unwrap(), Square::from_algebraic("f3").unwrap(), Piece::WhiteKnight, MoveFlag::Quiet);
        let nc6 = Move::new(Square::from_algebraic("b8").unwrap(), Square::from_algebraic("c6").unwrap(), Piece::BlackKnight, MoveFlag::Quiet);
        let ng1 = Move::new(Square::from_algebraic("f3").unwrap(), Square::from_algebraic("g1").unwrap(), Piece::WhiteKnight, MoveFlag::Quiet);

        assert!(!pos.has_cycle(3));
        pos.make_move(nf3);
        pos.make_move(nc6);
        pos.make_move(ng1);
        // White's knight is back on g1: one more reversible black move
        // (Nc6-b8) would recreate the starting position.
        assert!(pos.has_cycle(3));
    }

    #[test]
    fn en_passant_square_set_only_when_capturable() {
        let mut pos = Position::from_fen(
            "rnbqkbnr/ppp1pppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        )
        .unwrap();
        let mv = Move::new(
            Square::from_algebraic("d2").unwrap(),
            Square::from_algebraic("d4").unwrap(),
            Piece::WhitePawn,
            MoveFlag::DoublePawnPush,
        );
        pos.make_move(mv);
        assert!(!pos.ep_square().is_okay());
    }

    #[test]
    fn same_colored_bishops_are_a_material_draw() {
        // Bishops on c1 (dark) and f8 (dark): same color, drawn.
        let pos = Position::from_fen("5b2/8/8/8/8/8/8/2B1K2k w - - 0 1").unwrap();
        assert!(pos.is_material_draw());
    }

    #[test]
    fn opposite_colored_bishops_are_not_a_material_draw() {
        // Bishops on c1 (dark) and g8 (light): opposite colors, not drawn.
        let pos = Position::from_fen("6b1/8/8/8/8/8/8/2B1K2k w - - 0 1").unwrap();
        assert!(!pos.is_material_draw());
    }

    #[test]
    fn bishop_knight_versus_lone_knight_is_a_material_draw() {
        let pos = Position::from_fen("5n2/8/8/8/8/8/8/2BNK2k w - - 0 1").unwrap();
        assert!(pos.is_material_draw());
    }

    #[test]
    fn two_knights_versus_lone_bishop_is_not_a_material_draw() {
        let pos = Position::from_fen("5b2/8/8/8/8/8/8/2NNK2k w - - 0 1").unwrap();
        assert!(!pos.is_material_draw());
    }
}
