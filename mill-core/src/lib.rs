//! Nine Men's Morris game logic with mask-based board representation.
//!
//! # Board Encoding
//!
//! ```text
//! occupied[0]: u32 mask of Player One's pieces (bit i = position i)
//! occupied[1]: u32 mask of Player Two's pieces
//! Bits 24-31 are always zero and the two masks never overlap.
//! ```
//!
//! # Position Numbering
//!
//! ```text
//!   0 ----------- 1 ----------- 2
//!   |             |             |
//!   |    3 ------ 4 ------ 5    |
//!   |    |        |        |    |
//!   |    |    6 - 7 - 8    |    |
//!   |    |    |       |    |    |
//!   9 -- 10 - 11      12 - 13 - 14
//!   |    |    |       |    |    |
//!   |    |   15 - 16 - 17  |    |
//!   |    |        |        |    |
//!   |    18 ----- 19 ----- 20   |
//!   |             |             |
//!   21 ---------- 22 ---------- 23
//! ```
//!
//! # Turn Structure
//!
//! ```text
//! Move   --(place/slide forms a mill)--> Remove  [turn unchanged]
//! Move   --(place/slide, no mill)------> Move    [turn advances]
//! Remove --(remove_piece)--------------> Move    [turn advances]
//! ```

pub mod error;
pub mod topology;

#[cfg(feature = "wasm")]
pub mod wasm;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use error::{RulesError, RulesResult, Violation};
use topology::{bit, ADJACENT_MASKS, BOARD_MASK, MILLS_OF, MILL_MASKS, POSITIONS};

/// Pieces each player starts with.
pub const PIECES_PER_PLAYER: u8 = 9;

/// A player with this many live pieces or fewer may fly.
pub const FLYING_THRESHOLD: u8 = 3;

/// A player with this many live pieces or fewer has lost.
pub const LOSING_THRESHOLD: u8 = 2;

/// Player identifier.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// Get the opponent player.
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Index into per-player arrays (0 or 1).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    /// Convert from index (0 or 1) to Player.
    #[inline]
    pub fn from_index(idx: usize) -> Option<Player> {
        match idx {
            0 => Some(Player::One),
            1 => Some(Player::Two),
            _ => None,
        }
    }

    /// Both players, One first.
    pub fn all() -> impl Iterator<Item = Player> {
        [Player::One, Player::Two].into_iter()
    }
}

/// Position on the board.
///
/// Any integer can be wrapped; only 0-23 name an intersection. Every engine
/// operation checks the range before touching the board.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pos(pub i32);

impl Pos {
    /// Check if this is a valid position (0-23).
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 >= 0 && self.0 < POSITIONS as i32
    }

    /// Array index of a valid position.
    #[inline]
    pub fn index(self) -> Option<usize> {
        if self.is_valid() {
            Some(self.0 as usize)
        } else {
            None
        }
    }

    /// Iterate over all 24 positions.
    pub fn all() -> impl Iterator<Item = Pos> {
        (0..POSITIONS as i32).map(Pos)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sub-phase of the current turn.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// The player to act places, slides or flies a piece.
    Move,
    /// The player to act just closed a mill and must remove an opponent piece.
    Remove,
}

/// An action a player can take.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// Place a piece from hand onto an empty position.
    Place { to: Pos },
    /// Slide (or fly) a piece from one position to another.
    Slide { from: Pos, to: Pos },
    /// Remove an opponent piece after closing a mill.
    Remove { at: Pos },
}

impl Action {
    /// The position the action lands on or clears.
    #[inline]
    pub fn target(&self) -> Pos {
        match self {
            Action::Place { to } => *to,
            Action::Slide { to, .. } => *to,
            Action::Remove { at } => *at,
        }
    }
}

/// Plain, serialisable copy of the full game state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub cells: [Option<Player>; POSITIONS],
    pub turn: Player,
    pub phase: Phase,
    pub unplaced: [u8; 2],
    pub live: [u8; 2],
}

impl Snapshot {
    /// Build a Move-phase snapshot from piece positions and hand counts.
    ///
    /// Live counts are derived as pieces in hand plus pieces on the board.
    pub fn from_pieces(
        one: &[Pos],
        two: &[Pos],
        unplaced: [u8; 2],
        turn: Player,
    ) -> RulesResult<Snapshot> {
        let mut cells = [None; POSITIONS];
        let mut live = unplaced;
        for (player, positions) in [(Player::One, one), (Player::Two, two)] {
            for &pos in positions {
                let idx = pos.index().ok_or(RulesError::OutOfRange(pos))?;
                if cells[idx].is_some() {
                    return Err(RulesError::InconsistentSnapshot(format!(
                        "position {pos} listed twice"
                    )));
                }
                cells[idx] = Some(player);
                live[player.index()] = live[player.index()].saturating_add(1);
            }
        }
        Ok(Snapshot {
            cells,
            turn,
            phase: Phase::Move,
            unplaced,
            live,
        })
    }
}

/// Full game state.
///
/// See module documentation for encoding details.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Board {
    occupied: [u32; 2],
    turn: Player,
    phase: Phase,
    unplaced: [u8; 2],
    live: [u8; 2],
}

impl Board {
    /// Create an empty board with Player One to move and 9 pieces in each hand.
    pub fn new() -> Board {
        Board {
            occupied: [0, 0],
            turn: Player::One,
            phase: Phase::Move,
            unplaced: [PIECES_PER_PLAYER; 2],
            live: [PIECES_PER_PLAYER; 2],
        }
    }

    /// Rebuild a board from a snapshot, rejecting impossible states.
    pub fn from_snapshot(snapshot: Snapshot) -> RulesResult<Board> {
        let mut occupied = [0u32; 2];
        for (idx, cell) in snapshot.cells.iter().enumerate() {
            if let Some(player) = cell {
                occupied[player.index()] |= bit(idx);
            }
        }

        for player in Player::all() {
            let i = player.index();
            let on_board = occupied[i].count_ones() as u8;
            let live = snapshot.live[i];
            if live > PIECES_PER_PLAYER {
                return Err(RulesError::InconsistentSnapshot(format!(
                    "{player:?} has {live} live pieces, at most {PIECES_PER_PLAYER} allowed"
                )));
            }
            if snapshot.unplaced[i].checked_add(on_board) != Some(live) {
                return Err(RulesError::InconsistentSnapshot(format!(
                    "{player:?} has {} unplaced and {on_board} on board but {live} live",
                    snapshot.unplaced[i]
                )));
            }
        }

        let board = Board {
            occupied,
            turn: snapshot.turn,
            phase: snapshot.phase,
            unplaced: snapshot.unplaced,
            live: snapshot.live,
        };

        // A removal is only owed by a player who holds a mill.
        if board.phase == Phase::Remove
            && !board.positions_of(board.turn).any(|idx| board.mill_at(idx))
        {
            return Err(RulesError::InconsistentSnapshot(format!(
                "{:?} is to remove but has no mill",
                board.turn
            )));
        }

        Ok(board)
    }

    /// Copy the state out as a snapshot.
    pub fn snapshot(&self) -> Snapshot {
        let mut cells = [None; POSITIONS];
        for (idx, cell) in cells.iter_mut().enumerate() {
            *cell = self.owner_at(idx);
        }
        Snapshot {
            cells,
            turn: self.turn,
            phase: self.phase,
            unplaced: self.unplaced,
            live: self.live,
        }
    }

    // ========== Internal Helpers ==========

    #[inline]
    fn index_of(pos: Pos) -> RulesResult<usize> {
        pos.index().ok_or(RulesError::OutOfRange(pos))
    }

    #[inline]
    fn owner_at(&self, idx: usize) -> Option<Player> {
        let mask = bit(idx);
        if self.occupied[0] & mask != 0 {
            Some(Player::One)
        } else if self.occupied[1] & mask != 0 {
            Some(Player::Two)
        } else {
            None
        }
    }

    #[inline]
    fn empty_mask(&self) -> u32 {
        !(self.occupied[0] | self.occupied[1]) & BOARD_MASK
    }

    /// Position indices holding the player's pieces.
    fn positions_of(&self, player: Player) -> impl Iterator<Item = usize> {
        let mask = self.occupied[player.index()];
        (0..POSITIONS).filter(move |&idx| mask & bit(idx) != 0)
    }

    fn mill_at(&self, idx: usize) -> bool {
        let Some(owner) = self.owner_at(idx) else {
            return false;
        };
        let own = self.occupied[owner.index()];
        MILLS_OF[idx]
            .iter()
            .any(|&m| own & MILL_MASKS[m] == MILL_MASKS[m])
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), Violation> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(Violation::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    // ========== Queries ==========

    /// Check if a position names an intersection (0-23).
    #[inline]
    pub fn is_valid_position(&self, pos: Pos) -> bool {
        pos.is_valid()
    }

    /// Owner of the piece at a position, or None if empty.
    pub fn cell(&self, pos: Pos) -> RulesResult<Option<Player>> {
        Ok(self.owner_at(Self::index_of(pos)?))
    }

    /// Check if a position is empty.
    pub fn is_empty(&self, pos: Pos) -> RulesResult<bool> {
        Ok(self.cell(pos)?.is_none())
    }

    /// Player entitled to act next.
    #[inline]
    pub fn turn(&self) -> Player {
        self.turn
    }

    /// Check if it is the given player's turn.
    #[inline]
    pub fn is_turn(&self, player: Player) -> bool {
        self.turn == player
    }

    /// Check if the player's piece sits at the position.
    pub fn owns_piece(&self, player: Player, pos: Pos) -> RulesResult<bool> {
        Ok(self.cell(pos)? == Some(player))
    }

    /// Check if the player still has pieces in hand.
    #[inline]
    pub fn has_unplaced(&self, player: Player) -> bool {
        self.unplaced[player.index()] > 0
    }

    /// Check if two positions are joined by a line segment.
    pub fn are_adjacent(&self, a: Pos, b: Pos) -> RulesResult<bool> {
        let a = Self::index_of(a)?;
        let b = Self::index_of(b)?;
        Ok(ADJACENT_MASKS[a] & bit(b) != 0)
    }

    /// Pieces the player has not placed yet.
    #[inline]
    pub fn unplaced_count(&self, player: Player) -> u8 {
        self.unplaced[player.index()]
    }

    /// Pieces the player still has in the game (in hand or on the board).
    #[inline]
    pub fn live_count(&self, player: Player) -> u8 {
        self.live[player.index()]
    }

    /// Pieces the player has on the board.
    #[inline]
    pub fn on_board_count(&self, player: Player) -> u8 {
        self.occupied[player.index()].count_ones() as u8
    }

    /// Check if either player still has pieces to place.
    ///
    /// This stage is independent of the Move/Remove phase tag.
    #[inline]
    pub fn is_placement_phase(&self) -> bool {
        self.has_unplaced(Player::One) || self.has_unplaced(Player::Two)
    }

    /// Check if the player is down to few enough pieces to fly.
    #[inline]
    pub fn can_fly(&self, player: Player) -> bool {
        self.live[player.index()] <= FLYING_THRESHOLD
    }

    /// Check if the piece at a position is part of a complete mill.
    ///
    /// Empty positions are never in a mill.
    pub fn is_mill(&self, pos: Pos) -> RulesResult<bool> {
        Ok(self.mill_at(Self::index_of(pos)?))
    }

    /// Current turn phase.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Check if the player has any move under the current phase.
    ///
    /// In the Remove phase this asks whether the player, acting as remover,
    /// has an opponent piece outside every mill to take.
    pub fn has_legal_moves(&self, player: Player) -> bool {
        if self.has_unplaced(player) {
            return true;
        }
        match self.phase {
            Phase::Move => {
                if self.can_fly(player) && self.live_count(player) > 0 {
                    return true;
                }
                let empty = self.empty_mask();
                self.positions_of(player)
                    .any(|idx| ADJACENT_MASKS[idx] & empty != 0)
            }
            Phase::Remove => self
                .positions_of(player.opponent())
                .any(|idx| !self.mill_at(idx)),
        }
    }

    /// Check if the game has ended.
    pub fn is_game_over(&self) -> bool {
        self.live[0] <= LOSING_THRESHOLD
            || self.live[1] <= LOSING_THRESHOLD
            || !self.has_legal_moves(Player::One)
            || !self.has_legal_moves(Player::Two)
    }

    /// The losing player once the game is over.
    ///
    /// Running out of pieces is checked before running out of moves, and the
    /// player to act is checked first in both cases.
    pub fn loser(&self) -> Option<Player> {
        let order = [self.turn, self.turn.opponent()];
        order
            .into_iter()
            .find(|&p| self.live_count(p) <= LOSING_THRESHOLD)
            .or_else(|| order.into_iter().find(|&p| !self.has_legal_moves(p)))
    }

    /// The winning player once the game is over.
    pub fn winner(&self) -> Option<Player> {
        self.loser().map(Player::opponent)
    }

    // ========== Legality Checks ==========

    fn validate_placement(&self, player: Player, pos: Pos) -> Result<usize, Violation> {
        let idx = pos.index().ok_or(Violation::OutOfRange(pos))?;
        if !self.is_turn(player) {
            return Err(Violation::NotYourTurn(player));
        }
        if !self.has_unplaced(player) {
            return Err(Violation::NoUnplacedPieces(player));
        }
        if self.owner_at(idx).is_some() {
            return Err(Violation::Occupied(pos));
        }
        self.expect_phase(Phase::Move)?;
        Ok(idx)
    }

    fn validate_slide_or_fly(
        &self,
        player: Player,
        to: Pos,
        from: Pos,
    ) -> Result<(usize, usize), Violation> {
        let to_idx = to.index().ok_or(Violation::OutOfRange(to))?;
        let from_idx = from.index().ok_or(Violation::OutOfRange(from))?;
        if !self.is_turn(player) {
            return Err(Violation::NotYourTurn(player));
        }
        if self.has_unplaced(player) {
            return Err(Violation::PlacementUnfinished(player));
        }
        if self.owner_at(to_idx).is_some() {
            return Err(Violation::Occupied(to));
        }
        if self.owner_at(from_idx) != Some(player) {
            return Err(Violation::NotOwnPiece(from));
        }
        if ADJACENT_MASKS[to_idx] & bit(from_idx) == 0 && !self.can_fly(player) {
            return Err(Violation::NotAdjacent { from, to });
        }
        self.expect_phase(Phase::Move)?;
        Ok((to_idx, from_idx))
    }

    fn validate_removal(&self, player: Player, pos: Pos) -> Result<usize, Violation> {
        let idx = pos.index().ok_or(Violation::OutOfRange(pos))?;
        if !self.is_turn(player) {
            return Err(Violation::NotYourTurn(player));
        }
        match self.owner_at(idx) {
            None => return Err(Violation::Vacant(pos)),
            Some(owner) if owner != player.opponent() => {
                return Err(Violation::NotOpponentPiece(pos))
            }
            Some(_) => {}
        }
        self.expect_phase(Phase::Remove)?;
        // No fallback when every opponent piece is in a mill.
        if self.mill_at(idx) {
            return Err(Violation::InMill(pos));
        }
        Ok(idx)
    }

    /// Check a placement, naming the first rule it breaks.
    pub fn check_placement(&self, player: Player, pos: Pos) -> Result<(), Violation> {
        self.validate_placement(player, pos).map(|_| ())
    }

    /// Check if the player may place a piece at the position.
    pub fn is_valid_placement(&self, player: Player, pos: Pos) -> bool {
        self.check_placement(player, pos).is_ok()
    }

    /// Check a slide or fly, naming the first rule it breaks.
    pub fn check_slide_or_fly(&self, player: Player, to: Pos, from: Pos) -> Result<(), Violation> {
        self.validate_slide_or_fly(player, to, from).map(|_| ())
    }

    /// Check if the player may move a piece from `from` to `to`.
    pub fn is_valid_slide_or_fly(&self, player: Player, to: Pos, from: Pos) -> bool {
        self.check_slide_or_fly(player, to, from).is_ok()
    }

    /// Check a removal, naming the first rule it breaks.
    pub fn check_removal(&self, player: Player, pos: Pos) -> Result<(), Violation> {
        self.validate_removal(player, pos).map(|_| ())
    }

    /// Check if the player may remove the opponent piece at the position.
    pub fn is_valid_removal(&self, player: Player, pos: Pos) -> bool {
        self.check_removal(player, pos).is_ok()
    }

    // ========== Mutations ==========

    /// Apply the phase/turn transition after a piece lands on `idx`.
    fn finish_move(&mut self, idx: usize) -> bool {
        let formed = self.mill_at(idx);
        if formed {
            self.phase = Phase::Remove;
        } else {
            self.turn = self.turn.opponent();
        }
        formed
    }

    /// Place a piece from hand. Returns whether it closed a mill.
    pub fn place(&mut self, player: Player, pos: Pos) -> RulesResult<bool> {
        let idx = self.validate_placement(player, pos)?;
        let i = player.index();
        self.unplaced[i] -= 1;
        self.occupied[i] |= bit(idx);
        Ok(self.finish_move(idx))
    }

    /// Slide or fly a piece. Returns whether it closed a mill.
    pub fn slide_or_fly(&mut self, player: Player, to: Pos, from: Pos) -> RulesResult<bool> {
        let (to_idx, from_idx) = self.validate_slide_or_fly(player, to, from)?;
        let i = player.index();
        self.occupied[i] = (self.occupied[i] & !bit(from_idx)) | bit(to_idx);
        Ok(self.finish_move(to_idx))
    }

    /// Remove an opponent piece and hand the turn over.
    pub fn remove_piece(&mut self, player: Player, pos: Pos) -> RulesResult<()> {
        let idx = self.validate_removal(player, pos)?;
        let victim = player.opponent().index();
        self.live[victim] -= 1;
        self.occupied[victim] &= !bit(idx);
        self.phase = Phase::Move;
        self.turn = self.turn.opponent();
        Ok(())
    }

    /// Apply any action. Returns whether it closed a mill (always false for removals).
    pub fn apply(&mut self, player: Player, action: Action) -> RulesResult<bool> {
        match action {
            Action::Place { to } => self.place(player, to),
            Action::Slide { from, to } => self.slide_or_fly(player, to, from),
            Action::Remove { at } => self.remove_piece(player, at).map(|()| false),
        }
    }

    // ========== Action Enumeration ==========

    /// All legal actions for the player to act, in position order.
    pub fn legal_actions(&self) -> Vec<Action> {
        let player = self.turn;
        match self.phase {
            Phase::Remove => Pos::all()
                .filter(|&at| self.is_valid_removal(player, at))
                .map(|at| Action::Remove { at })
                .collect(),
            Phase::Move if self.has_unplaced(player) => Pos::all()
                .filter(|&to| self.is_valid_placement(player, to))
                .map(|to| Action::Place { to })
                .collect(),
            Phase::Move => {
                let mut actions = Vec::with_capacity(32);
                for from in Pos::all() {
                    for to in Pos::all() {
                        if self.is_valid_slide_or_fly(player, to, from) {
                            actions.push(Action::Slide { from, to });
                        }
                    }
                }
                actions
            }
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
