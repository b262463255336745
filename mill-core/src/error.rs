//! Error types for the rules engine.
//!
//! Legality failures are reported as a [`Violation`] naming the first rule the
//! action broke, wrapped in [`RulesError::InvalidAction`] by the mutating calls.

use thiserror::Error;

use crate::{Phase, Player, Pos};

/// The rule an attempted action broke.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Violation {
    /// Position is not one of the 24 intersections
    #[error("position {0} is outside 0-23")]
    OutOfRange(Pos),

    /// Player acted out of turn
    #[error("it is not {0:?}'s turn")]
    NotYourTurn(Player),

    /// Player tried to place with no pieces left in hand
    #[error("{0:?} has no pieces left to place")]
    NoUnplacedPieces(Player),

    /// Player tried to move before placing all pieces
    #[error("{0:?} must place all pieces before moving")]
    PlacementUnfinished(Player),

    /// Destination already holds a piece
    #[error("position {0} is occupied")]
    Occupied(Pos),

    /// Removal target holds no piece
    #[error("position {0} is empty")]
    Vacant(Pos),

    /// Moved piece does not belong to the mover
    #[error("position {0} does not hold one of your pieces")]
    NotOwnPiece(Pos),

    /// Removal target does not belong to the opponent
    #[error("position {0} does not hold an opponent piece")]
    NotOpponentPiece(Pos),

    /// Slide between non-neighbours by a player who cannot fly
    #[error("position {from} is not adjacent to {to}")]
    NotAdjacent { from: Pos, to: Pos },

    /// Action belongs to the other phase
    #[error("expected {expected:?} phase, board is in {actual:?} phase")]
    WrongPhase { expected: Phase, actual: Phase },

    /// Removal target is protected by a mill
    #[error("position {0} is part of a mill")]
    InMill(Pos),
}

/// Errors returned by engine operations.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum RulesError {
    /// A mutation was attempted while its legality check fails
    #[error("invalid action: {0}")]
    InvalidAction(#[from] Violation),

    /// A query was given a position outside the board
    #[error("position {0} is outside 0-23")]
    OutOfRange(Pos),

    /// A snapshot does not describe a reachable board
    #[error("inconsistent snapshot: {0}")]
    InconsistentSnapshot(String),
}

/// Result type alias for engine operations.
pub type RulesResult<T> = Result<T, RulesError>;
