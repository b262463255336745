//! WASM bindings for mill-core
//!
//! Provides a JavaScript-friendly API for the game logic. Players are passed
//! as 0 or 1 and positions as plain integers.

use wasm_bindgen::prelude::*;

use crate::{Action, Board, Phase, Player, Pos};

/// WASM-friendly wrapper around Board
#[wasm_bindgen]
pub struct WasmBoard {
    inner: Board,
}

#[wasm_bindgen]
impl WasmBoard {
    /// Create a new empty board
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmBoard {
        WasmBoard { inner: Board::new() }
    }

    /// Player to act (0 or 1)
    pub fn turn(&self) -> u8 {
        self.inner.turn().index() as u8
    }

    /// Current phase: "move" or "remove"
    pub fn phase(&self) -> String {
        match self.inner.phase() {
            Phase::Move => "move".to_string(),
            Phase::Remove => "remove".to_string(),
        }
    }

    /// Cell owners for all 24 positions: -1 empty, 0 or 1 for the owner
    pub fn cells(&self) -> Vec<i8> {
        self.inner
            .snapshot()
            .cells
            .iter()
            .map(|cell| cell.map_or(-1, |p| p.index() as i8))
            .collect()
    }

    /// Pieces the player still has to place
    #[wasm_bindgen(js_name = unplacedCount)]
    pub fn unplaced_count(&self, player: u8) -> u8 {
        to_player(player).map_or(0, |p| self.inner.unplaced_count(p))
    }

    /// Pieces the player still has in the game
    #[wasm_bindgen(js_name = liveCount)]
    pub fn live_count(&self, player: u8) -> u8 {
        to_player(player).map_or(0, |p| self.inner.live_count(p))
    }

    /// Place a piece. Returns undefined if illegal, otherwise whether a mill formed
    pub fn place(&mut self, player: u8, pos: i32) -> Option<bool> {
        let player = to_player(player)?;
        self.inner.place(player, Pos(pos)).ok()
    }

    /// Slide or fly a piece. Returns undefined if illegal, otherwise whether a mill formed
    #[wasm_bindgen(js_name = slideOrFly)]
    pub fn slide_or_fly(&mut self, player: u8, to: i32, from: i32) -> Option<bool> {
        let player = to_player(player)?;
        self.inner.slide_or_fly(player, Pos(to), Pos(from)).ok()
    }

    /// Remove an opponent piece. Returns true if successful
    #[wasm_bindgen(js_name = removePiece)]
    pub fn remove_piece(&mut self, player: u8, pos: i32) -> bool {
        match to_player(player) {
            Some(p) => self.inner.remove_piece(p, Pos(pos)).is_ok(),
            None => false,
        }
    }

    /// Check if the piece at a position is part of a mill
    #[wasm_bindgen(js_name = isMill)]
    pub fn is_mill(&self, pos: i32) -> bool {
        self.inner.is_mill(Pos(pos)).unwrap_or(false)
    }

    /// Get legal actions as JSON array
    /// Each action is { type: "place" | "slide" | "remove", to?, from?, at? }
    #[wasm_bindgen(js_name = legalActions)]
    pub fn legal_actions(&self) -> Result<JsValue, JsValue> {
        let actions: Vec<Action> = self.inner.legal_actions();
        serde_wasm_bindgen::to_value(&actions).map_err(JsValue::from)
    }

    /// Check if game is over
    #[wasm_bindgen(js_name = isGameOver)]
    pub fn is_game_over(&self) -> bool {
        self.inner.is_game_over()
    }

    /// Get game result: "ongoing", "player_one_wins" or "player_two_wins"
    pub fn result(&self) -> String {
        match self.inner.winner() {
            None => "ongoing".to_string(),
            Some(Player::One) => "player_one_wins".to_string(),
            Some(Player::Two) => "player_two_wins".to_string(),
        }
    }

    /// Clone the board
    #[wasm_bindgen(js_name = clone)]
    pub fn clone_board(&self) -> WasmBoard {
        WasmBoard { inner: self.inner }
    }
}

impl Default for WasmBoard {
    fn default() -> Self {
        Self::new()
    }
}

fn to_player(player: u8) -> Option<Player> {
    Player::from_index(player as usize)
}
