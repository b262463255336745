//! Nine Men's Morris Web API
//!
//! Serves a single game over JSON. The board lives behind one mutex, so every
//! request, read or write, sees a consistent state. There is no history: a
//! reset or state import replaces the board with a new instance.
//!
//! Configuration comes from the environment:
//! - `MILL_API_ADDR`: bind address (default `0.0.0.0:8000`)
//! - `RUST_LOG`: tracing filter (default `info`)

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mill_core::{Action, Board, Phase, Player, Pos, Snapshot};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, PartialEq)]
struct Config {
    addr: SocketAddr,
}

impl Config {
    const ADDR_VAR: &'static str = "MILL_API_ADDR";
    const DEFAULT_ADDR: &'static str = "0.0.0.0:8000";

    fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let raw = lookup(Self::ADDR_VAR).unwrap_or_else(|| Self::DEFAULT_ADDR.to_string());
        let addr = raw
            .parse()
            .map_err(|e| format!("invalid {}={raw:?}: {e}", Self::ADDR_VAR))?;
        Ok(Config { addr })
    }
}

// =============================================================================
// Session State
// =============================================================================

/// The game being served
struct GameSession {
    board: Board,
    /// Whether the last accepted action closed a mill
    last_mill: bool,
}

impl GameSession {
    fn new() -> Self {
        Self::with_board(Board::new())
    }

    fn with_board(board: Board) -> Self {
        Self {
            board,
            last_mill: false,
        }
    }
}

/// Shared application state
struct AppStateInner {
    session: Mutex<GameSession>,
}

impl AppStateInner {
    fn new() -> Self {
        Self {
            session: Mutex::new(GameSession::new()),
        }
    }

    /// Lock the session, recovering the guard if a previous holder panicked.
    fn session(&self) -> MutexGuard<'_, GameSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

type AppState = Arc<AppStateInner>;

// =============================================================================
// JSON Models
// =============================================================================

#[derive(Serialize)]
struct GameStateModel {
    /// Owner per position: 0, 1 or null
    cells: Vec<Option<u8>>,
    turn: u8,
    phase: Phase,
    unplaced: [u8; 2],
    live: [u8; 2],
    placement_stage: bool,
    result: String,
    game_over: bool,
    mill_formed: bool,
    /// Positions currently inside a complete mill
    mills: Vec<Pos>,
}

#[derive(Deserialize)]
struct MoveRequest {
    player: u8,
    to: i32,
    from: Option<i32>,
}

#[derive(Deserialize)]
struct RemoveRequest {
    player: u8,
    at: i32,
}

#[derive(Serialize)]
struct HealthModel {
    status: String,
}

#[derive(Serialize, Debug)]
struct ErrorModel {
    detail: String,
}

type ApiError = (StatusCode, Json<ErrorModel>);

fn bad_request(detail: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorModel {
            detail: detail.into(),
        }),
    )
}

// =============================================================================
// Conversion Functions
// =============================================================================

fn parse_player(player: u8) -> Result<Player, String> {
    Player::from_index(player as usize).ok_or_else(|| format!("Invalid player: {player}"))
}

/// Parse MoveRequest to internal Action
fn request_to_action(req: &MoveRequest) -> Result<(Player, Action), String> {
    let player = parse_player(req.player)?;
    let to = Pos(req.to);
    let action = match req.from {
        Some(from) => Action::Slide {
            from: Pos(from),
            to,
        },
        None => Action::Place { to },
    };
    Ok((player, action))
}

fn result_label(board: &Board) -> &'static str {
    match board.winner() {
        None => "ongoing",
        Some(Player::One) => "player_one_wins",
        Some(Player::Two) => "player_two_wins",
    }
}

/// Convert the session to a JSON-serializable GameStateModel
fn session_to_model(session: &GameSession) -> GameStateModel {
    let board = &session.board;
    let snapshot = board.snapshot();

    GameStateModel {
        cells: snapshot
            .cells
            .iter()
            .map(|cell| cell.map(|p| p.index() as u8))
            .collect(),
        turn: board.turn().index() as u8,
        phase: board.phase(),
        unplaced: snapshot.unplaced,
        live: snapshot.live,
        placement_stage: board.is_placement_phase(),
        result: result_label(board).to_string(),
        game_over: board.is_game_over(),
        mill_formed: session.last_mill,
        mills: Pos::all()
            .filter(|&pos| board.is_mill(pos).unwrap_or(false))
            .collect(),
    }
}

/// Apply an action to the session, logging the outcome
fn apply_action(session: &mut GameSession, player: Player, action: Action) -> Result<(), ApiError> {
    if session.board.is_game_over() {
        return Err(bad_request("Game is already over"));
    }

    match session.board.apply(player, action) {
        Ok(mill) => {
            session.last_mill = mill;
            info!(?player, ?action, mill, "action applied");
            if session.board.is_game_over() {
                info!(winner = ?session.board.winner(), "game over");
            }
            Ok(())
        }
        Err(e) => {
            warn!(?player, ?action, error = %e, "action rejected");
            Err(bad_request(e.to_string()))
        }
    }
}

// =============================================================================
// API Endpoints
// =============================================================================

async fn get_game(State(state): State<AppState>) -> Json<GameStateModel> {
    let session = state.session();
    Json(session_to_model(&session))
}

async fn get_moves(State(state): State<AppState>) -> Json<Vec<Action>> {
    let session = state.session();
    if session.board.is_game_over() {
        return Json(Vec::new());
    }
    Json(session.board.legal_actions())
}

async fn make_move(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<GameStateModel>, ApiError> {
    let (player, action) = request_to_action(&req).map_err(bad_request)?;
    let mut session = state.session();
    apply_action(&mut session, player, action)?;
    Ok(Json(session_to_model(&session)))
}

async fn remove_piece(
    State(state): State<AppState>,
    Json(req): Json<RemoveRequest>,
) -> Result<Json<GameStateModel>, ApiError> {
    let player = parse_player(req.player).map_err(bad_request)?;
    let mut session = state.session();
    apply_action(&mut session, player, Action::Remove { at: Pos(req.at) })?;
    Ok(Json(session_to_model(&session)))
}

async fn reset_game(State(state): State<AppState>) -> Json<GameStateModel> {
    let mut session = state.session();
    *session = GameSession::new();
    info!("game reset");
    Json(session_to_model(&session))
}

async fn export_state(State(state): State<AppState>) -> Json<Snapshot> {
    let session = state.session();
    Json(session.board.snapshot())
}

async fn import_state(
    State(state): State<AppState>,
    Json(snapshot): Json<Snapshot>,
) -> Result<Json<GameStateModel>, ApiError> {
    let board = Board::from_snapshot(snapshot).map_err(|e| {
        warn!(error = %e, "state import rejected");
        bad_request(e.to_string())
    })?;

    let mut session = state.session();
    *session = GameSession::with_board(board);
    info!(turn = ?board.turn(), phase = ?board.phase(), "state imported");
    Ok(Json(session_to_model(&session)))
}

async fn health() -> Json<HealthModel> {
    Json(HealthModel {
        status: "ok".to_string(),
    })
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/game", get(get_game))
        .route("/moves", get(get_moves))
        .route("/move", post(make_move))
        .route("/remove", post(remove_piece))
        .route("/reset", post(reset_game))
        .route("/state/export", get(export_state))
        .route("/state/import", post(import_state))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let state: AppState = Arc::new(AppStateInner::new());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "Mill API listening");
    axum::serve(listener, router(state)).await
}
