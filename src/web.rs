use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::bot::{Bot, CounterplayBot};
use crate::game::{BOARD_SIZE, Board, GameError, GameState, MoveOption, Position, Team};
use crate::movegen::prioritize_captures;
use crate::threat::compute_threats;

const COMPUTER_NAME: &str = "Computer";

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `HOST` and `PORT` when set.
    pub fn from_env() -> Self {
        let defaults = ServerConfig::default();
        ServerConfig {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone)]
pub struct AppState {
    game: Arc<Mutex<WebGame>>,
}

struct WebGame {
    state: GameState,
    human: Team,
    bot: CounterplayBot,
    message: String,
}

impl WebGame {
    fn new(human: Team, seed: Option<u64>) -> Self {
        let bot = match seed {
            Some(seed) => CounterplayBot::with_seed(COMPUTER_NAME.to_string(), seed),
            None => CounterplayBot::new(COMPUTER_NAME.to_string()),
        };
        let mut game = WebGame {
            state: GameState::new(),
            human,
            bot,
            message: "Your turn!".to_string(),
        };
        game.play_computer_turn();
        game
    }

    /// Let the computer move if it is its turn.
    fn play_computer_turn(&mut self) {
        if self.state.is_game_over() || self.state.current_turn() == self.human {
            return;
        }

        let state = self.state.clone();
        self.message = match self.bot.get_move(&state, Duration::from_secs(5)) {
            Some(decision) => match self.state.make_move(decision.from, &decision.option) {
                Ok(()) => {
                    info!(
                        from = %decision.from,
                        to = %decision.option.destination,
                        captures = decision.option.captures.len(),
                        "computer moved"
                    );
                    format!(
                        "Computer played: {} -> {}",
                        decision.from, decision.option.destination
                    )
                }
                Err(e) => format!("Computer failed to move: {}", e),
            },
            None => "Computer has no move".to_string(),
        };
        self.announce_result();
    }

    fn announce_result(&mut self) {
        if let Some(result) = self.state.result() {
            self.message = format!("Game over: {} wins!", result.winner());
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_game(Team::Red, None)
    }

    /// A game where `human` plays against a computer seeded with `seed`.
    pub fn with_game(human: Team, seed: Option<u64>) -> Self {
        AppState {
            game: Arc::new(Mutex::new(WebGame::new(human, seed))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WebGame> {
        self.game.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.into(),
        }
    }
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::GameOver | GameError::NotYourTurn(_) | GameError::IdsExhausted => {
                ApiError::conflict(err.to_string())
            }
            GameError::NoChip(_) => ApiError::not_found(err.to_string()),
            GameError::IllegalMove(_) | GameError::OffBoard(_) => {
                ApiError::bad_request(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.message });
        (self.status, Json(body)).into_response()
    }
}

#[derive(Serialize, Deserialize, Default)]
pub struct NewGameRequest {
    #[serde(default)]
    human_team: Option<String>,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Serialize, Deserialize)]
pub struct MoveRequest {
    from_x: i8,
    from_y: i8,
    to_x: i8,
    to_y: i8,
}

#[derive(Serialize, Deserialize)]
pub struct CellQuery {
    x: i8,
    y: i8,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OptionResponse {
    from: Position,
    to: Position,
    captures: Vec<Position>,
}

impl OptionResponse {
    fn new(from: Position, option: &MoveOption) -> Self {
        OptionResponse {
            from,
            to: option.destination,
            captures: option.captures.iter().map(|capture| capture.at).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GameResponse {
    /// Rows from y = 1 upwards, each listing x = 1..=8.
    board: Vec<Vec<String>>,
    current_turn: Team,
    human_team: Team,
    move_count: usize,
    options: Vec<OptionResponse>,
    game_over: bool,
    winner: Option<Team>,
    message: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ThreatResponse {
    at: Position,
    threats: Vec<Position>,
}

fn cell_to_string(state: &GameState, pos: Position) -> String {
    match state.chip_at(pos) {
        None => ".".to_string(),
        Some(chip) => {
            let label = chip.team.label();
            if chip.promoted {
                label.to_uppercase()
            } else {
                label.to_string()
            }
        }
    }
}

fn string_to_team(s: &str) -> Team {
    match s.to_lowercase().as_str() {
        "blue" => Team::Blue,
        "red" => Team::Red,
        _ => Team::Red,
    }
}

/// Options offered to a player for one chip, captures first.
fn offered_options(state: &GameState, from: Position) -> Vec<MoveOption> {
    prioritize_captures(state.legal_options(from))
}

fn snapshot(game: &WebGame) -> GameResponse {
    let state = &game.state;
    let board: Vec<Vec<String>> = (1..=BOARD_SIZE)
        .map(|y| {
            (1..=BOARD_SIZE)
                .map(|x| cell_to_string(state, Position::new(x, y)))
                .collect::<Vec<_>>()
        })
        .collect();

    let options = if !state.is_game_over() && state.current_turn() == game.human {
        state
            .chips(game.human)
            .into_iter()
            .flat_map(|(from, _)| {
                offered_options(state, from)
                    .into_iter()
                    .map(move |option| OptionResponse::new(from, &option))
            })
            .collect()
    } else {
        Vec::new()
    };

    GameResponse {
        board,
        current_turn: state.current_turn(),
        human_team: game.human,
        move_count: state.move_count(),
        options,
        game_over: state.is_game_over(),
        winner: state.result().map(|result| result.winner()),
        message: game.message.clone(),
    }
}

fn chip_position(state: &GameState, query: &CellQuery) -> Result<Position, ApiError> {
    let pos = Position::new(query.x, query.y);
    if !pos.is_on_board() {
        return Err(GameError::OffBoard(pos).into());
    }
    if state.chip_at(pos).is_none() {
        return Err(GameError::NoChip(pos).into());
    }
    Ok(pos)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn new_game(
    State(app_state): State<AppState>,
    Json(req): Json<NewGameRequest>,
) -> Json<GameResponse> {
    let human = req
        .human_team
        .as_deref()
        .map(string_to_team)
        .unwrap_or(Team::Red);

    let mut game = app_state.lock();
    *game = WebGame::new(human, req.seed);
    info!(human = %human, seed = ?req.seed, "new game");

    Json(snapshot(&game))
}

async fn get_game_state(State(app_state): State<AppState>) -> Json<GameResponse> {
    let game = app_state.lock();
    Json(snapshot(&game))
}

async fn get_options(
    State(app_state): State<AppState>,
    Query(query): Query<CellQuery>,
) -> Result<Json<Vec<OptionResponse>>, ApiError> {
    let game = app_state.lock();
    let from = chip_position(&game.state, &query)?;

    let options = offered_options(&game.state, from)
        .iter()
        .map(|option| OptionResponse::new(from, option))
        .collect();
    Ok(Json(options))
}

async fn get_threats(
    State(app_state): State<AppState>,
    Query(query): Query<CellQuery>,
) -> Result<Json<ThreatResponse>, ApiError> {
    let game = app_state.lock();
    let at = chip_position(&game.state, &query)?;

    Ok(Json(ThreatResponse {
        at,
        threats: compute_threats(&game.state, at),
    }))
}

async fn make_move(
    State(app_state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<GameResponse>, ApiError> {
    let mut game = app_state.lock();

    if game.state.is_game_over() {
        return Err(GameError::GameOver.into());
    }
    if game.state.current_turn() != game.human {
        return Err(GameError::NotYourTurn(game.state.current_turn()).into());
    }

    let from = chip_position(
        &game.state,
        &CellQuery {
            x: req.from_x,
            y: req.from_y,
        },
    )?;
    let to = Position::new(req.to_x, req.to_y);

    let option = offered_options(&game.state, from)
        .into_iter()
        .find(|option| option.destination == to)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid move: {} -> {}", from, to)))?;

    game.state.make_move(from, &option)?;
    info!(from = %from, to = %to, captures = option.captures.len(), "human moved");

    game.message = "Your turn!".to_string();
    game.play_computer_turn();
    game.announce_result();

    Ok(Json(snapshot(&game)))
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/new-game", post(new_game))
        .route("/api/game-state", get(get_game_state))
        .route("/api/options", get(get_options))
        .route("/api/threats", get(get_threats))
        .route("/api/move", post(make_move))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(
    config: ServerConfig,
    seed: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(AppState::with_game(Team::Red, seed));

    let address = config.address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Web server running at http://{}", address);

    axum::serve(listener, app).await?;
    Ok(())
}
