use crate::bot::{Bot, Decision};
use crate::game::{GameResult, GameState, Team};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct MatchConfig {
    pub time_per_move: Duration,
    pub max_moves: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            time_per_move: Duration::from_secs(5),
            max_moves: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    BlueWins { winner_name: String, moves: usize },
    RedWins { winner_name: String, moves: usize },
    Draw { moves: usize },
    Timeout { violator: String, winner: String },
    IllegalMove { violator: String, winner: String },
}

impl MatchResult {
    pub fn winner(&self) -> Option<&str> {
        match self {
            MatchResult::BlueWins { winner_name, .. } => Some(winner_name),
            MatchResult::RedWins { winner_name, .. } => Some(winner_name),
            MatchResult::Timeout { winner, .. } => Some(winner),
            MatchResult::IllegalMove { winner, .. } => Some(winner),
            MatchResult::Draw { .. } => None,
        }
    }
}

/// Plays two bots against each other on one board.
pub struct Match {
    config: MatchConfig,
    state: GameState,
    blue_bot: Box<dyn Bot>,
    red_bot: Box<dyn Bot>,
}

impl Match {
    pub fn new(blue_bot: Box<dyn Bot>, red_bot: Box<dyn Bot>, config: MatchConfig) -> Self {
        Self::from_state(blue_bot, red_bot, config, GameState::new())
    }

    /// Start from an arbitrary position instead of the opening.
    pub fn from_state(
        blue_bot: Box<dyn Bot>,
        red_bot: Box<dyn Bot>,
        config: MatchConfig,
        state: GameState,
    ) -> Self {
        Match {
            config,
            state,
            blue_bot,
            red_bot,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn play(&mut self) -> MatchResult {
        self.blue_bot.game_start(Team::Blue);
        self.red_bot.game_start(Team::Red);

        info!(
            blue = self.blue_bot.name(),
            red = self.red_bot.name(),
            "match starting"
        );
        debug!("initial board:\n{}", self.state.display_board());

        while !self.state.is_game_over() && self.state.move_count() < self.config.max_moves {
            let team = self.state.current_turn();
            if let Some(result) = self.play_turn(team) {
                self.end_game();
                return result;
            }
        }

        self.end_game();
        let moves = self.state.move_count();

        match self.state.result() {
            Some(GameResult::BlueWins) => {
                info!(winner = self.blue_bot.name(), moves, "blue wins");
                MatchResult::BlueWins {
                    winner_name: self.blue_bot.name().to_string(),
                    moves,
                }
            }
            Some(GameResult::RedWins) => {
                info!(winner = self.red_bot.name(), moves, "red wins");
                MatchResult::RedWins {
                    winner_name: self.red_bot.name().to_string(),
                    moves,
                }
            }
            None => {
                info!(max_moves = self.config.max_moves, "move limit reached, draw");
                MatchResult::Draw { moves }
            }
        }
    }

    fn end_game(&mut self) {
        self.blue_bot.game_end();
        self.red_bot.game_end();
    }

    fn bot(&mut self, team: Team) -> &mut Box<dyn Bot> {
        match team {
            Team::Blue => &mut self.blue_bot,
            Team::Red => &mut self.red_bot,
        }
    }

    fn names(&self, team: Team) -> (String, String) {
        let (mover, other) = match team {
            Team::Blue => (&self.blue_bot, &self.red_bot),
            Team::Red => (&self.red_bot, &self.blue_bot),
        };
        (mover.name().to_string(), other.name().to_string())
    }

    fn play_turn(&mut self, team: Team) -> Option<MatchResult> {
        let move_number = self.state.move_count() + 1;
        let time_limit = self.config.time_per_move;
        let state = self.state.clone();

        let start = Instant::now();
        let decision = self.bot(team).get_move(&state, time_limit);
        let elapsed = start.elapsed();

        self.handle_decision(team, decision, elapsed, move_number)
    }

    fn handle_decision(
        &mut self,
        team: Team,
        decision: Option<Decision>,
        elapsed: Duration,
        move_number: usize,
    ) -> Option<MatchResult> {
        let (violator, winner) = self.names(team);

        if elapsed > self.config.time_per_move {
            warn!(
                bot = %violator,
                ?elapsed,
                limit = ?self.config.time_per_move,
                "timeout"
            );
            return Some(MatchResult::Timeout { violator, winner });
        }

        // A side with nothing to play has lost
        let Some(decision) = decision else {
            info!(bot = %violator, "no move available");
            let moves = self.state.move_count();
            return Some(match team {
                Team::Blue => MatchResult::RedWins {
                    winner_name: winner,
                    moves,
                },
                Team::Red => MatchResult::BlueWins {
                    winner_name: winner,
                    moves,
                },
            });
        };

        debug!(
            move_number,
            bot = %violator,
            from = %decision.from,
            to = %decision.option.destination,
            captures = decision.option.captures.len(),
            ?elapsed,
            "move"
        );

        if let Err(e) = self.state.make_move(decision.from, &decision.option) {
            warn!(bot = %violator, error = %e, "illegal move");
            return Some(MatchResult::IllegalMove { violator, winner });
        }

        self.blue_bot.notify_move(&decision);
        self.red_bot.notify_move(&decision);
        debug!("\n{}", self.state.display_board());

        None
    }
}
