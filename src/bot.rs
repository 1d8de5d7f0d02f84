use crate::game::{Board, Chip, ChipId, GameState, MoveOption, Position, Team};
use crate::movegen::{options_for, prioritize_captures};
use crate::threat::compute_threats;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// A chip together with the option chosen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub from: Position,
    pub chip: Chip,
    pub option: MoveOption,
}

fn decisions_for<B: Board + ?Sized>(board: &B, team: Team) -> Vec<Decision> {
    board
        .chips(team)
        .into_iter()
        .flat_map(|(from, chip)| {
            options_for(board, from, chip)
                .into_iter()
                .map(move |option| Decision { from, chip, option })
        })
        .collect()
}

/// Pick a move for `team`, or `None` when it has no move at all.
///
/// Candidates are tried in tiers: captures by chips that are not currently
/// threatened, plain moves by such chips, any capture, any move. The pick
/// within the first non-empty tier is uniform over `rng`.
///
/// Safety is judged on the chip where it stands (through [`compute_threats`]),
/// not on the square it would move to.
pub fn decide_move<B, R>(board: &B, team: Team, rng: &mut R) -> Option<Decision>
where
    B: Board + ?Sized,
    R: Rng,
{
    let (kills, moves): (Vec<Decision>, Vec<Decision>) = decisions_for(board, team)
        .into_iter()
        .partition(|decision| decision.option.is_capture());

    let safe_chips: HashSet<ChipId> = board
        .chips(team)
        .into_iter()
        .filter(|(at, _)| compute_threats(board, *at).is_empty())
        .map(|(_, chip)| chip.id)
        .collect();

    let safe = |decisions: &[Decision]| -> Vec<Decision> {
        decisions
            .iter()
            .filter(|decision| safe_chips.contains(&decision.chip.id))
            .cloned()
            .collect()
    };
    let safe_kills = safe(&kills);
    let safe_moves = safe(&moves);

    debug!(
        team = %team,
        kills = kills.len(),
        moves = moves.len(),
        safe_kills = safe_kills.len(),
        safe_moves = safe_moves.len(),
        "candidate moves"
    );

    let choices = [safe_kills, safe_moves, kills, moves]
        .into_iter()
        .find(|tier| !tier.is_empty())?;

    let index = rng.gen_range(0..=choices.len() - 1);
    choices.into_iter().nth(index)
}

/// Trait that all bots must implement
pub trait Bot: Send {
    /// Get the name of the bot
    fn name(&self) -> &str;

    /// Get the next move for the side to play in `state`
    /// The bot has a time limit to respond
    fn get_move(&mut self, state: &GameState, time_limit: Duration) -> Option<Decision>;

    /// Notified when the game starts
    fn game_start(&mut self, _team: Team) {}

    /// Notified when a move is made (by either side)
    fn notify_move(&mut self, _decision: &Decision) {}

    /// Notified when the game ends
    fn game_end(&mut self) {}
}

/// The safety-first heuristic player built on [`decide_move`].
pub struct CounterplayBot {
    name: String,
    rng: StdRng,
}

impl CounterplayBot {
    pub fn new(name: String) -> Self {
        CounterplayBot {
            name,
            rng: StdRng::from_entropy(),
        }
    }

    /// Same bot, but every pick is reproducible.
    pub fn with_seed(name: String, seed: u64) -> Self {
        CounterplayBot {
            name,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Bot for CounterplayBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_move(&mut self, state: &GameState, _time_limit: Duration) -> Option<Decision> {
        decide_move(state, state.current_turn(), &mut self.rng)
    }
}

/// Plays any option at random, respecting capture priority per chip.
pub struct RandomBot {
    name: String,
    rng: StdRng,
}

impl RandomBot {
    pub fn new(name: String) -> Self {
        RandomBot {
            name,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(name: String, seed: u64) -> Self {
        RandomBot {
            name,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Bot for RandomBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_move(&mut self, state: &GameState, _time_limit: Duration) -> Option<Decision> {
        let decisions: Vec<Decision> = state
            .chips(state.current_turn())
            .into_iter()
            .flat_map(|(from, chip)| {
                prioritize_captures(options_for(state, from, chip))
                    .into_iter()
                    .map(move |option| Decision { from, chip, option })
            })
            .collect();

        if decisions.is_empty() {
            None
        } else {
            let index = self.rng.gen_range(0..decisions.len());
            decisions.into_iter().nth(index)
        }
    }
}
