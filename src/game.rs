use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use thiserror::Error;

use crate::movegen;

/// Board size constant (the board is always square)
pub const BOARD_SIZE: i8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Blue,
    Red,
}

impl Team {
    pub const ALL: [Team; 2] = [Team::Blue, Team::Red];

    pub fn opponent(&self) -> Team {
        match self {
            Team::Blue => Team::Red,
            Team::Red => Team::Blue,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Team::Blue => "blue",
            Team::Red => "red",
        }
    }

    /// Row on which chips of the *opposing* team promote.
    pub fn home_row(&self) -> i8 {
        match self {
            Team::Blue => 1,
            Team::Red => BOARD_SIZE,
        }
    }

    pub fn starting_rows(&self) -> RangeInclusive<i8> {
        match self {
            Team::Blue => 1..=3,
            Team::Red => 6..=BOARD_SIZE,
        }
    }

    /// Row step of an unpromoted chip.
    pub fn forward(&self) -> i8 {
        match self {
            Team::Blue => 1,
            Team::Red => -1,
        }
    }

    pub fn promotion_row(&self) -> i8 {
        self.opponent().home_row()
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A square on the board, 1-indexed: `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i8,
    pub y: i8,
}

impl Position {
    pub fn new(x: i8, y: i8) -> Self {
        Position { x, y }
    }

    pub fn is_on_board(&self) -> bool {
        (1..=BOARD_SIZE).contains(&self.x) && (1..=BOARD_SIZE).contains(&self.y)
    }

    /// Playable squares. Chips never leave them since every move is diagonal.
    pub fn is_dark(&self) -> bool {
        (self.x + self.y) % 2 == 0
    }

    /// The neighbouring position `(dx, dy)` away, or `None` when it falls off the board.
    pub fn offset(&self, dx: i8, dy: i8) -> Option<Position> {
        let next = Position::new(self.x + dx, self.y + dy);
        next.is_on_board().then_some(next)
    }

    fn index(&self) -> (usize, usize) {
        ((self.y - 1) as usize, (self.x - 1) as usize)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Identity of a chip. Ids a game hands out and ids of hypothetical chips
/// live in separate variants, so the two can never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChipId {
    Real(u16),
    /// Index of a hypothetical chip on a [`crate::threat::Probe`].
    Placeholder(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chip {
    pub id: ChipId,
    pub team: Team,
    pub promoted: bool,
}

impl Chip {
    pub fn new(id: ChipId, team: Team) -> Self {
        Chip {
            id,
            team,
            promoted: false,
        }
    }
}

/// A chip jumped over by a move, with the square it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub chip: Chip,
    pub at: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOption {
    pub destination: Position,
    /// Captured chips in jump order; empty for a plain move.
    pub captures: Vec<Capture>,
}

impl MoveOption {
    pub fn plain(destination: Position) -> Self {
        MoveOption {
            destination,
            captures: Vec::new(),
        }
    }

    pub fn is_capture(&self) -> bool {
        !self.captures.is_empty()
    }
}

impl fmt::Display for MoveOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.destination)?;
        if self.is_capture() {
            write!(f, " x{}", self.captures.len())?;
        }
        Ok(())
    }
}

/// Read access to board occupancy. Move generation and threat analysis only
/// ever see a board through this trait.
pub trait Board {
    fn chip_at(&self, pos: Position) -> Option<Chip>;

    /// Every chip of `team` with its square, in row-major order.
    fn chips(&self, team: Team) -> Vec<(Position, Chip)>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid move: {0}")]
    IllegalMove(String),
    #[error("Game already over")]
    GameOver,
    #[error("Not your turn: {0} is to move")]
    NotYourTurn(Team),
    #[error("No chip at {0}")]
    NoChip(Position),
    #[error("Position {0} is off the board")]
    OffBoard(Position),
    #[error("No chip ids left to assign")]
    IdsExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    BlueWins,
    RedWins,
}

impl GameResult {
    pub fn won_by(team: Team) -> Self {
        match team {
            Team::Blue => GameResult::BlueWins,
            Team::Red => GameResult::RedWins,
        }
    }

    pub fn winner(&self) -> Team {
        match self {
            GameResult::BlueWins => Team::Blue,
            GameResult::RedWins => Team::Red,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    cells: [[Option<Chip>; BOARD_SIZE as usize]; BOARD_SIZE as usize],
    current_turn: Team,
    move_count: usize,
    next_id: u16,
    result: Option<GameResult>,
}

impl GameState {
    /// Standard opening: twelve chips a side on the dark squares, Blue to move.
    pub fn new() -> Self {
        let mut state = GameState::empty(Team::Blue);

        for y in 1..=BOARD_SIZE {
            for x in 1..=BOARD_SIZE {
                let pos = Position::new(x, y);
                if !pos.is_dark() {
                    continue;
                }
                if let Some(team) = Team::ALL
                    .into_iter()
                    .find(|team| team.starting_rows().contains(&y))
                {
                    let chip = Chip::new(ChipId::Real(state.next_id), team);
                    state.next_id += 1;
                    state.set(pos, Some(chip));
                }
            }
        }

        state
    }

    /// A board with no chips. Used to build positions by hand.
    pub fn empty(turn: Team) -> Self {
        GameState {
            cells: [[None; BOARD_SIZE as usize]; BOARD_SIZE as usize],
            current_turn: turn,
            move_count: 0,
            next_id: 0,
            result: None,
        }
    }

    pub fn current_turn(&self) -> Team {
        self.current_turn
    }

    pub fn set_turn(&mut self, team: Team) {
        self.current_turn = team;
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    pub fn is_game_over(&self) -> bool {
        self.result.is_some()
    }

    pub fn move_count(&self) -> usize {
        self.move_count
    }

    /// Put a new chip of `team` on an empty square.
    pub fn place(&mut self, pos: Position, team: Team, promoted: bool) -> Result<Chip, GameError> {
        if !pos.is_on_board() {
            return Err(GameError::OffBoard(pos));
        }
        if self.chip_at(pos).is_some() {
            return Err(GameError::IllegalMove(format!("{} is already occupied", pos)));
        }

        let mut chip = self.fresh_chip(team)?;
        chip.promoted = promoted;
        self.set(pos, Some(chip));
        Ok(chip)
    }

    pub fn remove(&mut self, pos: Position) -> Option<Chip> {
        if !pos.is_on_board() {
            return None;
        }
        let (row, col) = pos.index();
        self.cells[row][col].take()
    }

    /// Options of the chip on `from`, before capture priority is applied.
    pub fn legal_options(&self, from: Position) -> Vec<MoveOption> {
        match self.chip_at(from) {
            Some(chip) => movegen::options_for(self, from, chip),
            None => Vec::new(),
        }
    }

    /// Every option of every chip of `team`.
    pub fn all_options(&self, team: Team) -> Vec<(Position, MoveOption)> {
        self.chips(team)
            .into_iter()
            .flat_map(|(pos, chip)| {
                movegen::options_for(self, pos, chip)
                    .into_iter()
                    .map(move |option| (pos, option))
            })
            .collect()
    }

    /// Commit a move for the side to play and update the game state
    pub fn make_move(&mut self, from: Position, option: &MoveOption) -> Result<(), GameError> {
        if self.is_game_over() {
            return Err(GameError::GameOver);
        }
        if !from.is_on_board() {
            return Err(GameError::OffBoard(from));
        }

        let chip = self.chip_at(from).ok_or(GameError::NoChip(from))?;
        if chip.team != self.current_turn {
            return Err(GameError::NotYourTurn(self.current_turn));
        }
        if !self.legal_options(from).contains(option) {
            return Err(GameError::IllegalMove(format!(
                "{} -> {} is not legal",
                from, option.destination
            )));
        }

        self.set(from, None);
        for capture in &option.captures {
            self.set(capture.at, None);
        }

        let mut moved = chip;
        if option.destination.y == chip.team.promotion_row() {
            moved.promoted = true;
        }
        self.set(option.destination, Some(moved));

        self.current_turn = self.current_turn.opponent();
        self.move_count += 1;
        self.check_game_end();

        Ok(())
    }

    fn check_game_end(&mut self) {
        for team in Team::ALL {
            if self.chips(team).is_empty() {
                self.result = Some(GameResult::won_by(team.opponent()));
                return;
            }
        }

        // Side to move is stuck
        if self.all_options(self.current_turn).is_empty() {
            self.result = Some(GameResult::won_by(self.current_turn.opponent()));
        }
    }

    fn fresh_chip(&mut self, team: Team) -> Result<Chip, GameError> {
        let chip = Chip::new(ChipId::Real(self.next_id), team);
        self.next_id = self.next_id.checked_add(1).ok_or(GameError::IdsExhausted)?;
        Ok(chip)
    }

    fn set(&mut self, pos: Position, chip: Option<Chip>) {
        let (row, col) = pos.index();
        self.cells[row][col] = chip;
    }

    /// Display the board as a string, row 8 on top
    pub fn display_board(&self) -> String {
        let mut output = String::new();

        output.push_str("  ");
        for x in 1..=BOARD_SIZE {
            output.push_str(&format!(" {}", x));
        }
        output.push('\n');

        for y in (1..=BOARD_SIZE).rev() {
            output.push_str(&format!("{} ", y));
            for x in 1..=BOARD_SIZE {
                let pos = Position::new(x, y);
                let symbol = match self.chip_at(pos) {
                    Some(chip) => match (chip.team, chip.promoted) {
                        (Team::Blue, false) => 'b',
                        (Team::Blue, true) => 'B',
                        (Team::Red, false) => 'r',
                        (Team::Red, true) => 'R',
                    },
                    None if pos.is_dark() => '.',
                    None => ' ',
                };
                output.push(' ');
                output.push(symbol);
            }
            output.push('\n');
        }

        output
    }
}

impl Board for GameState {
    fn chip_at(&self, pos: Position) -> Option<Chip> {
        if !pos.is_on_board() {
            return None;
        }
        let (row, col) = pos.index();
        self.cells[row][col]
    }

    fn chips(&self, team: Team) -> Vec<(Position, Chip)> {
        let mut chips = Vec::new();
        for y in 1..=BOARD_SIZE {
            for x in 1..=BOARD_SIZE {
                let pos = Position::new(x, y);
                if let Some(chip) = self.chip_at(pos).filter(|chip| chip.team == team) {
                    chips.push((pos, chip));
                }
            }
        }
        chips
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: i8, y: i8) -> Position {
        Position::new(x, y)
    }

    fn capture_of(state: &GameState, at: Position) -> Capture {
        Capture {
            chip: state.chip_at(at).unwrap(),
            at,
        }
    }

    #[test]
    fn test_initial_setup() {
        let game = GameState::new();

        assert_eq!(game.current_turn(), Team::Blue);
        assert_eq!(game.move_count(), 0);
        assert!(!game.is_game_over());

        for team in Team::ALL {
            let chips = game.chips(team);
            assert_eq!(chips.len(), 12);
            for (at, chip) in chips {
                assert!(at.is_dark());
                assert!(team.starting_rows().contains(&at.y));
                assert!(!chip.promoted);
            }
        }

        assert_eq!(game.chip_at(pos(1, 1)).map(|c| c.team), Some(Team::Blue));
        assert_eq!(game.chip_at(pos(2, 1)), None);
        assert_eq!(game.chip_at(pos(8, 8)).map(|c| c.team), Some(Team::Red));
        assert_eq!(game.chip_at(pos(1, 4)), None);
    }

    #[test]
    fn test_chip_ids_are_unique() {
        let game = GameState::new();
        let mut ids: Vec<ChipId> = Team::ALL
            .into_iter()
            .flat_map(|team| game.chips(team))
            .map(|(_, chip)| chip.id)
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 24);
    }

    #[test]
    fn test_off_board_lookup_is_empty() {
        let game = GameState::new();
        assert_eq!(game.chip_at(pos(0, 1)), None);
        assert_eq!(game.chip_at(pos(9, 9)), None);
        assert_eq!(pos(8, 8).offset(1, 1), None);
        assert_eq!(pos(1, 1).offset(1, 1), Some(pos(2, 2)));
    }

    #[test]
    fn test_team_constants() {
        assert_eq!(Team::Blue.home_row(), 1);
        assert_eq!(Team::Red.home_row(), 8);
        assert_eq!(Team::Blue.promotion_row(), 8);
        assert_eq!(Team::Red.promotion_row(), 1);
        assert_eq!(Team::Blue.opponent(), Team::Red);
        assert_eq!(Team::Red.to_string(), "red");
    }

    #[test]
    fn test_place_fails_when_ids_run_out() {
        let mut game = GameState::empty(Team::Blue);
        game.next_id = u16::MAX - 1;

        let last = game.place(pos(1, 1), Team::Blue, false).unwrap();
        assert_eq!(last.id, ChipId::Real(u16::MAX - 1));
        assert_eq!(game.place(pos(3, 1), Team::Blue, false), Err(GameError::IdsExhausted));
        assert_eq!(game.chip_at(pos(3, 1)), None);
        assert_eq!(game.chips(Team::Blue).len(), 1);
    }

    #[test]
    fn test_place_rejects_occupied_and_off_board() {
        let mut game = GameState::empty(Team::Blue);
        game.place(pos(3, 3), Team::Blue, false).unwrap();

        assert!(matches!(
            game.place(pos(3, 3), Team::Red, false),
            Err(GameError::IllegalMove(_))
        ));
        assert_eq!(
            game.place(pos(0, 3), Team::Red, false),
            Err(GameError::OffBoard(pos(0, 3)))
        );
    }

    #[test]
    fn test_make_move_plain() {
        let mut game = GameState::empty(Team::Blue);
        game.place(pos(3, 3), Team::Blue, false).unwrap();
        game.place(pos(8, 8), Team::Red, false).unwrap();

        game.make_move(pos(3, 3), &MoveOption::plain(pos(4, 4))).unwrap();

        assert_eq!(game.chip_at(pos(3, 3)), None);
        assert_eq!(game.chip_at(pos(4, 4)).map(|c| c.team), Some(Team::Blue));
        assert_eq!(game.current_turn(), Team::Red);
        assert_eq!(game.move_count(), 1);
    }

    #[test]
    fn test_make_move_removes_captured_chips() {
        let mut game = GameState::empty(Team::Blue);
        game.place(pos(1, 1), Team::Blue, false).unwrap();
        game.place(pos(2, 2), Team::Red, false).unwrap();
        game.place(pos(4, 4), Team::Red, false).unwrap();
        game.place(pos(7, 7), Team::Red, false).unwrap();

        let option = MoveOption {
            destination: pos(5, 5),
            captures: vec![capture_of(&game, pos(2, 2)), capture_of(&game, pos(4, 4))],
        };
        game.make_move(pos(1, 1), &option).unwrap();

        assert_eq!(game.chip_at(pos(2, 2)), None);
        assert_eq!(game.chip_at(pos(4, 4)), None);
        assert_eq!(game.chips(Team::Red).len(), 1);
        assert_eq!(game.chip_at(pos(5, 5)).map(|c| c.team), Some(Team::Blue));
    }

    #[test]
    fn test_promotion_on_opposing_home_row() {
        let mut game = GameState::empty(Team::Red);
        game.place(pos(2, 2), Team::Red, false).unwrap();
        game.place(pos(7, 5), Team::Blue, false).unwrap();

        game.make_move(pos(2, 2), &MoveOption::plain(pos(1, 1))).unwrap();

        assert!(game.chip_at(pos(1, 1)).unwrap().promoted);
        assert!(game.display_board().contains('R'));
    }

    #[test]
    fn test_promoted_flag_survives_moves() {
        let mut game = GameState::empty(Team::Blue);
        game.place(pos(4, 4), Team::Blue, true).unwrap();
        game.place(pos(8, 8), Team::Red, false).unwrap();

        game.make_move(pos(4, 4), &MoveOption::plain(pos(2, 2))).unwrap();

        assert!(game.chip_at(pos(2, 2)).unwrap().promoted);
    }

    #[test]
    fn test_wrong_turn_rejected() {
        let mut game = GameState::new();
        let result = game.make_move(pos(2, 6), &MoveOption::plain(pos(1, 5)));
        assert_eq!(result, Err(GameError::NotYourTurn(Team::Blue)));
    }

    #[test]
    fn test_illegal_destination_rejected() {
        let mut game = GameState::new();
        let result = game.make_move(pos(3, 3), &MoveOption::plain(pos(3, 4)));
        assert!(matches!(result, Err(GameError::IllegalMove(_))));

        let result = game.make_move(pos(4, 4), &MoveOption::plain(pos(5, 5)));
        assert_eq!(result, Err(GameError::NoChip(pos(4, 4))));
        assert_eq!(game.move_count(), 0);
    }

    #[test]
    fn test_fabricated_capture_rejected() {
        let mut game = GameState::empty(Team::Blue);
        game.place(pos(3, 3), Team::Blue, false).unwrap();
        game.place(pos(7, 7), Team::Red, false).unwrap();

        let option = MoveOption {
            destination: pos(4, 4),
            captures: vec![capture_of(&game, pos(7, 7))],
        };
        assert!(matches!(
            game.make_move(pos(3, 3), &option),
            Err(GameError::IllegalMove(_))
        ));
        assert!(game.chip_at(pos(7, 7)).is_some());
    }

    #[test]
    fn test_win_by_elimination() {
        let mut game = GameState::empty(Team::Blue);
        game.place(pos(3, 3), Team::Blue, false).unwrap();
        game.place(pos(4, 4), Team::Red, false).unwrap();

        let option = MoveOption {
            destination: pos(5, 5),
            captures: vec![capture_of(&game, pos(4, 4))],
        };
        game.make_move(pos(3, 3), &option).unwrap();

        assert_eq!(game.result(), Some(GameResult::BlueWins));
        assert_eq!(
            game.make_move(pos(5, 5), &MoveOption::plain(pos(6, 6))),
            Err(GameError::GameOver)
        );
    }

    #[test]
    fn test_loss_when_side_to_move_is_stuck() {
        let mut game = GameState::empty(Team::Blue);
        // Red man at (1,2) is blocked by a blue chip it cannot jump
        game.place(pos(1, 2), Team::Red, false).unwrap();
        game.place(pos(2, 1), Team::Blue, false).unwrap();
        game.place(pos(6, 4), Team::Blue, false).unwrap();

        game.make_move(pos(6, 4), &MoveOption::plain(pos(7, 5))).unwrap();

        assert_eq!(game.result(), Some(GameResult::BlueWins));
        assert_eq!(game.result().map(|r| r.winner()), Some(Team::Blue));
    }

    #[test]
    fn test_all_options_covers_every_chip() {
        let game = GameState::new();
        let options = game.all_options(Team::Blue);

        // Only the front row can move at the start
        assert_eq!(options.len(), 7);
        assert!(options.iter().all(|(from, _)| from.y == 3));
        assert!(options.iter().all(|(_, option)| !option.is_capture()));
    }

    #[test]
    fn test_display_board() {
        let game = GameState::new();
        let board = game.display_board();
        let lines: Vec<&str> = board.lines().collect();

        assert_eq!(lines.len(), 9);
        assert!(lines[1].starts_with("8 "));
        assert!(lines[8].starts_with("1 "));
        assert_eq!(board.matches('b').count(), 12);
        assert_eq!(board.matches('r').count(), 12);
    }

    #[test]
    fn test_state_serializes() {
        let game = GameState::new();
        let json = serde_json::to_string(&game).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(game, back);
    }
}
