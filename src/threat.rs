use crate::game::{Board, Chip, ChipId, Position, Team};
use crate::movegen::options_for;

/// A read-only view of a board with hypothetical chips layered on top.
///
/// The underlying board is only borrowed, so nothing placed on a probe can
/// leak into committed state; dropping the probe discards every placement.
pub struct Probe<'a, B: Board + ?Sized> {
    base: &'a B,
    placements: Vec<(Position, Chip)>,
}

impl<'a, B: Board + ?Sized> Probe<'a, B> {
    pub fn new(base: &'a B) -> Self {
        Probe {
            base,
            placements: Vec::new(),
        }
    }

    /// Place a hypothetical unpromoted chip of `team` on `at`.
    pub fn place(&mut self, at: Position, team: Team) -> Chip {
        let chip = Chip::new(ChipId::Placeholder(self.placements.len()), team);
        self.placements.push((at, chip));
        chip
    }

    pub fn is_placeholder(&self, id: ChipId) -> bool {
        self.placements.iter().any(|(_, chip)| chip.id == id)
    }
}

impl<B: Board + ?Sized> Board for Probe<'_, B> {
    fn chip_at(&self, pos: Position) -> Option<Chip> {
        self.placements
            .iter()
            .rev()
            .find(|(at, _)| *at == pos)
            .map(|(_, chip)| *chip)
            .or_else(|| self.base.chip_at(pos))
    }

    fn chips(&self, team: Team) -> Vec<(Position, Chip)> {
        let mut chips = self.base.chips(team);
        chips.extend(
            self.placements
                .iter()
                .filter(|(_, chip)| chip.team == team)
                .copied(),
        );
        chips
    }
}

/// Destinations of the chip on `at` where the opponent could capture it on
/// the very next move.
///
/// Every destination is occupied at once by a hypothetical chip while the
/// real chip stays on its square, then each enemy chip's moves are generated
/// against that view. Returns an empty list for an empty square.
pub fn compute_threats<B: Board + ?Sized>(board: &B, at: Position) -> Vec<Position> {
    let Some(chip) = board.chip_at(at) else {
        return Vec::new();
    };

    let mut probe = Probe::new(board);
    for option in options_for(board, at, chip) {
        probe.place(option.destination, chip.team);
    }

    let mut threats = Vec::new();
    for (enemy_at, enemy) in board.chips(chip.team.opponent()) {
        for option in options_for(&probe, enemy_at, enemy) {
            for capture in &option.captures {
                if probe.is_placeholder(capture.chip.id) && !threats.contains(&capture.at) {
                    threats.push(capture.at);
                }
            }
        }
    }

    threats
}
