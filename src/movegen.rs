use crate::game::{Board, Capture, Chip, MoveOption, Position, Team};

/// Column steps tried by an unpromoted chip, in search order.
const SIDEWAYS: [i8; 2] = [1, -1];

/// Diagonals walked by a promoted chip, in search order.
const DIAGONALS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Options for `chip` standing on `from`, dispatching on its promoted flag.
pub fn options_for<B: Board + ?Sized>(board: &B, from: Position, chip: Chip) -> Vec<MoveOption> {
    if chip.promoted {
        generate_promoted_moves(board, from, chip.team)
    } else {
        generate_moves(board, from, chip.team)
    }
}

/// Moves of an unpromoted chip: one forward diagonal step, or a jump over an
/// enemy chip extended into the longest capture chain available.
pub fn generate_moves<B: Board + ?Sized>(board: &B, from: Position, team: Team) -> Vec<MoveOption> {
    let mut options = Vec::new();
    let dy = team.forward();

    for &dx in &SIDEWAYS {
        let Some(next) = from.offset(dx, dy) else {
            continue;
        };

        match board.chip_at(next) {
            None => options.push(MoveOption::plain(next)),
            Some(chip) if chip.team == team => {}
            Some(chip) => {
                if let Some(landing) = landing_beyond(board, next, dx, dy) {
                    let first = Capture { chip, at: next };
                    options.push(longest_chain(board, team, landing, first));
                }
            }
        }
    }

    options
}

/// Moves of a promoted chip: unbounded walks along all four diagonals. Every
/// empty square past a single enemy chip is a landing that captures it.
pub fn generate_promoted_moves<B: Board + ?Sized>(
    board: &B,
    from: Position,
    team: Team,
) -> Vec<MoveOption> {
    let mut options = Vec::new();

    for &(dx, dy) in &DIAGONALS {
        let mut jumped: Option<Capture> = None;
        let mut cursor = from;

        while let Some(next) = cursor.offset(dx, dy) {
            cursor = next;
            match board.chip_at(next) {
                None => options.push(MoveOption {
                    destination: next,
                    captures: jumped.into_iter().collect(),
                }),
                Some(chip) if chip.team == team => break,
                Some(chip) => {
                    // Only one enemy chip can be taken per direction
                    if jumped.is_some() {
                        break;
                    }
                    jumped = Some(Capture { chip, at: next });
                }
            }
        }
    }

    options
}

/// Keep only capturing options when there is at least one.
pub fn prioritize_captures(options: Vec<MoveOption>) -> Vec<MoveOption> {
    if options.iter().any(MoveOption::is_capture) {
        options.into_iter().filter(MoveOption::is_capture).collect()
    } else {
        options
    }
}

fn landing_beyond<B: Board + ?Sized>(board: &B, over: Position, dx: i8, dy: i8) -> Option<Position> {
    let landing = over.offset(dx, dy)?;
    board.chip_at(landing).is_none().then_some(landing)
}

/// Single forward jumps available from `at`, skipping chips already taken in
/// the current chain.
///
/// Forward-only jumps move strictly away from every earlier capture, so for an
/// unpromoted chip the `taken` check never fires; it bounds the search should
/// a chain ever be allowed to turn back.
fn jumps_from<B: Board + ?Sized>(
    board: &B,
    team: Team,
    at: Position,
    taken: &[Capture],
) -> Vec<(Position, Capture)> {
    let dy = team.forward();
    let mut jumps = Vec::new();

    for &dx in &SIDEWAYS {
        let Some(over) = at.offset(dx, dy) else {
            continue;
        };
        let Some(chip) = board.chip_at(over) else {
            continue;
        };
        if chip.team == team || taken.iter().any(|capture| capture.chip.id == chip.id) {
            continue;
        }
        if let Some(landing) = landing_beyond(board, over, dx, dy) {
            jumps.push((landing, Capture { chip, at: over }));
        }
    }

    jumps
}

/// Depth-first search over (square, captures so far) states starting after
/// the first jump. The chain with the most captures wins; on a tie the first
/// one reached (x = +1 before x = -1 at each jump) is kept.
fn longest_chain<B: Board + ?Sized>(
    board: &B,
    team: Team,
    landing: Position,
    first: Capture,
) -> MoveOption {
    let start = MoveOption {
        destination: landing,
        captures: vec![first],
    };
    let mut best = start.clone();
    let mut stack = vec![start];

    while let Some(state) = stack.pop() {
        if state.captures.len() > best.captures.len() {
            best = state.clone();
        }

        // Reversed so the +1 branch is popped first
        for (next, capture) in jumps_from(board, team, state.destination, &state.captures)
            .into_iter()
            .rev()
        {
            let mut captures = state.captures.clone();
            captures.push(capture);
            stack.push(MoveOption {
                destination: next,
                captures,
            });
        }
    }

    best
}
