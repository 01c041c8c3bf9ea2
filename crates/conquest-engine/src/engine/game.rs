use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg64Mcg;

use crate::{
    ConfigError, TurnError,
    core::{Board, Cell, ColorIndex, Player, PlayerIndex, Position},
};

use super::config::BoardConfig;

/// Anchor cell and its orthogonal neighbours: the starting territory.
const STARTING_REGION: [(isize, isize); 5] = [(0, 0), (0, 1), (0, -1), (1, 0), (-1, 0)];

/// Cells around the starting region that must not share the seat's color.
const FOREIGN_RING: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 1),
    (1, 1),
    (1, -1),
    (2, 0),
    (-2, 0),
    (0, 2),
    (0, -2),
];

/// Everything a policy may look at when choosing a move, captured under a
/// single lock acquisition.
#[derive(Debug, Clone)]
pub struct Observation {
    board: Board,
    players: Vec<Player>,
    turn: PlayerIndex,
    colors: usize,
    available_moves: Vec<ColorIndex>,
}

impl Observation {
    /// Builds an observation from explicit parts; available moves are derived
    /// from the players' claimed colors.
    #[must_use]
    pub fn from_parts(board: Board, players: Vec<Player>, turn: PlayerIndex, colors: usize) -> Self {
        let available_moves = available_colors(&players, colors);
        Self {
            board,
            players,
            turn,
            colors,
            available_moves,
        }
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Seat that is to move.
    #[must_use]
    pub fn turn(&self) -> PlayerIndex {
        self.turn
    }

    /// Size of the color palette.
    #[must_use]
    pub fn colors(&self) -> usize {
        self.colors
    }

    #[must_use]
    pub fn available_moves(&self) -> &[ColorIndex] {
        &self.available_moves
    }
}

#[derive(Debug)]
struct GameState {
    board: Board,
    players: Vec<Player>,
    turn: PlayerIndex,
    turns_played: usize,
    rng: Pcg64Mcg,
}

impl GameState {
    fn available_moves(&self, colors: usize) -> Vec<ColorIndex> {
        available_colors(&self.players, colors)
    }

    fn total_owned(&self) -> usize {
        self.players.iter().map(Player::owned_cells).sum()
    }

    fn initialize(&mut self, config: &BoardConfig, anchors: &[Position]) {
        let colors = config.colors;

        self.players = (0..config.players).map(Player::new).collect();
        self.turn = 0;
        self.turns_played = 0;

        for cell in self.board.cells_mut() {
            *cell = Cell::new(self.rng.random_range(0..colors), None);
        }

        for (seat, anchor) in anchors.iter().enumerate() {
            for pos in around(*anchor, &STARTING_REGION) {
                if let Some(cell) = self.board.get_mut(pos) {
                    cell.set_color(seat);
                    cell.set_owner(seat);
                }
            }
        }

        // Rings of different seats overlap on small boards, so ring cells
        // avoid every seat's starting color, not just their own seat's.
        for pos in anchors.iter().flat_map(|anchor| around(*anchor, &FOREIGN_RING)) {
            let color = self.rng.random_range(config.players..colors);
            if let Some(cell) = self.board.get_mut(pos).filter(|c| c.owner().is_none()) {
                cell.set_color(color);
            }
        }

        for player in &mut self.players {
            player.set_owned_cells(self.board.owned_count(player.index()));
        }
    }
}

fn available_colors(players: &[Player], colors: usize) -> Vec<ColorIndex> {
    (0..colors)
        .filter(|c| players.iter().all(|p| p.current_color() != *c))
        .collect()
}

fn around(anchor: Position, offsets: &[(isize, isize)]) -> impl Iterator<Item = Position> + '_ {
    offsets
        .iter()
        .filter_map(move |(dx, dy)| anchor.offset(*dx, *dy))
}

/// A single Conquest match.
///
/// All state sits behind one mutex, so a `Game` can be shared (e.g. through
/// `Arc`) between the worker playing it and a renderer reading snapshots.
/// Every operation finishes its mutation before releasing the lock, so a
/// poisoned lock still guards consistent state and is recovered.
#[derive(Debug)]
pub struct Game {
    config: BoardConfig,
    anchors: Vec<Position>,
    state: Mutex<GameState>,
}

impl Game {
    /// Creates a game whose board is randomized from OS entropy.
    pub fn new(config: BoardConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, Pcg64Mcg::from_os_rng())
    }

    /// Creates a game with a reproducible board sequence.
    pub fn with_seed(config: BoardConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, Pcg64Mcg::seed_from_u64(seed))
    }

    fn with_rng(config: BoardConfig, rng: Pcg64Mcg) -> Result<Self, ConfigError> {
        config.validate()?;
        let anchors = config.anchors();
        let mut state = GameState {
            board: Board::new(config.width, config.height),
            players: Vec::with_capacity(config.players),
            turn: 0,
            turns_played: 0,
            rng,
        };
        state.initialize(&config, &anchors);
        Ok(Self {
            config,
            anchors,
            state: Mutex::new(state),
        })
    }

    fn lock(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    #[must_use]
    pub fn anchors(&self) -> &[Position] {
        &self.anchors
    }

    #[must_use]
    pub fn players(&self) -> Vec<Player> {
        self.lock().players.clone()
    }

    /// Deep copy of the board.
    #[must_use]
    pub fn cells(&self) -> Board {
        self.lock().board.clone()
    }

    #[must_use]
    pub fn turn(&self) -> PlayerIndex {
        self.lock().turn
    }

    #[must_use]
    pub fn turns_played(&self) -> usize {
        self.lock().turns_played
    }

    /// Colors no player currently claims, ascending.
    #[must_use]
    pub fn available_moves(&self) -> Vec<ColorIndex> {
        self.lock().available_moves(self.config.colors)
    }

    #[must_use]
    pub fn observe(&self) -> Observation {
        let state = self.lock();
        Observation {
            board: state.board.clone(),
            players: state.players.clone(),
            turn: state.turn,
            colors: self.config.colors,
            available_moves: state.available_moves(self.config.colors),
        }
    }

    /// Re-randomizes the board and puts every seat back on its starting
    /// region, reusing the existing allocation.
    pub fn reset_board(&self) {
        let mut state = self.lock();
        state.initialize(&self.config, &self.anchors);
    }

    /// Plays `color` for `player`.
    ///
    /// The player's territory is recolored to `color` and then every cell of
    /// that color connected to the anchor is claimed. On error nothing changes.
    pub fn execute_turn(&self, player: PlayerIndex, color: ColorIndex) -> Result<(), TurnError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        if player != state.turn {
            return Err(TurnError::WrongTurn {
                expected: state.turn,
                actual: player,
            });
        }
        if color >= self.config.colors {
            return Err(TurnError::ColorOutOfRange {
                color,
                colors: self.config.colors,
            });
        }
        if let Some(owner) = state.players.iter().find(|p| p.current_color() == color) {
            return Err(TurnError::ColorTaken {
                color,
                owner: owner.index(),
            });
        }

        let anchor = self.anchors[player];
        state.players[player].set_current_color(color);
        state.board.flood_fill(anchor, player, color);
        let owned = state
            .board
            .bfs(anchor, color, |cell| cell.set_owner(player));
        state.players[player].set_owned_cells(owned);

        debug_assert!(state.total_owned() <= self.config.area());

        state.turns_played += 1;
        state.turn = (state.turn + 1) % self.config.players;
        Ok(())
    }

    /// Whether every cell is owned by some player.
    #[must_use]
    pub fn done(&self) -> bool {
        self.lock().total_owned() == self.config.area()
    }

    /// Whether the game is over: done, or out of turns.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        let state = self.lock();
        state.total_owned() == self.config.area() || state.turns_played >= self.config.max_turns
    }
}
