
/// Index into the board's color palette, in `0..colors`.
pub type ColorIndex = usize;

/// Seat index of a player, in `0..players`.
pub type PlayerIndex = usize;

/// A single board cell.
///
/// `owner` is `None` until some player's territory claims the cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    color: ColorIndex,
    owner: Option<PlayerIndex>,
}

impl Cell {
    #[must_use]
    pub const fn new(color: ColorIndex, owner: Option<PlayerIndex>) -> Self {
        Self { color, owner }
    }

    #[must_use]
    pub const fn color(&self) -> ColorIndex {
        self.color
    }

    #[must_use]
    pub const fn owner(&self) -> Option<PlayerIndex> {
        self.owner
    }

    #[must_use]
    pub fn is_owned_by(&self, player: PlayerIndex) -> bool {
        self.owner == Some(player)
    }

    pub(crate) fn set_color(&mut self, color: ColorIndex) {
        self.color = color;
    }

    pub(crate) fn set_owner(&mut self, player: PlayerIndex) {
        self.owner = Some(player);
    }
}

/// Per-seat player state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Player {
    index: PlayerIndex,
    current_color: ColorIndex,
    owned_cells: usize,
}

impl Player {
    /// Default state for a seat: the seat claims the color with its own index.
    #[must_use]
    pub const fn new(index: PlayerIndex) -> Self {
        Self {
            index,
            current_color: index,
            owned_cells: 0,
        }
    }

    #[must_use]
    pub const fn index(&self) -> PlayerIndex {
        self.index
    }

    #[must_use]
    pub const fn current_color(&self) -> ColorIndex {
        self.current_color
    }

    #[must_use]
    pub const fn owned_cells(&self) -> usize {
        self.owned_cells
    }

    pub(crate) fn set_current_color(&mut self, color: ColorIndex) {
        self.current_color = color;
    }

    pub(crate) fn set_owned_cells(&mut self, count: usize) {
        self.owned_cells = count;
    }
}
