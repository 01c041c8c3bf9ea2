use std::collections::VecDeque;

use arrayvec::ArrayVec;

use super::cell::{Cell, ColorIndex, PlayerIndex};

/// A cell coordinate, `x` growing to the right and `y` growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    #[must_use]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Returns the position shifted by `(dx, dy)`, or `None` if it would
    /// leave the non-negative quadrant.
    #[must_use]
    pub fn offset(self, dx: isize, dy: isize) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

/// Fixed-size grid of [`Cell`]s, stored row-major.
///
/// `Clone` produces a deep copy, which is what renderers receive as a
/// snapshot of a running game.
///
/// # Example
///
/// ```
/// use conquest_engine::{Board, Position};
///
/// let board = Board::new(4, 3);
/// assert_eq!(board.area(), 12);
/// assert!(board.contains(Position::new(3, 2)));
/// assert!(!board.contains(Position::new(4, 0)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Creates a board of unowned color-0 cells.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width * height],
        }
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub const fn area(&self) -> usize {
        self.width * self.height
    }

    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    #[must_use]
    pub fn get(&self, pos: Position) -> Option<&Cell> {
        self.contains(pos).then(|| &self.cells[self.index(pos)])
    }

    pub(crate) fn get_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        if !self.contains(pos) {
            return None;
        }
        let index = self.index(pos);
        Some(&mut self.cells[index])
    }

    /// All cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width)
    }

    /// Number of cells currently owned by `player`.
    #[must_use]
    pub fn owned_count(&self, player: PlayerIndex) -> usize {
        self.cells.iter().filter(|c| c.is_owned_by(player)).count()
    }

    /// In-bounds orthogonal neighbours of `pos`.
    #[must_use]
    pub fn neighbors(&self, pos: Position) -> ArrayVec<Position, 4> {
        [(1, 0), (-1, 0), (0, 1), (0, -1)]
            .into_iter()
            .filter_map(|(dx, dy)| pos.offset(dx, dy))
            .filter(|p| self.contains(*p))
            .collect()
    }

    /// Recolors the connected region of `owner`'s cells reachable from `start`.
    ///
    /// A branch stops at a cell that is out of bounds, not owned by `owner`, or
    /// already `new_color`. Ownership is left untouched. Returns the number of
    /// cells recolored.
    pub fn flood_fill(
        &mut self,
        start: Position,
        owner: PlayerIndex,
        new_color: ColorIndex,
    ) -> usize {
        let mut recolored = 0;
        let mut stack = vec![start];
        while let Some(pos) = stack.pop() {
            let Some(cell) = self.get_mut(pos) else {
                continue;
            };
            if !cell.is_owned_by(owner) || cell.color() == new_color {
                continue;
            }
            cell.set_color(new_color);
            recolored += 1;
            stack.extend(self.neighbors(pos));
        }
        recolored
    }

    /// Breadth-first search from `start` over cells of `color`.
    ///
    /// `start` itself is always visited. Every visited cell is handed to
    /// `callback`; the return value is the number of visited cells.
    pub fn bfs<F>(&mut self, start: Position, color: ColorIndex, mut callback: F) -> usize
    where
        F: FnMut(&mut Cell),
    {
        if !self.contains(start) {
            return 0;
        }

        let mut visited = vec![false; self.area()];
        let mut queue = VecDeque::from([start]);
        visited[self.index(start)] = true;

        let mut num_visited = 0;
        while let Some(pos) = queue.pop_front() {
            num_visited += 1;
            let index = self.index(pos);
            callback(&mut self.cells[index]);

            for next in self.neighbors(pos) {
                let next_index = self.index(next);
                if !visited[next_index] && self.cells[next_index].color() == color {
                    visited[next_index] = true;
                    queue.push_back(next);
                }
            }
        }
        num_visited
    }

    fn index(&self, pos: Position) -> usize {
        pos.y * self.width + pos.x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a board from rows of `(color, owner)` pairs.
    fn board_from(rows: &[&[(usize, Option<usize>)]]) -> Board {
        let mut board = Board::new(rows[0].len(), rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, (color, owner)) in row.iter().enumerate() {
                *board.get_mut(Position::new(x, y)).unwrap() = Cell::new(*color, *owner);
            }
        }
        board
    }

    #[test]
    fn test_neighbors_are_clipped_at_edges() {
        let board = Board::new(3, 3);
        assert_eq!(board.neighbors(Position::new(0, 0)).len(), 2);
        assert_eq!(board.neighbors(Position::new(1, 0)).len(), 3);
        assert_eq!(board.neighbors(Position::new(1, 1)).len(), 4);
        assert_eq!(board.neighbors(Position::new(2, 2)).len(), 2);
    }

    #[test]
    fn test_flood_fill_recolors_only_owned_connected_cells() {
        let p = Some(0);
        let q = Some(1);
        let mut board = board_from(&[
            &[(2, p), (2, p), (3, None), (2, p)],
            &[(2, p), (4, q), (3, None), (2, None)],
            &[(2, p), (2, p), (2, p), (2, p)],
        ]);

        let recolored = board.flood_fill(Position::new(0, 0), 0, 5);

        // (3, 0) is owned by player 0 but cut off by unowned cells.
        assert_eq!(recolored, 7);
        let colors: Vec<_> = board.cells().iter().map(Cell::color).collect();
        assert_eq!(colors, [5, 5, 3, 2, 5, 4, 3, 2, 5, 5, 5, 5]);
        let owners: Vec<_> = board.cells().iter().map(Cell::owner).collect();
        assert_eq!(owners[5], q);
        assert_eq!(owners[7], None);
    }

    #[test]
    fn test_flood_fill_stops_at_cells_already_new_color() {
        let p = Some(0);
        let mut board = board_from(&[&[(1, p), (5, p), (1, p)]]);
        assert_eq!(board.flood_fill(Position::new(0, 0), 0, 5), 1);
        assert_eq!(board.get(Position::new(2, 0)).unwrap().color(), 1);
    }

    #[test]
    fn test_flood_fill_on_large_region_does_not_recurse() {
        let mut board = Board::new(300, 300);
        for cell in board.cells_mut() {
            cell.set_owner(0);
        }
        assert_eq!(board.flood_fill(Position::new(0, 0), 0, 1), 300 * 300);
    }

    #[test]
    fn test_bfs_counts_and_claims_matching_region() {
        let mut board = board_from(&[
            &[(1, Some(0)), (1, None), (2, None)],
            &[(2, None), (1, None), (2, None)],
            &[(1, None), (2, None), (1, None)],
        ]);

        let visited = board.bfs(Position::new(0, 0), 1, |cell| cell.set_owner(0));

        assert_eq!(visited, 3);
        assert_eq!(board.owned_count(0), 3);
        assert_eq!(board.get(Position::new(0, 2)).unwrap().owner(), None);
        assert_eq!(board.get(Position::new(2, 2)).unwrap().owner(), None);
    }

    #[test]
    fn test_bfs_outside_board_visits_nothing() {
        let mut board = Board::new(2, 2);
        let mut calls = 0;
        assert_eq!(board.bfs(Position::new(5, 5), 0, |_| calls += 1), 0);
        assert_eq!(calls, 0);
    }
}
