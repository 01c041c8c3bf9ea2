use std::io::{self, Write};

use conquest_engine::{Board, Cell, ColorIndex};
use crossterm::{
    queue,
    style::{self, Print, PrintStyledContent, Stylize as _},
};

pub use self::board_display::BoardDisplay;

mod board_display;

const PALETTE: [(u8, u8, u8); 8] = [
    (230, 57, 70),
    (69, 123, 157),
    (244, 162, 97),
    (42, 157, 143),
    (233, 196, 106),
    (131, 56, 236),
    (241, 250, 238),
    (96, 108, 56),
];

/// Display color of a palette index. Indices past the fixed palette cycle
/// through a coarse RGB cube.
#[must_use]
pub fn rgb(color: ColorIndex) -> (u8, u8, u8) {
    if let Some(rgb) = PALETTE.get(color) {
        return *rgb;
    }
    let level = |n: usize| [40, 110, 180, 250][n % 4];
    let n = color - PALETTE.len();
    (level(n), level(n / 4), level(n / 16))
}

/// Two-column glyph: solid for owned cells, shaded for free ones.
#[must_use]
pub fn glyph(cell: &Cell) -> &'static str {
    if cell.owner().is_some() { "██" } else { "░░" }
}

/// Writes `board` to `out` as colored glyphs, one terminal row per board row.
pub fn write_board<W>(out: &mut W, board: &Board) -> io::Result<()>
where
    W: Write,
{
    for row in board.rows() {
        for cell in row {
            let (r, g, b) = rgb(cell.color());
            queue!(
                out,
                PrintStyledContent(glyph(cell).with(style::Color::Rgb { r, g, b }))
            )?;
        }
        queue!(out, Print('\n'))?;
    }
    out.flush()
}
