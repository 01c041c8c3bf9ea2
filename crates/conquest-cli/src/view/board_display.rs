use conquest_engine::Board;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Widget},
};

use super::{glyph, rgb};

/// Renders a board as two terminal columns per cell, clipped to the area.
#[derive(Debug)]
pub struct BoardDisplay<'a> {
    board: &'a Board,
    block: Option<Block<'a>>,
}

impl<'a> BoardDisplay<'a> {
    pub fn new(board: &'a Board) -> Self {
        Self { board, block: None }
    }

    pub fn block(self, block: Block<'a>) -> Self {
        Self {
            block: Some(block),
            ..self
        }
    }

    /// Columns needed to show the whole board, borders included.
    pub fn width(&self) -> u16 {
        u16::try_from(self.board.width() * 2 + 2).unwrap_or(u16::MAX)
    }

    /// Rows needed to show the whole board, borders included.
    pub fn height(&self) -> u16 {
        u16::try_from(self.board.height() + 2).unwrap_or(u16::MAX)
    }
}

impl Widget for BoardDisplay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };

        for (y, row) in (0..inner.height).zip(self.board.rows()) {
            for (x, cell) in (0..inner.width / 2).zip(row) {
                let (r, g, b) = rgb(cell.color());
                let style = Style::default().fg(Color::Rgb(r, g, b));
                buf.set_string(inner.x + x * 2, inner.y + y, glyph(cell), style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_clips_to_area() {
        let board = Board::new(10, 10);
        let area = Rect::new(0, 0, 7, 3);
        let mut buf = Buffer::empty(area);
        BoardDisplay::new(&board).render(area, &mut buf);

        let (r, g, b) = rgb(0);
        assert_eq!(buf[(0, 0)].symbol(), "░");
        assert_eq!(buf[(0, 0)].fg, Color::Rgb(r, g, b));
        assert_eq!(buf[(5, 2)].symbol(), "░");
        // odd trailing column stays blank
        assert_eq!(buf[(6, 2)].symbol(), " ");
    }

    #[test]
    fn test_bordered_board_fits_its_reported_size() {
        let board = Board::new(4, 3);
        let display = BoardDisplay::new(&board).block(Block::bordered());
        let area = Rect::new(0, 0, display.width(), display.height());
        assert_eq!((area.width, area.height), (10, 5));

        let mut buf = Buffer::empty(area);
        display.render(area, &mut buf);
        assert_eq!(buf[(1, 1)].symbol(), "░");
        assert_eq!(buf[(8, 3)].symbol(), "░");
        assert_eq!(buf[(9, 4)].symbol(), "┘");
    }
}
