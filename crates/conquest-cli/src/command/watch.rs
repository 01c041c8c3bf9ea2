use std::{path::PathBuf, time::Duration};

use conquest_artisan::artisan::NeuralArtisan;
use conquest_engine::Board;
use conquest_training::{GenerationSummary, Orchestrator, UpdateEvent};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Layout, Rect},
    text::Line,
    widgets::{Block, Paragraph},
};

use crate::{command::SettingsArg, view::BoardDisplay};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct WatchArg {
    #[clap(flatten)]
    pub(crate) settings: SettingsArg,
    /// Write logs to this file; logging is off otherwise
    #[arg(long)]
    pub(crate) log_file: Option<PathBuf>,
}

pub(crate) fn run(arg: &WatchArg) -> anyhow::Result<()> {
    let config = arg.settings.resolve()?;
    let orchestrator = config.build_orchestrator()?;
    let mut app = App::new(orchestrator, config.generations, config.frame_interval());
    ratatui::run(|terminal| app.run(terminal))
}

#[derive(Debug)]
struct App {
    orchestrator: Orchestrator<NeuralArtisan>,
    generations: usize,
    frame: Duration,
    summaries: Vec<GenerationSummary>,
    last_scored: Option<(usize, f64)>,
    exiting: bool,
}

impl App {
    fn new(orchestrator: Orchestrator<NeuralArtisan>, generations: usize, frame: Duration) -> Self {
        Self {
            orchestrator,
            generations,
            frame,
            summaries: vec![],
            last_scored: None,
            exiting: false,
        }
    }

    fn finished(&self) -> bool {
        self.summaries.len() >= self.generations
    }

    fn run(&mut self, terminal: &mut DefaultTerminal) -> anyhow::Result<()> {
        self.orchestrator.start();
        while !self.exiting {
            self.poll();
            terminal.draw(|f| self.draw(f))?;
            if event::poll(self.frame)? {
                self.handle_event(&event::read()?);
            }
        }
        self.orchestrator.stop();
        Ok(())
    }

    fn poll(&mut self) {
        if self.finished() {
            return;
        }
        match self.orchestrator.update() {
            UpdateEvent::Pending => {}
            UpdateEvent::ArtisanEvaluated { index, fitness } => {
                self.last_scored = Some((index, fitness));
            }
            UpdateEvent::GenerationEvolved(summary) => {
                self.summaries.push(summary);
                if self.finished() {
                    self.orchestrator.stop();
                }
            }
        }
    }

    fn handle_event(&mut self, event: &Event) {
        if let Event::Key(key) = event
            && key.kind == KeyEventKind::Press
            && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
        {
            self.exiting = true;
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let [header, boards] =
            Layout::vertical([Constraint::Length(5), Constraint::Fill(1)]).areas(frame.area());
        frame.render_widget(self.header(), header);

        let cells = self.orchestrator.cells();
        let Some(sample) = cells.first() else {
            return;
        };
        for (index, (board, area)) in cells.iter().zip(board_areas(boards, sample)).enumerate() {
            let display =
                BoardDisplay::new(board).block(Block::bordered().title(format!(" game {index} ")));
            frame.render_widget(display, area);
        }
    }

    fn header(&self) -> Paragraph<'_> {
        let (current, _) = self.orchestrator.current_artisan();
        let status = if self.finished() {
            format!("Done after {} generations. Press q to quit.", self.generations)
        } else {
            format!(
                "Generation {}/{} - evaluating artisan {}/{}. Press q to quit.",
                self.orchestrator.generation() + 1,
                self.generations,
                current + 1,
                self.orchestrator.population().len(),
            )
        };
        let scored = match self.last_scored {
            Some((index, fitness)) => format!("Last scored: artisan {index} => {fitness:.1}"),
            None => "Last scored: -".to_owned(),
        };
        let summary = match self.summaries.last() {
            Some(s) => format!(
                "Generation {}: max {:.1}  mean {:.1}  min {:.1}",
                s.generation, s.max, s.mean, s.min
            ),
            None => "No generation evaluated yet".to_owned(),
        };
        Paragraph::new(vec![Line::from(status), Line::from(scored), Line::from(summary)])
            .block(Block::bordered().title(" conquest "))
    }
}

/// Grid of board-sized rects filling `area` row by row; boards that do not
/// fit are left out.
fn board_areas(area: Rect, sample: &Board) -> Vec<Rect> {
    let probe = BoardDisplay::new(sample).block(Block::bordered());
    let (width, height) = (probe.width(), probe.height());
    let columns = (area.width / width.max(1)).max(1);
    let rows = area.height / height.max(1);

    (0..rows)
        .flat_map(|row| (0..columns).map(move |column| (row, column)))
        .map(|(row, column)| {
            Rect::new(
                area.x + column * width,
                area.y + row * height,
                width.min(area.width),
                height,
            )
        })
        .collect()
}
