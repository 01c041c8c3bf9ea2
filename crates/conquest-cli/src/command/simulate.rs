use std::{path::PathBuf, thread, time::Duration};

use conquest_artisan::artisan::Evolvable;
use conquest_training::{GenerationSummary, Orchestrator, UpdateEvent};
use log::info;

use crate::{command::SettingsArg, model::report::TrainingReport, util};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    #[clap(flatten)]
    pub(crate) settings: SettingsArg,
    /// Report output path (JSON); stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    let SimulateArg { settings, output } = arg;
    let config = settings.resolve()?;
    let mut orchestrator = config.build_orchestrator()?;

    let summaries = train(&mut orchestrator, config.generations, config.frame_interval());

    let report = TrainingReport::new(config, summaries);
    util::save_json(&report, output.as_deref())?;

    info!("training completed, best fitness {:.1}", report.best_fitness);
    if let Some(path) = output {
        info!("report saved to {}", path.display());
    }
    Ok(())
}

/// Polls `orchestrator` every `frame` until `generations` generations have
/// evolved, then stops it.
pub(crate) fn train<A>(
    orchestrator: &mut Orchestrator<A>,
    generations: usize,
    frame: Duration,
) -> Vec<GenerationSummary>
where
    A: Evolvable + 'static,
{
    let mut summaries = Vec::with_capacity(generations);
    orchestrator.start();
    while summaries.len() < generations {
        match orchestrator.update() {
            UpdateEvent::Pending => thread::sleep(frame),
            UpdateEvent::ArtisanEvaluated { index, fitness } => {
                info!(
                    "generation #{}: artisan {index} => {fitness:.1}",
                    orchestrator.generation()
                );
            }
            UpdateEvent::GenerationEvolved(summary) => summaries.push(summary),
        }
    }
    orchestrator.stop();
    summaries
}
