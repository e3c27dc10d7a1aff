// reflex_sim/src/main.rs

//! Runs a closed-loop scenario and reports how well the delay-compensated
//! estimator tracked the true plant.
//!
//! `cargo run -p reflex_sim -- --scenario assets/scenarios/arm_reaching.toml`

use anyhow::Context;
use clap::Parser;
use reflex_sim::cli::Cli;
use reflex_sim::logging::init_logging;
use reflex_sim::prelude::*;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut scenario = ScenarioConfig::load(&cli.scenario)
        .with_context(|| format!("loading scenario {}", cli.scenario.display()))?;
    if let Some(episodes) = cli.episodes {
        scenario.simulation.episodes = episodes;
    }
    if cli.seed.is_some() {
        scenario.simulation.seed = cli.seed;
    }
    info!(
        scenario = %cli.scenario.display(),
        delay = scenario.estimator.delay,
        blend_weight = scenario.estimator.blend_weight,
        "starting run"
    );

    let mut runner = EpisodeRunner::from_scenario(&scenario).context("building closed loop")?;
    let summaries = runner
        .run(scenario.simulation.episodes)
        .context("running episodes")?;

    if !summaries.is_empty() {
        let n = summaries.len() as f64;
        let mean_rms = summaries.iter().map(|s| s.rms_error).sum::<f64>() / n;
        let mean_open_loop = summaries.iter().map(|s| s.open_loop_rms_error).sum::<f64>() / n;
        info!(
            episodes = summaries.len(),
            mean_rms_error = mean_rms,
            mean_open_loop_rms_error = mean_open_loop,
            "run complete"
        );
    }
    Ok(())
}
