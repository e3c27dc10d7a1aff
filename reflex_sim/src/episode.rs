// reflex_sim/src/episode.rs

use reflex_core::prelude::*;
use tracing::{info, trace};

use crate::config::{ScenarioConfig, ScenarioError};
use crate::controller::PdController;
use crate::prng::SimulationRng;
use crate::sensor::NoisySensor;

/// Per-episode estimation quality.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub steps: usize,
    /// Updates that ran the blended correction.
    pub steady_steps: usize,
    /// Root-mean-square norm of `estimate - truth` over the episode.
    pub rms_error: f64,
    pub final_error: f64,
    /// The same metric for a dead-reckoning predictor fed the same commands.
    pub open_loop_rms_error: f64,
}

/// Owns one closed loop: true plant, sensor, policy and estimators.
///
/// Every step the policy acts on the current estimate, the sensor reads the
/// true state (optionally `latency` steps stale), the true plant advances
/// under the command, and the estimators are updated with the
/// (observation, command) pair.
pub struct EpisodeRunner {
    plant: Box<dyn Plant>,
    estimator: DelayCompensatedEstimator,
    baseline: OpenLoopPredictor,
    sensor: NoisySensor,
    controller: PdController,
    rng: SimulationRng,
    initial_state: State,
    steps_per_episode: usize,
}

impl EpisodeRunner {
    pub fn from_scenario(scenario: &ScenarioConfig) -> Result<Self, ScenarioError> {
        scenario.validate()?;
        let plant = scenario.plant.build()?;

        // The estimator gets its own copy of the model.
        let config = scenario.estimator.to_config(&*plant);
        let estimator = DelayCompensatedEstimator::new(config, plant.clone())?;
        let baseline = OpenLoopPredictor::new(plant.clone());

        let controller = PdController::new(
            &scenario.controller,
            plant.state_dim(),
            plant.command_dim(),
        )?;

        Ok(Self {
            initial_state: scenario.initial_state(plant.state_dim()),
            plant,
            estimator,
            baseline,
            sensor: NoisySensor::from_config(&scenario.sensor)?,
            controller,
            rng: SimulationRng::new(scenario.simulation.seed),
            steps_per_episode: scenario.simulation.steps_per_episode,
        })
    }

    pub fn estimator(&self) -> &DelayCompensatedEstimator {
        &self.estimator
    }

    pub fn run(&mut self, episodes: usize) -> Result<Vec<EpisodeSummary>, EstimatorError> {
        (0..episodes).map(|episode| self.run_episode(episode)).collect()
    }

    pub fn run_episode(&mut self, episode: usize) -> Result<EpisodeSummary, EstimatorError> {
        let mut truth = self.initial_state.clone();
        let mut estimate = self.estimator.init(&truth)?;
        self.baseline.init(&truth)?;
        self.sensor.reset();

        let mut squared_error = 0.0;
        let mut open_loop_squared_error = 0.0;
        let mut final_error = 0.0;
        let mut steady_steps = 0;

        for step in 0..self.steps_per_episode {
            let command = self.controller.command(&estimate);
            let observed = self.sensor.observe(&truth, &mut self.rng);
            truth = self.plant.next_state(&truth, &command);

            let correction = self.estimator.update_with_report(&observed, &command)?;
            if correction.phase() == Phase::Steady {
                steady_steps += 1;
            }
            estimate = correction.into_estimate();
            let open_loop = self.baseline.update(&observed, &command)?;

            final_error = (&estimate - &truth).norm();
            squared_error += final_error * final_error;
            open_loop_squared_error += (&open_loop - &truth).norm_squared();
            trace!(episode, step, error = final_error, "closed-loop step");
        }

        let steps = self.steps_per_episode;
        let summary = EpisodeSummary {
            episode,
            steps,
            steady_steps,
            rms_error: (squared_error / steps as f64).sqrt(),
            final_error,
            open_loop_rms_error: (open_loop_squared_error / steps as f64).sqrt(),
        };
        info!(
            episode,
            steady_steps,
            rms_error = summary.rms_error,
            open_loop_rms_error = summary.open_loop_rms_error,
            "episode finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn scenario(text: &str) -> ScenarioConfig {
        ScenarioConfig::from_toml_str(text).unwrap()
    }

    #[test]
    fn noiseless_arm_is_tracked_exactly() {
        let mut runner = EpisodeRunner::from_scenario(&scenario(
            r#"
            initial_state = [0.4, 1.1, 0.0, 0.0]
            [simulation]
            steps_per_episode = 200
            [controller]
            target = [0.8, 0.6]
            "#,
        ))
        .unwrap();

        let summary = runner.run_episode(0).unwrap();
        assert_eq!(summary.steps, 200);
        // Default delay of 5: the first four updates run open loop.
        assert_eq!(summary.steady_steps, 196);
        assert_abs_diff_eq!(summary.rms_error, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn compensation_beats_dead_reckoning_under_noise() {
        let mut runner = EpisodeRunner::from_scenario(&scenario(
            r#"
            initial_state = [0.0]
            [simulation]
            seed = 3
            steps_per_episode = 100
            [plant]
            type = "additive"
            dim = 1
            [estimator]
            delay = 3
            [sensor]
            noise_std = 0.01
            [controller]
            target = [1.0]
            kp = 0.2
            "#,
        ))
        .unwrap();

        let summary = runner.run_episode(0).unwrap();
        // With a perfect model, dead reckoning from the true start never drifts;
        // the estimator only pays for sensor noise, scaled down by the blend.
        assert_abs_diff_eq!(summary.open_loop_rms_error, 0.0, epsilon = 1e-12);
        assert!(summary.rms_error < 0.01);
    }

    #[test]
    fn seeded_runs_repeat() {
        let text = r#"
            initial_state = [0.2, 0.9, 0.0, 0.0]
            [simulation]
            seed = 11
            steps_per_episode = 60
            [sensor]
            noise_std = 0.02
        "#;
        let a = EpisodeRunner::from_scenario(&scenario(text)).unwrap().run(2).unwrap();
        let b = EpisodeRunner::from_scenario(&scenario(text)).unwrap().run(2).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(a[1].episode, 1);
    }

    #[test]
    fn double_integrator_reaches_its_target() {
        let mut runner = EpisodeRunner::from_scenario(&scenario(
            r#"
            initial_state = [0.0, 0.0]
            [simulation]
            steps_per_episode = 400
            [plant]
            type = "double_integrator"
            axes = 1
            dt = 0.05
            [estimator]
            delay = 3
            [controller]
            target = [1.0]
            kp = 2.0
            kd = 2.0
            "#,
        ))
        .unwrap();

        let summary = runner.run_episode(0).unwrap();
        assert_eq!(summary.steady_steps, 398);
        assert_abs_diff_eq!(summary.rms_error, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn stale_readings_cost_accuracy_but_settle() {
        let text = |latency: usize| {
            format!(
                "initial_state = [0.0]\n\
                 [simulation]\nsteps_per_episode = 60\n\
                 [plant]\ntype = \"additive\"\ndim = 1\n\
                 [estimator]\ndelay = 3\n\
                 [sensor]\nlatency = {latency}\n\
                 [controller]\ntarget = [1.0]\nkp = 0.2\n"
            )
        };
        let fresh = EpisodeRunner::from_scenario(&scenario(&text(0)))
            .unwrap()
            .run_episode(0)
            .unwrap();
        let stale = EpisodeRunner::from_scenario(&scenario(&text(3)))
            .unwrap()
            .run_episode(0)
            .unwrap();

        // Stale readings pull the estimate back toward older states.
        assert!(stale.rms_error > fresh.rms_error);
        assert!(stale.final_error < 1e-2);
    }

    #[test]
    fn every_episode_restarts_the_estimator() {
        let mut runner = EpisodeRunner::from_scenario(&scenario(
            "[simulation]\nsteps_per_episode = 10\n[estimator]\ndelay = 4\n",
        ))
        .unwrap();
        let summaries = runner.run(3).unwrap();
        for summary in summaries {
            assert_eq!(summary.steady_steps, 7);
        }
        assert_eq!(runner.estimator().steps_since_init(), Some(10));
    }
}
