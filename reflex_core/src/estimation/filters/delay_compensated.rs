// reflex_core/src/estimation/filters/delay_compensated.rs

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{check_len, EstimatorError};
use crate::estimation::delay_line::DelayLine;
use crate::estimation::StateEstimator;
use crate::models::dynamics::Plant;
use crate::types::{Command, State};

/// Weight of the delayed-anchor reconstruction relative to the one-step prediction.
pub const DEFAULT_BLEND_WEIGHT: f64 = 0.2;

/// How the estimator decides that the delay line holds enough real history
/// to anchor a correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColdStart {
    /// Count updates since `init`; the line is full after `delay` of them.
    #[default]
    FillCount,
    /// Treat an all-zero anchor state as "not yet filled".
    ///
    /// Reproduces trajectories recorded with the zero-sentinel rule, including
    /// its flaw: a genuine all-zero observation drops the estimator back to
    /// open-loop prediction for that step.
    ZeroSentinel,
}

/// Whether the delay line has cycled through `delay` genuine samples since `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Filling,
    Steady,
}

/// Construction-time parameters of a [`DelayCompensatedEstimator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimatorConfig {
    pub state_dim: usize,
    pub command_dim: usize,
    /// Observation latency in control steps.
    pub delay: usize,
    #[serde(default = "default_blend_weight")]
    pub blend_weight: f64,
    #[serde(default)]
    pub cold_start: ColdStart,
}

fn default_blend_weight() -> f64 {
    DEFAULT_BLEND_WEIGHT
}

impl EstimatorConfig {
    pub fn new(state_dim: usize, command_dim: usize, delay: usize) -> Self {
        Self {
            state_dim,
            command_dim,
            delay,
            blend_weight: DEFAULT_BLEND_WEIGHT,
            cold_start: ColdStart::default(),
        }
    }

    /// A config whose dimensions are taken from `plant`.
    pub fn for_plant(plant: &dyn Plant, delay: usize) -> Self {
        Self::new(plant.state_dim(), plant.command_dim(), delay)
    }

    pub fn with_blend_weight(mut self, blend_weight: f64) -> Self {
        self.blend_weight = blend_weight;
        self
    }

    pub fn with_cold_start(mut self, cold_start: ColdStart) -> Self {
        self.cold_start = cold_start;
        self
    }

    pub fn validate(&self) -> Result<(), EstimatorError> {
        if self.state_dim == 0 {
            return Err(EstimatorError::InvalidDimension { name: "state" });
        }
        if self.command_dim == 0 {
            return Err(EstimatorError::InvalidDimension { name: "command" });
        }
        if !(self.blend_weight.is_finite() && self.blend_weight >= 0.0) {
            return Err(EstimatorError::InvalidBlendWeight(self.blend_weight));
        }
        Ok(())
    }
}

/// What a single update did, for callers that want more than the estimate.
#[derive(Debug, Clone, PartialEq)]
pub enum Correction {
    /// The delay line was still filling; the estimate is a pure model rollout.
    OpenLoop { estimate: State },
    /// The one-step prediction was blended with the delayed-anchor reconstruction.
    Blended {
        predicted: State,
        inferred: State,
        estimate: State,
    },
}

impl Correction {
    pub fn estimate(&self) -> &State {
        match self {
            Correction::OpenLoop { estimate } | Correction::Blended { estimate, .. } => estimate,
        }
    }

    pub fn into_estimate(self) -> State {
        match self {
            Correction::OpenLoop { estimate } | Correction::Blended { estimate, .. } => estimate,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Correction::OpenLoop { .. } => Phase::Filling,
            Correction::Blended { .. } => Phase::Steady,
        }
    }
}

/// One delay-line entry: what was observed and what was commanded on the same step.
#[derive(Debug, Clone)]
struct Sample {
    state: State,
    command: Command,
}

/// Everything that lives for one episode, between two `init` calls.
#[derive(Debug, Clone)]
struct Episode {
    history: DelayLine<Sample>,
    estimate: State,
    steps: usize,
    phase: Phase,
}

/// Estimates the current state of a plant whose observations arrive `delay`
/// control steps late.
///
/// Every update stores the observation and the command in a delay line. Once
/// the line is full, the oldest stored observation is re-simulated through
/// every command issued since, giving an *inferred* current state built from
/// real data. That is blended with the *predicted* state, the previous
/// estimate rolled forward one step:
///
/// `estimate = (predicted + w * inferred) / (1 + w)`
///
/// Until the line is full, the estimator runs the model open loop.
#[derive(Debug, Clone)]
pub struct DelayCompensatedEstimator {
    config: EstimatorConfig,
    plant: Box<dyn Plant>,
    episode: Option<Episode>,
}

impl DelayCompensatedEstimator {
    pub fn new(config: EstimatorConfig, plant: Box<dyn Plant>) -> Result<Self, EstimatorError> {
        config.validate()?;
        if plant.state_dim() != config.state_dim {
            return Err(EstimatorError::PlantMismatch {
                name: "state",
                expected: config.state_dim,
                found: plant.state_dim(),
            });
        }
        if plant.command_dim() != config.command_dim {
            return Err(EstimatorError::PlantMismatch {
                name: "command",
                expected: config.command_dim,
                found: plant.command_dim(),
            });
        }

        Ok(Self {
            config,
            plant,
            episode: None,
        })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn plant(&self) -> &dyn Plant {
        &*self.plant
    }

    /// Starts a new episode, discarding all history, and returns `initial_state`.
    pub fn init(&mut self, initial_state: &State) -> Result<State, EstimatorError> {
        check_len("initial state", self.config.state_dim, initial_state.len())?;

        let empty = Sample {
            state: State::zeros(self.config.state_dim),
            command: Command::zeros(self.config.command_dim),
        };
        self.episode = Some(Episode {
            history: DelayLine::new(self.config.delay, empty),
            estimate: initial_state.clone(),
            steps: 0,
            phase: Phase::Filling,
        });
        debug!(
            delay = self.config.delay,
            state_dim = self.config.state_dim,
            "delay-compensated estimator initialised"
        );

        Ok(initial_state.clone())
    }

    /// Advances one control step and returns the new estimate.
    pub fn update(
        &mut self,
        observed_state: &State,
        issued_command: &Command,
    ) -> Result<State, EstimatorError> {
        self.update_with_report(observed_state, issued_command)
            .map(Correction::into_estimate)
    }

    /// Like [`update`](Self::update), but reports which branch produced the estimate.
    ///
    /// On error the estimator is left exactly as it was before the call.
    pub fn update_with_report(
        &mut self,
        observed_state: &State,
        issued_command: &Command,
    ) -> Result<Correction, EstimatorError> {
        check_len("observed state", self.config.state_dim, observed_state.len())?;
        check_len("issued command", self.config.command_dim, issued_command.len())?;
        let episode = self.episode.as_ref().ok_or(EstimatorError::NotInitialized)?;

        let correction = self.correct(episode, observed_state, issued_command)?;

        // Everything below is infallible, so a failed update never half-applies.
        let episode = self.episode.as_mut().ok_or(EstimatorError::NotInitialized)?;
        episode.history.push(Sample {
            state: observed_state.clone(),
            command: issued_command.clone(),
        });
        episode.steps += 1;
        episode.estimate.clone_from(correction.estimate());

        let phase = correction.phase();
        if episode.phase != phase {
            debug!(steps = episode.steps, ?phase, "estimator phase changed");
        }
        episode.phase = phase;
        trace!(steps = episode.steps, ?phase, "estimator updated");

        Ok(correction)
    }

    /// Computes the next estimate as if `(observed, command)` had already been
    /// pushed, reading the post-push delay line through the pre-push one.
    fn correct(
        &self,
        episode: &Episode,
        observed: &State,
        command: &Command,
    ) -> Result<Correction, EstimatorError> {
        let delay = self.config.delay;
        let history = &episode.history;

        // After the push, slot D-1 holds what is in slot D-2 now. With D <= 1
        // that is the observation being pushed.
        let anchor = match delay.checked_sub(2) {
            Some(age) => history.get(age).map_or(observed, |sample| &sample.state),
            None => observed,
        };

        let filled = match self.config.cold_start {
            ColdStart::FillCount => history.filled() + 1 >= delay,
            ColdStart::ZeroSentinel => anchor.iter().any(|&v| v != 0.0),
        };

        let predicted = self.advance(&episode.estimate, command)?;
        if !filled {
            return Ok(Correction::OpenLoop {
                estimate: predicted,
            });
        }

        // Oldest first: the surviving commands, then the one being pushed.
        // A zero-length line re-simulates through no commands at all.
        let commands = history
            .iter_oldest_first()
            .skip(1)
            .map(|sample| &sample.command)
            .chain((delay > 0).then_some(command));

        let mut inferred = anchor.clone();
        for u in commands {
            inferred = self.advance(&inferred, u)?;
        }

        let estimate = blend(&predicted, &inferred, self.config.blend_weight);
        Ok(Correction::Blended {
            predicted,
            inferred,
            estimate,
        })
    }

    fn advance(&self, state: &State, command: &Command) -> Result<State, EstimatorError> {
        let next = self.plant.next_state(state, command);
        if next.len() != self.config.state_dim {
            return Err(EstimatorError::PlantOutput {
                expected: self.config.state_dim,
                found: next.len(),
            });
        }
        Ok(next)
    }

    // --- Read-only inspection ---

    /// `None` until the first `init`.
    pub fn phase(&self) -> Option<Phase> {
        self.episode.as_ref().map(|episode| episode.phase)
    }

    pub fn estimate(&self) -> Option<&State> {
        self.episode.as_ref().map(|episode| &episode.estimate)
    }

    pub fn steps_since_init(&self) -> Option<usize> {
        self.episode.as_ref().map(|episode| episode.steps)
    }

    /// The observed state stored `age` updates ago (0 = most recent).
    pub fn state_at(&self, age: usize) -> Option<&State> {
        let episode = self.episode.as_ref()?;
        episode.history.get(age).map(|sample| &sample.state)
    }

    /// The command stored `age` updates ago (0 = most recent).
    pub fn command_at(&self, age: usize) -> Option<&Command> {
        let episode = self.episode.as_ref()?;
        episode.history.get(age).map(|sample| &sample.command)
    }
}

/// Fixed-gain complementary blend, applied per component.
fn blend(predicted: &State, inferred: &State, weight: f64) -> State {
    (predicted + inferred * weight) / (1.0 + weight)
}

impl StateEstimator for DelayCompensatedEstimator {
    fn init(&mut self, initial_state: &State) -> Result<State, EstimatorError> {
        DelayCompensatedEstimator::init(self, initial_state)
    }

    fn update(
        &mut self,
        observed_state: &State,
        issued_command: &Command,
    ) -> Result<State, EstimatorError> {
        DelayCompensatedEstimator::update(self, observed_state, issued_command)
    }

    fn current_estimate(&self) -> Option<&State> {
        self.estimate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dynamics::generic::AdditivePlant;
    use approx::assert_abs_diff_eq;

    fn v(values: &[f64]) -> State {
        State::from_row_slice(values)
    }

    fn additive(delay: usize) -> DelayCompensatedEstimator {
        let config = EstimatorConfig::new(1, 1, delay);
        DelayCompensatedEstimator::new(config, Box::new(AdditivePlant::new(1))).unwrap()
    }

    /// A plant that answers with the wrong dimension.
    #[derive(Debug, Clone)]
    struct Truncating;

    impl Plant for Truncating {
        fn state_dim(&self) -> usize {
            2
        }
        fn command_dim(&self) -> usize {
            1
        }
        fn next_state(&self, state: &State, _command: &Command) -> State {
            state.rows(0, 1).into_owned()
        }
    }

    #[test]
    fn config_validation() {
        assert_eq!(
            EstimatorConfig::new(0, 1, 2).validate(),
            Err(EstimatorError::InvalidDimension { name: "state" })
        );
        assert_eq!(
            EstimatorConfig::new(1, 0, 2).validate(),
            Err(EstimatorError::InvalidDimension { name: "command" })
        );
        assert_eq!(
            EstimatorConfig::new(1, 1, 2).with_blend_weight(-0.5).validate(),
            Err(EstimatorError::InvalidBlendWeight(-0.5))
        );
        assert!(EstimatorConfig::new(1, 1, 2)
            .with_blend_weight(f64::NAN)
            .validate()
            .is_err());
        assert!(EstimatorConfig::new(1, 1, 0).with_blend_weight(0.0).validate().is_ok());
    }

    #[test]
    fn rejects_plant_with_other_dimensions() {
        let err = DelayCompensatedEstimator::new(
            EstimatorConfig::new(2, 2, 1),
            Box::new(AdditivePlant::new(3)),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EstimatorError::PlantMismatch {
                name: "state",
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn update_before_init_fails() {
        let mut estimator = additive(2);
        assert_eq!(
            estimator.update(&v(&[0.0]), &v(&[1.0])),
            Err(EstimatorError::NotInitialized)
        );
        assert_eq!(estimator.phase(), None);
        assert_eq!(estimator.estimate(), None);
    }

    #[test]
    fn init_returns_initial_state_unchanged() {
        let mut estimator = additive(3);
        let x0 = v(&[-1.25]);
        assert_eq!(estimator.init(&x0).unwrap(), x0);
        assert_eq!(estimator.estimate(), Some(&x0));
        assert_eq!(estimator.phase(), Some(Phase::Filling));
        assert_eq!(estimator.steps_since_init(), Some(0));
        assert_eq!(estimator.state_at(2), Some(&v(&[0.0])));
        assert_eq!(estimator.command_at(2), Some(&v(&[0.0])));
    }

    #[test]
    fn dimension_mismatch_is_rejected_without_side_effects() {
        let mut estimator = additive(2);
        estimator.init(&v(&[0.0])).unwrap();

        assert_eq!(
            estimator.init(&v(&[0.0, 1.0])),
            Err(EstimatorError::DimensionMismatch {
                name: "initial state",
                expected: 1,
                found: 2
            })
        );
        assert_eq!(
            estimator.update(&v(&[0.0, 0.0]), &v(&[1.0])),
            Err(EstimatorError::DimensionMismatch {
                name: "observed state",
                expected: 1,
                found: 2
            })
        );
        assert_eq!(
            estimator.update(&v(&[0.0]), &State::zeros(0)),
            Err(EstimatorError::DimensionMismatch {
                name: "issued command",
                expected: 1,
                found: 0
            })
        );
        assert_eq!(estimator.steps_since_init(), Some(0));
        assert_eq!(estimator.state_at(0), Some(&v(&[0.0])));
    }

    #[test]
    fn bad_plant_output_leaves_estimator_untouched() {
        let mut estimator =
            DelayCompensatedEstimator::new(EstimatorConfig::new(2, 1, 1), Box::new(Truncating))
                .unwrap();
        estimator.init(&v(&[1.0, 2.0])).unwrap();

        let err = estimator.update(&v(&[3.0, 4.0]), &v(&[1.0])).unwrap_err();
        assert_eq!(
            err,
            EstimatorError::PlantOutput {
                expected: 2,
                found: 1
            }
        );
        assert_eq!(estimator.steps_since_init(), Some(0));
        assert_eq!(estimator.estimate(), Some(&v(&[1.0, 2.0])));
        assert_eq!(estimator.state_at(0), Some(&v(&[0.0, 0.0])));
    }

    #[test]
    fn worked_example_with_two_step_delay() {
        let mut estimator = additive(2);
        assert_eq!(estimator.init(&v(&[0.0])).unwrap(), v(&[0.0]));

        // Slot 1 still holds the zero fill after the first push: open loop.
        let first = estimator.update_with_report(&v(&[5.0]), &v(&[1.0])).unwrap();
        assert_eq!(
            first,
            Correction::OpenLoop {
                estimate: v(&[1.0])
            }
        );
        assert_eq!(estimator.phase(), Some(Phase::Filling));

        // The first observation has rotated into slot 1: blend.
        let second = estimator.update_with_report(&v(&[7.0]), &v(&[2.0])).unwrap();
        let predicted = 1.0 + 2.0;
        let inferred = 5.0 + 1.0 + 2.0;
        match &second {
            Correction::Blended {
                predicted: p,
                inferred: i,
                estimate,
            } => {
                assert_abs_diff_eq!(p[0], predicted, epsilon = 1e-12);
                assert_abs_diff_eq!(i[0], inferred, epsilon = 1e-12);
                assert_abs_diff_eq!(
                    estimate[0],
                    (predicted + 0.2 * inferred) / 1.2,
                    epsilon = 1e-9
                );
            }
            other => panic!("expected a blended correction, got {other:?}"),
        }
        assert_eq!(estimator.phase(), Some(Phase::Steady));

        let previous = second.estimate()[0];
        let third = estimator.update(&v(&[9.0]), &v(&[3.0])).unwrap();
        let predicted = previous + 3.0;
        let inferred = 7.0 + 2.0 + 3.0;
        assert_abs_diff_eq!(third[0], (predicted + 0.2 * inferred) / 1.2, epsilon = 1e-9);
    }

    #[test]
    fn heavier_weight_leans_on_the_anchor() {
        let config = EstimatorConfig::new(1, 1, 2).with_blend_weight(0.5);
        let mut estimator =
            DelayCompensatedEstimator::new(config, Box::new(AdditivePlant::new(1))).unwrap();
        estimator.init(&v(&[0.0])).unwrap();

        assert_eq!(estimator.update(&v(&[5.0]), &v(&[1.0])).unwrap(), v(&[1.0]));
        // predicted 1 + 2 = 3, inferred 5 + 1 + 2 = 8: (3 + 0.5 * 8) / 1.5
        let second = estimator.update(&v(&[7.0]), &v(&[2.0])).unwrap();
        assert_abs_diff_eq!(second[0], 7.0 / 1.5, epsilon = 1e-12);
        // predicted 7/1.5 + 3 = 23/3, inferred 7 + 2 + 3 = 12: (23/3 + 6) / 1.5
        let third = estimator.update(&v(&[9.0]), &v(&[3.0])).unwrap();
        assert_abs_diff_eq!(third[0], (23.0 / 3.0 + 6.0) / 1.5, epsilon = 1e-12);
    }

    #[test]
    fn all_zero_observations_still_reach_steady_state() {
        let mut estimator = additive(2);
        estimator.init(&v(&[0.0])).unwrap();

        assert_eq!(estimator.update(&v(&[0.0]), &v(&[1.0])).unwrap(), v(&[1.0]));
        // Steady from here: predicted 2, inferred 0 + 1 + 1 = 2.
        assert_abs_diff_eq!(
            estimator.update(&v(&[0.0]), &v(&[1.0])).unwrap()[0],
            2.0,
            epsilon = 1e-12
        );
        // predicted 3, inferred 0 + 1 + 1 = 2.
        assert_abs_diff_eq!(
            estimator.update(&v(&[0.0]), &v(&[1.0])).unwrap()[0],
            (3.0 + 0.2 * 2.0) / 1.2,
            epsilon = 1e-12
        );
        assert_eq!(estimator.phase(), Some(Phase::Steady));
    }

    #[test]
    fn zero_sentinel_stays_open_loop_on_zero_anchor() {
        let config = EstimatorConfig::new(1, 1, 2).with_cold_start(ColdStart::ZeroSentinel);
        let mut estimator =
            DelayCompensatedEstimator::new(config, Box::new(AdditivePlant::new(1))).unwrap();
        estimator.init(&v(&[0.0])).unwrap();

        for expected in [1.0, 2.0, 3.0] {
            assert_eq!(estimator.update(&v(&[0.0]), &v(&[1.0])).unwrap(), v(&[expected]));
            assert_eq!(estimator.phase(), Some(Phase::Filling));
        }

        // A non-zero observation reaches the oldest slot one update after it is pushed.
        estimator.update(&v(&[4.0]), &v(&[1.0])).unwrap();
        assert_eq!(estimator.phase(), Some(Phase::Filling));
        estimator.update(&v(&[0.0]), &v(&[1.0])).unwrap();
        assert_eq!(estimator.phase(), Some(Phase::Steady));

        // And a zero anchor during steady state drops it back to open loop.
        let report = estimator.update_with_report(&v(&[0.0]), &v(&[1.0])).unwrap();
        assert_eq!(report.phase(), Phase::Filling);
    }

    #[test]
    fn single_step_delay_blends_immediately() {
        let mut estimator = additive(1);
        estimator.init(&v(&[0.0])).unwrap();
        let report = estimator.update_with_report(&v(&[2.0]), &v(&[1.0])).unwrap();
        // predicted 0 + 1, inferred 2 + 1
        assert_abs_diff_eq!(report.estimate()[0], (1.0 + 0.2 * 3.0) / 1.2, epsilon = 1e-12);
        assert_eq!(report.phase(), Phase::Steady);
    }

    #[test]
    fn zero_delay_blends_prediction_with_observation() {
        let mut estimator = additive(0);
        estimator.init(&v(&[1.0])).unwrap();
        let report = estimator.update_with_report(&v(&[4.0]), &v(&[1.0])).unwrap();
        match report {
            Correction::Blended {
                predicted,
                inferred,
                estimate,
            } => {
                assert_eq!(predicted, v(&[2.0]));
                assert_eq!(inferred, v(&[4.0]));
                assert_abs_diff_eq!(estimate[0], (2.0 + 0.2 * 4.0) / 1.2, epsilon = 1e-12);
            }
            other => panic!("expected a blended correction, got {other:?}"),
        }
        assert_eq!(estimator.state_at(0), None);
    }

    #[test]
    fn zero_weight_ignores_the_anchor() {
        let config = EstimatorConfig::new(1, 1, 1).with_blend_weight(0.0);
        let mut estimator =
            DelayCompensatedEstimator::new(config, Box::new(AdditivePlant::new(1))).unwrap();
        estimator.init(&v(&[0.0])).unwrap();
        for _ in 0..5 {
            estimator.update(&v(&[100.0]), &v(&[1.0])).unwrap();
        }
        assert_eq!(estimator.estimate(), Some(&v(&[5.0])));
    }

    #[test]
    fn delay_line_rotates_oldest_to_the_back() {
        let delay = 3;
        let config = EstimatorConfig::new(3, 3, delay);
        let mut estimator =
            DelayCompensatedEstimator::new(config, Box::new(AdditivePlant::new(3))).unwrap();
        estimator.init(&State::zeros(3)).unwrap();

        // Scaled one-hot markers, distinct for every step.
        let markers: Vec<Command> = (0..=delay)
            .map(|k| Command::from_fn(3, |i, _| if i == k % 3 { (k + 1) as f64 } else { 0.0 }))
            .collect();
        for (k, command) in markers.iter().enumerate() {
            estimator.update(&State::from_element(3, k as f64), command).unwrap();
        }

        assert_eq!(estimator.command_at(0), Some(&markers[delay]));
        assert_eq!(estimator.command_at(delay - 1), Some(&markers[1]));
        assert_eq!(estimator.state_at(delay - 1), Some(&State::from_element(3, 1.0)));
        assert_eq!(estimator.command_at(delay), None);
    }

    #[test]
    fn nan_from_observation_propagates() {
        let mut estimator = additive(1);
        estimator.init(&v(&[0.0])).unwrap();
        let estimate = estimator.update(&v(&[f64::NAN]), &v(&[1.0])).unwrap();
        assert!(estimate[0].is_nan());
    }
}
