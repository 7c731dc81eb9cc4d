//! Training: minibatch next-token prediction with Adam.
//!
//! A [`Trainer`] owns its hyperparameters, optimizer state and random source, and walks
//! the state machine `Idle → Running → {Completed, Failed}`. Each step samples
//! `batch_size` windows, records the forward pass of every window on one tape, takes the
//! mean cross-entropy over all positions, back-propagates, checks that everything is
//! finite, clips the global gradient norm and applies one Adam update.

mod batch;
mod error;
mod optimizer;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::autograd::{Tape, Tensor, TensorId};
use crate::model::Gpt;

pub use batch::{sample_batch, spread_windows, Window};
pub use error::TrainError;
pub use optimizer::{clip_global_norm, global_norm, Adam};

/// Trainer hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Windows per step.
    pub batch_size: usize,
    /// Steps until the trainer completes.
    pub max_steps: usize,
    /// Initial learning rate; decays linearly towards zero over `max_steps`.
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    /// Max global gradient norm; `0` disables clipping.
    pub grad_clip: f64,
    /// Log the loss every this many steps (the first and last step are always logged).
    pub loss_log_every: usize,
    /// Seed for minibatch sampling.
    pub seed: u64,
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), TrainError> {
        let invalid = |m: &str| Err(TrainError::InvalidConfig(m.to_string()));
        if self.batch_size == 0 || self.max_steps == 0 {
            return invalid("batch_size and max_steps must be greater than 0");
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid("learning_rate must be a positive finite number");
        }
        if !(0.0..1.0).contains(&self.beta1) || !(0.0..1.0).contains(&self.beta2) {
            return invalid("beta1 and beta2 must be in [0, 1)");
        }
        if !(self.epsilon >= 0.0 && self.grad_clip >= 0.0) {
            return invalid("epsilon and grad_clip must be >= 0");
        }
        Ok(())
    }
}

/// Where the trainer is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainState {
    /// No step taken since construction or reset.
    Idle,
    /// At least one step taken, `max_steps` not reached.
    Running,
    /// `max_steps` steps completed.
    Completed,
    /// A step hit a non-finite loss or gradient.
    Failed,
}

/// Summary of a [`Trainer::train`] run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainReport {
    /// Total steps taken by the trainer.
    pub steps: usize,
    pub final_loss: f64,
    /// Loss of every step, in order.
    pub losses: Vec<f64>,
}

/// Drives training of a [`Gpt`] on an encoded corpus.
#[derive(Debug)]
pub struct Trainer {
    config: TrainConfig,
    state: TrainState,
    step: usize,
    losses: Vec<f64>,
    optimizer: Option<Adam>,
    rng: StdRng,
}

impl Trainer {
    /// A trainer in [`TrainState::Idle`].
    pub fn new(config: TrainConfig) -> Result<Self, TrainError> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Trainer {
            config,
            state: TrainState::Idle,
            step: 0,
            losses: Vec::new(),
            optimizer: None,
            rng,
        })
    }

    #[must_use]
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> TrainState {
        self.state
    }

    /// Steps completed so far.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.step
    }

    /// Loss of the most recent successful step.
    #[must_use]
    pub fn last_loss(&self) -> Option<f64> {
        self.losses.last().copied()
    }

    #[must_use]
    pub fn loss_history(&self) -> &[f64] {
        &self.losses
    }

    /// Back to [`TrainState::Idle`]: clears the step counter, loss history and optimizer
    /// moments, and reseeds the random source. The model is not touched.
    pub fn reset(&mut self) {
        self.state = TrainState::Idle;
        self.step = 0;
        self.losses.clear();
        self.optimizer = None;
        self.rng = StdRng::seed_from_u64(self.config.seed);
    }

    /// Runs steps until `max_steps` and returns the loss history.
    ///
    /// Fails with [`TrainError::InsufficientData`] before doing anything if `data` has no
    /// complete window.
    pub fn train(&mut self, model: &mut Gpt, data: &[usize]) -> Result<TrainReport, TrainError> {
        self.check_steppable()?;
        check_data(model, data)?;
        info!(
            tokens = data.len(),
            max_steps = self.config.max_steps,
            batch_size = self.config.batch_size,
            num_params = model.num_params(),
            "training started"
        );
        while self.state != TrainState::Completed {
            self.step(model, data)?;
        }
        let final_loss = self.last_loss().unwrap_or(f64::NAN);
        info!(steps = self.step, final_loss, "training completed");
        Ok(TrainReport {
            steps: self.step,
            final_loss,
            losses: self.losses.clone(),
        })
    }

    /// One atomic training step. Returns the step's loss.
    ///
    /// On [`TrainError::NumericInstability`] the trainer is `Failed` and neither the model
    /// nor the optimizer moments have been modified.
    pub fn step(&mut self, model: &mut Gpt, data: &[usize]) -> Result<f64, TrainError> {
        self.check_steppable()?;
        check_data(model, data)?;
        let block_size = model.config().block_size;

        let windows = sample_batch(&mut self.rng, data, block_size, self.config.batch_size);
        let mut tape = Tape::new();
        let leaves = model.record(&mut tape);
        let mut pairs: Vec<(TensorId, &[usize])> = Vec::with_capacity(windows.len());
        for w in &windows {
            let logits = model.logits_on_tape(&mut tape, &leaves, w.context)?;
            pairs.push((logits, w.target));
        }
        let loss_id = tape.cross_entropy(&pairs);
        let loss = tape.value(loss_id).item();
        self.state = TrainState::Running;
        let step = self.step + 1;

        if !loss.is_finite() {
            return Err(self.fail(step, format!("loss is {loss}")));
        }

        let mut grads_by_id = tape.backward(loss_id);
        let mut grads: Vec<Tensor> = leaves
            .iter()
            .zip(model.params().iter())
            .map(|(&id, p)| {
                grads_by_id
                    .take(id)
                    .unwrap_or_else(|| Tensor::zeros(p.rows(), p.cols()))
            })
            .collect();
        if let Some(name) = model
            .params()
            .names()
            .into_iter()
            .zip(&grads)
            .find_map(|(name, g)| (!g.is_finite()).then_some(name))
        {
            return Err(self.fail(step, format!("gradient of {name} is not finite")));
        }

        let grad_norm = clip_global_norm(&mut grads, self.config.grad_clip);
        let lr = self.config.learning_rate
            * (1.0 - self.step as f64 / self.config.max_steps as f64);
        let cfg = &self.config;
        let optimizer = self.optimizer.get_or_insert_with(|| {
            Adam::new(model.params().iter(), cfg.beta1, cfg.beta2, cfg.epsilon)
        });
        optimizer.update(model.params_mut().iter_mut(), &grads, lr);

        self.step = step;
        self.losses.push(loss);
        debug!(step, loss, grad_norm, lr, "step");
        let every = self.config.loss_log_every;
        let last = step == self.config.max_steps;
        if step == 1 || last || (every > 0 && step % every == 0) {
            info!(step, max_steps = self.config.max_steps, loss, "train loss");
        }
        if last {
            self.state = TrainState::Completed;
        }
        Ok(loss)
    }

    fn check_steppable(&self) -> Result<(), TrainError> {
        match self.state {
            TrainState::Idle | TrainState::Running => Ok(()),
            state => Err(TrainError::InvalidState(state)),
        }
    }

    fn fail(&mut self, step: usize, detail: String) -> TrainError {
        warn!(step, %detail, "training failed");
        self.state = TrainState::Failed;
        TrainError::NumericInstability { step, detail }
    }
}

fn check_data(model: &Gpt, data: &[usize]) -> Result<(), TrainError> {
    let block_size = model.config().block_size;
    if data.len() <= block_size {
        return Err(TrainError::InsufficientData {
            len: data.len(),
            block_size,
        });
    }
    Ok(())
}

/// Mean cross-entropy of `model` over `windows` evenly spaced windows of `data`,
/// without touching any parameter.
pub fn estimate_loss(model: &Gpt, data: &[usize], windows: usize) -> Result<f64, TrainError> {
    check_data(model, data)?;
    if windows == 0 {
        return Err(TrainError::InvalidConfig(
            "windows must be greater than 0".to_string(),
        ));
    }
    let mut tape = Tape::new();
    let leaves = model.record(&mut tape);
    let mut pairs: Vec<(TensorId, &[usize])> = Vec::with_capacity(windows);
    for w in spread_windows(data, model.config().block_size, windows) {
        let logits = model.logits_on_tape(&mut tape, &leaves, w.context)?;
        pairs.push((logits, w.target));
    }
    let loss = tape.cross_entropy(&pairs);
    Ok(tape.value(loss).item())
}
