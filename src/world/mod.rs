use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{Error, Result, agent::*, config::*};

mod controller;
mod store;

pub use controller::*;
pub use store::*;

/// Which policy fired during a [`Trainer::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    /// The best agent reached the target checkpoint, `checkpoint` and `lap` are the new target.
    CheckpointAdvanced { checkpoint: usize, lap: usize },
    /// The generation ran out of time, `saved` tells if its best agent was persisted.
    TimedOut { saved: bool },
}

/// Snapshot of the training progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainerStatus {
    pub agents:                        usize,
    pub checkpoint:                    usize,
    pub lap:                           usize,
    pub best_distance:                 f32,
    pub best_distance_this_checkpoint: f32,
    pub time_budget:                   f32,
    pub elapsed:                       f32,
    pub loops_completed:               usize,
    pub deviation:                     f32,
}

/// Generational training loop.
///
/// Each tick drives every agent once, scores the population by its distance to the target
/// checkpoint, and replaces the population with mutations of the best agent when it reaches the
/// checkpoint or when the generation runs out of time.
#[derive(Debug)]
pub struct Trainer<C, S>
where
    C: Controller,
    S: BrainStore,
{
    config:                        TrainerConfig,
    controller:                    C,
    store:                         S,
    rng:                           StdRng,
    agents:                        Vec<Agent>,
    parent:                        Option<SavedBrain>,
    ray_buffer:                    Vec<f32>,
    event_buffer:                  Vec<Event>,
    best_index:                    Option<usize>,
    checkpoint:                    usize,
    lap:                           usize,
    deviation:                     f32,
    time_budget:                   f32,
    elapsed:                       f32,
    loops_completed:               usize,
    best_distance:                 f32,
    best_distance_this_checkpoint: f32,
}

impl<C, S> Trainer<C, S>
where
    C: Controller,
    S: BrainStore,
{
    /// Creates the trainer and spawns the first generation.
    ///
    /// With [`Bootstrap::Resume`] a missing or unfitting stored brain is an error.
    pub fn new(config: TrainerConfig, controller: C, store: S) -> Result<Self> {
        config.validate()?;
        if controller.checkpoints().is_empty() {
            return Err(Error::NoCheckpoints);
        }
        let rng = config.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let mut trainer = Self {
            controller,
            store,
            rng,
            agents: Vec::new(),
            parent: None,
            ray_buffer: Vec::new(),
            event_buffer: Vec::new(),
            best_index: None,
            checkpoint: 0,
            lap: 0,
            deviation: config.initial_deviation,
            time_budget: config.time_budget,
            elapsed: 0.0,
            loops_completed: 0,
            best_distance: config.distance_sentinel,
            best_distance_this_checkpoint: config.distance_sentinel,
            config,
        };
        let parent = match trainer.config.bootstrap {
            Bootstrap::Random => None,
            Bootstrap::Resume => Some(trainer.store.load()?),
        };
        trainer.agents = populate(
            &trainer.config,
            trainer.controller.checkpoints().len(),
            parent.as_ref().map(|brain| (brain, Deviation::saturating(trainer.deviation))),
            &mut trainer.rng,
        )?;
        trainer.parent = parent;
        trainer.controller.respawn(trainer.agents.len());
        info!(
            agents = trainer.agents.len(),
            bootstrap = ?trainer.config.bootstrap,
            "training started"
        );
        Ok(trainer)
    }

    /// Advances the training by one simulation step of `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> Result<TickOutcome> {
        self.drive()?;
        self.advance_world(dt);
        self.evaluate();
        let outcome = if let Some(best) = self.checkpoint_candidate() {
            self.advance_checkpoint(best)?
        } else if self.elapsed > self.time_budget {
            self.time_out()?
        } else {
            TickOutcome::Running
        };
        self.elapsed += dt;
        Ok(outcome)
    }

    /// Applies a simulation event to the addressed agent.
    /// Events for agents outside the current population are ignored.
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::ObstacleHit { agent, kind } => {
                if let Some(agent) = self.agents.get_mut(agent) {
                    agent.on_obstacle_hit(kind);
                }
            },
            Event::CheckpointReached { agent, index } => {
                if let Some(agent) = self.agents.get_mut(agent) {
                    agent.on_checkpoint_reached(index);
                }
            },
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Best agent of the latest evaluation, if any agent qualified.
    /// Cleared whenever the population is regenerated.
    pub fn best(&self) -> Option<(usize, &Agent)> {
        self.best_index.map(|index| (index, &self.agents[index]))
    }

    /// Brain the next generation will be spawned from.
    pub fn parent(&self) -> Option<&SavedBrain> {
        self.parent.as_ref()
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn status(&self) -> TrainerStatus {
        TrainerStatus {
            agents:                        self.agents.len(),
            checkpoint:                    self.checkpoint,
            lap:                           self.lap,
            best_distance:                 self.best_distance,
            best_distance_this_checkpoint: self.best_distance_this_checkpoint,
            time_budget:                   self.time_budget,
            elapsed:                       self.elapsed,
            loops_completed:               self.loops_completed,
            deviation:                     self.deviation,
        }
    }

    fn drive(&mut self) -> Result<()> {
        for (index, agent) in self.agents.iter_mut().enumerate() {
            self.ray_buffer.resize(agent.sensor_count(), 0.0);
            let body = self.controller.read_sensors(index, &mut self.ray_buffer);
            let actuation = agent.step(&self.ray_buffer, body)?;
            self.controller.perform_actions(index, actuation);
        }
        Ok(())
    }

    fn advance_world(&mut self, dt: f32) {
        let mut events = std::mem::take(&mut self.event_buffer);
        self.controller.step(dt, |event| events.push(event));
        for event in events.drain(..) {
            self.apply(event);
        }
        self.event_buffer = events;
    }

    fn evaluate(&mut self) {
        let target = self.controller.checkpoints()[self.checkpoint];
        self.best_distance = self.config.distance_sentinel;
        self.best_index = None;
        for (index, agent) in self.agents.iter().enumerate() {
            if agent.is_eliminated() || agent.laps_completed() != self.lap {
                continue;
            }
            let distance = distance(self.controller.position(index), target);
            if distance < self.best_distance {
                self.best_distance = distance;
                self.best_index = Some(index);
            }
        }
    }

    fn checkpoint_candidate(&self) -> Option<usize> {
        let (index, best) = self.best()?;
        (self.best_distance < self.config.distance_threshold && best.laps_completed() == self.lap)
            .then_some(index)
    }

    fn advance_checkpoint(&mut self, best: usize) -> Result<TickOutcome> {
        let checkpoints = self.controller.checkpoints().len();
        self.checkpoint += 1;
        if self.deviation > self.config.deviation_floor {
            self.deviation =
                (self.deviation - self.config.deviation_step).max(self.config.deviation_floor);
        }
        if self.checkpoint >= checkpoints {
            self.checkpoint %= checkpoints;
            self.lap += 1;
        }
        info!(
            checkpoint = self.checkpoint,
            lap = self.lap,
            deviation = self.deviation,
            distance = self.best_distance,
            "checkpoint reached"
        );
        self.best_distance_this_checkpoint = self.config.distance_sentinel;
        self.persist(best);
        self.reset_loop();
        self.regenerate()?;
        self.time_budget += self.config.checkpoint_time_bonus;
        Ok(TickOutcome::CheckpointAdvanced { checkpoint: self.checkpoint, lap: self.lap })
    }

    fn time_out(&mut self) -> Result<TickOutcome> {
        info!(elapsed = self.elapsed, budget = self.time_budget, "time budget exceeded");
        self.reset_loop();
        let progressed = self
            .best()
            .filter(|(_, best)| {
                self.best_distance < self.best_distance_this_checkpoint
                    && best.checkpoint() == self.checkpoint
                    && best.laps_completed() == self.lap
            })
            .map(|(index, _)| index);
        let saved = if let Some(index) = progressed {
            self.best_distance_this_checkpoint = self.best_distance;
            self.persist(index);
            true
        } else {
            false
        };
        self.regenerate()?;
        Ok(TickOutcome::TimedOut { saved })
    }

    /// Saves the network of agent `index` and makes it the parent of the next generation.
    /// A failing store only loses the copy on disk.
    fn persist(&mut self, index: usize) {
        let brain = SavedBrain::from_network(self.agents[index].network());
        match self.store.save(&brain) {
            Ok(()) => info!(agent = index, "brain saved"),
            Err(error) => warn!(%error, "failed to persist brain, keeping it in memory"),
        }
        self.parent = Some(brain);
        self.time_budget += self.config.save_time_bonus;
    }

    fn reset_loop(&mut self) {
        self.elapsed = 0.0;
        self.loops_completed += 1;
    }

    /// Replaces the population with mutations of the parent brain.
    /// Without a usable parent the population falls back to random networks.
    fn regenerate(&mut self) -> Result<()> {
        let parent = match self.parent.take() {
            Some(brain) => Some(brain),
            None => self
                .store
                .load()
                .inspect_err(|error| warn!(%error, "no brain to regenerate from"))
                .ok(),
        };
        let checkpoints = self.controller.checkpoints().len();
        let deviation = Deviation::saturating(self.deviation);
        let mutated = parent.as_ref().and_then(|brain| {
            populate(&self.config, checkpoints, Some((brain, deviation)), &mut self.rng)
                .inspect_err(|error| warn!(%error, "stored brain does not fit the population"))
                .ok()
        });
        self.agents = match mutated {
            Some(agents) => {
                self.parent = parent;
                agents
            },
            None => {
                warn!("regenerating from random networks");
                populate(&self.config, checkpoints, None, &mut self.rng)?
            },
        };
        // indices of the previous population are meaningless now
        self.best_index = None;
        self.controller.respawn(self.agents.len());
        debug!(agents = self.agents.len(), %deviation, "population regenerated");
        Ok(())
    }
}

fn populate(
    config: &TrainerConfig,
    checkpoints: usize,
    parent: Option<(&SavedBrain, Deviation)>,
    rng: &mut StdRng,
) -> Result<Vec<Agent>> {
    let sizes = &config.layer_sizes;
    match parent {
        None => (0..config.population_size)
            .map(|_| Agent::spawn(sizes, BrainSource::Random, checkpoints, rng))
            .collect(),
        Some((brain, deviation)) => {
            let parameters = brain.parameters()?;
            let source = BrainSource::Custom { parameters: &parameters, mutation: Some(deviation) };
            (0..config.population_size)
                .map(|_| Agent::spawn(sizes, source, checkpoints, rng))
                .collect()
        },
    }
}
