use rand::Rng;

use crate::{Error, Result};

pub mod body;
pub mod brain;
pub mod genome;
pub mod layer;

pub use body::*;
pub use brain::*;
pub use genome::*;
pub use layer::*;

/// Where the parameters of a freshly spawned [`Agent`] come from.
#[derive(Debug, Clone, Copy)]
pub enum BrainSource<'p> {
    Random,
    Custom { parameters: &'p Parameters, mutation: Option<Deviation> },
}

/// Obstacle categories reported by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleKind {
    /// Leaving the track, eliminates the agent.
    TerrainHazard,
    Other,
}

/// Single individual of the population: a [`Network`] plus its progress on the track.
#[derive(Debug, Clone)]
pub struct Agent {
    network:          Network,
    checkpoint_count: usize,
    eliminated:       bool,
    checkpoint:       usize,
    laps:             usize,
    mutation:         Option<Deviation>,
    handbrake_active: bool,
}
impl Agent {
    /// Builds the network for `sizes` and fills it from `source`.
    /// `checkpoint_count` is the number of checkpoints per lap.
    pub fn spawn(
        sizes: &[usize],
        source: BrainSource<'_>,
        checkpoint_count: usize,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        if checkpoint_count == 0 {
            return Err(Error::NoCheckpoints);
        }
        let mut network = Network::new(sizes)?;
        if network.output_width() != ACTUATION_WIDTH {
            return Err(Error::ShapeMismatch {
                what:     "network outputs",
                expected: (1, ACTUATION_WIDTH),
                found:    (1, network.output_width()),
            });
        }
        let mutation = match source {
            BrainSource::Random => {
                network.randomize_all(rng);
                None
            },
            BrainSource::Custom { parameters, mutation } => {
                parameters.apply_to(&mut network)?;
                if let Some(deviation) = mutation {
                    network.mutate_all(deviation, rng);
                }
                mutation
            },
        };
        Ok(Self {
            network,
            checkpoint_count,
            eliminated: false,
            checkpoint: 0,
            laps: 0,
            mutation,
            handbrake_active: false,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    /// Index of the last checkpoint this agent passed through.
    pub fn checkpoint(&self) -> usize {
        self.checkpoint
    }

    pub fn laps_completed(&self) -> usize {
        self.laps
    }

    /// Deviation this agent was mutated with on spawn, if any.
    pub fn mutation(&self) -> Option<Deviation> {
        self.mutation
    }

    /// Width of the ray part of the sensor input.
    pub fn sensor_count(&self) -> usize {
        self.network.input_width().saturating_sub(PROPRIOCEPTION_WIDTH)
    }

    /// Runs the network on one frame of sensor data.
    pub fn step(&mut self, rays: &[f32], body: Proprioception) -> Result<Actuation> {
        let width = self.network.input_width();
        if rays.len() + PROPRIOCEPTION_WIDTH != width {
            return Err(Error::ShapeMismatch {
                what:     "sensor input",
                expected: (1, width),
                found:    (1, rays.len() + PROPRIOCEPTION_WIDTH),
            });
        }
        let mut input = Vec::with_capacity(width);
        input.extend_from_slice(rays);
        input.extend(body.to_array());
        let outputs = self.network.forward_pass(&input);
        let actuation = Actuation::decode(&outputs, self.handbrake_active);
        self.handbrake_active = actuation.handbrake;
        Ok(actuation)
    }

    pub fn on_obstacle_hit(&mut self, kind: ObstacleKind) {
        if kind == ObstacleKind::TerrainHazard {
            self.eliminated = true;
        }
    }

    pub fn on_checkpoint_reached(&mut self, index: usize) {
        if self.checkpoint == self.checkpoint_count - 1 && index == 0 {
            self.laps += 1;
        }
        self.checkpoint = index;
    }
}
