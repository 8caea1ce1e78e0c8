use std::fmt::Debug;

use super::*;

pub type Position = [f32; 3];

pub fn distance(a: Position, b: Position) -> f32 {
    a.iter().zip(b).map(|(a, b)| (a - b) * (a - b)).sum::<f32>().sqrt()
}

/// Events raised by the simulation while it advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ObstacleHit { agent: usize, kind: ObstacleKind },
    CheckpointReached { agent: usize, index: usize },
}

/// Interface to the simulation the agents are driving in.
///
/// Agents are addressed by their index in the population,
/// the index range is set by the latest call to [`Controller::respawn`].
pub trait Controller: Debug {
    /// Positions of the checkpoints in lap order.
    fn checkpoints(&self) -> &[Position];

    /// Replaces all vehicles with `count` new ones at the start line.
    fn respawn(&mut self, count: usize);

    /// Writes the ray distances of `agent` into `rays` and returns its body state.
    fn read_sensors(&mut self, agent: usize, rays: &mut [f32]) -> Proprioception;

    fn perform_actions(&mut self, agent: usize, actuation: Actuation);

    fn position(&self, agent: usize) -> Position;

    /// Advances the world state by `dt` seconds.
    #[allow(unused_variables)]
    fn step(&mut self, dt: f32, emit: impl FnMut(Event)) {}
}
