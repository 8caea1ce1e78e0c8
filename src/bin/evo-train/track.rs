//! Ring shaped test track: the road lies between two concentric circles on the XZ plane.

use std::f32::consts::TAU;

use evo_drive::{agent::*, world::*};

const INNER_RADIUS: f32 = 20.0;
const OUTER_RADIUS: f32 = 40.0;
const SIGHT_DISTANCE: f32 = 40.0;
const RAY_SPACING: f32 = 18.0;
const CHECKPOINT_COUNT: usize = 10;
const TRIGGER_RADIUS: f32 = 3.0;

const MAX_SPEED: f32 = 20.0;
const MAX_REVERSE_SPEED: f32 = 5.0;
const ACCELERATION: f32 = 12.0;
const DRAG: f32 = 0.4;
const HANDBRAKE_DRAG: f32 = 6.0;
const AXIS_RATE: f32 = 4.0;
const TURN_RATE: f32 = 2.5;
const DRIFT_TURN_FACTOR: f32 = 1.5;

#[derive(Debug, Clone, Default)]
struct Car {
    x:        f32,
    z:        f32,
    heading:  f32,
    speed:    f32,
    steering: f32,
    throttle: f32,
    drifting: bool,
    crashed:  bool,
    trigger:  Option<usize>,
    command:  Actuation,
}
impl Car {
    fn at_start() -> Self {
        let radius = (INNER_RADIUS + OUTER_RADIUS) / 2.0;
        Self { x: radius, heading: TAU / 4.0, ..Default::default() }
    }

    fn position(&self) -> Position {
        [self.x, 0.0, self.z]
    }

    fn integrate(&mut self, dt: f32) {
        let command = self.command;
        let throttle = match (command.accelerate, command.reverse) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };
        let steering = match (command.steer_left, command.steer_right) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };
        self.throttle = approach(self.throttle, throttle, AXIS_RATE * dt);
        self.steering = approach(self.steering, steering, AXIS_RATE * dt);
        if command.handbrake {
            self.drifting = true;
        }
        if command.recover_traction {
            self.drifting = false;
        }

        let drag = DRAG + if command.handbrake { HANDBRAKE_DRAG } else { 0.0 };
        self.speed += (self.throttle * ACCELERATION - drag * self.speed) * dt;
        self.speed = self.speed.clamp(-MAX_REVERSE_SPEED, MAX_SPEED);
        let grip = if self.drifting { DRIFT_TURN_FACTOR } else { 1.0 };
        self.heading += self.steering * TURN_RATE * grip * (self.speed / MAX_SPEED) * dt;
        self.x += self.heading.cos() * self.speed * dt;
        self.z += self.heading.sin() * self.speed * dt;
    }

    fn on_road(&self) -> bool {
        (INNER_RADIUS..=OUTER_RADIUS).contains(&self.x.hypot(self.z))
    }

    /// Distance along a ray at `angle` radians until it leaves the road.
    fn cast(&self, angle: f32) -> Option<f32> {
        let (dx, dz) = (angle.cos(), angle.sin());
        let b = self.x * dx + self.z * dz;
        let origin = self.x * self.x + self.z * self.z;
        [INNER_RADIUS, OUTER_RADIUS]
            .into_iter()
            .filter_map(|radius| {
                let disc = b * b - (origin - radius * radius);
                if disc < 0.0 {
                    return None;
                }
                let root = disc.sqrt();
                [-b - root, -b + root].into_iter().find(|t| *t > 0.0)
            })
            .min_by(f32::total_cmp)
            .filter(|t| *t <= SIGHT_DISTANCE)
    }
}

fn approach(current: f32, target: f32, step: f32) -> f32 {
    current + (target - current).clamp(-step, step)
}

#[derive(Debug)]
pub struct RingTrack {
    checkpoints: Vec<Position>,
    cars:        Vec<Car>,
}
impl RingTrack {
    pub fn new() -> Self {
        let radius = (INNER_RADIUS + OUTER_RADIUS) / 2.0;
        let checkpoints = (0..CHECKPOINT_COUNT)
            .map(|k| {
                let angle = TAU * (k as f32 + 0.5) / CHECKPOINT_COUNT as f32;
                [radius * angle.cos(), 0.0, radius * angle.sin()]
            })
            .collect();
        Self { checkpoints, cars: Vec::new() }
    }
}
impl Default for RingTrack {
    fn default() -> Self {
        Self::new()
    }
}
impl Controller for RingTrack {
    fn checkpoints(&self) -> &[Position] {
        &self.checkpoints
    }

    fn respawn(&mut self, count: usize) {
        self.cars.clear();
        self.cars.resize_with(count, Car::at_start);
    }

    fn read_sensors(&mut self, agent: usize, rays: &mut [f32]) -> Proprioception {
        let car = &self.cars[agent];
        let count = rays.len();
        for (ray, angle) in rays.iter_mut().zip(ray_fan(count, RAY_SPACING)) {
            *ray = ray_distance(car.cast(car.heading + angle.to_radians()), SIGHT_DISTANCE);
        }
        Proprioception {
            speed:         car.speed,
            steering_axis: car.steering,
            throttle_axis: car.throttle,
            drifting:      car.drifting,
        }
    }

    fn perform_actions(&mut self, agent: usize, actuation: Actuation) {
        self.cars[agent].command = actuation;
    }

    fn position(&self, agent: usize) -> Position {
        self.cars[agent].position()
    }

    fn step(&mut self, dt: f32, mut emit: impl FnMut(Event)) {
        for (agent, car) in self.cars.iter_mut().enumerate() {
            if car.crashed {
                continue;
            }
            car.integrate(dt);
            if !car.on_road() {
                car.crashed = true;
                car.speed = 0.0;
                emit(Event::ObstacleHit { agent, kind: ObstacleKind::TerrainHazard });
                continue;
            }
            let position = car.position();
            let trigger = self
                .checkpoints
                .iter()
                .position(|checkpoint| distance(position, *checkpoint) < TRIGGER_RADIUS);
            if let Some(index) = trigger.filter(|index| car.trigger != Some(*index)) {
                emit(Event::CheckpointReached { agent, index });
            }
            car.trigger = trigger;
        }
    }
}
