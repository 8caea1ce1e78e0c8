use serde::{Deserialize, Serialize};

/// Number of proprioceptive values appended after the ray distances.
pub const PROPRIOCEPTION_WIDTH: usize = 4;
/// Number of actuation flags decoded from the network output.
pub const ACTUATION_WIDTH: usize = 5;
/// Ray distance reported for a miss, as a multiple of the sight distance.
pub const NO_HIT_FACTOR: f32 = 5.0;

/// Distance reading of a single sensor ray.
/// Misses are mapped to a sentinel well beyond the sight distance.
pub fn ray_distance(hit: Option<f32>, sight_distance: f32) -> f32 {
    hit.unwrap_or(sight_distance * NO_HIT_FACTOR)
}

/// Angles (in degrees, relative to the heading) of a symmetric fan of `count` rays.
pub fn ray_fan(count: usize, spacing: f32) -> impl Iterator<Item = f32> {
    let center = (count as f32 - 1.0) / 2.0;
    (0..count).map(move |i| spacing * (i as f32 - center))
}

/// Network input width for a body with `sensors` rays.
pub fn input_width(sensors: usize) -> usize {
    sensors + PROPRIOCEPTION_WIDTH
}

/// Internal state of the vehicle that is fed to the network next to the rays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Proprioception {
    pub speed:         f32,
    pub steering_axis: f32,
    pub throttle_axis: f32,
    pub drifting:      bool,
}
impl Proprioception {
    pub fn to_array(self) -> [f32; PROPRIOCEPTION_WIDTH] {
        [self.speed, self.steering_axis, self.throttle_axis, if self.drifting { 1.0 } else { 0.0 }]
    }
}

/// Commands sent to the vehicle after each network step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actuation {
    pub accelerate:       bool,
    pub reverse:          bool,
    pub steer_left:       bool,
    pub steer_right:      bool,
    pub handbrake:        bool,
    /// One-shot signal raised on the step the handbrake is released.
    pub recover_traction: bool,
}
impl Actuation {
    /// Decodes network outputs, every positive output enables its flag.
    ///
    /// `handbrake_was_active` is the handbrake state of the previous step.
    pub fn decode(outputs: &[f32], handbrake_was_active: bool) -> Self {
        assert!(outputs.len() == ACTUATION_WIDTH, "wrong number of outputs");
        let flag = |i: usize| outputs[i] > 0.0;
        let handbrake = flag(4);
        Self {
            accelerate: flag(0),
            reverse: flag(1),
            steer_left: flag(2),
            steer_right: flag(3),
            handbrake,
            recover_traction: handbrake_was_active && !handbrake,
        }
    }
}
