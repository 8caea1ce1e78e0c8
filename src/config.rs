use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, agent::*};

/// How the first generation is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bootstrap {
    /// Start from random networks.
    #[default]
    Random,
    /// Start from mutations of the stored brain, failing when there is none.
    Resume,
}

/// Tunables of the training loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub population_size:       usize,
    pub layer_sizes:           Vec<usize>,
    /// Distance to the target checkpoint that counts as reaching it.
    pub distance_threshold:    f32,
    /// Starting value of the best distances before any agent was measured.
    pub distance_sentinel:     f32,
    pub initial_deviation:     f32,
    /// Amount the deviation shrinks by on every checkpoint advance.
    pub deviation_step:        f32,
    pub deviation_floor:       f32,
    /// Seconds a generation may run before it is timed out.
    pub time_budget:           f32,
    pub checkpoint_time_bonus: f32,
    pub save_time_bonus:       f32,
    pub bootstrap:             Bootstrap,
    pub seed:                  Option<u64>,
}
impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            population_size:       100,
            layer_sizes:           vec![15, 10, 5],
            distance_threshold:    5.0,
            distance_sentinel:     10_000.0,
            initial_deviation:     0.2,
            deviation_step:        0.02,
            deviation_floor:       0.07,
            time_budget:           10.0,
            checkpoint_time_bonus: 5.0,
            save_time_bonus:       0.1,
            bootstrap:             Bootstrap::Random,
            seed:                  None,
        }
    }
}
impl TrainerConfig {
    /// Reads a JSON config, missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_error = |source: Box<dyn std::error::Error + Send + Sync>| Error::Config {
            path: path.to_owned(),
            source,
        };
        let json = fs::read_to_string(path).map_err(|e| config_error(e.into()))?;
        let config: Self = serde_json::from_str(&json).map_err(|e| config_error(e.into()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_topology(&self.layer_sizes)?;
        let invalid = |message: &str| Err(Error::InvalidConfig(message.to_owned()));
        if self.population_size == 0 {
            return invalid("population_size must be positive");
        }
        if self.layer_sizes[self.layer_sizes.len() - 1] != ACTUATION_WIDTH {
            return invalid("the last layer must have one node per actuation flag");
        }
        if self.layer_sizes[0] < PROPRIOCEPTION_WIDTH {
            return invalid("the first layer is too small for the proprioceptive inputs");
        }
        for (name, value) in [
            ("initial_deviation", self.initial_deviation),
            ("deviation_step", self.deviation_step),
            ("deviation_floor", self.deviation_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!("{name} must be within [0, 1]")));
            }
        }
        if !(self.distance_threshold > 0.0 && self.distance_sentinel > self.distance_threshold) {
            return invalid("distance_sentinel must exceed a positive distance_threshold");
        }
        if !(self.time_budget > 0.0) || self.checkpoint_time_bonus < 0.0 || self.save_time_bonus < 0.0
        {
            return invalid("time budget must be positive and bonuses non-negative");
        }
        Ok(())
    }
}
