use rand::Rng;
use thin_vec::ThinVec;

use super::layer::*;
use crate::{Error, Result};

/// Checks that `sizes` describe a network with at least one layer and no empty layers.
pub fn validate_topology(sizes: &[usize]) -> Result<()> {
    if sizes.len() < 2 || sizes.contains(&0) {
        return Err(Error::InvalidTopology { sizes: sizes.to_vec() });
    }
    Ok(())
}

/// Feed-forward network made of fully connected [`Layer`]s.
///
/// The input layer has no parameters, so a network built from `n` layer sizes owns `n - 1` layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    sizes:  ThinVec<usize>,
    layers: ThinVec<Layer>,
}
impl Network {
    /// Creates a zeroed network.
    pub fn new(sizes: &[usize]) -> Result<Self> {
        validate_topology(sizes)?;
        let layers = sizes.windows(2).map(|pair| Layer::new(pair[0], pair[1])).collect();
        Ok(Self { sizes: sizes.iter().copied().collect(), layers })
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn input_width(&self) -> usize {
        self.sizes[0]
    }

    pub fn output_width(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }

    pub fn randomize_all(&mut self, rng: &mut impl Rng) {
        self.layers.iter_mut().for_each(|layer| layer.randomize(rng));
    }

    /// Copies externally supplied parameters into every layer.
    /// Layers before the first mismatching one will already be overwritten on error.
    pub fn set_custom_all(
        &mut self,
        weights: &[Matrix],
        biases: &[impl AsRef<[f32]>],
    ) -> Result<()> {
        let layers = self.layers.len();
        if weights.len() != layers || biases.len() != layers {
            return Err(Error::ShapeMismatch {
                what:     "layer count",
                expected: (layers, layers),
                found:    (weights.len(), biases.len()),
            });
        }
        for ((layer, weights), biases) in self.layers.iter_mut().zip(weights).zip(biases) {
            layer.set_custom(weights, biases.as_ref())?;
        }
        Ok(())
    }

    pub fn mutate_all(&mut self, deviation: Deviation, rng: &mut impl Rng) {
        self.layers.iter_mut().for_each(|layer| layer.mutate(deviation, rng));
    }

    pub fn forward_pass(&self, input: &[f32]) -> Vec<f32> {
        let (first, rest) = self.layers.split_first().expect("network has at least one layer");
        rest.iter().fold(first.forward(input), |signal, layer| layer.forward(&signal))
    }
}
