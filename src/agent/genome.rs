//! Flat encoding of [`Network`] parameters.
//!
//! Weights of layer `l` are stored output node major: the weight from input `i` to output `o`
//! lives at `offset_l + o * in_l + i` where `offset_l` counts the weights of all earlier layers.
//! Biases are stored per layer in node order.

use serde::{Deserialize, Serialize};
use thin_vec::ThinVec;

use super::{brain::*, layer::*};
use crate::{Error, Result};

/// Persisted parameters of a single [`Network`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedBrain {
    pub layer_sizes: ThinVec<usize>,
    pub weights:     ThinVec<f32>,
    pub biases:      ThinVec<f32>,
}
impl SavedBrain {
    pub fn from_network(network: &Network) -> Self {
        Self {
            layer_sizes: network.layer_sizes().iter().copied().collect(),
            weights:     flatten_weights(network),
            biases:      flatten_biases(network),
        }
    }

    /// Expands the flat buffers back into per layer parameters.
    pub fn parameters(&self) -> Result<Parameters> {
        Ok(Parameters {
            weights: expand_weights(&self.layer_sizes, &self.weights)?,
            biases:  expand_biases(&self.layer_sizes, &self.biases)?,
        })
    }
}

/// Per layer parameters in the shape [`Network::set_custom_all`] expects.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub weights: Vec<Matrix>,
    pub biases:  Vec<ThinVec<f32>>,
}
impl Parameters {
    pub fn of(network: &Network) -> Self {
        Self {
            weights: network.layers().iter().map(|layer| layer.weights().clone()).collect(),
            biases:  network.layers().iter().map(|layer| ThinVec::from(layer.biases())).collect(),
        }
    }

    pub fn apply_to(&self, network: &mut Network) -> Result<()> {
        network.set_custom_all(&self.weights, &self.biases)
    }
}

pub fn weight_count(sizes: &[usize]) -> usize {
    sizes.windows(2).map(|pair| pair[0] * pair[1]).sum()
}

pub fn bias_count(sizes: &[usize]) -> usize {
    sizes.iter().skip(1).sum()
}

pub fn flatten_weights(network: &Network) -> ThinVec<f32> {
    let mut flat = ThinVec::with_capacity(weight_count(network.layer_sizes()));
    for layer in network.layers() {
        let weights = layer.weights();
        for output in 0..weights.cols() {
            for input in 0..weights.rows() {
                flat.push(weights[(input, output)]);
            }
        }
    }
    flat
}

pub fn flatten_biases(network: &Network) -> ThinVec<f32> {
    network.layers().iter().flat_map(|layer| layer.biases().iter().copied()).collect()
}

pub fn expand_weights(sizes: &[usize], flat: &[f32]) -> Result<Vec<Matrix>> {
    validate_topology(sizes)?;
    check_length("weights", weight_count(sizes), flat.len())?;
    let mut offset = 0;
    Ok(sizes
        .windows(2)
        .map(|pair| {
            let (inputs, outputs) = (pair[0], pair[1]);
            let layer = &flat[offset..offset + inputs * outputs];
            offset += inputs * outputs;
            Matrix::from_fn(inputs, outputs, |input, output| layer[output * inputs + input])
        })
        .collect())
}

pub fn expand_biases(sizes: &[usize], flat: &[f32]) -> Result<Vec<ThinVec<f32>>> {
    validate_topology(sizes)?;
    check_length("biases", bias_count(sizes), flat.len())?;
    let mut rest = flat;
    Ok(sizes[1..]
        .iter()
        .map(|&outputs| {
            let (layer, tail) = rest.split_at(outputs);
            rest = tail;
            ThinVec::from(layer)
        })
        .collect())
}

fn check_length(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(Error::LengthMismatch { what, expected, found });
    }
    Ok(())
}
