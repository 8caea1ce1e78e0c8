use std::{
    fmt::Display,
    ops::{Index, IndexMut, RangeInclusive},
};

use rand::Rng;
use thin_vec::ThinVec;
use typed_floats::PositiveFinite;

use crate::{Error, Result};

/// Range every freshly drawn parameter is sampled from.
pub const PARAMETER_RANGE: RangeInclusive<f32> = -1.0..=1.0;

/// Interpolation factor in `[0, 1]` used when mutating parameters.
///
/// `0` keeps a parameter as is, `1` replaces it with a fresh random draw.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Deviation(PositiveFinite<f32>);
impl Deviation {
    /// Accepts values in `[0, 1]`, `-0.0` is read as `0`.
    pub fn new(value: f32) -> Result<Self> {
        // `+0.0` turns `-0.0` into `0.0`, which `PositiveFinite` excludes otherwise
        let value = value + 0.0;
        if value > 1.0 {
            return Err(Error::InvalidDeviation(value));
        }
        PositiveFinite::<f32>::try_from(value)
            .map(Self)
            .map_err(|_| Error::InvalidDeviation(value))
    }

    /// Clamps `value` into `[0, 1]`, mapping NaN to `0`.
    pub fn saturating(value: f32) -> Self {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        Self::new(value).unwrap_or_else(|_| unreachable!("clamped into range"))
    }

    pub fn get(self) -> f32 {
        f32::from(self.0)
    }
}
impl Display for Deviation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.get())
    }
}

/// Dense row-major matrix, rows are input nodes and columns are output nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: ThinVec<f32>,
}
impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::from_fn(rows, cols, |_, _| 0.0)
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = ThinVec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(f(row, col));
            }
        }
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut f32> {
        self.data.iter_mut()
    }
}
impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        &self.data[row * self.cols + col]
    }
}
impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        &mut self.data[row * self.cols + col]
    }
}

/// Fully connected layer with ReLU activation.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    weights: Matrix,
    biases:  ThinVec<f32>,
}
impl Layer {
    /// Creates a layer with all weights and biases set to zero.
    pub fn new(input_width: usize, output_width: usize) -> Self {
        let mut biases = ThinVec::with_capacity(output_width);
        biases.resize(output_width, 0.0);
        Self { weights: Matrix::zeros(input_width, output_width), biases }
    }

    pub fn input_width(&self) -> usize {
        self.weights.rows()
    }

    pub fn output_width(&self) -> usize {
        self.weights.cols()
    }

    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    pub fn randomize(&mut self, rng: &mut impl Rng) {
        self.parameters_mut().for_each(|value| *value = rng.gen_range(PARAMETER_RANGE));
    }

    pub fn set_custom(&mut self, weights: &Matrix, biases: &[f32]) -> Result<()> {
        if weights.shape() != self.weights.shape() {
            return Err(Error::ShapeMismatch {
                what:     "layer weights",
                expected: self.weights.shape(),
                found:    weights.shape(),
            });
        }
        if biases.len() != self.biases.len() {
            return Err(Error::ShapeMismatch {
                what:     "layer biases",
                expected: (1, self.biases.len()),
                found:    (1, biases.len()),
            });
        }
        self.weights.clone_from(weights);
        self.biases.clear();
        self.biases.extend_from_slice(biases);
        Ok(())
    }

    /// Moves every parameter towards a fresh random draw by `deviation`.
    pub fn mutate(&mut self, deviation: Deviation, rng: &mut impl Rng) {
        let t = deviation.get();
        self.parameters_mut().for_each(|value| {
            let target = rng.gen_range(PARAMETER_RANGE);
            *value += (target - *value) * t;
        });
    }

    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        assert!(input.len() == self.input_width(), "wrong number of inputs");
        (0..self.output_width())
            .map(|output| {
                let sum = input
                    .iter()
                    .enumerate()
                    .map(|(i, x)| x * self.weights[(i, output)])
                    .sum::<f32>();
                relu(sum + self.biases[output])
            })
            .collect()
    }

    fn parameters_mut(&mut self) -> impl Iterator<Item = &mut f32> {
        self.weights.iter_mut().chain(self.biases.iter_mut())
    }
}

#[inline(always)]
fn relu(x: f32) -> f32 {
    if x < 0.0 { 0.0 } else { x }
}
