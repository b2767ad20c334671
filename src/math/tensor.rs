use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Dimension};
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::Rng;

use crate::error::{Error, Result};

/// Dense row-major buffer: rows are samples (or input units), columns are
/// features (or output units).
pub type Tensor2D = Array2<f32>;

/// One value per output unit; used for biases.
pub type Vector1D = Array1<f32>;

/// He initialization: samples from N(0, sqrt(2 / fan_in)).
///
/// Recommended before ReLU layers. The variance 2/fan_in accounts for
/// the fact that ReLU zeroes half of its inputs on average.
///
/// Shape: (fan_in, fan_out), matching the `input_size × output_size` weight
/// layout of a dense layer.
pub fn he<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Result<Tensor2D> {
    normal(fan_in, fan_out, (2.0 / fan_in as f32).sqrt(), rng)
}

/// Xavier (Glorot) initialization: samples from N(0, sqrt(1 / fan_in)).
///
/// Recommended before Sigmoid/Tanh/Linear layers. Keeps the variance of
/// activations and gradients roughly equal across layers.
pub fn xavier<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Result<Tensor2D> {
    normal(fan_in, fan_out, (1.0 / fan_in as f32).sqrt(), rng)
}

fn normal<R: Rng + ?Sized>(rows: usize, cols: usize, std_dev: f32, rng: &mut R) -> Result<Tensor2D> {
    let dist = Normal::new(0.0_f32, std_dev)
        .map_err(|e| Error::config(format!("invalid init std-dev {std_dev}: {e}")))?;
    Ok(Array2::random_using((rows, cols), dist, rng))
}

/// Builds a tensor from equal-length rows. Ragged input is a shape error.
pub fn from_rows(rows: &[Vec<f32>]) -> Result<Tensor2D> {
    let cols = rows.first().map(Vec::len).unwrap_or(0);
    let mut flat = Vec::with_capacity(rows.len() * cols);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != cols {
            return Err(Error::shape(format!("row {i}"), &[cols], &[row.len()]));
        }
        flat.extend_from_slice(row);
    }
    Array2::from_shape_vec((rows.len(), cols), flat)
        .map_err(|e| Error::config(format!("cannot build tensor: {e}")))
}

/// Gathers the given rows (in order) into a new tensor.
pub fn select_rows(t: &Tensor2D, indices: &[usize]) -> Tensor2D {
    t.select(Axis(0), indices)
}

pub fn ensure_shape(context: &str, expected: &[usize], actual: &[usize]) -> Result<()> {
    if expected != actual {
        return Err(Error::shape(context, expected, actual));
    }
    Ok(())
}

/// Fails with `NonFiniteValue` if any entry is NaN or infinite.
pub fn ensure_finite<S, D>(context: &str, values: &ArrayBase<S, D>) -> Result<()>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(Error::NonFiniteValue(context.to_string()))
    }
}
