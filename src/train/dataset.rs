use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::array;
use serde::Deserialize;

use crate::error::{Error, PersistenceError, Result};
use crate::math::tensor::{from_rows, select_rows, Tensor2D};

/// Paired input and target rows.
#[derive(Debug, Clone)]
pub struct Dataset {
    inputs: Tensor2D,
    targets: Tensor2D,
}

/// On-disk layout accepted by [`Dataset::load_json`].
#[derive(Deserialize)]
struct DatasetFile {
    inputs: Vec<Vec<f32>>,
    targets: Vec<Vec<f32>>,
}

impl Dataset {
    /// Pairs `inputs` with `targets`; both need the same, non-zero number of rows.
    pub fn new(inputs: Tensor2D, targets: Tensor2D) -> Result<Dataset> {
        if inputs.nrows() == 0 {
            return Err(Error::config("dataset has no samples"));
        }
        if inputs.nrows() != targets.nrows() {
            return Err(Error::shape("dataset targets", &[inputs.nrows()], &[targets.nrows()]));
        }
        if inputs.ncols() == 0 || targets.ncols() == 0 {
            return Err(Error::config("dataset rows must not be empty"));
        }
        Ok(Dataset { inputs, targets })
    }

    pub fn from_rows(inputs: &[Vec<f32>], targets: &[Vec<f32>]) -> Result<Dataset> {
        Dataset::new(from_rows(inputs)?, from_rows(targets)?)
    }

    /// Reads `{ "inputs": [[..]], "targets": [[..]] }`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PersistenceError::io(path, e))?;
        let raw: DatasetFile =
            serde_json::from_reader(BufReader::new(file)).map_err(PersistenceError::Format)?;
        let dataset = Dataset::from_rows(&raw.inputs, &raw.targets)?;
        tracing::debug!(path = %path.display(), samples = dataset.len(), "loaded dataset");
        Ok(dataset)
    }

    /// The four XOR samples with single-column targets.
    pub fn xor() -> Dataset {
        Dataset {
            inputs: array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]],
            targets: array![[0.0], [1.0], [1.0], [0.0]],
        }
    }

    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.nrows() == 0
    }

    pub fn input_size(&self) -> usize {
        self.inputs.ncols()
    }

    pub fn output_size(&self) -> usize {
        self.targets.ncols()
    }

    pub fn inputs(&self) -> &Tensor2D {
        &self.inputs
    }

    pub fn targets(&self) -> &Tensor2D {
        &self.targets
    }

    /// Gathers the rows at `indices` from both tensors.
    pub fn batch(&self, indices: &[usize]) -> (Tensor2D, Tensor2D) {
        (select_rows(&self.inputs, indices), select_rows(&self.targets, indices))
    }
}
