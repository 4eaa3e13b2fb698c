use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::debug;
use thiserror::Error;

use crate::loading::{load_txt, Delimiter};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("x has {x} values but y has {y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("Observation {index} is not finite")]
    NonFinite { index: usize },
}

/// Observed `(x, y)` pairs, fixed for the lifetime of a sampling run.
///
/// Models hold an `Arc<Dataset>`, so any number of particles can read the
/// same observations without copying or locking.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Box<[f64]>,
    y: Box<[f64]>,
}

impl Dataset {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, DataError> {
        if x.len() != y.len() {
            return Err(DataError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if let Some(index) = x
            .iter()
            .zip(&y)
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(DataError::NonFinite { index });
        }
        debug!("Created dataset with {} observations", x.len());
        Ok(Self {
            x: x.into(),
            y: y.into(),
        })
    }

    /// Read a whitespace separated file with `x` in the first column and `y`
    /// in the second. Further columns are ignored.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let table = load_txt(path, Delimiter::Whitespace)
            .with_context(|| format!("Failed to read data file: {:?}", path))?;
        if table.nrow() > 0 && table.ncol < 2 {
            bail!(
                "Data file {:?} needs at least two columns, found {}",
                path,
                table.ncol
            );
        }
        let x = table.column(0).unwrap_or_default();
        let y = table.column(1).unwrap_or_default();
        let data = Self::new(x, y).with_context(|| format!("Invalid data in {:?}", path))?;
        Ok(Arc::new(data))
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}
