use na::{DMatrix, DVector};

use crate::{error::ConfigError, types::Float};

/// Feedback gain, broadcast to a square operator when applied.
#[derive(Clone, Debug, PartialEq)]
pub enum Gain {
    Scalar(Float),
    Diagonal(DVector<Float>),
    Matrix(DMatrix<Float>),
}

impl Gain {
    /// Check that the gain can act as a square operator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = match self {
            Gain::Scalar(k) => k.is_finite(),
            Gain::Diagonal(d) => d.iter().all(|k| k.is_finite()),
            Gain::Matrix(m) => {
                if !m.is_square() {
                    return Err(ConfigError::NonSquareGain {
                        rows: m.nrows(),
                        cols: m.ncols(),
                    });
                }
                m.iter().all(|k| k.is_finite())
            }
        };
        if !finite {
            return Err(ConfigError::NonFiniteGain);
        }
        Ok(())
    }

    /// Fallback derivative gain when none is given: Kd = 2 * sqrt(Kp),
    /// elementwise. This critically damps each decoupled axis of a unit mass.
    pub fn critically_damped(Kp: &Gain) -> Result<Gain, ConfigError> {
        Kp.validate()?;
        let damp = |k: Float| {
            if k < 0. {
                Err(ConfigError::NegativeGain(k))
            } else {
                Ok(2. * k.sqrt())
            }
        };
        let Kd = match Kp {
            Gain::Scalar(k) => Gain::Scalar(damp(*k)?),
            Gain::Diagonal(d) => {
                let entries = d.iter().map(|k| damp(*k)).collect::<Result<Vec<_>, _>>()?;
                Gain::Diagonal(DVector::from_vec(entries))
            }
            Gain::Matrix(m) => {
                let entries = m.iter().map(|k| damp(*k)).collect::<Result<Vec<_>, _>>()?;
                Gain::Matrix(DMatrix::from_vec(m.nrows(), m.ncols(), entries))
            }
        };
        Ok(Kd)
    }

    /// Operator size, or None for a scalar which broadcasts to any size.
    pub fn dim(&self) -> Option<usize> {
        match self {
            Gain::Scalar(_) => None,
            Gain::Diagonal(d) => Some(d.len()),
            Gain::Matrix(m) => Some(m.nrows()),
        }
    }

    /// Dense n x n form of the gain.
    pub fn to_matrix(&self, n: usize) -> Result<DMatrix<Float>, ConfigError> {
        self.check_dim(n)?;
        Ok(match self {
            Gain::Scalar(k) => DMatrix::from_diagonal_element(n, n, *k),
            Gain::Diagonal(d) => DMatrix::from_diagonal(d),
            Gain::Matrix(m) => m.clone(),
        })
    }

    pub fn apply(&self, v: &DVector<Float>) -> Result<DVector<Float>, ConfigError> {
        self.check_dim(v.len())?;
        Ok(match self {
            Gain::Scalar(k) => v * *k,
            Gain::Diagonal(d) => d.component_mul(v),
            Gain::Matrix(m) => m * v,
        })
    }

    fn check_dim(&self, n: usize) -> Result<(), ConfigError> {
        match self.dim() {
            Some(dim) if dim != n => Err(ConfigError::DimensionMismatch {
                what: "gain",
                expected: dim,
                got: n,
            }),
            _ => Ok(()),
        }
    }
}

impl From<Float> for Gain {
    fn from(k: Float) -> Self {
        Gain::Scalar(k)
    }
}

impl From<DVector<Float>> for Gain {
    fn from(d: DVector<Float>) -> Self {
        Gain::Diagonal(d)
    }
}

impl From<DMatrix<Float>> for Gain {
    fn from(m: DMatrix<Float>) -> Self {
        Gain::Matrix(m)
    }
}
