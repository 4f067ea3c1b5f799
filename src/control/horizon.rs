//! Prediction model and closed-form solve of the receding-horizon problem.
//!
//! The controlled quantity is a triple integrator driven by jerk, sampled
//! every dt. Over a horizon of H steps, the cart-table ZMP is predicted as
//!
//! z = Px * x_hat + Pu * u
//!
//! where x_hat = [pos; vel; acc] and u is the future jerk sequence.
//!
//! Ref: Biped Walking Pattern Generation by using Preview Control of
//! Zero-Moment Point, Shuuji Kajita and etc., 2003
use itertools::{Itertools, MinMaxResult};
use na::{DMatrix, DVector};
use tracing::trace;

use crate::{
    error::{ConfigError, NumericalError},
    types::Float,
    util::all_finite,
};

/// Smallest accepted reciprocal condition number of the regularized normal
/// matrix.
pub const MIN_RCOND: Float = 1e-12;

/// Longest accepted horizon, in steps.
pub const MAX_HORIZON_STEPS: usize = 10_000;

/// Prediction matrices Px (H x 3) and Pu (H x H).
///
/// The skeleton that only depends on (H, dt) is built once. The parts that
/// depend on the height-over-gravity ratio are rebuilt with [`rebuild`].
///
/// [`rebuild`]: PredictionModel::rebuild
#[derive(Clone, Debug, PartialEq)]
pub struct PredictionModel {
    h: usize,
    dt: Float,
    Px: DMatrix<Float>,
    Pu: DMatrix<Float>,
    Pu0: DMatrix<Float>,
    ramp: DVector<Float>, // (i+1)^2 * dt^2 / 2
    hong: Option<Float>,
}

impl PredictionModel {
    /// Model whose horizon holds floor(horizon / dt) steps.
    pub fn new(horizon: Float, dt: Float) -> Result<Self, ConfigError> {
        validate_dt(dt)?;
        let steps = (horizon / dt).floor();
        if !(steps >= 1.) {
            return Err(ConfigError::EmptyHorizon {
                duration: horizon,
                dt,
            });
        }
        if steps > MAX_HORIZON_STEPS as Float {
            return Err(ConfigError::HorizonTooLong {
                steps,
                max: MAX_HORIZON_STEPS,
            });
        }
        Self::with_steps(steps as usize, dt)
    }

    pub fn with_steps(h: usize, dt: Float) -> Result<Self, ConfigError> {
        validate_dt(dt)?;
        if h == 0 {
            return Err(ConfigError::EmptyHorizon { duration: 0., dt });
        }
        if h > MAX_HORIZON_STEPS {
            return Err(ConfigError::HorizonTooLong {
                steps: h as Float,
                max: MAX_HORIZON_STEPS,
            });
        }

        let mut Px = DMatrix::zeros(h, 3);
        for i in 0..h {
            Px[(i, 0)] = 1.;
            Px[(i, 1)] = (i + 1) as Float * dt;
        }
        let ramp = DVector::from_fn(h, |i, _| ((i + 1) as Float * dt).powi(2) / 2.);

        // Band k below the diagonal: effect of a jerk sample applied k steps
        // earlier, integrated three times.
        let Pu0 = DMatrix::from_fn(h, h, |i, j| {
            if i >= j {
                let k = (i - j) as Float;
                (1. + 3. * k + 3. * k * k) * dt.powi(3) / 6.
            } else {
                0.
            }
        });

        Ok(PredictionModel {
            h,
            dt,
            Px,
            Pu: Pu0.clone(),
            Pu0,
            ramp,
            hong: None,
        })
    }

    /// Update the hong dependent entries of Px and Pu:
    /// Px[i, 2] = (i+1)^2 dt^2 / 2 - hong
    /// Pu[i, j] = Pu0[i, j] - dt * hong, for i >= j
    pub fn rebuild(&mut self, hong: Float) {
        if self.hong == Some(hong) {
            return;
        }

        for (i, r) in self.ramp.iter().enumerate() {
            self.Px[(i, 2)] = r - hong;
        }

        let dt_hong = self.dt * hong;
        self.Pu.copy_from(&self.Pu0);
        for j in 0..self.h {
            for i in j..self.h {
                self.Pu[(i, j)] -= dt_hong;
            }
        }
        self.hong = Some(hong);
    }

    /// Number of steps in the horizon.
    pub fn horizon(&self) -> usize {
        self.h
    }

    pub fn dt(&self) -> Float {
        self.dt
    }

    /// Ratio the matrices were last rebuilt with.
    pub fn hong(&self) -> Option<Float> {
        self.hong
    }

    pub fn Px(&self) -> &DMatrix<Float> {
        &self.Px
    }

    pub fn Pu(&self) -> &DMatrix<Float> {
        &self.Pu
    }
}

fn validate_dt(dt: Float) -> Result<(), ConfigError> {
    if dt > 0. && dt.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidTimeStep(dt))
    }
}

/// Minimize |Pu u - (z_ref - Px x_hat)|^2 + QonR |u|^2 over the future
/// command sequence u:
///
/// u* = -(Pu^T Pu + QonR I)^-1 Pu^T (Px x_hat - z_ref)
///
/// x_hat is 3 x k and z_ref is H x k, one column per controlled DOF. The
/// returned H x k matrix holds the command sequence of each DOF.
pub fn solve_horizon(
    Px: &DMatrix<Float>,
    Pu: &DMatrix<Float>,
    QonR: Float,
    x_hat: &DMatrix<Float>,
    z_ref: &DMatrix<Float>,
) -> Result<DMatrix<Float>, NumericalError> {
    let h = Pu.ncols();
    debug_assert_eq!(Px.ncols(), x_hat.nrows());
    debug_assert_eq!((z_ref.nrows(), z_ref.ncols()), (h, x_hat.ncols()));

    let residual = Px * x_hat - z_ref;
    if !all_finite(&residual) {
        return Err(NumericalError::NonFinite("prediction residual"));
    }

    let normal = Pu.tr_mul(Pu) + DMatrix::from_diagonal_element(h, h, QonR);
    let rhs = Pu.tr_mul(&residual);

    if !all_finite(&normal) {
        return Err(NumericalError::NonFinite("normal matrix"));
    }

    // The normal matrix is symmetric, so its condition number is the ratio
    // of its extreme eigenvalues.
    let rcond = match normal.symmetric_eigenvalues().iter().minmax() {
        MinMaxResult::MinMax(lo, hi) => lo / hi,
        _ => 1.,
    };
    trace!(rcond, "horizon normal matrix conditioning");
    if !(rcond >= MIN_RCOND) {
        return Err(NumericalError::IllConditioned(rcond));
    }

    let chol = normal
        .cholesky()
        .ok_or(NumericalError::NotPositiveDefinite)?;

    let cmd = -chol.solve(&rhs);
    if !all_finite(&cmd) {
        return Err(NumericalError::NonFinite("horizon command"));
    }
    Ok(cmd)
}
