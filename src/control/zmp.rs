use itertools::izip;
use na::{DMatrix, DVector, Vector3};
use tracing::{debug, trace};

use crate::{
    error::{ConfigError, ControlError, NumericalError, Result},
    goal::GoalValue,
    reference::ReferenceWindow,
    types::Float,
    world::SimContext,
    SAMPLING_TOLERANCE,
};

use super::{
    horizon::{solve_horizon, PredictionModel},
    weight::{WeightHandle, Weighted},
    Controller, TwistController,
};

#[derive(Clone, Debug, PartialEq)]
pub struct ZmpConfig {
    /// Preview horizon in seconds.
    pub horizon: Float,
    /// Fixed sampling interval. The prediction matrices are built for it.
    pub dt: Float,
    /// Ratio between the tracking and command weights of the horizon cost.
    pub QonR: Float,
    /// Controlled axes among x=0, y=1, z=2.
    pub cdof: Vec<usize>,
}

impl Default for ZmpConfig {
    fn default() -> Self {
        Self {
            horizon: 1.0,
            dt: 0.01,
            QonR: 1e-4,
            cdof: vec![0, 1],
        }
    }
}

impl ZmpConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(self.QonR > 0. && self.QonR.is_finite()) {
            return Err(ConfigError::InvalidRegularization(self.QonR));
        }

        let invalid = |reason| ConfigError::InvalidControlledDofs {
            cdof: self.cdof.clone(),
            reason,
        };
        if self.cdof.is_empty() {
            return Err(invalid("no axis is controlled"));
        }
        if self.cdof.iter().any(|&axis| axis > 2) {
            return Err(invalid("axis index out of range"));
        }
        for (i, axis) in self.cdof.iter().enumerate() {
            if self.cdof[..i].contains(axis) {
                return Err(invalid("axis listed twice"));
            }
        }
        if vertical_axis(&self.cdof).is_none() {
            return Err(invalid("no vertical axis left"));
        }
        Ok(())
    }
}

/// First of x, y, z that is not controlled.
pub fn vertical_axis(cdof: &[usize]) -> Option<usize> {
    (0..3).find(|axis| !cdof.contains(axis))
}

/// Receding-horizon tracking of a ZMP reference trajectory.
///
/// The center of mass is modeled as a cart on a table whose height is the
/// current position along the vertical axis. Every tick, the jerk sequence
/// minimizing the predicted ZMP error over the horizon is solved from
/// scratch and only its first sample is applied. The result is a desired
/// center-of-mass acceleration.
///
/// WARNING: the sampling interval must stay equal to the one of the config.
pub struct ZmpController {
    name: String,
    config: ZmpConfig,
    model: PredictionModel,
    reference: ReferenceWindow,
    up: usize,
    gravity: Option<Float>,
    prev_vel: Vector3<Float>,
    padding: bool,
    weight: WeightHandle,
    error: DVector<Float>,
}

impl ZmpController {
    /// `zmp_traj` holds one reference sample per row and one column per
    /// controlled axis, in the order of `config.cdof`.
    pub fn new(name: &str, zmp_traj: DMatrix<Float>, config: ZmpConfig) -> Result<Self> {
        let config_err = |e| ControlError::configuration(name, e);

        config.validate().map_err(config_err)?;
        let model = PredictionModel::new(config.horizon, config.dt).map_err(config_err)?;
        let reference = ReferenceWindow::new(zmp_traj).map_err(config_err)?;
        if reference.width() != config.cdof.len() {
            return Err(config_err(ConfigError::DimensionMismatch {
                what: "reference trajectory columns",
                expected: config.cdof.len(),
                got: reference.width(),
            }));
        }
        let up = vertical_axis(&config.cdof).ok_or_else(|| {
            config_err(ConfigError::InvalidControlledDofs {
                cdof: config.cdof.clone(),
                reason: "no vertical axis left",
            })
        })?;

        Ok(ZmpController {
            name: name.to_string(),
            config,
            model,
            reference,
            up,
            gravity: None,
            prev_vel: Vector3::zeros(),
            padding: false,
            weight: WeightHandle::default(),
            error: DVector::zeros(0),
        })
    }

    pub fn config(&self) -> &ZmpConfig {
        &self.config
    }

    pub fn cdof(&self) -> &[usize] {
        &self.config.cdof
    }

    pub fn up_axis(&self) -> usize {
        self.up
    }

    pub fn gravity(&self) -> Option<Float> {
        self.gravity
    }

    pub fn model(&self) -> &PredictionModel {
        &self.model
    }

    pub fn reference(&self) -> &ReferenceWindow {
        &self.reference
    }

    /// True once a tick had to pad its window with the final reference
    /// sample.
    pub fn reference_exhausted(&self) -> bool {
        self.padding
    }

    /// Desired center-of-mass acceleration for this tick.
    ///
    /// The read cursor and the velocity memory only move when the tick
    /// succeeds.
    pub fn update_com(
        &mut self,
        pos: &Vector3<Float>,
        vel: &Vector3<Float>,
        dt: Float,
    ) -> Result<Vector3<Float>> {
        if !((dt - self.config.dt).abs() < SAMPLING_TOLERANCE) {
            return Err(self.config_error(ConfigError::SamplingMismatch {
                expected: self.config.dt,
                got: dt,
            }));
        }
        let gravity = self
            .gravity
            .ok_or_else(|| self.config_error(ConfigError::GravityUnset))?;

        let acc = (vel - self.prev_vel) / self.config.dt;
        let pos_up = pos[self.up];
        let hong = pos_up / gravity;
        if !hong.is_finite() {
            return Err(self.degeneracy(NumericalError::NonFiniteRatio { pos_up, gravity }));
        }

        let x_hat = self.com_hat(pos, vel, &acc);
        let h = self.model.horizon();
        let z_ref = self.reference.peek(h);
        let padded = self.reference.is_exhausted(h);
        self.model.rebuild(hong);
        let cmd = solve_horizon(
            self.model.Px(),
            self.model.Pu(),
            self.config.QonR,
            &x_hat,
            &z_ref,
        )
        .map_err(|e| self.degeneracy(e))?;

        self.prev_vel = *vel;
        self.reference.advance();
        if padded && !self.padding {
            debug!(
                controller = self.name.as_str(),
                "reference trajectory exhausted, holding its final sample"
            );
            self.padding = true;
        }

        let mut acc_des = Vector3::zeros();
        let mut error = DVector::zeros(self.config.cdof.len());
        for (col, &axis, &jerk, &zmp_ref) in izip!(
            0..,
            self.config.cdof.iter(),
            cmd.row(0).iter(),
            z_ref.row(0).iter()
        ) {
            acc_des[axis] = acc[axis] + jerk * dt;
            // reference minus current cart-table ZMP
            error[col] = zmp_ref - (pos[axis] - hong * acc[axis]);
        }
        self.error = error;

        trace!(
            controller = self.name.as_str(),
            hong,
            cursor = self.reference.cursor(),
            "zmp horizon solved"
        );
        Ok(acc_des)
    }

    /// [pos; vel; acc] restricted to the controlled axes.
    fn com_hat(
        &self,
        pos: &Vector3<Float>,
        vel: &Vector3<Float>,
        acc: &Vector3<Float>,
    ) -> DMatrix<Float> {
        let cdof = &self.config.cdof;
        DMatrix::from_fn(3, cdof.len(), |row, col| {
            let axis = cdof[col];
            match row {
                0 => pos[axis],
                1 => vel[axis],
                _ => acc[axis],
            }
        })
    }

    fn config_error(&self, e: ConfigError) -> ControlError {
        ControlError::configuration(&self.name, e)
    }

    fn degeneracy(&self, e: NumericalError) -> ControlError {
        ControlError::degeneracy(&self.name, e)
    }
}

impl Controller for ZmpController {
    fn name(&self) -> &str {
        &self.name
    }

    /// Pull the gravity magnitude from the world.
    fn init(&mut self, ctx: &SimContext) -> Result<()> {
        let gravity = ctx
            .gravity_magnitude()
            .map_err(|e| self.config_error(e))?;
        debug!(
            controller = self.name.as_str(),
            gravity,
            up = self.up,
            horizon = self.model.horizon(),
            "zmp controller initialized"
        );
        self.gravity = Some(gravity);
        Ok(())
    }

    fn error(&self) -> &DVector<Float> {
        &self.error
    }
}

impl Weighted for ZmpController {
    fn weight_handle(&self) -> &WeightHandle {
        &self.weight
    }
}

impl TwistController for ZmpController {
    fn update(
        &mut self,
        pos: &GoalValue,
        vel: &DVector<Float>,
        _ctx: &SimContext,
        dt: Float,
    ) -> Result<DVector<Float>> {
        let pos = match pos {
            GoalValue::Vector(v) if v.len() == 3 => Vector3::new(v[0], v[1], v[2]),
            other => {
                return Err(self.config_error(ConfigError::DimensionMismatch {
                    what: "center-of-mass position",
                    expected: 3,
                    got: other.to_dvector().len(),
                }))
            }
        };
        if vel.len() != 3 {
            return Err(self.config_error(ConfigError::DimensionMismatch {
                what: "center-of-mass velocity",
                expected: 3,
                got: vel.len(),
            }));
        }
        let vel = Vector3::new(vel[0], vel[1], vel[2]);

        let acc_des = self.update_com(&pos, &vel, dt)?;
        Ok(DVector::from_column_slice(acc_des.as_slice()))
    }
}

#[cfg(test)]
mod zmp_tests {
    use na::{dvector, vector};
    use rand::Rng;

    use crate::{
        assert_close, assert_vec_close,
        util::test_utils::{random_dmatrix, random_vector},
        GRAVITY,
    };

    use super::*;

    fn config(horizon: Float, dt: Float, cdof: Vec<usize>) -> ZmpConfig {
        ZmpConfig {
            horizon,
            dt,
            QonR: 1e-6,
            cdof,
        }
    }

    fn initialized(traj: DMatrix<Float>, config: ZmpConfig) -> ZmpController {
        let mut ctrl = ZmpController::new("zmp", traj, config).unwrap();
        ctrl.init(&SimContext::default()).unwrap();
        ctrl
    }

    #[test]
    fn vertical_axis_selection() {
        assert_eq!(vertical_axis(&[0, 1]), Some(2));
        assert_eq!(vertical_axis(&[1, 2]), Some(0));
        assert_eq!(vertical_axis(&[0, 2]), Some(1));
        assert_eq!(vertical_axis(&[2]), Some(0));
        assert_eq!(vertical_axis(&[0, 1, 2]), None);

        let ctrl = ZmpController::new("zmp", DMatrix::zeros(4, 2), config(0.5, 0.1, vec![1, 2]))
            .unwrap();
        assert_eq!(ctrl.up_axis(), 0);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let bad = [
            config(0.5, 0.1, vec![]),
            config(0.5, 0.1, vec![0, 3]),
            config(0.5, 0.1, vec![0, 0]),
            config(0.5, 0.1, vec![0, 1, 2]),
            ZmpConfig {
                QonR: 0.,
                ..config(0.5, 0.1, vec![0, 1])
            },
            config(0.01, 0.1, vec![0, 1]),
        ];
        for c in bad {
            let width = c.cdof.len().max(1);
            let result = ZmpController::new("zmp", DMatrix::zeros(4, width), c);
            assert!(matches!(result, Err(ControlError::Configuration { .. })));
        }
    }

    #[test]
    fn trajectory_width_must_match_cdof() {
        let result = ZmpController::new("zmp", DMatrix::zeros(4, 3), config(0.5, 0.1, vec![0, 1]));
        assert!(matches!(
            result,
            Err(ControlError::Configuration {
                source: ConfigError::DimensionMismatch { expected: 2, got: 3, .. },
                ..
            })
        ));
    }

    #[test]
    fn sampling_mismatch_is_rejected() {
        // Arrange
        let mut ctrl = initialized(DMatrix::zeros(10, 2), config(0.5, 0.1, vec![0, 1]));

        // Act
        let err = ctrl
            .update_com(&vector![0., 0., 0.8], &Vector3::zeros(), 0.2)
            .unwrap_err();

        // Assert
        assert_eq!(
            err,
            ControlError::Configuration {
                controller: "zmp".to_string(),
                source: ConfigError::SamplingMismatch {
                    expected: 0.1,
                    got: 0.2
                }
            }
        );
        assert_eq!(ctrl.reference().cursor(), 0);
    }

    #[test]
    fn sampling_within_tolerance_is_accepted() {
        let mut ctrl = initialized(DMatrix::zeros(10, 2), config(0.5, 0.1, vec![0, 1]));
        assert!(ctrl
            .update_com(&vector![0., 0., 0.8], &Vector3::zeros(), 0.1 + 1e-10)
            .is_ok());
    }

    #[test]
    fn nan_sampling_interval_is_rejected() {
        // Arrange
        let mut ctrl = initialized(DMatrix::zeros(10, 2), config(0.5, 0.1, vec![0, 1]));

        // Act
        let err = ctrl
            .update_com(&vector![0.01, 0., 0.8], &vector![0.1, 0., 0.], Float::NAN)
            .unwrap_err();

        // Assert
        assert!(matches!(
            err,
            ControlError::Configuration {
                source: ConfigError::SamplingMismatch { .. },
                ..
            }
        ));
        assert_eq!(ctrl.reference().cursor(), 0);
    }

    #[test]
    fn exhaustion_is_flagged_on_first_padded_window() {
        // Arrange: 10 samples, windows of 5
        let dt = 0.1;
        let mut ctrl = initialized(DMatrix::zeros(10, 2), config(0.5, dt, vec![0, 1]));
        let pos = vector![0., 0., 0.8];
        let vel = Vector3::zeros();

        // Act & Assert
        for _ in 0..6 {
            ctrl.update_com(&pos, &vel, dt).unwrap();
            assert!(!ctrl.reference_exhausted());
        }
        ctrl.update_com(&pos, &vel, dt).unwrap();
        assert!(ctrl.reference_exhausted());
    }

    #[test]
    fn short_reference_is_padded_from_first_tick() {
        // Arrange: fewer samples than the horizon
        let dt = 0.1;
        let traj = DMatrix::from_element(3, 2, 0.05);
        let mut ctrl = initialized(traj, config(0.5, dt, vec![0, 1]));

        // Act
        ctrl.update_com(&vector![0., 0., 0.8], &Vector3::zeros(), dt).unwrap();

        // Assert
        assert!(ctrl.reference_exhausted());
        assert_vec_close!(ctrl.error(), &dvector![0.05, 0.05], 1e-12);
    }

    #[test]
    fn update_before_init_fails() {
        let mut ctrl =
            ZmpController::new("zmp", DMatrix::zeros(10, 2), config(0.5, 0.1, vec![0, 1]))
                .unwrap();

        let err = ctrl
            .update_com(&vector![0., 0., 0.8], &Vector3::zeros(), 0.1)
            .unwrap_err();

        assert!(matches!(
            err,
            ControlError::Configuration {
                source: ConfigError::GravityUnset,
                ..
            }
        ));
    }

    #[test]
    fn init_rejects_zero_gravity() {
        let mut ctrl =
            ZmpController::new("zmp", DMatrix::zeros(10, 2), config(0.5, 0.1, vec![0, 1]))
                .unwrap();

        let err = ctrl.init(&SimContext::new(Some(0.))).unwrap_err();

        assert_eq!(err.controller(), "zmp");
        assert!(matches!(
            err,
            ControlError::Configuration {
                source: ConfigError::InvalidGravity(_),
                ..
            }
        ));
        assert_eq!(ctrl.gravity(), None);
    }

    #[test]
    fn zero_reference_and_state_give_zero_command() {
        // Arrange
        let mut ctrl = initialized(DMatrix::zeros(50, 2), config(0.5, 0.05, vec![0, 1]));
        let vel = Vector3::zeros();

        // Act & Assert
        for pos_up in [0., 0.8] {
            for _ in 0..30 {
                let acc = ctrl.update_com(&vector![0., 0., pos_up], &vel, 0.05).unwrap();
                assert_vec_close!(&acc, &Vector3::<Float>::zeros(), 1e-12);
            }
        }
        assert_eq!(ctrl.reference().cursor(), 60);
    }

    #[test]
    fn command_matches_closed_form() {
        // Arrange
        let mut rng = rand::rng();
        let dt = 0.1;
        let cfg = config(0.5, dt, vec![0, 1]);
        let traj = random_dmatrix(&mut rng, 8, 2, 0.1);
        let mut ctrl = initialized(traj.clone(), cfg.clone());
        let pos = vector![0.02, -0.01, 0.8];
        let vel = random_vector(&mut rng, 0.1);

        // Act
        let acc_des = ctrl.update_com(&pos, &vel, dt).unwrap();

        // Assert
        let hong = 0.8 / GRAVITY;
        let acc = vel / dt; // previous velocity starts at zero
        let mut model = PredictionModel::with_steps(5, dt).unwrap();
        model.rebuild(hong);
        let x_hat = DMatrix::from_fn(3, 2, |row, col| match row {
            0 => pos[col],
            1 => vel[col],
            _ => acc[col],
        });
        let z_ref = traj.rows(0, 5).into_owned();
        let Pu = model.Pu();
        let normal = Pu.tr_mul(Pu) + DMatrix::identity(5, 5) * cfg.QonR;
        let u = -normal.try_inverse().unwrap() * Pu.tr_mul(&(model.Px() * &x_hat - &z_ref));

        assert_close!(acc_des[0], acc[0] + u[(0, 0)] * dt, 1e-9);
        assert_close!(acc_des[1], acc[1] + u[(0, 1)] * dt, 1e-9);
        assert_eq!(acc_des[2], 0.);
        assert_eq!(ctrl.model().hong(), Some(hong));
    }

    #[test]
    fn acceleration_is_finite_differenced() {
        // Arrange: y is the vertical axis, hong = 0.981 / 9.81 = 0.1
        let dt = 0.1;
        let mut ctrl = initialized(DMatrix::zeros(20, 1), config(0.3, dt, vec![0]));
        let pos = vector![0., 0.981, 0.];

        // Act & Assert
        // The error is 0 - (pos - hong * acc) = 0.1 * acc
        ctrl.update_com(&pos, &vector![0.2, 0., 0.], dt).unwrap();
        assert_vec_close!(ctrl.error(), &dvector![0.1 * 2.], 1e-12);

        ctrl.update_com(&pos, &vector![0.5, 0., 0.], dt).unwrap();
        assert_vec_close!(ctrl.error(), &dvector![0.1 * 3.], 1e-12);
        assert_eq!(ctrl.up_axis(), 1);
    }

    #[test]
    fn error_is_zmp_tracking_error() {
        let dt = 0.1;
        let traj = DMatrix::from_element(10, 2, 0.05);
        let mut ctrl = initialized(traj, config(0.5, dt, vec![0, 1]));
        let pos = vector![0.01, 0.02, 0.981];

        ctrl.update_com(&pos, &vector![0.1, 0., 0.], dt).unwrap();

        // acc = [1, 0, 0], hong = 0.1
        assert_vec_close!(ctrl.error(), &dvector![0.05 - (0.01 - 0.1), 0.05 - 0.02], 1e-12);
    }

    #[test]
    fn non_finite_height_is_reported() {
        let mut ctrl = initialized(DMatrix::zeros(10, 2), config(0.5, 0.1, vec![0, 1]));

        let err = ctrl
            .update_com(&vector![0., 0., Float::NAN], &Vector3::zeros(), 0.1)
            .unwrap_err();

        assert!(matches!(
            err,
            ControlError::NumericalDegeneracy {
                source: NumericalError::NonFiniteRatio { .. },
                ..
            }
        ));
        assert_eq!(ctrl.reference().cursor(), 0);
    }

    #[test]
    fn weight_change_keeps_horizon_state() {
        // Arrange
        let mut rng = rand::rng();
        let dt = 0.05;
        let traj = random_dmatrix(&mut rng, 40, 2, 0.1);
        let mut a = initialized(traj.clone(), config(0.5, dt, vec![0, 1]));
        let mut b = initialized(traj, config(0.5, dt, vec![0, 1]));
        let handle = b.weight_handle().clone();

        // Act & Assert
        for i in 0..20 {
            if i == 5 {
                handle.set(1e-3);
            }
            let pos = vector![rng.random_range(-0.1..0.1), 0., 0.8];
            let vel = random_vector(&mut rng, 0.1);
            let acc_a = a.update_com(&pos, &vel, dt).unwrap();
            let acc_b = b.update_com(&pos, &vel, dt).unwrap();
            assert_eq!(acc_a, acc_b);
        }
        assert_eq!(b.weight(), 1e-3);
        assert_eq!(a.weight(), 1.);
        assert_eq!(a.reference().cursor(), b.reference().cursor());
    }

    #[test]
    fn tracks_constant_reference() {
        // Arrange: integrate the commanded acceleration on a cart-table.
        let dt = 0.05;
        let target = 0.05;
        let traj = DMatrix::from_fn(120, 1, |i, _| if i < 10 { 0. } else { target });
        let cfg = ZmpConfig {
            QonR: 1e-4,
            ..config(1.52, dt, vec![1])
        };
        let mut ctrl = initialized(traj, cfg);
        let mut pos = vector![0., 0., 0.8];
        let mut vel = Vector3::zeros();

        // Act
        for _ in 0..120 {
            let acc = ctrl.update_com(&pos, &vel, dt).unwrap();
            vel += acc * dt;
            pos += vel * dt;
        }

        // Assert
        assert_eq!(ctrl.model().horizon(), 30);
        assert_close!(pos[1], target, 1e-3);
        assert_close!(vel[1], 0., 1e-3);
        assert_eq!(pos[0], 0.);
        assert_eq!(pos[2], 0.8);
    }

    #[test]
    fn works_through_twist_controller_interface() {
        let mut ctrl = initialized(DMatrix::zeros(10, 2), config(0.5, 0.1, vec![0, 1]));
        let ctx = SimContext::default();

        let acc = TwistController::update(
            &mut ctrl,
            &GoalValue::Vector(dvector![0., 0., 0.8]),
            &dvector![0., 0., 0.],
            &ctx,
            0.1,
        )
        .unwrap();
        assert_eq!(acc, dvector![0., 0., 0.]);

        let err = TwistController::update(
            &mut ctrl,
            &GoalValue::Vector(dvector![0., 0.8]),
            &dvector![0., 0., 0.],
            &ctx,
            0.1,
        )
        .unwrap_err();
        assert!(matches!(err, ControlError::Configuration { .. }));
    }
}
