use na::DVector;

use crate::{
    error::{ConfigError, ControlError, Result},
    goal::{diff, ControlGoal, GoalValue},
    types::Float,
    world::SimContext,
};

use super::{
    gain::Gain,
    weight::{WeightHandle, Weighted},
    Controller, TwistController,
};

/// Proportional-derivative feedback on a position or pose goal:
/// dtwist = Kp * (goal - pos) - Kd * vel
pub struct PdController {
    name: String,
    goal: ControlGoal,
    Kp: Gain,
    Kd: Gain,
    weight: WeightHandle,
    error: DVector<Float>,
}

impl PdController {
    /// Without an explicit Kd, the critically damped `2 * sqrt(Kp)` is used.
    pub fn new(name: &str, goal: ControlGoal, Kp: Gain, Kd: Option<Gain>) -> Result<Self> {
        let config = |e| ControlError::configuration(name, e);
        Kp.validate().map_err(config)?;
        let Kd = match Kd {
            Some(Kd) => {
                Kd.validate().map_err(config)?;
                Kd
            }
            None => Gain::critically_damped(&Kp).map_err(config)?,
        };

        Ok(PdController {
            name: name.to_string(),
            goal,
            Kp,
            Kd,
            weight: WeightHandle::default(),
            error: DVector::zeros(0),
        })
    }

    pub fn Kp(&self) -> &Gain {
        &self.Kp
    }

    pub fn Kd(&self) -> &Gain {
        &self.Kd
    }

    pub fn goal(&self) -> &ControlGoal {
        &self.goal
    }

    pub fn set_goal(&mut self, goal: ControlGoal) {
        self.goal = goal;
    }
}

impl Controller for PdController {
    fn name(&self) -> &str {
        &self.name
    }

    fn error(&self) -> &DVector<Float> {
        &self.error
    }
}

impl Weighted for PdController {
    fn weight_handle(&self) -> &WeightHandle {
        &self.weight
    }
}

impl TwistController for PdController {
    fn update(
        &mut self,
        pos: &GoalValue,
        vel: &DVector<Float>,
        _ctx: &SimContext,
        _dt: Float,
    ) -> Result<DVector<Float>> {
        let config = |e| ControlError::configuration(&self.name, e);

        let goal = self.goal.resolve();
        let error = diff(&goal, pos).map_err(config)?;
        let p_term = self.Kp.apply(&error).map_err(config)?;
        let d_term = self.Kd.apply(vel).map_err(config)?;
        if p_term.len() != d_term.len() {
            return Err(config(ConfigError::DimensionMismatch {
                what: "velocity",
                expected: p_term.len(),
                got: d_term.len(),
            }));
        }

        self.error = error;
        Ok(p_term - d_term)
    }
}
