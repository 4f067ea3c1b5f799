use na::DVector;

use crate::{error::Result, goal::GoalValue, types::Float, world::SimContext};

pub mod gain;
pub mod horizon;
pub mod pd;
pub mod weight;
pub mod wrench;
pub mod zmp;

/// Common contract of all task controllers.
pub trait Controller {
    fn name(&self) -> &str;

    /// Called once, before the first update.
    fn init(&mut self, _ctx: &SimContext) -> Result<()> {
        Ok(())
    }

    /// Tracking error computed by the last successful update.
    fn error(&self) -> &DVector<Float>;
}

/// Controller producing a desired acceleration (time derivative of a twist)
/// from the current position and velocity.
pub trait TwistController: Controller {
    fn update(
        &mut self,
        pos: &GoalValue,
        vel: &DVector<Float>,
        ctx: &SimContext,
        dt: Float,
    ) -> Result<DVector<Float>>;
}

/// Controller producing a desired wrench.
pub trait WrenchController: Controller {
    fn update(&mut self, ctx: &SimContext, dt: Float) -> Result<DVector<Float>>;
}
