use crate::{error::ConfigError, types::Float, GRAVITY};

/// What controllers and events may pull from the running simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimContext {
    /// Signed gravity reported by the world's gravity controller, if any.
    pub gravity: Option<Float>,
    /// Current simulation time in seconds.
    pub time: Float,
}

impl SimContext {
    pub fn new(gravity: Option<Float>) -> Self {
        SimContext { gravity, time: 0. }
    }

    pub fn advance(&mut self, dt: Float) {
        self.time += dt;
    }

    /// Magnitude of the world gravity.
    pub fn gravity_magnitude(&self) -> Result<Float, ConfigError> {
        let gravity = self.gravity.ok_or(ConfigError::GravityUnset)?;
        if gravity == 0. || !gravity.is_finite() {
            return Err(ConfigError::InvalidGravity(gravity));
        }
        Ok(gravity.abs())
    }
}

impl Default for SimContext {
    fn default() -> Self {
        SimContext::new(Some(-GRAVITY))
    }
}
