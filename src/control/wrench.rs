use na::DVector;

use crate::{error::Result, types::Float, world::SimContext};

use super::{Controller, WrenchController};

/// Returns the same wrench every tick.
pub struct ConstantWrench {
    name: String,
    value: DVector<Float>,
    error: DVector<Float>,
}

impl ConstantWrench {
    /// The value is flattened in iteration order.
    pub fn new(name: &str, value: impl IntoIterator<Item = Float>) -> Self {
        ConstantWrench {
            name: name.to_string(),
            value: DVector::from_vec(value.into_iter().collect()),
            error: DVector::zeros(0),
        }
    }

    pub fn value(&self) -> &DVector<Float> {
        &self.value
    }
}

impl Controller for ConstantWrench {
    fn name(&self) -> &str {
        &self.name
    }

    fn error(&self) -> &DVector<Float> {
        &self.error
    }
}

impl WrenchController for ConstantWrench {
    fn update(&mut self, _ctx: &SimContext, _dt: Float) -> Result<DVector<Float>> {
        Ok(self.value.clone())
    }
}
