use std::{cell::Cell, rc::Rc};

use crate::types::Float;

/// Shared, mutable task weight of a controller.
///
/// Cloning the handle shares the same weight, so an event can ramp it while
/// the controller keeps running.
#[derive(Clone, Debug)]
pub struct WeightHandle(Rc<Cell<Float>>);

impl WeightHandle {
    pub fn new(weight: Float) -> Self {
        WeightHandle(Rc::new(Cell::new(weight)))
    }

    pub fn get(&self) -> Float {
        self.0.get()
    }

    pub fn set(&self, weight: Float) {
        self.0.set(weight);
    }
}

impl Default for WeightHandle {
    fn default() -> Self {
        WeightHandle::new(1.)
    }
}

/// Controllers whose weight can be changed from outside.
pub trait Weighted {
    fn weight_handle(&self) -> &WeightHandle;

    fn weight(&self) -> Float {
        self.weight_handle().get()
    }

    fn set_weight(&self, weight: Float) {
        self.weight_handle().set(weight);
    }
}

#[cfg(test)]
mod weight_tests {
    use super::*;

    #[test]
    fn clones_share_the_weight() {
        let handle = WeightHandle::default();
        let other = handle.clone();
        other.set(0.25);
        assert_eq!(handle.get(), 0.25);
    }
}
