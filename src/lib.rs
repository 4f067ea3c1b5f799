#![allow(non_snake_case)]

use types::Float;
pub extern crate nalgebra as na;

pub mod control;
pub mod error;
pub mod event;
pub mod goal;
pub mod plot;
pub mod pose;
pub mod reference;
pub mod types;
pub mod util;
pub mod world;

pub use error::{ControlError, Result};

pub const GRAVITY: Float = 9.81;

pub const PI: Float = std::f64::consts::PI;

/// Largest accepted difference between the tick interval and the interval a
/// horizon controller was configured for.
pub const SAMPLING_TOLERANCE: Float = 1e-8;
