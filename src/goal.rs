//! Control goals: fixed setpoints or live kinematic entities.
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use na::DVector;

use crate::{error::ConfigError, pose::Pose, types::Float};

/// Value of a goal or of the current kinematic state.
#[derive(Clone, Debug, PartialEq)]
pub enum GoalValue {
    Vector(DVector<Float>),
    Pose(Pose),
}

impl GoalValue {
    /// Flat representation used for differencing. Poses use their
    /// quaternion-position form.
    pub fn to_dvector(&self) -> DVector<Float> {
        match self {
            GoalValue::Vector(v) => v.clone(),
            GoalValue::Pose(pose) => DVector::from_column_slice(pose.quatpos().as_slice()),
        }
    }
}

impl From<DVector<Float>> for GoalValue {
    fn from(v: DVector<Float>) -> Self {
        GoalValue::Vector(v)
    }
}

impl From<Pose> for GoalValue {
    fn from(pose: Pose) -> Self {
        GoalValue::Pose(pose)
    }
}

/// Pose-aware difference `lhs - rhs`.
pub fn diff(lhs: &GoalValue, rhs: &GoalValue) -> Result<DVector<Float>, ConfigError> {
    let lhs = lhs.to_dvector();
    let rhs = rhs.to_dvector();
    if lhs.len() != rhs.len() {
        return Err(ConfigError::DimensionMismatch {
            what: "goal/state",
            expected: lhs.len(),
            got: rhs.len(),
        });
    }
    Ok(lhs - rhs)
}

/// A movable kinematic entity whose value is read every tick.
pub trait KinematicSource {
    fn current_value(&self) -> GoalValue;
}

/// Generalized position of a joint, updated by the simulation.
#[derive(Debug)]
pub struct JointRef {
    gpos: RefCell<DVector<Float>>,
}

impl JointRef {
    pub fn new(gpos: DVector<Float>) -> Self {
        JointRef {
            gpos: RefCell::new(gpos),
        }
    }

    pub fn gpos(&self) -> DVector<Float> {
        self.gpos.borrow().clone()
    }

    pub fn set_gpos(&self, gpos: DVector<Float>) {
        *self.gpos.borrow_mut() = gpos;
    }
}

impl KinematicSource for JointRef {
    fn current_value(&self) -> GoalValue {
        GoalValue::Vector(self.gpos())
    }
}

/// Pose of a frame, updated by the simulation.
#[derive(Debug)]
pub struct FrameRef {
    pose: Cell<Pose>,
}

impl FrameRef {
    pub fn new(pose: Pose) -> Self {
        FrameRef {
            pose: Cell::new(pose),
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose.get()
    }

    pub fn set_pose(&self, pose: Pose) {
        self.pose.set(pose);
    }
}

impl KinematicSource for FrameRef {
    fn current_value(&self) -> GoalValue {
        GoalValue::Pose(self.pose())
    }
}

/// Target of a feedback controller.
#[derive(Clone)]
pub enum ControlGoal {
    /// Pre-baked setpoint, used as is.
    Fixed(GoalValue),
    /// Entity dereferenced on every tick.
    Live(Rc<dyn KinematicSource>),
}

impl ControlGoal {
    pub fn resolve(&self) -> GoalValue {
        match self {
            ControlGoal::Fixed(value) => value.clone(),
            ControlGoal::Live(source) => source.current_value(),
        }
    }
}

impl From<GoalValue> for ControlGoal {
    fn from(value: GoalValue) -> Self {
        ControlGoal::Fixed(value)
    }
}

impl From<DVector<Float>> for ControlGoal {
    fn from(v: DVector<Float>) -> Self {
        ControlGoal::Fixed(GoalValue::Vector(v))
    }
}

impl From<Pose> for ControlGoal {
    fn from(pose: Pose) -> Self {
        ControlGoal::Fixed(GoalValue::Pose(pose))
    }
}

impl From<Rc<JointRef>> for ControlGoal {
    fn from(joint: Rc<JointRef>) -> Self {
        ControlGoal::Live(joint)
    }
}

impl From<Rc<FrameRef>> for ControlGoal {
    fn from(frame: Rc<FrameRef>) -> Self {
        ControlGoal::Live(frame)
    }
}
