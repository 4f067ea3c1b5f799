//! Conditions and executions that act on running controllers.

use tracing::{debug, warn};

use crate::{
    control::weight::WeightHandle,
    error::{ConfigError, ControlError, Result},
    types::Float,
    world::SimContext,
};

/// Smallest weight a ramp may start or end at.
pub const MIN_WEIGHT: Float = 1e-16;

/// Longest weight ramp, in steps.
pub const MAX_RAMP_STEPS: usize = 10_000_000;

/// Predicate evaluated once per tick.
pub trait Condition {
    fn init(&mut self, _ctx: &SimContext) {}

    fn update(&mut self, ctx: &SimContext, dt: Float) -> bool;
}

/// Action run once per tick with the combined result of the conditions.
///
/// It also runs when the conditions do not hold, so that actions spanning
/// several ticks can finish.
pub trait Execution {
    fn init(&mut self, _ctx: &SimContext) {}

    fn update(
        &mut self,
        ctx: &SimContext,
        dt: Float,
        fulfilled: bool,
    ) -> std::result::Result<(), ConfigError>;
}

/// Links a set of conditions to a set of executions.
pub struct Event {
    name: String,
    pub is_active: bool,
    conditions: Vec<Box<dyn Condition>>,
    executions: Vec<Box<dyn Execution>>,
    fulfilled: bool,
}

impl Event {
    pub fn new(
        name: &str,
        conditions: Vec<Box<dyn Condition>>,
        executions: Vec<Box<dyn Execution>>,
    ) -> Self {
        Event {
            name: name.to_string(),
            is_active: true,
            conditions,
            executions,
            fulfilled: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn init(&mut self, ctx: &SimContext) {
        for condition in self.conditions.iter_mut() {
            condition.init(ctx);
        }
        for execution in self.executions.iter_mut() {
            execution.init(ctx);
        }
    }

    /// Every condition is evaluated, even once one of them failed, since
    /// conditions may keep state between ticks.
    pub fn update(&mut self, ctx: &SimContext, dt: Float) -> Result<()> {
        self.fulfilled = self.is_active
            && self
                .conditions
                .iter_mut()
                .fold(true, |acc, condition| condition.update(ctx, dt) && acc);

        for execution in self.executions.iter_mut() {
            execution
                .update(ctx, dt, self.fulfilled)
                .map_err(|e| ControlError::configuration(&self.name, e))?;
        }
        Ok(())
    }

    /// Combined result of the conditions at the last update.
    pub fn is_fulfilled(&self) -> bool {
        self.fulfilled
    }
}

/// Holds on the first tick at or after time `t`, and never again.
pub struct AtTime {
    t: Float,
    done: bool,
}

impl AtTime {
    pub fn new(t: Float) -> Self {
        AtTime { t, done: false }
    }
}

impl Condition for AtTime {
    fn update(&mut self, ctx: &SimContext, _dt: Float) -> bool {
        if !self.done && ctx.time >= self.t {
            self.done = true;
            return true;
        }
        false
    }
}

/// Ramps a controller weight logarithmically once the conditions hold.
///
/// The ramp goes from `start` (or the weight at trigger time) to `end` over
/// `duration` seconds, one sample per tick. Triggering again restarts it.
pub struct ChangeWeight {
    target: WeightHandle,
    end: Float,
    start: Option<Float>,
    duration: Float,
    sequence: Vec<Float>,
    counter: Option<usize>,
}

impl ChangeWeight {
    pub fn new(
        target: WeightHandle,
        end: Float,
        duration: Float,
        start: Option<Float>,
    ) -> std::result::Result<Self, ConfigError> {
        if !duration.is_finite() {
            return Err(ConfigError::InvalidDuration(duration));
        }
        Ok(ChangeWeight {
            target,
            end,
            start,
            duration,
            sequence: vec![],
            counter: None,
        })
    }

    /// True while samples of the ramp remain to be applied.
    pub fn is_running(&self) -> bool {
        self.counter.is_some()
    }
}

impl Execution for ChangeWeight {
    fn update(
        &mut self,
        _ctx: &SimContext,
        dt: Float,
        fulfilled: bool,
    ) -> std::result::Result<(), ConfigError> {
        if fulfilled {
            if self.is_running() {
                warn!(
                    end = self.end,
                    "weight ramp restarted before reaching its end"
                );
            }
            let start = self.start.unwrap_or_else(|| self.target.get());
            let start = start.max(MIN_WEIGHT);
            let end = self.end.max(MIN_WEIGHT);
            self.sequence = interpolate_log(start, end, self.duration, dt)?;
            self.counter = Some(0);
            debug!(start, end, steps = self.sequence.len(), "weight ramp started");
        }

        if let Some(counter) = self.counter {
            match self.sequence.get(counter) {
                Some(&weight) => {
                    self.target.set(weight);
                    self.counter = Some(counter + 1);
                }
                None => self.counter = None,
            }
        }
        Ok(())
    }
}

/// `floor(duration / dt) + 1` log-spaced samples from `start` to `end`, both
/// included. A duration shorter than one step gives `[end]`.
///
/// Both bounds must be positive.
pub fn interpolate_log(
    start: Float,
    end: Float,
    duration: Float,
    dt: Float,
) -> std::result::Result<Vec<Float>, ConfigError> {
    if !(dt > 0. && dt.is_finite()) {
        return Err(ConfigError::InvalidTimeStep(dt));
    }
    if !duration.is_finite() {
        return Err(ConfigError::InvalidDuration(duration));
    }

    let steps = (duration / dt).floor().max(0.);
    if !(steps <= MAX_RAMP_STEPS as Float) {
        return Err(ConfigError::InvalidDuration(duration));
    }
    let n = (steps as usize)
        .checked_add(1)
        .ok_or(ConfigError::InvalidDuration(duration))?;
    if n == 1 {
        return Ok(vec![end]);
    }
    let (log_start, log_end) = (start.ln(), end.ln());
    let last = (n - 1) as Float;
    Ok((0..n)
        .map(|i| (log_start + (log_end - log_start) * i as Float / last).exp())
        .collect())
}
