use std::error::Error;

use lqp_ctrl::control::zmp::{ZmpConfig, ZmpController};
use lqp_ctrl::control::Controller;
use lqp_ctrl::plot::plot;
use lqp_ctrl::world::SimContext;
use lqp_ctrl::{types::Float, GRAVITY};
use nalgebra::{vector, DMatrix, Vector3};

/// Drive a cart-table model of a walking robot with the ZMP controller.
///
/// The reference steps forward every 0.8s and swings left and right between
/// the feet. The center of mass stays at a constant height.
///
///              z
///              |   o  <- CoM
///              |   |
///              |---+-----> x
///                 ZMP
pub fn main() -> Result<(), Box<dyn Error>> {
    let height = 0.8;
    let step_time = 0.8;
    let step_length = 0.1;
    let half_width = 0.05;

    let final_time = 8.0;
    let dt = 0.02;
    let num_steps = (final_time / dt) as usize;

    let step_at = |i: usize| ((i as Float * dt) / step_time).floor();
    let zmp_traj = DMatrix::from_fn(num_steps, 2, |i, j| {
        let step = step_at(i);
        match j {
            0 => step * step_length,
            _ if step == 0. => 0.,
            _ if step % 2. == 1. => half_width,
            _ => -half_width,
        }
    });

    let config = ZmpConfig {
        horizon: 1.0,
        dt,
        QonR: 1e-4,
        cdof: vec![0, 1],
    };
    let mut ctrl = ZmpController::new("walk", zmp_traj.clone(), config)?;
    let mut ctx = SimContext::default();
    ctrl.init(&ctx)?;

    // Simulate
    let hong = height / GRAVITY;
    let mut pos = vector![0., 0., height];
    let mut vel = Vector3::zeros();
    let mut zmp = vec![];
    let mut com = vec![];
    for _ in 0..num_steps {
        let acc = ctrl.update_com(&pos, &vel, dt)?;
        vel += acc * dt;
        pos += vel * dt;
        ctx.advance(dt);

        zmp.push(pos - hong * acc);
        com.push(pos);
    }

    let last_error = ctrl.error().amax();
    println!(
        "t = {:.2}s, CoM = [{:.4}, {:.4}], last ZMP error = {:.2e}",
        ctx.time, pos[0], pos[1], last_error
    );

    let lateral_ref: Vec<Float> = zmp_traj.column(1).iter().cloned().collect();
    let lateral_zmp: Vec<Float> = zmp.iter().map(|z| z[1]).collect();
    let lateral_com: Vec<Float> = com.iter().map(|c| c[1]).collect();
    plot(
        &[
            ("ZMP reference", lateral_ref.as_slice()),
            ("ZMP", lateral_zmp.as_slice()),
            ("CoM", lateral_com.as_slice()),
        ],
        dt,
        "lateral ZMP tracking",
        "zmp_tracking.png",
    )?;

    Ok(())
}
