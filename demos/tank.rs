//! Drives a tank against a target circling the arena.
//!
//! Run with an optional YAML agent config:
//!
//! ```sh
//! RUST_LOG=reactive_behavior_tree=debug cargo run --example tank -- demos/tank.yaml
//! ```

use anyhow::Context as _;
use reactive_behavior_tree::{config::AgentConfig, Actuator, LocalPoint, Perception};
use std::{f64::consts::PI, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

const FRAME: Duration = Duration::from_millis(16);
const TURN_SPEED: f64 = PI / 2.;
const MOVE_SPEED: f64 = 3.;
const ORBIT_RADIUS: f64 = 8.;
const ORBIT_PERIOD: f64 = 20.;

#[derive(Default)]
struct ArenaTank {
    pos: [f64; 2],
    heading: f64,
    target: [f64; 2],
    turn: f64,
    speed: f64,
    shots: usize,
}

impl ArenaTank {
    fn forward(&self) -> [f64; 2] {
        [self.heading.sin(), self.heading.cos()]
    }

    fn right(&self) -> [f64; 2] {
        [self.heading.cos(), -self.heading.sin()]
    }

    /// Applies the commands of the last tick and moves the target along its orbit.
    fn step(&mut self, time: f64, dt: f64) {
        self.heading += self.turn * TURN_SPEED * dt;
        let forward = self.forward();
        self.pos[0] += forward[0] * self.speed * MOVE_SPEED * dt;
        self.pos[1] += forward[1] * self.speed * MOVE_SPEED * dt;
        self.turn = 0.;
        self.speed = 0.;

        let phase = 2. * PI * time / ORBIT_PERIOD;
        self.target = [ORBIT_RADIUS * phase.cos(), ORBIT_RADIUS * phase.sin()];
    }
}

impl Actuator for ArenaTank {
    fn move_by(&mut self, amount: f32) {
        self.speed = amount.clamp(-1., 1.) as f64;
    }

    fn turn(&mut self, amount: f32) {
        self.turn = amount.clamp(-1., 1.) as f64;
    }

    fn fire(&mut self, amount: f32) {
        if amount > 0. {
            self.shots += 1;
            info!(shots = self.shots, "fire");
        }
    }
}

impl Perception for ArenaTank {
    fn target_local_position(&self) -> Option<LocalPoint> {
        let delta = [self.target[0] - self.pos[0], self.target[1] - self.pos[1]];
        let dot = |axis: [f64; 2]| delta[0] * axis[0] + delta[1] * axis[1];
        Some(LocalPoint::new(dot(self.right()), 0., dot(self.forward())))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let src = std::fs::read_to_string(&path)
                .with_context(|| format!("reading agent config {path}"))?;
            AgentConfig::from_yaml(&src)?
        }
        None => AgentConfig::from_yaml("behaviour: track\nseed: 7")?,
    };

    let mut tank = ArenaTank {
        target: [ORBIT_RADIUS, 0.],
        ..ArenaTank::default()
    };
    let mut root = config.build_root::<ArenaTank>()?;
    root.start(&mut tank);

    let dt = FRAME.as_secs_f64();
    for frame in 0..30 * 60 {
        root.update(&mut tank, FRAME);
        tank.step(root.clock().now().as_secs_f64(), dt);
        if frame % 60 == 0 {
            info!(
                second = frame / 60,
                heading = tank.heading.to_degrees() % 360.,
                off_centre = root.blackboard().get_number("targetOffCentre"),
                "status"
            );
        }
    }
    root.stop(&mut tank);

    println!("{} shots in 30 seconds", tank.shots);
    Ok(())
}
