//! Gravity gun demo
//!
//! Headless run of the physics gun against the reference world: grab a
//! crate, swing it around, seat it on the floor, then let go. Pass a `.toml`
//! or `.ron` configuration path as the first argument to override defaults.

use gravgun::foundation::logging;
use gravgun::prelude::*;
use log::{debug, info, warn};
use thiserror::Error;

/// Logical frame length
const FRAME_TIME: f32 = 1.0 / 66.0;

/// Physics substeps per logical frame
const SUBSTEPS: u32 = 2;

/// Player eye height above the floor (m)
const EYE_HEIGHT: f32 = 1.6;

#[derive(Debug, Error)]
enum DemoError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("the gun did not grab the crate")]
    NothingGrabbed,

    #[error("snapshot: {0}")]
    Snapshot(String),
}

/// Aim from the player's eye at the given yaw and pitch (radians)
fn aim(yaw: f32, pitch: f32) -> AimRay {
    let forward = Vec3::new(yaw.cos() * pitch.cos(), yaw.sin() * pitch.cos(), pitch.sin());
    AimRay::new(Vec3::new(0.0, 0.0, EYE_HEIGHT), forward, yaw)
}

fn step_frame(world: &mut PhysicsWorld, gun: &mut PhysGun) {
    world.substep(FRAME_TIME, SUBSTEPS, &mut [gun.controller_mut() as &mut dyn MotionEvent]);
}

fn log_progress(frame: usize, world: &PhysicsWorld, gun: &PhysGun) {
    let grab = gun.controller();
    let error = (grab.target_position() - grab.world_position()).magnitude();
    info!(
        "frame {:4}: anchor {:?} target {:?} error {:.3} m",
        frame,
        grab.world_position(),
        grab.target_position(),
        error
    );
    debug!(
        "pitch {:?} mass blend {:?} movement {:.2}",
        gun.lift_pitch(world),
        gun.mass_blend(world),
        gun.movement_fade()
    );
}

fn run(config: &GravityGunConfig) -> Result<(), DemoError> {
    let mut world = PhysicsWorld::new().with_gravity(Vec3::new(0.0, 0.0, -9.81));
    world.add_body(RigidBodyDesc::static_plane(Vec3::zeros(), Vec3::z()));
    let crate_body = world.add_body(
        RigidBodyDesc::dynamic_cuboid(20.0, Vec3::new(0.4, 0.4, 0.4))
            .with_position(Vec3::new(4.0, 0.0, EYE_HEIGHT))
            .with_damping(0.1, 0.1),
    );
    let mut gun = PhysGun::new(config);
    let mut frame = 0;

    // Lock on
    let event = gun.update(&mut world, &aim(0.0, 0.0), HoldCommand::None, FRAME_TIME);
    if event != GunEvent::Attached(crate_body) {
        return Err(DemoError::NothingGrabbed);
    }
    info!("Holding crate at {:.2} m", gun.distance());

    // Swing to the left and up, pulling it closer halfway through
    for i in 0..132 {
        let t = i as f32 / 132.0;
        let command = if t > 0.5 { HoldCommand::Pull } else { HoldCommand::None };
        let event = gun.update(&mut world, &aim(0.6 * t, 0.2 * t), command, FRAME_TIME);
        if let GunEvent::Dropped(body) = event {
            warn!("Lost {:?} while swinging", body);
            return Ok(());
        }
        step_frame(&mut world, &mut gun);
        frame += 1;
        if frame % 11 == 0 {
            log_progress(frame, &world, &gun);
        }
    }

    // Seat the bottom face on the floor below the aim
    info!("Seating crate");
    let seat_aim = aim(0.6, -0.3);
    for _ in 0..66 {
        gun.update(&mut world, &seat_aim, HoldCommand::None, FRAME_TIME);
        let below = world
            .body(crate_body)
            .map_or_else(Vec3::zeros, |b| {
                Vec3::new(b.transform.position.x, b.transform.position.y, 0.0)
            });
        gun.set_alignment(-Vec3::z(), Vec3::new(0.0, 0.0, -0.4), -Vec3::z(), below);
        step_frame(&mut world, &mut gun);
        frame += 1;
        if frame % 11 == 0 {
            log_progress(frame, &world, &gun);
        }
    }

    let snapshot = gun
        .controller()
        .snapshot()
        .to_ron()
        .map_err(|e| DemoError::Snapshot(e.to_string()))?;
    debug!("Controller state before release:\n{snapshot}");

    // Let go; the reference world has no contacts, so it falls freely
    gun.idle(&mut world);
    for _ in 0..66 {
        world.substep(FRAME_TIME, SUBSTEPS, &mut []);
    }
    if let Some(body) = world.body(crate_body) {
        info!("One second after release the crate is at {:?}", body.transform.position);
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC occurred: {panic_info}");
    }));

    let config = match std::env::args().nth(1) {
        Some(path) => GravityGunConfig::load_from_file(&path).map_err(DemoError::from)?,
        None => GravityGunConfig::default(),
    };
    config.validate().map_err(DemoError::from)?;

    logging::init_with_level(&config.log_level);
    info!("Starting gravity gun demo");

    run(&config)?;

    info!("Demo finished");
    Ok(())
}
