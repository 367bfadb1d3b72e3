use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{info, Level, LevelFilter, Metadata, Record};

use ember_engine::ecs::{Entity, Signature, System, World};
use ember_engine::jobs::{Job, JobSystem, Priority};

/// Plain stderr logger for the demo app.
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

#[derive(Clone, Debug)]
struct Transform {
    x: f32,
    y: f32,
}

#[derive(Clone, Debug)]
struct Rigidbody2D {
    vel_x: f32,
    vel_y: f32,
}

#[derive(Clone, Debug)]
struct SpriteRender {
    texture: String,
}

/// Integrates velocity into position for every entity owning both.
struct MoveSystem {
    dt: f32,
}

impl System for MoveSystem {
    fn update(&mut self, world: &mut World, entities: &BTreeSet<Entity>) {
        for &entity in entities {
            let body = world.get_component::<Rigidbody2D>(entity).clone();
            let transform = world.get_component_mut::<Transform>(entity);
            transform.x += body.vel_x * self.dt;
            transform.y += body.vel_y * self.dt;
        }
    }
}

/// Logs what would be drawn this frame.
struct RenderSystem;

impl System for RenderSystem {
    fn update(&mut self, world: &mut World, entities: &BTreeSet<Entity>) {
        for &entity in entities {
            let sprite = world.get_component::<SpriteRender>(entity);
            let transform = world.get_component::<Transform>(entity);
            info!(
                "draw {} at ({:.1}, {:.1})",
                sprite.texture, transform.x, transform.y
            );
        }
    }
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn main() {
    log::set_logger(&LOGGER).expect("logger already set");
    log::set_max_level(LevelFilter::Info);

    // Pretend-decode some textures on the job pool before the world spins up.
    let jobs = JobSystem::with_default_parallelism();
    let decoded = Arc::new(AtomicUsize::new(0));
    let batch: Vec<Job> = ["player.png", "crate.png", "tileset.png"]
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let decoded = Arc::clone(&decoded);
            let priority = if i == 0 { Priority::High } else { Priority::Normal };
            Job::new(priority, move || {
                std::thread::sleep(Duration::from_millis(5));
                info!("decoded {name}");
                decoded.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();
    jobs.kick_all_and_wait(batch);
    info!("{} textures ready", decoded.load(Ordering::SeqCst));

    let mut world = World::new();
    world.register_component::<Transform>().unwrap();
    world.register_component::<Rigidbody2D>().unwrap();
    world.register_component::<SpriteRender>().unwrap();

    world.register_system(MoveSystem { dt: 1.0 / 60.0 });
    world.set_system_signature::<MoveSystem>(Signature::from_ids([
        world.component_id::<Transform>(),
        world.component_id::<Rigidbody2D>(),
    ]));
    world.register_system(RenderSystem);
    world.set_system_signature::<RenderSystem>(Signature::from_ids([
        world.component_id::<Transform>(),
        world.component_id::<SpriteRender>(),
    ]));
    world.init_system::<MoveSystem>();
    world.init_system::<RenderSystem>();

    let player = world.create_entity().unwrap();
    world.add_component(player, Transform { x: 0.0, y: 0.0 });
    world.add_component(player, Rigidbody2D { vel_x: 60.0, vel_y: 0.0 });
    world.add_component(
        player,
        SpriteRender {
            texture: "player.png".into(),
        },
    );

    let crate_prop = world.create_entity().unwrap();
    world.add_component(crate_prop, Transform { x: 10.0, y: 5.0 });
    world.add_component(
        crate_prop,
        SpriteRender {
            texture: "crate.png".into(),
        },
    );

    // A second crate, stamped out from the first.
    let cloned = world.clone_entity(crate_prop).unwrap();
    world.get_component_mut::<Transform>(cloned).x = 14.0;

    info!("{} entities live", world.living_entity_count());

    for _frame in 0..3 {
        world.run_system::<MoveSystem>();
        world.run_system::<RenderSystem>();
    }

    world.destroy_entity(crate_prop).unwrap();
    info!("{} entities live after teardown", world.living_entity_count());
    world.run_system::<RenderSystem>();
}
