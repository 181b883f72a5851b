//! Walks through the main surfaces of a world: spawning via a prefab,
//! querying by component and by tag, migrating an entity across
//! archetypes, and dispatching a deferred event.

use mosaic::{Component, Entity, Event, Tag, World};

#[derive(Component, Clone, Copy, Debug)]
struct Position {
    x: i32,
    y: i32,
}

#[derive(Component, Clone, Copy, Debug)]
struct Velocity {
    dx: i32,
    dy: i32,
}

#[derive(Component, Clone, Copy, Debug)]
struct Health {
    current: i32,
    max: i32,
}

struct Movable;
impl Tag for Movable {}

#[derive(Event, Debug)]
struct Collision {
    a: Entity,
    b: Entity,
}

fn main() {
    let _ = env_logger::try_init();

    let mut world = World::new();

    world.register_prefab(
        "goblin",
        vec![
            mosaic::prefab::component(Position { x: 0, y: 0 }),
            mosaic::prefab::component(Health { current: 10, max: 10 }),
        ],
    );

    let goblin = world.spawn("goblin").expect("prefab is registered");
    let hero = world
        .spawn_with("goblin", Position { x: 5, y: 5 })
        .expect("prefab is registered");

    world.add_component(hero, Velocity { dx: 1, dy: 0 });
    world.add_tag::<Movable>(hero);

    world.register_listener::<Collision>(|event| {
        println!("collision between {:?} and {:?}", event.a, event.b);
    });
    world.send_event(Collision { a: goblin, b: hero });
    world.dispatch_event_queue();

    println!("entities with a position:");
    for entity in world.with_component::<Position>() {
        let pos = world.get_component::<Position>(entity).unwrap();
        println!("  {:?} at {:?}", entity, pos);
    }

    println!("movable entities:");
    for entity in world.with_tag::<Movable>() {
        println!("  {:?}", entity);
    }

    world.remove_component::<Velocity>(hero);
    println!(
        "hero still has a position: {}",
        world.has_component::<Position>(hero)
    );
    println!(
        "hero lost its velocity: {}",
        !world.has_component::<Velocity>(hero)
    );
}
