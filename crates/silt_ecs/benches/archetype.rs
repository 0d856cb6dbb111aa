use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use silt_ecs::prelude::*;

const ENTITY_COUNT: usize = 100_000;

#[derive(Component, Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Component, Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

/// Deterministic xorshift indices so runs are comparable.
fn random_indices(count: usize, max: usize, seed: u64) -> Vec<usize> {
    let mut indices = Vec::with_capacity(count);
    let mut state = seed;
    for _ in 0..count {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        indices.push(state as usize % max);
    }
    indices
}

fn spawn_world(count: usize) -> (World, Vec<Entity>) {
    let mut world = World::new();
    let entities = (0..count)
        .map(|i| {
            world
                .entity_create_with((
                    Position {
                        x: i as f32,
                        y: 0.0,
                        z: 0.0,
                    },
                    Velocity {
                        x: 1.0,
                        y: 2.0,
                        z: 3.0,
                    },
                ))
                .expect("spawn failed")
        })
        .collect();
    (world, entities)
}

fn bench_spawn(c: &mut Criterion) {
    c.bench_function("spawn_100k", |b| {
        b.iter(|| {
            let (world, _) = spawn_world(ENTITY_COUNT);
            black_box(world.archetypes().len())
        });
    });
}

fn bench_random_access(c: &mut Criterion) {
    let (mut world, entities) = spawn_world(ENTITY_COUNT);
    let positions = CompMap::<Position>::new(&mut world).expect("registry full");
    let indices = random_indices(ENTITY_COUNT, ENTITY_COUNT, 0xDEAD_BEEF);

    c.bench_function("random_access_100k", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for &index in &indices {
                if let Some(position) = positions.get(&world, entities[index]) {
                    sum += position.x;
                }
            }
            black_box(sum)
        });
    });
}

fn bench_iterate_columns(c: &mut Criterion) {
    let (mut world, _) = spawn_world(ENTITY_COUNT);
    let p = world.component_id::<Position>().expect("not registered");
    let v = world.component_id::<Velocity>().expect("not registered");
    let include = Mask::from_ids(&[p, v]);

    c.bench_function("iterate_columns_100k", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for view in world.query(&include, &Mask::default()) {
                let positions = view.column::<Position>().expect("missing column");
                let velocities = view.column::<Velocity>().expect("missing column");
                for (position, velocity) in positions.iter().zip(velocities) {
                    sum += position.x + velocity.x;
                }
            }
            black_box(sum)
        });
    });
}

fn bench_transition(c: &mut Criterion) {
    let (mut world, entities) = spawn_world(1_000);
    let v = world.component_id::<Velocity>().expect("not registered");

    c.bench_function("add_remove_1k", |b| {
        b.iter(|| {
            for &entity in &entities {
                world.entity_remove(entity, &[v]).expect("remove failed");
            }
            for &entity in &entities {
                world.entity_add(entity, &[v]).expect("add failed");
            }
        });
    });
}

criterion_group!(
    benches,
    bench_spawn,
    bench_random_access,
    bench_iterate_columns,
    bench_transition
);
criterion_main!(benches);
