use std::alloc::Layout;

use bytemuck::{Pod, Zeroable};

use crate::prelude::*;
use crate::store::column::Column;

#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Position {
    x: i32,
    y: i32,
}

#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Rotation {
    angle: i32,
}

#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Tag;

#[test]
fn column_growth_rounds_to_increment() {
    let mut column = Column::with_capacity(Layout::new::<u64>(), 2, 4);
    assert!(column.capacity() == 2);

    for value in 0u64..5 {
        // SAFETY: value is 8 readable bytes
        unsafe { column.push_from(&value as *const u64 as *const u8) };
    }
    assert!(column.len() == 5);
    assert!(column.capacity() == 8);

    for value in 0u64..5 {
        let ptr = column.get(value as usize);
        assert!(unsafe { *(ptr as *const u64) } == value);
    }
}

#[test]
fn column_swap_remove_reports_real_swaps() {
    let mut column = Column::with_capacity(Layout::new::<u32>(), 4, 4);
    for value in [10u32, 20, 30] {
        unsafe { column.push_from(&value as *const u32 as *const u8) };
    }

    assert!(column.swap_remove(0));
    assert!(column.len() == 2);
    assert!(unsafe { *(column.get(0) as *const u32) } == 30);

    // removing the last row moves nothing
    assert!(!column.swap_remove(1));
    assert!(column.len() == 1);
}

#[test]
fn column_zero_sized_allocates_nothing() {
    let mut column = Column::with_capacity(Layout::new::<Tag>(), 4, 4);
    assert!(column.base_ptr().is_null());

    let row = column.push_zeroed();
    assert!(row == 0);
    assert!(column.len() == 1);
    assert!(column.get(0).is_null());
    assert!(!column.swap_remove(0));
}

#[test]
#[should_panic]
fn column_out_of_bounds_panics() {
    let column = Column::with_capacity(Layout::new::<u32>(), 4, 4);
    column.get(0);
}

#[test]
fn mask_operations() {
    let a = ComponentId::from_index(1);
    let b = ComponentId::from_index(70);
    let c = ComponentId::from_index(127);

    let mask = Mask::from_ids(&[a, b]);
    assert!(mask.get(a) && mask.get(b) && !mask.get(c));
    assert!(mask.count() == 2);
    assert!(mask.contains(&Mask::from_ids(&[a])));
    assert!(!mask.contains(&Mask::from_ids(&[a, c])));
    assert!(mask.is_disjoint(&Mask::from_ids(&[c])));
    assert!(!mask.is_disjoint(&Mask::from_ids(&[b, c])));

    assert!(mask.with(c).count() == 3);
    assert!(mask.without(b) == Mask::from_ids(&[a]));
    assert!(mask.union(&Mask::from_ids(&[b, c])) == Mask::from_ids(&[a, b, c]));
    assert!(mask.difference(&Mask::from_ids(&[b, c])) == Mask::from_ids(&[a]));

    let ids: Vec<ComponentId> = mask.ids().collect();
    assert!(ids == vec![a, b]);
}

#[test]
fn registry_ids_are_dense_and_stable() {
    let mut world = World::new();
    let p = world.component_init::<Position>().unwrap();
    let r = world.component_init::<Rotation>().unwrap();
    let t = world.component_init::<Tag>().unwrap();

    assert!(p.index() == 0 && r.index() == 1 && t.index() == 2);
    assert!(world.component_init::<Rotation>().unwrap() == r);
    assert!(world.component_id::<Rotation>() == Some(r));

    let named = world
        .component_register("health", Layout::from_size_align(8, 4).unwrap())
        .unwrap();
    assert!(named.index() == 3);
    assert!(
        world
            .component_register("health", Layout::from_size_align(8, 4).unwrap())
            .unwrap()
            == named
    );
}

#[test]
fn registry_exhaustion_fails() {
    let mut world = World::new();
    let layout = Layout::from_size_align(4, 4).unwrap();
    for i in 0..MASK_TOTAL_BITS {
        world.component_register(&format!("comp{i}"), layout).unwrap();
    }
    assert!(
        world.component_register("one_too_many", layout)
            == Err(EcsError::TooManyComponentTypes)
    );
}

#[test]
fn create_get_destroy() {
    let mut world = World::new();
    let p = world.component_init::<Position>().unwrap();
    let r = world.component_init::<Rotation>().unwrap();

    let e0 = world
        .entity_create_with((Position { x: 1, y: 2 }, Rotation { angle: 3 }))
        .unwrap();
    let e1 = world
        .entity_create_with((Position { x: 4, y: 5 }, Rotation { angle: 6 }))
        .unwrap();

    assert!(world.entity_get::<Position>(e0) == Some(&Position { x: 1, y: 2 }));
    assert!(world.entity_get::<Rotation>(e1) == Some(&Rotation { angle: 6 }));

    // raw bytes of e0's position, little endian
    let ptr = world.entity_get_ptr(e0, p);
    let bytes = unsafe { std::slice::from_raw_parts(ptr as *const u8, 8) };
    assert!(bytes == &[1u8, 0, 0, 0, 2, 0, 0, 0][..]);

    world.entity_destroy(e0).unwrap();
    assert!(!world.entity_alive(e0));
    assert!(world.entity_get::<Position>(e0).is_none());
    assert!(world.entity_get_ptr(e0, p).is_null());

    // e1 was swapped into row 0 and still resolves
    assert!(world.entity_get::<Position>(e1) == Some(&Position { x: 4, y: 5 }));
    let include = Mask::from_ids(&[p, r]);
    let view = world.query(&include, &Mask::default()).next().unwrap();
    assert!(view.len() == 1);
    assert!(view.entities()[0] == e1);
}

#[test]
fn add_zero_initialized_then_write() {
    let mut world = World::new();
    let r = world.component_init::<Rotation>().unwrap();

    let e = world
        .entity_create_with(Position { x: 0, y: 0 })
        .unwrap();
    world.entity_add(e, &[r]).unwrap();

    assert!(world.entity_has(e, r));
    assert!(world.entity_get::<Rotation>(e) == Some(&Rotation { angle: 0 }));
    assert!(world.entity_get::<Position>(e) == Some(&Position { x: 0, y: 0 }));

    world.entity_write(e, Rotation { angle: 42 }).unwrap();
    assert!(world.entity_get::<Rotation>(e) == Some(&Rotation { angle: 42 }));
}

#[test]
fn duplicate_add_is_rejected_without_mutation() {
    let mut world = World::new();
    let r = world.component_init::<Rotation>().unwrap();

    let e = world
        .entity_create_with(Position { x: 7, y: 8 })
        .unwrap();
    world.entity_add(e, &[r]).unwrap();
    world.entity_write(e, Rotation { angle: 9 }).unwrap();

    let archetypes_before = world.archetypes().len();
    assert!(world.entity_add(e, &[r]) == Err(EcsError::DuplicateComponent(r)));
    assert!(world.entity_add(e, &[r, r]) == Err(EcsError::DuplicateComponent(r)));

    assert!(world.archetypes().len() == archetypes_before);
    assert!(world.entity_get::<Rotation>(e) == Some(&Rotation { angle: 9 }));
    assert!(world.entity_get::<Position>(e) == Some(&Position { x: 7, y: 8 }));
}

#[test]
fn remove_of_absent_component_fails() {
    let mut world = World::new();
    let r = world.component_init::<Rotation>().unwrap();

    let e = world
        .entity_create_with(Position { x: 0, y: 0 })
        .unwrap();
    assert!(world.entity_remove(e, &[r]) == Err(EcsError::MissingComponent(r)));
    assert!(world.entity_write(e, Rotation { angle: 1 }) == Err(EcsError::MissingComponent(r)));
}

#[test]
fn add_remove_round_trip_restores_row() {
    let mut world = World::new();
    let t = world.component_init::<Tag>().unwrap();

    let e = world
        .entity_create_with((Position { x: 11, y: 12 }, Rotation { angle: 13 }))
        .unwrap();
    let p = world.component_id::<Position>().unwrap();
    let r = world.component_id::<Rotation>().unwrap();
    let mask_before = Mask::from_ids(&[p, r]);

    world.entity_add(e, &[t]).unwrap();
    assert!(world.entity_has(e, t));
    world.entity_remove(e, &[t]).unwrap();
    assert!(!world.entity_has(e, t));

    assert!(world.entity_get::<Position>(e) == Some(&Position { x: 11, y: 12 }));
    assert!(world.entity_get::<Rotation>(e) == Some(&Rotation { angle: 13 }));

    let view = world
        .query(&Mask::from_ids(&[p, r]), &Mask::from_ids(&[t]))
        .find(|v| v.len() == 1)
        .unwrap();
    assert!(*view.mask() == mask_before);
}

#[test]
fn dead_entity_operations_fail() {
    let mut world = World::new();
    let p = world.component_init::<Position>().unwrap();
    let r = world.component_init::<Rotation>().unwrap();

    let e = world.entity_create(&[p]).unwrap();
    world.entity_destroy(e).unwrap();

    assert!(world.entity_get::<Position>(e).is_none());
    assert!(world.entity_get_ptr(e, p).is_null());
    assert!(!world.entity_has(e, p));
    assert!(world.entity_add(e, &[r]) == Err(EcsError::DeadEntity));
    assert!(world.entity_remove(e, &[p]) == Err(EcsError::DeadEntity));
    assert!(world.entity_destroy(e) == Err(EcsError::DeadEntity));

    // the recycled slot reuses the index with a strictly greater generation
    let e2 = world.entity_create(&[p]).unwrap();
    assert!(e2.index() == e.index());
    assert!(e2.generation() > e.generation());
    assert!(world.entity_alive(e2));
    assert!(!world.entity_alive(e));
}

#[test]
fn zero_sized_components() {
    let mut world = World::new();
    let p = world.component_init::<Position>().unwrap();
    let t = world.component_init::<Tag>().unwrap();

    let plain = world.entity_create(&[p]).unwrap();
    let tagged = world.entity_create(&[p, t]).unwrap();

    assert!(world.entity_has(tagged, t));
    assert!(!world.entity_has(plain, t));
    assert!(world.entity_get::<Tag>(tagged).is_none());
    assert!(world.entity_get_ptr(tagged, t).is_null());

    // tagging creates a distinct archetype
    let tagged_rows: usize = world
        .query(&Mask::from_ids(&[p, t]), &Mask::default())
        .map(|view| view.len())
        .sum();
    let plain_rows: usize = world
        .query(&Mask::from_ids(&[p]), &Mask::from_ids(&[t]))
        .map(|view| view.len())
        .sum();
    assert!(tagged_rows == 1);
    assert!(plain_rows == 1);

    let view = world
        .query(&Mask::from_ids(&[p, t]), &Mask::default())
        .next()
        .unwrap();
    assert!(view.column_ptr(t).is_null());
    assert!(view.item_size(t) == 0);
    let tags: &[Tag] = view.column::<Tag>().unwrap();
    assert!(tags.len() == 1);
}

#[test]
fn swap_remove_updates_displaced_entity() {
    let mut world = World::new();
    let p = world.component_init::<Position>().unwrap();
    let r = world.component_init::<Rotation>().unwrap();

    let entities: Vec<Entity> = (0..1000)
        .map(|i| {
            world
                .entity_create_with((Position { x: i, y: -i }, Rotation { angle: i }))
                .unwrap()
        })
        .collect();

    world.entity_remove(entities[500], &[r]).unwrap();

    let both = world
        .query(&Mask::from_ids(&[p, r]), &Mask::default())
        .next()
        .unwrap();
    assert!(both.len() == 999);
    // the old tail row was swapped into row 500
    assert!(both.entities()[500] == entities[999]);

    let only_p: usize = world
        .query(&Mask::from_ids(&[p]), &Mask::from_ids(&[r]))
        .map(|view| view.len())
        .sum();
    assert!(only_p == 1);

    // every original handle still resolves to its own data
    for (i, &entity) in entities.iter().enumerate() {
        let position = world.entity_get::<Position>(entity).unwrap();
        assert!(position.x == i as i32 && position.y == -(i as i32));
    }
}

#[test]
fn bundle_order_does_not_matter() {
    let mut world = World::new();

    let a = world
        .entity_create_with((Position { x: 1, y: 1 }, Rotation { angle: 1 }))
        .unwrap();
    let b = world
        .entity_create_with((Rotation { angle: 2 }, Position { x: 2, y: 2 }))
        .unwrap();

    let p = world.component_id::<Position>().unwrap();
    let r = world.component_id::<Rotation>().unwrap();
    let view = world
        .query(&Mask::from_ids(&[p, r]), &Mask::default())
        .next()
        .unwrap();
    assert!(view.len() == 2);
    assert!(world.entity_get::<Position>(a) == Some(&Position { x: 1, y: 1 }));
    assert!(world.entity_get::<Rotation>(b) == Some(&Rotation { angle: 2 }));
}

#[test]
fn entity_set_moves_and_writes() {
    let mut world = World::new();

    let e = world
        .entity_create_with(Position { x: 5, y: 6 })
        .unwrap();
    world
        .entity_set(e, (Rotation { angle: 30 }, Tag))
        .unwrap();

    assert!(world.entity_get::<Rotation>(e) == Some(&Rotation { angle: 30 }));
    assert!(world.entity_get::<Position>(e) == Some(&Position { x: 5, y: 6 }));
    let t = world.component_id::<Tag>().unwrap();
    assert!(world.entity_has(e, t));

    // setting an already present component is rejected
    assert!(
        world.entity_set(e, Rotation { angle: 1 })
            == Err(EcsError::DuplicateComponent(world.component_id::<Rotation>().unwrap()))
    );
    assert!(world.entity_get::<Rotation>(e) == Some(&Rotation { angle: 30 }));
}

#[test]
fn exchange_is_one_move() {
    let mut world = World::new();
    let r = world.component_init::<Rotation>().unwrap();
    let t = world.component_init::<Tag>().unwrap();

    let e = world
        .entity_create_with((Position { x: 3, y: 4 }, Rotation { angle: 5 }))
        .unwrap();
    world.entity_exchange(e, &[t], &[r]).unwrap();

    assert!(world.entity_has(e, t));
    assert!(!world.entity_has(e, r));
    assert!(world.entity_get::<Position>(e) == Some(&Position { x: 3, y: 4 }));
}

#[test]
fn transitions_share_archetypes_and_cache_edges() {
    let mut world = World::new();
    let p = world.component_init::<Position>().unwrap();
    let r = world.component_init::<Rotation>().unwrap();

    // reach {P, R} along two different orders
    let a = world.entity_create(&[p]).unwrap();
    world.entity_add(a, &[r]).unwrap();
    let b = world.entity_create(&[r]).unwrap();
    world.entity_add(b, &[p]).unwrap();

    let archetypes = world.archetypes().len();

    // churn across the cached edges; no new archetypes appear
    for _ in 0..10 {
        world.entity_remove(a, &[r]).unwrap();
        world.entity_add(a, &[r]).unwrap();
    }
    assert!(world.archetypes().len() == archetypes);

    // every cached edge has its inverse
    for index in 0..world.archetypes().len() {
        let id = crate::archetype::ArchetypeId::from_index(index);
        let node = world.archetypes().node(id);
        for bit in 0..MASK_TOTAL_BITS {
            if let Some(target) = node.to_add[bit] {
                assert!(world.archetypes().node(target).to_remove[bit] == Some(id));
            }
            if let Some(target) = node.to_remove[bit] {
                assert!(world.archetypes().node(target).to_add[bit] == Some(id));
            }
        }
    }
}

#[test]
fn access_table_is_null_exactly_for_absent_or_zero_sized() {
    let mut world = World::new();
    let p = world.component_init::<Position>().unwrap();
    let t = world.component_init::<Tag>().unwrap();
    world.entity_create(&[p, t]).unwrap();

    for view in world.query(&Mask::default(), &Mask::default()) {
        for index in 0..MASK_TOTAL_BITS {
            let id = ComponentId::from_index(index);
            let stored = view.mask().get(id);
            let sized = stored && world.components().info(id).size() > 0;
            assert!(view.column_ptr(id).is_null() != sized);
        }
    }
}

#[test]
fn archetype_capacity_grows_in_lockstep() {
    let mut world = World::with_config(Config {
        capacity_increment: 4,
    });
    let p = world.component_init::<Position>().unwrap();

    for _ in 0..5 {
        world.entity_create(&[p]).unwrap();
    }

    let view = world
        .query(&Mask::from_ids(&[p]), &Mask::default())
        .next()
        .unwrap();
    let archetype = world.archetypes().get(view.id());
    assert!(archetype.len() == 5);
    assert!(archetype.capacity() == 8);
}

#[test]
fn comp_map_caches_the_id() {
    let mut world = World::new();
    let positions = CompMap::<Position>::new(&mut world).unwrap();

    let e = world
        .entity_create_with(Position { x: 1, y: 2 })
        .unwrap();
    assert!(positions.has(&world, e));
    assert!(positions.get(&world, e) == Some(&Position { x: 1, y: 2 }));

    positions.write(&mut world, e, Position { x: 9, y: 9 }).unwrap();
    assert!(positions.get(&world, e) == Some(&Position { x: 9, y: 9 }));
    positions.get_mut(&mut world, e).unwrap().x = 10;
    assert!(positions.get(&world, e) == Some(&Position { x: 10, y: 9 }));
}

#[test]
fn named_components_store_raw_bytes() {
    let mut world = World::new();
    let health = world
        .component_register("health", Layout::from_size_align(8, 4).unwrap())
        .unwrap();

    let e = world.entity_create(&[health]).unwrap();
    let ptr = world.entity_get_ptr(e, health);
    assert!(!ptr.is_null());
    assert!(unsafe { std::slice::from_raw_parts(ptr, 8) } == &[0u8; 8][..]);

    let payload = [1u8, 2, 3, 4, 5, 6, 7, 8];
    unsafe { world.entity_write_ptr(e, health, payload.as_ptr()).unwrap() };
    let ptr = world.entity_get_ptr(e, health);
    assert!(unsafe { std::slice::from_raw_parts(ptr, 8) } == &payload[..]);
}

#[test]
fn query_views_expose_typed_columns() {
    let mut world = World::new();
    for i in 0..4 {
        world
            .entity_create_with((Position { x: i, y: i }, Rotation { angle: i * 90 }))
            .unwrap();
    }
    world.entity_create_with(Position { x: 100, y: 100 }).unwrap();

    let p = world.component_id::<Position>().unwrap();
    let total: i32 = world
        .query(&Mask::from_ids(&[p]), &Mask::default())
        .filter_map(|view| view.column::<Position>())
        .flat_map(|column| column.iter())
        .map(|position| position.x)
        .sum();
    assert!(total == 106);
}
