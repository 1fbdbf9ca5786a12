//! Tag sideband and event queue behavior alongside a live world.

use mask_ecs::{ComponentData, EventQueue, Tags, World};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Damage {
    target: u32,
    amount: i32,
}

#[test]
fn tags_survive_structural_moves() {
    let mut world = World::new();
    let a = world.register_component_raw(4, 4).unwrap();
    let b = world.register_component_raw(4, 4).unwrap();

    let mut tags = Tags::new();
    let selected = tags.register("selected").unwrap();

    let entity = world.spawn(a, &[ComponentData::zeroed(a)]);
    tags.add(selected, entity);

    // Moving the entity between archetypes must not disturb its tags.
    world.add_component_bytes(entity, b, None);
    world.remove_component(entity, b);
    assert!(tags.has(selected, entity));
    assert_eq!(tags.query(selected), &[entity]);
}

#[test]
fn despawn_cleanup_is_explicit() {
    let mut world = World::new();
    let a = world.register_component_raw(4, 4).unwrap();

    let mut tags = Tags::new();
    let enemy = tags.register("enemy").unwrap();

    let entity = world.spawn(a, &[ComponentData::zeroed(a)]);
    tags.add(enemy, entity);
    world.despawn(entity);

    // The sideband does not watch the world; the stale entry stays until
    // the caller sweeps it.
    assert_eq!(tags.count(enemy), 1);
    tags.clear_entity(entity);
    assert_eq!(tags.count(enemy), 0);
}

#[test]
fn recycled_ids_do_not_inherit_tags() {
    let mut world = World::new();
    let a = world.register_component_raw(4, 4).unwrap();

    let mut tags = Tags::new();
    let enemy = tags.register("enemy").unwrap();

    let old = world.spawn(a, &[ComponentData::zeroed(a)]);
    tags.add(enemy, old);
    world.despawn(old);

    let new = world.spawn(a, &[ComponentData::zeroed(a)]);
    assert_eq!(new.id, old.id);
    // Same slot, different generation: the membership check must fail.
    assert!(!tags.has(enemy, new));
}

#[test]
fn event_queue_ticks_produce_then_consume() {
    let mut damage = EventQueue::new();

    damage.send(Damage { target: 3, amount: 25 });
    damage.send(Damage { target: 3, amount: 10 });
    damage.send(Damage { target: 9, amount: 5 });

    let on_target: i32 = damage
        .read()
        .iter()
        .filter(|event| event.target == 3)
        .map(|event| event.amount)
        .sum();
    assert_eq!(on_target, 35);
    assert_eq!(damage.len(), 3);

    damage.clear();
    assert!(damage.is_empty());
}
