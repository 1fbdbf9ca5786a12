// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Slot recycling and handle staleness under churn.

use bytemuck::{Pod, Zeroable};
use mask_ecs::{ComponentData, World};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct Marker {
    value: u64,
}

#[test]
fn slot_table_growth_is_bounded_by_peak_population() {
    let mut world = World::new();
    let marker = world.register_component::<Marker>().unwrap();

    // Spawn and despawn in waves; ids must stay within the peak population.
    let mut max_id = 0;
    for _ in 0..10 {
        let entities = world.spawn_batch(marker, 100);
        for &entity in &entities {
            max_id = max_id.max(entity.id);
        }
        assert_eq!(world.despawn_batch(&entities), 100);
    }

    assert!(max_id < 100);
    assert_eq!(world.entity_count(), 0);
}

#[test]
fn stale_handles_never_read_recycled_slots() {
    let mut world = World::new();
    let marker = world.register_component::<Marker>().unwrap();

    let value = Marker { value: 111 };
    let old = world.spawn(marker, &[ComponentData::from_value(marker, &value)]);
    world.despawn(old);

    let replacement = Marker { value: 222 };
    let new = world.spawn(marker, &[ComponentData::from_value(marker, &replacement)]);
    assert_eq!(new.id, old.id);

    // The stale handle must not observe the replacement's data.
    assert_eq!(world.get::<Marker>(old, marker), None);
    assert!(!world.has(old, marker));
    assert_eq!(world.component_mask(old), None);
    assert_eq!(world.get::<Marker>(new, marker), Some(&replacement));
}

#[test]
fn every_row_keeps_its_entity_under_churn() {
    let mut world = World::new();
    let marker = world.register_component::<Marker>().unwrap();

    let mut live = Vec::new();
    for i in 0..50u64 {
        let value = Marker { value: i };
        live.push((
            world.spawn(marker, &[ComponentData::from_value(marker, &value)]),
            i,
        ));
    }

    // Despawn every third entity, forcing repeated swap-remove repairs.
    let mut index = 0;
    live.retain(|&(entity, _)| {
        index += 1;
        if index % 3 == 0 {
            assert!(world.despawn(entity));
            false
        } else {
            true
        }
    });

    for &(entity, expected) in &live {
        assert_eq!(
            world.get::<Marker>(entity, marker),
            Some(&Marker { value: expected })
        );
    }
    assert_eq!(world.entity_count(), live.len());
}
