// mobj.rs -- map objects and the slot pool that owns them
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.

use sectorsim_common::shared::Vec3;

use crate::defs::{MobjFlags, SubsectorId};
use crate::occupancy::SecNodeId;

/// Handle to a pool slot. The generation makes a handle to a freed slot
/// resolve to nothing, even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MobjId {
    pub index: u32,
    pub generation: u32,
}

#[derive(Debug, Clone)]
pub struct Mobj {
    /// caller-defined type tag
    pub kind: i32,
    pub origin: Vec3,
    pub momentum: Vec3,
    /// facing, radians
    pub angle: f32,
    pub radius: f32,
    pub height: f32,
    pub mass: i32,
    pub health: i32,
    pub flags: MobjFlags,

    pub floorz: f32,
    pub ceilingz: f32,
    pub dropoffz: f32,
    pub subsector: SubsectorId,

    /// owner for missiles, victim for monsters
    pub target: Option<MobjId>,
    pub missile_damage: i32,
    pub is_player: bool,

    // blockmap cell chain
    pub block_cell: Option<usize>,
    pub bprev: Option<MobjId>,
    pub bnext: Option<MobjId>,

    // center sector chain
    pub sprev: Option<MobjId>,
    pub snext: Option<MobjId>,

    /// head of this thing's occupancy node thread
    pub touching_sectors: Option<SecNodeId>,
}

impl Mobj {
    #[inline]
    pub fn x(&self) -> f32 {
        self.origin[0]
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.origin[1]
    }

    #[inline]
    pub fn z(&self) -> f32 {
        self.origin[2]
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

/// Spawn parameters. `z: None` puts the thing on the floor.
#[derive(Debug, Clone)]
pub struct MobjSpawn {
    pub kind: i32,
    pub x: f32,
    pub y: f32,
    pub z: Option<f32>,
    pub angle: f32,
    pub radius: f32,
    pub height: f32,
    pub mass: i32,
    pub health: i32,
    pub flags: MobjFlags,
    pub target: Option<MobjId>,
    pub missile_damage: i32,
    pub is_player: bool,
}

impl Default for MobjSpawn {
    fn default() -> Self {
        Self {
            kind: 0,
            x: 0.0,
            y: 0.0,
            z: None,
            angle: 0.0,
            radius: 20.0,
            height: 16.0,
            mass: 100,
            health: 1000,
            flags: MobjFlags::empty(),
            target: None,
            missile_damage: 0,
            is_player: false,
        }
    }
}

impl MobjSpawn {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Empty { generation: u32 },
    Alive { generation: u32, mobj: Mobj },
}

/// Owns every live map object.
#[derive(Debug, Clone, Default)]
pub struct MobjPool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl MobjPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mobj: Mobj) -> MobjId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            let generation = match *slot {
                Slot::Empty { generation } => generation,
                Slot::Alive { generation, .. } => generation,
            };
            *slot = Slot::Alive { generation, mobj };
            return MobjId { index, generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot::Alive { generation: 0, mobj });
        MobjId { index, generation: 0 }
    }

    /// Free the slot. The next tenant gets a new generation.
    pub fn remove(&mut self, id: MobjId) -> Option<Mobj> {
        let slot = self.slots.get_mut(id.index as usize)?;
        match slot {
            Slot::Alive { generation, .. } if *generation == id.generation => {}
            _ => return None,
        }
        let old = std::mem::replace(
            slot,
            Slot::Empty {
                generation: id.generation.wrapping_add(1),
            },
        );
        self.free.push(id.index);
        self.live -= 1;
        match old {
            Slot::Alive { mobj, .. } => Some(mobj),
            Slot::Empty { .. } => None,
        }
    }

    pub fn get(&self, id: MobjId) -> Option<&Mobj> {
        match self.slots.get(id.index as usize)? {
            Slot::Alive { generation, mobj } if *generation == id.generation => Some(mobj),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: MobjId) -> Option<&mut Mobj> {
        match self.slots.get_mut(id.index as usize)? {
            Slot::Alive { generation, mobj } if *generation == id.generation => Some(mobj),
            _ => None,
        }
    }

    pub fn contains(&self, id: MobjId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Handles of every live object in slot order.
    pub fn ids(&self) -> Vec<MobjId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MobjId, &Mobj)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Alive { generation, mobj } => Some((
                MobjId {
                    index: i as u32,
                    generation: *generation,
                },
                mobj,
            )),
            Slot::Empty { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mobj(kind: i32) -> Mobj {
        Mobj {
            kind,
            origin: [0.0; 3],
            momentum: [0.0; 3],
            angle: 0.0,
            radius: 16.0,
            height: 56.0,
            mass: 100,
            health: 100,
            flags: MobjFlags::empty(),
            floorz: 0.0,
            ceilingz: 128.0,
            dropoffz: 0.0,
            subsector: 0,
            target: None,
            missile_damage: 0,
            is_player: false,
            block_cell: None,
            bprev: None,
            bnext: None,
            sprev: None,
            snext: None,
            touching_sectors: None,
        }
    }

    #[test]
    fn insert_and_get() {
        let mut pool = MobjPool::new();
        let a = pool.insert(mobj(1));
        let b = pool.insert(mobj(2));
        assert_ne!(a, b);
        assert_eq!(pool.get(a).map(|m| m.kind), Some(1));
        assert_eq!(pool.get(b).map(|m| m.kind), Some(2));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn stale_handle_does_not_resolve_to_new_tenant() {
        let mut pool = MobjPool::new();
        let a = pool.insert(mobj(1));
        assert!(pool.remove(a).is_some());
        let b = pool.insert(mobj(2));
        assert_eq!(a.index, b.index);
        assert_ne!(a.generation, b.generation);
        assert!(pool.get(a).is_none());
        assert!(pool.get_mut(a).is_none());
        assert_eq!(pool.get(b).map(|m| m.kind), Some(2));
    }

    #[test]
    fn double_remove_is_harmless() {
        let mut pool = MobjPool::new();
        let a = pool.insert(mobj(1));
        assert!(pool.remove(a).is_some());
        assert!(pool.remove(a).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn ids_lists_live_slots_in_order() {
        let mut pool = MobjPool::new();
        let a = pool.insert(mobj(1));
        let b = pool.insert(mobj(2));
        let c = pool.insert(mobj(3));
        pool.remove(b);
        assert_eq!(pool.ids(), vec![a, c]);
    }
}
