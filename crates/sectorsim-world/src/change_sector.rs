// change_sector.rs -- reacting to floor and ceiling movement
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.

use sectorsim_common::common::com_dprintf;

use crate::defs::{SectorId, CRUSH_DAMAGE, MF_DROPPED, MF_NOBLOCKMAP, MF_SHOOTABLE, MF_SOLID};
use crate::mobj::MobjId;
use crate::world::{World, WorldEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanePart {
    Floor,
    Ceiling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneResult {
    Ok,
    Crushed,
    PastDest,
}

impl World {
    /// Re-fit every thing touching the sector after a height change.
    /// Returns true if something shootable no longer fits.
    pub fn change_sector(&mut self, sector: SectorId, crunch: bool) -> bool {
        let mut nofit = false;

        // things may be removed or relinked while we scan, so always
        // restart from the head and go by the visited marks
        self.occupancy.clear_sector_visited(sector);
        while let Some(thing) = self.occupancy.next_unvisited(sector) {
            let Some(mo) = self.mobjs.get(thing) else {
                continue;
            };
            if mo.flags.contains(MF_NOBLOCKMAP) {
                continue;
            }
            if self.change_sector_thing(thing, sector, crunch) {
                nofit = true;
            }
        }
        nofit
    }

    /// Returns true when the thing is shootable and stuck.
    fn change_sector_thing(&mut self, thing: MobjId, sector: SectorId, crunch: bool) -> bool {
        if self.thing_height_clip(thing) {
            return false;
        }
        let Some(mo) = self.mobjs.get_mut(thing) else {
            return false;
        };

        // crunch bodies to giblets
        if !mo.is_alive() {
            mo.flags.remove(MF_SOLID);
            mo.height = 0.0;
            mo.radius = 0.0;
            com_dprintf(&format!("change_sector: gibbed {}:{}\n", thing.index, thing.generation));
            self.relink_sector_nodes(thing);
            self.emit(WorldEvent::Gibbed { thing });
            return false;
        }

        // crunch dropped items
        if mo.flags.contains(MF_DROPPED) {
            self.remove_mobj(thing);
            self.emit(WorldEvent::Removed { thing });
            return false;
        }

        if !mo.flags.contains(MF_SHOOTABLE) {
            return false;
        }

        if crunch && self.leveltime % 4 == 0 {
            let origin = [mo.x(), mo.y(), mo.z() + mo.height / 2.0];
            self.damage_mobj(thing, None, None, CRUSH_DAMAGE);
            self.emit(WorldEvent::SpawnBlood {
                origin,
                damage: CRUSH_DAMAGE,
            });
            self.emit(WorldEvent::Crushed { thing, sector });
        }
        true
    }

    fn plane_height(&self, sector: SectorId, part: PlanePart) -> f32 {
        let s = &self.level.sectors[sector];
        match part {
            PlanePart::Floor => s.floor_height,
            PlanePart::Ceiling => s.ceiling_height,
        }
    }

    fn set_plane_height(&mut self, sector: SectorId, part: PlanePart, height: f32) {
        match part {
            PlanePart::Floor => self.set_floor_height(sector, height),
            PlanePart::Ceiling => self.set_ceiling_height(sector, height),
        }
    }

    /// Move a floor or ceiling `speed` units toward `dest`. `direction` is
    /// 1 for up and -1 for down. When something gets stuck the plane goes
    /// back, unless it is closing in and `crush` is set.
    pub fn move_plane(
        &mut self,
        sector: SectorId,
        speed: f32,
        dest: f32,
        crush: bool,
        part: PlanePart,
        direction: i32,
    ) -> PlaneResult {
        if sector >= self.level.sectors.len() {
            return PlaneResult::Ok;
        }
        let lastpos = self.plane_height(sector, part);

        let (next, past_dest) = match direction {
            -1 if lastpos - speed < dest => (dest, true),
            -1 => (lastpos - speed, false),
            1 if lastpos + speed > dest => (dest, true),
            1 => (lastpos + speed, false),
            _ => return PlaneResult::Ok,
        };

        self.set_plane_height(sector, part, next);
        let nofit = self.change_sector(sector, crush);

        if past_dest {
            if nofit {
                self.set_plane_height(sector, part, lastpos);
                self.change_sector(sector, crush);
            }
            return PlaneResult::PastDest;
        }
        if !nofit {
            return PlaneResult::Ok;
        }

        match (part, direction) {
            // a rising ceiling can't squeeze anything new
            (PlanePart::Ceiling, 1) => PlaneResult::Ok,
            (PlanePart::Floor, -1) => {
                self.set_plane_height(sector, part, lastpos);
                self.change_sector(sector, crush);
                PlaneResult::Crushed
            }
            _ => {
                if !crush {
                    self.set_plane_height(sector, part, lastpos);
                    self.change_sector(sector, crush);
                }
                PlaneResult::Crushed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::defs::{MobjFlags, MF_SPECIAL};
    use crate::level_builder::{sector, LevelBuilder};
    use crate::mobj::MobjSpawn;
    use crate::world::tests::{actor, flat_world};

    fn low_room() -> World {
        let data = LevelBuilder::new()
            .room(128.0, sector(0.0, 64.0))
            .room(128.0, sector(0.0, 128.0))
            .data();
        World::new(data, WorldConfig::default()).unwrap()
    }

    fn dropped(x: f32, y: f32) -> MobjSpawn {
        MobjSpawn {
            radius: 8.0,
            height: 16.0,
            flags: MF_SPECIAL | MF_DROPPED,
            ..MobjSpawn::at(x, y)
        }
    }

    // =========================================================================
    // change_sector
    // =========================================================================

    #[test]
    fn fitting_things_just_follow_the_floor() {
        let mut w = flat_world();
        let a = w.spawn_mobj(actor(64.0, 128.0));
        w.set_floor_height(0, 24.0);
        assert!(!w.change_sector(0, false));
        assert_eq!(w.mobj(a).unwrap().z(), 24.0);
    }

    #[test]
    fn dropped_items_removing_themselves_mid_scan() {
        let mut w = flat_world();
        let items: Vec<_> = (0..4)
            .map(|i| w.spawn_mobj(dropped(20.0 + i as f32 * 24.0, 64.0)))
            .collect();
        let keeper = w.spawn_mobj(MobjSpawn {
            radius: 8.0,
            height: 16.0,
            flags: MF_SPECIAL,
            ..MobjSpawn::at(60.0, 200.0)
        });

        w.set_ceiling_height(0, 8.0);
        assert!(!w.change_sector(0, false));
        for id in &items {
            assert!(w.mobj(*id).is_none());
        }
        assert!(w.mobj(keeper).is_some());
        assert!(w.occupancy.sector_things(0).iter().all(|t| *t == keeper));
        let removed = w
            .events()
            .iter()
            .filter(|e| matches!(e, WorldEvent::Removed { .. }))
            .count();
        assert_eq!(removed, 4);
    }

    #[test]
    fn corpses_are_gibbed() {
        let mut w = flat_world();
        let a = w.spawn_mobj(actor(64.0, 128.0));
        w.damage_mobj(a, None, None, 1000);
        w.set_ceiling_height(0, 10.0);
        assert!(!w.change_sector(0, false));
        let mo = w.mobj(a).unwrap();
        assert_eq!(mo.height, 0.0);
        assert_eq!(mo.radius, 0.0);
        assert!(!mo.flags.contains(MF_SOLID));
        assert!(w.events().contains(&WorldEvent::Gibbed { thing: a }));
    }

    #[test]
    fn stuck_shootable_reports_nofit() {
        let mut w = flat_world();
        w.spawn_mobj(actor(64.0, 128.0));
        let deco = w.spawn_mobj(MobjSpawn {
            height: 56.0,
            flags: MobjFlags::SOLID,
            ..MobjSpawn::at(64.0, 40.0)
        });
        w.set_ceiling_height(0, 40.0);
        assert!(w.change_sector(0, false));
        assert!(w.mobj(deco).is_some());
        assert!(w.events().is_empty());
    }

    #[test]
    fn noblockmap_things_are_skipped() {
        let mut w = flat_world();
        let ghost = w.spawn_mobj(MobjSpawn {
            flags: MF_SHOOTABLE | MF_NOBLOCKMAP,
            height: 56.0,
            ..MobjSpawn::at(64.0, 128.0)
        });
        w.set_ceiling_height(0, 20.0);
        assert!(!w.change_sector(0, true));
        assert_eq!(w.mobj(ghost).unwrap().health, 1000);
    }

    #[test]
    fn crunch_damages_on_fourth_tics() {
        let mut w = flat_world();
        let a = w.spawn_mobj(actor(64.0, 128.0));
        w.set_ceiling_height(0, 40.0);

        assert!(w.change_sector(0, true));
        assert_eq!(w.mobj(a).unwrap().health, 90);
        assert!(w.events().contains(&WorldEvent::Crushed { thing: a, sector: 0 }));
        assert!(w
            .events()
            .iter()
            .any(|e| matches!(e, WorldEvent::SpawnBlood { damage: 10, .. })));

        w.advance_tic();
        assert!(w.change_sector(0, true));
        assert_eq!(w.mobj(a).unwrap().health, 90);
    }

    #[test]
    fn neighbouring_sector_change_reaches_overlapping_things() {
        let mut w = flat_world();
        // center in room 0, box pokes into room 1
        let a = w.spawn_mobj(actor(120.0, 128.0));
        w.set_ceiling_height(1, 40.0);
        assert!(w.change_sector(1, false));
        assert_eq!(w.mobj(a).unwrap().ceilingz, 40.0);
    }

    // =========================================================================
    // move_plane
    // =========================================================================

    #[test]
    fn rising_floor_blocked_without_crush() {
        let mut w = low_room();
        let a = w.spawn_mobj(actor(64.0, 128.0));
        assert_eq!(w.move_plane(0, 16.0, 32.0, false, PlanePart::Floor, 1), PlaneResult::Crushed);
        assert_eq!(w.level.sectors[0].floor_height, 0.0);
        assert_eq!(w.mobj(a).unwrap().z(), 0.0);
        assert_eq!(w.mobj(a).unwrap().health, 100);
    }

    #[test]
    fn rising_floor_crushes_when_allowed() {
        let mut w = low_room();
        let a = w.spawn_mobj(actor(64.0, 128.0));
        assert_eq!(w.move_plane(0, 16.0, 32.0, true, PlanePart::Floor, 1), PlaneResult::Crushed);
        assert_eq!(w.level.sectors[0].floor_height, 16.0);
        assert_eq!(w.mobj(a).unwrap().health, 90);
    }

    #[test]
    fn lowering_ceiling_stops_at_dest() {
        let mut w = flat_world();
        assert_eq!(w.move_plane(0, 16.0, 120.0, false, PlanePart::Ceiling, -1), PlaneResult::PastDest);
        assert_eq!(w.level.sectors[0].ceiling_height, 120.0);
        assert_eq!(w.move_plane(0, 16.0, 120.0, false, PlanePart::Ceiling, -1), PlaneResult::PastDest);
    }

    #[test]
    fn plane_steps_by_speed() {
        let mut w = flat_world();
        assert_eq!(w.move_plane(2, 8.0, 64.0, false, PlanePart::Floor, 1), PlaneResult::Ok);
        assert_eq!(w.level.sectors[2].floor_height, 8.0);
        assert_eq!(w.move_plane(2, 8.0, 0.0, false, PlanePart::Floor, -1), PlaneResult::Ok);
        assert_eq!(w.level.sectors[2].floor_height, 0.0);
        assert_eq!(w.move_plane(2, 8.0, 0.0, false, PlanePart::Floor, -1), PlaneResult::PastDest);
        assert_eq!(w.level.sectors[2].floor_height, 0.0);
        assert_eq!(w.move_plane(2, 8.0, 0.0, false, PlanePart::Floor, 0), PlaneResult::Ok);
    }

    #[test]
    fn past_dest_blocked_goes_back() {
        let mut w = low_room();
        w.spawn_mobj(actor(64.0, 128.0));
        assert_eq!(w.move_plane(0, 64.0, 32.0, false, PlanePart::Floor, 1), PlaneResult::PastDest);
        assert_eq!(w.level.sectors[0].floor_height, 0.0);
    }
}
