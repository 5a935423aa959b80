// world.rs -- the world: level, blockmap, objects and occupancy together
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sectorsim_common::common::{com_dprintf, com_error, ERR_FATAL};
use sectorsim_common::shared::Vec3;

use crate::blockmap::Blockmap;
use crate::config::WorldConfig;
use crate::defs::{LineId, SectorId, MF_NOBLOCKMAP, MF_NOSECTOR};
use crate::level::{Level, LevelData, PointLocator};
use crate::mobj::{Mobj, MobjId, MobjPool, MobjSpawn};
use crate::occupancy::{sectors_touching, Occupancy};
use crate::sight::SightCache;

/// Whether item pickups fire while a move is still being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// pickups apply during check_position, even if the move then fails
    #[default]
    Effectful,
    /// pickups are collected and applied only after a committed move
    Strict,
}

/// Everything the engine reports to presentation and terrain code.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Pickup {
        item: MobjId,
        toucher: MobjId,
        kind: i32,
    },
    Damaged {
        target: MobjId,
        inflictor: Option<MobjId>,
        source: Option<MobjId>,
        amount: i32,
    },
    Killed {
        target: MobjId,
        source: Option<MobjId>,
    },
    Telefrag {
        victim: MobjId,
        teleporter: MobjId,
    },
    Gibbed {
        thing: MobjId,
    },
    Crushed {
        thing: MobjId,
        sector: SectorId,
    },
    /// a dropped item crushed out of existence
    Removed {
        thing: MobjId,
    },
    CrossSpecialLine {
        line: LineId,
        side: usize,
        thing: MobjId,
    },
    ShootSpecialLine {
        line: LineId,
        shooter: MobjId,
    },
    UseSpecialLine {
        line: LineId,
        side: usize,
        user: MobjId,
    },
    SpawnPuff {
        origin: Vec3,
    },
    SpawnBlood {
        origin: Vec3,
        damage: i32,
    },
    NoWaySound {
        user: MobjId,
    },
}

pub struct World {
    pub level: Level,
    pub blockmap: Blockmap,
    pub mobjs: MobjPool,
    pub occupancy: Occupancy,
    pub config: WorldConfig,
    pub leveltime: i32,
    pub query_mode: QueryMode,
    events: Vec<WorldEvent>,
    rng: StdRng,
    pub(crate) sight_cache: Option<SightCache>,
    geometry_stamp: u64,
}

impl World {
    /// Validate the level data and build a world over it.
    pub fn new(data: LevelData, config: WorldConfig) -> Result<World, String> {
        let level = Level::new(data)?;
        Ok(World::with_level(level, config))
    }

    pub fn with_level(level: Level, config: WorldConfig) -> World {
        let blockmap = Blockmap::build(&level);
        let occupancy = Occupancy::new(level.sectors.len());
        com_dprintf(&format!(
            "world: {} lines, {} sectors, {} subsectors, {} nodes\n",
            level.lines.len(),
            level.sectors.len(),
            level.subsectors.len(),
            level.nodes.len()
        ));
        World {
            level,
            blockmap,
            mobjs: MobjPool::new(),
            occupancy,
            config,
            leveltime: 0,
            query_mode: QueryMode::default(),
            events: Vec::new(),
            rng: StdRng::seed_from_u64(config.rng_seed),
            sight_cache: None,
            geometry_stamp: 0,
        }
    }

    // ============================================================
    // Accessors
    // ============================================================

    pub fn mobj(&self, id: MobjId) -> Option<&Mobj> {
        self.mobjs.get(id)
    }

    pub fn mobj_mut(&mut self, id: MobjId) -> Option<&mut Mobj> {
        self.mobjs.get_mut(id)
    }

    /// Sector containing the thing's center.
    pub fn sector_of(&self, id: MobjId) -> Option<SectorId> {
        self.mobjs
            .get(id)
            .map(|mo| self.level.subsector_sector(mo.subsector))
    }

    /// Things whose center lies in the sector, head first.
    pub fn sector_thinglist(&self, sector: SectorId) -> Vec<MobjId> {
        let mut out = Vec::new();
        let mut cur = self.level.sectors.get(sector).and_then(|s| s.thinglist);
        while let Some(id) = cur {
            out.push(id);
            cur = self.mobjs.get(id).and_then(|m| m.snext);
        }
        out
    }

    // ============================================================
    // Events, time and randomness
    // ============================================================

    pub(crate) fn emit(&mut self, event: WorldEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[WorldEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Step level time. Nothing computed during a tic survives into the next.
    pub fn advance_tic(&mut self) {
        self.leveltime += 1;
        self.sight_cache = None;
    }

    /// Damage roll in [0, 255].
    pub fn p_random(&mut self) -> i32 {
        self.rng.gen::<u8>() as i32
    }

    pub fn geometry_stamp(&self) -> u64 {
        self.geometry_stamp
    }

    pub fn set_floor_height(&mut self, sector: SectorId, height: f32) {
        if let Some(s) = self.level.sectors.get_mut(sector) {
            s.floor_height = height;
            self.geometry_stamp += 1;
        }
    }

    pub fn set_ceiling_height(&mut self, sector: SectorId, height: f32) {
        if let Some(s) = self.level.sectors.get_mut(sector) {
            s.ceiling_height = height;
            self.geometry_stamp += 1;
        }
    }

    // ============================================================
    // Spawning and removal
    // ============================================================

    pub fn spawn_mobj(&mut self, spawn: MobjSpawn) -> MobjId {
        let ss = self.level.point_in_subsector(spawn.x, spawn.y);
        let sector = &self.level.sectors[self.level.subsector_sector(ss)];
        let floorz = sector.floor_height;
        let ceilingz = sector.ceiling_height;

        let mobj = Mobj {
            kind: spawn.kind,
            origin: [spawn.x, spawn.y, spawn.z.unwrap_or(floorz)],
            momentum: [0.0; 3],
            angle: spawn.angle,
            radius: spawn.radius,
            height: spawn.height,
            mass: spawn.mass,
            health: spawn.health,
            flags: spawn.flags,
            floorz,
            ceilingz,
            dropoffz: floorz,
            subsector: ss,
            target: spawn.target,
            missile_damage: spawn.missile_damage,
            is_player: spawn.is_player,
            block_cell: None,
            bprev: None,
            bnext: None,
            sprev: None,
            snext: None,
            touching_sectors: None,
        };
        let id = self.mobjs.insert(mobj);
        self.set_thing_position(id);
        id
    }

    /// Unlink the thing from every chain and free its slot. False if the
    /// handle is stale.
    pub fn remove_mobj(&mut self, id: MobjId) -> bool {
        if !self.mobjs.contains(id) {
            return false;
        }
        self.unset_thing_position(id);

        let mut head = self.mobjs.get_mut(id).and_then(|m| m.touching_sectors.take());
        self.occupancy.remove_all(&mut head);

        if let Some(mo) = self.mobjs.get(id) {
            if mo.block_cell.is_some() || mo.sprev.is_some() || mo.snext.is_some() || head.is_some() {
                com_error(ERR_FATAL, "remove_mobj: freeing a linked slot");
            }
        }

        self.mobjs.remove(id);
        if self.sight_cache.as_ref().is_some_and(|c| c.involves(id)) {
            self.sight_cache = None;
        }
        true
    }

    // ============================================================
    // Position linking
    // ============================================================

    /// Link the thing into its sector chain, occupancy nodes and blockmap
    /// cell at its current position.
    pub fn set_thing_position(&mut self, id: MobjId) {
        let Some(mo) = self.mobjs.get(id) else {
            return;
        };
        let (x, y, flags) = (mo.x(), mo.y(), mo.flags);
        let ss = self.level.point_in_subsector(x, y);
        let sector = self.level.subsector_sector(ss);

        if let Some(mo) = self.mobjs.get_mut(id) {
            mo.subsector = ss;
        }

        if !flags.contains(MF_NOSECTOR) {
            let head = self.level.sectors[sector].thinglist;
            if let Some(mo) = self.mobjs.get_mut(id) {
                mo.sprev = None;
                mo.snext = head;
            }
            if let Some(h) = head {
                if let Some(hm) = self.mobjs.get_mut(h) {
                    hm.sprev = Some(id);
                }
            }
            self.level.sectors[sector].thinglist = Some(id);

            self.relink_sector_nodes(id);
        }

        if !flags.contains(MF_NOBLOCKMAP) {
            self.blockmap.link(&mut self.mobjs, id);
        }
    }

    /// Take the thing out of its sector chain and blockmap cell. Occupancy
    /// nodes stay until the next set_thing_position re-confirms them.
    pub fn unset_thing_position(&mut self, id: MobjId) {
        let Some(mo) = self.mobjs.get_mut(id) else {
            return;
        };
        let prev = mo.sprev.take();
        let next = mo.snext.take();
        let sector = self.level.subsector_sector(mo.subsector);

        if let Some(n) = next {
            if let Some(nm) = self.mobjs.get_mut(n) {
                nm.sprev = prev;
            }
        }
        match prev {
            Some(p) => {
                if let Some(pm) = self.mobjs.get_mut(p) {
                    pm.snext = next;
                }
            }
            None => {
                if self.level.sectors[sector].thinglist == Some(id) {
                    self.level.sectors[sector].thinglist = next;
                }
            }
        }

        self.blockmap.unlink(&mut self.mobjs, id);
    }

    /// Bring the thing's occupancy nodes in line with its current box.
    pub fn relink_sector_nodes(&mut self, id: MobjId) {
        let Some(mo) = self.mobjs.get(id) else {
            return;
        };
        let sectors = sectors_touching(&self.level, &self.blockmap, &self.level, mo.x(), mo.y(), mo.radius);
        let mut head = mo.touching_sectors;
        self.occupancy.relink(id, &mut head, &sectors);
        if let Some(mo) = self.mobjs.get_mut(id) {
            mo.touching_sectors = head;
        }
    }

    /// Sectors the thing currently has occupancy nodes in.
    pub fn touching_sectors(&self, id: MobjId) -> Vec<SectorId> {
        self.mobjs
            .get(id)
            .map(|mo| self.occupancy.thing_sectors(mo.touching_sectors))
            .unwrap_or_default()
    }
}
