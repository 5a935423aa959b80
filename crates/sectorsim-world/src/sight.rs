// sight.rs -- line of sight through the BSP
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.

use std::collections::HashSet;

use sectorsim_common::shared::{approx_distance, Vec3};

use crate::defs::LineId;
use crate::level::NodeChild;
use crate::maputl::{divline_side, intercept_vector, DivLine};
use crate::mobj::MobjId;
use crate::world::World;

/// The last answer, and everything it depended on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SightCache {
    a: MobjId,
    b: MobjId,
    a_origin: Vec3,
    b_origin: Vec3,
    a_height: f32,
    b_height: f32,
    tic: i32,
    geometry: u64,
    visible: bool,
}

impl SightCache {
    pub(crate) fn involves(&self, id: MobjId) -> bool {
        self.a == id || self.b == id
    }
}

/// One sight check in progress.
struct SightTrace {
    strace: DivLine,
    t2x: f32,
    t2y: f32,
    eyez: f32,
    topslope: f32,
    bottomslope: f32,
    line_seen: HashSet<LineId>,
}

impl World {
    /// True if a line of sight exists between the two things.
    pub fn check_sight(&mut self, a: MobjId, b: MobjId) -> bool {
        let (Some(t1), Some(t2)) = (self.mobjs.get(a), self.mobjs.get(b)) else {
            return false;
        };

        let key = SightCache {
            a,
            b,
            a_origin: t1.origin,
            b_origin: t2.origin,
            a_height: t1.height,
            b_height: t2.height,
            tic: self.leveltime,
            geometry: self.geometry_stamp(),
            visible: false,
        };
        if let Some(c) = self.sight_cache {
            if (SightCache { visible: false, ..c }) == key {
                return c.visible;
            }
        }

        let visible = self.compute_sight(a, b);
        self.sight_cache = Some(SightCache { visible, ..key });
        visible
    }

    /// True if `target` is close enough for a melee swing and in sight.
    pub fn check_melee_range(&mut self, actor: MobjId, target: MobjId) -> bool {
        let (Some(a), Some(t)) = (self.mobjs.get(actor), self.mobjs.get(target)) else {
            return false;
        };
        let dist = approx_distance(t.x() - a.x(), t.y() - a.y());
        if dist >= self.config.melee_range - 20.0 + t.radius {
            return false;
        }
        self.check_sight(actor, target)
    }

    fn compute_sight(&self, a: MobjId, b: MobjId) -> bool {
        let (Some(t1), Some(t2)) = (self.mobjs.get(a), self.mobjs.get(b)) else {
            return false;
        };

        if t1.subsector == t2.subsector {
            return true;
        }

        let s1 = self.level.subsectors[t1.subsector].sector;
        let s2 = self.level.subsectors[t2.subsector].sector;
        if self.level.reject.rejects(s1, s2) {
            return false;
        }

        let eyez = t1.z() + t1.height - t1.height / 4.0;
        let mut st = SightTrace {
            strace: DivLine::between(t1.x(), t1.y(), t2.x(), t2.y()),
            t2x: t2.x(),
            t2y: t2.y(),
            eyez,
            topslope: t2.z() + t2.height - eyez,
            bottomslope: t2.z() - eyez,
            line_seen: HashSet::new(),
        };

        self.cross_bsp_node(self.level.root(), &mut st)
    }

    /// Returns true if the sight line crosses the whole subtree unblocked.
    fn cross_bsp_node(&self, child: NodeChild, st: &mut SightTrace) -> bool {
        let n = match child {
            NodeChild::Subsector(ss) => return self.cross_subsector(ss, st),
            NodeChild::Node(n) => n,
        };
        let node = &self.level.nodes[n];

        // an "on" should cross both sides
        let mut side = divline_side(st.strace.x, st.strace.y, &node.div);
        if side == 2 {
            side = 0;
        }

        if !self.cross_bsp_node(node.children[side], st) {
            return false;
        }

        if side == divline_side(st.t2x, st.t2y, &node.div) {
            return true;
        }
        self.cross_bsp_node(node.children[side ^ 1], st)
    }

    fn cross_subsector(&self, ss: usize, st: &mut SightTrace) -> bool {
        for seg in self.level.subsector_segs(ss) {
            if !st.line_seen.insert(seg.line) {
                continue;
            }
            let line = &self.level.lines[seg.line];

            let s1 = divline_side(line.v1[0], line.v1[1], &st.strace);
            let s2 = divline_side(line.v2[0], line.v2[1], &st.strace);
            if s1 == s2 {
                continue;
            }

            let divl = DivLine::from_line(line);
            let s1 = divline_side(st.strace.x, st.strace.y, &divl);
            let s2 = divline_side(st.t2x, st.t2y, &divl);
            if s1 == s2 {
                continue;
            }

            let Some(back) = seg.back else {
                return false;
            };
            let front = &self.level.sectors[seg.front];
            let back = &self.level.sectors[back];

            if front.floor_height == back.floor_height && front.ceiling_height == back.ceiling_height {
                continue;
            }

            let opentop = front.ceiling_height.min(back.ceiling_height);
            let openbottom = front.floor_height.max(back.floor_height);

            // closed door
            if openbottom >= opentop {
                return false;
            }

            let frac = intercept_vector(&st.strace, &divl);
            if frac > 0.0 {
                if front.floor_height != back.floor_height {
                    let slope = (openbottom - st.eyez) / frac;
                    if slope > st.bottomslope {
                        st.bottomslope = slope;
                    }
                }
                if front.ceiling_height != back.ceiling_height {
                    let slope = (opentop - st.eyez) / frac;
                    if slope < st.topslope {
                        st.topslope = slope;
                    }
                }
            }

            if st.topslope <= st.bottomslope {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::config::WorldConfig;
    use crate::level::SectorDef;
    use crate::level_builder::{sector, LevelBuilder};
    use crate::mobj::MobjSpawn;
    use crate::world::tests::actor;
    use crate::world::World;

    fn three_rooms(middle: SectorDef, reject: bool) -> World {
        let mut b = LevelBuilder::new()
            .room(128.0, sector(0.0, 128.0))
            .room(128.0, middle)
            .room(128.0, sector(0.0, 128.0));
        if reject {
            b = b.reject_pair(0, 2);
        }
        World::new(b.data(), WorldConfig::default()).unwrap()
    }

    // =========================================================================
    // Shortcuts
    // =========================================================================

    #[test]
    fn same_subsector_ignores_reject() {
        let data = LevelBuilder::new()
            .room(128.0, sector(0.0, 128.0))
            .room(128.0, sector(0.0, 128.0))
            .reject_pair(0, 0)
            .data();
        let mut w = World::new(data, WorldConfig::default()).unwrap();
        let a = w.spawn_mobj(actor(30.0, 60.0));
        let b = w.spawn_mobj(actor(90.0, 200.0));
        assert!(w.level.reject.rejects(0, 0));
        assert!(w.check_sight(a, b));
    }

    #[test]
    fn reject_bit_blocks_across_sectors() {
        let mut w = three_rooms(sector(0.0, 128.0), true);
        let a = w.spawn_mobj(actor(64.0, 128.0));
        let b = w.spawn_mobj(actor(320.0, 128.0));
        assert!(!w.check_sight(a, b));
        assert!(!w.check_sight(b, a));
    }

    #[test]
    fn stale_handle_sees_nothing() {
        let mut w = three_rooms(sector(0.0, 128.0), false);
        let a = w.spawn_mobj(actor(64.0, 128.0));
        let b = w.spawn_mobj(actor(320.0, 128.0));
        w.remove_mobj(b);
        assert!(!w.check_sight(a, b));
    }

    // =========================================================================
    // BSP crossing
    // =========================================================================

    #[test]
    fn open_rooms_see_each_other() {
        let mut w = three_rooms(sector(0.0, 128.0), false);
        let a = w.spawn_mobj(actor(64.0, 100.0));
        let b = w.spawn_mobj(actor(320.0, 180.0));
        assert!(w.check_sight(a, b));
        assert!(w.check_sight(b, a));
    }

    #[test]
    fn wall_blocks_sight() {
        let data = LevelBuilder::new()
            .room(128.0, sector(0.0, 128.0))
            .wall()
            .room(128.0, sector(0.0, 128.0))
            .data();
        let mut w = World::new(data, WorldConfig::default()).unwrap();
        let a = w.spawn_mobj(actor(64.0, 128.0));
        let b = w.spawn_mobj(actor(192.0, 128.0));
        assert!(!w.check_sight(a, b));
    }

    #[test]
    fn high_ledge_blocks_low_eyes() {
        let mut w = three_rooms(sector(100.0, 128.0), false);
        let a = w.spawn_mobj(actor(64.0, 128.0));
        let b = w.spawn_mobj(actor(320.0, 128.0));
        assert!(!w.check_sight(a, b));
    }

    #[test]
    fn low_step_does_not_block() {
        let mut w = three_rooms(sector(16.0, 128.0), false);
        let a = w.spawn_mobj(actor(64.0, 128.0));
        let b = w.spawn_mobj(actor(320.0, 128.0));
        assert!(w.check_sight(a, b));
    }

    #[test]
    fn things_above_a_ledge_see_over_it() {
        let mut w = three_rooms(sector(100.0, 128.0), false);
        let a = w.spawn_mobj(MobjSpawn {
            z: Some(110.0),
            height: 16.0,
            ..actor(64.0, 128.0)
        });
        let b = w.spawn_mobj(MobjSpawn {
            z: Some(110.0),
            height: 16.0,
            ..actor(320.0, 128.0)
        });
        assert!(w.check_sight(a, b));
    }

    #[test]
    fn closed_door_blocks() {
        let mut w = three_rooms(sector(0.0, 0.0), false);
        let a = w.spawn_mobj(actor(64.0, 128.0));
        let b = w.spawn_mobj(actor(320.0, 128.0));
        assert!(!w.check_sight(a, b));
    }

    // =========================================================================
    // Melee range
    // =========================================================================

    #[test]
    fn melee_reaches_adjacent_things_only() {
        let mut w = three_rooms(sector(0.0, 128.0), false);
        let a = w.spawn_mobj(actor(100.0, 128.0));
        let near = w.spawn_mobj(actor(150.0, 128.0));
        let far = w.spawn_mobj(actor(170.0, 128.0));
        // 64 - 20 + 16 = 60
        assert!(w.check_melee_range(a, near));
        assert!(!w.check_melee_range(a, far));
    }

    #[test]
    fn melee_needs_sight() {
        let data = LevelBuilder::new()
            .room(128.0, sector(0.0, 128.0))
            .wall()
            .room(128.0, sector(0.0, 128.0))
            .data();
        let mut w = World::new(data, WorldConfig::default()).unwrap();
        let a = w.spawn_mobj(actor(110.0, 128.0));
        let b = w.spawn_mobj(actor(146.0, 128.0));
        assert!(!w.check_melee_range(a, b));
    }

    // =========================================================================
    // Cache
    // =========================================================================

    #[test]
    fn repeat_query_is_answered_from_cache() {
        let mut w = three_rooms(sector(0.0, 128.0), false);
        let a = w.spawn_mobj(actor(64.0, 128.0));
        let b = w.spawn_mobj(actor(320.0, 128.0));
        assert!(w.check_sight(a, b));

        // a stale answer proves the second call never re-traced
        if let Some(c) = w.sight_cache.as_mut() {
            c.visible = false;
        }
        assert!(!w.check_sight(a, b));

        w.advance_tic();
        assert!(w.check_sight(a, b));
    }

    #[test]
    fn cache_follows_geometry_changes() {
        let mut w = three_rooms(sector(0.0, 128.0), false);
        let a = w.spawn_mobj(actor(64.0, 128.0));
        let b = w.spawn_mobj(actor(320.0, 128.0));
        assert!(w.check_sight(a, b));
        assert!(w.check_sight(a, b));

        // door shuts
        w.set_ceiling_height(1, 0.0);
        assert!(!w.check_sight(a, b));

        w.set_ceiling_height(1, 128.0);
        assert!(w.check_sight(a, b));
    }

    #[test]
    fn cache_follows_movement() {
        let data = LevelBuilder::new()
            .room(128.0, sector(0.0, 128.0))
            .wall()
            .room(128.0, sector(0.0, 128.0))
            .room(128.0, sector(0.0, 128.0))
            .data();
        let mut w = World::new(data, WorldConfig::default()).unwrap();
        let a = w.spawn_mobj(actor(192.0, 128.0));
        let b = w.spawn_mobj(actor(320.0, 128.0));
        assert!(w.check_sight(a, b));
        assert!(w.teleport_move(a, 64.0, 128.0, false));
        assert!(!w.check_sight(a, b));
    }
}
