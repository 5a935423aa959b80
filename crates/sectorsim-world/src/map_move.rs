// map_move.rs -- position checks, committed moves and teleports
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.
//
// check_position answers "could the thing stand here" and gathers the floor
// and ceiling it would get. try_move runs it, applies the step and dropoff
// rules and commits. All of the transaction state lives in the MoveCheck a
// call returns; nothing carries over into the next call.

use std::collections::HashSet;

use sectorsim_common::common::com_dprintf;
use sectorsim_common::shared::Bounds2;

use crate::defs::{
    LineFlags, LineId, MobjFlags, MAXRADIUS, MF_DROPOFF, MF_FLOAT, MF_MISSILE, MF_NOCLIP,
    MF_PICKUP, MF_SHOOTABLE, MF_SKULLFLY, MF_SOLID, MF_SPECIAL, MF_TELEPORT, PICKUP_REACH_BELOW,
    PT_ADDLINES, TELEFRAG_DAMAGE,
};
use crate::level::PointLocator;
use crate::maputl::{box_on_line_side, line_opening, point_on_line_side};
use crate::mobj::MobjId;
use crate::traverse::InterceptKind;
use crate::world::{QueryMode, World, WorldEvent};

/// What stopped a position check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveBlock {
    Thing(MobjId),
    Line(LineId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// a thing or line is in the way
    Position,
    /// the opening is lower than the thing
    NoFit,
    /// would hit the ceiling at the current z
    Ceiling,
    StepTooHigh,
    DropoffTooDeep,
    /// stale handle
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveResult {
    Moved {
        float_ok: bool,
    },
    Blocked {
        reason: BlockReason,
        /// true when the opening would fit if the thing changed height
        float_ok: bool,
        floorz: f32,
        blocker: Option<MoveBlock>,
    },
}

impl MoveResult {
    pub fn moved(&self) -> bool {
        matches!(self, MoveResult::Moved { .. })
    }

    pub fn float_ok(&self) -> bool {
        match *self {
            MoveResult::Moved { float_ok } => float_ok,
            MoveResult::Blocked { float_ok, .. } => float_ok,
        }
    }

    fn blocked(reason: BlockReason, float_ok: bool, floorz: f32, blocker: Option<MoveBlock>) -> Self {
        MoveResult::Blocked {
            reason,
            float_ok,
            floorz,
            blocker,
        }
    }
}

/// One position check.
#[derive(Debug, Clone)]
pub struct MoveCheck {
    pub thing: MobjId,
    pub x: f32,
    pub y: f32,
    pub bbox: Bounds2,
    pub floorz: f32,
    pub ceilingz: f32,
    pub dropoffz: f32,
    /// line that lowered ceilingz, if any
    pub ceiling_line: Option<LineId>,
    /// special lines the box touches
    pub spechit: Vec<LineId>,
    /// pickups waiting for a commit (strict mode only)
    pub touched: Vec<MobjId>,
    pub blocker: Option<MoveBlock>,
    pub ok: bool,
}

impl World {
    // ============================================================
    // Position checking
    // ============================================================

    /// Check whether the thing could occupy (x, y). Lines and things that
    /// touch specials (and skull or missile impacts) act immediately.
    pub fn check_position(&mut self, thing: MobjId, x: f32, y: f32) -> MoveCheck {
        let (radius, flags) = match self.mobjs.get(thing) {
            Some(mo) => (mo.radius, mo.flags),
            None => (0.0, MobjFlags::empty()),
        };
        let sector = &self.level.sectors[self.level.sector_at(x, y)];

        let mut tm = MoveCheck {
            thing,
            x,
            y,
            bbox: Bounds2::around(x, y, radius),
            floorz: sector.floor_height,
            ceilingz: sector.ceiling_height,
            dropoffz: sector.floor_height,
            ceiling_line: None,
            spechit: Vec::new(),
            touched: Vec::new(),
            blocker: None,
            ok: self.mobjs.contains(thing),
        };

        if !tm.ok || flags.contains(MF_NOCLIP) {
            return tm;
        }

        // things are filed by center, so look one max radius further out
        let candidates = self
            .blockmap
            .things_in_box(&tm.bbox.expanded(MAXRADIUS), &self.mobjs);
        for other in candidates {
            if !self.check_thing(&mut tm, other) {
                tm.ok = false;
                return tm;
            }
        }

        if let Some(range) = self.blockmap.cell_range(&tm.bbox) {
            let mut seen = HashSet::new();
            for (cx, cy) in range.cells() {
                for &ld in self.blockmap.lines_in(cx, cy) {
                    if !seen.insert(ld) {
                        continue;
                    }
                    if !self.check_line(&mut tm, ld) {
                        tm.ok = false;
                        return tm;
                    }
                }
            }
        }

        tm
    }

    /// Returns false when `other` blocks the move.
    fn check_thing(&mut self, tm: &mut MoveCheck, other: MobjId) -> bool {
        if other == tm.thing {
            return true;
        }
        let (Some(me), Some(th)) = (self.mobjs.get(tm.thing), self.mobjs.get(other)) else {
            return true;
        };
        if !th
            .flags
            .intersects(MobjFlags::SOLID | MobjFlags::SPECIAL | MobjFlags::SHOOTABLE)
        {
            return true;
        }

        let blockdist = th.radius + me.radius;
        if (th.x() - tm.x).abs() >= blockdist || (th.y() - tm.y).abs() >= blockdist {
            return true;
        }

        let me_flags = me.flags;
        let th_flags = th.flags;
        let damage_base = me.missile_damage;

        // a charging skull slams into whatever it hits
        if me_flags.contains(MF_SKULLFLY) {
            let damage = (self.p_random() % 8 + 1) * damage_base;
            self.damage_mobj(other, Some(tm.thing), Some(tm.thing), damage);
            if let Some(me) = self.mobjs.get_mut(tm.thing) {
                me.flags.remove(MF_SKULLFLY);
                me.momentum = [0.0; 3];
            }
            tm.blocker = Some(MoveBlock::Thing(other));
            return false;
        }

        if me_flags.contains(MF_MISSILE) {
            if me.z() > th.z() + th.height || me.z() + me.height < th.z() {
                return true;
            }

            let owner = me.target.and_then(|o| self.mobjs.get(o).map(|om| (o, om.kind)));
            if let Some((owner, owner_kind)) = owner {
                if owner_kind == th.kind {
                    if other == owner {
                        return true;
                    }
                    if !th.is_player {
                        // explode, but hurt nobody of the shooter's kind
                        tm.blocker = Some(MoveBlock::Thing(other));
                        return false;
                    }
                }
            }

            if !th_flags.contains(MF_SHOOTABLE) {
                if th_flags.contains(MF_SOLID) {
                    tm.blocker = Some(MoveBlock::Thing(other));
                    return false;
                }
                return true;
            }

            let source = me.target;
            let damage = (self.p_random() % 8 + 1) * damage_base;
            self.damage_mobj(other, Some(tm.thing), source, damage);
            tm.blocker = Some(MoveBlock::Thing(other));
            return false;
        }

        if th_flags.contains(MF_SPECIAL) {
            if me_flags.contains(MF_PICKUP) {
                match self.query_mode {
                    QueryMode::Effectful => {
                        self.touch_special(other, tm.thing);
                    }
                    QueryMode::Strict => {
                        if !tm.touched.contains(&other) {
                            tm.touched.push(other);
                        }
                    }
                }
            }
            if th_flags.contains(MF_SOLID) {
                tm.blocker = Some(MoveBlock::Thing(other));
                return false;
            }
            return true;
        }

        if th_flags.contains(MF_SOLID) {
            tm.blocker = Some(MoveBlock::Thing(other));
            return false;
        }
        true
    }

    /// Narrow the transaction's floor and ceiling through the line, or
    /// return false when the line blocks.
    fn check_line(&self, tm: &mut MoveCheck, ld: LineId) -> bool {
        let line = &self.level.lines[ld];
        if !tm.bbox.overlaps(&line.bbox) {
            return true;
        }
        if box_on_line_side(&tm.bbox, line).is_some() {
            return true;
        }
        let Some(me) = self.mobjs.get(tm.thing) else {
            return true;
        };

        if !line.is_two_sided() {
            tm.blocker = Some(MoveBlock::Line(ld));
            return false;
        }

        if !me.flags.contains(MF_MISSILE) {
            let monster_block = !me.is_player && line.flags.contains(LineFlags::BLOCK_MONSTERS);
            if line.flags.contains(LineFlags::BLOCKING) || monster_block {
                tm.blocker = Some(MoveBlock::Line(ld));
                return false;
            }
        }

        let op = line_opening(&self.level, ld);
        if op.top < tm.ceilingz {
            tm.ceilingz = op.top;
            tm.ceiling_line = Some(ld);
        }
        if op.bottom > tm.floorz {
            tm.floorz = op.bottom;
        }
        if op.lowfloor < tm.dropoffz {
            tm.dropoffz = op.lowfloor;
        }

        if line.special != 0 {
            tm.spechit.push(ld);
        }
        true
    }

    /// Pick up `item` if `toucher` can reach it. Returns true when the item
    /// was taken.
    pub fn touch_special(&mut self, item: MobjId, toucher: MobjId) -> bool {
        let (Some(it), Some(to)) = (self.mobjs.get(item), self.mobjs.get(toucher)) else {
            return false;
        };
        if !it.flags.contains(MF_SPECIAL) || !to.is_alive() {
            return false;
        }
        let delta = it.z() - to.z();
        if delta > to.height || delta < -PICKUP_REACH_BELOW {
            return false;
        }

        let kind = it.kind;
        self.remove_mobj(item);
        self.emit(WorldEvent::Pickup { item, toucher, kind });
        true
    }

    // ============================================================
    // Moving
    // ============================================================

    /// Move the thing to (x, y) if it fits, crossing special lines on the
    /// way.
    pub fn try_move(&mut self, thing: MobjId, x: f32, y: f32) -> MoveResult {
        let tm = self.check_position(thing, x, y);
        let Some(mo) = self.mobjs.get(thing) else {
            return MoveResult::blocked(BlockReason::Missing, false, tm.floorz, None);
        };
        if !tm.ok {
            return MoveResult::blocked(BlockReason::Position, false, tm.floorz, tm.blocker);
        }

        let flags = mo.flags;
        let mut float_ok = false;
        if !flags.contains(MF_NOCLIP) {
            if tm.ceilingz - tm.floorz < mo.height {
                return MoveResult::blocked(BlockReason::NoFit, false, tm.floorz, tm.ceiling_line.map(MoveBlock::Line));
            }
            float_ok = true;

            if !flags.contains(MF_TELEPORT) && tm.ceilingz - mo.z() < mo.height {
                return MoveResult::blocked(BlockReason::Ceiling, true, tm.floorz, tm.ceiling_line.map(MoveBlock::Line));
            }
            if !flags.contains(MF_TELEPORT) && tm.floorz - mo.z() > self.config.max_step {
                return MoveResult::blocked(BlockReason::StepTooHigh, true, tm.floorz, None);
            }
            if !flags.intersects(MF_DROPOFF | MF_FLOAT) && tm.floorz - tm.dropoffz > self.config.max_dropoff {
                return MoveResult::blocked(BlockReason::DropoffTooDeep, true, tm.floorz, None);
            }
        }

        let (oldx, oldy) = (mo.x(), mo.y());

        self.unset_thing_position(thing);
        if let Some(mo) = self.mobjs.get_mut(thing) {
            mo.floorz = tm.floorz;
            mo.ceilingz = tm.ceilingz;
            mo.dropoffz = tm.dropoffz;
            mo.origin[0] = x;
            mo.origin[1] = y;
        }
        self.set_thing_position(thing);

        for &item in &tm.touched {
            self.touch_special(item, thing);
        }

        if !flags.intersects(MF_TELEPORT | MF_NOCLIP) {
            for ld in self.crossed_special_lines(&tm, oldx, oldy) {
                let line = &self.level.lines[ld];
                let side = point_on_line_side(x, y, line);
                let oldside = point_on_line_side(oldx, oldy, line);
                if side != oldside {
                    self.emit(WorldEvent::CrossSpecialLine {
                        line: ld,
                        side: oldside,
                        thing,
                    });
                }
            }
        }

        MoveResult::Moved { float_ok }
    }

    /// Special lines a committed move may have crossed: those the center
    /// passed over on the way, then those the new box touches.
    fn crossed_special_lines(&mut self, tm: &MoveCheck, oldx: f32, oldy: f32) -> Vec<LineId> {
        let mut lines = Vec::new();
        if (oldx, oldy) != (tm.x, tm.y) {
            self.path_traverse(oldx, oldy, tm.x, tm.y, PT_ADDLINES, |w, ic| {
                if let InterceptKind::Line(ld) = ic.kind {
                    if w.level.lines[ld].special != 0 {
                        lines.push(ld);
                    }
                }
                true
            });
        }
        for &ld in tm.spechit.iter().rev() {
            if !lines.contains(&ld) {
                lines.push(ld);
            }
        }
        lines
    }

    /// Move the thing to (x, y) regardless of lines, killing any shootable
    /// thing in the way. Without `force` only players telefrag.
    pub fn teleport_move(&mut self, thing: MobjId, x: f32, y: f32, force: bool) -> bool {
        let Some(mo) = self.mobjs.get(thing) else {
            return false;
        };
        let radius = mo.radius;
        let is_player = mo.is_player;
        let bbox = Bounds2::around(x, y, radius);

        let sector = &self.level.sectors[self.level.sector_at(x, y)];
        let floorz = sector.floor_height;
        let ceilingz = sector.ceiling_height;

        let mut blockers = Vec::new();
        for other in self.blockmap.things_in_box(&bbox.expanded(MAXRADIUS), &self.mobjs) {
            if other == thing {
                continue;
            }
            let Some(th) = self.mobjs.get(other) else {
                continue;
            };
            if !th.flags.contains(MF_SHOOTABLE) {
                continue;
            }
            let blockdist = th.radius + radius;
            if (th.x() - x).abs() >= blockdist || (th.y() - y).abs() >= blockdist {
                continue;
            }
            blockers.push(other);
        }

        if !blockers.is_empty() && !is_player && !force {
            return false;
        }

        for victim in blockers {
            com_dprintf(&format!(
                "teleport_move: {}:{} telefrags {}:{}\n",
                thing.index, thing.generation, victim.index, victim.generation
            ));
            self.damage_mobj(victim, Some(thing), Some(thing), TELEFRAG_DAMAGE);
            self.emit(WorldEvent::Telefrag {
                victim,
                teleporter: thing,
            });
        }

        self.unset_thing_position(thing);
        if let Some(mo) = self.mobjs.get_mut(thing) {
            mo.floorz = floorz;
            mo.ceilingz = ceilingz;
            mo.dropoffz = floorz;
            mo.origin = [x, y, floorz];
        }
        self.set_thing_position(thing);
        true
    }

    /// Re-derive floor and ceiling at the thing's spot after a sector
    /// height change. Returns false if it no longer fits.
    pub fn thing_height_clip(&mut self, thing: MobjId) -> bool {
        let Some(mo) = self.mobjs.get(thing) else {
            return true;
        };
        let onfloor = mo.z() == mo.floorz;
        let (x, y) = (mo.x(), mo.y());

        let tm = self.check_position(thing, x, y);

        let Some(mo) = self.mobjs.get_mut(thing) else {
            return true;
        };
        mo.floorz = tm.floorz;
        mo.ceilingz = tm.ceilingz;
        mo.dropoffz = tm.dropoffz;

        if onfloor {
            mo.origin[2] = mo.floorz;
        } else if mo.z() + mo.height > mo.ceilingz {
            mo.origin[2] = mo.ceilingz - mo.height;
        }

        mo.ceilingz - mo.floorz >= mo.height
    }
}
