// attack.rs -- hitscan, autoaim, use traces, splash damage and the damage
// entry point everything funnels into
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.

use rayon::prelude::*;

use sectorsim_common::shared::{angle_to_vector2, point_to_angle, Bounds2, Vec3};

use crate::defs::{
    LineId, AIM_SLOPE, BLOOD_BACKOFF, MAXRADIUS, MF_CORPSE, MF_DROPOFF, MF_FLOAT, MF_NOBLOOD,
    MF_NOCLIP, MF_NOGRAVITY, MF_NORADIUSDMG, MF_SHOOTABLE, MF_SKULLFLY, MF_SOLID, PT_ADDLINES,
    PT_ADDTHINGS, PUFF_BACKOFF, SHOOT_HEIGHT_OFFSET,
};
use crate::maputl::{line_opening, point_on_line_side, DivLine};
use crate::mobj::{Mobj, MobjId};
use crate::traverse::InterceptKind;
use crate::world::{World, WorldEvent};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimResult {
    /// vertical slope to aim along, 0 when nothing was found
    pub slope: f32,
    pub target: Option<MobjId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShotOutcome {
    Nothing,
    HitWall { line: LineId, point: Vec3 },
    /// the shot went into a sky ceiling and vanished
    HitSky { line: LineId },
    HitThing { target: MobjId, point: Vec3 },
}

/// Rise over run, saturating like fixed point division does for things
/// right at the trace start.
fn slope_div(dz: f32, dist: f32) -> f32 {
    if dist > 0.0 {
        dz / dist
    } else if dz >= 0.0 {
        f32::MAX
    } else {
        f32::MIN
    }
}

fn shoot_z(mo: &Mobj) -> f32 {
    mo.z() + mo.height / 2.0 + SHOOT_HEIGHT_OFFSET
}

impl World {
    /// Trace endpoints for an attack of `distance` along `angle`.
    fn attack_trace(&self, mo: &Mobj, angle: f32, distance: f32) -> DivLine {
        let dir = angle_to_vector2(angle);
        let (x1, y1) = self.trace_start(mo.x(), mo.y());
        DivLine::between(x1, y1, mo.x() + distance * dir[0], mo.y() + distance * dir[1])
    }

    // ============================================================
    // Aiming
    // ============================================================

    /// Find the first shootable thing along the angle within the vertical
    /// autoaim window.
    pub fn aim_line_attack(&mut self, shooter: MobjId, angle: f32, distance: f32) -> AimResult {
        let mut result = AimResult {
            slope: 0.0,
            target: None,
        };
        let Some(mo) = self.mobjs.get(shooter) else {
            return result;
        };
        if distance <= 0.0 {
            return result;
        }
        let shootz = shoot_z(mo);
        let trace = self.attack_trace(mo, angle, distance);

        let mut topslope = AIM_SLOPE;
        let mut bottomslope = -AIM_SLOPE;

        self.path_traverse(
            trace.x,
            trace.y,
            trace.x + trace.dx,
            trace.y + trace.dy,
            PT_ADDLINES | PT_ADDTHINGS,
            |w, ic| {
                let dist = distance * ic.frac;
                match ic.kind {
                    InterceptKind::Line(ld) => {
                        let line = &w.level.lines[ld];
                        let Some(back) = line.back else {
                            return false;
                        };
                        let op = line_opening(&w.level, ld);
                        if op.bottom >= op.top {
                            return false;
                        }
                        let front = &w.level.sectors[line.front];
                        let back = &w.level.sectors[back];
                        if front.floor_height != back.floor_height {
                            bottomslope = bottomslope.max(slope_div(op.bottom - shootz, dist));
                        }
                        if front.ceiling_height != back.ceiling_height {
                            topslope = topslope.min(slope_div(op.top - shootz, dist));
                        }
                        topslope > bottomslope
                    }
                    InterceptKind::Thing(id) => {
                        if id == shooter {
                            return true;
                        }
                        let Some(th) = w.mobjs.get(id) else {
                            return true;
                        };
                        if !th.flags.contains(MF_SHOOTABLE) {
                            return true;
                        }

                        let thingtop = slope_div(th.z() + th.height - shootz, dist);
                        if thingtop < bottomslope {
                            // shot over the thing
                            return true;
                        }
                        let thingbottom = slope_div(th.z() - shootz, dist);
                        if thingbottom > topslope {
                            // shot under the thing
                            return true;
                        }

                        let top = thingtop.min(topslope);
                        let bottom = thingbottom.max(bottomslope);
                        result = AimResult {
                            slope: (top + bottom) / 2.0,
                            target: Some(id),
                        };
                        false
                    }
                }
            },
        );

        result
    }

    // ============================================================
    // Hitscan
    // ============================================================

    /// Fire a hitscan shot along `angle` at the given slope.
    pub fn line_attack(
        &mut self,
        shooter: MobjId,
        angle: f32,
        distance: f32,
        slope: f32,
        damage: i32,
    ) -> ShotOutcome {
        let mut outcome = ShotOutcome::Nothing;
        let Some(mo) = self.mobjs.get(shooter) else {
            return outcome;
        };
        if distance <= 0.0 {
            return outcome;
        }
        let shootz = shoot_z(mo);
        let trace = self.attack_trace(mo, angle, distance);

        // where along the shot a fraction lands, backed off toward the shooter
        let spot = |frac: f32, backoff: f32| -> Vec3 {
            let frac = frac - backoff / distance;
            let [x, y] = trace.point_at(frac);
            [x, y, shootz + slope * frac * distance]
        };

        self.path_traverse(
            trace.x,
            trace.y,
            trace.x + trace.dx,
            trace.y + trace.dy,
            PT_ADDLINES | PT_ADDTHINGS,
            |w, ic| {
                let dist = distance * ic.frac;
                match ic.kind {
                    InterceptKind::Line(ld) => {
                        let line = &w.level.lines[ld];
                        let (front, back) = (line.front, line.back);
                        if line.special != 0 {
                            w.emit(WorldEvent::ShootSpecialLine { line: ld, shooter });
                        }

                        let blocked = match back {
                            None => true,
                            Some(back) => {
                                let op = line_opening(&w.level, ld);
                                let fs = &w.level.sectors[front];
                                let bs = &w.level.sectors[back];
                                (fs.floor_height != bs.floor_height
                                    && slope_div(op.bottom - shootz, dist) > slope)
                                    || (fs.ceiling_height != bs.ceiling_height
                                        && slope_div(op.top - shootz, dist) < slope)
                            }
                        };
                        if !blocked {
                            return true;
                        }

                        let point = spot(ic.frac, PUFF_BACKOFF);
                        let fs = &w.level.sectors[front];
                        if fs.sky_ceiling {
                            // don't shoot the sky, or a sky hack wall
                            let back_sky = back.is_some_and(|b| w.level.sectors[b].sky_ceiling);
                            if point[2] > fs.ceiling_height || back_sky {
                                outcome = ShotOutcome::HitSky { line: ld };
                                return false;
                            }
                        }

                        w.emit(WorldEvent::SpawnPuff { origin: point });
                        outcome = ShotOutcome::HitWall { line: ld, point };
                        false
                    }
                    InterceptKind::Thing(id) => {
                        if id == shooter {
                            return true;
                        }
                        let Some(th) = w.mobjs.get(id) else {
                            return true;
                        };
                        if !th.flags.contains(MF_SHOOTABLE) {
                            return true;
                        }
                        if slope_div(th.z() + th.height - shootz, dist) < slope {
                            return true;
                        }
                        if slope_div(th.z() - shootz, dist) > slope {
                            return true;
                        }

                        let point = spot(ic.frac, BLOOD_BACKOFF);
                        if th.flags.contains(MF_NOBLOOD) {
                            w.emit(WorldEvent::SpawnPuff { origin: point });
                        } else {
                            w.emit(WorldEvent::SpawnBlood { origin: point, damage });
                        }
                        if damage != 0 {
                            w.damage_mobj(id, Some(shooter), Some(shooter), damage);
                        }
                        outcome = ShotOutcome::HitThing { target: id, point };
                        false
                    }
                }
            },
        );

        outcome
    }

    // ============================================================
    // Use
    // ============================================================

    /// Press whatever special line the user faces within use range.
    /// Returns the line that was used.
    pub fn use_lines(&mut self, user: MobjId) -> Option<LineId> {
        let mo = self.mobjs.get(user)?;
        let (ux, uy) = (mo.x(), mo.y());
        let trace = self.attack_trace(mo, mo.angle, self.config.use_range);

        let mut used = None;
        self.path_traverse(
            trace.x,
            trace.y,
            trace.x + trace.dx,
            trace.y + trace.dy,
            PT_ADDLINES,
            |w, ic| {
                let InterceptKind::Line(ld) = ic.kind else {
                    return true;
                };
                let line = &w.level.lines[ld];
                if line.special == 0 {
                    // can't use through a wall
                    if line_opening(&w.level, ld).range <= 0.0 {
                        w.emit(WorldEvent::NoWaySound { user });
                        return false;
                    }
                    return true;
                }

                let side = point_on_line_side(ux, uy, line);
                w.emit(WorldEvent::UseSpecialLine { line: ld, side, user });
                used = Some(ld);
                false
            },
        );
        used
    }

    // ============================================================
    // Splash damage
    // ============================================================

    /// Damage every shootable thing within `damage` units of the spot that
    /// the spot can see.
    pub fn radius_attack(&mut self, spot: MobjId, source: Option<MobjId>, damage: i32) {
        let Some(sp) = self.mobjs.get(spot) else {
            return;
        };
        let (sx, sy) = (sp.x(), sp.y());
        let reach = Bounds2::around(sx, sy, damage as f32 + MAXRADIUS);

        let candidates: Vec<(MobjId, f32, f32, f32)> = self
            .blockmap
            .things_in_box(&reach, &self.mobjs)
            .into_iter()
            .filter_map(|id| {
                let th = self.mobjs.get(id)?;
                if !th.flags.contains(MF_SHOOTABLE) || th.flags.contains(MF_NORADIUSDMG) {
                    return None;
                }
                Some((id, th.x(), th.y(), th.radius))
            })
            .collect();

        // Phase 1: parallel distance computation over the snapshot
        let mut hits: Vec<(MobjId, i32)> = candidates
            .par_iter()
            .filter_map(|&(id, x, y, radius)| {
                let dist = ((x - sx).hypot(y - sy) - radius).max(0.0) as i32;
                (dist < damage).then_some((id, dist))
            })
            .collect();
        hits.sort_unstable_by_key(|&(id, _)| id);

        // Phase 2: sequential damage application
        // check_sight and damage_mobj both need the world mutably
        for (id, dist) in hits {
            if !self.mobjs.contains(id) {
                continue;
            }
            if self.check_sight(id, spot) {
                self.damage_mobj(id, Some(spot), source, damage - dist);
            }
        }
    }

    // ============================================================
    // Damage
    // ============================================================

    /// Hurt a shootable, living thing. `inflictor` is what hit it (for
    /// knockback), `source` who is to blame.
    pub fn damage_mobj(
        &mut self,
        target: MobjId,
        inflictor: Option<MobjId>,
        source: Option<MobjId>,
        amount: i32,
    ) {
        let Some(t) = self.mobjs.get(target) else {
            return;
        };
        if !t.flags.contains(MF_SHOOTABLE) || !t.is_alive() {
            return;
        }

        let push = inflictor
            .and_then(|i| self.mobjs.get(i))
            .filter(|_| !t.flags.contains(MF_NOCLIP))
            .map(|inf| {
                let angle = point_to_angle(t.x() - inf.x(), t.y() - inf.y());
                let thrust = amount as f32 * 12.5 / t.mass.max(1) as f32;
                let dir = angle_to_vector2(angle);
                [dir[0] * thrust, dir[1] * thrust]
            });

        let Some(t) = self.mobjs.get_mut(target) else {
            return;
        };
        if t.flags.contains(MF_SKULLFLY) {
            t.momentum = [0.0; 3];
        }
        if let Some([px, py]) = push {
            t.momentum[0] += px;
            t.momentum[1] += py;
        }

        t.health -= amount;
        let dead = t.health <= 0;
        if !dead {
            // fight back
            if let Some(src) = source {
                if src != target && !t.is_player {
                    t.target = Some(src);
                }
            }
        }

        self.emit(WorldEvent::Damaged {
            target,
            inflictor,
            source,
            amount,
        });
        if dead {
            self.kill_mobj(target, source);
        }
    }

    /// Turn a thing into a corpse.
    pub fn kill_mobj(&mut self, target: MobjId, source: Option<MobjId>) {
        let Some(t) = self.mobjs.get_mut(target) else {
            return;
        };
        t.flags
            .remove(MF_SHOOTABLE | MF_FLOAT | MF_SKULLFLY | MF_SOLID | MF_NOGRAVITY);
        t.flags.insert(MF_CORPSE | MF_DROPOFF);
        t.height /= 4.0;
        self.emit(WorldEvent::Killed { target, source });
    }
}
