// slide.rs -- sliding along walls after a blocked move
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.
//
// The momentum is traced from the box corners to find the nearest blocking
// line. The thing moves up to it, then the rest of the momentum is turned
// along the line. Every position change goes through try_move.

use crate::defs::{LineId, PT_ADDLINES, SLIDE_FUDGE};
use crate::level::SlopeType;
use crate::maputl::{line_opening, point_on_line_side};
use crate::mobj::MobjId;
use crate::traverse::{Intercept, InterceptKind};
use crate::world::World;

/// The mover as the slide traces see it.
#[derive(Debug, Clone, Copy)]
struct Slider {
    x: f32,
    y: f32,
    z: f32,
    height: f32,
}

impl World {
    /// Slide the thing along whatever blocks its momentum.
    pub fn slide_move(&mut self, thing: MobjId) {
        let mut hitcount = 0;
        loop {
            let Some(mo) = self.mobjs.get(thing) else {
                return;
            };
            let slider = Slider {
                x: mo.x(),
                y: mo.y(),
                z: mo.z(),
                height: mo.height,
            };
            let radius = mo.radius;
            let [momx, momy, _] = mo.momentum;

            hitcount += 1;
            if hitcount >= self.config.slide_bumps.max(1) {
                self.stairstep(thing);
                return;
            }

            // trace along the three leading corners
            let (leadx, trailx) = if momx > 0.0 {
                (slider.x + radius, slider.x - radius)
            } else {
                (slider.x - radius, slider.x + radius)
            };
            let (leady, traily) = if momy > 0.0 {
                (slider.y + radius, slider.y - radius)
            } else {
                (slider.y - radius, slider.y + radius)
            };

            let mut best: Option<(f32, LineId)> = None;
            for (sx, sy) in [(leadx, leady), (trailx, leady), (leadx, traily)] {
                self.path_traverse(sx, sy, sx + momx, sy + momy, PT_ADDLINES, |w, ic| {
                    slide_traverse(w, ic, &slider, &mut best)
                });
            }

            // the move must have hit the middle, so stairstep
            let Some((bestfrac, bestline)) = best else {
                self.stairstep(thing);
                return;
            };

            // fudge a bit to make sure it doesn't hit
            let frac = bestfrac - SLIDE_FUDGE;
            if frac > 0.0 {
                let (nx, ny) = (slider.x + momx * frac, slider.y + momy * frac);
                if !self.try_move(thing, nx, ny).moved() {
                    self.stairstep(thing);
                    return;
                }
            }

            // now continue along the wall
            let remain = (1.0 - (frac + SLIDE_FUDGE)).min(1.0);
            if remain <= 0.0 {
                return;
            }
            let (xmove, ymove) = self.hit_slide_line(bestline, momx * remain, momy * remain);

            let Some(mo) = self.mobjs.get_mut(thing) else {
                return;
            };
            mo.momentum[0] = xmove;
            mo.momentum[1] = ymove;
            let (x, y) = (mo.x(), mo.y());

            if self.try_move(thing, x + xmove, y + ymove).moved() {
                return;
            }
        }
    }

    /// Try the y move alone, then the x move alone.
    fn stairstep(&mut self, thing: MobjId) {
        let Some(mo) = self.mobjs.get(thing) else {
            return;
        };
        let (x, y) = (mo.x(), mo.y());
        let [momx, momy, _] = mo.momentum;
        if !self.try_move(thing, x, y + momy).moved() {
            self.try_move(thing, x + momx, y);
        }
    }

    /// The part of the move that runs along the line.
    fn hit_slide_line(&self, line: LineId, xmove: f32, ymove: f32) -> (f32, f32) {
        let ld = &self.level.lines[line];
        match ld.slope_type {
            SlopeType::Horizontal => (xmove, 0.0),
            SlopeType::Vertical => (0.0, ymove),
            _ => {
                let len2 = ld.dx * ld.dx + ld.dy * ld.dy;
                let along = (xmove * ld.dx + ymove * ld.dy) / len2;
                (ld.dx * along, ld.dy * along)
            }
        }
    }
}

/// Record the line if it would stop the slider. Returns false to end the
/// trace at the first blocking line.
fn slide_traverse(w: &World, ic: &Intercept, mo: &Slider, best: &mut Option<(f32, LineId)>) -> bool {
    let InterceptKind::Line(ld) = ic.kind else {
        return true;
    };
    let line = &w.level.lines[ld];

    if !line.is_two_sided() {
        // don't hit the back side
        if point_on_line_side(mo.x, mo.y, line) == 1 {
            return true;
        }
    } else {
        let op = line_opening(&w.level, ld);
        let blocks = op.range < mo.height
            || op.top - mo.z < mo.height
            || op.bottom - mo.z > w.config.max_step;
        if !blocks {
            return true;
        }
    }

    if best.map_or(true, |(f, _)| ic.frac < f) {
        *best = Some((ic.frac, ld));
    }
    false
}
