// traverse.rs -- ordered walk of everything a trace crosses
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.
//
// The trace walks the blockmap cell by cell, collecting line and thing
// intercepts as fractions along the trace. Once collected they are sorted
// and handed to the visitor nearest first.

use std::collections::HashSet;

use crate::defs::{LineId, TraverseFlags, MAPBLOCKSIZE, SHORT_TRACE};
use crate::maputl::{intercept_vector, point_on_divline_side, point_on_line_side, DivLine};
use crate::mobj::MobjId;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptKind {
    Line(LineId),
    Thing(MobjId),
}

/// A crossing at `frac` along the trace (0 = start, 1 = end).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intercept {
    pub frac: f32,
    pub kind: InterceptKind,
}

impl World {
    /// Visit every line and/or thing crossed by the segment, nearest first.
    /// Returns false if the visitor stopped the walk, or if EARLY_OUT is set
    /// and a one-sided line lies in the way.
    pub fn path_traverse<F>(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        flags: TraverseFlags,
        mut visitor: F,
    ) -> bool
    where
        F: FnMut(&mut World, &Intercept) -> bool,
    {
        let Some(intercepts) = self.collect_intercepts(x1, y1, x2, y2, flags) else {
            return false;
        };

        for ic in &intercepts {
            if ic.frac > 1.0 {
                break;
            }
            if !visitor(self, ic) {
                return false;
            }
        }
        true
    }

    /// Where a trace from (x, y) really starts: never exactly on a cell
    /// edge. Intercept fractions are measured from this point.
    pub fn trace_start(&self, mut x: f32, mut y: f32) -> (f32, f32) {
        let origin = self.blockmap.origin;
        if (x - origin[0]).rem_euclid(MAPBLOCKSIZE) == 0.0 {
            x += 1.0;
        }
        if (y - origin[1]).rem_euclid(MAPBLOCKSIZE) == 0.0 {
            y += 1.0;
        }
        (x, y)
    }

    /// Sorted intercepts along the segment. None on an early out.
    fn collect_intercepts(
        &self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        flags: TraverseFlags,
    ) -> Option<Vec<Intercept>> {
        let bm = &self.blockmap;
        let (x1, y1) = self.trace_start(x1, y1);

        let trace = DivLine::between(x1, y1, x2, y2);
        let long_trace = trace.dx.abs() > SHORT_TRACE || trace.dy.abs() > SHORT_TRACE;
        let early_out = flags.contains(TraverseFlags::EARLY_OUT);

        let mut intercepts: Vec<Intercept> = Vec::new();
        let mut line_seen = HashSet::new();

        let mut cx = bm.block_coord(x1, 0);
        let mut cy = bm.block_coord(y1, 1);
        let cx2 = bm.block_coord(x2, 0);
        let cy2 = bm.block_coord(y2, 1);

        let (step_x, mut tmax_x, tdelta_x) = axis_stepping(x1 - bm.origin[0], trace.dx, cx, cx2);
        let (step_y, mut tmax_y, tdelta_y) = axis_stepping(y1 - bm.origin[1], trace.dy, cy, cy2);

        let steps = (cx2 - cx).unsigned_abs() + (cy2 - cy).unsigned_abs() + 1;
        for _ in 0..steps {
            if bm.valid(cx, cy) {
                let (ux, uy) = (cx as usize, cy as usize);

                if flags.contains(TraverseFlags::ADD_LINES) {
                    for &ld in bm.lines_in(ux, uy) {
                        if !line_seen.insert(ld) {
                            continue;
                        }

                        let line = &self.level.lines[ld];
                        let (s1, s2) = if long_trace {
                            (
                                point_on_divline_side(line.v1[0], line.v1[1], &trace),
                                point_on_divline_side(line.v2[0], line.v2[1], &trace),
                            )
                        } else {
                            (
                                point_on_line_side(trace.x, trace.y, line),
                                point_on_line_side(trace.x + trace.dx, trace.y + trace.dy, line),
                            )
                        };
                        if s1 == s2 {
                            continue;
                        }

                        let frac = intercept_vector(&trace, &DivLine::from_line(line));
                        if frac < 0.0 {
                            continue;
                        }
                        if early_out && frac < 1.0 && !line.is_two_sided() {
                            return None;
                        }
                        intercepts.push(Intercept {
                            frac,
                            kind: InterceptKind::Line(ld),
                        });
                    }
                }

                if flags.contains(TraverseFlags::ADD_THINGS) {
                    let positive = (trace.dx >= 0.0) == (trace.dy >= 0.0);
                    for id in bm.things_in(ux, uy, &self.mobjs) {
                        let Some(mo) = self.mobjs.get(id) else {
                            continue;
                        };
                        let r = mo.radius;

                        // the cross-section diagonal facing the trace
                        let cross = if positive {
                            DivLine::between(mo.x() - r, mo.y() + r, mo.x() + r, mo.y() - r)
                        } else {
                            DivLine::between(mo.x() - r, mo.y() - r, mo.x() + r, mo.y() + r)
                        };
                        let s1 = point_on_divline_side(cross.x, cross.y, &trace);
                        let s2 = point_on_divline_side(cross.x + cross.dx, cross.y + cross.dy, &trace);
                        if s1 == s2 {
                            continue;
                        }

                        let frac = intercept_vector(&trace, &cross);
                        if frac < 0.0 {
                            continue;
                        }
                        intercepts.push(Intercept {
                            frac,
                            kind: InterceptKind::Thing(id),
                        });
                    }
                }
            }

            if cx == cx2 && cy == cy2 {
                break;
            }
            if step_x != 0 && (step_y == 0 || tmax_x < tmax_y) {
                cx += step_x;
                tmax_x += tdelta_x;
            } else if step_y != 0 {
                cy += step_y;
                tmax_y += tdelta_y;
            } else {
                break;
            }
        }

        intercepts.sort_by(|a, b| a.frac.total_cmp(&b.frac));
        Some(intercepts)
    }
}

/// Cell step direction, fraction of the trace at the first cell edge and
/// fraction per whole cell, for one axis.
fn axis_stepping(offset: f32, delta: f32, c: i32, c2: i32) -> (i32, f32, f32) {
    if c2 > c && delta > 0.0 {
        let edge = (c + 1) as f32 * MAPBLOCKSIZE;
        (1, (edge - offset) / delta, MAPBLOCKSIZE / delta)
    } else if c2 < c && delta < 0.0 {
        let edge = c as f32 * MAPBLOCKSIZE;
        (-1, (edge - offset) / delta, MAPBLOCKSIZE / -delta)
    } else {
        (0, f32::INFINITY, f32::INFINITY)
    }
}
