// blockmap.rs -- uniform grid over lines and things
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.
//
// Each cell holds the lines touching it (built once) and the head of a
// doubly linked chain of things whose center lies in it. Things carry
// their own prev/next links, so linking and unlinking are O(1).

use sectorsim_common::common::com_dprintf;
use sectorsim_common::shared::{Bounds2, Vec2};

use crate::defs::{LineId, BLOCKMAP_MARGIN, MAPBLOCKSIZE};
use crate::level::Level;
use crate::maputl::box_on_line_side;
use crate::mobj::{MobjId, MobjPool};

/// Inclusive, clamped range of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub x0: usize,
    pub x1: usize,
    pub y0: usize,
    pub y1: usize,
}

impl CellRange {
    /// Column-major, matching the order the movement code has always
    /// visited cells in.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        let (y0, y1) = (self.y0, self.y1);
        (self.x0..=self.x1).flat_map(move |x| (y0..=y1).map(move |y| (x, y)))
    }
}

#[derive(Debug, Clone)]
pub struct Blockmap {
    pub origin: Vec2,
    pub width: usize,
    pub height: usize,
    lines: Vec<Vec<LineId>>,
    links: Vec<Option<MobjId>>,
}

impl Blockmap {
    /// Build the grid over the level bounds and file every line under each
    /// cell it crosses.
    pub fn build(level: &Level) -> Blockmap {
        let b = if level.bounds.is_cleared() {
            Bounds2::around(0.0, 0.0, 0.0)
        } else {
            level.bounds
        };
        let origin = [b.mins[0] - BLOCKMAP_MARGIN, b.mins[1] - BLOCKMAP_MARGIN];
        let width = ((b.maxs[0] + BLOCKMAP_MARGIN - origin[0]) / MAPBLOCKSIZE).floor() as usize + 1;
        let height = ((b.maxs[1] + BLOCKMAP_MARGIN - origin[1]) / MAPBLOCKSIZE).floor() as usize + 1;

        let mut bm = Blockmap {
            origin,
            width,
            height,
            lines: vec![Vec::new(); width * height],
            links: vec![None; width * height],
        };

        let mut filed = 0usize;
        for (id, line) in level.lines.iter().enumerate() {
            let Some(range) = bm.cell_range(&line.bbox.expanded(1.0)) else {
                continue;
            };
            for (cx, cy) in range.cells() {
                let cell_box = bm.cell_bounds(cx, cy).expanded(1.0);
                if !cell_box.overlaps(&line.bbox.expanded(0.5)) {
                    continue;
                }
                if box_on_line_side(&cell_box, line).is_none() {
                    let c = bm.index(cx, cy);
                    bm.lines[c].push(id);
                    filed += 1;
                }
            }
        }

        com_dprintf(&format!(
            "blockmap: {}x{} cells, {} line entries for {} lines\n",
            width,
            height,
            filed,
            level.lines.len()
        ));
        bm
    }

    #[inline]
    fn index(&self, cx: usize, cy: usize) -> usize {
        cy * self.width + cx
    }

    /// Unclamped cell coordinate along one axis.
    #[inline]
    pub fn block_coord(&self, v: f32, axis: usize) -> i32 {
        ((v - self.origin[axis]) / MAPBLOCKSIZE).floor() as i32
    }

    pub fn cell_bounds(&self, cx: usize, cy: usize) -> Bounds2 {
        let x = self.origin[0] + cx as f32 * MAPBLOCKSIZE;
        let y = self.origin[1] + cy as f32 * MAPBLOCKSIZE;
        Bounds2 {
            mins: [x, y],
            maxs: [x + MAPBLOCKSIZE, y + MAPBLOCKSIZE],
        }
    }

    /// Cell containing (x, y), or None off the grid.
    pub fn cell_at(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let cx = self.block_coord(x, 0);
        let cy = self.block_coord(y, 1);
        self.valid(cx, cy).then_some((cx as usize, cy as usize))
    }

    #[inline]
    pub fn valid(&self, cx: i32, cy: i32) -> bool {
        cx >= 0 && cy >= 0 && (cx as usize) < self.width && (cy as usize) < self.height
    }

    /// Cells overlapped by the box, clamped to the grid. None when the box
    /// misses the grid entirely.
    pub fn cell_range(&self, bbox: &Bounds2) -> Option<CellRange> {
        let x0 = self.block_coord(bbox.mins[0], 0).max(0);
        let x1 = self.block_coord(bbox.maxs[0], 0).min(self.width as i32 - 1);
        let y0 = self.block_coord(bbox.mins[1], 1).max(0);
        let y1 = self.block_coord(bbox.maxs[1], 1).min(self.height as i32 - 1);
        if x0 > x1 || y0 > y1 {
            return None;
        }
        Some(CellRange {
            x0: x0 as usize,
            x1: x1 as usize,
            y0: y0 as usize,
            y1: y1 as usize,
        })
    }

    /// Lines filed under the cell. A line appears in every cell it
    /// touches; callers de-duplicate.
    pub fn lines_in(&self, cx: usize, cy: usize) -> &[LineId] {
        match self.lines.get(self.index(cx, cy)) {
            Some(l) if cx < self.width => l,
            _ => &[],
        }
    }

    pub fn head(&self, cx: usize, cy: usize) -> Option<MobjId> {
        if cx >= self.width || cy >= self.height {
            return None;
        }
        self.links[self.index(cx, cy)]
    }

    /// Snapshot of the cell's thing chain, head first.
    pub fn things_in(&self, cx: usize, cy: usize, mobjs: &MobjPool) -> Vec<MobjId> {
        let mut out = Vec::new();
        let mut cur = self.head(cx, cy);
        while let Some(id) = cur {
            out.push(id);
            cur = mobjs.get(id).and_then(|m| m.bnext);
        }
        out
    }

    /// Snapshot of every thing filed under the cells overlapping the box.
    pub fn things_in_box(&self, bbox: &Bounds2, mobjs: &MobjPool) -> Vec<MobjId> {
        let mut out = Vec::new();
        if let Some(range) = self.cell_range(bbox) {
            for (cx, cy) in range.cells() {
                out.extend(self.things_in(cx, cy, mobjs));
            }
        }
        out
    }

    /// Put the thing at the head of its cell's chain. Returns false (and
    /// leaves the thing unlinked) when its center is off the grid.
    pub fn link(&mut self, mobjs: &mut MobjPool, id: MobjId) -> bool {
        let Some(mo) = mobjs.get(id) else {
            return false;
        };
        let Some((cx, cy)) = self.cell_at(mo.x(), mo.y()) else {
            if let Some(mo) = mobjs.get_mut(id) {
                mo.block_cell = None;
                mo.bprev = None;
                mo.bnext = None;
            }
            return false;
        };
        let c = self.index(cx, cy);
        let head = self.links[c];

        if let Some(mo) = mobjs.get_mut(id) {
            mo.block_cell = Some(c);
            mo.bprev = None;
            mo.bnext = head;
        }
        if let Some(h) = head {
            if let Some(next) = mobjs.get_mut(h) {
                next.bprev = Some(id);
            }
        }
        self.links[c] = Some(id);
        true
    }

    pub fn unlink(&mut self, mobjs: &mut MobjPool, id: MobjId) {
        let Some(mo) = mobjs.get_mut(id) else {
            return;
        };
        let Some(c) = mo.block_cell.take() else {
            return;
        };
        let prev = mo.bprev.take();
        let next = mo.bnext.take();

        if let Some(n) = next {
            if let Some(nm) = mobjs.get_mut(n) {
                nm.bprev = prev;
            }
        }
        match prev {
            Some(p) => {
                if let Some(pm) = mobjs.get_mut(p) {
                    pm.bnext = next;
                }
            }
            None => {
                if self.links[c] == Some(id) {
                    self.links[c] = next;
                }
            }
        }
    }
}
