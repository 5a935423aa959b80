// level_builder.rs -- builds strips of rectangular rooms for tools and tests
//
// Rooms are laid out left to right along +x, each `depth` units tall in y.
// Room i is sector i and subsector i. Neighbouring rooms share either an
// open two-sided line or a solid wall. The BSP splits at room boundaries,
// left rooms on the front side.

use sectorsim_common::shared::Vec2;

use crate::defs::{LineFlags, SectorId};
use crate::level::{
    Level, LevelData, LineDef, Node, NodeChild, RejectMatrix, SectorDef, SegDef, SubsectorDef,
};
use crate::maputl::DivLine;

/// What separates two neighbouring rooms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Boundary {
    Open {
        flags: LineFlags,
        special: i32,
        tag: i32,
    },
    Wall,
}

impl Default for Boundary {
    fn default() -> Self {
        Boundary::Open {
            flags: LineFlags::empty(),
            special: 0,
            tag: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LevelBuilder {
    origin_x: f32,
    depth: f32,
    rooms: Vec<(f32, SectorDef)>,
    /// boundaries[i] separates room i and room i + 1
    boundaries: Vec<Boundary>,
    pending: Option<Boundary>,
    reject_pairs: Vec<(SectorId, SectorId)>,
}

impl Default for LevelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelBuilder {
    pub fn new() -> Self {
        Self {
            origin_x: 0.0,
            depth: 256.0,
            rooms: Vec::new(),
            boundaries: Vec::new(),
            pending: None,
            reject_pairs: Vec::new(),
        }
    }

    pub fn origin_x(mut self, x: f32) -> Self {
        self.origin_x = x;
        self
    }

    pub fn depth(mut self, depth: f32) -> Self {
        self.depth = depth;
        self
    }

    /// Append a room `width` units wide.
    pub fn room(mut self, width: f32, sector: SectorDef) -> Self {
        if !self.rooms.is_empty() {
            self.boundaries.push(self.pending.take().unwrap_or_default());
        }
        self.rooms.push((width, sector));
        self
    }

    /// Separator placed before the next room.
    pub fn boundary(mut self, boundary: Boundary) -> Self {
        self.pending = Some(boundary);
        self
    }

    pub fn wall(self) -> Self {
        self.boundary(Boundary::Wall)
    }

    pub fn special_boundary(self, special: i32, tag: i32) -> Self {
        self.boundary(Boundary::Open {
            flags: LineFlags::empty(),
            special,
            tag,
        })
    }

    /// Mark the two sectors as mutually invisible.
    pub fn reject_pair(mut self, a: SectorId, b: SectorId) -> Self {
        self.reject_pairs.push((a, b));
        self.reject_pairs.push((b, a));
        self
    }

    /// x coordinate of every room edge, left to right.
    pub fn edges(&self) -> Vec<f32> {
        let mut xs = Vec::with_capacity(self.rooms.len() + 1);
        let mut x = self.origin_x;
        xs.push(x);
        for (w, _) in &self.rooms {
            x += w;
            xs.push(x);
        }
        xs
    }

    pub fn data(&self) -> LevelData {
        let n = self.rooms.len();
        let d = self.depth;
        let xs = self.edges();

        let mut lines: Vec<LineDef> = Vec::new();

        // (line, side) for each room's bottom, top, left and right seg
        let mut room_segs: Vec<[(usize, usize); 4]> = vec![[(0, 0); 4]; n];

        for i in 0..n {
            let bottom = push_line(&mut lines, [xs[i + 1], 0.0], [xs[i], 0.0], i, None, LineFlags::empty(), 0, 0);
            let top = push_line(&mut lines, [xs[i], d], [xs[i + 1], d], i, None, LineFlags::empty(), 0, 0);
            room_segs[i][0] = (bottom, 0);
            room_segs[i][1] = (top, 0);
        }

        if n > 0 {
            let left = push_line(&mut lines, [xs[0], 0.0], [xs[0], d], 0, None, LineFlags::empty(), 0, 0);
            room_segs[0][2] = (left, 0);
            let right = push_line(&mut lines, [xs[n], d], [xs[n], 0.0], n - 1, None, LineFlags::empty(), 0, 0);
            room_segs[n - 1][3] = (right, 0);
        }

        for (i, b) in self.boundaries.iter().enumerate() {
            let x = xs[i + 1];
            match *b {
                Boundary::Open { flags, special, tag } => {
                    let l = push_line(&mut lines, [x, d], [x, 0.0], i, Some(i + 1), flags, special, tag);
                    room_segs[i][3] = (l, 0);
                    room_segs[i + 1][2] = (l, 1);
                }
                Boundary::Wall => {
                    let r = push_line(&mut lines, [x, d], [x, 0.0], i, None, LineFlags::empty(), 0, 0);
                    let l = push_line(&mut lines, [x, 0.0], [x, d], i + 1, None, LineFlags::empty(), 0, 0);
                    room_segs[i][3] = (r, 0);
                    room_segs[i + 1][2] = (l, 0);
                }
            }
        }

        let mut segs = Vec::with_capacity(n * 4);
        let mut subsectors = Vec::with_capacity(n);
        for room in &room_segs {
            let first_seg = segs.len();
            for &(line, side) in room {
                let ld = &lines[line];
                let (v1, v2) = if side == 0 { (ld.v1, ld.v2) } else { (ld.v2, ld.v1) };
                segs.push(SegDef { v1, v2, line, side });
            }
            subsectors.push(SubsectorDef {
                first_seg,
                num_segs: 4,
            });
        }

        let mut nodes = Vec::new();
        if n > 1 {
            self.split(&xs, 0, n, &mut nodes);
        }

        let reject = if self.reject_pairs.is_empty() {
            Vec::new()
        } else {
            let mut bits = vec![0u8; RejectMatrix::bytes_for(n)];
            for &(a, b) in &self.reject_pairs {
                let pnum = a * n + b;
                bits[pnum >> 3] |= 1 << (pnum & 7);
            }
            bits
        };

        LevelData {
            lines,
            sectors: self.rooms.iter().map(|(_, s)| *s).collect(),
            segs,
            subsectors,
            nodes,
            reject,
        }
    }

    /// Post-order partition of rooms [lo, hi).
    fn split(&self, xs: &[f32], lo: usize, hi: usize, nodes: &mut Vec<Node>) -> NodeChild {
        if hi - lo == 1 {
            return NodeChild::Subsector(lo);
        }
        let mid = (lo + hi) / 2;
        let front = self.split(xs, lo, mid, nodes);
        let back = self.split(xs, mid, hi, nodes);
        nodes.push(Node {
            div: DivLine::new(xs[mid], self.depth, 0.0, -self.depth),
            children: [front, back],
        });
        NodeChild::Node(nodes.len() - 1)
    }

    pub fn build(&self) -> Result<Level, String> {
        Level::new(self.data())
    }
}

/// Append a line and return its index.
#[allow(clippy::too_many_arguments)]
fn push_line(
    lines: &mut Vec<LineDef>,
    v1: Vec2,
    v2: Vec2,
    front: SectorId,
    back: Option<SectorId>,
    flags: LineFlags,
    special: i32,
    tag: i32,
) -> usize {
    lines.push(LineDef {
        v1,
        v2,
        flags,
        special,
        tag,
        front,
        back,
    });
    lines.len() - 1
}

/// Sector with the given floor and ceiling heights.
pub fn sector(floor: f32, ceiling: f32) -> SectorDef {
    SectorDef {
        floor_height: floor,
        ceiling_height: ceiling,
        ..SectorDef::default()
    }
}
