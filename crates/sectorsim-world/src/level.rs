// level.rs -- level geometry, BSP point location and the reject matrix
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.
//
// Geometry arrives as plain data (LevelData) and is validated once. After
// that, only sector heights and the per-sector center chains change.

use sectorsim_common::common::com_printf;
use sectorsim_common::shared::{Bounds2, Vec2};

use crate::defs::{LineFlags, LineId, NodeId, SectorId, SegId, SubsectorId, ML_TWOSIDED};
use crate::maputl::{point_on_divline_side, DivLine};
use crate::mobj::MobjId;

// ============================================================
// Input records
// ============================================================

#[derive(Debug, Clone)]
pub struct LineDef {
    pub v1: Vec2,
    pub v2: Vec2,
    pub flags: LineFlags,
    pub special: i32,
    pub tag: i32,
    pub front: SectorId,
    pub back: Option<SectorId>,
}

#[derive(Debug, Clone, Copy)]
pub struct SectorDef {
    pub floor_height: f32,
    pub ceiling_height: f32,
    pub light_level: i32,
    pub special: i32,
    pub tag: i32,
    pub sky_ceiling: bool,
}

impl Default for SectorDef {
    fn default() -> Self {
        Self {
            floor_height: 0.0,
            ceiling_height: 128.0,
            light_level: 160,
            special: 0,
            tag: 0,
            sky_ceiling: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SegDef {
    pub v1: Vec2,
    pub v2: Vec2,
    pub line: LineId,
    /// 0 = front side of the line, 1 = back side
    pub side: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SubsectorDef {
    pub first_seg: SegId,
    pub num_segs: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LevelData {
    pub lines: Vec<LineDef>,
    pub sectors: Vec<SectorDef>,
    pub segs: Vec<SegDef>,
    pub subsectors: Vec<SubsectorDef>,
    /// root is the last node
    pub nodes: Vec<Node>,
    /// sector-pair bits, row-major; empty means nothing is rejected
    pub reject: Vec<u8>,
}

// ============================================================
// Runtime records
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeType {
    Horizontal,
    Vertical,
    Positive,
    Negative,
}

#[derive(Debug, Clone)]
pub struct Line {
    pub v1: Vec2,
    pub v2: Vec2,
    pub dx: f32,
    pub dy: f32,
    pub bbox: Bounds2,
    pub slope_type: SlopeType,
    pub flags: LineFlags,
    pub special: i32,
    pub tag: i32,
    pub front: SectorId,
    pub back: Option<SectorId>,
}

impl Line {
    pub fn is_two_sided(&self) -> bool {
        self.back.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Sector {
    pub floor_height: f32,
    pub ceiling_height: f32,
    pub light_level: i32,
    pub special: i32,
    pub tag: i32,
    pub sky_ceiling: bool,
    /// every line bordering this sector
    pub lines: Vec<LineId>,
    pub bbox: Bounds2,
    /// head of the chain of entities whose center lies here
    pub thinglist: Option<MobjId>,
}

#[derive(Debug, Clone, Copy)]
pub struct Seg {
    pub v1: Vec2,
    pub v2: Vec2,
    pub line: LineId,
    pub side: usize,
    pub front: SectorId,
    pub back: Option<SectorId>,
}

#[derive(Debug, Clone, Copy)]
pub struct Subsector {
    pub sector: SectorId,
    pub first_seg: SegId,
    pub num_segs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeChild {
    Node(NodeId),
    Subsector(SubsectorId),
}

/// BSP partition. children[0] is the front (right) side of the divline.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub div: DivLine,
    pub children: [NodeChild; 2],
}

/// Sector-pair visibility bits. A set bit means "cannot see".
#[derive(Debug, Clone, Default)]
pub struct RejectMatrix {
    num_sectors: usize,
    bits: Vec<u8>,
}

impl RejectMatrix {
    pub fn new(num_sectors: usize, bits: Vec<u8>) -> Self {
        Self { num_sectors, bits }
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn rejects(&self, a: SectorId, b: SectorId) -> bool {
        if self.bits.is_empty() || a >= self.num_sectors || b >= self.num_sectors {
            return false;
        }
        let pnum = a * self.num_sectors + b;
        self.bits[pnum >> 3] & (1 << (pnum & 7)) != 0
    }

    pub fn bytes_for(num_sectors: usize) -> usize {
        (num_sectors * num_sectors).div_ceil(8)
    }
}

// ============================================================
// Point location seam
// ============================================================

/// Maps a map position to its BSP leaf.
pub trait PointLocator {
    fn point_in_subsector(&self, x: f32, y: f32) -> SubsectorId;
    fn subsector_sector(&self, ss: SubsectorId) -> SectorId;

    fn sector_at(&self, x: f32, y: f32) -> SectorId {
        self.subsector_sector(self.point_in_subsector(x, y))
    }
}

// ============================================================
// Level
// ============================================================

#[derive(Debug, Clone)]
pub struct Level {
    pub lines: Vec<Line>,
    pub sectors: Vec<Sector>,
    pub segs: Vec<Seg>,
    pub subsectors: Vec<Subsector>,
    pub nodes: Vec<Node>,
    pub reject: RejectMatrix,
    /// extent of every vertex
    pub bounds: Bounds2,
}

fn level_error<T>(msg: String) -> Result<T, String> {
    com_printf(&format!("Level::new: {}\n", msg));
    Err(msg)
}

fn slope_type(dx: f32, dy: f32) -> SlopeType {
    if dx == 0.0 {
        SlopeType::Vertical
    } else if dy == 0.0 {
        SlopeType::Horizontal
    } else if dy / dx > 0.0 {
        SlopeType::Positive
    } else {
        SlopeType::Negative
    }
}

impl Level {
    /// Validate and index the level data.
    pub fn new(data: LevelData) -> Result<Level, String> {
        let num_sectors = data.sectors.len();
        if num_sectors == 0 {
            return level_error("no sectors".to_string());
        }
        if data.subsectors.is_empty() {
            return level_error("no subsectors".to_string());
        }

        let mut sectors: Vec<Sector> = Vec::with_capacity(num_sectors);
        for (i, def) in data.sectors.iter().enumerate() {
            if def.floor_height > def.ceiling_height {
                return level_error(format!(
                    "sector {} floor {} above ceiling {}",
                    i, def.floor_height, def.ceiling_height
                ));
            }
            sectors.push(Sector {
                floor_height: def.floor_height,
                ceiling_height: def.ceiling_height,
                light_level: def.light_level,
                special: def.special,
                tag: def.tag,
                sky_ceiling: def.sky_ceiling,
                lines: Vec::new(),
                bbox: Bounds2::cleared(),
                thinglist: None,
            });
        }

        let mut bounds = Bounds2::cleared();
        let mut lines: Vec<Line> = Vec::with_capacity(data.lines.len());
        for (i, def) in data.lines.iter().enumerate() {
            if def.front >= num_sectors {
                return level_error(format!("line {} front sector {} out of range", i, def.front));
            }
            if let Some(back) = def.back {
                if back >= num_sectors {
                    return level_error(format!("line {} back sector {} out of range", i, back));
                }
            }
            let dx = def.v2[0] - def.v1[0];
            let dy = def.v2[1] - def.v1[1];
            if dx == 0.0 && dy == 0.0 {
                return level_error(format!("line {} has zero length", i));
            }

            let mut flags = def.flags;
            if def.back.is_some() {
                flags |= ML_TWOSIDED;
            } else if flags.contains(ML_TWOSIDED) {
                return level_error(format!("line {} is marked two-sided without a back sector", i));
            }

            let mut bbox = Bounds2::cleared();
            bbox.add_point(def.v1[0], def.v1[1]);
            bbox.add_point(def.v2[0], def.v2[1]);
            bounds.add_point(def.v1[0], def.v1[1]);
            bounds.add_point(def.v2[0], def.v2[1]);

            for s in [Some(def.front), def.back].into_iter().flatten() {
                let sector = &mut sectors[s];
                if !sector.lines.contains(&i) {
                    sector.lines.push(i);
                }
                sector.bbox.add_point(def.v1[0], def.v1[1]);
                sector.bbox.add_point(def.v2[0], def.v2[1]);
            }

            lines.push(Line {
                v1: def.v1,
                v2: def.v2,
                dx,
                dy,
                bbox,
                slope_type: slope_type(dx, dy),
                flags,
                special: def.special,
                tag: def.tag,
                front: def.front,
                back: def.back,
            });
        }

        let mut segs: Vec<Seg> = Vec::with_capacity(data.segs.len());
        for (i, def) in data.segs.iter().enumerate() {
            let Some(line) = lines.get(def.line) else {
                return level_error(format!("seg {} line {} out of range", i, def.line));
            };
            let (front, back) = match def.side {
                0 => (line.front, line.back),
                1 => match line.back {
                    Some(b) => (b, Some(line.front)),
                    None => {
                        return level_error(format!("seg {} is on the back of one-sided line {}", i, def.line))
                    }
                },
                s => return level_error(format!("seg {} has bad side {}", i, s)),
            };
            segs.push(Seg {
                v1: def.v1,
                v2: def.v2,
                line: def.line,
                side: def.side,
                front,
                back,
            });
        }

        let mut subsectors: Vec<Subsector> = Vec::with_capacity(data.subsectors.len());
        for (i, def) in data.subsectors.iter().enumerate() {
            if def.num_segs == 0 || def.first_seg + def.num_segs > segs.len() {
                return level_error(format!(
                    "subsector {} seg range {}+{} invalid",
                    i, def.first_seg, def.num_segs
                ));
            }
            subsectors.push(Subsector {
                sector: segs[def.first_seg].front,
                first_seg: def.first_seg,
                num_segs: def.num_segs,
            });
        }

        for (i, node) in data.nodes.iter().enumerate() {
            if node.div.dx == 0.0 && node.div.dy == 0.0 {
                return level_error(format!("node {} has a degenerate partition", i));
            }
            for child in node.children {
                let ok = match child {
                    NodeChild::Node(n) => n < i,
                    NodeChild::Subsector(s) => s < subsectors.len(),
                };
                if !ok {
                    return level_error(format!("node {} child {:?} invalid", i, child));
                }
            }
        }
        if data.nodes.is_empty() && subsectors.len() > 1 {
            return level_error(format!("{} subsectors but no nodes", subsectors.len()));
        }

        if !data.reject.is_empty() && data.reject.len() < RejectMatrix::bytes_for(num_sectors) {
            return level_error(format!(
                "reject matrix has {} bytes, need {}",
                data.reject.len(),
                RejectMatrix::bytes_for(num_sectors)
            ));
        }

        Ok(Level {
            lines,
            sectors,
            segs,
            subsectors,
            nodes: data.nodes,
            reject: RejectMatrix::new(num_sectors, data.reject),
            bounds,
        })
    }

    pub fn root(&self) -> NodeChild {
        match self.nodes.len() {
            0 => NodeChild::Subsector(0),
            n => NodeChild::Node(n - 1),
        }
    }

    pub fn subsector_segs(&self, ss: SubsectorId) -> &[Seg] {
        let sub = &self.subsectors[ss];
        &self.segs[sub.first_seg..sub.first_seg + sub.num_segs]
    }
}

impl PointLocator for Level {
    fn point_in_subsector(&self, x: f32, y: f32) -> SubsectorId {
        let mut child = self.root();
        loop {
            match child {
                NodeChild::Subsector(ss) => return ss,
                NodeChild::Node(n) => {
                    let node = &self.nodes[n];
                    child = node.children[point_on_divline_side(x, y, &node.div)];
                }
            }
        }
    }

    fn subsector_sector(&self, ss: SubsectorId) -> SectorId {
        self.subsectors[ss].sector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level_builder::LevelBuilder;

    fn square_room() -> LevelData {
        let sector = SectorDef::default();
        let pts = [[0.0, 0.0], [0.0, 128.0], [128.0, 128.0], [128.0, 0.0]];
        let mut lines = Vec::new();
        let mut segs = Vec::new();
        for i in 0..4 {
            let v1 = pts[i];
            let v2 = pts[(i + 1) % 4];
            lines.push(LineDef {
                v1,
                v2,
                flags: LineFlags::empty(),
                special: 0,
                tag: 0,
                front: 0,
                back: None,
            });
            segs.push(SegDef { v1, v2, line: i, side: 0 });
        }
        LevelData {
            lines,
            sectors: vec![sector],
            segs,
            subsectors: vec![SubsectorDef { first_seg: 0, num_segs: 4 }],
            nodes: Vec::new(),
            reject: Vec::new(),
        }
    }

    // =========================================================================
    // Construction
    // =========================================================================

    #[test]
    fn single_room_builds() {
        let level = Level::new(square_room()).unwrap();
        assert_eq!(level.lines.len(), 4);
        assert_eq!(level.sectors[0].lines.len(), 4);
        assert_eq!(level.bounds.mins, [0.0, 0.0]);
        assert_eq!(level.bounds.maxs, [128.0, 128.0]);
        assert_eq!(level.subsectors[0].sector, 0);
        assert_eq!(level.point_in_subsector(64.0, 64.0), 0);
    }

    #[test]
    fn slope_types_are_classified() {
        assert_eq!(slope_type(0.0, 5.0), SlopeType::Vertical);
        assert_eq!(slope_type(5.0, 0.0), SlopeType::Horizontal);
        assert_eq!(slope_type(2.0, 3.0), SlopeType::Positive);
        assert_eq!(slope_type(-2.0, 3.0), SlopeType::Negative);
    }

    #[test]
    fn bad_front_sector_is_rejected() {
        let mut data = square_room();
        data.lines[2].front = 9;
        let err = Level::new(data).unwrap_err();
        assert!(err.contains("front sector 9"));
    }

    #[test]
    fn two_sided_flag_without_back_is_rejected() {
        let mut data = square_room();
        data.lines[0].flags = ML_TWOSIDED;
        assert!(Level::new(data).is_err());
    }

    #[test]
    fn back_seg_on_one_sided_line_is_rejected() {
        let mut data = square_room();
        data.segs[1].side = 1;
        assert!(Level::new(data).is_err());
    }

    #[test]
    fn inverted_sector_is_rejected() {
        let mut data = square_room();
        data.sectors[0].floor_height = 200.0;
        assert!(Level::new(data).is_err());
    }

    #[test]
    fn short_reject_matrix_is_rejected() {
        let mut data = LevelBuilder::new().room(128.0, SectorDef::default()).room(128.0, SectorDef::default()).data();
        // 3 sectors would need 2 bytes; 2 sectors need 1
        data.reject = vec![];
        assert!(Level::new(data.clone()).is_ok());
        data.sectors.push(SectorDef::default());
        data.reject = vec![0];
        assert!(Level::new(data).is_err());
    }

    // =========================================================================
    // Point location and reject
    // =========================================================================

    #[test]
    fn point_location_descends_partitions() {
        let level = LevelBuilder::new()
            .room(128.0, SectorDef::default())
            .room(128.0, SectorDef::default())
            .room(128.0, SectorDef::default())
            .build()
            .unwrap();
        assert_eq!(level.sector_at(10.0, 64.0), 0);
        assert_eq!(level.sector_at(200.0, 64.0), 1);
        assert_eq!(level.sector_at(300.0, 10.0), 2);
    }

    #[test]
    fn reject_matrix_bits() {
        let mut bits = vec![0u8; RejectMatrix::bytes_for(3)];
        // pair (1, 2) -> bit 5
        bits[0] |= 1 << 5;
        let r = RejectMatrix::new(3, bits);
        assert!(r.rejects(1, 2));
        assert!(!r.rejects(2, 1));
        assert!(!r.rejects(0, 0));
        assert!(!RejectMatrix::default().rejects(0, 1));
    }
}
