// occupancy.rs -- sector nodes: which sectors each thing's box overlaps
//
// A node links one thing to one sector. Every node sits on two doubly
// linked threads at once: the thing's thread (all sectors it touches) and
// the sector's thread (all things touching it). Nodes live in an arena
// with a free list and are addressed by generation-tagged ids.

use std::collections::HashSet;

use sectorsim_common::shared::Bounds2;

use crate::blockmap::Blockmap;
use crate::defs::{LineId, SectorId, MAXRADIUS};
use crate::level::{Level, PointLocator};
use crate::maputl::box_on_line_side;
use crate::mobj::MobjId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecNodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
pub struct SecNode {
    pub sector: SectorId,
    pub thing: MobjId,
    /// set by relink when re-confirmed, and by the sector-change scan
    pub visited: bool,
    // thing's thread
    pub tprev: Option<SecNodeId>,
    pub tnext: Option<SecNodeId>,
    // sector's thread
    pub sprev: Option<SecNodeId>,
    pub snext: Option<SecNodeId>,
}

#[derive(Debug, Clone)]
enum NodeSlot {
    Free { generation: u32 },
    Used { generation: u32, node: SecNode },
}

#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    nodes: Vec<NodeSlot>,
    free: Vec<u32>,
    sector_heads: Vec<Option<SecNodeId>>,
    live: usize,
}

impl Occupancy {
    pub fn new(num_sectors: usize) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            sector_heads: vec![None; num_sectors],
            live: 0,
        }
    }

    pub fn get(&self, id: SecNodeId) -> Option<&SecNode> {
        match self.nodes.get(id.index as usize)? {
            NodeSlot::Used { generation, node } if *generation == id.generation => Some(node),
            _ => None,
        }
    }

    fn get_mut(&mut self, id: SecNodeId) -> Option<&mut SecNode> {
        match self.nodes.get_mut(id.index as usize)? {
            NodeSlot::Used { generation, node } if *generation == id.generation => Some(node),
            _ => None,
        }
    }

    /// Number of nodes in use.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Arena size, used and free.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn sector_head(&self, sector: SectorId) -> Option<SecNodeId> {
        self.sector_heads.get(sector).copied().flatten()
    }

    fn alloc(&mut self, node: SecNode) -> SecNodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.nodes[index as usize];
            let generation = match *slot {
                NodeSlot::Free { generation } | NodeSlot::Used { generation, .. } => generation,
            };
            *slot = NodeSlot::Used { generation, node };
            return SecNodeId { index, generation };
        }
        let index = self.nodes.len() as u32;
        self.nodes.push(NodeSlot::Used { generation: 0, node });
        SecNodeId { index, generation: 0 }
    }

    fn release(&mut self, id: SecNodeId) {
        if self.get(id).is_none() {
            return;
        }
        self.nodes[id.index as usize] = NodeSlot::Free {
            generation: id.generation.wrapping_add(1),
        };
        self.free.push(id.index);
        self.live -= 1;
    }

    /// Add a node for `sector` to the thread starting at `head`, or mark the
    /// existing one visited.
    fn add_node(&mut self, sector: SectorId, thing: MobjId, head: &mut Option<SecNodeId>) {
        let mut cur = *head;
        while let Some(id) = cur {
            let Some(node) = self.get_mut(id) else { break };
            if node.sector == sector {
                node.visited = true;
                return;
            }
            cur = node.tnext;
        }

        let sector_head = self.sector_head(sector);
        let id = self.alloc(SecNode {
            sector,
            thing,
            visited: true,
            tprev: None,
            tnext: *head,
            sprev: None,
            snext: sector_head,
        });
        if let Some(h) = *head {
            if let Some(n) = self.get_mut(h) {
                n.tprev = Some(id);
            }
        }
        if let Some(h) = sector_head {
            if let Some(n) = self.get_mut(h) {
                n.sprev = Some(id);
            }
        }
        *head = Some(id);
        self.sector_heads[sector] = Some(id);
    }

    /// Unlink a node from both threads and free it. Returns the next node
    /// on the thing's thread.
    fn delete_node(&mut self, id: SecNodeId, head: &mut Option<SecNodeId>) -> Option<SecNodeId> {
        let Some(node) = self.get(id) else {
            return None;
        };
        let (sector, tprev, tnext, sprev, snext) =
            (node.sector, node.tprev, node.tnext, node.sprev, node.snext);

        match tprev {
            Some(p) => {
                if let Some(n) = self.get_mut(p) {
                    n.tnext = tnext;
                }
            }
            None => *head = tnext,
        }
        if let Some(nx) = tnext {
            if let Some(n) = self.get_mut(nx) {
                n.tprev = tprev;
            }
        }

        match sprev {
            Some(p) => {
                if let Some(n) = self.get_mut(p) {
                    n.snext = snext;
                }
            }
            None => self.sector_heads[sector] = snext,
        }
        if let Some(nx) = snext {
            if let Some(n) = self.get_mut(nx) {
                n.sprev = sprev;
            }
        }

        self.release(id);
        tnext
    }

    /// Make the thread starting at `head` hold exactly one node per sector
    /// in `sectors`. Nodes that survive are re-confirmed in place.
    pub fn relink(&mut self, thing: MobjId, head: &mut Option<SecNodeId>, sectors: &[SectorId]) {
        let mut cur = *head;
        while let Some(id) = cur {
            let Some(node) = self.get_mut(id) else { break };
            node.visited = false;
            cur = node.tnext;
        }

        for &s in sectors {
            if s < self.sector_heads.len() {
                self.add_node(s, thing, head);
            }
        }

        let mut cur = *head;
        while let Some(id) = cur {
            let Some(node) = self.get(id) else { break };
            if node.visited {
                cur = node.tnext;
            } else {
                cur = self.delete_node(id, head);
            }
        }
    }

    /// Delete every node on the thread.
    pub fn remove_all(&mut self, head: &mut Option<SecNodeId>) {
        let mut cur = *head;
        while let Some(id) = cur {
            cur = self.delete_node(id, head);
        }
        *head = None;
    }

    /// Sectors on a thing's thread, most recently added first.
    pub fn thing_sectors(&self, head: Option<SecNodeId>) -> Vec<SectorId> {
        let mut out = Vec::new();
        let mut cur = head;
        while let Some(id) = cur {
            let Some(node) = self.get(id) else { break };
            out.push(node.sector);
            cur = node.tnext;
        }
        out
    }

    /// Things on a sector's thread, head first.
    pub fn sector_things(&self, sector: SectorId) -> Vec<MobjId> {
        let mut out = Vec::new();
        let mut cur = self.sector_head(sector);
        while let Some(id) = cur {
            let Some(node) = self.get(id) else { break };
            out.push(node.thing);
            cur = node.snext;
        }
        out
    }

    /// Clear `visited` on every node of the sector's thread.
    pub fn clear_sector_visited(&mut self, sector: SectorId) {
        let mut cur = self.sector_head(sector);
        while let Some(id) = cur {
            let Some(node) = self.get_mut(id) else { break };
            node.visited = false;
            cur = node.snext;
        }
    }

    /// Scan the sector's thread from its head for the first unvisited
    /// node, mark it and return its thing. Starting over from the head
    /// every call keeps the scan valid while the thread is edited.
    pub fn next_unvisited(&mut self, sector: SectorId) -> Option<MobjId> {
        let mut cur = self.sector_head(sector);
        while let Some(id) = cur {
            let node = self.get_mut(id)?;
            if !node.visited {
                node.visited = true;
                return Some(node.thing);
            }
            cur = node.snext;
        }
        None
    }
}

/// Sectors a box of `radius` around (x, y) overlaps: both sides of every
/// line crossing the box, plus the sector containing the center.
pub fn sectors_touching(
    level: &Level,
    blockmap: &Blockmap,
    locator: &dyn PointLocator,
    x: f32,
    y: f32,
    radius: f32,
) -> Vec<SectorId> {
    let bbox = Bounds2::around(x, y, radius);
    let mut out: Vec<SectorId> = Vec::new();
    let mut seen: HashSet<LineId> = HashSet::new();

    if let Some(range) = blockmap.cell_range(&bbox.expanded(MAXRADIUS)) {
        for (cx, cy) in range.cells() {
            for &l in blockmap.lines_in(cx, cy) {
                if !seen.insert(l) {
                    continue;
                }
                let ld = &level.lines[l];
                if !bbox.overlaps(&ld.bbox) {
                    continue;
                }
                if box_on_line_side(&bbox, ld).is_some() {
                    continue;
                }
                if !out.contains(&ld.front) {
                    out.push(ld.front);
                }
                if let Some(back) = ld.back {
                    if back != ld.front && !out.contains(&back) {
                        out.push(back);
                    }
                }
            }
        }
    }

    let own = locator.sector_at(x, y);
    if !out.contains(&own) {
        out.push(own);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::SubsectorId;
    use crate::level_builder::{sector, LevelBuilder};

    fn id(n: u32) -> MobjId {
        MobjId { index: n, generation: 0 }
    }

    // =========================================================================
    // Arena and threads
    // =========================================================================

    #[test]
    fn relink_creates_one_node_per_sector() {
        let mut occ = Occupancy::new(3);
        let mut head = None;
        occ.relink(id(1), &mut head, &[0, 1, 1]);
        assert_eq!(occ.len(), 2);
        let mut s = occ.thing_sectors(head);
        s.sort();
        assert_eq!(s, vec![0, 1]);
        assert_eq!(occ.sector_things(0), vec![id(1)]);
        assert_eq!(occ.sector_things(1), vec![id(1)]);
        assert!(occ.sector_things(2).is_empty());
    }

    #[test]
    fn relink_keeps_surviving_nodes_in_place() {
        let mut occ = Occupancy::new(3);
        let mut head = None;
        occ.relink(id(1), &mut head, &[0, 1]);
        let before = occ.sector_head(1);
        occ.relink(id(1), &mut head, &[1, 2]);
        assert_eq!(occ.sector_head(1), before);
        assert_eq!(occ.len(), 2);
        assert!(occ.sector_things(0).is_empty());
        assert_eq!(occ.sector_things(2), vec![id(1)]);
    }

    #[test]
    fn freed_nodes_are_recycled() {
        let mut occ = Occupancy::new(4);
        let mut head = None;
        occ.relink(id(1), &mut head, &[0, 1, 2, 3]);
        assert_eq!(occ.capacity(), 4);
        for _ in 0..10 {
            occ.relink(id(1), &mut head, &[0]);
            occ.relink(id(1), &mut head, &[1, 2, 3]);
        }
        assert_eq!(occ.capacity(), 4);
        assert_eq!(occ.len(), 3);
    }

    #[test]
    fn remove_all_clears_sector_threads() {
        let mut occ = Occupancy::new(2);
        let mut a = None;
        let mut b = None;
        occ.relink(id(1), &mut a, &[0, 1]);
        occ.relink(id(2), &mut b, &[0]);
        occ.remove_all(&mut a);
        assert!(a.is_none());
        assert_eq!(occ.sector_things(0), vec![id(2)]);
        assert!(occ.sector_things(1).is_empty());
        assert_eq!(occ.len(), 1);
    }

    #[test]
    fn stale_node_id_does_not_resolve() {
        let mut occ = Occupancy::new(1);
        let mut head = None;
        occ.relink(id(1), &mut head, &[0]);
        let old = head.unwrap();
        occ.remove_all(&mut head);
        let mut head2 = None;
        occ.relink(id(2), &mut head2, &[0]);
        assert!(occ.get(old).is_none());
        assert_eq!(occ.get(head2.unwrap()).map(|n| n.thing), Some(id(2)));
    }

    #[test]
    fn unvisited_scan_survives_removal() {
        let mut occ = Occupancy::new(1);
        let mut heads = [None, None, None];
        for (i, h) in heads.iter_mut().enumerate() {
            occ.relink(id(i as u32), h, &[0]);
        }
        occ.clear_sector_visited(0);
        let mut seen = Vec::new();
        while let Some(t) = occ.next_unvisited(0) {
            seen.push(t);
            // the first thing processed removes itself
            if t == id(2) {
                occ.remove_all(&mut heads[2]);
            }
        }
        seen.sort();
        assert_eq!(seen, vec![id(0), id(1), id(2)]);
    }

    // =========================================================================
    // Sector enumeration
    // =========================================================================

    struct FixedLocator(SectorId);

    impl PointLocator for FixedLocator {
        fn point_in_subsector(&self, _x: f32, _y: f32) -> SubsectorId {
            0
        }

        fn subsector_sector(&self, _ss: SubsectorId) -> SectorId {
            self.0
        }
    }

    #[test]
    fn box_across_boundary_touches_both_sectors() {
        let level = LevelBuilder::new()
            .room(128.0, sector(0.0, 128.0))
            .room(128.0, sector(0.0, 128.0))
            .build()
            .unwrap();
        let bm = Blockmap::build(&level);
        let mut s = sectors_touching(&level, &bm, &level, 120.0, 64.0, 16.0);
        s.sort();
        assert_eq!(s, vec![0, 1]);
        let s = sectors_touching(&level, &bm, &level, 40.0, 64.0, 16.0);
        assert_eq!(s, vec![0]);
    }

    #[test]
    fn containing_sector_comes_from_locator() {
        let level = LevelBuilder::new()
            .room(128.0, sector(0.0, 128.0))
            .room(128.0, sector(0.0, 128.0))
            .build()
            .unwrap();
        let bm = Blockmap::build(&level);
        let s = sectors_touching(&level, &bm, &FixedLocator(1), 40.0, 64.0, 16.0);
        assert_eq!(s, vec![1]);
    }
}
