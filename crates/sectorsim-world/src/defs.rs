// defs.rs -- flags, limits and index types shared by the world modules
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.

// ============================================================
// Index types
// ============================================================

pub type LineId = usize;
pub type SectorId = usize;
pub type SubsectorId = usize;
pub type SegId = usize;
pub type NodeId = usize;

// ============================================================
// Limits
// ============================================================

/// Largest radius of any entity; entities are filed only under the cell of
/// their center, so box queries pad by this much.
pub const MAXRADIUS: f32 = 32.0;

/// Blockmap cell edge length.
pub const MAPBLOCKSIZE: f32 = 128.0;

/// Extra space left around the level bounds when the blockmap is built.
pub const BLOCKMAP_MARGIN: f32 = 8.0;

pub const MAXSTEP: f32 = 24.0;
pub const MAXDROPOFF: f32 = 24.0;
pub const SLIDEBUMPS: u32 = 3;
pub const USERANGE: f32 = 64.0;
pub const MELEERANGE: f32 = 64.0;
pub const MISSILERANGE: f32 = 2048.0;

/// Traces shorter than this on both axes use the line-side test instead of
/// the divline test.
pub const SHORT_TRACE: f32 = 16.0;

/// Fraction subtracted from the nearest slide hit so the mover stops short.
pub const SLIDE_FUDGE: f32 = 1.0 / 32.0;

/// How far below the toucher's feet an item can still be picked up.
pub const PICKUP_REACH_BELOW: f32 = 8.0;

pub const TELEFRAG_DAMAGE: i32 = 10000;
pub const CRUSH_DAMAGE: i32 = 10;

/// Vertical aim window, as a slope.
pub const AIM_SLOPE: f32 = 100.0 / 160.0;

/// Shots start this far above the shooter's midpoint.
pub const SHOOT_HEIGHT_OFFSET: f32 = 8.0;

pub const PUFF_BACKOFF: f32 = 4.0;
pub const BLOOD_BACKOFF: f32 = 10.0;

// ============================================================
// Entity flags
// ============================================================

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MobjFlags: u32 {
        /// touchable item
        const SPECIAL     = 0x00000001;
        const SOLID       = 0x00000002;
        const SHOOTABLE   = 0x00000004;
        /// not linked into a sector's center chain
        const NOSECTOR    = 0x00000008;
        /// not linked into the blockmap
        const NOBLOCKMAP  = 0x00000010;
        /// may collect specials
        const PICKUP      = 0x00000020;
        const NOCLIP      = 0x00000040;
        const FLOAT       = 0x00000080;
        const TELEPORT    = 0x00000100;
        const MISSILE     = 0x00000200;
        /// may walk off ledges
        const DROPOFF     = 0x00000400;
        /// removed when crushed
        const DROPPED     = 0x00000800;
        const NOBLOOD     = 0x00001000;
        const CORPSE      = 0x00002000;
        const NOGRAVITY   = 0x00004000;
        /// charging attack
        const SKULLFLY    = 0x00008000;
        const NORADIUSDMG = 0x00010000;
    }
}
pub const MF_SPECIAL: MobjFlags = MobjFlags::SPECIAL;
pub const MF_SOLID: MobjFlags = MobjFlags::SOLID;
pub const MF_SHOOTABLE: MobjFlags = MobjFlags::SHOOTABLE;
pub const MF_NOSECTOR: MobjFlags = MobjFlags::NOSECTOR;
pub const MF_NOBLOCKMAP: MobjFlags = MobjFlags::NOBLOCKMAP;
pub const MF_PICKUP: MobjFlags = MobjFlags::PICKUP;
pub const MF_NOCLIP: MobjFlags = MobjFlags::NOCLIP;
pub const MF_FLOAT: MobjFlags = MobjFlags::FLOAT;
pub const MF_TELEPORT: MobjFlags = MobjFlags::TELEPORT;
pub const MF_MISSILE: MobjFlags = MobjFlags::MISSILE;
pub const MF_DROPOFF: MobjFlags = MobjFlags::DROPOFF;
pub const MF_DROPPED: MobjFlags = MobjFlags::DROPPED;
pub const MF_NOBLOOD: MobjFlags = MobjFlags::NOBLOOD;
pub const MF_CORPSE: MobjFlags = MobjFlags::CORPSE;
pub const MF_NOGRAVITY: MobjFlags = MobjFlags::NOGRAVITY;
pub const MF_SKULLFLY: MobjFlags = MobjFlags::SKULLFLY;
pub const MF_NORADIUSDMG: MobjFlags = MobjFlags::NORADIUSDMG;

// ============================================================
// Line flags
// ============================================================

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LineFlags: u16 {
        /// blocks everything but missiles
        const BLOCKING       = 0x0001;
        /// blocks non-player walkers
        const BLOCK_MONSTERS = 0x0002;
        const TWO_SIDED      = 0x0004;
    }
}
pub const ML_BLOCKING: LineFlags = LineFlags::BLOCKING;
pub const ML_BLOCKMONSTERS: LineFlags = LineFlags::BLOCK_MONSTERS;
pub const ML_TWOSIDED: LineFlags = LineFlags::TWO_SIDED;

// ============================================================
// Path traversal flags
// ============================================================

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TraverseFlags: u8 {
        const ADD_LINES  = 0x01;
        const ADD_THINGS = 0x02;
        /// stop collecting at the first one-sided line
        const EARLY_OUT  = 0x04;
    }
}
pub const PT_ADDLINES: TraverseFlags = TraverseFlags::ADD_LINES;
pub const PT_ADDTHINGS: TraverseFlags = TraverseFlags::ADD_THINGS;
pub const PT_EARLYOUT: TraverseFlags = TraverseFlags::EARLY_OUT;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobj_flags_are_distinct_bits() {
        let all = [
            MF_SPECIAL, MF_SOLID, MF_SHOOTABLE, MF_NOSECTOR, MF_NOBLOCKMAP, MF_PICKUP,
            MF_NOCLIP, MF_FLOAT, MF_TELEPORT, MF_MISSILE, MF_DROPOFF, MF_DROPPED,
            MF_NOBLOOD, MF_CORPSE, MF_NOGRAVITY, MF_SKULLFLY, MF_NORADIUSDMG,
        ];
        let mut acc = MobjFlags::empty();
        for f in all {
            assert_eq!(f.bits().count_ones(), 1);
            assert!(!acc.intersects(f));
            acc |= f;
        }
        assert_eq!(acc, MobjFlags::all());
    }

    #[test]
    fn traverse_flags_combine() {
        let f = PT_ADDLINES | PT_ADDTHINGS;
        assert!(f.contains(TraverseFlags::ADD_LINES));
        assert!(!f.contains(PT_EARLYOUT));
    }
}
