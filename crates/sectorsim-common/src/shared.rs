// shared.rs -- foundational types and functions shared by all modules
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.

// ============================================================
// Basic types
// ============================================================

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];

pub const PI: f32 = std::f32::consts::PI;

// ============================================================
// Console variable flags
// ============================================================

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CvarFlags: i32 {
        /// user-facing setting
        const ARCHIVE = 1;
        /// read once when a world is set up
        const LATCH   = 16;
    }
}

pub const CVAR_ZERO: CvarFlags = CvarFlags::empty();
pub const CVAR_ARCHIVE: CvarFlags = CvarFlags::ARCHIVE;
pub const CVAR_LATCH: CvarFlags = CvarFlags::LATCH;

// ============================================================
// MATHLIB -- planar helpers (the world is 2D for collision purposes)
// ============================================================

/// Cheap distance estimate: the larger axis delta plus half the smaller.
pub fn approx_distance(dx: f32, dy: f32) -> f32 {
    let dx = dx.abs();
    let dy = dy.abs();
    if dx < dy {
        dx + dy - dx / 2.0
    } else {
        dx + dy - dy / 2.0
    }
}

/// Unit vector for a planar angle in radians.
pub fn angle_to_vector2(angle: f32) -> Vec2 {
    [angle.cos(), angle.sin()]
}

/// Angle of (dx, dy), normalized to [0, 2pi).
pub fn point_to_angle(dx: f32, dy: f32) -> f32 {
    let a = dy.atan2(dx);
    if a < 0.0 {
        a + 2.0 * PI
    } else {
        a
    }
}

// ============================================================
// Axis-aligned 2D bounds
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2 {
    pub mins: Vec2,
    pub maxs: Vec2,
}

impl Default for Bounds2 {
    fn default() -> Self {
        Self::cleared()
    }
}

impl Bounds2 {
    /// Inverted bounds that any added point will replace.
    pub fn cleared() -> Self {
        Self {
            mins: [f32::MAX, f32::MAX],
            maxs: [f32::MIN, f32::MIN],
        }
    }

    /// Square box of half-size `radius` around (x, y).
    pub fn around(x: f32, y: f32, radius: f32) -> Self {
        Self {
            mins: [x - radius, y - radius],
            maxs: [x + radius, y + radius],
        }
    }

    pub fn add_point(&mut self, x: f32, y: f32) {
        if x < self.mins[0] {
            self.mins[0] = x;
        }
        if x > self.maxs[0] {
            self.maxs[0] = x;
        }
        if y < self.mins[1] {
            self.mins[1] = y;
        }
        if y > self.maxs[1] {
            self.maxs[1] = y;
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.mins[0] > self.maxs[0] || self.mins[1] > self.maxs[1]
    }

    /// Strict overlap: boxes that only share an edge do not touch.
    pub fn overlaps(&self, other: &Bounds2) -> bool {
        self.maxs[0] > other.mins[0]
            && self.mins[0] < other.maxs[0]
            && self.maxs[1] > other.mins[1]
            && self.mins[1] < other.maxs[1]
    }

    pub fn expanded(&self, amount: f32) -> Self {
        Self {
            mins: [self.mins[0] - amount, self.mins[1] - amount],
            maxs: [self.maxs[0] + amount, self.maxs[1] + amount],
        }
    }
}
