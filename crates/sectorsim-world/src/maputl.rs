// maputl.rs -- line side tests, openings and intercept math
//
// Copyright (C) 1997-2001 Id Software, Inc.
// Licensed under the GNU General Public License v2 or later.

use sectorsim_common::shared::Bounds2;

use crate::level::{Level, Line, SlopeType};
use crate::defs::LineId;

/// A partition or trace line: origin plus delta.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DivLine {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

impl DivLine {
    pub fn new(x: f32, y: f32, dx: f32, dy: f32) -> Self {
        Self { x, y, dx, dy }
    }

    pub fn from_line(line: &Line) -> Self {
        Self {
            x: line.v1[0],
            y: line.v1[1],
            dx: line.dx,
            dy: line.dy,
        }
    }

    pub fn between(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            dx: x2 - x1,
            dy: y2 - y1,
        }
    }

    /// Point at fraction `frac` along the line.
    pub fn point_at(&self, frac: f32) -> [f32; 2] {
        [self.x + self.dx * frac, self.y + self.dy * frac]
    }
}

/// 0 = front, 1 = back.
pub fn point_on_line_side(x: f32, y: f32, line: &Line) -> usize {
    if line.dx == 0.0 {
        if x <= line.v1[0] {
            return (line.dy > 0.0) as usize;
        }
        return (line.dy < 0.0) as usize;
    }
    if line.dy == 0.0 {
        if y <= line.v1[1] {
            return (line.dx < 0.0) as usize;
        }
        return (line.dx > 0.0) as usize;
    }

    let dx = x - line.v1[0];
    let dy = y - line.v1[1];
    let left = line.dy * dx;
    let right = dy * line.dx;

    if right < left {
        0
    } else {
        1
    }
}

/// Which side of the line the whole box is on, or None if the line
/// crosses it.
pub fn box_on_line_side(bbox: &Bounds2, line: &Line) -> Option<usize> {
    let (p1, p2) = match line.slope_type {
        SlopeType::Horizontal => {
            let mut p1 = (bbox.maxs[1] > line.v1[1]) as usize;
            let mut p2 = (bbox.mins[1] > line.v1[1]) as usize;
            if line.dx < 0.0 {
                p1 ^= 1;
                p2 ^= 1;
            }
            (p1, p2)
        }
        SlopeType::Vertical => {
            let mut p1 = (bbox.maxs[0] < line.v1[0]) as usize;
            let mut p2 = (bbox.mins[0] < line.v1[0]) as usize;
            if line.dy < 0.0 {
                p1 ^= 1;
                p2 ^= 1;
            }
            (p1, p2)
        }
        SlopeType::Positive => (
            point_on_line_side(bbox.mins[0], bbox.maxs[1], line),
            point_on_line_side(bbox.maxs[0], bbox.mins[1], line),
        ),
        SlopeType::Negative => (
            point_on_line_side(bbox.maxs[0], bbox.maxs[1], line),
            point_on_line_side(bbox.mins[0], bbox.mins[1], line),
        ),
    };

    if p1 == p2 {
        Some(p1)
    } else {
        None
    }
}

/// 0 = front, 1 = back.
pub fn point_on_divline_side(x: f32, y: f32, line: &DivLine) -> usize {
    if line.dx == 0.0 {
        if x <= line.x {
            return (line.dy > 0.0) as usize;
        }
        return (line.dy < 0.0) as usize;
    }
    if line.dy == 0.0 {
        if y <= line.y {
            return (line.dx < 0.0) as usize;
        }
        return (line.dx > 0.0) as usize;
    }

    let dx = x - line.x;
    let dy = y - line.y;
    let left = line.dy * dx;
    let right = dy * line.dx;

    if right < left {
        0
    } else {
        1
    }
}

/// Like point_on_divline_side, but 2 when the point is on the line.
pub fn divline_side(x: f32, y: f32, node: &DivLine) -> usize {
    if node.dx == 0.0 {
        if x == node.x {
            return 2;
        }
        if x <= node.x {
            return (node.dy > 0.0) as usize;
        }
        return (node.dy < 0.0) as usize;
    }
    if node.dy == 0.0 {
        if y == node.y {
            return 2;
        }
        if y <= node.y {
            return (node.dx < 0.0) as usize;
        }
        return (node.dx > 0.0) as usize;
    }

    let dx = x - node.x;
    let dy = y - node.y;
    let left = node.dy * dx;
    let right = dy * node.dx;

    if right < left {
        0
    } else if left == right {
        2
    } else {
        1
    }
}

/// Fractional intercept point along `v2` where `v1` crosses it. Returns 0
/// for parallel lines.
pub fn intercept_vector(v2: &DivLine, v1: &DivLine) -> f32 {
    let den = v1.dy * v2.dx - v1.dx * v2.dy;
    if den == 0.0 {
        return 0.0;
    }
    let num = (v1.x - v2.x) * v1.dy + (v2.y - v1.y) * v1.dx;
    num / den
}

/// Vertical gap through a two-sided line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Opening {
    pub top: f32,
    pub bottom: f32,
    pub range: f32,
    /// lower of the two floors
    pub lowfloor: f32,
}

impl Opening {
    pub const CLOSED: Opening = Opening {
        top: 0.0,
        bottom: 0.0,
        range: 0.0,
        lowfloor: 0.0,
    };
}

pub fn line_opening(level: &Level, line: LineId) -> Opening {
    let ld = &level.lines[line];
    let Some(back) = ld.back else {
        return Opening::CLOSED;
    };
    let front = &level.sectors[ld.front];
    let back = &level.sectors[back];

    let top = front.ceiling_height.min(back.ceiling_height);
    let (bottom, lowfloor) = if front.floor_height > back.floor_height {
        (front.floor_height, back.floor_height)
    } else {
        (back.floor_height, front.floor_height)
    };

    Opening {
        top,
        bottom,
        range: top - bottom,
        lowfloor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::LineFlags;

    fn line(v1: [f32; 2], v2: [f32; 2]) -> Line {
        let dx = v2[0] - v1[0];
        let dy = v2[1] - v1[1];
        let mut bbox = Bounds2::cleared();
        bbox.add_point(v1[0], v1[1]);
        bbox.add_point(v2[0], v2[1]);
        let slope_type = if dx == 0.0 {
            SlopeType::Vertical
        } else if dy == 0.0 {
            SlopeType::Horizontal
        } else if dy / dx > 0.0 {
            SlopeType::Positive
        } else {
            SlopeType::Negative
        };
        Line {
            v1,
            v2,
            dx,
            dy,
            bbox,
            slope_type,
            flags: LineFlags::empty(),
            special: 0,
            tag: 0,
            front: 0,
            back: None,
        }
    }

    // =========================================================================
    // Side tests
    // =========================================================================

    #[test]
    fn front_is_right_of_direction() {
        // line pointing up: right side (x > 0) is the front
        let l = line([0.0, 0.0], [0.0, 64.0]);
        assert_eq!(point_on_line_side(10.0, 32.0, &l), 0);
        assert_eq!(point_on_line_side(-10.0, 32.0, &l), 1);

        let diag = line([0.0, 0.0], [64.0, 64.0]);
        assert_eq!(point_on_line_side(40.0, 10.0, &diag), 0);
        assert_eq!(point_on_line_side(10.0, 40.0, &diag), 1);
    }

    #[test]
    fn divline_side_agrees_with_line_side() {
        let l = line([0.0, 0.0], [64.0, 32.0]);
        let d = DivLine::from_line(&l);
        for p in [[10.0, 40.0], [50.0, -5.0], [-20.0, 3.0], [100.0, 90.0]] {
            assert_eq!(
                point_on_line_side(p[0], p[1], &l),
                point_on_divline_side(p[0], p[1], &d)
            );
        }
    }

    #[test]
    fn divline_side_reports_on() {
        let d = DivLine::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(divline_side(5.0, 5.0, &d), 2);
        assert_eq!(divline_side(5.0, 0.0, &d), 0);
        assert_eq!(divline_side(0.0, 5.0, &d), 1);
        let v = DivLine::new(3.0, 0.0, 0.0, 1.0);
        assert_eq!(divline_side(3.0, 9.0, &v), 2);
    }

    #[test]
    fn box_side_by_slope_type() {
        let h = line([64.0, 0.0], [0.0, 0.0]);
        assert_eq!(box_on_line_side(&Bounds2::around(32.0, 20.0, 8.0), &h), Some(0));
        assert_eq!(box_on_line_side(&Bounds2::around(32.0, -20.0, 8.0), &h), Some(1));
        assert_eq!(box_on_line_side(&Bounds2::around(32.0, 4.0, 8.0), &h), None);

        let pos = line([0.0, 0.0], [64.0, 64.0]);
        assert_eq!(box_on_line_side(&Bounds2::around(48.0, 8.0, 4.0), &pos), Some(0));
        assert_eq!(box_on_line_side(&Bounds2::around(32.0, 32.0, 4.0), &pos), None);

        let neg = line([0.0, 64.0], [64.0, 0.0]);
        assert_eq!(box_on_line_side(&Bounds2::around(8.0, 8.0, 4.0), &neg), Some(0));
        assert_eq!(box_on_line_side(&Bounds2::around(60.0, 60.0, 4.0), &neg), Some(1));
    }

    // =========================================================================
    // Intercepts
    // =========================================================================

    #[test]
    fn intercept_at_midpoint() {
        let trace = DivLine::new(0.0, 0.0, 10.0, 0.0);
        let wall = DivLine::new(5.0, -1.0, 0.0, 2.0);
        assert!((intercept_vector(&trace, &wall) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn intercept_parallel_is_zero() {
        let a = DivLine::new(0.0, 0.0, 10.0, 0.0);
        let b = DivLine::new(0.0, 5.0, 3.0, 0.0);
        assert_eq!(intercept_vector(&a, &b), 0.0);
    }

    #[test]
    fn point_at_fraction() {
        let d = DivLine::between(0.0, 0.0, 100.0, -50.0);
        assert_eq!(d.point_at(0.5), [50.0, -25.0]);
    }
}
