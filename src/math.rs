// Copyright © 2018 Cormac O'Brien
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Planes, bounds and the tolerances used throughout the compile.

use cgmath::{InnerSpace, Vector3};

/// Positional tolerance for vertex identity (1/128 unit).
pub const POINT_EPSILON: f64 = 0.0078125;

/// Component tolerance for direction vectors.
pub const EQUAL_EPSILON: f64 = 0.001;

/// Tolerance for scalar parameters along an edge.
pub const T_EPSILON: f64 = 0.01;

/// Deviation of an edge-to-edge dot product from 1.0 that counts as a
/// corner.
pub const ANGLE_EPSILON: f64 = 0.00001;

/// Snap-to-integer threshold for emitted vertex components.
pub const ZERO_EPSILON: f64 = 0.001;

/// Side classification tolerance when clipping windings.
pub const ON_EPSILON: f64 = 0.05;

/// Per-component normal tolerance for plane identity.
pub const NORMAL_EPSILON: f64 = 0.000001;

/// Distance tolerance for plane identity.
pub const DIST_EPSILON: f64 = 0.001;

/// Which side of its plane a face looks out from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PlaneSide {
    Front = 0,
    Back = 1,
}

/// Axis classification of a plane, used by renderers to skip the full dot
/// product on axial planes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PlaneKind {
    X = 0,
    Y = 1,
    Z = 2,
    AnyX = 3,
    AnyY = 4,
    AnyZ = 5,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub dist: f64,
}

impl Plane {
    pub fn new(normal: Vector3<f64>, dist: f64) -> Plane {
        Plane { normal, dist }
    }

    /// Signed distance from `point` to the plane.
    pub fn distance_to(&self, point: Vector3<f64>) -> f64 {
        self.normal.dot(point) - self.dist
    }

    pub fn kind(&self) -> PlaneKind {
        for (i, kind) in [PlaneKind::X, PlaneKind::Y, PlaneKind::Z]
            .iter()
            .enumerate()
        {
            if self.normal[i] == 1.0 {
                return *kind;
            }
        }

        match dominant_axis(self.normal) {
            0 => PlaneKind::AnyX,
            1 => PlaneKind::AnyY,
            _ => PlaneKind::AnyZ,
        }
    }

    /// The canonical orientation of this plane: axial normals are snapped
    /// exact, and the leading (or dominant) normal component is positive.
    /// Returns `PlaneSide::Back` if the plane had to be flipped.
    pub fn canonical(&self) -> (Plane, PlaneSide) {
        for i in 0..3 {
            if (self.normal[i] - 1.0).abs() < NORMAL_EPSILON {
                return (Plane::new(axis_unit(i), self.dist), PlaneSide::Front);
            }

            if (self.normal[i] + 1.0).abs() < NORMAL_EPSILON {
                return (Plane::new(axis_unit(i), -self.dist), PlaneSide::Back);
            }
        }

        if self.normal[dominant_axis(self.normal)] < 0.0 {
            (Plane::new(-self.normal, -self.dist), PlaneSide::Back)
        } else {
            (self.clone(), PlaneSide::Front)
        }
    }

    /// Plane identity within `NORMAL_EPSILON`/`DIST_EPSILON`.
    pub fn matches(&self, other: &Plane) -> bool {
        (self.normal.x - other.normal.x).abs() < NORMAL_EPSILON
            && (self.normal.y - other.normal.y).abs() < NORMAL_EPSILON
            && (self.normal.z - other.normal.z).abs() < NORMAL_EPSILON
            && (self.dist - other.dist).abs() < DIST_EPSILON
    }
}

fn axis_unit(axis: usize) -> Vector3<f64> {
    let mut v = Vector3::new(0.0, 0.0, 0.0);
    v[axis] = 1.0;
    v
}

fn dominant_axis(v: Vector3<f64>) -> usize {
    let (ax, ay, az) = (v.x.abs(), v.y.abs(), v.z.abs());
    if ax >= ay && ax >= az {
        0
    } else if ay >= ax && ay >= az {
        1
    } else {
        2
    }
}

/// An axis-aligned bounding box.
#[derive(Copy, Clone, Debug)]
pub struct Bounds {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

impl Bounds {
    pub fn empty() -> Bounds {
        Bounds {
            min: Vector3::new(std::f64::MAX, std::f64::MAX, std::f64::MAX),
            max: Vector3::new(-std::f64::MAX, -std::f64::MAX, -std::f64::MAX),
        }
    }

    pub fn add_point(&mut self, point: Vector3<f64>) {
        for i in 0..3 {
            if point[i] < self.min[i] {
                self.min[i] = point[i];
            }
            if point[i] > self.max[i] {
                self.max[i] = point[i];
            }
        }
    }

    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_canonical_axial_flip() {
        let plane = Plane::new(Vector3::new(0.0, 0.0, -1.0), 5.0);
        let (canon, side) = plane.canonical();
        assert_eq!(canon.normal, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(canon.dist, -5.0);
        assert_eq!(side, PlaneSide::Back);
        assert_eq!(canon.kind(), PlaneKind::Z);
    }

    #[test]
    fn test_canonical_axial_snap() {
        let plane = Plane::new(Vector3::new(1.0 - 1.0e-7, 0.0, 1.0e-7), 12.0);
        let (canon, side) = plane.canonical();
        assert_eq!(canon.normal, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(side, PlaneSide::Front);
    }

    #[test]
    fn test_canonical_dominant_axis() {
        let plane = Plane::new(Vector3::new(0.6, -0.8, 0.0), 3.0);
        let (canon, side) = plane.canonical();
        assert_eq!(canon.normal, Vector3::new(-0.6, 0.8, 0.0));
        assert_eq!(canon.dist, -3.0);
        assert_eq!(side, PlaneSide::Back);
        assert_eq!(canon.kind(), PlaneKind::AnyY);
    }

    #[test]
    fn test_plane_matches_within_tolerance() {
        let a = Plane::new(Vector3::new(1.0, 0.0, 0.0), 64.0);
        let b = Plane::new(Vector3::new(1.0, 0.0, 0.0), 64.0 + DIST_EPSILON / 2.0);
        let c = Plane::new(Vector3::new(1.0, 0.0, 0.0), 65.0);
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn test_bounds_add_point() {
        let mut bounds = Bounds::empty();
        bounds.add_point(Vector3::new(-16.0, 4.0, 9.0));
        bounds.add_point(Vector3::new(8.0, -2.0, 1.0));
        assert_eq!(bounds.min, Vector3::new(-16.0, -2.0, 1.0));
        assert_eq!(bounds.max, Vector3::new(8.0, 4.0, 9.0));
        assert_eq!(bounds.size(), Vector3::new(24.0, 6.0, 8.0));
    }
}
