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

//! Convex polygon windings.

use cgmath::{InnerSpace, Vector3};

use crate::math::{Bounds, Plane, ON_EPSILON};

#[derive(Copy, Clone, PartialEq)]
enum Side {
    Front,
    Back,
    On,
}

/// An ordered, convex sequence of points on a plane.
///
/// An empty winding marks a face that was clipped away entirely; such faces
/// are dropped when their tree is torn down.
#[derive(Clone, Debug, PartialEq)]
pub struct Winding {
    pub points: Vec<Vector3<f64>>,
}

impl Winding {
    pub fn new(points: Vec<Vector3<f64>>) -> Winding {
        Winding { points }
    }

    pub fn empty() -> Winding {
        Winding { points: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn area(&self) -> f64 {
        let mut total = 0.0;
        for i in 2..self.points.len() {
            let d1 = self.points[i - 1] - self.points[0];
            let d2 = self.points[i] - self.points[0];
            total += 0.5 * d1.cross(d2).magnitude();
        }
        total
    }

    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::empty();
        for point in &self.points {
            bounds.add_point(*point);
        }
        bounds
    }

    /// Clips the winding against `plane`, returning the piece in front of
    /// it and the piece behind it. A winding entirely on one side comes
    /// back whole on that side and `None` on the other.
    pub fn split(&self, plane: &Plane) -> (Option<Winding>, Option<Winding>) {
        let count = self.points.len();
        let mut dists = Vec::with_capacity(count + 1);
        let mut sides = Vec::with_capacity(count + 1);
        let mut front_count = 0;
        let mut back_count = 0;

        for point in &self.points {
            let dist = plane.distance_to(*point);
            let side = if dist > ON_EPSILON {
                front_count += 1;
                Side::Front
            } else if dist < -ON_EPSILON {
                back_count += 1;
                Side::Back
            } else {
                Side::On
            };
            dists.push(dist);
            sides.push(side);
        }
        dists.push(dists[0]);
        sides.push(sides[0]);

        if front_count == 0 {
            return (None, Some(self.clone()));
        }
        if back_count == 0 {
            return (Some(self.clone()), None);
        }

        let mut front = Vec::new();
        let mut back = Vec::new();

        for i in 0..count {
            let p1 = self.points[i];

            match sides[i] {
                Side::On => {
                    front.push(p1);
                    back.push(p1);
                    continue;
                }
                Side::Front => front.push(p1),
                Side::Back => back.push(p1),
            }

            if sides[i + 1] == Side::On || sides[i + 1] == sides[i] {
                continue;
            }

            // generate a split point
            let p2 = self.points[(i + 1) % count];
            let dot = dists[i] / (dists[i] - dists[i + 1]);
            let mut mid = Vector3::new(0.0, 0.0, 0.0);
            for j in 0..3 {
                // avoid round-off error when possible
                if plane.normal[j] == 1.0 {
                    mid[j] = plane.dist;
                } else if plane.normal[j] == -1.0 {
                    mid[j] = -plane.dist;
                } else {
                    mid[j] = p1[j] + dot * (p2[j] - p1[j]);
                }
            }

            front.push(mid);
            back.push(mid);
        }

        (Some(Winding::new(front)), Some(Winding::new(back)))
    }
}
