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

//! BSP surface compilation for brush-based levels.
//!
//! This crate is the middle of a map compiler: upstream code parses a map
//! source into convex brushes and clips them against each other, a tree
//! builder partitions the resulting faces, and the modules here turn the
//! partitioned faces of one entity into the flat tables a renderer loads:
//! deduplicated vertices, directed edges shared between neighbouring faces,
//! signed surfedge indices and face records.
//!
//! The pipeline over one entity runs leaves-first:
//!
//! 1. `subdivide` carves faces too wide for a single lightmap block into
//!    chains of smaller pieces.
//! 2. `surfaces` tears a finished tree down and regroups the surviving
//!    faces by the plane they lie on, so the tree builder can run again
//!    over merged surfaces.
//! 3. `tjunc` finds every point where a vertex of one face rests on the
//!    interior of another face's edge and inserts the missing vertices,
//!    splitting faces that grow too large.
//! 4. `edges` assigns global indices to distinct vertices and edges and
//!    writes the output face records.
//!
//! Faces live in a `face::FaceStore` arena and are linked into per-node
//! lists by handle; the output tables live in a `map::MapData` value
//! threaded through the phases.

#[macro_use]
extern crate bitflags;
extern crate cgmath;
extern crate failure;
#[macro_use]
extern crate log;
extern crate num;
#[macro_use]
extern crate num_derive;

pub mod edges;
pub mod error;
pub mod face;
pub mod map;
pub mod math;
pub mod options;
pub mod subdivide;
pub mod surfaces;
pub mod tjunc;
pub mod winding;
