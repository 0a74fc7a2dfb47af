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

//! The compile-wide data model and the output tables.
//!
//! `MapData` owns everything that outlives a single
//! entity build: the interned plane table, the texinfo table, and the
//! in-memory image of the output file. It is an explicit value threaded
//! through the pipeline rather than a process-wide global.
//!
//! # Plane interning
//!
//! Planes are stored once in canonical orientation; a directed plane and
//! its reverse share an index, and each face carries a side bit saying
//! which way it looks. Lookup goes through a bucket map keyed by the
//! rounded plane distance, and buckets are scanned in insertion order so a
//! given input always assigns the same plane indices.
//!
//! # Exported indices
//!
//! The output file has its own dense plane and texinfo tables containing
//! only entries some emitted face references. Compile-time indices are
//! mapped to output indices lazily, on first emission, and the mapping is
//! memoized so re-emission is stable.
//!
//! # Output tables
//!
//! `BspOutput` holds the tables downstream
//! serialization writes out verbatim: vertexes, edges (edge 0 reserved,
//! since a surfedge of 0 cannot encode direction), signed surfedges, face
//! records, and a lightmap-shift sidecar parallel to the face table.

use std::collections::BTreeMap;
use std::fmt;

use cgmath::{InnerSpace, Vector3};

use crate::error::{CompileError, CompileErrorKind};
use crate::math::{Bounds, Plane, PlaneKind, PlaneSide};

pub const MAX_LIGHTSTYLES: usize = 4;

bitflags! {
    /// Surface flags on a texinfo.
    pub struct TexFlags: u32 {
        /// Sky or liquid: no lightmap, never subdivided.
        const SPECIAL = 0x1;
        /// Compile-only face, dropped at emission.
        const SKIP = 0x2;
        /// BSP split hint, dropped at emission.
        const HINT = 0x4;
    }
}

/// One texture projection axis: world vector plus offset.
#[derive(Clone, Debug, PartialEq)]
pub struct TexAxis {
    pub vec: Vector3<f64>,
    pub offset: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TexInfo {
    /// S and T projection axes.
    pub vecs: [TexAxis; 2],
    pub miptex: usize,
    pub flags: TexFlags,
}

impl TexInfo {
    /// Whether faces with this texinfo are carved to the lightmap block
    /// limit.
    pub fn is_subdivided(&self) -> bool {
        !self.flags.contains(TexFlags::SPECIAL)
    }
}

/// An unordered pair of vertex indices; surfedge signs pick the direction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Edge {
    pub v1: usize,
    pub v2: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutputPlane {
    pub normal: Vector3<f64>,
    pub dist: f64,
    pub kind: PlaneKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutputFace {
    pub plane_id: usize,
    pub side: PlaneSide,

    /// Index of the first entry in the surfedge table.
    pub first_edge: usize,
    pub edge_count: usize,
    pub texinfo_id: usize,

    pub styles: [u8; MAX_LIGHTSTYLES],
    pub light_ofs: i32,
}

/// The in-memory image of the output file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BspOutput {
    pub planes: Vec<OutputPlane>,
    pub texinfos: Vec<TexInfo>,
    pub vertexes: Vec<Vector3<f64>>,
    pub edges: Vec<Edge>,
    pub surfedges: Vec<i32>,
    pub faces: Vec<OutputFace>,
}

impl fmt::Display for BspOutput {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{:7} planes", self.planes.len())?;
        writeln!(f, "{:7} texinfos", self.texinfos.len())?;
        writeln!(f, "{:7} vertexes", self.vertexes.len())?;
        writeln!(f, "{:7} edges", self.edges.len())?;
        writeln!(f, "{:7} surfedges", self.surfedges.len())?;
        write!(f, "{:7} faces", self.faces.len())
    }
}

#[derive(Debug, Default)]
pub struct MapData {
    planes: Vec<Plane>,
    plane_buckets: BTreeMap<i64, Vec<usize>>,
    plane_output: Vec<Option<usize>>,

    pub texinfos: Vec<TexInfo>,
    texinfo_output: Vec<Option<usize>>,

    pub bsp: BspOutput,

    /// Lightmap shift per emitted face; always parallel to `bsp.faces`.
    pub exported_lmshifts: Vec<u8>,
    /// Set when any face's shift differs from the engine default of 4.
    pub needs_lmshifts: bool,
}

// planes are interned by rounded distance
fn plane_bucket_key(plane: &Plane) -> i64 {
    plane.dist.abs().round() as i64
}

const UNIT_EPSILON: f64 = 0.00001;

impl MapData {
    pub fn new() -> MapData {
        MapData::default()
    }

    pub fn add_texinfo(&mut self, texinfo: TexInfo) -> usize {
        let id = self.texinfos.len();
        self.texinfos.push(texinfo);
        self.texinfo_output.push(None);
        id
    }

    pub fn plane(&self, id: usize) -> &Plane {
        &self.planes[id]
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Interns `plane`, returning its index and the side bit relating the
    /// requested orientation to the stored one.
    pub fn find_plane(&mut self, plane: &Plane) -> Result<(usize, PlaneSide), CompileError> {
        let (canon, side) = plane.canonical();

        let key = plane_bucket_key(&canon);
        if let Some(bucket) = self.plane_buckets.get(&key) {
            for &id in bucket {
                if self.planes[id].matches(&canon) {
                    return Ok((id, side));
                }
            }
        }

        let length = canon.normal.magnitude();
        if (length - 1.0).abs() > UNIT_EPSILON {
            return Err(CompileErrorKind::InvalidNormal { length }.into());
        }

        let id = self.planes.len();
        self.planes.push(canon);
        self.plane_output.push(None);
        self.plane_buckets
            .entry(key)
            .or_insert_with(Vec::new)
            .push(id);

        Ok((id, side))
    }

    /// Output index for a compile-time plane, assigning one on first use.
    pub fn export_plane(&mut self, id: usize) -> usize {
        if let Some(out) = self.plane_output[id] {
            return out;
        }

        let plane = &self.planes[id];
        let out = self.bsp.planes.len();
        self.bsp.planes.push(OutputPlane {
            normal: plane.normal,
            dist: plane.dist,
            kind: plane.kind(),
        });
        self.plane_output[id] = Some(out);
        out
    }

    /// Output index for a compile-time texinfo, assigning one on first use.
    pub fn export_texinfo(&mut self, id: usize) -> usize {
        if let Some(out) = self.texinfo_output[id] {
            return out;
        }

        let out = self.bsp.texinfos.len();
        self.bsp.texinfos.push(self.texinfos[id].clone());
        self.texinfo_output[id] = Some(out);
        out
    }
}

/// Per-entity compile state.
#[derive(Debug)]
pub struct Entity {
    pub bounds: Bounds,

    /// First face record emitted for this entity.
    pub first_output_face: Option<usize>,

    /// Advisory counts filled by the pre-emission pass.
    pub face_count: usize,
    pub vertex_count: usize,
}

impl Entity {
    pub fn new(bounds: Bounds) -> Entity {
        Entity {
            bounds,
            first_output_face: None,
            face_count: 0,
            vertex_count: 0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_find_plane_interns_both_directions() {
        let mut map = MapData::new();
        let (id, side) = map
            .find_plane(&Plane::new(Vector3::new(1.0, 0.0, 0.0), 64.0))
            .unwrap();
        assert_eq!(side, PlaneSide::Front);

        let (id2, side2) = map
            .find_plane(&Plane::new(Vector3::new(-1.0, 0.0, 0.0), -64.0))
            .unwrap();
        assert_eq!(id, id2);
        assert_eq!(side2, PlaneSide::Back);
        assert_eq!(map.plane_count(), 1);
    }

    #[test]
    fn test_find_plane_rejects_bad_normal() {
        let mut map = MapData::new();
        let err = map
            .find_plane(&Plane::new(Vector3::new(0.5, 0.5, 0.0), 10.0))
            .unwrap_err();
        match err.kind() {
            CompileErrorKind::InvalidNormal { .. } => (),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_export_plane_is_memoized() {
        let mut map = MapData::new();
        let (id, _) = map
            .find_plane(&Plane::new(Vector3::new(0.0, 1.0, 0.0), 8.0))
            .unwrap();
        let (id2, _) = map
            .find_plane(&Plane::new(Vector3::new(0.0, 0.0, 1.0), 24.0))
            .unwrap();

        // exported in emission order, not intern order
        assert_eq!(map.export_plane(id2), 0);
        assert_eq!(map.export_plane(id), 1);
        assert_eq!(map.export_plane(id2), 0);
        assert_eq!(map.bsp.planes.len(), 2);
        assert_eq!(map.bsp.planes[0].kind, PlaneKind::Z);
        assert_eq!(map.bsp.planes[0].dist, map.plane(id2).dist);
    }

    #[test]
    fn test_plane_indices_are_deterministic() {
        let build = || {
            let mut map = MapData::new();
            let mut ids = Vec::new();
            for dist in &[64.0, -64.0, 64.25, 128.0] {
                let (id, _) = map
                    .find_plane(&Plane::new(Vector3::new(1.0, 0.0, 0.0), *dist))
                    .unwrap();
                ids.push(id);
            }
            ids
        };
        assert_eq!(build(), build());
    }
}
